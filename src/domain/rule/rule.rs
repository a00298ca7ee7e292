use serde::Deserialize;
use std::{collections::HashSet, path::PathBuf};

use crate::email::normalize_addr;

/// Represents one entry of the configured mapping list: a filter
/// and the directory receiving the attachments of the emails it
/// matches.
#[derive(Debug, Default, Clone, Eq, PartialEq, Deserialize)]
#[serde(default)]
pub struct MappingRule {
    /// Enables the sender filter.
    pub filter_sender: bool,
    /// Represents the accepted sender addresses (lower-cased).
    pub senders: HashSet<String>,
    /// Enables the receiver filter.
    pub filter_receiver: bool,
    /// Represents the accepted receiver addresses (lower-cased).
    pub receivers: HashSet<String>,
    /// Enables the subject filter.
    pub filter_subject: bool,
    /// Represents the subject substrings (lower-cased), any of them
    /// is enough to match.
    #[serde(rename = "subject")]
    pub subjects: Vec<String>,
    /// Represents the directory attachments are saved to.
    pub destination: PathBuf,
    /// Prefixes saved file names with the email date (`YYYYMMDD_`).
    pub add_date: bool,
}

impl MappingRule {
    /// Lower-cases addresses and subject substrings so they can be
    /// compared against normalized email headers.
    pub fn normalize(mut self) -> Self {
        self.senders = self.senders.iter().map(|s| s.to_lowercase()).collect();
        self.receivers = self.receivers.iter().map(|r| r.to_lowercase()).collect();
        self.subjects = self.subjects.iter().map(|s| s.to_lowercase()).collect();
        self
    }

    /// Returns `true` if the sender or receiver filter rejects the
    /// given normalized addresses.
    pub fn excludes(&self, sender: &str, receiver: &str) -> bool {
        (self.filter_sender && !self.senders.contains(sender))
            || (self.filter_receiver && !self.receivers.contains(receiver))
    }

    /// Returns `true` if the rule selects an email with the given
    /// normalized addresses and lower-cased subject.
    pub fn selects(&self, sender: &str, receiver: &str, subject: &str) -> bool {
        if self.excludes(sender, receiver) {
            return false;
        }

        if self.filter_subject {
            self.subjects.iter().any(|s| subject.contains(s.as_str()))
        } else {
            true
        }
    }
}

/// Finds the rule applied to an email.
///
/// Every rule is evaluated and each selection overwrites the
/// previous one: the last selecting rule of the list wins.
pub fn find_match<'a>(
    rules: &'a [MappingRule],
    from: &str,
    to: &str,
    subject: &str,
) -> Option<&'a MappingRule> {
    let sender = normalize_addr(from);
    let receiver = normalize_addr(to);
    let subject = subject.to_lowercase();

    rules.iter().fold(None, |selected, rule| {
        if rule.selects(&sender, &receiver, &subject) {
            Some(rule)
        } else {
            selected
        }
    })
}
