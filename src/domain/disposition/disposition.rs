use chrono::NaiveDate;
use std::{collections::BTreeSet, fmt, ops};

use crate::DEFAULT_INBOX_FOLDER;

const DATE_SUBFOLDER_FORMAT: &str = "%Y-%m-%d";

/// Represents the terminal state an email reaches once classified.
#[derive(Debug, Clone, Copy, Eq, Hash, PartialEq)]
pub enum Disposition {
    /// The email is not multipart, it cannot carry attachments.
    NoAttachments,
    /// No mapping rule matched the email.
    NoMatch,
    /// A mapping rule matched and the email parts were processed.
    Processed,
}

impl fmt::Display for Disposition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoAttachments => write!(f, "no attachments"),
            Self::NoMatch => write!(f, "no match"),
            Self::Processed => write!(f, "processed"),
        }
    }
}

/// Represents an action applied to an email.
///
/// The variant order is the application order: the seen flag is set
/// before the email is copied elsewhere, and deletion comes last.
#[derive(Debug, Clone, Eq, Hash, PartialEq, Ord, PartialOrd)]
pub enum Action {
    MarkRead,
    Move(String),
    Delete,
}

/// Represents the action flags configured for one disposition.
#[derive(Debug, Default, Clone, Copy, Eq, PartialEq)]
pub struct ActionsConfig<'a> {
    pub mark_as_read: bool,
    pub delete_email: bool,
    pub move_mail: bool,
    pub move_to_folder: Option<&'a str>,
    pub move_to_date_subfolder: bool,
}

impl ActionsConfig<'_> {
    /// Builds the folder emails are moved to: the configured folder
    /// (`INBOX` when empty), optionally followed by a subfolder
    /// named after the given date.
    pub fn move_target(&self, today: NaiveDate) -> String {
        let mut folder = self
            .move_to_folder
            .filter(|folder| !folder.is_empty())
            .unwrap_or(DEFAULT_INBOX_FOLDER)
            .to_owned();

        if self.move_to_date_subfolder {
            folder.push('/');
            folder.push_str(&today.format(DATE_SUBFOLDER_FORMAT).to_string());
        }

        folder
    }

    /// Lists the enabled actions.
    pub fn actions(&self, today: NaiveDate) -> Vec<Action> {
        let mut actions = Vec::new();

        if self.mark_as_read {
            actions.push(Action::MarkRead);
        }

        if self.move_mail {
            actions.push(Action::Move(self.move_target(today)));
        }

        if self.delete_email {
            actions.push(Action::Delete);
        }

        actions
    }
}

/// Accumulates the actions fired for an email.
///
/// Firing the same action several times (once per MIME part of a
/// processed email) results in a single application.
#[derive(Debug, Default, Clone, Eq, PartialEq)]
pub struct DispositionPlan(pub BTreeSet<Action>);

impl DispositionPlan {
    pub fn fire<'a, I: IntoIterator<Item = &'a Action>>(&mut self, actions: I) {
        self.0.extend(actions.into_iter().cloned())
    }
}

impl ops::Deref for DispositionPlan {
    type Target = BTreeSet<Action>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}
