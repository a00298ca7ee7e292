use log::trace;
use mailparse::{MailHeaderMap, MailParseError, ParsedMail};
use std::{fmt, result};
use thiserror::Error;

use crate::PartsIterator;

#[derive(Debug, Error)]
pub enum Error {
    #[error("cannot parse email {1}")]
    ParseRawEmailError(#[source] MailParseError, String),
}

pub type Result<T> = result::Result<T, Error>;

/// Represents a raw email fetched from a mailbox folder.
///
/// The email is never mutated locally: flags, copies and deletions
/// go through the backend.
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct Email {
    /// Server-assigned identifier (the IMAP UID).
    pub id: String,
    /// Raw RFC 822 content.
    pub raw: Vec<u8>,
}

impl Email {
    pub fn new<I: ToString, R: Into<Vec<u8>>>(id: I, raw: R) -> Self {
        Self {
            id: id.to_string(),
            raw: raw.into(),
        }
    }

    /// Parses the raw content and extracts the headers used for
    /// matching.
    pub fn parsed(&self) -> Result<ParsedEmail<'_>> {
        let mail = mailparse::parse_mail(&self.raw)
            .map_err(|err| Error::ParseRawEmailError(err, self.id.clone()))?;
        let headers = mail.get_headers();

        let from = headers.get_first_value("From").unwrap_or_default();
        let to = headers.get_first_value("To").unwrap_or_default();
        let subject = headers.get_first_value("Subject").unwrap_or_default();
        let date = headers.get_first_value("Date");

        let email = ParsedEmail {
            id: &self.id,
            from,
            to,
            subject,
            date,
            mail,
        };
        trace!("parsed email: {}", email);

        Ok(email)
    }
}

/// Represents a parsed email, borrowing the raw content of an
/// [`Email`].
pub struct ParsedEmail<'a> {
    pub id: &'a str,
    pub from: String,
    pub to: String,
    pub subject: String,
    pub date: Option<String>,
    pub mail: ParsedMail<'a>,
}

impl<'a> ParsedEmail<'a> {
    /// Returns `true` if the root part is a multipart container.
    /// Only multipart emails can carry attachments.
    pub fn is_multipart(&self) -> bool {
        is_multipart(&self.mail)
    }

    pub fn parts(&self) -> PartsIterator<'_> {
        PartsIterator::new(&self.mail)
    }
}

impl fmt::Display for ParsedEmail<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "<{}> from: {}; to: {}; subject: {}",
            self.date.as_deref().unwrap_or_default(),
            self.from,
            self.to,
            self.subject
        )
    }
}

/// Returns `true` if the main type of the given part is `multipart`.
pub fn is_multipart(part: &ParsedMail<'_>) -> bool {
    part.ctype
        .mimetype
        .split('/')
        .next()
        .map(|main_type| main_type.trim().eq_ignore_ascii_case("multipart"))
        .unwrap_or_default()
}
