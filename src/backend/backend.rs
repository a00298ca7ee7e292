//! Backend module.
//!
//! This module exposes the backend trait, the seam between the
//! archiver and the mailbox it processes.

use std::result;
use thiserror::Error;

use crate::{email, Email, Flags};

#[cfg(feature = "imap-backend")]
use crate::backend;

#[derive(Debug, Error)]
pub enum Error {
    #[error("cannot find email {0} in folder {1}")]
    FindEmailError(String, String),

    #[error(transparent)]
    EmailError(#[from] email::Error),

    #[cfg(feature = "imap-backend")]
    #[error(transparent)]
    ImapBackendError(#[from] backend::imap::Error),
}

pub type Result<T> = result::Result<T, Error>;

/// Represents the mailbox operations the archiver relies on. Emails
/// are addressed by their server-assigned identifier.
pub trait Backend {
    /// Searches the folder and returns the matching identifiers in
    /// ascending order.
    fn search_emails(&self, folder: &str, query: &str) -> Result<Vec<String>>;
    /// Fetches the raw content of an email without altering its
    /// flags.
    fn get_email(&self, folder: &str, id: &str) -> Result<Email>;

    /// Creates the folder if needed. Returns `false` if the folder
    /// already existed.
    fn add_folder(&self, folder: &str) -> Result<bool>;
    fn copy_email(&self, from_folder: &str, to_folder: &str, id: &str) -> Result<()>;

    fn add_flags(&self, folder: &str, id: &str, flags: &Flags) -> Result<()>;
    /// Adds provider labels (Gmail `X-GM-LABELS`) to an email.
    fn add_labels(&self, folder: &str, id: &str, labels: &[&str]) -> Result<()>;
    /// Permanently removes the emails flagged as deleted.
    fn expunge(&self, folder: &str) -> Result<()>;

    fn close(&self) -> Result<()>;
}
