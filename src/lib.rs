//! Archive email attachments from an IMAP mailbox.
//!
//! Messages are matched against an ordered list of mapping rules,
//! their attachments are written to the matching rule's destination
//! directory, then the source message is marked as read, moved or
//! deleted depending on the configuration.

pub mod archiver;
pub use archiver::{Archiver, Report};

pub mod backend;
pub use backend::Backend;
#[cfg(feature = "imap-backend")]
pub use backend::{ImapBackend, ImapConfig};

pub mod config;
pub use config::{ArchiverConfig, DEFAULT_INBOX_FOLDER};

pub mod domain;
pub use domain::*;
