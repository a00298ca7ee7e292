//! IMAP backend module.
//!
//! This module contains the IMAP implementation of the backend and
//! its connection configuration.

pub mod backend;
pub use backend::{Error, ImapBackend, ImapSession, ImapSessionStream, Result};

pub mod config;
pub use config::ImapConfig;
