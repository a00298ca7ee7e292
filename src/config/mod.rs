//! Config module.
//!
//! This module contains the archiver configuration and the JSON
//! loading helpers shared with the IMAP connection file.

pub mod config;
pub use config::{ArchiverConfig, Error, Result, DEFAULT_INBOX_FOLDER};

pub(crate) mod json;
