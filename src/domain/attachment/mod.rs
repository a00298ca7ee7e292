//! Attachment module.
//!
//! This module contains the extraction of attachments from a parsed
//! email to the destination directory of a mapping rule.

pub mod extractor;
pub use extractor::{Extractor, PartOutcome};

pub mod filename;
pub use filename::{
    attachment_filename, date_prefix, decode_filename, declared_filename, has_disposition,
    DEFAULT_ATTACHMENT_FILENAME,
};
