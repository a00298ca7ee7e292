//! Archiver config module.
//!
//! This module contains the representation of the JSON
//! configuration file: the mapping rules and the flags driving the
//! disposition of processed emails.

use log::{debug, trace};
use serde::Deserialize;
use serde_json::Value;
use std::{
    env, io,
    path::{Path, PathBuf},
    result,
};
use thiserror::Error;

use crate::{config::json, ActionsConfig, Disposition, MappingRule};

pub const DEFAULT_INBOX_FOLDER: &str = "INBOX";

#[derive(Debug, Error)]
pub enum Error {
    #[error("cannot find imap connection file {0}")]
    ImapFileNotFoundError(PathBuf),
    #[error("cannot find configuration file {0}")]
    ConfigFileNotFoundError(PathBuf),
    #[error("cannot read file {1}")]
    ReadFileError(#[source] io::Error, PathBuf),
    #[error("cannot parse json file {1}")]
    ParseJsonError(#[source] serde_json::Error, PathBuf),
    #[error("cannot parse json file {0}: root must be an object")]
    NotAnObjectError(PathBuf),
    #[error("cannot find key {0} in {1}")]
    MissingKeyError(&'static str, PathBuf),
    #[error("cannot find key {0} in mapping {1} of {2}")]
    MissingMappingKeyError(&'static str, usize, PathBuf),
    #[error("cannot expand destination {1}")]
    ExpandDestinationError(#[source] shellexpand::LookupError<env::VarError>, String),
}

pub type Result<T> = result::Result<T, Error>;

/// Represents the archiver configuration.
///
/// Every flag is optional and defaults to `false`; only `mappings`
/// is required.
#[derive(Debug, Default, Clone, Eq, PartialEq, Deserialize)]
#[serde(default)]
pub struct ArchiverConfig {
    /// Represents the ordered list of mapping rules.
    pub mappings: Vec<MappingRule>,

    /// Adds the Gmail `\Trash` label before flagging emails as
    /// deleted.
    pub use_gmail_trash_flag_with_delete: bool,
    /// Only considers unseen emails.
    pub filter_unread_emails: bool,

    /// Marks processed emails as read.
    pub mark_as_read: bool,
    /// Deletes processed emails.
    pub delete_email: bool,
    /// Moves processed emails.
    pub move_mail: bool,
    /// Represents the folder processed emails are moved to
    /// (`INBOX` when empty).
    pub move_to_folder: Option<String>,
    /// Moves processed emails to a dated subfolder.
    pub move_to_date_subfolder: bool,

    pub mark_as_read_no_attachments: bool,
    pub delete_email_no_attachments: bool,
    pub move_mail_no_attachments: bool,
    pub move_to_folder_no_attachments: Option<String>,
    pub move_to_date_subfolder_no_attachments: bool,

    pub mark_as_read_no_match: bool,
    pub delete_email_no_match: bool,
    pub move_mail_no_match: bool,
    pub move_to_folder_no_match: Option<String>,
    pub move_to_date_subfolder_no_match: bool,
}

impl ArchiverConfig {
    /// Loads the configuration from a JSON file.
    ///
    /// Missing files and missing required keys are reported before
    /// any typed parsing so the error names what is missing.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let object = json::read_object(path, |path| {
            Error::ConfigFileNotFoundError(path.to_owned())
        })?;

        json::require_keys(&object, &["mappings"], path)?;
        if let Some(Value::Array(mappings)) = object.get("mappings") {
            for (i, mapping) in mappings.iter().enumerate() {
                if mapping.get("destination").is_none() {
                    return Err(Error::MissingMappingKeyError("destination", i, path.to_owned()));
                }
            }
        }

        let config: Self = json::from_object(object, path)?;
        let config = config.normalize()?;
        debug!("loaded {} mapping(s) from {}", config.mappings.len(), path.display());
        trace!("config: {:#?}", config);

        Ok(config)
    }

    /// Lower-cases the rule filters and expands the rule
    /// destinations (`~`, environment variables).
    pub fn normalize(mut self) -> Result<Self> {
        self.mappings = self
            .mappings
            .into_iter()
            .map(|rule| {
                let destination = rule.destination.to_string_lossy().to_string();
                let expanded = shellexpand::full(&destination)
                    .map_err(|err| Error::ExpandDestinationError(err, destination.clone()))?;
                Ok(MappingRule {
                    destination: PathBuf::from(expanded.as_ref()),
                    ..rule.normalize()
                })
            })
            .collect::<Result<_>>()?;

        Ok(self)
    }

    /// Gets the action flags matching the given disposition.
    pub fn actions_config(&self, disposition: Disposition) -> ActionsConfig<'_> {
        match disposition {
            Disposition::NoAttachments => ActionsConfig {
                mark_as_read: self.mark_as_read_no_attachments,
                delete_email: self.delete_email_no_attachments,
                move_mail: self.move_mail_no_attachments,
                move_to_folder: self.move_to_folder_no_attachments.as_deref(),
                move_to_date_subfolder: self.move_to_date_subfolder_no_attachments,
            },
            Disposition::NoMatch => ActionsConfig {
                mark_as_read: self.mark_as_read_no_match,
                delete_email: self.delete_email_no_match,
                move_mail: self.move_mail_no_match,
                move_to_folder: self.move_to_folder_no_match.as_deref(),
                move_to_date_subfolder: self.move_to_date_subfolder_no_match,
            },
            Disposition::Processed => ActionsConfig {
                mark_as_read: self.mark_as_read,
                delete_email: self.delete_email,
                move_mail: self.move_mail,
                move_to_folder: self.move_to_folder.as_deref(),
                move_to_date_subfolder: self.move_to_date_subfolder,
            },
        }
    }

    /// Gets the IMAP search query selecting the emails to process.
    pub fn search_query(&self) -> &'static str {
        if self.filter_unread_emails {
            "UNSEEN"
        } else {
            "ALL"
        }
    }
}
