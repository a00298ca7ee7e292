use log::{debug, info};
use mailparse::{MailHeaderMap, MailParseError, ParsedMail};
use std::{
    fs,
    io::{self, Write},
    path::{Path, PathBuf},
    result,
};
use thiserror::Error;

use crate::{
    attachment::{self, attachment_filename, declared_filename, has_disposition},
    email::is_multipart,
    MappingRule, ParsedEmail, PartsIterator,
};

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    FilenameError(#[from] attachment::filename::Error),
    #[error("cannot create destination directory {1}")]
    CreateDestinationError(#[source] io::Error, PathBuf),
    #[error("cannot decode attachment body for {1}")]
    DecodeBodyError(#[source] MailParseError, PathBuf),
    #[error("cannot write attachment {1}")]
    WriteAttachmentError(#[source] io::Error, PathBuf),
}

pub type Result<T> = result::Result<T, Error>;

/// Represents what happened to one MIME part during extraction.
#[derive(Debug)]
pub enum PartOutcome {
    /// The part is a multipart container.
    SkippedContainer,
    /// The part has no `Content-Disposition` header.
    SkippedNonAttachment,
    /// The attachment was written to the given path.
    Saved(PathBuf),
    /// A file already exists at the given path, nothing was written.
    SkippedDuplicate(PathBuf),
    /// The attachment could not be saved. The run goes on.
    Failed(Error),
}

/// Lazily extracts the attachments of an email to the destination
/// of a mapping rule, yielding one [`PartOutcome`] per MIME part in
/// depth-first order.
///
/// Nothing is written until the iterator is consumed.
pub struct Extractor<'a> {
    parts: PartsIterator<'a>,
    rule: &'a MappingRule,
    date: Option<&'a str>,
}

impl<'a> Extractor<'a> {
    pub fn new(email: &'a ParsedEmail<'a>, rule: &'a MappingRule) -> Self {
        Self {
            parts: email.parts(),
            rule,
            date: email.date.as_deref(),
        }
    }

    fn extract(&self, part: &ParsedMail<'_>) -> PartOutcome {
        if is_multipart(part) {
            return PartOutcome::SkippedContainer;
        }

        if !has_disposition(part) {
            return PartOutcome::SkippedNonAttachment;
        }

        self.save(part).unwrap_or_else(PartOutcome::Failed)
    }

    fn save(&self, part: &ParsedMail<'_>) -> Result<PartOutcome> {
        let date = if self.rule.add_date {
            let date = self.date.ok_or(attachment::filename::Error::GetDateError)?;
            Some(attachment::date_prefix(date)?)
        } else {
            None
        };

        let filename = attachment_filename(declared_filename(part).as_deref(), date.as_deref());
        let dir = &self.rule.destination;
        let path = dir.join(filename);

        fs::create_dir_all(dir).map_err(|err| Error::CreateDestinationError(err, dir.clone()))?;

        if path.exists() {
            debug!("attachment {} already exists, skipping it", path.display());
            return Ok(PartOutcome::SkippedDuplicate(path));
        }

        let body = decode_body(part).map_err(|err| Error::DecodeBodyError(err, path.clone()))?;

        info!("saving attachment to {}", path.display());
        if write_new_file(&path, &body)? {
            Ok(PartOutcome::Saved(path))
        } else {
            Ok(PartOutcome::SkippedDuplicate(path))
        }
    }
}

impl<'a> Iterator for Extractor<'a> {
    type Item = PartOutcome;

    fn next(&mut self) -> Option<Self::Item> {
        let part = self.parts.next()?;
        Some(self.extract(part))
    }
}

/// Decodes the payload of a part.
///
/// The line break preceding a boundary belongs to the delimiter. The
/// base64 decoder already skips it, other encodings keep it in the
/// body so it is dropped here.
fn decode_body(part: &ParsedMail<'_>) -> result::Result<Vec<u8>, MailParseError> {
    let mut body = part.get_body_raw()?;

    let base64 = part
        .get_headers()
        .get_first_value("Content-Transfer-Encoding")
        .map(|encoding| encoding.trim().eq_ignore_ascii_case("base64"))
        .unwrap_or_default();

    if !base64 {
        if body.ends_with(b"\r\n") {
            body.truncate(body.len() - 2);
        } else if body.ends_with(b"\n") {
            body.truncate(body.len() - 1);
        }
    }

    Ok(body)
}

/// Writes the body to a file that must not exist yet. Returns
/// `false` if the file appeared in the meantime. A partially written
/// file is removed so that the next run retries it.
fn write_new_file(path: &Path, body: &[u8]) -> Result<bool> {
    let mut file = match fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
    {
        Ok(file) => file,
        Err(err) if err.kind() == io::ErrorKind::AlreadyExists => return Ok(false),
        Err(err) => return Err(Error::WriteAttachmentError(err, path.to_owned())),
    };

    if let Err(err) = file.write_all(body).and_then(|()| file.sync_all()) {
        drop(file);
        if let Err(err) = fs::remove_file(path) {
            debug!("cannot remove partial attachment {}: {}", path.display(), err);
        }
        return Err(Error::WriteAttachmentError(err, path.to_owned()));
    }

    Ok(true)
}
