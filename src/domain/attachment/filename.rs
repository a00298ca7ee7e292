use chrono::{DateTime, NaiveDateTime};
use log::{debug, trace};
use mailparse::{MailHeaderMap, ParsedMail};
use std::result;
use thiserror::Error;

/// Represents the file name given to attachments that do not
/// declare one.
pub const DEFAULT_ATTACHMENT_FILENAME: &str = "part-001bin";

const DATE_FORMAT: &str = "%a, %d %b %Y %H:%M:%S";
const DATE_PREFIX_FORMAT: &str = "%Y%m%d";

#[derive(Debug, Error)]
pub enum Error {
    #[error("cannot parse email date {1}")]
    ParseDateError(#[source] chrono::ParseError, String),
    #[error("cannot prefix attachment with email date: date header is missing")]
    GetDateError,
}

pub type Result<T> = result::Result<T, Error>;

/// Returns `true` if the part carries a `Content-Disposition` header.
pub fn has_disposition(part: &ParsedMail<'_>) -> bool {
    part.get_headers()
        .get_first_value("Content-Disposition")
        .is_some()
}

/// Gets the file name declared by the part, from the
/// `Content-Disposition` parameters or, failing that, from the
/// `Content-Type` `name` parameter.
pub fn declared_filename(part: &ParsedMail<'_>) -> Option<String> {
    part.get_content_disposition()
        .params
        .get("filename")
        .or_else(|| part.ctype.params.get("name"))
        .map(|name| name.trim().to_owned())
        .filter(|name| !name.is_empty())
}

/// Decodes the MIME encoded-words of a file name. Names that cannot
/// be decoded are kept as they are.
pub fn decode_filename(name: &str) -> String {
    match rfc2047_decoder::decode(name.as_bytes()) {
        Ok(name) => name,
        Err(err) => {
            debug!("cannot decode file name {:?}, keeping it raw", name);
            trace!("{:?}", err);
            name.to_owned()
        }
    }
}

/// Builds the `YYYYMMDD` prefix out of a `Date` header value.
///
/// The trailing numeric offset is dropped and the rest is read as
/// written (`Mon, 02 Jan 2023 03:04:05`). Other RFC 2822 shapes
/// (named zones, missing weekday) are parsed with their zone and
/// kept in it. Either way the prefix is the sender's local date.
pub fn date_prefix(date: &str) -> Result<String> {
    let mut local = date.trim();
    for sep in [" +", " -"] {
        if let Some((head, _)) = local.split_once(sep) {
            local = head;
        }
    }

    if let Ok(date) = NaiveDateTime::parse_from_str(local.trim(), DATE_FORMAT) {
        return Ok(date.format(DATE_PREFIX_FORMAT).to_string());
    }

    debug!("cannot parse date {:?} strictly, trying rfc 2822", date);
    let parsed = DateTime::parse_from_rfc2822(date.trim())
        .map_err(|err| Error::ParseDateError(err, date.to_owned()))?;

    Ok(parsed.naive_local().format(DATE_PREFIX_FORMAT).to_string())
}

/// Derives the file name an attachment is saved under.
///
/// Path separators are replaced so the file always lands directly
/// inside the destination directory.
pub fn attachment_filename(declared: Option<&str>, date: Option<&str>) -> String {
    let name = declared
        .map(decode_filename)
        .map(|name| name.replace(|c| c == '/' || c == '\\', "_"))
        .filter(|name| !name.trim().is_empty() && name != "." && name != "..")
        .unwrap_or_else(|| DEFAULT_ATTACHMENT_FILENAME.to_owned());

    match date {
        Some(date) => format!("{}_{}", date, name),
        None => name,
    }
}
