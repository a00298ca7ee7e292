use log::debug;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::{fs, io, path::Path};

use crate::config::{Error, Result};

/// Reads a JSON file whose root must be an object. `not_found`
/// builds the error returned when the file does not exist.
pub(crate) fn read_object(
    path: &Path,
    not_found: fn(&Path) -> Error,
) -> Result<Map<String, Value>> {
    debug!("reading json file {}", path.display());

    let content = fs::read_to_string(path).map_err(|err| match err.kind() {
        io::ErrorKind::NotFound => not_found(path),
        _ => Error::ReadFileError(err, path.to_owned()),
    })?;

    match serde_json::from_str(&content)
        .map_err(|err| Error::ParseJsonError(err, path.to_owned()))?
    {
        Value::Object(object) => Ok(object),
        _ => Err(Error::NotAnObjectError(path.to_owned())),
    }
}

/// Checks that every key is present in the object.
pub(crate) fn require_keys(
    object: &Map<String, Value>,
    keys: &[&'static str],
    path: &Path,
) -> Result<()> {
    match keys.iter().find(|key| !object.contains_key(**key)) {
        Some(key) => Err(Error::MissingKeyError(key, path.to_owned())),
        None => Ok(()),
    }
}

/// Deserializes an already validated object.
pub(crate) fn from_object<T: DeserializeOwned>(
    object: Map<String, Value>,
    path: &Path,
) -> Result<T> {
    serde_json::from_value(Value::Object(object))
        .map_err(|err| Error::ParseJsonError(err, path.to_owned()))
}
