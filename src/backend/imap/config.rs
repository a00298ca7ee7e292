//! IMAP backend config module.
//!
//! This module contains the representation of the JSON IMAP
//! connection file.

use serde::Deserialize;
use std::{fmt, path::Path};

use crate::config::{self, json};

pub const DEFAULT_IMAP_PORT: u16 = 993;
pub const DEFAULT_IMAP_STARTTLS_PORT: u16 = 143;

/// Represents the IMAP connection configuration.
#[derive(Default, Clone, Eq, PartialEq, Deserialize)]
pub struct ImapConfig {
    /// Represents the IMAP server host.
    #[serde(rename = "server")]
    pub host: String,
    /// Represents the IMAP server port.
    #[serde(default)]
    pub port: Option<u16>,
    /// Enables SSL (default).
    #[serde(default)]
    pub ssl: Option<bool>,
    /// Enables StartTLS.
    #[serde(default)]
    pub starttls: Option<bool>,
    /// Trusts any certificate.
    #[serde(default)]
    pub insecure: Option<bool>,
    /// Represents the IMAP server login.
    #[serde(rename = "user")]
    pub login: String,
    /// Represents the IMAP server password.
    #[serde(rename = "password")]
    pub passwd: String,
}

impl ImapConfig {
    /// Loads the connection configuration from a JSON file. The
    /// `server`, `user` and `password` keys are required.
    pub fn from_path<P: AsRef<Path>>(path: P) -> config::Result<Self> {
        let path = path.as_ref();
        let object = json::read_object(path, |path| {
            config::Error::ImapFileNotFoundError(path.to_owned())
        })?;
        json::require_keys(&object, &["server", "user", "password"], path)?;
        json::from_object(object, path)
    }

    /// Gets the SSL IMAP option.
    pub fn ssl(&self) -> bool {
        self.ssl.unwrap_or(true)
    }

    /// Gets the StartTLS IMAP option.
    pub fn starttls(&self) -> bool {
        self.starttls.unwrap_or_default()
    }

    /// Gets the insecure IMAP option.
    pub fn insecure(&self) -> bool {
        self.insecure.unwrap_or_default()
    }

    /// Gets the IMAP port, defaulting to the implicit TLS port
    /// unless StartTLS or plain TCP is used.
    pub fn port(&self) -> u16 {
        self.port.unwrap_or_else(|| {
            if self.ssl() && !self.starttls() {
                DEFAULT_IMAP_PORT
            } else {
                DEFAULT_IMAP_STARTTLS_PORT
            }
        })
    }
}

impl fmt::Debug for ImapConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImapConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("ssl", &self.ssl)
            .field("starttls", &self.starttls)
            .field("insecure", &self.insecure)
            .field("login", &self.login)
            .field("passwd", &"<hidden>")
            .finish()
    }
}
