//! IMAP backend module.
//!
//! This module contains the definition of the IMAP backend. Emails
//! are addressed by UID so that an expunge cannot shift the
//! identity of the emails processed after it.

use log::{debug, log_enabled, trace, Level};
use native_tls::{TlsConnector, TlsStream};
use std::{
    io::{self, Read, Write},
    net::TcpStream,
    result,
    sync::{Mutex, MutexGuard},
};
use thiserror::Error;
use utf7_imap::encode_utf7_imap as encode_utf7;

use crate::{backend, Backend, Email, Flags, ImapConfig};

#[derive(Error, Debug)]
pub enum Error {
    #[error("cannot lock imap session: {0}")]
    LockSessionError(String),
    #[error("cannot find email {0}")]
    FindEmailError(String),

    #[error("cannot create tls connector")]
    CreateTlsConnectorError(#[source] native_tls::Error),
    #[error("cannot connect to imap server {1}:{2}")]
    ConnectImapServerError(#[source] imap::Error, String, u16),
    #[error("cannot login to imap server as {1}")]
    LoginImapServerError(#[source] imap::Error, String),
    #[error("cannot select folder {1}")]
    SelectFolderError(#[source] imap::Error, String),
    #[error("cannot search emails in folder {1} with query: {2}")]
    SearchEmailsError(#[source] imap::Error, String, String),
    #[error("cannot fetch email {1}")]
    FetchEmailError(#[source] imap::Error, String),
    #[error("cannot list folders matching {1}")]
    ListFoldersError(#[source] imap::Error, String),
    #[error("cannot create folder {1}")]
    CreateFolderError(#[source] imap::Error, String),
    #[error("cannot copy email {1} from {2} to {3}")]
    CopyEmailError(#[source] imap::Error, String, String, String),
    #[error("cannot add flags {1} to email {2}")]
    AddFlagsError(#[source] imap::Error, String, String),
    #[error("cannot add labels {1} to email {2}")]
    AddLabelsError(#[source] imap::Error, String, String),
    #[error("cannot expunge folder {1}")]
    ExpungeError(#[source] imap::Error, String),
    #[error("cannot logout from imap server")]
    LogoutError(#[source] imap::Error),
}

pub type Result<T> = result::Result<T, Error>;

pub enum ImapSessionStream {
    Tls(TlsStream<TcpStream>),
    Tcp(TcpStream),
}

impl Read for ImapSessionStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            Self::Tls(stream) => stream.read(buf),
            Self::Tcp(stream) => stream.read(buf),
        }
    }
}

impl Write for ImapSessionStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            Self::Tls(stream) => stream.write(buf),
            Self::Tcp(stream) => stream.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            Self::Tls(stream) => stream.flush(),
            Self::Tcp(stream) => stream.flush(),
        }
    }
}

pub type ImapSession = imap::Session<ImapSessionStream>;

/// Represents the IMAP backend, holding one authenticated session.
pub struct ImapBackend {
    session: Mutex<ImapSession>,
}

impl ImapBackend {
    fn create_session(config: &ImapConfig) -> Result<ImapSession> {
        let builder = TlsConnector::builder()
            .danger_accept_invalid_certs(config.insecure())
            .danger_accept_invalid_hostnames(config.insecure())
            .build()
            .map_err(Error::CreateTlsConnectorError)?;

        let mut client_builder = imap::ClientBuilder::new(&config.host, config.port());
        if config.starttls() {
            client_builder.starttls();
        }

        debug!("connecting to {}:{}", config.host, config.port());
        let client = if config.ssl() || config.starttls() {
            client_builder.connect(|domain, tcp| {
                let connector = TlsConnector::connect(&builder, domain, tcp)?;
                Ok(ImapSessionStream::Tls(connector))
            })
        } else {
            client_builder.connect(|_, tcp| Ok(ImapSessionStream::Tcp(tcp)))
        }
        .map_err(|err| Error::ConnectImapServerError(err, config.host.clone(), config.port()))?;

        let mut session = client
            .login(&config.login, &config.passwd)
            .map_err(|res| Error::LoginImapServerError(res.0, config.login.clone()))?;
        session.debug = log_enabled!(Level::Trace);

        Ok(session)
    }

    pub fn new(imap_config: &ImapConfig) -> Result<Self> {
        Ok(Self {
            session: Mutex::new(Self::create_session(imap_config)?),
        })
    }

    pub fn session(&self) -> Result<MutexGuard<ImapSession>> {
        self.session
            .lock()
            .map_err(|err| Error::LockSessionError(err.to_string()))
    }

    fn select(session: &mut ImapSession, folder: &str) -> Result<()> {
        session
            .select(folder)
            .map_err(|err| Error::SelectFolderError(err, folder.to_owned()))?;
        Ok(())
    }

    fn folder_exists(session: &mut ImapSession, folder: &str) -> Result<bool> {
        let names = session
            .list(Some(""), Some(folder))
            .map_err(|err| Error::ListFoldersError(err, folder.to_owned()))?;
        Ok(names.iter().any(|name| name.name() == folder))
    }
}

impl Backend for ImapBackend {
    fn search_emails(&self, folder: &str, query: &str) -> backend::Result<Vec<String>> {
        debug!("searching emails in folder {} with query {}", folder, query);

        let folder = encode_utf7(folder.to_owned());
        let mut session = self.session()?;

        Self::select(&mut session, &folder)?;
        let mut uids: Vec<u32> = session
            .uid_search(query)
            .map_err(|err| Error::SearchEmailsError(err, folder.clone(), query.to_owned()))?
            .into_iter()
            .collect();
        uids.sort_unstable();
        debug!("found {} email(s)", uids.len());
        trace!("uids: {:?}", uids);

        Ok(uids.into_iter().map(|uid| uid.to_string()).collect())
    }

    fn get_email(&self, folder: &str, id: &str) -> backend::Result<Email> {
        debug!("fetching email {} from folder {}", id, folder);

        let folder = encode_utf7(folder.to_owned());
        let mut session = self.session()?;

        Self::select(&mut session, &folder)?;
        let fetches = session
            .uid_fetch(id, "BODY.PEEK[]")
            .map_err(|err| Error::FetchEmailError(err, id.to_owned()))?;
        let body = fetches
            .iter()
            .find_map(|fetch| fetch.body())
            .ok_or_else(|| Error::FindEmailError(id.to_owned()))?;

        Ok(Email::new(id, body))
    }

    fn add_folder(&self, folder: &str) -> backend::Result<bool> {
        let folder = encode_utf7(folder.to_owned());
        let mut session = self.session()?;

        if Self::folder_exists(&mut session, &folder)? {
            debug!("folder {} already exists", folder);
            return Ok(false);
        }

        match session.create(&folder) {
            Ok(()) => Ok(true),
            Err(err @ imap::Error::No(_)) => {
                if Self::folder_exists(&mut session, &folder)? {
                    debug!("folder {} created concurrently", folder);
                    Ok(false)
                } else {
                    Err(Error::CreateFolderError(err, folder).into())
                }
            }
            Err(err) => Err(Error::CreateFolderError(err, folder).into()),
        }
    }

    fn copy_email(&self, from_folder: &str, to_folder: &str, id: &str) -> backend::Result<()> {
        debug!("copying email {} from {} to {}", id, from_folder, to_folder);

        let from_folder_encoded = encode_utf7(from_folder.to_owned());
        let to_folder_encoded = encode_utf7(to_folder.to_owned());
        let mut session = self.session()?;

        Self::select(&mut session, &from_folder_encoded)?;
        session.uid_copy(id, &to_folder_encoded).map_err(|err| {
            Error::CopyEmailError(
                err,
                id.to_owned(),
                from_folder.to_owned(),
                to_folder.to_owned(),
            )
        })?;

        Ok(())
    }

    fn add_flags(&self, folder: &str, id: &str, flags: &Flags) -> backend::Result<()> {
        debug!("adding flags {:?} to email {}", flags, id);

        let folder = encode_utf7(folder.to_owned());
        let mut session = self.session()?;

        Self::select(&mut session, &folder)?;
        session
            .uid_store(id, format!("+FLAGS ({})", flags.to_imap_query()))
            .map_err(|err| Error::AddFlagsError(err, flags.to_imap_query(), id.to_owned()))?;

        Ok(())
    }

    fn add_labels(&self, folder: &str, id: &str, labels: &[&str]) -> backend::Result<()> {
        debug!("adding labels {:?} to email {}", labels, id);

        let folder = encode_utf7(folder.to_owned());
        let labels = labels.join(" ");
        let mut session = self.session()?;

        Self::select(&mut session, &folder)?;
        session
            .uid_store(id, format!("+X-GM-LABELS ({})", labels))
            .map_err(|err| Error::AddLabelsError(err, labels, id.to_owned()))?;

        Ok(())
    }

    fn expunge(&self, folder: &str) -> backend::Result<()> {
        debug!("expunging folder {}", folder);

        let folder = encode_utf7(folder.to_owned());
        let mut session = self.session()?;

        Self::select(&mut session, &folder)?;
        session
            .expunge()
            .map_err(|err| Error::ExpungeError(err, folder.clone()))?;

        Ok(())
    }

    fn close(&self) -> backend::Result<()> {
        debug!("logging out from imap server");

        self.session()?.logout().map_err(Error::LogoutError)?;

        Ok(())
    }
}
