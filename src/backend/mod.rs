mod backend;

#[cfg(feature = "imap-backend")]
pub mod imap;

pub use self::backend::{Backend, Error, Result};
#[cfg(feature = "imap-backend")]
pub use self::imap::{ImapBackend, ImapConfig};
