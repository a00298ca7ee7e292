//! Email module.
//!
//! This module contains the representation of a fetched email and
//! the helpers used to walk its MIME tree.

mod addr;
pub use addr::normalize_addr;

pub mod email;
pub use email::{is_multipart, Email, Error, ParsedEmail, Result};

mod parts;
pub use parts::PartsIterator;
