//! Rule module.
//!
//! This module contains the mapping rules and the matcher selecting
//! the rule applied to an email.

mod rule;
pub use rule::*;
