//! Disposition module.
//!
//! This module decides what happens to an email once it has been
//! classified, and applies it through the backend.

mod disposition;
pub use disposition::*;

mod engine;
pub use engine::*;
