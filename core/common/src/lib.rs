//! Common utilities and types shared across Stowage crates.
//!
//! This crate holds the error taxonomy every backend reports through and the
//! credential types passed into backend configuration.

pub mod error;
pub mod types;

pub use error::{Error, Result};
pub use types::{Credentials, SecretString};
