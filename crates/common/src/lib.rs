//! Shared types, settings, and error definitions for the Aareguru data layer.

pub mod config;
pub mod error;
pub mod types;

pub use config::Settings;
pub use error::Error;
pub use types::*;

/// Convenience Result alias.
pub type Result<T> = std::result::Result<T, Error>;
