//! Shared config and error definitions for the bio-bot.

pub mod config;
pub mod error;

pub use config::BotConfig;
pub use error::{Error, ErrorClass};

/// Convenience Result alias.
pub type Result<T> = std::result::Result<T, Error>;
