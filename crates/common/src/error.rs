//! Unified error type for the bio-bot.

use std::time::Duration;

use thiserror::Error;

/// Coarse failure classification used for retry eligibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// May clear on its own; worth another attempt.
    Transient,
    /// Will not improve without operator intervention.
    Permanent,
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("HTTP request failed: {0}")]
    Http(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Weather API error (status={status}): {message}")]
    WeatherApi { status: u16, message: String },

    #[error("Profile API error (status={status}): {message}")]
    ProfileApi { status: u16, message: String },

    #[error("Rate limited — retry after {retry_after:?}")]
    RateLimited { retry_after: Duration },

    #[error("Malformed response: {0}")]
    Malformed(String),

    #[error("Forecast response contained no hourly entries")]
    EmptyForecast,

    #[error("Profile transport not connected")]
    NotConnected,

    #[error("Config error: {0}")]
    Config(String),
}

impl Error {
    /// Classify the failure for retry decisions.
    ///
    /// Anything network-shaped counts as transient, as do 5xx statuses
    /// and rate limits. Client-side statuses, parse failures, and empty
    /// payloads do not: the same request would fail the same way.
    pub fn class(&self) -> ErrorClass {
        match self {
            Error::Http(_)
            | Error::Timeout(_)
            | Error::RateLimited { .. }
            | Error::NotConnected => ErrorClass::Transient,
            Error::WeatherApi { status, .. } | Error::ProfileApi { status, .. } => {
                if *status >= 500 {
                    ErrorClass::Transient
                } else {
                    ErrorClass::Permanent
                }
            }
            Error::Malformed(_) | Error::EmptyForecast | Error::Config(_) => ErrorClass::Permanent,
        }
    }

    /// True when another attempt has a chance of succeeding.
    pub fn is_transient(&self) -> bool {
        self.class() == ErrorClass::Transient
    }

    /// Minimum wait suggested by the upstream service, if it gave one.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Error::RateLimited { retry_after } => Some(*retry_after),
            _ => None,
        }
    }
}
