//! Bot configuration types.

use chrono::{NaiveDateTime, Timelike};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::Error;

/// Top-level bot configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BotConfig {
    /// Countdown target as a local ISO date-time, e.g. "2026-07-01T09:00:00".
    #[serde(default)]
    pub target_datetime: String,

    /// IANA time zone the countdown lives in.
    #[serde(default = "default_timezone")]
    pub timezone: String,

    /// Weather location latitude.
    #[serde(default)]
    pub latitude: f64,

    /// Weather location longitude.
    #[serde(default)]
    pub longitude: f64,

    /// OpenWeather One Call API key.
    #[serde(default)]
    pub openweather_api_key: String,

    /// Profile service connection settings.
    #[serde(default)]
    pub profile: ProfileConfig,

    /// Timing parameters (seconds).
    #[serde(default)]
    pub timing: TimingConfig,

    /// Retry parameters for outbound calls.
    #[serde(default)]
    pub retry: RetryConfig,

    /// Maximum profile text length in characters.
    #[serde(default = "default_bio_max_chars")]
    pub bio_max_chars: usize,

    /// Daily countdown reset hour (defaults to the target's own hour).
    #[serde(default)]
    pub reset_hour: Option<u32>,

    /// Daily countdown reset minute (defaults to the target's own minute).
    #[serde(default)]
    pub reset_minute: Option<u32>,
}

/// Profile service endpoint and credentials.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileConfig {
    /// Base URL of the profile account service.
    #[serde(default)]
    pub base_url: String,

    /// Bearer token for the profile session.
    #[serde(default)]
    pub auth_token: String,
}

/// Timing configuration (all values in seconds).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimingConfig {
    /// Refresh cycle interval.
    #[serde(default = "default_update_interval")]
    pub update_interval_secs: u64,

    /// Max age for a cached weather payload before refetching.
    #[serde(default = "default_weather_cache")]
    pub weather_cache_secs: u64,

    /// Per-request deadline for weather fetches.
    #[serde(default = "default_weather_timeout")]
    pub weather_timeout_secs: u64,

    /// Grace period for the transport disconnect on shutdown.
    #[serde(default = "default_shutdown_grace")]
    pub shutdown_grace_secs: u64,
}

/// Retry/backoff parameters for outbound calls.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Total invocation cap per operation, first try included.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Delay before the first retry (doubles each attempt).
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,

    /// Upper bound on the exponential delay.
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,

    /// Wall-clock budget across all attempts of one operation.
    #[serde(default = "default_max_total_ms")]
    pub max_total_ms: u64,
}

impl BotConfig {
    /// Countdown target parsed as a civil date-time (no zone attached).
    pub fn target_naive(&self) -> Result<NaiveDateTime, Error> {
        let raw = self.target_datetime.trim();
        raw.parse::<NaiveDateTime>()
            .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M"))
            .map_err(|_| {
                Error::Config(format!(
                    "target_datetime must be a local ISO date-time like 2026-07-01T09:00:00, got '{raw}'"
                ))
            })
    }

    /// Configured IANA time zone.
    pub fn tz(&self) -> Result<Tz, Error> {
        self.timezone.parse::<Tz>().map_err(|_| {
            Error::Config(format!(
                "timezone '{}' is not a known IANA zone name",
                self.timezone
            ))
        })
    }

    /// Daily reset time-of-day; falls back to the target's own hour and minute.
    pub fn reset_time(&self) -> Result<(u32, u32), Error> {
        let target = self.target_naive()?;
        let hour = self.reset_hour.unwrap_or_else(|| target.hour());
        let minute = self.reset_minute.unwrap_or_else(|| target.minute());
        if hour > 23 || minute > 59 {
            return Err(Error::Config(format!(
                "reset time {hour:02}:{minute:02} is out of range"
            )));
        }
        Ok((hour, minute))
    }
}

// ── Defaults ──────────────────────────────────────────────────────────

fn default_timezone() -> String {
    "Europe/Moscow".into()
}

fn default_bio_max_chars() -> usize {
    140
}

fn default_update_interval() -> u64 {
    3600
}
fn default_weather_cache() -> u64 {
    10800
}
fn default_weather_timeout() -> u64 {
    10
}
fn default_shutdown_grace() -> u64 {
    5
}

fn default_max_attempts() -> u32 {
    6
}
fn default_base_delay_ms() -> u64 {
    1500
}
fn default_max_delay_ms() -> u64 {
    45_000
}
fn default_max_total_ms() -> u64 {
    300_000
}

impl Default for ProfileConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            auth_token: String::new(),
        }
    }
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            update_interval_secs: default_update_interval(),
            weather_cache_secs: default_weather_cache(),
            weather_timeout_secs: default_weather_timeout(),
            shutdown_grace_secs: default_shutdown_grace(),
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            base_delay_ms: default_base_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            max_total_ms: default_max_total_ms(),
        }
    }
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            target_datetime: String::new(),
            timezone: default_timezone(),
            latitude: 0.0,
            longitude: 0.0,
            openweather_api_key: String::new(),
            profile: ProfileConfig::default(),
            timing: TimingConfig::default(),
            retry: RetryConfig::default(),
            bio_max_chars: default_bio_max_chars(),
            reset_hour: None,
            reset_minute: None,
        }
    }
}
