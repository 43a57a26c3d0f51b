//! Configuration loader — merges env vars, .env file, and config.toml.

use common::{BotConfig, Error};
use std::path::Path;

fn parse_f64(raw: &str, env_name: &str) -> Result<f64, Error> {
    raw.trim()
        .parse::<f64>()
        .map_err(|_| Error::Config(format!("{env_name} must be a number")))
}

fn parse_u64(raw: &str, env_name: &str) -> Result<u64, Error> {
    raw.trim()
        .parse::<u64>()
        .map_err(|_| Error::Config(format!("{env_name} must be an integer >= 0")))
}

fn parse_u32(raw: &str, env_name: &str) -> Result<u32, Error> {
    raw.trim()
        .parse::<u32>()
        .map_err(|_| Error::Config(format!("{env_name} must be an integer >= 0")))
}

fn parse_usize(raw: &str, env_name: &str) -> Result<usize, Error> {
    raw.trim()
        .parse::<usize>()
        .map_err(|_| Error::Config(format!("{env_name} must be an integer >= 0")))
}

fn validate_config(config: &BotConfig) -> Result<(), Error> {
    let mut issues: Vec<String> = Vec::new();

    if config.target_datetime.trim().is_empty() {
        issues.push("TARGET_DATETIME is required (set in .env or config.toml)".into());
    } else if config.target_naive().is_err() {
        issues.push(
            "TARGET_DATETIME must be a local ISO date-time like 2026-07-01T09:00:00".into(),
        );
    }
    if config.tz().is_err() {
        issues.push(format!(
            "timezone '{}' is not a known IANA zone name",
            config.timezone
        ));
    }
    if let Some(hour) = config.reset_hour {
        if hour > 23 {
            issues.push("reset_hour must be in 0..=23".into());
        }
    }
    if let Some(minute) = config.reset_minute {
        if minute > 59 {
            issues.push("reset_minute must be in 0..=59".into());
        }
    }

    if config.openweather_api_key.trim().is_empty() {
        issues.push("OPENWEATHER_API_KEY is required (set in .env or environment)".into());
    }
    if config.profile.base_url.trim().is_empty() {
        issues.push("PROFILE_BASE_URL is required (set in .env or environment)".into());
    }
    if config.profile.auth_token.trim().is_empty() {
        issues.push("PROFILE_AUTH_TOKEN is required (set in .env or environment)".into());
    }

    if !(-90.0..=90.0).contains(&config.latitude) {
        issues.push("latitude must be in [-90, 90]".into());
    }
    if !(-180.0..=180.0).contains(&config.longitude) {
        issues.push("longitude must be in [-180, 180]".into());
    }

    if config.timing.update_interval_secs == 0 {
        issues.push("timing.update_interval_secs must be > 0".into());
    }
    if config.timing.weather_timeout_secs == 0 {
        issues.push("timing.weather_timeout_secs must be > 0".into());
    }

    if config.retry.max_attempts == 0 {
        issues.push("retry.max_attempts must be >= 1".into());
    }
    if config.retry.base_delay_ms == 0 {
        issues.push("retry.base_delay_ms must be > 0".into());
    }
    if config.retry.max_delay_ms < config.retry.base_delay_ms {
        issues.push("retry.max_delay_ms must be >= retry.base_delay_ms".into());
    }
    if config.retry.max_total_ms == 0 {
        issues.push("retry.max_total_ms must be > 0".into());
    }

    if config.bio_max_chars == 0 {
        issues.push("bio_max_chars must be > 0".into());
    }

    if issues.is_empty() {
        Ok(())
    } else {
        Err(Error::Config(format!(
            "Invalid config:\n - {}",
            issues.join("\n - ")
        )))
    }
}

/// Load bot configuration from environment and optional config file.
pub fn load_config() -> Result<BotConfig, Error> {
    // 1. Load .env file from project root or parent directories.
    if let Err(e) = dotenvy::dotenv() {
        tracing::debug!("No .env file loaded: {}", e);
    }

    // 2. Start with defaults.
    let mut config = BotConfig::default();

    // 3. Try loading config.toml if it exists.
    let config_path = Path::new("config.toml");
    if config_path.exists() {
        let contents = std::fs::read_to_string(config_path)
            .map_err(|e| Error::Config(format!("Failed to read config.toml: {}", e)))?;
        config = toml::from_str(&contents)
            .map_err(|e| Error::Config(format!("Failed to parse config.toml: {}", e)))?;
    }

    // 4. Override with environment variables (highest priority).
    if let Ok(raw) = std::env::var("TARGET_DATETIME") {
        config.target_datetime = raw;
    }
    if let Ok(raw) = std::env::var("TZ_OVERRIDE") {
        config.timezone = raw;
    }
    if let Ok(raw) = std::env::var("LAT") {
        config.latitude = parse_f64(&raw, "LAT")?;
    }
    if let Ok(raw) = std::env::var("LON") {
        config.longitude = parse_f64(&raw, "LON")?;
    }
    if let Ok(raw) = std::env::var("OPENWEATHER_API_KEY") {
        config.openweather_api_key = raw;
    }
    if let Ok(raw) = std::env::var("PROFILE_BASE_URL") {
        config.profile.base_url = raw;
    }
    if let Ok(raw) = std::env::var("PROFILE_AUTH_TOKEN") {
        config.profile.auth_token = raw;
    }
    if let Ok(raw) = std::env::var("UPDATE_INTERVAL_SECS") {
        config.timing.update_interval_secs = parse_u64(&raw, "UPDATE_INTERVAL_SECS")?;
    }
    if let Ok(raw) = std::env::var("WEATHER_CACHE_SECS") {
        config.timing.weather_cache_secs = parse_u64(&raw, "WEATHER_CACHE_SECS")?;
    }
    if let Ok(raw) = std::env::var("WEATHER_TIMEOUT_SECS") {
        config.timing.weather_timeout_secs = parse_u64(&raw, "WEATHER_TIMEOUT_SECS")?;
    }
    if let Ok(raw) = std::env::var("SHUTDOWN_GRACE_SECS") {
        config.timing.shutdown_grace_secs = parse_u64(&raw, "SHUTDOWN_GRACE_SECS")?;
    }
    if let Ok(raw) = std::env::var("BIO_MAX_CHARS") {
        config.bio_max_chars = parse_usize(&raw, "BIO_MAX_CHARS")?;
    }
    if let Ok(raw) = std::env::var("RESET_HOUR") {
        config.reset_hour = Some(parse_u32(&raw, "RESET_HOUR")?);
    }
    if let Ok(raw) = std::env::var("RESET_MINUTE") {
        config.reset_minute = Some(parse_u32(&raw, "RESET_MINUTE")?);
    }
    if let Ok(raw) = std::env::var("RETRY_MAX_ATTEMPTS") {
        config.retry.max_attempts = parse_u32(&raw, "RETRY_MAX_ATTEMPTS")?;
    }
    if let Ok(raw) = std::env::var("RETRY_BASE_DELAY_MS") {
        config.retry.base_delay_ms = parse_u64(&raw, "RETRY_BASE_DELAY_MS")?;
    }
    if let Ok(raw) = std::env::var("RETRY_MAX_DELAY_MS") {
        config.retry.max_delay_ms = parse_u64(&raw, "RETRY_MAX_DELAY_MS")?;
    }
    if let Ok(raw) = std::env::var("RETRY_MAX_TOTAL_MS") {
        config.retry.max_total_ms = parse_u64(&raw, "RETRY_MAX_TOTAL_MS")?;
    }

    // 5. Validate.
    validate_config(&config)?;

    Ok(config)
}
