//! OpenWeather One Call client with a stale-tolerant cache.
//!
//! Fetches the hourly forecast and renders the hour nearest to now as a
//! compact summary like "☀️22°C". The last good summary is kept as a
//! fallback so a broken feed degrades to stale data instead of an error.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::Utc;
use common::{Error, Result};
use retry::{run_with_retries, RetryHooks, RetryPolicy};
use serde::Deserialize;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

const DEFAULT_BASE_URL: &str = "https://api.openweathermap.org";
const EXCLUDE_BLOCKS: &str = "current,minutely,daily,alerts";
const UNKNOWN_SUMMARY: &str = "🌍?";

/// Coordinates, credentials and cache tuning for the weather feed.
#[derive(Debug, Clone)]
pub struct WeatherConfig {
    pub latitude: f64,
    pub longitude: f64,
    pub api_key: String,
    pub cache_ttl: Duration,
    pub request_timeout: Duration,
}

/// One Call API response, trimmed to the hourly block.
#[derive(Debug, Deserialize)]
pub struct OneCallResponse {
    #[serde(default)]
    pub hourly: Vec<HourlyForecast>,
}

/// Forecast for a single hour.
#[derive(Debug, Clone, Deserialize)]
pub struct HourlyForecast {
    pub dt: i64,
    pub temp: f64,
    #[serde(default)]
    pub weather: Vec<ConditionTag>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ConditionTag {
    pub main: String,
}

#[derive(Debug, Default)]
struct CacheState {
    fetched_at: Option<Instant>,
    hourly: Vec<HourlyForecast>,
    fallback: Option<String>,
}

impl CacheState {
    fn is_fresh(&self, ttl: Duration) -> bool {
        !self.hourly.is_empty()
            && self
                .fetched_at
                .map(|at| at.elapsed() < ttl)
                .unwrap_or(false)
    }
}

/// Retries network and server-side failures, gives up on payload and
/// client-side ones.
struct TransientOnly;

#[async_trait]
impl RetryHooks<Error> for TransientOnly {
    fn should_retry(&mut self, err: &Error, _attempt: u32) -> bool {
        err.is_transient()
    }
}

/// Cached OpenWeather client.
#[derive(Debug)]
pub struct WeatherService {
    client: reqwest::Client,
    config: WeatherConfig,
    policy: RetryPolicy,
    base_url: String,
    state: Mutex<CacheState>,
}

impl WeatherService {
    pub fn new(config: WeatherConfig, policy: RetryPolicy) -> Self {
        Self::new_with_base_url(config, policy, DEFAULT_BASE_URL)
    }

    pub fn new_with_base_url(
        config: WeatherConfig,
        policy: RetryPolicy,
        base_url: impl Into<String>,
    ) -> Self {
        let base_url: String = base_url.into();
        let client = reqwest::Client::builder()
            .user_agent("bio-bot/0.1")
            .pool_max_idle_per_host(2)
            .timeout(Duration::from_secs(30))
            .build()
            .expect("failed to build weather HTTP client");

        Self {
            client,
            config,
            policy,
            base_url: base_url.trim_end_matches('/').to_string(),
            state: Mutex::new(CacheState::default()),
        }
    }

    /// Summary for the hour nearest to now, fetching or reusing the cache
    /// as freshness allows.
    ///
    /// The cache lock is held across the fetch, so concurrent callers
    /// cannot stampede the upstream API.
    pub async fn current_summary(&self) -> Result<String> {
        let mut state = self.state.lock().await;

        if state.is_fresh(self.config.cache_ttl) {
            let now = Utc::now().timestamp();
            let out = match pick_nearest(&state.hourly, now) {
                Some(hour) => render_entry(hour),
                None => state
                    .fallback
                    .clone()
                    .unwrap_or_else(|| UNKNOWN_SUMMARY.to_string()),
            };
            debug!("♻️  Weather served from cache: {out}");
            return Ok(out);
        }

        let mut hooks = TransientOnly;
        let fetched = run_with_retries("weather fetch", &self.policy, &mut hooks, move || {
            self.fetch_once()
        })
        .await;

        match fetched {
            Ok(hourly) if !hourly.is_empty() => {
                state.fetched_at = Some(Instant::now());
                state.hourly = hourly;

                let now = Utc::now().timestamp();
                let summary = match pick_nearest(&state.hourly, now) {
                    Some(hour) => render_entry(hour),
                    None => UNKNOWN_SUMMARY.to_string(),
                };
                state.fallback = Some(summary.clone());
                info!("✅ Weather refreshed: {summary}");
                Ok(summary)
            }
            Ok(_) => match state.fallback.clone() {
                Some(previous) => {
                    warn!("⚠️ Weather feed returned no hourly rows, using fallback: {previous}");
                    Ok(previous)
                }
                None => Err(Error::EmptyForecast),
            },
            Err(err) => match state.fallback.clone() {
                Some(previous) => {
                    warn!("⚠️ Weather fetch failed ({err}), using fallback: {previous}");
                    Ok(previous)
                }
                None => Err(err),
            },
        }
    }

    async fn fetch_once(&self) -> Result<Vec<HourlyForecast>> {
        let url = format!("{}/data/3.0/onecall", self.base_url);
        debug!(
            "📡 Requesting hourly forecast: {}?lat={}&lon={}&appid=***",
            url, self.config.latitude, self.config.longitude
        );

        let response = self
            .client
            .get(&url)
            .query(&[
                ("lat", self.config.latitude.to_string()),
                ("lon", self.config.longitude.to_string()),
                ("exclude", EXCLUDE_BLOCKS.to_string()),
                ("appid", self.config.api_key.clone()),
                ("units", "metric".to_string()),
                ("lang", "ru".to_string()),
            ])
            .timeout(self.config.request_timeout)
            .send()
            .await
            .map_err(classify_reqwest)?;

        let status = response.status();
        debug!("📡 Weather API status: {status}");

        if status.as_u16() == 429 {
            return Err(Error::RateLimited {
                retry_after: Duration::from_secs(1),
            });
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::WeatherApi {
                status: status.as_u16(),
                message: body.chars().take(500).collect(),
            });
        }

        let payload: OneCallResponse = response
            .json()
            .await
            .map_err(|err| Error::Malformed(format!("weather payload: {err}")))?;
        Ok(payload.hourly)
    }
}

fn classify_reqwest(err: reqwest::Error) -> Error {
    if err.is_timeout() {
        Error::Timeout(format!("weather request: {err}"))
    } else {
        Error::Http(format!("weather request: {err}"))
    }
}

/// Forecast row with the smallest |dt - now|; earlier rows win ties.
fn pick_nearest(hourly: &[HourlyForecast], now_unix: i64) -> Option<&HourlyForecast> {
    hourly.iter().min_by_key(|hour| (hour.dt - now_unix).abs())
}

fn render_entry(hour: &HourlyForecast) -> String {
    let main = hour.weather.first().map(|tag| tag.main.as_str());
    format!("{}{}°C", condition_emoji(main), round_half_up(hour.temp))
}

fn condition_emoji(main: Option<&str>) -> &'static str {
    match main.unwrap_or("") {
        "Thunderstorm" => "⛈️",
        "Drizzle" => "🌧️",
        "Rain" => "🌦️",
        "Snow" => "❄️",
        "Clear" => "☀️",
        "Clouds" => "☁️",
        "Mist" | "Fog" | "Haze" => "🌫️",
        "Dust" | "Smoke" | "Sand" => "💨",
        "Squall" => "🌬️",
        "Tornado" => "🌪️",
        _ => "🌤️",
    }
}

fn round_half_up(value: f64) -> i64 {
    (value + 0.5).floor() as i64
}
