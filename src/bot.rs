//! Refresh engine: composes the bio line and pushes it on a fixed cadence.

use std::time::Duration;

use async_trait::async_trait;
use chrono::DateTime;
use chrono_tz::Tz;
use tokio::time::{interval, sleep, timeout, MissedTickBehavior};
use tracing::{info, warn};

use clock::Clock;
use common::{BotConfig, Error, Result};
use countdown::{Catalog, MessageGenerator};
use profile_client::ProfileTransport;
use retry::{run_with_retries, NoHooks, RetryHooks, RetryOverrides, RetryPolicy};
use weather_client::WeatherService;

/// Translate config retry knobs into a [`RetryPolicy`].
pub fn retry_policy_from(config: &BotConfig) -> RetryPolicy {
    RetryPolicy {
        max_attempts: config.retry.max_attempts.max(1),
        base_delay: Duration::from_millis(config.retry.base_delay_ms),
        max_delay: Duration::from_millis(config.retry.max_delay_ms),
        max_total_elapsed: Duration::from_millis(config.retry.max_total_ms),
    }
}

/// Retry hooks for profile pushes: skip permanent errors, honour server
/// rate-limit hints, and reconnect a dropped session before the next try.
struct TransportHooks<'a, T: ProfileTransport> {
    transport: &'a T,
}

#[async_trait]
impl<T: ProfileTransport> RetryHooks<Error> for TransportHooks<'_, T> {
    fn should_retry(&mut self, err: &Error, _attempt: u32) -> bool {
        err.is_transient()
    }

    async fn before_retry(&mut self, err: &Error, attempt: u32) {
        if let Some(wait) = err.retry_after() {
            info!(
                "⏳ Rate limited, honouring server hint of {:?} before attempt {}",
                wait,
                attempt + 2
            );
            sleep(wait).await;
        }
        if !self.transport.is_connected() {
            if let Err(reconnect_err) = self.transport.connect().await {
                warn!("Reconnect before retry failed: {reconnect_err}");
            }
        }
    }
}

/// Periodic bio updater. Owns the weather cache and the profile transport,
/// recomputes the countdown phrase each cycle, and survives transient
/// failures without exiting the loop.
pub struct Bot<T: ProfileTransport> {
    config: BotConfig,
    clock: Clock,
    target: DateTime<Tz>,
    reset_hour: u32,
    reset_minute: u32,
    generator: MessageGenerator,
    weather: WeatherService,
    transport: T,
    push_policy: RetryPolicy,
    countdown_base: DateTime<Tz>,
}

impl<T: ProfileTransport> Bot<T> {
    /// Connects the transport (with retries) and fixes the initial
    /// countdown base from the current wall clock.
    pub async fn new(config: BotConfig, weather: WeatherService, transport: T) -> Result<Self> {
        let clock = Clock::new(config.tz()?);
        let target = clock.resolve_local(config.target_naive()?);
        let (reset_hour, reset_minute) = config.reset_time()?;
        let push_policy = retry_policy_from(&config);

        let connect_policy = push_policy.with_overrides(&RetryOverrides {
            max_attempts: Some(4),
            base_delay: Some(Duration::from_secs(2)),
            max_delay: Some(Duration::from_secs(20)),
            ..RetryOverrides::default()
        });
        let mut hooks = TransportHooks {
            transport: &transport,
        };
        run_with_retries("profile connect", &connect_policy, &mut hooks, || {
            transport.connect()
        })
        .await?;
        info!("✅ Profile transport connected");

        let countdown_base = clock.effective_base(clock.now(), reset_hour, reset_minute);
        info!("Countdown base: {}", clock.format_stamp(&countdown_base));

        Ok(Self {
            config,
            clock,
            target,
            reset_hour,
            reset_minute,
            generator: MessageGenerator::new(Catalog::default()),
            weather,
            transport,
            push_policy,
            countdown_base,
        })
    }

    async fn ensure_connected(&self) -> Result<()> {
        if self.transport.is_connected() {
            return Ok(());
        }
        info!("🔌 Transport disconnected, reconnecting...");
        let policy = self.push_policy.with_overrides(&RetryOverrides {
            max_attempts: Some(6),
            base_delay: Some(Duration::from_millis(1500)),
            max_delay: Some(Duration::from_secs(30)),
            ..RetryOverrides::default()
        });
        run_with_retries("transport reconnect", &policy, &mut NoHooks, || {
            self.transport.connect()
        })
        .await?;
        info!("✅ Transport reconnected");
        Ok(())
    }

    async fn push_bio(&self, bio: &str) -> Result<()> {
        let mut hooks = TransportHooks {
            transport: &self.transport,
        };
        run_with_retries("profile push", &self.push_policy, &mut hooks, move || {
            async move {
                self.ensure_connected().await?;
                self.transport.set_profile_text(bio).await
            }
        })
        .await
    }

    /// Advance the countdown base when a reset boundary has passed.
    /// The base only moves forward; a clock stepped backwards keeps the
    /// last adopted base.
    fn roll_base(&mut self, now: DateTime<Tz>) {
        let candidate = self
            .clock
            .effective_base(now, self.reset_hour, self.reset_minute);
        if candidate > self.countdown_base {
            info!(
                "🔄 Countdown base rolled over: {} -> {}",
                self.clock.format_stamp(&self.countdown_base),
                self.clock.format_stamp(&candidate)
            );
            self.countdown_base = candidate;
        }
    }

    /// Build the bio line for the current instant without pushing it.
    pub async fn compose_once(&mut self) -> Result<String> {
        self.roll_base(self.clock.now());
        let phrase = self.generator.generate(self.target, self.countdown_base);
        let summary = self.weather.current_summary().await?;
        Ok(compose_bio(&phrase, &summary, self.config.bio_max_chars))
    }

    /// One full refresh cycle: compose and push.
    pub async fn run_once(&mut self) -> Result<()> {
        let bio = self.compose_once().await?;
        info!("Pushing bio ({} chars): {}", bio.chars().count(), bio);
        self.push_bio(&bio).await?;
        info!("✅ Bio updated");
        Ok(())
    }

    /// Refresh loop. The first cycle runs immediately, then every
    /// `update_interval_secs`. A failed cycle is logged and the loop
    /// keeps going; it never exits on its own.
    pub async fn run(&mut self) {
        let mut ticker = interval(Duration::from_secs(self.config.timing.update_interval_secs));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            if let Err(err) = self.run_once().await {
                warn!("Refresh cycle failed: {err}");
            }
        }
    }

    /// Best-effort disconnect, bounded by the shutdown grace period.
    pub async fn shutdown(&self) {
        let grace = Duration::from_secs(self.config.timing.shutdown_grace_secs);
        match timeout(grace, self.transport.disconnect()).await {
            Ok(Ok(())) => info!("Transport disconnected"),
            Ok(Err(err)) => warn!("Disconnect failed: {err}"),
            Err(_) => warn!("Disconnect timed out after {grace:?}"),
        }
    }
}

/// Build the bio line without touching the profile transport. Backs the
/// `--dry-run` flag so operators can eyeball output before going live.
pub async fn compose_preview(config: &BotConfig, weather: &WeatherService) -> Result<String> {
    let clock = Clock::new(config.tz()?);
    let target = clock.resolve_local(config.target_naive()?);
    let (reset_hour, reset_minute) = config.reset_time()?;
    let base = clock.effective_base(clock.now(), reset_hour, reset_minute);
    let generator = MessageGenerator::new(Catalog::default());
    let phrase = generator.generate(target, base);
    let summary = weather.current_summary().await?;
    Ok(compose_bio(&phrase, &summary, config.bio_max_chars))
}

/// Join phrase and weather summary into one line of at most `max_chars`
/// scalar values. The weather suffix is kept whole; the phrase absorbs
/// the cut.
pub fn compose_bio(phrase: &str, weather: &str, max_chars: usize) -> String {
    let suffix = format!(" | {weather}");
    let full = format!("{phrase}{suffix}");
    if full.chars().count() <= max_chars {
        return full;
    }
    let budget = max_chars.saturating_sub(suffix.chars().count());
    format!("{}{suffix}", truncate_with_ellipsis(phrase, budget))
}

fn truncate_with_ellipsis(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    if max_chars == 0 {
        return String::new();
    }
    let mut cut: String = text.chars().take(max_chars - 1).collect();
    cut.push('…');
    cut
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use weather_client::WeatherConfig;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    struct FlakyTransport {
        connected: AtomicBool,
        set_calls: AtomicUsize,
        failures_left: AtomicUsize,
        permanent: bool,
    }

    impl FlakyTransport {
        fn new(failures: usize, permanent: bool) -> Self {
            Self {
                connected: AtomicBool::new(false),
                set_calls: AtomicUsize::new(0),
                failures_left: AtomicUsize::new(failures),
                permanent,
            }
        }
    }

    #[async_trait]
    impl ProfileTransport for FlakyTransport {
        async fn connect(&self) -> Result<()> {
            self.connected.store(true, Ordering::SeqCst);
            Ok(())
        }

        fn is_connected(&self) -> bool {
            self.connected.load(Ordering::SeqCst)
        }

        async fn set_profile_text(&self, _text: &str) -> Result<()> {
            self.set_calls.fetch_add(1, Ordering::SeqCst);
            if self.permanent {
                return Err(Error::ProfileApi {
                    status: 400,
                    message: "about too long".into(),
                });
            }
            if self.failures_left.load(Ordering::SeqCst) > 0 {
                self.failures_left.fetch_sub(1, Ordering::SeqCst);
                return Err(Error::Http("connection reset by peer".into()));
            }
            Ok(())
        }

        async fn disconnect(&self) -> Result<()> {
            self.connected.store(false, Ordering::SeqCst);
            Ok(())
        }
    }

    fn test_config() -> BotConfig {
        let mut config = BotConfig::default();
        config.target_datetime = "2099-06-10T09:00".into();
        config.openweather_api_key = "test-key".into();
        config.profile.base_url = "http://127.0.0.1:9".into();
        config.profile.auth_token = "token".into();
        config.latitude = 12.93;
        config.longitude = 100.88;
        config.retry.max_attempts = 4;
        config.retry.base_delay_ms = 1;
        config.retry.max_delay_ms = 5;
        config.retry.max_total_ms = 60_000;
        config
    }

    fn weather_for(config: &BotConfig, base_url: &str) -> WeatherService {
        let weather_config = WeatherConfig {
            latitude: config.latitude,
            longitude: config.longitude,
            api_key: config.openweather_api_key.clone(),
            cache_ttl: Duration::from_secs(config.timing.weather_cache_secs),
            request_timeout: Duration::from_secs(config.timing.weather_timeout_secs),
        };
        WeatherService::new_with_base_url(weather_config, retry_policy_from(config), base_url)
    }

    async fn mount_weather(server: &MockServer) {
        let now = chrono::Utc::now().timestamp();
        Mock::given(method("GET"))
            .and(path("/data/3.0/onecall"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "hourly": [
                    { "dt": now, "temp": 21.6, "weather": [{ "main": "Clear" }] }
                ]
            })))
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn test_run_once_retries_transient_push_failures() {
        let server = MockServer::start().await;
        mount_weather(&server).await;

        let config = test_config();
        let weather = weather_for(&config, &server.uri());
        let mut bot = Bot::new(config, weather, FlakyTransport::new(2, false))
            .await
            .expect("connect");

        bot.run_once().await.expect("push succeeds after retries");
        assert_eq!(bot.transport.set_calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_run_once_gives_up_on_permanent_error() {
        let server = MockServer::start().await;
        mount_weather(&server).await;

        let config = test_config();
        let weather = weather_for(&config, &server.uri());
        let mut bot = Bot::new(config, weather, FlakyTransport::new(99, true))
            .await
            .expect("connect");

        let err = bot.run_once().await.expect_err("permanent error");
        assert!(matches!(err, Error::ProfileApi { status: 400, .. }));
        assert_eq!(bot.transport.set_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_compose_once_joins_phrase_and_weather() {
        let server = MockServer::start().await;
        mount_weather(&server).await;

        let config = test_config();
        let weather = weather_for(&config, &server.uri());
        let mut bot = Bot::new(config, weather, FlakyTransport::new(0, false))
            .await
            .expect("connect");

        let bio = bot.compose_once().await.expect("compose");
        assert!(bio.ends_with(" | ☀️22°C"), "got: {bio}");
        assert!(bio.chars().count() <= 140);
    }

    #[tokio::test]
    async fn test_countdown_base_never_rolls_backwards() {
        let config = test_config();
        let weather = weather_for(&config, "http://127.0.0.1:9");
        let mut bot = Bot::new(config, weather, FlakyTransport::new(0, false))
            .await
            .expect("connect");

        let initial = bot.countdown_base;
        bot.roll_base(initial - chrono::Duration::days(2));
        assert_eq!(bot.countdown_base, initial);
    }

    #[tokio::test]
    async fn test_shutdown_disconnects_transport() {
        let config = test_config();
        let weather = weather_for(&config, "http://127.0.0.1:9");
        let bot = Bot::new(config, weather, FlakyTransport::new(0, false))
            .await
            .expect("connect");

        assert!(bot.transport.is_connected());
        bot.shutdown().await;
        assert!(!bot.transport.is_connected());
    }

    #[test]
    fn test_compose_bio_fits_untouched() {
        let bio = compose_bio("Скоро отпуск!", "☀️21°C", 140);
        assert_eq!(bio, "Скоро отпуск! | ☀️21°C");
    }

    #[test]
    fn test_compose_bio_trims_phrase_not_weather() {
        let phrase = "x".repeat(200);
        let bio = compose_bio(&phrase, "☀️21°C", 140);

        assert_eq!(bio.chars().count(), 140);
        assert!(bio.ends_with(" | ☀️21°C"));
        let suffix_chars = " | ☀️21°C".chars().count();
        let cut_end = bio.chars().nth(140 - suffix_chars - 1);
        assert_eq!(cut_end, Some('…'));
    }

    #[test]
    fn test_compose_bio_counts_scalars_not_bytes() {
        let phrase = "я".repeat(150);
        let bio = compose_bio(&phrase, "❄️-5°C", 100);

        assert_eq!(bio.chars().count(), 100);
        assert!(bio.len() > 100);
        assert!(bio.starts_with("яяя"));
        assert!(bio.ends_with(" | ❄️-5°C"));
    }
}
