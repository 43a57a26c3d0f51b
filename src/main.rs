//! Bio-bot: vacation countdown in a profile status line.
//!
//! Single-binary Tokio application that:
//! 1. Loads configuration from .env, config.toml and the environment
//! 2. Builds the cached weather service
//! 3. Connects the profile transport
//! 4. Pushes a fresh bio immediately, then on every interval tick
//! 5. Disconnects cleanly on Ctrl+C or SIGTERM

mod bot;
mod config;

use std::time::Duration;

use clap::Parser;
use tracing::{error, info};

use bot::Bot;
use profile_client::{HttpProfileClient, ProfileTransport};
use weather_client::{WeatherConfig, WeatherService};

/// Vacation countdown bio updater
#[derive(Parser)]
#[command(name = "bio-bot", about = "Vacation countdown bio updater")]
struct Cli {
    /// Compose and print the bio without connecting to the profile service.
    #[arg(long)]
    dry_run: bool,

    /// Run a single refresh cycle, then exit.
    #[arg(long)]
    once: bool,

    /// Just verify profile credentials, then exit.
    #[arg(long)]
    check_transport: bool,
}

#[tokio::main]
async fn main() {
    // Initialize logging.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "bio_bot=info,weather_client=info,profile_client=info,retry=info".into()
            }),
        )
        .with_target(true)
        .init();

    let cli = Cli::parse();

    info!("🏝️  Bio Bot starting up...");

    // Load configuration.
    let cfg = match config::load_config() {
        Ok(c) => c,
        Err(e) => {
            error!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };

    info!("Target: {} ({})", cfg.target_datetime, cfg.timezone);
    info!(
        "Weather location: lat={} lon={}",
        cfg.latitude, cfg.longitude
    );
    info!(
        "Timing: update={}s, weather_cache={}s, weather_timeout={}s",
        cfg.timing.update_interval_secs,
        cfg.timing.weather_cache_secs,
        cfg.timing.weather_timeout_secs,
    );
    info!(
        "Retry: attempts={}, base={}ms, cap={}ms, budget={}ms",
        cfg.retry.max_attempts,
        cfg.retry.base_delay_ms,
        cfg.retry.max_delay_ms,
        cfg.retry.max_total_ms,
    );

    let policy = bot::retry_policy_from(&cfg);
    let weather = WeatherService::new(
        WeatherConfig {
            latitude: cfg.latitude,
            longitude: cfg.longitude,
            api_key: cfg.openweather_api_key.clone(),
            cache_ttl: Duration::from_secs(cfg.timing.weather_cache_secs),
            request_timeout: Duration::from_secs(cfg.timing.weather_timeout_secs),
        },
        policy,
    );

    // ── Dry-run mode ─────────────────────────────────────────────────
    if cli.dry_run {
        match bot::compose_preview(&cfg, &weather).await {
            Ok(bio) => info!("Dry-run bio ({} chars): {}", bio.chars().count(), bio),
            Err(e) => {
                error!("Dry-run failed: {}", e);
                std::process::exit(1);
            }
        }
        return;
    }

    let transport = HttpProfileClient::new(&cfg.profile.base_url, &cfg.profile.auth_token);

    // ── Check-transport mode ─────────────────────────────────────────
    if cli.check_transport {
        info!("Running transport check...");
        match transport.connect().await {
            Ok(()) => info!("✅ Profile session verified"),
            Err(e) => {
                error!("❌ Transport check failed: {}", e);
                std::process::exit(1);
            }
        }
        return;
    }

    let mut bot = match Bot::new(cfg, weather, transport).await {
        Ok(b) => b,
        Err(e) => {
            error!("Startup failed: {}", e);
            std::process::exit(1);
        }
    };

    // ── Single-shot mode ─────────────────────────────────────────────
    if cli.once {
        let outcome = bot.run_once().await;
        bot.shutdown().await;
        if let Err(e) = outcome {
            error!("❌ Refresh failed: {}", e);
            std::process::exit(1);
        }
        return;
    }

    info!("🚀 Bio Bot is running. Press Ctrl+C to stop.");

    // ── Wait for shutdown ────────────────────────────────────────────
    tokio::select! {
        _ = bot.run() => {
            error!("Refresh loop exited unexpectedly");
        }
        _ = shutdown_signal() => {
            info!("Shutdown signal received");
        }
    }

    bot.shutdown().await;
    info!("Bio Bot shut down.");
}

/// Resolves on Ctrl+C, or on SIGTERM where the platform has one.
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {}
                    _ = term.recv() => {}
                }
            }
            Err(_) => {
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
