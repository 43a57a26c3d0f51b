//! HTTP transport for the profile service.
//!
//! Wraps the two calls the bot needs (session check and about-text
//! update) behind [`ProfileTransport`] so tests can swap in fakes, and
//! translates rate-limit responses into typed retry hints.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use common::{Error, Result};
use tracing::debug;

/// Connection-oriented profile backend.
///
/// Implementations are safe to call repeatedly; `connect` on an already
/// connected transport revalidates the session instead of failing.
#[async_trait]
pub trait ProfileTransport: Send + Sync {
    async fn connect(&self) -> Result<()>;
    fn is_connected(&self) -> bool;
    async fn set_profile_text(&self, text: &str) -> Result<()>;
    async fn disconnect(&self) -> Result<()>;
}

/// Bearer-token REST client for the profile service.
pub struct HttpProfileClient {
    client: reqwest::Client,
    base_url: String,
    auth_token: String,
    connected: AtomicBool,
}

impl HttpProfileClient {
    pub fn new(base_url: &str, auth_token: &str) -> Self {
        let client = reqwest::Client::builder()
            .user_agent("bio-bot/0.1")
            .pool_max_idle_per_host(2)
            .timeout(Duration::from_secs(30))
            .build()
            .expect("failed to build profile HTTP client");

        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            auth_token: auth_token.to_string(),
            connected: AtomicBool::new(false),
        }
    }

    /// Map a non-success response to an error, preferring the explicit
    /// `FLOOD_WAIT_<n>` marker over the Retry-After header.
    async fn error_for(response: reqwest::Response) -> Error {
        let status = response.status().as_u16();
        let header_hint = response
            .headers()
            .get("retry-after")
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.parse::<u64>().ok())
            .map(Duration::from_secs);
        let body = response.text().await.unwrap_or_default();

        if let Some(wait) = parse_flood_wait(&body) {
            return Error::RateLimited { retry_after: wait };
        }
        if status == 429 {
            return Error::RateLimited {
                retry_after: header_hint.unwrap_or(Duration::from_secs(1)),
            };
        }
        Error::ProfileApi {
            status,
            message: body.chars().take(500).collect(),
        }
    }
}

#[async_trait]
impl ProfileTransport for HttpProfileClient {
    async fn connect(&self) -> Result<()> {
        let url = format!("{}/v1/me", self.base_url);
        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.auth_token)
            .send()
            .await
            .map_err(|err| {
                self.connected.store(false, Ordering::SeqCst);
                classify_reqwest(err)
            })?;

        if response.status().is_success() {
            self.connected.store(true, Ordering::SeqCst);
            debug!("✅ Profile session verified");
            return Ok(());
        }

        self.connected.store(false, Ordering::SeqCst);
        Err(Self::error_for(response).await)
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    async fn set_profile_text(&self, text: &str) -> Result<()> {
        if !self.is_connected() {
            return Err(Error::NotConnected);
        }

        let url = format!("{}/v1/profile", self.base_url);
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.auth_token)
            .json(&serde_json::json!({ "about": text }))
            .send()
            .await
            .map_err(|err| {
                if err.is_connect() || err.is_timeout() {
                    self.connected.store(false, Ordering::SeqCst);
                }
                classify_reqwest(err)
            })?;

        if !response.status().is_success() {
            return Err(Self::error_for(response).await);
        }

        debug!("Profile text accepted ({} chars)", text.chars().count());
        Ok(())
    }

    async fn disconnect(&self) -> Result<()> {
        self.connected.store(false, Ordering::SeqCst);
        Ok(())
    }
}

fn classify_reqwest(err: reqwest::Error) -> Error {
    if err.is_timeout() {
        Error::Timeout(format!("profile request: {err}"))
    } else {
        Error::Http(format!("profile request: {err}"))
    }
}

/// Extracts the wait from a `FLOOD_WAIT_<seconds>` marker anywhere in
/// the body.
pub fn parse_flood_wait(body: &str) -> Option<Duration> {
    let idx = body.find("FLOOD_WAIT_")?;
    let digits: String = body[idx + "FLOOD_WAIT_".len()..]
        .chars()
        .take_while(char::is_ascii_digit)
        .collect();
    if digits.is_empty() {
        return None;
    }
    digits.parse::<u64>().ok().map(Duration::from_secs)
}
