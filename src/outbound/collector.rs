//! Collector sink implementations
//!
//! The collector is the remote service that receives session starts,
//! per-tick summaries and lap uploads. Delivery is fire-and-forget from
//! the bridge's point of view; implementations report errors so the queue
//! worker can log them, but nothing retries.

use std::sync::Mutex;

use async_trait::async_trait;
use serde::Deserialize;
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::Result;
use crate::error::BridgeError;
use crate::outbound::payload::{LapUpload, SessionStart, TickPayload};

/// Delivery sink for outbound records.
#[async_trait]
pub trait Collector: Send + Sync + 'static {
    async fn announce_session(&self, start: &SessionStart) -> Result<()>;
    async fn submit_tick(&self, payload: &TickPayload) -> Result<()>;
    async fn upload_lap(&self, lap: &LapUpload) -> Result<()>;
}

#[derive(Deserialize)]
struct LoginResponse {
    token: String,
}

/// HTTP collector with bearer-token authentication.
///
/// Logs in lazily on the first delivery and caches the token; a rejected
/// token is dropped so the next delivery re-authenticates. All failures
/// are retryable collector errors, the queue never stalls on them.
pub struct HttpCollector {
    client: reqwest::Client,
    base_url: String,
    email: String,
    password: String,
    token: RwLock<Option<String>>,
}

impl HttpCollector {
    pub fn new(base_url: impl Into<String>, email: impl Into<String>, password: impl Into<String>) -> Self {
        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }
        Self {
            client: reqwest::Client::new(),
            base_url,
            email: email.into(),
            password: password.into(),
            token: RwLock::new(None),
        }
    }

    async fn bearer_token(&self) -> Result<String> {
        if let Some(token) = self.token.read().await.clone() {
            return Ok(token);
        }

        let response = self
            .client
            .post(format!("{}/api/login", self.base_url))
            .json(&serde_json::json!({ "email": self.email, "password": self.password }))
            .send()
            .await?
            .error_for_status()?;
        let login: LoginResponse = response.json().await?;

        info!(collector = %self.base_url, "collector login succeeded");
        *self.token.write().await = Some(login.token.clone());
        Ok(login.token)
    }

    async fn post_json<T: serde::Serialize + Sync>(&self, path: &str, body: &T) -> Result<()> {
        let token = self.bearer_token().await?;
        let response = self
            .client
            .post(format!("{}{}", self.base_url, path))
            .bearer_auth(&token)
            .json(body)
            .send()
            .await?;

        if response.status() == reqwest::StatusCode::UNAUTHORIZED {
            debug!(path, "collector rejected token, will re-authenticate");
            *self.token.write().await = None;
            return Err(BridgeError::collector(path, "authentication rejected".into()));
        }

        response.error_for_status()?;
        Ok(())
    }
}

#[async_trait]
impl Collector for HttpCollector {
    async fn announce_session(&self, start: &SessionStart) -> Result<()> {
        self.post_json("/api/sessions", start).await
    }

    async fn submit_tick(&self, payload: &TickPayload) -> Result<()> {
        self.post_json("/api/telemetry", payload).await
    }

    async fn upload_lap(&self, lap: &LapUpload) -> Result<()> {
        self.post_json("/api/laps", lap).await
    }
}

/// Everything a [`RecordingCollector`] has received, in arrival order.
#[derive(Debug, Clone, PartialEq)]
pub enum Delivered {
    SessionStart(SessionStart),
    Tick(TickPayload),
    Lap(LapUpload),
}

/// In-memory collector for tests and local development. Records every
/// delivery; cloning shares the record.
#[derive(Default)]
pub struct RecordingCollector {
    deliveries: Mutex<Vec<Delivered>>,
}

impl RecordingCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn deliveries(&self) -> Vec<Delivered> {
        self.deliveries.lock().unwrap_or_else(std::sync::PoisonError::into_inner).clone()
    }

    pub fn session_starts(&self) -> Vec<SessionStart> {
        self.deliveries()
            .into_iter()
            .filter_map(|d| match d {
                Delivered::SessionStart(start) => Some(start),
                _ => None,
            })
            .collect()
    }

    pub fn laps(&self) -> Vec<LapUpload> {
        self.deliveries()
            .into_iter()
            .filter_map(|d| match d {
                Delivered::Lap(lap) => Some(lap),
                _ => None,
            })
            .collect()
    }

    pub fn ticks(&self) -> Vec<TickPayload> {
        self.deliveries()
            .into_iter()
            .filter_map(|d| match d {
                Delivered::Tick(tick) => Some(tick),
                _ => None,
            })
            .collect()
    }

    fn record(&self, delivered: Delivered) {
        self.deliveries.lock().unwrap_or_else(std::sync::PoisonError::into_inner).push(delivered);
    }
}

#[async_trait]
impl Collector for RecordingCollector {
    async fn announce_session(&self, start: &SessionStart) -> Result<()> {
        self.record(Delivered::SessionStart(start.clone()));
        Ok(())
    }

    async fn submit_tick(&self, payload: &TickPayload) -> Result<()> {
        self.record(Delivered::Tick(payload.clone()));
        Ok(())
    }

    async fn upload_lap(&self, lap: &LapUpload) -> Result<()> {
        self.record(Delivered::Lap(lap.clone()));
        Ok(())
    }
}
