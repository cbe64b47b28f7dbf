//! Shared types for the API layer.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use axum::extract::FromRequest;
use axum::response::{IntoResponse, Response};

use crate::api::error::ApiError;
use crate::core_state::CoreState;
use crate::models::User;

// ═══════════════════════════════════════════════════════════
// API context: shared state for the router
// ═══════════════════════════════════════════════════════════

/// Shared context for all API routes and middleware.
/// Wraps `CoreState` plus the auth-route rate limiter.
#[derive(Clone)]
pub struct ApiContext {
    pub core: Arc<CoreState>,
    pub rate_limiter: Arc<Mutex<RateLimiter>>,
}

impl ApiContext {
    pub fn new(core: Arc<CoreState>) -> Self {
        Self::with_rate_limiter(core, RateLimiter::new())
    }

    pub fn with_rate_limiter(core: Arc<CoreState>, limiter: RateLimiter) -> Self {
        Self {
            core,
            rate_limiter: Arc::new(Mutex::new(limiter)),
        }
    }

    /// Run blocking work (SQLite, password hashing) on the blocking pool
    /// with a fresh connection.
    pub async fn with_db<T, F>(&self, work: F) -> Result<T, ApiError>
    where
        T: Send + 'static,
        F: FnOnce(&CoreState, &mut rusqlite::Connection) -> Result<T, ApiError> + Send + 'static,
    {
        let core = self.core.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn = core.open_db()?;
            work(&core, &mut conn)
        })
        .await?
    }
}

// ═══════════════════════════════════════════════════════════
// Authenticated user: injected by auth middleware
// ═══════════════════════════════════════════════════════════

/// The caller, resolved from storage by the auth middleware and inserted
/// into request extensions for role guards and handlers.
#[derive(Debug, Clone)]
pub struct AuthUser(pub User);

// ═══════════════════════════════════════════════════════════
// JSON extractor with API-shaped rejections
// ═══════════════════════════════════════════════════════════

/// `axum::Json` whose rejections render as `ApiError` (400 `{message, code}`).
#[derive(Debug, Clone, FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);

impl<T: serde::Serialize> IntoResponse for ApiJson<T> {
    fn into_response(self) -> Response {
        axum::Json(self.0).into_response()
    }
}

// ═══════════════════════════════════════════════════════════
// Rate limiter: per-client sliding window
// ═══════════════════════════════════════════════════════════

/// Clients tracked at once; beyond this the least recently seen is evicted.
pub const MAX_TRACKED_CLIENTS: usize = 10_000;

/// Per-client rate limiter with per-minute and per-hour limits.
pub struct RateLimiter {
    windows: HashMap<String, Vec<Instant>>,
    per_minute: u32,
    per_hour: u32,
    max_clients: usize,
}

impl RateLimiter {
    /// Limits for unauthenticated auth routes: 20/min, 200/hour.
    pub fn new() -> Self {
        Self::with_limits(20, 200)
    }

    pub fn with_limits(per_minute: u32, per_hour: u32) -> Self {
        Self {
            windows: HashMap::new(),
            per_minute,
            per_hour,
            max_clients: MAX_TRACKED_CLIENTS,
        }
    }

    pub fn with_max_clients(mut self, max_clients: usize) -> Self {
        self.max_clients = max_clients.max(1);
        self
    }

    pub fn tracked_clients(&self) -> usize {
        self.windows.len()
    }

    /// Check if a client is within rate limits. Returns `Ok(())` or
    /// `Err(retry_after_secs)` if exceeded.
    pub fn check(&mut self, client: &str) -> Result<(), u64> {
        self.check_at(client, Instant::now())
    }

    fn check_at(&mut self, client: &str, now: Instant) -> Result<(), u64> {
        if !self.windows.contains_key(client) {
            self.make_room(now);
        }

        let entries = self.windows.entry(client.to_string()).or_default();
        entries.retain(|ts| now.duration_since(*ts) < Duration::from_secs(3600));

        let last_minute = entries
            .iter()
            .filter(|ts| now.duration_since(**ts) < Duration::from_secs(60))
            .count() as u32;
        if last_minute >= self.per_minute {
            return Err(60);
        }
        if entries.len() as u32 >= self.per_hour {
            return Err(3600);
        }

        entries.push(now);
        Ok(())
    }

    /// Keep the map below `max_clients`: drop idle windows first, then the
    /// least recently seen clients.
    fn make_room(&mut self, now: Instant) {
        if self.windows.len() < self.max_clients {
            return;
        }
        self.windows.retain(|_, entries| {
            entries
                .last()
                .is_some_and(|ts| now.duration_since(*ts) < Duration::from_secs(3600))
        });
        while self.windows.len() >= self.max_clients {
            let oldest = self
                .windows
                .iter()
                .min_by_key(|(_, entries)| entries.last().copied())
                .map(|(key, _)| key.clone());
            match oldest {
                Some(key) => {
                    self.windows.remove(&key);
                }
                None => break,
            }
        }
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new()
    }
}
