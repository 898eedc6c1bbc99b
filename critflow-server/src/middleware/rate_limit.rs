// Copyright 2025 Sushanth (https://github.com/sushanthpy)
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Fixed-window rate limiting keyed by client IP.

use axum::{
    body::Body,
    extract::State,
    http::{HeaderMap, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use dashmap::DashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Rate limiter state
#[derive(Clone)]
pub struct RateLimiter {
    /// client ip → (request_count, window_start)
    limits: Arc<DashMap<String, (u32, Instant)>>,
    max_requests: u32,
    window: Duration,
}

impl RateLimiter {
    pub fn new(max_requests: u32, window: Duration) -> Self {
        Self {
            limits: Arc::new(DashMap::new()),
            max_requests,
            window,
        }
    }

    /// Check if a request from this client should be rate limited.
    ///
    /// Returns `Ok(remaining)` when allowed, `Err(retry_after_secs)` when the
    /// client is over its window budget.
    pub fn check_limit(&self, client: &str) -> Result<u32, u64> {
        let now = Instant::now();

        let mut entry = self
            .limits
            .entry(client.to_string())
            .or_insert((0, now));

        // Reset window if expired
        if now.duration_since(entry.1) > self.window {
            entry.0 = 0;
            entry.1 = now;
        }

        entry.0 += 1;

        if entry.0 > self.max_requests {
            let elapsed = now.duration_since(entry.1).as_secs();
            let retry_after = self.window.as_secs().saturating_sub(elapsed);
            return Err(retry_after);
        }

        Ok(self.max_requests - entry.0)
    }

    pub fn max_requests(&self) -> u32 {
        self.max_requests
    }
}

/// Best-effort client IP from proxy headers; falls back to a shared bucket
/// when nothing identifies the caller.
pub fn extract_client_ip(headers: &HeaderMap) -> String {
    if let Some(forwarded) = headers.get("x-forwarded-for").and_then(|h| h.to_str().ok()) {
        if let Some(first) = forwarded.split(',').next() {
            let ip = first.trim();
            if !ip.is_empty() {
                return ip.to_string();
            }
        }
    }
    if let Some(real_ip) = headers.get("x-real-ip").and_then(|h| h.to_str().ok()) {
        return real_ip.trim().to_string();
    }
    "unknown".to_string()
}

/// Rate limiting middleware
///
/// Enforces per-IP limits and returns 429 with a Retry-After header when the
/// limit is exceeded.
pub async fn rate_limit_middleware(
    State(limiter): State<RateLimiter>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let client = extract_client_ip(request.headers());

    match limiter.check_limit(&client) {
        Ok(remaining) => {
            let mut response = next.run(request).await;
            let headers = response.headers_mut();
            if let Ok(limit) = limiter.max_requests().to_string().parse() {
                headers.insert("X-RateLimit-Limit", limit);
            }
            if let Ok(remaining) = remaining.to_string().parse() {
                headers.insert("X-RateLimit-Remaining", remaining);
            }
            response
        }
        Err(retry_after) => {
            tracing::warn!(client = %client, retry_after, "rate limit exceeded");
            (
                StatusCode::TOO_MANY_REQUESTS,
                [
                    ("Retry-After", retry_after.to_string()),
                    ("X-RateLimit-Remaining", "0".to_string()),
                ],
                Json(serde_json::json!({
                    "success": false,
                    "error": "RATE_LIMIT_EXCEEDED",
                    "message": format!("Rate limit exceeded. Retry after {} seconds", retry_after),
                })),
            )
                .into_response()
        }
    }
}
