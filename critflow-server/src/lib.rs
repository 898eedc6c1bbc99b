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

pub mod api;
pub mod auth;
pub mod config;
pub mod events;
pub mod lifecycle;
pub mod middleware;

use anyhow::Result;
use axum::{
    http::HeaderValue,
    middleware as axum_middleware,
    routing::{get, post},
    Extension, Router,
};
use std::sync::Arc;
use std::time::Duration;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

use api::{
    create_dependency, delete_dependency, get_critical_path, get_cycles, get_dependency,
    get_graph, health_check, health_check_detailed, list_dependencies, update_dependency,
    AppState,
};
use auth::{auth_middleware, ApiKeyAuth, Authenticator, BearerTokenAuth, MultiAuth, NoAuth};
use config::ServerConfig;
use events::BroadcastBus;
use lifecycle::DependencyService;
use middleware::{rate_limit_middleware, RateLimiter};

pub async fn run_server(config: ServerConfig) -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "critflow_server=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Critflow Server");
    config.validate()?;

    // Connect the store (bounded pool, migrations applied)
    let pool = critflow_storage::connect(&config.database.connection_url()).await?;

    // Event bus: in-process broadcast fabric, subscribed to by relays
    let bus = Arc::new(BroadcastBus::new(1024));

    let service = Arc::new(DependencyService::new(pool.clone(), bus.clone()));
    let state = AppState {
        pool: pool.clone(),
        service,
    };

    // Set up authenticator
    let authenticator: Arc<dyn Authenticator> = if config.auth.enabled {
        tracing::info!("Authentication enabled");

        let mut strategies: Vec<Arc<dyn Authenticator>> = vec![];
        if let Some(jwt_secret) = config.auth.jwt_secret.clone() {
            tracing::info!("JWT authentication enabled");
            strategies.push(Arc::new(BearerTokenAuth::new(jwt_secret)));
        }
        if !config.auth.api_keys.is_empty() {
            tracing::info!(
                "API key authentication enabled ({} keys)",
                config.auth.api_keys.len()
            );
            strategies.push(Arc::new(ApiKeyAuth::new(config.auth.api_keys.clone())));
        }
        Arc::new(MultiAuth::new(strategies))
    } else {
        tracing::warn!(
            "Authentication DISABLED - every request maps to the nil tenant. \
             Do not deploy this configuration to production."
        );
        Arc::new(NoAuth::new(Uuid::nil(), Uuid::nil()))
    };

    // Per-IP rate limiter
    let limiter = RateLimiter::new(
        config.rate_limit.max_requests,
        Duration::from_secs(config.rate_limit.window_secs),
    );

    // Authenticated API routes
    let authed_routes = Router::new()
        .route(
            "/api/dependencies",
            post(create_dependency).get(list_dependencies),
        )
        .route(
            "/api/dependencies/:id",
            get(get_dependency)
                .put(update_dependency)
                .delete(delete_dependency),
        )
        .route("/api/graph", get(get_graph))
        .route("/api/critical-path", get(get_critical_path))
        .route("/api/cycles", get(get_cycles))
        .route("/api/health", get(health_check_detailed))
        .layer(axum_middleware::from_fn(auth_middleware))
        .layer(Extension(authenticator.clone()))
        .layer(axum_middleware::from_fn_with_state(
            limiter.clone(),
            rate_limit_middleware,
        ));

    // CORS: explicit origins when configured, permissive otherwise
    let cors = if config.server.cors_origins.is_empty() {
        tracing::warn!("CORS: allowing all origins (development mode)");
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        tracing::info!("CORS: allowing origins: {:?}", config.server.cors_origins);
        let origins: Vec<HeaderValue> = config
            .server
            .cors_origins
            .iter()
            .filter_map(|origin| origin.parse().ok())
            .collect();
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(Any)
            .allow_headers(Any)
    };

    let app = Router::new()
        .route("/health", get(health_check))
        .merge(authed_routes)
        .with_state(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    let addr = config.socket_addr()?;
    tracing::info!("Listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // Drain the store pool before exit; the bus drops with the last Arc.
    pool.close().await;
    tracing::info!("Shutdown complete");

    Ok(())
}

/// Resolve on SIGTERM or SIGINT.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install SIGINT handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_validation() {
        let config = ServerConfig::default();
        assert!(config.validate().is_ok());
    }
}
