//! Confab Gateway - Session-scoped chat proxy for Bedrock-hosted Claude.
//!
//! This crate provides the HTTP service in front of the Bedrock runtime:
//! - Per-session conversation memory with a bounded window
//! - Per-session pacing and retry with exponential backoff
//! - Document upload with chunked summarization for large files
//! - Image questions through the model's vision input
//! - A bundled single-page chat client
//!
//! ## Architecture
//!
//! The gateway sits between browser sessions and the Bedrock runtime:
//! ```text
//! Browser → Gateway (history → prompt → pacing → retry) → Bedrock
//!                        ↓
//!                  Record exchange
//! ```

#![warn(clippy::all)]
#![allow(clippy::pedantic)]

pub mod chat;
pub mod chunker;
pub mod gate;
pub mod prompt;
pub mod provider;
pub mod retry;
pub mod routes;
pub mod session;

pub use chat::ChatService;
pub use provider::{
    BedrockProvider, ContentBlock, ImageSource, InvokeRequest, InvokeResponse, Provider,
};
pub use retry::{ResilientClient, RetryConfig};
pub use routes::AppState;

use axum::Router;
use confab_common::Config;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

/// Build the gateway router with all routes and middleware.
///
/// Returns the service handle alongside the router so the caller can run
/// periodic maintenance against it.
pub fn build_router(config: &Config, provider: Arc<dyn Provider>) -> (Router, Arc<ChatService>) {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let service = Arc::new(ChatService::new(provider, config.limits.clone()));
    let state = AppState {
        service: Arc::clone(&service),
        started_at_ms: chrono::Utc::now().timestamp_millis(),
        max_upload_bytes: config.limits.max_upload_bytes,
    };

    (routes::router(state).layer(cors), service)
}

/// Start the gateway server.
pub async fn start_server(config: &Config) -> anyhow::Result<()> {
    let addr = SocketAddr::from((
        config.server.bind.parse::<std::net::IpAddr>()?,
        config.server.port,
    ));

    let provider = Arc::new(BedrockProvider::new(
        &config.bedrock.region,
        &config.bedrock.api_key,
        config.bedrock.model_id.clone(),
    ));
    let (router, service) = build_router(config, provider);

    // Spawn cleanup task for idle sessions
    let sweep_interval = config.limits.sweep_interval;
    let sweeper = tokio::spawn(async move {
        let mut interval = tokio::time::interval(sweep_interval);
        loop {
            interval.tick().await;
            let (histories, gates) = service.evict_idle().await;
            if histories > 0 || gates > 0 {
                tracing::debug!(histories, gates, "Dropped idle sessions");
            }
        }
    });

    tracing::info!("Starting Confab Gateway on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router).await?;

    sweeper.abort();

    Ok(())
}
