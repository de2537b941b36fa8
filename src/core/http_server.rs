//! Liveness endpoints for the hosting platform's keep-alive probes. No
//! contract with the bot core beyond "process is alive".

use crate::core::service_manager::{Error, Service};
use crate::AppContext;
use async_trait::async_trait;
use axum::{routing::get, Json, Router};
use chrono::Utc;
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tracing::info;

pub struct HealthService {
    port: u16,
}

#[async_trait]
impl Service for HealthService {
    type Context = AppContext;

    async fn new(context: AppContext) -> Self {
        Self {
            port: context.context.config.port,
        }
    }

    async fn run(self) -> Result<(), Error> {
        let app = Router::new()
            .route("/", get(home))
            .route("/health", get(health))
            .route("/status", get(status))
            .route("/heartbeat", get(heartbeat))
            .route("/ping", get(ping))
            .layer(CorsLayer::permissive());

        let listener = TcpListener::bind(format!("0.0.0.0:{}", self.port))
            .await
            .map_err(Error::from)?;
        info!("Liveness server running on port {}", self.port);

        axum::serve(listener, app).await.map_err(Error::from)?;
        Ok(())
    }
}

fn timestamp() -> f64 {
    Utc::now().timestamp_millis() as f64 / 1000.0
}

async fn home() -> &'static str {
    "EarningClubBot is running!"
}

async fn health() -> Json<Value> {
    Json(json!({"status": "healthy", "timestamp": timestamp()}))
}

async fn status() -> Json<Value> {
    Json(json!({"bot": "EarningClubBot", "status": "active", "uptime": timestamp()}))
}

async fn heartbeat() -> Json<Value> {
    Json(json!({"alive": true, "timestamp": timestamp(), "message": "Bot is running"}))
}

async fn ping() -> &'static str {
    "pong"
}
