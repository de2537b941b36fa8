use dotenvy::dotenv;
use earning_club_bot::bot::BotService;
use earning_club_bot::configuration::Context;
use earning_club_bot::core::{HealthService, ServiceManager};
use earning_club_bot::database::Database;
use earning_club_bot::maintenance::MaintenanceService;
use earning_club_bot::ratelimit::RateLimiter;
use earning_club_bot::{AppContext, AppError};
use std::str::FromStr;
use std::sync::Arc;
use tracing::Level;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), AppError> {
    dotenv().ok();
    let context = Context::from_env().map_err(|e| AppError::ConfigError(e.to_string()))?;

    let log_level = Level::from_str(&context.config.log_level).unwrap_or(Level::INFO);
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::EnvFilter::new(log_level.to_string()))
        .init();
    tracing::info!("Starting EarningClubBot");

    let db = Database::connect(&context.config.database_path)
        .await
        .map_err(|e| AppError::DatabaseError(e.to_string()))?;

    let limiter = RateLimiter::new();
    match db.banned_ids().await {
        Ok(ids) => limiter.seed_bans(ids),
        Err(e) => tracing::error!("Failed to seed ban list: {e}"),
    }

    let app_context = AppContext {
        context,
        db: Arc::new(db),
        limiter: Arc::new(limiter),
    };

    let mut service_manager = ServiceManager::new(app_context);
    service_manager.spawn::<BotService>();
    service_manager.spawn::<HealthService>();
    service_manager.spawn::<MaintenanceService>();

    service_manager.wait().await.map_err(|_| AppError::ServiceError)
}
