pub mod admin;
pub mod bot;
pub mod catalog;
pub mod configuration;
pub mod core;
pub mod database;
pub mod maintenance;
pub mod menu;
pub mod policy;
pub mod ratelimit;
pub mod referral;
pub mod verification;

use crate::configuration::Context;
use crate::database::Database;
use crate::ratelimit::RateLimiter;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Config Error:{0}")]
    ConfigError(String),

    #[error("Database Error:{0}")]
    DatabaseError(String),

    #[error("Service error")]
    ServiceError,
}

/// Shared handles every service receives from the service manager.
#[derive(Clone)]
pub struct AppContext {
    pub context: Context,
    pub db: Arc<Database>,
    pub limiter: Arc<RateLimiter>,
}
