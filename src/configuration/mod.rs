use std::env;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variables: {0}")]
    MissingVars(String),

    #[error("Invalid value for {0}")]
    InvalidValue(String),
}

#[derive(Debug, Clone)]
pub struct Config {
    pub bot_token: String,
    pub admin_id: i64,
    pub dev_mode: bool,
    pub maintenance_mode: bool,
    pub database_path: String,
    pub port: u16,
    pub log_level: String,
}

#[derive(Debug, Clone)]
pub struct Context {
    pub config: Config,
}

impl Context {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            config: Config::from_env()?,
        })
    }
}

impl Config {
    /// Reads configuration from the environment. Missing BOT_TOKEN or
    /// ADMIN_ID is fatal; everything else has a default.
    pub fn from_env() -> Result<Self, ConfigError> {
        let missing = Self::missing_required_vars();
        if !missing.is_empty() {
            return Err(ConfigError::MissingVars(missing.join(", ")));
        }

        let bot_token = env::var("BOT_TOKEN").expect("checked above");
        let admin_id = env::var("ADMIN_ID")
            .expect("checked above")
            .parse::<i64>()
            .map_err(|_| ConfigError::InvalidValue("ADMIN_ID".to_string()))?;

        let port = match env::var("PORT") {
            Ok(p) => p
                .parse::<u16>()
                .map_err(|_| ConfigError::InvalidValue("PORT".to_string()))?,
            Err(_) => 10000,
        };

        Ok(Self {
            bot_token,
            admin_id,
            dev_mode: bool_var("DEV_MODE"),
            maintenance_mode: bool_var("MAINTENANCE_MODE"),
            database_path: env::var("DATABASE_PATH").unwrap_or_else(|_| "bot_data.db".to_string()),
            port,
            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
        })
    }

    pub fn missing_required_vars() -> Vec<&'static str> {
        let mut missing = Vec::new();
        if env::var("BOT_TOKEN").map(|v| v.is_empty()).unwrap_or(true) {
            missing.push("BOT_TOKEN");
        }
        if env::var("ADMIN_ID").map(|v| v.is_empty()).unwrap_or(true) {
            missing.push("ADMIN_ID");
        }
        missing
    }

    pub fn is_admin(&self, user_id: i64) -> bool {
        user_id == self.admin_id
    }
}

fn bool_var(name: &str) -> bool {
    env::var(name)
        .map(|v| v.eq_ignore_ascii_case("true"))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn clear_env() {
        for var in [
            "BOT_TOKEN",
            "ADMIN_ID",
            "DEV_MODE",
            "MAINTENANCE_MODE",
            "DATABASE_PATH",
            "PORT",
            "LOG_LEVEL",
        ] {
            env::remove_var(var);
        }
    }

    #[test]
    #[serial]
    fn missing_credentials_abort_startup() {
        clear_env();
        let missing = Config::missing_required_vars();
        assert_eq!(missing, vec!["BOT_TOKEN", "ADMIN_ID"]);
        assert!(matches!(
            Config::from_env(),
            Err(ConfigError::MissingVars(_))
        ));
    }

    #[test]
    #[serial]
    fn defaults_fill_optional_values() {
        clear_env();
        env::set_var("BOT_TOKEN", "123:abc");
        env::set_var("ADMIN_ID", "42");

        let config = Config::from_env().expect("config should load");
        assert_eq!(config.admin_id, 42);
        assert!(!config.dev_mode);
        assert!(!config.maintenance_mode);
        assert_eq!(config.database_path, "bot_data.db");
        assert_eq!(config.port, 10000);
        assert!(config.is_admin(42));
        assert!(!config.is_admin(43));
    }

    #[test]
    #[serial]
    fn invalid_admin_id_is_rejected() {
        clear_env();
        env::set_var("BOT_TOKEN", "123:abc");
        env::set_var("ADMIN_ID", "not-a-number");
        assert!(matches!(
            Config::from_env(),
            Err(ConfigError::InvalidValue(_))
        ));
    }
}
