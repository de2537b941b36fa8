use super::errors::DatabaseError;
use chrono::Utc;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::path::{Path, PathBuf};
use tracing::{error, info};

mod admin;
mod ban;
mod user;

const MAX_BACKUPS: usize = 5;

pub struct Database {
    pub(crate) pool: SqlitePool,
    path: String,
}

impl Database {
    pub async fn connect(path: &str) -> Result<Self, DatabaseError> {
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .map_err(|e| DatabaseError::ConnectionError(e.to_string()))?;

        let db = Self {
            pool,
            path: path.to_string(),
        };
        db.init_schema().await?;
        Ok(db)
    }

    /// In-memory database for tests. Pinned to a single connection because
    /// every SQLite `:memory:` connection is a separate database.
    pub async fn in_memory() -> Result<Self, DatabaseError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .map_err(|e| DatabaseError::ConnectionError(e.to_string()))?;

        let db = Self {
            pool,
            path: ":memory:".to_string(),
        };
        db.init_schema().await?;
        Ok(db)
    }

    async fn init_schema(&self) -> Result<(), DatabaseError> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS users (
                user_id TEXT PRIMARY KEY,
                data TEXT
            )",
        )
        .execute(&self.pool)
        .await
        .map_err(|e| DatabaseError::QueryError(e.to_string()))?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS admin_state (
                admin_id TEXT PRIMARY KEY,
                data TEXT
            )",
        )
        .execute(&self.pool)
        .await
        .map_err(|e| DatabaseError::QueryError(e.to_string()))?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS banned_users (
                user_id TEXT PRIMARY KEY,
                banned_at TEXT,
                reason TEXT
            )",
        )
        .execute(&self.pool)
        .await
        .map_err(|e| DatabaseError::QueryError(e.to_string()))?;

        Ok(())
    }

    /// Snapshots the database to a timestamped sibling file and prunes old
    /// snapshots, keeping the most recent five.
    pub async fn backup(&self) -> Result<PathBuf, DatabaseError> {
        let dir = Path::new(&self.path)
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."))
            .to_path_buf();
        let backup_path = dir.join(format!(
            "bot_data_backup_{}.db",
            Utc::now().format("%Y%m%d_%H%M")
        ));

        sqlx::query(&format!("VACUUM INTO '{}'", backup_path.display()))
            .execute(&self.pool)
            .await
            .map_err(|e| DatabaseError::BackupError(e.to_string()))?;
        info!("Database backup created: {}", backup_path.display());

        cleanup_old_backups(&dir, MAX_BACKUPS);
        Ok(backup_path)
    }
}

fn cleanup_old_backups(dir: &Path, keep: usize) {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            error!("Backup cleanup error: {e}");
            return;
        }
    };

    // Timestamped names sort chronologically.
    let mut backups: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| {
            path.file_name()
                .and_then(|n| n.to_str())
                .map(|n| n.starts_with("bot_data_backup_") && n.ends_with(".db"))
                .unwrap_or(false)
        })
        .collect();
    backups.sort();

    if backups.len() > keep {
        let stale = backups.len() - keep;
        for old in backups.into_iter().take(stale) {
            if let Err(e) = std::fs::remove_file(&old) {
                error!("Failed to remove backup {}: {e}", old.display());
            } else {
                info!("Removed old backup: {}", old.display());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cleanup_keeps_only_the_newest_backups() {
        let dir = std::env::temp_dir().join(format!("ecb_backup_test_{}", std::process::id()));
        std::fs::create_dir_all(&dir).expect("create temp dir");
        for stamp in [
            "20250101_0000",
            "20250102_0000",
            "20250103_0000",
            "20250104_0000",
            "20250105_0000",
            "20250106_0000",
            "20250107_0000",
        ] {
            std::fs::write(dir.join(format!("bot_data_backup_{stamp}.db")), b"x")
                .expect("write backup stub");
        }

        cleanup_old_backups(&dir, 5);

        let mut remaining: Vec<String> = std::fs::read_dir(&dir)
            .expect("read temp dir")
            .filter_map(|e| e.ok().and_then(|e| e.file_name().into_string().ok()))
            .collect();
        remaining.sort();
        assert_eq!(remaining.len(), 5);
        assert_eq!(remaining[0], "bot_data_backup_20250103_0000.db");

        std::fs::remove_dir_all(&dir).ok();
    }
}
