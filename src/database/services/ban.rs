use super::Database;
use crate::database::errors::DatabaseError;
use crate::database::types::BanRecord;
use chrono::Utc;
use tracing::error;

impl Database {
    /// Flips the record's `banned` flag and writes the ban row in one
    /// transaction so the two stay consistent.
    pub async fn ban_user(&self, user_id: i64, reason: &str) -> Result<BanRecord, DatabaseError> {
        let mut record = self.get_or_create_user(user_id).await?;
        record.banned = true;
        let data = serde_json::to_string(&record)
            .map_err(|e| DatabaseError::QueryError(e.to_string()))?;

        let ban = BanRecord {
            user_id,
            banned_at: Utc::now(),
            reason: reason.to_string(),
        };

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| DatabaseError::QueryError(e.to_string()))?;
        sqlx::query("REPLACE INTO users (user_id, data) VALUES (?, ?)")
            .bind(user_id.to_string())
            .bind(data)
            .execute(&mut tx)
            .await
            .map_err(|e| DatabaseError::QueryError(e.to_string()))?;
        sqlx::query("REPLACE INTO banned_users (user_id, banned_at, reason) VALUES (?, ?, ?)")
            .bind(user_id.to_string())
            .bind(ban.banned_at.to_rfc3339())
            .bind(&ban.reason)
            .execute(&mut tx)
            .await
            .map_err(|e| DatabaseError::QueryError(e.to_string()))?;
        tx.commit()
            .await
            .map_err(|e| DatabaseError::QueryError(e.to_string()))?;

        Ok(ban)
    }

    pub async fn unban_user(&self, user_id: i64) -> Result<(), DatabaseError> {
        let mut record = self.get_or_create_user(user_id).await?;
        record.banned = false;
        let data = serde_json::to_string(&record)
            .map_err(|e| DatabaseError::QueryError(e.to_string()))?;

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| DatabaseError::QueryError(e.to_string()))?;
        sqlx::query("REPLACE INTO users (user_id, data) VALUES (?, ?)")
            .bind(user_id.to_string())
            .bind(data)
            .execute(&mut tx)
            .await
            .map_err(|e| DatabaseError::QueryError(e.to_string()))?;
        sqlx::query("DELETE FROM banned_users WHERE user_id = ?")
            .bind(user_id.to_string())
            .execute(&mut tx)
            .await
            .map_err(|e| DatabaseError::QueryError(e.to_string()))?;
        tx.commit()
            .await
            .map_err(|e| DatabaseError::QueryError(e.to_string()))?;

        Ok(())
    }

    /// Ids from the `banned_users` table; seeds the rate limiter's in-memory
    /// ban set at startup.
    pub async fn banned_ids(&self) -> Result<Vec<i64>, DatabaseError> {
        let rows: Vec<(String,)> = sqlx::query_as("SELECT user_id FROM banned_users")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| DatabaseError::QueryError(e.to_string()))?;

        Ok(rows
            .into_iter()
            .filter_map(|(id,)| match id.parse::<i64>() {
                Ok(user_id) => Some(user_id),
                Err(_) => {
                    error!("Skipping ban row with non-numeric id: {id}");
                    None
                }
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn ban_sets_flag_and_row_together() {
        let db = Database::in_memory().await.expect("db");
        db.get_or_create_user(9).await.expect("create");

        let ban = db.ban_user(9, "Spam behavior").await.expect("ban");
        assert_eq!(ban.user_id, 9);
        assert_eq!(ban.reason, "Spam behavior");

        let record = db.load_user(9).await.expect("load").expect("present");
        assert!(record.banned);
        assert_eq!(db.banned_ids().await.expect("ids"), vec![9]);
    }

    #[tokio::test]
    async fn unban_clears_flag_and_row() {
        let db = Database::in_memory().await.expect("db");
        db.ban_user(9, "No reason provided").await.expect("ban");
        db.unban_user(9).await.expect("unban");

        let record = db.load_user(9).await.expect("load").expect("present");
        assert!(!record.banned);
        assert!(db.banned_ids().await.expect("ids").is_empty());
    }

    #[tokio::test]
    async fn ban_creates_missing_record() {
        let db = Database::in_memory().await.expect("db");
        // Never seen this user before; soft ban still applies.
        db.ban_user(11, "abuse").await.expect("ban");
        let record = db.load_user(11).await.expect("load").expect("present");
        assert!(record.banned);
    }
}
