use super::Database;
use crate::database::errors::DatabaseError;
use crate::database::types::UserRecord;
use tracing::error;

impl Database {
    /// Whether a record already existed before this call. The referral
    /// ledger depends on asking this *before* `get_or_create_user`.
    pub async fn user_exists(&self, user_id: i64) -> Result<bool, DatabaseError> {
        let row: Option<(String,)> =
            sqlx::query_as("SELECT user_id FROM users WHERE user_id = ?")
                .bind(user_id.to_string())
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| DatabaseError::QueryError(e.to_string()))?;
        Ok(row.is_some())
    }

    pub async fn load_user(&self, user_id: i64) -> Result<Option<UserRecord>, DatabaseError> {
        let row: Option<(String,)> = sqlx::query_as("SELECT data FROM users WHERE user_id = ?")
            .bind(user_id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| DatabaseError::QueryError(e.to_string()))?;

        Ok(row.map(|(data,)| parse_record(user_id, &data)))
    }

    /// Lazily creates the record with defaults on first contact.
    pub async fn get_or_create_user(&self, user_id: i64) -> Result<UserRecord, DatabaseError> {
        if let Some(record) = self.load_user(user_id).await? {
            return Ok(record);
        }

        let record = UserRecord::default();
        self.save_user(user_id, &record).await?;
        Ok(record)
    }

    pub async fn save_user(&self, user_id: i64, record: &UserRecord) -> Result<(), DatabaseError> {
        let data = serde_json::to_string(record)
            .map_err(|e| DatabaseError::QueryError(e.to_string()))?;
        sqlx::query("REPLACE INTO users (user_id, data) VALUES (?, ?)")
            .bind(user_id.to_string())
            .bind(data)
            .execute(&self.pool)
            .await
            .map_err(|e| DatabaseError::QueryError(e.to_string()))?;
        Ok(())
    }

    /// Writes two records in one transaction. The referral ledger uses this
    /// so a referrer/referee update cannot be observed half-applied.
    pub async fn save_user_pair(
        &self,
        first: (i64, &UserRecord),
        second: (i64, &UserRecord),
    ) -> Result<(), DatabaseError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| DatabaseError::QueryError(e.to_string()))?;
        for (user_id, record) in [first, second] {
            let data = serde_json::to_string(record)
                .map_err(|e| DatabaseError::QueryError(e.to_string()))?;
            sqlx::query("REPLACE INTO users (user_id, data) VALUES (?, ?)")
                .bind(user_id.to_string())
                .bind(data)
                .execute(&mut tx)
                .await
                .map_err(|e| DatabaseError::QueryError(e.to_string()))?;
        }
        tx.commit()
            .await
            .map_err(|e| DatabaseError::QueryError(e.to_string()))?;
        Ok(())
    }

    pub async fn all_users(&self) -> Result<Vec<(i64, UserRecord)>, DatabaseError> {
        let rows: Vec<(String, String)> = sqlx::query_as("SELECT user_id, data FROM users")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| DatabaseError::QueryError(e.to_string()))?;

        Ok(rows
            .into_iter()
            .filter_map(|(id, data)| match id.parse::<i64>() {
                Ok(user_id) => Some((user_id, parse_record(user_id, &data))),
                Err(_) => {
                    error!("Skipping user row with non-numeric id: {id}");
                    None
                }
            })
            .collect())
    }

    pub async fn count_users(&self) -> Result<i64, DatabaseError> {
        sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| DatabaseError::QueryError(e.to_string()))
    }
}

/// Malformed stored JSON falls back to a default record rather than failing
/// the request.
fn parse_record(user_id: i64, data: &str) -> UserRecord {
    match serde_json::from_str(data) {
        Ok(record) => record,
        Err(e) => {
            error!("Invalid stored record for user {user_id}: {e}");
            UserRecord::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn user_is_created_lazily_with_defaults() {
        let db = Database::in_memory().await.expect("db");

        assert!(!db.user_exists(7).await.expect("exists"));
        assert!(db.load_user(7).await.expect("load").is_none());

        let record = db.get_or_create_user(7).await.expect("create");
        assert!(!record.verified);
        assert_eq!(record.referral_count, 0);
        assert!(db.user_exists(7).await.expect("exists"));
    }

    #[tokio::test]
    async fn saved_record_round_trips() {
        let db = Database::in_memory().await.expect("db");

        let mut record = db.get_or_create_user(7).await.expect("create");
        record.verified = true;
        record.first_name = "Ada".to_string();
        record.custom_username = Some("ada_l".to_string());
        db.save_user(7, &record).await.expect("save");

        let loaded = db.load_user(7).await.expect("load").expect("present");
        assert_eq!(loaded, record);
        assert_eq!(db.count_users().await.expect("count"), 1);
    }

    #[tokio::test]
    async fn malformed_blob_falls_back_to_defaults() {
        let db = Database::in_memory().await.expect("db");
        sqlx::query("REPLACE INTO users (user_id, data) VALUES ('7', 'not json')")
            .execute(&db.pool)
            .await
            .expect("insert garbage");

        let record = db.load_user(7).await.expect("load").expect("present");
        assert_eq!(record.referral_count, 0);
        assert!(!record.verified);
    }

    #[tokio::test]
    async fn all_users_skips_unparseable_ids() {
        let db = Database::in_memory().await.expect("db");
        db.get_or_create_user(1).await.expect("create");
        sqlx::query("REPLACE INTO users (user_id, data) VALUES ('abc', '{}')")
            .execute(&db.pool)
            .await
            .expect("insert bad id");

        let users = db.all_users().await.expect("all");
        assert_eq!(users.len(), 1);
        assert_eq!(users[0].0, 1);
    }
}
