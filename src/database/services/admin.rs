use super::Database;
use crate::database::errors::DatabaseError;
use crate::database::types::PendingAction;
use tracing::error;

impl Database {
    pub async fn load_pending(&self, actor_id: i64) -> Result<Option<PendingAction>, DatabaseError> {
        let row: Option<(String,)> =
            sqlx::query_as("SELECT data FROM admin_state WHERE admin_id = ?")
                .bind(actor_id.to_string())
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| DatabaseError::QueryError(e.to_string()))?;

        Ok(row.and_then(|(data,)| match serde_json::from_str(&data) {
            Ok(action) => Some(action),
            Err(e) => {
                error!("Invalid pending action for actor {actor_id}: {e}");
                None
            }
        }))
    }

    /// Overwrites any prior incomplete flow; one slot per actor, no queuing.
    pub async fn save_pending(
        &self,
        actor_id: i64,
        action: &PendingAction,
    ) -> Result<(), DatabaseError> {
        let data = serde_json::to_string(action)
            .map_err(|e| DatabaseError::QueryError(e.to_string()))?;
        sqlx::query("REPLACE INTO admin_state (admin_id, data) VALUES (?, ?)")
            .bind(actor_id.to_string())
            .bind(data)
            .execute(&self.pool)
            .await
            .map_err(|e| DatabaseError::QueryError(e.to_string()))?;
        Ok(())
    }

    pub async fn clear_pending(&self, actor_id: i64) -> Result<(), DatabaseError> {
        sqlx::query("DELETE FROM admin_state WHERE admin_id = ?")
            .bind(actor_id.to_string())
            .execute(&self.pool)
            .await
            .map_err(|e| DatabaseError::QueryError(e.to_string()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn pending_action_survives_and_clears() {
        let db = Database::in_memory().await.expect("db");
        assert!(db.load_pending(1).await.expect("load").is_none());

        db.save_pending(1, &PendingAction::SendToAll)
            .await
            .expect("save");
        assert_eq!(
            db.load_pending(1).await.expect("load"),
            Some(PendingAction::SendToAll)
        );

        db.clear_pending(1).await.expect("clear");
        assert!(db.load_pending(1).await.expect("load").is_none());
    }

    #[tokio::test]
    async fn new_flow_overwrites_incomplete_one() {
        let db = Database::in_memory().await.expect("db");
        db.save_pending(1, &PendingAction::SetUsername)
            .await
            .expect("save");
        db.save_pending(
            1,
            &PendingAction::SendToSpecific {
                target_user_id: None,
            },
        )
        .await
        .expect("overwrite");

        assert_eq!(
            db.load_pending(1).await.expect("load"),
            Some(PendingAction::SendToSpecific {
                target_user_id: None
            })
        );
    }
}
