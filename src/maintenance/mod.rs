//! Daily maintenance loop: a database snapshot plus a stats report delivered
//! to the admin once every 24 hours.

use crate::core::service_manager::{Error as ServiceError, Service};
use crate::database::{Database, UserRecord};
use crate::AppContext;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use teloxide::prelude::*;
use teloxide::types::ParseMode;
use tracing::{error, info};

const RUN_INTERVAL: Duration = Duration::from_secs(24 * 60 * 60);

pub struct MaintenanceService {
    bot: Bot,
    db: Arc<Database>,
    admin_id: i64,
}

#[async_trait]
impl Service for MaintenanceService {
    type Context = AppContext;

    async fn new(context: AppContext) -> Self {
        Self {
            bot: Bot::new(&context.context.config.bot_token),
            db: context.db.clone(),
            admin_id: context.context.config.admin_id,
        }
    }

    async fn run(self) -> Result<(), ServiceError> {
        loop {
            tokio::time::sleep(RUN_INTERVAL).await;
            info!("Running daily maintenance");

            let backup_ok = match self.db.backup().await {
                Ok(path) => {
                    info!("Daily backup created: {}", path.display());
                    true
                }
                Err(e) => {
                    error!("Daily backup failed: {e}");
                    false
                }
            };

            match self.db.all_users().await {
                Ok(users) if users.is_empty() => {}
                Ok(users) => {
                    // Delivery failure is logged and the loop keeps going.
                    if let Err(e) = self
                        .bot
                        .send_message(ChatId(self.admin_id), daily_report(&users, backup_ok))
                        .parse_mode(ParseMode::Markdown)
                        .await
                    {
                        error!("Failed to send daily report: {e}");
                    }
                }
                Err(e) => error!("Daily report skipped, storage error: {e}"),
            }
        }
    }
}

fn daily_report(users: &[(i64, UserRecord)], backup_ok: bool) -> String {
    let verified = users.iter().filter(|(_, u)| u.verified).count();
    let total_referrals: u32 = users.iter().map(|(_, u)| u.referral_count).sum();
    format!(
        "📊 *Daily Report*\n\n\
         👥 Total Users: {}\n\
         ✅ Verified: {verified}\n\
         📈 Total Referrals: {total_referrals}\n\
         💾 Backup: {}",
        users.len(),
        if backup_ok { "✅ Created" } else { "❌ Failed" }
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(verified: bool, referral_count: u32) -> UserRecord {
        UserRecord {
            verified,
            referral_count,
            ..Default::default()
        }
    }

    #[test]
    fn report_aggregates_users_and_backup_status() {
        let users = vec![(1, user(true, 2)), (2, user(false, 0)), (3, user(true, 5))];

        let report = daily_report(&users, true);
        assert!(report.contains("👥 Total Users: 3"));
        assert!(report.contains("✅ Verified: 2"));
        assert!(report.contains("📈 Total Referrals: 7"));
        assert!(report.contains("💾 Backup: ✅ Created"));
    }

    #[test]
    fn failed_backup_is_reported_as_such() {
        let users = vec![(1, user(false, 0))];
        let report = daily_report(&users, false);
        assert!(report.contains("💾 Backup: ❌ Failed"));
    }
}
