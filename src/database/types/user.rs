use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// One record per user, stored as a JSON blob keyed by user id.
///
/// Every field carries a serde default so records written by older versions
/// of the bot load with the missing fields filled in instead of failing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UserRecord {
    #[serde(default)]
    pub verified: bool,
    #[serde(default)]
    pub referral_count: u32,
    /// Ids of the users this user referred. Invariant:
    /// `referrals.len() == referral_count as usize`.
    #[serde(default)]
    pub referrals: BTreeSet<String>,
    #[serde(default = "Utc::now")]
    pub join_date: DateTime<Utc>,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub custom_username: Option<String>,
    /// When membership was last verified against the channel list.
    #[serde(default = "Utc::now")]
    pub last_check: DateTime<Utc>,
    /// Set at most once, never cleared.
    #[serde(default)]
    pub referred_by: Option<String>,
    #[serde(default)]
    pub banned: bool,
    #[serde(default = "Utc::now")]
    pub last_login: DateTime<Utc>,
}

impl Default for UserRecord {
    fn default() -> Self {
        Self {
            verified: false,
            referral_count: 0,
            referrals: BTreeSet::new(),
            join_date: Utc::now(),
            first_name: String::new(),
            username: String::new(),
            custom_username: None,
            last_check: Utc::now(),
            referred_by: None,
            banned: false,
            last_login: Utc::now(),
        }
    }
}

impl UserRecord {
    /// Username shown on the profile: the custom one wins if set.
    pub fn display_username(&self) -> Option<&str> {
        self.custom_username
            .as_deref()
            .or(if self.username.is_empty() {
                None
            } else {
                Some(self.username.as_str())
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn old_records_load_with_defaults_filled() {
        // A blob written before custom_username / banned existed.
        let record: UserRecord =
            serde_json::from_str(r#"{"verified": true, "referral_count": 2}"#)
                .expect("partial record should deserialize");
        assert!(record.verified);
        assert_eq!(record.referral_count, 2);
        assert!(record.referrals.is_empty());
        assert!(!record.banned);
        assert!(record.custom_username.is_none());
        assert!(record.referred_by.is_none());
    }

    #[test]
    fn custom_username_wins_over_telegram_username() {
        let mut record = UserRecord {
            username: "tg_name".to_string(),
            ..Default::default()
        };
        assert_eq!(record.display_username(), Some("tg_name"));

        record.custom_username = Some("my_name".to_string());
        assert_eq!(record.display_username(), Some("my_name"));

        let empty = UserRecord::default();
        assert_eq!(empty.display_username(), None);
    }
}
