//! Guided-flow state machine and broadcast delivery.
//!
//! The pending action itself is persisted through the database's single-slot
//! store; this module owns the transition logic so it can be tested without
//! Telegram in the loop.

use crate::database::PendingAction;
use async_trait::async_trait;
use thiserror::Error;
use tracing::debug;

pub const USERNAME_MIN_LEN: usize = 3;
pub const USERNAME_MAX_LEN: usize = 32;
pub const REQUEST_MAX_LEN: usize = 1000;
pub const REPLY_MAX_LEN: usize = 4000;

/// What a text input did to the pending flow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlowOutcome {
    /// Invalid input: keep the slot as-is and re-prompt.
    Reprompt { reply: String },
    /// Flow advanced one step: persist `next`, send `reply`.
    Advance { next: PendingAction, reply: String },
    /// Flow finished: send `text` to one user, clear the slot regardless of
    /// delivery success.
    SendTo { target_user_id: i64, text: String },
    /// Flow finished: broadcast `text` to every known user, clear the slot.
    Broadcast { text: String },
    /// Flow finished: store the validated username, clear the slot.
    SetUsername { username: String },
}

/// Feeds one text input into the pending flow. Pure: persistence and
/// delivery are the caller's job.
pub fn advance(action: &PendingAction, input: &str) -> FlowOutcome {
    match action {
        PendingAction::SetUsername => match validate_username(input) {
            Ok(username) => FlowOutcome::SetUsername { username },
            Err(reason) => FlowOutcome::Reprompt {
                reply: format!("❌ {reason} Please try again:"),
            },
        },
        PendingAction::SendToSpecific {
            target_user_id: None,
        } => match input.trim().parse::<i64>() {
            Ok(target) => FlowOutcome::Advance {
                next: PendingAction::SendToSpecific {
                    target_user_id: Some(target),
                },
                reply: format!("✅ Target user: {target}\n\nNow type your message:"),
            },
            Err(_) => FlowOutcome::Reprompt {
                reply: "❌ Invalid user ID. Please send numbers only.".to_string(),
            },
        },
        PendingAction::SendToSpecific {
            target_user_id: Some(target),
        } => FlowOutcome::SendTo {
            target_user_id: *target,
            text: input.to_string(),
        },
        PendingAction::SendToAll => FlowOutcome::Broadcast {
            text: input.to_string(),
        },
    }
}

/// Strips a leading `@`, then requires 3-32 chars of `[A-Za-z0-9_]`.
pub fn validate_username(input: &str) -> Result<String, &'static str> {
    let username = input.trim().trim_start_matches('@').to_string();
    if username.len() < USERNAME_MIN_LEN || username.len() > USERNAME_MAX_LEN {
        return Err("Username must be between 3-32 characters long.");
    }
    if !username.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err("Username can only contain letters, numbers, and underscores.");
    }
    Ok(username)
}

#[derive(Debug, Error)]
#[error("{0}")]
pub struct SendError(pub String);

/// Outbound message delivery, abstracted so broadcast accounting can be
/// tested with a scripted failure set.
#[async_trait]
pub trait Messenger: Send + Sync {
    async fn send_text(&self, user_id: i64, text: &str) -> Result<(), SendError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BroadcastReport {
    pub sent: usize,
    pub failed: usize,
    pub total: usize,
}

impl BroadcastReport {
    pub fn summary(&self) -> String {
        format!(
            "📊 *Broadcast Complete*\n\n✅ Sent: {}\n❌ Failed: {}\n👥 Total users: {}",
            self.sent, self.failed, self.total
        )
    }
}

/// Delivers `text` to every recipient. Per-recipient failures are counted
/// and never abort the remaining sends.
pub async fn broadcast(
    messenger: &dyn Messenger,
    recipients: &[i64],
    text: &str,
) -> BroadcastReport {
    let mut sent = 0;
    let mut failed = 0;
    for &user_id in recipients {
        match messenger.send_text(user_id, text).await {
            Ok(()) => sent += 1,
            Err(e) => {
                debug!("Broadcast delivery to {user_id} failed: {e}");
                failed += 1;
            }
        }
    }
    BroadcastReport {
        sent,
        failed,
        total: recipients.len(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Mutex;

    #[test]
    fn send_to_specific_round_trip() {
        let start = PendingAction::SendToSpecific {
            target_user_id: None,
        };

        let FlowOutcome::Advance { next, .. } = advance(&start, "42") else {
            panic!("numeric id should advance the flow");
        };
        assert_eq!(
            next,
            PendingAction::SendToSpecific {
                target_user_id: Some(42)
            }
        );

        assert_eq!(
            advance(&next, "hi"),
            FlowOutcome::SendTo {
                target_user_id: 42,
                text: "hi".to_string()
            }
        );
    }

    #[test]
    fn non_numeric_target_reprompts_without_state_change() {
        let start = PendingAction::SendToSpecific {
            target_user_id: None,
        };
        assert!(matches!(
            advance(&start, "forty-two"),
            FlowOutcome::Reprompt { .. }
        ));
        // The slot is untouched; a numeric retry still works.
        assert!(matches!(advance(&start, "42"), FlowOutcome::Advance { .. }));
    }

    #[test]
    fn send_to_all_consumes_next_text() {
        assert_eq!(
            advance(&PendingAction::SendToAll, "New bots added!"),
            FlowOutcome::Broadcast {
                text: "New bots added!".to_string()
            }
        );
    }

    #[test]
    fn username_flow_validates_and_reprompts() {
        let action = PendingAction::SetUsername;
        assert_eq!(
            advance(&action, "@my_name"),
            FlowOutcome::SetUsername {
                username: "my_name".to_string()
            }
        );
        assert!(matches!(advance(&action, "ab"), FlowOutcome::Reprompt { .. }));
        assert!(matches!(
            advance(&action, "bad name!"),
            FlowOutcome::Reprompt { .. }
        ));
    }

    #[test]
    fn username_validation_bounds() {
        assert!(validate_username("abc").is_ok());
        assert_eq!(validate_username("a_1").unwrap(), "a_1");
        assert!(validate_username(&"x".repeat(32)).is_ok());
        assert!(validate_username(&"x".repeat(33)).is_err());
        assert!(validate_username("ab").is_err());
        assert!(validate_username("has space").is_err());
        assert!(validate_username("emoji🐝").is_err());
    }

    struct FlakyMessenger {
        failing: HashSet<i64>,
        delivered: Mutex<Vec<i64>>,
    }

    #[async_trait]
    impl Messenger for FlakyMessenger {
        async fn send_text(&self, user_id: i64, _text: &str) -> Result<(), SendError> {
            if self.failing.contains(&user_id) {
                return Err(SendError("blocked by user".to_string()));
            }
            self.delivered.lock().unwrap().push(user_id);
            Ok(())
        }
    }

    #[tokio::test]
    async fn broadcast_counts_failures_without_aborting() {
        let messenger = FlakyMessenger {
            failing: HashSet::from([2, 4]),
            delivered: Mutex::new(Vec::new()),
        };
        let recipients = [1, 2, 3, 4, 5];

        let report = broadcast(&messenger, &recipients, "hello").await;
        assert_eq!(
            report,
            BroadcastReport {
                sent: 3,
                failed: 2,
                total: 5
            }
        );
        // Failures in the middle did not stop later deliveries.
        assert_eq!(*messenger.delivered.lock().unwrap(), vec![1, 3, 5]);
    }
}
