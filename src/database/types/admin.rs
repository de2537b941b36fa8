use serde::{Deserialize, Serialize};

/// At most one pending guided flow per actor. Starting a new flow silently
/// overwrites any incomplete one; there is no queuing.
///
/// The same slot mechanism serves the user-facing username flow and the
/// admin messaging flows, distinguished by the `action` tag.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum PendingAction {
    /// User is about to send their desired display username.
    SetUsername,
    /// Admin targeted-message flow. `target_user_id = None` means we are
    /// still waiting for a numeric id; `Some` means waiting for the text.
    SendToSpecific {
        #[serde(default)]
        target_user_id: Option<i64>,
    },
    /// Admin broadcast flow: the next text input goes to every known user.
    SendToAll,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pending_action_round_trips_through_json() {
        let action = PendingAction::SendToSpecific {
            target_user_id: Some(42),
        };
        let json = serde_json::to_string(&action).expect("serialize");
        assert!(json.contains("send_to_specific"));
        let back: PendingAction = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back, action);
    }

    #[test]
    fn stored_step_defaults_to_awaiting_target() {
        let action: PendingAction =
            serde_json::from_str(r#"{"action": "send_to_specific"}"#).expect("deserialize");
        assert_eq!(
            action,
            PendingAction::SendToSpecific {
                target_user_id: None
            }
        );
    }
}
