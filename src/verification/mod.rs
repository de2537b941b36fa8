//! Channel-membership verification against the Telegram API.

use crate::catalog::{Channel, CHANNELS};
use async_trait::async_trait;
use std::future::Future;
use teloxide::prelude::*;
use teloxide::types::{ChatMemberKind, Recipient};
use tracing::error;

/// Seam for the membership check so handlers and the referral-gated menus
/// can be exercised without the Telegram API.
#[async_trait]
pub trait MembershipVerifier: Send + Sync {
    /// All-or-nothing across the required channel set.
    async fn is_member_of_all(&self, user_id: UserId) -> bool;
}

pub struct ChannelVerifier {
    bot: Bot,
    channels: &'static [Channel],
}

impl ChannelVerifier {
    pub fn new(bot: Bot) -> Self {
        Self {
            bot,
            channels: CHANNELS,
        }
    }
}

#[async_trait]
impl MembershipVerifier for ChannelVerifier {
    async fn is_member_of_all(&self, user_id: UserId) -> bool {
        check_all(self.channels, |channel| {
            let bot = self.bot.clone();
            async move {
                bot.get_chat_member(Recipient::ChannelUsername(channel.id.to_string()), user_id)
                    .await
                    .map(|member| is_joined(&member.kind))
                    .map_err(|e| e.to_string())
            }
        })
        .await
    }
}

fn is_joined(kind: &ChatMemberKind) -> bool {
    matches!(
        kind,
        ChatMemberKind::Owner(_) | ChatMemberKind::Administrator(_) | ChatMemberKind::Member
    )
}

/// Short-circuits to `false` on the first channel that fails or whose probe
/// errors; an API error is treated the same as "not a member".
async fn check_all<F, Fut>(channels: &'static [Channel], probe: F) -> bool
where
    F: Fn(&'static Channel) -> Fut,
    Fut: Future<Output = Result<bool, String>>,
{
    for channel in channels {
        match probe(channel).await {
            Ok(true) => {}
            Ok(false) => return false,
            Err(e) => {
                error!("Channel check error for {}: {e}", channel.id);
                return false;
            }
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    static THREE_CHANNELS: &[Channel] = &[
        Channel {
            name: "A",
            url: "https://t.me/a",
            id: "@a",
        },
        Channel {
            name: "B",
            url: "https://t.me/b",
            id: "@b",
        },
        Channel {
            name: "C",
            url: "https://t.me/c",
            id: "@c",
        },
    ];

    #[tokio::test]
    async fn missing_one_channel_fails_the_whole_check() {
        let result = check_all(THREE_CHANNELS, |channel| {
            let joined = channel.id != "@c";
            async move { Ok(joined) }
        })
        .await;
        assert!(!result);
    }

    #[tokio::test]
    async fn member_of_all_channels_passes() {
        assert!(check_all(THREE_CHANNELS, |_| async { Ok(true) }).await);
    }

    #[tokio::test]
    async fn probe_error_counts_as_not_a_member_and_short_circuits() {
        let probes = AtomicUsize::new(0);
        let result = check_all(THREE_CHANNELS, |channel| {
            probes.fetch_add(1, Ordering::SeqCst);
            let outcome = if channel.id == "@b" {
                Err("chat not found".to_string())
            } else {
                Ok(true)
            };
            async move { outcome }
        })
        .await;
        assert!(!result);
        // A passed, B errored, C was never probed.
        assert_eq!(probes.load(Ordering::SeqCst), 2);
    }
}
