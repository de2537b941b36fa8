//! Telegram front end: dispatcher wiring, shared handler state and the
//! outbound messenger used by broadcasts and notifications.

use crate::admin::{Messenger, SendError};
use crate::core::service_manager::{Error as ServiceError, Service};
use crate::verification::{ChannelVerifier, MembershipVerifier};
use crate::AppContext;
use async_trait::async_trait;
use std::sync::Arc;
use teloxide::prelude::*;
use teloxide::types::ParseMode;
use teloxide::utils::command::BotCommands;
use tracing::{error, info};

mod callbacks;
mod commands;
mod messages;

pub use commands::Command;

/// Everything a handler needs, injected through the dispatcher.
#[derive(Clone)]
pub struct BotState {
    pub app: AppContext,
    pub verifier: Arc<dyn MembershipVerifier>,
    pub bot_username: String,
}

impl BotState {
    pub fn is_admin(&self, user_id: i64) -> bool {
        self.app.context.config.is_admin(user_id)
    }
}

pub struct BotService {
    bot: Bot,
    context: AppContext,
}

#[async_trait]
impl Service for BotService {
    type Context = AppContext;

    async fn new(context: AppContext) -> Self {
        let bot = Bot::new(&context.context.config.bot_token);
        Self { bot, context }
    }

    async fn run(self) -> Result<(), ServiceError> {
        let me = self.bot.get_me().await.map_err(ServiceError::from)?;
        let state = BotState {
            app: self.context,
            verifier: Arc::new(ChannelVerifier::new(self.bot.clone())),
            bot_username: me.username().to_string(),
        };

        if let Err(e) = self.bot.set_my_commands(Command::bot_commands()).await {
            error!("Failed to set bot command list: {e}");
        }

        info!("Starting polling as @{}", state.bot_username);
        let handler = dptree::entry()
            .branch(
                Update::filter_message()
                    .filter_command::<Command>()
                    .endpoint(commands::handle_command),
            )
            .branch(Update::filter_message().endpoint(messages::handle_text))
            .branch(Update::filter_callback_query().endpoint(callbacks::handle_callback));

        Dispatcher::builder(self.bot, handler)
            .dependencies(dptree::deps![state])
            .default_handler(|_| async {})
            .enable_ctrlc_handler()
            .build()
            .dispatch()
            .await;
        Ok(())
    }
}

/// Bot-backed delivery for broadcasts and best-effort notifications.
pub struct TelegramMessenger {
    bot: Bot,
}

impl TelegramMessenger {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }
}

#[async_trait]
impl Messenger for TelegramMessenger {
    async fn send_text(&self, user_id: i64, text: &str) -> Result<(), SendError> {
        self.bot
            .send_message(ChatId(user_id), text)
            .parse_mode(ParseMode::Markdown)
            .await
            .map(|_| ())
            .map_err(|e| SendError(e.to_string()))
    }
}

/// Rate-limit, fast-path-ban and maintenance gate applied to every inbound
/// update. Returns the denial text when the update must be dropped.
pub(crate) fn gate_update(state: &BotState, user_id: i64) -> Option<&'static str> {
    use crate::ratelimit::Verdict;
    match state.app.limiter.check(user_id) {
        Verdict::Allowed => {}
        Verdict::Banned => return Some("🚫 Your account is banned."),
        Verdict::RateLimited => return Some("⚠️ Too many requests. Please wait 1 minute."),
    }
    if state.app.context.config.maintenance_mode && !state.is_admin(user_id) {
        return Some("🔧 Bot is under maintenance. Please try again later. We'll be back soon!");
    }
    None
}
