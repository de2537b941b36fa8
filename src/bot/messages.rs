use super::{gate_update, BotState, TelegramMessenger};
use crate::admin::{self, FlowOutcome, Messenger};
use crate::database::PendingAction;
use crate::menu;
use teloxide::prelude::*;
use teloxide::types::ParseMode;
use tracing::error;

/// Plain-text messages: either a step in a pending guided flow, or an
/// unknown slash command. Anything else is ignored.
pub async fn handle_text(bot: Bot, msg: Message, state: BotState) -> ResponseResult<()> {
    let Some(user) = msg.from() else {
        return Ok(());
    };
    let Some(text) = msg.text() else {
        return Ok(());
    };
    let user_id = user.id.0 as i64;

    if let Some(denial) = gate_update(&state, user_id) {
        bot.send_message(msg.chat.id, denial).await?;
        return Ok(());
    }

    if text.starts_with('/') {
        return unknown_command(&bot, &msg, text).await;
    }

    let pending = match state.app.db.load_pending(user_id).await {
        Ok(pending) => pending,
        Err(e) => {
            error!("Failed to load pending action for {user_id}: {e}");
            None
        }
    };
    let Some(action) = pending else {
        return Ok(());
    };

    // Guided-flow steps past the first are admin-only, except the username
    // flow which any user may have opened from their profile.
    if !matches!(action, PendingAction::SetUsername) && !state.is_admin(user_id) {
        return Ok(());
    }

    match admin::advance(&action, text) {
        FlowOutcome::Reprompt { reply } => {
            bot.send_message(msg.chat.id, reply).await?;
        }
        FlowOutcome::Advance { next, reply } => {
            if let Err(e) = state.app.db.save_pending(user_id, &next).await {
                error!("Failed to persist flow step for {user_id}: {e}");
            }
            bot.send_message(msg.chat.id, reply).await?;
        }
        FlowOutcome::SetUsername { username } => {
            set_username(&bot, &msg, &state, user_id, &username).await?;
        }
        FlowOutcome::SendTo {
            target_user_id,
            text,
        } => {
            let outcome = bot
                .send_message(
                    ChatId(target_user_id),
                    format!("👑 *Message from Admin*\n\n{text}"),
                )
                .parse_mode(ParseMode::Markdown)
                .await;
            let reply = match outcome {
                Ok(_) => format!("✅ Message sent to user {target_user_id}"),
                Err(e) => format!("❌ Failed to send: {e}"),
            };
            bot.send_message(msg.chat.id, reply).await?;
            clear_pending(&state, user_id).await;
        }
        FlowOutcome::Broadcast { text } => {
            let recipients = match state.app.db.all_users().await {
                Ok(users) => users.into_iter().map(|(id, _)| id).collect::<Vec<_>>(),
                Err(e) => {
                    error!("Broadcast aborted, storage error: {e}");
                    bot.send_message(msg.chat.id, "❌ Failed to load user list")
                        .await?;
                    clear_pending(&state, user_id).await;
                    return Ok(());
                }
            };
            let messenger = TelegramMessenger::new(bot.clone());
            let report = admin::broadcast(
                &messenger,
                &recipients,
                &format!("👑 *Broadcast from Admin*\n\n{text}"),
            )
            .await;
            bot.send_message(msg.chat.id, report.summary())
                .parse_mode(ParseMode::Markdown)
                .await?;
            clear_pending(&state, user_id).await;
        }
    }
    Ok(())
}

async fn set_username(
    bot: &Bot,
    msg: &Message,
    state: &BotState,
    user_id: i64,
    username: &str,
) -> ResponseResult<()> {
    match state.app.db.get_or_create_user(user_id).await {
        Ok(mut record) => {
            record.custom_username = Some(username.to_string());
            if let Err(e) = state.app.db.save_user(user_id, &record).await {
                error!("Failed to save username for {user_id}: {e}");
                bot.send_message(msg.chat.id, "❌ Something went wrong. Please try again later.")
                    .await?;
                return Ok(());
            }
            clear_pending(state, user_id).await;

            bot.send_message(
                msg.chat.id,
                format!("✅ Username set to: @{username}\n\nYour profile has been updated!"),
            )
            .parse_mode(ParseMode::Markdown)
            .await?;

            let profile = format!(
                "👤 *Your Profile*\n\n\
                 Name: {}\n\
                 Username: @{}\n\
                 Join Date: {}\n\
                 Referrals: {}\n\
                 Status: {}",
                record.first_name,
                record.display_username().unwrap_or("N/A"),
                record.join_date.format("%Y-%m-%d %H:%M"),
                record.referral_count,
                if record.verified {
                    "✅ Verified"
                } else {
                    "❌ Not Verified"
                }
            );
            bot.send_message(msg.chat.id, profile)
                .parse_mode(ParseMode::Markdown)
                .reply_markup(menu::profile_keyboard(true))
                .await?;
        }
        Err(e) => {
            error!("Storage error in username flow for {user_id}: {e}");
            bot.send_message(msg.chat.id, "❌ Something went wrong. Please try again later.")
                .await?;
        }
    }
    Ok(())
}

async fn clear_pending(state: &BotState, user_id: i64) {
    if let Err(e) = state.app.db.clear_pending(user_id).await {
        error!("Failed to clear pending action for {user_id}: {e}");
    }
}

async fn unknown_command(bot: &Bot, msg: &Message, command: &str) -> ResponseResult<()> {
    bot.send_message(
        msg.chat.id,
        format!(
            "❓ *Unknown Command: {command}*\n\n\
             Available commands:\n\
             • `/start` - Start the bot\n\
             • `/help` - Show help\n\
             • `/request` - Contact admin\n\
             • `/restart` - Restart session\n\n\
             Use `/help` for more information."
        ),
    )
    .parse_mode(ParseMode::Markdown)
    .await?;
    Ok(())
}
