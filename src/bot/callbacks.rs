use super::{gate_update, BotState};
use crate::catalog::{self, CHANNELS};
use crate::database::{PendingAction, UserRecord};
use crate::menu;
use crate::policy::{
    self, REFERRALS_FOR_ALL_WITHDRAW, REFERRALS_FOR_CLICK_BEE, REFERRALS_FOR_MINING,
};
use crate::referral;
use chrono::Utc;
use teloxide::prelude::*;
use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup, ParseMode};
use tracing::error;

const MAIN_MENU_TEXT: &str = "🎮 *Main Menu* 🎮\n\nChoose a category:";

pub async fn handle_callback(bot: Bot, q: CallbackQuery, state: BotState) -> ResponseResult<()> {
    let user_id = q.from.id.0 as i64;

    if let Some(denial) = gate_update(&state, user_id) {
        bot.answer_callback_query(q.id.clone())
            .text(denial)
            .show_alert(true)
            .await?;
        return Ok(());
    }

    let (Some(data), Some(message)) = (q.data.clone(), q.message.clone()) else {
        bot.answer_callback_query(q.id.clone()).await?;
        return Ok(());
    };

    match data.as_str() {
        "verify" => verify(&bot, &q, &message, &state).await,
        "show_channels" => show_channels(&bot, &q, &message).await,
        "main_menu" => main_menu(&bot, &q, &message, &state).await,
        "withdraw" => withdraw(&bot, &q, &message, &state).await,
        "all_bots" => all_bots(&bot, &q, &message, &state).await,
        "premium" => premium(&bot, &q, &message, &state).await,
        "mining" => mining(&bot, &q, &message, &state).await,
        "profile" => profile(&bot, &q, &message, &state).await,
        "referral" => referral_info(&bot, &q, &message, &state).await,
        "about" => about(&bot, &q, &message).await,
        "need_refs" => {
            alert(
                &bot,
                &q,
                "❌ You need 2 referrals to unlock all bots! Use the referral menu to invite friends.",
            )
            .await
        }
        "mining_locked" => mining_locked(&bot, &q, &state).await,
        "click_bee_locked" => click_bee_locked(&bot, &q, &state).await,
        "set_username" => set_username(&bot, &q, &message, &state).await,
        "admin_send_specific" => admin_send_specific(&bot, &q, &message, &state).await,
        "admin_send_all" => admin_send_all(&bot, &q, &message, &state).await,
        "admin_cancel" => admin_cancel(&bot, &q, &message, &state).await,
        other => match menu::parse_page_callback(other) {
            Some((prefix, page)) => turn_page(&bot, &q, &message, prefix, page).await,
            None => alert(&bot, &q, "⚠️ Unknown action. Please try again.").await,
        },
    }
}

async fn answer(bot: &Bot, q: &CallbackQuery) -> ResponseResult<()> {
    bot.answer_callback_query(q.id.clone()).await?;
    Ok(())
}

async fn alert(bot: &Bot, q: &CallbackQuery, text: &str) -> ResponseResult<()> {
    bot.answer_callback_query(q.id.clone())
        .text(text)
        .show_alert(true)
        .await?;
    Ok(())
}

async fn edit(
    bot: &Bot,
    message: &Message,
    text: String,
    markup: Option<InlineKeyboardMarkup>,
) -> ResponseResult<()> {
    let mut request = bot
        .edit_message_text(message.chat.id, message.id, text)
        .parse_mode(ParseMode::Markdown);
    if let Some(markup) = markup {
        request = request.reply_markup(markup);
    }
    request.await?;
    Ok(())
}

/// Loads the caller's record, reporting storage failures as an alert.
async fn load_record(bot: &Bot, q: &CallbackQuery, state: &BotState) -> ResponseResult<Option<UserRecord>> {
    let user_id = q.from.id.0 as i64;
    match state.app.db.get_or_create_user(user_id).await {
        Ok(record) => Ok(Some(record)),
        Err(e) => {
            error!("Storage error in callback for {user_id}: {e}");
            alert(bot, q, "❌ Something went wrong. Please try again later.").await?;
            Ok(None)
        }
    }
}

/// Category gate: the category must be unlocked by policy, and unless dev
/// mode is on the channel membership is probed again on every entry.
async fn passes_category_gate(state: &BotState, q: &CallbackQuery, unlocked: bool) -> bool {
    if !unlocked {
        return false;
    }
    state.app.context.config.dev_mode || state.verifier.is_member_of_all(q.from.id).await
}

async fn verify(bot: &Bot, q: &CallbackQuery, message: &Message, state: &BotState) -> ResponseResult<()> {
    answer(bot, q).await?;
    let user_id = q.from.id.0 as i64;
    let Some(mut record) = load_record(bot, q, state).await? else {
        return Ok(());
    };

    if state.verifier.is_member_of_all(q.from.id).await {
        record.verified = true;
        record.last_check = Utc::now();
        if let Err(e) = state.app.db.save_user(user_id, &record).await {
            error!("Failed to save verification for {user_id}: {e}");
        }

        edit(
            bot,
            message,
            "✅ *Verification Successful!*\n\n\
             Welcome to Earning Club! You now have access to all features."
                .to_string(),
            None,
        )
        .await?;
        bot.send_message(message.chat.id, MAIN_MENU_TEXT)
            .parse_mode(ParseMode::Markdown)
            .reply_markup(menu::main_menu_keyboard(&record))
            .await?;
    } else {
        let channel_list = CHANNELS
            .iter()
            .map(|ch| format!("• {}", ch.name))
            .collect::<Vec<_>>()
            .join("\n");
        let keyboard = InlineKeyboardMarkup::new(vec![
            vec![InlineKeyboardButton::callback("🔄 Try Again", "verify")],
            vec![InlineKeyboardButton::callback(
                "⬅️ Back to Channels",
                "show_channels",
            )],
        ]);
        edit(
            bot,
            message,
            format!(
                "❌ *Verification Failed!*\n\n\
                 Please join ALL channels first:\n{channel_list}\n\nThen click 'Try Again'"
            ),
            Some(keyboard),
        )
        .await?;
    }
    Ok(())
}

async fn show_channels(bot: &Bot, q: &CallbackQuery, message: &Message) -> ResponseResult<()> {
    answer(bot, q).await?;
    edit(
        bot,
        message,
        "🔑 *Join Required Channels:*\n\nPlease join all channels below and then verify:"
            .to_string(),
        Some(menu::join_channels_keyboard()),
    )
    .await
}

async fn main_menu(bot: &Bot, q: &CallbackQuery, message: &Message, state: &BotState) -> ResponseResult<()> {
    answer(bot, q).await?;
    let user_id = q.from.id.0 as i64;
    let Some(mut record) = load_record(bot, q, state).await? else {
        return Ok(());
    };

    if policy::needs_recheck(record.last_check, Utc::now()) {
        if state.verifier.is_member_of_all(q.from.id).await {
            record.last_check = Utc::now();
        } else {
            record.verified = false;
        }
        if let Err(e) = state.app.db.save_user(user_id, &record).await {
            error!("Failed to save recheck for {user_id}: {e}");
        }
        if !record.verified {
            return edit(
                bot,
                message,
                "❌ Session expired! Please verify again.".to_string(),
                None,
            )
            .await;
        }
    }

    edit(
        bot,
        message,
        MAIN_MENU_TEXT.to_string(),
        Some(menu::main_menu_keyboard(&record)),
    )
    .await
}

async fn withdraw(bot: &Bot, q: &CallbackQuery, message: &Message, state: &BotState) -> ResponseResult<()> {
    answer(bot, q).await?;
    let Some(record) = load_record(bot, q, state).await? else {
        return Ok(());
    };
    let caps = policy::capabilities(record.referral_count, record.verified);
    if !passes_category_gate(state, q, caps.free_withdraw).await {
        return alert(bot, q, "❌ Please verify first!").await;
    }

    edit(
        bot,
        message,
        "🆓 *Withdrawable Bots*\n\nFree instant withdrawal bots:".to_string(),
        Some(menu::withdraw_keyboard(&record)),
    )
    .await
}

async fn all_bots(bot: &Bot, q: &CallbackQuery, message: &Message, state: &BotState) -> ResponseResult<()> {
    answer(bot, q).await?;
    let Some(record) = load_record(bot, q, state).await? else {
        return Ok(());
    };
    if record.referral_count < REFERRALS_FOR_ALL_WITHDRAW {
        return alert(bot, q, "❌ You need 2 referrals to unlock all bots!").await;
    }

    edit(
        bot,
        message,
        format!(
            "🌟 *All Withdrawable Bots*\n\nTotal: {} bots available",
            catalog::ALL_WITHDRAW_BOTS.len()
        ),
        Some(menu::paginated_menu(catalog::ALL_WITHDRAW_BOTS, "all_bots", 0)),
    )
    .await
}

async fn premium(bot: &Bot, q: &CallbackQuery, message: &Message, state: &BotState) -> ResponseResult<()> {
    answer(bot, q).await?;
    let Some(record) = load_record(bot, q, state).await? else {
        return Ok(());
    };
    let caps = policy::capabilities(record.referral_count, record.verified);
    if !passes_category_gate(state, q, caps.premium_basic).await {
        return alert(bot, q, "❌ Please verify first!").await;
    }

    edit(
        bot,
        message,
        format!(
            "💎 *Premium Bots*\n\nTotal: {} premium bots available",
            catalog::PREMIUM_BOTS.len() + 1
        ),
        Some(menu::premium_keyboard(&record)),
    )
    .await
}

async fn mining(bot: &Bot, q: &CallbackQuery, message: &Message, state: &BotState) -> ResponseResult<()> {
    bot.answer_callback_query(q.id.clone())
        .text("⏳ Loading mining bots...")
        .await?;
    let Some(record) = load_record(bot, q, state).await? else {
        return Ok(());
    };
    let caps = policy::capabilities(record.referral_count, record.verified);
    if !passes_category_gate(state, q, record.verified).await {
        return alert(bot, q, "❌ Please verify first!").await;
    }
    if !caps.mining {
        let needed = REFERRALS_FOR_MINING - record.referral_count;
        return alert(bot, q, &format!("❌ Need {needed} more referrals!")).await;
    }

    edit(
        bot,
        message,
        format!(
            "⛏️ *Mining Bots*\n\nTotal: {} mining bots available",
            catalog::MINING_BOTS.len()
        ),
        Some(menu::paginated_menu(catalog::MINING_BOTS, "mining_bots", 0)),
    )
    .await
}

async fn profile(bot: &Bot, q: &CallbackQuery, message: &Message, state: &BotState) -> ResponseResult<()> {
    answer(bot, q).await?;
    let Some(record) = load_record(bot, q, state).await? else {
        return Ok(());
    };

    let progress = (record.referral_count as f64 / REFERRALS_FOR_MINING as f64 * 100.0).min(100.0);
    let filled = (progress / 10.0) as usize;
    let bar = format!("{}{}", "▰".repeat(filled), "▱".repeat(10 - filled));

    let text = format!(
        "👤 *Your Profile*\n\n\
         Name: {}\n\
         Username: @{}\n\
         Join Date: {}\n\
         Referrals: {}\n\
         Progress to Mining: {bar} {progress:.0}%\n\
         Status: {}",
        q.from.first_name,
        record.display_username().unwrap_or("N/A"),
        record.join_date.format("%Y-%m-%d %H:%M"),
        record.referral_count,
        if record.verified {
            "✅ Verified"
        } else {
            "❌ Not Verified"
        }
    );
    edit(
        bot,
        message,
        text,
        Some(menu::profile_keyboard(q.from.username.is_some())),
    )
    .await
}

async fn referral_info(bot: &Bot, q: &CallbackQuery, message: &Message, state: &BotState) -> ResponseResult<()> {
    answer(bot, q).await?;
    let Some(record) = load_record(bot, q, state).await? else {
        return Ok(());
    };

    let link = referral::referral_link(&state.bot_username, q.from.id.0 as i64);
    let text = format!(
        "📤 *Referral Program*\n\n\
         Your referrals: {}\n\n\
         🔗 Your referral link:\n`{link}`\n\n\
         🎁 *Rewards:*\n\
         • 2 refs = Unlock ALL withdrawal bots\n\
         • 3 refs = Unlock Click Bee VIP (Premium referral bot)\n\
         • 5 refs = Unlock mining bots\n\n\
         🐝 *Click Bee Bot* is a premium referral bot - invite others and earn through referrals!\n\n\
         Share and earn together! 🚀",
        record.referral_count
    );
    edit(bot, message, text, Some(back_only_keyboard())).await
}

async fn about(bot: &Bot, q: &CallbackQuery, message: &Message) -> ResponseResult<()> {
    answer(bot, q).await?;
    edit(
        bot,
        message,
        "ℹ️ *About Earning Club Bot*\n\n\
         Your ultimate crypto earning platform with:\n\
         • 50+ verified earning bots\n\
         • Instant withdrawal options\n\
         • Premium mining opportunities\n\
         • Referral rewards system\n\n\
         Start small, earn big, and grow your crypto portfolio!\n\n\
         💡 *Tip:* Invite friends to unlock more features!"
            .to_string(),
        Some(back_only_keyboard()),
    )
    .await
}

fn back_only_keyboard() -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![vec![InlineKeyboardButton::callback(
        "⬅️ Back",
        "main_menu",
    )]])
}

async fn mining_locked(bot: &Bot, q: &CallbackQuery, state: &BotState) -> ResponseResult<()> {
    let Some(record) = load_record(bot, q, state).await? else {
        return Ok(());
    };
    let needed = REFERRALS_FOR_MINING.saturating_sub(record.referral_count);
    alert(
        bot,
        q,
        &format!(
            "❌ Mining bots need 5 referrals! You need {needed} more. Use referral menu to invite friends."
        ),
    )
    .await
}

async fn click_bee_locked(bot: &Bot, q: &CallbackQuery, state: &BotState) -> ResponseResult<()> {
    let Some(record) = load_record(bot, q, state).await? else {
        return Ok(());
    };
    let needed = REFERRALS_FOR_CLICK_BEE.saturating_sub(record.referral_count);
    alert(
        bot,
        q,
        &format!(
            "🐝 To unlock Click Bee Bot you will have to refer 3 friends! You need {needed} more referrals."
        ),
    )
    .await
}

async fn set_username(bot: &Bot, q: &CallbackQuery, message: &Message, state: &BotState) -> ResponseResult<()> {
    answer(bot, q).await?;
    let user_id = q.from.id.0 as i64;
    if let Err(e) = state
        .app
        .db
        .save_pending(user_id, &PendingAction::SetUsername)
        .await
    {
        error!("Failed to open username flow for {user_id}: {e}");
        return alert(bot, q, "❌ Something went wrong. Please try again later.").await;
    }

    let keyboard = InlineKeyboardMarkup::new(vec![vec![InlineKeyboardButton::callback(
        "❌ Cancel", "profile",
    )]]);
    edit(
        bot,
        message,
        "📝 *Set Your Username*\n\n\
         Please send your desired username (without @):\n\n\
         Example: `myusername`\n\n\
         Note: This will be stored in your profile for display purposes."
            .to_string(),
        Some(keyboard),
    )
    .await
}

async fn admin_send_specific(bot: &Bot, q: &CallbackQuery, message: &Message, state: &BotState) -> ResponseResult<()> {
    let user_id = q.from.id.0 as i64;
    if !state.is_admin(user_id) {
        return alert(bot, q, "❌ Admin only!").await;
    }
    answer(bot, q).await?;

    if let Err(e) = state
        .app
        .db
        .save_pending(user_id, &PendingAction::SendToSpecific { target_user_id: None })
        .await
    {
        error!("Failed to open send-specific flow: {e}");
        return Ok(());
    }
    edit(
        bot,
        message,
        "👤 *Send to Specific User*\n\nPlease send the user ID (number only):".to_string(),
        None,
    )
    .await
}

async fn admin_send_all(bot: &Bot, q: &CallbackQuery, message: &Message, state: &BotState) -> ResponseResult<()> {
    let user_id = q.from.id.0 as i64;
    if !state.is_admin(user_id) {
        return alert(bot, q, "❌ Admin only!").await;
    }
    answer(bot, q).await?;

    if let Err(e) = state.app.db.save_pending(user_id, &PendingAction::SendToAll).await {
        error!("Failed to open send-all flow: {e}");
        return Ok(());
    }
    edit(
        bot,
        message,
        "📢 *Send to All Users*\n\nPlease type your message:".to_string(),
        None,
    )
    .await
}

async fn admin_cancel(bot: &Bot, q: &CallbackQuery, message: &Message, state: &BotState) -> ResponseResult<()> {
    let user_id = q.from.id.0 as i64;
    if !state.is_admin(user_id) {
        return alert(bot, q, "❌ Admin only!").await;
    }
    answer(bot, q).await?;

    if let Err(e) = state.app.db.clear_pending(user_id).await {
        error!("Failed to clear pending action: {e}");
    }
    edit(bot, message, "❌ Action cancelled.".to_string(), None).await
}

async fn turn_page(
    bot: &Bot,
    q: &CallbackQuery,
    message: &Message,
    prefix: &str,
    page: usize,
) -> ResponseResult<()> {
    answer(bot, q).await?;

    let (items, header) = match prefix {
        "all_bots" => (
            catalog::ALL_WITHDRAW_BOTS,
            format!(
                "🌟 *All Withdrawable Bots*\n\nTotal: {} bots available",
                catalog::ALL_WITHDRAW_BOTS.len()
            ),
        ),
        "premium_bots" => (
            catalog::PREMIUM_BOTS,
            format!(
                "💎 *Premium Bots*\n\nTotal: {} premium bots available",
                catalog::PREMIUM_BOTS.len()
            ),
        ),
        "mining_bots" => (
            catalog::MINING_BOTS,
            format!(
                "⛏️ *Mining Bots*\n\nTotal: {} mining bots available",
                catalog::MINING_BOTS.len()
            ),
        ),
        _ => return alert(bot, q, "⚠️ Unknown action. Please try again.").await,
    };

    edit(
        bot,
        message,
        header,
        Some(menu::paginated_menu(items, prefix, page)),
    )
    .await
}
