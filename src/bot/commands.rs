use super::{gate_update, BotState, TelegramMessenger};
use crate::admin::{self, REPLY_MAX_LEN, REQUEST_MAX_LEN};
use crate::catalog::BOT_DESCRIPTION;
use crate::menu;
use crate::referral;
use chrono::{DateTime, Utc};
use teloxide::prelude::*;
use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup, InputFile, ParseMode, User};
use teloxide::utils::command::BotCommands;
use tracing::{error, info};

#[derive(BotCommands, Clone)]
#[command(rename_rule = "lowercase")]
pub enum Command {
    #[command(description = "Start the bot and access main menu")]
    Start(String),
    #[command(description = "Show help information")]
    Help,
    #[command(description = "Send a message to admin")]
    Request(String),
    #[command(description = "Restart your bot session")]
    Restart,
    #[command(description = "Reply to a user request (Admin only)")]
    Reply(String),
    #[command(description = "Open the admin message panel (Admin only)")]
    Sendmessage,
    #[command(description = "Broadcast to all users (Admin only)")]
    Broadcast(String),
    #[command(description = "Show bot statistics (Admin only)")]
    Stats,
    #[command(description = "Export user data (Admin only)")]
    Export,
    #[command(description = "Backup database (Admin only)")]
    Backup,
    #[command(description = "Ban a user (Admin only)")]
    Ban(String),
    #[command(description = "Unban a user (Admin only)")]
    Unban(String),
}

pub async fn handle_command(
    bot: Bot,
    msg: Message,
    cmd: Command,
    state: BotState,
) -> ResponseResult<()> {
    let Some(user) = msg.from().cloned() else {
        return Ok(());
    };
    let user_id = user.id.0 as i64;

    if let Some(denial) = gate_update(&state, user_id) {
        bot.send_message(msg.chat.id, denial).await?;
        return Ok(());
    }

    match cmd {
        Command::Start(payload) => start(&bot, &msg, &state, &user, &payload).await,
        Command::Help => help(&bot, &msg).await,
        Command::Request(text) => request(&bot, &msg, &state, &user, &text).await,
        Command::Restart => restart(&bot, &msg, &state, user_id).await,
        Command::Reply(args) => reply(&bot, &msg, &state, user_id, &args).await,
        Command::Sendmessage => send_message_panel(&bot, &msg, &state, user_id).await,
        Command::Broadcast(text) => broadcast(&bot, &msg, &state, user_id, &text).await,
        Command::Stats => stats(&bot, &msg, &state, user_id).await,
        Command::Export => export(&bot, &msg, &state, user_id).await,
        Command::Backup => backup(&bot, &msg, &state, user_id).await,
        Command::Ban(args) => ban(&bot, &msg, &state, user_id, &args).await,
        Command::Unban(args) => unban(&bot, &msg, &state, user_id, &args).await,
    }
}

async fn send_markdown(bot: &Bot, msg: &Message, text: &str) -> ResponseResult<()> {
    bot.send_message(msg.chat.id, text)
        .parse_mode(ParseMode::Markdown)
        .await?;
    Ok(())
}

/// Replies with a fixed denial when the caller is not the configured admin.
async fn require_admin(
    bot: &Bot,
    msg: &Message,
    state: &BotState,
    user_id: i64,
) -> ResponseResult<bool> {
    if state.is_admin(user_id) {
        return Ok(true);
    }
    bot.send_message(msg.chat.id, "❌ Unauthorized").await?;
    Ok(false)
}

async fn start(
    bot: &Bot,
    msg: &Message,
    state: &BotState,
    user: &User,
    payload: &str,
) -> ResponseResult<()> {
    let user_id = user.id.0 as i64;
    let db = &state.app.db;

    // The new-user check must happen before the record is created, or every
    // returning user would look referral-eligible.
    let was_new_user = match db.user_exists(user_id).await {
        Ok(exists) => !exists,
        Err(e) => {
            error!("Storage error on /start for {user_id}: {e}");
            bot.send_message(msg.chat.id, "❌ Something went wrong. Please try again later.")
                .await?;
            return Ok(());
        }
    };

    let mut record = match db.get_or_create_user(user_id).await {
        Ok(record) => record,
        Err(e) => {
            error!("Storage error on /start for {user_id}: {e}");
            bot.send_message(msg.chat.id, "❌ Something went wrong. Please try again later.")
                .await?;
            return Ok(());
        }
    };

    if record.banned {
        bot.send_message(
            msg.chat.id,
            "🚫 Your account is banned.\n\nContact admin if you believe this is an error.",
        )
        .await?;
        return Ok(());
    }

    record.first_name = user.first_name.clone();
    record.username = user.username.clone().unwrap_or_default();
    record.last_check = Utc::now();
    record.last_login = Utc::now();

    if !payload.is_empty() {
        match referral::apply_referral(db, user_id, &mut record, was_new_user, payload).await {
            Ok(Some(credit)) => {
                // Ledger is committed; the notification is best-effort only.
                let note = format!(
                    "🎉 *New Referral!*\n\nUser: {}\nTotal Referrals: {}\nKeep sharing to unlock more features!",
                    user.first_name, credit.referrer_total
                );
                if let Err(e) = bot
                    .send_message(ChatId(credit.referrer_id), note)
                    .parse_mode(ParseMode::Markdown)
                    .await
                {
                    info!("Referral notification to {} failed: {e}", credit.referrer_id);
                }
            }
            Ok(None) => {}
            Err(e) => error!("Referral ledger error for {user_id}: {e}"),
        }
    }

    if let Err(e) = db.save_user(user_id, &record).await {
        error!("Failed to save user {user_id}: {e}");
    }

    send_markdown(bot, msg, BOT_DESCRIPTION).await?;
    bot.send_message(
        msg.chat.id,
        "🔑 *To unlock all features:*\n\n\
         1️⃣ Join all our channels above\n\
         2️⃣ Click 'Verify Membership' button\n\
         3️⃣ Access all earning bots!",
    )
    .parse_mode(ParseMode::Markdown)
    .reply_markup(menu::join_channels_keyboard())
    .await?;
    Ok(())
}

async fn help(bot: &Bot, msg: &Message) -> ResponseResult<()> {
    send_markdown(
        bot,
        msg,
        "🤖 *Bot Commands Help*\n\n\
         📌 *Available Commands:*\n\
         • `/start` - Start the bot and access main menu\n\
         • `/help` - Show this help message\n\
         • `/request` - Send a message to admin\n\
         • `/restart` - Restart your bot session\n\n\
         💡 *How to use:*\n\
         1. Join our channels to get verified\n\
         2. Use referrals to unlock more bots\n\
         3. Use /request to contact admin for support\n\n\
         🔗 *Quick Access:*\n\
         Use /start to return to main menu anytime!",
    )
    .await
}

async fn request(
    bot: &Bot,
    msg: &Message,
    state: &BotState,
    user: &User,
    text: &str,
) -> ResponseResult<()> {
    let message = text.trim();

    if message.is_empty() {
        return send_markdown(
            bot,
            msg,
            "💬 *Send a Request to Admin*\n\n\
             Usage: `/request your message here`\n\n\
             Example: `/request I need help with withdrawal`",
        )
        .await;
    }
    if message.len() > REQUEST_MAX_LEN {
        return send_markdown(
            bot,
            msg,
            "❌ Message too long! Please keep it under 1000 characters.",
        )
        .await;
    }
    if message.len() < 3 {
        return send_markdown(bot, msg, "❌ Message too short! Please provide more details.").await;
    }

    let admin_message = format!(
        "📩 *New User Request*\n\n\
         👤 From: {} (@{})\n\
         🆔 ID: `{}`\n\
         📝 Message: {}\n\n\
         Reply with: `/reply {} your response`",
        user.first_name,
        user.username.as_deref().unwrap_or("N/A"),
        user.id,
        message,
        user.id
    );

    match bot
        .send_message(ChatId(state.app.context.config.admin_id), admin_message)
        .parse_mode(ParseMode::Markdown)
        .await
    {
        Ok(_) => {
            info!("Request sent from user {}", user.id);
            send_markdown(
                bot,
                msg,
                "✅ Your request has been sent to admin!\nYou'll receive a reply soon.",
            )
            .await
        }
        Err(e) => {
            error!("Failed to send request from user {}: {e}", user.id);
            send_markdown(bot, msg, "❌ Failed to send request. Please try again later.").await
        }
    }
}

async fn restart(bot: &Bot, msg: &Message, state: &BotState, user_id: i64) -> ResponseResult<()> {
    let db = &state.app.db;

    match db.get_or_create_user(user_id).await {
        Ok(mut record) => {
            // Force re-verification on the next menu render.
            record.verified = false;
            record.last_check = DateTime::UNIX_EPOCH;
            if let Err(e) = db.save_user(user_id, &record).await {
                error!("Failed to reset session for {user_id}: {e}");
            }
        }
        Err(e) => error!("Storage error on /restart for {user_id}: {e}"),
    }

    send_markdown(
        bot,
        msg,
        "🔄 *Bot Restarted!*\n\nYour session has been reset. Please use /start to begin again.",
    )
    .await
}

async fn reply(
    bot: &Bot,
    msg: &Message,
    state: &BotState,
    user_id: i64,
    args: &str,
) -> ResponseResult<()> {
    if !require_admin(bot, msg, state, user_id).await? {
        return Ok(());
    }

    let parsed = args
        .trim()
        .split_once(char::is_whitespace)
        .and_then(|(id, text)| Some((id.parse::<i64>().ok()?, text.trim())));
    let Some((target_user_id, message)) = parsed else {
        return send_markdown(
            bot,
            msg,
            "Usage: `/reply user_id your message here`\n\
             Example: `/reply 123456789 Your issue has been resolved`",
        )
        .await;
    };

    if message.len() > REPLY_MAX_LEN {
        bot.send_message(msg.chat.id, "❌ Message too long (max 4000 characters)")
            .await?;
        return Ok(());
    }

    let reply_message = format!(
        "💬 *Reply from Admin*\n\n📝 {message}\n\nNeed more help? Use `/request your question`"
    );
    match bot
        .send_message(ChatId(target_user_id), reply_message)
        .parse_mode(ParseMode::Markdown)
        .await
    {
        Ok(_) => {
            bot.send_message(msg.chat.id, format!("✅ Reply sent to user {target_user_id}"))
                .await?;
        }
        Err(e) => {
            error!("Reply command error: {e}");
            bot.send_message(msg.chat.id, format!("❌ Failed to send reply: {e}"))
                .await?;
        }
    }
    Ok(())
}

async fn send_message_panel(
    bot: &Bot,
    msg: &Message,
    state: &BotState,
    user_id: i64,
) -> ResponseResult<()> {
    if !state.is_admin(user_id) {
        return Ok(());
    }

    let keyboard = InlineKeyboardMarkup::new(vec![
        vec![InlineKeyboardButton::callback(
            "📤 Send to Specific User",
            "admin_send_specific",
        )],
        vec![InlineKeyboardButton::callback(
            "📢 Send to All Users",
            "admin_send_all",
        )],
        vec![InlineKeyboardButton::callback("❌ Cancel", "admin_cancel")],
    ]);

    bot.send_message(
        msg.chat.id,
        "👑 *Admin Message Panel*\n\nChoose how you want to send your message:",
    )
    .parse_mode(ParseMode::Markdown)
    .reply_markup(keyboard)
    .await?;
    Ok(())
}

async fn broadcast(
    bot: &Bot,
    msg: &Message,
    state: &BotState,
    user_id: i64,
    text: &str,
) -> ResponseResult<()> {
    if !state.is_admin(user_id) {
        return Ok(());
    }

    let message = text.trim();
    if message.is_empty() {
        return send_markdown(
            bot,
            msg,
            "📢 *Broadcast to All Users*\n\n\
             Usage: `/broadcast your message here`\n\n\
             Example: `/broadcast Important update: New bots added!`",
        )
        .await;
    }

    let recipients = match state.app.db.all_users().await {
        Ok(users) => users.into_iter().map(|(id, _)| id).collect::<Vec<_>>(),
        Err(e) => {
            error!("Broadcast aborted, storage error: {e}");
            bot.send_message(msg.chat.id, "❌ Failed to load user list")
                .await?;
            return Ok(());
        }
    };

    let messenger = TelegramMessenger::new(bot.clone());
    let report = admin::broadcast(
        &messenger,
        &recipients,
        &format!("👑 *Broadcast from Admin*\n\n{message}"),
    )
    .await;
    send_markdown(bot, msg, &report.summary()).await
}

async fn stats(bot: &Bot, msg: &Message, state: &BotState, user_id: i64) -> ResponseResult<()> {
    if !require_admin(bot, msg, state, user_id).await? {
        return Ok(());
    }

    let users = match state.app.db.all_users().await {
        Ok(users) => users,
        Err(e) => {
            error!("Stats command error: {e}");
            bot.send_message(msg.chat.id, format!("❌ Error generating stats: {e}"))
                .await?;
            return Ok(());
        }
    };
    let Some(top) = users.iter().max_by_key(|(_, u)| u.referral_count) else {
        bot.send_message(msg.chat.id, "📊 No users found in database")
            .await?;
        return Ok(());
    };

    let total = users.len();
    let verified = users.iter().filter(|(_, u)| u.verified).count();
    let total_referrals: u32 = users.iter().map(|(_, u)| u.referral_count).sum();
    let avg_referrals = total_referrals as f64 / total as f64;
    let mining_eligible = users
        .iter()
        .filter(|(_, u)| u.referral_count >= crate::policy::REFERRALS_FOR_MINING)
        .count();

    let stats_text = format!(
        "📊 *Bot Statistics*\n\n\
         👥 Total Users: {total}\n\
         ✅ Verified: {verified} ({:.1}%)\n\
         📈 Total Referrals: {total_referrals}\n\
         📊 Avg Referrals: {avg_referrals:.1}\n\
         🏆 Top Referrer: {} ({} refs)\n\n\
         🎯 Mining Bot Access: {mining_eligible} users",
        verified as f64 / total as f64 * 100.0,
        if top.1.first_name.is_empty() {
            "Unknown"
        } else {
            &top.1.first_name
        },
        top.1.referral_count
    );
    send_markdown(bot, msg, &stats_text).await
}

async fn export(bot: &Bot, msg: &Message, state: &BotState, user_id: i64) -> ResponseResult<()> {
    if !require_admin(bot, msg, state, user_id).await? {
        return Ok(());
    }

    bot.send_message(msg.chat.id, "📊 Exporting user data...")
        .await?;

    let users = match state.app.db.all_users().await {
        Ok(users) => users,
        Err(e) => {
            error!("Export failed: {e}");
            bot.send_message(msg.chat.id, format!("❌ Export failed: {e}"))
                .await?;
            return Ok(());
        }
    };

    let mut csv =
        String::from("User ID,First Name,Username,Referrals,Join Date,Verified,Last Check\n");
    for (id, record) in &users {
        csv.push_str(&format!(
            "{id},\"{}\",{},{},{},{},{}\n",
            record.first_name.replace(',', ";"),
            record.username,
            record.referral_count,
            record.join_date.format("%Y-%m-%d %H:%M"),
            record.verified,
            record.last_check.timestamp()
        ));
    }

    let filename = format!("users_export_{}.csv", Utc::now().format("%Y%m%d_%H%M"));
    bot.send_document(
        msg.chat.id,
        InputFile::memory(csv.into_bytes()).file_name(filename),
    )
    .caption(format!(
        "📊 User export completed\nTotal users: {}",
        users.len()
    ))
    .await?;
    Ok(())
}

async fn backup(bot: &Bot, msg: &Message, state: &BotState, user_id: i64) -> ResponseResult<()> {
    if !require_admin(bot, msg, state, user_id).await? {
        return Ok(());
    }

    bot.send_message(msg.chat.id, "💾 Creating database backup...")
        .await?;

    match state.app.db.backup().await {
        Ok(path) => {
            bot.send_document(msg.chat.id, InputFile::file(&path))
                .caption("💾 Database backup created successfully")
                .await?;
            if let Err(e) = tokio::fs::remove_file(&path).await {
                error!("Failed to remove local backup {}: {e}", path.display());
            }
        }
        Err(e) => {
            error!("Backup command failed: {e}");
            bot.send_message(msg.chat.id, "❌ Backup failed").await?;
        }
    }
    Ok(())
}

async fn ban(
    bot: &Bot,
    msg: &Message,
    state: &BotState,
    user_id: i64,
    args: &str,
) -> ResponseResult<()> {
    if !require_admin(bot, msg, state, user_id).await? {
        return Ok(());
    }

    let mut parts = args.trim().splitn(2, char::is_whitespace);
    let target = parts.next().unwrap_or("").parse::<i64>();
    let Ok(target_user_id) = target else {
        return send_markdown(
            bot,
            msg,
            "Usage: `/ban user_id [reason]`\nExample: `/ban 123456789 Spam behavior`",
        )
        .await;
    };
    let reason = parts
        .next()
        .map(str::trim)
        .filter(|r| !r.is_empty())
        .unwrap_or("No reason provided");

    match state.app.db.ban_user(target_user_id, reason).await {
        Ok(ban) => {
            state.app.limiter.ban(target_user_id);
            bot.send_message(
                msg.chat.id,
                format!("✅ User {target_user_id} banned\nReason: {}", ban.reason),
            )
            .await?;

            // The user might have blocked the bot; that is fine.
            if let Err(e) = bot
                .send_message(
                    ChatId(target_user_id),
                    format!(
                        "🚫 Your account has been banned\nReason: {}\n\nContact admin if you believe this is an error.",
                        ban.reason
                    ),
                )
                .await
            {
                info!("Ban notification to {target_user_id} failed: {e}");
            }
        }
        Err(e) => {
            error!("Ban command error: {e}");
            bot.send_message(msg.chat.id, format!("❌ Error: {e}"))
                .await?;
        }
    }
    Ok(())
}

async fn unban(
    bot: &Bot,
    msg: &Message,
    state: &BotState,
    user_id: i64,
    args: &str,
) -> ResponseResult<()> {
    if !require_admin(bot, msg, state, user_id).await? {
        return Ok(());
    }

    let Ok(target_user_id) = args.trim().parse::<i64>() else {
        return send_markdown(
            bot,
            msg,
            "Usage: `/unban user_id`\nExample: `/unban 123456789`",
        )
        .await;
    };

    match state.app.db.unban_user(target_user_id).await {
        Ok(()) => {
            state.app.limiter.unban(target_user_id);
            bot.send_message(msg.chat.id, format!("✅ User {target_user_id} unbanned"))
                .await?;

            if let Err(e) = bot
                .send_message(
                    ChatId(target_user_id),
                    "✅ Your account has been unbanned. You can now use the bot again.",
                )
                .await
            {
                info!("Unban notification to {target_user_id} failed: {e}");
            }
        }
        Err(e) => {
            error!("Unban command error: {e}");
            bot.send_message(msg.chat.id, format!("❌ Error: {e}"))
                .await?;
        }
    }
    Ok(())
}
