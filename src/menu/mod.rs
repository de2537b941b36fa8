//! Stateless inline-keyboard rendering for the link catalogs.
//!
//! Items are numbered globally across pages so a user can reference "bot 14"
//! no matter which page it lands on; the only pagination state is the page
//! index carried in the navigation buttons' callback payloads.

use crate::catalog::{self, Catalog, CLICK_BEE};
use crate::database::UserRecord;
use crate::policy::{
    self, REFERRALS_FOR_ALL_WITHDRAW, REFERRALS_FOR_CLICK_BEE, REFERRALS_FOR_MINING,
};
use reqwest::Url;
use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup};
use tracing::error;

pub const ITEMS_PER_PAGE: usize = 8;
const BUTTONS_PER_ROW: usize = 2;

fn link_button(number: usize, name: &str, url: &str) -> Option<InlineKeyboardButton> {
    match Url::parse(url) {
        Ok(parsed) => Some(InlineKeyboardButton::url(format!("{number}. {name}"), parsed)),
        Err(e) => {
            error!("Skipping catalog entry {name} with bad url: {e}");
            None
        }
    }
}

fn back_button() -> Vec<InlineKeyboardButton> {
    vec![InlineKeyboardButton::callback("⬅️ Back", "main_menu")]
}

/// One page of a catalog with prev/next controls when it overflows a page.
pub fn paginated_menu(items: Catalog, prefix: &str, page: usize) -> InlineKeyboardMarkup {
    let start = page * ITEMS_PER_PAGE;
    let page_items = items.iter().skip(start).take(ITEMS_PER_PAGE);

    let mut keyboard: Vec<Vec<InlineKeyboardButton>> = Vec::new();
    let mut row = Vec::new();
    for (offset, (name, url)) in page_items.enumerate() {
        if let Some(button) = link_button(start + offset + 1, name, url) {
            row.push(button);
        }
        if row.len() == BUTTONS_PER_ROW {
            keyboard.push(std::mem::take(&mut row));
        }
    }
    if !row.is_empty() {
        keyboard.push(row);
    }

    if items.len() > ITEMS_PER_PAGE {
        let mut controls = Vec::new();
        if page > 0 {
            controls.push(InlineKeyboardButton::callback(
                "⬅️ Prev",
                format!("{prefix}_page_{}", page - 1),
            ));
        }
        if start + ITEMS_PER_PAGE < items.len() {
            controls.push(InlineKeyboardButton::callback(
                "Next ➡️",
                format!("{prefix}_page_{}", page + 1),
            ));
        }
        if !controls.is_empty() {
            keyboard.push(controls);
        }
    }

    keyboard.push(back_button());
    InlineKeyboardMarkup::new(keyboard)
}

/// Splits `<prefix>_page_<n>` callback payloads.
pub fn parse_page_callback(data: &str) -> Option<(&str, usize)> {
    let (prefix, page) = data.rsplit_once("_page_")?;
    Some((prefix, page.parse().ok()?))
}

/// Join buttons for every required channel plus the verify action.
pub fn join_channels_keyboard() -> InlineKeyboardMarkup {
    let mut keyboard: Vec<Vec<InlineKeyboardButton>> = catalog::CHANNELS
        .iter()
        .filter_map(|channel| match Url::parse(channel.url) {
            Ok(url) => Some(vec![InlineKeyboardButton::url(
                format!("Join {}", channel.name),
                url,
            )]),
            Err(e) => {
                error!("Skipping channel {} with bad url: {e}", channel.id);
                None
            }
        })
        .collect();
    keyboard.push(vec![InlineKeyboardButton::callback(
        "✅ Verify Membership",
        "verify",
    )]);
    InlineKeyboardMarkup::new(keyboard)
}

/// Main menu; locked categories advertise their referral progress and route
/// to an explanation popup instead of the category.
pub fn main_menu_keyboard(record: &UserRecord) -> InlineKeyboardMarkup {
    let caps = policy::capabilities(record.referral_count, record.verified);

    let mut keyboard = vec![
        vec![InlineKeyboardButton::callback(
            "🆓 Withdrawable Bots",
            "withdraw",
        )],
        vec![InlineKeyboardButton::callback("💎 Premium Bots", "premium")],
    ];

    if caps.mining {
        keyboard.push(vec![InlineKeyboardButton::callback(
            "⛏️ Mining Bots",
            "mining",
        )]);
    } else {
        keyboard.push(vec![InlineKeyboardButton::callback(
            format!(
                "🔒 Mining Bots ({}/{REFERRALS_FOR_MINING} refs)",
                record.referral_count
            ),
            "mining_locked",
        )]);
    }

    keyboard.push(vec![
        InlineKeyboardButton::callback("👤 Profile", "profile"),
        InlineKeyboardButton::callback("📤 Referral", "referral"),
    ]);
    keyboard.push(vec![InlineKeyboardButton::callback("ℹ️ About Us", "about")]);
    InlineKeyboardMarkup::new(keyboard)
}

/// Free withdraw catalog plus the gated "all bots" entry.
pub fn withdraw_keyboard(record: &UserRecord) -> InlineKeyboardMarkup {
    let caps = policy::capabilities(record.referral_count, record.verified);

    let mut keyboard: Vec<Vec<InlineKeyboardButton>> = Vec::new();
    let mut row = Vec::new();
    for (i, (name, url)) in catalog::FREE_WITHDRAW_BOTS.iter().enumerate() {
        if let Some(button) = link_button(i + 1, name, url) {
            row.push(button);
        }
        if row.len() == BUTTONS_PER_ROW {
            keyboard.push(std::mem::take(&mut row));
        }
    }
    if !row.is_empty() {
        keyboard.push(row);
    }

    if caps.all_withdraw {
        keyboard.push(vec![InlineKeyboardButton::callback(
            "🌟 ALL BOTS",
            "all_bots",
        )]);
    } else {
        keyboard.push(vec![InlineKeyboardButton::callback(
            format!(
                "🔒 ALL BOTS ({}/{REFERRALS_FOR_ALL_WITHDRAW} refs)",
                record.referral_count
            ),
            "need_refs",
        )]);
    }

    keyboard.push(back_button());
    InlineKeyboardMarkup::new(keyboard)
}

/// Premium catalog with the referral-gated Click Bee entry appended.
pub fn premium_keyboard(record: &UserRecord) -> InlineKeyboardMarkup {
    let caps = policy::capabilities(record.referral_count, record.verified);

    let mut keyboard: Vec<Vec<InlineKeyboardButton>> = Vec::new();
    let mut row = Vec::new();
    for (i, (name, url)) in catalog::PREMIUM_BOTS.iter().enumerate() {
        if let Some(button) = link_button(i + 1, name, url) {
            row.push(button);
        }
        if row.len() == BUTTONS_PER_ROW {
            keyboard.push(std::mem::take(&mut row));
        }
    }
    if !row.is_empty() {
        keyboard.push(row);
    }

    let next_number = catalog::PREMIUM_BOTS.len() + 1;
    if caps.click_bee {
        if let Some(button) = link_button(next_number, &format!("🐝 {}", CLICK_BEE.0), CLICK_BEE.1)
        {
            keyboard.push(vec![button]);
        }
    } else {
        keyboard.push(vec![InlineKeyboardButton::callback(
            format!(
                "{next_number}. 🔒 {} ({}/{REFERRALS_FOR_CLICK_BEE} refs)",
                CLICK_BEE.0, record.referral_count
            ),
            "click_bee_locked",
        )]);
    }

    keyboard.push(back_button());
    InlineKeyboardMarkup::new(keyboard)
}

/// Profile view; offers the username flow only when Telegram gave us none.
pub fn profile_keyboard(has_telegram_username: bool) -> InlineKeyboardMarkup {
    let mut keyboard = Vec::new();
    if !has_telegram_username {
        keyboard.push(vec![InlineKeyboardButton::callback(
            "📝 Set Username",
            "set_username",
        )]);
    }
    keyboard.push(back_button());
    InlineKeyboardMarkup::new(keyboard)
}
