//! Static link directory: required channels and the gated bot catalogs.

/// A channel the user must join before verification succeeds.
#[derive(Debug, Clone, Copy)]
pub struct Channel {
    pub name: &'static str,
    pub url: &'static str,
    /// Chat identifier understood by the Telegram API, e.g. `@earningclubtele`.
    pub id: &'static str,
}

pub const CHANNELS: &[Channel] = &[
    Channel {
        name: "Earning Club Tele",
        url: "https://t.me/earningclubtele",
        id: "@earningclubtele",
    },
    Channel {
        name: "Earning Club Latest",
        url: "https://t.me/earningclubletest",
        id: "@earningclubletest",
    },
    Channel {
        name: "Soloaex",
        url: "https://t.me/soloaex",
        id: "@soloaex",
    },
];

/// Display-name → external link. Order is part of the menu contract.
pub type Catalog = &'static [(&'static str, &'static str)];

pub const FREE_WITHDRAW_BOTS: Catalog = &[
    ("TRX", "https://t.me/TrxFreeAirdropsBot?start=1342140242"),
    ("TON", "https://t.me/TonAirdrop_ibot?start=r03339503340"),
    ("USD", "https://t.me/USDTRewardRobot?start=1342140242"),
    ("REFI", "https://t.me/ReficoinvipBot?start=1342140242"),
    ("DOGs", "https://t.me/Dogs_droppbot?start=1342140242"),
];

pub const ALL_WITHDRAW_BOTS: Catalog = &[
    ("NEI", "https://t.me/Neurashivipbot?start=1342140242"),
    ("PENDLE", "https://t.me/ClaimPendleAirdrop_bot?start=r03339503340"),
    ("REFI VIP", "https://t.me/Refivipbot?start=1342140242"),
    ("BNB", "https://t.me/BnbAirVBot?start=1342140242"),
    ("STRIKE", "https://t.me/Strikecoinbot?start=1342140242"),
    ("LIYTCOIN", "https://t.me/litecoin_automatic_bot?start=1342140242"),
    ("SPHYNX", "https://t.me/SPHYNXAirdrop_Robot?start=Bot45119933"),
    ("MONEY BUX", "https://t.me/easy_money_bux_bot?start=1342140242"),
    ("BNB PAY", "https://t.me/Free_Binance_Bnb_Pay_Bot?start=r03339503340"),
    ("INR", "https://t.me/FreeeUpiCashh_bot?start=1342140242"),
    ("ETHEREUM", "https://t.me/ETH_MaxLootBot?start=1342140242"),
    ("USDT", "https://t.me/CryptoEarning6AirdropBot?start=1342140242"),
    ("TON PAY", "https://t.me/TONPayAiRbot?start=1342140242"),
    ("APE", "https://t.me/ApeAirdrop_iBot?start=r03339503340"),
    ("USDT REWARD", "https://t.me/UsdtAirdropR1Bot?start=1342140242"),
    ("INR PAY", "https://t.me/InstantoPayBot?start=1342140242"),
    ("PEPE", "https://t.me/EarnPepeV5Bot?start=1342140242"),
    ("BNB GIVEAWAY", "https://t.me/BnbTokenGiveawayBot?start=1342140242"),
    ("QexSwap", "https://t.me/QexSwapAirdropBot?start=Bot45119933"),
    ("TRX AIRDROP", "https://t.me/Trxairdrop_ibot?start=r03339503340"),
    ("SOL", "https://t.me/SOLMinedProV2bot?start=1342140242"),
    ("TRX AUTO", "https://t.me/Trx_autopayerr_bot?start=1342140242"),
];

pub const PREMIUM_BOTS: Catalog = &[
    ("NOBU", "https://t.me/NobuAirdropBot?start=1342140242"),
    ("KNC", "https://t.me/KNCAIRBOT?start=r03339503340"),
];

/// Premium entry unlocked by referrals alone, not by verification.
pub const CLICK_BEE: (&str, &str) = ("CLICK BEE VIP", "https://t.me/ClickBeeBot?start=1342140242");

pub const MINING_BOTS: Catalog = &[
    ("MINEVERS", "https://t.me/MineVerseBot/app?startapp=r_1342140242"),
    ("IMINER", "https://t.me/iMiner_bot/mining?startapp=r_6R6ZvvQcQ90e"),
    ("JAQPOT", "https://t.me/jolly_jackpot_bot/login?startapp=1342140242&size=large"),
    ("TONGRAM", "https://t.me/TongramAppBot/start?startapp=1342140242"),
    ("TONSTARTER", "https://t.me/tonstarterAppbot/Start?startapp=1342140242"),
    ("TONIX", "https://t.me/Mining_TonixBot?start=1342140242"),
    ("LAND HASH", "https://t.me/lendhash_bot?start=1342140242"),
    ("LIONS", "https://t.me/Lionsapp_bot/LIONS?startapp=r_1342140242"),
    ("CLICKBIT", "https://t.me/clickbit_app_bot/clickbit?startapp=4A4FD70FF1"),
    ("GIFTBOX", "https://t.me/giftbox_official_bot/app?startapp=ref_V1MUfCat"),
];

pub const BOT_DESCRIPTION: &str = "\
🌟 *Welcome to Earning Club Bot!* 🌟

Your complete crypto earning solution with:
- 🆓 Free withdrawal bots
- 💎 Premium earning platforms
- ⛏️ Mining opportunities

🔐 *Verification Required:* Join our channels to unlock all features!";
