//! Unlock policy: which link categories a user can see, as a pure function
//! of referral count and verification state.

use chrono::{DateTime, Duration, Utc};

pub const REFERRALS_FOR_ALL_WITHDRAW: u32 = 2;
pub const REFERRALS_FOR_CLICK_BEE: u32 = 3;
pub const REFERRALS_FOR_MINING: u32 = 5;

/// How long a successful membership check stays trusted.
pub const VERIFICATION_TTL_SECS: i64 = 3600;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Capabilities {
    pub free_withdraw: bool,
    pub all_withdraw: bool,
    pub premium_basic: bool,
    pub click_bee: bool,
    pub mining: bool,
}

/// Evaluated on every menu render; never cached across renders because the
/// referral count can change in between.
pub fn capabilities(referral_count: u32, verified: bool) -> Capabilities {
    Capabilities {
        free_withdraw: verified,
        all_withdraw: verified && referral_count >= REFERRALS_FOR_ALL_WITHDRAW,
        premium_basic: verified,
        click_bee: referral_count >= REFERRALS_FOR_CLICK_BEE,
        mining: verified && referral_count >= REFERRALS_FOR_MINING,
    }
}

/// A verification older than the TTL must be re-checked before it is trusted.
pub fn needs_recheck(last_check: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    now - last_check > Duration::seconds(VERIFICATION_TTL_SECS)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn count(caps: Capabilities) -> usize {
        [
            caps.free_withdraw,
            caps.all_withdraw,
            caps.premium_basic,
            caps.click_bee,
            caps.mining,
        ]
        .iter()
        .filter(|&&c| c)
        .count()
    }

    #[test]
    fn unverified_user_only_gets_click_bee_track() {
        assert_eq!(capabilities(0, false), Capabilities::default());

        let caps = capabilities(3, false);
        assert!(caps.click_bee);
        assert!(!caps.free_withdraw);
        assert!(!caps.all_withdraw);
        assert!(!caps.premium_basic);
        assert!(!caps.mining);
    }

    #[test]
    fn thresholds_unlock_at_exact_counts() {
        let caps = capabilities(1, true);
        assert!(caps.free_withdraw && caps.premium_basic);
        assert!(!caps.all_withdraw && !caps.click_bee && !caps.mining);

        let caps = capabilities(2, true);
        assert!(caps.all_withdraw);
        assert!(!caps.click_bee);

        let caps = capabilities(3, true);
        assert!(caps.click_bee);
        assert!(!caps.mining);

        let caps = capabilities(5, true);
        assert!(caps.mining);
    }

    #[test]
    fn capability_set_is_monotonic_in_referral_count() {
        let mut previous = 0;
        for referral_count in 0..=6 {
            let unlocked = count(capabilities(referral_count, true));
            assert!(
                unlocked >= previous,
                "capabilities regressed at {referral_count} referrals"
            );
            previous = unlocked;
        }
        // 4 referrals adds nothing over 3; 6 adds nothing over 5.
        assert_eq!(capabilities(3, true), capabilities(4, true));
        assert_eq!(capabilities(5, true), capabilities(6, true));
    }

    #[test]
    fn recheck_required_after_one_hour() {
        let now = Utc::now();
        assert!(!needs_recheck(now - Duration::seconds(3599), now));
        assert!(!needs_recheck(now - Duration::seconds(3600), now));
        assert!(needs_recheck(now - Duration::seconds(3601), now));
    }
}
