//! In-memory sliding-window rate limiter with a fast-path ban set.
//!
//! Advisory only: a process restart resets every window. The ban set mirrors
//! the persisted `banned` flags and is seeded from the `banned_users` table
//! at startup.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Mutex;
use std::time::{Duration, Instant};
use tracing::warn;

pub const WINDOW: Duration = Duration::from_secs(60);
pub const MAX_ACTIONS_PER_WINDOW: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Allowed,
    RateLimited,
    Banned,
}

/// Constructed once and passed in wherever updates are handled; the mutexes
/// make it safe to share across worker tasks.
pub struct RateLimiter {
    activity: Mutex<HashMap<i64, VecDeque<Instant>>>,
    banned: Mutex<HashSet<i64>>,
}

impl RateLimiter {
    pub fn new() -> Self {
        Self {
            activity: Mutex::new(HashMap::new()),
            banned: Mutex::new(HashSet::new()),
        }
    }

    /// Loads the persisted ban list so the in-memory set does not drift from
    /// storage across restarts.
    pub fn seed_bans(&self, ids: impl IntoIterator<Item = i64>) {
        let mut banned = self.banned.lock().expect("ban set poisoned");
        banned.extend(ids);
    }

    pub fn check(&self, user_id: i64) -> Verdict {
        self.check_at(user_id, Instant::now())
    }

    fn check_at(&self, user_id: i64, now: Instant) -> Verdict {
        if self.is_banned(user_id) {
            return Verdict::Banned;
        }

        let mut activity = self.activity.lock().expect("activity map poisoned");
        let window = activity.entry(user_id).or_default();
        // Strictly older than the window; an entry aged exactly 60 s still
        // counts against the caller.
        while let Some(&oldest) = window.front() {
            if now.saturating_duration_since(oldest) > WINDOW {
                window.pop_front();
            } else {
                break;
            }
        }

        if window.len() >= MAX_ACTIONS_PER_WINDOW {
            warn!("Rate limit hit for user {user_id}");
            return Verdict::RateLimited;
        }

        window.push_back(now);
        Verdict::Allowed
    }

    pub fn ban(&self, user_id: i64) {
        self.banned.lock().expect("ban set poisoned").insert(user_id);
    }

    pub fn unban(&self, user_id: i64) {
        self.banned
            .lock()
            .expect("ban set poisoned")
            .remove(&user_id);
    }

    pub fn is_banned(&self, user_id: i64) -> bool {
        self.banned
            .lock()
            .expect("ban set poisoned")
            .contains(&user_id)
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn eleventh_action_within_the_window_is_rejected() {
        let limiter = RateLimiter::new();
        let t0 = Instant::now();

        for i in 0..10 {
            let at = t0 + Duration::from_secs(i * 59 / 10);
            assert_eq!(limiter.check_at(7, at), Verdict::Allowed, "action {i}");
        }
        assert_eq!(
            limiter.check_at(7, t0 + Duration::from_secs(59)),
            Verdict::RateLimited
        );
    }

    #[test]
    fn window_slides_after_sixty_seconds() {
        let limiter = RateLimiter::new();
        let t0 = Instant::now();

        for _ in 0..10 {
            assert_eq!(limiter.check_at(7, t0), Verdict::Allowed);
        }
        assert_eq!(limiter.check_at(7, t0), Verdict::RateLimited);

        // Once the first action ages past 60s, a new one fits.
        assert_eq!(
            limiter.check_at(7, t0 + Duration::from_secs(61)),
            Verdict::Allowed
        );
    }

    #[test]
    fn entry_aged_exactly_sixty_seconds_still_counts() {
        let limiter = RateLimiter::new();
        let t0 = Instant::now();

        for _ in 0..10 {
            limiter.check_at(7, t0);
        }
        assert_eq!(
            limiter.check_at(7, t0 + Duration::from_secs(60)),
            Verdict::RateLimited
        );
        assert_eq!(
            limiter.check_at(7, t0 + Duration::from_secs(61)),
            Verdict::Allowed
        );
    }

    #[test]
    fn users_do_not_share_windows() {
        let limiter = RateLimiter::new();
        let t0 = Instant::now();
        for _ in 0..10 {
            limiter.check_at(1, t0);
        }
        assert_eq!(limiter.check_at(1, t0), Verdict::RateLimited);
        assert_eq!(limiter.check_at(2, t0), Verdict::Allowed);
    }

    #[test]
    fn ban_set_short_circuits_and_can_be_seeded() {
        let limiter = RateLimiter::new();
        limiter.seed_bans([5, 6]);
        assert_eq!(limiter.check(5), Verdict::Banned);
        assert!(limiter.is_banned(6));

        limiter.unban(5);
        assert_eq!(limiter.check(5), Verdict::Allowed);

        limiter.ban(5);
        assert_eq!(limiter.check(5), Verdict::Banned);
    }
}
