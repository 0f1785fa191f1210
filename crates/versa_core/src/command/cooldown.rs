//! Per-command cooldowns backed by governor keyed rate limiters.

use governor::clock::{Clock, DefaultClock};
use governor::{DefaultKeyedRateLimiter, Quota, RateLimiter};
use std::collections::HashMap;
use std::num::NonZeroU32;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::{debug, warn};
use versa_error::{CommandError, CommandErrorKind};

/// What a cooldown bucket is shared by.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, strum::Display, strum::EnumString,
)]
#[strum(serialize_all = "snake_case")]
pub enum BucketType {
    /// One bucket for everybody
    #[default]
    Default,
    /// One bucket per user
    User,
    /// One bucket per guild; direct messages fall back to the user
    Guild,
    /// One bucket per channel
    Channel,
}

/// Ids an invocation is bucketed by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BucketIds {
    /// Message author
    pub user: u64,
    /// Guild the message came from
    pub guild: Option<u64>,
    /// Channel the message came from
    pub channel: u64,
}

impl BucketType {
    /// Key of the bucket `ids` fall into.
    pub fn key(&self, ids: &BucketIds) -> u64 {
        match self {
            BucketType::Default => 0,
            BucketType::User => ids.user,
            BucketType::Guild => ids.guild.unwrap_or(ids.user),
            BucketType::Channel => ids.channel,
        }
    }
}

/// `rate` uses every `per`, counted per bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cooldown {
    /// Uses allowed per window
    pub rate: u32,
    /// Window length
    pub per: Duration,
    /// Bucket the uses are counted in
    pub bucket: BucketType,
}

impl Cooldown {
    /// Create a cooldown.
    pub fn new(rate: u32, per: Duration, bucket: BucketType) -> Self {
        Self { rate, per, bucket }
    }

    /// Governor quota: a burst of `rate`, replenished evenly over `per`.
    ///
    /// `None` for a zero rate or window.
    pub fn quota(&self) -> Option<Quota> {
        let burst = NonZeroU32::new(self.rate)?;
        Quota::with_period(self.per / self.rate).map(|quota| quota.allow_burst(burst))
    }
}

/// Checks between two sweeps of buckets whose window has passed.
pub const PRUNE_INTERVAL: u64 = 1024;

/// Cooldown state of every command that has one.
///
/// Every bucket key seen is remembered by its limiter, so stale keys are
/// dropped every `prune_interval` checks.
pub struct CooldownBuckets {
    limiters: HashMap<String, (Cooldown, DefaultKeyedRateLimiter<u64>)>,
    clock: DefaultClock,
    checks: AtomicU64,
    prune_interval: u64,
}

impl std::fmt::Debug for CooldownBuckets {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CooldownBuckets")
            .field("commands", &self.limiters.keys().collect::<Vec<_>>())
            .field("prune_interval", &self.prune_interval)
            .finish()
    }
}

impl Default for CooldownBuckets {
    fn default() -> Self {
        Self::new()
    }
}

impl CooldownBuckets {
    /// No cooldowns.
    pub fn new() -> Self {
        Self {
            limiters: HashMap::new(),
            clock: DefaultClock::default(),
            checks: AtomicU64::new(0),
            prune_interval: PRUNE_INTERVAL,
        }
    }

    /// Sweep stale buckets every `interval` checks instead of the default.
    pub fn with_prune_interval(mut self, interval: u64) -> Self {
        self.prune_interval = interval.max(1);
        self
    }

    /// Track `cooldown` for `command`.
    ///
    /// Cooldowns with a zero rate or window are ignored.
    pub fn insert(&mut self, command: &str, cooldown: Cooldown) {
        match cooldown.quota() {
            Some(quota) => {
                debug!(command, rate = cooldown.rate, per = ?cooldown.per, bucket = %cooldown.bucket, "Registered cooldown");
                self.limiters
                    .insert(command.to_string(), (cooldown, RateLimiter::keyed(quota)));
            }
            None => warn!(command, ?cooldown, "Ignoring cooldown with zero rate or window"),
        }
    }

    /// Cooldown configured for `command`.
    pub fn get(&self, command: &str) -> Option<&Cooldown> {
        self.limiters.get(command).map(|(cooldown, _)| cooldown)
    }

    /// Take one use of `command` from the bucket of `ids`.
    ///
    /// # Errors
    ///
    /// Returns an on-cooldown error with the time until the bucket allows
    /// another use.
    #[track_caller]
    pub fn check(&self, command: &str, ids: &BucketIds) -> Result<(), CommandError> {
        let Some((cooldown, limiter)) = self.limiters.get(command) else {
            return Ok(());
        };

        let key = cooldown.bucket.key(ids);
        let result = limiter.check_key(&key).map_err(|not_until| {
            let retry_after = not_until.wait_time_from(self.clock.now());
            CommandError::new(CommandErrorKind::OnCooldown {
                command: command.to_string(),
                retry_after_ms: retry_after.as_millis().max(1) as u64,
            })
        });

        let checks = self.checks.fetch_add(1, Ordering::Relaxed) + 1;
        if checks % self.prune_interval == 0 {
            self.prune();
        }
        result
    }

    /// Forget buckets that are back to a full allowance.
    pub fn prune(&self) {
        for (command, (_, limiter)) in &self.limiters {
            let before = limiter.len();
            limiter.retain_recent();
            limiter.shrink_to_fit();
            let after = limiter.len();
            if after < before {
                debug!(command = %command, removed = before - after, remaining = after, "Pruned cooldown buckets");
            }
        }
    }

    /// Number of buckets `command` currently remembers.
    pub fn tracked_keys(&self, command: &str) -> usize {
        self.limiters
            .get(command)
            .map(|(_, limiter)| limiter.len())
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(user: u64, guild: Option<u64>, channel: u64) -> BucketIds {
        BucketIds {
            user,
            guild,
            channel,
        }
    }

    #[test]
    fn test_bucket_keys() {
        let dm = ids(7, None, 3);
        let guild = ids(7, Some(9), 3);
        assert_eq!(BucketType::Default.key(&guild), 0);
        assert_eq!(BucketType::User.key(&guild), 7);
        assert_eq!(BucketType::Guild.key(&guild), 9);
        assert_eq!(BucketType::Guild.key(&dm), 7);
        assert_eq!(BucketType::Channel.key(&guild), 3);
    }

    #[test]
    fn test_second_use_inside_window_is_rejected() {
        let mut buckets = CooldownBuckets::new();
        buckets.insert(
            "help",
            Cooldown::new(1, Duration::from_millis(500), BucketType::User),
        );

        assert!(buckets.check("help", &ids(1, None, 1)).is_ok());
        let err = buckets.check("help", &ids(1, None, 1)).unwrap_err();
        match err.kind {
            CommandErrorKind::OnCooldown {
                command,
                retry_after_ms,
            } => {
                assert_eq!(command, "help");
                assert!(retry_after_ms > 0 && retry_after_ms <= 500);
            }
            other => panic!("unexpected error: {other}"),
        }

        // Other users have their own bucket.
        assert!(buckets.check("help", &ids(2, None, 1)).is_ok());
    }

    #[test]
    fn test_window_elapses() {
        let mut buckets = CooldownBuckets::new();
        buckets.insert(
            "ping",
            Cooldown::new(1, Duration::from_millis(30), BucketType::Default),
        );
        assert!(buckets.check("ping", &ids(1, None, 1)).is_ok());
        assert!(buckets.check("ping", &ids(2, None, 1)).is_err());
        std::thread::sleep(Duration::from_millis(60));
        assert!(buckets.check("ping", &ids(3, None, 1)).is_ok());
    }

    #[test]
    fn test_commands_without_cooldown_pass() {
        let buckets = CooldownBuckets::new();
        for _ in 0..10 {
            assert!(buckets.check("ping", &ids(1, None, 1)).is_ok());
        }
    }

    #[test]
    fn test_prune_forgets_idle_buckets() {
        let mut buckets = CooldownBuckets::new();
        buckets.insert(
            "roll",
            Cooldown::new(1, Duration::from_millis(20), BucketType::User),
        );
        for user in 1..=50 {
            assert!(buckets.check("roll", &ids(user, None, 1)).is_ok());
        }
        assert_eq!(buckets.tracked_keys("roll"), 50);

        std::thread::sleep(Duration::from_millis(60));
        buckets.prune();
        assert_eq!(buckets.tracked_keys("roll"), 0);
    }

    #[test]
    fn test_checks_prune_periodically() {
        let mut buckets = CooldownBuckets::new().with_prune_interval(10);
        buckets.insert(
            "roll",
            Cooldown::new(1, Duration::from_millis(20), BucketType::User),
        );
        for user in 1..=9 {
            assert!(buckets.check("roll", &ids(user, None, 1)).is_ok());
        }
        assert_eq!(buckets.tracked_keys("roll"), 9);

        std::thread::sleep(Duration::from_millis(60));
        // The tenth check sweeps the nine idle users and keeps the fresh one.
        assert!(buckets.check("roll", &ids(100, None, 1)).is_ok());
        assert_eq!(buckets.tracked_keys("roll"), 1);
    }

    #[test]
    fn test_zero_rate_is_ignored() {
        let mut buckets = CooldownBuckets::new();
        buckets.insert("x", Cooldown::new(0, Duration::from_secs(1), BucketType::User));
        assert!(buckets.get("x").is_none());
    }
}
