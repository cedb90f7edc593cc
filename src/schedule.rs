use crate::error::{Result, ShowcaseError};
use chrono::{DateTime, TimeZone, Utc};
use clap::ValueEnum;
use std::time::Duration;

/// How recurring refreshes are placed in time
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SchedulePolicy {
    /// Fire on wall-clock multiples of the period (:00, :05, :10 for 5 minutes)
    Aligned,
    /// Fire one period after the previous trigger
    Interval,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Schedule {
    policy: SchedulePolicy,
    period: Duration,
}

impl Schedule {
    pub fn new(policy: SchedulePolicy, period: Duration) -> Result<Self> {
        if period.as_millis() == 0 {
            return Err(ShowcaseError::ConfigError("schedule period must be positive".to_string()));
        }
        Ok(Self { policy, period })
    }

    pub fn aligned(period: Duration) -> Result<Self> {
        Self::new(SchedulePolicy::Aligned, period)
    }

    pub fn interval(period: Duration) -> Result<Self> {
        Self::new(SchedulePolicy::Interval, period)
    }

    pub fn policy(&self) -> SchedulePolicy {
        self.policy
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// When the trigger after one firing at `now` should happen.
    pub fn next_run_after(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        match self.policy {
            SchedulePolicy::Aligned => next_aligned_boundary(now, self.period),
            SchedulePolicy::Interval => {
                now + chrono::Duration::milliseconds(self.period.as_millis() as i64)
            }
        }
    }

    /// Next trigger after the one planned for `previous_target`. Computing from
    /// the later of `now` and that target keeps a timer that wakes a little
    /// before its wall-clock boundary from picking the same boundary again.
    pub fn next_run_following(
        &self,
        previous_target: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> DateTime<Utc> {
        let from = previous_target.map_or(now, |target| target.max(now));
        self.next_run_after(from)
    }

    pub fn delay_from(&self, now: DateTime<Utc>) -> Duration {
        (self.next_run_after(now) - now)
            .to_std()
            .unwrap_or(self.period)
    }
}

/// First multiple of `period` since the Unix epoch strictly after `now`.
pub fn next_aligned_boundary(now: DateTime<Utc>, period: Duration) -> DateTime<Utc> {
    let period_ms = (period.as_millis() as i64).max(1);
    let now_ms = now.timestamp_millis();
    let next_ms = (now_ms.div_euclid(period_ms) + 1) * period_ms;

    Utc.timestamp_millis_opt(next_ms)
        .single()
        .unwrap_or_else(|| now + chrono::Duration::milliseconds(period_ms))
}
