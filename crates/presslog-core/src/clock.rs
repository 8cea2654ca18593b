//! Wall clock access.
//!
//! The device learns the time from the network, so the clock may not be
//! usable yet. [`WallClock::now`] returns `None` until it is.

use std::future::Future;
use std::time::Duration;

use chrono::{DateTime, Datelike, FixedOffset, NaiveDateTime, Utc};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::RetryPolicy;

/// Format of `buttonPressTimestamp`.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// A local time before this year means the clock was never set.
pub const MIN_VALID_YEAR: i32 = 2016;

#[derive(Debug, Error)]
pub enum ClockError {
    #[error("Wall clock not synchronized after {attempts} attempts")]
    NotSynchronized { attempts: u32 },

    #[error("Invalid UTC offset: {0} seconds")]
    InvalidOffset(i32),
}

/// Source of local wall-clock time.
pub trait WallClock: Send + Sync {
    /// Current local time, or `None` if the clock is not synchronized.
    fn now(&self) -> Option<NaiveDateTime>;
}

impl<T: WallClock + ?Sized> WallClock for Box<T> {
    fn now(&self) -> Option<NaiveDateTime> {
        (**self).now()
    }
}

/// Format a local time the way log records carry it.
pub fn format_timestamp(time: &NaiveDateTime) -> String {
    time.format(TIMESTAMP_FORMAT).to_string()
}

/// System time shifted by a fixed offset.
///
/// On ESP-IDF the system time is set by SNTP, so this reports unsynchronized
/// until the first successful sync.
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    offset: FixedOffset,
}

impl SystemClock {
    pub fn new(offset_secs: i32) -> Result<Self, ClockError> {
        let offset = FixedOffset::east_opt(offset_secs).ok_or(ClockError::InvalidOffset(offset_secs))?;
        Ok(Self { offset })
    }

    fn local(&self, utc: DateTime<Utc>) -> Option<NaiveDateTime> {
        let local = utc.with_timezone(&self.offset).naive_local();
        (local.year() >= MIN_VALID_YEAR).then_some(local)
    }
}

impl WallClock for SystemClock {
    fn now(&self) -> Option<NaiveDateTime> {
        self.local(Utc::now())
    }
}

/// A clock that always reports the same instant (or none).
///
/// Used for simulation and tests.
#[derive(Debug, Clone, Copy, Default)]
pub struct FixedClock {
    at: Option<NaiveDateTime>,
}

impl FixedClock {
    pub fn at(time: NaiveDateTime) -> Self {
        Self { at: Some(time) }
    }

    pub fn unsynchronized() -> Self {
        Self { at: None }
    }

    pub fn set(&mut self, time: Option<NaiveDateTime>) {
        self.at = time;
    }
}

impl WallClock for FixedClock {
    fn now(&self) -> Option<NaiveDateTime> {
        self.at
    }
}

/// Poll `clock` until it is synchronized, following `policy`.
pub fn wait_for_sync<C: WallClock + ?Sized>(
    clock: &C,
    policy: &RetryPolicy,
    sleep: impl FnMut(Duration),
) -> Result<NaiveDateTime, ClockError> {
    info!("Waiting for time sync...");
    sync_outcome(policy.run(|attempt| poll_sync(clock, attempt), sleep))
}

/// [`wait_for_sync`] for async callers; `sleep` is the runtime's sleep.
pub async fn wait_for_sync_async<C, F>(
    clock: &C,
    policy: &RetryPolicy,
    sleep: impl FnMut(Duration) -> F,
) -> Result<NaiveDateTime, ClockError>
where
    C: WallClock + ?Sized,
    F: Future<Output = ()>,
{
    info!("Waiting for time sync...");
    sync_outcome(policy.run_async(|attempt| poll_sync(clock, attempt), sleep).await)
}

fn poll_sync<C: WallClock + ?Sized>(clock: &C, attempt: u32) -> Result<NaiveDateTime, u32> {
    clock.now().ok_or_else(|| {
        debug!("Time not synchronized yet (attempt {})", attempt);
        attempt
    })
}

fn sync_outcome(result: Result<NaiveDateTime, u32>) -> Result<NaiveDateTime, ClockError> {
    match result {
        Ok(now) => {
            info!("Time synchronized: {}", format_timestamp(&now));
            Ok(now)
        }
        Err(attempts) => {
            warn!("Failed to synchronize time after {} attempts", attempts);
            Err(ClockError::NotSynchronized { attempts })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone};
    use std::cell::Cell;

    fn datetime(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, mo, d)
            .unwrap()
            .and_hms_opt(h, mi, s)
            .unwrap()
    }

    #[test]
    fn test_timestamp_format() {
        assert_eq!(
            format_timestamp(&datetime(2025, 3, 1, 9, 5, 7)),
            "2025-03-01 09:05:07"
        );
    }

    #[test]
    fn test_offset_applied() {
        let clock = SystemClock::new(7200).unwrap();
        let utc = Utc.with_ymd_and_hms(2025, 6, 30, 23, 30, 0).unwrap();
        assert_eq!(clock.local(utc), Some(datetime(2025, 7, 1, 1, 30, 0)));
    }

    #[test]
    fn test_unset_clock_is_unsynchronized() {
        let clock = SystemClock::new(3600).unwrap();
        let boot_epoch = Utc.with_ymd_and_hms(1970, 1, 1, 0, 0, 42).unwrap();
        assert_eq!(clock.local(boot_epoch), None);
    }

    #[test]
    fn test_invalid_offset() {
        assert!(matches!(
            SystemClock::new(48 * 3600),
            Err(ClockError::InvalidOffset(_))
        ));
    }

    /// Becomes synchronized on the given poll.
    struct LateClock {
        polls: std::sync::atomic::AtomicU32,
        synced_on: u32,
    }

    impl WallClock for LateClock {
        fn now(&self) -> Option<NaiveDateTime> {
            let poll = self.polls.fetch_add(1, std::sync::atomic::Ordering::SeqCst) + 1;
            (poll >= self.synced_on).then(|| datetime(2025, 1, 1, 0, 0, 0))
        }
    }

    #[test]
    fn test_wait_for_sync_succeeds_after_retries() {
        let clock = LateClock {
            polls: Default::default(),
            synced_on: 3,
        };
        let sleeps = Cell::new(0);
        let now = wait_for_sync(&clock, &RetryPolicy::new(10, 1000), |_| {
            sleeps.set(sleeps.get() + 1)
        })
        .unwrap();
        assert_eq!(now, datetime(2025, 1, 1, 0, 0, 0));
        assert_eq!(sleeps.get(), 2);
    }

    #[test]
    fn test_async_wait_for_sync() {
        let clock = LateClock {
            polls: Default::default(),
            synced_on: 2,
        };
        let sleeps = Cell::new(0);
        let now = futures::executor::block_on(wait_for_sync_async(
            &clock,
            &RetryPolicy::new(10, 1000),
            |_| {
                sleeps.set(sleeps.get() + 1);
                futures::future::ready(())
            },
        ))
        .unwrap();
        assert_eq!(now, datetime(2025, 1, 1, 0, 0, 0));
        assert_eq!(sleeps.get(), 1);

        let err = futures::executor::block_on(wait_for_sync_async(
            &FixedClock::unsynchronized(),
            &RetryPolicy::new(3, 0),
            |_| futures::future::ready(()),
        ))
        .unwrap_err();
        assert!(matches!(err, ClockError::NotSynchronized { attempts: 3 }));
    }

    #[test]
    fn test_wait_for_sync_gives_up() {
        let clock = FixedClock::unsynchronized();
        let err = wait_for_sync(&clock, &RetryPolicy::new(4, 0), |_| {}).unwrap_err();
        assert!(matches!(err, ClockError::NotSynchronized { attempts: 4 }));
    }
}
