//! Wall-clock access and tick alignment.

use chrono::{DateTime, Duration as ChronoDuration, FixedOffset, Offset, TimeZone, Utc};
use chrono_tz::Tz;
use std::sync::RwLock;
use std::time::Duration;
use tracing::trace;

/// Supplies the current time and the timezone the dial should read in.
pub trait TimeSource: Send + Sync {
    fn now(&self) -> DateTime<Utc>;

    fn timezone(&self) -> Tz;

    /// Called when the host reports a timezone change.
    fn set_timezone(&self, _tz: Tz) {}

    /// Re-reads the zone from the system. Called whenever the face becomes
    /// visible, since the zone may have changed while nobody was told.
    fn refresh_timezone(&self) {}

    fn local_now(&self) -> DateTime<Tz> {
        self.now().with_timezone(&self.timezone())
    }

    /// Offset of local time from UTC at this moment.
    fn timezone_offset(&self) -> FixedOffset {
        self.local_now().offset().fix()
    }
}

/// The host's real clock.
#[derive(Debug)]
pub struct SystemClock {
    timezone: RwLock<Tz>,
}

impl SystemClock {
    pub fn new(timezone: Tz) -> Self {
        Self {
            timezone: RwLock::new(timezone),
        }
    }

    /// Uses the zone named by `TZ` when it parses, else `fallback`.
    pub fn from_env(fallback: Tz) -> Self {
        Self::new(env_timezone().unwrap_or(fallback))
    }
}

fn env_timezone() -> Option<Tz> {
    std::env::var("TZ").ok().as_deref().and_then(parse_zone)
}

/// Parses a `TZ` value such as `Europe/Paris` or `:Europe/Paris`.
fn parse_zone(name: &str) -> Option<Tz> {
    name.trim_start_matches(':').parse::<Tz>().ok()
}

impl TimeSource for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn timezone(&self) -> Tz {
        match self.timezone.read() {
            Ok(tz) => *tz,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }

    fn set_timezone(&self, tz: Tz) {
        match self.timezone.write() {
            Ok(mut guard) => *guard = tz,
            Err(poisoned) => *poisoned.into_inner() = tz,
        }
    }

    fn refresh_timezone(&self) {
        match env_timezone() {
            Some(tz) => self.set_timezone(tz),
            None => trace!("TZ unset or unknown, keeping {}", self.timezone()),
        }
    }
}

/// A clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    now: RwLock<DateTime<Utc>>,
    timezone: RwLock<Tz>,
}

impl ManualClock {
    pub fn new(now: DateTime<Utc>, timezone: Tz) -> Self {
        Self {
            now: RwLock::new(now),
            timezone: RwLock::new(timezone),
        }
    }

    pub fn set(&self, now: DateTime<Utc>) {
        match self.now.write() {
            Ok(mut guard) => *guard = now,
            Err(poisoned) => *poisoned.into_inner() = now,
        }
    }

    pub fn advance(&self, by: ChronoDuration) {
        match self.now.write() {
            Ok(mut guard) => *guard += by,
            Err(poisoned) => *poisoned.into_inner() += by,
        }
    }
}

impl TimeSource for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        self.now
            .read()
            .map(|now| *now)
            .unwrap_or_else(|poisoned| *poisoned.into_inner())
    }

    fn timezone(&self) -> Tz {
        self.timezone
            .read()
            .map(|tz| *tz)
            .unwrap_or_else(|poisoned| *poisoned.into_inner())
    }

    fn set_timezone(&self, tz: Tz) {
        match self.timezone.write() {
            Ok(mut guard) => *guard = tz,
            Err(poisoned) => *poisoned.into_inner() = tz,
        }
    }
}

/// Delay until the next whole multiple of `tick_rate` on the wall clock.
///
/// Re-arming with this instead of a fixed period keeps ticks on second
/// boundaries no matter how late each callback ran. Never returns zero.
pub fn next_tick_delay(now_ms: i64, tick_rate: Duration) -> Duration {
    let rate = i64::try_from(tick_rate.as_millis()).unwrap_or(i64::MAX).max(1);
    let delay = rate - now_ms.rem_euclid(rate);
    Duration::from_millis(delay as u64)
}

/// Convenience for [`next_tick_delay`] at a given instant.
pub fn next_tick_delay_at<T: TimeZone>(now: &DateTime<T>, tick_rate: Duration) -> Duration {
    next_tick_delay(now.timestamp_millis(), tick_rate)
}
