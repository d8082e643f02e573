//! Process-wide monotonic timestamp source.
//!
//! Every packet is stamped with a microsecond timestamp taken from the system
//! clock. Two reads inside the same clock tick would collide, so the clock
//! remembers the last value it handed out and bumps to `last + 1` whenever the
//! wall clock has not moved past it. Timestamps are therefore strictly
//! increasing for the whole process.

use chrono::{DateTime, Utc};
use std::fmt;
use std::sync::atomic::{AtomicI64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

/// Last timestamp issued by [`Timestamp::now`]. Zero means "nothing issued yet".
static LAST_ISSUED: AtomicI64 = AtomicI64::new(0);

/// Microseconds since the Unix epoch.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Timestamp(i64);

impl Timestamp {
    /// Sentinel carried by the empty packet.
    pub const INVALID: Timestamp = Timestamp(i64::MIN);

    /// Lower bound used by freshly created ports.
    pub const ZERO: Timestamp = Timestamp(0);

    /// Next strictly increasing timestamp for this process.
    pub fn now() -> Self {
        let wall = wall_clock_micros();
        let mut last = LAST_ISSUED.load(Ordering::Relaxed);
        loop {
            let next = if wall <= last { last + 1 } else { wall };
            match LAST_ISSUED.compare_exchange_weak(last, next, Ordering::AcqRel, Ordering::Relaxed)
            {
                Ok(_) => return Timestamp(next),
                Err(observed) => last = observed,
            }
        }
    }

    #[inline]
    pub const fn from_micros(micros: i64) -> Self {
        Timestamp(micros)
    }

    #[inline]
    pub const fn as_micros(self) -> i64 {
        self.0
    }

    #[inline]
    pub fn is_valid(self) -> bool {
        self != Self::INVALID
    }

    /// Wall-clock view of this timestamp, if it is representable.
    pub fn to_datetime(self) -> Option<DateTime<Utc>> {
        if !self.is_valid() {
            return None;
        }
        DateTime::from_timestamp_micros(self.0)
    }
}

impl fmt::Debug for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if *self == Self::INVALID {
            write!(f, "Timestamp(INVALID)")
        } else {
            write!(f, "Timestamp({})", self.0)
        }
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.to_datetime() {
            Some(dt) => write!(f, "{}", dt.format("%Y-%m-%dT%H:%M:%S%.6fZ")),
            None => write!(f, "invalid"),
        }
    }
}

/// Forget the last issued timestamp.
///
/// Only meant for test isolation: after a reset, timestamps restart from the
/// wall clock, so anything stamped before the reset may compare greater than
/// what follows. Tests calling this must not run concurrently with tests that
/// rely on cross-test ordering.
pub fn reset() {
    LAST_ISSUED.store(0, Ordering::Release);
}

/// Last timestamp handed out, or [`Timestamp::ZERO`] if none since start/reset.
pub fn last_issued() -> Timestamp {
    Timestamp(LAST_ISSUED.load(Ordering::Acquire))
}

fn wall_clock_micros() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_micros() as i64)
        .unwrap_or(0)
}
