//! Monotonic time for the scheduler.
//!
//! Every scheduling operation receives the current time explicitly, so the
//! policy never reads a clock on its own. Hosts feed these from their tick
//! source; tests feed them by hand.

use core::fmt;
use core::ops::{Add, Sub};

/// Nanoseconds per millisecond
pub const NSEC_PER_MSEC: u64 = 1_000_000;

/// Nanoseconds per microsecond
pub const NSEC_PER_USEC: u64 = 1_000;

/// Monotonic timestamp (nanoseconds since an arbitrary boot origin).
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[repr(transparent)]
pub struct Timestamp(pub u64);

impl Timestamp {
    /// Clock origin
    pub const ZERO: Self = Self(0);

    /// Create timestamp from nanoseconds
    #[inline]
    pub const fn from_nanos(nanos: u64) -> Self {
        Self(nanos)
    }

    /// Create timestamp from milliseconds
    #[inline]
    pub const fn from_millis(millis: u64) -> Self {
        Self(millis.saturating_mul(NSEC_PER_MSEC))
    }

    /// Get raw nanosecond value
    #[inline]
    pub const fn as_nanos(self) -> u64 {
        self.0
    }

    /// Get whole milliseconds
    #[inline]
    pub const fn as_millis(self) -> u64 {
        self.0 / NSEC_PER_MSEC
    }

    /// Duration since another timestamp (zero if `earlier` is in the future)
    #[inline]
    pub const fn duration_since(self, earlier: Self) -> Duration {
        Duration::from_nanos(self.0.saturating_sub(earlier.0))
    }

    /// Add a duration
    #[inline]
    pub const fn add_duration(self, duration: Duration) -> Self {
        Self(self.0.saturating_add(duration.as_nanos()))
    }

    /// Add whole milliseconds
    #[inline]
    pub const fn add_millis(self, millis: u64) -> Self {
        self.add_duration(Duration::from_millis(millis))
    }

    /// Strictly later than `other`
    #[inline]
    pub const fn is_after(self, other: Self) -> bool {
        self.0 > other.0
    }

    /// Later than or equal to `other`
    #[inline]
    pub const fn is_at_or_after(self, other: Self) -> bool {
        self.0 >= other.0
    }
}

impl fmt::Debug for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Timestamp({}ns)", self.0)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{:06}ms",
            self.0 / NSEC_PER_MSEC,
            self.0 % NSEC_PER_MSEC
        )
    }
}

impl Add<Duration> for Timestamp {
    type Output = Self;

    #[inline]
    fn add(self, rhs: Duration) -> Self {
        self.add_duration(rhs)
    }
}

impl Sub<Timestamp> for Timestamp {
    type Output = Duration;

    #[inline]
    fn sub(self, rhs: Timestamp) -> Duration {
        self.duration_since(rhs)
    }
}

/// Span of monotonic time in nanoseconds.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[repr(transparent)]
pub struct Duration(u64);

impl Duration {
    /// Zero duration
    pub const ZERO: Self = Self(0);

    /// One millisecond
    pub const MILLISECOND: Self = Self(NSEC_PER_MSEC);

    /// Create from nanoseconds
    #[inline]
    pub const fn from_nanos(nanos: u64) -> Self {
        Self(nanos)
    }

    /// Create from milliseconds
    #[inline]
    pub const fn from_millis(millis: u64) -> Self {
        Self(millis.saturating_mul(NSEC_PER_MSEC))
    }

    /// Get as nanoseconds
    #[inline]
    pub const fn as_nanos(self) -> u64 {
        self.0
    }

    /// Get as whole milliseconds
    #[inline]
    pub const fn as_millis(self) -> u64 {
        self.0 / NSEC_PER_MSEC
    }

    /// Saturating add
    #[inline]
    pub const fn saturating_add(self, rhs: Self) -> Self {
        Self(self.0.saturating_add(rhs.0))
    }
}

impl fmt::Debug for Duration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0 >= NSEC_PER_MSEC {
            write!(f, "{}ms", self.0 / NSEC_PER_MSEC)
        } else if self.0 >= NSEC_PER_USEC {
            write!(f, "{}us", self.0 / NSEC_PER_USEC)
        } else {
            write!(f, "{}ns", self.0)
        }
    }
}

impl Add for Duration {
    type Output = Self;

    #[inline]
    fn add(self, rhs: Self) -> Self {
        self.saturating_add(rhs)
    }
}

// =============================================================================
// TESTS
// =============================================================================
