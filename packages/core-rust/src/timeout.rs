//! Signed wait timeouts.
//!
//! A `WaitTimeout` is a nanosecond count with three meanings:
//! - zero: check once without blocking
//! - positive: block up to that long
//! - negative: block indefinitely
//!
//! Arithmetic saturates at the `i64` bounds so repeated subtraction of
//! elapsed time can never wrap around into a huge positive budget.

use std::fmt;
use std::time::Duration;

/// Signed timeout in nanoseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct WaitTimeout(i64);

impl WaitTimeout {
    /// Single check, never blocks.
    pub const NON_BLOCKING: Self = Self(0);
    /// Block until the condition holds or shutdown is requested.
    pub const INFINITE: Self = Self(-1);

    #[must_use]
    pub const fn from_nanos(nanos: i64) -> Self {
        Self(nanos)
    }

    /// Creates a timeout from milliseconds, saturating on overflow.
    #[must_use]
    pub const fn from_millis(millis: i64) -> Self {
        Self(millis.saturating_mul(1_000_000))
    }

    #[must_use]
    pub const fn as_nanos(self) -> i64 {
        self.0
    }

    /// Returns `true` for the zero timeout.
    #[must_use]
    pub const fn is_non_blocking(self) -> bool {
        self.0 == 0
    }

    /// Returns `true` for any negative timeout.
    #[must_use]
    pub const fn is_infinite(self) -> bool {
        self.0 < 0
    }

    /// Returns `true` for a strictly positive timeout.
    #[must_use]
    pub const fn is_bounded(self) -> bool {
        self.0 > 0
    }

    /// Budget left after `elapsed` has been spent: `self - elapsed`.
    ///
    /// The result may be negative. For an infinite timeout the result stays
    /// negative, so it keeps meaning "forever".
    #[must_use]
    pub fn remaining_after(self, elapsed: Duration) -> Self {
        let elapsed = i64::try_from(elapsed.as_nanos()).unwrap_or(i64::MAX);
        Self(self.0.saturating_sub(elapsed))
    }

    /// Converts to a blocking duration. `None` means wait forever; a zero
    /// timeout maps to `Duration::ZERO`.
    #[must_use]
    pub fn to_duration(self) -> Option<Duration> {
        u64::try_from(self.0).ok().map(Duration::from_nanos)
    }
}

impl Default for WaitTimeout {
    fn default() -> Self {
        Self::INFINITE
    }
}

impl From<Duration> for WaitTimeout {
    fn from(duration: Duration) -> Self {
        Self(i64::try_from(duration.as_nanos()).unwrap_or(i64::MAX))
    }
}

impl fmt::Display for WaitTimeout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_infinite() {
            f.write_str("infinite")
        } else {
            write!(f, "{}ns", self.0)
        }
    }
}
