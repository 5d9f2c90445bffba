//! # Jitter policy for poll intervals.
//!
//! [`JitterPolicy`] adds randomness to the sleep between poll cycles so that many
//! sources watched at the same moment do not hit their upstream in lockstep.
//!
//! - [`JitterPolicy::None`]: no randomization, exact interval (default)
//! - [`JitterPolicy::Full`]: random sleep in [0, interval]
//! - [`JitterPolicy::Equal`]: sleep = interval/2 + random[0, interval/2]

use rand::Rng;
use std::time::Duration;

/// Policy controlling randomization of poll intervals.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum JitterPolicy {
    /// No jitter: sleep exactly the source's interval.
    #[default]
    None,

    /// Full jitter: random sleep in [0, interval].
    ///
    /// Can poll considerably more often than the nominal interval.
    Full,

    /// Equal jitter: sleep = interval/2 + random[0, interval/2].
    ///
    /// Never polls more than twice as often as the nominal interval.
    Equal,
}

impl JitterPolicy {
    /// Applies jitter to the given interval.
    pub fn apply(&self, interval: Duration) -> Duration {
        match self {
            JitterPolicy::None => interval,
            JitterPolicy::Full => full_jitter(interval),
            JitterPolicy::Equal => equal_jitter(interval),
        }
    }
}

/// Full jitter: random[0, delay]
fn full_jitter(delay: Duration) -> Duration {
    let ms = delay.as_millis().min(u128::from(u64::MAX)) as u64;
    if ms == 0 {
        return Duration::ZERO;
    }
    Duration::from_millis(rand::rng().random_range(0..=ms))
}

/// Equal jitter: delay/2 + random[0, delay/2]
fn equal_jitter(delay: Duration) -> Duration {
    let ms = delay.as_millis().min(u128::from(u64::MAX)) as u64;
    if ms == 0 {
        return Duration::ZERO;
    }
    let half = ms / 2;
    let jitter = if half == 0 {
        0
    } else {
        rand::rng().random_range(0..=half)
    };
    Duration::from_millis(half + jitter)
}
