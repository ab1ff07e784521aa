use std::time::Duration;

/// Highest power of two applied to the initial delay (64x).
pub const MAX_BACKOFF_EXPONENT: u32 = 6;

/// Calculate exponential backoff delay
///
/// `attempts` is the failure count after it was incremented for the failure
/// being handled, so the first failure waits `initial`. A count of zero is
/// treated like the first tier.
pub fn backoff_delay(initial: Duration, max: Duration, attempts: u32) -> Duration {
    let exponent = attempts.saturating_sub(1).min(MAX_BACKOFF_EXPONENT);
    initial.saturating_mul(1 << exponent).min(max)
}
