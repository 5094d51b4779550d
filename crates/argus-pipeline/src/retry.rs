//! Retry backoff for failed classification attempts.

/// Delays never exceed one hour regardless of attempt count.
const MAX_DELAY_SECS: u64 = 3600;

/// Compute the backoff before the next classification attempt, in seconds.
///
/// Exponential in the number of prior attempts (`base * 2^attempts`) with
/// ±25% jitter, capped at [`MAX_DELAY_SECS`]. The result is persisted as
/// the entry's retry gate, so the backoff holds across worker processes.
#[must_use]
pub fn backoff_secs(base_secs: u64, prior_attempts: i32) -> f64 {
    let shift = u32::try_from(prior_attempts).unwrap_or(0).min(10);
    let computed = base_secs.saturating_mul(1u64 << shift);
    let capped = computed.min(MAX_DELAY_SECS);
    #[allow(clippy::cast_precision_loss)]
    let with_jitter = (capped as f64) * (rand::random::<f64>() * 0.5 + 0.75);
    with_jitter
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_grows_exponentially_within_jitter_bounds() {
        for (attempts, expected_base) in [(0, 30.0), (1, 60.0), (2, 120.0), (3, 240.0)] {
            let delay = backoff_secs(30, attempts);
            assert!(
                delay >= expected_base * 0.75 && delay <= expected_base * 1.25,
                "attempt {attempts}: delay {delay} outside jitter bounds of {expected_base}"
            );
        }
    }

    #[test]
    fn backoff_is_capped() {
        let delay = backoff_secs(30, 10);
        assert!(delay <= f64::from(u32::try_from(MAX_DELAY_SECS).unwrap()) * 1.25);
    }

    #[test]
    fn negative_attempts_behave_like_zero() {
        let delay = backoff_secs(30, -5);
        assert!((22.5..=37.5).contains(&delay));
    }

    #[test]
    fn zero_base_yields_zero_delay() {
        assert_eq!(backoff_secs(0, 3), 0.0);
    }
}
