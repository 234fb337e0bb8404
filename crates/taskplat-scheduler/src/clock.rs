//! Monotonic clock readings in fractional milliseconds.
//!
//! Backed by `std::time::Instant`, so wall-clock adjustments (NTP, DST,
//! manual changes) never move it backwards. The origin is fixed on first use
//! and only differences between readings are meaningful.

use std::sync::OnceLock;
use std::time::{Duration, Instant};

use crate::error::{Result, SchedulerError};

static ORIGIN: OnceLock<Instant> = OnceLock::new();

fn origin() -> Instant {
    *ORIGIN.get_or_init(Instant::now)
}

/// Milliseconds elapsed since the process-wide clock origin.
pub fn monotonic_time_ms() -> f64 {
    let origin = origin();
    Instant::now().saturating_duration_since(origin).as_secs_f64() * 1_000.0
}

/// Convert a caller-supplied delay in seconds into a `Duration`.
///
/// Rejects negative, NaN and infinite values.
pub fn delay_from_secs(delay: f64) -> Result<Duration> {
    if !delay.is_finite() || delay < 0.0 {
        return Err(SchedulerError::InvalidDelay { delay });
    }
    Duration::try_from_secs_f64(delay).map_err(|_| SchedulerError::InvalidDelay { delay })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn readings_never_decrease() {
        let mut last = monotonic_time_ms();
        for _ in 0..10_000 {
            let now = monotonic_time_ms();
            assert!(now >= last, "{now} < {last}");
            last = now;
        }
    }

    #[test]
    fn readings_track_elapsed_time() {
        let t1 = monotonic_time_ms();
        std::thread::sleep(Duration::from_millis(20));
        let t2 = monotonic_time_ms();
        assert!(t2 - t1 >= 20.0, "elapsed {}ms", t2 - t1);
    }

    #[test]
    fn delay_conversion_accepts_zero_and_fractions() {
        assert_eq!(delay_from_secs(0.0).unwrap(), Duration::ZERO);
        assert_eq!(delay_from_secs(0.25).unwrap(), Duration::from_millis(250));
    }

    #[test]
    fn delay_conversion_rejects_bad_values() {
        for bad in [-1.0, f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
            assert!(matches!(
                delay_from_secs(bad),
                Err(SchedulerError::InvalidDelay { .. })
            ));
        }
    }
}
