use std::time::Duration;

use rand::Rng;

/// Lower bound applied to every retry delay.
pub const DELAY_FLOOR: Duration = Duration::from_millis(1_000);

/// Computes the wait before retry number `attempt + 1`.
///
/// The exponential value `min(cap, base * multiplier^attempt)` is jittered
/// by drawing uniformly from `[value * (1 - jitter), value]`, so `jitter = 0`
/// returns the exponential value unchanged and `jitter = 1` draws from
/// `[0, value]`. The result always lies within
/// `[DELAY_FLOOR, max(cap, DELAY_FLOOR)]`.
pub fn compute_delay<R: Rng + ?Sized>(
    attempt: u32,
    base: Duration,
    cap: Duration,
    multiplier: f64,
    jitter: f64,
    rng: &mut R,
) -> Duration {
    let cap_ms = cap.as_millis() as f64;
    let growth = multiplier.powi(attempt.min(i32::MAX as u32) as i32);
    let exponential = (base.as_millis() as f64 * growth).min(cap_ms);

    let jitter = jitter.clamp(0.0, 1.0);
    let low = exponential * (1.0 - jitter);
    let jittered = if low < exponential {
        rng.gen_range(low..=exponential)
    } else {
        exponential
    };

    clamp_delay(Duration::from_millis(jittered as u64), cap)
}

/// Clamps a delay into `[DELAY_FLOOR, max(cap, DELAY_FLOOR)]`.
pub(crate) fn clamp_delay(delay: Duration, cap: Duration) -> Duration {
    delay.clamp(DELAY_FLOOR, cap.max(DELAY_FLOOR))
}
