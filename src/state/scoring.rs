//! Points awarded for a resolved question.
//!
//! Faster answers score higher: a correct answer given instantly is worth
//! [`MAX_POINTS`], one given at the very end of the window is worth nothing,
//! and the value decreases linearly in between.

/// Points for a correct answer submitted with zero latency.
pub const MAX_POINTS: u32 = 100;

/// Score a single question.
///
/// Returns 0 for wrong answers. Correct answers get
/// `floor(100 * (1 - response / window))` clamped to `[0, 100]`. A non-positive
/// or non-finite window leaves no time to earn a bonus, so it also yields 0.
pub fn score(is_correct: bool, response_time_secs: f64, window_secs: f64) -> u32 {
    if !is_correct || !window_secs.is_finite() || window_secs <= 0.0 {
        return 0;
    }
    if response_time_secs.is_nan() {
        return 0;
    }

    let remaining = (window_secs - response_time_secs) / window_secs;
    let points = (f64::from(MAX_POINTS) * remaining).floor();
    points.clamp(0.0, f64::from(MAX_POINTS)) as u32
}

/// Score contributed by a question whose deadline expired.
pub const fn timeout_score() -> u32 {
    0
}
