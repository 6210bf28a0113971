//! Review interval scheduling
//!
//! Difficulty ratings (1-5):
//! - 1: Hard, review again tomorrow
//! - 2: Medium-hard, 2 days
//! - 3: Medium, 4 days
//! - 4: Medium-easy, 1 week
//! - 5: Easy, 2 weeks
//!
//! Each earlier review stretches the base interval by a factor of 1.3.

use chrono::{DateTime, Duration, Utc};

/// Multiplier applied once per previous review
const GROWTH_FACTOR: f64 = 1.3;

/// Upper bound on a single interval (about 100 years)
const MAX_INTERVAL_DAYS: i64 = 36_500;

/// Result of scheduling the next review
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReviewResult {
    pub interval_days: i64,
    pub next_review: DateTime<Utc>,
}

/// Base interval in days for a difficulty rating
///
/// Unknown ratings fall back to the hardest interval.
pub fn base_interval_days(difficulty: i32) -> i64 {
    match difficulty {
        1 => 1,
        2 => 2,
        3 => 4,
        4 => 7,
        5 => 14,
        _ => 1,
    }
}

/// Whole days until the next review, truncated toward zero
///
/// `review_count` is the number of reviews before this one.
pub fn interval_days(difficulty: i32, review_count: i64) -> i64 {
    let base = base_interval_days(difficulty) as f64;
    let interval = if review_count > 0 {
        base * GROWTH_FACTOR.powf(review_count as f64)
    } else {
        base
    };

    (interval.trunc().min(MAX_INTERVAL_DAYS as f64)) as i64
}

/// Calculate when a card graded `difficulty` at `now` should be seen again
pub fn calculate_next_review(difficulty: i32, review_count: i64, now: DateTime<Utc>) -> ReviewResult {
    let interval_days = interval_days(difficulty, review_count);
    let next_review = now
        .checked_add_signed(Duration::days(interval_days))
        .unwrap_or(DateTime::<Utc>::MAX_UTC);

    ReviewResult {
        interval_days,
        next_review,
    }
}

/// Format an interval in days to a human-readable string
pub fn format_interval(days: i64) -> String {
    if days <= 0 {
        "now".to_string()
    } else if days < 7 {
        format!("{}d", days)
    } else if days < 30 {
        format!("{}w", days / 7)
    } else if days < 365 {
        format!("{}mo", days / 30)
    } else {
        format!("{}y", days / 365)
    }
}
