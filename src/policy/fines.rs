//! Late-fee schedule
//!
//! Fines escalate in three tiers, priced against a base daily rate that
//! depends on whether the resource is flagged core:
//!
//! | days overdue | per-day cost       |
//! |--------------|--------------------|
//! | 1..=3        | 20% of base (grace)|
//! | 4..=7        | 100% of base       |
//! | 8..          | 200% of base       |
//!
//! Earlier tiers are always billed in full before a later tier applies, and
//! the total is rounded up to a whole unit.

/// Daily rate for resources flagged core
pub const CORE_BASE_RATE: i64 = 20;
/// Daily rate for everything else
pub const STANDARD_BASE_RATE: i64 = 5;

const GRACE_DAYS: i64 = 3;
const FULL_RATE_LAST_DAY: i64 = 7;

// Per-day weights expressed in fifths of the base rate
const GRACE_WEIGHT: i64 = 1;
const FULL_WEIGHT: i64 = 5;
const PUNITIVE_WEIGHT: i64 = 10;

pub fn base_rate(is_core: bool) -> i64 {
    if is_core {
        CORE_BASE_RATE
    } else {
        STANDARD_BASE_RATE
    }
}

/// Fine owed for a loan `days_overdue` days past its due date
pub fn compute_fine(days_overdue: i64, is_core: bool) -> i64 {
    let days = days_overdue.max(0);

    let grace = days.min(GRACE_DAYS);
    let full = (days.min(FULL_RATE_LAST_DAY) - GRACE_DAYS).max(0);
    let punitive = (days - FULL_RATE_LAST_DAY).max(0);

    let fifths = grace * GRACE_WEIGHT + full * FULL_WEIGHT + punitive * PUNITIVE_WEIGHT;
    let scaled = fifths * base_rate(is_core);

    // ceil(scaled / 5); scaled is never negative
    (scaled + 4) / 5
}
