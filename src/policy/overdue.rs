//! Derived overdue state of a borrow record

use chrono::{DateTime, Utc};

use super::fines::compute_fine;
use crate::models::loan::{BorrowedBook, ReturnStatus};

const MILLIS_PER_DAY: i64 = 24 * 60 * 60 * 1000;

/// Whole days between `due` and `now`, any started day counting as one
pub fn days_overdue(due: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    let millis = (now - due).num_milliseconds().abs();
    (millis + MILLIS_PER_DAY - 1) / MILLIS_PER_DAY
}

/// Status and fine a record should carry at `now`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OverdueState {
    pub days_overdue: i64,
    pub fine_amount: i64,
}

impl OverdueState {
    /// Whether the stored record differs from this projection
    pub fn differs_from(&self, record: &BorrowedBook) -> bool {
        record.return_status != ReturnStatus::Overdue || record.fine_amount != self.fine_amount
    }

    pub fn apply_to(&self, record: &mut BorrowedBook) {
        record.return_status = ReturnStatus::Overdue;
        record.fine_amount = self.fine_amount;
    }
}

/// Project the overdue state of an unreturned record past its due date.
///
/// Returns `None` for returned records and records not yet due. The fine is
/// recomputed from scratch every time.
pub fn project(record: &BorrowedBook, is_core: bool, now: DateTime<Utc>) -> Option<OverdueState> {
    if record.is_returned() || now <= record.due_date {
        return None;
    }
    let days = days_overdue(record.due_date, now);
    Some(OverdueState {
        days_overdue: days,
        fine_amount: compute_fine(days, is_core),
    })
}
