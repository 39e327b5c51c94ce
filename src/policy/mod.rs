//! Circulation rules with no I/O: fines, due dates and overdue projection

pub mod due_date;
pub mod fines;
pub mod overdue;

pub use due_date::{BorrowerProfile, DueDateMode, DueDatePolicy, ResourceProfile};
pub use fines::compute_fine;
pub use overdue::{days_overdue, OverdueState};
