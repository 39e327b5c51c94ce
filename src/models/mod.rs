//! Data models for Athenaeum

pub mod analytics;
pub mod copy;
pub mod loan;
pub mod notification;
pub mod reservation;
pub mod student;
pub mod system_config;
pub mod user;

// Re-export commonly used types
pub use copy::{BookCopy, CopyStatus};
pub use loan::{BorrowedBook, PaymentMethod, ReturnStatus};
pub use notification::{CronSummary, SweepReport};
pub use reservation::{Reservation, ReservationStatus};
pub use student::Student;
pub use system_config::{ExamPeriod, SystemConfig};
pub use user::{Role, UserClaims};
