//! Notification dispatcher: overdue notices, due-soon reminders and
//! reservation pickups.
//!
//! Every send is best effort. A failure is logged against its record and
//! the batch moves on.

use std::sync::Arc;

use chrono::{DateTime, Duration, NaiveTime, Utc};
use uuid::Uuid;

use super::{catalog::CatalogService, email::EmailService, students::StudentsService};
use crate::{
    clock::Clock,
    config::CirculationConfig,
    error::AppResult,
    models::{
        loan::BorrowedBook,
        notification::{CronSummary, SweepReport, TaskOutcome, TaskStatus},
        reservation::ReservationStatus,
    },
    policy::overdue,
    repository::Repository,
};

pub const OVERDUE_TASK: &str = "Overdue Check";
pub const UPCOMING_TASK: &str = "Upcoming Due Check";

#[derive(Clone)]
pub struct NotificationService {
    repository: Repository,
    email: EmailService,
    students: StudentsService,
    catalog: CatalogService,
    config: CirculationConfig,
    clock: Arc<dyn Clock>,
}

/// Midnight-to-midnight UTC window of the day `lead_days` after `now`
fn day_window(now: DateTime<Utc>, lead_days: i64) -> (DateTime<Utc>, DateTime<Utc>) {
    let day = (now + Duration::days(lead_days)).date_naive();
    let start = day.and_time(NaiveTime::MIN).and_utc();
    (start, start + Duration::days(1))
}

fn outcome(task: &str, result: AppResult<SweepReport>) -> TaskOutcome {
    match result {
        Ok(_) => TaskOutcome {
            task: task.to_string(),
            status: TaskStatus::Fulfilled,
            reason: None,
        },
        Err(e) => TaskOutcome {
            task: task.to_string(),
            status: TaskStatus::Rejected,
            reason: Some(e.to_string()),
        },
    }
}

impl NotificationService {
    pub fn new(
        repository: Repository,
        email: EmailService,
        students: StudentsService,
        catalog: CatalogService,
        config: CirculationConfig,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            repository,
            email,
            students,
            catalog,
            config,
            clock,
        }
    }

    /// Notify every borrower holding a past-due book and bring the stored
    /// status and fine up to date.
    pub async fn notify_overdue(&self) -> AppResult<SweepReport> {
        let now = self.clock.now();
        let records = self.repository.loans.find_unreturned_due(None, now).await?;
        let mut report = SweepReport {
            examined: records.len(),
            ..Default::default()
        };

        for record in &records {
            match self.process_overdue(record, now).await {
                Ok((notified, updated)) => {
                    report.notified += notified as usize;
                    report.updated += updated as usize;
                }
                Err(e) => {
                    report.failed += 1;
                    tracing::error!(record_id = %record.id, error = %e, "Overdue check failed for record");
                }
            }
        }

        tracing::info!(
            examined = report.examined,
            notified = report.notified,
            updated = report.updated,
            failed = report.failed,
            "Overdue check finished"
        );
        Ok(report)
    }

    async fn process_overdue(&self, record: &BorrowedBook, now: DateTime<Utc>) -> AppResult<(bool, bool)> {
        let is_core = self.catalog.is_core_for(record).await?;
        let Some(state) = overdue::project(record, is_core, now) else {
            return Ok((false, false));
        };

        let mut notified = false;
        match self.students.resolve(&record.student_id).await? {
            Some(student) => {
                if let Some(email) = student.email.as_deref() {
                    match self
                        .email
                        .send_overdue_notice(
                            email,
                            &student.name,
                            &record.book_title,
                            record.due_date,
                            state.days_overdue,
                        )
                        .await
                    {
                        Ok(_) => notified = true,
                        Err(e) => tracing::warn!(
                            record_id = %record.id,
                            to = %email,
                            error = %e,
                            "Overdue notice not delivered"
                        ),
                    }
                }
            }
            None => tracing::debug!(
                record_id = %record.id,
                student_id = %record.student_id,
                "No student profile for overdue record"
            ),
        }

        // Recomputed from the due date, so repeated sweeps converge
        let updated = state.differs_from(record)
            && self
                .repository
                .loans
                .refresh_overdue(record.id, record.return_status, record.fine_amount, state.fine_amount, now)
                .await?;

        Ok((notified, updated))
    }

    /// Remind borrowers whose books fall due on the day `reminder_lead_days` ahead
    pub async fn notify_upcoming_due(&self) -> AppResult<SweepReport> {
        let now = self.clock.now();
        let (from, until) = day_window(now, self.config.reminder_lead_days);
        let records = self
            .repository
            .loans
            .find_unreturned_due(Some(from), until)
            .await?;
        let mut report = SweepReport {
            examined: records.len(),
            ..Default::default()
        };

        for record in &records {
            match self.remind(record).await {
                Ok(sent) => report.notified += sent as usize,
                Err(e) => {
                    report.failed += 1;
                    tracing::warn!(record_id = %record.id, error = %e, "Due-soon reminder not delivered");
                }
            }
        }

        tracing::info!(
            examined = report.examined,
            notified = report.notified,
            failed = report.failed,
            "Upcoming due check finished"
        );
        Ok(report)
    }

    async fn remind(&self, record: &BorrowedBook) -> AppResult<bool> {
        let Some(student) = self.students.resolve(&record.student_id).await? else {
            return Ok(false);
        };
        let Some(email) = student.email.as_deref() else {
            return Ok(false);
        };
        self.email
            .send_due_soon_reminder(email, &student.name, &record.book_title, record.due_date)
            .await?;
        Ok(true)
    }

    /// Tell the holder of the oldest active reservation on `book_id` that a
    /// copy is back. Returns the reservation that was notified.
    pub async fn notify_reservation_ready(&self, book_id: Uuid, book_title: &str) -> AppResult<Option<Uuid>> {
        let Some(reservation) = self.repository.reservations.oldest_active(book_id).await? else {
            return Ok(None);
        };

        let student = self.repository.students.get_by_id(reservation.student_id).await?;
        match student.as_ref().and_then(|s| s.email.as_deref().map(|e| (s, e))) {
            Some((student, email)) => {
                self.email
                    .send_reservation_ready(email, &student.name, book_title)
                    .await?;
            }
            None => {
                tracing::debug!(reservation_id = %reservation.id, "Reservation holder has no email");
            }
        }

        if self.config.fulfill_reservation_on_notify {
            let moved = self
                .repository
                .reservations
                .transition(
                    reservation.id,
                    ReservationStatus::Active,
                    ReservationStatus::Fulfilled,
                    self.clock.now(),
                )
                .await?;
            if moved {
                tracing::info!(reservation_id = %reservation.id, "Reservation fulfilled");
            }
        }

        Ok(Some(reservation.id))
    }

    /// Run both sweeps concurrently and report how each settled
    pub async fn run_sweep(&self) -> CronSummary {
        let (overdue, upcoming) = tokio::join!(self.notify_overdue(), self.notify_upcoming_due());
        CronSummary {
            success: true,
            summary: vec![outcome(OVERDUE_TASK, overdue), outcome(UPCOMING_TASK, upcoming)],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_day_window_covers_whole_day() {
        let now = Utc.with_ymd_and_hms(2025, 3, 10, 21, 30, 0).unwrap();
        let (from, until) = day_window(now, 2);
        assert_eq!(from, Utc.with_ymd_and_hms(2025, 3, 12, 0, 0, 0).unwrap());
        assert_eq!(until, Utc.with_ymd_and_hms(2025, 3, 13, 0, 0, 0).unwrap());
    }

    #[test]
    fn test_rejected_outcome_carries_reason() {
        let failed = outcome(
            OVERDUE_TASK,
            Err(crate::error::AppError::Internal("store down".to_string())),
        );
        assert_eq!(failed.status, TaskStatus::Rejected);
        assert!(failed.reason.is_some());

        let ok = outcome(UPCOMING_TASK, Ok(SweepReport::default()));
        assert_eq!(ok.status, TaskStatus::Fulfilled);
        assert_eq!(ok.reason, None);
    }
}
