//! Circulation service: borrowing, the borrow record ledger, returns and
//! fine payment

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;
use validator::Validate;

use super::{
    catalog::CatalogService, notifications::NotificationService, settings::SettingsService,
    students::StudentsService, validate_pattern,
};
use crate::{
    clock::Clock,
    config::CirculationConfig,
    error::{AppError, AppResult},
    models::{
        copy::{BookCopy, BorrowResponse, CopyStatus},
        loan::{
            BorrowFilter, BorrowListResponse, BorrowQuery, BorrowSort, BorrowedBook,
            CreateBorrowRecord, PaymentMethod, ReturnStatus, UpdateBorrowRecord,
        },
        student::Student,
        user::UserClaims,
    },
    policy::{
        compute_fine, days_overdue, overdue, BorrowerProfile, DueDateMode, DueDatePolicy,
        ResourceProfile,
    },
    repository::Repository,
};

const DEFAULT_PAGE_SIZE: i64 = 10;
const MAX_PAGE_SIZE: i64 = 100;

fn record_not_found() -> AppError {
    AppError::NotFound("Record not found".to_string())
}

fn profiles<'a>(student: Option<&Student>, copy: Option<&'a BookCopy>) -> (BorrowerProfile, ResourceProfile<'a>) {
    let borrower = BorrowerProfile {
        year_of_study: student.and_then(|s| s.year_of_study),
    };
    let resource = copy
        .map(|c| ResourceProfile {
            category: c.category.as_deref(),
            is_core: c.is_core,
        })
        .unwrap_or_default();
    (borrower, resource)
}

#[derive(Clone)]
pub struct CirculationService {
    repository: Repository,
    policy: DueDatePolicy,
    config: CirculationConfig,
    catalog: CatalogService,
    students: StudentsService,
    settings: SettingsService,
    notifications: NotificationService,
    clock: Arc<dyn Clock>,
}

impl CirculationService {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        repository: Repository,
        config: CirculationConfig,
        catalog: CatalogService,
        students: StudentsService,
        settings: SettingsService,
        notifications: NotificationService,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            repository,
            policy: DueDatePolicy::new(&config),
            config,
            catalog,
            students,
            settings,
            notifications,
            clock,
        }
    }

    /// Self-service borrow of one physical copy
    pub async fn borrow(&self, copy_id: Uuid, claims: &UserClaims) -> AppResult<BorrowResponse> {
        let now = self.clock.now();
        let copy = self
            .repository
            .copies
            .get_by_id(copy_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Book copy not found".to_string()))?;
        if copy.status != CopyStatus::Available {
            return Err(AppError::Unavailable("Book copy is currently unavailable".to_string()));
        }

        let student = self.students.for_caller(claims).await?;
        let (mode, exam_periods) = if self.config.borrow_uses_full_policy {
            (DueDateMode::Full, self.settings.exam_periods().await?)
        } else {
            (DueDateMode::Flat, Vec::new())
        };
        let (borrower, resource) = profiles(student.as_ref(), Some(&copy));
        let due_date = self.policy.due_date(mode, now, borrower, resource, &exam_periods);

        // Only one concurrent borrow can flip the copy
        let book = self
            .repository
            .copies
            .claim(copy.id, &claims.email, due_date, now)
            .await?
            .ok_or_else(|| AppError::Unavailable("Book copy is currently unavailable".to_string()))?;

        let mut record = BorrowedBook::new(
            claims.name.clone(),
            student
                .as_ref()
                .map(|s| s.roll_no.clone())
                .unwrap_or_else(|| "N/A".to_string()),
            Some(book.id),
            book.title.clone(),
            now,
            due_date,
            now,
        );
        record.student_email = Some(claims.email.clone());

        if let Err(e) = self.repository.loans.insert(&record).await {
            if let Err(release_err) = self.repository.copies.release(book.id, now).await {
                tracing::error!(copy_id = %book.id, error = %release_err, "Could not release copy after failed borrow");
            }
            return Err(e);
        }

        tracing::info!(
            record_id = %record.id,
            copy_id = %book.id,
            borrower = %claims.email,
            due_date = %due_date,
            "Book borrowed"
        );
        Ok(BorrowResponse {
            message: "Book borrowed successfully".to_string(),
            book,
        })
    }

    /// Administrative creation of a borrow record with the full due-date rules
    pub async fn create_record(&self, request: CreateBorrowRecord) -> AppResult<BorrowedBook> {
        let now = self.clock.now();
        if request.student_id.trim().is_empty() {
            return Err(AppError::Validation("Student ID is required".to_string()));
        }

        let student = self.students.resolve(&request.student_id).await?;
        let mut copy = match request.book_id {
            Some(id) => self.repository.copies.get_by_id(id).await?,
            None => None,
        };
        if copy.is_none() {
            if let Some(title) = request.book_title.as_deref() {
                copy = self.repository.copies.find_by_title(title).await?;
            }
        }

        let borrow_date = request.borrow_date.unwrap_or(now);
        let due_date = if student.is_some() && copy.is_some() {
            let exam_periods = self.settings.exam_periods().await?;
            let (borrower, resource) = profiles(student.as_ref(), copy.as_ref());
            self.policy
                .due_date(DueDateMode::Full, borrow_date, borrower, resource, &exam_periods)
        } else {
            request
                .due_date
                .unwrap_or_else(|| borrow_date + Duration::days(self.policy.base_days()))
        };

        let student_name = request
            .student_name
            .filter(|n| !n.trim().is_empty())
            .or_else(|| student.as_ref().map(|s| s.name.clone()))
            .ok_or_else(|| AppError::Validation("Student name is required".to_string()))?;
        let book_title = request
            .book_title
            .filter(|t| !t.trim().is_empty())
            .or_else(|| copy.as_ref().map(|c| c.title.clone()))
            .ok_or_else(|| AppError::Validation("Book title is required".to_string()))?;

        let mut record = BorrowedBook::new(
            student_name,
            request.student_id,
            copy.as_ref().map(|c| c.id),
            book_title,
            borrow_date,
            due_date,
            now,
        );
        record.student_email = student.and_then(|s| s.email);

        self.repository.loans.insert(&record).await?;
        tracing::info!(record_id = %record.id, due_date = %record.due_date, "Borrow record created");
        Ok(record)
    }

    /// Paginated borrow records. Past-due records are projected as overdue
    /// and the projection is stored when it changed.
    pub async fn list(&self, query: &BorrowQuery, claims: &UserClaims) -> AppResult<BorrowListResponse> {
        let page = query.page.unwrap_or(1).max(1);
        let limit = query
            .limit
            .filter(|l| *l > 0)
            .unwrap_or(DEFAULT_PAGE_SIZE)
            .min(MAX_PAGE_SIZE);

        let search = query.search.clone().filter(|s| !s.is_empty());
        if let Some(pattern) = search.as_deref() {
            validate_pattern(pattern)?;
        }

        let mut filter = BorrowFilter {
            status: query.status,
            search,
            ..Default::default()
        };
        if !claims.is_admin() {
            let Some(student) = self.students.for_caller(claims).await? else {
                return Ok(BorrowListResponse {
                    total: 0,
                    page,
                    limit,
                    records: Vec::new(),
                });
            };
            filter.student_id = Some(student.roll_no);
            filter.search_title_only = true;
        }

        let sort = BorrowSort::parse(query.sort.as_deref());
        let (records, total) = self
            .repository
            .loans
            .list(&filter, sort, (page - 1) * limit, limit)
            .await?;

        let now = self.clock.now();
        let mut refreshed = Vec::with_capacity(records.len());
        for record in records {
            refreshed.push(self.refresh(record, now).await?);
        }

        Ok(BorrowListResponse {
            total,
            page,
            limit,
            records: refreshed,
        })
    }

    /// Apply the overdue projection to `record`, storing it if it changed
    async fn refresh(&self, mut record: BorrowedBook, now: DateTime<Utc>) -> AppResult<BorrowedBook> {
        if record.is_returned() || now <= record.due_date {
            return Ok(record);
        }
        let is_core = self.catalog.is_core_for(&record).await?;
        let Some(state) = overdue::project(&record, is_core, now) else {
            return Ok(record);
        };

        if state.differs_from(&record) {
            let stored = self
                .repository
                .loans
                .refresh_overdue(record.id, record.return_status, record.fine_amount, state.fine_amount, now)
                .await?;
            if stored {
                tracing::info!(
                    record_id = %record.id,
                    days_overdue = state.days_overdue,
                    fine = state.fine_amount,
                    "Borrow record marked overdue"
                );
                record.updated_at = now;
            }
        }
        state.apply_to(&mut record);
        Ok(record)
    }

    /// Administrative update; moving a record to `Returned` assesses the
    /// late fine, releases the copy and notifies the next reservation.
    pub async fn update(&self, id: Uuid, patch: UpdateBorrowRecord) -> AppResult<BorrowedBook> {
        patch.validate()?;
        let now = self.clock.now();
        let mut record = self
            .repository
            .loans
            .get_by_id(id)
            .await?
            .ok_or_else(record_not_found)?;

        if record.is_returned()
            && patch.return_status.map_or(false, |s| s != ReturnStatus::Returned)
        {
            return Err(AppError::Validation("A returned record cannot be reopened".to_string()));
        }

        let returning = patch.return_status == Some(ReturnStatus::Returned) && !record.is_returned();
        let explicit_fine = patch.fine_amount;
        let stored_due = record.due_date;

        let assessed = if returning && now > stored_due {
            let is_core = self.catalog.is_core_for(&record).await?;
            Some(compute_fine(days_overdue(stored_due, now), is_core))
        } else {
            None
        };

        patch.apply_to(&mut record);
        if let Some(fine) = assessed {
            record.fine_amount = explicit_fine.unwrap_or(fine);
            if record.fine_amount > 0 {
                record.is_fine_paid = false;
            }
        }
        record.updated_at = now;

        if !self.repository.loans.save(&record).await? {
            return Err(record_not_found());
        }

        if returning {
            tracing::info!(record_id = %record.id, fine = record.fine_amount, "Book returned");
            self.after_return(&record, now).await;
        }
        Ok(record)
    }

    /// Side effects of a return; failures are logged, never raised
    async fn after_return(&self, record: &BorrowedBook, now: DateTime<Utc>) {
        let Some(book_id) = record.book_id else {
            return;
        };

        match self.repository.copies.release(book_id, now).await {
            Ok(true) => tracing::debug!(copy_id = %book_id, "Copy back on the shelf"),
            Ok(false) => {}
            Err(e) => tracing::warn!(copy_id = %book_id, error = %e, "Could not release copy"),
        }

        if let Err(e) = self
            .notifications
            .notify_reservation_ready(book_id, &record.book_title)
            .await
        {
            tracing::warn!(record_id = %record.id, error = %e, "Reservation notification failed");
        }
    }

    /// Flip the librarian gate for self-service payment
    pub async fn toggle_payment(&self, id: Uuid) -> AppResult<BorrowedBook> {
        let mut record = self
            .repository
            .loans
            .get_by_id(id)
            .await?
            .ok_or_else(record_not_found)?;
        record.is_payment_enabled = !record.is_payment_enabled;
        record.updated_at = self.clock.now();

        if !self.repository.loans.save(&record).await? {
            return Err(record_not_found());
        }
        Ok(record)
    }

    pub async fn pay_fine(
        &self,
        id: Uuid,
        method: Option<PaymentMethod>,
        claims: &UserClaims,
    ) -> AppResult<BorrowedBook> {
        let mut record = self
            .repository
            .loans
            .get_by_id(id)
            .await?
            .ok_or_else(record_not_found)?;

        if !claims.is_admin() {
            if !record.is_payment_enabled {
                return Err(AppError::Forbidden("Payment not enabled by librarian.".to_string()));
            }
            if !self.owns(claims, &record).await? {
                return Err(AppError::Forbidden("This borrow record belongs to another student.".to_string()));
            }
        }

        let now = self.clock.now();
        record.is_fine_paid = true;
        record.is_payment_enabled = false;
        record.payment_method = Some(method.unwrap_or(PaymentMethod::Cash));
        record.payment_date = Some(now);
        record.updated_at = now;

        if !self.repository.loans.save(&record).await? {
            return Err(record_not_found());
        }
        tracing::info!(record_id = %record.id, amount = record.fine_amount, "Fine paid");
        Ok(record)
    }

    async fn owns(&self, claims: &UserClaims, record: &BorrowedBook) -> AppResult<bool> {
        if record
            .student_email
            .as_deref()
            .map_or(false, |e| e.eq_ignore_ascii_case(&claims.email))
        {
            return Ok(true);
        }
        Ok(self
            .students
            .for_caller(claims)
            .await?
            .map_or(false, |s| s.roll_no == record.student_id))
    }

    pub async fn delete(&self, id: Uuid) -> AppResult<()> {
        if !self.repository.loans.delete(id).await? {
            return Err(record_not_found());
        }
        tracing::info!(record_id = %id, "Borrow record deleted");
        Ok(())
    }

    pub async fn bulk_delete(&self, ids: &[Uuid]) -> AppResult<u64> {
        if ids.is_empty() {
            return Err(AppError::Validation("No record ids supplied".to_string()));
        }
        let deleted = self.repository.loans.delete_many(ids).await?;
        tracing::info!(requested = ids.len(), deleted, "Borrow records deleted");
        Ok(deleted)
    }
}
