//! Repository layer for document storage
//!
//! Each collection is reached through an async trait so the services can run
//! against PostgreSQL or the in-process [`memory::MemoryStore`].

pub mod copies;
pub mod loans;
pub mod memory;
pub mod reservations;
pub mod students;
pub mod system_config;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Pool, Postgres};
use uuid::Uuid;

use crate::{
    error::AppResult,
    models::{
        analytics::{GroupCount, LoanActivity},
        copy::{BookCopy, CopyFilter},
        loan::{BorrowFilter, BorrowSort, BorrowedBook, CirculationStats, ReturnStatus},
        reservation::{Reservation, ReservationQuery, ReservationStatus},
        student::Student,
        system_config::SystemConfig,
    },
};

#[async_trait]
pub trait LoanStore: Send + Sync {
    async fn get_by_id(&self, id: Uuid) -> AppResult<Option<BorrowedBook>>;

    /// One page of records plus the total matching `filter`
    async fn list(
        &self,
        filter: &BorrowFilter,
        sort: BorrowSort,
        offset: i64,
        limit: i64,
    ) -> AppResult<(Vec<BorrowedBook>, i64)>;

    async fn insert(&self, record: &BorrowedBook) -> AppResult<()>;

    /// Replace the stored record; `false` when it does not exist
    async fn save(&self, record: &BorrowedBook) -> AppResult<bool>;

    /// Store overdue status and `fine` only if the stored status and fine
    /// still equal the expected values
    async fn refresh_overdue(
        &self,
        id: Uuid,
        expected_status: ReturnStatus,
        expected_fine: i64,
        fine: i64,
        now: DateTime<Utc>,
    ) -> AppResult<bool>;

    /// Unreturned records with `from <= due_date < until`
    async fn find_unreturned_due(
        &self,
        from: Option<DateTime<Utc>>,
        until: DateTime<Utc>,
    ) -> AppResult<Vec<BorrowedBook>>;

    async fn delete(&self, id: Uuid) -> AppResult<bool>;

    async fn delete_many(&self, ids: &[Uuid]) -> AppResult<u64>;

    async fn stats(&self, now: DateTime<Utc>) -> AppResult<CirculationStats>;

    /// Unreturned and overdue counts plus borrows per day, at most
    /// `history_days` days starting from the earliest
    async fn activity(&self, history_days: i64) -> AppResult<LoanActivity>;
}

#[async_trait]
pub trait CopyStore: Send + Sync {
    async fn get_by_id(&self, id: Uuid) -> AppResult<Option<BookCopy>>;

    /// Any copy carrying exactly this title
    async fn find_by_title(&self, title: &str) -> AppResult<Option<BookCopy>>;

    async fn list(&self, filter: &CopyFilter) -> AppResult<Vec<BookCopy>>;

    /// All copies of one title/author group
    async fn list_group(&self, title: &str, author: Option<&str>) -> AppResult<Vec<BookCopy>>;

    async fn insert(&self, copy: &BookCopy) -> AppResult<()>;

    /// Flip an `Available` copy to `Borrowed`. `None` when the copy is
    /// missing or no longer available.
    async fn claim(
        &self,
        id: Uuid,
        borrower: &str,
        due_date: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> AppResult<Option<BookCopy>>;

    /// Put a `Borrowed` copy back on the shelf
    async fn release(&self, id: Uuid, now: DateTime<Utc>) -> AppResult<bool>;

    async fn delete(&self, id: Uuid) -> AppResult<bool>;

    /// Copies per genre, ordered by genre
    async fn count_by_genre(&self) -> AppResult<Vec<GroupCount>>;
}

#[async_trait]
pub trait ReservationStore: Send + Sync {
    async fn get_by_id(&self, id: Uuid) -> AppResult<Option<Reservation>>;

    /// Fails with `Conflict` if the pair already has an active reservation
    async fn insert(&self, reservation: &Reservation) -> AppResult<()>;

    async fn find_active(&self, book_id: Uuid, student_id: Uuid) -> AppResult<Option<Reservation>>;

    /// Newest first
    async fn list(&self, filter: &ReservationQuery) -> AppResult<Vec<Reservation>>;

    /// Earliest active reservation on a book
    async fn oldest_active(&self, book_id: Uuid) -> AppResult<Option<Reservation>>;

    async fn set_status(
        &self,
        id: Uuid,
        status: ReservationStatus,
        now: DateTime<Utc>,
    ) -> AppResult<Option<Reservation>>;

    /// Change status only if it is still `from`
    async fn transition(
        &self,
        id: Uuid,
        from: ReservationStatus,
        to: ReservationStatus,
        now: DateTime<Utc>,
    ) -> AppResult<bool>;
}

#[async_trait]
pub trait StudentStore: Send + Sync {
    async fn get_by_id(&self, id: Uuid) -> AppResult<Option<Student>>;

    async fn find_by_roll_no(&self, roll_no: &str) -> AppResult<Option<Student>>;

    /// Case-insensitive email match
    async fn find_by_email(&self, email: &str) -> AppResult<Option<Student>>;

    async fn list(&self, search: Option<&str>) -> AppResult<Vec<Student>>;

    /// Fails with `Conflict` on a duplicate roll number
    async fn insert(&self, student: &Student) -> AppResult<()>;

    async fn save(&self, student: &Student) -> AppResult<bool>;

    async fn delete_by_roll_no(&self, roll_no: &str) -> AppResult<bool>;

    async fn count(&self) -> AppResult<i64>;
}

#[async_trait]
pub trait SystemConfigStore: Send + Sync {
    async fn get(&self) -> AppResult<Option<SystemConfig>>;

    async fn upsert(&self, config: &SystemConfig) -> AppResult<()>;
}

/// Main repository struct holding one handle per collection
#[derive(Clone)]
pub struct Repository {
    pub pool: Option<Pool<Postgres>>,
    pub loans: Arc<dyn LoanStore>,
    pub copies: Arc<dyn CopyStore>,
    pub reservations: Arc<dyn ReservationStore>,
    pub students: Arc<dyn StudentStore>,
    pub system_config: Arc<dyn SystemConfigStore>,
}

impl Repository {
    /// Create a new repository with the given database pool
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self {
            loans: Arc::new(loans::LoansRepository::new(pool.clone())),
            copies: Arc::new(copies::CopiesRepository::new(pool.clone())),
            reservations: Arc::new(reservations::ReservationsRepository::new(pool.clone())),
            students: Arc::new(students::StudentsRepository::new(pool.clone())),
            system_config: Arc::new(system_config::SystemConfigRepository::new(pool.clone())),
            pool: Some(pool),
        }
    }

    /// Repository backed by a single in-process store
    pub fn in_memory() -> Self {
        let store = Arc::new(memory::MemoryStore::default());
        Self {
            pool: None,
            loans: store.clone(),
            copies: store.clone(),
            reservations: store.clone(),
            students: store.clone(),
            system_config: store,
        }
    }

    /// Check that the backing store answers
    pub async fn ping(&self) -> AppResult<()> {
        if let Some(pool) = &self.pool {
            sqlx::query("SELECT 1").execute(pool).await?;
        }
        Ok(())
    }
}

/// Map a unique-constraint violation to `Conflict`, anything else to `Database`
pub(crate) fn map_unique_violation(err: sqlx::Error, message: &str) -> crate::error::AppError {
    match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            crate::error::AppError::Conflict(message.to_string())
        }
        _ => crate::error::AppError::Database(err),
    }
}
