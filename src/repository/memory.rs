//! In-process store used for local runs (`memory://`) and service tests.
//!
//! Every conditional update takes the table's write lock, so the
//! compare-and-set semantics match the SQL `UPDATE ... WHERE` versions.

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use regex::{Regex, RegexBuilder};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{CopyStore, LoanStore, ReservationStore, StudentStore, SystemConfigStore};
use crate::{
    error::{AppError, AppResult},
    models::{
        analytics::{GroupCount, LoanActivity},
        copy::{BookCopy, CopyFilter, CopyStatus},
        loan::{BorrowFilter, BorrowSort, BorrowSortField, BorrowedBook, CirculationStats, ReturnStatus},
        reservation::{Reservation, ReservationQuery, ReservationStatus},
        student::Student,
        system_config::SystemConfig,
    },
};

#[derive(Default)]
pub struct MemoryStore {
    loans: RwLock<HashMap<Uuid, BorrowedBook>>,
    copies: RwLock<HashMap<Uuid, BookCopy>>,
    reservations: RwLock<HashMap<Uuid, Reservation>>,
    students: RwLock<HashMap<Uuid, Student>>,
    system_config: RwLock<Option<SystemConfig>>,
}

/// Case-insensitive pattern, as `~*` does in PostgreSQL
fn pattern(raw: &str) -> AppResult<Regex> {
    RegexBuilder::new(raw)
        .case_insensitive(true)
        .build()
        .map_err(|e| AppError::Validation(format!("Invalid search pattern: {}", e)))
}

fn matches_opt(re: &Regex, value: Option<&str>) -> bool {
    value.map(|v| re.is_match(v)).unwrap_or(false)
}

fn compare_loans(a: &BorrowedBook, b: &BorrowedBook, sort: BorrowSort) -> std::cmp::Ordering {
    let ord = match sort.field {
        BorrowSortField::DueDate => a.due_date.cmp(&b.due_date),
        BorrowSortField::BorrowDate => a.borrow_date.cmp(&b.borrow_date),
        BorrowSortField::StudentName => a.student_name.cmp(&b.student_name),
        BorrowSortField::BookTitle => a.book_title.cmp(&b.book_title),
        BorrowSortField::FineAmount => a.fine_amount.cmp(&b.fine_amount),
        BorrowSortField::ReturnStatus => a.return_status.as_str().cmp(b.return_status.as_str()),
        BorrowSortField::CreatedAt => a.created_at.cmp(&b.created_at),
    };
    let ord = if sort.descending { ord.reverse() } else { ord };
    ord.then_with(|| a.id.cmp(&b.id))
}

/// Tally keys into `GroupCount`s ordered by key
fn tally<I: IntoIterator<Item = String>>(keys: I) -> Vec<GroupCount> {
    let mut counts: BTreeMap<String, i64> = BTreeMap::new();
    for key in keys {
        *counts.entry(key).or_default() += 1;
    }
    counts
        .into_iter()
        .map(|(id, count)| GroupCount { id, count })
        .collect()
}

#[async_trait]
impl LoanStore for MemoryStore {
    async fn get_by_id(&self, id: Uuid) -> AppResult<Option<BorrowedBook>> {
        Ok(self.loans.read().await.get(&id).cloned())
    }

    async fn list(
        &self,
        filter: &BorrowFilter,
        sort: BorrowSort,
        offset: i64,
        limit: i64,
    ) -> AppResult<(Vec<BorrowedBook>, i64)> {
        let search = filter.search.as_deref().map(pattern).transpose()?;
        let loans = self.loans.read().await;

        let mut matching: Vec<BorrowedBook> = loans
            .values()
            .filter(|r| filter.student_id.as_ref().map_or(true, |s| &r.student_id == s))
            .filter(|r| filter.status.map_or(true, |s| r.return_status == s))
            .filter(|r| match &search {
                None => true,
                Some(re) if filter.search_title_only => re.is_match(&r.book_title),
                Some(re) => {
                    re.is_match(&r.student_name)
                        || re.is_match(&r.student_id)
                        || re.is_match(&r.book_title)
                }
            })
            .cloned()
            .collect();
        matching.sort_by(|a, b| compare_loans(a, b, sort));

        let total = matching.len() as i64;
        let page = matching
            .into_iter()
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .collect();
        Ok((page, total))
    }

    async fn insert(&self, record: &BorrowedBook) -> AppResult<()> {
        self.loans.write().await.insert(record.id, record.clone());
        Ok(())
    }

    async fn save(&self, record: &BorrowedBook) -> AppResult<bool> {
        let mut loans = self.loans.write().await;
        match loans.get_mut(&record.id) {
            Some(stored) => {
                *stored = record.clone();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn refresh_overdue(
        &self,
        id: Uuid,
        expected_status: ReturnStatus,
        expected_fine: i64,
        fine: i64,
        now: DateTime<Utc>,
    ) -> AppResult<bool> {
        let mut loans = self.loans.write().await;
        match loans.get_mut(&id) {
            Some(r) if r.return_status == expected_status && r.fine_amount == expected_fine => {
                r.return_status = ReturnStatus::Overdue;
                r.fine_amount = fine;
                r.updated_at = now;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn find_unreturned_due(
        &self,
        from: Option<DateTime<Utc>>,
        until: DateTime<Utc>,
    ) -> AppResult<Vec<BorrowedBook>> {
        let loans = self.loans.read().await;
        let mut due: Vec<BorrowedBook> = loans
            .values()
            .filter(|r| !r.is_returned())
            .filter(|r| r.due_date < until && from.map_or(true, |f| r.due_date >= f))
            .cloned()
            .collect();
        due.sort_by_key(|r| r.due_date);
        Ok(due)
    }

    async fn delete(&self, id: Uuid) -> AppResult<bool> {
        Ok(self.loans.write().await.remove(&id).is_some())
    }

    async fn delete_many(&self, ids: &[Uuid]) -> AppResult<u64> {
        let mut loans = self.loans.write().await;
        Ok(ids.iter().filter(|id| loans.remove(id).is_some()).count() as u64)
    }

    async fn stats(&self, now: DateTime<Utc>) -> AppResult<CirculationStats> {
        let loans = self.loans.read().await;
        let mut stats = CirculationStats::default();
        for r in loans.values() {
            stats.total_records += 1;
            if r.is_returned() {
                stats.returned += 1;
            } else {
                stats.active += 1;
                if r.due_date < now {
                    stats.overdue += 1;
                }
            }
            if !r.is_fine_paid {
                stats.outstanding_fines += r.fine_amount;
            } else if r.payment_date.is_some() {
                stats.collected_fines += r.fine_amount;
            }
        }
        Ok(stats)
    }

    async fn activity(&self, history_days: i64) -> AppResult<LoanActivity> {
        let loans = self.loans.read().await;
        let borrowed = loans.values().filter(|r| !r.is_returned()).count() as i64;
        let overdue = loans
            .values()
            .filter(|r| r.return_status == ReturnStatus::Overdue)
            .count() as i64;
        let mut history = tally(
            loans
                .values()
                .map(|r| r.borrow_date.format("%Y-%m-%d").to_string()),
        );
        history.truncate(history_days.max(0) as usize);
        Ok(LoanActivity {
            borrowed,
            overdue,
            history,
        })
    }
}

#[async_trait]
impl CopyStore for MemoryStore {
    async fn get_by_id(&self, id: Uuid) -> AppResult<Option<BookCopy>> {
        Ok(self.copies.read().await.get(&id).cloned())
    }

    async fn find_by_title(&self, title: &str) -> AppResult<Option<BookCopy>> {
        let copies = self.copies.read().await;
        Ok(copies
            .values()
            .filter(|c| c.title == title)
            .min_by_key(|c| c.created_at)
            .cloned())
    }

    async fn list(&self, filter: &CopyFilter) -> AppResult<Vec<BookCopy>> {
        let search = filter.search.as_deref().map(pattern).transpose()?;
        let copies = self.copies.read().await;
        let mut found: Vec<BookCopy> = copies
            .values()
            .filter(|c| match &search {
                None => true,
                Some(re) => re.is_match(&c.title) || matches_opt(re, c.author.as_deref()),
            })
            .filter(|c| filter.genre.as_ref().map_or(true, |g| &c.genre == g))
            .cloned()
            .collect();
        found.sort_by(|a, b| {
            a.title
                .cmp(&b.title)
                .then_with(|| a.author.cmp(&b.author))
                .then_with(|| a.created_at.cmp(&b.created_at))
        });
        Ok(found)
    }

    async fn list_group(&self, title: &str, author: Option<&str>) -> AppResult<Vec<BookCopy>> {
        let copies = self.copies.read().await;
        let mut group: Vec<BookCopy> = copies
            .values()
            .filter(|c| c.title == title && c.author.as_deref() == author)
            .cloned()
            .collect();
        group.sort_by_key(|c| c.created_at);
        Ok(group)
    }

    async fn insert(&self, copy: &BookCopy) -> AppResult<()> {
        self.copies.write().await.insert(copy.id, copy.clone());
        Ok(())
    }

    async fn claim(
        &self,
        id: Uuid,
        borrower: &str,
        due_date: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> AppResult<Option<BookCopy>> {
        let mut copies = self.copies.write().await;
        match copies.get_mut(&id) {
            Some(c) if c.status == CopyStatus::Available => {
                c.status = CopyStatus::Borrowed;
                c.borrower = borrower.to_string();
                c.due_date = Some(due_date);
                c.updated_at = now;
                Ok(Some(c.clone()))
            }
            _ => Ok(None),
        }
    }

    async fn release(&self, id: Uuid, now: DateTime<Utc>) -> AppResult<bool> {
        let mut copies = self.copies.write().await;
        match copies.get_mut(&id) {
            Some(c) if c.status == CopyStatus::Borrowed => {
                c.status = CopyStatus::Available;
                c.borrower.clear();
                c.due_date = None;
                c.updated_at = now;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn delete(&self, id: Uuid) -> AppResult<bool> {
        Ok(self.copies.write().await.remove(&id).is_some())
    }

    async fn count_by_genre(&self) -> AppResult<Vec<GroupCount>> {
        let copies = self.copies.read().await;
        Ok(tally(copies.values().map(|c| c.genre.clone())))
    }
}

#[async_trait]
impl ReservationStore for MemoryStore {
    async fn get_by_id(&self, id: Uuid) -> AppResult<Option<Reservation>> {
        Ok(self.reservations.read().await.get(&id).cloned())
    }

    async fn insert(&self, reservation: &Reservation) -> AppResult<()> {
        let mut reservations = self.reservations.write().await;
        let duplicate = reservation.status == ReservationStatus::Active
            && reservations.values().any(|r| {
                r.status == ReservationStatus::Active
                    && r.book_id == reservation.book_id
                    && r.student_id == reservation.student_id
            });
        if duplicate {
            return Err(AppError::Conflict(
                "You already have an active reservation for this book.".to_string(),
            ));
        }
        reservations.insert(reservation.id, reservation.clone());
        Ok(())
    }

    async fn find_active(&self, book_id: Uuid, student_id: Uuid) -> AppResult<Option<Reservation>> {
        let reservations = self.reservations.read().await;
        Ok(reservations
            .values()
            .find(|r| {
                r.status == ReservationStatus::Active
                    && r.book_id == book_id
                    && r.student_id == student_id
            })
            .cloned())
    }

    async fn list(&self, filter: &ReservationQuery) -> AppResult<Vec<Reservation>> {
        let reservations = self.reservations.read().await;
        let mut found: Vec<Reservation> = reservations
            .values()
            .filter(|r| filter.student_id.map_or(true, |s| r.student_id == s))
            .filter(|r| filter.book_id.map_or(true, |b| r.book_id == b))
            .filter(|r| filter.status.map_or(true, |s| r.status == s))
            .cloned()
            .collect();
        found.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(found)
    }

    async fn oldest_active(&self, book_id: Uuid) -> AppResult<Option<Reservation>> {
        let reservations = self.reservations.read().await;
        Ok(reservations
            .values()
            .filter(|r| r.book_id == book_id && r.status == ReservationStatus::Active)
            .min_by_key(|r| r.reservation_date)
            .cloned())
    }

    async fn set_status(
        &self,
        id: Uuid,
        status: ReservationStatus,
        now: DateTime<Utc>,
    ) -> AppResult<Option<Reservation>> {
        let mut reservations = self.reservations.write().await;
        let Some(current) = reservations.get(&id).cloned() else {
            return Ok(None);
        };
        if status == ReservationStatus::Active && current.status != ReservationStatus::Active {
            let clash = reservations.values().any(|r| {
                r.id != id
                    && r.status == ReservationStatus::Active
                    && r.book_id == current.book_id
                    && r.student_id == current.student_id
            });
            if clash {
                return Err(AppError::Conflict(
                    "The student already has an active reservation for this book.".to_string(),
                ));
            }
        }
        let updated = reservations.get_mut(&id).map(|r| {
            r.status = status;
            r.updated_at = now;
            r.clone()
        });
        Ok(updated)
    }

    async fn transition(
        &self,
        id: Uuid,
        from: ReservationStatus,
        to: ReservationStatus,
        now: DateTime<Utc>,
    ) -> AppResult<bool> {
        let mut reservations = self.reservations.write().await;
        match reservations.get_mut(&id) {
            Some(r) if r.status == from => {
                r.status = to;
                r.updated_at = now;
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

#[async_trait]
impl StudentStore for MemoryStore {
    async fn get_by_id(&self, id: Uuid) -> AppResult<Option<Student>> {
        Ok(self.students.read().await.get(&id).cloned())
    }

    async fn find_by_roll_no(&self, roll_no: &str) -> AppResult<Option<Student>> {
        let students = self.students.read().await;
        Ok(students.values().find(|s| s.roll_no == roll_no).cloned())
    }

    async fn find_by_email(&self, email: &str) -> AppResult<Option<Student>> {
        let students = self.students.read().await;
        Ok(students
            .values()
            .find(|s| {
                s.email
                    .as_deref()
                    .map_or(false, |e| e.eq_ignore_ascii_case(email))
            })
            .cloned())
    }

    async fn list(&self, search: Option<&str>) -> AppResult<Vec<Student>> {
        let search = search.map(pattern).transpose()?;
        let students = self.students.read().await;
        let mut found: Vec<Student> = students
            .values()
            .filter(|s| match &search {
                None => true,
                Some(re) => {
                    re.is_match(&s.name)
                        || re.is_match(&s.roll_no)
                        || matches_opt(re, s.email.as_deref())
                }
            })
            .cloned()
            .collect();
        found.sort_by(|a, b| a.roll_no.cmp(&b.roll_no));
        Ok(found)
    }

    async fn insert(&self, student: &Student) -> AppResult<()> {
        let mut students = self.students.write().await;
        if students.values().any(|s| s.roll_no == student.roll_no) {
            return Err(AppError::Conflict(
                "A student with this roll number already exists".to_string(),
            ));
        }
        students.insert(student.id, student.clone());
        Ok(())
    }

    async fn save(&self, student: &Student) -> AppResult<bool> {
        let mut students = self.students.write().await;
        match students.get_mut(&student.id) {
            Some(stored) => {
                *stored = student.clone();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_by_roll_no(&self, roll_no: &str) -> AppResult<bool> {
        let mut students = self.students.write().await;
        let before = students.len();
        students.retain(|_, s| s.roll_no != roll_no);
        Ok(students.len() < before)
    }

    async fn count(&self) -> AppResult<i64> {
        Ok(self.students.read().await.len() as i64)
    }
}

#[async_trait]
impl SystemConfigStore for MemoryStore {
    async fn get(&self) -> AppResult<Option<SystemConfig>> {
        Ok(self.system_config.read().await.clone())
    }

    async fn upsert(&self, config: &SystemConfig) -> AppResult<()> {
        *self.system_config.write().await = Some(config.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::copy::CreateBookCopy;
    use chrono::Duration;

    fn copy(title: &str, now: DateTime<Utc>) -> BookCopy {
        CreateBookCopy {
            title: title.to_string(),
            author: Some("Frank Herbert".to_string()),
            genre: None,
            publisher: None,
            description: None,
            image_url: None,
            isbn: None,
            location: None,
            category: None,
            is_core: None,
        }
        .into_copy(now)
    }

    #[tokio::test]
    async fn test_claim_only_succeeds_once() {
        let store = MemoryStore::default();
        let now = Utc::now();
        let c = copy("Dune", now);
        CopyStore::insert(&store, &c).await.unwrap();

        let due = now + Duration::days(14);
        let first = store.claim(c.id, "a@college.edu", due, now).await.unwrap();
        let second = store.claim(c.id, "b@college.edu", due, now).await.unwrap();
        assert_eq!(first.unwrap().borrower, "a@college.edu");
        assert!(second.is_none());

        assert!(store.release(c.id, now).await.unwrap());
        assert!(!store.release(c.id, now).await.unwrap());
        let back = CopyStore::get_by_id(&store, c.id).await.unwrap().unwrap();
        assert_eq!(back.status, CopyStatus::Available);
        assert_eq!(back.borrower, "");
    }

    #[tokio::test]
    async fn test_loan_search_is_case_insensitive_and_paged() {
        let store = MemoryStore::default();
        let now = Utc::now();
        for (i, title) in ["Dune", "Dune Messiah", "Emma"].iter().enumerate() {
            let record = BorrowedBook::new(
                "Asha".into(),
                "CS-042".into(),
                None,
                title.to_string(),
                now,
                now + Duration::days(i as i64),
                now,
            );
            LoanStore::insert(&store, &record).await.unwrap();
        }

        let filter = BorrowFilter {
            search: Some("dUnE".into()),
            ..Default::default()
        };
        let (page, total) = LoanStore::list(&store, &filter, BorrowSort::default(), 0, 1)
            .await
            .unwrap();
        assert_eq!(total, 2);
        assert_eq!(page.len(), 1);
        assert_eq!(page[0].book_title, "Dune");

        let bad = BorrowFilter {
            search: Some("(".into()),
            ..Default::default()
        };
        assert!(matches!(
            LoanStore::list(&store, &bad, BorrowSort::default(), 0, 10).await,
            Err(AppError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_refresh_overdue_is_conditional() {
        let store = MemoryStore::default();
        let now = Utc::now();
        let record = BorrowedBook::new(
            "Asha".into(),
            "CS-042".into(),
            None,
            "Dune".into(),
            now - Duration::days(20),
            now - Duration::days(6),
            now,
        );
        LoanStore::insert(&store, &record).await.unwrap();

        assert!(store
            .refresh_overdue(record.id, ReturnStatus::NotReturned, 0, 13, now)
            .await
            .unwrap());
        // A second writer with the stale snapshot loses
        assert!(!store
            .refresh_overdue(record.id, ReturnStatus::NotReturned, 0, 13, now)
            .await
            .unwrap());

        let stored = LoanStore::get_by_id(&store, record.id).await.unwrap().unwrap();
        assert_eq!(stored.return_status, ReturnStatus::Overdue);
        assert_eq!(stored.fine_amount, 13);
    }

    #[tokio::test]
    async fn test_duplicate_active_reservation_conflicts() {
        let store = MemoryStore::default();
        let now = Utc::now();
        let book = Uuid::new_v4();
        let student = Uuid::new_v4();

        let first = Reservation::new(book, student, None, now);
        ReservationStore::insert(&store, &first).await.unwrap();
        let again = Reservation::new(book, student, None, now);
        assert!(matches!(
            ReservationStore::insert(&store, &again).await,
            Err(AppError::Conflict(_))
        ));

        store
            .set_status(first.id, ReservationStatus::Cancelled, now)
            .await
            .unwrap();
        ReservationStore::insert(&store, &again).await.unwrap();
    }
}
