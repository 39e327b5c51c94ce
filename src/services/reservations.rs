//! Reservation queue service

use std::{collections::HashMap, sync::Arc};

use uuid::Uuid;

use super::students::StudentsService;
use crate::{
    clock::Clock,
    error::{AppError, AppResult},
    models::{
        reservation::{
            CreateReservation, Reservation, ReservationDetails, ReservationQuery,
            ReservationStatus, ReservedBook, ReservingStudent,
        },
        user::UserClaims,
    },
    repository::Repository,
};

fn reservation_not_found() -> AppError {
    AppError::NotFound("Reservation not found".to_string())
}

#[derive(Clone)]
pub struct ReservationsService {
    repository: Repository,
    students: StudentsService,
    clock: Arc<dyn Clock>,
}

impl ReservationsService {
    pub fn new(repository: Repository, students: StudentsService, clock: Arc<dyn Clock>) -> Self {
        Self {
            repository,
            students,
            clock,
        }
    }

    /// Place a reservation for the given student, or for the caller
    pub async fn reserve(&self, request: CreateReservation, claims: &UserClaims) -> AppResult<Reservation> {
        let student_id = match request.student_id {
            Some(id) => id,
            None => {
                self.students
                    .for_caller(claims)
                    .await?
                    .ok_or_else(|| {
                        AppError::NotFound("Student profile not found for this user.".to_string())
                    })?
                    .id
            }
        };

        self.repository
            .copies
            .get_by_id(request.book_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Book not found".to_string()))?;
        self.repository
            .students
            .get_by_id(student_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Student not found".to_string()))?;

        if self
            .repository
            .reservations
            .find_active(request.book_id, student_id)
            .await?
            .is_some()
        {
            return Err(AppError::Conflict(
                "You already have an active reservation for this book.".to_string(),
            ));
        }

        let reservation = Reservation::new(request.book_id, student_id, request.notes, self.clock.now());
        // The store re-checks, so a concurrent duplicate still fails
        self.repository.reservations.insert(&reservation).await?;

        tracing::info!(
            reservation_id = %reservation.id,
            book_id = %reservation.book_id,
            student_id = %reservation.student_id,
            "Reservation placed"
        );
        Ok(reservation)
    }

    /// Reservations with book and student resolved, newest first.
    /// Students only ever see their own.
    pub async fn list(&self, query: ReservationQuery, claims: &UserClaims) -> AppResult<Vec<ReservationDetails>> {
        let mut query = query;
        if !claims.is_admin() {
            match self.students.for_caller(claims).await? {
                Some(student) => query.student_id = Some(student.id),
                None => return Ok(Vec::new()),
            }
        }

        let reservations = self.repository.reservations.list(&query).await?;

        let mut books: HashMap<Uuid, Option<ReservedBook>> = HashMap::new();
        let mut students: HashMap<Uuid, Option<ReservingStudent>> = HashMap::new();
        let mut details = Vec::with_capacity(reservations.len());

        for r in reservations {
            if !books.contains_key(&r.book_id) {
                let book = self.repository.copies.get_by_id(r.book_id).await?.map(|c| ReservedBook {
                    id: c.id,
                    title: c.title,
                    author: c.author,
                });
                books.insert(r.book_id, book);
            }
            if !students.contains_key(&r.student_id) {
                let student = self
                    .repository
                    .students
                    .get_by_id(r.student_id)
                    .await?
                    .map(|s| ReservingStudent {
                        id: s.id,
                        name: s.name,
                        email: s.email,
                    });
                students.insert(r.student_id, student);
            }

            details.push(ReservationDetails {
                id: r.id,
                book_id: books.get(&r.book_id).cloned().flatten(),
                student_id: students.get(&r.student_id).cloned().flatten(),
                reservation_date: r.reservation_date,
                status: r.status,
                notes: r.notes,
                created_at: r.created_at,
                updated_at: r.updated_at,
            });
        }

        Ok(details)
    }

    /// Cancel a reservation; students may only cancel their own
    pub async fn cancel(&self, id: Uuid, claims: &UserClaims) -> AppResult<Reservation> {
        if !claims.is_admin() {
            let reservation = self
                .repository
                .reservations
                .get_by_id(id)
                .await?
                .ok_or_else(reservation_not_found)?;
            let caller = self.students.for_caller(claims).await?;
            if caller.map(|s| s.id) != Some(reservation.student_id) {
                return Err(AppError::Forbidden(
                    "You can only cancel your own reservations.".to_string(),
                ));
            }
        }

        let reservation = self
            .repository
            .reservations
            .set_status(id, ReservationStatus::Cancelled, self.clock.now())
            .await?
            .ok_or_else(reservation_not_found)?;
        tracing::info!(reservation_id = %id, "Reservation cancelled");
        Ok(reservation)
    }

    /// Direct status change by a librarian
    pub async fn set_status(&self, id: Uuid, status: ReservationStatus) -> AppResult<Reservation> {
        let reservation = self
            .repository
            .reservations
            .set_status(id, status, self.clock.now())
            .await?
            .ok_or_else(reservation_not_found)?;
        tracing::info!(reservation_id = %id, status = status.as_str(), "Reservation status changed");
        Ok(reservation)
    }
}
