//! Reservation model and related types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, NoneAsEmptyString};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum ReservationStatus {
    Active,
    Fulfilled,
    Cancelled,
}

impl ReservationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReservationStatus::Active => "Active",
            ReservationStatus::Fulfilled => "Fulfilled",
            ReservationStatus::Cancelled => "Cancelled",
        }
    }
}

impl std::fmt::Display for ReservationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for ReservationStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Active" => Ok(ReservationStatus::Active),
            "Fulfilled" => Ok(ReservationStatus::Fulfilled),
            "Cancelled" => Ok(ReservationStatus::Cancelled),
            _ => Err(format!("Invalid reservation status: {}", s)),
        }
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct ReservationRow {
    id: Uuid,
    book_id: Uuid,
    student_id: Uuid,
    reservation_date: DateTime<Utc>,
    status: String,
    notes: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<ReservationRow> for Reservation {
    fn from(row: ReservationRow) -> Self {
        Reservation {
            id: row.id,
            book_id: row.book_id,
            student_id: row.student_id,
            reservation_date: row.reservation_date,
            status: row.status.parse().unwrap_or(ReservationStatus::Active),
            notes: row.notes,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// A student's claim on a title that is currently out
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Reservation {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub book_id: Uuid,
    pub student_id: Uuid,
    pub reservation_date: DateTime<Utc>,
    pub status: ReservationStatus,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Reservation {
    pub fn new(book_id: Uuid, student_id: Uuid, notes: Option<String>, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            book_id,
            student_id,
            reservation_date: now,
            status: ReservationStatus::Active,
            notes,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Book summary embedded in reservation listings
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ReservedBook {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub title: String,
    pub author: Option<String>,
}

/// Student summary embedded in reservation listings
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ReservingStudent {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub name: String,
    pub email: Option<String>,
}

/// Reservation with its book and student resolved; either side is `null`
/// when the referenced document no longer exists
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReservationDetails {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub book_id: Option<ReservedBook>,
    pub student_id: Option<ReservingStudent>,
    pub reservation_date: DateTime<Utc>,
    pub status: ReservationStatus,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateReservation {
    pub book_id: Uuid,
    /// Defaults to the caller's own student profile
    pub student_id: Option<Uuid>,
    pub notes: Option<String>,
}

#[serde_as]
#[derive(Debug, Default, Deserialize, IntoParams, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReservationQuery {
    #[serde_as(as = "NoneAsEmptyString")]
    pub student_id: Option<Uuid>,
    #[serde_as(as = "NoneAsEmptyString")]
    pub book_id: Option<Uuid>,
    #[serde_as(as = "NoneAsEmptyString")]
    pub status: Option<ReservationStatus>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateReservationStatus {
    pub status: ReservationStatus,
}
