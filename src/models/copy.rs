//! Book copy (physical, circulatable unit) model and related types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

/// Copy availability
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum CopyStatus {
    Available,
    Borrowed,
}

impl CopyStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CopyStatus::Available => "Available",
            CopyStatus::Borrowed => "Borrowed",
        }
    }
}

impl std::str::FromStr for CopyStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Available" => Ok(CopyStatus::Available),
            "Borrowed" => Ok(CopyStatus::Borrowed),
            _ => Err(format!("Invalid copy status: {}", s)),
        }
    }
}

/// Internal row structure for database queries
#[derive(Debug, Clone, FromRow)]
pub struct BookCopyRow {
    id: Uuid,
    title: String,
    author: Option<String>,
    genre: String,
    publisher: Option<String>,
    description: Option<String>,
    image_url: Option<String>,
    isbn: Option<String>,
    location: Option<String>,
    category: Option<String>,
    is_core: bool,
    status: String,
    borrower: String,
    due_date: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<BookCopyRow> for BookCopy {
    fn from(row: BookCopyRow) -> Self {
        BookCopy {
            id: row.id,
            title: row.title,
            author: row.author,
            genre: row.genre,
            publisher: row.publisher,
            description: row.description,
            image_url: row.image_url,
            isbn: row.isbn,
            location: row.location,
            category: row.category,
            is_core: row.is_core,
            status: row.status.parse().unwrap_or(CopyStatus::Available),
            borrower: row.borrower,
            due_date: row.due_date,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// One physical copy. Copies sharing title and author form a "book".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BookCopy {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub title: String,
    pub author: Option<String>,
    pub genre: String,
    pub publisher: Option<String>,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub isbn: Option<String>,
    pub location: Option<String>,
    /// e.g. `Reference`, `Technical`
    pub category: Option<String>,
    /// Core resources carry the higher fine rate
    pub is_core: bool,
    pub status: CopyStatus,
    /// Email of the current borrower, empty when on the shelf
    pub borrower: String,
    pub due_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Create copy request
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateBookCopy {
    #[validate(length(min = 1, message = "Title is required"))]
    pub title: String,
    pub author: Option<String>,
    pub genre: Option<String>,
    pub publisher: Option<String>,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub isbn: Option<String>,
    pub location: Option<String>,
    pub category: Option<String>,
    pub is_core: Option<bool>,
}

impl CreateBookCopy {
    pub fn into_copy(self, now: DateTime<Utc>) -> BookCopy {
        BookCopy {
            id: Uuid::new_v4(),
            title: self.title.trim().to_string(),
            author: self.author,
            genre: self
                .genre
                .filter(|g| !g.trim().is_empty())
                .unwrap_or_else(|| "Uncategorized".to_string()),
            publisher: self.publisher,
            description: self.description,
            image_url: self.image_url,
            isbn: self.isbn,
            location: self.location,
            category: self.category,
            is_core: self.is_core.unwrap_or(false),
            status: CopyStatus::Available,
            borrower: String::new(),
            due_date: None,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Catalog view: copies grouped by title and author
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct GroupedBook {
    pub title: String,
    pub author: Option<String>,
    pub genre: String,
    pub category: Option<String>,
    pub location: Option<String>,
    pub isbn: Option<String>,
    pub is_core: bool,
    pub total_copies: i64,
    pub available_copies: i64,
    pub derived_status: CopyStatus,
    pub copy_ids: Vec<Uuid>,
}

/// Query parameters for the grouped catalog
#[derive(Debug, Default, Deserialize, IntoParams, ToSchema)]
pub struct CatalogQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    /// Case-insensitive pattern over title and author
    pub search: Option<String>,
    /// `All` or a genre name
    pub genre: Option<String>,
    /// `All`, `Available` or `Borrowed` (derived from copy counts)
    pub status: Option<String>,
    /// `title_asc` (default) or `title_desc`
    pub sort: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CatalogResponse {
    pub books: Vec<GroupedBook>,
    pub total_pages: i64,
    pub current_page: i64,
    pub total_books: i64,
}

/// Borrow response
#[derive(Debug, Serialize, ToSchema)]
pub struct BorrowResponse {
    pub message: String,
    pub book: BookCopy,
}

/// Store-level filter for copies
#[derive(Debug, Clone, Default)]
pub struct CopyFilter {
    pub search: Option<String>,
    pub genre: Option<String>,
}
