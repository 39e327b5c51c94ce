//! Book copies repository for database operations

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Pool, Postgres};
use uuid::Uuid;

use super::CopyStore;
use crate::{
    error::AppResult,
    models::{
        analytics::GroupCount,
        copy::{BookCopy, BookCopyRow, CopyFilter},
    },
};

#[derive(Clone)]
pub struct CopiesRepository {
    pool: Pool<Postgres>,
}

impl CopiesRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CopyStore for CopiesRepository {
    async fn get_by_id(&self, id: Uuid) -> AppResult<Option<BookCopy>> {
        let row = sqlx::query_as::<_, BookCopyRow>("SELECT * FROM book_copies WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Into::into))
    }

    async fn find_by_title(&self, title: &str) -> AppResult<Option<BookCopy>> {
        let row = sqlx::query_as::<_, BookCopyRow>(
            "SELECT * FROM book_copies WHERE title = $1 ORDER BY created_at LIMIT 1",
        )
        .bind(title)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Into::into))
    }

    async fn list(&self, filter: &CopyFilter) -> AppResult<Vec<BookCopy>> {
        let rows = sqlx::query_as::<_, BookCopyRow>(
            r#"
            SELECT * FROM book_copies
            WHERE ($1::text IS NULL OR title ~* $1 OR author ~* $1)
              AND ($2::text IS NULL OR genre = $2)
            ORDER BY title, author, created_at
            "#,
        )
        .bind(&filter.search)
        .bind(&filter.genre)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn list_group(&self, title: &str, author: Option<&str>) -> AppResult<Vec<BookCopy>> {
        let rows = sqlx::query_as::<_, BookCopyRow>(
            r#"
            SELECT * FROM book_copies
            WHERE title = $1 AND author IS NOT DISTINCT FROM $2
            ORDER BY created_at
            "#,
        )
        .bind(title)
        .bind(author)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn insert(&self, copy: &BookCopy) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO book_copies (
                id, title, author, genre, publisher, description, image_url, isbn,
                location, category, is_core, status, borrower, due_date, created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)
            "#,
        )
        .bind(copy.id)
        .bind(&copy.title)
        .bind(&copy.author)
        .bind(&copy.genre)
        .bind(&copy.publisher)
        .bind(&copy.description)
        .bind(&copy.image_url)
        .bind(&copy.isbn)
        .bind(&copy.location)
        .bind(&copy.category)
        .bind(copy.is_core)
        .bind(copy.status.as_str())
        .bind(&copy.borrower)
        .bind(copy.due_date)
        .bind(copy.created_at)
        .bind(copy.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn claim(
        &self,
        id: Uuid,
        borrower: &str,
        due_date: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> AppResult<Option<BookCopy>> {
        // The status precondition lets only one concurrent borrow win
        let row = sqlx::query_as::<_, BookCopyRow>(
            r#"
            UPDATE book_copies
            SET status = 'Borrowed', borrower = $2, due_date = $3, updated_at = $4
            WHERE id = $1 AND status = 'Available'
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(borrower)
        .bind(due_date)
        .bind(now)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Into::into))
    }

    async fn release(&self, id: Uuid, now: DateTime<Utc>) -> AppResult<bool> {
        let rows = sqlx::query(
            r#"
            UPDATE book_copies
            SET status = 'Available', borrower = '', due_date = NULL, updated_at = $2
            WHERE id = $1 AND status = 'Borrowed'
            "#,
        )
        .bind(id)
        .bind(now)
        .execute(&self.pool)
        .await?
        .rows_affected();
        Ok(rows > 0)
    }

    async fn delete(&self, id: Uuid) -> AppResult<bool> {
        let rows = sqlx::query("DELETE FROM book_copies WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?
            .rows_affected();
        Ok(rows > 0)
    }

    async fn count_by_genre(&self) -> AppResult<Vec<GroupCount>> {
        let counts = sqlx::query_as::<_, GroupCount>(
            "SELECT genre AS id, COUNT(*) AS count FROM book_copies GROUP BY genre ORDER BY genre",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(counts)
    }
}
