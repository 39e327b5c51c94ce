//! Borrow records repository for database operations

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Pool, Postgres, Row};
use uuid::Uuid;

use super::LoanStore;
use crate::{
    error::AppResult,
    models::{
        analytics::{GroupCount, LoanActivity},
        loan::{
            BorrowFilter, BorrowSort, BorrowedBook, BorrowedBookRow, CirculationStats, ReturnStatus,
        },
    },
};

#[derive(Clone)]
pub struct LoansRepository {
    pool: Pool<Postgres>,
}

impl LoansRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

/// Build the WHERE clause for a filter; placeholders are numbered from 1
fn where_clause(filter: &BorrowFilter) -> String {
    let mut conditions = Vec::new();
    let mut idx = 1;

    if filter.student_id.is_some() {
        conditions.push(format!("student_id = ${}", idx));
        idx += 1;
    }
    if filter.status.is_some() {
        conditions.push(format!("return_status = ${}", idx));
        idx += 1;
    }
    if filter.search.is_some() {
        if filter.search_title_only {
            conditions.push(format!("book_title ~* ${}", idx));
        } else {
            conditions.push(format!(
                "(student_name ~* ${0} OR student_id ~* ${0} OR book_title ~* ${0})",
                idx
            ));
        }
    }

    if conditions.is_empty() {
        String::new()
    } else {
        format!("WHERE {}", conditions.join(" AND "))
    }
}

#[async_trait]
impl LoanStore for LoansRepository {
    async fn get_by_id(&self, id: Uuid) -> AppResult<Option<BorrowedBook>> {
        let row = sqlx::query_as::<_, BorrowedBookRow>("SELECT * FROM borrowed_books WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Into::into))
    }

    async fn list(
        &self,
        filter: &BorrowFilter,
        sort: BorrowSort,
        offset: i64,
        limit: i64,
    ) -> AppResult<(Vec<BorrowedBook>, i64)> {
        let where_clause = where_clause(filter);
        let status = filter.status.map(|s| s.as_str());

        // Count total
        let count_q = format!("SELECT COUNT(*) FROM borrowed_books {}", where_clause);
        let mut count_builder = sqlx::query_scalar::<_, i64>(&count_q);
        if let Some(ref student_id) = filter.student_id {
            count_builder = count_builder.bind(student_id);
        }
        if let Some(status) = status {
            count_builder = count_builder.bind(status);
        }
        if let Some(ref search) = filter.search {
            count_builder = count_builder.bind(search);
        }
        let total = count_builder.fetch_one(&self.pool).await?;

        // Fetch rows
        let select_q = format!(
            "SELECT * FROM borrowed_books {} ORDER BY {} {}, id LIMIT {} OFFSET {}",
            where_clause,
            sort.field.column(),
            if sort.descending { "DESC" } else { "ASC" },
            limit,
            offset
        );
        let mut builder = sqlx::query_as::<_, BorrowedBookRow>(&select_q);
        if let Some(ref student_id) = filter.student_id {
            builder = builder.bind(student_id);
        }
        if let Some(status) = status {
            builder = builder.bind(status);
        }
        if let Some(ref search) = filter.search {
            builder = builder.bind(search);
        }

        let rows = builder.fetch_all(&self.pool).await?;
        Ok((rows.into_iter().map(Into::into).collect(), total))
    }

    async fn insert(&self, record: &BorrowedBook) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO borrowed_books (
                id, student_name, student_id, student_email, book_id, book_title,
                borrow_date, due_date, return_status, fine_amount, is_fine_paid,
                is_payment_enabled, payment_method, payment_date, created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)
            "#,
        )
        .bind(record.id)
        .bind(&record.student_name)
        .bind(&record.student_id)
        .bind(&record.student_email)
        .bind(record.book_id)
        .bind(&record.book_title)
        .bind(record.borrow_date)
        .bind(record.due_date)
        .bind(record.return_status.as_str())
        .bind(record.fine_amount)
        .bind(record.is_fine_paid)
        .bind(record.is_payment_enabled)
        .bind(record.payment_method.map(|m| m.as_str()))
        .bind(record.payment_date)
        .bind(record.created_at)
        .bind(record.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn save(&self, record: &BorrowedBook) -> AppResult<bool> {
        let rows = sqlx::query(
            r#"
            UPDATE borrowed_books SET
                student_name = $2, student_id = $3, student_email = $4, book_id = $5,
                book_title = $6, borrow_date = $7, due_date = $8, return_status = $9,
                fine_amount = $10, is_fine_paid = $11, is_payment_enabled = $12,
                payment_method = $13, payment_date = $14, updated_at = $15
            WHERE id = $1
            "#,
        )
        .bind(record.id)
        .bind(&record.student_name)
        .bind(&record.student_id)
        .bind(&record.student_email)
        .bind(record.book_id)
        .bind(&record.book_title)
        .bind(record.borrow_date)
        .bind(record.due_date)
        .bind(record.return_status.as_str())
        .bind(record.fine_amount)
        .bind(record.is_fine_paid)
        .bind(record.is_payment_enabled)
        .bind(record.payment_method.map(|m| m.as_str()))
        .bind(record.payment_date)
        .bind(record.updated_at)
        .execute(&self.pool)
        .await?
        .rows_affected();
        Ok(rows > 0)
    }

    async fn refresh_overdue(
        &self,
        id: Uuid,
        expected_status: ReturnStatus,
        expected_fine: i64,
        fine: i64,
        now: DateTime<Utc>,
    ) -> AppResult<bool> {
        let rows = sqlx::query(
            r#"
            UPDATE borrowed_books
            SET return_status = 'Overdue', fine_amount = $4, updated_at = $5
            WHERE id = $1 AND return_status = $2 AND fine_amount = $3
            "#,
        )
        .bind(id)
        .bind(expected_status.as_str())
        .bind(expected_fine)
        .bind(fine)
        .bind(now)
        .execute(&self.pool)
        .await?
        .rows_affected();
        Ok(rows > 0)
    }

    async fn find_unreturned_due(
        &self,
        from: Option<DateTime<Utc>>,
        until: DateTime<Utc>,
    ) -> AppResult<Vec<BorrowedBook>> {
        let rows = sqlx::query_as::<_, BorrowedBookRow>(
            r#"
            SELECT * FROM borrowed_books
            WHERE return_status <> 'Returned'
              AND due_date < $1
              AND ($2::timestamptz IS NULL OR due_date >= $2)
            ORDER BY due_date
            "#,
        )
        .bind(until)
        .bind(from)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn delete(&self, id: Uuid) -> AppResult<bool> {
        let rows = sqlx::query("DELETE FROM borrowed_books WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?
            .rows_affected();
        Ok(rows > 0)
    }

    async fn delete_many(&self, ids: &[Uuid]) -> AppResult<u64> {
        let rows = sqlx::query("DELETE FROM borrowed_books WHERE id = ANY($1)")
            .bind(ids)
            .execute(&self.pool)
            .await?
            .rows_affected();
        Ok(rows)
    }

    async fn stats(&self, now: DateTime<Utc>) -> AppResult<CirculationStats> {
        let row = sqlx::query(
            r#"
            SELECT
                COUNT(*) AS total_records,
                COUNT(*) FILTER (WHERE return_status <> 'Returned') AS active,
                COUNT(*) FILTER (WHERE return_status <> 'Returned' AND due_date < $1) AS overdue,
                COUNT(*) FILTER (WHERE return_status = 'Returned') AS returned,
                COALESCE(SUM(fine_amount) FILTER (WHERE NOT is_fine_paid), 0)::bigint AS outstanding_fines,
                COALESCE(SUM(fine_amount) FILTER (WHERE is_fine_paid AND payment_date IS NOT NULL), 0)::bigint AS collected_fines
            FROM borrowed_books
            "#,
        )
        .bind(now)
        .fetch_one(&self.pool)
        .await?;

        Ok(CirculationStats {
            total_records: row.get("total_records"),
            active: row.get("active"),
            overdue: row.get("overdue"),
            returned: row.get("returned"),
            outstanding_fines: row.get("outstanding_fines"),
            collected_fines: row.get("collected_fines"),
        })
    }

    async fn activity(&self, history_days: i64) -> AppResult<LoanActivity> {
        let row = sqlx::query(
            r#"
            SELECT
                COUNT(*) FILTER (WHERE return_status <> 'Returned') AS borrowed,
                COUNT(*) FILTER (WHERE return_status = 'Overdue') AS overdue
            FROM borrowed_books
            "#,
        )
        .fetch_one(&self.pool)
        .await?;

        let history = sqlx::query_as::<_, GroupCount>(
            r#"
            SELECT to_char(borrow_date AT TIME ZONE 'UTC', 'YYYY-MM-DD') AS id, COUNT(*) AS count
            FROM borrowed_books
            GROUP BY 1
            ORDER BY 1
            LIMIT $1
            "#,
        )
        .bind(history_days)
        .fetch_all(&self.pool)
        .await?;

        Ok(LoanActivity {
            borrowed: row.get("borrowed"),
            overdue: row.get("overdue"),
            history,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_where_clause_numbering() {
        assert_eq!(where_clause(&BorrowFilter::default()), "");

        let filter = BorrowFilter {
            student_id: Some("CS-1".into()),
            status: Some(ReturnStatus::Overdue),
            search: Some("dune".into()),
            search_title_only: true,
        };
        assert_eq!(
            where_clause(&filter),
            "WHERE student_id = $1 AND return_status = $2 AND book_title ~* $3"
        );

        let admin = BorrowFilter {
            search: Some("asha".into()),
            ..Default::default()
        };
        assert_eq!(
            where_clause(&admin),
            "WHERE (student_name ~* $1 OR student_id ~* $1 OR book_title ~* $1)"
        );
    }
}
