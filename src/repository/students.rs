//! Students repository for database operations

use async_trait::async_trait;
use sqlx::{Pool, Postgres};
use uuid::Uuid;

use super::{map_unique_violation, StudentStore};
use crate::{error::AppResult, models::student::Student};

#[derive(Clone)]
pub struct StudentsRepository {
    pool: Pool<Postgres>,
}

impl StudentsRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl StudentStore for StudentsRepository {
    async fn get_by_id(&self, id: Uuid) -> AppResult<Option<Student>> {
        let student = sqlx::query_as::<_, Student>("SELECT * FROM students WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(student)
    }

    async fn find_by_roll_no(&self, roll_no: &str) -> AppResult<Option<Student>> {
        let student = sqlx::query_as::<_, Student>("SELECT * FROM students WHERE roll_no = $1")
            .bind(roll_no)
            .fetch_optional(&self.pool)
            .await?;
        Ok(student)
    }

    async fn find_by_email(&self, email: &str) -> AppResult<Option<Student>> {
        let student = sqlx::query_as::<_, Student>(
            "SELECT * FROM students WHERE LOWER(email) = LOWER($1) LIMIT 1",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        Ok(student)
    }

    async fn list(&self, search: Option<&str>) -> AppResult<Vec<Student>> {
        let students = sqlx::query_as::<_, Student>(
            r#"
            SELECT * FROM students
            WHERE ($1::text IS NULL OR name ~* $1 OR roll_no ~* $1 OR email ~* $1)
            ORDER BY roll_no
            "#,
        )
        .bind(search)
        .fetch_all(&self.pool)
        .await?;
        Ok(students)
    }

    async fn insert(&self, student: &Student) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO students (id, name, roll_no, email, year_of_study, department, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(student.id)
        .bind(&student.name)
        .bind(&student.roll_no)
        .bind(&student.email)
        .bind(student.year_of_study)
        .bind(&student.department)
        .bind(student.created_at)
        .bind(student.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| map_unique_violation(e, "A student with this roll number already exists"))?;
        Ok(())
    }

    async fn save(&self, student: &Student) -> AppResult<bool> {
        let rows = sqlx::query(
            r#"
            UPDATE students
            SET name = $2, email = $3, year_of_study = $4, department = $5, updated_at = $6
            WHERE id = $1
            "#,
        )
        .bind(student.id)
        .bind(&student.name)
        .bind(&student.email)
        .bind(student.year_of_study)
        .bind(&student.department)
        .bind(student.updated_at)
        .execute(&self.pool)
        .await?
        .rows_affected();
        Ok(rows > 0)
    }

    async fn delete_by_roll_no(&self, roll_no: &str) -> AppResult<bool> {
        let rows = sqlx::query("DELETE FROM students WHERE roll_no = $1")
            .bind(roll_no)
            .execute(&self.pool)
            .await?
            .rows_affected();
        Ok(rows > 0)
    }

    async fn count(&self) -> AppResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM students")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}
