//! System configuration repository

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{types::Json, Pool, Postgres, Row};

use super::SystemConfigStore;
use crate::{
    error::AppResult,
    models::system_config::{ExamPeriod, SystemConfig, MAIN_CONFIG_KEY},
};

#[derive(Clone)]
pub struct SystemConfigRepository {
    pool: Pool<Postgres>,
}

impl SystemConfigRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SystemConfigStore for SystemConfigRepository {
    async fn get(&self) -> AppResult<Option<SystemConfig>> {
        let row = sqlx::query("SELECT key, exam_periods, updated_at FROM system_config WHERE key = $1")
            .bind(MAIN_CONFIG_KEY)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(|row| {
            let Json(exam_periods): Json<Vec<ExamPeriod>> = row.get("exam_periods");
            SystemConfig {
                key: row.get("key"),
                exam_periods,
                updated_at: row.get::<Option<DateTime<Utc>>, _>("updated_at"),
            }
        }))
    }

    async fn upsert(&self, config: &SystemConfig) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO system_config (key, exam_periods, updated_at)
            VALUES ($1, $2, $3)
            ON CONFLICT (key) DO UPDATE
            SET exam_periods = EXCLUDED.exam_periods, updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(&config.key)
        .bind(Json(&config.exam_periods))
        .bind(config.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
