//! Library-wide configuration document

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Key of the singleton configuration document
pub const MAIN_CONFIG_KEY: &str = "main_config";

/// Inclusive date range during which loans must not fall due
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ExamPeriod {
    pub name: Option<String>,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
}

impl ExamPeriod {
    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        at >= self.start_date && at <= self.end_date
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SystemConfig {
    pub key: String,
    pub exam_periods: Vec<ExamPeriod>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            key: MAIN_CONFIG_KEY.to_string(),
            exam_periods: Vec::new(),
            updated_at: None,
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateExamPeriods {
    pub exam_periods: Vec<ExamPeriod>,
}
