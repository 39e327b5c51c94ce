//! Student model and related types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

/// Registered borrower
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Student {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub name: String,
    pub roll_no: String,
    pub email: Option<String>,
    /// 1-based year of study
    pub year_of_study: Option<i32>,
    pub department: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateStudent {
    #[validate(length(min = 1, message = "Name is required"))]
    pub name: String,
    #[validate(length(min = 1, message = "Roll number is required"))]
    pub roll_no: String,
    #[validate(email(message = "Invalid email format"))]
    pub email: Option<String>,
    #[validate(range(min = 1, max = 6, message = "Year of study must be between 1 and 6"))]
    pub year_of_study: Option<i32>,
    pub department: Option<String>,
}

impl CreateStudent {
    pub fn into_student(self, now: DateTime<Utc>) -> Student {
        Student {
            id: Uuid::new_v4(),
            name: self.name.trim().to_string(),
            roll_no: self.roll_no.trim().to_string(),
            email: self.email.map(|e| e.trim().to_lowercase()),
            year_of_study: self.year_of_study,
            department: self.department,
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateStudent {
    #[validate(length(min = 1, message = "Name cannot be empty"))]
    pub name: Option<String>,
    #[validate(email(message = "Invalid email format"))]
    pub email: Option<String>,
    #[validate(range(min = 1, max = 6, message = "Year of study must be between 1 and 6"))]
    pub year_of_study: Option<i32>,
    pub department: Option<String>,
}

impl UpdateStudent {
    pub fn apply_to(self, student: &mut Student, now: DateTime<Utc>) {
        if let Some(name) = self.name {
            student.name = name.trim().to_string();
        }
        if let Some(email) = self.email {
            student.email = Some(email.trim().to_lowercase());
        }
        if let Some(year) = self.year_of_study {
            student.year_of_study = Some(year);
        }
        if let Some(department) = self.department {
            student.department = Some(department);
        }
        student.updated_at = now;
    }
}

#[derive(Debug, Default, Deserialize, IntoParams, ToSchema)]
pub struct StudentQuery {
    /// Case-insensitive pattern over name, roll number and email
    pub search: Option<String>,
}
