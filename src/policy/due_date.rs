//! Due-date computation for new loans

use chrono::{DateTime, Duration, Utc};

use crate::{config::CirculationConfig, models::system_config::ExamPeriod};

/// Which rules a caller wants applied
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DueDateMode {
    /// Base loan duration only
    Flat,
    /// Year-of-study, category and exam-period rules
    Full,
}

/// What the policy needs to know about the borrower
#[derive(Debug, Clone, Copy, Default)]
pub struct BorrowerProfile {
    pub year_of_study: Option<i32>,
}

/// What the policy needs to know about the borrowed resource
#[derive(Debug, Clone, Copy, Default)]
pub struct ResourceProfile<'a> {
    pub category: Option<&'a str>,
    pub is_core: bool,
}

#[derive(Debug, Clone)]
pub struct DueDatePolicy {
    base_days: i64,
    extended_days: i64,
    final_year: i32,
    extended_categories: Vec<String>,
}

impl DueDatePolicy {
    pub fn new(config: &CirculationConfig) -> Self {
        Self {
            base_days: config.base_loan_days,
            extended_days: config.extended_loan_days,
            final_year: config.final_study_year,
            extended_categories: config.extended_categories.clone(),
        }
    }

    pub fn base_days(&self) -> i64 {
        self.base_days
    }

    /// Loan length in days for this borrower/resource pair
    pub fn loan_days(&self, borrower: BorrowerProfile, resource: ResourceProfile<'_>) -> i64 {
        let final_year = borrower.year_of_study == Some(self.final_year);
        let extended_resource = resource.is_core
            || resource
                .category
                .map(|c| self.extended_categories.iter().any(|e| e == c))
                .unwrap_or(false);

        if final_year && extended_resource {
            self.extended_days
        } else {
            self.base_days
        }
    }

    /// Compute the due date of a loan starting at `borrow_date`.
    ///
    /// In full mode a tentative date landing inside an exam period (bounds
    /// inclusive) moves to the day after that period ends. Only the first
    /// matching period is applied; the shifted date is not checked again.
    pub fn due_date(
        &self,
        mode: DueDateMode,
        borrow_date: DateTime<Utc>,
        borrower: BorrowerProfile,
        resource: ResourceProfile<'_>,
        exam_periods: &[ExamPeriod],
    ) -> DateTime<Utc> {
        if mode == DueDateMode::Flat {
            return borrow_date + Duration::days(self.base_days);
        }

        let tentative = borrow_date + Duration::days(self.loan_days(borrower, resource));

        exam_periods
            .iter()
            .find(|period| period.contains(tentative))
            .map(|period| period.end_date + Duration::days(1))
            .unwrap_or(tentative)
    }
}
