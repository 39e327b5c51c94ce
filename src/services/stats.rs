//! Circulation statistics

use std::sync::Arc;

use crate::{
    clock::Clock,
    error::AppResult,
    models::{
        analytics::{AnalyticsResponse, AnalyticsSummary},
        loan::CirculationStats,
    },
    repository::Repository,
};

const BORROW_HISTORY_DAYS: i64 = 30;

#[derive(Clone)]
pub struct StatsService {
    repository: Repository,
    clock: Arc<dyn Clock>,
}

impl StatsService {
    pub fn new(repository: Repository, clock: Arc<dyn Clock>) -> Self {
        Self { repository, clock }
    }

    /// Totals over every borrow record; overdue is judged against the clock,
    /// not the stored status
    pub async fn circulation(&self) -> AppResult<CirculationStats> {
        self.repository.loans.stats(self.clock.now()).await
    }

    /// Library-wide dashboard: collection size, borrowers, genres and
    /// borrowing activity per day
    pub async fn dashboard(&self) -> AppResult<AnalyticsResponse> {
        let genre_stats = self.repository.copies.count_by_genre().await?;
        let total_students = self.repository.students.count().await?;
        let activity = self.repository.loans.activity(BORROW_HISTORY_DAYS).await?;

        Ok(AnalyticsResponse {
            summary: AnalyticsSummary {
                total_books: genre_stats.iter().map(|g| g.count).sum(),
                total_students,
                total_borrowed: activity.borrowed,
                total_overdue: activity.overdue,
            },
            genre_stats,
            borrow_history: activity.history,
        })
    }
}
