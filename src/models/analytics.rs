//! Dashboard analytics

use serde::Serialize;
use sqlx::FromRow;
use utoipa::ToSchema;

/// Number of documents sharing one grouping key
#[derive(Debug, Clone, PartialEq, Eq, Serialize, FromRow, ToSchema)]
pub struct GroupCount {
    #[serde(rename = "_id")]
    pub id: String,
    pub count: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsSummary {
    pub total_books: i64,
    pub total_students: i64,
    /// Records not yet returned
    pub total_borrowed: i64,
    /// Records whose stored status is `Overdue`
    pub total_overdue: i64,
}

/// Loan figures for the dashboard
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoanActivity {
    pub borrowed: i64,
    pub overdue: i64,
    /// Borrows per `YYYY-MM-DD` (UTC), oldest day first
    pub history: Vec<GroupCount>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsResponse {
    pub summary: AnalyticsSummary,
    /// Copies per genre
    pub genre_stats: Vec<GroupCount>,
    pub borrow_history: Vec<GroupCount>,
}
