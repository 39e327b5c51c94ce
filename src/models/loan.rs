//! Borrow record model and related types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, NoneAsEmptyString};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

/// Return status of a borrow record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum ReturnStatus {
    #[serde(rename = "Not Returned")]
    NotReturned,
    Overdue,
    Returned,
}

impl ReturnStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReturnStatus::NotReturned => "Not Returned",
            ReturnStatus::Overdue => "Overdue",
            ReturnStatus::Returned => "Returned",
        }
    }
}

impl std::fmt::Display for ReturnStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for ReturnStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Not Returned" => Ok(ReturnStatus::NotReturned),
            "Overdue" => Ok(ReturnStatus::Overdue),
            "Returned" => Ok(ReturnStatus::Returned),
            _ => Err(format!("Invalid return status: {}", s)),
        }
    }
}

/// How a fine was settled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum PaymentMethod {
    Cash,
    #[serde(rename = "UPI")]
    Upi,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Cash => "Cash",
            PaymentMethod::Upi => "UPI",
        }
    }
}

impl std::str::FromStr for PaymentMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Cash" => Ok(PaymentMethod::Cash),
            "UPI" => Ok(PaymentMethod::Upi),
            _ => Err(format!("Invalid payment method: {}", s)),
        }
    }
}

/// Internal row structure for database queries (with String enums)
#[derive(Debug, Clone, FromRow)]
pub struct BorrowedBookRow {
    id: Uuid,
    student_name: String,
    student_id: String,
    student_email: Option<String>,
    book_id: Option<Uuid>,
    book_title: String,
    borrow_date: DateTime<Utc>,
    due_date: DateTime<Utc>,
    return_status: String,
    fine_amount: i64,
    is_fine_paid: bool,
    is_payment_enabled: bool,
    payment_method: Option<String>,
    payment_date: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<BorrowedBookRow> for BorrowedBook {
    fn from(row: BorrowedBookRow) -> Self {
        BorrowedBook {
            id: row.id,
            student_name: row.student_name,
            student_id: row.student_id,
            student_email: row.student_email,
            book_id: row.book_id,
            book_title: row.book_title,
            borrow_date: row.borrow_date,
            due_date: row.due_date,
            return_status: row.return_status.parse().unwrap_or(ReturnStatus::NotReturned),
            fine_amount: row.fine_amount,
            is_fine_paid: row.is_fine_paid,
            is_payment_enabled: row.is_payment_enabled,
            payment_method: row.payment_method.and_then(|m| m.parse().ok()),
            payment_date: row.payment_date,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// One checkout of one physical copy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BorrowedBook {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub student_name: String,
    /// Roll number, or an opaque student id
    pub student_id: String,
    pub student_email: Option<String>,
    /// Physical copy this record checks out
    pub book_id: Option<Uuid>,
    pub book_title: String,
    pub borrow_date: DateTime<Utc>,
    pub due_date: DateTime<Utc>,
    pub return_status: ReturnStatus,
    pub fine_amount: i64,
    /// `true` also encodes "no fine owed"
    pub is_fine_paid: bool,
    /// Librarian gate for self-service payment
    pub is_payment_enabled: bool,
    pub payment_method: Option<PaymentMethod>,
    pub payment_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl BorrowedBook {
    /// A fresh, unreturned record with no fine
    pub fn new(
        student_name: String,
        student_id: String,
        book_id: Option<Uuid>,
        book_title: String,
        borrow_date: DateTime<Utc>,
        due_date: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            student_name,
            student_id,
            student_email: None,
            book_id,
            book_title,
            borrow_date,
            due_date,
            return_status: ReturnStatus::NotReturned,
            fine_amount: 0,
            is_fine_paid: true,
            is_payment_enabled: false,
            payment_method: None,
            payment_date: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_returned(&self) -> bool {
        self.return_status == ReturnStatus::Returned
    }
}

/// Administrative creation of a borrow record
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateBorrowRecord {
    /// Student id or roll number
    pub student_id: String,
    pub student_name: Option<String>,
    /// Copy id; the title is used when absent or unknown
    pub book_id: Option<Uuid>,
    pub book_title: Option<String>,
    pub borrow_date: Option<DateTime<Utc>>,
    /// Only used when the student or book cannot be resolved
    pub due_date: Option<DateTime<Utc>>,
}

/// Partial update of a borrow record
#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateBorrowRecord {
    pub student_name: Option<String>,
    pub student_id: Option<String>,
    pub book_title: Option<String>,
    pub borrow_date: Option<DateTime<Utc>>,
    pub due_date: Option<DateTime<Utc>>,
    pub return_status: Option<ReturnStatus>,
    #[validate(range(min = 0, message = "Fine amount cannot be negative"))]
    pub fine_amount: Option<i64>,
    pub is_fine_paid: Option<bool>,
    pub is_payment_enabled: Option<bool>,
    pub payment_method: Option<PaymentMethod>,
    pub payment_date: Option<DateTime<Utc>>,
}

impl UpdateBorrowRecord {
    pub fn apply_to(self, record: &mut BorrowedBook) {
        if let Some(v) = self.student_name {
            record.student_name = v;
        }
        if let Some(v) = self.student_id {
            record.student_id = v;
        }
        if let Some(v) = self.book_title {
            record.book_title = v;
        }
        if let Some(v) = self.borrow_date {
            record.borrow_date = v;
        }
        if let Some(v) = self.due_date {
            record.due_date = v;
        }
        if let Some(v) = self.return_status {
            record.return_status = v;
        }
        if let Some(v) = self.fine_amount {
            record.fine_amount = v;
        }
        if let Some(v) = self.is_fine_paid {
            record.is_fine_paid = v;
        }
        if let Some(v) = self.is_payment_enabled {
            record.is_payment_enabled = v;
        }
        if let Some(v) = self.payment_method {
            record.payment_method = Some(v);
        }
        if let Some(v) = self.payment_date {
            record.payment_date = Some(v);
        }
    }
}

/// Query parameters for listing borrow records
///
/// Empty values (`status=&search=`) count as absent.
#[serde_as]
#[derive(Debug, Default, Deserialize, IntoParams, ToSchema)]
pub struct BorrowQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    #[serde_as(as = "NoneAsEmptyString")]
    pub status: Option<ReturnStatus>,
    /// Case-insensitive pattern over student name, student id and title
    #[serde_as(as = "NoneAsEmptyString")]
    pub search: Option<String>,
    /// `field:asc` or `field:desc`
    #[serde_as(as = "NoneAsEmptyString")]
    pub sort: Option<String>,
}

/// Paginated list of borrow records
#[derive(Debug, Serialize, ToSchema)]
pub struct BorrowListResponse {
    pub total: i64,
    pub page: i64,
    pub limit: i64,
    pub records: Vec<BorrowedBook>,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PayFineRequest {
    pub payment_method: Option<PaymentMethod>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct BulkDeleteRequest {
    pub ids: Vec<Uuid>,
}

/// Circulation totals for the analytics dashboard
#[derive(Debug, Clone, Default, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CirculationStats {
    pub total_records: i64,
    /// Not yet returned
    pub active: i64,
    /// Not yet returned and past due
    pub overdue: i64,
    pub returned: i64,
    /// Fines assessed but not paid
    pub outstanding_fines: i64,
    /// Fines settled through a recorded payment
    pub collected_fines: i64,
}

/// Sortable columns of the borrow record list
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BorrowSortField {
    DueDate,
    BorrowDate,
    StudentName,
    BookTitle,
    FineAmount,
    ReturnStatus,
    CreatedAt,
}

impl BorrowSortField {
    pub fn column(&self) -> &'static str {
        match self {
            BorrowSortField::DueDate => "due_date",
            BorrowSortField::BorrowDate => "borrow_date",
            BorrowSortField::StudentName => "student_name",
            BorrowSortField::BookTitle => "book_title",
            BorrowSortField::FineAmount => "fine_amount",
            BorrowSortField::ReturnStatus => "return_status",
            BorrowSortField::CreatedAt => "created_at",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BorrowSort {
    pub field: BorrowSortField,
    pub descending: bool,
}

impl Default for BorrowSort {
    fn default() -> Self {
        Self {
            field: BorrowSortField::DueDate,
            descending: false,
        }
    }
}

impl BorrowSort {
    /// Parse `field:order`; unknown fields keep the due-date default
    pub fn parse(raw: Option<&str>) -> Self {
        let Some(raw) = raw else {
            return Self::default();
        };
        let (field, order) = raw.split_once(':').unwrap_or((raw, "asc"));
        let field = match field {
            "dueDate" => BorrowSortField::DueDate,
            "borrowDate" => BorrowSortField::BorrowDate,
            "studentName" => BorrowSortField::StudentName,
            "bookTitle" => BorrowSortField::BookTitle,
            "fineAmount" => BorrowSortField::FineAmount,
            "returnStatus" => BorrowSortField::ReturnStatus,
            "createdAt" => BorrowSortField::CreatedAt,
            _ => return Self::default(),
        };
        Self {
            field,
            descending: order == "desc",
        }
    }
}

/// Store-level filter for borrow records
#[derive(Debug, Clone, Default)]
pub struct BorrowFilter {
    pub student_id: Option<String>,
    pub status: Option<ReturnStatus>,
    pub search: Option<String>,
    /// Students only search their own titles
    pub search_title_only: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_return_status_wire_names() {
        assert_eq!(
            serde_json::to_string(&ReturnStatus::NotReturned).unwrap(),
            "\"Not Returned\""
        );
        let parsed: ReturnStatus = serde_json::from_str("\"Overdue\"").unwrap();
        assert_eq!(parsed, ReturnStatus::Overdue);
        assert_eq!("Returned".parse::<ReturnStatus>(), Ok(ReturnStatus::Returned));
    }

    #[test]
    fn test_payment_method_wire_names() {
        assert_eq!(serde_json::to_string(&PaymentMethod::Upi).unwrap(), "\"UPI\"");
        let parsed: PayFineRequest = serde_json::from_str(r#"{"paymentMethod":"Cash"}"#).unwrap();
        assert_eq!(parsed.payment_method, Some(PaymentMethod::Cash));
    }

    #[test]
    fn test_sort_parsing() {
        assert_eq!(BorrowSort::parse(None), BorrowSort::default());
        let sort = BorrowSort::parse(Some("fineAmount:desc"));
        assert_eq!(sort.field, BorrowSortField::FineAmount);
        assert!(sort.descending);
        assert_eq!(BorrowSort::parse(Some("password:desc")), BorrowSort::default());
    }

    #[test]
    fn test_empty_query_values_are_absent() {
        let uri: axum::http::Uri = "/borrowed?page=1&limit=8&search=&status=&sort=dueDate:asc"
            .parse()
            .unwrap();
        let axum::extract::Query(query) = axum::extract::Query::<BorrowQuery>::try_from_uri(&uri).unwrap();
        assert_eq!(query.page, Some(1));
        assert_eq!(query.limit, Some(8));
        assert_eq!(query.status, None);
        assert_eq!(query.search, None);
        assert_eq!(query.sort.as_deref(), Some("dueDate:asc"));

        let uri: axum::http::Uri = "/borrowed?status=Not%20Returned&search=dune".parse().unwrap();
        let axum::extract::Query(query) = axum::extract::Query::<BorrowQuery>::try_from_uri(&uri).unwrap();
        assert_eq!(query.status, Some(ReturnStatus::NotReturned));
        assert_eq!(query.search.as_deref(), Some("dune"));
    }

    #[test]
    fn test_negative_fine_patch_is_invalid() {
        let patch: UpdateBorrowRecord = serde_json::from_str(r#"{"fineAmount":-50}"#).unwrap();
        assert!(patch.validate().is_err());

        let patch: UpdateBorrowRecord = serde_json::from_str(r#"{"fineAmount":0}"#).unwrap();
        assert!(patch.validate().is_ok());
        assert!(UpdateBorrowRecord::default().validate().is_ok());
    }

    #[test]
    fn test_record_serializes_with_client_field_names() {
        let now = Utc::now();
        let record = BorrowedBook::new(
            "Asha".into(),
            "CS-042".into(),
            None,
            "Dune".into(),
            now,
            now,
            now,
        );
        let json = serde_json::to_value(&record).unwrap();
        assert!(json.get("_id").is_some());
        assert_eq!(json["returnStatus"], "Not Returned");
        assert_eq!(json["isFinePaid"], true);
        assert_eq!(json["fineAmount"], 0);
    }
}
