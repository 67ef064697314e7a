use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use shelfkeeper_auth::Account;
use shelfkeeper_core::DomainResult;
use shelfkeeper_lending::{Book, BookChange, BookLine, BookState, Holdings, LoanRecord, RequestedLine};

// -------------------------
// Request DTOs
// -------------------------

#[derive(Debug, Deserialize)]
pub struct AuthRequest {
    #[serde(default)]
    pub username: String,
}

#[derive(Debug, Deserialize)]
pub struct LoanRequestBody {
    #[serde(default)]
    pub action: String,
    #[serde(default)]
    pub books: Vec<RequestedLine>,
}

/// Staff-initiated out/in for another account.
#[derive(Debug, Deserialize)]
pub struct StaffLoanRequestBody {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub action: String,
    #[serde(default)]
    pub books: Vec<RequestedLine>,
}

#[derive(Debug, Deserialize)]
pub struct ChangeBookRequest {
    #[serde(default)]
    pub name: String,
    pub total: i64,
    pub state: String,
}

impl ChangeBookRequest {
    pub fn into_change(self) -> DomainResult<BookChange> {
        Ok(BookChange {
            name: self.name,
            total: self.total,
            state: self.state.parse::<BookState>()?,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub keyword: String,
    pub state: Option<String>,
    pub page_start: Option<i64>,
    pub page_count: Option<i64>,
}

impl SearchQuery {
    pub const DEFAULT_PAGE_COUNT: i64 = 20;

    pub fn page_start(&self) -> i64 {
        self.page_start.unwrap_or(1)
    }

    pub fn page_count(&self) -> i64 {
        self.page_count.unwrap_or(Self::DEFAULT_PAGE_COUNT)
    }
}

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

// -------------------------
// Response DTOs
// -------------------------

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub token: String,
    pub username: String,
    pub role: String,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct BookResponse {
    pub code: String,
    pub name: String,
    pub state: BookState,
    pub total: i64,
    pub on_loan: i64,
    pub available: i64,
}

impl From<Book> for BookResponse {
    fn from(book: Book) -> Self {
        Self {
            available: book.available(),
            code: book.code.as_str().to_string(),
            name: book.name,
            state: book.state,
            total: book.total,
            on_loan: book.on_loan,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct BookSearchResponse {
    pub count: u64,
    pub books: Vec<BookResponse>,
}

#[derive(Debug, Serialize)]
pub struct AccountSearchResponse {
    pub count: u64,
    pub users: Vec<Account>,
}

#[derive(Debug, Serialize)]
pub struct HoldingsResponse {
    pub username: String,
    pub books: Vec<BookLine>,
    pub total: i64,
}

impl HoldingsResponse {
    pub fn new(username: &str, holdings: &Holdings) -> Self {
        Self {
            username: username.to_string(),
            books: holdings.to_lines(),
            total: holdings.total_copies(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct HistoryResponse {
    pub count: u64,
    pub records: Vec<LoanRecord>,
}
