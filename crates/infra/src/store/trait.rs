use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use shelfkeeper_auth::{Account, AccountChange, AccountState};
use shelfkeeper_core::{DomainError, Username};
use shelfkeeper_lending::{Book, BookChange, BookCode, Holdings, LoanAction, LoanRecord};

use super::query::{Page, PageRequest, Pagination};

/// Storage failure. Domain rejections raised while applying a catalog or
/// account edit travel as `Domain`; everything else is infrastructure.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("database error: {0}")]
    Database(String),

    #[error("corrupt stored data: {0}")]
    Corrupt(String),
}

/// Outcome of a conditional inventory update.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Adjustment {
    Applied,
    /// Unknown code, insufficient stock (borrow), inactive book (borrow) or
    /// underflow (return). Nothing was changed.
    Rejected,
}

/// One all-or-nothing unit of work.
///
/// Row locks taken by a unit are held until it commits, rolls back or is
/// dropped. Dropping an uncommitted unit discards everything it did.
#[async_trait]
pub trait UnitOfWork: Send {
    /// Conditionally move `count` copies of `code` on or off loan.
    async fn adjust_inventory(
        &mut self,
        code: &BookCode,
        count: i64,
        action: LoanAction,
    ) -> Result<Adjustment, StoreError>;

    /// Read and exclusively lock the user's ledger row, even if it does not
    /// exist yet.
    async fn lock_holdings(&mut self, username: &Username) -> Result<Option<Holdings>, StoreError>;

    /// Upsert the ledger row, or delete it when `holdings` is empty.
    async fn store_holdings(&mut self, username: &Username, holdings: &Holdings) -> Result<(), StoreError>;

    async fn append_record(&mut self, record: &LoanRecord) -> Result<(), StoreError>;

    async fn commit(self: Box<Self>) -> Result<(), StoreError>;

    async fn rollback(self: Box<Self>) -> Result<(), StoreError>;
}

#[async_trait]
pub trait LoanStore: Send + Sync {
    async fn begin(&self) -> Result<Box<dyn UnitOfWork>, StoreError>;

    /// Committed holdings of `username` (no lock).
    async fn holdings(&self, username: &Username) -> Result<Option<Holdings>, StoreError>;

    /// Audit records booked against `username`, newest first.
    async fn records(&self, username: &Username, pagination: Pagination) -> Result<Page<LoanRecord>, StoreError>;
}

#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// Insert a new book; a duplicate code is a `Conflict`.
    async fn add_book(&self, book: &Book) -> Result<(), StoreError>;

    /// Apply an edit under the book's row lock.
    async fn change_book(&self, code: &BookCode, change: &BookChange) -> Result<Book, StoreError>;

    async fn get_book(&self, code: &BookCode) -> Result<Option<Book>, StoreError>;

    /// Books whose `code + name` contains `keyword`, ordered by code.
    async fn search_books(&self, keyword: &str, page: PageRequest) -> Result<Page<Book>, StoreError>;
}

#[async_trait]
pub trait AccountStore: Send + Sync {
    /// Insert a new account; a duplicate username is a `Conflict`.
    async fn add_account(&self, account: &Account) -> Result<(), StoreError>;

    async fn change_account(&self, username: &Username, change: &AccountChange) -> Result<Account, StoreError>;

    async fn get_account(&self, username: &Username) -> Result<Option<Account>, StoreError>;

    /// Accounts whose username contains `keyword`, ordered by username.
    async fn search_accounts(
        &self,
        keyword: &str,
        state: Option<AccountState>,
        page: PageRequest,
    ) -> Result<Page<Account>, StoreError>;
}

#[async_trait]
impl<S> LoanStore for Arc<S>
where
    S: LoanStore + ?Sized,
{
    async fn begin(&self) -> Result<Box<dyn UnitOfWork>, StoreError> {
        (**self).begin().await
    }

    async fn holdings(&self, username: &Username) -> Result<Option<Holdings>, StoreError> {
        (**self).holdings(username).await
    }

    async fn records(&self, username: &Username, pagination: Pagination) -> Result<Page<LoanRecord>, StoreError> {
        (**self).records(username, pagination).await
    }
}
