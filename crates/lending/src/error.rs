use thiserror::Error;

use shelfkeeper_core::Username;

use crate::book::BookCode;

/// Which half of the error taxonomy a [`LendingError`] belongs to.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed request; rejected before any state is touched.
    Input,
    /// Well-formed request that current state does not allow.
    BusinessRule,
    /// Expected absence (e.g. a user with no outstanding loans).
    NotFound,
}

/// Deterministic lending failure. Every variant that concerns one book names it.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LendingError {
    #[error("invalid action '{0}', expected 'borrow' or 'return'")]
    InvalidAction(String),

    #[error("book list must not be empty")]
    EmptyBookList,

    #[error("book line {line} has no book code")]
    MissingBookCode { line: usize },

    #[error("count for book {code} must be positive, got {count}")]
    NonPositiveCount { code: String, count: i64 },

    #[error("total requested count for book {code} is too large")]
    CountOverflow { code: BookCode },

    #[error("target username is required")]
    MissingUsername,

    #[error("unknown user: {0}")]
    UnknownUser(Username),

    #[error("account {0} is deleted and cannot borrow")]
    InactiveUser(Username),

    #[error("invalid book code or insufficient stock: {code}")]
    StockUnavailable { code: BookCode },

    #[error("invalid book code or loan count underflow: {code}")]
    LoanCountUnderflow { code: BookCode },

    #[error("no outstanding loans for user {username}")]
    NoOutstandingLoans { username: Username },

    #[error("nothing borrowed of book {code}")]
    NothingBorrowed { code: BookCode },

    #[error("return quantity for book {code} exceeds holdings ({requested} > {held})")]
    ExceedsHoldings {
        code: BookCode,
        held: i64,
        requested: i64,
    },

    #[error("user {username} holds no books")]
    NoHoldings { username: Username },
}

/// Stored holdings that break the positive-count invariant.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum HoldingsError {
    #[error("stored count for {code} is {count}")]
    NonPositiveCount { code: BookCode, count: i64 },

    #[error("stored count for {code} overflows")]
    CountOverflow { code: BookCode },
}

impl LendingError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            LendingError::InvalidAction(_)
            | LendingError::EmptyBookList
            | LendingError::MissingBookCode { .. }
            | LendingError::NonPositiveCount { .. }
            | LendingError::CountOverflow { .. }
            | LendingError::MissingUsername => ErrorKind::Input,
            LendingError::UnknownUser(_)
            | LendingError::InactiveUser(_)
            | LendingError::StockUnavailable { .. }
            | LendingError::LoanCountUnderflow { .. }
            | LendingError::NoOutstandingLoans { .. }
            | LendingError::NothingBorrowed { .. }
            | LendingError::ExceedsHoldings { .. } => ErrorKind::BusinessRule,
            LendingError::NoHoldings { .. } => ErrorKind::NotFound,
        }
    }
}
