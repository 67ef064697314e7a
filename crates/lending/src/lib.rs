//! Lending domain module.
//!
//! Business rules for borrowing and returning books, implemented purely as
//! deterministic domain logic (no IO, no HTTP, no storage):
//!
//! - request shape validation ([`LoanRequest::parse`])
//! - merging a borrow/return delta into a user's holdings ([`Holdings::reconcile`])
//! - catalog records and their invariant `0 <= on_loan <= total` ([`Book`])
//! - the immutable audit record written for every accepted request ([`LoanRecord`])

pub mod action;
pub mod book;
pub mod error;
pub mod holdings;
pub mod record;
pub mod request;

pub use action::LoanAction;
pub use book::{Book, BookChange, BookCode, BookState, NewBook};
pub use error::{ErrorKind, HoldingsError, LendingError};
pub use holdings::Holdings;
pub use record::LoanRecord;
pub use request::{BookLine, LoanRequest, RequestedLine};
