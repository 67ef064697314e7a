//! Catalog records.

use core::str::FromStr;

use serde::{Deserialize, Serialize};

use shelfkeeper_core::{DomainError, DomainResult};

use crate::action::LoanAction;

/// Externally assigned, stable book code (trimmed, never empty).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct BookCode(String);

impl BookCode {
    pub fn parse(raw: impl AsRef<str>) -> DomainResult<Self> {
        let trimmed = raw.as_ref().trim();
        if trimmed.is_empty() {
            return Err(DomainError::validation("book code is required"));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for BookCode {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for BookCode {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<BookCode> for String {
    fn from(value: BookCode) -> Self {
        value.0
    }
}

impl FromStr for BookCode {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Lifecycle state of a catalog entry. Books are never removed, only flagged.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BookState {
    Active,
    Deleted,
}

impl BookState {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookState::Active => "active",
            BookState::Deleted => "deleted",
        }
    }
}

impl FromStr for BookState {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(BookState::Active),
            "deleted" => Ok(BookState::Deleted),
            other => Err(DomainError::validation(format!(
                "invalid book state '{other}', expected 'active' or 'deleted'"
            ))),
        }
    }
}

/// A catalog entry with its stock counters.
///
/// Invariant: `0 <= on_loan <= total`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Book {
    pub code: BookCode,
    pub name: String,
    pub state: BookState,
    pub total: i64,
    pub on_loan: i64,
}

impl Book {
    /// New on-loan count if `count` copies can be moved in direction `action`.
    ///
    /// This is the precondition of the conditional inventory update: borrows
    /// need an active book with enough free copies, returns must not take the
    /// on-loan count below zero.
    pub fn adjusted_on_loan(&self, action: LoanAction, count: i64) -> Option<i64> {
        match action {
            LoanAction::Borrow => {
                if self.state != BookState::Active {
                    return None;
                }
                self.on_loan
                    .checked_add(count)
                    .filter(|next| *next <= self.total)
            }
            LoanAction::Return => self.on_loan.checked_sub(count).filter(|next| *next >= 0),
        }
    }

    pub fn available(&self) -> i64 {
        self.total - self.on_loan
    }

    /// Apply a catalog edit, keeping the stock invariant.
    pub fn apply_change(&self, change: &BookChange) -> DomainResult<Book> {
        if change.total < 0 {
            return Err(DomainError::validation("total count cannot be negative"));
        }
        if change.total < self.on_loan {
            return Err(DomainError::invariant(format!(
                "total count {} is below the {} copies currently on loan",
                change.total, self.on_loan
            )));
        }
        Ok(Book {
            code: self.code.clone(),
            name: change.name.trim().to_string(),
            state: change.state,
            total: change.total,
            on_loan: self.on_loan,
        })
    }
}

/// Payload for registering a book.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NewBook {
    pub code: String,
    #[serde(default)]
    pub name: String,
    pub total: i64,
    pub state: String,
}

impl NewBook {
    pub fn validate(&self) -> DomainResult<Book> {
        let code = BookCode::parse(&self.code)?;
        let state: BookState = self.state.parse()?;
        if self.total < 0 {
            return Err(DomainError::validation("total count cannot be negative"));
        }
        Ok(Book {
            code,
            name: self.name.trim().to_string(),
            state,
            total: self.total,
            on_loan: 0,
        })
    }
}

/// Editable catalog attributes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookChange {
    pub name: String,
    pub total: i64,
    pub state: BookState,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn book(total: i64, on_loan: i64) -> Book {
        Book {
            code: BookCode::parse("B1").unwrap(),
            name: "Dune".to_string(),
            state: BookState::Active,
            total,
            on_loan,
        }
    }

    #[test]
    fn borrow_is_bounded_by_total_stock() {
        let b = book(2, 0);
        assert_eq!(b.adjusted_on_loan(LoanAction::Borrow, 1), Some(1));
        assert_eq!(b.adjusted_on_loan(LoanAction::Borrow, 2), Some(2));
        assert_eq!(b.adjusted_on_loan(LoanAction::Borrow, 3), None);
        assert_eq!(book(2, 2).adjusted_on_loan(LoanAction::Borrow, 1), None);
    }

    #[test]
    fn return_cannot_underflow() {
        let b = book(5, 2);
        assert_eq!(b.adjusted_on_loan(LoanAction::Return, 2), Some(0));
        assert_eq!(b.adjusted_on_loan(LoanAction::Return, 3), None);
    }

    #[test]
    fn deleted_books_accept_returns_but_not_borrows() {
        let mut b = book(3, 1);
        b.state = BookState::Deleted;
        assert_eq!(b.adjusted_on_loan(LoanAction::Borrow, 1), None);
        assert_eq!(b.adjusted_on_loan(LoanAction::Return, 1), Some(0));
    }

    #[test]
    fn huge_borrow_does_not_overflow() {
        let b = book(i64::MAX, 1);
        assert_eq!(b.adjusted_on_loan(LoanAction::Borrow, i64::MAX), None);
    }

    #[test]
    fn new_book_validation() {
        let ok = NewBook {
            code: " B7 ".to_string(),
            name: "Solaris".to_string(),
            total: 3,
            state: "active".to_string(),
        }
        .validate()
        .unwrap();
        assert_eq!(ok.code.as_str(), "B7");
        assert_eq!(ok.on_loan, 0);

        let bad_state = NewBook {
            code: "B8".to_string(),
            name: String::new(),
            total: 1,
            state: "lost".to_string(),
        };
        assert!(matches!(bad_state.validate(), Err(DomainError::Validation(_))));

        let blank = NewBook {
            code: "  ".to_string(),
            name: String::new(),
            total: 1,
            state: "active".to_string(),
        };
        assert!(blank.validate().is_err());
    }

    #[test]
    fn change_keeps_total_above_on_loan() {
        let b = book(5, 3);
        let shrink = BookChange {
            name: "Dune".to_string(),
            total: 2,
            state: BookState::Active,
        };
        assert!(matches!(
            b.apply_change(&shrink),
            Err(DomainError::InvariantViolation(_))
        ));

        let ok = BookChange {
            name: " Dune Messiah ".to_string(),
            total: 3,
            state: BookState::Deleted,
        };
        let changed = b.apply_change(&ok).unwrap();
        assert_eq!(changed.total, 3);
        assert_eq!(changed.on_loan, 3);
        assert_eq!(changed.name, "Dune Messiah");
        assert_eq!(changed.state, BookState::Deleted);
    }
}
