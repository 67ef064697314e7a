//! Per-user outstanding loans and the reconciliation algorithm.

use std::collections::BTreeMap;

use shelfkeeper_core::Username;

use crate::action::LoanAction;
use crate::book::BookCode;
use crate::error::{HoldingsError, LendingError};
use crate::request::{BookLine, LoanRequest};

/// Books currently held by one user: code → outstanding count.
///
/// Invariant: every count is strictly positive. A code whose count reaches
/// zero is removed, and an empty `Holdings` means the user's ledger entry
/// must not exist.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Holdings {
    books: BTreeMap<BookCode, i64>,
}

impl Holdings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild holdings from stored lines, refusing non-positive counts.
    pub fn from_lines(lines: impl IntoIterator<Item = BookLine>) -> Result<Self, HoldingsError> {
        let mut books: BTreeMap<BookCode, i64> = BTreeMap::new();
        for BookLine { code, count } in lines {
            if count <= 0 {
                return Err(HoldingsError::NonPositiveCount { code, count });
            }
            let slot = books.entry(code.clone()).or_insert(0);
            *slot = slot
                .checked_add(count)
                .ok_or(HoldingsError::CountOverflow { code })?;
        }
        Ok(Self { books })
    }

    pub fn is_empty(&self) -> bool {
        self.books.is_empty()
    }

    pub fn get(&self, code: &BookCode) -> Option<i64> {
        self.books.get(code).copied()
    }

    pub fn total_copies(&self) -> i64 {
        self.books.values().sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&BookCode, i64)> {
        self.books.iter().map(|(c, n)| (c, *n))
    }

    /// Lines in ascending code order.
    pub fn to_lines(&self) -> Vec<BookLine> {
        self.books
            .iter()
            .map(|(code, count)| BookLine {
                code: code.clone(),
                count: *count,
            })
            .collect()
    }

    /// Merge a validated request into `current` holdings (pure).
    ///
    /// Borrow adds each requested count. Return subtracts it, failing when the
    /// user holds nothing at all, holds nothing of a book, or would go below
    /// zero; a count reaching zero removes the book.
    pub fn reconcile(
        username: &Username,
        current: Option<&Holdings>,
        request: &LoanRequest,
    ) -> Result<Holdings, LendingError> {
        let action = request.action();
        if action == LoanAction::Return && current.is_none_or(Holdings::is_empty) {
            return Err(LendingError::NoOutstandingLoans {
                username: username.clone(),
            });
        }

        let mut books = current.map(|h| h.books.clone()).unwrap_or_default();
        for (code, requested) in request.merged() {
            let requested = *requested;
            match action {
                LoanAction::Borrow => {
                    let slot = books.entry(code.clone()).or_insert(0);
                    *slot = slot
                        .checked_add(requested)
                        .ok_or_else(|| LendingError::CountOverflow { code: code.clone() })?;
                }
                LoanAction::Return => {
                    let held = books
                        .get(code)
                        .copied()
                        .ok_or_else(|| LendingError::NothingBorrowed { code: code.clone() })?;
                    let remaining = held - requested;
                    if remaining < 0 {
                        return Err(LendingError::ExceedsHoldings {
                            code: code.clone(),
                            held,
                            requested,
                        });
                    }
                    if remaining == 0 {
                        books.remove(code);
                    } else {
                        books.insert(code.clone(), remaining);
                    }
                }
            }
        }

        Ok(Holdings { books })
    }
}
