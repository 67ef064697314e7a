//! Borrow/return request shape and its validation.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::action::LoanAction;
use crate::book::BookCode;
use crate::error::LendingError;

/// One requested line as it arrives on the wire (unvalidated).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestedLine {
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub count: i64,
}

/// A validated `(book, count)` pair. `count` is always positive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookLine {
    pub code: BookCode,
    pub count: i64,
}

/// A request that passed shape validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoanRequest {
    action: LoanAction,
    lines: Vec<BookLine>,
    merged: BTreeMap<BookCode, i64>,
}

impl LoanRequest {
    /// Validate the raw request.
    ///
    /// Rejects an unknown action, an empty book list, a blank code or a
    /// non-positive count. Lines repeating a code are summed into one entry of
    /// [`LoanRequest::merged`].
    pub fn parse(action: &str, lines: &[RequestedLine]) -> Result<Self, LendingError> {
        let action: LoanAction = action.parse()?;
        Self::new(action, lines)
    }

    pub fn new(action: LoanAction, lines: &[RequestedLine]) -> Result<Self, LendingError> {
        if lines.is_empty() {
            return Err(LendingError::EmptyBookList);
        }

        let mut validated = Vec::with_capacity(lines.len());
        let mut merged: BTreeMap<BookCode, i64> = BTreeMap::new();
        for (idx, line) in lines.iter().enumerate() {
            let code = BookCode::parse(&line.code)
                .map_err(|_| LendingError::MissingBookCode { line: idx + 1 })?;
            if line.count <= 0 {
                return Err(LendingError::NonPositiveCount {
                    code: code.to_string(),
                    count: line.count,
                });
            }

            let slot = merged.entry(code.clone()).or_insert(0);
            *slot = slot
                .checked_add(line.count)
                .ok_or_else(|| LendingError::CountOverflow { code: code.clone() })?;

            validated.push(BookLine {
                code,
                count: line.count,
            });
        }

        Ok(Self {
            action,
            lines: validated,
            merged,
        })
    }

    pub fn action(&self) -> LoanAction {
        self.action
    }

    /// Lines exactly as submitted (order and duplicates preserved).
    pub fn lines(&self) -> &[BookLine] {
        &self.lines
    }

    /// Requested count per book code, in ascending code order.
    pub fn merged(&self) -> &BTreeMap<BookCode, i64> {
        &self.merged
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(code: &str, count: i64) -> RequestedLine {
        RequestedLine {
            code: code.to_string(),
            count,
        }
    }

    #[test]
    fn rejects_malformed_requests() {
        assert_eq!(
            LoanRequest::parse("lend", &[line("B1", 1)]),
            Err(LendingError::InvalidAction("lend".to_string()))
        );
        assert_eq!(LoanRequest::parse("borrow", &[]), Err(LendingError::EmptyBookList));
        assert_eq!(
            LoanRequest::parse("borrow", &[line("B1", 1), line(" ", 1)]),
            Err(LendingError::MissingBookCode { line: 2 })
        );
        assert_eq!(
            LoanRequest::parse("return", &[line("B1", 0)]),
            Err(LendingError::NonPositiveCount {
                code: "B1".to_string(),
                count: 0
            })
        );
        assert!(LoanRequest::parse("return", &[line("B1", -2)]).is_err());
    }

    #[test]
    fn duplicate_codes_are_merged_but_lines_are_kept() {
        let req = LoanRequest::parse("borrow", &[line("B2", 1), line("B1", 2), line("B2", 3)]).unwrap();
        assert_eq!(req.lines().len(), 3);

        let merged: Vec<(&str, i64)> = req.merged().iter().map(|(c, n)| (c.as_str(), *n)).collect();
        assert_eq!(merged, vec![("B1", 2), ("B2", 4)]);
    }

    #[test]
    fn merged_count_overflow_is_an_input_error() {
        let err = LoanRequest::parse("borrow", &[line("B1", i64::MAX), line("B1", 1)]).unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::Input);
    }
}
