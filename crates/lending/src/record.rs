//! Transaction log record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use shelfkeeper_core::{RecordId, Username};

use crate::action::LoanAction;
use crate::request::BookLine;

/// Immutable audit entry, one per accepted request (never per book line).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoanRecord {
    pub id: RecordId,
    pub action: LoanAction,
    /// Whose ledger the request was booked against.
    pub username: Username,
    /// Staff member who performed a staff-initiated out/in.
    pub operator: Option<Username>,
    pub books: Vec<BookLine>,
    pub occurred_at: DateTime<Utc>,
}
