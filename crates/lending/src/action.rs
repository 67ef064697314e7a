use core::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::LendingError;

/// Direction of a loan transaction.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoanAction {
    Borrow,
    Return,
}

impl LoanAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            LoanAction::Borrow => "borrow",
            LoanAction::Return => "return",
        }
    }
}

impl core::fmt::Display for LoanAction {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LoanAction {
    type Err = LendingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "borrow" => Ok(LoanAction::Borrow),
            "return" => Ok(LoanAction::Return),
            other => Err(LendingError::InvalidAction(other.to_string())),
        }
    }
}
