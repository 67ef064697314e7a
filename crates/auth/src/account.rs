//! Library accounts (the users loans are booked against).

use core::str::FromStr;

use serde::{Deserialize, Serialize};

use shelfkeeper_core::{DomainError, DomainResult, Username};

use crate::Role;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountState {
    Active,
    Deleted,
}

impl AccountState {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccountState::Active => "active",
            AccountState::Deleted => "deleted",
        }
    }
}

impl FromStr for AccountState {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(AccountState::Active),
            "deleted" => Ok(AccountState::Deleted),
            other => Err(DomainError::validation(format!(
                "invalid account state '{other}', expected 'active' or 'deleted'"
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub username: Username,
    pub state: AccountState,
    pub role: Role,
}

impl Account {
    pub fn is_active(&self) -> bool {
        self.state == AccountState::Active
    }
}

/// Payload for registering an account. Role defaults to `member`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NewAccount {
    pub username: String,
    pub state: String,
    #[serde(default)]
    pub role: Option<String>,
}

impl NewAccount {
    pub fn validate(&self) -> DomainResult<Account> {
        let username = Username::parse(&self.username)?;
        let state: AccountState = self.state.parse()?;
        let role = match self.role.as_deref() {
            Some(r) => Role::parse(r)?,
            None => Role::member(),
        };
        Ok(Account {
            username,
            state,
            role,
        })
    }
}

/// Editable account attributes. An absent role keeps the current one.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AccountChange {
    pub state: String,
    #[serde(default)]
    pub role: Option<String>,
}

impl AccountChange {
    pub fn apply(&self, account: &Account) -> DomainResult<Account> {
        let state: AccountState = self.state.parse()?;
        let role = match self.role.as_deref() {
            Some(r) => Role::parse(r)?,
            None => account.role.clone(),
        };
        Ok(Account {
            username: account.username.clone(),
            state,
            role,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_account_defaults_to_member() {
        let acct = NewAccount {
            username: "carol".to_string(),
            state: "active".to_string(),
            role: None,
        }
        .validate()
        .unwrap();
        assert_eq!(acct.role, Role::member());
        assert!(acct.is_active());
    }

    #[test]
    fn new_account_rejects_unknown_state_and_role() {
        let bad_state = NewAccount {
            username: "carol".to_string(),
            state: "frozen".to_string(),
            role: None,
        };
        assert!(bad_state.validate().is_err());

        let bad_role = NewAccount {
            username: "carol".to_string(),
            state: "active".to_string(),
            role: Some("root".to_string()),
        };
        assert!(bad_role.validate().is_err());
    }

    #[test]
    fn change_keeps_role_unless_given() {
        let acct = Account {
            username: Username::parse("dave").unwrap(),
            state: AccountState::Active,
            role: Role::staff(),
        };
        let deleted = AccountChange {
            state: "deleted".to_string(),
            role: None,
        }
        .apply(&acct)
        .unwrap();
        assert_eq!(deleted.state, AccountState::Deleted);
        assert_eq!(deleted.role, Role::staff());
    }
}
