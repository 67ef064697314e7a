use std::collections::HashSet;

use thiserror::Error;

use shelfkeeper_core::Username;

use crate::permissions::permissions_for;
use crate::{Permission, Role};

/// A fully resolved principal for authorization decisions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub username: Username,
    pub role: Role,
    pub permissions: Vec<Permission>,
}

impl Principal {
    /// Principal whose permissions come from the role policy.
    pub fn from_role(username: Username, role: Role) -> Self {
        let permissions = permissions_for(&role);
        Self {
            username,
            role,
            permissions,
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthzError {
    #[error("forbidden: missing permission '{0}'")]
    Forbidden(String),
}

/// Authorize a principal for one permission.
///
/// - No IO
/// - No panics
pub fn authorize(principal: &Principal, required: &Permission) -> Result<(), AuthzError> {
    let perms: HashSet<&str> = principal.permissions.iter().map(|p| p.as_str()).collect();

    if perms.contains("*") || perms.contains(required.as_str()) {
        Ok(())
    } else {
        Err(AuthzError::Forbidden(required.as_str().to_string()))
    }
}
