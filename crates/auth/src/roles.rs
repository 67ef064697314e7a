use std::borrow::Cow;

use serde::{Deserialize, Serialize};

use shelfkeeper_core::DomainError;

/// Role identifier used for RBAC.
///
/// Roles stay opaque strings here; [`crate::permissions::permissions_for`]
/// maps the known ones to permissions.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Role(Cow<'static, str>);

impl Role {
    pub const MEMBER: &'static str = "member";
    pub const STAFF: &'static str = "staff";
    pub const ADMIN: &'static str = "admin";

    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self(name.into())
    }

    pub fn member() -> Self {
        Self::new(Self::MEMBER)
    }

    pub fn staff() -> Self {
        Self::new(Self::STAFF)
    }

    pub fn admin() -> Self {
        Self::new(Self::ADMIN)
    }

    /// Accept only the roles accounts can be created with.
    pub fn parse(name: &str) -> Result<Self, DomainError> {
        match name {
            Self::MEMBER => Ok(Self::member()),
            Self::STAFF => Ok(Self::staff()),
            Self::ADMIN => Ok(Self::admin()),
            other => Err(DomainError::validation(format!(
                "invalid role '{other}', expected one of: member, staff, admin"
            ))),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for Role {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}
