use std::borrow::Cow;

use serde::{Deserialize, Serialize};

use crate::Role;

/// Permission identifier.
///
/// Permissions are opaque strings (e.g. "catalog.read"). The wildcard `"*"`
/// grants everything.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Permission(Cow<'static, str>);

impl Permission {
    pub const LOANS_SELF: &'static str = "loans.self";
    pub const LOANS_MANAGE: &'static str = "loans.manage";
    pub const CATALOG_READ: &'static str = "catalog.read";
    pub const CATALOG_WRITE: &'static str = "catalog.write";
    pub const ACCOUNTS_READ: &'static str = "accounts.read";
    pub const ACCOUNTS_WRITE: &'static str = "accounts.write";

    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_wildcard(&self) -> bool {
        self.as_str() == "*"
    }
}

impl core::fmt::Display for Permission {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Role → permission policy.
///
/// Every account may borrow for itself and read the catalog; staff also
/// manage loans, the catalog and accounts; admin holds the wildcard.
pub fn permissions_for(role: &Role) -> Vec<Permission> {
    let mut perms = vec![
        Permission::new(Permission::LOANS_SELF),
        Permission::new(Permission::CATALOG_READ),
    ];
    match role.as_str() {
        Role::ADMIN => perms.push(Permission::new("*")),
        Role::STAFF => perms.extend([
            Permission::new(Permission::LOANS_MANAGE),
            Permission::new(Permission::CATALOG_WRITE),
            Permission::new(Permission::ACCOUNTS_READ),
            Permission::new(Permission::ACCOUNTS_WRITE),
        ]),
        _ => {}
    }
    perms
}
