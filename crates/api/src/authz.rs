//! API-side authorization guard.
//!
//! Checked in handlers before any store or coordinator call.

use shelfkeeper_auth::{AuthzError, Permission, authorize};

use crate::context::CallerContext;

/// Check that the caller holds every permission in `required`.
pub fn authorize_caller(caller: &CallerContext, required: &[&'static str]) -> Result<(), AuthzError> {
    let principal = caller.principal();
    for perm in required {
        authorize(&principal, &Permission::new(*perm))?;
    }
    Ok(())
}
