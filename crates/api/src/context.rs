use shelfkeeper_auth::{CallerIdentity, Principal, Role};
use shelfkeeper_core::{SessionId, Username};

/// Authenticated caller for a request.
///
/// Inserted by the auth middleware; present on every protected route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallerContext {
    identity: CallerIdentity,
}

impl CallerContext {
    pub fn new(identity: CallerIdentity) -> Self {
        Self { identity }
    }

    pub fn username(&self) -> &Username {
        &self.identity.username
    }

    pub fn role(&self) -> &Role {
        &self.identity.role
    }

    pub fn session(&self) -> SessionId {
        self.identity.session
    }

    pub fn identity(&self) -> &CallerIdentity {
        &self.identity
    }

    pub fn principal(&self) -> Principal {
        self.identity.principal()
    }
}
