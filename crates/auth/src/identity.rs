//! Resolve a bearer token to the caller it belongs to.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::debug;

use shelfkeeper_core::{SessionId, Username};

use crate::{Hs256Tokens, Principal, Role, SessionRegistry, TokenError};

/// Who is making a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallerIdentity {
    pub username: Username,
    pub role: Role,
    pub session: SessionId,
}

impl CallerIdentity {
    pub fn principal(&self) -> Principal {
        Principal::from_role(self.username.clone(), self.role.clone())
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error(transparent)]
    Token(#[from] TokenError),

    #[error("session is not active")]
    SessionClosed,
}

/// Seam between HTTP handling and whatever establishes identity.
pub trait IdentityResolver: Send + Sync {
    fn resolve(&self, token: &str, now: DateTime<Utc>) -> Result<CallerIdentity, AuthError>;
}

/// Token + session registry resolver.
#[derive(Debug, Clone)]
pub struct TokenIdentityResolver {
    tokens: Arc<Hs256Tokens>,
    sessions: Arc<SessionRegistry>,
}

impl TokenIdentityResolver {
    pub fn new(tokens: Arc<Hs256Tokens>, sessions: Arc<SessionRegistry>) -> Self {
        Self { tokens, sessions }
    }
}

impl IdentityResolver for TokenIdentityResolver {
    fn resolve(&self, token: &str, now: DateTime<Utc>) -> Result<CallerIdentity, AuthError> {
        let claims = self.tokens.verify(token, now)?;
        if !self.sessions.is_live(&claims.sid, &claims.sub, now) {
            debug!(sid = %claims.sid, "token references a closed session");
            return Err(AuthError::SessionClosed);
        }
        Ok(CallerIdentity {
            username: claims.sub,
            role: claims.role,
            session: claims.sid,
        })
    }
}
