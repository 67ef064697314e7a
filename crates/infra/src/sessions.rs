//! Session lifecycle: sign in, sign out, bootstrap account.

use std::sync::Arc;

use thiserror::Error;
use tracing::info;

use shelfkeeper_auth::{
    Account, AccountState, CallerIdentity, Hs256Tokens, Role, SessionClaims, SessionRegistry, TokenError,
    TokenIdentityResolver,
};
use shelfkeeper_core::{Clock, Username};

use crate::store::{AccountStore, StoreError};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// Unknown, deleted or malformed username.
    #[error("invalid username")]
    InvalidUsername,

    #[error(transparent)]
    Token(#[from] TokenError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// A freshly issued session token.
#[derive(Debug, Clone)]
pub struct IssuedSession {
    pub token: String,
    pub claims: SessionClaims,
}

pub struct SessionService {
    accounts: Arc<dyn AccountStore>,
    tokens: Arc<Hs256Tokens>,
    sessions: Arc<SessionRegistry>,
    clock: Arc<dyn Clock>,
}

impl SessionService {
    pub fn new(accounts: Arc<dyn AccountStore>, tokens: Arc<Hs256Tokens>, clock: Arc<dyn Clock>) -> Self {
        Self {
            accounts,
            tokens,
            sessions: Arc::new(SessionRegistry::new()),
            clock,
        }
    }

    /// Resolver that accepts exactly the sessions this service has opened.
    pub fn resolver(&self) -> TokenIdentityResolver {
        TokenIdentityResolver::new(self.tokens.clone(), self.sessions.clone())
    }

    /// Issue a token for an active account.
    pub async fn auth(&self, username: &str) -> Result<IssuedSession, SessionError> {
        let username = Username::parse(username).map_err(|_| SessionError::InvalidUsername)?;
        let account = self
            .accounts
            .get_account(&username)
            .await?
            .filter(Account::is_active)
            .ok_or(SessionError::InvalidUsername)?;

        let now = self.clock.now();
        self.sessions.prune(now);
        let (token, claims) = self.tokens.issue(&account, now)?;
        self.sessions.open(claims.sid, claims.sub.clone(), claims.expires_at);

        info!(username = %claims.sub, sid = %claims.sid, "session opened");
        Ok(IssuedSession { token, claims })
    }

    /// Revoke the caller's session. Returns whether it was still open.
    pub fn exit(&self, caller: &CallerIdentity) -> bool {
        let closed = self.sessions.close(&caller.session);
        info!(username = %caller.username, sid = %caller.session, "session closed");
        closed
    }

    /// Seed the admin account when it does not exist yet.
    pub async fn bootstrap(&self, username: &Username) -> Result<bool, StoreError> {
        if self.accounts.get_account(username).await?.is_some() {
            return Ok(false);
        }
        let account = Account {
            username: username.clone(),
            state: AccountState::Active,
            role: Role::admin(),
        };
        match self.accounts.add_account(&account).await {
            Ok(()) => {
                info!(username = %username, "bootstrap admin account created");
                Ok(true)
            }
            // Another instance seeded it first.
            Err(StoreError::Conflict(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};
    use shelfkeeper_auth::{AccountChange, IdentityResolver};
    use shelfkeeper_core::SystemClock;

    use super::*;
    use crate::store::InMemoryLibraryStore;

    fn service() -> (InMemoryLibraryStore, SessionService) {
        let store = InMemoryLibraryStore::new();
        let svc = SessionService::new(
            Arc::new(store.clone()),
            Arc::new(Hs256Tokens::new("test", Duration::minutes(10))),
            Arc::new(SystemClock),
        );
        (store, svc)
    }

    #[tokio::test]
    async fn auth_then_exit() {
        let (_store, svc) = service();
        let admin = Username::parse("admin").unwrap();
        assert!(svc.bootstrap(&admin).await.unwrap());
        assert!(!svc.bootstrap(&admin).await.unwrap());

        let issued = svc.auth("admin").await.unwrap();
        assert_eq!(issued.claims.role, Role::admin());

        let resolver = svc.resolver();
        let caller = resolver.resolve(&issued.token, Utc::now()).unwrap();
        assert_eq!(caller.username, admin);

        assert!(svc.exit(&caller));
        assert!(resolver.resolve(&issued.token, Utc::now()).is_err());
    }

    #[tokio::test]
    async fn unknown_or_deleted_accounts_cannot_sign_in() {
        let (store, svc) = service();
        assert_eq!(svc.auth("nobody").await.unwrap_err(), SessionError::InvalidUsername);
        assert_eq!(svc.auth("   ").await.unwrap_err(), SessionError::InvalidUsername);

        let carol = Username::parse("carol").unwrap();
        store
            .add_account(&Account {
                username: carol.clone(),
                state: AccountState::Active,
                role: Role::member(),
            })
            .await
            .unwrap();
        svc.auth("carol").await.unwrap();

        store
            .change_account(
                &carol,
                &AccountChange {
                    state: "deleted".to_string(),
                    role: None,
                },
            )
            .await
            .unwrap();
        assert_eq!(svc.auth("carol").await.unwrap_err(), SessionError::InvalidUsername);
    }
}
