//! HS256 session tokens.

use std::collections::HashSet;

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use thiserror::Error;

use shelfkeeper_core::SessionId;

use crate::{Account, SessionClaims, TokenValidationError, validate_claims};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenError {
    #[error("malformed or badly signed token: {0}")]
    Malformed(String),

    #[error(transparent)]
    Claims(#[from] TokenValidationError),

    #[error("failed to sign token: {0}")]
    Signing(String),

    #[error("session lifetime does not fit the calendar")]
    ExpiryOutOfRange,
}

/// Signs and verifies session tokens with one shared secret.
#[derive(Clone)]
pub struct Hs256Tokens {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl core::fmt::Debug for Hs256Tokens {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Hs256Tokens").field("ttl", &self.ttl).finish_non_exhaustive()
    }
}

impl Hs256Tokens {
    pub fn new(secret: impl AsRef<[u8]>, ttl: Duration) -> Self {
        let secret = secret.as_ref();
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            ttl,
        }
    }

    /// Mint a token for `account` under a fresh session id.
    pub fn issue(&self, account: &Account, now: DateTime<Utc>) -> Result<(String, SessionClaims), TokenError> {
        let claims = SessionClaims {
            sub: account.username.clone(),
            role: account.role.clone(),
            sid: SessionId::new(),
            issued_at: now,
            expires_at: now.checked_add_signed(self.ttl).ok_or(TokenError::ExpiryOutOfRange)?,
        };
        let token = jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| TokenError::Signing(e.to_string()))?;
        Ok((token, claims))
    }

    /// Verify the signature, then the time window against `now`.
    pub fn verify(&self, token: &str, now: DateTime<Utc>) -> Result<SessionClaims, TokenError> {
        // The time window lives in our own claim fields, not the registered `exp`.
        let mut validation = Validation::new(Algorithm::HS256);
        validation.required_spec_claims = HashSet::new();
        validation.validate_exp = false;

        let data = jsonwebtoken::decode::<SessionClaims>(token, &self.decoding, &validation)
            .map_err(|e| TokenError::Malformed(e.to_string()))?;
        validate_claims(&data.claims, now)?;
        Ok(data.claims)
    }
}

#[cfg(test)]
mod tests {
    use shelfkeeper_core::Username;

    use super::*;
    use crate::{AccountState, Role};

    fn account() -> Account {
        Account {
            username: Username::parse("alice").unwrap(),
            state: AccountState::Active,
            role: Role::staff(),
        }
    }

    #[test]
    fn issued_token_verifies_with_same_secret() {
        let tokens = Hs256Tokens::new("secret", Duration::hours(1));
        let now = Utc::now();
        let (token, claims) = tokens.issue(&account(), now).unwrap();

        let decoded = tokens.verify(&token, now + Duration::minutes(1)).unwrap();
        assert_eq!(decoded, claims);
        assert_eq!(decoded.role, Role::staff());
    }

    #[test]
    fn wrong_secret_is_malformed() {
        let now = Utc::now();
        let (token, _) = Hs256Tokens::new("secret", Duration::hours(1))
            .issue(&account(), now)
            .unwrap();

        let other = Hs256Tokens::new("other", Duration::hours(1));
        assert!(matches!(other.verify(&token, now), Err(TokenError::Malformed(_))));
    }

    #[test]
    fn oversized_lifetime_fails_instead_of_panicking() {
        let tokens = Hs256Tokens::new("secret", Duration::days(365 * 300_000));
        assert_eq!(tokens.issue(&account(), Utc::now()), Err(TokenError::ExpiryOutOfRange));
    }

    #[test]
    fn expired_token_is_rejected() {
        let tokens = Hs256Tokens::new("secret", Duration::seconds(30));
        let now = Utc::now();
        let (token, _) = tokens.issue(&account(), now).unwrap();

        assert_eq!(
            tokens.verify(&token, now + Duration::seconds(31)),
            Err(TokenError::Claims(TokenValidationError::Expired))
        );
    }
}
