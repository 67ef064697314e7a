//! `shelfkeeper-auth`: accounts, sessions and authorization.
//!
//! This crate is decoupled from HTTP and storage: it issues and verifies
//! session tokens, resolves a bearer token to a caller identity, and decides
//! whether that caller holds a permission.

pub mod account;
pub mod authorize;
pub mod claims;
pub mod identity;
pub mod permissions;
pub mod roles;
pub mod session;
pub mod token;

pub use account::{Account, AccountChange, AccountState, NewAccount};
pub use authorize::{AuthzError, Principal, authorize};
pub use claims::{SessionClaims, TokenValidationError, validate_claims};
pub use identity::{AuthError, CallerIdentity, IdentityResolver, TokenIdentityResolver};
pub use permissions::Permission;
pub use roles::Role;
pub use session::SessionRegistry;
pub use token::{Hs256Tokens, TokenError};
