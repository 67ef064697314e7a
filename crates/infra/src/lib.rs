//! Infrastructure layer: storage backends, the loan pipeline, sessions and
//! configuration.

pub mod config;
pub mod loan_coordinator;
pub mod sessions;
pub mod store;

pub use config::{AppConfig, ConfigError, Persistence};
pub use loan_coordinator::{LoanActor, LoanCoordinator, LoanError};
pub use sessions::{IssuedSession, SessionError, SessionService};
