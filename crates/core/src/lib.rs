//! `shelfkeeper-core`: foundation building blocks shared by every crate.
//!
//! This crate contains **pure** primitives (no IO, no storage, no HTTP).

pub mod clock;
pub mod error;
pub mod id;

pub use clock::{Clock, FixedClock, IdGenerator, SequentialIds, SystemClock, UuidV7Ids};
pub use error::{DomainError, DomainResult};
pub use id::{RecordId, SessionId, Username};
