//! Storage seams for the catalog, accounts and the lending ledger.
//!
//! - `LoanStore` / `UnitOfWork`: the transactional core of a borrow or return
//! - `CatalogStore`, `AccountStore`: record maintenance and search
//! - `InMemoryLibraryStore`: dev/test backend
//! - `PostgresLibraryStore`: persistent backend (sqlx)

mod in_memory;
mod postgres;
mod query;
mod r#trait;

pub use in_memory::InMemoryLibraryStore;
pub use postgres::PostgresLibraryStore;
pub use query::{Page, PageRequest, Pagination, PagingError};
pub use r#trait::{AccountStore, Adjustment, CatalogStore, LoanStore, StoreError, UnitOfWork};
