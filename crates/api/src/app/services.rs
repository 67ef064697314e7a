//! Service wiring: one store backend shared by catalog, accounts, loans and
//! sessions.

use std::sync::Arc;

use tracing::info;

use shelfkeeper_auth::Hs256Tokens;
use shelfkeeper_core::{Clock, SystemClock, UuidV7Ids};
use shelfkeeper_infra::store::{
    AccountStore, CatalogStore, InMemoryLibraryStore, LoanStore, PostgresLibraryStore, StoreError,
};
use shelfkeeper_infra::{AppConfig, LoanCoordinator, Persistence, SessionService};

pub struct AppServices {
    pub catalog: Arc<dyn CatalogStore>,
    pub accounts: Arc<dyn AccountStore>,
    pub loans: LoanCoordinator,
    pub sessions: SessionService,
    pub backend: &'static str,
}

/// Build services for the configured backend and seed the bootstrap admin.
pub async fn build_services(config: &AppConfig) -> Result<AppServices, StoreError> {
    let services = match &config.persistence {
        Persistence::InMemory => wire(Arc::new(InMemoryLibraryStore::new()), config, "in_memory"),
        Persistence::Postgres {
            database_url,
            max_connections,
        } => {
            let store = PostgresLibraryStore::connect(database_url, *max_connections).await?;
            wire(Arc::new(store), config, "postgres")
        }
    };

    services.sessions.bootstrap(&config.bootstrap_staff).await?;
    info!(backend = services.backend, "services ready");
    Ok(services)
}

fn wire<S>(store: Arc<S>, config: &AppConfig, backend: &'static str) -> AppServices
where
    S: LoanStore + CatalogStore + AccountStore + 'static,
{
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let tokens = Arc::new(Hs256Tokens::new(config.jwt_secret.as_bytes(), config.session_ttl));

    AppServices {
        catalog: store.clone(),
        accounts: store.clone(),
        loans: LoanCoordinator::new(store.clone(), store.clone(), clock.clone(), Arc::new(UuidV7Ids)),
        sessions: SessionService::new(store, tokens, clock),
        backend,
    }
}
