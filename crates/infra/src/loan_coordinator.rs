//! Borrow/return pipeline.
//!
//! ```text
//! LoanRequest (validated, lines merged per code)
//!   ↓
//! 1. Begin unit of work
//!   ↓
//! 2. Conditional inventory update per code, ascending code order
//!   ↓
//! 3. Lock + read the user's ledger row
//!   ↓
//! 4. Reconcile holdings (pure) and write them back
//!   ↓
//! 5. Append one audit record
//!   ↓
//! 6. Commit (any failure above: roll back, nothing persists)
//! ```
//!
//! Every unit takes book rows in one global order and exactly one user row
//! last, so concurrent units cannot deadlock.

use std::sync::Arc;

use thiserror::Error;
use tracing::{error, info, instrument, warn};

use shelfkeeper_auth::AccountState;
use shelfkeeper_core::{Clock, IdGenerator, RecordId, Username};
use shelfkeeper_lending::{Holdings, LendingError, LoanAction, LoanRecord, LoanRequest};

use crate::store::{AccountStore, Adjustment, LoanStore, Page, Pagination, StoreError, UnitOfWork};

/// On whose behalf a request runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoanActor {
    /// A member borrowing or returning for themselves.
    SelfService(Username),
    /// Staff checking books out or in for another account.
    Staff { operator: Username, target: Username },
}

impl LoanActor {
    /// The account whose ledger is changed.
    pub fn username(&self) -> &Username {
        match self {
            LoanActor::SelfService(username) => username,
            LoanActor::Staff { target, .. } => target,
        }
    }

    pub fn operator(&self) -> Option<&Username> {
        match self {
            LoanActor::SelfService(_) => None,
            LoanActor::Staff { operator, .. } => Some(operator),
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LoanError {
    #[error(transparent)]
    Rejected(#[from] LendingError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

pub struct LoanCoordinator {
    loans: Arc<dyn LoanStore>,
    accounts: Arc<dyn AccountStore>,
    clock: Arc<dyn Clock>,
    ids: Arc<dyn IdGenerator>,
}

impl LoanCoordinator {
    pub fn new(
        loans: Arc<dyn LoanStore>,
        accounts: Arc<dyn AccountStore>,
        clock: Arc<dyn Clock>,
        ids: Arc<dyn IdGenerator>,
    ) -> Self {
        Self {
            loans,
            accounts,
            clock,
            ids,
        }
    }

    /// Apply one borrow or return atomically and return its audit record.
    #[instrument(
        skip_all,
        fields(
            action = %request.action(),
            username = %actor.username(),
            operator = actor.operator().map(|o| o.as_str()),
            lines = request.lines().len()
        )
    )]
    pub async fn execute(&self, actor: &LoanActor, request: &LoanRequest) -> Result<LoanRecord, LoanError> {
        let outcome = self.execute_checked(actor, request).await;
        match &outcome {
            Ok(record) => info!(record_id = %record.id, "loan request committed"),
            Err(LoanError::Rejected(e)) => info!(error = %e, "loan request rejected"),
            Err(LoanError::Store(e)) => error!(error = ?e, "loan request failed"),
        }
        outcome
    }

    async fn execute_checked(&self, actor: &LoanActor, request: &LoanRequest) -> Result<LoanRecord, LoanError> {
        self.check_account(actor.username(), request.action()).await?;

        let mut unit = self.loans.begin().await?;
        match self.run(unit.as_mut(), actor, request).await {
            Ok(record) => {
                unit.commit().await?;
                Ok(record)
            }
            Err(e) => {
                if let Err(rollback) = unit.rollback().await {
                    warn!(error = %rollback, "rollback failed; transaction is discarded on drop");
                }
                Err(e)
            }
        }
    }

    async fn run(
        &self,
        unit: &mut dyn UnitOfWork,
        actor: &LoanActor,
        request: &LoanRequest,
    ) -> Result<LoanRecord, LoanError> {
        let action = request.action();

        // Inventory is checked before the ledger, so a return of a book nobody
        // holds fails as an underflow even when the user has no ledger entry.
        for (code, count) in request.merged() {
            if unit.adjust_inventory(code, *count, action).await? == Adjustment::Rejected {
                let code = code.clone();
                return Err(match action {
                    LoanAction::Borrow => LendingError::StockUnavailable { code },
                    LoanAction::Return => LendingError::LoanCountUnderflow { code },
                }
                .into());
            }
        }

        let username = actor.username();
        let current = unit.lock_holdings(username).await?;
        let next = Holdings::reconcile(username, current.as_ref(), request)?;
        unit.store_holdings(username, &next).await?;

        let record = LoanRecord {
            id: RecordId::from_uuid(self.ids.next_id()),
            action,
            username: username.clone(),
            operator: actor.operator().cloned(),
            books: request.lines().to_vec(),
            occurred_at: self.clock.now(),
        };
        unit.append_record(&record).await?;
        Ok(record)
    }

    /// The target must exist; a deleted account may still return books.
    async fn check_account(&self, username: &Username, action: LoanAction) -> Result<(), LoanError> {
        let account = self
            .accounts
            .get_account(username)
            .await?
            .ok_or_else(|| LendingError::UnknownUser(username.clone()))?;

        if action == LoanAction::Borrow && account.state == AccountState::Deleted {
            return Err(LendingError::InactiveUser(username.clone()).into());
        }
        Ok(())
    }

    /// Committed holdings; an empty ledger is `NoHoldings`.
    pub async fn holdings(&self, username: &Username) -> Result<Holdings, LoanError> {
        match self.loans.holdings(username).await? {
            Some(h) if !h.is_empty() => Ok(h),
            _ => Err(LendingError::NoHoldings {
                username: username.clone(),
            }
            .into()),
        }
    }

    pub async fn history(&self, username: &Username, pagination: Pagination) -> Result<Page<LoanRecord>, LoanError> {
        Ok(self.loans.records(username, pagination).await?)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use shelfkeeper_auth::{Account, Role};
    use shelfkeeper_core::{FixedClock, SequentialIds};
    use shelfkeeper_lending::{Book, BookCode, BookState, RequestedLine};

    use super::*;
    use crate::store::{CatalogStore, InMemoryLibraryStore};

    fn code(c: &str) -> BookCode {
        BookCode::parse(c).unwrap()
    }

    fn user(u: &str) -> Username {
        Username::parse(u).unwrap()
    }

    fn lines(pairs: &[(&str, i64)]) -> Vec<RequestedLine> {
        pairs
            .iter()
            .map(|(c, n)| RequestedLine {
                code: c.to_string(),
                count: *n,
            })
            .collect()
    }

    fn borrow(pairs: &[(&str, i64)]) -> LoanRequest {
        LoanRequest::new(LoanAction::Borrow, &lines(pairs)).unwrap()
    }

    fn give_back(pairs: &[(&str, i64)]) -> LoanRequest {
        LoanRequest::new(LoanAction::Return, &lines(pairs)).unwrap()
    }

    async fn setup(books: &[(&str, i64)]) -> (InMemoryLibraryStore, LoanCoordinator) {
        let store = InMemoryLibraryStore::new();
        for (c, total) in books {
            store
                .add_book(&Book {
                    code: code(c),
                    name: String::new(),
                    state: BookState::Active,
                    total: *total,
                    on_loan: 0,
                })
                .await
                .unwrap();
        }
        for u in ["alice", "bob", "staff"] {
            store
                .add_account(&Account {
                    username: user(u),
                    state: AccountState::Active,
                    role: Role::member(),
                })
                .await
                .unwrap();
        }
        let clock = FixedClock::new(Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).unwrap());
        let shared = Arc::new(store.clone());
        let coordinator = LoanCoordinator::new(
            shared.clone(),
            shared,
            Arc::new(clock),
            Arc::new(SequentialIds::new()),
        );
        (store, coordinator)
    }

    async fn on_loan(store: &InMemoryLibraryStore, c: &str) -> i64 {
        store.get_book(&code(c)).await.unwrap().unwrap().on_loan
    }

    fn alice() -> LoanActor {
        LoanActor::SelfService(user("alice"))
    }

    #[tokio::test]
    async fn borrow_then_partial_return() {
        let (store, coord) = setup(&[("B1", 2)]).await;

        let record = coord.execute(&alice(), &borrow(&[("B1", 2)])).await.unwrap();
        assert_eq!(record.action, LoanAction::Borrow);
        assert_eq!(record.operator, None);
        assert_eq!(on_loan(&store, "B1").await, 2);
        assert_eq!(coord.holdings(&user("alice")).await.unwrap().get(&code("B1")), Some(2));

        coord.execute(&alice(), &give_back(&[("B1", 1)])).await.unwrap();
        assert_eq!(on_loan(&store, "B1").await, 1);
        assert_eq!(coord.holdings(&user("alice")).await.unwrap().get(&code("B1")), Some(1));
    }

    #[tokio::test]
    async fn insufficient_stock_changes_nothing() {
        let (store, coord) = setup(&[("B1", 2), ("B2", 1)]).await;

        let err = coord
            .execute(&alice(), &borrow(&[("B1", 1), ("B2", 2)]))
            .await
            .unwrap_err();
        assert_eq!(
            err,
            LoanError::Rejected(LendingError::StockUnavailable { code: code("B2") })
        );
        assert_eq!(err.to_string(), "invalid book code or insufficient stock: B2");
        assert_eq!(on_loan(&store, "B1").await, 0);
        assert!(matches!(
            coord.holdings(&user("alice")).await,
            Err(LoanError::Rejected(LendingError::NoHoldings { .. }))
        ));
        assert_eq!(coord.history(&user("alice"), Pagination::default()).await.unwrap().count, 0);
    }

    #[tokio::test]
    async fn return_without_loans_rolls_back_inventory() {
        let (store, coord) = setup(&[("B1", 2)]).await;
        coord
            .execute(&LoanActor::SelfService(user("bob")), &borrow(&[("B1", 1)]))
            .await
            .unwrap();

        // Inventory allows the return (bob's copy is out), the ledger does not.
        let err = coord.execute(&alice(), &give_back(&[("B1", 1)])).await.unwrap_err();
        assert!(matches!(
            err,
            LoanError::Rejected(LendingError::NoOutstandingLoans { .. })
        ));
        assert_eq!(on_loan(&store, "B1").await, 1);
    }

    #[tokio::test]
    async fn return_of_a_book_nobody_holds_is_an_underflow() {
        let (store, coord) = setup(&[("B1", 2)]).await;

        let err = coord.execute(&alice(), &give_back(&[("B1", 1)])).await.unwrap_err();
        assert_eq!(
            err,
            LoanError::Rejected(LendingError::LoanCountUnderflow { code: code("B1") })
        );
        assert_eq!(err.to_string(), "invalid book code or loan count underflow: B1");
        assert_eq!(on_loan(&store, "B1").await, 0);
    }

    #[tokio::test]
    async fn return_exceeding_holdings_is_rejected() {
        let (store, coord) = setup(&[("B1", 5)]).await;
        coord.execute(&alice(), &borrow(&[("B1", 1)])).await.unwrap();
        coord
            .execute(&LoanActor::SelfService(user("bob")), &borrow(&[("B1", 2)]))
            .await
            .unwrap();

        let err = coord.execute(&alice(), &give_back(&[("B1", 2)])).await.unwrap_err();
        assert!(matches!(
            err,
            LoanError::Rejected(LendingError::ExceedsHoldings { held: 1, requested: 2, .. })
        ));
        assert_eq!(on_loan(&store, "B1").await, 3);
    }

    #[tokio::test]
    async fn duplicate_lines_are_merged_but_recorded_as_sent() {
        let (store, coord) = setup(&[("B1", 3)]).await;
        let record = coord
            .execute(&alice(), &borrow(&[("B1", 1), ("B1", 2)]))
            .await
            .unwrap();

        assert_eq!(record.books.len(), 2);
        assert_eq!(on_loan(&store, "B1").await, 3);
        assert_eq!(coord.holdings(&user("alice")).await.unwrap().get(&code("B1")), Some(3));
    }

    #[tokio::test]
    async fn returning_everything_clears_the_ledger() {
        let (_store, coord) = setup(&[("B1", 1), ("B2", 1)]).await;
        coord.execute(&alice(), &borrow(&[("B1", 1), ("B2", 1)])).await.unwrap();
        coord.execute(&alice(), &give_back(&[("B2", 1), ("B1", 1)])).await.unwrap();

        assert!(matches!(
            coord.holdings(&user("alice")).await,
            Err(LoanError::Rejected(LendingError::NoHoldings { .. }))
        ));
        let history = coord.history(&user("alice"), Pagination::default()).await.unwrap();
        assert_eq!(history.count, 2);
        assert_eq!(history.items[0].action, LoanAction::Return);
    }

    #[tokio::test]
    async fn staff_checkout_books_against_target_with_operator() {
        let (_store, coord) = setup(&[("B1", 1)]).await;
        let actor = LoanActor::Staff {
            operator: user("staff"),
            target: user("bob"),
        };

        let record = coord.execute(&actor, &borrow(&[("B1", 1)])).await.unwrap();
        assert_eq!(record.username, user("bob"));
        assert_eq!(record.operator, Some(user("staff")));
        assert_eq!(coord.holdings(&user("bob")).await.unwrap().total_copies(), 1);
    }

    #[tokio::test]
    async fn unknown_and_deleted_accounts() {
        let (store, coord) = setup(&[("B1", 2)]).await;

        let ghost = LoanActor::SelfService(user("ghost"));
        assert_eq!(
            coord.execute(&ghost, &borrow(&[("B1", 1)])).await,
            Err(LoanError::Rejected(LendingError::UnknownUser(user("ghost"))))
        );

        coord.execute(&alice(), &borrow(&[("B1", 1)])).await.unwrap();
        store
            .change_account(
                &user("alice"),
                &shelfkeeper_auth::AccountChange {
                    state: "deleted".to_string(),
                    role: None,
                },
            )
            .await
            .unwrap();

        assert_eq!(
            coord.execute(&alice(), &borrow(&[("B1", 1)])).await,
            Err(LoanError::Rejected(LendingError::InactiveUser(user("alice"))))
        );
        coord.execute(&alice(), &give_back(&[("B1", 1)])).await.unwrap();
        assert_eq!(on_loan(&store, "B1").await, 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_borrows_never_exceed_stock() {
        let (store, coord) = setup(&[("B1", 5)]).await;
        let coord = Arc::new(coord);

        let mut tasks = Vec::new();
        for i in 0..20 {
            let coord = coord.clone();
            let who = if i % 2 == 0 { "alice" } else { "bob" };
            tasks.push(tokio::spawn(async move {
                coord
                    .execute(&LoanActor::SelfService(user(who)), &borrow(&[("B1", 1)]))
                    .await
            }));
        }

        let mut accepted = 0;
        for t in tasks {
            match t.await.unwrap() {
                Ok(_) => accepted += 1,
                Err(e) => assert_eq!(
                    e,
                    LoanError::Rejected(LendingError::StockUnavailable { code: code("B1") })
                ),
            }
        }

        assert_eq!(accepted, 5);
        assert_eq!(on_loan(&store, "B1").await, 5);
        let held = coord.holdings(&user("alice")).await.map(|h| h.total_copies()).unwrap_or(0)
            + coord.holdings(&user("bob")).await.map(|h| h.total_copies()).unwrap_or(0);
        assert_eq!(held, 5);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_requests_for_one_user_lose_no_updates() {
        let (store, coord) = setup(&[("B1", 100), ("B2", 100), ("B3", 100)]).await;
        let coord = Arc::new(coord);

        let mut tasks = Vec::new();
        for i in 0..30 {
            let coord = coord.clone();
            // Overlapping code sets in different submission orders.
            let pairs: Vec<(&str, i64)> = match i % 3 {
                0 => vec![("B3", 1), ("B1", 1)],
                1 => vec![("B1", 1), ("B2", 1)],
                _ => vec![("B2", 1), ("B3", 1)],
            };
            tasks.push(tokio::spawn(async move {
                coord.execute(&alice(), &borrow(&pairs)).await
            }));
        }
        for t in tasks {
            t.await.unwrap().unwrap();
        }

        let held = coord.holdings(&user("alice")).await.unwrap();
        assert_eq!(held.total_copies(), 60);
        for c in ["B1", "B2", "B3"] {
            assert_eq!(held.get(&code(c)), Some(20));
            assert_eq!(on_loan(&store, c).await, 20);
        }
        assert_eq!(coord.history(&user("alice"), Pagination::new(Some(100), None)).await.unwrap().count, 30);
    }

    #[tokio::test]
    async fn cancelled_request_leaves_no_partial_state() {
        let (store, coord) = setup(&[("B1", 2), ("B2", 2)]).await;

        // Block B2 so the request stalls after adjusting B1.
        let mut blocker = store.begin().await.unwrap();
        blocker.adjust_inventory(&code("B2"), 1, LoanAction::Borrow).await.unwrap();

        let who = alice();
        let request = borrow(&[("B1", 1), ("B2", 1)]);
        let attempt = coord.execute(&who, &request);
        let timed_out = tokio::time::timeout(std::time::Duration::from_millis(50), attempt).await;
        assert!(timed_out.is_err());

        blocker.rollback().await.unwrap();
        assert_eq!(on_loan(&store, "B1").await, 0);
        assert_eq!(on_loan(&store, "B2").await, 0);

        // Locks from the cancelled request were released.
        coord.execute(&alice(), &borrow(&[("B1", 2), ("B2", 2)])).await.unwrap();
    }
}
