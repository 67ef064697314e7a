use std::collections::{BTreeMap, HashMap};
use std::hash::Hash;
use std::sync::{Arc, Mutex, RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use tokio::sync::{Mutex as RowLock, OwnedMutexGuard};

use shelfkeeper_auth::{Account, AccountChange, AccountState};
use shelfkeeper_core::{DomainError, Username};
use shelfkeeper_lending::{Book, BookChange, BookCode, Holdings, LoanAction, LoanRecord};

use super::query::{Page, PageRequest, Pagination};
use super::r#trait::{AccountStore, Adjustment, CatalogStore, LoanStore, StoreError, UnitOfWork};

type RowGuard = OwnedMutexGuard<()>;

/// Lazily created async row locks, one per key.
///
/// An entry lives only while some unit holds or waits for it.
#[derive(Debug)]
struct RowLocks<K> {
    rows: Mutex<HashMap<K, Arc<RowLock<()>>>>,
}

impl<K> Default for RowLocks<K> {
    fn default() -> Self {
        Self {
            rows: Mutex::new(HashMap::new()),
        }
    }
}

impl<K: Eq + Hash + Clone> RowLocks<K> {
    async fn acquire(&self, key: &K) -> RowGuard {
        let row = {
            let mut rows = self.rows.lock().unwrap_or_else(|e| e.into_inner());
            rows.entry(key.clone())
                .or_insert_with(|| Arc::new(RowLock::new(())))
                .clone()
        };
        row.lock_owned().await
    }

    /// Unlock `key` and forget it when nobody else holds or waits for it.
    fn release(&self, key: &K, guard: RowGuard) {
        drop(guard);
        let mut rows = self.rows.lock().unwrap_or_else(|e| e.into_inner());
        if rows.get(key).is_some_and(|row| Arc::strong_count(row) == 1) {
            rows.remove(key);
        }
    }

    #[cfg(test)]
    fn tracked(&self) -> usize {
        self.rows.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}

#[derive(Debug, Default)]
struct State {
    books: BTreeMap<BookCode, Book>,
    accounts: BTreeMap<Username, Account>,
    holdings: HashMap<Username, Holdings>,
    records: Vec<LoanRecord>,
}

#[derive(Debug, Default)]
struct Shared {
    state: RwLock<State>,
    book_rows: RowLocks<BookCode>,
    user_rows: RowLocks<Username>,
}

impl Shared {
    fn read(&self) -> Result<RwLockReadGuard<'_, State>, StoreError> {
        self.state
            .read()
            .map_err(|_| StoreError::Unavailable("lock poisoned".to_string()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, State>, StoreError> {
        self.state
            .write()
            .map_err(|_| StoreError::Unavailable("lock poisoned".to_string()))
    }

    fn book(&self, code: &BookCode) -> Result<Option<Book>, StoreError> {
        Ok(self.read()?.books.get(code).cloned())
    }

    fn has_record(&self, record: &LoanRecord) -> Result<bool, StoreError> {
        Ok(self.read()?.records.iter().any(|r| r.id == record.id))
    }

    fn committed_holdings(&self, username: &Username) -> Result<Option<Holdings>, StoreError> {
        Ok(self.read()?.holdings.get(username).cloned())
    }
}

/// In-memory catalog, account and ledger store.
///
/// Intended for tests/dev. Units of work take async row locks (books first,
/// then the user) and stage their writes; readers only see committed state.
#[derive(Debug, Clone, Default)]
pub struct InMemoryLibraryStore {
    shared: Arc<Shared>,
}

impl InMemoryLibraryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

struct InMemoryUnit {
    shared: Arc<Shared>,
    book_guards: HashMap<BookCode, RowGuard>,
    user_guards: HashMap<Username, RowGuard>,
    on_loan: BTreeMap<BookCode, i64>,
    holdings: HashMap<Username, Holdings>,
    records: Vec<LoanRecord>,
}

impl InMemoryUnit {
    fn new(shared: Arc<Shared>) -> Self {
        Self {
            shared,
            book_guards: HashMap::new(),
            user_guards: HashMap::new(),
            on_loan: BTreeMap::new(),
            holdings: HashMap::new(),
            records: Vec::new(),
        }
    }

    async fn lock_book(&mut self, code: &BookCode) {
        if !self.book_guards.contains_key(code) {
            let guard = self.shared.book_rows.acquire(code).await;
            self.book_guards.insert(code.clone(), guard);
        }
    }

    async fn lock_user(&mut self, username: &Username) {
        if !self.user_guards.contains_key(username) {
            let guard = self.shared.user_rows.acquire(username).await;
            self.user_guards.insert(username.clone(), guard);
        }
    }
}

#[async_trait]
impl UnitOfWork for InMemoryUnit {
    async fn adjust_inventory(
        &mut self,
        code: &BookCode,
        count: i64,
        action: LoanAction,
    ) -> Result<Adjustment, StoreError> {
        // Books are never removed, so an unknown code needs no row lock.
        if self.shared.book(code)?.is_none() {
            return Ok(Adjustment::Rejected);
        }
        self.lock_book(code).await;

        let Some(mut book) = self.shared.book(code)? else {
            return Ok(Adjustment::Rejected);
        };
        if let Some(staged) = self.on_loan.get(code) {
            book.on_loan = *staged;
        }

        match book.adjusted_on_loan(action, count) {
            Some(on_loan) => {
                self.on_loan.insert(code.clone(), on_loan);
                Ok(Adjustment::Applied)
            }
            None => Ok(Adjustment::Rejected),
        }
    }

    async fn lock_holdings(&mut self, username: &Username) -> Result<Option<Holdings>, StoreError> {
        self.lock_user(username).await;

        if let Some(staged) = self.holdings.get(username) {
            return Ok((!staged.is_empty()).then(|| staged.clone()));
        }
        self.shared.committed_holdings(username)
    }

    async fn store_holdings(&mut self, username: &Username, holdings: &Holdings) -> Result<(), StoreError> {
        self.lock_user(username).await;
        self.holdings.insert(username.clone(), holdings.clone());
        Ok(())
    }

    async fn append_record(&mut self, record: &LoanRecord) -> Result<(), StoreError> {
        if self.records.iter().any(|r| r.id == record.id) || self.shared.has_record(record)? {
            return Err(StoreError::Database(format!(
                "loan record {} already exists",
                record.id
            )));
        }
        self.records.push(record.clone());
        Ok(())
    }

    async fn commit(mut self: Box<Self>) -> Result<(), StoreError> {
        let holdings = std::mem::take(&mut self.holdings);
        let records = std::mem::take(&mut self.records);
        let mut state = self.shared.write()?;
        for (code, on_loan) in &self.on_loan {
            // The row lock is held, so the book cannot have been removed.
            if let Some(book) = state.books.get_mut(code) {
                book.on_loan = *on_loan;
            }
        }
        for (username, holdings) in holdings {
            if holdings.is_empty() {
                state.holdings.remove(&username);
            } else {
                state.holdings.insert(username, holdings);
            }
        }
        state.records.extend(records);
        drop(state);
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), StoreError> {
        Ok(())
    }
}

impl Drop for InMemoryUnit {
    fn drop(&mut self) {
        for (code, guard) in self.book_guards.drain() {
            self.shared.book_rows.release(&code, guard);
        }
        for (username, guard) in self.user_guards.drain() {
            self.shared.user_rows.release(&username, guard);
        }
    }
}

#[async_trait]
impl LoanStore for InMemoryLibraryStore {
    async fn begin(&self) -> Result<Box<dyn UnitOfWork>, StoreError> {
        Ok(Box::new(InMemoryUnit::new(self.shared.clone())))
    }

    async fn holdings(&self, username: &Username) -> Result<Option<Holdings>, StoreError> {
        self.shared.committed_holdings(username)
    }

    async fn records(&self, username: &Username, pagination: Pagination) -> Result<Page<LoanRecord>, StoreError> {
        let state = self.shared.read()?;
        let mine: Vec<LoanRecord> = state
            .records
            .iter()
            .rev()
            .filter(|r| &r.username == username)
            .cloned()
            .collect();
        Ok(Page::slice(mine, u64::from(pagination.offset), pagination.limit))
    }
}

#[async_trait]
impl CatalogStore for InMemoryLibraryStore {
    async fn add_book(&self, book: &Book) -> Result<(), StoreError> {
        let mut state = self.shared.write()?;
        if state.books.contains_key(&book.code) {
            return Err(StoreError::Conflict(format!("duplicate book code: {}", book.code)));
        }
        state.books.insert(book.code.clone(), book.clone());
        Ok(())
    }

    async fn change_book(&self, code: &BookCode, change: &BookChange) -> Result<Book, StoreError> {
        if self.shared.book(code)?.is_none() {
            return Err(DomainError::not_found(format!("book {code}")).into());
        }
        let row = self.shared.book_rows.acquire(code).await;

        let changed = self.shared.write().and_then(|mut state| {
            let current = state
                .books
                .get(code)
                .ok_or_else(|| DomainError::not_found(format!("book {code}")))?;
            let changed = current.apply_change(change)?;
            state.books.insert(code.clone(), changed.clone());
            Ok(changed)
        });
        self.shared.book_rows.release(code, row);
        changed
    }

    async fn get_book(&self, code: &BookCode) -> Result<Option<Book>, StoreError> {
        self.shared.book(code)
    }

    async fn search_books(&self, keyword: &str, page: PageRequest) -> Result<Page<Book>, StoreError> {
        let state = self.shared.read()?;
        let matches: Vec<Book> = state
            .books
            .values()
            .filter(|b| format!("{}{}", b.code, b.name).contains(keyword))
            .cloned()
            .collect();
        Ok(Page::slice(matches, page.offset(), page.limit()))
    }
}

#[async_trait]
impl AccountStore for InMemoryLibraryStore {
    async fn add_account(&self, account: &Account) -> Result<(), StoreError> {
        let mut state = self.shared.write()?;
        if state.accounts.contains_key(&account.username) {
            return Err(StoreError::Conflict(format!("duplicate username: {}", account.username)));
        }
        state.accounts.insert(account.username.clone(), account.clone());
        Ok(())
    }

    async fn change_account(&self, username: &Username, change: &AccountChange) -> Result<Account, StoreError> {
        let mut state = self.shared.write()?;
        let current = state
            .accounts
            .get(username)
            .ok_or_else(|| DomainError::not_found(format!("user {username}")))?;
        let changed = change.apply(current)?;
        state.accounts.insert(username.clone(), changed.clone());
        Ok(changed)
    }

    async fn get_account(&self, username: &Username) -> Result<Option<Account>, StoreError> {
        Ok(self.shared.read()?.accounts.get(username).cloned())
    }

    async fn search_accounts(
        &self,
        keyword: &str,
        state: Option<AccountState>,
        page: PageRequest,
    ) -> Result<Page<Account>, StoreError> {
        let guard = self.shared.read()?;
        let matches: Vec<Account> = guard
            .accounts
            .values()
            .filter(|a| a.username.as_str().contains(keyword))
            .filter(|a| state.is_none_or(|s| a.state == s))
            .cloned()
            .collect();
        Ok(Page::slice(matches, page.offset(), page.limit()))
    }
}
