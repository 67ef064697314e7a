//! Postgres-backed library store.
//!
//! ## Error Mapping
//!
//! | SQLx Error | PostgreSQL Error Code | StoreError |
//! |------------|----------------------|------------|
//! | Database (unique violation) | `23505` | `Conflict` |
//! | Database (check constraint violation) | `23514` | `Database` |
//! | Database (other) | Any other | `Database` |
//! | PoolClosed / PoolTimedOut / Io | N/A | `Unavailable` |
//! | Other | N/A | `Database` |
//!
//! ## Locking
//!
//! A unit of work is one transaction. Book rows are locked implicitly by the
//! conditional `UPDATE`; the user's ledger row is locked with a
//! transaction-scoped advisory lock keyed on the username (so that a row that
//! does not exist yet still serialises) followed by `SELECT ... FOR UPDATE`.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgPool, Postgres, Row, Transaction};
use tracing::{Span, instrument};
use uuid::Uuid;

use shelfkeeper_auth::{Account, AccountChange, AccountState, Role};
use shelfkeeper_core::{DomainError, RecordId, Username};
use shelfkeeper_lending::{Book, BookChange, BookCode, BookLine, BookState, Holdings, LoanAction, LoanRecord};

use super::query::{Page, PageRequest, Pagination};
use super::r#trait::{AccountStore, Adjustment, CatalogStore, LoanStore, StoreError, UnitOfWork};

const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS books (
        code TEXT PRIMARY KEY,
        name TEXT NOT NULL DEFAULT '',
        state TEXT NOT NULL CHECK (state IN ('active', 'deleted')),
        total_count BIGINT NOT NULL,
        borrow_count BIGINT NOT NULL DEFAULT 0,
        CONSTRAINT books_stock_bounds CHECK (0 <= borrow_count AND borrow_count <= total_count)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS accounts (
        username TEXT PRIMARY KEY,
        state TEXT NOT NULL CHECK (state IN ('active', 'deleted')),
        role TEXT NOT NULL,
        created_at TIMESTAMPTZ NOT NULL DEFAULT now()
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS user_loans (
        username TEXT PRIMARY KEY,
        books JSONB NOT NULL,
        updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS loan_records (
        id UUID PRIMARY KEY,
        action TEXT NOT NULL,
        username TEXT NOT NULL,
        operator TEXT,
        books JSONB NOT NULL,
        occurred_at TIMESTAMPTZ NOT NULL
    )
    "#,
    r#"
    CREATE INDEX IF NOT EXISTS loan_records_username_idx
        ON loan_records (username, occurred_at DESC)
    "#,
];

/// Persistent catalog, account and ledger store.
#[derive(Debug, Clone)]
pub struct PostgresLibraryStore {
    pool: Arc<PgPool>,
}

impl PostgresLibraryStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool: Arc::new(pool) }
    }

    /// Connect a pool and make sure the schema exists.
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .map_err(|e| map_sqlx_error("connect", e))?;
        let store = Self::new(pool);
        store.ensure_schema().await?;
        Ok(store)
    }

    /// Idempotently create tables and indexes.
    #[instrument(skip(self), err)]
    pub async fn ensure_schema(&self) -> Result<(), StoreError> {
        for stmt in SCHEMA {
            sqlx::query(stmt)
                .execute(&*self.pool)
                .await
                .map_err(|e| map_sqlx_error("ensure_schema", e))?;
        }
        Ok(())
    }
}

struct PostgresUnit {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl UnitOfWork for PostgresUnit {
    #[instrument(skip_all, fields(code = %code, operation = "adjust_inventory"), err)]
    async fn adjust_inventory(
        &mut self,
        code: &BookCode,
        count: i64,
        action: LoanAction,
    ) -> Result<Adjustment, StoreError> {
        let sql = match action {
            LoanAction::Borrow => {
                r#"
                UPDATE books SET borrow_count = borrow_count + $2
                WHERE code = $1 AND state = 'active' AND total_count - borrow_count >= $2
                "#
            }
            LoanAction::Return => {
                r#"
                UPDATE books SET borrow_count = borrow_count - $2
                WHERE code = $1 AND borrow_count >= $2
                "#
            }
        };

        let result = sqlx::query(sql)
            .bind(code.as_str())
            .bind(count)
            .execute(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("adjust_inventory", e))?;

        Ok(match result.rows_affected() {
            1 => Adjustment::Applied,
            _ => Adjustment::Rejected,
        })
    }

    #[instrument(skip_all, fields(username = %username, operation = "lock_holdings"), err)]
    async fn lock_holdings(&mut self, username: &Username) -> Result<Option<Holdings>, StoreError> {
        sqlx::query("SELECT pg_advisory_xact_lock(hashtextextended($1, 0))")
            .bind(username.as_str())
            .execute(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("lock_holdings", e))?;

        let row = sqlx::query("SELECT books FROM user_loans WHERE username = $1 FOR UPDATE")
            .bind(username.as_str())
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("lock_holdings", e))?;

        row.map(|r| holdings_from_row(&r)).transpose()
    }

    #[instrument(skip_all, fields(username = %username, operation = "store_holdings"), err)]
    async fn store_holdings(&mut self, username: &Username, holdings: &Holdings) -> Result<(), StoreError> {
        if holdings.is_empty() {
            sqlx::query("DELETE FROM user_loans WHERE username = $1")
                .bind(username.as_str())
                .execute(&mut *self.tx)
                .await
                .map_err(|e| map_sqlx_error("store_holdings", e))?;
            return Ok(());
        }

        sqlx::query(
            r#"
            INSERT INTO user_loans (username, books, updated_at)
            VALUES ($1, $2, now())
            ON CONFLICT (username) DO UPDATE SET books = EXCLUDED.books, updated_at = now()
            "#,
        )
        .bind(username.as_str())
        .bind(holdings_to_json(holdings))
        .execute(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("store_holdings", e))?;
        Ok(())
    }

    #[instrument(skip_all, fields(record_id = %record.id, operation = "append_record"), err)]
    async fn append_record(&mut self, record: &LoanRecord) -> Result<(), StoreError> {
        let books = serde_json::to_value(&record.books)
            .map_err(|e| StoreError::Database(format!("record serialization failed: {e}")))?;

        let result = sqlx::query(
            r#"
            INSERT INTO loan_records (id, action, username, operator, books, occurred_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(record.id.as_uuid())
        .bind(record.action.as_str())
        .bind(record.username.as_str())
        .bind(record.operator.as_ref().map(|o| o.as_str()))
        .bind(books)
        .bind(record.occurred_at)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("append_record", e))?;

        if result.rows_affected() != 1 {
            return Err(StoreError::Database(format!(
                "append_record affected {} rows",
                result.rows_affected()
            )));
        }
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        self.tx
            .commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))
    }

    async fn rollback(self: Box<Self>) -> Result<(), StoreError> {
        self.tx
            .rollback()
            .await
            .map_err(|e| map_sqlx_error("rollback", e))
    }
}

#[async_trait]
impl LoanStore for PostgresLibraryStore {
    async fn begin(&self) -> Result<Box<dyn UnitOfWork>, StoreError> {
        let tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;
        Ok(Box::new(PostgresUnit { tx }))
    }

    #[instrument(skip_all, fields(username = %username), err)]
    async fn holdings(&self, username: &Username) -> Result<Option<Holdings>, StoreError> {
        let row = sqlx::query("SELECT books FROM user_loans WHERE username = $1")
            .bind(username.as_str())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("holdings", e))?;
        row.map(|r| holdings_from_row(&r)).transpose()
    }

    #[instrument(skip_all, fields(username = %username, record_count = tracing::field::Empty), err)]
    async fn records(&self, username: &Username, pagination: Pagination) -> Result<Page<LoanRecord>, StoreError> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM loan_records WHERE username = $1")
            .bind(username.as_str())
            .fetch_one(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("records", e))?;

        let rows = sqlx::query(
            r#"
            SELECT id, action, username, operator, books, occurred_at
            FROM loan_records
            WHERE username = $1
            ORDER BY occurred_at DESC, id DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(username.as_str())
        .bind(i64::from(pagination.limit))
        .bind(i64::from(pagination.offset))
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("records", e))?;

        let items = rows.iter().map(record_from_row).collect::<Result<Vec<_>, _>>()?;
        Span::current().record("record_count", items.len());
        Ok(Page {
            count: total as u64,
            items,
        })
    }
}

#[async_trait]
impl CatalogStore for PostgresLibraryStore {
    #[instrument(skip_all, fields(code = %book.code), err)]
    async fn add_book(&self, book: &Book) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO books (code, name, state, total_count, borrow_count)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(book.code.as_str())
        .bind(&book.name)
        .bind(book.state.as_str())
        .bind(book.total)
        .bind(book.on_loan)
        .execute(&*self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                StoreError::Conflict(format!("duplicate book code: {}", book.code))
            } else {
                map_sqlx_error("add_book", e)
            }
        })?;
        Ok(())
    }

    #[instrument(skip_all, fields(code = %code), err)]
    async fn change_book(&self, code: &BookCode, change: &BookChange) -> Result<Book, StoreError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;

        let row = sqlx::query(
            "SELECT code, name, state, total_count, borrow_count FROM books WHERE code = $1 FOR UPDATE",
        )
        .bind(code.as_str())
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("change_book", e))?
        .ok_or_else(|| DomainError::not_found(format!("book {code}")))?;

        let changed = book_from_row(&row)?.apply_change(change)?;

        sqlx::query("UPDATE books SET name = $2, state = $3, total_count = $4 WHERE code = $1")
            .bind(code.as_str())
            .bind(&changed.name)
            .bind(changed.state.as_str())
            .bind(changed.total)
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("change_book", e))?;

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))?;
        Ok(changed)
    }

    #[instrument(skip_all, fields(code = %code), err)]
    async fn get_book(&self, code: &BookCode) -> Result<Option<Book>, StoreError> {
        let row = sqlx::query("SELECT code, name, state, total_count, borrow_count FROM books WHERE code = $1")
            .bind(code.as_str())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("get_book", e))?;
        row.map(|r| book_from_row(&r)).transpose()
    }

    #[instrument(skip(self), err)]
    async fn search_books(&self, keyword: &str, page: PageRequest) -> Result<Page<Book>, StoreError> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM books WHERE strpos(code || name, $1) > 0")
            .bind(keyword)
            .fetch_one(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("search_books", e))?;

        let rows = sqlx::query(
            r#"
            SELECT code, name, state, total_count, borrow_count
            FROM books
            WHERE strpos(code || name, $1) > 0
            ORDER BY code
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(keyword)
        .bind(i64::from(page.limit()))
        .bind(page.offset() as i64)
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("search_books", e))?;

        Ok(Page {
            count: total as u64,
            items: rows.iter().map(book_from_row).collect::<Result<_, _>>()?,
        })
    }
}

#[async_trait]
impl AccountStore for PostgresLibraryStore {
    #[instrument(skip_all, fields(username = %account.username), err)]
    async fn add_account(&self, account: &Account) -> Result<(), StoreError> {
        sqlx::query("INSERT INTO accounts (username, state, role) VALUES ($1, $2, $3)")
            .bind(account.username.as_str())
            .bind(account.state.as_str())
            .bind(account.role.as_str())
            .execute(&*self.pool)
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    StoreError::Conflict(format!("duplicate username: {}", account.username))
                } else {
                    map_sqlx_error("add_account", e)
                }
            })?;
        Ok(())
    }

    #[instrument(skip_all, fields(username = %username), err)]
    async fn change_account(&self, username: &Username, change: &AccountChange) -> Result<Account, StoreError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;

        let row = sqlx::query("SELECT username, state, role FROM accounts WHERE username = $1 FOR UPDATE")
            .bind(username.as_str())
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("change_account", e))?
            .ok_or_else(|| DomainError::not_found(format!("user {username}")))?;

        let changed = change.apply(&account_from_row(&row)?)?;

        sqlx::query("UPDATE accounts SET state = $2, role = $3 WHERE username = $1")
            .bind(username.as_str())
            .bind(changed.state.as_str())
            .bind(changed.role.as_str())
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("change_account", e))?;

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))?;
        Ok(changed)
    }

    #[instrument(skip_all, fields(username = %username), err)]
    async fn get_account(&self, username: &Username) -> Result<Option<Account>, StoreError> {
        let row = sqlx::query("SELECT username, state, role FROM accounts WHERE username = $1")
            .bind(username.as_str())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("get_account", e))?;
        row.map(|r| account_from_row(&r)).transpose()
    }

    #[instrument(skip(self), err)]
    async fn search_accounts(
        &self,
        keyword: &str,
        state: Option<AccountState>,
        page: PageRequest,
    ) -> Result<Page<Account>, StoreError> {
        let state = state.map(|s| s.as_str());

        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM accounts WHERE strpos(username, $1) > 0 AND ($2::text IS NULL OR state = $2)",
        )
        .bind(keyword)
        .bind(state)
        .fetch_one(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("search_accounts", e))?;

        let rows = sqlx::query(
            r#"
            SELECT username, state, role
            FROM accounts
            WHERE strpos(username, $1) > 0 AND ($2::text IS NULL OR state = $2)
            ORDER BY username
            LIMIT $3 OFFSET $4
            "#,
        )
        .bind(keyword)
        .bind(state)
        .bind(i64::from(page.limit()))
        .bind(page.offset() as i64)
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("search_accounts", e))?;

        Ok(Page {
            count: total as u64,
            items: rows.iter().map(account_from_row).collect::<Result<_, _>>()?,
        })
    }
}

fn holdings_to_json(holdings: &Holdings) -> serde_json::Value {
    let map: serde_json::Map<String, serde_json::Value> = holdings
        .iter()
        .map(|(code, count)| (code.as_str().to_string(), serde_json::Value::from(count)))
        .collect();
    serde_json::Value::Object(map)
}

fn holdings_from_row(row: &PgRow) -> Result<Holdings, StoreError> {
    let books: serde_json::Value = row.try_get("books").map_err(|e| map_sqlx_error("decode_holdings", e))?;
    let counts: BTreeMap<String, i64> =
        serde_json::from_value(books).map_err(|e| StoreError::Corrupt(format!("user_loans.books: {e}")))?;

    let lines = counts
        .into_iter()
        .map(|(code, count)| {
            let code = BookCode::parse(&code).map_err(|e| StoreError::Corrupt(e.to_string()))?;
            Ok(BookLine { code, count })
        })
        .collect::<Result<Vec<_>, StoreError>>()?;

    Holdings::from_lines(lines).map_err(|e| StoreError::Corrupt(format!("user_loans.books: {e}")))
}

fn book_from_row(row: &PgRow) -> Result<Book, StoreError> {
    let code: String = row.try_get("code").map_err(|e| map_sqlx_error("decode_book", e))?;
    let state: String = row.try_get("state").map_err(|e| map_sqlx_error("decode_book", e))?;
    Ok(Book {
        code: BookCode::parse(&code).map_err(|e| StoreError::Corrupt(e.to_string()))?,
        name: row.try_get("name").map_err(|e| map_sqlx_error("decode_book", e))?,
        state: state
            .parse::<BookState>()
            .map_err(|e| StoreError::Corrupt(e.to_string()))?,
        total: row.try_get("total_count").map_err(|e| map_sqlx_error("decode_book", e))?,
        on_loan: row.try_get("borrow_count").map_err(|e| map_sqlx_error("decode_book", e))?,
    })
}

fn account_from_row(row: &PgRow) -> Result<Account, StoreError> {
    let username: String = row.try_get("username").map_err(|e| map_sqlx_error("decode_account", e))?;
    let state: String = row.try_get("state").map_err(|e| map_sqlx_error("decode_account", e))?;
    let role: String = row.try_get("role").map_err(|e| map_sqlx_error("decode_account", e))?;
    Ok(Account {
        username: Username::parse(&username).map_err(|e| StoreError::Corrupt(e.to_string()))?,
        state: state
            .parse::<AccountState>()
            .map_err(|e| StoreError::Corrupt(e.to_string()))?,
        role: Role::new(role),
    })
}

fn record_from_row(row: &PgRow) -> Result<LoanRecord, StoreError> {
    let id: Uuid = row.try_get("id").map_err(|e| map_sqlx_error("decode_record", e))?;
    let action: String = row.try_get("action").map_err(|e| map_sqlx_error("decode_record", e))?;
    let username: String = row.try_get("username").map_err(|e| map_sqlx_error("decode_record", e))?;
    let operator: Option<String> = row.try_get("operator").map_err(|e| map_sqlx_error("decode_record", e))?;
    let books: serde_json::Value = row.try_get("books").map_err(|e| map_sqlx_error("decode_record", e))?;
    let occurred_at: DateTime<Utc> = row
        .try_get("occurred_at")
        .map_err(|e| map_sqlx_error("decode_record", e))?;

    let corrupt = |e: DomainError| StoreError::Corrupt(e.to_string());
    Ok(LoanRecord {
        id: RecordId::from_uuid(id),
        action: action.parse::<LoanAction>().map_err(|e| StoreError::Corrupt(e.to_string()))?,
        username: Username::parse(&username).map_err(corrupt)?,
        operator: operator.map(Username::parse).transpose().map_err(corrupt)?,
        books: serde_json::from_value(books).map_err(|e| StoreError::Corrupt(format!("loan_records.books: {e}")))?,
        occurred_at,
    })
}

fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) => {
            let msg = format!("database error in {}: {}", operation, db_err.message());
            match db_err.code().as_deref() {
                Some("23505") => StoreError::Conflict(msg),
                _ => StoreError::Database(msg),
            }
        }
        sqlx::Error::PoolClosed => StoreError::Unavailable(format!("connection pool closed in {operation}")),
        sqlx::Error::PoolTimedOut => StoreError::Unavailable(format!("connection pool timed out in {operation}")),
        sqlx::Error::Io(e) => StoreError::Unavailable(format!("io error in {operation}: {e}")),
        other => StoreError::Database(format!("{operation}: {other}")),
    }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    if let sqlx::Error::Database(db_err) = err {
        if let Some(code) = db_err.code() {
            return code.as_ref() == "23505";
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Runs only against a real database (`DATABASE_URL`).
    async fn connect() -> Option<PostgresLibraryStore> {
        let url = std::env::var("DATABASE_URL").ok()?;
        Some(
            PostgresLibraryStore::connect(&url, 5)
                .await
                .expect("failed to connect to DATABASE_URL"),
        )
    }

    #[tokio::test]
    async fn conditional_update_and_ledger_round_trip() {
        let Some(store) = connect().await else {
            eprintln!("DATABASE_URL not set; skipping postgres test");
            return;
        };

        let suffix = Uuid::now_v7().simple().to_string();
        let code = BookCode::parse(format!("PG-{suffix}")).unwrap();
        let username = Username::parse(format!("pg-user-{suffix}")).unwrap();
        store
            .add_book(&Book {
                code: code.clone(),
                name: "Postgres".to_string(),
                state: BookState::Active,
                total: 1,
                on_loan: 0,
            })
            .await
            .unwrap();

        let mut unit = store.begin().await.unwrap();
        assert_eq!(
            unit.adjust_inventory(&code, 1, LoanAction::Borrow).await.unwrap(),
            Adjustment::Applied
        );
        assert_eq!(
            unit.adjust_inventory(&code, 1, LoanAction::Borrow).await.unwrap(),
            Adjustment::Rejected
        );
        assert_eq!(unit.lock_holdings(&username).await.unwrap(), None);
        let held = Holdings::from_lines([BookLine {
            code: code.clone(),
            count: 1,
        }])
        .unwrap();
        unit.store_holdings(&username, &held).await.unwrap();
        unit.append_record(&LoanRecord {
            id: RecordId::new(),
            action: LoanAction::Borrow,
            username: username.clone(),
            operator: None,
            books: held.to_lines(),
            occurred_at: Utc::now(),
        })
        .await
        .unwrap();
        unit.commit().await.unwrap();

        assert_eq!(store.get_book(&code).await.unwrap().unwrap().on_loan, 1);
        assert_eq!(store.holdings(&username).await.unwrap(), Some(held));
        assert_eq!(
            store
                .records(&username, Pagination::default())
                .await
                .unwrap()
                .count,
            1
        );

        // A dropped unit rolls back its transaction.
        {
            let mut unit = store.begin().await.unwrap();
            unit.adjust_inventory(&code, 1, LoanAction::Return).await.unwrap();
        }
        assert_eq!(store.get_book(&code).await.unwrap().unwrap().on_loan, 1);
    }

    #[tokio::test]
    async fn huge_counts_are_rejected_not_overflowed() {
        let Some(store) = connect().await else {
            eprintln!("DATABASE_URL not set; skipping postgres test");
            return;
        };

        let code = BookCode::parse(format!("PG-{}", Uuid::now_v7().simple())).unwrap();
        store
            .add_book(&Book {
                code: code.clone(),
                name: "Huge".to_string(),
                state: BookState::Active,
                total: 3,
                on_loan: 1,
            })
            .await
            .unwrap();

        let mut unit = store.begin().await.unwrap();
        assert_eq!(
            unit.adjust_inventory(&code, i64::MAX, LoanAction::Borrow).await.unwrap(),
            Adjustment::Rejected
        );
        assert_eq!(
            unit.adjust_inventory(&code, i64::MAX, LoanAction::Return).await.unwrap(),
            Adjustment::Rejected
        );
        unit.rollback().await.unwrap();
    }
}
