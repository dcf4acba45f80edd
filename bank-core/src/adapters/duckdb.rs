//! DuckDB ledger store implementation

use std::path::Path;
use std::str::FromStr;
use std::sync::{Mutex, MutexGuard};
use std::thread;
use std::time::Duration;

use chrono::{DateTime, Utc};
use duckdb::{params, Connection, OptionalExt};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::domain::result::{Error, Result};
use crate::domain::{Account, NewTransaction, TransactionKind, TransactionRecord, User};
use crate::ports::{LedgerStore, UserStore};
use crate::services::{MigrationResult, MigrationService};

/// Maximum number of attempts when the database file is locked
const MAX_OPEN_RETRIES: u32 = 5;

/// Initial retry delay in milliseconds (doubles each retry: 50, 100, 200, 400ms)
const INITIAL_RETRY_DELAY_MS: u64 = 50;

const ACCOUNT_COLUMNS: &str =
    "account_number, owner_id, balance, version, created_at, updated_at";

const TRANSACTION_COLUMNS: &str =
    "transaction_id, from_account, to_account, amount, kind, timestamp_us";

/// Check if an error message indicates a file locking issue that should be retried
fn is_retryable_open_error(err_msg: &str) -> bool {
    let lower = err_msg.to_lowercase();
    lower.contains("being used by another process")
        || lower.contains("cannot access the file")
        || lower.contains("resource temporarily unavailable")
        || lower.contains("could not set lock")
        || lower.contains("database is locked")
}

/// DuckDB-backed ledger and user store
///
/// One connection per store, guarded by a mutex. Multi-record writes run
/// inside a DuckDB transaction and roll back if dropped before commit.
pub struct DuckDbStore {
    conn: Mutex<Connection>,
}

impl DuckDbStore {
    /// Open (or create) a store backed by a database file
    ///
    /// Retries with exponential backoff while another process holds the
    /// file lock.
    pub fn new(db_path: &Path) -> Result<Self> {
        let mut attempt = 0;
        loop {
            match Connection::open(db_path) {
                Ok(conn) => {
                    return Ok(Self {
                        conn: Mutex::new(conn),
                    });
                }
                Err(e) => {
                    let err_msg = e.to_string();
                    attempt += 1;
                    if !is_retryable_open_error(&err_msg) || attempt >= MAX_OPEN_RETRIES {
                        return Err(e.into());
                    }
                    let delay = Duration::from_millis(INITIAL_RETRY_DELAY_MS * 2u64.pow(attempt - 1));
                    tracing::warn!(
                        attempt,
                        max = MAX_OPEN_RETRIES,
                        delay_ms = delay.as_millis() as u64,
                        "database busy, retrying open: {err_msg}"
                    );
                    thread::sleep(delay);
                }
            }
        }
    }

    /// Open a throwaway in-memory store
    pub fn open_in_memory() -> Result<Self> {
        Ok(Self {
            conn: Mutex::new(Connection::open_in_memory()?),
        })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| Error::database(format!("Lock poisoned: {e}")))
    }

    /// Run pending schema migrations
    pub fn run_migrations(&self) -> Result<MigrationResult> {
        let conn = self.conn()?;
        MigrationService::new(&conn).run_pending()
    }

    /// Ensure database schema exists (runs pending migrations)
    pub fn ensure_schema(&self) -> Result<()> {
        self.run_migrations()?;
        Ok(())
    }

    // === Statistics ===

    pub fn count_users(&self) -> Result<i64> {
        self.count("SELECT COUNT(*) FROM sys_users")
    }

    pub fn count_accounts(&self) -> Result<i64> {
        self.count("SELECT COUNT(*) FROM sys_accounts")
    }

    pub fn count_transactions(&self) -> Result<i64> {
        self.count("SELECT COUNT(*) FROM sys_transactions")
    }

    fn count(&self, sql: &str) -> Result<i64> {
        let conn = self.conn()?;
        let count: i64 = conn.query_row(sql, [], |row| row.get(0))?;
        Ok(count)
    }

    /// Sum of all account balances, computed exactly in Rust
    pub fn total_balance(&self) -> Result<Decimal> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare("SELECT balance FROM sys_accounts")?;
        let balances = stmt.query_map([], |row| row.get::<_, String>(0))?;

        let mut total = Decimal::ZERO;
        for balance in balances {
            let balance = parse_decimal(&balance?)?;
            total = total
                .checked_add(balance)
                .ok_or_else(|| Error::database("total balance overflow"))?;
        }
        Ok(total)
    }

    // === Statement helpers (usable inside an open transaction) ===

    fn select_account(conn: &Connection, column: &str, key: &str) -> Result<Option<Account>> {
        let sql = format!("SELECT {ACCOUNT_COLUMNS} FROM sys_accounts WHERE {column} = ?");
        let row = conn
            .query_row(&sql, [key], |row| {
                Ok(AccountRow {
                    account_number: row.get(0)?,
                    owner_id: row.get(1)?,
                    balance: row.get(2)?,
                    version: row.get(3)?,
                    created_at: row.get(4)?,
                    updated_at: row.get(5)?,
                })
            })
            .optional()?;

        row.map(AccountRow::into_account).transpose()
    }

    fn insert_account(conn: &Connection, account: &Account) -> Result<()> {
        conn.execute(
            &format!("INSERT INTO sys_accounts ({ACCOUNT_COLUMNS}) VALUES (?, ?, ?, ?, ?, ?)"),
            params![
                account.account_number,
                account.owner_id.to_string(),
                account.balance.to_string(),
                account.version,
                account.created_at.timestamp_micros(),
                account.updated_at.timestamp_micros(),
            ],
        )?;
        Ok(())
    }

    /// Version-checked balance write
    fn write_balance(conn: &Connection, account: &Account) -> Result<()> {
        let updated = conn.execute(
            "UPDATE sys_accounts
             SET balance = ?, version = version + 1, updated_at = ?
             WHERE account_number = ? AND version = ?",
            params![
                account.balance.to_string(),
                account.updated_at.timestamp_micros(),
                account.account_number,
                account.version,
            ],
        )?;

        if updated != 1 {
            return Err(Error::conflict(format!(
                "account {} was modified concurrently",
                account.account_number
            )));
        }
        Ok(())
    }

    fn insert_transaction(conn: &Connection, tx: &NewTransaction) -> Result<TransactionRecord> {
        let id: i64 = conn.query_row("SELECT nextval('seq_transaction_id')", [], |row| row.get(0))?;

        conn.execute(
            &format!("INSERT INTO sys_transactions ({TRANSACTION_COLUMNS}) VALUES (?, ?, ?, ?, ?, ?)"),
            params![
                id,
                tx.from_account,
                tx.to_account,
                tx.amount.to_string(),
                tx.kind.as_str(),
                tx.timestamp.timestamp_micros(),
            ],
        )?;

        Ok(tx.clone().into_record(id))
    }

    fn select_user(conn: &Connection, column: &str, key: &str) -> Result<Option<User>> {
        let sql = format!(
            "SELECT user_id, username, email, password_hash, created_at FROM sys_users WHERE {column} = ?"
        );
        let row = conn
            .query_row(&sql, [key], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, Option<String>>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, i64>(4)?,
                ))
            })
            .optional()?;

        row.map(|(id, username, email, password_hash, created_at)| {
            Ok(User {
                id: parse_uuid(&id)?,
                username,
                email,
                password_hash,
                created_at: parse_micros(created_at)?,
            })
        })
        .transpose()
    }
}

impl LedgerStore for DuckDbStore {
    fn get_account_by_user(&self, user_id: Uuid) -> Result<Option<Account>> {
        let conn = self.conn()?;
        Self::select_account(&conn, "owner_id", &user_id.to_string())
    }

    fn get_account_by_number(&self, account_number: &str) -> Result<Option<Account>> {
        let conn = self.conn()?;
        Self::select_account(&conn, "account_number", account_number)
    }

    fn create_account_if_absent(&self, account: &Account) -> Result<Account> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        let owner = account.owner_id.to_string();

        if let Some(existing) = Self::select_account(&tx, "owner_id", &owner)? {
            return Ok(existing);
        }
        if Self::select_account(&tx, "account_number", &account.account_number)?.is_some() {
            return Err(Error::conflict(format!(
                "account number {} is already taken",
                account.account_number
            )));
        }

        Self::insert_account(&tx, account)?;
        let created = Self::select_account(&tx, "owner_id", &owner)?;
        tx.commit()?;

        created.ok_or_else(|| Error::database("account vanished after insert"))
    }

    fn save_account(&self, account: &Account) -> Result<Account> {
        let conn = self.conn()?;
        Self::write_balance(&conn, account)?;
        Ok(Account {
            version: account.version + 1,
            ..account.clone()
        })
    }

    fn append_transaction(&self, tx: &NewTransaction) -> Result<TransactionRecord> {
        let conn = self.conn()?;
        Self::insert_transaction(&conn, tx)
    }

    fn commit_transfer(
        &self,
        debit: &Account,
        credit: &Account,
        tx: &NewTransaction,
    ) -> Result<TransactionRecord> {
        let mut conn = self.conn()?;
        let db_tx = conn.transaction()?;

        // Any failure below drops db_tx, which rolls back every write so far
        Self::write_balance(&db_tx, debit)?;
        Self::write_balance(&db_tx, credit)?;
        let record = Self::insert_transaction(&db_tx, tx)?;

        db_tx.commit()?;
        tracing::debug!(
            transaction_id = record.id,
            from = %record.from_account,
            to = %record.to_account,
            "transfer committed"
        );
        Ok(record)
    }

    fn list_transactions_for_account(&self, account_number: &str) -> Result<Vec<TransactionRecord>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {TRANSACTION_COLUMNS} FROM sys_transactions
             WHERE from_account = ? OR to_account = ?
             ORDER BY timestamp_us DESC, transaction_id DESC"
        ))?;

        let rows = stmt.query_map(params![account_number, account_number], |row| {
            Ok(TransactionRow {
                id: row.get(0)?,
                from_account: row.get(1)?,
                to_account: row.get(2)?,
                amount: row.get(3)?,
                kind: row.get(4)?,
                timestamp_us: row.get(5)?,
            })
        })?;

        let mut records = Vec::new();
        for row in rows {
            records.push(row?.into_record()?);
        }
        Ok(records)
    }
}

impl UserStore for DuckDbStore {
    fn insert_user(&self, user: &User) -> Result<()> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;

        if Self::select_user(&tx, "username", &user.username)?.is_some() {
            return Err(Error::validation("Username already exists"));
        }

        tx.execute(
            "INSERT INTO sys_users (user_id, username, email, password_hash, created_at)
             VALUES (?, ?, ?, ?, ?)",
            params![
                user.id.to_string(),
                user.username,
                user.email,
                user.password_hash,
                user.created_at.timestamp_micros(),
            ],
        )?;
        tx.commit()?;
        Ok(())
    }

    fn get_user_by_username(&self, username: &str) -> Result<Option<User>> {
        let conn = self.conn()?;
        Self::select_user(&conn, "username", username)
    }

    fn get_user_by_id(&self, id: Uuid) -> Result<Option<User>> {
        let conn = self.conn()?;
        Self::select_user(&conn, "user_id", &id.to_string())
    }

    fn insert_session(&self, token_digest: &str, user_id: Uuid) -> Result<()> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO sys_sessions (token_digest, user_id, created_at) VALUES (?, ?, ?)",
            params![token_digest, user_id.to_string(), Utc::now().timestamp_micros()],
        )?;
        Ok(())
    }

    fn get_session_user(&self, token_digest: &str) -> Result<Option<Uuid>> {
        let conn = self.conn()?;
        let user_id: Option<String> = conn
            .query_row(
                "SELECT user_id FROM sys_sessions WHERE token_digest = ?",
                [token_digest],
                |row| row.get(0),
            )
            .optional()?;

        user_id.as_deref().map(parse_uuid).transpose()
    }

    fn delete_session(&self, token_digest: &str) -> Result<bool> {
        let conn = self.conn()?;
        let deleted = conn.execute("DELETE FROM sys_sessions WHERE token_digest = ?", [token_digest])?;
        Ok(deleted > 0)
    }
}

// Row types

struct AccountRow {
    account_number: String,
    owner_id: String,
    balance: String,
    version: i64,
    created_at: i64,
    updated_at: i64,
}

impl AccountRow {
    fn into_account(self) -> Result<Account> {
        Ok(Account {
            owner_id: parse_uuid(&self.owner_id)?,
            balance: parse_decimal(&self.balance)?,
            version: self.version,
            created_at: parse_micros(self.created_at)?,
            updated_at: parse_micros(self.updated_at)?,
            account_number: self.account_number,
        })
    }
}

struct TransactionRow {
    id: i64,
    from_account: String,
    to_account: String,
    amount: String,
    kind: String,
    timestamp_us: i64,
}

impl TransactionRow {
    fn into_record(self) -> Result<TransactionRecord> {
        Ok(TransactionRecord {
            id: self.id,
            amount: parse_decimal(&self.amount)?,
            kind: TransactionKind::from_str(&self.kind)?,
            timestamp: parse_micros(self.timestamp_us)?,
            from_account: self.from_account,
            to_account: self.to_account,
        })
    }
}

// Helper functions

fn parse_decimal(s: &str) -> Result<Decimal> {
    Decimal::from_str(s).map_err(|e| Error::database(format!("corrupt decimal '{s}': {e}")))
}

fn parse_uuid(s: &str) -> Result<Uuid> {
    Uuid::parse_str(s).map_err(|e| Error::database(format!("corrupt id '{s}': {e}")))
}

fn parse_micros(us: i64) -> Result<DateTime<Utc>> {
    DateTime::from_timestamp_micros(us)
        .ok_or_else(|| Error::database(format!("timestamp out of range: {us}")))
}
