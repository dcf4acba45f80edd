//! Migration service - brings a database schema up to date
//!
//! A migration set is an ordered list of `(name, sql)` pairs embedded at
//! compile time. The first entry must create `sys_migrations`; every applied
//! name is recorded there. Each migration and its record commit together.

use duckdb::Connection;

use crate::domain::result::{Error, Result};
use crate::migrations::MIGRATIONS;

const BOOTSTRAP_MIGRATION: &str = "000_migrations.sql";

pub type MigrationSet = &'static [(&'static str, &'static str)];

/// Outcome of [`MigrationService::run_pending`]
#[derive(Debug)]
pub struct MigrationResult {
    /// Names applied by this run, in order
    pub applied: Vec<String>,
    /// Migrations in the set that were already recorded
    pub already_applied: usize,
}

pub struct MigrationService<'a> {
    conn: &'a Connection,
    migrations: MigrationSet,
}

impl<'a> MigrationService<'a> {
    /// Migrations for the ledger database
    pub fn new(conn: &'a Connection) -> Self {
        Self::with_migrations(conn, MIGRATIONS)
    }

    pub fn with_migrations(conn: &'a Connection, migrations: MigrationSet) -> Self {
        Self { conn, migrations }
    }

    pub fn run_pending(&self) -> Result<MigrationResult> {
        let (_, bootstrap) = self
            .migrations
            .iter()
            .find(|(name, _)| *name == BOOTSTRAP_MIGRATION)
            .ok_or_else(|| Error::database("migration set has no bootstrap migration"))?;
        // Tracking table must exist before it can be queried
        self.conn.execute_batch(bootstrap)?;

        let recorded = self.get_applied()?;
        let mut result = MigrationResult {
            applied: Vec::new(),
            already_applied: 0,
        };

        for (name, sql) in self.migrations {
            if recorded.iter().any(|r| r == name) {
                result.already_applied += 1;
                continue;
            }
            self.apply(name, sql)?;
            tracing::debug!(migration = *name, "applied migration");
            result.applied.push(name.to_string());
        }

        Ok(result)
    }

    fn apply(&self, name: &str, sql: &str) -> Result<()> {
        self.conn.execute_batch("BEGIN TRANSACTION")?;

        let outcome = self.conn.execute_batch(sql).and_then(|_| {
            self.conn
                .execute("INSERT INTO sys_migrations (migration_name) VALUES (?)", [name])
                .map(|_| ())
        });

        match outcome {
            Ok(()) => {
                self.conn.execute_batch("COMMIT")?;
                Ok(())
            }
            Err(e) => {
                if let Err(rollback) = self.conn.execute_batch("ROLLBACK") {
                    tracing::warn!(migration = name, "rollback failed: {rollback}");
                }
                Err(Error::database(format!("migration {name} failed: {e}")))
            }
        }
    }

    /// Recorded migration names, sorted
    pub fn get_applied(&self) -> Result<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT migration_name FROM sys_migrations ORDER BY migration_name")?;
        let names = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(names)
    }

    /// Names in the set that are not yet recorded
    pub fn get_pending(&self) -> Result<Vec<String>> {
        let recorded = self.get_applied()?;
        Ok(self
            .migrations
            .iter()
            .map(|(name, _)| name.to_string())
            .filter(|name| !recorded.contains(name))
            .collect())
    }
}
