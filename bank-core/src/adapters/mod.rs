//! Adapter implementations
//!
//! Adapters implement the port traits with concrete technologies:
//! - DuckDB for both `LedgerStore` and `UserStore`
//! - A scripted wrapper store for injecting commit failures in tests

pub mod duckdb;

#[cfg(test)]
pub mod mock;
