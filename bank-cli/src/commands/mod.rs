//! CLI command implementations

pub mod account;
pub mod auth;
pub mod history;
pub mod logs;
pub mod status;
pub mod transfer;

use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use serde::Serialize;
use uuid::Uuid;

use bank_core::services::{EntryPoint, LogEvent, LoggingService};
use bank_core::{BankContext, Error, OperationResult};

/// Get the logging service for CLI operations
///
/// Returns None if logging fails to initialize (shouldn't block operations)
pub fn get_logger() -> Option<LoggingService> {
    let bank_dir = get_bank_dir().ok()?;
    std::fs::create_dir_all(&bank_dir).ok()?;
    LoggingService::new(&bank_dir, EntryPoint::Cli, env!("CARGO_PKG_VERSION")).ok()
}

/// Log an event, ignoring any errors (logging should never break the app)
pub fn log_event(logger: &Option<LoggingService>, event: LogEvent) {
    if let Some(l) = logger {
        if let Err(e) = l.log(event) {
            tracing::debug!("event log write failed: {e}");
        }
    }
}

/// Log that a command ran
pub fn log_command(logger: &Option<LoggingService>, command: &str) {
    log_event(logger, LogEvent::new("command_executed").with_command(command));
}

/// Get the bank directory from `BANK_DIR` or `~/.bank`
pub fn get_bank_dir() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var("BANK_DIR") {
        return Ok(PathBuf::from(dir));
    }
    dirs::home_dir()
        .map(|home| home.join(".bank"))
        .ok_or_else(|| anyhow!("Could not find home directory; set BANK_DIR"))
}

/// Open the bank, creating it on first use
pub fn get_context() -> Result<BankContext> {
    let bank_dir = get_bank_dir()?;
    BankContext::new(&bank_dir)
        .with_context(|| format!("Failed to open bank at {}", bank_dir.display()))
}

/// Resolve the session token to a user id
pub fn require_caller(ctx: &BankContext, token: Option<&str>) -> bank_core::domain::result::Result<Uuid> {
    let token = token.ok_or(Error::Unauthenticated)?;
    ctx.auth_service.resolve_caller(token)
}

/// Print a core outcome and turn a rejection into a CLI failure
///
/// With `json` the outcome is printed as an `OperationResult` either way;
/// otherwise `render` prints the success case.
pub fn report<T: Serialize>(
    result: bank_core::domain::result::Result<T>,
    json: bool,
    render: impl FnOnce(&T),
) -> Result<()> {
    match result {
        Ok(data) => {
            if json {
                println!("{}", serde_json::to_string_pretty(&OperationResult::ok(&data))?);
            } else {
                render(&data);
            }
            Ok(())
        }
        Err(e) => {
            if json {
                let failed: OperationResult<()> = OperationResult::fail(&e);
                println!("{}", serde_json::to_string_pretty(&failed)?);
            }
            Err(e.into())
        }
    }
}
