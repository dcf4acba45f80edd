//! Logs command - view and manage the event log

use anyhow::Result;
use chrono::{Duration, Utc};
use clap::Subcommand;
use colored::Colorize;
use dialoguer::Confirm;
use serde::Serialize;

use bank_core::services::{EntryPoint, LoggingService};

use super::get_bank_dir;
use crate::output;

#[derive(Subcommand)]
pub enum LogsCommands {
    /// Show recent log entries
    List {
        /// Number of entries to show
        #[arg(short, long, default_value = "50")]
        limit: usize,
        /// Show only errors
        #[arg(long)]
        errors: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Clear old log entries
    Clear {
        /// Delete logs older than N days
        #[arg(long, default_value = "30")]
        older_than_days: i64,
        /// Skip confirmation prompt
        #[arg(long, short = 'f')]
        force: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show log statistics and database path
    Stats {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

fn get_logging_service() -> Result<LoggingService> {
    let bank_dir = get_bank_dir()?;
    std::fs::create_dir_all(&bank_dir)?;
    LoggingService::new(&bank_dir, EntryPoint::Cli, env!("CARGO_PKG_VERSION"))
}

#[derive(Serialize)]
struct LogStats {
    total_entries: u64,
    error_count: usize,
    database_path: String,
    database_size_bytes: u64,
}

pub fn run(command: LogsCommands) -> Result<()> {
    let service = get_logging_service()?;

    match command {
        LogsCommands::List { limit, errors, json } => list(&service, limit, errors, json),
        LogsCommands::Clear {
            older_than_days,
            force,
            json,
        } => clear(&service, older_than_days, force, json),
        LogsCommands::Stats { json } => stats(&service, json),
    }
}

fn list(service: &LoggingService, limit: usize, errors_only: bool, json: bool) -> Result<()> {
    let entries = if errors_only {
        service.get_errors(limit)?
    } else {
        service.get_recent(limit)?
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }
    if entries.is_empty() {
        println!("No log entries found.");
        return Ok(());
    }

    let mut table = output::create_table();
    table.set_header(vec!["Time", "Entry", "Event", "Command", "Error"]);
    for entry in entries {
        let error = match (&entry.error_code, &entry.error_message) {
            (Some(code), _) => code.red().to_string(),
            (None, Some(_)) => "!".red().to_string(),
            (None, None) => String::new(),
        };
        table.add_row(vec![
            output::format_timestamp_ms(entry.timestamp),
            entry.entry_point,
            entry.event,
            entry.command.unwrap_or_default(),
            error,
        ]);
    }
    println!("{}", table);

    if errors_only {
        return Ok(());
    }
    let recent_errors = service.get_errors(3)?;
    if !recent_errors.is_empty() {
        println!();
        println!("{}", "Recent Errors:".red().bold());
        for err in &recent_errors {
            println!(
                "  {} [{}]: {}",
                output::format_timestamp_ms(err.timestamp).dimmed(),
                err.event,
                err.error_message.as_deref().unwrap_or("Unknown error")
            );
        }
    }
    Ok(())
}

fn clear(service: &LoggingService, older_than_days: i64, force: bool, json: bool) -> Result<()> {
    let cutoff_ms = (Utc::now() - Duration::days(older_than_days)).timestamp_millis();

    if !force && !json {
        let confirmed = Confirm::new()
            .with_prompt(format!("Delete logs older than {} days?", older_than_days))
            .default(false)
            .interact()?;
        if !confirmed {
            println!("Cancelled.");
            return Ok(());
        }
    }

    let deleted = service.delete_before(cutoff_ms)?;
    if json {
        println!("{}", serde_json::json!({ "deleted": deleted }));
    } else {
        output::success(&format!("Deleted {} log entries", deleted));
    }
    Ok(())
}

fn stats(service: &LoggingService, json: bool) -> Result<()> {
    let db_path = service.db_path();
    let stats = LogStats {
        total_entries: service.count()?,
        error_count: service.get_errors(1000)?.len(),
        database_path: db_path.display().to_string(),
        database_size_bytes: std::fs::metadata(db_path).map(|m| m.len()).unwrap_or(0),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
        return Ok(());
    }

    println!("{}", "Log Statistics".bold());
    let mut table = output::create_table();
    table.add_row(vec!["Total entries".to_string(), stats.total_entries.to_string()]);
    table.add_row(vec!["Errors".to_string(), stats.error_count.to_string()]);
    table.add_row(vec!["Database".to_string(), stats.database_path]);
    table.add_row(vec!["Size".to_string(), format!("{} bytes", stats.database_size_bytes)]);
    println!("{}", table);
    Ok(())
}
