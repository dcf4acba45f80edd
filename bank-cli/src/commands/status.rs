//! Status command - ledger-wide counts and totals

use anyhow::Result;
use colored::Colorize;

use super::{get_context, get_logger, log_command, report};
use crate::output;

pub fn run(json: bool) -> Result<()> {
    let logger = get_logger();
    log_command(&logger, "status");

    let ctx = get_context()?;
    report(ctx.status_service.get_status(), json, |status| {
        println!("{}", "Bank Status".bold());
        println!();

        let mut table = output::create_table();
        table.add_row(vec!["Users".to_string(), status.total_users.to_string()]);
        table.add_row(vec!["Accounts".to_string(), status.total_accounts.to_string()]);
        table.add_row(vec!["Transactions".to_string(), status.total_transactions.to_string()]);
        table.add_row(vec!["Total balance".to_string(), output::format_money(status.total_balance)]);
        println!("{}", table);
    })
}
