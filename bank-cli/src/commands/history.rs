//! History command - list the caller's transactions, newest first

use anyhow::Result;
use serde::Serialize;

use bank_core::TransactionRecord;

use super::{get_context, get_logger, log_command, report, require_caller};
use crate::output;

#[derive(Serialize)]
struct History {
    account_number: Option<String>,
    transactions: Vec<TransactionRecord>,
}

pub fn run(token: Option<&str>, limit: Option<usize>, json: bool) -> Result<()> {
    let logger = get_logger();
    log_command(&logger, "history");

    let ctx = get_context()?;
    let result = require_caller(&ctx, token).and_then(|user_id| {
        let own = ctx.account_service.get_account(user_id)?;
        let mut records = ctx.history_service.list_transactions_for_user(user_id)?;
        if let Some(limit) = limit {
            records.truncate(limit);
        }
        Ok(History {
            account_number: own.map(|a| a.account_number),
            transactions: records,
        })
    });

    report(result, json, |history| {
        if history.transactions.is_empty() {
            println!("No transactions yet.");
            return;
        }

        let own = history.account_number.as_deref().unwrap_or_default();
        let mut table = output::create_table();
        table.set_header(vec!["ID", "Time", "Type", "From", "To", "Amount"]);
        for record in &history.transactions {
            table.add_row(vec![
                record.id.to_string(),
                output::format_time(record.timestamp),
                record.kind.to_string(),
                record.from_account.clone(),
                record.to_account.clone(),
                output::format_signed(record.signed_amount_for(own)),
            ]);
        }
        println!("{}", table);
    })
}
