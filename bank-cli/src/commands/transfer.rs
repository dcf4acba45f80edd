//! Transfer command - move money from the caller's account

use std::str::FromStr;

use anyhow::Result;
use rust_decimal::Decimal;

use bank_core::services::LogEvent;
use bank_core::Error;

use super::{get_context, get_logger, log_command, log_event, report, require_caller};
use crate::output;

fn parse_amount(raw: &str) -> bank_core::domain::result::Result<Decimal> {
    Decimal::from_str(raw.trim().trim_start_matches('$'))
        .map_err(|_| Error::InvalidAmount(format!("'{raw}' is not a valid amount")))
}

pub fn run(token: Option<&str>, to: &str, amount: &str, json: bool) -> Result<()> {
    let logger = get_logger();
    log_command(&logger, "transfer");

    let ctx = get_context()?;
    let result = require_caller(&ctx, token).and_then(|user_id| {
        let amount = parse_amount(amount)?;
        ctx.transfer_service.transfer_from_user(user_id, to.trim(), amount)
    });

    match &result {
        Ok(_) => log_event(&logger, LogEvent::new("transfer_completed").with_command("transfer")),
        Err(e) => log_event(
            &logger,
            LogEvent::from_error("transfer_rejected", e).with_command("transfer"),
        ),
    }

    report(result, json, |receipt| {
        output::success(&receipt.message);
        println!(
            "New balance of {}: {}",
            receipt.account.account_number,
            output::format_money(receipt.account.balance)
        );
        println!("Transaction #{}", receipt.transaction.id);
    })
}
