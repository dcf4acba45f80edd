//! Account command - show (and lazily open) the caller's account

use anyhow::Result;
use colored::Colorize;
use rust_decimal::Decimal;
use serde::Serialize;

use bank_core::Error;
use bank_core::services::LogEvent;

use super::{get_context, get_logger, log_command, log_event, report};
use crate::output;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AccountView {
    username: String,
    account_number: String,
    balance: Decimal,
}

pub fn run(token: Option<&str>, json: bool) -> Result<()> {
    let logger = get_logger();
    log_command(&logger, "account");

    let ctx = get_context()?;
    let result = token
        .ok_or(Error::Unauthenticated)
        .and_then(|token| ctx.auth_service.current_user(token))
        .and_then(|user| {
            let (account, created) = ctx.account_service.provision(user.id)?;
            if created {
                log_event(&logger, LogEvent::new("account_provisioned"));
            }
            Ok(AccountView {
                username: user.username,
                account_number: account.account_number,
                balance: account.balance,
            })
        });

    report(result, json, |view| {
        println!("{}", "Account".bold());
        let mut table = output::create_table();
        table.add_row(vec!["Owner", view.username.as_str()]);
        table.add_row(vec!["Number", view.account_number.as_str()]);
        table.add_row(vec!["Balance".to_string(), output::format_money(view.balance)]);
        println!("{}", table);
    })
}
