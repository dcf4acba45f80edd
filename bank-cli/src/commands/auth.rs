//! Register, login and logout commands

use anyhow::Result;
use colored::Colorize;
use dialoguer::Password;

use bank_core::services::LogEvent;
use bank_core::Session;

use super::{get_context, get_logger, log_command, log_event, report};
use crate::output;

fn resolve_password(password: Option<String>, confirm: bool) -> Result<String> {
    if let Some(p) = password {
        return Ok(p);
    }
    let mut prompt = Password::new().with_prompt("Password");
    if confirm {
        prompt = prompt.with_confirmation("Confirm password", "Passwords do not match");
    }
    Ok(prompt.interact()?)
}

fn print_session(session: &Session) {
    println!("Token: {}", session.token.bold());
    println!();
    output::info("Use it for further commands:");
    println!("  export BANK_TOKEN={}", session.token);
}

pub fn run_register(
    username: &str,
    password: Option<String>,
    email: Option<String>,
    json: bool,
) -> Result<()> {
    let logger = get_logger();
    log_command(&logger, "register");

    let password = resolve_password(password, !json)?;
    let ctx = get_context()?;
    let result = ctx.auth_service.register(username, &password, email.as_deref());

    match &result {
        Ok(_) => log_event(&logger, LogEvent::new("user_registered")),
        Err(e) => log_event(&logger, LogEvent::from_error("register_failed", e)),
    }

    report(result, json, |session| {
        output::success(&format!("Registered {}", session.username));
        print_session(session);
    })
}

pub fn run_login(username: &str, password: Option<String>, json: bool) -> Result<()> {
    let logger = get_logger();
    log_command(&logger, "login");

    let password = resolve_password(password, false)?;
    let ctx = get_context()?;
    let result = ctx.auth_service.login(username, &password);

    if let Err(e) = &result {
        log_event(&logger, LogEvent::from_error("login_failed", e));
    }

    report(result, json, |session| {
        output::success(&format!("Logged in as {}", session.username));
        print_session(session);
    })
}

pub fn run_logout(token: Option<&str>, json: bool) -> Result<()> {
    let logger = get_logger();
    log_command(&logger, "logout");

    let ctx = get_context()?;
    let result = match token {
        Some(token) => ctx.auth_service.logout(token),
        None => Err(bank_core::Error::Unauthenticated),
    };

    report(result, json, |existed| {
        if *existed {
            output::success("Logged out");
        } else {
            output::warning("Session was already closed");
        }
    })
}
