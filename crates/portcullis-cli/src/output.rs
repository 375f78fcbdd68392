//! Output formatting and display utilities
//!
//! Provides colored, formatted output for the CLI

use colored::Colorize;

use portcullis::auth::LoginDecision;
use portcullis::sanitize::CredentialScreening;
use portcullis::{FileDecision, SanitizationOutcome, ThreatLevel, ValidationOutcome};

/// Print a success message
pub fn success(msg: &str) {
    println!("{} {}", "✓".green().bold(), msg);
}

/// Print an error message
pub fn error(msg: &str) {
    eprintln!("{} {}", "✗".red().bold(), msg);
}

/// Print a warning message
pub fn warning(msg: &str) {
    println!("{} {}", "⚠".yellow().bold(), msg);
}

/// Print an info message
pub fn info(msg: &str) {
    println!("{} {}", "ℹ".blue().bold(), msg);
}

/// Print a header
pub fn header(msg: &str) {
    println!("\n{}", msg.bold().underline());
}

/// Print a JSON report
pub fn print_json<T: serde::Serialize>(value: &T) -> Result<(), serde_json::Error> {
    let json = serde_json::to_string_pretty(value)?;
    println!("{}", json);
    Ok(())
}

fn threat(level: ThreatLevel) -> colored::ColoredString {
    let label = level.as_str();
    match level {
        ThreatLevel::None => label.dimmed(),
        ThreatLevel::Low => label.blue(),
        ThreatLevel::Medium => label.yellow(),
        ThreatLevel::High | ThreatLevel::Critical => label.red().bold(),
    }
}

/// Print a field validation result
pub fn print_validation(field: &str, outcome: &ValidationOutcome) {
    header(&format!("Validate {field}"));
    if outcome.valid {
        success("accepted");
    } else {
        error(&outcome.error_message);
        if let Some(reason) = outcome.reason {
            println!("  {} {}", "reason:".dimmed(), reason.as_str());
        }
    }
    if !outcome.sanitized_input.is_empty() {
        println!("  {} {:?}", "sanitized:".dimmed(), outcome.sanitized_input);
    }
}

/// Print a sanitization result
pub fn print_sanitization(outcome: &SanitizationOutcome) {
    header("Sanitize");
    if outcome.blocked {
        error("blocked");
    } else {
        success("allowed");
    }
    println!("  {} {}", "threat:".dimmed(), threat(outcome.threat_level));
    println!("  {} {:?}", "sanitized:".dimmed(), outcome.sanitized_input);
}

/// Print a credential screening result
pub fn print_screening(screening: &CredentialScreening) {
    header("Credential screening");
    if screening.is_blocked() {
        error(&screening.message());
    } else {
        success("no probe signatures");
    }
}

/// Print an upload decision
pub fn print_upload(name: &str, decision: &FileDecision) {
    header(&format!("Upload {name}"));
    if decision.blocked {
        error(&decision.reason);
        for violation in &decision.violations {
            println!("  {} {}", "✗".red(), violation);
        }
    } else {
        success(&decision.reason);
    }
    println!("  {} {}", "threat:".dimmed(), threat(decision.threat_level));
}

/// Print one row of a login drill
pub fn print_login_attempt(attempt: u32, decision: &LoginDecision) {
    let icon = if decision.authenticated {
        "✓".green()
    } else if decision.blocked {
        "⛔".red()
    } else {
        "✗".yellow()
    };
    println!("  {} {:>3}  {}", icon, attempt, decision.reason);
}
