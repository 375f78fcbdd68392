//! Portcullis CLI - run gate decisions from a shell
//!
//! Each subcommand feeds its arguments through one gate component and prints
//! the decision. Exit status is 0 when the input passes, 2 when it is
//! rejected or blocked, 1 on usage or configuration errors.

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use portcullis::observability::{EventSink, NullSink, TracingSink};
use portcullis::{AuthenticationGateway, FileDescriptor, GateConfig, StaticCredentials};

mod config;
mod error;
mod output;

use error::{CliError, Result};

/// Portcullis CLI - input classification and lockout checks
#[derive(Parser)]
#[command(name = "portcullis")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Path to portcullis.toml (defaults to ./portcullis.toml, then environment)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log security events to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate an email address
    Email {
        /// Address to check
        address: String,
    },

    /// Check a password against the configured policy
    Password {
        /// Password to check
        password: String,

        /// Identity the password belongs to
        #[arg(short, long)]
        identity: Option<String>,
    },

    /// Sanitize free text
    Sanitize {
        /// Text to sanitize
        input: String,

        /// Use the markup path instead of the SQL path
        #[arg(long)]
        html: bool,
    },

    /// Screen a username/password pair for injection probes
    Screen {
        /// Submitted username
        username: String,

        /// Submitted password
        password: String,
    },

    /// Screen a file as an upload
    File {
        /// File to read
        path: PathBuf,

        /// Client-supplied filename (defaults to the path's file name)
        #[arg(short, long)]
        name: Option<String>,

        /// Declared content type
        #[arg(long, default_value = "application/octet-stream")]
        content_type: String,
    },

    /// Send repeated wrong logins for one identity and show the lockout
    LoginDrill {
        /// Identity to drill
        identity: String,

        /// Number of attempts
        #[arg(short, long, default_value_t = 6)]
        attempts: u32,
    },

    /// Show the active configuration
    Config,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    if cli.verbose {
        init_tracing();
    }

    let result = run(&cli);

    match result {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(2),
        Err(e) => {
            output::error(&e.to_string());
            ExitCode::FAILURE
        }
    }
}

fn init_tracing() {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn run(cli: &Cli) -> Result<bool> {
    let (config, source) = config::load(cli.config.as_deref())?;
    tracing::debug!(source = %source, "configuration loaded");

    let sink: Arc<dyn EventSink> = if cli.verbose {
        Arc::new(TracingSink)
    } else {
        Arc::new(NullSink)
    };

    match &cli.command {
        Commands::Email { address } => cmd_email(&config, sink, address, cli.json),
        Commands::Password { password, identity } => {
            cmd_password(&config, sink, password, identity.as_deref(), cli.json)
        }
        Commands::Sanitize { input, html } => cmd_sanitize(&config, sink, input, *html, cli.json),
        Commands::Screen { username, password } => {
            cmd_screen(&config, sink, username, password, cli.json)
        }
        Commands::File {
            path,
            name,
            content_type,
        } => cmd_file(&config, sink, path, name.as_deref(), content_type, cli.json),
        Commands::LoginDrill { identity, attempts } => {
            cmd_login_drill(&config, sink, identity, *attempts, cli.json)
        }
        Commands::Config => cmd_config(&config, &source, cli.json),
    }
}

// =============================================================================
// Command Implementations
// =============================================================================

fn cmd_email(config: &GateConfig, sink: Arc<dyn EventSink>, address: &str, json: bool) -> Result<bool> {
    let outcome = config.field_validator(sink).validate_email(address);
    if json {
        output::print_json(&outcome)?;
    } else {
        output::print_validation("email", &outcome);
    }
    Ok(outcome.valid)
}

fn cmd_password(
    config: &GateConfig,
    sink: Arc<dyn EventSink>,
    password: &str,
    identity: Option<&str>,
    json: bool,
) -> Result<bool> {
    let validator = config.field_validator(sink);
    let outcome = validator.validate_password(password, identity);
    let strength = validator.password_policy().estimate_strength(password);

    if json {
        let report = serde_json::json!({
            "valid": outcome.valid,
            "error_message": outcome.error_message,
            "reason": outcome.reason,
            "strength": strength.to_string(),
        });
        output::print_json(&report)?;
    } else {
        output::print_validation("password", &outcome);
        output::info(&format!("Estimated strength: {strength}"));
    }
    Ok(outcome.valid)
}

fn cmd_sanitize(
    config: &GateConfig,
    sink: Arc<dyn EventSink>,
    input: &str,
    html: bool,
    json: bool,
) -> Result<bool> {
    let classifier = config.input_classifier(sink);
    let outcome = if html {
        classifier.sanitize_html(input)
    } else {
        classifier.sanitize_input(input)
    };

    if json {
        output::print_json(&outcome)?;
    } else {
        output::print_sanitization(&outcome);
    }
    Ok(!outcome.blocked)
}

fn cmd_screen(
    config: &GateConfig,
    sink: Arc<dyn EventSink>,
    username: &str,
    password: &str,
    json: bool,
) -> Result<bool> {
    let screening = config
        .input_classifier(sink)
        .screen_credentials(username, password);

    if json {
        let report = serde_json::json!({
            "blocked": screening.is_blocked(),
            "flags": screening.flags,
            "message": screening.message(),
        });
        output::print_json(&report)?;
    } else {
        output::print_screening(&screening);
    }
    Ok(!screening.is_blocked())
}

fn cmd_file(
    config: &GateConfig,
    sink: Arc<dyn EventSink>,
    path: &Path,
    name: Option<&str>,
    content_type: &str,
    json: bool,
) -> Result<bool> {
    let content = std::fs::read(path).map_err(|e| CliError::FileRead {
        path: path.to_path_buf(),
        source: e,
    })?;

    let name = match name {
        Some(name) => name.to_string(),
        None => path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default(),
    };

    let file = FileDescriptor::new(name.clone(), content, content_type);
    let decision = config.upload_gate(sink).evaluate(&file);

    if json {
        output::print_json(&decision)?;
    } else {
        output::print_upload(&name, &decision);
    }
    Ok(!decision.blocked)
}

fn cmd_login_drill(
    config: &GateConfig,
    sink: Arc<dyn EventSink>,
    identity: &str,
    attempts: u32,
    json: bool,
) -> Result<bool> {
    // No registered users: every attempt is a wrong credential.
    let gateway = AuthenticationGateway::new(config.rate_limiter(sink.clone()), StaticCredentials::new())
        .with_sink(sink);

    let mut decisions = Vec::with_capacity(attempts as usize);
    for _ in 0..attempts {
        decisions.push(gateway.login(identity, "portcullis-drill")?);
    }
    let locked = decisions.last().is_some_and(|d| d.blocked);

    if json {
        let report = serde_json::json!({
            "max_failed_attempts": config.lockout.max_failed_attempts,
            "locked": locked,
            "attempts": decisions,
        });
        output::print_json(&report)?;
    } else {
        output::header(&format!("Login drill ({attempts} attempts)"));
        for (n, decision) in (1..).zip(&decisions) {
            output::print_login_attempt(n, decision);
        }
        if locked {
            output::warning("identity is locked out");
        } else {
            output::info("identity is still allowed to try");
        }
    }
    Ok(true)
}

fn cmd_config(config: &GateConfig, source: &config::ConfigSource, json: bool) -> Result<bool> {
    let lockout = &config.lockout;
    let password = &config.password;
    let upload = &config.upload;

    if json {
        let report = serde_json::json!({
            "source": source.to_string(),
            "lockout": {
                "max_failed_attempts": lockout.max_failed_attempts,
                "lockout_duration_secs": lockout.lockout_duration.as_secs(),
                "auto_unlock": lockout.auto_unlock,
            },
            "password": {
                "min_length": password.min_length,
                "max_length": password.max_length,
                "required_character_classes": password.required_character_classes,
                "check_common_passwords": password.check_common_passwords,
            },
            "upload": {
                "max_size": upload.max_size,
                "denied_extensions": upload.denied_extensions,
            },
        });
        output::print_json(&report)?;
    } else {
        output::header(&format!("Configuration ({source})"));
        println!("  max_failed_attempts       {}", lockout.max_failed_attempts);
        println!("  lockout_duration          {}s", lockout.lockout_duration.as_secs());
        println!("  auto_unlock               {}", lockout.auto_unlock);
        println!("  password.min_length       {}", password.min_length);
        println!("  upload.max_size           {}", upload.max_size);
        println!("  upload.denied_extensions  {}", upload.denied_extensions.len());
    }
    Ok(true)
}
