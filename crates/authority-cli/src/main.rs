//! Authority CLI.
//!
//! Evaluates access requests against statement-based policies.
//!
//! # Quick Start
//!
//! ```bash
//! # Check a policy file
//! authority lint --policy leave.json
//!
//! # Ask for a decision
//! authority eval --policy leave.json \
//!     --resource res:::leave --action act:::leave:approve \
//!     --string prop:::leave:owner=e-200 --subject manager.json --explain
//!
//! # Issue a token and use it as the subject
//! AUTHORITY_AUTH__SECRET=s3cret authority token issue --uid e-100 --user-type employee
//! ```

mod commands;
mod style;

use std::error::Error;
use std::io::IsTerminal;
use std::path::PathBuf;
use std::process::ExitCode;
use std::str::FromStr;

use anyhow::Result;
use authority_config::ConfigLoader;
use clap::{Parser, Subcommand};

/// Authority - statement-based access decisions.
#[derive(Parser)]
#[command(name = "authority")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Project directory containing authority.toml.
    #[arg(long, global = true, default_value = ".")]
    project: PathBuf,

    /// Disable colored output.
    #[arg(long, global = true)]
    no_color: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show version information.
    Version,

    /// Evaluate an access request.
    ///
    /// Exits 0 when allowed, 1 when denied and 2 when evaluation fails.
    Eval {
        /// Policy file (JSON object or array). Repeatable; defaults to the configured files.
        #[arg(short, long = "policy", value_name = "FILE")]
        policies: Vec<PathBuf>,

        /// Requested resource.
        #[arg(short, long)]
        resource: String,

        /// Requested action.
        #[arg(short, long)]
        action: String,

        /// String attribute.
        #[arg(long = "string", value_name = "KEY=VALUE", value_parser = parse_pair::<String>)]
        strings: Vec<(String, String)>,

        /// Integer attribute.
        #[arg(long = "int", value_name = "KEY=VALUE", value_parser = parse_pair::<i64>)]
        integers: Vec<(String, i64)>,

        /// Float attribute.
        #[arg(long = "float", value_name = "KEY=VALUE", value_parser = parse_pair::<f64>)]
        floats: Vec<(String, f64)>,

        /// Boolean attribute.
        #[arg(long = "bool", value_name = "KEY=VALUE", value_parser = parse_pair::<bool>)]
        booleans: Vec<(String, bool)>,

        /// JSON file describing the subject.
        #[arg(long, value_name = "FILE", conflicts_with = "token")]
        subject: Option<PathBuf>,

        /// Signed token whose claims describe the subject.
        #[arg(long)]
        token: Option<String>,

        /// Show the statements behind the decision.
        #[arg(long)]
        explain: bool,
    },

    /// Check policy files for problems evaluation would reject.
    Lint {
        /// Policy file. Repeatable; defaults to the configured files.
        #[arg(short, long = "policy", value_name = "FILE")]
        policies: Vec<PathBuf>,
    },

    /// Signed token commands.
    #[command(subcommand)]
    Token(TokenCommands),

    /// Show the effective configuration.
    Config {
        /// Output format (toml, json).
        #[arg(short, long, default_value = "toml")]
        format: String,
    },
}

#[derive(Subcommand)]
enum TokenCommands {
    /// Issue a token signed with the configured secret.
    Issue {
        /// User ID.
        #[arg(long)]
        uid: String,

        /// Kind of user.
        #[arg(long)]
        user_type: String,

        /// Purpose of the token (e.g. access).
        #[arg(long)]
        token_type: Option<String>,

        /// Additional string claim.
        #[arg(long = "claim", value_name = "KEY=VALUE", value_parser = parse_pair::<String>)]
        claims: Vec<(String, String)>,
    },

    /// Verify a token and print its claims.
    Inspect {
        /// The token.
        token: String,
    },
}

/// Parses `KEY=VALUE`, splitting on the first `=`.
fn parse_pair<T>(s: &str) -> Result<(String, T), String>
where
    T: FromStr,
    T::Err: Error,
{
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("invalid KEY=VALUE: no `=` found in `{s}`"))?;
    if key.is_empty() {
        return Err(format!("invalid KEY=VALUE: empty key in `{s}`"));
    }
    let value = value
        .parse()
        .map_err(|e| format!("invalid value for `{key}`: {e}"))?;
    Ok((key.to_string(), value))
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    style::set_no_color(
        cli.no_color || std::env::var_os("NO_COLOR").is_some() || !std::io::stdout().is_terminal(),
    );

    let config = ConfigLoader::new().with_project_dir(&cli.project).load();

    // Initialize logging; RUST_LOG wins over the configured level
    let level = config
        .as_ref()
        .map_or("info", |c| c.logging.level.as_str());
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match run(cli.command, config) {
        Ok(code) => code,
        Err(e) => {
            style::print_error(&format!("{e:#}"));
            ExitCode::from(2)
        }
    }
}

fn run(command: Commands, config: Result<authority_config::AuthorityConfig>) -> Result<ExitCode> {
    match command {
        Commands::Version => {
            commands::version::run();
            Ok(ExitCode::SUCCESS)
        }
        Commands::Eval {
            policies,
            resource,
            action,
            strings,
            integers,
            floats,
            booleans,
            subject,
            token,
            explain,
        } => Ok(commands::eval::run(
            &config?,
            commands::eval::EvalOptions {
                policies,
                resource,
                action,
                strings,
                integers,
                floats,
                booleans,
                subject,
                token,
                explain,
            },
        )),
        Commands::Lint { policies } => commands::lint::run(&config?, policies),
        Commands::Token(cmd) => {
            let config = config?;
            match cmd {
                TokenCommands::Issue {
                    uid,
                    user_type,
                    token_type,
                    claims,
                } => commands::token::issue(&config, &uid, &user_type, token_type.as_deref(), claims),
                TokenCommands::Inspect { token } => commands::token::inspect(&config, &token),
            }
            .map(|()| ExitCode::SUCCESS)
        }
        Commands::Config { format } => {
            commands::config::show(&config?, &format)?;
            Ok(ExitCode::SUCCESS)
        }
    }
}
