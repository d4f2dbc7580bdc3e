use std::path::PathBuf;

use chrono::{DateTime, Utc};
use clap::{Args, Parser, Subcommand};
use engine::UserId;

use error::{AppError, Result};
use ledger_file::Input;
use settings::Format;

mod error;
mod ledger_file;
mod render;
mod settings;

#[derive(Parser, Debug)]
#[command(name = "splitx")]
#[command(about = "Settle shared expenses with the fewest payments")]
struct Cli {
    /// Optional config file path (TOML).
    #[arg(long)]
    config: Option<String>,
    /// Ledger file: a `.json` snapshot or a `.csv` list of obligations.
    #[arg(long)]
    ledger: Option<PathBuf>,
    /// Output format (overrides the configured one).
    #[arg(long, value_enum)]
    format: Option<Format>,
    /// Only consider entries at or after this instant (RFC 3339).
    #[arg(long)]
    since: Option<DateTime<Utc>>,
    /// Only consider entries before this instant (RFC 3339).
    #[arg(long)]
    until: Option<DateTime<Utc>>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Net balance of every user with open debts.
    Balances,
    /// Fewest payments that settle every balance.
    Simplify,
    /// Who owes `--user` and whom `--user` owes.
    Positions(UserArgs),
    /// Expenses `--user` takes part in.
    History(UserArgs),
    /// Settle-up payments sent or received by `--user`.
    Payments(UserArgs),
    /// Users who paid the most.
    Leaderboard(LeaderboardArgs),
}

#[derive(Args, Debug)]
struct UserArgs {
    #[arg(long)]
    user: UserId,
}

#[derive(Args, Debug)]
struct LeaderboardArgs {
    #[arg(long, default_value_t = 5)]
    limit: usize,
}

fn main() -> std::result::Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let cli = Cli::parse();
    let settings = settings::Settings::new(cli.config.as_deref())?;

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(format!(
            "splitx={level},engine={level}",
            level = settings.level
        ))
        .init();

    let format = cli.format.unwrap_or(settings.format);
    let path = cli.ledger.or(settings.ledger).ok_or_else(|| {
        AppError::Ledger("no ledger file given (use --ledger or SPLITX_LEDGER)".to_string())
    })?;
    let input = ledger_file::load(&path)?.between(cli.since, cli.until)?;

    match run(&cli.command, &input, format) {
        Ok(output) => {
            println!("{output}");
            Ok(())
        }
        Err(err) => {
            tracing::error!("{err}");
            Err(err.into())
        }
    }
}

fn run(command: &Command, input: &Input, format: Format) -> Result<String> {
    match command {
        Command::Balances => render::balances(&input.balances()?, format),
        Command::Simplify => render::settlements(&input.simplify()?, format),
        Command::Positions(args) => {
            render::positions(args.user, &input.positions_for(args.user)?, format)
        }
        Command::History(args) => {
            render::history(&input.ledger("history")?.history(args.user), format)
        }
        Command::Payments(args) => {
            render::payments(&input.ledger("payments")?.payments_for(args.user), format)
        }
        Command::Leaderboard(args) => {
            render::leaderboard(&input.ledger("leaderboard")?.leaderboard(args.limit)?, format)
        }
    }
}
