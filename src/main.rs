use clap::Parser;
use piggy_ledger::args::{Args, Command};
use piggy_ledger::{commands, Config, Ledger, Mode, Result};
use std::path::Path;
use std::process::ExitCode;
use tracing::{debug, error, trace};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    let log_level = args.common().log_level();
    init_logger(log_level);
    debug!("Log level set to {}", log_level.to_string().to_lowercase());

    match main_inner(args).await {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            error!("Exiting with error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

pub async fn main_inner(args: Args) -> Result<()> {
    trace!("{args:?}");
    let home = args.common().piggy_home().path();
    let offline = args.common().offline();

    // This allows for running the program without the remote store or the AI service. When
    // PIGGY_LEDGER_IN_TEST_MODE is set and non-zero in length, then the mode will be Mode::Test,
    // otherwise it will be Mode::Http.
    let mode = Mode::from_env();

    let _: () = match args.command() {
        Command::Init(init_args) => {
            commands::init(home, init_args.sheet_url(), init_args.ai_url())
                .await?
                .print()
        }

        Command::Sync => {
            let ledger = open(home, mode, true).await?;
            commands::sync(&ledger).await?.print()
        }

        Command::List(list_args) => {
            let ledger = open(home, mode, offline).await?;
            commands::list(&ledger, list_args).await?.print()
        }

        Command::Summary => {
            let ledger = open(home, mode, offline).await?;
            commands::summary(&ledger).await?.print()
        }

        Command::Categories => {
            let ledger = open(home, mode, offline).await?;
            commands::categories(&ledger).await?.print()
        }

        Command::Add(add_args) => {
            let ledger = open(home, mode, offline).await?;
            commands::add(&ledger, add_args).await?.print()
        }

        Command::Update(update_args) => {
            let ledger = open(home, mode, offline).await?;
            commands::update(&ledger, update_args).await?.print()
        }

        Command::Delete(delete_args) => {
            let ledger = open(home, mode, offline).await?;
            commands::delete(&ledger, delete_args).await?.print()
        }

        Command::Analyze(analyze_args) => {
            let ledger = open(home, mode, offline).await?;
            commands::analyze(&ledger, analyze_args).await?.print()
        }

        Command::User(user_args) => {
            let ledger = open(home, mode, offline).await?;
            commands::user(&ledger, user_args).await?.print()
        }

        Command::Theme(theme_args) => {
            let ledger = open(home, mode, offline).await?;
            commands::theme(&ledger, theme_args).await?.print()
        }
    };
    Ok(())
}

/// Loads the config and the ledger, then runs the startup sync unless `skip_sync` is set.
async fn open(home: &Path, mode: Mode, skip_sync: bool) -> Result<Ledger> {
    let config = Config::load(home).await?;
    let ledger = Ledger::open(&config, mode).await?;
    if !skip_sync {
        ledger.start().await;
    }
    Ok(ledger)
}

/// Initializes the tracing subscriber.
pub fn init_logger(level: LevelFilter) {
    let filter = match std::env::var("RUST_LOG").ok() {
        Some(_) => {
            // RUST_LOG exists; use it.
            EnvFilter::from_default_env()
        }
        None => {
            // RUST_LOG does not exist; use default log level for this crate only.
            EnvFilter::new(format!(
                "{}={},{}={}",
                env!("CARGO_PKG_NAME").replace('-', "_"),
                level,
                env!("CARGO_BIN_NAME"),
                level
            ))
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
