//! Flowmate CLI entry point.

use clap::Parser;
use flowmate::cli::commands;
use flowmate::cli::workspace::Workspace;
use flowmate::cli::{Cli, Commands};
use flowmate::error::Error;
use std::process::ExitCode;

fn main() -> ExitCode {
    let cli = Cli::parse();

    if cli.no_color {
        colored::control::set_override(false);
    }

    init_tracing(cli.verbose, cli.quiet);

    // JSON when asked for, or when stdout is not a terminal
    let json = cli.json || !std::io::IsTerminal::is_terminal(&std::io::stdout());

    let result = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(Error::from)
        .and_then(|runtime| runtime.block_on(run(&cli, json)));

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            if json {
                eprintln!("{}", e.to_structured_json());
            } else if !cli.quiet {
                if let Some(hint) = e.hint() {
                    eprintln!("Error: {e}\n  Hint: {hint}");
                } else {
                    eprintln!("Error: {e}");
                }
            }
            ExitCode::from(e.exit_code())
        }
    }
}

fn init_tracing(verbose: u8, quiet: bool) {
    use tracing_subscriber::EnvFilter;

    if quiet {
        return;
    }

    // Honor RUST_LOG if set, otherwise use verbosity flag
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        match verbose {
            0 => EnvFilter::new("warn"),
            1 => EnvFilter::new("info"),
            2 => EnvFilter::new("debug,rusqlite=info"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .without_time()
        .init();
}

async fn run(cli: &Cli, json: bool) -> Result<(), Error> {
    match &cli.command {
        Commands::Init => commands::init::execute(cli, json),
        Commands::Version => commands::version::execute(json),
        Commands::Completions { shell } => commands::completions::execute(shell),

        command => {
            let ws = Workspace::open(cli).await?;
            match command {
                Commands::Task { command } => commands::task::execute(command, &ws, json).await,
                Commands::Note { command } => commands::note::execute(command, &ws, json).await,
                Commands::Folder { command } => commands::folder::execute(command, &ws, json).await,
                Commands::Checkin { command } => {
                    commands::checkin::execute(command, &ws, json).await
                }
                Commands::Queue { command } => commands::queue::execute(command, &ws, json),
                Commands::Sync => commands::sync::execute(&ws, json).await,
                Commands::Status => commands::status::execute(&ws, json),
                Commands::Init | Commands::Version | Commands::Completions { .. } => Ok(()),
            }
        }
    }
}
