mod cli;
mod commands;
mod config;
mod error;
mod output;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use kilosync_core::Engine;

use crate::cli::{Cli, Command};
use crate::error::CliError;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    init_tracing(cli.global.verbose);

    if let Err(err) = run(cli).await {
        let code = err.exit_code();
        eprintln!("{:?}", miette::Report::new(err));
        std::process::exit(code);
    }
}

fn init_tracing(verbosity: u8) {
    let filter = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(cli: Cli) -> Result<(), CliError> {
    match cli.command {
        // Config commands don't need a device connection
        Command::Config(args) => commands::config_cmd::handle(args, &cli.global),

        Command::Describe(args) if !args.target.needs_device() => {
            commands::describe::handle_offline(args.target, &cli.global)
        }

        cmd => {
            let engine_config = config::resolve_engine_config(&cli.global)?;
            let engine = Engine::new();

            tracing::debug!(
                command = ?cmd,
                address = %engine_config.address,
                "dispatching command"
            );
            let result = commands::dispatch(cmd, &engine, &engine_config, &cli.global).await;
            engine.teardown();
            result
        }
    }
}
