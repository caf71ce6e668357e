//! Command dispatch: bridges CLI args -> engine commands -> output formatting.

pub mod config_cmd;
pub mod describe;
pub mod encoder;
pub mod record;
pub mod service;
pub mod services;
pub mod status;
pub mod util;
pub mod watch;

use kilosync_core::{Engine, EngineConfig};

use crate::cli::{Command, GlobalOpts};
use crate::error::CliError;

/// Dispatch a device-bound command to the appropriate handler.
pub async fn dispatch(
    cmd: Command,
    engine: &Engine,
    config: &EngineConfig,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match cmd {
        Command::Status => status::handle(engine, config, global).await,
        Command::Watch(args) => watch::handle(engine, config, args, global).await,
        Command::Services(args) => services::handle(engine, config, args, global).await,
        Command::Record(args) => record::handle(engine, config, args, global).await,
        Command::Service(args) => service::handle(engine, config, args, global).await,
        Command::Encoder(args) => encoder::handle(engine, config, args, global).await,
        Command::Describe(args) => describe::handle(engine, config, args.target, global).await,
        // Config is handled before dispatch
        Command::Config(_) => unreachable!(),
    }
}
