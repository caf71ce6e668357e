//! `encoder`: video encoder control on token devices.

use serde::Serialize;

use kilosync_core::{Command, CommandResult, Engine, EngineConfig};

use crate::cli::{EncoderArgs, EncoderCommand, GlobalOpts};
use crate::error::CliError;
use crate::output;

use super::util;

#[derive(Debug, Serialize)]
struct EncoderReport {
    interface: String,
    active: bool,
}

pub async fn handle(
    engine: &Engine,
    config: &EngineConfig,
    args: EncoderArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    util::connect(engine, config, global).await?;

    match args.command {
        EncoderCommand::Enable => {
            engine.execute(Command::EnableEncoder).await?;
            if !global.quiet {
                eprintln!("Encoder enabled on {}", config.interface.label());
            }
            Ok(())
        }
        EncoderCommand::Status => {
            let CommandResult::Encoder { active } = engine.execute(Command::EncoderStatus).await?
            else {
                return Err(CliError::Device {
                    message: "unexpected reply to an encoder status request".into(),
                });
            };
            let report = EncoderReport {
                interface: config.interface.as_str().to_owned(),
                active,
            };

            let color = output::should_color(&global.color);
            let out = output::render_single(
                &global.output,
                &report,
                |r| {
                    format!(
                        "Encoder ({}): {}",
                        config.interface.label(),
                        output::paint_flag(Some(r.active), color)
                    )
                },
                |r| r.active.to_string(),
            );
            output::print_output(&out, global.quiet);
            Ok(())
        }
    }
}
