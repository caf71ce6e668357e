//! `record`: start, stop, or toggle recording on a stream.

use kilosync_core::{Command, CommandResult, Engine, EngineConfig, StreamId};

use crate::cli::{GlobalOpts, RecordArgs};
use crate::error::CliError;
use crate::output;

use super::util;

pub async fn handle(
    engine: &Engine,
    config: &EngineConfig,
    args: RecordArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    util::connect(engine, config, global).await?;

    let stream = StreamId::from(args.stream);
    let result = engine
        .execute(Command::Recording {
            stream,
            action: args.action.into(),
        })
        .await?;

    if let CommandResult::Recording { stream, recording } = result {
        let out = output::render_single(
            &global.output,
            &serde_json::json!({ "stream": stream, "recording": recording }),
            |_| {
                let verb = if recording { "started" } else { "stopped" };
                format!("Recording {verb} on {} stream", stream.label())
            },
            |_| recording.to_string(),
        );
        output::print_output(&out, global.quiet);
    }
    Ok(())
}
