//! `service`: start, stop, or toggle one streaming service.

use kilosync_core::{Command, CommandResult, Engine, EngineConfig, StreamId};

use crate::cli::{GlobalOpts, ServiceArgs};
use crate::error::CliError;
use crate::output;

use super::util;

pub async fn handle(
    engine: &Engine,
    config: &EngineConfig,
    args: ServiceArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    util::connect(engine, config, global).await?;

    let stream = StreamId::from(args.stream);
    if stream == StreamId::Sub && !engine.cache().multi_stream_mode {
        return Err(CliError::Unsupported {
            operation: "sub stream service".into(),
            required: "the device to run in multi-stream mode".into(),
        });
    }

    let result = engine
        .execute(Command::Service {
            stream,
            service_id: args.id,
            action: args.action.into(),
        })
        .await?;

    if let CommandResult::Service {
        stream,
        service_id,
        enabled,
    } = result
    {
        let out = output::render_single(
            &global.output,
            &serde_json::json!({ "stream": stream, "id": service_id, "enabled": enabled }),
            |_| {
                let verb = if enabled { "enabled" } else { "disabled" };
                format!("Service {service_id} on {} stream {verb}", stream.label())
            },
            |_| enabled.to_string(),
        );
        output::print_output(&out, global.quiet);
    }
    Ok(())
}
