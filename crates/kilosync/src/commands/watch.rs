//! `watch`: keep the engine polling and print every state change.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Value, json};
use tokio::sync::broadcast::error::RecvError;
use tracing::warn;

use kilosync_core::presentation;
use kilosync_core::{DeviceStatus, Engine, EngineConfig, EngineEvent, StreamId};

use crate::cli::{GlobalOpts, OutputFormat, WatchArgs};
use crate::error::CliError;
use crate::output;

#[derive(Debug, Serialize)]
struct EventLine {
    at: DateTime<Utc>,
    event: &'static str,
    #[serde(flatten)]
    detail: Value,
}

pub async fn handle(
    engine: &Engine,
    config: &EngineConfig,
    args: WatchArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    // Subscribe first so the connect sequence is reported too.
    let mut events = engine.events();
    engine.apply_config(config)?;

    let color = output::should_color(&global.color);
    let stop = async {
        match args.duration {
            Some(secs) => tokio::time::sleep(Duration::from_secs(secs)).await,
            None => std::future::pending().await,
        }
    };
    tokio::pin!(stop);

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            () = &mut stop => break,
            event = events.recv() => match event {
                Ok(EngineEvent::Status(DeviceStatus::AuthenticationFailure(message))) => {
                    return Err(CliError::AuthFailed { message });
                }
                Ok(event) => {
                    let line = describe_event(engine, &event, color);
                    print_line(&line, &global.output, global.quiet);
                }
                Err(RecvError::Lagged(skipped)) => warn!(skipped, "event stream lagged"),
                Err(RecvError::Closed) => break,
            },
        }
    }
    Ok(())
}

fn describe_event(engine: &Engine, event: &EngineEvent, color: bool) -> (EventLine, String) {
    let (name, detail, text) = match event {
        EngineEvent::Status(status) => (
            "status",
            json!({ "status": status }),
            output::paint_status(status, color),
        ),
        EngineEvent::ConnectAttemptFailed { attempt } => (
            "connect_failed",
            json!({ "attempt": attempt }),
            format!("connect attempt {attempt} failed, retrying"),
        ),
        EngineEvent::CapabilitiesChanged(snapshot) => {
            let main = snapshot.services(StreamId::Main).len();
            let sub = snapshot.services(StreamId::Sub).len();
            (
                "capabilities",
                json!({ "streams": snapshot.stream_choices, "services": snapshot.service_choices }),
                format!("capabilities: {main} main / {sub} sub services"),
            )
        }
        EngineEvent::FeedbacksChanged(families) => {
            let ids: Vec<&str> = families.iter().map(|f| f.id()).collect();
            let variables = presentation::variable_values(&engine.cache());
            let text = format!(
                "{}: {}",
                ids.join(", "),
                variables
                    .iter()
                    .filter(|(name, _)| **name != "deviceType")
                    .map(|(_, value)| value.as_str())
                    .collect::<Vec<_>>()
                    .join("; ")
            );
            (
                "feedbacks",
                json!({ "families": ids, "variables": variables }),
                text,
            )
        }
    };

    (
        EventLine {
            at: Utc::now(),
            event: name,
            detail,
        },
        text,
    )
}

fn print_line((line, text): &(EventLine, String), format: &OutputFormat, quiet: bool) {
    let out = match format {
        OutputFormat::Json | OutputFormat::JsonCompact => output::render_json(line, true),
        OutputFormat::Table | OutputFormat::Plain => {
            format!("{} {:<13} {text}", line.at.format("%H:%M:%S"), line.event)
        }
    };
    output::print_output(&out, quiet);
}
