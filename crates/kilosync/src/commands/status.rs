//! `status`: connect once and report what the engine learned.

use std::collections::BTreeMap;
use std::fmt::Write as _;

use chrono::{DateTime, Utc};
use serde::Serialize;

use kilosync_core::presentation;
use kilosync_core::{DeviceStatus, Engine, EngineConfig, EnginePhase, ServiceDescriptor, StreamId};

use crate::cli::GlobalOpts;
use crate::error::CliError;
use crate::output;

use super::services::service_rows;
use super::util;

#[derive(Debug, Serialize)]
struct StatusReport {
    address: String,
    model: String,
    status: DeviceStatus,
    phase: EnginePhase,
    device_type: Option<String>,
    multi_stream_mode: bool,
    recording: BTreeMap<StreamId, Option<bool>>,
    services: BTreeMap<StreamId, Vec<ServiceDescriptor>>,
    variables: BTreeMap<&'static str, String>,
    last_poll: Option<DateTime<Utc>>,
}

pub async fn handle(
    engine: &Engine,
    config: &EngineConfig,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    util::connect(engine, config, global).await?;

    let cache = engine.cache();
    let report = StatusReport {
        address: config.address.clone(),
        model: config.model.to_string(),
        status: engine.status(),
        phase: engine.phase(),
        device_type: cache.device_type.clone(),
        multi_stream_mode: cache.multi_stream_mode,
        recording: cache
            .active_streams()
            .into_iter()
            .map(|s| (s, cache.stream(s).is_recording))
            .collect(),
        services: cache.services.clone(),
        variables: presentation::variable_values(&cache),
        last_poll: engine.last_poll(),
    };

    let color = output::should_color(&global.color);
    let out = output::render_single(
        &global.output,
        &report,
        |r| detail(r, color),
        |r| r.status.to_string(),
    );
    output::print_output(&out, global.quiet);
    Ok(())
}

fn detail(report: &StatusReport, color: bool) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Address:      {}", report.address);
    let _ = writeln!(out, "Model:        {}", report.model);
    let _ = writeln!(
        out,
        "Device type:  {}",
        report.device_type.as_deref().unwrap_or(presentation::UNKNOWN_VALUE)
    );
    let _ = writeln!(out, "Status:       {}", output::paint_status(&report.status, color));
    let _ = writeln!(
        out,
        "Stream mode:  {}",
        if report.multi_stream_mode { "main + sub" } else { "main only" }
    );
    for (stream, recording) in &report.recording {
        let _ = writeln!(
            out,
            "Recording ({}): {}",
            stream.label(),
            output::paint_flag(*recording, color)
        );
    }

    let services: Vec<_> = report
        .services
        .iter()
        .flat_map(|(stream, list)| list.iter().map(move |s| (*stream, s)))
        .collect();
    if services.is_empty() {
        out.push_str("No streaming services");
    } else {
        out.push_str(&output::render_table(&service_rows(&services)));
    }
    out
}
