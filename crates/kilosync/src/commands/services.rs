//! `services`: list the user-controllable streaming services.

use serde::Serialize;
use tabled::Tabled;

use kilosync_core::{Engine, EngineConfig, ServiceDescriptor, StreamId};

use crate::cli::{GlobalOpts, ServicesArgs};
use crate::error::CliError;
use crate::output;

use super::util;

#[derive(Debug, Serialize)]
pub struct ServiceEntry {
    pub stream: StreamId,
    #[serde(flatten)]
    pub service: ServiceDescriptor,
}

#[derive(Tabled)]
pub struct ServiceRow {
    #[tabled(rename = "Stream")]
    stream: String,
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Service")]
    label: String,
    #[tabled(rename = "Enabled")]
    enabled: String,
    #[tabled(rename = "Status")]
    status: String,
}

impl ServiceRow {
    fn new(stream: StreamId, service: &ServiceDescriptor) -> Self {
        Self {
            stream: stream.to_string(),
            id: service.id.clone(),
            label: service.label.clone(),
            enabled: if service.enabled { "yes" } else { "no" }.into(),
            status: service.status.clone().unwrap_or_default(),
        }
    }
}

pub fn service_rows(services: &[(StreamId, &ServiceDescriptor)]) -> Vec<ServiceRow> {
    services
        .iter()
        .map(|(stream, service)| ServiceRow::new(*stream, service))
        .collect()
}

pub async fn handle(
    engine: &Engine,
    config: &EngineConfig,
    args: ServicesArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    util::connect(engine, config, global).await?;

    let only = args.stream.map(StreamId::from);
    let cache = engine.cache();
    let entries: Vec<ServiceEntry> = cache
        .services
        .iter()
        .filter(|(stream, _)| only.is_none_or(|s| s == **stream))
        .flat_map(|(stream, list)| {
            list.iter().map(move |service| ServiceEntry {
                stream: *stream,
                service: service.clone(),
            })
        })
        .collect();

    let out = output::render_list(
        &global.output,
        &entries,
        |e| ServiceRow::new(e.stream, &e.service),
        |e| e.service.id.clone(),
    );
    output::print_output(&out, global.quiet);
    Ok(())
}
