use std::collections::BTreeMap;

use serde::Serialize;
use strum::IntoEnumIterator;

use super::{ServiceDescriptor, StreamId, StreamState};

/// What the identity probe learned about the device.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DeviceIdentity {
    pub device_type: Option<String>,
}

/// Local snapshot of device state, owned by the session's poll task and
/// published read-only through a `watch` channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Cache {
    pub streams: BTreeMap<StreamId, StreamState>,
    pub services: BTreeMap<StreamId, Vec<ServiceDescriptor>>,
    pub multi_stream_mode: bool,
    pub device_type: Option<String>,
}

impl Default for Cache {
    fn default() -> Self {
        Self::empty()
    }
}

impl Cache {
    /// The shape every session starts from and every teardown returns to:
    /// all streams unknown, no services, single-stream mode.
    pub fn empty() -> Self {
        Self {
            streams: StreamId::iter()
                .map(|id| (id, StreamState::default()))
                .collect(),
            services: StreamId::SERVICE_STREAMS
                .iter()
                .map(|id| (*id, Vec::new()))
                .collect(),
            multi_stream_mode: false,
            device_type: None,
        }
    }

    pub fn stream(&self, id: StreamId) -> StreamState {
        self.streams.get(&id).copied().unwrap_or_default()
    }

    /// Unknown counts as not recording.
    pub fn is_recording(&self, id: StreamId) -> bool {
        self.stream(id).is_recording.unwrap_or(false)
    }

    pub fn services(&self, id: StreamId) -> &[ServiceDescriptor] {
        self.services.get(&id).map_or(&[], Vec::as_slice)
    }

    pub fn service(&self, stream: StreamId, service_id: &str) -> Option<&ServiceDescriptor> {
        self.services(stream).iter().find(|s| s.id == service_id)
    }

    /// Streams that are meaningful in the current mode.
    pub fn active_streams(&self) -> Vec<StreamId> {
        if self.multi_stream_mode {
            StreamId::iter().collect()
        } else {
            vec![StreamId::Main]
        }
    }
}
