use serde::{Deserialize, Serialize};

use kilosync_api::legacy::ServiceStatus;
use kilosync_api::token::TokenStream;

/// A streaming output bound to one stream.
///
/// RTSP is never represented here; the adapters drop it before the engine
/// sees the list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceDescriptor {
    pub id: String,
    pub label: String,
    #[serde(rename = "type")]
    pub service_type: String,
    pub enabled: bool,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
}

impl From<ServiceStatus> for ServiceDescriptor {
    fn from(s: ServiceStatus) -> Self {
        Self {
            id: s.id,
            label: s.service_type.clone(),
            service_type: s.service_type,
            enabled: s.enable,
            status: s.status,
            url: s.url,
        }
    }
}

impl From<TokenStream> for ServiceDescriptor {
    fn from(s: TokenStream) -> Self {
        Self {
            id: s.id,
            label: s
                .name
                .filter(|n| !n.is_empty())
                .unwrap_or_else(|| s.protocol.clone()),
            service_type: s.protocol,
            enabled: s.enable,
            status: s.status,
            url: s.url,
        }
    }
}
