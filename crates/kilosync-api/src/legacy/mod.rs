// Legacy (.lua) encoder API
//
// Every operation is `GET|POST /api/V1/<operation>.lua` answered with the
// `{Result, Status, Data}` envelope. Endpoint methods live in `stream.rs`
// as inherent methods on `LegacyClient`.

pub mod client;
pub mod models;
mod stream;

pub use client::LegacyClient;
pub use models::{
    DeviceInfo, LegacyResponse, RECORDING_ACTIVE_STATUS, RTSP_SERVICE_TYPE, RecordingStatus,
    SUCCESS_RESULT, ServiceStatus, StreamServices, StreamingMode,
};
