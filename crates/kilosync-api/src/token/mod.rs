// Token-authenticated REST API (E3 generation)
//
// JSON over `http://<address><path>`, scoped to one video interface. Calls
// never fail with `Err`: transport and HTTP failures fold into a
// `TokenResponse` with `result: error`. Only `login()` propagates errors.

pub mod client;
pub mod models;
mod endpoints;

pub use client::TokenClient;
pub use models::{
    LOGIN_PATH, LoginData, RTSP_PROTOCOL, RecordingStatusData, TokenResponse, TokenResult,
    TokenStream, VideoInterface,
};
