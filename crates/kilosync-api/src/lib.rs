// kilosync-api: Async Rust client for Kiloview-style encoder control APIs (legacy + token)

pub mod auth;
pub mod error;
pub mod legacy;
pub mod token;
pub mod transport;

mod de;

pub use auth::Credentials;
pub use error::Error;
pub use legacy::LegacyClient;
pub use token::{TokenClient, TokenResponse, VideoInterface};
pub use transport::{RequestKind, TransportConfig};
