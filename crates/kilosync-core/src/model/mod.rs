// ── Domain model ──
//
// Engine-side view of the device: stream identities, services, and the
// cache the poll task owns.

mod cache;
mod service;
mod stream;

pub use cache::{Cache, DeviceIdentity};
pub use service::ServiceDescriptor;
pub use stream::{StreamId, StreamState};
