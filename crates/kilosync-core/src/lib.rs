// kilosync-core: Polling and reconciliation engine for encoder state

pub mod adapter;
pub mod capability;
pub mod command;
pub mod config;
pub mod engine;
pub mod equality;
pub mod error;
pub mod model;
pub mod presentation;

pub use adapter::{Adapter, DeviceAdapter};
pub use capability::{CapabilitySnapshot, Choice, ServiceChoice};
pub use command::{Command, CommandResult, StartStopAction};
pub use config::{DeviceModel, EngineConfig, VideoInterface};
pub use engine::{DeviceStatus, Engine, EngineEvent, EnginePhase, FeedbackFamily};
pub use error::CoreError;
pub use model::{Cache, DeviceIdentity, ServiceDescriptor, StreamId, StreamState};
