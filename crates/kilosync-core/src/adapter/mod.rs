// ── Device adapter seam ──
//
// The engine speaks in logical operations; each device generation maps
// them onto its own wire protocol. `Adapter` is the configuration-selected
// variant the engine holds by value.

mod legacy;
mod token;

use std::future::Future;

use kilosync_api::{LegacyClient, TokenClient};

use crate::config::{DeviceModel, EngineConfig};
use crate::error::CoreError;
use crate::model::{DeviceIdentity, ServiceDescriptor, StreamId};

/// Logical device operations used by the engine.
///
/// Envelope-level failures come back as [`CoreError::Envelope`] so the
/// engine can treat them as "no data this cycle".
pub trait DeviceAdapter: Send + Sync + 'static {
    /// Session setup before the first probe (token login).
    fn prepare(&self) -> impl Future<Output = Result<(), CoreError>> + Send;

    /// Liveness probe; also reports the product type.
    fn device_identity(&self) -> impl Future<Output = Result<DeviceIdentity, CoreError>> + Send;

    /// `Some(flag)` when the device reports its stream mode.
    fn multi_stream_mode(&self) -> impl Future<Output = Result<Option<bool>, CoreError>> + Send;

    /// User-controllable services of one stream, RTSP excluded.
    fn stream_services(
        &self,
        stream: StreamId,
    ) -> impl Future<Output = Result<Vec<ServiceDescriptor>, CoreError>> + Send;

    fn recording_state(
        &self,
        stream: StreamId,
    ) -> impl Future<Output = Result<bool, CoreError>> + Send;

    fn set_recording(
        &self,
        stream: StreamId,
        recording: bool,
    ) -> impl Future<Output = Result<(), CoreError>> + Send;

    fn set_service(
        &self,
        stream: StreamId,
        service: &ServiceDescriptor,
        enabled: bool,
    ) -> impl Future<Output = Result<(), CoreError>> + Send;

    fn enable_encoder(&self) -> impl Future<Output = Result<(), CoreError>> + Send;

    /// Whether the configured interface reports an active encoder input.
    fn encoder_status(&self) -> impl Future<Output = Result<bool, CoreError>> + Send;
}

/// The adapter for the configured device model.
pub enum Adapter {
    Legacy(LegacyClient),
    Token(TokenClient),
}

impl Adapter {
    /// Build the client matching `config.model`.
    pub fn from_config(config: &EngineConfig) -> Result<Self, CoreError> {
        let transport = config.transport();
        let credentials = config.credentials();
        match config.model {
            DeviceModel::Legacy => Ok(Self::Legacy(LegacyClient::new(
                &config.address,
                credentials,
                &transport,
            )?)),
            DeviceModel::Token => Ok(Self::Token(TokenClient::new(
                &config.address,
                config.interface,
                credentials,
                &transport,
            )?)),
        }
    }

    pub fn model(&self) -> DeviceModel {
        match self {
            Self::Legacy(_) => DeviceModel::Legacy,
            Self::Token(_) => DeviceModel::Token,
        }
    }
}

// Both clients have inherent methods sharing these names, so dispatch
// goes through the trait explicitly.
impl DeviceAdapter for Adapter {
    async fn prepare(&self) -> Result<(), CoreError> {
        match self {
            Self::Legacy(c) => DeviceAdapter::prepare(c).await,
            Self::Token(c) => DeviceAdapter::prepare(c).await,
        }
    }

    async fn device_identity(&self) -> Result<DeviceIdentity, CoreError> {
        match self {
            Self::Legacy(c) => DeviceAdapter::device_identity(c).await,
            Self::Token(c) => DeviceAdapter::device_identity(c).await,
        }
    }

    async fn multi_stream_mode(&self) -> Result<Option<bool>, CoreError> {
        match self {
            Self::Legacy(c) => DeviceAdapter::multi_stream_mode(c).await,
            Self::Token(c) => DeviceAdapter::multi_stream_mode(c).await,
        }
    }

    async fn stream_services(&self, stream: StreamId) -> Result<Vec<ServiceDescriptor>, CoreError> {
        match self {
            Self::Legacy(c) => DeviceAdapter::stream_services(c, stream).await,
            Self::Token(c) => DeviceAdapter::stream_services(c, stream).await,
        }
    }

    async fn recording_state(&self, stream: StreamId) -> Result<bool, CoreError> {
        match self {
            Self::Legacy(c) => DeviceAdapter::recording_state(c, stream).await,
            Self::Token(c) => DeviceAdapter::recording_state(c, stream).await,
        }
    }

    async fn set_recording(&self, stream: StreamId, recording: bool) -> Result<(), CoreError> {
        match self {
            Self::Legacy(c) => DeviceAdapter::set_recording(c, stream, recording).await,
            Self::Token(c) => DeviceAdapter::set_recording(c, stream, recording).await,
        }
    }

    async fn set_service(
        &self,
        stream: StreamId,
        service: &ServiceDescriptor,
        enabled: bool,
    ) -> Result<(), CoreError> {
        match self {
            Self::Legacy(c) => DeviceAdapter::set_service(c, stream, service, enabled).await,
            Self::Token(c) => DeviceAdapter::set_service(c, stream, service, enabled).await,
        }
    }

    async fn enable_encoder(&self) -> Result<(), CoreError> {
        match self {
            Self::Legacy(c) => DeviceAdapter::enable_encoder(c).await,
            Self::Token(c) => DeviceAdapter::enable_encoder(c).await,
        }
    }

    async fn encoder_status(&self) -> Result<bool, CoreError> {
        match self {
            Self::Legacy(c) => DeviceAdapter::encoder_status(c).await,
            Self::Token(c) => DeviceAdapter::encoder_status(c).await,
        }
    }
}
