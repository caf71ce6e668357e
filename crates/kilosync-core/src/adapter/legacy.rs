// Legacy `.lua` API mapped onto the adapter operations.

use kilosync_api::LegacyClient;
use tracing::debug;

use crate::adapter::DeviceAdapter;
use crate::error::CoreError;
use crate::model::{DeviceIdentity, ServiceDescriptor, StreamId};

impl DeviceAdapter for LegacyClient {
    // Basic auth rides on every request; nothing to set up.
    async fn prepare(&self) -> Result<(), CoreError> {
        Ok(())
    }

    async fn device_identity(&self) -> Result<DeviceIdentity, CoreError> {
        let info = self.device_info().await?;
        Ok(DeviceIdentity {
            device_type: info.oem_type,
        })
    }

    async fn multi_stream_mode(&self) -> Result<Option<bool>, CoreError> {
        Ok(self.streaming_mode().await?.is_multi_stream())
    }

    async fn stream_services(&self, stream: StreamId) -> Result<Vec<ServiceDescriptor>, CoreError> {
        let services = LegacyClient::stream_services(self, stream.as_str()).await?;
        Ok(services.into_iter().map(ServiceDescriptor::from).collect())
    }

    async fn recording_state(&self, stream: StreamId) -> Result<bool, CoreError> {
        Ok(self.recording_status(stream.as_str()).await?.is_recording())
    }

    async fn set_recording(&self, stream: StreamId, recording: bool) -> Result<(), CoreError> {
        if recording {
            self.start_record(stream.as_str()).await?;
        } else {
            self.stop_record(stream.as_str()).await?;
        }
        Ok(())
    }

    async fn set_service(
        &self,
        stream: StreamId,
        service: &ServiceDescriptor,
        enabled: bool,
    ) -> Result<(), CoreError> {
        self.set_stream_service(
            stream.as_str(),
            &service.id,
            &service.service_type,
            enabled,
        )
        .await?;
        Ok(())
    }

    async fn enable_encoder(&self) -> Result<(), CoreError> {
        debug!("enable encoder requested on a legacy device");
        Err(token_only("enable encoder"))
    }

    async fn encoder_status(&self) -> Result<bool, CoreError> {
        debug!("encoder status requested on a legacy device");
        Err(token_only("encoder status"))
    }
}

fn token_only(operation: &str) -> CoreError {
    CoreError::Unsupported {
        operation: operation.into(),
        required: "the token device model".into(),
    }
}
