// ── Command API ──
//
// Mutations an operator can request. Commands are queued to the session
// task and run between poll cycles, never concurrently with one.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;

use crate::error::CoreError;
use crate::model::StreamId;

/// Requested direction for a recording or service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StartStopAction {
    Start,
    Stop,
    /// Invert whatever the cache currently says.
    Toggle,
}

impl StartStopAction {
    pub const ALL: [Self; 3] = [Self::Start, Self::Stop, Self::Toggle];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Stop => "stop",
            Self::Toggle => "toggle",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Start => "Start",
            Self::Stop => "Stop",
            Self::Toggle => "Toggle",
        }
    }

    /// Resolve to an on/off target given the current state.
    pub fn resolve(self, currently_on: bool) -> bool {
        match self {
            Self::Start => true,
            Self::Stop => false,
            Self::Toggle => !currently_on,
        }
    }
}

impl fmt::Display for StartStopAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StartStopAction {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "start" => Ok(Self::Start),
            "stop" => Ok(Self::Stop),
            "toggle" => Ok(Self::Toggle),
            other => Err(CoreError::OperationFailed {
                message: format!("status of '{other}' not implemented"),
            }),
        }
    }
}

/// All operator-initiated mutations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Start/stop/toggle recording on a stream, then re-read recording state.
    Recording {
        stream: StreamId,
        action: StartStopAction,
    },
    /// Enable/disable/toggle one service, then re-read the service lists.
    Service {
        stream: StreamId,
        service_id: String,
        action: StartStopAction,
    },
    /// Turn on the encoder for the configured interface (token model only).
    EnableEncoder,
    /// Read whether the configured interface has an active encoder input.
    EncoderStatus,
    /// Run one full poll cycle now.
    Refresh,
}

/// Outcome of a successful command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandResult {
    /// Recording was switched; `recording` is the requested target.
    Recording { stream: StreamId, recording: bool },
    /// A service was switched; `enabled` is the requested target.
    Service {
        stream: StreamId,
        service_id: String,
        enabled: bool,
    },
    /// Encoder state as reported by the device.
    Encoder { active: bool },
    Ok,
}

pub(crate) struct CommandEnvelope {
    pub command: Command,
    pub response_tx: oneshot::Sender<Result<CommandResult, CoreError>>,
}
