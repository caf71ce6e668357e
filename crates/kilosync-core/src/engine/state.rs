// ── Engine state and events ──
//
// What consumers can observe: the lifecycle phase, the client-visible
// device status, and the event stream. Session tasks publish through a
// `Reporter`, which goes silent once its session is cancelled.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::{broadcast, watch};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::capability::CapabilitySnapshot;

const EVENT_CHANNEL_SIZE: usize = 256;

/// Engine lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum EnginePhase {
    Unconfigured,
    Connecting,
    Polling,
    /// Last cycle failed; the timer keeps firing.
    Degraded,
    TornDown,
}

impl EnginePhase {
    /// Phases in which commands are accepted.
    pub fn is_active(self) -> bool {
        matches!(self, Self::Polling | Self::Degraded)
    }
}

/// Device status as an operator console would show it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "message")]
pub enum DeviceStatus {
    Disconnected,
    BadConfig(String),
    Connecting,
    Ok,
    ConnectionFailure(String),
    UnknownError(String),
    AuthenticationFailure(String),
}

impl DeviceStatus {
    pub fn message(&self) -> Option<&str> {
        match self {
            Self::BadConfig(m)
            | Self::ConnectionFailure(m)
            | Self::UnknownError(m)
            | Self::AuthenticationFailure(m) => Some(m),
            Self::Disconnected | Self::Connecting | Self::Ok => None,
        }
    }
}

impl fmt::Display for DeviceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Disconnected => "disconnected",
            Self::BadConfig(_) => "bad config",
            Self::Connecting => "connecting",
            Self::Ok => "ok",
            Self::ConnectionFailure(_) => "connection failure",
            Self::UnknownError(_) => "unknown error",
            Self::AuthenticationFailure(_) => "authentication failure",
        };
        match self.message() {
            Some(message) => write!(f, "{name}: {message}"),
            None => f.write_str(name),
        }
    }
}

/// Notification families re-evaluated after a state change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum FeedbackFamily {
    Recording,
    MainService,
    SubService,
}

impl FeedbackFamily {
    pub const ALL: [Self; 3] = [Self::Recording, Self::MainService, Self::SubService];

    /// Identifier used by the presentation layer.
    pub fn id(self) -> &'static str {
        match self {
            Self::Recording => "recordingState",
            Self::MainService => "mainServiceState",
            Self::SubService => "subServiceState",
        }
    }
}

/// Families marked changed during one cycle or command.
pub(crate) type ChangeSet = BTreeSet<FeedbackFamily>;

/// Broadcast to every subscriber.
#[derive(Debug, Clone)]
pub enum EngineEvent {
    /// Device status changed.
    Status(DeviceStatus),
    /// One connect attempt failed; the session retries after a backoff.
    ConnectAttemptFailed { attempt: u32 },
    /// A new capability snapshot was installed.
    CapabilitiesChanged(Arc<CapabilitySnapshot>),
    /// These families need their predicates re-evaluated.
    FeedbacksChanged(Vec<FeedbackFamily>),
}

/// Engine-wide publishers, shared by the facade and the session task.
pub(crate) struct Signals {
    pub phase: watch::Sender<EnginePhase>,
    pub status: watch::Sender<DeviceStatus>,
    pub events: broadcast::Sender<EngineEvent>,
}

impl Signals {
    pub fn new() -> Self {
        let (phase, _) = watch::channel(EnginePhase::Unconfigured);
        let (status, _) = watch::channel(DeviceStatus::Disconnected);
        let (events, _) = broadcast::channel(EVENT_CHANNEL_SIZE);
        Self {
            phase,
            status,
            events,
        }
    }

    pub fn set_phase(&self, phase: EnginePhase) {
        self.phase.send_if_modified(|current| {
            if *current == phase {
                return false;
            }
            debug!(from = ?*current, to = ?phase, "engine phase");
            *current = phase;
            true
        });
    }

    /// Update the status, emitting an event only when it changed.
    pub fn set_status(&self, status: DeviceStatus) {
        let changed = self.status.send_if_modified(|current| {
            if *current == status {
                return false;
            }
            *current = status.clone();
            true
        });
        if changed {
            let _ = self.events.send(EngineEvent::Status(status));
        }
    }

    pub fn emit(&self, event: EngineEvent) {
        let _ = self.events.send(event);
    }
}

/// A session's handle on the signals. Every method is a no-op once the
/// session has been cancelled, so a cycle that was already in flight at
/// teardown cannot leak into the next session.
#[derive(Clone)]
pub(crate) struct Reporter {
    signals: Arc<Signals>,
    cancel: CancellationToken,
}

impl Reporter {
    pub fn new(signals: Arc<Signals>, cancel: CancellationToken) -> Self {
        Self { signals, cancel }
    }

    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn is_live(&self) -> bool {
        !self.cancel.is_cancelled()
    }

    pub fn phase(&self, phase: EnginePhase) {
        if self.is_live() {
            self.signals.set_phase(phase);
        }
    }

    pub fn status(&self, status: DeviceStatus) {
        if self.is_live() {
            self.signals.set_status(status);
        }
    }

    pub fn emit(&self, event: EngineEvent) {
        if self.is_live() {
            self.signals.emit(event);
        }
    }
}
