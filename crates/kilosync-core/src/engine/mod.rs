// ── Reconciliation engine ──
//
// Lifecycle management for one device: configuration apply, the session
// task that connects and polls, command routing, and observation of the
// cache, capability snapshot, status, and events.

mod session;
mod state;

use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::adapter::{Adapter, DeviceAdapter};
use crate::capability::CapabilitySnapshot;
use crate::command::{Command, CommandEnvelope, CommandResult};
use crate::config::EngineConfig;
use crate::error::CoreError;
use crate::model::Cache;

use self::session::{Session, SessionView};
use self::state::{Reporter, Signals};

pub use self::session::{CONNECT_RETRY_DELAY, SETTLE_DELAY};
pub use self::state::{DeviceStatus, EngineEvent, EnginePhase, FeedbackFamily};

const COMMAND_CHANNEL_SIZE: usize = 16;

// ── Engine ───────────────────────────────────────────────────────

/// The main entry point for consumers.
///
/// Cheaply cloneable via `Arc<EngineInner>`. Holds at most one session at
/// a time; applying a configuration or tearing down cancels the previous
/// session before anything else happens.
#[derive(Clone)]
pub struct Engine {
    inner: Arc<EngineInner>,
}

struct EngineInner {
    signals: Arc<Signals>,
    session: Mutex<Option<SessionHandle>>,
}

struct SessionHandle {
    cancel: CancellationToken,
    commands: mpsc::Sender<CommandEnvelope>,
    view: SessionView,
    task: JoinHandle<()>,
}

impl Drop for EngineInner {
    fn drop(&mut self) {
        if let Ok(session) = self.session.get_mut() {
            if let Some(handle) = session.take() {
                handle.cancel.cancel();
            }
        }
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

impl Engine {
    /// Create an idle engine (`Unconfigured`, `Disconnected`).
    pub fn new() -> Self {
        Self {
            inner: Arc::new(EngineInner {
                signals: Arc::new(Signals::new()),
                session: Mutex::new(None),
            }),
        }
    }

    // ── Lifecycle ────────────────────────────────────────────────

    /// Apply a configuration: cancel any previous session, reset the
    /// cache, and start connecting with the adapter for `config.model`.
    ///
    /// An empty address is not an error: the engine reports `BadConfig`
    /// and stays `Unconfigured`. Must be called from within a Tokio runtime.
    pub fn apply_config(&self, config: &EngineConfig) -> Result<(), CoreError> {
        self.stop_session();

        if !config.has_address() {
            warn!("no device address configured");
            self.mark_unconfigured("IP needs to be configured".into());
            return Ok(());
        }

        let adapter = config.validate().and_then(|()| Adapter::from_config(config));
        match adapter {
            Ok(adapter) => {
                info!(address = %config.address, model = %config.model, "configuration applied");
                self.start(adapter, config);
                Ok(())
            }
            Err(err) => {
                warn!(error = %err, "configuration rejected");
                self.mark_unconfigured(err.to_string());
                Err(err)
            }
        }
    }

    /// Like [`apply_config`](Self::apply_config), but with a caller-supplied
    /// adapter instead of one built from `config.model`.
    pub fn apply_with_adapter<A: DeviceAdapter>(
        &self,
        config: &EngineConfig,
        adapter: A,
    ) -> Result<(), CoreError> {
        self.stop_session();

        if let Err(err) = config.validate() {
            self.mark_unconfigured(err.to_string());
            return Err(err);
        }
        self.start(adapter, config);
        Ok(())
    }

    /// Cancel the session. Any cycle still in flight finishes into the
    /// discarded session; the cache reads empty from here on.
    pub fn teardown(&self) {
        self.stop_session();
        self.inner.signals.set_status(DeviceStatus::Disconnected);
        self.inner.signals.set_phase(EnginePhase::TornDown);
        info!("engine torn down");
    }

    fn start<A: DeviceAdapter>(&self, adapter: A, config: &EngineConfig) {
        let cancel = CancellationToken::new();
        let reporter = Reporter::new(Arc::clone(&self.inner.signals), cancel.clone());
        let (session, view) = Session::new(adapter, config.interval, reporter);
        let (commands, command_rx) = mpsc::channel(COMMAND_CHANNEL_SIZE);

        self.inner.signals.set_status(DeviceStatus::Connecting);
        self.inner.signals.set_phase(EnginePhase::Connecting);

        let task = tokio::spawn(session.run(command_rx));
        *self.session() = Some(SessionHandle {
            cancel,
            commands,
            view,
            task,
        });
    }

    fn stop_session(&self) {
        if let Some(handle) = self.session().take() {
            handle.cancel.cancel();
            debug!("previous session cancelled");
        }
    }

    fn mark_unconfigured(&self, reason: String) {
        self.inner.signals.set_status(DeviceStatus::BadConfig(reason));
        self.inner.signals.set_phase(EnginePhase::Unconfigured);
    }

    fn session(&self) -> MutexGuard<'_, Option<SessionHandle>> {
        self.inner.session.lock().expect("session lock poisoned")
    }

    /// Whether a session task is alive (connecting or polling).
    pub fn is_running(&self) -> bool {
        self.session()
            .as_ref()
            .is_some_and(|handle| !handle.task.is_finished())
    }

    // ── Command execution ────────────────────────────────────────

    /// Queue a command to the session task and await its result.
    ///
    /// Only accepted while polling (or degraded).
    pub async fn execute(&self, cmd: Command) -> Result<CommandResult, CoreError> {
        if !self.phase().is_active() {
            return Err(CoreError::NotConnected);
        }

        let commands = self
            .session()
            .as_ref()
            .map(|handle| handle.commands.clone())
            .ok_or(CoreError::NotConnected)?;

        let (tx, rx) = oneshot::channel();
        commands
            .send(CommandEnvelope {
                command: cmd,
                response_tx: tx,
            })
            .await
            .map_err(|_| CoreError::NotConnected)?;

        rx.await.map_err(|_| CoreError::NotConnected)?
    }

    /// Resolve once the session reaches `Polling`/`Degraded`.
    ///
    /// Fails as soon as the device rejects our credentials while connecting,
    /// or if the engine is torn down first. Wrap in `tokio::time::timeout` to bound the wait.
    pub async fn wait_until_active(&self) -> Result<(), CoreError> {
        let mut phase = self.subscribe_phase();
        let mut status = self.subscribe_status();

        loop {
            let current = *phase.borrow_and_update();
            if current.is_active() {
                return Ok(());
            }
            if matches!(current, EnginePhase::TornDown | EnginePhase::Unconfigured) {
                return Err(CoreError::NotConnected);
            }
            if let DeviceStatus::AuthenticationFailure(message) = &*status.borrow_and_update() {
                return Err(CoreError::AuthenticationFailed {
                    message: message.clone(),
                });
            }

            tokio::select! {
                changed = phase.changed() => changed.map_err(|_| CoreError::NotConnected)?,
                changed = status.changed() => changed.map_err(|_| CoreError::NotConnected)?,
            }
        }
    }

    // ── State observation ────────────────────────────────────────

    /// Copy of the current cache; the empty shape when no session exists.
    pub fn cache(&self) -> Cache {
        self.session()
            .as_ref()
            .map_or_else(Cache::empty, |handle| handle.view.cache.borrow().clone())
    }

    /// The installed capability snapshot, if the first poll has happened.
    pub fn capabilities(&self) -> Option<Arc<CapabilitySnapshot>> {
        self.session()
            .as_ref()
            .and_then(|handle| handle.view.capabilities.borrow().clone())
    }

    /// When the last fully successful cycle finished.
    pub fn last_poll(&self) -> Option<DateTime<Utc>> {
        self.session()
            .as_ref()
            .and_then(|handle| *handle.view.last_poll.borrow())
    }

    pub fn status(&self) -> DeviceStatus {
        self.inner.signals.status.borrow().clone()
    }

    pub fn subscribe_status(&self) -> watch::Receiver<DeviceStatus> {
        self.inner.signals.status.subscribe()
    }

    pub fn phase(&self) -> EnginePhase {
        *self.inner.signals.phase.borrow()
    }

    pub fn subscribe_phase(&self) -> watch::Receiver<EnginePhase> {
        self.inner.signals.phase.subscribe()
    }

    /// Subscribe to the event broadcast stream.
    pub fn events(&self) -> broadcast::Receiver<EngineEvent> {
        self.inner.signals.events.subscribe()
    }
}
