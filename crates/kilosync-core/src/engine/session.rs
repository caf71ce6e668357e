// ── Session task ──
//
// One task per applied configuration. It owns the adapter and the cache,
// runs the connect-retry loop, then serializes poll cycles and commands
// through a single select loop, so two cycles never overlap.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::{mpsc, watch};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::adapter::DeviceAdapter;
use crate::capability::CapabilitySnapshot;
use crate::command::{Command, CommandEnvelope, CommandResult};
use crate::engine::state::{
    ChangeSet, DeviceStatus, EngineEvent, EnginePhase, FeedbackFamily, Reporter,
};
use crate::error::CoreError;
use crate::model::{Cache, ServiceDescriptor, StreamId};

/// Wait between failed connect attempts.
pub const CONNECT_RETRY_DELAY: Duration = Duration::from_secs(3);

/// Wait between the first successful probe and arming the poll timer.
pub const SETTLE_DELAY: Duration = Duration::from_secs(2);

/// Read side of a session's state, held by the engine facade.
pub(crate) struct SessionView {
    pub cache: watch::Receiver<Cache>,
    pub capabilities: watch::Receiver<Option<Arc<CapabilitySnapshot>>>,
    pub last_poll: watch::Receiver<Option<DateTime<Utc>>>,
}

pub(crate) struct Session<A> {
    adapter: A,
    interval: Duration,
    reporter: Reporter,
    cache: watch::Sender<Cache>,
    capabilities: watch::Sender<Option<Arc<CapabilitySnapshot>>>,
    last_poll: watch::Sender<Option<DateTime<Utc>>>,
}

impl<A: DeviceAdapter> Session<A> {
    pub fn new(adapter: A, interval: Duration, reporter: Reporter) -> (Self, SessionView) {
        let (cache, cache_rx) = watch::channel(Cache::empty());
        let (capabilities, capabilities_rx) = watch::channel(None);
        let (last_poll, last_poll_rx) = watch::channel(None);
        let session = Self {
            adapter,
            interval,
            reporter,
            cache,
            capabilities,
            last_poll,
        };
        let view = SessionView {
            cache: cache_rx,
            capabilities: capabilities_rx,
            last_poll: last_poll_rx,
        };
        (session, view)
    }

    /// Connect, then poll until cancelled.
    pub async fn run(self, mut commands: mpsc::Receiver<CommandEnvelope>) {
        let cancel = self.reporter.cancel_token().clone();

        if !self.connect(&cancel).await {
            debug!("session ended before polling started");
            return;
        }
        self.reporter.phase(EnginePhase::Polling);

        // First tick fires immediately, then every interval.
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                () = cancel.cancelled() => break,
                _ = ticker.tick() => {
                    self.run_cycle().await;
                }
                envelope = commands.recv() => {
                    let Some(envelope) = envelope else { break };
                    let result = self.handle(envelope.command).await;
                    let _ = envelope.response_tx.send(result);
                }
            }
        }
        debug!("session stopped");
    }

    // ── Connecting ───────────────────────────────────────────────

    /// Probe until the device answers once, then settle. Returns `false`
    /// if the session was cancelled or the login was rejected.
    async fn connect(&self, cancel: &CancellationToken) -> bool {
        let mut attempt: u32 = 0;
        let mut prepared = false;

        loop {
            attempt += 1;

            if !prepared {
                match self.adapter.prepare().await {
                    Ok(()) => prepared = true,
                    Err(err) if err.is_auth() => {
                        error!(error = %err, "login rejected, session halted");
                        self.reporter
                            .status(DeviceStatus::AuthenticationFailure(err.to_string()));
                        return false;
                    }
                    Err(err) => warn!(attempt, error = %err, "session setup failed"),
                }
            }

            if prepared && self.poll_cycle().await {
                break;
            }

            self.reporter.status(DeviceStatus::ConnectionFailure(
                "Unable to Connect to Device".into(),
            ));
            self.reporter
                .emit(EngineEvent::ConnectAttemptFailed { attempt });

            tokio::select! {
                () = cancel.cancelled() => return false,
                () = tokio::time::sleep(CONNECT_RETRY_DELAY) => {}
            }
        }

        info!(attempts = attempt, "device connected");

        tokio::select! {
            () = cancel.cancelled() => false,
            () = tokio::time::sleep(SETTLE_DELAY) => true,
        }
    }

    // ── Poll cycle ───────────────────────────────────────────────

    async fn run_cycle(&self) -> bool {
        let ok = self.poll_cycle().await;
        self.reporter.phase(if ok {
            EnginePhase::Polling
        } else {
            EnginePhase::Degraded
        });
        ok
    }

    /// One full refresh. A failed identity probe skips everything else and
    /// leaves the cache untouched; a later step failure keeps whatever the
    /// earlier steps already wrote.
    async fn poll_cycle(&self) -> bool {
        let identity = match self.adapter.device_identity().await {
            Ok(identity) => identity,
            Err(err) => {
                self.report_probe_failure(&err);
                return false;
            }
        };

        self.reporter.status(DeviceStatus::Ok);
        self.cache
            .send_if_modified(|c| replace_if_changed(&mut c.device_type, identity.device_type));

        let mut changed = ChangeSet::new();
        let outcome = self.refresh_state(&mut changed).await;
        self.notify(changed);

        match outcome {
            Ok(()) => {
                self.last_poll.send_replace(Some(Utc::now()));
                true
            }
            Err(err) => {
                self.report_step_failure(&err);
                false
            }
        }
    }

    async fn refresh_state(&self, changed: &mut ChangeSet) -> Result<(), CoreError> {
        self.refresh_stream_mode().await?;
        self.refresh_services(changed).await?;
        self.refresh_recordings(changed).await
    }

    async fn refresh_stream_mode(&self) -> Result<(), CoreError> {
        match self.adapter.multi_stream_mode().await {
            Ok(Some(multi)) => {
                self.cache
                    .send_if_modified(|c| replace_if_changed(&mut c.multi_stream_mode, multi));
                Ok(())
            }
            Ok(None) => Ok(()),
            Err(err) if err.is_envelope() => {
                warn!(error = %err, "stream mode unavailable this cycle");
                Ok(())
            }
            Err(err) => Err(err),
        }
    }

    /// Main (and in multi-stream mode sub) services, fetched concurrently
    /// and applied independently, then the capability gate.
    async fn refresh_services(&self, changed: &mut ChangeSet) -> Result<(), CoreError> {
        let multi = self.cache.borrow().multi_stream_mode;
        let (main, sub) = tokio::join!(
            self.adapter.stream_services(StreamId::Main),
            when(multi, self.adapter.stream_services(StreamId::Sub)),
        );

        let main_failure = self.apply_services(StreamId::Main, main, changed);
        let sub_failure = sub.and_then(|sub| self.apply_services(StreamId::Sub, sub, changed));

        self.update_capabilities();

        match main_failure.or(sub_failure) {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn apply_services(
        &self,
        stream: StreamId,
        result: Result<Vec<ServiceDescriptor>, CoreError>,
        changed: &mut ChangeSet,
    ) -> Option<CoreError> {
        match result {
            Ok(services) => {
                let modified = self.cache.send_if_modified(|c| {
                    replace_if_changed(c.services.entry(stream).or_default(), services)
                });
                if modified {
                    debug!(%stream, "service list changed");
                    changed.insert(service_family(stream));
                }
                None
            }
            Err(err) if err.is_envelope() => {
                warn!(%stream, error = %err, "no service data this cycle");
                None
            }
            Err(err) => {
                error!(%stream, error = %err, "service refresh failed");
                Some(err)
            }
        }
    }

    /// Install a new snapshot only when the choice lists actually changed.
    fn update_capabilities(&self) {
        let next = CapabilitySnapshot::from_cache(&self.cache.borrow());
        if !CapabilitySnapshot::differs(self.capabilities.borrow().as_deref(), &next) {
            return;
        }

        debug!("capability surface updated");
        let next = Arc::new(next);
        self.capabilities.send_replace(Some(Arc::clone(&next)));
        self.reporter.emit(EngineEvent::CapabilitiesChanged(next));
    }

    async fn refresh_recordings(&self, changed: &mut ChangeSet) -> Result<(), CoreError> {
        let multi = self.cache.borrow().multi_stream_mode;
        let (main, sub, combined) = tokio::join!(
            self.adapter.recording_state(StreamId::Main),
            when(multi, self.adapter.recording_state(StreamId::Sub)),
            when(multi, self.adapter.recording_state(StreamId::MainSub)),
        );

        let mut failure = None;
        for (stream, result) in [
            (StreamId::Main, Some(main)),
            (StreamId::Sub, sub),
            (StreamId::MainSub, combined),
        ] {
            match result {
                None => {}
                Some(Ok(recording)) => {
                    let modified = self.cache.send_if_modified(|c| {
                        replace_if_changed(
                            &mut c.streams.entry(stream).or_default().is_recording,
                            Some(recording),
                        )
                    });
                    if modified {
                        debug!(%stream, recording, "recording state changed");
                        changed.insert(FeedbackFamily::Recording);
                    }
                }
                Some(Err(err)) if err.is_envelope() => {
                    warn!(%stream, error = %err, "no recording data this cycle");
                }
                Some(Err(err)) => {
                    error!(%stream, error = %err, "recording refresh failed");
                    if failure.is_none() {
                        failure = Some(err);
                    }
                }
            }
        }

        match failure {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn notify(&self, changed: ChangeSet) {
        if changed.is_empty() {
            return;
        }
        self.reporter
            .emit(EngineEvent::FeedbacksChanged(changed.into_iter().collect()));
    }

    fn report_probe_failure(&self, err: &CoreError) {
        let status = if err.is_envelope() {
            error!(error = %err, "unable to connect to device");
            DeviceStatus::ConnectionFailure("Unknown Response from Device".into())
        } else if err.is_auth() {
            warn!(error = %err, "device rejected credentials");
            DeviceStatus::AuthenticationFailure("Unauthorized".into())
        } else {
            error!(error = %err, "check status error");
            DeviceStatus::UnknownError("Error connecting to device".into())
        };
        self.reporter.status(status);
    }

    fn report_step_failure(&self, err: &CoreError) {
        let status = if err.is_auth() {
            warn!(error = %err, "device rejected credentials");
            DeviceStatus::AuthenticationFailure("Unauthorized".into())
        } else {
            error!(error = %err, "poll cycle failed");
            DeviceStatus::UnknownError("Error connecting to device".into())
        };
        self.reporter.status(status);
    }

    // ── Commands ─────────────────────────────────────────────────

    async fn handle(&self, command: Command) -> Result<CommandResult, CoreError> {
        match command {
            Command::Recording { stream, action } => {
                let recording = action.resolve(self.cache.borrow().is_recording(stream));
                info!(%stream, recording, "recording command");
                self.adapter.set_recording(stream, recording).await?;

                let mut changed = ChangeSet::new();
                let refreshed = self.refresh_recordings(&mut changed).await;
                self.notify(changed);
                refreshed?;

                Ok(CommandResult::Recording { stream, recording })
            }
            Command::Service {
                stream,
                service_id,
                action,
            } => {
                let service = self
                    .cache
                    .borrow()
                    .service(stream, &service_id)
                    .cloned()
                    .ok_or_else(|| CoreError::ServiceNotFound {
                        stream: stream.to_string(),
                        service: service_id.clone(),
                    })?;
                let enabled = action.resolve(service.enabled);
                info!(%stream, service = %service_id, enabled, "service command");
                self.adapter.set_service(stream, &service, enabled).await?;

                let mut changed = ChangeSet::new();
                let refreshed = self.refresh_services(&mut changed).await;
                self.notify(changed);
                refreshed?;

                Ok(CommandResult::Service {
                    stream,
                    service_id,
                    enabled,
                })
            }
            Command::EnableEncoder => {
                self.adapter.enable_encoder().await?;
                Ok(CommandResult::Ok)
            }
            Command::EncoderStatus => {
                let active = self.adapter.encoder_status().await?;
                Ok(CommandResult::Encoder { active })
            }
            Command::Refresh => {
                if self.run_cycle().await {
                    Ok(CommandResult::Ok)
                } else {
                    Err(CoreError::OperationFailed {
                        message: "refresh cycle failed".into(),
                    })
                }
            }
        }
    }
}

fn service_family(stream: StreamId) -> FeedbackFamily {
    match stream {
        StreamId::Sub => FeedbackFamily::SubService,
        StreamId::Main | StreamId::MainSub => FeedbackFamily::MainService,
    }
}

/// Write `value` into `slot` if it differs; report whether it did.
fn replace_if_changed<T: PartialEq>(slot: &mut T, value: T) -> bool {
    if *slot == value {
        return false;
    }
    *slot = value;
    true
}

/// Await `fut` only when `enabled`.
async fn when<F: Future>(enabled: bool, fut: F) -> Option<F::Output> {
    if enabled { Some(fut.await) } else { None }
}
