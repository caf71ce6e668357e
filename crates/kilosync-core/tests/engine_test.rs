#![allow(clippy::unwrap_used)]
// Engine lifecycle tests against a scripted in-memory device.
//
// Time is paused, so the connect-retry, settle, and poll-interval timers
// advance deterministically whenever every task is idle.

use std::collections::{BTreeMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use pretty_assertions::assert_eq;
use tokio::sync::broadcast;
use tokio::time::Instant;

use kilosync_core::{
    Cache, Command, CommandResult, CoreError, DeviceAdapter, DeviceIdentity, DeviceStatus, Engine,
    EngineConfig, EngineEvent, EnginePhase, FeedbackFamily, ServiceDescriptor, StartStopAction,
    StreamId,
};

// ── Scripted device ─────────────────────────────────────────────────

#[derive(Default)]
struct Script {
    login_rejected: bool,
    /// Consumed one per identity probe before the device answers.
    probe_failures: VecDeque<CoreError>,
    device_down: bool,
    multi: bool,
    services: BTreeMap<StreamId, Vec<ServiceDescriptor>>,
    recording: BTreeMap<StreamId, bool>,
    recording_broken: bool,
    sub_services_broken: bool,
    encoder_on: bool,
    probes: Vec<Instant>,
    writes: Vec<String>,
}

#[derive(Clone)]
struct FakeDevice {
    script: Arc<Mutex<Script>>,
}

impl FakeDevice {
    fn new(script: Script) -> Self {
        Self {
            script: Arc::new(Mutex::new(script)),
        }
    }

    fn script(&self) -> std::sync::MutexGuard<'_, Script> {
        self.script.lock().unwrap()
    }
}

fn unreachable() -> CoreError {
    CoreError::ConnectionFailed {
        address: "10.0.0.5".into(),
        reason: "connection refused".into(),
    }
}

impl DeviceAdapter for FakeDevice {
    async fn prepare(&self) -> Result<(), CoreError> {
        if self.script().login_rejected {
            return Err(CoreError::AuthenticationFailed {
                message: "bad password".into(),
            });
        }
        Ok(())
    }

    async fn device_identity(&self) -> Result<DeviceIdentity, CoreError> {
        let mut script = self.script();
        script.probes.push(Instant::now());
        if let Some(err) = script.probe_failures.pop_front() {
            return Err(err);
        }
        if script.device_down {
            return Err(unreachable());
        }
        Ok(DeviceIdentity {
            device_type: Some("E2".into()),
        })
    }

    async fn multi_stream_mode(&self) -> Result<Option<bool>, CoreError> {
        Ok(Some(self.script().multi))
    }

    async fn stream_services(&self, stream: StreamId) -> Result<Vec<ServiceDescriptor>, CoreError> {
        let script = self.script();
        if stream == StreamId::Sub && script.sub_services_broken {
            return Err(unreachable());
        }
        Ok(script.services.get(&stream).cloned().unwrap_or_default())
    }

    async fn recording_state(&self, stream: StreamId) -> Result<bool, CoreError> {
        let script = self.script();
        if script.recording_broken {
            return Err(unreachable());
        }
        Ok(script.recording.get(&stream).copied().unwrap_or(false))
    }

    async fn set_recording(&self, stream: StreamId, recording: bool) -> Result<(), CoreError> {
        let mut script = self.script();
        script.writes.push(format!("record {stream} {recording}"));
        script.recording.insert(stream, recording);
        Ok(())
    }

    async fn set_service(
        &self,
        stream: StreamId,
        service: &ServiceDescriptor,
        enabled: bool,
    ) -> Result<(), CoreError> {
        let mut script = self.script();
        script
            .writes
            .push(format!("service {stream} {} {enabled}", service.id));
        if let Some(entry) = script
            .services
            .get_mut(&stream)
            .and_then(|list| list.iter_mut().find(|s| s.id == service.id))
        {
            entry.enabled = enabled;
        }
        Ok(())
    }

    async fn enable_encoder(&self) -> Result<(), CoreError> {
        let mut script = self.script();
        script.writes.push("encoder".into());
        script.encoder_on = true;
        Ok(())
    }

    async fn encoder_status(&self) -> Result<bool, CoreError> {
        Ok(self.script().encoder_on)
    }
}

// ── Helpers ─────────────────────────────────────────────────────────

fn service(id: &str, kind: &str, enabled: bool) -> ServiceDescriptor {
    ServiceDescriptor {
        id: id.into(),
        label: kind.into(),
        service_type: kind.into(),
        enabled,
        status: None,
        url: None,
    }
}

fn healthy_device() -> FakeDevice {
    FakeDevice::new(Script {
        services: BTreeMap::from([(StreamId::Main, vec![service("1", "Rtmp_push", false)])]),
        ..Script::default()
    })
}

fn config() -> EngineConfig {
    EngineConfig::new("10.0.0.5")
}

async fn start(device: &FakeDevice) -> Engine {
    let engine = Engine::new();
    engine.apply_with_adapter(&config(), device.clone()).unwrap();
    engine.wait_until_active().await.unwrap();
    // Let the immediate first tick run.
    tokio::time::sleep(Duration::from_millis(100)).await;
    engine
}

fn drain(events: &mut broadcast::Receiver<EngineEvent>) -> Vec<EngineEvent> {
    let mut out = Vec::new();
    while let Ok(event) = events.try_recv() {
        out.push(event);
    }
    out
}

fn feedbacks(events: &[EngineEvent]) -> Vec<Vec<FeedbackFamily>> {
    events
        .iter()
        .filter_map(|e| match e {
            EngineEvent::FeedbacksChanged(families) => Some(families.clone()),
            _ => None,
        })
        .collect()
}

fn capability_changes(events: &[EngineEvent]) -> usize {
    events
        .iter()
        .filter(|e| matches!(e, EngineEvent::CapabilitiesChanged(_)))
        .count()
}

// ── Lifecycle ───────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn connect_retries_then_polls_on_interval() {
    let device = healthy_device();
    device.script().probe_failures = VecDeque::from([unreachable(), unreachable()]);

    let engine = Engine::new();
    let mut events = engine.events();
    let started = Instant::now();
    engine.apply_with_adapter(&config(), device.clone()).unwrap();

    tokio::time::sleep(Duration::from_millis(10_500)).await;

    let offsets: Vec<u128> = device
        .script()
        .probes
        .iter()
        .map(|t| t.duration_since(started).as_millis())
        .collect();
    assert_eq!(offsets, vec![0, 3000, 6000, 8000, 10_000]);

    let attempts: Vec<u32> = drain(&mut events)
        .iter()
        .filter_map(|e| match e {
            EngineEvent::ConnectAttemptFailed { attempt } => Some(*attempt),
            _ => None,
        })
        .collect();
    assert_eq!(attempts, vec![1, 2]);
    assert_eq!(engine.status(), DeviceStatus::Ok);
    assert_eq!(engine.phase(), EnginePhase::Polling);
}

#[tokio::test(start_paused = true)]
async fn connect_failure_is_reported_while_retrying() {
    let device = healthy_device();
    device.script().device_down = true;

    let engine = Engine::new();
    engine.apply_with_adapter(&config(), device.clone()).unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;

    assert_eq!(
        engine.status(),
        DeviceStatus::ConnectionFailure("Unable to Connect to Device".into())
    );
    assert_eq!(engine.phase(), EnginePhase::Connecting);
    assert_eq!(engine.cache(), Cache::empty());
}

#[tokio::test(start_paused = true)]
async fn rejected_login_halts_the_session() {
    let device = healthy_device();
    device.script().login_rejected = true;

    let engine = Engine::new();
    engine.apply_with_adapter(&config(), device.clone()).unwrap();

    let err = engine.wait_until_active().await.unwrap_err();
    assert!(err.is_auth());
    assert!(matches!(
        engine.status(),
        DeviceStatus::AuthenticationFailure(_)
    ));
    assert!(device.script().probes.is_empty());
}

#[tokio::test(start_paused = true)]
async fn teardown_empties_the_cache() {
    let device = healthy_device();
    let engine = start(&device).await;
    assert_eq!(engine.cache().services(StreamId::Main).len(), 1);
    assert_eq!(engine.cache().device_type.as_deref(), Some("E2"));

    engine.teardown();

    assert_eq!(engine.cache(), Cache::empty());
    assert_eq!(engine.status(), DeviceStatus::Disconnected);
    assert_eq!(engine.phase(), EnginePhase::TornDown);
    assert!(engine.capabilities().is_none());

    // Nothing from the old session reaches the engine afterwards.
    let probes = device.script().probes.len();
    tokio::time::sleep(Duration::from_millis(5000)).await;
    assert_eq!(device.script().probes.len(), probes);
    assert_eq!(engine.status(), DeviceStatus::Disconnected);
}

#[tokio::test]
async fn empty_address_reports_bad_config() {
    let engine = Engine::new();

    engine.apply_config(&EngineConfig::default()).unwrap();

    assert_eq!(
        engine.status(),
        DeviceStatus::BadConfig("IP needs to be configured".into())
    );
    assert_eq!(engine.phase(), EnginePhase::Unconfigured);
    assert!(!engine.is_running());
}

#[tokio::test]
async fn short_interval_is_rejected() {
    let engine = Engine::new();
    let config = EngineConfig {
        interval: Duration::from_millis(500),
        ..config()
    };

    let err = engine.apply_config(&config).unwrap_err();

    assert!(matches!(err, CoreError::Config { .. }));
    assert!(matches!(engine.status(), DeviceStatus::BadConfig(_)));
}

// ── Poll cycles ─────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn enabled_toggle_fires_service_feedback_once() {
    let device = healthy_device();
    let engine = start(&device).await;
    let before = engine.capabilities().unwrap();
    let mut events = engine.events();

    device.script().services.get_mut(&StreamId::Main).unwrap()[0].enabled = true;
    tokio::time::sleep(Duration::from_millis(2000)).await;
    let seen = drain(&mut events);

    assert_eq!(feedbacks(&seen), vec![vec![FeedbackFamily::MainService]]);
    assert_eq!(capability_changes(&seen), 0);
    assert!(Arc::ptr_eq(&before, &engine.capabilities().unwrap()));

    // Nothing changes on the following cycle.
    tokio::time::sleep(Duration::from_millis(2000)).await;
    assert!(feedbacks(&drain(&mut events)).is_empty());
}

#[tokio::test(start_paused = true)]
async fn new_service_rebuilds_capabilities() {
    let device = healthy_device();
    let engine = start(&device).await;
    let mut events = engine.events();

    device
        .script()
        .services
        .get_mut(&StreamId::Main)
        .unwrap()
        .push(service("2", "Srt_push", true));
    tokio::time::sleep(Duration::from_millis(2000)).await;
    let seen = drain(&mut events);

    assert_eq!(capability_changes(&seen), 1);
    assert_eq!(engine.capabilities().unwrap().services(StreamId::Main).len(), 2);
}

#[tokio::test(start_paused = true)]
async fn multi_stream_mode_polls_sub_stream() {
    let device = healthy_device();
    {
        let mut script = device.script();
        script.multi = true;
        script
            .services
            .insert(StreamId::Sub, vec![service("7", "Hls", true)]);
        script.recording.insert(StreamId::MainSub, true);
    }
    let engine = start(&device).await;

    let cache = engine.cache();
    assert!(cache.multi_stream_mode);
    assert_eq!(cache.services(StreamId::Sub)[0].id, "7");
    assert!(cache.is_recording(StreamId::MainSub));
    assert!(!cache.is_recording(StreamId::Sub));
    assert!(engine.capabilities().unwrap().has_stream(StreamId::Sub));
}

#[tokio::test(start_paused = true)]
async fn failed_sub_branch_keeps_main_result() {
    let device = healthy_device();
    {
        let mut script = device.script();
        script.multi = true;
        script
            .services
            .insert(StreamId::Sub, vec![service("7", "Hls", true)]);
    }
    let engine = start(&device).await;
    let mut events = engine.events();

    {
        let mut script = device.script();
        script.sub_services_broken = true;
        script.services.get_mut(&StreamId::Main).unwrap()[0].enabled = true;
    }
    tokio::time::sleep(Duration::from_millis(2000)).await;
    let seen = drain(&mut events);

    let cache = engine.cache();
    assert!(cache.services(StreamId::Main)[0].enabled);
    assert_eq!(cache.services(StreamId::Sub)[0].id, "7");
    assert_eq!(feedbacks(&seen), vec![vec![FeedbackFamily::MainService]]);
    assert_eq!(engine.phase(), EnginePhase::Degraded);
}

#[tokio::test(start_paused = true)]
async fn empty_service_list_is_not_a_failure() {
    let device = FakeDevice::new(Script::default());
    let engine = start(&device).await;

    assert_eq!(engine.status(), DeviceStatus::Ok);
    assert_eq!(engine.phase(), EnginePhase::Polling);
    assert!(engine.cache().services(StreamId::Main).is_empty());
    assert!(engine.last_poll().is_some());
}

#[tokio::test(start_paused = true)]
async fn failed_probe_degrades_and_keeps_cache() {
    let device = healthy_device();
    let engine = start(&device).await;
    let before = engine.cache();

    {
        let mut script = device.script();
        script.device_down = true;
        script.recording.insert(StreamId::Main, true);
    }
    tokio::time::sleep(Duration::from_millis(2000)).await;

    assert_eq!(engine.phase(), EnginePhase::Degraded);
    assert_eq!(
        engine.status(),
        DeviceStatus::UnknownError("Error connecting to device".into())
    );
    assert_eq!(engine.cache(), before);

    device.script().device_down = false;
    tokio::time::sleep(Duration::from_millis(2000)).await;

    assert_eq!(engine.phase(), EnginePhase::Polling);
    assert_eq!(engine.status(), DeviceStatus::Ok);
    assert!(engine.cache().is_recording(StreamId::Main));
}

#[tokio::test(start_paused = true)]
async fn envelope_probe_failure_reports_unknown_response() {
    let device = healthy_device();
    let engine = start(&device).await;

    device.script().probe_failures.push_back(CoreError::Envelope {
        operation: "deviceInfo".into(),
        message: "result 500".into(),
    });
    tokio::time::sleep(Duration::from_millis(2000)).await;

    assert_eq!(
        engine.status(),
        DeviceStatus::ConnectionFailure("Unknown Response from Device".into())
    );
}

#[tokio::test(start_paused = true)]
async fn step_failure_keeps_earlier_steps() {
    let device = healthy_device();
    let engine = start(&device).await;
    let mut events = engine.events();

    {
        let mut script = device.script();
        script.recording_broken = true;
        script.services.get_mut(&StreamId::Main).unwrap()[0].enabled = true;
    }
    tokio::time::sleep(Duration::from_millis(2000)).await;

    let cache = engine.cache();
    assert!(cache.service(StreamId::Main, "1").unwrap().enabled);
    assert_eq!(cache.stream(StreamId::Main).is_recording, Some(false));
    assert_eq!(engine.phase(), EnginePhase::Degraded);
    assert_eq!(feedbacks(&drain(&mut events)), vec![vec![FeedbackFamily::MainService]]);
}

// ── Commands ────────────────────────────────────────────────────────

#[tokio::test]
async fn commands_require_a_session() {
    let engine = Engine::new();

    let err = engine.execute(Command::Refresh).await.unwrap_err();

    assert!(matches!(err, CoreError::NotConnected));
}

#[tokio::test(start_paused = true)]
async fn toggle_recording_reads_cached_state() {
    let device = healthy_device();
    let engine = start(&device).await;

    let toggle = Command::Recording {
        stream: StreamId::Main,
        action: StartStopAction::Toggle,
    };
    let first = engine.execute(toggle.clone()).await.unwrap();
    let second = engine.execute(toggle).await.unwrap();

    assert_eq!(
        first,
        CommandResult::Recording {
            stream: StreamId::Main,
            recording: true
        }
    );
    assert_eq!(
        second,
        CommandResult::Recording {
            stream: StreamId::Main,
            recording: false
        }
    );
    assert_eq!(
        device.script().writes,
        vec!["record main true", "record main false"]
    );
}

#[tokio::test(start_paused = true)]
async fn encoder_status_follows_enable() {
    let device = healthy_device();
    let engine = start(&device).await;

    let before = engine.execute(Command::EncoderStatus).await.unwrap();
    engine.execute(Command::EnableEncoder).await.unwrap();
    let after = engine.execute(Command::EncoderStatus).await.unwrap();

    assert_eq!(before, CommandResult::Encoder { active: false });
    assert_eq!(after, CommandResult::Encoder { active: true });
    assert_eq!(device.script().writes, vec!["encoder"]);
}

#[tokio::test(start_paused = true)]
async fn service_command_updates_cache() {
    let device = healthy_device();
    let engine = start(&device).await;

    let result = engine
        .execute(Command::Service {
            stream: StreamId::Main,
            service_id: "1".into(),
            action: StartStopAction::Start,
        })
        .await
        .unwrap();

    assert_eq!(
        result,
        CommandResult::Service {
            stream: StreamId::Main,
            service_id: "1".into(),
            enabled: true
        }
    );
    assert!(engine.cache().service(StreamId::Main, "1").unwrap().enabled);
}

#[tokio::test(start_paused = true)]
async fn unknown_service_is_rejected() {
    let device = healthy_device();
    let engine = start(&device).await;

    let err = engine
        .execute(Command::Service {
            stream: StreamId::Main,
            service_id: "42".into(),
            action: StartStopAction::Toggle,
        })
        .await
        .unwrap_err();

    assert!(matches!(err, CoreError::ServiceNotFound { .. }));
    assert!(device.script().writes.is_empty());
}

#[tokio::test(start_paused = true)]
async fn reapplying_config_starts_fresh() {
    let first = healthy_device();
    let engine = start(&first).await;
    assert_eq!(engine.cache().services(StreamId::Main).len(), 1);

    let second = FakeDevice::new(Script::default());
    engine.apply_with_adapter(&config(), second.clone()).unwrap();
    assert_eq!(engine.cache(), Cache::empty());

    engine.wait_until_active().await.unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;

    assert!(engine.cache().services(StreamId::Main).is_empty());
    let probes = first.script().probes.len();
    tokio::time::sleep(Duration::from_millis(4000)).await;
    assert_eq!(first.script().probes.len(), probes);
}
