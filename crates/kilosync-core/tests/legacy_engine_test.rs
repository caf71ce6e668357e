#![allow(clippy::unwrap_used)]
// End-to-end: the engine driving a legacy device served by wiremock.

use std::time::Duration;

use pretty_assertions::assert_eq;
use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use kilosync_core::{
    Command, CommandResult, CoreError, DeviceStatus, Engine, EngineConfig, EnginePhase,
    StartStopAction, StreamId,
};

fn op_path(name: &str) -> String {
    format!("/api/V1/{name}.lua")
}

fn ok_envelope(data: serde_json::Value) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({ "Result": 200, "Status": "OK", "Data": data }))
}

async fn legacy_device() -> MockServer {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(op_path("deviceInfo")))
        .respond_with(ok_envelope(json!({ "OEM_TYPE": "E2" })))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path(op_path("getStreamingMode")))
        .respond_with(ok_envelope(json!({ "Mode": "main" })))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path(op_path("getStreamService")))
        .and(query_param("Stream", "main"))
        .respond_with(ok_envelope(json!({
            "ServiceStatus": [
                { "ID": 1, "Type": "Rtsp_server", "Enable": 1 },
                { "ID": 2, "Type": "Rtmp_push", "Enable": 0, "Status": "stopped" }
            ]
        })))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path(op_path("getRecordingStatus")))
        .and(query_param("Stream", "main"))
        .respond_with(ok_envelope(json!({ "Status": "Started" })))
        .mount(&server)
        .await;

    server
}

async fn connect(server: &MockServer) -> Engine {
    let engine = Engine::new();
    let config = EngineConfig {
        interval: Duration::from_millis(1000),
        ..EngineConfig::new(server.address().to_string())
    };
    engine.apply_config(&config).unwrap();

    tokio::time::timeout(Duration::from_secs(10), engine.wait_until_active())
        .await
        .unwrap()
        .unwrap();
    engine
}

#[tokio::test]
async fn engine_polls_a_legacy_device() {
    let server = legacy_device().await;
    let engine = connect(&server).await;

    assert_eq!(engine.status(), DeviceStatus::Ok);
    assert_eq!(engine.phase(), EnginePhase::Polling);

    let cache = engine.cache();
    assert_eq!(cache.device_type.as_deref(), Some("E2"));
    assert!(!cache.multi_stream_mode);
    assert!(cache.is_recording(StreamId::Main));

    let services = cache.services(StreamId::Main);
    assert_eq!(services.len(), 1);
    assert_eq!(services[0].id, "2");
    assert!(!services[0].enabled);

    let capabilities = engine.capabilities().unwrap();
    assert!(!capabilities.has_stream(StreamId::Sub));
    assert_eq!(capabilities.services(StreamId::Main)[0].label, "Rtmp_push");

    engine.teardown();
}

#[tokio::test]
async fn engine_stops_recording_on_command() {
    let server = legacy_device().await;

    Mock::given(method("GET"))
        .and(path(op_path("stopRecord")))
        .and(query_param("Stream", "main"))
        .respond_with(ok_envelope(json!({})))
        .expect(1)
        .mount(&server)
        .await;

    let engine = connect(&server).await;

    let result = engine
        .execute(Command::Recording {
            stream: StreamId::Main,
            action: StartStopAction::Toggle,
        })
        .await
        .unwrap();

    assert_eq!(
        result,
        CommandResult::Recording {
            stream: StreamId::Main,
            recording: false
        }
    );
    engine.teardown();
}

#[tokio::test]
async fn encoder_commands_need_a_token_device() {
    let server = legacy_device().await;
    let engine = connect(&server).await;

    let err = engine.execute(Command::EncoderStatus).await.unwrap_err();

    assert!(matches!(err, CoreError::Unsupported { .. }));
    assert_eq!(engine.status(), DeviceStatus::Ok);
    engine.teardown();
}

#[tokio::test]
async fn unreachable_device_keeps_retrying() {
    let engine = Engine::new();
    engine.apply_config(&EngineConfig::new("127.0.0.1:9")).unwrap();

    let waited =
        tokio::time::timeout(Duration::from_millis(500), engine.wait_until_active()).await;

    assert!(waited.is_err());
    assert_eq!(engine.phase(), EnginePhase::Connecting);
    assert!(engine.cache().services(StreamId::Main).is_empty());
    engine.teardown();
}
