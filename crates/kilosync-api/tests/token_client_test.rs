#![allow(clippy::unwrap_used)]
// Integration tests for `TokenClient` using wiremock.

use pretty_assertions::assert_eq;
use secrecy::SecretString;
use serde_json::json;
use url::Url;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use kilosync_api::{Credentials, Error, TokenClient, VideoInterface};

// ── Helpers ─────────────────────────────────────────────────────────

async fn setup(
    interface: VideoInterface,
    credentials: Option<Credentials>,
) -> (MockServer, TokenClient) {
    let server = MockServer::start().await;
    let base_url = Url::parse(&format!("{}/", server.uri())).unwrap();
    let client = TokenClient::with_client(reqwest::Client::new(), base_url, interface, credentials);
    (server, client)
}

fn admin() -> Credentials {
    Credentials::new("admin", SecretString::from("admin-pass"))
}

async fn mount_login(server: &MockServer, token: &str) {
    Mock::given(method("POST"))
        .and(path("/api/systemctrl/users/login"))
        .and(body_json(json!({ "username": "admin", "password": "admin-pass" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "result": "ok",
            "data": { "token": token, "alias": "Administrator" }
        })))
        .expect(1)
        .mount(server)
        .await;
}

// ── Login tests ─────────────────────────────────────────────────────

#[tokio::test]
async fn test_login_stores_token_and_attaches_header() {
    let (server, client) = setup(VideoInterface::Hdmi, Some(admin())).await;
    mount_login(&server, "tok-123").await;

    Mock::given(method("GET"))
        .and(path("/api/record/hdmi/get_recording_status"))
        .and(header("authorization", "tok-123"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "result": "ok",
            "data": { "status": "Started" }
        })))
        .expect(1)
        .mount(&server)
        .await;

    assert!(!client.has_token());
    client.login().await.unwrap();
    assert!(client.has_token());

    let resp = client.recording_status().await;
    assert!(resp.is_ok());
    assert!(resp.data.unwrap().is_recording());
}

#[tokio::test]
async fn test_login_rejected() {
    let (server, client) = setup(VideoInterface::Hdmi, Some(admin())).await;

    Mock::given(method("POST"))
        .and(path("/api/systemctrl/users/login"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "result": "error",
            "msg": "wrong password"
        })))
        .mount(&server)
        .await;

    let result = client.login().await;

    match result {
        Err(Error::Authentication { message }) => assert_eq!(message, "wrong password"),
        other => panic!("expected Authentication error, got: {other:?}"),
    }
    assert!(!client.has_token());
}

#[tokio::test]
async fn test_rejected_relogin_drops_previous_token() {
    let (server, client) = setup(VideoInterface::Hdmi, Some(admin())).await;

    Mock::given(method("POST"))
        .and(path("/api/systemctrl/users/login"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "result": "ok",
            "data": { "token": "tok-old" }
        })))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/systemctrl/users/login"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "result": "error",
            "msg": "session limit reached"
        })))
        .mount(&server)
        .await;

    client.login().await.unwrap();
    assert!(client.has_token());

    assert!(client.login().await.is_err());
    assert!(!client.has_token());
}

#[tokio::test]
async fn test_login_without_credentials() {
    let (_server, client) = setup(VideoInterface::Hdmi, None).await;

    let result = client.login().await;

    assert!(
        matches!(result, Err(Error::Authentication { .. })),
        "expected Authentication error, got: {result:?}"
    );
}

#[tokio::test]
async fn test_login_against_unreachable_device_propagates() {
    let base_url = Url::parse("http://127.0.0.1:9/").unwrap();
    let client = TokenClient::with_client(
        reqwest::Client::new(),
        base_url,
        VideoInterface::Sdi,
        Some(admin()),
    );

    let result = client.login().await;

    assert!(
        matches!(result, Err(Error::Network(_))),
        "expected Network error, got: {result:?}"
    );
}

// ── Envelope tests ──────────────────────────────────────────────────

#[tokio::test]
async fn test_http_failure_becomes_error_response() {
    let (server, client) = setup(VideoInterface::Hdmi, None).await;

    Mock::given(method("GET"))
        .and(path("/api/systemctrl/system/getSystemInfo"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let resp = client.device_info().await;

    assert!(!resp.is_ok());
    assert_eq!(resp.http_status, Some(500));
    assert_eq!(resp.message(), "API Error: 500");
    assert!(!resp.is_unauthorized());
}

#[tokio::test]
async fn test_unauthorized_is_flagged() {
    let (server, client) = setup(VideoInterface::Hdmi, None).await;

    Mock::given(method("GET"))
        .and(path("/api/streamer/hdmi/stream/list"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let resp = client.stream_list().await;

    assert!(!resp.is_ok());
    assert!(resp.is_unauthorized());
}

#[tokio::test]
async fn test_unreachable_device_never_errs() {
    let base_url = Url::parse("http://127.0.0.1:9/").unwrap();
    let client =
        TokenClient::with_client(reqwest::Client::new(), base_url, VideoInterface::Hdmi, None);

    let resp = client.device_info().await;

    assert!(!resp.is_ok());
    assert_eq!(resp.http_status, None);
}

#[tokio::test]
async fn test_device_info_sends_version_flag() {
    let (server, client) = setup(VideoInterface::Hdmi, None).await;

    Mock::given(method("GET"))
        .and(path("/api/systemctrl/system/getSystemInfo"))
        .and(query_param("version", "true"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "model": "E3",
            "version": "1.2.3"
        })))
        .mount(&server)
        .await;

    let resp = client.device_type().await;

    assert!(resp.is_ok(), "bare payload should be wrapped as ok");
    assert_eq!(resp.data, Some(Some("E3".to_owned())));
}

// ── Codec tests ─────────────────────────────────────────────────────

#[tokio::test]
async fn test_check_encoder_status_reads_configured_interface() {
    let (server, client) = setup(VideoInterface::Sdi, None).await;

    Mock::given(method("GET"))
        .and(path("/api/codec/vin/active_interface"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "result": "ok",
            "data": { "hdmi": false, "sdi": true }
        })))
        .mount(&server)
        .await;

    let resp = client.check_encoder_status().await;

    assert_eq!(resp.data, Some(true));
}

#[tokio::test]
async fn test_enable_encoder_posts_to_interface() {
    let (server, client) = setup(VideoInterface::Uvc, None).await;

    Mock::given(method("POST"))
        .and(path("/api/codec/uvc/venc/enable"))
        .and(body_json(json!({ "enable": true })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "result": "ok" })))
        .expect(1)
        .mount(&server)
        .await;

    assert!(client.enable_encoder().await.is_ok());
}

// ── Recording & streamer tests ──────────────────────────────────────

#[tokio::test]
async fn test_enable_recording_body() {
    let (server, client) = setup(VideoInterface::Pip, None).await;

    Mock::given(method("POST"))
        .and(path("/api/record/pip/recording"))
        .and(body_json(json!({ "start": false })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "result": "ok" })))
        .expect(1)
        .mount(&server)
        .await;

    assert!(client.enable_recording(false).await.is_ok());
}

#[tokio::test]
async fn test_stream_list_excludes_rtsp() {
    let (server, client) = setup(VideoInterface::Hdmi, None).await;

    Mock::given(method("GET"))
        .and(path("/api/streamer/hdmi/stream/list"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "result": "ok",
            "data": [
                { "id": 0, "name": "RTSP", "protocol": "rtsp", "enable": true },
                {
                    "id": 1,
                    "name": "YouTube",
                    "protocol": "rtmp",
                    "enable": false,
                    "stream": "main"
                },
                { "id": 2, "name": "SRT out", "protocol": "srt", "enable": true, "stream": "sub" }
            ]
        })))
        .mount(&server)
        .await;

    let streams = client.stream_list().await.data.unwrap();

    let ids: Vec<&str> = streams.iter().map(|s| s.id.as_str()).collect();
    assert_eq!(ids, vec!["1", "2"]);
    assert_eq!(streams[1].stream.as_deref(), Some("sub"));
}

#[tokio::test]
async fn test_set_stream_service_sends_numeric_id() {
    let (server, client) = setup(VideoInterface::Hdmi, None).await;

    Mock::given(method("POST"))
        .and(path("/api/streamer/hdmi/stream/enable"))
        .and(body_json(json!({ "id": 1, "enable": true })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "result": "ok" })))
        .expect(1)
        .mount(&server)
        .await;

    assert!(client.set_stream_service("1", true).await.is_ok());
}
