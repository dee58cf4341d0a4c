//! End-to-end tests against the live mock server.
//!
//! # Design
//! Starts the mock server on a random port in its own thread, then drives
//! `Client` and `JsonClient` over real HTTP through `UreqTransport`.

use std::net::SocketAddr;
use std::time::Duration;

use fetchkit_core::{
    Body, Client, DecodeError, HttpMethod, JsonClient, Params, Payload, RedirectPolicy,
    RequestError, SendOptions, TransportError, UreqTransport,
};
use mock_server::Echo;

fn start_server() -> SocketAddr {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();

    let std_listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = std_listener.local_addr().unwrap();
    std_listener.set_nonblocking(true).unwrap();

    std::thread::spawn(move || {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        rt.block_on(async {
            let listener = tokio::net::TcpListener::from_std(std_listener).unwrap();
            mock_server::run(listener).await
        })
        .unwrap();
    });

    addr
}

fn client(addr: SocketAddr, path: &str) -> Client<UreqTransport> {
    Client::new(
        UreqTransport::new(),
        &format!("http://{addr}{path}"),
        Duration::from_secs(5),
    )
    .unwrap()
}

fn json_client(addr: SocketAddr, path: &str) -> JsonClient<UreqTransport> {
    JsonClient::new(
        UreqTransport::new(),
        &format!("http://{addr}{path}"),
        Duration::from_secs(5),
    )
    .unwrap()
    .with_charset(None)
}

fn echo_of<R>(resp: &fetchkit_core::Response<R>) -> Echo {
    match &resp.body {
        Body::Bytes(bytes) => serde_json::from_slice(bytes).unwrap(),
        Body::Json(value) => serde_json::from_value(value.clone()).unwrap(),
        other => panic!("expected echo body, got {other:?}"),
    }
}

#[tokio::test]
async fn get_ok_returns_bytes() {
    let addr = start_server();
    let resp = client(addr, "/ok").request_get(Params::new()).await;
    assert_eq!(resp.code, Some(200));
    assert_eq!(resp.bytes().map(|b| b.as_ref()), Some(&b"ok"[..]));
    let content_type = resp.header("content_type");
    assert!(content_type.is_some_and(|ct| ct.starts_with("text/plain")));
}

#[tokio::test]
async fn not_found_is_data_not_error() {
    let addr = start_server();
    let resp = client(addr, "/status/404").request_get(Params::new()).await;
    assert_eq!(resp.code, Some(404));
    match resp.error() {
        Some(RequestError::Status(e)) => assert_eq!(e.to_string(), "404 Not Found"),
        other => panic!("expected status error, got {other:?}"),
    }
}

#[tokio::test]
async fn slow_server_times_out() {
    let addr = start_server();
    let c = Client::new(
        UreqTransport::new(),
        &format!("http://{addr}/slow/1000"),
        Duration::from_millis(100),
    )
    .unwrap();

    let started = std::time::Instant::now();
    let resp = c.request_get(Params::new()).await;
    assert!(started.elapsed() < Duration::from_millis(900));
    assert!(resp.code.is_none());
    assert!(matches!(
        resp.error(),
        Some(RequestError::Transport(TransportError::Timeout(_)))
    ));
}

#[tokio::test]
async fn unreachable_server_is_data_not_error() {
    let url = "http://127.0.0.1:9/";
    let c = Client::new(UreqTransport::new(), url, Duration::from_secs(2)).unwrap();
    let resp = c.request_get(Params::new()).await;
    assert!(resp.code.is_none());
    assert!(matches!(resp.error(), Some(RequestError::Transport(_))));
}

#[tokio::test]
async fn query_headers_and_form_body_reach_the_server() {
    let addr = start_server();
    let mut c = client(addr, "/echo");
    c.set_header("X-Multi", "one", false);
    c.set_header("X-Multi", "two", true);

    let fields = Params::new().with("name", "Jane Doe").with("admin", true);
    let query = Params::new().with("page", 2).with("q", "a b");
    let resp = c.request_post(Some(fields.into()), query).await;
    assert_eq!(resp.code, Some(200));

    let echo = echo_of(&resp);
    assert_eq!(echo.method, "POST");
    assert_eq!(echo.query.as_deref(), Some("page=2&q=a+b"));
    assert_eq!(echo.headers["x-multi"], "one, two");
    assert_eq!(
        echo.headers["content-type"],
        "application/x-www-form-urlencoded"
    );
    assert_eq!(echo.body, "name=Jane+Doe&admin=1");
}

#[tokio::test]
async fn every_method_reaches_the_server() {
    let addr = start_server();
    let c = client(addr, "/echo");
    for method in [
        HttpMethod::Get,
        HttpMethod::Delete,
        HttpMethod::Patch,
        HttpMethod::Post,
        HttpMethod::Put,
        HttpMethod::Options,
        HttpMethod::Trace,
    ] {
        let resp = c.request(method, "&", None, None).await;
        assert_eq!(resp.code, Some(200), "{method}");
        assert_eq!(echo_of(&resp).method, method.as_str());
    }

    let resp = c.request_head(Params::new()).await;
    assert_eq!(resp.code, Some(200));
    assert!(matches!(resp.body, Body::Empty));
}

#[tokio::test]
async fn basic_auth_from_setter_and_url() {
    let addr = start_server();

    let mut c = client(addr, "/auth");
    assert_eq!(c.request_get(Params::new()).await.code, Some(401));
    c.set_basic_auth(mock_server::AUTH_USER, mock_server::AUTH_PASSWORD);
    assert_eq!(c.request_get(Params::new()).await.code, Some(204));

    let mut c = client(addr, "/");
    c.set_url(&format!("http://user:pass@{addr}/auth")).unwrap();
    assert_eq!(c.request_get(Params::new()).await.code, Some(204));
}

#[tokio::test]
async fn redirects_follow_the_configured_policy() {
    let addr = start_server();
    let mut c = client(addr, "/redirect");

    let resp = c.request_get(Params::new()).await;
    assert_eq!(resp.code, Some(200));
    assert_eq!(resp.bytes().map(|b| b.as_ref()), Some(&b"ok"[..]));

    c.set_send_options(SendOptions {
        redirect: RedirectPolicy::Manual,
        ..SendOptions::default()
    });
    let resp = c.request_get(Params::new()).await;
    assert!(resp.code.is_some_and(|code| (300..400).contains(&code)));
    assert_eq!(resp.header("location"), Some("/ok"));
}

#[tokio::test]
async fn json_client_round_trip() {
    let addr = start_server();
    let c = json_client(addr, "/echo");

    let payload = Payload::json(&serde_json::json!({"a": 1})).unwrap();
    let resp = c.request_post(Some(payload), Params::new()).await.unwrap();
    assert_eq!(resp.code, Some(200));
    // /echo answers with JSON, so the body is decoded
    let echo = echo_of(&resp);
    assert_eq!(echo.headers["content-type"], "application/json");
    assert_eq!(echo.headers["accept"], "application/json");
    assert_eq!(echo.body, r#"{"a":1}"#);
}

#[tokio::test]
async fn json_client_decodes_and_passes_through() {
    let addr = start_server();

    let resp = json_client(addr, "/json")
        .request_get(Params::new())
        .await
        .unwrap();
    assert_eq!(resp.json(), Some(&serde_json::json!({"b": 2})));

    let resp = json_client(addr, "/ok")
        .request_get(Params::new())
        .await
        .unwrap();
    assert_eq!(resp.bytes().map(|b| b.as_ref()), Some(&b"ok"[..]));
    assert!(resp.raw.is_none());
}

#[tokio::test]
async fn json_client_surfaces_malformed_json() {
    let addr = start_server();
    let err = json_client(addr, "/bad-json")
        .request_get(Params::new())
        .await
        .unwrap_err();
    assert!(matches!(err, DecodeError::Json(_)));
}
