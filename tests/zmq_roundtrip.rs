//! End-to-end exchanges over a real REP/REQ socket pair.

use std::thread;
use std::time::Duration;

use labelserve_core::client::{self, ClientOptions};
use labelserve_core::engine::linear::ModelFile;
use labelserve_core::transport::{global_context, Transport, ZmqRequester};
use labelserve_core::{InterruptFlag, LinearClassifier, Service, ServiceConfig, ShutdownReason};

fn classifier() -> LinearClassifier {
    LinearClassifier::from_model(ModelFile {
        labels: vec!["__label__positive".into(), "__label__negative".into()],
        dim: 2,
        buckets: 8,
        word_ngrams: 2,
        input: vec![vec![1.0, 0.5]; 8],
        output: vec![vec![1.5, 0.0], vec![0.0, 0.5]],
    })
    .unwrap()
}

fn config(idle_timeout_ms: u64) -> ServiceConfig {
    ServiceConfig {
        idle_timeout_ms,
        linger_ms: 200,
        ..ServiceConfig::default()
    }
}

fn spawn_service(
    endpoint: &'static str,
    idle_timeout_ms: u64,
) -> thread::JoinHandle<ShutdownReason> {
    let ctx = global_context();
    let mut service = Service::bind(
        &ctx,
        endpoint,
        classifier(),
        &config(idle_timeout_ms),
        InterruptFlag::detached(),
    )
    .unwrap();
    thread::spawn(move || service.run().unwrap())
}

fn requester(endpoint: &str) -> ZmqRequester {
    ZmqRequester::connect(&global_context(), endpoint, Duration::from_secs(5)).unwrap()
}

#[test]
fn test_ping_classify_shutdown() {
    let endpoint = "inproc://labelserve/e2e-session";
    let handle = spawn_service(endpoint, 5_000);
    let req = requester(endpoint);

    assert_eq!(req.call(b"[CMD:PING]").unwrap(), b"PONG");

    let reply = req.call(b"great product").unwrap();
    let parsed: serde_json::Value = serde_json::from_slice(&reply).unwrap();
    let entries = parsed.as_array().unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0]["label"], "__label__positive");
    let prob = entries[0]["prob"].as_f64().unwrap();
    assert!(prob > 0.5 && prob < 1.0);

    assert_eq!(req.call(b"[CMD:PING]").unwrap(), b"PONG");
    assert_eq!(req.call(b"[CMD:SHUTDOWN]").unwrap(), b"OK");

    assert_eq!(handle.join().unwrap(), ShutdownReason::Command);
}

#[test]
fn test_idle_service_exits_without_reply() {
    let handle = spawn_service("inproc://labelserve/e2e-idle", 50);
    assert_eq!(handle.join().unwrap(), ShutdownReason::IdleTimeout);
}

#[test]
fn test_client_session_writes_one_line_per_request() {
    let endpoint = "inproc://labelserve/e2e-client";
    let handle = spawn_service(endpoint, 5_000);
    let req = requester(endpoint);

    let input = "first review\n\nsecond review\n".as_bytes();
    let mut output = Vec::new();
    let sent = client::run(
        &req,
        input,
        &mut output,
        ClientOptions {
            shutdown_after: true,
        },
    )
    .unwrap();

    assert_eq!(sent, 2);
    let lines: Vec<&str> = std::str::from_utf8(&output).unwrap().lines().collect();
    assert_eq!(lines.len(), 2);
    for line in lines {
        assert!(line.starts_with(r#"[{"label":"__label__positive","prob":"#), "{}", line);
    }

    assert_eq!(handle.join().unwrap(), ShutdownReason::Command);
}
