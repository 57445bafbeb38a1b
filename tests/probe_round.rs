//! Probe rounds against real HTTP servers
//!
//! Each endpoint is a path prefix on a local mock server, so the rounds go
//! through the full reqwest stack: connection setup, status handling, body
//! reads and deadline enforcement.

use cdn_latency_probe::{
    logging::{LogLevel, Logger, ProbeLogger},
    Endpoint, NetworkClient, ProbeConfig, ProbeCoordinator, ProbeOutcome, ProbeTransport,
};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use wiremock::{
    matchers::{method, path},
    Mock, MockServer, ResponseTemplate,
};

const OBJECT_SIZE: usize = 10 * 1024;

async fn mount_object(server: &MockServer, prefix: &str, template: ResponseTemplate) {
    Mock::given(method("GET"))
        .and(path(format!("/{}/test/test_10kb", prefix)))
        .respond_with(template)
        .mount(server)
        .await;
}

fn endpoint(server: &MockServer, id: u32, prefix: &str) -> Endpoint {
    let base = format!("{}/{}/", server.uri(), prefix);
    Endpoint::with_base(id, prefix, prefix, base.as_str()).unwrap()
}

fn coordinator() -> (ProbeCoordinator, Arc<Mutex<Vec<String>>>) {
    let transport: Arc<dyn ProbeTransport> = Arc::new(NetworkClient::new(&ProbeConfig::default()).unwrap());
    let (logger, buffer) = Logger::buffered("PROBE", LogLevel::Info);
    (ProbeCoordinator::new(transport, ProbeLogger::from_logger(logger)), buffer)
}

#[tokio::test]
async fn test_round_classifies_each_endpoint() {
    let server = MockServer::start().await;
    mount_object(
        &server,
        "primary",
        ResponseTemplate::new(200)
            .set_body_bytes(vec![7u8; OBJECT_SIZE])
            .set_delay(Duration::from_millis(50)),
    )
    .await;
    mount_object(&server, "broken", ResponseTemplate::new(404)).await;
    mount_object(
        &server,
        "stalled",
        ResponseTemplate::new(200).set_delay(Duration::from_secs(10)),
    )
    .await;

    let endpoints = vec![
        endpoint(&server, 0, "primary"),
        endpoint(&server, 1, "broken"),
        endpoint(&server, 2, "stalled"),
    ];
    let deadline = Duration::from_millis(1500);
    let (coordinator, buffer) = coordinator();

    let start = Instant::now();
    let mut arrivals = Vec::new();
    let round = coordinator
        .run_round(&endpoints, deadline, |result| arrivals.push((result.endpoint.id, start.elapsed())))
        .await;
    let total = start.elapsed();

    assert_eq!(round.results.len(), 3);

    match round.result_for(0).unwrap().outcome {
        ProbeOutcome::Success(elapsed) => {
            assert!(elapsed >= Duration::from_millis(50), "elapsed {:?}", elapsed);
            assert!(elapsed <= deadline);
        }
        ref other => panic!("expected success, got {:?}", other),
    }
    match &round.result_for(1).unwrap().outcome {
        ProbeOutcome::NetworkError(reason) => assert!(reason.contains("404"), "reason {}", reason),
        other => panic!("expected network error, got {:?}", other),
    }
    assert_eq!(round.result_for(2).unwrap().outcome, ProbeOutcome::Timeout);

    // The stalled endpoint arrives last, at the deadline; the others long before
    assert_eq!(arrivals.last().map(|(id, _)| *id), Some(2));
    assert!(arrivals[0].1 < Duration::from_millis(1000));
    assert!(total >= deadline);
    assert!(total < deadline + Duration::from_secs(1));

    assert_eq!(round.fastest().map(|r| r.endpoint.id), Some(0));
    assert!(buffer.lock().unwrap().iter().any(|l| l.contains("Completed round-1 (1 of 3 reachable)")));
}

#[tokio::test]
async fn test_unreachable_host_is_network_error() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let endpoints = vec![Endpoint::with_base(0, "dead", "Dead", format!("http://{}/metadata/", addr).as_str()).unwrap()];
    let (coordinator, _) = coordinator();

    let round = coordinator.run_round(&endpoints, Duration::from_secs(2), |_| {}).await;
    assert!(matches!(round.results[0].outcome, ProbeOutcome::NetworkError(_)));
}

#[tokio::test]
async fn test_cancelled_round_then_fresh_round() {
    let server = MockServer::start().await;
    mount_object(&server, "quick", ResponseTemplate::new(200).set_body_bytes(vec![1u8; OBJECT_SIZE])).await;
    mount_object(&server, "slow", ResponseTemplate::new(200).set_delay(Duration::from_millis(400))).await;

    let endpoints = vec![endpoint(&server, 0, "quick"), endpoint(&server, 1, "slow")];
    let (coordinator, _) = coordinator();

    let mut handle = coordinator.start_round(&endpoints, Duration::from_secs(2));
    let first = handle.next().await.unwrap();
    assert_eq!(first.endpoint.id, 0);

    handle.cancel();
    assert!(handle.next().await.is_none());
    let cancelled = handle.close().await;
    assert!(cancelled.is_cancelled());
    assert_eq!(cancelled.results.len(), 1);
    assert!(coordinator.is_latest(cancelled.id));

    let fresh = coordinator.run_round(&endpoints, Duration::from_secs(2), |_| {}).await;
    assert_eq!(fresh.results.len(), 2);
    assert!(fresh.results.iter().all(|r| r.is_success()));
    assert!(coordinator.is_latest(fresh.id));
    assert!(!coordinator.is_latest(cancelled.id));
}
