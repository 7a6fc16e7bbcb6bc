//! Drives sessions over scripted in-memory transports and checks what consumers observe.
use bgproutes_live::session::{FrameTransport, SubscriptionService};
use bgproutes_live::{
    CancelHandle, RouteUpdate, SessionBuilder, StreamError, SubscriptionError, UpdateKind,
    VantagePoint,
};
use bytes::Bytes;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

enum Step {
    Frame(Vec<u8>),
    Closed,
}

/// Replays a fixed list of steps and counts reads and closes.
#[derive(Clone)]
struct Script {
    steps: Arc<Mutex<VecDeque<Step>>>,
    reads: Arc<AtomicUsize>,
    closes: Arc<AtomicUsize>,
}

impl Script {
    fn new(steps: Vec<Step>) -> Self {
        Script {
            steps: Arc::new(Mutex::new(steps.into())),
            reads: Arc::new(AtomicUsize::new(0)),
            closes: Arc::new(AtomicUsize::new(0)),
        }
    }

    fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    fn closes(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }
}

impl FrameTransport for Script {
    fn read_frame(&mut self) -> Result<Bytes, StreamError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        match self.steps.lock().unwrap().pop_front() {
            Some(Step::Frame(bytes)) => Ok(Bytes::from(bytes)),
            Some(Step::Closed) | None => Err(StreamError::ConnectionClosed(None)),
        }
    }

    fn close(&mut self) {
        self.closes.fetch_add(1, Ordering::SeqCst);
    }
}

fn frame(value: serde_json::Value) -> Step {
    Step::Frame(value.to_string().into_bytes())
}

#[derive(Clone, Default)]
struct RecordingService {
    requests: Arc<Mutex<Vec<(String, Vec<String>)>>>,
}

impl SubscriptionService for RecordingService {
    fn register(&self, api_key: &str, prefixes: &[String]) -> Result<(), SubscriptionError> {
        self.requests
            .lock()
            .unwrap()
            .push((api_key.to_string(), prefixes.to_vec()));
        if api_key == "expired" {
            return Err(SubscriptionError::Rejected {
                status: 401,
                body: "invalid api key".to_string(),
            });
        }
        Ok(())
    }
}

fn builder() -> SessionBuilder {
    SessionBuilder::new("KEY").subscription_service(RecordingService::default())
}

#[test]
fn skips_noise_then_reports_transport_error() {
    let script = Script::new(vec![
        Step::Frame(b"\x00\xffnot a record".to_vec()),
        frame(serde_json::json!({"vp": "64500_192.0.2.1", "prefixes": "10.0.0.0/8"})),
        frame(serde_json::json!({
            "record_type": "update",
            "vp": "64500_192.0.2.1",
            "sec": 1700000000,
            "usec": 500000,
            "prefixes": "10.0.0.0/8,192.168.0.0/16",
            "as-path": "64500 3356 13335",
            "communities": "3356:100",
            "nexthop": "192.0.2.1",
            "origin": "IGP",
        })),
        Step::Closed,
    ]);
    let session = builder().build_with_transport(script.clone());

    let items: Vec<Result<RouteUpdate, StreamError>> = session.into_iter().collect();
    assert_eq!(items.len(), 2);

    let update = items[0].as_ref().unwrap();
    assert_eq!(update.kind, UpdateKind::Announce);
    assert_eq!(update.timestamp, Some(1700000000.5));
    assert_eq!(
        update.vantage_point,
        Some(VantagePoint::new(64500, "192.0.2.1"))
    );
    assert_eq!(update.prefixes, vec!["10.0.0.0/8", "192.168.0.0/16"]);
    assert_eq!(
        update.to_psv(),
        "1700000000.5|U|64500|192.0.2.1|10.0.0.0/8,192.168.0.0/16|64500 3356 13335|3356:100|IGP|192.0.2.1"
    );

    assert!(matches!(
        items[1],
        Err(StreamError::ConnectionClosed(None))
    ));
    assert_eq!(script.reads(), 4);
}

#[test]
fn remote_error_payload_is_fatal() {
    let script = Script::new(vec![
        frame(serde_json::json!({"error": "quota exceeded"})),
        frame(serde_json::json!({"record_type": "update", "vp": "64500_192.0.2.1"})),
    ]);
    let mut session = builder().build_with_transport(script.clone());

    let err = session.next_valid_update().unwrap_err();
    assert!(err.is_rejection());
    assert!(matches!(&err, StreamError::RemoteRejection(msg) if msg == "quota exceeded"));

    // no further pulls once rejected
    assert_eq!(session.next_valid_update().unwrap(), None);
    assert!(session.is_ended());
    assert_eq!(script.reads(), 1);
    assert_eq!(script.closes(), 1);
}

#[test]
fn cancellation_before_first_frame() {
    let script = Script::new(vec![frame(
        serde_json::json!({"record_type": "update", "vp": "64500_192.0.2.1"}),
    )]);
    let session = builder().build_with_transport(script.clone());
    session.cancel_handle().cancel();

    let items: Vec<_> = session.into_iter().collect();
    assert!(items.is_empty());
    assert_eq!(script.reads(), 0);
}

#[test]
fn cancellation_between_updates() {
    let script = Script::new(vec![
        frame(serde_json::json!({"record_type": "update", "vp": "1_192.0.2.1"})),
        frame(serde_json::json!({"record_type": "withraw", "vp": "2_192.0.2.2"})),
    ]);
    let cancel = CancelHandle::new();
    let mut iter = builder()
        .cancel_handle(cancel.clone())
        .build_with_transport(script.clone())
        .into_iter();

    assert!(iter.next().unwrap().is_ok());
    cancel.cancel();
    assert!(iter.next().is_none());
    assert!(iter.next().is_none());
    assert_eq!(script.reads(), 1);
    assert_eq!(script.closes(), 1);
}

#[test]
fn lazy_connection() {
    let connects = Arc::new(AtomicUsize::new(0));
    let counter = connects.clone();
    let mut session = builder().build_with_connector(move || {
        counter.fetch_add(1, Ordering::SeqCst);
        Ok(Script::new(vec![frame(serde_json::json!({
            "record_type": "withraw",
            "vp": "64500_192.0.2.1",
            "prefixes": "10.0.0.0/8",
        }))]))
    });
    assert_eq!(connects.load(Ordering::SeqCst), 0);

    let update = session.next_valid_update().unwrap().unwrap();
    assert_eq!(update.kind, UpdateKind::Withdraw);
    assert!(session.next_valid_update().is_err());
    assert_eq!(connects.load(Ordering::SeqCst), 1);
}

#[test]
fn subscribe_while_streaming() {
    let service = RecordingService::default();
    let script = Script::new(vec![frame(
        serde_json::json!({"record_type": "update", "vp": "64500_192.0.2.1"}),
    )]);
    let session = SessionBuilder::new("KEY")
        .subscription_service(service.clone())
        .build_with_transport(script);

    session.subscribe(["192.23.62.0/24"]).unwrap();
    let mut iter = session.into_iter();
    let handle = iter.subscription_handle();

    let subscriber = std::thread::spawn(move || {
        handle.subscribe(["2a06:3040:10::/48"]).unwrap();
        handle.subscribed_prefixes()
    });
    assert!(iter.next().unwrap().is_ok());
    let prefixes = subscriber.join().unwrap();

    assert!(prefixes.contains("192.23.62.0/24"));
    assert!(prefixes.contains("2a06:3040:10::/48"));
    let requests = service.requests.lock().unwrap();
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[0], ("KEY".to_string(), vec!["192.23.62.0/24".to_string()]));
}

#[test]
fn subscription_failure_keeps_stream_usable() {
    let script = Script::new(vec![frame(
        serde_json::json!({"record_type": "update", "vp": "64500_192.0.2.1"}),
    )]);
    let mut session = SessionBuilder::new("expired")
        .subscription_service(RecordingService::default())
        .build_with_transport(script);

    let err = session.subscribe(["10.0.0.0/8"]).unwrap_err();
    assert_eq!(
        err.to_string(),
        "subscription rejected with status 401: invalid api key"
    );
    assert!(session.subscribed_prefixes().is_empty());
    assert!(session.next_valid_update().unwrap().is_some());
}

#[test]
fn withdrawals_use_feed_spelling() {
    let script = Script::new(vec![
        frame(serde_json::json!({"record_type": "withdraw", "vp": "1_192.0.2.1"})),
        frame(serde_json::json!({"record_type": "withraw", "vp": "2_192.0.2.2"})),
    ]);
    let mut session = builder().build_with_transport(script.clone());

    let update = session.next_valid_update().unwrap().unwrap();
    assert_eq!(update.kind, UpdateKind::Withdraw);
    assert_eq!(update.vantage_point, Some(VantagePoint::new(2, "192.0.2.2")));
    assert_eq!(script.reads(), 2);
}
