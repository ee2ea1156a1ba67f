use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{Value, json};
use tokio::sync::{broadcast, oneshot};
use tokio::task::JoinHandle;

use reqvisor::{
    Action, ConcurrencyMode, OperationError, OperationFn, OperationRef, Phase, Registry,
    RegistryError, RuntimeError, Subscribe, Supervisor, SupervisorConfig, bases,
};

type Gates = Arc<Mutex<HashMap<u64, oneshot::Receiver<()>>>>;

fn cfg() -> SupervisorConfig {
    SupervisorConfig {
        grace: Duration::from_secs(1),
        handle_signals: false,
        ..SupervisorConfig::default()
    }
}

async fn start(
    registry: Registry,
    subs: Vec<Arc<dyn Subscribe>>,
) -> (Arc<Supervisor>, JoinHandle<Result<(), RuntimeError>>) {
    let sup = Supervisor::builder(cfg())
        .with_subscribers(subs)
        .build(registry.freeze());
    let runner = Arc::clone(&sup);
    let run = tokio::spawn(async move { runner.run().await });
    sup.wait_ready().await;
    (sup, run)
}

/// Next PENDING/SUCCESSFUL/FAILED action for `base`.
async fn next_lifecycle(rx: &mut broadcast::Receiver<Action>, base: &str) -> Action {
    loop {
        let action = rx.recv().await.expect("bus closed");
        if action.base() == base && action.phase() != Phase::Requested {
            return action;
        }
    }
}

async fn expect_lifecycle(rx: &mut broadcast::Receiver<Action>, base: &str) -> Action {
    tokio::time::timeout(Duration::from_secs(2), next_lifecycle(rx, base))
        .await
        .expect("timed out waiting for lifecycle action")
}

/// Operation answering `{"n": n}` once the gate registered for `n` is released.
fn gated(gates: &Gates) -> OperationRef {
    let gates = Arc::clone(gates);
    OperationFn::arc(move |payload: Value| {
        let n = payload["n"].as_u64().unwrap_or_default();
        let gate = gates.lock().remove(&n);
        async move {
            if let Some(gate) = gate {
                let _ = gate.await;
            }
            Ok::<_, OperationError>(json!({ "n": n }))
        }
    })
}

fn open_gates(ns: &[u64]) -> (Gates, HashMap<u64, oneshot::Sender<()>>) {
    let gates: Gates = Arc::default();
    let mut senders = HashMap::new();
    for &n in ns {
        let (tx, rx) = oneshot::channel();
        gates.lock().insert(n, rx);
        senders.insert(n, tx);
    }
    (gates, senders)
}

#[tokio::test]
async fn fetch_file_end_to_end() {
    let mut registry = Registry::new(&cfg());
    registry
        .register(
            OperationFn::arc(|payload: Value| async move {
                match payload.get("id").and_then(Value::as_u64) {
                    Some(7) => Ok(json!({ "name": "a.txt" })),
                    _ => Err(OperationError::status(404)),
                }
            }),
            bases::FETCH_FILE,
        )
        .unwrap();

    let (sup, run) = start(registry, Vec::new()).await;
    let mut rx = sup.bus().subscribe();

    sup.request(bases::FETCH_FILE, json!({ "id": 7 }));

    let pending = expect_lifecycle(&mut rx, bases::FETCH_FILE).await;
    assert_eq!(pending.type_name(), "FETCH_FILE_PENDING");
    assert_eq!(pending.payload, None);

    let done = expect_lifecycle(&mut rx, bases::FETCH_FILE).await;
    assert_eq!(done.type_name(), "FETCH_FILE_SUCCESSFUL");
    assert_eq!(done.payload, Some(json!({ "name": "a.txt" })));

    sup.shutdown();
    assert!(run.await.unwrap().is_ok());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn failure_record_reaches_the_bus() {
    let mut registry = Registry::new(&cfg());
    registry
        .register(
            OperationFn::arc(|_payload: Value| async move {
                Err::<Value, _>(OperationError::response(404, json!({ "a": 1 })))
            }),
            bases::FETCH_FILES_LIST,
        )
        .unwrap();

    let (sup, run) = start(registry, Vec::new()).await;
    let mut rx = sup.bus().subscribe();

    sup.dispatch(Action::requested(bases::FETCH_FILES_LIST, Value::Null));

    assert_eq!(
        expect_lifecycle(&mut rx, bases::FETCH_FILES_LIST).await.phase(),
        Phase::Pending
    );
    let failed = expect_lifecycle(&mut rx, bases::FETCH_FILES_LIST).await;
    assert_eq!(failed.type_name(), "FETCH_FILES_LIST_FAILED");
    assert_eq!(failed.payload, Some(json!({ "a": 1, "statusCode": 404 })));

    sup.shutdown();
    assert!(run.await.unwrap().is_ok());
}

#[tokio::test]
async fn latest_only_reports_the_newest_request() {
    let (gates, mut release) = open_gates(&[1, 2]);
    let mut registry = Registry::new(&cfg());
    registry
        .register_with_mode(gated(&gates), bases::POLL_PROGRESS, ConcurrencyMode::Latest)
        .unwrap();

    let (sup, run) = start(registry, Vec::new()).await;
    let mut rx = sup.bus().subscribe();

    sup.request(bases::POLL_PROGRESS, json!({ "n": 1 }));
    assert_eq!(
        expect_lifecycle(&mut rx, bases::POLL_PROGRESS).await.phase(),
        Phase::Pending
    );

    sup.request(bases::POLL_PROGRESS, json!({ "n": 2 }));
    assert_eq!(
        expect_lifecycle(&mut rx, bases::POLL_PROGRESS).await.phase(),
        Phase::Pending
    );

    // The first execution resolves late; its result must not surface.
    let _ = release.remove(&1).unwrap().send(());
    let _ = release.remove(&2).unwrap().send(());

    let done = expect_lifecycle(&mut rx, bases::POLL_PROGRESS).await;
    assert_eq!(done.type_name(), "POLL_PROGRESS_SUCCESSFUL");
    assert_eq!(done.payload, Some(json!({ "n": 2 })));

    let extra =
        tokio::time::timeout(Duration::from_millis(100), next_lifecycle(&mut rx, bases::POLL_PROGRESS))
            .await;
    assert!(extra.is_err(), "superseded execution emitted {:?}", extra.map(|a| a.type_name()));

    sup.shutdown();
    assert!(run.await.unwrap().is_ok());
}

#[tokio::test]
async fn every_reports_each_request() {
    let (gates, mut release) = open_gates(&[1, 2]);
    let mut registry = Registry::new(&cfg());
    registry
        .register_with_mode(gated(&gates), bases::FETCH_FILE, ConcurrencyMode::Every)
        .unwrap();

    let (sup, run) = start(registry, Vec::new()).await;
    let mut rx = sup.bus().subscribe();

    sup.request(bases::FETCH_FILE, json!({ "n": 1 }));
    sup.request(bases::FETCH_FILE, json!({ "n": 2 }));
    for _ in 0..2 {
        assert_eq!(
            expect_lifecycle(&mut rx, bases::FETCH_FILE).await.phase(),
            Phase::Pending
        );
    }

    let _ = release.remove(&2).unwrap().send(());
    let _ = release.remove(&1).unwrap().send(());

    let mut results = Vec::new();
    for _ in 0..2 {
        let done = expect_lifecycle(&mut rx, bases::FETCH_FILE).await;
        assert_eq!(done.phase(), Phase::Successful);
        results.push(done.payload.unwrap()["n"].as_u64().unwrap());
    }
    results.sort_unstable();
    assert_eq!(results, vec![1, 2]);

    sup.shutdown();
    assert!(run.await.unwrap().is_ok());
}

/// Waits until `record` has seen `count` actions of type `name`.
async fn wait_seen(record: &Record, name: &str, count: usize) {
    tokio::time::timeout(Duration::from_secs(2), async {
        while record.seen.lock().iter().filter(|n| *n == name).count() < count {
            tokio::task::yield_now().await;
        }
    })
    .await
    .unwrap_or_else(|_| panic!("subscriber did not see {count} x {name}"));
}

#[tokio::test]
async fn every_base_stays_pending_while_any_execution_runs() {
    let (gates, mut release) = open_gates(&[1, 2]);
    let mut registry = Registry::new(&cfg());
    registry
        .register_with_mode(gated(&gates), bases::FETCH_FILE, ConcurrencyMode::Every)
        .unwrap();

    let record = Arc::new(Record::default());
    let (sup, run) = start(registry, vec![record.clone() as Arc<dyn Subscribe>]).await;

    sup.request(bases::FETCH_FILE, json!({ "n": 1 }));
    sup.request(bases::FETCH_FILE, json!({ "n": 2 }));
    wait_seen(&record, "FETCH_FILE_PENDING", 2).await;

    // Subscribers are fed after the tracker, so the tracker has seen this result.
    let _ = release.remove(&1).unwrap().send(());
    wait_seen(&record, "FETCH_FILE_SUCCESSFUL", 1).await;
    assert!(sup.is_pending(bases::FETCH_FILE).await);
    assert_eq!(sup.pending().await, vec![bases::FETCH_FILE.to_string()]);

    let _ = release.remove(&2).unwrap().send(());
    wait_seen(&record, "FETCH_FILE_SUCCESSFUL", 2).await;
    assert!(!sup.is_pending(bases::FETCH_FILE).await);
    assert!(sup.pending().await.is_empty());

    sup.shutdown();
    assert!(run.await.unwrap().is_ok());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn request_burst_larger_than_the_bus_is_not_dropped() {
    let cfg = SupervisorConfig {
        bus_capacity: 8,
        ..cfg()
    };
    let calls = Arc::new(AtomicUsize::new(0));
    let mut registry = Registry::new(&cfg);
    registry
        .register_with_mode(
            OperationFn::arc({
                let calls = Arc::clone(&calls);
                move |payload: Value| {
                    calls.fetch_add(1, Ordering::SeqCst);
                    async move { Ok::<_, OperationError>(payload) }
                }
            }),
            bases::FETCH_FILE,
            ConcurrencyMode::Every,
        )
        .unwrap();

    let sup = Supervisor::builder(cfg).build(registry.freeze());
    let runner = Arc::clone(&sup);
    let run = tokio::spawn(async move { runner.run().await });
    sup.wait_ready().await;

    for n in 0..20 {
        sup.request(bases::FETCH_FILE, json!({ "n": n }));
    }

    tokio::time::timeout(Duration::from_secs(2), async {
        while calls.load(Ordering::SeqCst) < 20 {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .unwrap_or_else(|_| panic!("only {} of 20 requests ran", calls.load(Ordering::SeqCst)));

    sup.shutdown();
    assert!(run.await.unwrap().is_ok());
}

#[tokio::test]
async fn other_bases_are_not_triggered() {
    let calls = Arc::new(Mutex::new(Vec::<String>::new()));
    let mut registry = Registry::new(&cfg());
    for base in [bases::START_SCRAPE, bases::STOP_SCRAPE] {
        let calls = Arc::clone(&calls);
        let name = base.to_string();
        registry
            .register(
                OperationFn::arc(move |_payload: Value| {
                    calls.lock().push(name.clone());
                    async move { Ok::<_, OperationError>(Value::Null) }
                }),
                base,
            )
            .unwrap();
    }

    let (sup, run) = start(registry, Vec::new()).await;
    let mut rx = sup.bus().subscribe();

    sup.request(bases::STOP_SCRAPE, Value::Null);
    assert_eq!(
        expect_lifecycle(&mut rx, bases::STOP_SCRAPE).await.phase(),
        Phase::Pending
    );
    assert_eq!(
        expect_lifecycle(&mut rx, bases::STOP_SCRAPE).await.phase(),
        Phase::Successful
    );
    assert_eq!(*calls.lock(), vec![bases::STOP_SCRAPE.to_string()]);

    sup.shutdown();
    assert!(run.await.unwrap().is_ok());
}

#[tokio::test]
async fn shutdown_cancels_in_flight_silently() {
    let mut registry = Registry::new(&cfg());
    registry
        .register(
            OperationFn::arc(|_payload: Value| async move {
                std::future::pending::<()>().await;
                Ok::<_, OperationError>(Value::Null)
            }),
            bases::POLL_PROGRESS,
        )
        .unwrap();

    let (sup, run) = start(registry, Vec::new()).await;
    let mut rx = sup.bus().subscribe();

    sup.request(bases::POLL_PROGRESS, Value::Null);
    assert_eq!(
        expect_lifecycle(&mut rx, bases::POLL_PROGRESS).await.phase(),
        Phase::Pending
    );

    sup.shutdown();
    assert!(run.await.unwrap().is_ok());

    // No terminal action for the cancelled execution; the tracker still sees it loading.
    assert!(rx.try_recv().is_err());
    assert!(sup.is_pending(bases::POLL_PROGRESS).await);
    assert_eq!(sup.pending().await, vec![bases::POLL_PROGRESS.to_string()]);
}

#[tokio::test]
async fn run_twice_is_rejected() {
    let registry = Registry::new(&cfg());
    let (sup, run) = start(registry, Vec::new()).await;

    assert!(matches!(sup.run().await, Err(RuntimeError::AlreadyRunning)));

    sup.shutdown();
    assert!(run.await.unwrap().is_ok());
}

#[test]
fn duplicate_registration_is_detected() {
    let mut registry = Registry::new(&cfg());
    let op = || OperationFn::arc(|p: Value| async move { Ok::<_, OperationError>(p) });

    registry.register(op(), bases::START_SCRAPE).unwrap();
    let err = registry.register(op(), bases::START_SCRAPE).unwrap_err();

    assert!(matches!(err, RegistryError::DuplicateBase { ref base } if base == "START_SCRAPE"));
    assert_eq!(err.as_label(), "registry_duplicate_base");
}

#[derive(Default)]
struct Record {
    seen: Mutex<Vec<String>>,
}

#[async_trait]
impl Subscribe for Record {
    async fn on_action(&self, action: &Action) {
        self.seen.lock().push(action.type_name());
    }
}

#[tokio::test]
async fn subscribers_see_the_full_lifecycle() {
    let mut registry = Registry::new(&cfg());
    registry
        .register(
            OperationFn::arc(|_payload: Value| async move {
                Ok::<_, OperationError>(json!({ "running": true }))
            }),
            bases::START_SCRAPE,
        )
        .unwrap();

    let record = Arc::new(Record::default());
    let (sup, run) = start(registry, vec![record.clone() as Arc<dyn Subscribe>]).await;

    sup.request(bases::START_SCRAPE, json!({ "url": "https://example.org" }));

    tokio::time::timeout(Duration::from_secs(2), async {
        while record.seen.lock().len() < 3 {
            tokio::task::yield_now().await;
        }
    })
    .await
    .expect("subscriber did not see three actions");

    assert_eq!(
        *record.seen.lock(),
        vec![
            "START_SCRAPE_REQUESTED".to_string(),
            "START_SCRAPE_PENDING".to_string(),
            "START_SCRAPE_SUCCESSFUL".to_string(),
        ]
    );

    sup.shutdown();
    assert!(run.await.unwrap().is_ok());
}
