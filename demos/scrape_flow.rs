//! # Example: Scrape Flow
//!
//! Wires the scraper's five requests to simulated backend calls and drives a
//! short session: start a scrape, poll progress a few times in quick
//! succession (only the newest poll reports), fetch two files concurrently,
//! then stop.
//!
//! ```text
//! START_SCRAPE_REQUESTED ─► START_SCRAPE_PENDING ─► START_SCRAPE_SUCCESSFUL
//! POLL_PROGRESS_REQUESTED x3 (Latest) ─► only the third reaches SUCCESSFUL
//! FETCH_FILE_REQUESTED x2 (Every) ─► both reach SUCCESSFUL / FAILED
//! ```
//!
//! Run with:
//! ```bash
//! RUST_LOG=info cargo run --example scrape_flow --features logging
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use serde_json::{Value, json};
use tracing_subscriber::EnvFilter;

use reqvisor::{
    ConcurrencyMode, LogWriter, OperationError, OperationFn, OperationRef, Phase, Registry,
    Subscribe, Supervisor, SupervisorConfig, bases,
};

/// Simulated backend latency.
async fn backend(ms: u64) {
    tokio::time::sleep(Duration::from_millis(ms)).await;
}

fn start_scrape() -> OperationRef {
    OperationFn::arc(|payload: Value| async move {
        backend(100).await;
        Ok::<_, OperationError>(json!({ "running": true, "url": payload["url"] }))
    })
}

fn stop_scrape() -> OperationRef {
    OperationFn::arc(|_payload: Value| async move {
        backend(50).await;
        Ok::<_, OperationError>(json!({ "running": false }))
    })
}

fn poll_progress(done: Arc<AtomicU64>) -> OperationRef {
    OperationFn::arc(move |_payload: Value| {
        let done = Arc::clone(&done);
        async move {
            backend(150).await;
            let files = done.fetch_add(3, Ordering::Relaxed) + 3;
            Ok::<_, OperationError>(json!({ "filesDone": files }))
        }
    })
}

fn fetch_file() -> OperationRef {
    OperationFn::arc(|payload: Value| async move {
        backend(80).await;
        match payload.get("id").and_then(Value::as_u64) {
            Some(id) if id < 10 => Ok(json!({ "id": id, "name": format!("file-{id}.txt") })),
            _ => Err(OperationError::response(
                404,
                json!({ "error": "not found", "id": payload["id"] }),
            )),
        }
    })
}

fn fetch_files_list() -> OperationRef {
    OperationFn::arc(|_payload: Value| async move {
        backend(60).await;
        Ok::<_, OperationError>(json!([{ "id": 7, "name": "a.txt" }]))
    })
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cfg = SupervisorConfig {
        grace: Duration::from_secs(2),
        ..SupervisorConfig::default()
    };

    let mut registry = Registry::new(&cfg);
    registry.register(start_scrape(), bases::START_SCRAPE)?;
    registry.register(stop_scrape(), bases::STOP_SCRAPE)?;
    registry.register(poll_progress(Arc::new(AtomicU64::new(0))), bases::POLL_PROGRESS)?;
    registry.register_with_mode(fetch_file(), bases::FETCH_FILE, ConcurrencyMode::Every)?;
    registry.register(fetch_files_list(), bases::FETCH_FILES_LIST)?;

    let subs: Vec<Arc<dyn Subscribe>> = vec![Arc::new(LogWriter::new())];
    let sup = Supervisor::builder(cfg)
        .with_subscribers(subs)
        .build(registry.freeze());

    let runner = Arc::clone(&sup);
    let run = tokio::spawn(async move { runner.run().await });
    sup.wait_ready().await;

    let mut rx = sup.bus().subscribe();

    sup.request(bases::START_SCRAPE, json!({ "url": "https://example.org" }));
    for _ in 0..3 {
        sup.request(bases::POLL_PROGRESS, Value::Null);
        backend(20).await;
    }
    sup.request(bases::FETCH_FILE, json!({ "id": 7 }));
    sup.request(bases::FETCH_FILE, json!({ "id": 42 }));
    sup.request(bases::FETCH_FILES_LIST, Value::Null);

    // Wait for: start, one poll, two fetches, list.
    let mut terminal = 0;
    while terminal < 5 {
        let action = rx.recv().await?;
        if action.phase().is_terminal() {
            terminal += 1;
            println!("{}", action.to_value());
        }
    }

    sup.request(bases::STOP_SCRAPE, Value::Null);
    loop {
        let action = rx.recv().await?;
        if action.is(bases::STOP_SCRAPE, Phase::Successful) {
            break;
        }
    }
    println!("still loading: {:?}", sup.pending().await);

    sup.shutdown();
    run.await??;
    Ok(())
}
