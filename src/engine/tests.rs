use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{Value, json};

use crate::config::EngineConfig;
use crate::error::FetchError;
use crate::events::EventKind;
use crate::host::{MapResolver, Publish};
use crate::producers::FnProducer;
use crate::types::{DestinationId, ParamBag, RequestKey, Updates};

use super::Engine;

/// Publisher that records every publish call for assertions.
#[derive(Default)]
struct RecordingPublisher {
    published: Mutex<Vec<(Option<DestinationId>, Updates)>>,
}

impl RecordingPublisher {
    fn last_for(&self, dest: &DestinationId) -> Option<Updates> {
        self.published
            .lock()
            .iter()
            .rev()
            .find(|(d, _)| d.as_ref() == Some(dest))
            .map(|(_, u)| u.clone())
    }

    fn count_for(&self, dest: &DestinationId) -> usize {
        self.published
            .lock()
            .iter()
            .filter(|(d, _)| d.as_ref() == Some(dest))
            .count()
    }

    fn total(&self) -> usize {
        self.published.lock().len()
    }
}

#[async_trait]
impl Publish for RecordingPublisher {
    async fn publish(&self, updates: &Updates, destination: Option<&DestinationId>) -> usize {
        self.published.lock().push((destination.cloned(), updates.clone()));
        1
    }
}

struct Rig {
    engine: Arc<Engine>,
    resolver: Arc<MapResolver>,
    publisher: Arc<RecordingPublisher>,
    calls: Arc<AtomicUsize>,
    fails: Arc<AtomicUsize>,
}

/// Quote producer: key `quote:{symbol}`, fetch sleeps `delay_ms` (cancellable)
/// and fails while the shared `fails` counter is positive.
fn rig(cfg: EngineConfig) -> Rig {
    let calls = Arc::new(AtomicUsize::new(0));
    let fails = Arc::new(AtomicUsize::new(0));
    let fetch_calls = Arc::clone(&calls);
    let fetch_fails = Arc::clone(&fails);

    let producer = FnProducer::arc(
        FnProducer::builder()
            .key_fn(|params, _| {
                let symbol = params.get("symbol")?.as_str()?;
                Some(RequestKey::from(format!("quote:{symbol}")))
            })
            .fetch_fn(move |params, cancel, _| {
                let calls = Arc::clone(&fetch_calls);
                let fails = Arc::clone(&fetch_fails);
                async move {
                    let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
                    let delay = params.get("delay_ms").and_then(Value::as_u64).unwrap_or(10);
                    tokio::select! {
                        () = tokio::time::sleep(Duration::from_millis(delay)) => {}
                        () = cancel.cancelled() => return Err(FetchError::Canceled),
                    }
                    if params.get("fail").and_then(Value::as_bool).unwrap_or(false) {
                        return Err(FetchError::Failed { error: "backend unavailable".into() });
                    }
                    if fails.load(Ordering::SeqCst) > 0 {
                        let _ = fails.fetch_sub(1, Ordering::SeqCst);
                        return Err(FetchError::Failed { error: "backend unavailable".into() });
                    }
                    let symbol = params.get("symbol").cloned().unwrap_or(Value::Null);
                    Ok(json!({ "symbol": symbol, "call": n }))
                }
            })
            .map_fn(|_, result, _| Updates::single("quote", result.clone()))
            .reset_fn(|_| Updates::single("quote", Value::Null)),
    );

    let resolver = Arc::new(MapResolver::new());
    let publisher = Arc::new(RecordingPublisher::default());
    let engine = Engine::builder(cfg)
        .with_producer(producer)
        .with_resolver(Arc::clone(&resolver) as _)
        .with_publisher(Arc::clone(&publisher) as _)
        .build()
        .expect("engine builds");

    Rig { engine, resolver, publisher, calls, fails }
}

fn params(symbol: &str, delay_ms: u64) -> ParamBag {
    ParamBag::new()
        .with("symbol", json!(symbol))
        .with("delay_ms", json!(delay_ms))
}

fn failing_params(symbol: &str, delay_ms: u64) -> ParamBag {
    params(symbol, delay_ms).with("fail", json!(true))
}

fn quote_symbol(updates: &Updates) -> Option<Value> {
    updates.get("quote").map(|q| q["symbol"].clone())
}

async fn run_for(ms: u64) {
    tokio::time::sleep(Duration::from_millis(ms)).await;
}

#[tokio::test(start_paused = true)]
async fn test_single_flight_shares_one_fetch() {
    let r = rig(EngineConfig::default());
    let (d1, d2) = (DestinationId::from("d1"), DestinationId::from("d2"));
    r.resolver.set("d1", params("ACME", 50));
    r.resolver.set("d2", params("ACME", 50));

    r.engine.on_connect(&d1).await;
    r.engine.on_connect(&d2).await;
    run_for(100).await;

    assert_eq!(r.calls.load(Ordering::SeqCst), 1, "second destination piggy-backs");
    assert!(r.publisher.last_for(&d1).is_some_and(|u| u.get("quote").is_some()));
    assert!(r.publisher.last_for(&d2).is_some_and(|u| u.get("quote").is_some()));
}

#[tokio::test(start_paused = true)]
async fn test_new_key_supersedes_inflight() {
    let r = rig(EngineConfig::default());
    let d1 = DestinationId::from("d1");
    r.resolver.set("d1", params("SLOW", 200));
    r.engine.on_connect(&d1).await;
    run_for(20).await;

    r.resolver.set("d1", params("FAST", 10));
    r.engine.on_destination_params_changed(&d1).await;
    run_for(300).await;

    assert_eq!(r.calls.load(Ordering::SeqCst), 2);
    let last = r.publisher.last_for(&d1).expect("fast result published");
    assert_eq!(quote_symbol(&last), Some(json!("FAST")));
    // The superseded operation never produced an output.
    assert_eq!(r.publisher.count_for(&d1), 1);
}

#[tokio::test(start_paused = true)]
async fn test_cache_hit_then_expiry_refetches() {
    let cfg = EngineConfig {
        cache_ttl: Duration::from_millis(200),
        ..EngineConfig::default()
    };
    let r = rig(cfg);
    let d1 = DestinationId::from("d1");
    r.resolver.set("d1", params("ACME", 10));
    r.engine.on_connect(&d1).await;
    run_for(50).await;
    assert_eq!(r.calls.load(Ordering::SeqCst), 1);

    // Within the TTL the cache answers.
    r.engine.produce(Some(&d1), false).await;
    run_for(20).await;
    assert_eq!(r.calls.load(Ordering::SeqCst), 1);
    assert_eq!(r.publisher.count_for(&d1), 2);

    // Past the TTL a fresh operation starts.
    run_for(300).await;
    r.engine.produce(Some(&d1), false).await;
    run_for(50).await;
    assert_eq!(r.calls.load(Ordering::SeqCst), 2);
}

#[tokio::test(start_paused = true)]
async fn test_broadcast_converges_destinations_sharing_a_key() {
    let r = rig(EngineConfig::default());
    let (d1, d2, d3) = (
        DestinationId::from("d1"),
        DestinationId::from("d2"),
        DestinationId::from("d3"),
    );
    for d in ["d1", "d2", "d3"] {
        r.resolver.set(d, params("ACME", 10));
    }

    r.engine.on_connect(&d1).await;
    run_for(50).await;
    r.engine.on_connect(&d2).await;
    r.engine.on_connect(&d3).await;
    run_for(50).await;

    assert_eq!(r.calls.load(Ordering::SeqCst), 1, "late destinations reuse the cache");
    let v1 = r.publisher.last_for(&d1).and_then(|u| quote_symbol(&u));
    let v2 = r.publisher.last_for(&d2).and_then(|u| quote_symbol(&u));
    let v3 = r.publisher.last_for(&d3).and_then(|u| quote_symbol(&u));
    assert_eq!(v1, Some(json!("ACME")));
    assert_eq!(v1, v2);
    assert_eq!(v2, v3);
}

#[tokio::test(start_paused = true)]
async fn test_insufficient_params_publish_resets_and_cancel() {
    let r = rig(EngineConfig::default());
    let d1 = DestinationId::from("d1");

    // No "symbol": key is not computable, resets go out, nothing is fetched.
    r.resolver.set("d1", ParamBag::new());
    r.engine.on_connect(&d1).await;
    run_for(20).await;
    assert_eq!(r.calls.load(Ordering::SeqCst), 0);
    let last = r.publisher.last_for(&d1).expect("reset published");
    assert_eq!(last.get("quote"), Some(&Value::Null));

    // A slow operation in flight gets cancelled when params become
    // insufficient again via a shared-parameter change.
    r.resolver.set("d1", params("ACME", 500));
    r.engine.on_destination_params_changed(&d1).await;
    run_for(20).await;
    r.resolver.set("d1", ParamBag::new());
    r.engine.on_home_params_changed().await;
    run_for(800).await;

    assert_eq!(r.calls.load(Ordering::SeqCst), 1);
    let last = r.publisher.last_for(&d1).expect("second reset published");
    assert_eq!(last.get("quote"), Some(&Value::Null), "cancelled fetch never lands");
}

#[tokio::test(start_paused = true)]
async fn test_piggyback_retries_once_when_cache_disabled() {
    let cfg = EngineConfig {
        cache_ttl: Duration::ZERO,
        ..EngineConfig::default()
    };
    let r = rig(cfg);
    let (d1, d2) = (DestinationId::from("d1"), DestinationId::from("d2"));
    r.resolver.set("d1", params("ACME", 50));
    r.resolver.set("d2", params("ACME", 50));
    r.fails.store(1, Ordering::SeqCst);

    r.engine.on_connect(&d1).await;
    r.engine.on_connect(&d2).await;
    run_for(300).await;

    // First fetch failed; the piggy-backed destination retried exactly once
    // and the retry's result reached both destinations.
    assert_eq!(r.calls.load(Ordering::SeqCst), 2);
    assert!(r.publisher.last_for(&d1).is_some_and(|u| u.get("quote").is_some()));
    assert!(r.publisher.last_for(&d2).is_some_and(|u| u.get("quote").is_some()));
}

#[tokio::test(start_paused = true)]
async fn test_retry_is_consumed_after_one_attempt() {
    let cfg = EngineConfig {
        cache_ttl: Duration::ZERO,
        ..EngineConfig::default()
    };
    let r = rig(cfg);
    let (d1, d2) = (DestinationId::from("d1"), DestinationId::from("d2"));
    r.resolver.set("d1", params("ACME", 50));
    r.resolver.set("d2", params("ACME", 50));
    r.fails.store(10, Ordering::SeqCst);

    r.engine.on_connect(&d1).await;
    r.engine.on_connect(&d2).await;
    run_for(500).await;

    assert_eq!(r.calls.load(Ordering::SeqCst), 2, "one initial fetch plus one retry");
    assert_eq!(r.publisher.total(), 0, "failures are swallowed");
}

#[tokio::test(start_paused = true)]
async fn test_retry_latch_cleared_when_destination_moves_on() {
    let r = rig(EngineConfig::default());
    let (d1, d2) = (DestinationId::from("d1"), DestinationId::from("d2"));
    r.resolver.set("d1", failing_params("BAD", 200));
    r.resolver.set("d2", failing_params("BAD", 200));

    r.engine.on_connect(&d1).await;
    r.engine.on_connect(&d2).await;
    run_for(20).await;

    // While still holding an observer on the adopted operation, d2 moves to
    // its own key, which is fetched and cached.
    r.resolver.set("d2", params("GOOD", 10));
    r.engine.on_destination_params_changed(&d2).await;
    run_for(500).await;

    assert_eq!(
        r.calls.load(Ordering::SeqCst),
        2,
        "the failed adoption triggers no refetch for a key d2 no longer holds",
    );
    let last = r.publisher.last_for(&d2).expect("own result published");
    assert_eq!(quote_symbol(&last), Some(json!("GOOD")));
}

#[tokio::test(start_paused = true)]
async fn test_redundant_kickoffs_attach_one_observer() {
    let r = rig(EngineConfig::default());
    let (d1, d2) = (DestinationId::from("d1"), DestinationId::from("d2"));
    r.resolver.set("d1", params("ACME", 50));
    r.resolver.set("d2", params("ACME", 50));

    r.engine.on_connect(&d1).await;
    r.engine.on_connect(&d2).await;
    // Repeated passes while the shared operation is still in flight.
    r.engine.produce(Some(&d2), false).await;
    r.engine.produce(Some(&d2), false).await;
    run_for(200).await;

    assert_eq!(r.calls.load(Ordering::SeqCst), 1);
    // One settlement broadcast plus one observer cache-hit broadcast; extra
    // passes add no observers and therefore no duplicate publishes.
    assert_eq!(r.publisher.count_for(&d1), 2);
    assert_eq!(r.publisher.count_for(&d2), 2);
}

#[tokio::test(start_paused = true)]
async fn test_deadline_cancels_slow_fetch() {
    let cfg = EngineConfig {
        deadline: Duration::from_millis(100),
        ..EngineConfig::default()
    };
    let r = rig(cfg);
    let d1 = DestinationId::from("d1");
    r.resolver.set("d1", params("ACME", 10_000));
    let mut rx = r.engine.bus().subscribe();

    r.engine.on_connect(&d1).await;
    run_for(300).await;

    assert_eq!(r.calls.load(Ordering::SeqCst), 1);
    assert_eq!(r.publisher.total(), 0);

    let mut kinds = Vec::new();
    while let Ok(ev) = rx.try_recv() {
        kinds.push(ev.kind);
    }
    assert!(kinds.contains(&EventKind::DeadlineHit));

    let snap = r.engine.snapshot().await;
    assert_eq!(snap.pending, 0);
    assert_eq!(snap.live_cancels, 0);
    assert_eq!(snap.live_timers, 0);
}

#[tokio::test(start_paused = true)]
async fn test_force_refetch_bypasses_cache_but_not_dedup() {
    let r = rig(EngineConfig::default());
    let d1 = DestinationId::from("d1");
    r.resolver.set("d1", params("ACME", 50));
    r.engine.on_connect(&d1).await;
    run_for(100).await;
    assert_eq!(r.calls.load(Ordering::SeqCst), 1);

    r.engine.produce(Some(&d1), true).await;
    // Issued while the forced operation is still in flight: adopts it.
    r.engine.produce(Some(&d1), true).await;
    run_for(200).await;

    assert_eq!(r.calls.load(Ordering::SeqCst), 2);
}

#[tokio::test(start_paused = true)]
async fn test_detach_releases_everything_and_stays_usable() {
    let r = rig(EngineConfig::default());
    let (d1, d2, d3) = (
        DestinationId::from("d1"),
        DestinationId::from("d2"),
        DestinationId::from("d3"),
    );
    r.resolver.set("d1", params("AAA", 1_000));
    r.resolver.set("d2", params("BBB", 1_000));
    r.resolver.set("d3", params("CCC", 10));

    r.engine.on_connect(&d1).await;
    r.engine.on_connect(&d2).await;
    let snap = r.engine.snapshot().await;
    assert_eq!(snap.destinations, 2);
    assert_eq!(snap.pending, 2);
    assert_eq!(snap.live_cancels, 2);

    r.engine.on_detach().await;
    let snap = r.engine.snapshot().await;
    assert_eq!(snap.destinations, 0);
    assert_eq!(snap.pending, 0);
    assert_eq!(snap.live_cancels, 0);
    assert_eq!(snap.live_timers, 0);

    run_for(2_000).await;
    assert_eq!(r.publisher.total(), 0, "cancelled operations publish nothing");

    // Detach is not terminal.
    r.engine.on_connect(&d3).await;
    run_for(50).await;
    assert!(r.publisher.last_for(&d3).is_some_and(|u| u.get("quote").is_some()));
}

#[tokio::test(start_paused = true)]
async fn test_disconnect_cancels_and_stops_publishing() {
    let r = rig(EngineConfig::default());
    let d1 = DestinationId::from("d1");
    r.resolver.set("d1", params("ACME", 100));

    r.engine.on_connect(&d1).await;
    run_for(20).await;
    r.engine.on_disconnect(&d1).await;
    run_for(300).await;

    assert_eq!(r.calls.load(Ordering::SeqCst), 1);
    assert_eq!(r.publisher.count_for(&d1), 0);
    assert_eq!(r.engine.snapshot().await.destinations, 0);
}

#[tokio::test(start_paused = true)]
async fn test_write_state_rekicks_only_on_change() {
    let r = rig(EngineConfig::default());
    let d1 = DestinationId::from("d1");
    r.resolver.set("d1", params("ACME", 10));
    r.engine.on_connect(&d1).await;
    run_for(50).await;
    let after_connect = r.publisher.count_for(&d1);

    r.engine.write_state("mode", json!("live")).await;
    run_for(20).await;
    assert_eq!(
        r.publisher.count_for(&d1),
        after_connect + 1,
        "changed state re-kicks and the cache answers",
    );
    assert_eq!(r.calls.load(Ordering::SeqCst), 1);

    r.engine.write_state("mode", json!("live")).await;
    run_for(20).await;
    assert_eq!(r.publisher.count_for(&d1), after_connect + 1, "unchanged write is a no-op");
}

#[tokio::test(start_paused = true)]
async fn test_unresolvable_destination_is_inert_until_params_arrive() {
    let r = rig(EngineConfig::default());
    let d1 = DestinationId::from("d1");

    r.engine.on_connect(&d1).await;
    run_for(20).await;
    assert_eq!(r.calls.load(Ordering::SeqCst), 0);
    assert_eq!(r.publisher.total(), 0);

    r.resolver.set("d1", params("ACME", 10));
    r.engine.on_destination_params_changed(&d1).await;
    run_for(50).await;
    assert_eq!(r.calls.load(Ordering::SeqCst), 1);
    assert!(r.publisher.last_for(&d1).is_some());
}

#[tokio::test(start_paused = true)]
async fn test_initial_values_published_once() {
    let producer = FnProducer::arc(
        FnProducer::builder().initial_fn(|_, _| Updates::single("ready", json!(true))),
    );
    let resolver = Arc::new(MapResolver::new());
    let publisher = Arc::new(RecordingPublisher::default());
    let engine = Engine::builder(EngineConfig::default())
        .with_producer(producer)
        .with_resolver(Arc::clone(&resolver) as _)
        .with_publisher(Arc::clone(&publisher) as _)
        .build()
        .expect("engine builds");

    let (d1, d2) = (DestinationId::from("d1"), DestinationId::from("d2"));
    engine.on_connect(&d1).await;
    engine.on_connect(&d2).await;
    run_for(20).await;

    let first = publisher.last_for(&d1).expect("initial values for the first connect");
    assert_eq!(first.get("ready"), Some(&json!(true)));
    assert_eq!(publisher.count_for(&d1), 1);
    assert_eq!(publisher.count_for(&d2), 0, "initial publish happens once per engine");
}
