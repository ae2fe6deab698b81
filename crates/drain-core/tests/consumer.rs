mod common;

use std::{sync::Arc, time::Duration};

use common::{Failing, FlakyQueue, KEY, Panicking, Witness, Recorder, payload, witness};
use drain_core::{
    BackendError, Consumer, ConsumerError, EventKind, HandlerRegistry, LoopPhase, MemoryQueue,
    RunReport,
};
use drain_model::{AdmissionPolicy, ConfigError, JobOutcome, JobQuery, JobStatus, RunConfig};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

const POLICIES: [AdmissionPolicy; 2] = [AdmissionPolicy::EagerCap, AdmissionPolicy::WorkerPool];

fn config(policy: AdmissionPolicy, max_concurrency: usize) -> RunConfig {
    RunConfig::default()
        .with_queue_key(KEY)
        .with_policy(policy)
        .with_max_concurrency(max_concurrency)
}

async fn run_to_ceiling(consumer: Consumer) -> RunReport {
    consumer
        .run(CancellationToken::new())
        .await
        .expect("run should end cleanly")
}

#[tokio::test(start_paused = true)]
async fn single_email_job_empties_the_queue() {
    let queue = MemoryQueue::new();
    queue.push_now(KEY, r#"{"type":"email","data":{"to":"a@b.com"}}"#);
    let witness = witness();
    let registry = HandlerRegistry::default().with("email", witness.clone());

    let consumer = Consumer::new(
        Arc::new(queue.clone()),
        Arc::new(registry),
        config(AdmissionPolicy::EagerCap, 1).with_max_jobs(1),
    )
    .unwrap();
    let ledger = consumer.ledger();
    let report = run_to_ceiling(consumer).await;

    assert_eq!(report.processed, 1);
    assert_eq!(report.succeeded, 1);
    assert!(queue.is_empty(KEY));
    assert_eq!(witness.seen(), [1]);

    let info = ledger.get(1).unwrap();
    assert_eq!(info.kind.as_str(), "email");
    assert_eq!(info.outcome, Some(JobOutcome::Succeeded));
}

#[tokio::test(start_paused = true)]
async fn concurrency_never_exceeds_the_cap() {
    for policy in POLICIES {
        let queue = MemoryQueue::new();
        for (kind, secs) in [
            ("fast_task", 0.5),
            ("fast_task", 0.5),
            ("fast_task", 0.5),
            ("medium_task", 1.0),
            ("medium_task", 1.0),
            ("slow_task", 2.0),
            ("slow_task", 2.0),
        ] {
            queue.push_now(KEY, payload(kind, secs));
        }
        let witness = witness();
        let consumer = Consumer::new(
            Arc::new(queue.clone()),
            Arc::new(HandlerRegistry::new(witness.clone())),
            config(policy, 3).with_max_jobs(7),
        )
        .unwrap();

        let started = Instant::now();
        let report = run_to_ceiling(consumer).await;
        let elapsed = started.elapsed();

        assert_eq!(report.processed, 7, "{policy}");
        assert_eq!(report.succeeded, 7, "{policy}");
        assert!(witness.peak() <= 3, "{policy}: peak {}", witness.peak());
        assert!(report.peak_in_flight <= 3, "{policy}");
        assert!(elapsed < Duration::from_millis(7500), "{policy}: {elapsed:?}");
        assert!(elapsed >= Duration::from_secs(2), "{policy}: {elapsed:?}");
        assert_eq!(witness.running(), 0);
    }
}

#[tokio::test(start_paused = true)]
async fn empty_queue_is_polled_once_per_interval() {
    let queue = Arc::new(FlakyQueue::new(MemoryQueue::new(), 0));
    let consumer = Consumer::new(
        queue.clone(),
        Arc::new(HandlerRegistry::default()),
        config(AdmissionPolicy::EagerCap, 2),
    )
    .unwrap();

    let token = CancellationToken::new();
    let handle = tokio::spawn(consumer.run(token.clone()));
    tokio::time::sleep(Duration::from_millis(3500)).await;
    token.cancel();
    let report = handle.await.unwrap().unwrap();

    assert_eq!(report, RunReport::default());
    assert_eq!(queue.pops(), 4);
    let times = queue.pop_times();
    for pair in times.windows(2) {
        assert!(pair[1] - pair[0] >= Duration::from_secs(1));
    }
}

#[tokio::test(start_paused = true)]
async fn malformed_payload_is_dropped_without_counting() {
    let queue = MemoryQueue::new();
    queue.push_now(KEY, "definitely not json");
    queue.push_now(KEY, "[1, 2, 3]");
    queue.push_now(KEY, payload("email", 0.1));
    let witness = witness();
    let recorder = Arc::new(Recorder::default());

    let consumer = Consumer::new(
        Arc::new(queue.clone()),
        Arc::new(HandlerRegistry::new(witness.clone())),
        config(AdmissionPolicy::EagerCap, 1).with_max_jobs(1),
    )
    .unwrap()
    .with_subscriber(recorder.clone());
    let report = run_to_ceiling(consumer).await;

    assert_eq!(report.decode_failures, 2);
    assert_eq!(report.processed, 1);
    assert_eq!(recorder.count(EventKind::DecodeFailed), 2);
    let dropped: Vec<(Option<u64>, Option<String>)> = recorder
        .events()
        .into_iter()
        .filter(|e| e.kind == EventKind::DecodeFailed)
        .map(|e| (e.sequence_id, e.raw))
        .collect();
    assert_eq!(
        dropped,
        [
            (Some(1), Some("definitely not json".to_string())),
            (Some(2), Some("[1, 2, 3]".to_string())),
        ]
    );
    // Malformed items still consume a sequence number.
    assert_eq!(witness.seen(), [3]);
}

#[tokio::test(start_paused = true)]
async fn job_ceiling_is_checked_before_popping() {
    for policy in POLICIES {
        let queue = MemoryQueue::new();
        for _ in 0..5 {
            queue.push_now(KEY, payload("fast_task", 0.5));
        }
        let counted = Arc::new(FlakyQueue::new(queue.clone(), 0));
        let recorder = Arc::new(Recorder::default());

        let consumer = Consumer::new(
            counted.clone(),
            Arc::new(HandlerRegistry::new(witness())),
            config(policy, 2).with_max_jobs(3),
        )
        .unwrap()
        .with_subscriber(recorder.clone());
        let report = run_to_ceiling(consumer).await;

        assert_eq!(report.processed, 3, "{policy}");
        assert_eq!(counted.pops(), 3, "{policy}");
        assert_eq!(queue.len(KEY), 2, "{policy}");
        assert_eq!(recorder.count(EventKind::MaxJobsReached), 1);
    }
}

#[tokio::test(start_paused = true)]
async fn shutdown_waits_for_admitted_jobs() {
    for policy in POLICIES {
        let queue = MemoryQueue::new();
        for _ in 0..3 {
            queue.push_now(KEY, payload("slow_task", 5.0));
        }
        let witness = witness();
        let consumer = Consumer::new(
            Arc::new(queue),
            Arc::new(HandlerRegistry::new(witness.clone())),
            config(policy, 3),
        )
        .unwrap();
        let ledger = consumer.ledger();
        let mut phase = consumer.phase();

        let token = CancellationToken::new();
        let started = Instant::now();
        let handle = tokio::spawn(consumer.run(token.clone()));
        tokio::time::sleep(Duration::from_millis(100)).await;
        token.cancel();
        let report = handle.await.unwrap().unwrap();

        assert!(started.elapsed() >= Duration::from_secs(5), "{policy}");
        assert_eq!(report.processed, 3, "{policy}");
        assert_eq!(report.succeeded, 3, "{policy}");
        assert_eq!(witness.running(), 0);
        assert!(ledger.active().is_empty());
        assert_eq!(*phase.borrow_and_update(), LoopPhase::Stopped);
    }
}

#[tokio::test(start_paused = true)]
async fn failing_actions_release_their_slot() {
    for policy in POLICIES {
        let queue = MemoryQueue::new();
        queue.push_now(KEY, payload("boom", 0.0));
        queue.push_now(KEY, payload("bad", 0.0));
        queue.push_now(KEY, payload("ok", 0.2));
        let witness = witness();
        let registry = HandlerRegistry::default()
            .with("ok", witness.clone())
            .with("bad", Arc::new(Failing))
            .with("boom", Arc::new(Panicking));

        // One slot: a leaked slot would stall the second admission forever.
        let consumer = Consumer::new(
            Arc::new(queue),
            Arc::new(registry),
            config(policy, 1).with_max_jobs(3),
        )
        .unwrap();
        let ledger = consumer.ledger();
        let report = run_to_ceiling(consumer).await;

        assert_eq!(report.processed, 3, "{policy}");
        assert_eq!(report.succeeded, 1, "{policy}");
        assert_eq!(report.failed, 2, "{policy}");
        assert_eq!(report.peak_in_flight, 1, "{policy}");
        assert_eq!(witness.seen(), [3]);

        assert_eq!(ledger.get(1).unwrap().outcome, Some(JobOutcome::Panicked));
        assert_eq!(ledger.get(2).unwrap().outcome, Some(JobOutcome::Failed));
        let done = ledger.query(&JobQuery::new().with_status(JobStatus::Completed));
        assert_eq!(done.total, 3);
    }
}

#[tokio::test(start_paused = true)]
async fn job_timeout_frees_the_slot() {
    let queue = MemoryQueue::new();
    queue.push_now(KEY, payload("stuck", 3600.0));
    queue.push_now(KEY, payload("fast_task", 0.5));
    let witness = witness();

    let consumer = Consumer::new(
        Arc::new(queue),
        Arc::new(HandlerRegistry::new(witness.clone())),
        config(AdmissionPolicy::EagerCap, 1)
            .with_max_jobs(2)
            .with_job_timeout(Duration::from_secs(1)),
    )
    .unwrap();
    let ledger = consumer.ledger();

    let started = Instant::now();
    let report = run_to_ceiling(consumer).await;

    assert!(started.elapsed() < Duration::from_secs(2));
    assert_eq!(report.failed, 1);
    assert_eq!(report.succeeded, 1);
    assert_eq!(ledger.get(1).unwrap().outcome, Some(JobOutcome::TimedOut));
}

#[tokio::test(start_paused = true)]
async fn backend_failures_back_off_then_recover() {
    let inner = MemoryQueue::new();
    inner.push_now(KEY, payload("email", 0.1));
    let queue = Arc::new(FlakyQueue::new(inner, 2));
    let recorder = Arc::new(Recorder::default());

    let consumer = Consumer::new(
        queue.clone(),
        Arc::new(HandlerRegistry::new(witness())),
        config(AdmissionPolicy::EagerCap, 1).with_max_jobs(1),
    )
    .unwrap()
    .with_subscriber(recorder.clone());
    let report = run_to_ceiling(consumer).await;

    assert_eq!(report.backend_errors, 2);
    assert_eq!(report.processed, 1);
    assert_eq!(recorder.count(EventKind::BackendFailed), 2);
    assert_eq!(recorder.count(EventKind::BackendRecovered), 1);

    // Default backoff is five poll intervals.
    let times = queue.pop_times();
    assert_eq!(times.len(), 3);
    assert!(times[1] - times[0] >= Duration::from_secs(5));
    assert!(times[2] - times[1] >= Duration::from_secs(5));
}

#[tokio::test(start_paused = true)]
async fn persistent_backend_failure_ends_the_run() {
    let queue = Arc::new(FlakyQueue::new(MemoryQueue::new(), u32::MAX));
    let consumer = Consumer::new(
        queue.clone(),
        Arc::new(HandlerRegistry::default()),
        config(AdmissionPolicy::EagerCap, 1).with_max_backend_errors(3),
    )
    .unwrap();

    let err = consumer.run(CancellationToken::new()).await.unwrap_err();
    match err {
        ConsumerError::BackendExhausted { attempts, last } => {
            assert_eq!(attempts, 3);
            assert!(matches!(last, BackendError::Unavailable(_)));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(queue.pops(), 3);
}

#[tokio::test(start_paused = true)]
async fn every_popped_job_is_dispatched_once() {
    for policy in POLICIES {
        let queue = MemoryQueue::new();
        for i in 0..20 {
            queue.push_now(KEY, payload("fast_task", 0.1 * f64::from(i % 4)));
        }
        let witness = witness();
        let consumer = Consumer::new(
            Arc::new(queue.clone()),
            Arc::new(HandlerRegistry::new(witness.clone())),
            config(policy, 4).with_max_jobs(20),
        )
        .unwrap();
        let report = run_to_ceiling(consumer).await;

        let mut seen = witness.seen();
        seen.sort_unstable();
        assert_eq!(seen, (1..=20).collect::<Vec<_>>(), "{policy}");
        assert_eq!(report.processed, 20);
        assert!(queue.is_empty(KEY));
    }
}

#[tokio::test(start_paused = true)]
async fn untyped_payload_goes_to_fallback() {
    let queue = MemoryQueue::new();
    queue.push_now(KEY, r#"{"data":{"note":"no type"}}"#);
    let fallback = witness();

    let consumer = Consumer::new(
        Arc::new(queue),
        Arc::new(HandlerRegistry::new(fallback.clone()).with("email", Arc::new(Witness::default()))),
        config(AdmissionPolicy::EagerCap, 1).with_max_jobs(1),
    )
    .unwrap();
    let ledger = consumer.ledger();
    run_to_ceiling(consumer).await;

    assert_eq!(fallback.seen(), [1]);
    assert!(ledger.get(1).unwrap().kind.is_unknown());
}

#[tokio::test(start_paused = true)]
async fn lifecycle_events_bracket_the_run() {
    let queue = MemoryQueue::new();
    queue.push_now(KEY, payload("email", 0.1));
    let recorder = Arc::new(Recorder::default());

    let consumer = Consumer::new(
        Arc::new(queue),
        Arc::new(HandlerRegistry::new(witness())),
        config(AdmissionPolicy::WorkerPool, 2).with_max_jobs(1),
    )
    .unwrap()
    .with_subscriber(recorder.clone());
    run_to_ceiling(consumer).await;

    let kinds = recorder.kinds();
    assert_eq!(kinds.first(), Some(&EventKind::ConsumerStarted));
    assert_eq!(kinds.last(), Some(&EventKind::ConsumerStopped));

    let pos = |kind| kinds.iter().position(|k| *k == kind).unwrap();
    assert!(pos(EventKind::JobAdmitted) < pos(EventKind::DrainStarted));
    assert!(pos(EventKind::JobSucceeded) < pos(EventKind::DrainCompleted));
    assert!(pos(EventKind::DrainStarted) < pos(EventKind::DrainCompleted));

    let done = recorder
        .events()
        .into_iter()
        .find(|e| e.kind == EventKind::JobSucceeded)
        .unwrap();
    assert_eq!(done.sequence_id, Some(1));
    let elapsed = done.elapsed.unwrap();
    assert!(elapsed >= Duration::from_millis(100) && elapsed < Duration::from_millis(200));
}

#[test]
fn invalid_config_is_refused() {
    let err = Consumer::new(
        Arc::new(MemoryQueue::new()),
        Arc::new(HandlerRegistry::default()),
        RunConfig::default().with_max_concurrency(0),
    )
    .err()
    .unwrap();

    assert!(matches!(
        err,
        ConsumerError::Config(ConfigError::ZeroConcurrency)
    ));
}
