//! Bulk processing tests

mod helpers;

use dig_engine::{
    BulkItem, Findings, Orchestrator, OrchestratorConfig, Record, SessionOutcome, WritePolicy,
};
use futures::StreamExt;
use helpers::{person_builder, register, register_catch_all, ConcurrencyGauge, ScriptedEnricher};
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

fn records(n: usize) -> Vec<Record> {
    (0..n)
        .map(|i| Record::new().with("email", format!("user{}@acme.com", i)))
        .collect()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_every_input_reported_once() {
    let mut builder = person_builder();
    register(
        &mut builder,
        "email",
        WritePolicy::update(["worksFor"]),
        ScriptedEnricher::returning("employer", Findings::new().with("worksFor", "Acme")),
    );
    let orchestrator = Orchestrator::new(Arc::new(builder.build()));

    let items: Vec<BulkItem> = orchestrator.process_many(records(25)).collect().await;

    assert_eq!(items.len(), 25);
    let indices: BTreeSet<usize> = items.iter().map(|item| item.index).collect();
    assert_eq!(indices, (0..25).collect());
    assert!(items
        .iter()
        .all(|item| matches!(item.outcome, Ok(SessionOutcome::Enriched(_)))));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrency_is_bounded() {
    let gauge = ConcurrencyGauge::new(Duration::from_millis(20));
    let mut builder = person_builder();
    register_catch_all(&mut builder, "email", gauge.clone());

    let config = OrchestratorConfig {
        max_concurrent_sessions: 3,
        ..OrchestratorConfig::default()
    };
    let orchestrator = Orchestrator::with_config(Arc::new(builder.build()), config);

    let items: Vec<BulkItem> = orchestrator.process_many(records(12)).collect().await;

    assert_eq!(items.len(), 12);
    assert!(gauge.peak() >= 1);
    assert!(gauge.peak() <= 3, "peak concurrency {}", gauge.peak());
}

#[tokio::test]
async fn test_empty_input_yields_nothing() {
    let orchestrator = Orchestrator::new(Arc::new(person_builder().build()));
    let items: Vec<BulkItem> = orchestrator.process_many(Vec::new()).collect().await;
    assert!(items.is_empty());
}

#[tokio::test]
async fn test_cancel_stops_every_session() {
    let mut builder = person_builder();
    register_catch_all(
        &mut builder,
        "email",
        ScriptedEnricher::slow(
            "slow",
            Duration::from_secs(30),
            Findings::new().with("jobTitle", "Never"),
        ),
    );
    let orchestrator = Orchestrator::new(Arc::new(builder.build()));

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        trigger.cancel();
    });

    let items: Vec<BulkItem> = orchestrator
        .process_many_with_cancel(records(5), cancel)
        .collect()
        .await;

    assert_eq!(items.len(), 5);
    for item in items {
        match item.outcome {
            Ok(SessionOutcome::Cancelled { modified, record }) => {
                assert!(!modified);
                assert!(!record.contains("jobTitle"));
            }
            other => panic!("expected cancellation, got {:?}", other),
        }
    }
}
