//! End-to-end watch pipeline scenarios: raw SSE bytes in, rendered
//! operator lines out, via the real frame decoder and reconcilers.

use std::convert::Infallible;

use bytes::Bytes;
use futures::stream;
use planectl_watch::reconcile::{MarketplaceReconciler, PolicyReconciler, TrustReconciler};
use planectl_watch::watch::{WatchOptions, WatchOutcome, run_watch};

fn sse_body(payloads: &[&str]) -> Vec<Result<Bytes, Infallible>> {
    let mut body = String::new();
    for payload in payloads {
        body.push_str(": keep-alive\n\n");
        body.push_str("data: ");
        body.push_str(payload);
        body.push_str("\n\n");
    }
    vec![Ok(Bytes::from(body))]
}

#[tokio::test]
async fn policy_watch_reports_attestation_transition() {
    let first = r#"{"server_id": 9, "type": "decision", "timestamp": "t1", "attestation_status": "trusted", "backend": "vllm"}"#;
    let second = r#"{"server_id": 9, "type": "attestation", "timestamp": "t2", "attestation_status": "untrusted", "instance_id": "vm-alpha"}"#;
    let chunks = sse_body(&[first, second]);
    let mut reconciler = PolicyReconciler::new(false);
    let mut out = Vec::new();
    let outcome = run_watch(
        stream::iter(chunks),
        &mut reconciler,
        &mut out,
        std::future::pending::<()>(),
        &WatchOptions::default(),
    )
    .await
    .unwrap();
    assert_eq!(outcome, WatchOutcome::StreamEnded);

    let text = String::from_utf8(out).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 2);
    assert!(lines[0].contains("[t1] server 9 DECISION"));
    assert!(lines[0].contains("attestation trusted"));
    assert!(lines[1].contains("attestation trusted -> untrusted"));
    assert!(lines[1].contains("Active instance: vm-alpha"));
}

#[tokio::test]
async fn heartbeat_only_stream_renders_nothing() {
    let chunks: Vec<Result<Bytes, Infallible>> =
        vec![Ok(Bytes::from_static(b": ping\n\n: ping\n\n: ping\n\n"))];
    let mut reconciler = TrustReconciler::new();
    let mut out = Vec::new();
    let outcome = run_watch(
        stream::iter(chunks),
        &mut reconciler,
        &mut out,
        std::future::pending::<()>(),
        &WatchOptions::default(),
    )
    .await
    .unwrap();
    assert_eq!(outcome, WatchOutcome::StreamEnded);
    assert!(out.is_empty());
}

#[tokio::test]
async fn marketplace_budget_stops_the_stream_early() {
    let chunks = sse_body(&[
        r#"{"event_type": "submission.received", "occurred_at": "t1"}"#,
        r#"{"event_type": "evaluation.updated", "occurred_at": "t2"}"#,
        r#"{"event_type": "promotion.advanced", "occurred_at": "t3"}"#,
    ]);
    let mut reconciler = MarketplaceReconciler::new(false);
    let mut out = Vec::new();
    let outcome = run_watch(
        stream::iter(chunks),
        &mut reconciler,
        &mut out,
        std::future::pending::<()>(),
        &WatchOptions {
            json: false,
            max_events: Some(2),
        },
    )
    .await
    .unwrap();
    assert_eq!(outcome, WatchOutcome::BudgetReached);

    let text = String::from_utf8(out).unwrap();
    assert!(text.contains("submission.received"));
    assert!(text.contains("evaluation.updated"));
    assert!(!text.contains("promotion.advanced"));
}

#[tokio::test]
async fn json_mode_bypasses_reconciliation() {
    let chunks = sse_body(&[r#"{"server_id": 9, "type": "heartbeat"}"#]);
    let mut reconciler = PolicyReconciler::new(false);
    let mut out = Vec::new();
    run_watch(
        stream::iter(chunks),
        &mut reconciler,
        &mut out,
        std::future::pending::<()>(),
        &WatchOptions {
            json: true,
            max_events: None,
        },
    )
    .await
    .unwrap();

    // A heartbeat the reconciler would swallow still flows through raw.
    let text = String::from_utf8(out).unwrap();
    assert_eq!(text.lines().count(), 1);
    assert!(text.contains("\"server_id\""));
}

#[tokio::test]
async fn interrupt_during_a_quiet_stream_exits_cleanly() {
    let mut reconciler = TrustReconciler::new();
    let mut out = Vec::new();
    let outcome = run_watch(
        stream::pending::<Result<Bytes, Infallible>>(),
        &mut reconciler,
        &mut out,
        std::future::ready(()),
        &WatchOptions::default(),
    )
    .await
    .unwrap();
    assert_eq!(outcome, WatchOutcome::Interrupted);
    assert!(out.is_empty());
}
