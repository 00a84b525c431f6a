//! The cancellable watch loop
//!
//! Drives payloads out of an SSE byte stream, hands decoded events to a
//! reconciler and writes whatever it renders. The loop is generic over
//! the byte stream, the output sink and the cancellation future so that
//! every path is testable without a network.

use std::future::Future;
use std::io::Write;

use bytes::Bytes;
use futures::{Stream, StreamExt};
use serde_json::Value;

use crate::error::WatchError;
use crate::reconcile::Reconciler;
use crate::sse;

/// Output shaping for one watch invocation.
#[derive(Debug, Clone, Default)]
pub struct WatchOptions {
    /// Emit each event as one compact JSON line instead of rendering.
    pub json: bool,
    /// Stop after this many emitted events. `None` streams until the
    /// server closes or the operator interrupts.
    pub max_events: Option<u64>,
}

/// Why a watch loop stopped without a transport error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchOutcome {
    /// The server closed the stream.
    StreamEnded,
    /// The cancellation future resolved (operator interrupt).
    Interrupted,
    /// The emitted-event budget was spent.
    BudgetReached,
}

/// Run one watch to completion.
///
/// An emission is one event that produced output; events the reconciler
/// swallows (heartbeats, duplicates, malformed identities) do not count
/// against the budget. Payloads that fail to parse as JSON are printed
/// verbatim in both output modes.
pub async fn run_watch<S, E, R, W, C>(
    byte_stream: S,
    reconciler: &mut R,
    out: &mut W,
    cancel: C,
    options: &WatchOptions,
) -> Result<WatchOutcome, WatchError>
where
    S: Stream<Item = Result<Bytes, E>>,
    E: std::fmt::Display,
    R: Reconciler,
    W: Write,
    C: Future<Output = ()>,
{
    let payloads = sse::payloads(byte_stream);
    tokio::pin!(payloads);
    tokio::pin!(cancel);

    let mut emitted: u64 = 0;
    loop {
        let payload = tokio::select! {
            _ = &mut cancel => return Ok(WatchOutcome::Interrupted),
            next = payloads.next() => match next {
                Some(payload) => payload?,
                None => return Ok(WatchOutcome::StreamEnded),
            },
        };

        let produced = match serde_json::from_str::<Value>(&payload) {
            Err(_) => {
                tracing::debug!(bytes = payload.len(), "payload is not JSON, echoing raw");
                writeln!(out, "{payload}")?;
                true
            }
            Ok(event) if options.json => {
                writeln!(out, "{event}")?;
                true
            }
            Ok(event) => {
                let lines = reconciler.apply(&event);
                for line in &lines {
                    writeln!(out, "{line}")?;
                }
                !lines.is_empty()
            }
        };

        if produced {
            emitted += 1;
            if options.max_events.is_some_and(|budget| emitted >= budget) {
                return Ok(WatchOutcome::BudgetReached);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream;
    use std::convert::Infallible;

    struct Echo;

    impl Reconciler for Echo {
        fn apply(&mut self, event: &Value) -> Vec<String> {
            match event.get("msg").and_then(Value::as_str) {
                Some(msg) => vec![msg.to_string()],
                None => Vec::new(),
            }
        }
    }

    fn chunks(body: &'static str) -> impl Stream<Item = Result<Bytes, Infallible>> {
        stream::iter(vec![Ok(Bytes::from_static(body.as_bytes()))])
    }

    #[tokio::test]
    async fn stream_end_flushes_rendered_lines() {
        let mut out = Vec::new();
        let outcome = run_watch(
            chunks("data: {\"msg\":\"a\"}\n\ndata: {\"msg\":\"b\"}\n\n"),
            &mut Echo,
            &mut out,
            std::future::pending::<()>(),
            &WatchOptions::default(),
        )
        .await
        .unwrap();
        assert_eq!(outcome, WatchOutcome::StreamEnded);
        assert_eq!(String::from_utf8(out).unwrap(), "a\nb\n");
    }

    #[tokio::test]
    async fn heartbeats_and_swallowed_events_produce_nothing() {
        let mut out = Vec::new();
        let outcome = run_watch(
            chunks(": ping\n\ndata: {\"other\":1}\n\n: ping\n\n"),
            &mut Echo,
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
    async fn json_mode_echoes_compact_payloads() {
        let mut out = Vec::new();
        run_watch(
            chunks("data: {\"msg\": \"a\", \"n\": 1}\n"),
            &mut Echo,
            &mut out,
            std::future::pending::<()>(),
            &WatchOptions {
                json: true,
                max_events: None,
            },
        )
        .await
        .unwrap();
        let line = String::from_utf8(out).unwrap();
        assert!(line.ends_with('\n'));
        let reparsed: Value = serde_json::from_str(line.trim_end()).unwrap();
        assert_eq!(reparsed["msg"], "a");
        assert!(!line.trim_end().contains('\n'));
    }

    #[tokio::test]
    async fn unparseable_payload_is_echoed_raw() {
        let mut out = Vec::new();
        run_watch(
            chunks("data: not json at all\n"),
            &mut Echo,
            &mut out,
            std::future::pending::<()>(),
            &WatchOptions::default(),
        )
        .await
        .unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "not json at all\n");
    }

    #[tokio::test]
    async fn budget_counts_only_events_with_output() {
        let mut out = Vec::new();
        let outcome = run_watch(
            chunks(
                "data: {\"other\":1}\n\ndata: {\"msg\":\"a\"}\n\n\
                 data: {\"msg\":\"b\"}\n\ndata: {\"msg\":\"never\"}\n\n",
            ),
            &mut Echo,
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
        assert_eq!(String::from_utf8(out).unwrap(), "a\nb\n");
    }

    #[tokio::test]
    async fn cancellation_wins_over_a_pending_stream() {
        let mut out = Vec::new();
        let outcome = run_watch(
            stream::pending::<Result<Bytes, Infallible>>(),
            &mut Echo,
            &mut out,
            std::future::ready(()),
            &WatchOptions::default(),
        )
        .await
        .unwrap();
        assert_eq!(outcome, WatchOutcome::Interrupted);
    }

    #[tokio::test]
    async fn transport_error_surfaces_after_decoded_payloads() {
        let chunks: Vec<Result<Bytes, String>> = vec![
            Ok(Bytes::from_static(b"data: {\"msg\":\"a\"}\n")),
            Err("connection reset".to_string()),
        ];
        let mut out = Vec::new();
        let err = run_watch(
            stream::iter(chunks),
            &mut Echo,
            &mut out,
            std::future::pending::<()>(),
            &WatchOptions::default(),
        )
        .await
        .unwrap_err();
        assert!(err.to_string().contains("connection reset"));
        assert_eq!(String::from_utf8(out).unwrap(), "a\n");
    }
}
