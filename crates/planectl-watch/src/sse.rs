//! SSE frame decoding
//!
//! Turns a raw byte stream into discrete event payload strings. Framing
//! rules: blank lines are frame boundaries and produce nothing, lines
//! starting with `:` are comments/heartbeats and are dropped, `data:`
//! lines contribute their remainder (minus one optional leading space) as
//! one payload each, and any other line shape is dropped.

use bytes::Bytes;
use futures::{Stream, StreamExt, stream};

use crate::error::WatchError;

/// Decode a single already-split line into a payload, if it carries one.
pub fn decode_line(line: &str) -> Option<&str> {
    let line = line.strip_suffix('\r').unwrap_or(line);
    if line.is_empty() || line.starts_with(':') {
        return None;
    }
    let rest = line.strip_prefix("data:")?;
    Some(rest.strip_prefix(' ').unwrap_or(rest))
}

/// Incremental frame decoder.
///
/// Byte chunks arrive at arbitrary boundaries; the decoder buffers the
/// trailing partial line between pushes and only ever emits payloads for
/// complete lines.
#[derive(Debug, Default)]
pub struct FrameDecoder {
    buffer: String,
}

impl FrameDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one chunk; returns every payload completed by it, in order.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buffer.push_str(&String::from_utf8_lossy(chunk));

        let mut payloads = Vec::new();
        while let Some(newline) = self.buffer.find('\n') {
            let line: String = self.buffer.drain(..=newline).collect();
            if let Some(payload) = decode_line(line.trim_end_matches('\n')) {
                payloads.push(payload.to_string());
            }
        }
        payloads
    }
}

/// Adapt a fallible byte stream into a stream of event payloads.
///
/// The first transport error terminates the payload stream; dropping the
/// returned stream drops the underlying connection with it.
pub fn payloads<S, E>(byte_stream: S) -> impl Stream<Item = Result<String, WatchError>>
where
    S: Stream<Item = Result<Bytes, E>>,
    E: std::fmt::Display,
{
    let mut decoder = FrameDecoder::new();
    byte_stream
        .map(move |chunk| match chunk {
            Ok(bytes) => Ok(decoder.push(&bytes)),
            Err(e) => Err(WatchError::transport(e.to_string())),
        })
        .flat_map(|decoded| match decoded {
            Ok(batch) => stream::iter(batch.into_iter().map(Ok).collect::<Vec<_>>()),
            Err(e) => stream::iter(vec![Err(e)]),
        })
}
