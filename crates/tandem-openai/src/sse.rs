// SPDX-FileCopyrightText: 2026 Tandem Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SSE stream parser for streamed chat completions.
//!
//! Converts a byte stream into [`SseFrame`]s using the `eventsource-stream`
//! crate for SSE protocol compliance, and folds frames into the full-so-far
//! reply text.

use std::pin::Pin;

use bytes::Bytes;
use eventsource_stream::Eventsource;
use futures::stream::{Stream, StreamExt};
use tracing::{debug, warn};

use tandem_core::TandemError;
use tandem_core::traits::PartialSink;

use crate::types::ChatCompletionChunk;

/// Payload that terminates the stream.
const DONE_SENTINEL: &str = "[DONE]";

/// One decoded `data:` frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SseFrame {
    /// Incremental reply text (possibly empty).
    Delta(String),
    /// The `[DONE]` sentinel.
    Done,
}

/// Boxed stream of decoded frames.
pub type FrameStream = Pin<Box<dyn Stream<Item = Result<SseFrame, TandemError>> + Send>>;

/// Parses an SSE byte stream into [`SseFrame`]s.
///
/// A payload that is not a valid completion chunk yields
/// [`TandemError::StreamParse`] for that frame only. A transport error yields
/// [`TandemError::Backend`].
pub fn parse_sse_stream<S, E>(bytes: S) -> FrameStream
where
    S: Stream<Item = Result<Bytes, E>> + Send + 'static,
    E: std::error::Error + Send + Sync + 'static,
{
    let frames = bytes.eventsource().map(|result| match result {
        Ok(event) => {
            let data = event.data.trim();
            if data == DONE_SENTINEL {
                return Ok(SseFrame::Done);
            }
            serde_json::from_str::<ChatCompletionChunk>(data)
                .map(|chunk| SseFrame::Delta(chunk.delta_text().to_string()))
                .map_err(|e| TandemError::StreamParse(format!("malformed SSE frame: {e}")))
        }
        Err(e) => Err(TandemError::backend(format!("SSE stream error: {e}"))),
    });

    Box::pin(frames)
}

/// Drains `frames`, passing the accumulated text to `on_partial` after every
/// frame, and returns the final text.
///
/// Stops at `[DONE]` or end of stream. A malformed frame counts as an empty
/// delta; any other error aborts.
pub async fn accumulate(
    mut frames: FrameStream,
    on_partial: PartialSink<'_>,
) -> Result<String, TandemError> {
    let mut buffer = String::new();
    let mut count = 0usize;

    while let Some(frame) = frames.next().await {
        match frame {
            Ok(SseFrame::Done) => break,
            Ok(SseFrame::Delta(delta)) => buffer.push_str(&delta),
            Err(TandemError::StreamParse(detail)) => {
                warn!(%detail, "skipping malformed stream frame");
            }
            Err(e) => return Err(e),
        }
        count += 1;
        on_partial(&buffer);
    }

    debug!(frames = count, len = buffer.len(), "remote stream finished");
    Ok(buffer)
}
