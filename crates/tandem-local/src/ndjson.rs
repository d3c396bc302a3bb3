// SPDX-FileCopyrightText: 2026 Tandem Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Newline-delimited JSON decoding over a byte stream.

use bytes::Bytes;
use futures::{Stream, StreamExt, stream};
use serde::de::DeserializeOwned;

use tandem_core::TandemError;

struct LineState<S> {
    inner: S,
    buf: Vec<u8>,
    finished: bool,
}

/// Decode each non-blank line of `bytes` as a `T`.
///
/// A line that is not valid JSON yields [`TandemError::StreamParse`] and decoding
/// continues; a transport error yields [`TandemError::Backend`] and ends the stream.
/// A trailing line without a newline is decoded when the input ends.
pub(crate) fn decode<T, S, E>(bytes: S) -> impl Stream<Item = Result<T, TandemError>> + Send
where
    T: DeserializeOwned + Send + 'static,
    S: Stream<Item = Result<Bytes, E>> + Send + Unpin + 'static,
    E: std::error::Error + Send + Sync + 'static,
{
    let state = LineState {
        inner: bytes,
        buf: Vec::new(),
        finished: false,
    };

    stream::unfold(state, |mut st| async move {
        loop {
            if let Some(pos) = st.buf.iter().position(|&b| b == b'\n') {
                let line: Vec<u8> = st.buf.drain(..=pos).collect();
                if let Some(item) = parse_line(&line) {
                    return Some((item, st));
                }
                continue;
            }

            if st.finished {
                let rest = std::mem::take(&mut st.buf);
                return parse_line(&rest).map(|item| (item, st));
            }

            match st.inner.next().await {
                Some(Ok(chunk)) => st.buf.extend_from_slice(&chunk),
                Some(Err(e)) => {
                    st.finished = true;
                    st.buf.clear();
                    let err = TandemError::Backend {
                        message: format!("local engine stream failed: {e}"),
                        source: Some(Box::new(e)),
                    };
                    return Some((Err(err), st));
                }
                None => st.finished = true,
            }
        }
    })
}

fn parse_line<T: DeserializeOwned>(line: &[u8]) -> Option<Result<T, TandemError>> {
    let line = line.trim_ascii();
    if line.is_empty() {
        return None;
    }
    Some(
        serde_json::from_slice(line)
            .map_err(|e| TandemError::StreamParse(format!("invalid NDJSON line: {e}"))),
    )
}
