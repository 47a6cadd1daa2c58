//! Incremental decoder for streamed chat completions.
//!
//! Providers stream a completion as newline-delimited text in which only
//! `data: {...}` lines carry content. The decoder reassembles lines from
//! arbitrary byte chunks, extracts `choices[0].delta.content` from each
//! event and stops at the `data: [DONE]` sentinel. Events that fail to
//! decode are skipped so a stray heartbeat cannot abort a reply.

use std::collections::VecDeque;

use futures_util::stream::{self, Stream, StreamExt};
use memchr::memchr;
use tracing::debug;

use crate::api::ChatStreamChunk;
use crate::core::error::ChatError;

const DATA_PREFIX: &str = "data: ";
const DONE_SENTINEL: &str = "[DONE]";

/// Result of decoding a single line of the stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineOutcome {
    Fragment(String),
    Skip,
    Done,
}

pub fn decode_line(line: &str) -> LineOutcome {
    let Some(payload) = line.trim().strip_prefix(DATA_PREFIX) else {
        return LineOutcome::Skip;
    };
    let payload = payload.trim();

    if payload == DONE_SENTINEL {
        return LineOutcome::Done;
    }

    match serde_json::from_str::<ChatStreamChunk>(payload) {
        Ok(chunk) => chunk
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.delta.content)
            .filter(|content| !content.is_empty())
            .map(LineOutcome::Fragment)
            .unwrap_or(LineOutcome::Skip),
        Err(err) => {
            debug!(error = %err, payload, "Skipping undecodable stream event");
            LineOutcome::Skip
        }
    }
}

fn decode_line_bytes(line: &[u8]) -> LineOutcome {
    match std::str::from_utf8(line) {
        Ok(text) => decode_line(text),
        Err(err) => {
            debug!(error = %err, "Skipping stream line with invalid UTF-8");
            LineOutcome::Skip
        }
    }
}

/// Line-buffering decoder fed with raw response bytes.
#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: Vec<u8>,
    done: bool,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// True once the `[DONE]` sentinel was seen or `finish` was called.
    pub fn is_done(&self) -> bool {
        self.done
    }

    /// Feed a chunk of bytes and collect the fragments of every line it completes.
    pub fn push(&mut self, bytes: &[u8]) -> Vec<String> {
        let mut fragments = Vec::new();
        if self.done {
            return fragments;
        }

        self.buffer.extend_from_slice(bytes);

        let mut start = 0;
        while let Some(offset) = memchr(b'\n', &self.buffer[start..]) {
            let end = start + offset;
            let outcome = decode_line_bytes(&self.buffer[start..end]);
            start = end + 1;

            match outcome {
                LineOutcome::Fragment(content) => fragments.push(content),
                LineOutcome::Skip => {}
                LineOutcome::Done => {
                    self.done = true;
                    self.buffer.clear();
                    return fragments;
                }
            }
        }

        self.buffer.drain(..start);
        fragments
    }

    /// Decode whatever is left in the buffer once the connection closed.
    pub fn finish(&mut self) -> Option<String> {
        if self.done {
            return None;
        }
        self.done = true;

        let rest = std::mem::take(&mut self.buffer);
        match decode_line_bytes(&rest) {
            LineOutcome::Fragment(content) => Some(content),
            LineOutcome::Skip | LineOutcome::Done => None,
        }
    }
}

struct FragmentState<S> {
    bytes: S,
    decoder: SseDecoder,
    ready: VecDeque<String>,
    finished: bool,
}

/// Turn a response byte stream into a lazy stream of content fragments.
///
/// The stream ends after `[DONE]`, when the byte stream ends, or right after
/// yielding the first read error.
pub fn fragment_stream<S>(bytes: S) -> impl Stream<Item = Result<String, ChatError>>
where
    S: Stream<Item = Result<Vec<u8>, ChatError>> + Unpin,
{
    let state = FragmentState {
        bytes,
        decoder: SseDecoder::new(),
        ready: VecDeque::new(),
        finished: false,
    };

    stream::unfold(state, |mut state| async move {
        loop {
            if let Some(fragment) = state.ready.pop_front() {
                return Some((Ok(fragment), state));
            }
            if state.finished {
                return None;
            }

            match state.bytes.next().await {
                Some(Ok(chunk)) => {
                    let fragments = state.decoder.push(&chunk);
                    state.ready.extend(fragments);
                    state.finished = state.decoder.is_done();
                }
                Some(Err(err)) => {
                    state.finished = true;
                    return Some((Err(err), state));
                }
                None => {
                    state.finished = true;
                    state.ready.extend(state.decoder.finish());
                }
            }
        }
    })
}
