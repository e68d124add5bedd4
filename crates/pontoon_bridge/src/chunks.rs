//! Size-bounded chunking of streamed results.
//!
//! An embedded host moves data across a message channel with a per-message
//! size limit. [`chunk_stream`] wraps a stream of nodes into chunk envelopes:
//!
//! ```json
//! {"type": "chunk", "data": ..., "index": 0, "timestamp": "2026-01-01T00:00:00.000"}
//! ```
//!
//! An item whose JSON exceeds the budget is split in two if it is an array,
//! or otherwise sent whole with `"warning": "Large chunk"`. Arrays are split
//! once; a half still over budget carries the same warning. The stream ends
//! with a `{"type": "end", "data": null, ...}` envelope.

use chrono::Utc;
use futures::stream::{self, Stream, StreamExt};
use pontoon_object::{Node, serialize};
use serde_json::{Map, Value};
use std::collections::VecDeque;
use std::pin::Pin;

/// Warning attached to an oversized chunk that cannot be split.
pub const LARGE_CHUNK_WARNING: &str = "Large chunk";

struct ChunkState<S> {
    items: Pin<Box<S>>,
    pending: VecDeque<Value>,
    index: usize,
    max_bytes: usize,
    finished: bool,
}

impl<S> ChunkState<S> {
    fn push(&mut self, kind: &str, data: Value, warning: Option<&str>) {
        let mut envelope = Map::new();
        envelope.insert("type".to_string(), Value::from(kind));
        envelope.insert("data".to_string(), data);
        envelope.insert("index".to_string(), Value::from(self.index));
        envelope.insert("timestamp".to_string(), Value::from(timestamp()));
        if let Some(warning) = warning {
            envelope.insert("warning".to_string(), Value::from(warning));
        }
        self.pending.push_back(Value::Object(envelope));
        self.index += 1;
    }

    fn split(&mut self, item: &Node) {
        let data = serialize(item);
        let size = json_len(&data);

        if size <= self.max_bytes {
            self.push("chunk", data, None);
            return;
        }

        match data {
            Value::Array(mut items) => {
                let tail = items.split_off(items.len() / 2);
                tracing::debug!(size, max_bytes = self.max_bytes, "splitting oversized chunk");
                for half in [Value::Array(items), Value::Array(tail)] {
                    let warning =
                        (json_len(&half) > self.max_bytes).then_some(LARGE_CHUNK_WARNING);
                    self.push("chunk", half, warning);
                }
            }
            data => {
                tracing::warn!(size, max_bytes = self.max_bytes, "large chunk cannot be split");
                self.push("chunk", data, Some(LARGE_CHUNK_WARNING));
            }
        }
    }
}

fn json_len(value: &Value) -> usize {
    serde_json::to_string(value).map_or(0, |text| text.len())
}

fn timestamp() -> String {
    Utc::now()
        .naive_utc()
        .format("%Y-%m-%dT%H:%M:%S%.f")
        .to_string()
}

/// Wraps `items` into chunk envelopes of at most `max_bytes` each, where
/// possible, followed by an end marker.
pub fn chunk_stream<S>(items: S, max_bytes: usize) -> impl Stream<Item = Value> + Send
where
    S: Stream<Item = Node> + Send + 'static,
{
    let state = ChunkState {
        items: Box::pin(items),
        pending: VecDeque::new(),
        index: 0,
        max_bytes,
        finished: false,
    };

    stream::unfold(state, |mut state| async move {
        loop {
            if let Some(envelope) = state.pending.pop_front() {
                return Some((envelope, state));
            }
            if state.finished {
                return None;
            }
            match state.items.next().await {
                Some(item) => state.split(&item),
                None => {
                    state.finished = true;
                    state.push("end", Value::Null, None);
                }
            }
        }
    })
}
