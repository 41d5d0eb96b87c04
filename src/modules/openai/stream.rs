//! Server-sent event decoding for streamed runs.

use std::collections::VecDeque;
use std::fmt::Display;

use futures::stream::{self, BoxStream, Stream, StreamExt};
use serde_json::Value;
use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::core::error::{AppError, Result};

pub type RunEventStream = BoxStream<'static, Result<RunEvent>>;

/// One `event:`/`data:` block of an SSE body
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SseFrame {
    pub event: Option<String>,
    pub data: String,
}

impl SseFrame {
    fn parse(raw: &str) -> Option<Self> {
        let mut event = None;
        let mut data_lines = Vec::new();

        for line in raw.lines() {
            if let Some(name) = line.strip_prefix("event:") {
                event = Some(name.trim().to_string());
            } else if let Some(d) = line.strip_prefix("data:") {
                data_lines.push(d.strip_prefix(' ').unwrap_or(d));
            }
        }

        if event.is_none() && data_lines.is_empty() {
            return None;
        }

        Some(Self {
            event,
            data: data_lines.join("\n"),
        })
    }
}

/// Incremental splitter of an SSE byte stream into frames
#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: Vec<u8>,
}

impl SseDecoder {
    pub fn push(&mut self, chunk: &[u8]) -> Vec<SseFrame> {
        self.buffer.extend(chunk.iter().copied().filter(|b| *b != b'\r'));

        let mut frames = Vec::new();
        while let Some(pos) = self.buffer.windows(2).position(|w| w == b"\n\n") {
            let raw: Vec<u8> = self.buffer.drain(..pos + 2).collect();
            if let Some(frame) = SseFrame::parse(&String::from_utf8_lossy(&raw)) {
                frames.push(frame);
            }
        }
        frames
    }

    /// Flush a trailing frame that was not terminated by a blank line
    pub fn finish(&mut self) -> Option<SseFrame> {
        if self.buffer.is_empty() {
            return None;
        }
        let raw = std::mem::take(&mut self.buffer);
        SseFrame::parse(&String::from_utf8_lossy(&raw))
    }
}

/// What happened during a run, reduced to what the console shows
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunEvent {
    MessageCreated,
    TextDelta(String),
    ToolCallCreated(String),
    CodeInput(String),
    CodeOutputs(Vec<String>),
    Failed(String),
    Done,
    Other(String),
}

impl RunEvent {
    pub fn from_frame(frame: &SseFrame) -> Result<Vec<RunEvent>> {
        if frame.data.trim() == "[DONE]" {
            return Ok(vec![RunEvent::Done]);
        }

        let event = frame.event.as_deref().unwrap_or("message");
        let parse = || -> Result<Value> {
            serde_json::from_str(&frame.data).map_err(|e| {
                AppError::RemoteService(format!("Malformed '{}' event: {}", event, e))
            })
        };

        let events = match event {
            "done" => vec![RunEvent::Done],
            "thread.message.created" => vec![RunEvent::MessageCreated],
            "thread.message.delta" => text_deltas(&parse()?),
            "thread.run.step.delta" => tool_call_deltas(&parse()?),
            "thread.run.failed" => {
                let data = parse()?;
                let message = data
                    .pointer("/last_error/message")
                    .and_then(Value::as_str)
                    .unwrap_or("run failed");
                vec![RunEvent::Failed(message.to_string())]
            }
            "error" => {
                let message = serde_json::from_str::<Value>(&frame.data)
                    .ok()
                    .and_then(|v| {
                        v.pointer("/error/message")
                            .or_else(|| v.get("message"))
                            .and_then(Value::as_str)
                            .map(str::to_string)
                    })
                    .unwrap_or_else(|| frame.data.clone());
                vec![RunEvent::Failed(message)]
            }
            other => vec![RunEvent::Other(other.to_string())],
        };

        Ok(events)
    }

    /// Console rendering; `None` for events that print nothing
    pub fn render(&self) -> Option<String> {
        match self {
            RunEvent::MessageCreated => Some("\nassistant > ".to_string()),
            RunEvent::TextDelta(text) => Some(text.clone()),
            RunEvent::ToolCallCreated(kind) => Some(format!("\nassistant > {}\n\n", kind)),
            RunEvent::CodeInput(input) => Some(input.clone()),
            RunEvent::CodeOutputs(logs) => {
                let mut out = String::from("\noutput >\n");
                for log in logs {
                    out.push_str(&format!("\n{}\n", log));
                }
                Some(out)
            }
            RunEvent::Failed(_) | RunEvent::Done | RunEvent::Other(_) => None,
        }
    }
}

fn text_deltas(data: &Value) -> Vec<RunEvent> {
    let Some(content) = data.pointer("/delta/content").and_then(Value::as_array) else {
        return Vec::new();
    };

    content
        .iter()
        .filter(|part| part.get("type").and_then(Value::as_str) == Some("text"))
        .filter_map(|part| part.pointer("/text/value").and_then(Value::as_str))
        .filter(|value| !value.is_empty())
        .map(|value| RunEvent::TextDelta(value.to_string()))
        .collect()
}

fn tool_call_deltas(data: &Value) -> Vec<RunEvent> {
    let Some(tool_calls) = data
        .pointer("/delta/step_details/tool_calls")
        .and_then(Value::as_array)
    else {
        return Vec::new();
    };

    let mut events = Vec::new();
    for call in tool_calls {
        let kind = call.get("type").and_then(Value::as_str).unwrap_or("unknown");

        // The first delta of a tool call is the only one carrying its id.
        // It announces the call; input and outputs come from later deltas.
        if call.get("id").and_then(Value::as_str).is_some() {
            events.push(RunEvent::ToolCallCreated(kind.to_string()));
            continue;
        }

        if kind != "code_interpreter" {
            continue;
        }

        if let Some(input) = call
            .pointer("/code_interpreter/input")
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
        {
            events.push(RunEvent::CodeInput(input.to_string()));
        }

        if let Some(outputs) = call
            .pointer("/code_interpreter/outputs")
            .and_then(Value::as_array)
        {
            let logs = outputs
                .iter()
                .filter(|o| o.get("type").and_then(Value::as_str) == Some("logs"))
                .filter_map(|o| o.get("logs").and_then(Value::as_str))
                .map(str::to_string)
                .collect();
            events.push(RunEvent::CodeOutputs(logs));
        }
    }
    events
}

struct DecodeState<S> {
    body: std::pin::Pin<Box<S>>,
    decoder: SseDecoder,
    pending: VecDeque<Result<RunEvent>>,
    finished: bool,
}

impl<S> DecodeState<S> {
    fn enqueue(&mut self, frame: SseFrame) {
        match RunEvent::from_frame(&frame) {
            Ok(events) => self.pending.extend(events.into_iter().map(Ok)),
            Err(e) => self.pending.push_back(Err(e)),
        }
    }
}

/// Turn a raw SSE body into run events
pub fn decode_run_events<S, B, E>(body: S) -> RunEventStream
where
    S: Stream<Item = std::result::Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
    E: Display + Send + 'static,
{
    let state = DecodeState {
        body: Box::pin(body),
        decoder: SseDecoder::default(),
        pending: VecDeque::new(),
        finished: false,
    };

    stream::unfold(state, |mut state| async move {
        loop {
            if let Some(item) = state.pending.pop_front() {
                return Some((item, state));
            }
            if state.finished {
                return None;
            }

            match state.body.next().await {
                Some(Ok(chunk)) => {
                    for frame in state.decoder.push(chunk.as_ref()) {
                        state.enqueue(frame);
                    }
                }
                Some(Err(e)) => {
                    state.finished = true;
                    state.pending.push_back(Err(AppError::RemoteService(format!(
                        "Run stream interrupted: {}",
                        e
                    ))));
                }
                None => {
                    state.finished = true;
                    if let Some(frame) = state.decoder.finish() {
                        state.enqueue(frame);
                    }
                }
            }
        }
    })
    .boxed()
}

/// Counters reported once a run stream is drained
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub events: usize,
    pub failure: Option<String>,
}

/// Write every renderable event to `sink` until the stream ends
pub async fn pipe_run_events<W>(mut events: RunEventStream, mut sink: W) -> Result<RunSummary>
where
    W: AsyncWrite + Unpin,
{
    let mut summary = RunSummary::default();

    while let Some(event) = events.next().await {
        let event = event?;
        summary.events += 1;

        if let RunEvent::Failed(ref message) = event {
            summary.failure = Some(message.clone());
        }

        if let Some(text) = event.render() {
            sink.write_all(text.as_bytes()).await?;
            sink.flush().await?;
        }
    }

    Ok(summary)
}
