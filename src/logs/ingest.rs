//! Runtime log ingestion.
//!
//! The runtime is handed a [`LogSink`] instead of having its logger patched.
//! [`LogIngestor::attach`] remembers only the instance it last connected,
//! so re-attaching the current runtime after a restart that reuses it is a
//! no-op rather than a second wrapper.

use regex::Regex;
use serde_json::{Map, Value};
use std::sync::{Arc, Mutex, OnceLock};
use uuid::Uuid;

use super::buffer::LogBuffer;
use crate::runtime::AgentRuntime;
use crate::types::{now_millis, LogEntry, LogLevel};

const DEFAULT_SOURCE: &str = "runtime";

pub trait LogSink: Send + Sync {
    fn log(&self, call: LogCall);
}

/// One raw log call from the runtime: a message, structured fields, or both.
#[derive(Debug, Clone, PartialEq)]
pub struct LogCall {
    pub level: LogLevel,
    pub message: Option<String>,
    pub fields: Option<Map<String, Value>>,
}

impl LogCall {
    pub fn text(level: LogLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            message: Some(message.into()),
            fields: None,
        }
    }

    pub fn structured(level: LogLevel, fields: Map<String, Value>, message: Option<String>) -> Self {
        Self {
            level,
            message,
            fields: Some(fields),
        }
    }
}

fn source_tag_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\[([^\]]+)\]\s*").expect("source tag regex is valid"))
}

/// The `tag` of a message starting with `[tag]`.
pub fn extract_source_tag(message: &str) -> Option<&str> {
    source_tag_regex()
        .captures(message)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
}

/// Reduce a raw call to `(level, message, source)`. Calls with nothing to
/// show are dropped.
pub fn normalize(call: LogCall) -> Option<(LogLevel, String, String)> {
    let explicit_source = call.fields.as_ref().and_then(|f| {
        ["src", "source"]
            .iter()
            .find_map(|k| f.get(*k).and_then(Value::as_str))
            .map(String::from)
    });

    let message = match (call.message, &call.fields) {
        (Some(m), _) if !m.is_empty() => m,
        (_, Some(fields)) if !fields.is_empty() => Value::Object(fields.clone()).to_string(),
        _ => return None,
    };

    let source = explicit_source
        .or_else(|| extract_source_tag(&message).map(String::from))
        .unwrap_or_else(|| DEFAULT_SOURCE.to_string());

    Some((call.level, message, source))
}

struct BufferSink {
    buffer: Arc<LogBuffer>,
}

impl LogSink for BufferSink {
    fn log(&self, call: LogCall) {
        if let Some((level, message, source)) = normalize(call) {
            self.buffer.push(LogEntry {
                timestamp: now_millis(),
                level,
                message,
                source,
            });
        }
    }
}

pub struct LogIngestor {
    buffer: Arc<LogBuffer>,
    sink: Arc<dyn LogSink>,
    attached: Mutex<Option<Uuid>>,
}

impl LogIngestor {
    pub fn new(buffer: Arc<LogBuffer>) -> Self {
        let sink: Arc<dyn LogSink> = Arc::new(BufferSink {
            buffer: buffer.clone(),
        });
        Self {
            buffer,
            sink,
            attached: Mutex::new(None),
        }
    }

    pub fn buffer(&self) -> &Arc<LogBuffer> {
        &self.buffer
    }

    pub fn sink(&self) -> Arc<dyn LogSink> {
        self.sink.clone()
    }

    /// Connect a runtime's logger to the buffer. Returns `false` when this
    /// runtime instance is already the connected one.
    pub fn attach(&self, runtime: &dyn AgentRuntime) -> bool {
        let id = runtime.instance_id();
        {
            let mut attached = self.attached.lock().unwrap_or_else(|e| e.into_inner());
            if *attached == Some(id) {
                tracing::debug!(runtime = %id, "Runtime logger already connected");
                return false;
            }
            *attached = Some(id);
        }

        runtime.attach_log_sink(self.sink());
        self.buffer.system(
            LogLevel::Info,
            "Runtime logger connected; logs will stream to the control plane",
        );
        true
    }
}
