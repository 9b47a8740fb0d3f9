use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, VecDeque};
use std::sync::Mutex;

use super::ingest::extract_source_tag;
use crate::types::{now_millis, LogEntry, LogLevel};

pub const LOG_BUFFER_CAPACITY: usize = 1000;
pub const LOG_QUERY_LIMIT: usize = 200;

/// Fixed-capacity log ring; the oldest entry is dropped once full.
pub struct LogBuffer {
    entries: Mutex<VecDeque<LogEntry>>,
    capacity: usize,
}

/// Query-string filters for `GET /api/logs`. Empty or unparsable values
/// are ignored.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LogQuery {
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub level: Option<String>,
    #[serde(default)]
    pub since: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct LogQueryResult {
    pub entries: Vec<LogEntry>,
    pub sources: Vec<String>,
}

impl LogBuffer {
    pub fn new() -> Self {
        Self::with_capacity(LOG_BUFFER_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity,
        }
    }

    pub fn push(&self, entry: LogEntry) {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.push_back(entry);
        while entries.len() > self.capacity {
            entries.pop_front();
        }
    }

    /// Record a control-plane message. A leading `[tag]` in the message
    /// replaces the `system` source.
    pub fn system(&self, level: LogLevel, message: impl Into<String>) {
        let message = message.into();
        let source = extract_source_tag(&message).unwrap_or("system").to_string();
        self.push(LogEntry {
            timestamp: now_millis(),
            level,
            message,
            source,
        });
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn snapshot(&self) -> Vec<LogEntry> {
        let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.iter().cloned().collect()
    }

    pub fn query(&self, query: &LogQuery) -> LogQueryResult {
        let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());

        let source = query.source.as_deref().filter(|s| !s.is_empty());
        let level = query.level.as_deref().filter(|s| !s.is_empty());
        let since = query
            .since
            .as_deref()
            .and_then(|s| s.trim().parse::<f64>().ok())
            .filter(|s| s.is_finite());

        let matching: Vec<&LogEntry> = entries
            .iter()
            .filter(|e| source.map_or(true, |s| e.source == s))
            .filter(|e| level.map_or(true, |l| e.level.as_str() == l))
            .filter(|e| since.map_or(true, |ts| e.timestamp as f64 >= ts))
            .collect();

        let skip = matching.len().saturating_sub(LOG_QUERY_LIMIT);
        let sources: BTreeSet<&str> = entries.iter().map(|e| e.source.as_str()).collect();

        LogQueryResult {
            entries: matching.into_iter().skip(skip).cloned().collect(),
            sources: sources.into_iter().map(String::from).collect(),
        }
    }
}

impl Default for LogBuffer {
    fn default() -> Self {
        Self::new()
    }
}
