//! A bounded, append-only ring buffer of request log entries: the oldest
//! entry is dropped once the buffer reaches its configured capacity.

use std::collections::VecDeque;

use chrono::Utc;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    pub id: String,
    pub timestamp: String,
    pub method: String,
    pub url: String,
    pub status: u16,
    pub response_time_ms: u64,
    pub user_agent: Option<String>,
    pub ip: Option<String>,
}

impl LogEntry {
    pub fn new(method: impl Into<String>, url: impl Into<String>, status: u16, response_time_ms: u64) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            timestamp: Utc::now().to_rfc3339(),
            method: method.into(),
            url: url.into(),
            status,
            response_time_ms,
            user_agent: None,
            ip: None,
        }
    }

    pub fn with_user_agent(mut self, ua: Option<String>) -> Self {
        self.user_agent = ua;
        self
    }

    pub fn with_ip(mut self, ip: Option<String>) -> Self {
        self.ip = ip;
        self
    }
}

#[derive(Debug, Clone, Default)]
pub struct LogFilter {
    pub method: Option<String>,
    pub status: Option<u16>,
    /// e.g. `4` matches every `4xx` status.
    pub status_class: Option<u16>,
    pub url_contains: Option<String>,
}

impl LogFilter {
    fn matches(&self, entry: &LogEntry) -> bool {
        if let Some(method) = &self.method {
            if !entry.method.eq_ignore_ascii_case(method) {
                return false;
            }
        }
        if let Some(status) = self.status {
            if entry.status != status {
                return false;
            }
        }
        if let Some(class) = self.status_class {
            if entry.status / 100 != class {
                return false;
            }
        }
        if let Some(needle) = &self.url_contains {
            if !entry.url.contains(needle.as_str()) {
                return false;
            }
        }
        true
    }
}

pub struct LogStore {
    entries: RwLock<VecDeque<LogEntry>>,
    max_entries: usize,
}

impl LogStore {
    pub fn new(max_entries: usize) -> Self {
        Self {
            entries: RwLock::new(VecDeque::with_capacity(max_entries.min(1024))),
            max_entries: max_entries.max(1),
        }
    }

    pub fn record(&self, entry: LogEntry) {
        let mut guard = self.entries.write();
        if guard.len() >= self.max_entries {
            guard.pop_front();
        }
        guard.push_back(entry);
    }

    pub fn list(&self, filter: &LogFilter) -> Vec<LogEntry> {
        self.entries
            .read()
            .iter()
            .filter(|e| filter.matches(e))
            .cloned()
            .collect()
    }

    pub fn clear(&self) {
        self.entries.write().clear();
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
