//! Persistence sinks: write-only consumers of successfully derived records.
//!
//! Sinks are best-effort. The serving layer calls them from a blocking task
//! after the response is already determined, logs any [`SinkError`], and
//! moves on.
//!
//! # JSONL session log
//!
//! One file per process run, `hashwatch-session-<UTC start>.jsonl`:
//! - line 1: a header object (`session_start`, `session_id`, device hosts,
//!   `refresh_interval` in seconds)
//! - every further line: `{"timestamp", "device", ...record fields}`

use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::config::MonitorConfig;
use crate::device::TelemetryRecord;
use crate::error::SinkError;

/// A write-only consumer of derived records.
pub trait TelemetrySink: Send + Sync {
    /// Short name for log lines.
    fn name(&self) -> &str;

    /// Persist one record. Must not panic on I/O failure.
    fn record(&self, record: &TelemetryRecord) -> Result<(), SinkError>;
}

/// First line of a session log.
#[derive(Debug, Clone, Serialize)]
pub struct SessionHeader {
    pub session_start: String,
    pub session_id: String,
    pub bitaxe_host: String,
    pub avalon_host: String,
    pub refresh_interval: u64,
}

/// Append-only line-delimited JSON log of every successful poll.
pub struct JsonlSessionLog {
    path: PathBuf,
    session_id: String,
    writer: Mutex<BufWriter<File>>,
}

impl JsonlSessionLog {
    /// Create `dir` if needed, open a new session file and write its header.
    pub fn create(dir: &Path, config: &MonitorConfig) -> Result<Self, SinkError> {
        fs::create_dir_all(dir)?;

        let started = Utc::now();
        let session_id = Uuid::new_v4().to_string();
        let path = dir.join(format!(
            "hashwatch-session-{}.jsonl",
            started.format("%Y%m%dT%H%M%SZ")
        ));

        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        let mut writer = BufWriter::new(file);

        let header = SessionHeader {
            session_start: started.to_rfc3339_opts(SecondsFormat::Millis, true),
            session_id: session_id.clone(),
            bitaxe_host: config.bitaxe_host.clone(),
            avalon_host: config.avalon_host.clone(),
            refresh_interval: config.refresh_interval.as_secs(),
        };
        serde_json::to_writer(&mut writer, &header)?;
        writer.write_all(b"\n")?;
        writer.flush()?;

        Ok(Self {
            path,
            session_id,
            writer: Mutex::new(writer),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }
}

impl TelemetrySink for JsonlSessionLog {
    fn name(&self) -> &str {
        "jsonl-session-log"
    }

    fn record(&self, record: &TelemetryRecord) -> Result<(), SinkError> {
        let mut line = Map::new();
        line.insert(
            "timestamp".into(),
            Value::String(Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)),
        );
        line.insert("device".into(), Value::String(record.kind().to_string()));
        if let Value::Object(fields) = serde_json::to_value(record)? {
            line.extend(fields);
        }

        let mut writer = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        serde_json::to_writer(&mut *writer, &line)?;
        writer.write_all(b"\n")?;
        writer.flush()?;
        Ok(())
    }
}
