use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;

use parking_lot::Mutex;
use serde::Serialize;
use tracing::warn;

/// One access-log record.
#[derive(Debug, Serialize)]
pub struct AccessLogEntry<'a> {
    pub ts: String,
    pub ip: &'a str,
    pub method: &'a str,
    pub path: &'a str,
    pub status: u16,
    pub us: u64,
    /// Whether an action plan survived evaluation.
    pub applied: bool,
}

/// Per-request access logger that writes one JSON line per request.
/// Uses `File` directly so every write is visible immediately.
pub struct AccessLogger {
    writer: Mutex<File>,
}

impl AccessLogger {
    /// Open (or create) the access log file in append mode.
    pub fn new(path: &str) -> std::io::Result<Self> {
        if let Some(parent) = Path::new(path).parent() {
            if let Err(e) = std::fs::create_dir_all(parent) {
                warn!("Failed to create access log directory {}: {}", parent.display(), e);
            }
        }

        let file = OpenOptions::new().create(true).append(true).open(path)?;

        Ok(Self {
            writer: Mutex::new(file),
        })
    }

    pub fn log(&self, ip: &str, method: &str, path: &str, status: u16, elapsed_us: u64, applied: bool) {
        let entry = AccessLogEntry {
            ts: chrono::Utc::now().format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string(),
            ip,
            method,
            path,
            status,
            us: elapsed_us,
            applied,
        };
        let line = match serde_json::to_string(&entry) {
            Ok(line) => line,
            Err(e) => {
                warn!("Failed to serialize access log entry: {}", e);
                return;
            }
        };

        let mut f = self.writer.lock();
        if let Err(e) = writeln!(f, "{}", line) {
            warn!("Failed to write access log entry: {}", e);
        }
    }
}
