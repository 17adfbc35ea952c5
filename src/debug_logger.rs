// Debug logging module for per-decision records
//
// Each decision is appended to a JSONL file together with the deciding agent's
// most likely opponent positions. Writes happen on the caller's thread.

use log::error;
use parking_lot::Mutex;
use serde::Serialize;
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::sync::Arc;

use crate::types::{AgentId, Coord, Direction};

/// Most likely position of one tracked agent
#[derive(Debug, Clone, Serialize)]
pub struct BeliefEntry {
    pub agent: AgentId,
    pub position: Coord,
}

/// Represents a single debug log entry
#[derive(Debug, Serialize)]
struct DebugLogEntry<'a> {
    turn: u32,
    agent: AgentId,
    strategy: &'a str,
    chosen_move: &'a str,
    beliefs: &'a [BeliefEntry],
    timestamp: String,
}

/// Shared debug logger state
#[derive(Clone)]
pub struct DebugLogger {
    file: Arc<Mutex<Option<BufWriter<File>>>>,
    enabled: bool,
}

impl DebugLogger {
    /// Creates a new debug logger
    /// If enabled is true, initializes the log file (truncating if it exists)
    pub fn new(enabled: bool, log_file_path: &str) -> Self {
        if !enabled {
            return Self::disabled();
        }

        match OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(log_file_path)
        {
            Ok(file) => {
                log::info!("Debug logging enabled: {}", log_file_path);
                DebugLogger {
                    file: Arc::new(Mutex::new(Some(BufWriter::new(file)))),
                    enabled: true,
                }
            }
            Err(e) => {
                error!("Failed to create debug log file '{}': {}", log_file_path, e);
                Self::disabled()
            }
        }
    }

    /// Creates a disabled debug logger (no-op)
    pub fn disabled() -> Self {
        DebugLogger {
            file: Arc::new(Mutex::new(None)),
            enabled: false,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Appends one decision record
    pub fn log_move(
        &self,
        turn: u32,
        agent: AgentId,
        strategy: &str,
        chosen_move: Direction,
        beliefs: &[BeliefEntry],
    ) {
        if !self.enabled {
            return;
        }

        let mut file_guard = self.file.lock();
        let Some(file) = file_guard.as_mut() else {
            return;
        };

        let entry = DebugLogEntry {
            turn,
            agent,
            strategy,
            chosen_move: chosen_move.as_str(),
            beliefs,
            timestamp: chrono::Utc::now().to_rfc3339(),
        };

        match serde_json::to_string(&entry) {
            Ok(json_line) => {
                if let Err(e) = writeln!(file, "{}", json_line) {
                    error!("Failed to write debug log entry: {}", e);
                } else if let Err(e) = file.flush() {
                    error!("Failed to flush debug log: {}", e);
                }
            }
            Err(e) => {
                error!("Failed to serialize debug log entry: {}", e);
            }
        }
    }
}
