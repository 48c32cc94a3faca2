use serde::{Deserialize, Serialize};
use std::time::Instant;

/// User-level events worth keeping for a session review.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum SessionEvent {
    PlacedStart { row: i32, col: i32 },
    PlacedGoal { row: i32, col: i32 },
    PlacedObstacle { row: i32, col: i32 },
    ErasedCell { row: i32, col: i32 },
    /// A click broke a placement rule and was refused.
    PlacementRejected { row: i32, col: i32 },
    MapCleared,
    SearchRunStarted,
    RoamingRunStarted { radius: i32 },
    RunRejected { reason: String },
    RunFinished { outcome: String },
    LayoutCopied,
    LayoutPasted,
    GifExported { path: String, frames: usize },
}

/// An event with milliseconds since session start.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LoggedEvent {
    pub timestamp_ms: u64,
    pub event: SessionEvent,
}

/// In-memory session log, saved as JSON on demand.
pub struct SessionLog {
    start_time: Instant,
    events: Vec<LoggedEvent>,
}

impl SessionLog {
    pub fn new() -> Self {
        SessionLog {
            start_time: Instant::now(),
            events: Vec::new(),
        }
    }

    pub fn log(&mut self, event: SessionEvent) {
        let timestamp_ms = self.start_time.elapsed().as_millis() as u64;
        self.events.push(LoggedEvent {
            timestamp_ms,
            event,
        });
    }

    pub fn events(&self) -> &[LoggedEvent] {
        &self.events
    }

    /// Save the log to a JSON file.
    pub fn save_to_file(&self, path: &str) -> Result<(), Box<dyn std::error::Error>> {
        let json = serde_json::to_string_pretty(&self.events)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Human-readable per-session statistics.
    pub fn summary(&self) -> String {
        let mut placements = 0;
        let mut rejections = 0;
        let mut runs = 0;
        let mut exports = 0;

        for logged in &self.events {
            match &logged.event {
                SessionEvent::PlacedStart { .. }
                | SessionEvent::PlacedGoal { .. }
                | SessionEvent::PlacedObstacle { .. } => placements += 1,
                SessionEvent::PlacementRejected { .. } | SessionEvent::RunRejected { .. } => {
                    rejections += 1
                }
                SessionEvent::SearchRunStarted | SessionEvent::RoamingRunStarted { .. } => {
                    runs += 1
                }
                SessionEvent::GifExported { .. } => exports += 1,
                _ => {}
            }
        }

        let duration = self.events.last().map(|e| e.timestamp_ms).unwrap_or(0);
        format!(
            "Session duration: {}ms\n\
             Total events: {}\n\
             Placements: {} ({} rejected requests)\n\
             Runs started: {}\n\
             GIF exports: {}",
            duration,
            self.events.len(),
            placements,
            rejections,
            runs,
            exports
        )
    }
}

impl Default for SessionLog {
    fn default() -> Self {
        Self::new()
    }
}
