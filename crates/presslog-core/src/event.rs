//! Press event record.
//!
//! Each event is stored and broadcast as one compact JSON object:
//!
//! ```json
//! {"buttonPressTimestamp":"2025-03-01 14:02:11","buttonPressCount":7}
//! ```

use serde::{Deserialize, Serialize};

/// A single accepted button press.
///
/// Immutable once created. `count` is the press counter value assigned when
/// the event was produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PressEvent {
    #[serde(rename = "buttonPressTimestamp")]
    timestamp: String,

    #[serde(rename = "buttonPressCount")]
    count: u64,
}

impl PressEvent {
    pub fn new(timestamp: impl Into<String>, count: u64) -> Self {
        Self {
            timestamp: timestamp.into(),
            count,
        }
    }

    /// Local wall-clock time of the press, second resolution.
    pub fn timestamp(&self) -> &str {
        &self.timestamp
    }

    /// Press counter value for this event.
    pub fn count(&self) -> u64 {
        self.count
    }

    /// Encode as a single-line JSON record.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Decode one log line.
    pub fn from_json(line: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(line.trim())
    }
}
