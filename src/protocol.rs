//! The line protocol spoken between the reader process and the arbiter.
//!
//! The reader emits exactly one JSON object per line on stdout. Each
//! object is internally tagged with a `type` field, so consumers dispatch
//! on `type` before reading any other field:
//!
//! ```text
//! {"type":"ready","pointer_count":1,"keyboard_count":1,"screen_width":1920,"screen_height":1080}
//! {"type":"cursor","x":960,"y":540}
//! {"type":"shortcut","name":"toggle_chat"}
//! {"type":"click","button":"left","x":965,"y":542}
//! {"type":"heartbeat"}
//! {"type":"error","message":"device lost: /dev/input/event3"}
//! ```
//!
//! Ordering is significant only within the stream itself; no timestamps
//! are carried because the transport is an ordered pipe.

use serde::{Deserialize, Serialize};

/// Mouse button identifiers carried on `click` events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Button {
    /// Left mouse button.
    Left,
    /// Right mouse button.
    Right,
    /// Middle mouse button.
    Middle,
}

/// One event on the reader→arbiter stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WireEvent {
    /// Startup report: how many devices of each class were opened and the
    /// screen bounds the cursor is clamped to. Zero in either count means
    /// the corresponding capability is degraded, not that startup failed.
    Ready {
        pointer_count: usize,
        keyboard_count: usize,
        screen_width: i32,
        screen_height: i32,
    },

    /// Absolute cursor position, already clamped to screen bounds.
    Cursor { x: i32, y: i32 },

    /// A configured chord fired.
    Shortcut { name: String },

    /// A button press at the current cursor position. Releases are not
    /// reported; only click intent matters downstream.
    Click { button: Button, x: i32, y: i32 },

    /// Emitted when the poll wait times out with no traffic, so the
    /// consumer can tell a hung reader from genuine input idleness.
    Heartbeat,

    /// Informational for recoverable degradation, fatal when followed by
    /// reader exit.
    Error { message: String },
}

impl WireEvent {
    /// Serialize to a single protocol line (no trailing newline).
    pub fn to_line(&self) -> String {
        // Serialization of these variants cannot fail; the enum contains
        // only JSON-representable fields.
        serde_json::to_string(self).expect("wire event serialization")
    }

    /// Parse one protocol line. Returns `None` for malformed or partial
    /// lines, which callers discard rather than treat as fatal.
    pub fn parse_line(line: &str) -> Option<Self> {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            return None;
        }
        match serde_json::from_str(trimmed) {
            Ok(event) => Some(event),
            Err(err) => {
                log::debug!("discarding malformed protocol line: {err}");
                None
            }
        }
    }
}
