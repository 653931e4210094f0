//! Mutable input state owned by the reader's event loop.
//!
//! The state is a plain owned struct passed by reference, never shared:
//! the reader runs exactly one thread, so no locking is needed. Cursor
//! position is reconstructed by accumulating relative deltas and clamping
//! to the screen bounds read once at startup.

use crate::screen::{Point, ScreenBounds};
use crate::shortcut::{ShortcutTable, is_modifier, modifier_mask};

/// Cursor, modifier, and reporting state for one reader instance.
#[derive(Debug)]
pub struct InputState {
    cursor: Point,
    bounds: ScreenBounds,
    /// Currently held modifier keys as a bitmask; a bit is set iff the
    /// corresponding key's last observed event was a press.
    modifiers: u32,
    /// Last position reported on the wire, to suppress duplicate cursor
    /// events. `None` until the first report.
    last_reported: Option<Point>,
}

impl InputState {
    /// Create state with the cursor at screen center.
    pub fn new(bounds: ScreenBounds) -> Self {
        Self {
            cursor: Point::new(bounds.width / 2, bounds.height / 2),
            bounds,
            modifiers: 0,
            last_reported: None,
        }
    }

    /// Current reconstructed cursor position.
    pub fn cursor(&self) -> Point {
        self.cursor
    }

    /// Currently held modifier mask.
    pub fn modifiers(&self) -> u32 {
        self.modifiers
    }

    /// Screen bounds the cursor is clamped to.
    pub fn bounds(&self) -> ScreenBounds {
        self.bounds
    }

    /// Apply an accumulated relative motion batch. The position is clamped
    /// to `[0, width-1] x [0, height-1]` on every update. Returns `true`
    /// when the position differs from the last reported one, in which case
    /// the caller emits a cursor event and the position is marked reported.
    pub fn apply_motion(&mut self, dx: i32, dy: i32) -> bool {
        self.cursor.x = (self.cursor.x + dx).clamp(0, self.bounds.width - 1);
        self.cursor.y = (self.cursor.y + dy).clamp(0, self.bounds.height - 1);

        let changed = self.last_reported != Some(self.cursor);
        if changed {
            self.last_reported = Some(self.cursor);
        }
        changed
    }

    /// Track a key press/release. Modifier keys update the held mask;
    /// other keys leave it untouched.
    pub fn key_event(&mut self, code: u16, pressed: bool) {
        let mask = modifier_mask(code);
        if mask == 0 {
            return;
        }
        if pressed {
            self.modifiers |= mask;
        } else {
            self.modifiers &= !mask;
        }
    }

    /// Evaluate a non-modifier key press against the chord table. Modifier
    /// presses never fire a chord themselves.
    pub fn shortcut_for<'t>(&self, table: &'t ShortcutTable, code: u16) -> Option<&'t str> {
        if is_modifier(code) {
            return None;
        }
        table.matching(self.modifiers, code)
    }
}
