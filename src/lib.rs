//! # overpass
//!
//! Global input tracking and click-through arbitration for always-on-top,
//! mostly-transparent overlay windows.
//!
//! An overlay that covers the whole screen must still behave as if only
//! its small visible regions are clickable. The window manager raises no
//! event when the cursor crosses an invisible hit-region boundary while
//! the window is non-capturing, and on some display servers (Wayland) an
//! unprivileged process cannot query the global cursor at all. This crate
//! splits the problem across a process boundary:
//!
//! - The **device reader** (`overpass-reader` binary, [`reader`] module)
//!   reads raw `/dev/input` devices directly, reconstructs an absolute
//!   cursor position from relative deltas, detects configured shortcut
//!   chords, and prints one JSON event per line on stdout.
//! - The **arbiter** ([`arbiter`] module) runs inside the window-owning
//!   process. It consumes that stream (or a native cursor probe where the
//!   platform allows one), hit-tests the cursor against registered
//!   interactive regions, and flips the window between capturing and
//!   click-through — only when the decision changes.
//!
//! ## Quick start
//!
//! ```no_run
//! use overpass::{Arbiter, ArbiterConfig, ReaderSource};
//! use std::time::Instant;
//!
//! let mut source = ReaderSource::spawn("overpass-reader").expect("spawn reader");
//! let mut arbiter = Arbiter::new(ArbiterConfig::default());
//! arbiter.on_shortcut("toggle_chat", || println!("chat toggled"));
//!
//! // From the host's timer, every few tens of milliseconds:
//! // arbiter.tick(&mut source, &mut window, Instant::now());
//! ```
//!
//! The whole pipeline works in physical pixels; convert to logical
//! coordinates once, at the UI boundary.

pub mod arbiter;
pub mod error;
pub mod protocol;
pub mod screen;
pub mod shortcut;
pub mod source;
pub mod state;
pub mod wiggle;

#[cfg(target_os = "linux")]
pub mod device;
#[cfg(target_os = "linux")]
pub mod reader;

// Re-exports
pub use arbiter::{Arbiter, ArbiterConfig, InteractiveRegion, OverlayWindow};
pub use error::{Error, Result};
pub use protocol::{Button, WireEvent};
pub use screen::{Point, Rect, ScreenBounds, detect_screen_bounds};
pub use shortcut::{ShortcutSpec, ShortcutTable};
pub use source::{CursorProbe, EventSource, NativeSource, ReaderSource};
pub use state::InputState;
pub use wiggle::{WiggleConfig, WiggleDetector};

#[cfg(target_os = "linux")]
pub use device::{DeviceKind, OpenDevice};
#[cfg(target_os = "linux")]
pub use reader::ReaderConfig;
