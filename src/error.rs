//! Error types for the input tracking and arbitration subsystem.

use thiserror::Error;

/// Result type alias for overpass operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while tracking input or arbitrating capture.
///
/// Recoverable conditions never surface here: a single unreadable device
/// or a malformed protocol line is logged and absorbed at the point of
/// failure. These variants are reserved for conditions the caller has to
/// act on.
#[derive(Debug, Error)]
pub enum Error {
    /// The input device directory could not be enumerated at all.
    #[error("cannot enumerate input devices: {0}")]
    Discovery(String),

    /// Every open device has been lost; the reader cannot continue.
    #[error("all input devices lost")]
    NoDevices,

    /// The reader child process could not be spawned.
    #[error("failed to spawn reader process: {0}")]
    Spawn(#[from] std::io::Error),

    /// The event stream from the reader broke down.
    #[error("reader transport failed: {0}")]
    Transport(String),

    /// A shortcut chord collides with one already registered.
    #[error("shortcut chord already registered: {0}")]
    ShortcutConflict(String),
}
