//! Input device discovery and classification.
//!
//! Reads raw devices from `/dev/input/event*`. This works on both X11 and
//! Wayland because it bypasses the compositor entirely, which is the whole
//! point: a compositor that hides global cursor position from unfocused
//! windows cannot hide the kernel's event devices.
//!
//! ## Permissions
//!
//! The process must be able to read `/dev/input`, which normally means
//! membership in the `input` group:
//! ```bash
//! sudo usermod -aG input $USER
//! # Then log out and back in
//! ```

use crate::error::{Error, Result};
use evdev::{AttributeSetRef, Device, Key, RelativeAxisType};
use std::fs;
use std::path::PathBuf;

/// What a discovered device is good for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceKind {
    /// Reports relative X/Y motion; used for cursor reconstruction.
    Pointer,
    /// Reports alphabetic key codes; used for shortcut detection.
    Keyboard,
    /// Neither; never selected for tracking.
    Unknown,
}

/// An opened device together with its classification.
pub struct OpenDevice {
    pub device: Device,
    pub kind: DeviceKind,
    pub path: PathBuf,
}

/// Classify a device from its reported capability sets.
///
/// A device with relative X and Y axes is a pointer; checked first, so a
/// combo device that also carries letter keys still tracks the cursor. A
/// device with the QWERTY home-row probe keys {A, S, D, F} is a keyboard.
/// Everything else is ignored.
pub fn classify(
    rel_axes: Option<&AttributeSetRef<RelativeAxisType>>,
    keys: Option<&AttributeSetRef<Key>>,
) -> DeviceKind {
    if let Some(axes) = rel_axes {
        if axes.contains(RelativeAxisType::REL_X) && axes.contains(RelativeAxisType::REL_Y) {
            return DeviceKind::Pointer;
        }
    }

    if let Some(keys) = keys {
        let has_home_row = keys.contains(Key::KEY_A)
            && keys.contains(Key::KEY_S)
            && keys.contains(Key::KEY_D)
            && keys.contains(Key::KEY_F);
        if has_home_row {
            return DeviceKind::Keyboard;
        }
    }

    DeviceKind::Unknown
}

/// Scan `/dev/input` and open every pointer or keyboard device.
///
/// Devices that fail to open are skipped with a warning, not a fatal
/// error; most systems expose several nodes per physical device and some
/// are unreadable by design. Returns `Error::Discovery` only when the
/// directory itself cannot be enumerated.
pub fn discover() -> Result<Vec<OpenDevice>> {
    let entries = fs::read_dir("/dev/input").map_err(|e| {
        Error::Discovery(format!(
            "/dev/input: {e}. Make sure you're in the 'input' group."
        ))
    })?;

    let mut devices = Vec::new();
    for entry in entries.flatten() {
        let path = entry.path();
        let is_event_node = path
            .file_name()
            .map(|n| n.to_string_lossy().starts_with("event"))
            .unwrap_or(false);
        if !is_event_node {
            continue;
        }

        let device = match Device::open(&path) {
            Ok(d) => d,
            Err(e) => {
                log::warn!("skipping {}: {e}", path.display());
                continue;
            }
        };

        match classify(device.supported_relative_axes(), device.supported_keys()) {
            DeviceKind::Unknown => {
                log::debug!("ignoring {} (not pointer or keyboard)", path.display());
            }
            kind => {
                log::info!(
                    "found {kind:?}: {} ({})",
                    device.name().unwrap_or("unnamed"),
                    path.display()
                );
                devices.push(OpenDevice { device, kind, path });
            }
        }
    }

    Ok(devices)
}

/// Count devices of a given kind.
pub fn count_kind(devices: &[OpenDevice], kind: DeviceKind) -> usize {
    devices.iter().filter(|d| d.kind == kind).count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use evdev::AttributeSet;

    fn axes(list: &[RelativeAxisType]) -> AttributeSet<RelativeAxisType> {
        let mut set = AttributeSet::new();
        for axis in list {
            set.insert(*axis);
        }
        set
    }

    fn keys(list: &[Key]) -> AttributeSet<Key> {
        let mut set = AttributeSet::new();
        for key in list {
            set.insert(*key);
        }
        set
    }

    #[test]
    fn relative_xy_classifies_as_pointer() {
        let set = axes(&[RelativeAxisType::REL_X, RelativeAxisType::REL_Y]);
        assert_eq!(classify(Some(&set), None), DeviceKind::Pointer);
    }

    #[test]
    fn scroll_only_axes_are_not_a_pointer() {
        let set = axes(&[RelativeAxisType::REL_WHEEL]);
        assert_eq!(classify(Some(&set), None), DeviceKind::Unknown);
    }

    #[test]
    fn home_row_keys_classify_as_keyboard() {
        let set = keys(&[Key::KEY_A, Key::KEY_S, Key::KEY_D, Key::KEY_F]);
        assert_eq!(classify(None, Some(&set)), DeviceKind::Keyboard);
    }

    #[test]
    fn media_keys_alone_are_not_a_keyboard() {
        let set = keys(&[Key::KEY_VOLUMEUP, Key::KEY_VOLUMEDOWN, Key::KEY_MUTE]);
        assert_eq!(classify(None, Some(&set)), DeviceKind::Unknown);
    }

    #[test]
    fn no_capabilities_is_unknown() {
        assert_eq!(classify(None, None), DeviceKind::Unknown);
    }

    #[test]
    fn pointer_rule_wins_on_combo_devices() {
        let a = axes(&[RelativeAxisType::REL_X, RelativeAxisType::REL_Y]);
        let k = keys(&[Key::KEY_A, Key::KEY_S, Key::KEY_D, Key::KEY_F]);
        assert_eq!(classify(Some(&a), Some(&k)), DeviceKind::Pointer);
    }
}
