//! Shortcut chords and modifier-mask tracking.
//!
//! A chord is a required modifier set plus a trigger key. Matching is
//! exact-set: the chord fires only when the held modifiers *equal* the
//! required mask at the moment the trigger is pressed. A superset does not
//! match, so an incidentally held extra modifier never fires a shortcut.
//!
//! Key identity uses raw Linux input event codes (the values evdev
//! reports), which keeps this module free of platform dependencies.

use crate::error::{Error, Result};

// Keyboard modifier masks.
/// Shift key mask.
pub const MASK_SHIFT: u32 = 1 << 0;
/// Control key mask.
pub const MASK_CTRL: u32 = 1 << 1;
/// Alt key mask.
pub const MASK_ALT: u32 = 1 << 2;
/// Meta/Super/Windows key mask.
pub const MASK_META: u32 = 1 << 3;

// Raw key codes used by the default chord table.
/// KEY_C.
pub const KEY_C: u16 = 46;
/// KEY_D.
pub const KEY_D: u16 = 32;
/// KEY_F.
pub const KEY_F: u16 = 33;
/// KEY_S.
pub const KEY_S: u16 = 31;

/// Map a raw key code to its modifier mask bit, or 0 for non-modifiers.
pub fn modifier_mask(code: u16) -> u32 {
    match code {
        42 | 54 => MASK_SHIFT,  // KEY_LEFTSHIFT, KEY_RIGHTSHIFT
        29 | 97 => MASK_CTRL,   // KEY_LEFTCTRL, KEY_RIGHTCTRL
        56 | 100 => MASK_ALT,   // KEY_LEFTALT, KEY_RIGHTALT
        125 | 126 => MASK_META, // KEY_LEFTMETA, KEY_RIGHTMETA
        _ => 0,
    }
}

/// Whether a raw key code is a modifier key.
pub fn is_modifier(code: u16) -> bool {
    modifier_mask(code) != 0
}

/// One configured chord: required modifier mask, trigger key, and the name
/// reported on the wire when it fires.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShortcutSpec {
    /// Exact modifier mask that must be held.
    pub modifiers: u32,
    /// Raw code of the trigger key.
    pub trigger: u16,
    /// Name emitted in the `shortcut` wire event.
    pub name: String,
}

impl ShortcutSpec {
    pub fn new(modifiers: u32, trigger: u16, name: impl Into<String>) -> Self {
        Self {
            modifiers,
            trigger,
            name: name.into(),
        }
    }
}

/// The chord table, configured once at reader startup and immutable for
/// the reader's lifetime. Shortcut changes in the consuming application
/// are realized by restarting the reader with a new table.
#[derive(Debug, Clone, Default)]
pub struct ShortcutTable {
    specs: Vec<ShortcutSpec>,
}

impl ShortcutTable {
    /// An empty table; no chord ever fires.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Register a chord. Rejects a (modifiers, trigger) pair that is
    /// already present; the existing entries stay operational.
    pub fn register(&mut self, spec: ShortcutSpec) -> Result<()> {
        if self
            .specs
            .iter()
            .any(|s| s.modifiers == spec.modifiers && s.trigger == spec.trigger)
        {
            return Err(Error::ShortcutConflict(spec.name));
        }
        self.specs.push(spec);
        Ok(())
    }

    /// Find the chord fired by pressing `trigger` while `held` modifiers
    /// are down. Exact-set comparison, never a superset match.
    pub fn matching(&self, held: u32, trigger: u16) -> Option<&str> {
        self.specs
            .iter()
            .find(|s| s.trigger == trigger && s.modifiers == held)
            .map(|s| s.name.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }

    /// The chord table of the original overlay application:
    /// Meta+Shift+{F,D,S,C}.
    pub fn overlay_defaults() -> Self {
        let mut table = Self::empty();
        for (trigger, name) in [
            (KEY_F, "toggle_chat"),
            (KEY_D, "toggle_drag"),
            (KEY_S, "toggle_screensaver"),
            (KEY_C, "center_character"),
        ] {
            // The defaults cannot collide with each other.
            let _ = table.register(ShortcutSpec::new(MASK_META | MASK_SHIFT, trigger, name));
        }
        table
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn modifier_codes_map_to_masks() {
        assert_eq!(modifier_mask(42), MASK_SHIFT);
        assert_eq!(modifier_mask(54), MASK_SHIFT);
        assert_eq!(modifier_mask(29), MASK_CTRL);
        assert_eq!(modifier_mask(100), MASK_ALT);
        assert_eq!(modifier_mask(125), MASK_META);
        assert_eq!(modifier_mask(KEY_F), 0);
        assert!(is_modifier(126));
        assert!(!is_modifier(KEY_S));
    }

    #[test]
    fn exact_set_match_fires() {
        let table = ShortcutTable::overlay_defaults();
        assert_eq!(
            table.matching(MASK_META | MASK_SHIFT, KEY_F),
            Some("toggle_chat")
        );
    }

    #[test]
    fn superset_of_required_modifiers_does_not_fire() {
        let mut table = ShortcutTable::empty();
        table
            .register(ShortcutSpec::new(MASK_META, KEY_F, "meta_only"))
            .unwrap();
        // Meta+Shift held: the Meta-only chord must stay silent.
        assert_eq!(table.matching(MASK_META | MASK_SHIFT, KEY_F), None);
        assert_eq!(table.matching(MASK_META, KEY_F), Some("meta_only"));
    }

    #[test]
    fn missing_modifier_does_not_fire() {
        let table = ShortcutTable::overlay_defaults();
        assert_eq!(table.matching(MASK_META, KEY_F), None);
        assert_eq!(table.matching(0, KEY_F), None);
    }

    #[test]
    fn wrong_trigger_does_not_fire() {
        let table = ShortcutTable::overlay_defaults();
        assert_eq!(table.matching(MASK_META | MASK_SHIFT, 30), None); // KEY_A
    }

    #[test]
    fn duplicate_chord_is_rejected_without_breaking_others() {
        let mut table = ShortcutTable::overlay_defaults();
        let err = table
            .register(ShortcutSpec::new(MASK_META | MASK_SHIFT, KEY_F, "dup"))
            .unwrap_err();
        assert!(matches!(err, Error::ShortcutConflict(_)));
        // Unrelated chords still operate.
        assert_eq!(
            table.matching(MASK_META | MASK_SHIFT, KEY_D),
            Some("toggle_drag")
        );
    }

    #[test]
    fn same_trigger_different_modifiers_coexist() {
        let mut table = ShortcutTable::empty();
        table
            .register(ShortcutSpec::new(MASK_META, KEY_F, "a"))
            .unwrap();
        table
            .register(ShortcutSpec::new(MASK_CTRL, KEY_F, "b"))
            .unwrap();
        assert_eq!(table.matching(MASK_META, KEY_F), Some("a"));
        assert_eq!(table.matching(MASK_CTRL, KEY_F), Some("b"));
    }
}
