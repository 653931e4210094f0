//! Capture/pass-through arbitration for the overlay window.
//!
//! The arbiter runs on the host's fixed-interval timer: every tick it
//! drains its [`EventSource`], updates hover state, decides whether the
//! window should capture pointer input, and applies that decision through
//! [`OverlayWindow`] — but only when it actually changes, because
//! redundant native mode flips are wasteful and can flicker on some
//! platforms.
//!
//! Everything here runs on one logical thread; region updates from the
//! layout and cursor-driven hit tests never race.

use crate::protocol::{Button, WireEvent};
use crate::screen::{Point, Rect, ScreenBounds};
use crate::source::EventSource;
use crate::wiggle::{WiggleConfig, WiggleDetector};
use std::collections::HashMap;
use std::time::{Duration, Instant};

/// The window the arbiter steers. Implemented by the host over its
/// windowing layer.
pub trait OverlayWindow {
    /// Switch the window between capturing pointer input and passing
    /// clicks through to whatever is beneath it.
    fn set_capturing(&mut self, capturing: bool);

    /// Current window bounds in physical screen pixels.
    fn bounds(&self) -> Rect;

    /// Move the window to a new origin for an evasion. The implementation
    /// owns the presentation (fade out, move, fade back in).
    fn relocate(&mut self, target: Point);
}

/// A rectangle of visible UI that should accept clicks.
#[derive(Debug, Clone)]
pub struct InteractiveRegion {
    pub id: String,
    pub bounds: Rect,
    pub visible: bool,
    /// Transient hover feedback flag, recomputed from cursor samples and
    /// cleared whenever the window goes pass-through.
    pub hovered: bool,
}

/// Arbiter tuning.
#[derive(Debug, Clone)]
pub struct ArbiterConfig {
    /// Assumed screen bounds until a `ready` event reports real ones.
    pub screen: ScreenBounds,
    /// Force capture when the stream has been silent this long
    /// (heartbeats count as traffic).
    pub watchdog: Duration,
    /// Wiggle/evasion tuning.
    pub wiggle: WiggleConfig,
}

impl Default for ArbiterConfig {
    fn default() -> Self {
        Self {
            screen: ScreenBounds::new(1920, 1080),
            watchdog: Duration::from_secs(3),
            wiggle: WiggleConfig::default(),
        }
    }
}

type ShortcutCallback = Box<dyn FnMut() + Send>;
type ClickCallback = Box<dyn FnMut(Button, Point) + Send>;

/// Owns the interactive-region set and the capture decision.
pub struct Arbiter {
    regions: Vec<InteractiveRegion>,
    cursor: Option<Point>,
    screen: ScreenBounds,

    modal_open: bool,
    drag_active: bool,
    idle_mode: bool,

    /// Last capture value actually pushed to the window.
    applied_capture: Option<bool>,

    shortcuts: HashMap<String, ShortcutCallback>,
    on_click: Option<ClickCallback>,

    device_counts: Option<(usize, usize)>,
    last_event: Option<Instant>,
    watchdog: Duration,

    wiggle: WiggleDetector,
    character_bounds: Option<Rect>,
}

impl Arbiter {
    pub fn new(config: ArbiterConfig) -> Self {
        Self {
            regions: Vec::new(),
            cursor: None,
            screen: config.screen,
            modal_open: false,
            drag_active: false,
            idle_mode: false,
            applied_capture: None,
            shortcuts: HashMap::new(),
            on_click: None,
            device_counts: None,
            last_event: None,
            watchdog: config.watchdog,
            wiggle: WiggleDetector::new(config.wiggle),
            character_bounds: None,
        }
    }

    // ---- host inputs ------------------------------------------------------

    /// Insert or update a region. Called by the presentation layer on
    /// every layout change (resize, show/hide, reflow).
    pub fn upsert_region(&mut self, id: impl Into<String>, bounds: Rect, visible: bool) {
        let id = id.into();
        match self.regions.iter_mut().find(|r| r.id == id) {
            Some(region) => {
                region.bounds = bounds;
                region.visible = visible;
            }
            None => self.regions.push(InteractiveRegion {
                id,
                bounds,
                visible,
                hovered: false,
            }),
        }
    }

    pub fn remove_region(&mut self, id: &str) {
        self.regions.retain(|r| r.id != id);
    }

    pub fn regions(&self) -> &[InteractiveRegion] {
        &self.regions
    }

    /// Bounds of the tracked character, used for evasion proximity.
    pub fn set_character_bounds(&mut self, bounds: Option<Rect>) {
        self.character_bounds = bounds;
    }

    /// A modal surface (settings panel) is open: capture unconditionally.
    pub fn set_modal_open(&mut self, open: bool) {
        self.modal_open = open;
        if open {
            self.wiggle.reset();
        }
    }

    /// A drag gesture is in progress: capture unconditionally and freeze
    /// hover state until it ends.
    pub fn set_drag_active(&mut self, active: bool) {
        self.drag_active = active;
        if active {
            self.wiggle.reset();
        }
    }

    /// Idle/privacy mode gates evasion (not capture).
    pub fn set_idle_mode(&mut self, idle: bool) {
        self.idle_mode = idle;
        if idle {
            self.wiggle.reset();
        }
    }

    /// Register the callback for a shortcut name, replacing any previous
    /// one. Names arriving without a registration are ignored.
    pub fn on_shortcut(
        &mut self,
        name: impl Into<String>,
        callback: impl FnMut() + Send + 'static,
    ) {
        self.shortcuts.insert(name.into(), Box::new(callback));
    }

    /// Register the click-forwarding callback.
    pub fn on_click(&mut self, callback: impl FnMut(Button, Point) + Send + 'static) {
        self.on_click = Some(Box::new(callback));
    }

    // ---- observers --------------------------------------------------------

    /// Latest cursor sample, for hover feedback upstream.
    pub fn cursor(&self) -> Option<Point> {
        self.cursor
    }

    /// Device counts from the reader's `ready` event, for diagnostics.
    pub fn device_counts(&self) -> Option<(usize, usize)> {
        self.device_counts
    }

    /// The capture value last applied to the window.
    pub fn capturing(&self) -> bool {
        self.applied_capture.unwrap_or(false)
    }

    // ---- the tick ---------------------------------------------------------

    /// One arbitration pass: drain the source, dispatch events, decide
    /// capture, apply on change. The host calls this from its timer every
    /// few tens of milliseconds.
    pub fn tick(
        &mut self,
        source: &mut dyn EventSource,
        window: &mut dyn OverlayWindow,
        now: Instant,
    ) {
        // Watchdog baseline: silence is measured from the first tick, not
        // from an event that may never come.
        self.last_event.get_or_insert(now);

        for event in source.poll() {
            self.handle_event(event, window, now);
        }

        let degraded = !source.is_alive()
            || self
                .last_event
                .is_some_and(|t| now.duration_since(t) > self.watchdog);
        if degraded && self.applied_capture != Some(true) {
            log::warn!("event stream degraded, forcing capture");
        }

        if !self.drag_active {
            let cursor = self.cursor;
            for region in &mut self.regions {
                region.hovered = region.visible
                    && cursor.is_some_and(|p| region.bounds.contains(p));
            }
        }

        let capture = if self.modal_open || self.drag_active || degraded {
            true
        } else {
            self.hit_test()
        };

        if !capture {
            // No region may look highlighted while clicks pass through.
            for region in &mut self.regions {
                region.hovered = false;
            }
        }

        if self.applied_capture != Some(capture) {
            window.set_capturing(capture);
            self.applied_capture = Some(capture);
        }
    }

    fn hit_test(&self) -> bool {
        let Some(cursor) = self.cursor else {
            return false;
        };
        self.regions
            .iter()
            .any(|r| r.visible && r.bounds.contains(cursor))
    }

    fn handle_event(&mut self, event: WireEvent, window: &mut dyn OverlayWindow, now: Instant) {
        self.last_event = Some(now);
        match event {
            WireEvent::Cursor { x, y } => {
                let sample = Point::new(x, y);
                let previous = self.cursor.replace(sample);
                self.maybe_evade(previous, sample, window, now);
            }
            WireEvent::Shortcut { name } => {
                if let Some(callback) = self.shortcuts.get_mut(&name) {
                    callback();
                } else {
                    log::debug!("unregistered shortcut ignored: {name}");
                }
            }
            WireEvent::Click { button, x, y } => {
                if let Some(callback) = &mut self.on_click {
                    callback(button, Point::new(x, y));
                }
            }
            WireEvent::Ready {
                pointer_count,
                keyboard_count,
                screen_width,
                screen_height,
            } => {
                self.device_counts = Some((pointer_count, keyboard_count));
                self.screen = ScreenBounds::new(screen_width, screen_height);
                if keyboard_count == 0 {
                    log::warn!("no keyboard devices: shortcuts will not fire");
                }
                if pointer_count == 0 {
                    log::warn!("no pointer devices: cursor tracking degraded");
                }
            }
            WireEvent::Heartbeat => {}
            WireEvent::Error { message } => {
                log::warn!("reader reported: {message}");
            }
        }
    }

    fn maybe_evade(
        &mut self,
        previous: Option<Point>,
        sample: Point,
        window: &mut dyn OverlayWindow,
        now: Instant,
    ) {
        if self.drag_active || self.modal_open || self.idle_mode {
            self.wiggle.reset();
            return;
        }
        let Some(previous) = previous else {
            return;
        };
        let dx = sample.x - previous.x;
        if self
            .wiggle
            .observe(dx, sample, self.character_bounds, now)
        {
            let target =
                self.wiggle
                    .pick_target(self.screen.rect(), window.bounds(), &mut rand::thread_rng());
            log::info!("wiggle evasion: relocating to ({}, {})", target.x, target.y);
            window.relocate(target);
        }
    }
}
