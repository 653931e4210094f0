//! Screen geometry and screen-bounds detection.
//!
//! The whole pipeline works in one coordinate space: physical pixels.
//! Any logical/scaled conversion happens once at the UI boundary, outside
//! this crate.

use std::process::Command;

/// A point in physical screen pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// A rectangle in physical screen pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Rect {
    /// Left coordinate.
    pub x: i32,
    /// Top coordinate.
    pub y: i32,
    /// Width in pixels.
    pub width: i32,
    /// Height in pixels.
    pub height: i32,
}

impl Rect {
    pub fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Check whether a point is inside this rectangle.
    pub fn contains(&self, p: Point) -> bool {
        p.x >= self.x && p.y >= self.y && p.x < self.x + self.width && p.y < self.y + self.height
    }

    /// Center of the rectangle.
    pub fn center(&self) -> Point {
        Point::new(self.x + self.width / 2, self.y + self.height / 2)
    }
}

/// Screen bounds the cursor is clamped to. Read once at reader startup,
/// never mutated afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScreenBounds {
    pub width: i32,
    pub height: i32,
}

impl ScreenBounds {
    pub fn new(width: i32, height: i32) -> Self {
        Self { width, height }
    }

    /// Full screen as a rect anchored at the origin.
    pub fn rect(&self) -> Rect {
        Rect::new(0, 0, self.width, self.height)
    }
}

/// Environment overrides for testing and calibration.
const ENV_WIDTH: &str = "OVERPASS_SCREEN_WIDTH";
const ENV_HEIGHT: &str = "OVERPASS_SCREEN_HEIGHT";

/// Detect the screen bounds.
///
/// Wayland compositors do not expose this to unprivileged processes, so
/// several methods are tried in order: environment override, `wlr-randr`
/// (wlroots compositors), `xrandr` (X11 and XWayland), then a 1920x1080
/// fallback.
pub fn detect_screen_bounds() -> ScreenBounds {
    if let (Ok(w), Ok(h)) = (std::env::var(ENV_WIDTH), std::env::var(ENV_HEIGHT)) {
        if let (Ok(width), Ok(height)) = (w.parse(), h.parse()) {
            log::info!("screen bounds from environment: {width}x{height}");
            return ScreenBounds::new(width, height);
        }
    }

    for tool in ["wlr-randr", "xrandr"] {
        if let Ok(output) = Command::new(tool).output() {
            if let Some(bounds) = parse_randr_output(&String::from_utf8_lossy(&output.stdout)) {
                log::info!(
                    "screen bounds from {tool}: {}x{}",
                    bounds.width,
                    bounds.height
                );
                return bounds;
            }
        }
    }

    log::warn!("screen bounds undetectable, assuming 1920x1080");
    ScreenBounds::new(1920, 1080)
}

/// Find the active resolution in `xrandr`/`wlr-randr` output by scanning
/// "connected"/"current" lines for a WxH token.
fn parse_randr_output(output: &str) -> Option<ScreenBounds> {
    for line in output.lines() {
        if !line.contains(" connected") && !line.contains("current") {
            continue;
        }
        for word in line.split_whitespace() {
            if let Some((w, h)) = word.split_once('x') {
                // xrandr appends the position: "1920x1080+0+0". Cut the
                // height at the first non-digit.
                let h: String = h.chars().take_while(|c| c.is_ascii_digit()).collect();
                let parsed = (
                    w.trim_matches(|c: char| !c.is_ascii_digit()).parse::<i32>(),
                    h.parse::<i32>(),
                );
                if let (Ok(width), Ok(height)) = parsed {
                    if width > 0 && height > 0 {
                        return Some(ScreenBounds::new(width, height));
                    }
                }
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rect_contains_is_half_open() {
        let r = Rect::new(10, 10, 100, 50);
        assert!(r.contains(Point::new(10, 10)));
        assert!(r.contains(Point::new(109, 59)));
        assert!(!r.contains(Point::new(110, 10)));
        assert!(!r.contains(Point::new(10, 60)));
        assert!(!r.contains(Point::new(9, 10)));
    }

    #[test]
    fn parses_xrandr_connected_line() {
        let output = "Screen 0: minimum 320 x 200, current 1920 x 1080, maximum 16384 x 16384\n\
                      eDP-1 connected primary 1920x1080+0+0 (normal left inverted) 344mm x 194mm\n";
        assert_eq!(
            parse_randr_output(output),
            Some(ScreenBounds::new(1920, 1080))
        );
    }

    #[test]
    fn parses_wlr_randr_current_line() {
        let output = "DP-1 \"Dell U2720Q\"\n  Modes:\n    3840x2160 px, 59.997 Hz (preferred, current)\n";
        assert_eq!(
            parse_randr_output(output),
            Some(ScreenBounds::new(3840, 2160))
        );
    }

    #[test]
    fn ignores_output_without_resolution() {
        assert_eq!(parse_randr_output("HDMI-1 disconnected\n"), None);
        assert_eq!(parse_randr_output(""), None);
    }
}
