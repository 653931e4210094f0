//! The device reader event loop.
//!
//! One thread blocks in a single `poll(2)` across every opened device fd,
//! drains whichever devices woke it, and writes one JSON line per
//! meaningful event to the given output. Relative motion accumulates per
//! drained batch and is applied (and reported) once per batch, which
//! bounds the output rate without dropping precision.
//!
//! Failure semantics: a read error on one device closes that device only
//! and the loop continues with the rest. Losing the last device emits a
//! fatal wire error and returns `Error::NoDevices`.

use crate::device::{self, DeviceKind, OpenDevice};
use crate::error::{Error, Result};
use crate::protocol::{Button, WireEvent};
use crate::screen::ScreenBounds;
use crate::shortcut::ShortcutTable;
use crate::state::InputState;
use evdev::{InputEvent, InputEventKind, Key};
use signal_hook::consts::signal::{SIGINT, SIGTERM};
use signal_hook::flag as signal_flag;
use std::io::{self, Write};
use std::os::unix::io::AsRawFd;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// Reader configuration, fixed for the process lifetime.
pub struct ReaderConfig {
    /// Screen bounds the cursor is clamped to.
    pub bounds: ScreenBounds,
    /// Chord table evaluated on every non-modifier key press.
    pub shortcuts: ShortcutTable,
    /// Poll timeout; a timeout with no traffic emits a heartbeat.
    pub heartbeat: Duration,
}

impl ReaderConfig {
    /// Detect screen bounds and use the original overlay chord table.
    pub fn detected() -> Self {
        Self {
            bounds: crate::screen::detect_screen_bounds(),
            shortcuts: ShortcutTable::overlay_defaults(),
            heartbeat: Duration::from_secs(1),
        }
    }
}

/// Register SIGINT/SIGTERM to flip a shutdown flag checked by the loop.
pub fn install_shutdown_flag() -> Arc<AtomicBool> {
    let shutdown = Arc::new(AtomicBool::new(false));
    let _ = signal_flag::register(SIGINT, Arc::clone(&shutdown));
    let _ = signal_flag::register(SIGTERM, Arc::clone(&shutdown));
    shutdown
}

fn emit<W: Write>(out: &mut W, event: &WireEvent) -> io::Result<()> {
    writeln!(out, "{}", event.to_line())?;
    // Flush per event so the consumer sees it immediately; the stream is
    // low-rate by construction.
    out.flush()
}

fn button_for(key: Key) -> Option<Button> {
    match key {
        Key::BTN_LEFT => Some(Button::Left),
        Key::BTN_RIGHT => Some(Button::Right),
        Key::BTN_MIDDLE => Some(Button::Middle),
        _ => None,
    }
}

/// Process one drained batch from a single device: accumulate motion,
/// forward button presses and matched chords, then apply the motion batch
/// and report the cursor if it moved.
fn process_batch<W: Write>(
    events: &[InputEvent],
    state: &mut InputState,
    shortcuts: &ShortcutTable,
    out: &mut W,
) -> io::Result<()> {
    let mut dx = 0i32;
    let mut dy = 0i32;

    for event in events {
        match event.kind() {
            InputEventKind::RelAxis(axis) => match axis {
                evdev::RelativeAxisType::REL_X => dx += event.value(),
                evdev::RelativeAxisType::REL_Y => dy += event.value(),
                _ => {} // wheels are not tracked
            },
            InputEventKind::Key(key) => {
                // value: 0 = release, 1 = press, 2 = autorepeat
                let pressed = event.value() == 1;
                let released = event.value() == 0;

                if let Some(button) = button_for(key) {
                    if pressed {
                        let p = state.cursor();
                        emit(
                            out,
                            &WireEvent::Click {
                                button,
                                x: p.x,
                                y: p.y,
                            },
                        )?;
                    }
                    continue;
                }

                let code = key.code();
                if pressed || released {
                    state.key_event(code, pressed);
                }
                if pressed {
                    if let Some(name) = state.shortcut_for(shortcuts, code) {
                        emit(
                            out,
                            &WireEvent::Shortcut {
                                name: name.to_string(),
                            },
                        )?;
                    }
                }
            }
            _ => {} // sync and misc events
        }
    }

    if (dx != 0 || dy != 0) && state.apply_motion(dx, dy) {
        let p = state.cursor();
        emit(out, &WireEvent::Cursor { x: p.x, y: p.y })?;
    }

    Ok(())
}

/// Drain a device. `Ok(false)` means the device is lost and must be
/// dropped from the poll set.
fn drain_device<W: Write>(
    dev: &mut OpenDevice,
    state: &mut InputState,
    shortcuts: &ShortcutTable,
    out: &mut W,
) -> io::Result<bool> {
    let events: Vec<InputEvent> = match dev.device.fetch_events() {
        Ok(events) => events.collect(),
        Err(e) if e.raw_os_error() == Some(libc::EAGAIN) => return Ok(true),
        Err(e) => {
            log::warn!("closing {}: {e}", dev.path.display());
            emit(
                out,
                &WireEvent::Error {
                    message: format!("device lost: {}", dev.path.display()),
                },
            )?;
            return Ok(false);
        }
    };
    process_batch(&events, state, shortcuts, out)?;
    Ok(true)
}

/// Run the reader until the shutdown flag is set or input is gone.
///
/// Emits `Ready` first (with possibly-degraded device counts), then
/// cursor/click/shortcut/heartbeat events until shutdown. Write failures
/// on `out` mean the consumer went away and surface as
/// `Error::Transport`.
pub fn run<W: Write>(
    config: &ReaderConfig,
    shutdown: &Arc<AtomicBool>,
    out: &mut W,
) -> Result<()> {
    let mut devices = device::discover()?;

    let pointer_count = device::count_kind(&devices, DeviceKind::Pointer);
    let keyboard_count = device::count_kind(&devices, DeviceKind::Keyboard);

    if devices.is_empty() {
        let _ = emit(
            out,
            &WireEvent::Error {
                message: "no input devices found".into(),
            },
        );
        return Err(Error::NoDevices);
    }

    let transport = |e: io::Error| Error::Transport(format!("output pipe: {e}"));

    emit(
        out,
        &WireEvent::Ready {
            pointer_count,
            keyboard_count,
            screen_width: config.bounds.width,
            screen_height: config.bounds.height,
        },
    )
    .map_err(transport)?;

    log::info!(
        "reader started: {pointer_count} pointer(s), {keyboard_count} keyboard(s), {}x{}",
        config.bounds.width,
        config.bounds.height
    );

    let mut state = InputState::new(config.bounds);
    let timeout_ms = config.heartbeat.as_millis().min(i32::MAX as u128) as i32;

    while !shutdown.load(Ordering::Relaxed) {
        let mut poll_fds: Vec<libc::pollfd> = devices
            .iter()
            .map(|d| libc::pollfd {
                fd: d.device.as_raw_fd(),
                events: libc::POLLIN,
                revents: 0,
            })
            .collect();

        let ret = unsafe { libc::poll(poll_fds.as_mut_ptr(), poll_fds.len() as _, timeout_ms) };

        if ret < 0 {
            let err = io::Error::last_os_error();
            if err.kind() == io::ErrorKind::Interrupted {
                continue;
            }
            return Err(Error::Transport(format!("poll: {err}")));
        }

        if ret == 0 {
            emit(out, &WireEvent::Heartbeat).map_err(transport)?;
            continue;
        }

        let mut lost = Vec::new();
        for (i, pfd) in poll_fds.iter().enumerate() {
            let woke = pfd.revents & (libc::POLLIN | libc::POLLERR | libc::POLLHUP) != 0;
            if !woke {
                continue;
            }
            let alive = drain_device(&mut devices[i], &mut state, &config.shortcuts, out)
                .map_err(transport)?;
            if !alive {
                lost.push(i);
            }
        }
        for i in lost.into_iter().rev() {
            devices.remove(i);
        }

        if devices.is_empty() {
            let _ = emit(
                out,
                &WireEvent::Error {
                    message: "all input devices lost".into(),
                },
            );
            return Err(Error::NoDevices);
        }
    }

    log::info!("reader shutting down");
    Ok(())
}
