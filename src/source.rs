//! Transport seam between the arbiter and its event supply.
//!
//! The arbiter works identically whether cursor/shortcut data comes from
//! the spawned reader process or from native polling on platforms whose
//! windowing layer exposes global cursor queries. Both transports sit
//! behind [`EventSource`]; the rest of the arbiter is transport-agnostic.

use crate::error::Result;
use crate::protocol::WireEvent;
use crate::screen::Point;
use std::io::{BufRead, BufReader};
use std::path::PathBuf;
use std::process::{Child, Command, Stdio};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{Receiver, SyncSender, TryRecvError, sync_channel};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// Events buffered between arbiter ticks. A slow consumer drops events
/// rather than blocking the reader's pipe.
const CHANNEL_CAPACITY: usize = 256;

/// How long a dead reader stays down before a respawn attempt.
const RESPAWN_BACKOFF: Duration = Duration::from_secs(2);

/// How long shutdown waits for the killed child before abandoning it.
const KILL_GRACE: Duration = Duration::from_millis(500);

/// A supply of wire events, drained once per arbiter tick.
pub trait EventSource {
    /// Drain everything that arrived since the last call.
    fn poll(&mut self) -> Vec<WireEvent>;

    /// Whether the underlying supply is currently delivering. A dead
    /// source makes the arbiter fall back to always-capturing.
    fn is_alive(&self) -> bool;

    /// Stop the supply, terminating any child process within a bounded
    /// grace period.
    fn shutdown(&mut self);
}

/// [`EventSource`] backed by a spawned reader process.
///
/// A background thread parses the child's stdout line by line into a
/// bounded channel; malformed lines are discarded there. When the child
/// dies, `poll` respawns it after a backoff so a transient reader crash
/// does not permanently degrade the overlay.
pub struct ReaderSource {
    program: PathBuf,
    args: Vec<String>,
    child: Option<Child>,
    rx: Option<Receiver<WireEvent>>,
    pump: Option<JoinHandle<()>>,
    alive: Arc<AtomicBool>,
    last_spawn: Option<Instant>,
}

impl ReaderSource {
    /// Spawn the reader binary and start pumping its output.
    pub fn spawn(program: impl Into<PathBuf>) -> Result<Self> {
        Self::spawn_with_args(program, Vec::new())
    }

    /// Spawn with extra arguments passed to the reader binary.
    pub fn spawn_with_args(program: impl Into<PathBuf>, args: Vec<String>) -> Result<Self> {
        let mut source = Self {
            program: program.into(),
            args,
            child: None,
            rx: None,
            pump: None,
            alive: Arc::new(AtomicBool::new(false)),
            last_spawn: None,
        };
        source.start()?;
        Ok(source)
    }

    fn start(&mut self) -> Result<()> {
        self.last_spawn = Some(Instant::now());

        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .stdin(Stdio::null())
            .spawn()?;

        // Piped stdout is always present after a successful spawn.
        let stdout = child.stdout.take().expect("piped child stdout");
        let (tx, rx) = sync_channel(CHANNEL_CAPACITY);
        let alive = Arc::new(AtomicBool::new(true));

        let pump = thread::spawn({
            let alive = Arc::clone(&alive);
            move || pump_lines(stdout, tx, alive)
        });

        log::info!("reader process started: {}", self.program.display());
        self.child = Some(child);
        self.rx = Some(rx);
        self.pump = Some(pump);
        self.alive = alive;
        Ok(())
    }

    fn respawn_due(&self) -> bool {
        self.last_spawn
            .map(|t| t.elapsed() >= RESPAWN_BACKOFF)
            .unwrap_or(true)
    }

    fn reap(&mut self) {
        if let Some(mut child) = self.child.take() {
            // A child that closed stdout may still be running; the
            // arbiter's tick must never block on it.
            let _ = child.kill();
            wait_bounded(&mut child);
        }
        if let Some(pump) = self.pump.take() {
            // The pump exits as soon as the pipe closes, so this join is
            // bounded once the child is gone.
            let _ = pump.join();
        }
        self.rx = None;
    }
}

/// Wait for a killed child within [`KILL_GRACE`], then abandon it.
fn wait_bounded(child: &mut Child) {
    let deadline = Instant::now() + KILL_GRACE;
    loop {
        match child.try_wait() {
            Ok(Some(_)) => break,
            Ok(None) if Instant::now() < deadline => {
                thread::sleep(Duration::from_millis(10))
            }
            Ok(None) => {
                log::warn!("reader process did not exit within grace period, abandoning");
                break;
            }
            Err(e) => {
                log::warn!("waiting for reader process failed: {e}");
                break;
            }
        }
    }
}

fn pump_lines(
    stdout: std::process::ChildStdout,
    tx: SyncSender<WireEvent>,
    alive: Arc<AtomicBool>,
) {
    for line in BufReader::new(stdout).lines() {
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                log::warn!("reader pipe read failed: {e}");
                break;
            }
        };
        if let Some(event) = WireEvent::parse_line(&line) {
            // Drop on overflow; blocking here would back-pressure the
            // reader's stdout and stall input delivery entirely.
            let _ = tx.try_send(event);
        }
    }
    alive.store(false, Ordering::SeqCst);
}

impl EventSource for ReaderSource {
    fn poll(&mut self) -> Vec<WireEvent> {
        // Drain before looking at liveness so the tail of a dying
        // stream is not lost with the channel.
        let mut events = Vec::new();
        if let Some(rx) = &self.rx {
            loop {
                match rx.try_recv() {
                    Ok(event) => events.push(event),
                    Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
                }
            }
        }

        if !self.is_alive() {
            self.reap();
            if self.respawn_due() {
                log::warn!("reader process died, respawning");
                if let Err(e) = self.start() {
                    log::warn!("reader respawn failed: {e}");
                }
            }
        }

        events
    }

    fn is_alive(&self) -> bool {
        self.child.is_some() && self.alive.load(Ordering::SeqCst)
    }

    fn shutdown(&mut self) {
        if self.child.is_none() && self.pump.is_none() {
            return;
        }
        self.reap();
        self.alive.store(false, Ordering::SeqCst);
    }
}

impl Drop for ReaderSource {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Host-provided global cursor query for platforms that allow one.
pub trait CursorProbe {
    /// Sample the global cursor, `None` when the query fails.
    fn cursor(&mut self) -> Option<Point>;
}

impl<F> CursorProbe for F
where
    F: FnMut() -> Option<Point>,
{
    fn cursor(&mut self) -> Option<Point> {
        self()
    }
}

/// [`EventSource`] that samples a [`CursorProbe`] once per poll and
/// synthesizes cursor events on change, heartbeats otherwise. Every
/// successful probe sample counts as traffic, so a parked cursor is
/// idleness, never degradation; only failing probes go silent. Used
/// where the windowing layer exposes global cursor queries directly and
/// no helper process is needed.
pub struct NativeSource<P: CursorProbe> {
    probe: P,
    last: Option<Point>,
}

impl<P: CursorProbe> NativeSource<P> {
    pub fn new(probe: P) -> Self {
        Self { probe, last: None }
    }
}

impl<P: CursorProbe> EventSource for NativeSource<P> {
    fn poll(&mut self) -> Vec<WireEvent> {
        let Some(p) = self.probe.cursor() else {
            return Vec::new();
        };
        if self.last != Some(p) {
            self.last = Some(p);
            vec![WireEvent::Cursor { x: p.x, y: p.y }]
        } else {
            vec![WireEvent::Heartbeat]
        }
    }

    fn is_alive(&self) -> bool {
        true
    }

    fn shutdown(&mut self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn native_source_reports_changes_and_heartbeats_otherwise() {
        let samples = std::cell::RefCell::new(vec![
            Some(Point::new(10, 10)),
            Some(Point::new(10, 10)),
            Some(Point::new(20, 30)),
            None,
        ]);
        let mut source = NativeSource::new(|| samples.borrow_mut().remove(0));

        assert_eq!(source.poll(), vec![WireEvent::Cursor { x: 10, y: 10 }]);
        // Unchanged sample: still traffic, so the consumer's watchdog
        // never mistakes a parked cursor for a dead transport.
        assert_eq!(source.poll(), vec![WireEvent::Heartbeat]);
        assert_eq!(source.poll(), vec![WireEvent::Cursor { x: 20, y: 30 }]);
        // A failed probe sample produces nothing, not even a heartbeat.
        assert_eq!(source.poll(), vec![]);
        assert!(source.is_alive());
    }

    #[cfg(unix)]
    #[test]
    fn reader_source_parses_child_output_and_notices_death() {
        // A stand-in reader that emits two lines (one corrupt) and exits.
        let mut source = ReaderSource::spawn_with_args(
            "sh",
            vec![
                "-c".into(),
                r#"printf '{"type":"heartbeat"}\n{"type":"curso\n{"type":"cursor","x":5,"y":6}\n'"#
                    .into(),
            ],
        )
        .expect("spawn sh");

        let deadline = Instant::now() + Duration::from_secs(5);
        let mut events = Vec::new();
        while Instant::now() < deadline && events.len() < 2 {
            events.extend(source.poll());
            thread::sleep(Duration::from_millis(10));
        }
        assert_eq!(
            events,
            vec![WireEvent::Heartbeat, WireEvent::Cursor { x: 5, y: 6 }]
        );

        // The child has exited; the source must report dead before the
        // respawn backoff elapses.
        let deadline = Instant::now() + Duration::from_secs(5);
        while Instant::now() < deadline && source.is_alive() {
            thread::sleep(Duration::from_millis(10));
        }
        assert!(!source.is_alive());
        source.shutdown();
    }

    #[cfg(unix)]
    #[test]
    fn poll_stays_bounded_when_a_lingering_child_closes_stdout() {
        // The child closes stdout immediately but keeps running; reaping
        // it must not stall the consumer's tick loop.
        let mut source = ReaderSource::spawn_with_args(
            "sh",
            vec!["-c".into(), "exec 1>&-; sleep 600".into()],
        )
        .expect("spawn sh");

        let deadline = Instant::now() + Duration::from_secs(5);
        while Instant::now() < deadline && source.is_alive() {
            thread::sleep(Duration::from_millis(10));
        }
        assert!(!source.is_alive());

        let started = Instant::now();
        let _ = source.poll();
        assert!(started.elapsed() < Duration::from_secs(2));
        source.shutdown();
    }

    #[cfg(unix)]
    #[test]
    fn shutdown_terminates_a_long_running_child() {
        let mut source =
            ReaderSource::spawn_with_args("sh", vec!["-c".into(), "sleep 600".into()])
                .expect("spawn sh");
        assert!(source.is_alive());
        let started = Instant::now();
        source.shutdown();
        assert!(started.elapsed() < Duration::from_secs(5));
        assert!(!source.is_alive());
    }
}
