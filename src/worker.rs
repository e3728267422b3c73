//! Per-panel worker thread: owns the serial connection, drains the render
//! queue, and rediscovers the panel after transport failures.
//!
//! The control loop never touches a serial port. It pushes
//! [`RenderCommand`]s into a small bounded queue and stalls when the queue
//! is full, so a slow or dead panel throttles the producer instead of
//! growing a backlog of stale frames. Each worker reconnects on its own:
//! a failed write drops the connection, the frame is lost (the next tick
//! supersedes it anyway), and discovery retries by the panel's stable USB
//! topology identity.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use thiserror::Error;

use crate::device::{self, DeviceScan, PanelIdentity};
use crate::frame::{Frame, Panel};
use crate::protocol::{self, Transport};
use crate::sync::{self, Consumer, Producer, PushError, Timeout};
use crate::trace::{debug, info, warn};

/// Commands queued ahead of the wire. Two is enough to decouple one render
/// tick from one in-flight transmission without accumulating stale frames.
pub const QUEUE_CAPACITY: usize = 2;

/// How long a pop waits before the worker rechecks its shutdown flag.
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Animation request riding along with a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnimateDirective {
    /// Leave the device-side animation state as it is.
    Unchanged,
    Start,
    Stop,
}

/// One unit of work for a panel worker.
#[derive(Debug, Clone)]
pub struct RenderCommand {
    pub frame: Frame,
    pub animate: AnimateDirective,
    /// Device global intensity for this frame, when it changed.
    pub brightness: Option<u8>,
}

impl RenderCommand {
    #[must_use]
    pub fn new(frame: Frame) -> Self {
        Self {
            frame,
            animate: AnimateDirective::Unchanged,
            brightness: None,
        }
    }
}

/// The worker's queue is gone, meaning the worker thread itself exited.
#[derive(Debug, Error)]
#[error("panel worker for {0} is gone")]
pub struct WorkerGone(pub Panel);

/// Producer-side handle to one panel worker.
pub struct PanelHandle {
    producer: Producer<RenderCommand>,
    handle: JoinHandle<()>,
    panel: Panel,
}

impl PanelHandle {
    /// Queue a command, blocking while the worker's queue is full.
    ///
    /// # Errors
    /// Fails only if the worker thread has exited.
    pub fn enqueue(&self, command: RenderCommand) -> Result<(), WorkerGone> {
        let mut pending = command;
        loop {
            match self.producer.push_blocking(pending, Timeout::Infinite) {
                Ok(()) => return Ok(()),
                Err(PushError::Disconnected(_)) => return Err(WorkerGone(self.panel)),
                Err(PushError::Full(returned)) => pending = returned,
            }
        }
    }

    #[must_use]
    pub fn panel(&self) -> Panel {
        self.panel
    }

    /// Wait for the worker thread to finish. Call after raising shutdown.
    pub fn join(self) {
        drop(self.producer);
        if self.handle.join().is_err() {
            warn!(panel = %self.panel, "panel worker panicked");
        }
    }
}

/// Spawn a worker thread for one panel.
///
/// # Errors
/// Fails only if the OS refuses to spawn the thread.
pub fn spawn(
    panel: Panel,
    identity: PanelIdentity,
    scan: Box<dyn DeviceScan>,
    shutdown: Arc<AtomicBool>,
    reconnect_backoff: Duration,
) -> std::io::Result<PanelHandle> {
    let (producer, consumer) = sync::channel(QUEUE_CAPACITY);
    let thread_name = format!("panel-{panel}");
    let handle = thread::Builder::new().name(thread_name).spawn(move || {
        let mut worker = Worker {
            panel,
            identity,
            scan,
            shutdown,
            reconnect_backoff,
            connection: None,
            animating: None,
            brightness: None,
        };
        worker.run(&consumer);
    })?;
    Ok(PanelHandle {
        producer,
        handle,
        panel,
    })
}

struct Worker {
    panel: Panel,
    identity: PanelIdentity,
    scan: Box<dyn DeviceScan>,
    shutdown: Arc<AtomicBool>,
    reconnect_backoff: Duration,
    connection: Option<Box<dyn Transport>>,
    /// Device-side animation state as last commanded. `None` after a
    /// reconnect, forcing the next directive through.
    animating: Option<bool>,
    brightness: Option<u8>,
}

impl Worker {
    fn run(&mut self, consumer: &Consumer<RenderCommand>) {
        info!(panel = %self.panel, identity = %self.identity, "panel worker started");
        loop {
            if self.shutdown.load(Ordering::Relaxed) {
                break;
            }
            let Some(command) = consumer.pop_blocking(Timeout::Duration(POLL_INTERVAL)) else {
                if consumer.is_disconnected() {
                    break;
                }
                continue;
            };
            if let Err(err) = self.transmit(&command) {
                warn!(panel = %self.panel, error = %err, "panel write failed, dropping connection");
                self.disconnect();
                thread::sleep(self.reconnect_backoff);
            }
        }
        self.shutdown_device();
        info!(panel = %self.panel, "panel worker stopped");
    }

    fn transmit(&mut self, command: &RenderCommand) -> Result<(), TransmitFailure> {
        self.ensure_connected()?;
        let Some(connection) = self.connection.as_mut() else {
            return Err(TransmitFailure::NotFound);
        };
        if let Some(level) = command.brightness {
            if self.brightness != Some(level) {
                protocol::send_brightness(connection.as_mut(), level)?;
                self.brightness = Some(level);
            }
        }
        match command.animate {
            AnimateDirective::Unchanged => {}
            AnimateDirective::Start if self.animating != Some(true) => {
                protocol::send_animate(connection.as_mut(), true)?;
                self.animating = Some(true);
            }
            AnimateDirective::Stop if self.animating != Some(false) => {
                protocol::send_animate(connection.as_mut(), false)?;
                self.animating = Some(false);
            }
            AnimateDirective::Start | AnimateDirective::Stop => {}
        }
        protocol::send_frame(connection.as_mut(), &command.frame)?;
        Ok(())
    }

    fn ensure_connected(&mut self) -> Result<(), TransmitFailure> {
        if self.connection.is_some() {
            return Ok(());
        }
        let candidate = device::find_panel(self.scan.as_ref(), &self.identity)?
            .ok_or(TransmitFailure::NotFound)?;
        debug!(panel = %self.panel, port = %candidate.port_name, "reconnecting panel");
        let mut connection = self.scan.open(&candidate)?;
        protocol::send_display_on(connection.as_mut(), true)?;
        self.connection = Some(connection);
        Ok(())
    }

    fn disconnect(&mut self) {
        self.connection = None;
        // Device state is unknown after a reconnect; resend on next command.
        self.animating = None;
        self.brightness = None;
    }

    /// Best effort: blank and release the panel so it does not keep showing
    /// the last frame after the daemon exits.
    fn shutdown_device(&mut self) {
        let Some(connection) = self.connection.as_mut() else {
            return;
        };
        let blank = Frame::new();
        if protocol::send_frame(connection.as_mut(), &blank).is_err() {
            return;
        }
        let _ = protocol::send_animate(connection.as_mut(), false);
    }
}

#[derive(Debug, Error)]
enum TransmitFailure {
    #[error(transparent)]
    Discovery(#[from] device::DiscoveryError),
    #[error(transparent)]
    Transmit(#[from] protocol::TransmitError),
    #[error("panel not present")]
    NotFound,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::{DiscoveryError, PortCandidate};
    use crate::frame::ROWS;
    use crate::protocol::Command;
    use std::sync::Mutex;

    /// Shared command log plus a set of write indices to fail.
    #[derive(Default)]
    struct WireLog {
        writes: Vec<Vec<u8>>,
        fail_at: Vec<usize>,
        opens: usize,
    }

    struct SharedTransport(Arc<Mutex<WireLog>>);

    impl Transport for SharedTransport {
        fn send(&mut self, bytes: &[u8]) -> std::io::Result<()> {
            let mut log = self.0.lock().unwrap();
            let index = log.writes.len();
            if log.fail_at.contains(&index) {
                log.fail_at.retain(|&i| i != index);
                return Err(std::io::Error::new(
                    std::io::ErrorKind::BrokenPipe,
                    "injected",
                ));
            }
            log.writes.push(bytes.to_vec());
            Ok(())
        }
    }

    struct ScriptedScan {
        log: Arc<Mutex<WireLog>>,
        present: bool,
    }

    impl DeviceScan for ScriptedScan {
        fn scan(&self) -> Result<Vec<PortCandidate>, DiscoveryError> {
            if !self.present {
                return Ok(Vec::new());
            }
            Ok(vec![PortCandidate {
                port_name: "mock0".to_owned(),
                location: "1-3.2".to_owned(),
            }])
        }

        fn open(&self, _candidate: &PortCandidate) -> Result<Box<dyn Transport>, DiscoveryError> {
            self.log.lock().unwrap().opens += 1;
            Ok(Box::new(SharedTransport(Arc::clone(&self.log))))
        }
    }

    fn start_worker(log: &Arc<Mutex<WireLog>>, present: bool) -> (PanelHandle, Arc<AtomicBool>) {
        let shutdown = Arc::new(AtomicBool::new(false));
        let handle = spawn(
            Panel::Left,
            PanelIdentity::new("1-3.2"),
            Box::new(ScriptedScan {
                log: Arc::clone(log),
                present,
            }),
            Arc::clone(&shutdown),
            Duration::from_millis(1),
        )
        .unwrap();
        (handle, shutdown)
    }

    fn wait_for<F: Fn(&WireLog) -> bool>(log: &Arc<Mutex<WireLog>>, predicate: F) {
        for _ in 0..200 {
            if predicate(&log.lock().unwrap()) {
                return;
            }
            thread::sleep(Duration::from_millis(5));
        }
        panic!("condition not reached");
    }

    fn stop(handle: PanelHandle, shutdown: &Arc<AtomicBool>) {
        shutdown.store(true, Ordering::Relaxed);
        handle.join();
    }

    #[test]
    fn frame_reaches_the_wire() {
        let log = Arc::new(Mutex::new(WireLog::default()));
        let (handle, shutdown) = start_worker(&log, true);

        let mut frame = Frame::new();
        frame.set(0, 0, 9);
        handle.enqueue(RenderCommand::new(frame)).unwrap();
        wait_for(&log, |l| l.writes.len() >= ROWS + 2);

        let wire = log.lock().unwrap();
        // Connection setup powers the display, then the frame follows.
        assert_eq!(wire.writes[0][2], Command::DisplayOn as u8);
        assert_eq!(wire.writes[1][2], Command::StageCol as u8);
        assert_eq!(wire.writes[ROWS + 1][2], Command::FlushCols as u8);
        drop(wire);
        stop(handle, &shutdown);
    }

    #[test]
    fn animate_sent_only_on_state_change() {
        let log = Arc::new(Mutex::new(WireLog::default()));
        let (handle, shutdown) = start_worker(&log, true);

        for _ in 0..3 {
            let mut command = RenderCommand::new(Frame::new());
            command.animate = AnimateDirective::Start;
            handle.enqueue(command).unwrap();
        }
        wait_for(&log, |l| l.writes.len() >= 3 * (ROWS + 1) + 2);

        let wire = log.lock().unwrap();
        let animates = wire
            .writes
            .iter()
            .filter(|w| w[2] == Command::Animate as u8)
            .count();
        assert_eq!(animates, 1);
        drop(wire);
        stop(handle, &shutdown);
    }

    #[test]
    fn brightness_sent_only_when_it_changes() {
        let log = Arc::new(Mutex::new(WireLog::default()));
        let (handle, shutdown) = start_worker(&log, true);

        for level in [70, 70, 80] {
            let mut command = RenderCommand::new(Frame::new());
            command.brightness = Some(level);
            handle.enqueue(command).unwrap();
        }
        wait_for(&log, |l| l.writes.len() >= 3 * (ROWS + 1) + 3);

        let wire = log.lock().unwrap();
        let levels: Vec<u8> = wire
            .writes
            .iter()
            .filter(|w| w[2] == Command::Brightness as u8)
            .map(|w| w[3])
            .collect();
        assert_eq!(levels, vec![70, 80]);
        drop(wire);
        stop(handle, &shutdown);
    }

    #[test]
    fn write_failure_reconnects_and_next_frame_lands() {
        let log = Arc::new(Mutex::new(WireLog::default()));
        log.lock().unwrap().fail_at.push(3);
        let (handle, shutdown) = start_worker(&log, true);

        handle.enqueue(RenderCommand::new(Frame::new())).unwrap();
        handle.enqueue(RenderCommand::new(Frame::new())).unwrap();
        // Failed frame is dropped; the second completes on a new connection.
        wait_for(&log, |l| {
            l.opens >= 2
                && l.writes
                    .iter()
                    .filter(|w| w[2] == Command::FlushCols as u8)
                    .count()
                    >= 1
        });
        stop(handle, &shutdown);
    }

    #[test]
    fn missing_panel_keeps_worker_alive() {
        let log = Arc::new(Mutex::new(WireLog::default()));
        let (handle, shutdown) = start_worker(&log, false);

        handle.enqueue(RenderCommand::new(Frame::new())).unwrap();
        thread::sleep(Duration::from_millis(50));
        assert!(log.lock().unwrap().writes.is_empty());
        // Still accepting work.
        handle.enqueue(RenderCommand::new(Frame::new())).unwrap();
        stop(handle, &shutdown);
    }

    #[test]
    fn shutdown_blanks_the_panel() {
        let log = Arc::new(Mutex::new(WireLog::default()));
        let (handle, shutdown) = start_worker(&log, true);

        let mut frame = Frame::new();
        frame.set(4, 4, 255);
        handle.enqueue(RenderCommand::new(frame)).unwrap();
        wait_for(&log, |l| l.writes.len() >= ROWS + 1);
        stop(handle, &shutdown);

        let wire = log.lock().unwrap();
        // The final staged rows are all dark.
        let last_frame: Vec<&Vec<u8>> = wire
            .writes
            .iter()
            .filter(|w| w[2] == Command::StageCol as u8)
            .rev()
            .take(ROWS)
            .collect();
        assert_eq!(last_frame.len(), ROWS);
        assert!(last_frame.iter().all(|w| w[4..].iter().all(|&b| b == 0)));
    }
}
