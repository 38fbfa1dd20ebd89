//! Timer driver: a dedicated thread that maps wall-clock time onto the core's
//! logical clock and advances it.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender};
use tracing::{debug, info, trace};

use crate::state::Core;
use crate::{Error, Result};

enum DriverCommand {
    /// Advance immediately instead of waiting for the next interval.
    Wake,
    Shutdown,
}

/// Owns the driver thread. Dropping it stops and joins the thread.
pub struct TimerDriver {
    command_sender: Sender<DriverCommand>,
    running: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl TimerDriver {
    /// Start driving `core`, waking every `interval_ms`.
    ///
    /// Logical time continues from the core's current time.
    pub fn spawn(core: Core, interval_ms: u32) -> Result<Self> {
        let (command_sender, command_receiver) = bounded(64);
        let running = Arc::new(AtomicBool::new(true));
        let running_clone = Arc::clone(&running);
        let interval = Duration::from_millis(interval_ms.max(1) as u64);

        let thread = thread::Builder::new()
            .name("keytide-timer".to_string())
            .spawn(move || {
                Self::driver_thread(core, command_receiver, interval);
                running_clone.store(false, Ordering::SeqCst);
            })?;

        Ok(Self {
            command_sender,
            running,
            thread: Some(thread),
        })
    }

    fn driver_thread(core: Core, command_receiver: Receiver<DriverCommand>, interval: Duration) {
        let base = core.now();
        let started = Instant::now();
        info!(base, interval_ms = interval.as_millis() as u64, "timer driver started");

        loop {
            match command_receiver.recv_timeout(interval) {
                Ok(DriverCommand::Wake) | Err(RecvTimeoutError::Timeout) => {
                    let now = base + started.elapsed().as_millis() as u64;
                    let delivered = core.advance_to(now);
                    if delivered > 0 {
                        trace!(now, delivered, "driver tick");
                    }
                }
                Ok(DriverCommand::Shutdown) => break,
                Err(RecvTimeoutError::Disconnected) => {
                    debug!("timer driver command channel closed");
                    break;
                }
            }
        }
        info!("timer driver stopped");
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Ask the thread to advance now rather than at its next interval.
    pub fn wake(&self) -> Result<()> {
        if !self.is_running() {
            return Err(Error::DriverStopped);
        }
        // A full queue already guarantees a pending wake-up.
        match self.command_sender.try_send(DriverCommand::Wake) {
            Ok(()) | Err(crossbeam_channel::TrySendError::Full(_)) => Ok(()),
            Err(crossbeam_channel::TrySendError::Disconnected(_)) => Err(Error::DriverStopped),
        }
    }

    /// Stop the thread and wait for it to exit.
    pub fn stop(&mut self) {
        let _ = self.command_sender.send(DriverCommand::Shutdown);
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                debug!("timer driver thread panicked");
            }
        }
        self.running.store(false, Ordering::SeqCst);
    }
}

impl Drop for TimerDriver {
    fn drop(&mut self) {
        self.stop();
    }
}
