//! Polling driver: a dedicated ticking thread, commanded over a channel.
//!
//! The scheduler must be poked at a steady short cadence even when the host
//! thread is busy, so the cadence lives on its own worker thread. Nothing is
//! shared across that boundary: commands flow in over one mpsc channel and
//! tick notifications flow out over another. If the OS refuses the thread,
//! the host falls back to ticking from its own loop, same interface on the
//! scheduler side with degraded isolation.

use std::io;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use tracing::debug;

enum DriverCommand {
    Start,
    Stop,
    SetInterval(Duration),
    Shutdown,
}

/// Handle to the ticking thread. Dropping it shuts the thread down.
pub struct PollingDriver {
    commands: Sender<DriverCommand>,
    handle: Option<JoinHandle<()>>,
}

impl PollingDriver {
    /// Spawn the ticking thread. While started, it sends `tick_msg` clones
    /// over `ticks` every `interval`. `Err` means the OS refused the thread
    /// and the caller should degrade to same-thread cadence.
    pub fn spawn<T>(interval: Duration, ticks: Sender<T>, tick_msg: T) -> io::Result<Self>
    where
        T: Clone + Send + 'static,
    {
        let (commands, command_rx) = mpsc::channel();
        let handle = thread::Builder::new()
            .name("clave-polling".into())
            .spawn(move || run(command_rx, ticks, tick_msg, interval))?;
        Ok(Self {
            commands,
            handle: Some(handle),
        })
    }

    /// Begin ticking. Idempotent: starting a started driver keeps its cadence.
    pub fn start(&self) {
        let _ = self.commands.send(DriverCommand::Start);
    }

    /// Pause ticking. Idempotent.
    pub fn stop(&self) {
        let _ = self.commands.send(DriverCommand::Stop);
    }

    /// Replace the cadence atomically: the next tick is one new interval
    /// away, with no overlapping timers and no gap longer than one interval.
    pub fn set_interval(&self, interval: Duration) {
        let _ = self.commands.send(DriverCommand::SetInterval(interval));
    }
}

impl Drop for PollingDriver {
    fn drop(&mut self) {
        let _ = self.commands.send(DriverCommand::Shutdown);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

fn run<T: Clone>(
    commands: Receiver<DriverCommand>,
    ticks: Sender<T>,
    tick_msg: T,
    mut interval: Duration,
) {
    let mut running = false;
    let mut deadline = Instant::now();

    loop {
        let command = if running {
            // Absolute deadlines: command traffic must not stretch the period.
            let timeout = deadline.saturating_duration_since(Instant::now());
            match commands.recv_timeout(timeout) {
                Ok(command) => Some(command),
                Err(RecvTimeoutError::Timeout) => {
                    if ticks.send(tick_msg.clone()).is_err() {
                        // Receiver gone: the host shut down without us.
                        break;
                    }
                    deadline += interval;
                    // After a long stall, one tick is enough; the scheduler
                    // catches up from a single invocation, so don't burst.
                    let now = Instant::now();
                    if deadline < now {
                        deadline = now + interval;
                    }
                    None
                }
                Err(RecvTimeoutError::Disconnected) => break,
            }
        } else {
            match commands.recv() {
                Ok(command) => Some(command),
                Err(_) => break,
            }
        };

        match command {
            Some(DriverCommand::Start) => {
                if !running {
                    running = true;
                    deadline = Instant::now() + interval;
                }
            }
            Some(DriverCommand::Stop) => running = false,
            Some(DriverCommand::SetInterval(new_interval)) => {
                interval = new_interval;
                if running {
                    deadline = Instant::now() + new_interval;
                }
            }
            Some(DriverCommand::Shutdown) => break,
            None => {}
        }
    }

    debug!("polling driver thread exiting");
}
