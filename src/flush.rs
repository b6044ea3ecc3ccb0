//! Flush Scheduler
//!
//! Coalesces mutation signals into at most one persistence pass per
//! interval.
//!
//! ## Timing (trailing edge)
//! ```text
//! signal  ──●──●───●────────────────●──●──────────────
//!           │<── interval ──>│      │<── interval ──>│
//! flush   ───────────────────●──────────────────────●──
//! ```
//! The first signal in an idle window arms the timer; later signals in the
//! same window are absorbed. `cancel()` disarms a pending timer so a forced
//! flush is not followed by a redundant one.
//!
//! With a zero interval there is no worker thread: every signal flushes on
//! the caller's thread.

use std::sync::Weak;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam::channel::{self, Receiver, RecvTimeoutError, Sender};

use crate::error::{Result, ShardexError};

/// Something the scheduler can persist
pub trait FlushTarget: Send + Sync + 'static {
    /// Run one persistence pass
    fn flush_now(&self) -> Result<()>;

    /// Report a failed scheduled pass
    fn flush_failed(&self, err: ShardexError);
}

/// Messages understood by the worker thread
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FlushCommand {
    /// Arm the timer if idle
    Signal,

    /// Disarm a pending timer
    Cancel,

    /// Stop the worker
    Shutdown,
}

/// Timer-backed flush coalescer
pub struct FlushScheduler<T: FlushTarget> {
    /// Coalescing window
    interval: Duration,

    /// Target flushed by the worker (or inline when the interval is zero)
    target: Weak<T>,

    /// Command channel to the worker; `None` in synchronous mode
    commands: Option<Sender<FlushCommand>>,

    /// Worker thread handle
    worker: Option<JoinHandle<()>>,
}

impl<T: FlushTarget> FlushScheduler<T> {
    /// Start a scheduler for `target`
    pub fn spawn(interval: Duration, target: Weak<T>) -> Result<Self> {
        if interval.is_zero() {
            return Ok(Self::inline(target));
        }

        let (tx, rx) = channel::unbounded();
        let worker_target = target.clone();
        let worker = thread::Builder::new()
            .name("shardex-flush".to_string())
            .spawn(move || run_worker(rx, interval, worker_target))
            .map_err(|e| ShardexError::FlushWorker(format!("failed to spawn flush thread: {}", e)))?;

        Ok(Self {
            interval,
            target,
            commands: Some(tx),
            worker: Some(worker),
        })
    }

    /// Scheduler without a worker: every signal flushes on the caller's thread
    pub fn inline(target: Weak<T>) -> Self {
        Self {
            interval: Duration::ZERO,
            target,
            commands: None,
            worker: None,
        }
    }

    /// Request a persistence pass
    pub fn signal(&self) {
        match &self.commands {
            Some(tx) => {
                if tx.send(FlushCommand::Signal).is_err() {
                    tracing::warn!("Flush worker gone, signal dropped");
                }
            }
            None => {
                if let Some(target) = self.target.upgrade() {
                    if let Err(e) = target.flush_now() {
                        target.flush_failed(e);
                    }
                }
            }
        }
    }

    /// Disarm any pending timer
    pub fn cancel(&self) {
        if let Some(tx) = &self.commands {
            let _ = tx.send(FlushCommand::Cancel);
        }
    }

    /// Coalescing window
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Whether signals are handled by a background worker
    pub fn is_background(&self) -> bool {
        self.worker.is_some()
    }
}

impl<T: FlushTarget> Drop for FlushScheduler<T> {
    fn drop(&mut self) {
        if let Some(tx) = self.commands.take() {
            let _ = tx.send(FlushCommand::Shutdown);
        }
        if let Some(worker) = self.worker.take() {
            // The worker may itself drop the last handle to the target
            if worker.thread().id() != thread::current().id() {
                let _ = worker.join();
            }
        }
    }
}

/// Worker loop: wait for a signal, then for the deadline, then flush
fn run_worker<T: FlushTarget>(rx: Receiver<FlushCommand>, interval: Duration, target: Weak<T>) {
    let mut deadline: Option<Instant> = None;

    loop {
        let command = match deadline {
            Some(limit) => {
                let now = Instant::now();
                if now >= limit {
                    None
                } else {
                    match rx.recv_timeout(limit - now) {
                        Ok(command) => Some(command),
                        Err(RecvTimeoutError::Timeout) => None,
                        Err(RecvTimeoutError::Disconnected) => break,
                    }
                }
            }
            None => match rx.recv() {
                Ok(command) => Some(command),
                Err(_) => break,
            },
        };

        match command {
            Some(FlushCommand::Signal) => {
                if deadline.is_none() {
                    deadline = Some(Instant::now() + interval);
                }
            }
            Some(FlushCommand::Cancel) => deadline = None,
            Some(FlushCommand::Shutdown) => break,
            None => {
                deadline = None;
                let Some(target) = target.upgrade() else {
                    break;
                };
                if let Err(e) = target.flush_now() {
                    target.flush_failed(e);
                }
            }
        }
    }

    tracing::debug!("Flush worker stopped");
}
