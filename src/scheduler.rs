// src/scheduler.rs

//! The background thread that fires ticks.
//!
//! The worker owns nothing but a `Weak` to whatever it drives and the
//! receiving end of a stop channel. It sleeps by waiting on that channel, so
//! a stop request wakes it immediately instead of at the end of the interval.

use std::sync::Weak;
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle, ThreadId};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SchedulerState {
    #[default]
    Stopped,
    Running,
}

/// Handle on a running tick thread.
pub struct Worker {
    stop_tx: Sender<()>,
    handle: JoinHandle<()>,
}

impl Worker {
    /// Spawns a thread calling `tick` once per `interval`, first after one
    /// full interval. It exits when stopped or once `target` is gone.
    pub fn spawn<T, F>(target: Weak<T>, interval: Duration, tick: F) -> std::io::Result<Self>
    where
        T: Send + Sync + 'static,
        F: Fn(&T) + Send + 'static,
    {
        let (stop_tx, stop_rx) = mpsc::channel::<()>();
        let handle = thread::Builder::new()
            .name("market-tick".into())
            .spawn(move || {
                loop {
                    match stop_rx.recv_timeout(interval) {
                        Err(RecvTimeoutError::Timeout) => {
                            let Some(target) = target.upgrade() else {
                                debug!("tick target dropped, worker exiting");
                                break;
                            };
                            tick(&target);
                        }
                        // stop requested, or the handle was dropped
                        Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                    }
                }
            })?;
        Ok(Self { stop_tx, handle })
    }

    pub fn thread_id(&self) -> ThreadId {
        self.handle.thread().id()
    }

    /// Signals the thread and waits for it to finish its current tick.
    ///
    /// Called from the worker thread itself (an observer stopping the
    /// engine) it only signals: the loop exits once the current tick returns.
    pub fn stop(self) {
        let _ = self.stop_tx.send(());
        if thread::current().id() == self.thread_id() {
            return;
        }
        if self.handle.join().is_err() {
            debug!("tick worker ended with a panic");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::time::Instant;

    #[test]
    fn ticks_until_stopped() {
        let counter = Arc::new(AtomicU64::new(0));
        let worker = Worker::spawn(Arc::downgrade(&counter), Duration::from_millis(5), |c| {
            c.fetch_add(1, Ordering::SeqCst);
        })
        .unwrap();
        thread::sleep(Duration::from_millis(60));
        worker.stop();
        let seen = counter.load(Ordering::SeqCst);
        assert!(seen >= 1);
        thread::sleep(Duration::from_millis(30));
        assert_eq!(counter.load(Ordering::SeqCst), seen);
    }

    #[test]
    fn stop_does_not_wait_for_the_interval() {
        let counter = Arc::new(AtomicU64::new(0));
        let worker = Worker::spawn(Arc::downgrade(&counter), Duration::from_secs(30), |_| {}).unwrap();
        let started = Instant::now();
        worker.stop();
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[test]
    fn exits_when_target_dropped() {
        let counter = Arc::new(AtomicU64::new(0));
        let worker = Worker::spawn(Arc::downgrade(&counter), Duration::from_millis(2), |_| {}).unwrap();
        drop(counter);
        // the loop notices the dead target on its next wake-up
        thread::sleep(Duration::from_millis(20));
        assert!(worker.handle.is_finished());
    }
}
