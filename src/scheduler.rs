//! Cancellable repeating timer.
//!
//! The storage core schedules recurring work (the auto-backup tick) without
//! any UI toolkit event loop. A [`TickHandle`] owns the schedule: cancelling
//! it (or dropping it) stops the pending tick and joins the worker thread,
//! so no tick can fire after cancellation returns.

use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::thread::JoinHandle;
use std::time::Duration;

pub struct TickHandle {
    stop: Sender<()>,
    thread: Option<JoinHandle<()>>,
}

impl TickHandle {
    /// Stop the schedule and wait for the worker to finish. No tick runs
    /// after this returns.
    pub fn cancel(mut self) {
        self.stop_and_join();
    }

    fn stop_and_join(&mut self) {
        let _ = self.stop.send(());
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

impl Drop for TickHandle {
    fn drop(&mut self) {
        self.stop_and_join();
    }
}

/// Run `tick` immediately and then once per `interval` until it returns
/// `false` (self-cancel) or the handle is cancelled.
pub fn spawn_repeating<F>(interval: Duration, mut tick: F) -> TickHandle
where
    F: FnMut() -> bool + Send + 'static,
{
    let (stop, ticks) = mpsc::channel::<()>();
    let thread = std::thread::spawn(move || loop {
        if !tick() {
            break;
        }
        match ticks.recv_timeout(interval) {
            Err(RecvTimeoutError::Timeout) => {}
            Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
        }
    });
    TickHandle {
        stop,
        thread: Some(thread),
    }
}
