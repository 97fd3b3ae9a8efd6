//! The proactive refresh timer.
//!
//! A single-slot, cancellable scheduled task. Arming replaces (and aborts)
//! whatever was armed before, so at most one refresh is ever pending for a
//! client.
//!
//! ```text
//! arm(delay, job)
//!   └─ timer task: sleep_until(deadline) ──→ spawn(job)
//!                        ▲
//!        abort() on re-arm / cancel / drop
//! ```
//!
//! The job runs in its own task rather than inside the timer task. A
//! successful refresh re-arms this very timer, and that must not abort the
//! refresh that is still finishing up.

use std::future::Future;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant};
use tracing::{debug, warn};

struct Armed {
    handle: JoinHandle<()>,
    deadline: Instant,
}

/// Single-slot cancellable timer.
#[derive(Default)]
pub struct RefreshTimer {
    slot: Mutex<Option<Armed>>,
}

impl RefreshTimer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedules `job` to run after `delay`, replacing any armed job.
    ///
    /// Returns `false` (and schedules nothing) outside a Tokio runtime.
    pub fn arm<F>(&self, delay: Duration, job: F) -> bool
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let Ok(runtime) = Handle::try_current() else {
            warn!("no tokio runtime, proactive refresh not scheduled");
            self.cancel();
            return false;
        };

        let deadline = Instant::now() + delay;
        let handle = runtime.spawn(async move {
            time::sleep_until(deadline).await;
            debug!("refresh timer fired");
            tokio::spawn(job);
        });

        let previous = self.lock().replace(Armed { handle, deadline });
        if let Some(previous) = previous {
            previous.handle.abort();
        }
        debug!(delay_secs = delay.as_secs_f64(), "refresh timer armed");
        true
    }

    /// Disarms the timer. A job that already fired keeps running.
    pub fn cancel(&self) {
        if let Some(armed) = self.lock().take() {
            armed.handle.abort();
            debug!("refresh timer cancelled");
        }
    }

    /// `true` while a job is scheduled and has not fired yet.
    pub fn is_armed(&self) -> bool {
        self.lock()
            .as_ref()
            .is_some_and(|armed| !armed.handle.is_finished())
    }

    /// When the armed job fires, if one is armed.
    pub fn deadline(&self) -> Option<Instant> {
        self.lock()
            .as_ref()
            .filter(|armed| !armed.handle.is_finished())
            .map(|armed| armed.deadline)
    }

    fn lock(&self) -> MutexGuard<'_, Option<Armed>> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for RefreshTimer {
    fn drop(&mut self) {
        self.cancel();
    }
}

impl std::fmt::Debug for RefreshTimer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RefreshTimer")
            .field("deadline", &self.deadline())
            .finish()
    }
}
