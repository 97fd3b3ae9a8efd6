//! The reveal actor: drives a [`StreamingText`] on Tokio timers.
//!
//! Each reveal runs as its own task that exclusively owns its
//! `StreamingText`. Callers talk to it through a [`RevealHandle`]:
//!
//! - commands (`set_text`, `skip`) go in over an mpsc channel
//! - [`RevealFrame`] snapshots come out over a watch channel
//!
//! ```text
//! RevealHandle ──Command──→ [reveal task] ──RevealFrame──→ watch subscribers
//!                              │
//!                              └─ wait_for_char(): one sleep at a time
//! ```
//!
//! Because the task owns the only cursor and sleeps on one deadline at a
//! time, two reveal loops can never run for the same text. Dropping the
//! handle closes the command channel and the task exits.

use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, trace};

use crate::{RevealConfig, StreamError, StreamingText};

/// Capacity of the command channel. Commands are rare (user actions).
const COMMAND_BUFFER: usize = 16;

/// A snapshot of what the renderer shows.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RevealFrame {
    /// The revealed prefix, raw (format it with
    /// [`format_spans`](crate::format_spans)).
    pub displayed: String,
    pub complete: bool,
    pub skipped: bool,
    /// Whether a skip control should be offered.
    pub skip_available: bool,
}

impl RevealFrame {
    fn of(text: &StreamingText) -> Self {
        Self {
            displayed: text.displayed().to_string(),
            complete: text.is_complete(),
            skipped: text.is_skipped(),
            skip_available: text.skip_available(),
        }
    }
}

#[derive(Debug)]
enum Command {
    SetText(String),
    Skip {
        reply: oneshot::Sender<bool>,
    },
}

/// Handle to a running reveal.
#[derive(Debug)]
pub struct RevealHandle {
    commands: mpsc::Sender<Command>,
    frames: watch::Receiver<RevealFrame>,
    task: JoinHandle<()>,
}

/// Starts revealing `text` with `config`.
///
/// Must be called from within a Tokio runtime.
pub fn spawn_reveal(text: impl Into<String>, config: RevealConfig) -> RevealHandle {
    spawn_reveal_with(StreamingText::new(text, config))
}

/// Starts revealing a prepared [`StreamingText`] (e.g. one with an
/// `on_complete` callback attached).
pub fn spawn_reveal_with(mut streaming: StreamingText) -> RevealHandle {
    streaming.settle();
    let (commands, rx) = mpsc::channel(COMMAND_BUFFER);
    let (frames_tx, frames) = watch::channel(RevealFrame::of(&streaming));
    let task = tokio::spawn(run(streaming, rx, frames_tx));
    RevealHandle {
        commands,
        frames,
        task,
    }
}

impl RevealHandle {
    /// Replaces the text. A different value restarts the reveal from
    /// index zero; the pending character timer is discarded.
    ///
    /// # Errors
    /// [`StreamError::Closed`] if the reveal task is gone.
    pub async fn set_text(&self, text: impl Into<String>) -> Result<(), StreamError> {
        self.commands
            .send(Command::SetText(text.into()))
            .await
            .map_err(|_| StreamError::Closed)
    }

    /// Requests a skip. Returns whether it was honored.
    ///
    /// # Errors
    /// [`StreamError::Closed`] if the reveal task is gone.
    pub async fn skip(&self) -> Result<bool, StreamError> {
        let (reply, rx) = oneshot::channel();
        self.commands
            .send(Command::Skip { reply })
            .await
            .map_err(|_| StreamError::Closed)?;
        rx.await.map_err(|_| StreamError::Closed)
    }

    /// The latest frame.
    pub fn frame(&self) -> RevealFrame {
        self.frames.borrow().clone()
    }

    /// A receiver that observes every frame change.
    pub fn subscribe(&self) -> watch::Receiver<RevealFrame> {
        self.frames.clone()
    }

    /// Waits until the current cycle completes and returns that frame.
    ///
    /// # Errors
    /// [`StreamError::Closed`] if the task stops before completion.
    pub async fn wait_complete(&self) -> Result<RevealFrame, StreamError> {
        let mut frames = self.frames.clone();
        let frame = frames
            .wait_for(|frame| frame.complete)
            .await
            .map_err(|_| StreamError::Closed)?;
        Ok(frame.clone())
    }

    /// Stops the reveal and waits for the task to exit.
    pub async fn shutdown(self) {
        let RevealHandle { commands, task, .. } = self;
        drop(commands);
        if let Err(err) = task.await {
            debug!(error = %err, "reveal task ended abnormally");
        }
    }
}

async fn run(
    mut streaming: StreamingText,
    mut commands: mpsc::Receiver<Command>,
    frames: watch::Sender<RevealFrame>,
) {
    debug!("reveal task started");
    loop {
        tokio::select! {
            command = commands.recv() => match command {
                Some(Command::SetText(text)) => {
                    if streaming.set_text(text) {
                        // An empty replacement completes immediately.
                        streaming.settle();
                    }
                }
                Some(Command::Skip { reply }) => {
                    let honored = streaming.skip();
                    // Publish first so the caller sees the full text on return.
                    publish(&frames, &streaming);
                    let _ = reply.send(honored);
                }
                None => break,
            },
            revealed = streaming.wait_for_char() => {
                trace!(?revealed, "tick");
            }
        }

        publish(&frames, &streaming);
    }
    debug!("reveal task stopped");
}

/// Sends a frame only if something visible changed.
fn publish(frames: &watch::Sender<RevealFrame>, streaming: &StreamingText) {
    frames.send_if_modified(|frame| {
        let next = RevealFrame::of(streaming);
        if *frame == next {
            false
        } else {
            *frame = next;
            true
        }
    });
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_spawn_reveal_publishes_initial_frame() {
        let handle = spawn_reveal("abc", RevealConfig::with_speed(Duration::from_millis(10)));
        assert_eq!(handle.frame(), RevealFrame::default());
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_text_is_complete_immediately() {
        let handle = spawn_reveal("", RevealConfig::default());
        let frame = handle.frame();
        assert!(frame.complete);
        assert_eq!(frame.displayed, "");
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_stops_task_and_closes_frames() {
        let handle = spawn_reveal("abc", RevealConfig::default());
        let frames = handle.subscribe();
        handle.shutdown().await;
        assert!(frames.has_changed().is_err());
    }
}
