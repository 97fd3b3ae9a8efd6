//! The reveal state machine.
//!
//! [`StreamingText`] owns one reveal cycle: a cursor over the input's
//! characters, the revealed prefix, and the completion bookkeeping. It is
//! designed to sit inside an actor's `tokio::select!` loop:
//!
//! ```text
//! loop {
//!     tokio::select! {
//!         cmd = commands.recv() => { /* set_text / skip */ }
//!         _ = text.wait_for_char() => { /* publish frame */ }
//!     }
//! }
//! ```
//!
//! It can also be stepped by hand with [`StreamingText::advance`], which
//! is what the unit tests do.
//!
//! ## Lifecycle
//!
//! ```text
//! new / set_text ──→ [Revealing] ──advance × n──→ [Complete]
//!                        │                            ▲
//!                        └────────── skip() ──────────┘ (skipped = true)
//! ```
//!
//! The completion callback fires exactly once per cycle, whichever way
//! the cycle ends.

use std::fmt;
use std::time::Duration;

use tokio::time::{self, Instant};
use tracing::{debug, trace, warn};

use crate::cadence::char_delay;
use crate::format::{Span, format_spans};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Reveal settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RevealConfig {
    /// Base delay per character.
    pub speed: Duration,

    /// Apply inline formatting in [`StreamingText::spans`].
    pub formatting: bool,

    /// Honor [`StreamingText::skip`].
    pub skippable: bool,

    /// The skip affordance appears once more than this many characters
    /// are on screen.
    pub skip_threshold: usize,
}

impl RevealConfig {
    /// Slowest accepted base speed.
    pub const MAX_SPEED: Duration = Duration::from_secs(1);

    /// Clamps `speed` into `(0, MAX_SPEED]`.
    pub fn validated(mut self) -> Self {
        if self.speed > Self::MAX_SPEED {
            warn!(
                speed_ms = self.speed.as_millis() as u64,
                max_ms = Self::MAX_SPEED.as_millis() as u64,
                "reveal speed exceeds maximum, clamping"
            );
            self.speed = Self::MAX_SPEED;
        }
        if self.speed.is_zero() {
            self.speed = Duration::from_millis(1);
        }
        self
    }

    /// Config with a given base speed and defaults otherwise.
    pub fn with_speed(speed: Duration) -> Self {
        Self {
            speed,
            ..Self::default()
        }
    }
}

impl Default for RevealConfig {
    fn default() -> Self {
        Self {
            speed: Duration::from_millis(25),
            formatting: true,
            skippable: true,
            skip_threshold: 50,
        }
    }
}

// ---------------------------------------------------------------------------
// StreamingText
// ---------------------------------------------------------------------------

type Callback = Box<dyn FnMut() + Send + 'static>;

/// Progressive reveal of one string.
pub struct StreamingText {
    config: RevealConfig,
    text: String,
    /// Byte offset of the cursor in `text`; everything before it is shown.
    cursor: usize,
    /// Characters revealed so far.
    revealed_chars: usize,
    complete: bool,
    skipped: bool,
    completion_fired: bool,
    /// When the next character is due (Tokio instant for `sleep_until`).
    next_char: Option<Instant>,
    on_complete: Option<Callback>,
}

impl StreamingText {
    pub fn new(text: impl Into<String>, config: RevealConfig) -> Self {
        let mut streaming = Self {
            config: config.validated(),
            text: text.into(),
            cursor: 0,
            revealed_chars: 0,
            complete: false,
            skipped: false,
            completion_fired: false,
            next_char: None,
            on_complete: None,
        };
        streaming.schedule();
        debug!(
            chars = streaming.text.chars().count(),
            speed_ms = streaming.config.speed.as_millis() as u64,
            "reveal created"
        );
        streaming
    }

    /// Registers the completion callback.
    pub fn on_complete(mut self, callback: impl FnMut() + Send + 'static) -> Self {
        self.on_complete = Some(Box::new(callback));
        self
    }

    /// Replaces the text. A different value starts a new cycle from index
    /// zero; the same value is a no-op. Returns whether a reset happened.
    pub fn set_text(&mut self, text: impl Into<String>) -> bool {
        let text = text.into();
        if text == self.text {
            return false;
        }
        self.text = text;
        self.cursor = 0;
        self.revealed_chars = 0;
        self.complete = false;
        self.skipped = false;
        self.completion_fired = false;
        self.schedule();
        debug!(chars = self.text.chars().count(), "reveal reset for new text");
        true
    }

    /// Delay before the next character, or `None` when nothing remains to
    /// reveal (complete, skipped, or at the end).
    pub fn next_delay(&self) -> Option<Duration> {
        if self.complete {
            return None;
        }
        self.text[self.cursor..]
            .chars()
            .next()
            .map(|c| char_delay(c, self.config.speed))
    }

    /// When the next character is due, if one is pending.
    pub fn deadline(&self) -> Option<Instant> {
        self.next_char
    }

    /// Reveals the next character right away and schedules the one after.
    ///
    /// Reaching the end completes the cycle. Returns the revealed character.
    pub fn advance(&mut self) -> Option<char> {
        let revealed = if self.complete {
            None
        } else {
            let next = self.text[self.cursor..].chars().next();
            if let Some(c) = next {
                self.cursor += c.len_utf8();
                self.revealed_chars += 1;
                trace!(index = self.revealed_chars - 1, ?c, "char revealed");
            }
            next
        };
        self.settle();
        self.schedule();
        revealed
    }

    /// Completes the cycle if the cursor is at the end. An empty text
    /// completes on its first settle.
    pub fn settle(&mut self) {
        if !self.complete && self.cursor >= self.text.len() {
            self.complete = true;
            self.next_char = None;
            debug!(chars = self.revealed_chars, "reveal complete");
            self.fire_completion();
        }
    }

    /// Waits until the next character is due, then reveals it.
    ///
    /// With nothing left to reveal this future pends forever; in a
    /// `tokio::select!` the other branches keep running.
    pub async fn wait_for_char(&mut self) -> Option<char> {
        let Some(due) = self.next_char else {
            std::future::pending::<()>().await;
            unreachable!()
        };
        time::sleep_until(due).await;
        self.advance()
    }

    /// Shows the full text at once and completes the cycle.
    ///
    /// Ignored (returns `false`) when the config is not skippable or the
    /// cycle is already complete.
    pub fn skip(&mut self) -> bool {
        if !self.config.skippable {
            debug!("skip ignored, reveal not skippable");
            return false;
        }
        if self.complete {
            return false;
        }
        self.revealed_chars = self.text.chars().count();
        self.cursor = self.text.len();
        self.skipped = true;
        debug!("reveal skipped");
        self.settle();
        true
    }

    /// Whether a skip control should be offered right now.
    pub fn skip_available(&self) -> bool {
        self.config.skippable && !self.complete && self.revealed_chars > self.config.skip_threshold
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// The revealed prefix.
    pub fn displayed(&self) -> &str {
        &self.text[..self.cursor]
    }

    /// Number of characters revealed.
    pub fn revealed_chars(&self) -> usize {
        self.revealed_chars
    }

    pub fn is_complete(&self) -> bool {
        self.complete
    }

    pub fn is_skipped(&self) -> bool {
        self.skipped
    }

    pub fn config(&self) -> &RevealConfig {
        &self.config
    }

    /// The revealed prefix as spans. Formatting never looks at text that
    /// has not been revealed yet.
    pub fn spans(&self) -> Vec<Span> {
        let shown = self.displayed();
        if self.config.formatting {
            format_spans(shown)
        } else if shown.is_empty() {
            Vec::new()
        } else {
            vec![Span::Text(shown.to_string())]
        }
    }

    fn schedule(&mut self) {
        self.next_char = self.next_delay().map(|delay| Instant::now() + delay);
    }

    fn fire_completion(&mut self) {
        if self.completion_fired {
            return;
        }
        self.completion_fired = true;
        if let Some(callback) = self.on_complete.as_mut() {
            callback();
        }
    }
}

impl fmt::Debug for StreamingText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamingText")
            .field("displayed", &self.displayed())
            .field("revealed_chars", &self.revealed_chars)
            .field("complete", &self.complete)
            .field("skipped", &self.skipped)
            .finish_non_exhaustive()
    }
}
