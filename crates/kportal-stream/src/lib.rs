//! Incremental text reveal for kportal.
//!
//! Shows a string one character at a time to simulate live generation:
//!
//! - **Cadence** ([`char_delay`]): punctuation pauses, spaces hurry
//! - **State machine** ([`StreamingText`]): cursor, completion, skip
//! - **Formatting** ([`format_spans`]): bold, italic, inline code and
//!   line breaks over the revealed prefix only
//! - **Driver** ([`spawn_reveal`]): an actor that runs the reveal on
//!   Tokio timers and publishes [`RevealFrame`]s
//!
//! This crate has no dependency on the session layer.
//!
//! ## Example
//!
//! ```rust
//! use std::time::Duration;
//! use kportal_stream::{RevealConfig, format_spans, render_plain, spawn_reveal};
//!
//! # #[tokio::main(flavor = "current_thread", start_paused = true)]
//! # async fn main() {
//! let handle = spawn_reveal("**Hi**!", RevealConfig::with_speed(Duration::from_millis(10)));
//! let frame = handle.wait_complete().await.unwrap();
//! assert_eq!(render_plain(&format_spans(&frame.displayed)), "Hi!");
//! # }
//! ```

mod cadence;
mod driver;
mod error;
mod format;
mod reveal;

pub use cadence::{CharClass, char_delay};
pub use driver::{RevealFrame, RevealHandle, spawn_reveal, spawn_reveal_with};
pub use error::StreamError;
pub use format::{Span, format_spans, render_ansi, render_plain};
pub use reveal::{RevealConfig, StreamingText};
