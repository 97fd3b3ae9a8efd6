//! Per-character reveal cadence.
//!
//! Punctuation slows the reveal down to read like natural pauses; spaces
//! speed it up.

use std::time::Duration;

/// How a character modulates the base delay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CharClass {
    /// `.` `!` `?` ×3
    Terminal,
    /// `,` `;` `:` ×2
    Clause,
    /// `' '` ×0.5
    Space,
    /// Everything else ×1
    Other,
}

impl CharClass {
    pub fn of(c: char) -> Self {
        match c {
            '.' | '!' | '?' => CharClass::Terminal,
            ',' | ';' | ':' => CharClass::Clause,
            ' ' => CharClass::Space,
            _ => CharClass::Other,
        }
    }

    pub fn multiplier(self) -> f64 {
        match self {
            CharClass::Terminal => 3.0,
            CharClass::Clause => 2.0,
            CharClass::Space => 0.5,
            CharClass::Other => 1.0,
        }
    }
}

/// Delay before revealing `c` at base `speed`.
pub fn char_delay(c: char, speed: Duration) -> Duration {
    speed.mul_f64(CharClass::of(c).multiplier())
}
