//! Inline formatting for revealed text.
//!
//! Recognizes a small markdown-like subset:
//!
//! | Markup      | Span                 |
//! |-------------|----------------------|
//! | `**bold**`  | [`Span::Bold`]       |
//! | `*italic*`  | [`Span::Italic`]     |
//! | `` `code` `` | [`Span::Code`]      |
//! | newline     | [`Span::LineBreak`]  |
//!
//! A marker only opens a span if its closing marker appears later on the
//! same line and the span is non-empty. Otherwise the marker is plain
//! text. This matters mid-reveal: `**bo` renders as the literal `**bo`
//! until the closing `**` has been revealed.

use std::fmt::Write;

use crossterm::style::Stylize;

/// One piece of formatted output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Span {
    Text(String),
    Bold(String),
    Italic(String),
    Code(String),
    LineBreak,
}

/// Splits `input` into formatted spans. Adjacent plain text is merged.
pub fn format_spans(input: &str) -> Vec<Span> {
    let mut spans = Vec::new();
    let mut plain = String::new();
    let mut rest = input;

    while let Some(c) = rest.chars().next() {
        if c == '\n' {
            flush(&mut plain, &mut spans);
            spans.push(Span::LineBreak);
            rest = &rest[1..];
            continue;
        }

        let (marker, make): (&str, fn(String) -> Span) = if rest.starts_with("**") {
            ("**", Span::Bold)
        } else if c == '*' {
            ("*", Span::Italic)
        } else if c == '`' {
            ("`", Span::Code)
        } else {
            plain.push(c);
            rest = &rest[c.len_utf8()..];
            continue;
        };

        let after = &rest[marker.len()..];
        match closing(after, marker) {
            Some(len) if len > 0 => {
                flush(&mut plain, &mut spans);
                spans.push(make(after[..len].to_string()));
                rest = &after[len + marker.len()..];
            }
            _ => {
                plain.push_str(marker);
                rest = after;
            }
        }
    }

    flush(&mut plain, &mut spans);
    spans
}

/// Byte length of the span body before `marker` closes it on this line.
fn closing(after: &str, marker: &str) -> Option<usize> {
    let line = after.find('\n').map_or(after, |end| &after[..end]);
    line.find(marker)
}

fn flush(plain: &mut String, spans: &mut Vec<Span>) {
    if !plain.is_empty() {
        spans.push(Span::Text(std::mem::take(plain)));
    }
}

/// Renders spans as text with all markup removed.
pub fn render_plain(spans: &[Span]) -> String {
    let mut out = String::new();
    for span in spans {
        match span {
            Span::Text(s) | Span::Bold(s) | Span::Italic(s) | Span::Code(s) => out.push_str(s),
            Span::LineBreak => out.push('\n'),
        }
    }
    out
}

/// Renders spans with ANSI styling for terminals: bold, italic, and cyan
/// for inline code.
pub fn render_ansi(spans: &[Span]) -> String {
    let mut out = String::new();
    for span in spans {
        let _ = match span {
            Span::Text(s) => out.write_str(s),
            Span::Bold(s) => write!(out, "{}", s.as_str().bold()),
            Span::Italic(s) => write!(out, "{}", s.as_str().italic()),
            Span::Code(s) => write!(out, "{}", s.as_str().cyan()),
            Span::LineBreak => writeln!(out),
        };
    }
    out
}
