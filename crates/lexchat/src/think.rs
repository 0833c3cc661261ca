//! Removal of `<think>...</think>` reasoning spans from model output.
//!
//! Matching is literal, case-sensitive and non-nested: a second `<think>`
//! inside a span is swallowed like any other span content, and a stray
//! `</think>` outside a span is ordinary visible text.

/// Opening marker of a reasoning span.
pub const THINK_OPEN: &str = "<think>";
/// Closing marker of a reasoning span.
pub const THINK_CLOSE: &str = "</think>";

/// Result of a one-shot filter pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Filtered {
    pub visible: String,
    /// Whether the text ended inside an unterminated span.
    pub inside: bool,
}

/// Filter `text` in a single pass, starting with the given span state.
///
/// Only looks at `text`: a marker cut in two by the caller is not recognised.
/// Use [`ThinkFilter`] when text arrives in chunks.
pub fn strip_think(text: &str, inside: bool) -> Filtered {
    let mut filter = ThinkFilter::with_state(inside);
    filter.scan(text, true);
    Filtered {
        visible: filter.visible,
        inside: filter.inside,
    }
}

/// Incremental filter over a growing token stream.
///
/// Produces the same visible text as [`strip_think`] over the whole
/// accumulation, except that a trailing fragment which could still become
/// a marker (`<`, `<thi`, `</th`...) is held back until the next chunk or
/// [`ThinkFilter::finish`] decides it.
#[derive(Debug, Clone, Default)]
pub struct ThinkFilter {
    inside: bool,
    pending: String,
    visible: String,
}

impl ThinkFilter {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_state(inside: bool) -> Self {
        Self {
            inside,
            ..Self::default()
        }
    }

    /// Feed the next chunk and return the visible text accumulated so far.
    pub fn push(&mut self, chunk: &str) -> &str {
        let mut input = std::mem::take(&mut self.pending);
        input.push_str(chunk);
        self.scan(&input, false);
        &self.visible
    }

    /// Resolve any held-back fragment and return the final visible text.
    pub fn finish(&mut self) -> &str {
        let input = std::mem::take(&mut self.pending);
        self.scan(&input, true);
        &self.visible
    }

    pub fn visible(&self) -> &str {
        &self.visible
    }

    pub fn is_inside(&self) -> bool {
        self.inside
    }

    fn scan(&mut self, input: &str, is_final: bool) {
        let mut pos = 0;
        while pos < input.len() {
            let rest = &input[pos..];
            let marker = if self.inside { THINK_CLOSE } else { THINK_OPEN };

            if rest.starts_with(marker) {
                self.inside = !self.inside;
                pos += marker.len();
                continue;
            }

            if !is_final && marker.starts_with(rest) {
                self.pending.push_str(rest);
                return;
            }

            // `rest` is non-empty, so there is a next char.
            let Some(ch) = rest.chars().next() else {
                break;
            };
            if !self.inside {
                self.visible.push(ch);
            }
            pos += ch.len_utf8();
        }
    }
}
