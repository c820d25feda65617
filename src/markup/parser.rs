//! Recursive-descent parser turning sanitized markup into ordered
//! expression segments plus the markup-free reading text.
//!
//! Offsets are character positions into the cleaned text; the source
//! corpus is Japanese, so byte offsets would be meaningless to the
//! timeline mapper.

use crate::label::ExpressionLabel;

use super::token::{tokenize, Token};

/// A contiguous span of cleaned text carrying one expression label.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Segment {
    pub text: String,
    pub label: ExpressionLabel,
    pub start_offset: usize,
    pub end_offset: usize,
}

/// Splits `text` into segments, labeling spans inside allow-listed tags
/// with that tag's label and everything else with the current default.
/// Unknown tags are transparent; a label never leaks past its own closer.
///
/// Whitespace-only spans are dropped entirely: they produce no segment and
/// contribute nothing to offset accounting. The returned clean text is the
/// concatenation of every emitted segment's text, in order.
pub fn parse(text: &str, default_label: ExpressionLabel) -> (Vec<Segment>, String) {
    let tokens = tokenize(text);
    let mut walker = Walker {
        tokens: &tokens,
        pos: 0,
        segments: Vec::new(),
        clean: String::new(),
        clean_chars: 0,
    };
    walker.walk(default_label, None);
    debug_assert!(
        walker
            .segments
            .windows(2)
            .all(|w| w[0].end_offset == w[1].start_offset),
        "segment offsets must be contiguous over the retained sequence"
    );
    (walker.segments, walker.clean)
}

/// Removes all recognized and unrecognized tags, keeping content in
/// reading order. Unlike `parse` this does not drop whitespace-only spans.
pub fn strip_tags(text: &str) -> String {
    tokenize(text)
        .into_iter()
        .filter_map(|token| match token {
            Token::Text(s) => Some(s),
            _ => None,
        })
        .collect()
}

struct Walker<'a> {
    tokens: &'a [Token],
    pos: usize,
    segments: Vec<Segment>,
    clean: String,
    clean_chars: usize,
}

impl Walker<'_> {
    /// Consumes tokens until the closer named by `stop` (or end of input),
    /// emitting text under `default_label`.
    fn walk(&mut self, default_label: ExpressionLabel, stop: Option<&str>) {
        while self.pos < self.tokens.len() {
            match &self.tokens[self.pos] {
                Token::Text(text) => {
                    let text = text.clone();
                    self.pos += 1;
                    self.emit(&text, default_label);
                }
                Token::Open(label) => {
                    let label = label.clone();
                    self.pos += 1;
                    match label.parse::<ExpressionLabel>() {
                        // allow-listed: content gets the inner label, then
                        // the outer default resumes
                        Ok(inner) => self.walk(inner, Some(&label)),
                        // unknown survivor: transparent
                        Err(_) => self.walk(default_label, Some(&label)),
                    }
                }
                Token::Close(label) => {
                    let is_stop = stop == Some(label.as_str());
                    self.pos += 1;
                    if is_stop {
                        return;
                    }
                    // unmatched closer: sanitizer leftover, drop it
                }
            }
        }
    }

    fn emit(&mut self, text: &str, label: ExpressionLabel) {
        if text.trim().is_empty() {
            return;
        }
        let chars = text.chars().count();
        let start = self.clean_chars;
        self.segments.push(Segment {
            text: text.to_string(),
            label,
            start_offset: start,
            end_offset: start + chars,
        });
        self.clean.push_str(text);
        self.clean_chars += chars;
    }
}
