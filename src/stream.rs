//! Incremental parser for the chat endpoint's event-framed byte stream.
//!
//! The server frames its reply as a text event stream: events separated by a
//! blank line, each data line prefixed with `data:`, and a literal `[DONE]`
//! sentinel marking logical end of content (stream EOF also ends the turn).
//! The parser is deliberately presentation-free: it turns raw bytes into
//! normalized text fragments and nothing else.

/// Marker prefixing every data line of an event.
pub const DATA_PREFIX: &str = "data:";

/// Literal end-of-content sentinel, never emitted as a fragment.
pub const DONE_SENTINEL: &str = "[DONE]";

const EVENT_SEPARATOR: &str = "\n\n";

/// Collapse every run of whitespace (including newlines) to a single space.
/// The ends are NOT trimmed: a leading space on a fragment is real content
/// that separates it from the previous fragment.
pub fn collapse_whitespace(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_whitespace = false;
    for ch in text.chars() {
        if ch.is_whitespace() {
            if !in_whitespace {
                out.push(' ');
            }
            in_whitespace = true;
        } else {
            out.push(ch);
            in_whitespace = false;
        }
    }
    out
}

/// Normalization applied before a turn's text is stored in history: collapse
/// whitespace runs and trim the ends. The stored content never contains a
/// newline or two consecutive spaces.
pub fn normalize_content(text: &str) -> String {
    collapse_whitespace(text).trim().to_string()
}

// ---------------------------------------------------------------------------
// UTF-8 accumulation
// ---------------------------------------------------------------------------

/// Buffers bytes across network chunks and only yields complete UTF-8
/// sequences. A multi-byte character split across two chunks stays buffered
/// until its continuation bytes arrive; invalid bytes decode to U+FFFD.
#[derive(Debug, Default)]
pub struct Utf8Accumulator {
    buf: Vec<u8>,
}

impl Utf8Accumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `bytes` and return every complete character decoded so far.
    pub fn push(&mut self, bytes: &[u8]) -> String {
        self.buf.extend_from_slice(bytes);
        let mut out = String::new();
        loop {
            match std::str::from_utf8(&self.buf) {
                Ok(text) => {
                    out.push_str(text);
                    self.buf.clear();
                    break;
                }
                Err(err) => {
                    let valid = err.valid_up_to();
                    out.push_str(&String::from_utf8_lossy(&self.buf[..valid]));
                    match err.error_len() {
                        // Truly invalid bytes: replace and keep decoding.
                        Some(bad) => {
                            out.push('\u{FFFD}');
                            self.buf.drain(..valid + bad);
                        }
                        // Incomplete trailing sequence: wait for more bytes.
                        None => {
                            self.buf.drain(..valid);
                            break;
                        }
                    }
                }
            }
        }
        out
    }

    /// Flush at stream end. An incomplete trailing sequence can no longer be
    /// completed and decodes lossily.
    pub fn finish(&mut self) -> String {
        let out = String::from_utf8_lossy(&self.buf).into_owned();
        self.buf.clear();
        out
    }
}

// ---------------------------------------------------------------------------
// Event parser
// ---------------------------------------------------------------------------

/// Incremental consumer of one turn's byte stream. Feed chunks with
/// [`EventParser::push`]; each returned fragment is ready to append to the
/// active message bubble.
///
/// Duplicate suppression is one event deep: a fragment identical to the
/// immediately previous emitted fragment is dropped once, working around a
/// duplicate-delivery quirk of the upstream transport. Non-adjacent
/// duplicates pass through; this is a best-effort filter, not a guarantee.
#[derive(Debug, Default)]
pub struct EventParser {
    decoder: Utf8Accumulator,
    pending: String,
    last_fragment: Option<String>,
}

impl EventParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Consume a network chunk and return the fragments it completed.
    pub fn push(&mut self, bytes: &[u8]) -> Vec<String> {
        let decoded = self.decoder.push(bytes);
        self.pending.push_str(&decoded);

        let mut fragments = Vec::new();
        while let Some(idx) = self.pending.find(EVENT_SEPARATOR) {
            let event = self.pending[..idx].to_string();
            self.pending.drain(..idx + EVENT_SEPARATOR.len());
            if let Some(fragment) = self.accept(&event) {
                fragments.push(fragment);
            }
        }
        fragments
    }

    /// Flush a trailing event that arrived without its terminator.
    pub fn finish(mut self) -> Vec<String> {
        let tail = self.decoder.finish();
        self.pending.push_str(&tail);
        let event = std::mem::take(&mut self.pending);
        let event = event.trim_end_matches('\n');
        match self.accept(event) {
            Some(fragment) => vec![fragment],
            None => Vec::new(),
        }
    }

    fn accept(&mut self, event: &str) -> Option<String> {
        let data = event.strip_prefix(DATA_PREFIX)?;
        // Continuation lines carry their own prefix.
        let data = data.replace("\ndata:", "\n");
        let fragment = collapse_whitespace(&data);
        if fragment.trim().is_empty() || fragment.trim() == DONE_SENTINEL {
            return None;
        }
        if self.last_fragment.as_deref() == Some(fragment.as_str()) {
            return None;
        }
        self.last_fragment = Some(fragment.clone());
        Some(fragment)
    }
}
