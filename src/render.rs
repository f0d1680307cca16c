//! Message rendering. The dialog engine only sees the `Renderer` trait, an
//! opaque sink taking role-keyed text mutations, so the terminal bubble
//! layout stays out of the core logic.

use std::io::{self, Write};
use std::time::Duration;

use colored::Colorize;
use tokio::task::JoinHandle;

use crate::role::Role;

/// The rendering sink: one active bubble at a time, created per turn.
pub trait Renderer {
    /// Open a new bubble for `role` containing `initial` text.
    fn append_message(&mut self, role: Role, initial: &str);

    /// Append streamed text to the active bubble.
    fn append_text(&mut self, text: &str);

    /// Replace the active bubble's current line (thinking placeholder or
    /// inline error).
    fn replace_text(&mut self, text: &str);

    /// Close the active bubble.
    fn end_message(&mut self);

    /// Whether this sink wants the animated thinking placeholder. The
    /// animation writes to the terminal, so only the terminal sink opts in.
    fn animates_thinking(&self) -> bool {
        false
    }
}

// ---------------------------------------------------------------------------
// Terminal renderer
// ---------------------------------------------------------------------------

/// Renders bubbles as colored role headers followed by streamed text,
/// flushing after every mutation so output appears as it arrives.
#[derive(Debug, Default)]
pub struct TerminalRenderer {
    line_len: usize,
}

impl TerminalRenderer {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Renderer for TerminalRenderer {
    fn append_message(&mut self, role: Role, initial: &str) {
        let header = match role {
            Role::AiLeft => format!("[{}]", role).bright_cyan().bold(),
            Role::AiRight => format!("[{}]", role).bright_yellow().bold(),
        };
        println!("\n{}", header);
        print!("{}", initial);
        let _ = io::stdout().flush();
        self.line_len = initial.chars().count();
    }

    fn append_text(&mut self, text: &str) {
        print!("{}", text);
        let _ = io::stdout().flush();
        self.line_len += text.chars().count();
    }

    fn replace_text(&mut self, text: &str) {
        print!("\r{}\r{}", " ".repeat(self.line_len), text);
        let _ = io::stdout().flush();
        self.line_len = text.chars().count();
    }

    fn end_message(&mut self) {
        println!();
        let _ = io::stdout().flush();
        self.line_len = 0;
    }

    fn animates_thinking(&self) -> bool {
        true
    }
}

// ---------------------------------------------------------------------------
// Recording renderer (test sink)
// ---------------------------------------------------------------------------

/// Captures bubbles in memory. Used by tests to assert on rendered text.
#[derive(Debug, Default)]
pub struct RecordingRenderer {
    pub bubbles: Vec<(Role, String)>,
}

impl RecordingRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last_text(&self) -> Option<&str> {
        self.bubbles.last().map(|(_, text)| text.as_str())
    }
}

impl Renderer for RecordingRenderer {
    fn append_message(&mut self, role: Role, initial: &str) {
        self.bubbles.push((role, initial.to_string()));
    }

    fn append_text(&mut self, text: &str) {
        if let Some((_, bubble)) = self.bubbles.last_mut() {
            bubble.push_str(text);
        }
    }

    fn replace_text(&mut self, text: &str) {
        if let Some((_, bubble)) = self.bubbles.last_mut() {
            *bubble = text.to_string();
        }
    }

    fn end_message(&mut self) {}
}

// ---------------------------------------------------------------------------
// Thinking indicator
// ---------------------------------------------------------------------------

/// Animated "thinking..." placeholder shown while a request is in flight.
/// The animation task is aborted when the guard drops, so every exit path of
/// the turn (success, HTTP error, transport error) tears it down.
pub struct ThinkingIndicator {
    handle: JoinHandle<()>,
}

impl ThinkingIndicator {
    pub fn start() -> Self {
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(Duration::from_millis(500));
            let mut dots = 0usize;
            loop {
                ticker.tick().await;
                print!("\rthinking{}{}", ".".repeat(dots), " ".repeat(3 - dots));
                let _ = io::stdout().flush();
                dots = (dots + 1) % 4;
            }
        });
        ThinkingIndicator { handle }
    }
}

impl Drop for ThinkingIndicator {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_renderer_opens_bubble_per_turn() {
        let mut renderer = RecordingRenderer::new();
        renderer.append_message(Role::AiLeft, "thinking...");
        renderer.end_message();
        renderer.append_message(Role::AiRight, "thinking...");
        renderer.end_message();
        assert_eq!(renderer.bubbles.len(), 2);
        assert_eq!(renderer.bubbles[0].0, Role::AiLeft);
        assert_eq!(renderer.bubbles[1].0, Role::AiRight);
    }

    #[test]
    fn test_recording_renderer_appends_to_active_bubble() {
        let mut renderer = RecordingRenderer::new();
        renderer.append_message(Role::AiLeft, "");
        renderer.append_text("Hi");
        renderer.append_text(" there");
        assert_eq!(renderer.last_text(), Some("Hi there"));
    }

    #[test]
    fn test_recording_renderer_replace_overwrites() {
        let mut renderer = RecordingRenderer::new();
        renderer.append_message(Role::AiLeft, "thinking...");
        renderer.replace_text("m1 response error (status 500)");
        assert_eq!(renderer.last_text(), Some("m1 response error (status 500)"));
    }

    #[test]
    fn test_recording_renderer_append_without_bubble_is_noop() {
        let mut renderer = RecordingRenderer::new();
        renderer.append_text("orphan");
        assert!(renderer.bubbles.is_empty());
    }

    #[test]
    fn test_only_terminal_sink_animates_thinking() {
        assert!(TerminalRenderer::new().animates_thinking());
        assert!(!RecordingRenderer::new().animates_thinking());
    }

    #[test]
    fn test_terminal_renderer_no_crash() {
        let mut renderer = TerminalRenderer::new();
        renderer.append_message(Role::AiLeft, "thinking...");
        renderer.replace_text("");
        renderer.append_text("Hi");
        renderer.end_message();
    }

    #[tokio::test]
    async fn test_thinking_indicator_aborts_on_drop() {
        let indicator = ThinkingIndicator::start();
        drop(indicator);
        // Dropped guard must not leave the animation task running; give the
        // abort a moment to land. The test asserts no panic and no hang.
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}
