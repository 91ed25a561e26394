//! Incremental terminal rendering of session updates.
//!
//! Streaming text is printed as a growing line. When a message is rewritten
//! in a way that is not a pure extension (final text differs from what was
//! streamed, or a failure message replaces partial text) the message is
//! printed again on a fresh line.

use std::io::{self, Write};

use client_rust::state::messages::MessageStore;
use client_rust::state::session::SessionUpdate;

pub const RESPONDER_PREFIX: &str = "oracle> ";

pub struct Renderer<W> {
    out: W,
    current: Option<usize>,
    printed: String,
    line_open: bool,
}

impl<W: Write> Renderer<W> {
    pub fn new(out: W) -> Self {
        Self { out, current: None, printed: String::new(), line_open: false }
    }

    pub fn apply(&mut self, messages: &MessageStore, update: SessionUpdate) -> io::Result<()> {
        match update {
            SessionUpdate::MessageChanged { index } => self.show(messages, index),
            SessionUpdate::StateChanged { .. } => {
                if let Some(last) = messages.len().checked_sub(1) {
                    self.show(messages, last)?;
                }
                self.end_line()
            }
            SessionUpdate::MessageAppended { index } => {
                self.show(messages, index)?;
                self.end_line()
            }
        }
    }

    /// Terminate the line being streamed, if any.
    pub fn end_line(&mut self) -> io::Result<()> {
        if self.line_open {
            writeln!(self.out)?;
            self.line_open = false;
        }
        self.current = None;
        self.printed.clear();
        self.out.flush()
    }

    fn show(&mut self, messages: &MessageStore, index: usize) -> io::Result<()> {
        let Some(message) = messages.get(index) else {
            return Ok(());
        };
        let content = message.content.as_str();

        if self.current == Some(index) && content.starts_with(self.printed.as_str()) {
            write!(self.out, "{}", &content[self.printed.len()..])?;
        } else {
            if self.line_open {
                writeln!(self.out)?;
            }
            write!(self.out, "{RESPONDER_PREFIX}{content}")?;
            self.current = Some(index);
            self.line_open = true;
        }
        content.clone_into(&mut self.printed);
        self.out.flush()
    }

    #[cfg(test)]
    fn into_inner(self) -> W {
        self.out
    }
}

#[cfg(test)]
#[path = "render_test.rs"]
mod tests;
