//! Terminal rendering of conversations.
//!
//! The client never prints; everything user-facing goes through [`Console`],
//! which writes to any `io::Write` so transcripts can be captured in tests.

use std::io::{self, Write};

use crate::api::{Message, MessageSource};
use crate::config::RenderMode;

const USER_LABEL: &str = "You:";
const AI_LABEL: &str = "AI:";

pub struct Console<W: Write> {
    out: W,
    mode: RenderMode,
    /// 0 = no wrapping
    wrap_width: usize,
}

impl<W: Write> Console<W> {
    pub fn new(out: W, mode: RenderMode, wrap_width: usize) -> Self {
        Self {
            out,
            mode,
            wrap_width,
        }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    /// Format a complete message body for the current mode.
    pub fn format(&self, content: &str) -> String {
        let text = match self.mode {
            RenderMode::Plain => content.to_string(),
            RenderMode::Markdown => content.replace("\\[", "$").replace("\\]", "$"),
        };
        if self.wrap_width == 0 {
            return text;
        }
        // Wrap per line so paragraph breaks and list items survive
        text.lines()
            .map(|line| textwrap::fill(line, self.wrap_width))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Echo what the user sent.
    pub fn user_turn(&mut self, text: &str) -> io::Result<()> {
        writeln!(self.out, "\n{} {}", USER_LABEL, text)
    }

    /// Print a whole reply at once.
    pub fn assistant_turn(&mut self, content: &str) -> io::Result<()> {
        let body = self.format(content);
        writeln!(self.out, "\n{} {}\n", AI_LABEL, body)
    }

    /// Start a streamed reply; chunks follow via [`chunk`](Self::chunk).
    pub fn begin_stream(&mut self) -> io::Result<()> {
        write!(self.out, "\n{} ", AI_LABEL)?;
        self.out.flush()
    }

    /// Print one streamed piece verbatim and flush so it shows immediately.
    pub fn chunk(&mut self, text: &str) -> io::Result<()> {
        write!(self.out, "{}", text)?;
        self.out.flush()
    }

    pub fn end_stream(&mut self) -> io::Result<()> {
        writeln!(self.out, "\n")
    }

    /// The greeting shown after a reset.
    pub fn greeting(&mut self, message: &Message) -> io::Result<()> {
        let body = self.format(&message.content);
        writeln!(self.out, "{}\n", body)
    }

    /// Replay a loaded conversation, skipping the system-start instructions.
    pub fn transcript(&mut self, messages: &[Message]) -> io::Result<()> {
        for message in messages {
            let label = match message.source {
                MessageSource::SystemStart => continue,
                MessageSource::Provider => AI_LABEL,
                MessageSource::User | MessageSource::Unknown => USER_LABEL,
            };
            let body = self.format(&message.content);
            writeln!(self.out, "\n{} {}\n", label, body)?;
        }
        Ok(())
    }

    pub fn system_prompt(&mut self, prompt: Option<&str>) -> io::Result<()> {
        match prompt {
            Some(text) => {
                let body = self.format(text);
                writeln!(self.out, "{}\n", body)
            }
            None => writeln!(self.out, "(this conversation has no system prompt)"),
        }
    }

    /// Compact listing for `/history`.
    pub fn history(&mut self, messages: &[Message]) -> io::Result<()> {
        for message in messages {
            writeln!(
                self.out,
                "[{}] {:<12} {}",
                message.created_at.format("%Y-%m-%d %H:%M:%S"),
                message.source,
                crate::utils::truncate_str(&message.content.replace('\n', " "), 80)
            )?;
        }
        Ok(())
    }

    pub fn info(&mut self, text: &str) -> io::Result<()> {
        writeln!(self.out, "{}", text)
    }

    pub fn error(&mut self, text: &str) -> io::Result<()> {
        writeln!(self.out, "Error: {}", text)
    }
}
