use anstream::{AutoStream, ColorChoice};
use anstyle::{AnsiColor, Color, Effects, Reset, Style};
use anstyle_query::{clicolor, clicolor_force, no_color, term_supports_color};
use std::io::{self, Write};

/// Styles available for rendering chat output
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageStyle {
    /// Banner and headings
    Header,
    /// Status notices (memory loaded, reset, compaction)
    Info,
    Error,
    /// The user prompt label
    User,
    /// The assistant label and streamed reply
    Response,
    /// Summary preview and other secondary text
    Muted,
}

impl MessageStyle {
    pub fn style(self) -> Style {
        let fg = |color: AnsiColor| Style::new().fg_color(Some(Color::Ansi(color)));
        match self {
            Self::Header => fg(AnsiColor::Cyan).effects(Effects::BOLD),
            Self::Info => fg(AnsiColor::Green),
            Self::Error => fg(AnsiColor::Red).effects(Effects::BOLD),
            Self::User => fg(AnsiColor::Blue).effects(Effects::BOLD),
            Self::Response => fg(AnsiColor::Magenta).effects(Effects::BOLD),
            Self::Muted => Style::new().effects(Effects::DIMMED),
        }
    }
}

/// Whether stdout should carry color, honoring `CLICOLOR_FORCE`, `NO_COLOR` and `CLICOLOR`
pub fn color_enabled() -> bool {
    clicolor_force() || (!no_color() && clicolor().unwrap_or_else(term_supports_color))
}

/// Line- and fragment-oriented writer for the chat transcript
pub struct AnsiRenderer {
    writer: AutoStream<io::Stdout>,
    color: bool,
}

impl AnsiRenderer {
    pub fn stdout() -> Self {
        let color = color_enabled();
        let choice = if color {
            ColorChoice::Auto
        } else {
            ColorChoice::Never
        };
        Self {
            writer: AutoStream::new(io::stdout(), choice),
            color,
        }
    }

    /// Write a full styled line
    pub fn line(&mut self, style: MessageStyle, text: &str) -> io::Result<()> {
        self.write_styled(style, text)?;
        writeln!(self.writer)?;
        self.writer.flush()
    }

    /// Write styled text without a trailing newline
    pub fn inline(&mut self, style: MessageStyle, text: &str) -> io::Result<()> {
        self.write_styled(style, text)?;
        self.writer.flush()
    }

    /// Write unstyled text without a trailing newline, flushed immediately
    pub fn raw(&mut self, text: &str) -> io::Result<()> {
        write!(self.writer, "{text}")?;
        self.writer.flush()
    }

    pub fn blank_line(&mut self) -> io::Result<()> {
        writeln!(self.writer)?;
        self.writer.flush()
    }

    fn write_styled(&mut self, style: MessageStyle, text: &str) -> io::Result<()> {
        if self.color {
            let style = style.style();
            write!(self.writer, "{style}{text}{Reset}")
        } else {
            write!(self.writer, "{text}")
        }
    }
}

/// First `max_chars` characters of `text`, never splitting a character
pub fn preview(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn styles_are_distinct() {
        assert_ne!(MessageStyle::User.style(), MessageStyle::Response.style());
        assert_ne!(MessageStyle::Info.style(), MessageStyle::Error.style());
    }

    #[test]
    fn preview_respects_char_boundaries() {
        assert_eq!(preview("こんにちは世界", 5), "こんにちは");
        assert_eq!(preview("short", 50), "short");
        assert_eq!(preview("", 3), "");
    }
}
