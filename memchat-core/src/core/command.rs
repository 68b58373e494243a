use crate::config::constants::commands;

/// One line of user input, classified
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// `exit` / `quit`
    Exit,
    /// `reset`: wipe history and summary
    Reset,
    /// Free text for the next conversation turn
    Message(String),
    /// Blank line
    Empty,
}

impl Command {
    /// Commands match case-insensitively after trimming; anything else is a
    /// turn carrying the line as typed, minus its line terminator.
    pub fn parse(line: &str) -> Self {
        let typed = line.trim_end_matches(['\r', '\n']);
        let trimmed = typed.trim();
        if trimmed.is_empty() {
            return Command::Empty;
        }

        let lowered = trimmed.to_lowercase();
        match lowered.as_str() {
            commands::EXIT | commands::QUIT => Command::Exit,
            commands::RESET => Command::Reset,
            _ => Command::Message(typed.to_string()),
        }
    }
}
