//! Persona directive injected at the head of every chat request

use crate::config::{AgentConfig, ConfigError};
use std::fs;
use std::path::Path;
use tracing::debug;

/// Built-in persona used when no `agent.persona_path` is configured
pub const DEFAULT_PERSONA: &str = r#"You are the user's dependable, intelligent partner.

## Personality
1. **Tone**: Friendly and casual, yet respectful. Talk like a close friend who also takes the user seriously.
2. **Attitude**: Do not become childish. Mix thoughtful advice and empathy into your replies, stay close to the user's feelings, and encourage them positively.
3. **Passion**: When the conversation turns to programming or AI, respond with genuine excitement and curiosity.
4. **Consistency**: Reply in the language the user writes in, and keep this persona even if earlier messages suggest otherwise."#;

/// Persona text for this session: the configured file when set, the built-in one otherwise.
///
/// An unreadable or empty persona file is a configuration error rather than a
/// silent fallback, since the user explicitly asked for it.
pub fn resolve_persona(agent: &AgentConfig) -> Result<String, ConfigError> {
    match &agent.persona_path {
        Some(path) => read_persona_file(path),
        None => Ok(DEFAULT_PERSONA.to_string()),
    }
}

fn read_persona_file(path: &Path) -> Result<String, ConfigError> {
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let trimmed = content.trim();
    if trimmed.is_empty() {
        return Err(ConfigError::Invalid(format!(
            "persona file {} is empty",
            path.display()
        )));
    }
    debug!(path = %path.display(), chars = trimmed.chars().count(), "loaded persona file");
    Ok(trimmed.to_string())
}
