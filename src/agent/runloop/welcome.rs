use anyhow::Result;
use memchat_core::config::AgentConfig;
use memchat_core::config::constants::defaults::SUMMARY_PREVIEW_CHARS;
use memchat_core::memory::ConversationState;
use memchat_core::ui::{AnsiRenderer, MessageStyle, preview};

pub(crate) fn render(
    renderer: &mut AnsiRenderer,
    state: &ConversationState,
    agent: &AgentConfig,
    backend: &str,
) -> Result<()> {
    renderer.line(
        MessageStyle::Header,
        &format!(
            "{} Memory Chat ({backend} backed + auto summary)",
            agent.assistant_label
        ),
    )?;
    renderer.line(
        MessageStyle::Muted,
        "Type 'exit' or 'quit' to stop, 'reset' to clear memory.",
    )?;
    renderer.blank_line()?;

    for (style, text) in memory_lines(state) {
        renderer.line(style, &text)?;
    }
    renderer.blank_line()?;
    Ok(())
}

fn memory_lines(state: &ConversationState) -> Vec<(MessageStyle, String)> {
    let mut lines = Vec::new();
    if state.has_summary() {
        lines.push((
            MessageStyle::Muted,
            format!(
                "Summary: {}...",
                preview(&state.summary, SUMMARY_PREVIEW_CHARS)
            ),
        ));
    }
    if state.history.is_empty() {
        lines.push((
            MessageStyle::Info,
            "No past memory found. Starting fresh.".to_string(),
        ));
    } else {
        lines.push((
            MessageStyle::Info,
            format!("Loaded {} past messages from memory.", state.history.len()),
        ));
    }
    lines
}
