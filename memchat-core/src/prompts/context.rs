//! Chat context assembly

use super::templates::summary_note;
use crate::llm::Message;
use crate::memory::ConversationState;

/// Messages sent to the chat model for the next reply, in fixed order:
/// persona directive, summary note (only when a summary exists), then the
/// full history. The persona always comes first so it outranks any system
/// message that might sit in stored history.
pub fn build_context(persona: &str, state: &ConversationState) -> Vec<Message> {
    let mut messages = Vec::with_capacity(state.history.len() + 2);
    messages.push(Message::system(persona));
    if state.has_summary() {
        messages.push(Message::system(summary_note(&state.summary)));
    }
    messages.extend(state.history.iter().cloned());
    messages
}
