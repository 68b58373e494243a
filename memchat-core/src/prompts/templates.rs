//! Fixed prompt templates for memory handling

/// Instruction sent to the summary model. `{summary}` and `{transcript}` are substituted.
pub const SUMMARY_TEMPLATE: &str = r#"You are a conversation memory summarization assistant.
Merge the "Summary so far" and the "Older conversation log" below into one new summary.
Keep important facts and context (the user's preferences, topics discussed) and leave out greetings and small talk.

[Summary so far]
{summary}

[Older conversation log]
{transcript}

[New summary] (output only the summary)
"#;

const SUMMARY_PLACEHOLDER: &str = "{summary}";
const TRANSCRIPT_PLACEHOLDER: &str = "{transcript}";

const SUMMARY_NOTE_HEADER: &str = "[Long-term memory (summary)]";
const SUMMARY_NOTE_FOOTER: &str = "Keep this memory in mind during the conversation.";

/// Render the summarization request from the current summary and the archived transcript
pub fn summary_prompt(current_summary: &str, transcript: &str) -> String {
    let mut prompt = String::with_capacity(
        SUMMARY_TEMPLATE.len() + current_summary.len() + transcript.len(),
    );
    let mut rest = SUMMARY_TEMPLATE;
    // placeholders are located in the template only, never in substituted text
    while let Some(start) = rest.find('{') {
        let (value, placeholder) = if rest[start..].starts_with(SUMMARY_PLACEHOLDER) {
            (current_summary, SUMMARY_PLACEHOLDER)
        } else if rest[start..].starts_with(TRANSCRIPT_PLACEHOLDER) {
            (transcript, TRANSCRIPT_PLACEHOLDER)
        } else {
            prompt.push_str(&rest[..=start]);
            rest = &rest[start + 1..];
            continue;
        };
        prompt.push_str(&rest[..start]);
        prompt.push_str(value);
        rest = &rest[start + placeholder.len()..];
    }
    prompt.push_str(rest);
    prompt
}

/// System note that carries the summary into the chat context
pub fn summary_note(summary: &str) -> String {
    format!("{SUMMARY_NOTE_HEADER}\n{summary}\n\n{SUMMARY_NOTE_FOOTER}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary_prompt_embeds_both_inputs() {
        let prompt = summary_prompt("User likes tea.", "User: hi\nGemma: hello\n");
        assert!(prompt.contains("[Summary so far]\nUser likes tea.\n"));
        assert!(prompt.contains("[Older conversation log]\nUser: hi\nGemma: hello\n"));
        assert!(!prompt.contains("{summary}"));
        assert!(!prompt.contains("{transcript}"));
    }

    #[test]
    fn substituted_text_is_never_rescanned() {
        let prompt = summary_prompt("user typed {transcript} literally", "User: {summary}\n");
        assert!(prompt.contains("[Summary so far]\nuser typed {transcript} literally\n"));
        assert!(prompt.contains("[Older conversation log]\nUser: {summary}\n"));
        assert_eq!(prompt.matches("User: {summary}").count(), 1);
    }

    #[test]
    fn summary_note_format() {
        assert_eq!(
            summary_note("likes ramen"),
            "[Long-term memory (summary)]\nlikes ramen\n\nKeep this memory in mind during the conversation."
        );
    }
}
