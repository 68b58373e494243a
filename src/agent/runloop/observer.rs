use memchat_core::core::TurnObserver;
use memchat_core::llm::LLMResponse;
use memchat_core::memory::CompactionReport;
use memchat_core::ui::{AnsiRenderer, MessageStyle, Spinner};
use tracing::debug;

/// Renders turn events to the terminal: streamed fragments, the compaction
/// spinner and status notices.
pub(crate) struct TerminalObserver {
    renderer: AnsiRenderer,
    spinner: Option<Spinner>,
    assistant_label: String,
    streamed_any: bool,
}

impl TerminalObserver {
    pub(crate) fn new(assistant_label: &str) -> Self {
        Self {
            renderer: AnsiRenderer::stdout(),
            spinner: None,
            assistant_label: assistant_label.to_string(),
            streamed_any: false,
        }
    }

    /// Tear down transient output after an interrupted or failed turn
    pub(crate) fn abort(&mut self) {
        if let Some(spinner) = self.spinner.take() {
            spinner.finish_and_clear();
        }
        self.streamed_any = false;
    }
}

impl TurnObserver for TerminalObserver {
    fn on_fragment(&mut self, fragment: &str) {
        self.streamed_any = true;
        let _ = self.renderer.raw(fragment);
    }

    fn on_reply_complete(&mut self, response: &LLMResponse) {
        if !self.streamed_any {
            let notice = format!("({} had nothing to say)", self.assistant_label);
            let _ = self.renderer.line(MessageStyle::Muted, &notice);
        } else {
            let _ = self.renderer.blank_line();
        }
        let _ = self.renderer.blank_line();
        self.streamed_any = false;
        if let Some(usage) = response.usage {
            debug!(
                prompt_tokens = usage.prompt_tokens,
                completion_tokens = usage.completion_tokens,
                "reply usage"
            );
        }
    }

    fn on_compaction_started(&mut self, archiving: usize) {
        self.spinner = Some(Spinner::new(&format!(
            "Summarizing {archiving} old messages into memory..."
        )));
    }

    fn on_compaction_finished(&mut self, _report: &CompactionReport) {
        if let Some(spinner) = self.spinner.take() {
            spinner.finish_and_clear();
        }
        let _ = self
            .renderer
            .line(MessageStyle::Info, "Memory optimized. Summary updated.");
    }

    fn on_reset(&mut self) {
        let _ = self
            .renderer
            .line(MessageStyle::Info, "Memory reset complete! Starting fresh.");
    }
}
