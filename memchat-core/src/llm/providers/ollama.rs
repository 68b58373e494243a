//! Ollama chat provider.
//!
//! Talks to `POST {base_url}/api/chat`. Non-streaming calls return a single
//! JSON object; streaming calls return newline-delimited JSON objects, each
//! carrying one `message.content` fragment, the last one flagged `done: true`
//! together with token counts.

use crate::config::constants::urls;
use crate::llm::error_display::format_llm_error;
use crate::llm::provider::{
    FinishReason, LLMError, LLMProvider, LLMRequest, LLMResponse, LLMStream, LLMStreamEvent,
    Message, Usage,
};
use async_stream::try_stream;
use async_trait::async_trait;
use futures::StreamExt;
use reqwest::Client as HttpClient;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

const PROVIDER_LABEL: &str = "Ollama";

pub struct OllamaProvider {
    http_client: HttpClient,
    base_url: String,
}

impl OllamaProvider {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(HttpClient::new(), base_url)
    }

    pub fn with_client(http_client: HttpClient, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into();
        Self {
            http_client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn chat_url(&self) -> String {
        format!("{}/api/chat", self.base_url)
    }

    fn convert_to_ollama_format<'a>(&self, request: &'a LLMRequest) -> OllamaChatRequest<'a> {
        OllamaChatRequest {
            model: &request.model,
            messages: &request.messages,
            stream: request.stream,
        }
    }

    async fn send(&self, request: &LLMRequest) -> Result<reqwest::Response, LLMError> {
        self.validate_request(request)?;
        let body = self.convert_to_ollama_format(request);

        debug!(
            model = %request.model,
            messages = request.messages.len(),
            total_chars = request.messages.iter().map(|m| m.content.len()).sum::<usize>(),
            stream = request.stream,
            "ollama chat request"
        );

        let response = self
            .http_client
            .post(self.chat_url())
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_connect() {
                    LLMError::Network(format_llm_error(
                        PROVIDER_LABEL,
                        &format!(
                            "Cannot connect to Ollama at {}. Is Ollama running?",
                            self.base_url
                        ),
                    ))
                } else {
                    LLMError::Network(format_llm_error(
                        PROVIDER_LABEL,
                        &format!("Network error: {e}"),
                    ))
                }
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(LLMError::Provider(format_llm_error(
                PROVIDER_LABEL,
                &format!("HTTP {status}: {error_text}"),
            )));
        }

        Ok(response)
    }
}

impl Default for OllamaProvider {
    fn default() -> Self {
        Self::new(urls::OLLAMA_BASE_URL)
    }
}

#[async_trait]
impl LLMProvider for OllamaProvider {
    fn name(&self) -> &str {
        "ollama"
    }

    fn supports_streaming(&self) -> bool {
        true
    }

    async fn generate(&self, request: LLMRequest) -> Result<LLMResponse, LLMError> {
        let request = LLMRequest {
            stream: false,
            ..request
        };
        let response = self.send(&request).await?;

        let chunk: OllamaChatChunk = response.json().await.map_err(|e| {
            LLMError::Provider(format_llm_error(
                PROVIDER_LABEL,
                &format!("Failed to parse response: {e}"),
            ))
        })?;

        if let Some(error) = chunk.error.as_deref() {
            return Err(LLMError::Provider(format_llm_error(PROVIDER_LABEL, error)));
        }

        let usage = chunk.usage();
        let finish_reason = chunk.finish_reason();
        let Some(message) = chunk.message else {
            return Err(LLMError::Provider(format_llm_error(
                PROVIDER_LABEL,
                "Response carried no message",
            )));
        };

        Ok(LLMResponse {
            content: message.content,
            usage,
            finish_reason,
        })
    }

    async fn stream(&self, request: LLMRequest) -> Result<LLMStream, LLMError> {
        let request = request.streaming();
        let response = self.send(&request).await?;

        let stream = try_stream! {
            let mut body_stream = response.bytes_stream();
            let mut buffer: Vec<u8> = Vec::new();
            let mut aggregated = String::new();
            let mut completed: Option<LLMResponse> = None;

            'read: while let Some(chunk_result) = body_stream.next().await {
                let chunk = chunk_result.map_err(|err| {
                    LLMError::Network(format_llm_error(
                        PROVIDER_LABEL,
                        &format!("Streaming error: {err}"),
                    ))
                })?;
                buffer.extend_from_slice(&chunk);

                for line in drain_ndjson_lines(&mut buffer) {
                    let Some(parsed) = parse_stream_line(&line)? else {
                        continue;
                    };
                    if let Some(delta) = parsed.delta {
                        aggregated.push_str(&delta);
                        yield LLMStreamEvent::Token { delta };
                    }
                    if let Some((usage, finish_reason)) = parsed.done {
                        completed = Some(LLMResponse {
                            content: std::mem::take(&mut aggregated),
                            usage,
                            finish_reason,
                        });
                        break 'read;
                    }
                }
            }

            if completed.is_none() && !buffer.is_empty() {
                let line = String::from_utf8_lossy(&buffer).into_owned();
                buffer.clear();
                if let Some(parsed) = parse_stream_line(&line)? {
                    if let Some(delta) = parsed.delta {
                        aggregated.push_str(&delta);
                        yield LLMStreamEvent::Token { delta };
                    }
                    if let Some((usage, finish_reason)) = parsed.done {
                        completed = Some(LLMResponse {
                            content: std::mem::take(&mut aggregated),
                            usage,
                            finish_reason,
                        });
                    }
                }
            }

            let response = completed.ok_or_else(|| {
                LLMError::Stream(format_llm_error(
                    PROVIDER_LABEL,
                    "Stream ended without a completion event",
                ))
            })?;

            yield LLMStreamEvent::Completed { response };
        };

        Ok(Box::pin(stream))
    }
}

#[derive(Debug, Serialize)]
struct OllamaChatRequest<'a> {
    model: &'a str,
    messages: &'a [Message],
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct OllamaMessage {
    #[serde(default)]
    content: String,
}

#[derive(Debug, Deserialize)]
struct OllamaChatChunk {
    #[serde(default)]
    message: Option<OllamaMessage>,
    #[serde(default)]
    done: bool,
    #[serde(default)]
    done_reason: Option<String>,
    #[serde(default)]
    prompt_eval_count: Option<u32>,
    #[serde(default)]
    eval_count: Option<u32>,
    #[serde(default)]
    error: Option<String>,
}

impl OllamaChatChunk {
    fn usage(&self) -> Option<Usage> {
        if self.prompt_eval_count.is_none() && self.eval_count.is_none() {
            return None;
        }
        let prompt_tokens = self.prompt_eval_count.unwrap_or(0);
        let completion_tokens = self.eval_count.unwrap_or(0);
        Some(Usage {
            prompt_tokens,
            completion_tokens,
            total_tokens: prompt_tokens + completion_tokens,
        })
    }

    fn finish_reason(&self) -> FinishReason {
        self.done_reason
            .as_deref()
            .map(FinishReason::from_provider)
            .unwrap_or(FinishReason::Stop)
    }
}

/// One decoded line of a streaming response
#[derive(Debug, PartialEq)]
struct StreamLine {
    delta: Option<String>,
    done: Option<(Option<Usage>, FinishReason)>,
}

fn parse_stream_line(line: &str) -> Result<Option<StreamLine>, LLMError> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }

    let chunk: OllamaChatChunk = match serde_json::from_str(line) {
        Ok(chunk) => chunk,
        Err(err) => {
            warn!(error = %err, line, "unparseable ollama stream line");
            return Err(LLMError::Stream(format_llm_error(
                PROVIDER_LABEL,
                &format!("Failed to parse stream payload: {err}"),
            )));
        }
    };

    if let Some(error) = chunk.error.as_deref() {
        return Err(LLMError::Provider(format_llm_error(PROVIDER_LABEL, error)));
    }

    let done = chunk
        .done
        .then(|| (chunk.usage(), chunk.finish_reason()));
    let delta = chunk
        .message
        .map(|m| m.content)
        .filter(|content| !content.is_empty());

    Ok(Some(StreamLine { delta, done }))
}

/// Drain complete newline-terminated lines from the byte buffer.
///
/// Splitting happens on raw bytes so multi-byte UTF-8 sequences cut across
/// network chunks are only decoded once the full line has arrived. Any
/// trailing partial line stays in the buffer.
fn drain_ndjson_lines(buffer: &mut Vec<u8>) -> Vec<String> {
    let mut lines = Vec::new();
    while let Some(idx) = buffer.iter().position(|b| *b == b'\n') {
        let line: Vec<u8> = buffer.drain(..=idx).collect();
        let text = String::from_utf8_lossy(&line[..idx]);
        let text = text.trim_end_matches('\r');
        if !text.trim().is_empty() {
            lines.push(text.to_string());
        }
    }
    lines
}
