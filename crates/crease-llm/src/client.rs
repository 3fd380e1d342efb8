// Claude API streaming client using reqwest-eventsource.
//
// Sends messages to the Anthropic Messages API with `stream: true` and parses
// the Server-Sent Events into `LlmEvent` variants that are forwarded over an
// mpsc channel to whoever dispatched the request.

use async_trait::async_trait;
use crease_core::config::Config;
use futures_util::StreamExt;
use reqwest_eventsource::{Event, RequestBuilderExt};
use serde_json::Value;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::error::ServiceError;
use crate::event::LlmEvent;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

const ANTHROPIC_API_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";

// ---------------------------------------------------------------------------
// TextGenerator
// ---------------------------------------------------------------------------

/// A text-generation service: prompt in, streamed text out.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Stream a response over `tx`, tagging every event with `generation`.
    ///
    /// Implementations send exactly one terminal event (`Complete` or
    /// `Error`) unless the receiver is dropped first.
    async fn stream_message(
        &self,
        system: &str,
        user_content: &str,
        max_tokens: u32,
        tx: mpsc::Sender<LlmEvent>,
        generation: u64,
    );

    /// `false` when no credential is configured and every request would fail.
    fn is_enabled(&self) -> bool {
        true
    }

    /// Run one request to completion and return the full text.
    async fn generate(
        &self,
        system: &str,
        user_content: &str,
        max_tokens: u32,
    ) -> Result<String, ServiceError> {
        let (tx, mut rx) = mpsc::channel(64);
        let produce = self.stream_message(system, user_content, max_tokens, tx, 0);
        let consume = async {
            let mut outcome = None;
            while let Some(event) = rx.recv().await {
                match event {
                    LlmEvent::Token { .. } => {}
                    LlmEvent::Complete { full_text, .. } => outcome = Some(Ok(full_text)),
                    LlmEvent::Error { error, .. } => outcome = Some(Err(error)),
                }
            }
            outcome
        };
        let ((), outcome) = tokio::join!(produce, consume);
        outcome.unwrap_or_else(|| Err(ServiceError::unknown("stream closed without a result")))
    }
}

// ---------------------------------------------------------------------------
// ClaudeClient
// ---------------------------------------------------------------------------

/// Low-level Claude API streaming client.
pub struct ClaudeClient {
    http: reqwest::Client,
    api_key: String,
    model: String,
    api_url: String,
}

impl ClaudeClient {
    /// Create a new client with the given API key and model identifier.
    pub fn new(api_key: String, model: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key,
            model,
            api_url: ANTHROPIC_API_URL.to_string(),
        }
    }

    /// Point the client at a different Messages endpoint.
    pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = api_url.into();
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Send a message to the Claude API and stream the response as `LlmEvent`s
    /// over `tx`.
    ///
    /// The method returns when the stream is complete, an error occurs, or the
    /// receiver is dropped.
    pub async fn stream_message(
        &self,
        system: &str,
        user_content: &str,
        max_tokens: u32,
        tx: mpsc::Sender<LlmEvent>,
        generation: u64,
    ) {
        if self.api_key.is_empty() {
            let _ = tx
                .send(LlmEvent::Error {
                    error: ServiceError::auth("API key not configured"),
                    generation,
                })
                .await;
            return;
        }

        let body = serde_json::json!({
            "model": self.model,
            "max_tokens": max_tokens,
            "stream": true,
            "system": system,
            "messages": [{ "role": "user", "content": user_content }]
        });

        let request = self
            .http
            .post(&self.api_url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("content-type", "application/json")
            .json(&body);

        let mut es = match request.eventsource() {
            Ok(es) => es,
            Err(e) => {
                let _ = tx
                    .send(LlmEvent::Error {
                        error: ServiceError::unknown(format!("Failed to create event source: {e}")),
                        generation,
                    })
                    .await;
                return;
            }
        };

        let mut full_text = String::new();
        let mut input_tokens: u32 = 0;
        let mut output_tokens: u32 = 0;
        let mut stop_reason: Option<String> = None;

        while let Some(event) = es.next().await {
            match event {
                Ok(Event::Open) => {
                    debug!("SSE connection opened");
                }
                Ok(Event::Message(msg)) => {
                    let event_type = msg.event.as_str();
                    let data = &msg.data;

                    match event_type {
                        "message_start" => {
                            match parse_input_tokens(data) {
                                Some(n) => input_tokens = n,
                                None => warn!("failed to parse input_tokens from message_start"),
                            }
                            debug!(input_tokens, "message_start");
                        }
                        "content_block_delta" => {
                            if let Some(text) = parse_delta_text(data) {
                                full_text.push_str(&text);
                                if tx.send(LlmEvent::Token { text, generation }).await.is_err() {
                                    // Receiver dropped, nobody is listening.
                                    es.close();
                                    return;
                                }
                            }
                        }
                        "message_delta" => {
                            match parse_output_tokens(data) {
                                Some(n) => output_tokens = n,
                                None => warn!("failed to parse output_tokens from message_delta"),
                            }
                            stop_reason = parse_stop_reason(data).or(stop_reason);
                            debug!(output_tokens, ?stop_reason, "message_delta");
                        }
                        "message_stop" => {
                            debug!("message_stop, streaming complete");
                            let _ = tx
                                .send(LlmEvent::Complete {
                                    full_text,
                                    input_tokens,
                                    output_tokens,
                                    stop_reason,
                                    generation,
                                })
                                .await;
                            es.close();
                            return;
                        }
                        "error" => {
                            let error = parse_stream_error(data);
                            warn!(%error, "error event in SSE stream");
                            let _ = tx.send(LlmEvent::Error { error, generation }).await;
                            es.close();
                            return;
                        }
                        // ping, content_block_start, content_block_stop
                        _ => {
                            debug!(event_type, "ignoring SSE event");
                        }
                    }
                }
                Err(reqwest_eventsource::Error::StreamEnded) => {
                    debug!("SSE stream ended before message_stop");
                    break;
                }
                Err(err) => {
                    warn!(?err, "SSE stream error");
                    let _ = tx
                        .send(LlmEvent::Error {
                            error: classify_stream_error(&err),
                            generation,
                        })
                        .await;
                    es.close();
                    return;
                }
            }
        }
        es.close();

        // Stream ended without message_stop.
        let event = if full_text.is_empty() {
            LlmEvent::Error {
                error: ServiceError::unavailable("Stream ended unexpectedly without any content"),
                generation,
            }
        } else {
            LlmEvent::Complete {
                full_text,
                input_tokens,
                output_tokens,
                stop_reason,
                generation,
            }
        };
        let _ = tx.send(event).await;
    }
}

// ---------------------------------------------------------------------------
// LlmClient wrapper
// ---------------------------------------------------------------------------

/// High-level wrapper that can be either an active Claude client or disabled.
pub enum LlmClient {
    /// Claude API is configured and ready.
    Active(ClaudeClient),
    /// Insight generation is disabled (no API key configured).
    Disabled,
}

impl LlmClient {
    /// Build an `LlmClient` from the application config.
    ///
    /// Returns `Active` if an API key is present in credentials, otherwise
    /// returns `Disabled`.
    pub fn from_config(config: &Config) -> Self {
        match &config.credentials.anthropic_api_key {
            Some(key) if !key.is_empty() => {
                LlmClient::Active(ClaudeClient::new(key.clone(), config.llm.model.clone()))
            }
            _ => LlmClient::Disabled,
        }
    }
}

#[async_trait]
impl TextGenerator for LlmClient {
    async fn stream_message(
        &self,
        system: &str,
        user_content: &str,
        max_tokens: u32,
        tx: mpsc::Sender<LlmEvent>,
        generation: u64,
    ) {
        match self {
            LlmClient::Active(client) => {
                client
                    .stream_message(system, user_content, max_tokens, tx, generation)
                    .await
            }
            LlmClient::Disabled => {
                let _ = tx
                    .send(LlmEvent::Error {
                        error: ServiceError::auth("LLM not configured"),
                        generation,
                    })
                    .await;
            }
        }
    }

    fn is_enabled(&self) -> bool {
        matches!(self, LlmClient::Active(_))
    }
}

// ---------------------------------------------------------------------------
// SSE JSON parsing helpers
// ---------------------------------------------------------------------------

/// Extract `input_tokens` from a `message_start` event's JSON.
///
/// Expected shape: `{ "type": "message_start", "message": { "usage": { "input_tokens": N } } }`
pub(crate) fn parse_input_tokens(data: &str) -> Option<u32> {
    let v: Value = serde_json::from_str(data).ok()?;
    v.get("message")?
        .get("usage")?
        .get("input_tokens")?
        .as_u64()
        .map(|n| n as u32)
}

/// Extract `delta.text` from a `content_block_delta` event's JSON.
pub(crate) fn parse_delta_text(data: &str) -> Option<String> {
    let v: Value = serde_json::from_str(data).ok()?;
    v.get("delta")?
        .get("text")?
        .as_str()
        .map(|s| s.to_string())
}

/// Extract `output_tokens` from a `message_delta` event's JSON.
///
/// Expected shape: `{ "type": "message_delta", "usage": { "output_tokens": N } }`
pub(crate) fn parse_output_tokens(data: &str) -> Option<u32> {
    let v: Value = serde_json::from_str(data).ok()?;
    v.get("usage")?
        .get("output_tokens")?
        .as_u64()
        .map(|n| n as u32)
}

/// Extract `delta.stop_reason` from a `message_delta` event's JSON.
pub(crate) fn parse_stop_reason(data: &str) -> Option<String> {
    let v: Value = serde_json::from_str(data).ok()?;
    v.get("delta")?
        .get("stop_reason")?
        .as_str()
        .map(|s| s.to_string())
}

/// Turn an in-stream `error` event into a typed error.
///
/// Expected shape: `{ "type": "error", "error": { "type": "overloaded_error", "message": "..." } }`
pub(crate) fn parse_stream_error(data: &str) -> ServiceError {
    let parsed: Option<Value> = serde_json::from_str(data).ok();
    let error = parsed.as_ref().and_then(|v| v.get("error"));
    let error_type = error
        .and_then(|e| e.get("type"))
        .and_then(Value::as_str)
        .unwrap_or("unknown");
    let message = error
        .and_then(|e| e.get("message"))
        .and_then(Value::as_str)
        .unwrap_or("unrecognised error event");
    ServiceError::from_api_error_type(error_type, message)
}

/// Map a transport or protocol failure onto a typed error.
fn classify_stream_error(err: &reqwest_eventsource::Error) -> ServiceError {
    match err {
        reqwest_eventsource::Error::InvalidStatusCode(status, _response) => {
            ServiceError::from_status(status.as_u16())
        }
        reqwest_eventsource::Error::Transport(e) if e.is_timeout() => {
            ServiceError::timeout(format!("Network error: {e}"))
        }
        reqwest_eventsource::Error::Transport(e) => {
            ServiceError::unavailable(format!("Network error: {e}"))
        }
        other => ServiceError::unknown(format!("Stream error: {other}")),
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
