// Streaming insight dispatch.
//
// At most one generation task runs at a time. Dispatching a new request
// aborts the previous task and bumps the generation counter; events carrying
// an older generation are discarded in `accept`, so tokens from a superseded
// request never reach the current text.

use std::sync::Arc;
use std::time::Duration;

use crease_core::config::Config;
use crease_llm::client::TextGenerator;
use crease_llm::error::ServiceError;
use crease_llm::event::LlmEvent;
use crease_llm::request::{fallback_text, finish_text, InsightRequest, DISABLED_FALLBACK};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

const EVENT_CHANNEL_CAPACITY: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InsightStatus {
    #[default]
    Idle,
    Streaming,
    Complete,
    Error,
}

/// What the caller should show after an accepted event.
#[derive(Debug, Clone, PartialEq)]
pub enum InsightUpdate {
    Token(String),
    /// Final text, with the truncation note when the token limit was hit.
    Complete(String),
    /// Fallback text in place of an insight.
    Failed(String),
}

pub struct InsightDispatcher {
    generator: Arc<dyn TextGenerator>,
    max_tokens: u32,
    timeout: Duration,
    tx: mpsc::Sender<LlmEvent>,
    /// Incremented on every dispatch; only events carrying this value count.
    generation: u64,
    current_task: Option<JoinHandle<()>>,
    status: InsightStatus,
    text: String,
}

impl InsightDispatcher {
    /// Build a dispatcher and the receiver its tasks stream into.
    pub fn new(
        generator: Arc<dyn TextGenerator>,
        max_tokens: u32,
        timeout: Duration,
    ) -> (Self, mpsc::Receiver<LlmEvent>) {
        let (tx, rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        let dispatcher = Self {
            generator,
            max_tokens,
            timeout,
            tx,
            generation: 0,
            current_task: None,
            status: InsightStatus::Idle,
            text: String::new(),
        };
        (dispatcher, rx)
    }

    pub fn from_config(
        generator: Arc<dyn TextGenerator>,
        config: &Config,
    ) -> (Self, mpsc::Receiver<LlmEvent>) {
        Self::new(
            generator,
            config.llm.max_tokens,
            Duration::from_secs(config.llm.timeout_secs),
        )
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn status(&self) -> InsightStatus {
        self.status
    }

    /// Text accumulated for the current generation.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Abort the in-flight task, if any.
    pub fn cancel(&mut self) {
        if let Some(handle) = self.current_task.take() {
            handle.abort();
            info!("Cancelled insight task (gen: {})", self.generation);
        }
        if self.status == InsightStatus::Streaming {
            self.status = InsightStatus::Idle;
        }
    }

    /// Start streaming `request`, superseding whatever was running.
    ///
    /// Returns the generation the new task's events will carry.
    pub fn dispatch(&mut self, request: &InsightRequest) -> u64 {
        self.cancel();

        self.generation += 1;
        let generation = self.generation;
        self.status = InsightStatus::Streaming;
        self.text.clear();

        let generator = Arc::clone(&self.generator);
        let tx = self.tx.clone();
        let system = request.system_preamble.clone();
        let user_content = request.user_content();
        let max_tokens = self.max_tokens;
        let timeout = self.timeout;

        let handle = tokio::spawn(async move {
            let stream =
                generator.stream_message(&system, &user_content, max_tokens, tx.clone(), generation);
            if tokio::time::timeout(timeout, stream).await.is_err() {
                warn!("insight task timed out after {}s (gen: {})", timeout.as_secs(), generation);
                let error =
                    ServiceError::timeout(format!("no response within {}s", timeout.as_secs()));
                let _ = tx.send(LlmEvent::Error { error, generation }).await;
            }
        });

        self.current_task = Some(handle);
        info!("Dispatched insight request (gen: {})", generation);
        generation
    }

    /// Apply one streamed event. Stale events yield `None`.
    pub fn accept(&mut self, event: LlmEvent) -> Option<InsightUpdate> {
        if event.generation() != self.generation {
            debug!(
                "Discarding stale insight event (event gen: {}, current gen: {})",
                event.generation(),
                self.generation
            );
            return None;
        }
        if self.status != InsightStatus::Streaming {
            debug!("Received insight event with no active request, discarding");
            return None;
        }

        match event {
            LlmEvent::Token { text, .. } => {
                self.text.push_str(&text);
                Some(InsightUpdate::Token(text))
            }
            LlmEvent::Complete {
                full_text,
                stop_reason,
                output_tokens,
                ..
            } => {
                let text = finish_text(full_text, stop_reason.as_deref());
                info!(
                    "Insight complete (gen: {}, {} output tokens)",
                    self.generation, output_tokens
                );
                self.finish(InsightStatus::Complete, text.clone());
                Some(InsightUpdate::Complete(text))
            }
            LlmEvent::Error { error, .. } => {
                let text = if self.generator.is_enabled() {
                    warn!("Insight error: {}", error);
                    fallback_text(&error)
                } else {
                    DISABLED_FALLBACK.to_string()
                };
                self.finish(InsightStatus::Error, text.clone());
                Some(InsightUpdate::Failed(text))
            }
        }
    }

    fn finish(&mut self, status: InsightStatus, text: String) {
        self.status = status;
        self.text = text;
        self.current_task = None;
    }

    /// Receive until the current generation finishes, forwarding every
    /// accepted update to `on_update`. Returns the final text.
    pub async fn drive(
        &mut self,
        rx: &mut mpsc::Receiver<LlmEvent>,
        mut on_update: impl FnMut(&InsightUpdate),
    ) -> String {
        while self.status == InsightStatus::Streaming {
            let Some(event) = rx.recv().await else {
                warn!("insight channel closed while streaming");
                self.finish(
                    InsightStatus::Error,
                    fallback_text(&ServiceError::unknown("stream closed without a result")),
                );
                break;
            };
            if let Some(update) = self.accept(event) {
                on_update(&update);
            }
        }
        self.text.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use crease_llm::error::ServiceErrorKind;
    use crease_llm::request::TRUNCATED_NOTE;

    struct Unused;

    #[async_trait]
    impl TextGenerator for Unused {
        async fn stream_message(
            &self,
            _system: &str,
            _user_content: &str,
            _max_tokens: u32,
            _tx: mpsc::Sender<LlmEvent>,
            _generation: u64,
        ) {
        }
    }

    fn dispatcher() -> InsightDispatcher {
        let (d, _rx) = InsightDispatcher::new(Arc::new(Unused), 100, Duration::from_secs(5));
        d
    }

    fn streaming(d: &mut InsightDispatcher, generation: u64) {
        d.generation = generation;
        d.status = InsightStatus::Streaming;
    }

    fn token(text: &str, generation: u64) -> LlmEvent {
        LlmEvent::Token {
            text: text.into(),
            generation,
        }
    }

    #[test]
    fn tokens_accumulate_for_current_generation() {
        let mut d = dispatcher();
        streaming(&mut d, 2);
        assert_eq!(d.accept(token("Bowl ", 2)), Some(InsightUpdate::Token("Bowl ".into())));
        assert_eq!(d.accept(token("spin", 2)), Some(InsightUpdate::Token("spin".into())));
        assert_eq!(d.text(), "Bowl spin");
    }

    #[test]
    fn stale_events_are_discarded() {
        let mut d = dispatcher();
        streaming(&mut d, 3);
        assert_eq!(d.accept(token("old", 2)), None);
        assert_eq!(
            d.accept(LlmEvent::Error {
                error: ServiceError::unavailable("late"),
                generation: 1,
            }),
            None
        );
        assert_eq!(d.status(), InsightStatus::Streaming);
        assert_eq!(d.text(), "");
    }

    #[test]
    fn events_after_completion_are_ignored() {
        let mut d = dispatcher();
        streaming(&mut d, 1);
        let done = d.accept(LlmEvent::Complete {
            full_text: "Done".into(),
            input_tokens: 10,
            output_tokens: 1,
            stop_reason: Some("end_turn".into()),
            generation: 1,
        });
        assert_eq!(done, Some(InsightUpdate::Complete("Done".into())));
        assert_eq!(d.status(), InsightStatus::Complete);
        assert_eq!(d.accept(token("more", 1)), None);
        assert_eq!(d.text(), "Done");
    }

    #[test]
    fn token_limit_adds_truncation_note() {
        let mut d = dispatcher();
        streaming(&mut d, 1);
        let update = d.accept(LlmEvent::Complete {
            full_text: "Partial".into(),
            input_tokens: 10,
            output_tokens: 100,
            stop_reason: Some("max_tokens".into()),
            generation: 1,
        });
        assert_eq!(
            update,
            Some(InsightUpdate::Complete(format!("Partial\n\n{TRUNCATED_NOTE}")))
        );
    }

    #[test]
    fn error_becomes_fallback_text() {
        let mut d = dispatcher();
        streaming(&mut d, 1);
        let update = d.accept(LlmEvent::Error {
            error: ServiceError::new(ServiceErrorKind::AuthError, "API returned status 401"),
            generation: 1,
        });
        assert_eq!(
            update,
            Some(InsightUpdate::Failed(
                "AI analysis error: authentication failed: API returned status 401".into()
            ))
        );
        assert_eq!(d.status(), InsightStatus::Error);
    }
}
