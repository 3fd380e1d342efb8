// Insight request composition and the send wrapper.
//
// `build_request` is pure. `send` bounds the service call with a timeout;
// `send_or_fallback` never fails and renders a readable fallback instead.

use std::time::Duration;

use crease_core::context::AnalysisContext;
use serde::Serialize;
use tracing::{debug, warn};

use crate::client::TextGenerator;
use crate::error::ServiceError;
use crate::prompt;

pub const NO_DETAILED_STATS: &str = "No detailed stats provided";
pub const DISABLED_FALLBACK: &str = "AI analysis unavailable - API key not configured";
pub const TRUNCATED_NOTE: &str = "[Response truncated due to token limit]";

/// A fully composed request for the text-generation service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InsightRequest {
    pub system_preamble: String,
    /// Basic context plus the detailed statistics block.
    pub context: String,
    pub instruction: String,
}

impl InsightRequest {
    /// The user turn sent alongside the system preamble.
    pub fn user_content(&self) -> String {
        format!("{}\n\n## ANALYSIS REQUEST\n{}\n", self.context, self.instruction)
    }
}

/// Compose a request. Identical inputs give identical requests.
pub fn build_request(
    basic_context: &str,
    detailed: Option<&AnalysisContext>,
    instruction: &str,
) -> InsightRequest {
    let mut context = String::with_capacity(1024);
    context.push_str("## BASIC CONTEXT\n");
    context.push_str(basic_context.trim());
    context.push_str("\n\n## DETAILED STATISTICS\n");
    context.push_str(&format_detailed(detailed));

    InsightRequest {
        system_preamble: prompt::system_preamble(),
        context,
        instruction: instruction.trim().to_string(),
    }
}

fn format_detailed(detailed: Option<&AnalysisContext>) -> String {
    let Some(detailed) = detailed.filter(|d| !d.is_empty()) else {
        return NO_DETAILED_STATS.to_string();
    };
    let mut text = match serde_json::to_string_pretty(detailed) {
        Ok(json) => json,
        Err(e) => {
            warn!("failed to serialize analysis context: {}", e);
            return NO_DETAILED_STATS.to_string();
        }
    };
    if detailed.is_truncated() {
        text.push_str(&format!(
            "\n({} further entries omitted)",
            detailed.omitted
        ));
    }
    text
}

/// Send `request`, failing with `Timeout` if no result arrives in `timeout`.
pub async fn send<G>(
    generator: &G,
    request: &InsightRequest,
    max_tokens: u32,
    timeout: Duration,
) -> Result<String, ServiceError>
where
    G: TextGenerator + ?Sized,
{
    let user_content = request.user_content();
    debug!(
        "sending insight request ({} chars, max_tokens {})",
        user_content.len(),
        max_tokens
    );
    match tokio::time::timeout(
        timeout,
        generator.generate(&request.system_preamble, &user_content, max_tokens),
    )
    .await
    {
        Ok(result) => result,
        Err(_) => Err(ServiceError::timeout(format!(
            "no response within {}s",
            timeout.as_secs()
        ))),
    }
}

/// Like `send`, but always yields displayable text.
pub async fn send_or_fallback<G>(
    generator: &G,
    request: &InsightRequest,
    max_tokens: u32,
    timeout: Duration,
) -> String
where
    G: TextGenerator + ?Sized,
{
    if !generator.is_enabled() {
        return DISABLED_FALLBACK.to_string();
    }
    match send(generator, request, max_tokens, timeout).await {
        Ok(text) => text,
        Err(error) => {
            warn!("insight request failed: {}", error);
            fallback_text(&error)
        }
    }
}

/// Text shown in place of an insight when the service failed.
pub fn fallback_text(error: &ServiceError) -> String {
    format!("AI analysis error: {error}")
}

/// Final display text for a completed stream.
pub fn finish_text(full_text: String, stop_reason: Option<&str>) -> String {
    if stop_reason == Some("max_tokens") {
        format!("{full_text}\n\n{TRUNCATED_NOTE}")
    } else {
        full_text
    }
}
