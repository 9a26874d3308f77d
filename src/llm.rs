//! Chat-completions client and the LLM-backed evolution agent.
//!
//! The LLM is used **only** to propose a canonical mapping for an unknown
//! utterance. Extraction, permission checks and rule matching never touch it.
//!
//! Any OpenAI-compatible `/chat/completions` endpoint works; the default is
//! DeepSeek. Every failure mode (no key, transport error, timeout, bad JSON)
//! surfaces to the engine as [`EvolutionProposal::Unknown`].

use std::time::Duration;

use miette::Diagnostic;
use thiserror::Error;

use crate::evolution::{EvolutionAgent, EvolutionProposal};

/// Errors from the LLM subsystem.
#[derive(Debug, Error, Diagnostic)]
pub enum LlmError {
    #[error("no API key configured for {url}")]
    #[diagnostic(
        code(ammie::llm::no_api_key),
        help("Set AMI_LLM_API_KEY (or the variable named by `llm.api_key_env`), or run with --offline.")
    )]
    MissingApiKey { url: String },

    #[error("LLM request failed: {message}")]
    #[diagnostic(
        code(ammie::llm::request_failed),
        help("Check the endpoint URL, the API key and network connectivity.")
    )]
    RequestFailed { message: String },

    #[error("LLM request timed out after {timeout_secs}s")]
    #[diagnostic(
        code(ammie::llm::timeout),
        help("Increase `llm.timeout_secs` or try again later.")
    )]
    Timeout { timeout_secs: u64 },

    #[error("failed to parse LLM response: {message}")]
    #[diagnostic(
        code(ammie::llm::parse_error),
        help("The model returned an unexpected response format.")
    )]
    ParseError { message: String },
}

pub const DEFAULT_URL: &str = "https://api.deepseek.com/chat/completions";

/// Configuration for the chat-completions client.
#[derive(Clone)]
pub struct LlmConfig {
    /// Full URL of the chat-completions endpoint.
    pub url: String,
    /// Model name to use.
    pub model: String,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
    /// Bearer token.
    pub api_key: Option<String>,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_URL.into(),
            model: "deepseek-chat".into(),
            timeout_secs: 15,
            api_key: None,
        }
    }
}

impl std::fmt::Debug for LlmConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmConfig")
            .field("url", &self.url)
            .field("model", &self.model)
            .field("timeout_secs", &self.timeout_secs)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// A chat message.
#[derive(Debug, Clone)]
pub struct ChatMessage {
    /// Role: "system", "user", or "assistant".
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".into(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".into(),
            content: content.into(),
        }
    }
}

/// Blocking client for a chat-completions endpoint.
#[derive(Debug)]
pub struct LlmClient {
    config: LlmConfig,
}

impl LlmClient {
    pub fn new(config: LlmConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &LlmConfig {
        &self.config
    }

    /// Single non-streaming completion constrained to a JSON object reply.
    ///
    /// Returns the assistant message content.
    pub fn complete_json(&self, messages: &[ChatMessage]) -> Result<String, LlmError> {
        let api_key = self
            .config
            .api_key
            .as_deref()
            .ok_or_else(|| LlmError::MissingApiKey {
                url: self.config.url.clone(),
            })?;

        let agent = ureq::AgentBuilder::new()
            .timeout(Duration::from_secs(self.config.timeout_secs))
            .build();

        let msgs: Vec<serde_json::Value> = messages
            .iter()
            .map(|m| {
                serde_json::json!({
                    "role": m.role,
                    "content": m.content,
                })
            })
            .collect();

        let body = serde_json::json!({
            "model": self.config.model,
            "messages": msgs,
            "response_format": { "type": "json_object" },
            "stream": false,
        });

        let body_str = serde_json::to_string(&body).map_err(|e| LlmError::RequestFailed {
            message: format!("JSON serialize error: {e}"),
        })?;

        let resp = agent
            .post(&self.config.url)
            .set("Authorization", &format!("Bearer {api_key}"))
            .set("Content-Type", "application/json")
            .send_string(&body_str)
            .map_err(|e| self.request_error(e))?;

        let resp_str = resp.into_string().map_err(|e| LlmError::ParseError {
            message: e.to_string(),
        })?;

        let json: serde_json::Value =
            serde_json::from_str(&resp_str).map_err(|e| LlmError::ParseError {
                message: e.to_string(),
            })?;

        json["choices"][0]["message"]["content"]
            .as_str()
            .map(|s| s.to_string())
            .ok_or_else(|| LlmError::ParseError {
                message: "missing 'choices[0].message.content' field".into(),
            })
    }

    fn request_error(&self, e: ureq::Error) -> LlmError {
        match e {
            ureq::Error::Status(code, resp) => LlmError::RequestFailed {
                message: format!("server returned status {code} ({})", resp.status_text()),
            },
            ureq::Error::Transport(t) if timed_out(&t) => LlmError::Timeout {
                timeout_secs: self.config.timeout_secs,
            },
            ureq::Error::Transport(t) => LlmError::RequestFailed {
                message: t.to_string(),
            },
        }
    }
}

/// Whether `err` or anything in its source chain is an I/O timeout.
fn timed_out(err: &(dyn std::error::Error + 'static)) -> bool {
    let mut current = Some(err);
    while let Some(err) = current {
        if let Some(io) = err.downcast_ref::<std::io::Error>() {
            if matches!(
                io.kind(),
                std::io::ErrorKind::TimedOut | std::io::ErrorKind::WouldBlock
            ) {
                return true;
            }
        }
        current = err.source();
    }
    false
}

const SYSTEM_PROMPT: &str = "You are a precise symbol decomposer. You must reply with JSON only.\n\
    Known canonical symbols: [REF_SELF, REF_USER, NEGATIVE, POSITIVE, BODY, KNOWLEDGE, ACTION_SING, OBJ_SONG].\n\
    New symbols must be UPPER_SNAKE_CASE identifiers. Never put natural-language words in \
    the \"canonical\" or \"intent\" fields.";

fn learning_prompt(text: &str) -> String {
    format!(
        "Parse the input: '{text}'. Extract its action word. Reply with JSON only, in the form:\n\
         {{\"new_atom\": \"<the action word exactly as written in the input>\", \
         \"canonical\": \"ACTION_XXX\", \"intent\": \"QUERY_XXX\"}}\n\
         If there is no action word, reply {{\"intent\": \"UNKNOWN\"}}."
    )
}

/// Evolution agent backed by a chat-completions endpoint.
#[derive(Debug)]
pub struct LlmEvolutionAgent {
    client: LlmClient,
}

impl LlmEvolutionAgent {
    pub fn new(config: LlmConfig) -> Self {
        Self {
            client: LlmClient::new(config),
        }
    }
}

impl EvolutionAgent for LlmEvolutionAgent {
    fn propose(&self, text: &str) -> EvolutionProposal {
        let messages = [
            ChatMessage::system(SYSTEM_PROMPT),
            ChatMessage::user(learning_prompt(text)),
        ];
        match self.client.complete_json(&messages) {
            Ok(content) => parse_proposal(&content),
            Err(e) => {
                tracing::warn!(error = %e, model = %self.client.config().model, "evolution consult failed");
                EvolutionProposal::unknown(e.to_string())
            }
        }
    }
}

/// Interpret a model reply as a proposal.
///
/// Tolerates prose around the JSON object. An `error` field, a missing
/// intent, or the intent `UNKNOWN` all yield [`EvolutionProposal::Unknown`];
/// field contents are checked later by validation.
pub fn parse_proposal(content: &str) -> EvolutionProposal {
    let trimmed = content.trim();
    let json_str = match (trimmed.find('{'), trimmed.rfind('}')) {
        (Some(s), Some(e)) if e > s => &trimmed[s..=e],
        _ => return EvolutionProposal::unknown("no JSON object found in response"),
    };

    let value: serde_json::Value = match serde_json::from_str(json_str) {
        Ok(value) => value,
        Err(e) => return EvolutionProposal::unknown(format!("JSON parse error: {e}")),
    };

    if let Some(error) = value.get("error") {
        return EvolutionProposal::unknown(match error.as_str() {
            Some(s) => s.to_string(),
            None => error.to_string(),
        });
    }

    let field = |name: &str| value[name].as_str().unwrap_or("").trim().to_string();
    let intent = field("intent");
    if intent.is_empty() || intent.eq_ignore_ascii_case("UNKNOWN") {
        return EvolutionProposal::unknown("model reported no usable intent");
    }

    EvolutionProposal::Learn {
        surface: field("new_atom"),
        canonical: field("canonical"),
        intent,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_json_reply() {
        let p = parse_proposal(
            r#"{"new_atom": "说谎", "canonical": "ACTION_LIE", "intent": "QUERY_LIE"}"#,
        );
        assert_eq!(
            p,
            EvolutionProposal::Learn {
                surface: "说谎".into(),
                canonical: "ACTION_LIE".into(),
                intent: "QUERY_LIE".into(),
            }
        );
    }

    #[test]
    fn tolerates_surrounding_prose() {
        let p = parse_proposal(
            "Sure! ```json\n{\"new_atom\": \"跳舞\", \"canonical\": \"ACTION_DANCE\", \"intent\": \"QUERY_DANCE\"}\n```",
        );
        assert!(matches!(p, EvolutionProposal::Learn { .. }));
    }

    #[test]
    fn unknown_and_error_markers() {
        assert!(matches!(
            parse_proposal(r#"{"intent": "UNKNOWN"}"#),
            EvolutionProposal::Unknown { .. }
        ));
        assert!(matches!(
            parse_proposal(r#"{"intent": "UNKNOWN", "error": "timeout"}"#),
            EvolutionProposal::Unknown { reason } if reason == "timeout"
        ));
        assert!(matches!(
            parse_proposal("I cannot help with that."),
            EvolutionProposal::Unknown { .. }
        ));
        assert!(matches!(
            parse_proposal("{ broken"),
            EvolutionProposal::Unknown { .. }
        ));
    }

    #[test]
    fn non_string_fields_become_empty() {
        let p = parse_proposal(r#"{"new_atom": 7, "canonical": null, "intent": "QUERY_X"}"#);
        assert_eq!(
            p,
            EvolutionProposal::Learn {
                surface: String::new(),
                canonical: String::new(),
                intent: "QUERY_X".into(),
            }
        );
    }

    #[test]
    fn missing_api_key_is_an_error() {
        let client = LlmClient::new(LlmConfig::default());
        let result = client.complete_json(&[ChatMessage::user("hello")]);
        assert!(matches!(result, Err(LlmError::MissingApiKey { .. })));
    }

    #[test]
    fn unreachable_endpoint_yields_unknown() {
        let agent = LlmEvolutionAgent::new(LlmConfig {
            url: "http://127.0.0.1:1/chat/completions".into(), // unreachable port
            api_key: Some("test".into()),
            timeout_secs: 2,
            ..Default::default()
        });
        assert!(matches!(
            agent.propose("你会跳舞吗"),
            EvolutionProposal::Unknown { .. }
        ));
    }

    #[derive(Debug, Error)]
    #[error("transport failed")]
    struct Transport(#[source] std::io::Error);

    #[test]
    fn timeouts_are_found_by_error_kind() {
        let timeout = std::io::Error::new(std::io::ErrorKind::TimedOut, "deadline");
        assert!(timed_out(&timeout));
        assert!(timed_out(&Transport(timeout)));

        let refused = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "timed out");
        assert!(!timed_out(&refused));
        assert!(!timed_out(&Transport(refused)));
    }

    #[test]
    fn debug_redacts_api_key() {
        let config = LlmConfig {
            api_key: Some("sk-secret".into()),
            ..Default::default()
        };
        assert!(!format!("{config:?}").contains("sk-secret"));
    }

    #[test]
    fn default_config_values() {
        let config = LlmConfig::default();
        assert_eq!(config.url, DEFAULT_URL);
        assert_eq!(config.model, "deepseek-chat");
        assert_eq!(config.timeout_secs, 15);
    }
}
