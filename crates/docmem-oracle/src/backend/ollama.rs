//! Ollama-backed extraction oracle.
//!
//! Talks to a local Ollama server through its `/api/chat` endpoint with
//! `format: "json"`, which constrains the model to emit a JSON object.

use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

use crate::{ExtractionOracle, OracleError, Result, TargetSchema};

/// Configuration for [`OllamaOracle`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OllamaConfig {
    /// Base URL of the Ollama server.
    pub base_url: String,
    /// Model to query.
    pub model: String,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
    /// Maximum number of document characters included in the prompt.
    pub max_text_chars: usize,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:11434".to_string(),
            model: "phi3:mini".to_string(),
            timeout_secs: 120,
            max_text_chars: 4000,
        }
    }
}

/// Extraction oracle backed by an Ollama chat model.
pub struct OllamaOracle {
    client: Client,
    config: OllamaConfig,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    format: &'a str,
    stream: bool,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: String,
}

impl OllamaOracle {
    /// Create an oracle from config. Fails only if the HTTP client cannot
    /// be built.
    pub fn new(config: OllamaConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self { client, config })
    }

    /// The configured model name.
    pub fn model(&self) -> &str {
        &self.config.model
    }

    fn build_prompt(&self, raw_text: &str, schema: &TargetSchema) -> String {
        let text = truncate_chars(raw_text, self.config.max_text_chars);
        format!(
            "You are an expert data extraction tool.\n\
             Your task is to analyze the following document text and extract the required information.\n\
             Return the information as a valid JSON object that strictly follows this schema.\n\
             Do not include any explanations, comments, or markdown formatting around the JSON.\n\
             Only output the final JSON object.\n\
             \n\
             SCHEMA:\n\
             {}\n\
             \n\
             DOCUMENT TEXT:\n\
             ---\n\
             {}\n\
             ---\n\
             \n\
             JSON OUTPUT:\n",
            schema.json_template(),
            text
        )
    }
}

#[async_trait::async_trait]
impl ExtractionOracle for OllamaOracle {
    async fn extract(&self, raw_text: &str, schema: &TargetSchema) -> Result<Map<String, Value>> {
        let prompt = self.build_prompt(raw_text, schema);
        let request = ChatRequest {
            model: &self.config.model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
            format: "json",
            stream: false,
        };

        debug!(
            "querying model {} at {}",
            self.config.model, self.config.base_url
        );
        let response = self
            .client
            .post(format!("{}/api/chat", self.config.base_url))
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(OracleError::Api { status, body });
        }

        let reply: ChatResponse = response.json().await?;
        parse_reply(&reply.message.content)
    }

    fn name(&self) -> &'static str {
        "ollama"
    }
}

/// Parse the model reply into a JSON object, tolerating markdown fences.
fn parse_reply(content: &str) -> Result<Map<String, Value>> {
    let trimmed = content.trim();
    if trimmed.is_empty() {
        return Err(OracleError::EmptyResponse);
    }

    let payload = strip_code_fences(trimmed);
    let value: Value =
        serde_json::from_str(payload).map_err(|e| OracleError::InvalidJson(e.to_string()))?;
    match value {
        Value::Object(map) => Ok(map),
        other => Err(OracleError::InvalidJson(format!(
            "expected a JSON object, got {}",
            json_type_name(&other)
        ))),
    }
}

/// Strip a surrounding ```json fence if the model added one despite the
/// instructions.
fn strip_code_fences(text: &str) -> &str {
    let mut s = text.trim();
    if let Some(rest) = s.strip_prefix("```json") {
        s = rest;
    } else if let Some(rest) = s.strip_prefix("```") {
        s = rest;
    }
    if let Some(rest) = s.strip_suffix("```") {
        s = rest;
    }
    s.trim()
}

/// Truncate to at most `max_chars` characters without splitting a code
/// point.
fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_prompt_includes_schema_and_text() {
        let oracle = OllamaOracle::new(OllamaConfig::default()).unwrap();
        let schema = TargetSchema::new(["invoice_id", "total_amount"]);
        let prompt = oracle.build_prompt("INVOICE #123 from Acme", &schema);

        assert!(prompt.contains("\"invoice_id\": null"));
        assert!(prompt.contains("\"total_amount\": null"));
        assert!(prompt.contains("INVOICE #123 from Acme"));
        assert!(prompt.contains("JSON OUTPUT:"));
    }

    #[test]
    fn test_prompt_truncates_long_documents() {
        let config = OllamaConfig {
            max_text_chars: 10,
            ..OllamaConfig::default()
        };
        let oracle = OllamaOracle::new(config).unwrap();
        let schema = TargetSchema::new(["invoice_id"]);
        let prompt = oracle.build_prompt(&"x".repeat(500), &schema);

        assert!(prompt.contains(&"x".repeat(10)));
        assert!(!prompt.contains(&"x".repeat(11)));
    }

    #[test]
    fn test_truncate_respects_char_boundaries() {
        let text = "żółć żółć";
        let cut = truncate_chars(text, 4);
        assert_eq!(cut, "żółć");
        assert_eq!(truncate_chars("short", 100), "short");
    }

    #[test]
    fn test_parse_reply_plain_object() {
        let map = parse_reply(r#"{"invoice_id": "INV-001"}"#).unwrap();
        assert_eq!(map["invoice_id"], "INV-001");
    }

    #[test]
    fn test_parse_reply_strips_markdown_fences() {
        let reply = "```json\n{\"invoice_id\": \"INV-001\"}\n```";
        let map = parse_reply(reply).unwrap();
        assert_eq!(map["invoice_id"], "INV-001");

        let bare = "```\n{\"vendor_name\": \"Acme\"}\n```";
        let map = parse_reply(bare).unwrap();
        assert_eq!(map["vendor_name"], "Acme");
    }

    #[test]
    fn test_parse_reply_rejects_non_object() {
        let err = parse_reply("[1, 2, 3]").unwrap_err();
        assert!(matches!(err, OracleError::InvalidJson(_)));
        assert!(err.to_string().contains("an array"));
    }

    #[test]
    fn test_parse_reply_rejects_empty() {
        assert!(matches!(
            parse_reply("   "),
            Err(OracleError::EmptyResponse)
        ));
    }

    #[test]
    fn test_parse_reply_rejects_prose() {
        let err = parse_reply("Sure! Here is the JSON you asked for").unwrap_err();
        assert!(matches!(err, OracleError::InvalidJson(_)));
    }
}
