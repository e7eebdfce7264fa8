use crate::api::body_snippet;
use crate::config::Config;
use crate::model::Fact;
use crate::script::{build_prompt, SYSTEM_PROMPT};
use crate::stage::{ScriptWriter, StageError};
use crate::{logi, logw};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;
use std::time::Duration;

const GENERATION_TIMEOUT: Duration = Duration::from_secs(60);
const CHAT_COMPLETIONS_URL: &str = "https://api.openai.com/v1/chat/completions";

/// Pulls `choices[0].message.content` out of a chat-completions body,
/// logging the API's error object if one came back instead.
pub fn openai_extract_message_text(resp_json: &str) -> Option<String> {
    let root: serde_json::Value = serde_json::from_str(resp_json).ok()?;

    if let Some(err) = root.get("error") {
        if let Some(msg) = err.get("message").and_then(|v| v.as_str()) {
            logw(format!("OpenAI error message: {}", msg));
        }
        if let Some(typ) = err.get("type").and_then(|v| v.as_str()) {
            logw(format!("OpenAI error type: {}", typ));
        }
        if let Some(code) = err.get("code").and_then(|v| v.as_str()) {
            logw(format!("OpenAI error code: {}", code));
        }
        return None;
    }

    let text = root
        .get("choices")?
        .as_array()?
        .first()?
        .get("message")?
        .get("content")?
        .as_str()?
        .trim();

    if text.is_empty() {
        return None;
    }
    Some(text.to_string())
}

pub struct OpenAiScriptWriter {
    client: Client,
    api_key: Option<String>,
    model: String,
    temperature: f64,
    max_tokens: Option<u32>,
}

impl OpenAiScriptWriter {
    pub fn new(client: Client, cfg: &Config) -> Self {
        Self {
            client,
            api_key: cfg.openai_key.clone(),
            model: cfg.openai_model.clone(),
            temperature: cfg.openai_temperature,
            max_tokens: cfg.openai_max_tokens,
        }
    }

    pub fn request_body(&self, fact: &Fact) -> serde_json::Value {
        let mut body = json!({
            "model": self.model,
            "messages": [
                {"role": "system", "content": SYSTEM_PROMPT},
                {"role": "user", "content": build_prompt(fact)},
            ],
            "temperature": self.temperature,
        });
        if let Some(max_tokens) = self.max_tokens {
            body["max_tokens"] = json!(max_tokens);
        }
        body
    }
}

#[async_trait]
impl ScriptWriter for OpenAiScriptWriter {
    async fn write_script(&self, fact: &Fact) -> Result<String, StageError> {
        let Some(key) = self.api_key.as_deref() else {
            return Err(StageError::MissingConfig("OPENAI_API_KEY"));
        };

        logi(format!("Requesting script from {}...", self.model));
        let resp = self
            .client
            .post(CHAT_COMPLETIONS_URL)
            .bearer_auth(key)
            .json(&self.request_body(fact))
            .timeout(GENERATION_TIMEOUT)
            .send()
            .await?;

        let status = resp.status();
        let raw = resp.text().await.unwrap_or_default();

        if !status.is_success() {
            logw(format!("OpenAI HTTP {}", status.as_u16()));
            if !raw.is_empty() {
                logw(format!("OpenAI raw body: {}", body_snippet(&raw)));
            }
            return Err(StageError::Status {
                service: "openai",
                status: status.as_u16(),
            });
        }

        openai_extract_message_text(&raw)
            .ok_or_else(|| StageError::malformed("openai", body_snippet(&raw)))
    }
}
