use crate::api::{body_snippet, store_audio};
use crate::config::Config;
use crate::model::AudioTrack;
use crate::stage::{Narrator, StageError};
use crate::{logi, logw};
use async_trait::async_trait;
use base64::Engine;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use std::path::Path;
use std::time::Duration;

const TTS_TIMEOUT: Duration = Duration::from_secs(120);
const SYNTHESIZE_URL: &str = "https://texttospeech.googleapis.com/v1/text:synthesize";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SynthesizeResponse {
    audio_content: Option<String>,
}

pub fn decode_audio_content(raw: &str) -> Result<Vec<u8>, StageError> {
    let resp: SynthesizeResponse = serde_json::from_str(raw)
        .map_err(|e| StageError::malformed("google tts", e.to_string()))?;
    let content = resp
        .audio_content
        .ok_or_else(|| StageError::malformed("google tts", "no audioContent"))?;
    base64::engine::general_purpose::STANDARD
        .decode(content.as_bytes())
        .map_err(|e| StageError::malformed("google tts", e.to_string()))
}

pub struct GoogleTtsNarrator {
    client: Client,
    api_key: Option<String>,
    language: String,
    voice: String,
    speaking_rate: f64,
}

impl GoogleTtsNarrator {
    pub fn new(client: Client, cfg: &Config) -> Self {
        Self {
            client,
            api_key: cfg.google_tts_key.clone(),
            language: cfg.tts_language.clone(),
            voice: cfg.tts_voice.clone(),
            speaking_rate: cfg.tts_speaking_rate,
        }
    }

    pub fn request_body(&self, text: &str) -> serde_json::Value {
        json!({
            "input": {"text": text},
            "voice": {
                "languageCode": self.language,
                "name": self.voice,
                "ssmlGender": "FEMALE",
            },
            "audioConfig": {
                "audioEncoding": "MP3",
                "speakingRate": self.speaking_rate,
                "pitch": 0.0,
            },
        })
    }
}

#[async_trait]
impl Narrator for GoogleTtsNarrator {
    async fn narrate(&self, script: &str, out_path: &Path) -> Result<AudioTrack, StageError> {
        let Some(key) = self.api_key.as_deref() else {
            return Err(StageError::MissingConfig("GOOGLE_CLOUD_KEY"));
        };

        logi(format!("Synthesizing narration ({}, {})...", self.language, self.voice));
        let resp = self
            .client
            .post(SYNTHESIZE_URL)
            .query(&[("key", key)])
            .json(&self.request_body(script))
            .timeout(TTS_TIMEOUT)
            .send()
            .await?;

        let status = resp.status();
        let raw = resp.text().await?;
        if !status.is_success() {
            logw(format!("Google TTS HTTP {}: {}", status.as_u16(), body_snippet(&raw)));
            return Err(StageError::Status {
                service: "google tts",
                status: status.as_u16(),
            });
        }

        let audio = decode_audio_content(&raw)?;
        store_audio(out_path, &audio).await
    }
}
