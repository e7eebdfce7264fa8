use crate::api::store_audio;
use crate::config::Config;
use crate::model::AudioTrack;
use crate::stage::{Narrator, StageError};
use crate::{logi, logw};
use async_trait::async_trait;
use reqwest::Client;
use std::path::Path;
use std::time::Duration;

const TTS_TIMEOUT: Duration = Duration::from_secs(120);

pub struct ElevenLabsNarrator {
    client: Client,
    api_key: Option<String>,
    voice_id: String,
    model_id: String,
}

impl ElevenLabsNarrator {
    pub fn new(client: Client, cfg: &Config) -> Self {
        Self {
            client,
            api_key: cfg.elevenlabs_key.clone(),
            voice_id: cfg.eleven_voice_id.clone(),
            model_id: cfg.eleven_model_id.clone(),
        }
    }

    fn url(&self) -> String {
        format!(
            "https://api.elevenlabs.io/v1/text-to-speech/{}?output_format=mp3_44100_128",
            self.voice_id
        )
    }
}

#[async_trait]
impl Narrator for ElevenLabsNarrator {
    async fn narrate(&self, script: &str, out_path: &Path) -> Result<AudioTrack, StageError> {
        let Some(key) = self.api_key.as_deref() else {
            return Err(StageError::MissingConfig("ELEVENLABS_API_KEY"));
        };

        let body = serde_json::json!({
            "text": script,
            "model_id": self.model_id,
        });

        logi(format!("Synthesizing narration (ElevenLabs voice {})...", self.voice_id));
        let resp = self
            .client
            .post(self.url())
            .header("Content-Type", "application/json")
            .header("xi-api-key", key)
            .json(&body)
            .timeout(TTS_TIMEOUT)
            .send()
            .await?;

        if !resp.status().is_success() {
            logw(format!("ElevenLabs TTS failed HTTP {}", resp.status().as_u16()));
            return Err(StageError::Status {
                service: "elevenlabs",
                status: resp.status().as_u16(),
            });
        }

        let bytes = resp.bytes().await?;
        store_audio(out_path, &bytes).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_embeds_voice_and_format() {
        let narrator = ElevenLabsNarrator::new(Client::new(), &Config::default());
        assert_eq!(
            narrator.url(),
            "https://api.elevenlabs.io/v1/text-to-speech/JBFqnCBsd6RMkjVDRZzb?output_format=mp3_44100_128"
        );
    }

    #[tokio::test]
    async fn missing_key_is_reported() {
        let narrator = ElevenLabsNarrator::new(Client::new(), &Config::default());
        let dir = tempfile::tempdir().unwrap();
        let err = narrator
            .narrate("Bonjour", &dir.path().join("voice.mp3"))
            .await
            .unwrap_err();
        assert!(matches!(err, StageError::MissingConfig("ELEVENLABS_API_KEY")));
    }
}
