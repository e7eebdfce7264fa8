use crate::captions::CaptionPolicy;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TtsProvider {
    #[default]
    Google,
    ElevenLabs,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    #[serde(rename = "openai_api_key")]
    pub openai_key: Option<String>,
    pub openai_model: String,
    pub openai_temperature: f64,
    pub openai_max_tokens: Option<u32>,

    pub tts_provider: TtsProvider,
    #[serde(rename = "google_cloud_key")]
    pub google_tts_key: Option<String>,
    pub tts_language: String,
    pub tts_voice: String,
    pub tts_speaking_rate: f64,
    #[serde(rename = "elevenlabs_api_key")]
    pub elevenlabs_key: Option<String>,
    pub eleven_voice_id: String,
    pub eleven_model_id: String,

    #[serde(rename = "pexels_api_key")]
    pub pexels_key: Option<String>,
    pub clip_count: usize,
    pub themes: Vec<String>,

    pub youtube_access_token: Option<String>,
    pub youtube_client_id: Option<String>,
    pub youtube_client_secret: Option<String>,
    pub youtube_refresh_token: Option<String>,
    pub tiktok_access_token: Option<String>,
    pub upload: bool,

    pub fact_endpoint: String,
    pub width: u32,
    pub height: u32,
    pub fps: u32,
    pub background_color: String,
    pub captions: CaptionPolicy,

    pub work_dir: PathBuf,
    pub output_path: PathBuf,
    pub record_path: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            openai_key: None,
            openai_model: "gpt-3.5-turbo".to_string(),
            openai_temperature: 0.8,
            openai_max_tokens: None,
            tts_provider: TtsProvider::Google,
            google_tts_key: None,
            tts_language: "fr-FR".to_string(),
            tts_voice: "fr-FR-Neural2-A".to_string(),
            tts_speaking_rate: 1.1,
            elevenlabs_key: None,
            eleven_voice_id: "JBFqnCBsd6RMkjVDRZzb".to_string(),
            eleven_model_id: "eleven_multilingual_v2".to_string(),
            pexels_key: None,
            clip_count: 2,
            themes: default_themes(),
            youtube_access_token: None,
            youtube_client_id: None,
            youtube_client_secret: None,
            youtube_refresh_token: None,
            tiktok_access_token: None,
            upload: true,
            fact_endpoint: "https://fr.wikipedia.org/api/rest_v1/page/random/summary".to_string(),
            width: 1080,
            height: 1920,
            fps: 30,
            background_color: "0x1a1a2e".to_string(),
            captions: CaptionPolicy::default(),
            work_dir: PathBuf::from("clips"),
            output_path: PathBuf::from("output/final_video.mp4"),
            record_path: PathBuf::from("output/run_record.json"),
        }
    }
}

fn default_themes() -> Vec<String> {
    [
        "science incroyable",
        "histoire méconnue",
        "animaux étonnants",
        "espace et astronomie",
        "corps humain",
        "inventions surprenantes",
        "géographie fascinante",
        "records du monde",
    ]
    .iter()
    .map(|t| t.to_string())
    .collect()
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

impl Config {
    /// Reads the optional JSON file and applies environment overrides.
    /// Callers run [`Config::validate`] once all overrides are in place.
    pub async fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let mut config = if fs::metadata(path).await.is_ok() {
            let content = fs::read_to_string(path)
                .await
                .with_context(|| format!("Failed to read config: {}", path.display()))?;
            serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse config: {}", path.display()))?
        } else {
            Config::default()
        };

        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| non_empty(lookup(key));

        if let Some(v) = get("OPENAI_API_KEY") {
            self.openai_key = Some(v);
        }
        if let Some(v) = get("OPENAI_MODEL") {
            self.openai_model = v;
        }
        if let Some(v) = get("GOOGLE_CLOUD_KEY") {
            self.google_tts_key = Some(v);
        }
        if let Some(v) = get("ELEVENLABS_API_KEY") {
            self.elevenlabs_key = Some(v);
        }
        if let Some(v) = get("TTS_PROVIDER") {
            match v.to_ascii_lowercase().as_str() {
                "google" => self.tts_provider = TtsProvider::Google,
                "elevenlabs" => self.tts_provider = TtsProvider::ElevenLabs,
                other => tracing::warn!("Ignoring unknown TTS_PROVIDER {:?}", other),
            }
        }
        if let Some(v) = get("PEXELS_API_KEY") {
            self.pexels_key = Some(v);
        }
        if let Some(v) = get("YOUTUBE_ACCESS_TOKEN") {
            self.youtube_access_token = Some(v);
        }
        if let Some(v) = get("YOUTUBE_CLIENT_ID") {
            self.youtube_client_id = Some(v);
        }
        if let Some(v) = get("YOUTUBE_CLIENT_SECRET") {
            self.youtube_client_secret = Some(v);
        }
        if let Some(v) = get("YOUTUBE_REFRESH_TOKEN") {
            self.youtube_refresh_token = Some(v);
        }
        if let Some(v) = get("TIKTOK_ACCESS_TOKEN") {
            self.tiktok_access_token = Some(v);
        }

        self.openai_key = non_empty(self.openai_key.take());
        self.google_tts_key = non_empty(self.google_tts_key.take());
        self.elevenlabs_key = non_empty(self.elevenlabs_key.take());
        self.pexels_key = non_empty(self.pexels_key.take());
        self.youtube_access_token = non_empty(self.youtube_access_token.take());
        self.youtube_client_id = non_empty(self.youtube_client_id.take());
        self.youtube_client_secret = non_empty(self.youtube_client_secret.take());
        self.youtube_refresh_token = non_empty(self.youtube_refresh_token.take());
        self.tiktok_access_token = non_empty(self.tiktok_access_token.take());
    }

    pub fn validate(&self) -> Result<()> {
        match self.tts_provider {
            TtsProvider::Google if self.google_tts_key.is_none() => {
                anyhow::bail!("GOOGLE_CLOUD_KEY missing (narration is required)");
            }
            TtsProvider::ElevenLabs if self.elevenlabs_key.is_none() => {
                anyhow::bail!("ELEVENLABS_API_KEY missing (narration is required)");
            }
            _ => {}
        }
        if self.captions.words_per_caption == 0 {
            anyhow::bail!("captions.words_per_caption must be at least 1");
        }
        if self.width == 0 || self.height == 0 || self.fps == 0 {
            anyhow::bail!("video width, height and fps must be positive");
        }
        if self.themes.is_empty() {
            anyhow::bail!("theme list is empty");
        }
        Ok(())
    }

    pub fn youtube_configured(&self) -> bool {
        self.youtube_access_token.is_some()
            || (self.youtube_client_id.is_some()
                && self.youtube_client_secret.is_some()
                && self.youtube_refresh_token.is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn env_overrides_file_values() {
        let mut cfg: Config =
            serde_json::from_str(r#"{"openai_api_key":"from-file","clip_count":4}"#).unwrap();
        let vars = env(&[("OPENAI_API_KEY", "from-env"), ("GOOGLE_CLOUD_KEY", "g")]);
        cfg.apply_env(|k| vars.get(k).cloned());

        assert_eq!(cfg.openai_key.as_deref(), Some("from-env"));
        assert_eq!(cfg.google_tts_key.as_deref(), Some("g"));
        assert_eq!(cfg.clip_count, 4);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn blank_credentials_count_as_missing() {
        let mut cfg = Config::default();
        let vars = env(&[("OPENAI_API_KEY", "  "), ("GOOGLE_CLOUD_KEY", "g")]);
        cfg.apply_env(|k| vars.get(k).cloned());
        assert!(cfg.openai_key.is_none());
    }

    #[test]
    fn blank_upload_tokens_in_file_disable_publishers() {
        let mut cfg: Config = serde_json::from_str(
            r#"{"youtube_access_token":"","tiktok_access_token":" ","youtube_client_id":"","youtube_client_secret":"","youtube_refresh_token":""}"#,
        )
        .unwrap();
        cfg.apply_env(|_| None);

        assert!(cfg.youtube_access_token.is_none());
        assert!(cfg.tiktok_access_token.is_none());
        assert!(!cfg.youtube_configured());
    }

    #[test]
    fn narration_key_is_mandatory() {
        let cfg = Config::default();
        let err = cfg.validate().unwrap_err();
        assert!(err.to_string().contains("GOOGLE_CLOUD_KEY"));

        let mut cfg = Config {
            tts_provider: TtsProvider::ElevenLabs,
            google_tts_key: Some("g".into()),
            ..Config::default()
        };
        assert!(cfg.validate().is_err());
        cfg.elevenlabs_key = Some("e".into());
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn zero_words_per_caption_is_rejected() {
        let mut cfg = Config {
            google_tts_key: Some("g".into()),
            ..Config::default()
        };
        cfg.captions.words_per_caption = 0;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn youtube_needs_token_or_full_refresh_triple() {
        let mut cfg = Config::default();
        assert!(!cfg.youtube_configured());
        cfg.youtube_client_id = Some("id".into());
        cfg.youtube_client_secret = Some("secret".into());
        assert!(!cfg.youtube_configured());
        cfg.youtube_refresh_token = Some("refresh".into());
        assert!(cfg.youtube_configured());
    }

    #[tokio::test]
    async fn load_reads_json_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(
            &path,
            r#"{"google_cloud_key":"g","clip_count":3,"captions":{"words_per_caption":3,"timing":"per_word"}}"#,
        )
        .await
        .unwrap();

        let cfg = Config::load(&path).await.unwrap();
        assert_eq!(cfg.clip_count, 3);
        assert_eq!(cfg.captions.words_per_caption, 3);
        assert_eq!(cfg.fps, 30);
        assert_eq!(cfg.themes.len(), 8);
    }

    #[tokio::test]
    async fn load_leaves_validation_to_the_caller() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(
            &path,
            r#"{"google_cloud_key":"g","captions":{"words_per_caption":0}}"#,
        )
        .await
        .unwrap();

        let mut cfg = Config::load(&path).await.unwrap();
        assert!(cfg.validate().is_err());
        cfg.captions.words_per_caption = 3;
        assert!(cfg.validate().is_ok());
    }

    #[tokio::test]
    async fn load_rejects_malformed_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "{not json").await.unwrap();
        assert!(Config::load(&path).await.is_err());
    }
}
