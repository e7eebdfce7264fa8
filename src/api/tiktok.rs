use crate::api::body_snippet;
use crate::config::Config;
use crate::model::{PublishMetadata, RenderedVideo};
use crate::stage::{Publisher, StageError};
use crate::{logi, logw};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tokio::fs;

const INIT_URL: &str = "https://open.tiktokapis.com/v2/post/publish/video/init/";
const INIT_TIMEOUT: Duration = Duration::from_secs(30);
const UPLOAD_TIMEOUT: Duration = Duration::from_secs(600);

#[derive(Debug, Deserialize)]
struct InitResponse {
    data: Option<InitData>,
    error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
struct InitData {
    publish_id: String,
    upload_url: String,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    code: String,
    #[serde(default)]
    message: String,
}

pub fn init_body(meta: &PublishMetadata, video_size: u64) -> serde_json::Value {
    json!({
        "post_info": {
            "title": meta.title,
            "privacy_level": "SELF_ONLY",
            "disable_comment": false,
        },
        "source_info": {
            "source": "FILE_UPLOAD",
            "video_size": video_size,
            "chunk_size": video_size,
            "total_chunk_count": 1,
        },
    })
}

pub struct TikTokPublisher {
    client: Client,
    access_token: String,
}

impl TikTokPublisher {
    pub fn from_config(client: Client, cfg: &Config) -> Option<Self> {
        Some(Self {
            client,
            access_token: cfg.tiktok_access_token.clone()?,
        })
    }
}

#[async_trait]
impl Publisher for TikTokPublisher {
    fn platform(&self) -> &'static str {
        "TikTok"
    }

    async fn publish(
        &self,
        video: &RenderedVideo,
        meta: &PublishMetadata,
    ) -> Result<String, StageError> {
        let bytes = fs::read(&video.path).await?;
        let size = bytes.len() as u64;
        if size == 0 {
            return Err(StageError::Media("rendered video is empty".to_string()));
        }

        logi("Initializing TikTok upload...");
        let resp = self
            .client
            .post(INIT_URL)
            .bearer_auth(&self.access_token)
            .json(&init_body(meta, size))
            .timeout(INIT_TIMEOUT)
            .send()
            .await?;

        let status = resp.status();
        let raw = resp.text().await?;
        if !status.is_success() {
            logw(format!("TikTok init HTTP {}: {}", status.as_u16(), body_snippet(&raw)));
            return Err(StageError::Status {
                service: "tiktok",
                status: status.as_u16(),
            });
        }

        let init: InitResponse = serde_json::from_str(&raw)
            .map_err(|e| StageError::malformed("tiktok", e.to_string()))?;
        if let Some(err) = init.error.filter(|e| e.code != "ok") {
            return Err(StageError::malformed("tiktok", format!("{}: {}", err.code, err.message)));
        }
        let data = init
            .data
            .ok_or_else(|| StageError::malformed("tiktok", "init response has no data"))?;

        let resp = self
            .client
            .put(&data.upload_url)
            .header("Content-Type", "video/mp4")
            .header("Content-Range", format!("bytes 0-{}/{}", size - 1, size))
            .body(bytes)
            .timeout(UPLOAD_TIMEOUT)
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(StageError::Status {
                service: "tiktok upload",
                status: resp.status().as_u16(),
            });
        }

        Ok(data.publish_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Fact;

    #[test]
    fn init_body_is_single_chunk() {
        let meta = PublishMetadata::for_fact(&Fact::fallback(), "Texte");
        let body = init_body(&meta, 1234);
        assert_eq!(body["source_info"]["video_size"], 1234);
        assert_eq!(body["source_info"]["chunk_size"], 1234);
        assert_eq!(body["source_info"]["total_chunk_count"], 1);
        assert_eq!(body["post_info"]["title"], "Fait incroyable : Le miel ne périme jamais");
    }

    #[test]
    fn publisher_requires_token() {
        let cfg = Config::default();
        assert!(TikTokPublisher::from_config(Client::new(), &cfg).is_none());
    }
}
