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

const TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const UPLOAD_URL: &str =
    "https://www.googleapis.com/upload/youtube/v3/videos?uploadType=resumable&part=snippet,status";
const TOKEN_TIMEOUT: Duration = Duration::from_secs(30);
const UPLOAD_TIMEOUT: Duration = Duration::from_secs(600);
const SHORTS_HASHTAGS: &str = "#Shorts #FaitsSurprenants";

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Debug, Deserialize)]
struct VideoResponse {
    id: String,
}

#[derive(Debug, Clone)]
enum Credentials {
    AccessToken(String),
    Refresh {
        client_id: String,
        client_secret: String,
        refresh_token: String,
    },
}

pub struct YouTubePublisher {
    client: Client,
    credentials: Credentials,
}

/// The `videos.insert` resource for a Short.
pub fn video_resource(meta: &PublishMetadata) -> serde_json::Value {
    json!({
        "snippet": {
            "title": meta.title,
            "description": format!("{}\n\n{}", meta.description, SHORTS_HASHTAGS),
            "tags": meta.tags,
            "categoryId": meta.category_id,
        },
        "status": {
            "privacyStatus": meta.privacy,
            "selfDeclaredMadeForKids": false,
        },
    })
}

impl YouTubePublisher {
    /// `None` when neither an access token nor a full refresh triple is configured.
    pub fn from_config(client: Client, cfg: &Config) -> Option<Self> {
        let credentials = if let Some(token) = cfg.youtube_access_token.clone() {
            Credentials::AccessToken(token)
        } else {
            Credentials::Refresh {
                client_id: cfg.youtube_client_id.clone()?,
                client_secret: cfg.youtube_client_secret.clone()?,
                refresh_token: cfg.youtube_refresh_token.clone()?,
            }
        };
        Some(Self {
            client,
            credentials,
        })
    }

    async fn access_token(&self) -> Result<String, StageError> {
        let (client_id, client_secret, refresh_token) = match &self.credentials {
            Credentials::AccessToken(token) => return Ok(token.clone()),
            Credentials::Refresh {
                client_id,
                client_secret,
                refresh_token,
            } => (client_id, client_secret, refresh_token),
        };

        let resp = self
            .client
            .post(TOKEN_URL)
            .form(&[
                ("client_id", client_id.as_str()),
                ("client_secret", client_secret.as_str()),
                ("refresh_token", refresh_token.as_str()),
                ("grant_type", "refresh_token"),
            ])
            .timeout(TOKEN_TIMEOUT)
            .send()
            .await?;

        let status = resp.status();
        let raw = resp.text().await?;
        if !status.is_success() {
            logw(format!("YouTube token refresh HTTP {}: {}", status.as_u16(), body_snippet(&raw)));
            return Err(StageError::Status {
                service: "google oauth",
                status: status.as_u16(),
            });
        }
        let token: TokenResponse = serde_json::from_str(&raw)
            .map_err(|e| StageError::malformed("google oauth", e.to_string()))?;
        Ok(token.access_token)
    }
}

#[async_trait]
impl Publisher for YouTubePublisher {
    fn platform(&self) -> &'static str {
        "YouTube"
    }

    async fn publish(
        &self,
        video: &RenderedVideo,
        meta: &PublishMetadata,
    ) -> Result<String, StageError> {
        let token = self.access_token().await?;
        let bytes = fs::read(&video.path).await?;

        logi(format!("Starting YouTube upload session ({} bytes)...", bytes.len()));
        let init = self
            .client
            .post(UPLOAD_URL)
            .bearer_auth(&token)
            .header("X-Upload-Content-Type", "video/mp4")
            .header("X-Upload-Content-Length", bytes.len().to_string())
            .json(&video_resource(meta))
            .timeout(TOKEN_TIMEOUT)
            .send()
            .await?;

        if !init.status().is_success() {
            return Err(StageError::Status {
                service: "youtube",
                status: init.status().as_u16(),
            });
        }
        let session_url = init
            .headers()
            .get("Location")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .ok_or_else(|| StageError::malformed("youtube", "upload session has no Location"))?;

        let resp = self
            .client
            .put(&session_url)
            .bearer_auth(&token)
            .header("Content-Type", "video/mp4")
            .body(bytes)
            .timeout(UPLOAD_TIMEOUT)
            .send()
            .await?;

        let status = resp.status();
        let raw = resp.text().await?;
        if !status.is_success() {
            logw(format!("YouTube upload HTTP {}: {}", status.as_u16(), body_snippet(&raw)));
            return Err(StageError::Status {
                service: "youtube",
                status: status.as_u16(),
            });
        }

        let uploaded: VideoResponse = serde_json::from_str(&raw)
            .map_err(|e| StageError::malformed("youtube", e.to_string()))?;
        Ok(uploaded.id)
    }
}
