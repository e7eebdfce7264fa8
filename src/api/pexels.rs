use crate::api::USER_AGENT;
use crate::config::Config;
use crate::stage::{StageError, VisualSourcer};
use crate::{logi, logok};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;
use tokio::fs;

const SEARCH_URL: &str = "https://api.pexels.com/videos/search";
const SEARCH_TIMEOUT: Duration = Duration::from_secs(30);
const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(120);

#[derive(Debug, Clone, Deserialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub videos: Vec<Video>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Video {
    #[serde(default)]
    pub video_files: Vec<VideoFile>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VideoFile {
    pub link: String,
    pub quality: Option<String>,
}

/// Prefers the standard-definition rendition, else the first one listed.
pub fn pick_rendition(files: &[VideoFile]) -> Option<&VideoFile> {
    files
        .iter()
        .find(|f| f.quality.as_deref() == Some("sd"))
        .or_else(|| files.first())
}

/// Download links for up to `count` videos, in result order.
pub fn select_links(resp: &SearchResponse, count: usize) -> Vec<String> {
    resp.videos
        .iter()
        .take(count)
        .filter_map(|v| pick_rendition(&v.video_files))
        .map(|f| f.link.clone())
        .collect()
}

pub struct PexelsVisualSourcer {
    client: Client,
    api_key: Option<String>,
    work_dir: PathBuf,
}

impl PexelsVisualSourcer {
    pub fn new(client: Client, cfg: &Config) -> Self {
        Self {
            client,
            api_key: cfg.pexels_key.clone(),
            work_dir: cfg.work_dir.clone(),
        }
    }

    async fn search(&self, key: &str, theme: &str, count: usize) -> Result<SearchResponse, StageError> {
        let per_page = count.to_string();
        let resp = self
            .client
            .get(SEARCH_URL)
            .header("Authorization", key)
            .header("User-Agent", USER_AGENT)
            .query(&[
                ("query", theme),
                ("per_page", per_page.as_str()),
                ("orientation", "portrait"),
            ])
            .timeout(SEARCH_TIMEOUT)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            return Err(StageError::Status {
                service: "pexels",
                status: status.as_u16(),
            });
        }

        let raw = resp.text().await?;
        serde_json::from_str(&raw).map_err(|e| StageError::malformed("pexels", e.to_string()))
    }
}

#[async_trait]
impl VisualSourcer for PexelsVisualSourcer {
    async fn fetch_clips(&self, theme: &str, count: usize) -> Result<Vec<PathBuf>, StageError> {
        let Some(key) = self.api_key.as_deref() else {
            return Err(StageError::MissingConfig("PEXELS_API_KEY"));
        };
        if count == 0 {
            return Ok(Vec::new());
        }

        logi(format!("Searching stock videos for theme: {}", theme));
        let results = self.search(key, theme, count).await?;
        let links = select_links(&results, count);

        fs::create_dir_all(&self.work_dir).await?;
        let mut files = Vec::with_capacity(links.len());
        for (idx, link) in links.iter().enumerate() {
            let resp = self
                .client
                .get(link)
                .header("User-Agent", USER_AGENT)
                .timeout(DOWNLOAD_TIMEOUT)
                .send()
                .await?;
            if !resp.status().is_success() {
                return Err(StageError::Status {
                    service: "pexels download",
                    status: resp.status().as_u16(),
                });
            }

            let bytes = resp.bytes().await?;
            let path = self.work_dir.join(format!("video_{}.mp4", idx));
            fs::write(&path, &bytes).await?;
            logok(format!("Downloaded {} ({} bytes)", path.display(), bytes.len()));
            files.push(path);
        }

        Ok(files)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file(link: &str, quality: Option<&str>) -> VideoFile {
        VideoFile {
            link: link.to_string(),
            quality: quality.map(str::to_string),
        }
    }

    #[test]
    fn sd_rendition_is_preferred() {
        let files = [file("hd", Some("hd")), file("sd", Some("sd")), file("uhd", Some("uhd"))];
        assert_eq!(pick_rendition(&files).unwrap().link, "sd");
    }

    #[test]
    fn first_rendition_when_no_sd() {
        let files = [file("hd", Some("hd")), file("none", None)];
        assert_eq!(pick_rendition(&files).unwrap().link, "hd");
        assert!(pick_rendition(&[]).is_none());
    }

    #[test]
    fn links_respect_count_and_skip_empty_videos() {
        let raw = r#"{"videos":[
            {"video_files":[{"link":"a-hd","quality":"hd"},{"link":"a-sd","quality":"sd"}]},
            {"video_files":[]},
            {"video_files":[{"link":"c-hd","quality":"hd"}]},
            {"video_files":[{"link":"d-sd","quality":"sd"}]}
        ]}"#;
        let resp: SearchResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(select_links(&resp, 3), vec!["a-sd".to_string(), "c-hd".to_string()]);
    }

    #[test]
    fn missing_videos_key_is_empty() {
        let resp: SearchResponse = serde_json::from_str("{}").unwrap();
        assert!(select_links(&resp, 2).is_empty());
    }

    #[tokio::test]
    async fn missing_key_is_reported() {
        let sourcer = PexelsVisualSourcer::new(Client::new(), &Config::default());
        let err = sourcer.fetch_clips("espace", 2).await.unwrap_err();
        assert!(matches!(err, StageError::MissingConfig("PEXELS_API_KEY")));
    }
}
