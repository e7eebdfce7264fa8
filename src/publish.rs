use crate::model::{PublishMetadata, RenderedVideo, RunRecord};
use crate::stage::Publisher;
use crate::{logi, logok, logw};
use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use std::path::Path;
use tokio::fs;

#[derive(Debug, Clone, PartialEq)]
pub struct PublishReport {
    pub platform: &'static str,
    /// Platform identifier on success, error text otherwise.
    pub result: Result<String, String>,
}

/// Tries every publisher in turn. Failures are logged and reported, never raised.
pub async fn publish_all(
    publishers: &[Box<dyn Publisher>],
    video: &RenderedVideo,
    meta: &PublishMetadata,
) -> Vec<PublishReport> {
    let mut reports = Vec::with_capacity(publishers.len());
    for publisher in publishers {
        let platform = publisher.platform();
        logi(format!("Publishing on {}...", platform));
        let result = match publisher.publish(video, meta).await {
            Ok(id) => {
                logok(format!("Published on {}: {}", platform, id));
                Ok(id)
            }
            Err(err) => {
                logw(format!("{} upload failed: {}", platform, err));
                Err(err.to_string())
            }
        };
        reports.push(PublishReport { platform, result });
    }
    reports
}

pub fn run_record(video: &RenderedVideo, meta: &PublishMetadata, at: DateTime<Local>) -> RunRecord {
    RunRecord {
        title: meta.title.clone(),
        description: meta.description.clone(),
        video_path: video.path.display().to_string(),
        date: at.to_rfc3339(),
    }
}

pub async fn write_run_record(path: &Path, record: &RunRecord) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .await
                .with_context(|| format!("Failed to create dir {}", parent.display()))?;
        }
    }
    let json = serde_json::to_string_pretty(record)?;
    fs::write(path, json)
        .await
        .with_context(|| format!("Failed to write run record: {}", path.display()))?;
    Ok(())
}
