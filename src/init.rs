use crate::config::Config;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tokio::fs;

fn required_dirs(cfg: &Config) -> Vec<PathBuf> {
    let mut dirs = vec![cfg.work_dir.clone(), cfg.work_dir.join("audio")];
    for file in [&cfg.output_path, &cfg.record_path] {
        if let Some(parent) = file.parent() {
            if !parent.as_os_str().is_empty() && !dirs.iter().any(|d| d == parent) {
                dirs.push(parent.to_path_buf());
            }
        }
    }
    dirs
}

pub async fn ensure_directories(cfg: &Config) -> Result<()> {
    for dir in required_dirs(cfg) {
        if !Path::new(&dir).exists() {
            fs::create_dir_all(&dir)
                .await
                .with_context(|| format!("Failed to create {}", dir.display()))?;
            tracing::info!("Created directory: {}", dir.display());
        }
    }
    Ok(())
}

async fn tool_available(name: &str) -> bool {
    match tokio::process::Command::new(name)
        .arg("-version")
        .output()
        .await
    {
        Ok(output) => output.status.success(),
        Err(_) => false,
    }
}

pub async fn check_ffmpeg() -> bool {
    tool_available("ffmpeg").await && tool_available("ffprobe").await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_and_record_parents_are_deduplicated() {
        let dirs = required_dirs(&Config::default());
        assert_eq!(
            dirs,
            vec![
                PathBuf::from("clips"),
                PathBuf::from("clips/audio"),
                PathBuf::from("output"),
            ]
        );
    }

    #[tokio::test]
    async fn creates_missing_directories() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = Config {
            work_dir: dir.path().join("work"),
            output_path: dir.path().join("out/video.mp4"),
            record_path: dir.path().join("records/run.json"),
            ..Config::default()
        };
        ensure_directories(&cfg).await.unwrap();
        assert!(dir.path().join("work/audio").is_dir());
        assert!(dir.path().join("out").is_dir());
        assert!(dir.path().join("records").is_dir());
    }
}
