use crate::ffmpeg;
use crate::model::AudioTrack;
use crate::stage::StageError;
use std::path::Path;
use tokio::fs;

pub mod elevenlabs;
pub mod google_tts;
pub mod openai;
pub mod pexels;
pub mod tiktok;
pub mod wikipedia;
pub mod youtube;

pub const USER_AGENT: &str = concat!(
    "fact-shorts/",
    env!("CARGO_PKG_VERSION"),
    " (automated shorts generator)"
);

pub(crate) fn body_snippet(raw: &str) -> String {
    raw.chars().take(800).collect()
}

/// Writes synthesized audio and measures it; shared by the narrators.
pub(crate) async fn store_audio(out_path: &Path, bytes: &[u8]) -> Result<AudioTrack, StageError> {
    if bytes.is_empty() {
        return Err(StageError::malformed("speech synthesis", "empty audio payload"));
    }
    if let Some(parent) = out_path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).await?;
        }
    }
    fs::write(out_path, bytes).await?;

    let duration_secs = ffmpeg::ffprobe_duration_seconds(out_path)
        .await
        .map_err(|e| StageError::Media(format!("narration duration: {e:#}")))?;

    Ok(AudioTrack {
        path: out_path.to_path_buf(),
        duration_secs,
    })
}
