//! Stage contracts shared by the pipeline and its collaborators.
//!
//! Each stage reports failure as a [`StageError`]; whether that failure is
//! replaced by a fallback, an empty result, or aborts the run is decided by
//! the orchestrator in [`crate::generator`].

use crate::model::{AudioTrack, Fact, PublishMetadata, RenderedVideo};
use async_trait::async_trait;
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StageError {
    #[error("{0} is not configured")]
    MissingConfig(&'static str),
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("{service} returned HTTP {status}")]
    Status { service: &'static str, status: u16 },
    #[error("malformed {service} response: {detail}")]
    Malformed {
        service: &'static str,
        detail: String,
    },
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("media processing failed: {0}")]
    Media(String),
}

impl StageError {
    pub fn malformed(service: &'static str, detail: impl Into<String>) -> Self {
        Self::Malformed {
            service,
            detail: detail.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Fact,
    Script,
    Narration,
    Visuals,
    Compose,
    Publish,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Fact => "fact",
            Stage::Script => "script",
            Stage::Narration => "narration",
            Stage::Visuals => "visuals",
            Stage::Compose => "compose",
            Stage::Publish => "publish",
        };
        f.write_str(name)
    }
}

/// A stage value together with how it was obtained.
#[derive(Debug, Clone, PartialEq)]
pub enum StageOutcome<T> {
    Produced(T),
    Degraded { value: T, reason: String },
}

impl<T> StageOutcome<T> {
    pub fn value(&self) -> &T {
        match self {
            StageOutcome::Produced(value) => value,
            StageOutcome::Degraded { value, .. } => value,
        }
    }

    pub fn into_value(self) -> T {
        match self {
            StageOutcome::Produced(value) => value,
            StageOutcome::Degraded { value, .. } => value,
        }
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self, StageOutcome::Degraded { .. })
    }
}

#[async_trait]
pub trait FactSource: Send + Sync {
    async fn fetch_fact(&self) -> Result<Fact, StageError>;
}

#[async_trait]
pub trait ScriptWriter: Send + Sync {
    async fn write_script(&self, fact: &Fact) -> Result<String, StageError>;
}

#[async_trait]
pub trait Narrator: Send + Sync {
    /// Synthesizes `script` into `out_path` and reports the measured duration.
    async fn narrate(&self, script: &str, out_path: &Path) -> Result<AudioTrack, StageError>;
}

#[async_trait]
pub trait VisualSourcer: Send + Sync {
    async fn fetch_clips(&self, theme: &str, count: usize) -> Result<Vec<PathBuf>, StageError>;
}

#[async_trait]
pub trait Compositor: Send + Sync {
    async fn compose(
        &self,
        visuals: &[PathBuf],
        audio: &AudioTrack,
        script: &str,
    ) -> Result<RenderedVideo, StageError>;
}

#[async_trait]
pub trait Publisher: Send + Sync {
    fn platform(&self) -> &'static str;

    /// Uploads the video and returns the platform's identifier for it.
    async fn publish(
        &self,
        video: &RenderedVideo,
        meta: &PublishMetadata,
    ) -> Result<String, StageError>;
}
