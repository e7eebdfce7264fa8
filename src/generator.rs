use crate::api::elevenlabs::ElevenLabsNarrator;
use crate::api::google_tts::GoogleTtsNarrator;
use crate::api::openai::OpenAiScriptWriter;
use crate::api::pexels::PexelsVisualSourcer;
use crate::api::tiktok::TikTokPublisher;
use crate::api::wikipedia::WikipediaFactSource;
use crate::api::youtube::YouTubePublisher;
use crate::compositor::FfmpegCompositor;
use crate::config::{Config, TtsProvider};
use crate::model::{Background, Fact, PublishMetadata, RenderedVideo};
use crate::publish::{self, PublishReport};
use crate::script::fallback_script;
use crate::stage::{
    Compositor, FactSource, Narrator, Publisher, ScriptWriter, Stage, StageError, StageOutcome,
    VisualSourcer,
};
use crate::{loge, logi, logok, logw};
use anyhow::{Context, Result};
use rand::{Rng, SeedableRng};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::fs;
use walkdir::WalkDir;

fn now_seed() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

async fn dir_exists(path: &Path) -> bool {
    fs::metadata(path).await.map(|m| m.is_dir()).unwrap_or(false)
}

async fn clear_directory_contents(dir_path: &Path) -> Result<bool> {
    if !dir_exists(dir_path).await {
        return Ok(true);
    }

    let mut clean = true;
    for entry in WalkDir::new(dir_path).min_depth(1).contents_first(true) {
        let entry = entry?;
        let path = entry.path();
        let removed = if entry.file_type().is_dir() {
            fs::remove_dir(path).await
        } else {
            fs::remove_file(path).await
        };
        clean &= removed.is_ok();
    }

    Ok(clean)
}

/// Applies the degrade-and-continue policy to a stage result.
fn recover<T>(stage: Stage, result: Result<T, StageError>, fallback: impl FnOnce() -> T) -> StageOutcome<T> {
    match result {
        Ok(value) => StageOutcome::Produced(value),
        Err(err) => {
            let reason = err.to_string();
            logw(format!("{} stage degraded: {}", stage, reason));
            StageOutcome::Degraded {
                value: fallback(),
                reason,
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct RunSettings {
    pub themes: Vec<String>,
    pub theme_override: Option<String>,
    pub clip_count: usize,
    pub narration_path: PathBuf,
    pub record_path: PathBuf,
}

impl RunSettings {
    pub fn from_config(cfg: &Config) -> Self {
        Self {
            themes: cfg.themes.clone(),
            theme_override: None,
            clip_count: cfg.clip_count,
            narration_path: cfg.work_dir.join("audio").join("voiceover.mp3"),
            record_path: cfg.record_path.clone(),
        }
    }

    pub fn choose_theme(&self) -> String {
        if let Some(theme) = &self.theme_override {
            return theme.clone();
        }
        if self.themes.is_empty() {
            return String::new();
        }
        let mut rng = rand::rngs::StdRng::seed_from_u64(now_seed());
        self.themes[rng.gen_range(0..self.themes.len())].clone()
    }
}

#[derive(Debug)]
pub struct RunSummary {
    pub fact: StageOutcome<Fact>,
    pub script: StageOutcome<String>,
    pub theme: String,
    pub visuals: StageOutcome<Vec<PathBuf>>,
    pub video: RenderedVideo,
    pub publish: Vec<PublishReport>,
    pub record_path: Option<PathBuf>,
}

#[derive(Debug)]
pub enum RunOutcome {
    Rendered(Box<RunSummary>),
    Aborted { stage: Stage, reason: String },
}

impl RunOutcome {
    pub fn exit_code(&self) -> i32 {
        match self {
            RunOutcome::Rendered(_) => 0,
            RunOutcome::Aborted { .. } => 1,
        }
    }
}

pub struct Pipeline {
    pub facts: Box<dyn FactSource>,
    pub writer: Box<dyn ScriptWriter>,
    pub narrator: Box<dyn Narrator>,
    pub visuals: Box<dyn VisualSourcer>,
    pub compositor: Box<dyn Compositor>,
    pub publishers: Vec<Box<dyn Publisher>>,
    pub settings: RunSettings,
}

impl Pipeline {
    /// Wires the production collaborators described by `cfg`.
    pub fn from_config(cfg: &Config, client: reqwest::Client) -> Self {
        let narrator: Box<dyn Narrator> = match cfg.tts_provider {
            TtsProvider::Google => Box::new(GoogleTtsNarrator::new(client.clone(), cfg)),
            TtsProvider::ElevenLabs => Box::new(ElevenLabsNarrator::new(client.clone(), cfg)),
        };

        let mut publishers: Vec<Box<dyn Publisher>> = Vec::new();
        if cfg.upload {
            if let Some(yt) = YouTubePublisher::from_config(client.clone(), cfg) {
                publishers.push(Box::new(yt));
            }
            if let Some(tt) = TikTokPublisher::from_config(client.clone(), cfg) {
                publishers.push(Box::new(tt));
            }
        }

        Self {
            facts: Box::new(WikipediaFactSource::new(client.clone(), cfg)),
            writer: Box::new(OpenAiScriptWriter::new(client.clone(), cfg)),
            narrator,
            visuals: Box::new(PexelsVisualSourcer::new(client, cfg)),
            compositor: Box::new(FfmpegCompositor::new(cfg)),
            publishers,
            settings: RunSettings::from_config(cfg),
        }
    }

    pub async fn run(&self) -> RunOutcome {
        logi("Looking for an interesting fact...");
        let fact = recover(Stage::Fact, self.facts.fetch_fact().await, Fact::fallback);
        if fact.is_degraded() {
            logi(format!("Using fallback fact: {}", fact.value().title));
        }

        logi("Writing the video script...");
        let script = recover(
            Stage::Script,
            self.writer.write_script(fact.value()).await,
            || fallback_script(fact.value()),
        );
        logi(format!("Script:\n{}", script.value()));

        logi("Generating narration...");
        let audio = match self
            .narrator
            .narrate(script.value(), &self.settings.narration_path)
            .await
        {
            Ok(audio) => audio,
            Err(err) => {
                loge(format!("Cannot continue without narration: {}", err));
                return RunOutcome::Aborted {
                    stage: Stage::Narration,
                    reason: err.to_string(),
                };
            }
        };
        logok(format!(
            "Narration ready: {} ({:.2}s)",
            audio.path.display(),
            audio.duration_secs
        ));

        let theme = self.settings.choose_theme();
        logi(format!("Downloading stock clips for theme: {}", theme));
        let visuals = recover(
            Stage::Visuals,
            self.visuals.fetch_clips(&theme, self.settings.clip_count).await,
            Vec::new,
        );
        if visuals.value().is_empty() {
            logw("No clips downloaded; using a solid background.");
        }

        logi("Composing the final video...");
        let video = match self
            .compositor
            .compose(visuals.value(), &audio, script.value())
            .await
        {
            Ok(video) => video,
            Err(err) => {
                loge(format!("Video composition failed: {}", err));
                return RunOutcome::Aborted {
                    stage: Stage::Compose,
                    reason: err.to_string(),
                };
            }
        };
        if let Background::SolidColor(color) = &video.background {
            logi(format!("Rendered over solid background {}", color));
        }

        let meta = PublishMetadata::for_fact(fact.value(), script.value());
        let reports = if self.publishers.is_empty() {
            logi("No upload targets configured; recording run locally only.");
            Vec::new()
        } else {
            publish::publish_all(&self.publishers, &video, &meta).await
        };

        let record = publish::run_record(&video, &meta, chrono::Local::now());
        let record_path = match publish::write_run_record(&self.settings.record_path, &record).await {
            Ok(()) => {
                logok(format!("Run record written: {}", self.settings.record_path.display()));
                Some(self.settings.record_path.clone())
            }
            Err(err) => {
                logw(format!("Could not write run record: {:#}", err));
                None
            }
        };

        RunOutcome::Rendered(Box::new(RunSummary {
            fact,
            script,
            theme,
            visuals,
            video,
            publish: reports,
            record_path,
        }))
    }
}

pub async fn run_generation(cfg: &Config, theme_override: Option<String>) -> Result<RunOutcome> {
    let client = reqwest::Client::builder()
        .connect_timeout(Duration::from_secs(30))
        .build()
        .context("Failed to build HTTP client")?;

    logi(format!("Clearing {} folder...", cfg.work_dir.display()));
    if !clear_directory_contents(&cfg.work_dir).await? {
        logw(format!(
            "Failed to fully clear {} (continuing anyway).",
            cfg.work_dir.display()
        ));
    }
    fs::create_dir_all(cfg.work_dir.join("audio")).await?;

    if cfg.upload && !cfg.youtube_configured() && cfg.tiktok_access_token.is_none() {
        logi("No platform credentials found; uploads are skipped.");
    }

    let mut pipeline = Pipeline::from_config(cfg, client);
    pipeline.settings.theme_override = theme_override;
    Ok(pipeline.run().await)
}
