use crate::captions::{self, Caption, CaptionPolicy, CaptionStyle};
use crate::config::Config;
use crate::ffmpeg::{self, RenderArgs, VideoSource};
use crate::model::{AudioTrack, Background, RenderedVideo};
use crate::stage::{Compositor, StageError};
use crate::{logi, logok, logw};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;

const MAX_TIMELINE_SEGMENTS: usize = 500;

#[derive(Debug, Clone, PartialEq)]
pub enum PlannedBackground {
    SolidColor(String),
    /// `timeline` holds indices into `clips`, in playback order.
    /// `loop_input` is set when the segment cap was hit before the footage
    /// covered the narration; the renderer then replays the list.
    Footage {
        clips: Vec<PathBuf>,
        timeline: Vec<usize>,
        covered_secs: f64,
        loop_input: bool,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct RenderPlan {
    pub duration_secs: f64,
    pub background: PlannedBackground,
    pub captions: Vec<Caption>,
}

impl RenderPlan {
    /// `clips` pairs each normalized clip with its probed duration.
    pub fn build(
        clips: &[(PathBuf, f64)],
        duration_secs: f64,
        script: &str,
        policy: &CaptionPolicy,
        background_color: &str,
    ) -> Self {
        let usable: Vec<&(PathBuf, f64)> = clips.iter().filter(|(_, d)| *d > 0.0).collect();
        let background = if usable.is_empty() {
            PlannedBackground::SolidColor(background_color.to_string())
        } else {
            let mut timeline = Vec::new();
            let mut covered = 0.0;
            'fill: loop {
                for (idx, (_, clip_dur)) in usable.iter().enumerate() {
                    if covered >= duration_secs || timeline.len() >= MAX_TIMELINE_SEGMENTS {
                        break 'fill;
                    }
                    timeline.push(idx);
                    covered += clip_dur;
                }
            }
            PlannedBackground::Footage {
                clips: usable.iter().map(|(p, _)| p.clone()).collect(),
                timeline,
                covered_secs: covered,
                loop_input: covered < duration_secs,
            }
        };

        Self {
            duration_secs,
            background,
            captions: captions::build_captions(script, duration_secs, policy),
        }
    }

    pub fn background_kind(&self) -> Background {
        match &self.background {
            PlannedBackground::SolidColor(color) => Background::SolidColor(color.clone()),
            PlannedBackground::Footage {
                clips, timeline, ..
            } => Background::Footage {
                clips: clips.len(),
                segments: timeline.len(),
            },
        }
    }
}

pub struct FfmpegCompositor {
    work_dir: PathBuf,
    output_path: PathBuf,
    width: u32,
    height: u32,
    fps: u32,
    background_color: String,
    policy: CaptionPolicy,
    style: CaptionStyle,
}

impl FfmpegCompositor {
    pub fn new(cfg: &Config) -> Self {
        Self {
            work_dir: cfg.work_dir.clone(),
            output_path: cfg.output_path.clone(),
            width: cfg.width,
            height: cfg.height,
            fps: cfg.fps,
            background_color: cfg.background_color.clone(),
            policy: cfg.captions,
            style: CaptionStyle::default(),
        }
    }

    async fn normalize_visuals(&self, visuals: &[PathBuf]) -> Vec<(PathBuf, f64)> {
        let mut out = Vec::new();
        for (idx, clip) in visuals.iter().enumerate() {
            let name = format!("norm_{}.mp4", idx);
            let norm = self.work_dir.join(&name);
            logi(format!("Normalizing clip {} -> {}", clip.display(), norm.display()));

            match ffmpeg::ffmpeg_normalize_clip(clip, &norm, self.width, self.height, self.fps).await {
                Ok(true) => {}
                Ok(false) => {
                    logw(format!("Normalized clip missing: {}", norm.display()));
                    continue;
                }
                Err(err) => {
                    logw(format!("Skipping clip {}: {:#}", clip.display(), err));
                    continue;
                }
            }

            match ffmpeg::ffprobe_duration_seconds(&norm).await {
                Ok(dur) => out.push((PathBuf::from(name), dur)),
                Err(_) => logw(format!("Bad duration for clip {}", norm.display())),
            }
        }
        out
    }

    async fn write_concat_list(&self, plan: &RenderPlan) -> Result<Option<PathBuf>, StageError> {
        let PlannedBackground::Footage {
            clips, timeline, ..
        } = &plan.background
        else {
            return Ok(None);
        };

        let list_path = self.work_dir.join("concat_list.txt");
        let mut listf = fs::File::create(&list_path).await?;
        for idx in timeline {
            listf
                .write_all(format!("file '{}'\n", clips[*idx].display()).as_bytes())
                .await?;
        }
        listf.flush().await?;
        Ok(Some(list_path))
    }

    async fn write_captions(&self, plan: &RenderPlan) -> Result<Option<PathBuf>, StageError> {
        if plan.captions.is_empty() {
            return Ok(None);
        }

        let ass = captions::to_ass(&plan.captions, &self.style, self.width, self.height)
            .map_err(|e| StageError::Media(format!("{e:#}")))?;
        let ass_path = self.work_dir.join("captions.ass");
        fs::write(&ass_path, ass).await?;

        let srt_path = self.output_path.with_extension("srt");
        fs::write(&srt_path, captions::to_srt(&plan.captions)).await?;
        Ok(Some(ass_path))
    }

    async fn render(&self, plan: &RenderPlan, audio: &AudioTrack) -> Result<(), StageError> {
        let list = self.write_concat_list(plan).await?;
        let subtitles = self.write_captions(plan).await?;

        let video = match (&plan.background, list.as_deref()) {
            (PlannedBackground::Footage { loop_input, .. }, Some(list)) => VideoSource::ConcatList {
                list,
                loop_forever: *loop_input,
            },
            (PlannedBackground::SolidColor(color), _) => VideoSource::SolidColor { color },
            (PlannedBackground::Footage { .. }, None) => {
                return Err(StageError::Media("concat list was not written".to_string()));
            }
        };

        let job = RenderArgs {
            video,
            narration: &audio.path,
            subtitles: subtitles.as_deref(),
            duration_secs: plan.duration_secs,
            width: self.width,
            height: self.height,
            fps: self.fps,
            out_mp4: &self.output_path,
        };

        match ffmpeg::ffmpeg_render(&job).await {
            Ok(true) => Ok(()),
            Ok(false) => Err(StageError::Media(format!(
                "render produced no file at {}",
                self.output_path.display()
            ))),
            Err(err) => Err(StageError::Media(format!("{err:#}"))),
        }
    }
}

async fn ensure_parent(path: &Path) -> Result<(), StageError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).await?;
        }
    }
    Ok(())
}

impl FfmpegCompositor {
    async fn produce(
        &self,
        visuals: &[PathBuf],
        audio: &AudioTrack,
        script: &str,
    ) -> Result<RenderedVideo, StageError> {
        fs::create_dir_all(&self.work_dir).await?;
        ensure_parent(&self.output_path).await?;

        let clips = self.normalize_visuals(visuals).await;
        let plan = RenderPlan::build(
            &clips,
            audio.duration_secs,
            script,
            &self.policy,
            &self.background_color,
        );

        match &plan.background {
            PlannedBackground::SolidColor(color) => logw(format!(
                "No usable visuals; rendering solid {} background for {:.2}s",
                color, plan.duration_secs
            )),
            PlannedBackground::Footage {
                clips,
                timeline,
                covered_secs,
                loop_input,
            } => {
                logi(format!(
                    "Timeline: {} segments from {} clips ({:.2}s of footage for {:.2}s narration)",
                    timeline.len(),
                    clips.len(),
                    covered_secs,
                    plan.duration_secs
                ));
                if *loop_input {
                    logw(format!(
                        "Timeline capped at {} segments; looping the footage",
                        MAX_TIMELINE_SEGMENTS
                    ));
                }
            }
        }
        logi(format!("Captions: {} groups", plan.captions.len()));

        self.render(&plan, audio).await?;

        logok(format!("Rendered {}", self.output_path.display()));
        Ok(RenderedVideo {
            path: self.output_path.clone(),
            duration_secs: plan.duration_secs,
            background: plan.background_kind(),
            captions: plan.captions,
        })
    }
}

#[async_trait]
impl Compositor for FfmpegCompositor {
    async fn compose(
        &self,
        visuals: &[PathBuf],
        audio: &AudioTrack,
        script: &str,
    ) -> Result<RenderedVideo, StageError> {
        let result = self.produce(visuals, audio, script).await;
        if result.is_err() && fs::metadata(&self.output_path).await.is_ok() {
            logw(format!("Removing partial output {}", self.output_path.display()));
            let _ = fs::remove_file(&self.output_path).await;
        }
        result
    }
}
