use anyhow::{Context, Result};
use std::path::Path;
use tokio::process::Command;

pub async fn run_cmd(args: &[String]) -> Result<()> {
    if args.is_empty() {
        return Ok(());
    }

    let mut cmd = Command::new(&args[0]);
    if args.len() > 1 {
        cmd.args(&args[1..]);
    }

    let status = cmd.status().await.context("Command execution failed")?;
    if !status.success() {
        return Err(anyhow::anyhow!("Command failed: {:?}", args));
    }

    Ok(())
}

pub async fn ffprobe_duration_seconds(path: &Path) -> Result<f64> {
    let output = Command::new("ffprobe")
        .args([
            "-v",
            "error",
            "-show_entries",
            "format=duration",
            "-of",
            "default=noprint_wrappers=1:nokey=1",
        ])
        .arg(path)
        .output()
        .await
        .context("ffprobe duration failed")?;

    if !output.status.success() {
        return Err(anyhow::anyhow!("ffprobe failed"));
    }

    let text = String::from_utf8_lossy(&output.stdout).trim().to_string();
    let duration = text.parse::<f64>().unwrap_or(-1.0);
    if duration <= 0.1 {
        return Err(anyhow::anyhow!("Invalid duration"));
    }
    Ok(duration)
}

fn backslash_escape(raw: &str, special: &[char]) -> String {
    let mut out = String::with_capacity(raw.len());
    for ch in raw.chars() {
        if special.contains(&ch) {
            out.push('\\');
        }
        out.push(ch);
    }
    out
}

/// Escapes a path used as a filter option value inside `-vf`.
///
/// The value is parsed twice: once by the filter's option parser and once by
/// the filtergraph parser, so each level gets its own escaping pass.
pub fn escape_filter_path(path: &Path) -> String {
    let raw = path.display().to_string();
    let option_level = backslash_escape(&raw, &['\\', '\'', ':']);
    backslash_escape(&option_level, &['\\', '\'', '[', ']', ',', ';'])
}

fn base_args() -> Vec<String> {
    vec![
        "ffmpeg".to_string(),
        "-y".to_string(),
        "-hide_banner".to_string(),
        "-loglevel".to_string(),
        "error".to_string(),
    ]
}

fn encode_args(fps: u32) -> Vec<String> {
    vec![
        "-r".to_string(),
        fps.to_string(),
        "-c:v".to_string(),
        "libx264".to_string(),
        "-pix_fmt".to_string(),
        "yuv420p".to_string(),
        "-preset".to_string(),
        "veryfast".to_string(),
        "-crf".to_string(),
        "22".to_string(),
    ]
}

/// Scale to cover `width`x`height`, crop the centre, drop audio.
pub fn normalize_clip_args(in_mp4: &Path, out_mp4: &Path, width: u32, height: u32, fps: u32) -> Vec<String> {
    let filter = format!(
        "scale={w}:{h}:force_original_aspect_ratio=increase,crop={w}:{h},setsar=1,fps={fps}",
        w = width,
        h = height,
        fps = fps
    );

    let mut args = base_args();
    args.extend([
        "-i".to_string(),
        in_mp4.display().to_string(),
        "-vf".to_string(),
        filter,
        "-an".to_string(),
    ]);
    args.extend(encode_args(fps));
    args.push(out_mp4.display().to_string());
    args
}

pub async fn ffmpeg_normalize_clip(in_mp4: &Path, out_mp4: &Path, width: u32, height: u32, fps: u32) -> Result<bool> {
    run_cmd(&normalize_clip_args(in_mp4, out_mp4, width, height, fps)).await?;
    Ok(out_mp4.exists())
}

/// Video input of the final render.
#[derive(Debug, Clone, PartialEq)]
pub enum VideoSource<'a> {
    SolidColor { color: &'a str },
    /// `loop_forever` replays the list until `-t` cuts the output.
    ConcatList { list: &'a Path, loop_forever: bool },
}

pub struct RenderArgs<'a> {
    pub video: VideoSource<'a>,
    pub narration: &'a Path,
    pub subtitles: Option<&'a Path>,
    pub duration_secs: f64,
    pub width: u32,
    pub height: u32,
    pub fps: u32,
    pub out_mp4: &'a Path,
}

/// Final mux: background or footage, narration replacing any clip audio,
/// burned-in subtitles, cut to exactly the narration length.
pub fn render_args(job: &RenderArgs<'_>) -> Vec<String> {
    let duration = format!("{:.3}", job.duration_secs);
    let mut args = base_args();

    match &job.video {
        VideoSource::SolidColor { color } => {
            args.extend([
                "-f".to_string(),
                "lavfi".to_string(),
                "-i".to_string(),
                format!(
                    "color=c={}:s={}x{}:r={}:d={}",
                    color, job.width, job.height, job.fps, duration
                ),
            ]);
        }
        VideoSource::ConcatList { list, loop_forever } => {
            if *loop_forever {
                args.extend(["-stream_loop".to_string(), "-1".to_string()]);
            }
            args.extend([
                "-f".to_string(),
                "concat".to_string(),
                "-safe".to_string(),
                "0".to_string(),
                "-i".to_string(),
                list.display().to_string(),
            ]);
        }
    }

    args.extend(["-i".to_string(), job.narration.display().to_string()]);

    if let Some(subs) = job.subtitles {
        args.extend([
            "-vf".to_string(),
            format!("subtitles=filename={}", escape_filter_path(subs)),
        ]);
    }

    args.extend([
        "-map".to_string(),
        "0:v:0".to_string(),
        "-map".to_string(),
        "1:a:0".to_string(),
        "-t".to_string(),
        duration,
    ]);
    args.extend(encode_args(job.fps));
    args.extend([
        "-c:a".to_string(),
        "aac".to_string(),
        "-b:a".to_string(),
        "192k".to_string(),
        "-movflags".to_string(),
        "+faststart".to_string(),
        job.out_mp4.display().to_string(),
    ]);
    args
}

pub async fn ffmpeg_render(job: &RenderArgs<'_>) -> Result<bool> {
    run_cmd(&render_args(job)).await?;
    Ok(job.out_mp4.exists())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn solid_background_render_is_cut_to_duration() {
        let narration = PathBuf::from("clips/audio/voiceover.mp3");
        let out = PathBuf::from("output/final_video.mp4");
        let args = render_args(&RenderArgs {
            video: VideoSource::SolidColor { color: "0x1a1a2e" },
            narration: &narration,
            subtitles: None,
            duration_secs: 32.0,
            width: 1080,
            height: 1920,
            fps: 30,
            out_mp4: &out,
        });

        assert!(args.contains(&"color=c=0x1a1a2e:s=1080x1920:r=30:d=32.000".to_string()));
        let t = args.iter().position(|a| a == "-t").unwrap();
        assert_eq!(args[t + 1], "32.000");
        assert_eq!(args.last().unwrap(), "output/final_video.mp4");
    }

    #[test]
    fn narration_replaces_clip_audio() {
        let list = PathBuf::from("clips/concat_list.txt");
        let narration = PathBuf::from("clips/audio/voiceover.mp3");
        let subs = PathBuf::from("clips/captions.ass");
        let out = PathBuf::from("out.mp4");
        let args = render_args(&RenderArgs {
            video: VideoSource::ConcatList {
                list: &list,
                loop_forever: false,
            },
            narration: &narration,
            subtitles: Some(&subs),
            duration_secs: 12.5,
            width: 1080,
            height: 1920,
            fps: 30,
            out_mp4: &out,
        });

        let joined = args.join(" ");
        assert!(joined.contains("-f concat -safe 0 -i clips/concat_list.txt"));
        assert!(joined.contains("-map 0:v:0 -map 1:a:0 -t 12.500"));
        assert!(joined.contains("subtitles=filename=clips/captions.ass"));
        assert!(!joined.contains("-stream_loop"));
    }

    #[test]
    fn capped_timeline_loops_concat_input() {
        let list = PathBuf::from("clips/concat_list.txt");
        let narration = PathBuf::from("clips/audio/voiceover.mp3");
        let out = PathBuf::from("out.mp4");
        let args = render_args(&RenderArgs {
            video: VideoSource::ConcatList {
                list: &list,
                loop_forever: true,
            },
            narration: &narration,
            subtitles: None,
            duration_secs: 120.0,
            width: 1080,
            height: 1920,
            fps: 30,
            out_mp4: &out,
        });

        let joined = args.join(" ");
        assert!(joined.contains("-stream_loop -1 -f concat -safe 0 -i clips/concat_list.txt"));
        assert!(joined.contains("-t 120.000"));
    }

    #[test]
    fn normalize_crops_to_vertical_frame() {
        let args = normalize_clip_args(Path::new("a.mp4"), Path::new("b.mp4"), 1080, 1920, 30);
        assert!(args.contains(
            &"scale=1080:1920:force_original_aspect_ratio=increase,crop=1080:1920,setsar=1,fps=30"
                .to_string()
        ));
        assert!(args.contains(&"-an".to_string()));
    }

    #[test]
    fn filter_paths_are_escaped_for_option_and_graph() {
        assert_eq!(
            escape_filter_path(Path::new("C:\\tmp\\it's.ass")),
            "C\\\\:\\\\\\\\tmp\\\\\\\\it\\\\\\'s.ass"
        );
        assert_eq!(
            escape_filter_path(Path::new("out/my clip:1,a.ass")),
            "out/my clip\\\\:1\\,a.ass"
        );
        assert_eq!(escape_filter_path(Path::new("clips/captions.ass")), "clips/captions.ass");
    }
}
