use anyhow::Result;
use clap::Parser;
use fact_shorts::captions::CaptionTiming;
use fact_shorts::config::Config;
use fact_shorts::generator::{run_generation, RunOutcome};
use fact_shorts::init;
use std::path::PathBuf;

/// Builds one short vertical video about a random fact.
#[derive(Parser, Debug)]
#[command(name = "fact-shorts", version)]
struct Args {
    /// JSON config file (optional; environment variables override it)
    #[arg(short, long, default_value = "config.json")]
    config: PathBuf,

    /// Pin the stock-footage theme instead of picking one at random
    #[arg(long)]
    theme: Option<String>,

    /// Number of stock clips to download
    #[arg(long)]
    clips: Option<usize>,

    /// Words shown per caption
    #[arg(long)]
    caption_words: Option<usize>,

    /// Caption timing: per-group or per-word
    #[arg(long)]
    caption_timing: Option<CaptionTiming>,

    /// Only write the local run record, never upload
    #[arg(long)]
    no_upload: bool,

    /// Rendered video path
    #[arg(short, long)]
    output: Option<PathBuf>,
}

fn apply_args(cfg: &mut Config, args: &Args) {
    if let Some(n) = args.clips {
        cfg.clip_count = n;
    }
    if let Some(n) = args.caption_words {
        cfg.captions.words_per_caption = n;
    }
    if let Some(timing) = args.caption_timing {
        cfg.captions.timing = timing;
    }
    if args.no_upload {
        cfg.upload = false;
    }
    if let Some(out) = &args.output {
        cfg.output_path = out.clone();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();
    dotenvy::dotenv().ok();

    let args = Args::parse();

    let mut cfg = Config::load(&args.config).await?;
    apply_args(&mut cfg, &args);
    cfg.validate()?;

    init::ensure_directories(&cfg).await?;

    if !init::check_ffmpeg().await {
        tracing::warn!("FFmpeg/ffprobe not found in PATH. Please install FFmpeg.");
    }

    tracing::info!("=== Starting fact-shorts ===");
    let outcome = match run_generation(&cfg, args.theme.clone()).await {
        Ok(outcome) => outcome,
        Err(err) => {
            tracing::error!("Unexpected failure: {:?}", err);
            std::process::exit(1);
        }
    };

    match &outcome {
        RunOutcome::Rendered(summary) => {
            tracing::info!(
                "=== Done: {} ({:.2}s) ===",
                summary.video.path.display(),
                summary.video.duration_secs
            );
        }
        RunOutcome::Aborted { stage, reason } => {
            tracing::error!("=== Aborted at {} stage: {} ===", stage, reason);
        }
    }

    std::process::exit(outcome.exit_code());
}
