//! Caption grouping and subtitle rendering.
//!
//! The script is cut into fixed-size word groups and the narration time is
//! shared between them, either equally per group or proportionally to the
//! number of words each group holds. The result is written as an ASS file
//! for burning in and an SRT sidecar.

use anyhow::Context;
use once_cell::sync::OnceCell;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaptionTiming {
    /// Every group gets `duration / groups`.
    #[default]
    PerGroup,
    /// Every word gets `duration / words`; a group lasts as long as its words.
    PerWord,
}

impl FromStr for CaptionTiming {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('_', "-").as_str() {
            "per-group" => Ok(CaptionTiming::PerGroup),
            "per-word" => Ok(CaptionTiming::PerWord),
            other => Err(format!(
                "unknown caption timing {other:?} (expected per-group or per-word)"
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptionPolicy {
    pub words_per_caption: usize,
    pub timing: CaptionTiming,
}

impl Default for CaptionPolicy {
    fn default() -> Self {
        Self {
            words_per_caption: 1,
            timing: CaptionTiming::PerGroup,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Caption {
    pub index: usize,
    pub start_secs: f64,
    pub end_secs: f64,
    pub text: String,
}

impl Caption {
    pub fn duration_secs(&self) -> f64 {
        self.end_secs - self.start_secs
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CaptionStyle {
    pub font: String,
    pub font_size: u32,
    pub bold: bool,
    /// ASS colours are `&HAABBGGRR`.
    pub fill: String,
    pub stroke: String,
    pub stroke_width: u32,
}

impl Default for CaptionStyle {
    fn default() -> Self {
        Self {
            font: "Arial".to_string(),
            font_size: 70,
            bold: true,
            fill: "&H00FFFFFF".to_string(),
            stroke: "&H00000000".to_string(),
            stroke_width: 3,
        }
    }
}

/// Splits `script` into caption groups covering `[0, duration_secs]`.
pub fn build_captions(script: &str, duration_secs: f64, policy: &CaptionPolicy) -> Vec<Caption> {
    let words: Vec<&str> = script.split_whitespace().collect();
    if words.is_empty() || duration_secs <= 0.0 {
        return Vec::new();
    }

    let group_size = policy.words_per_caption.max(1);
    let groups: Vec<&[&str]> = words.chunks(group_size).collect();
    let per_group = duration_secs / groups.len() as f64;
    let per_word = duration_secs / words.len() as f64;

    let mut captions = Vec::with_capacity(groups.len());
    let mut cursor = 0.0;
    let mut words_before = 0usize;
    for (index, group) in groups.iter().enumerate() {
        let start = cursor;
        let mut end = match policy.timing {
            CaptionTiming::PerGroup => (index + 1) as f64 * per_group,
            CaptionTiming::PerWord => (words_before + group.len()) as f64 * per_word,
        };
        if index + 1 == groups.len() {
            end = duration_secs;
        }

        captions.push(Caption {
            index,
            start_secs: start,
            end_secs: end,
            text: group.join(" "),
        });
        cursor = end;
        words_before += group.len();
    }

    captions
}

fn override_chars_regex() -> anyhow::Result<&'static Regex> {
    static RE: OnceCell<Regex> = OnceCell::new();
    RE.get_or_try_init(|| {
        Regex::new(r"[{}\\]").context("failed to compile caption override regex")
    })
}

fn ass_timestamp(secs: f64) -> String {
    let total_cs = (secs.max(0.0) * 100.0).round() as u64;
    let cs = total_cs % 100;
    let total_s = total_cs / 100;
    format!(
        "{}:{:02}:{:02}.{:02}",
        total_s / 3600,
        (total_s / 60) % 60,
        total_s % 60,
        cs
    )
}

fn srt_timestamp(secs: f64) -> String {
    let total_ms = (secs.max(0.0) * 1000.0).round() as u64;
    let ms = total_ms % 1000;
    let total_s = total_ms / 1000;
    format!(
        "{:02}:{:02}:{:02},{:03}",
        total_s / 3600,
        (total_s / 60) % 60,
        total_s % 60,
        ms
    )
}

/// Renders captions as an ASS script, centred on a `width`x`height` canvas.
pub fn to_ass(captions: &[Caption], style: &CaptionStyle, width: u32, height: u32) -> anyhow::Result<String> {
    let mut out = String::new();
    writeln!(out, "[Script Info]")?;
    writeln!(out, "ScriptType: v4.00+")?;
    writeln!(out, "PlayResX: {}", width)?;
    writeln!(out, "PlayResY: {}", height)?;
    writeln!(out, "WrapStyle: 0")?;
    writeln!(out, "ScaledBorderAndShadow: yes")?;
    writeln!(out)?;
    writeln!(out, "[V4+ Styles]")?;
    writeln!(
        out,
        "Format: Name, Fontname, Fontsize, PrimaryColour, SecondaryColour, OutlineColour, BackColour, Bold, Italic, Underline, StrikeOut, ScaleX, ScaleY, Spacing, Angle, BorderStyle, Outline, Shadow, Alignment, MarginL, MarginR, MarginV, Encoding"
    )?;
    writeln!(
        out,
        "Style: Caption,{},{},{},{},{},&H00000000,{},0,0,0,100,100,0,0,1,{},0,5,40,40,0,1",
        style.font,
        style.font_size,
        style.fill,
        style.fill,
        style.stroke,
        if style.bold { -1 } else { 0 },
        style.stroke_width
    )?;
    writeln!(out)?;
    writeln!(out, "[Events]")?;
    writeln!(
        out,
        "Format: Layer, Start, End, Style, Name, MarginL, MarginR, MarginV, Effect, Text"
    )?;
    let overrides = override_chars_regex()?;
    for caption in captions {
        writeln!(
            out,
            "Dialogue: 0,{},{},Caption,,0,0,0,,{}",
            ass_timestamp(caption.start_secs),
            ass_timestamp(caption.end_secs),
            overrides.replace_all(&caption.text, "")
        )?;
    }
    Ok(out)
}

pub fn to_srt(captions: &[Caption]) -> String {
    let mut out = String::new();
    for caption in captions {
        out.push_str(&format!(
            "{}\n{} --> {}\n{}\n\n",
            caption.index + 1,
            srt_timestamp(caption.start_secs),
            srt_timestamp(caption.end_secs),
            caption.text
        ));
    }
    out
}
