use crate::captions::Caption;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fact {
    pub title: String,
    pub extract: String,
    pub source_url: String,
}

impl Fact {
    /// Used whenever the encyclopedia lookup fails.
    pub fn fallback() -> Self {
        Self {
            title: "Le miel ne périme jamais".to_string(),
            extract: "Le miel est le seul aliment qui ne se périme jamais. Des pots de miel vieux de 3000 ans retrouvés dans des tombes égyptiennes étaient encore parfaitement comestibles.".to_string(),
            source_url: "https://fr.wikipedia.org/wiki/Miel".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AudioTrack {
    pub path: PathBuf,
    pub duration_secs: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Background {
    SolidColor(String),
    Footage { clips: usize, segments: usize },
}

#[derive(Debug, Clone, PartialEq)]
pub struct RenderedVideo {
    pub path: PathBuf,
    pub duration_secs: f64,
    pub captions: Vec<Caption>,
    pub background: Background,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublishMetadata {
    pub title: String,
    pub description: String,
    pub tags: Vec<String>,
    pub category_id: String,
    pub privacy: String,
}

impl PublishMetadata {
    pub fn for_fact(fact: &Fact, script: &str) -> Self {
        Self {
            title: format!("Fait incroyable : {}", fact.title),
            description: format!("{}\n\nSource : {}", script, fact.source_url),
            tags: vec![
                "shorts".to_string(),
                "faits".to_string(),
                "éducation".to_string(),
            ],
            // Education
            category_id: "27".to_string(),
            privacy: "public".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunRecord {
    pub title: String,
    pub description: String,
    pub video_path: String,
    pub date: String,
}
