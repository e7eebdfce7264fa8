use crate::api::USER_AGENT;
use crate::config::Config;
use crate::model::Fact;
use crate::stage::{FactSource, StageError};
use crate::logok;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

const FACT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Deserialize)]
struct SummaryResponse {
    title: Option<String>,
    extract: Option<String>,
    content_urls: Option<ContentUrls>,
}

#[derive(Debug, Deserialize)]
struct ContentUrls {
    desktop: Option<PageLink>,
}

#[derive(Debug, Deserialize)]
struct PageLink {
    page: Option<String>,
}

/// Parses a `page/random/summary` payload. An empty extract is rejected.
pub fn parse_summary(raw: &str) -> Result<Fact, StageError> {
    let resp: SummaryResponse = serde_json::from_str(raw)
        .map_err(|e| StageError::malformed("wikipedia", e.to_string()))?;

    let extract = resp.extract.unwrap_or_default().trim().to_string();
    if extract.is_empty() {
        return Err(StageError::malformed("wikipedia", "summary has no extract"));
    }

    Ok(Fact {
        title: resp.title.unwrap_or_default(),
        extract,
        source_url: resp
            .content_urls
            .and_then(|u| u.desktop)
            .and_then(|d| d.page)
            .unwrap_or_default(),
    })
}

pub struct WikipediaFactSource {
    client: Client,
    endpoint: String,
}

impl WikipediaFactSource {
    pub fn new(client: Client, cfg: &Config) -> Self {
        Self {
            client,
            endpoint: cfg.fact_endpoint.clone(),
        }
    }
}

#[async_trait]
impl FactSource for WikipediaFactSource {
    async fn fetch_fact(&self) -> Result<Fact, StageError> {
        let resp = self
            .client
            .get(&self.endpoint)
            .header("User-Agent", USER_AGENT)
            .timeout(FACT_TIMEOUT)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            return Err(StageError::Status {
                service: "wikipedia",
                status: status.as_u16(),
            });
        }

        let raw = resp.text().await?;
        let fact = parse_summary(&raw)?;
        logok(format!("Fact found: {}", fact.title));
        Ok(fact)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_full_summary() {
        let raw = r#"{
            "title": "Tardigrade",
            "extract": "Les tardigrades survivent dans l'espace.",
            "content_urls": {"desktop": {"page": "https://fr.wikipedia.org/wiki/Tardigrade"}}
        }"#;
        let fact = parse_summary(raw).unwrap();
        assert_eq!(fact.title, "Tardigrade");
        assert_eq!(fact.source_url, "https://fr.wikipedia.org/wiki/Tardigrade");
    }

    #[test]
    fn missing_optional_fields_become_empty() {
        let fact = parse_summary(r#"{"extract": "Un fait."}"#).unwrap();
        assert_eq!(fact.title, "");
        assert_eq!(fact.source_url, "");
    }

    #[test]
    fn empty_extract_is_malformed() {
        let err = parse_summary(r#"{"title": "Vide", "extract": "  "}"#).unwrap_err();
        assert!(matches!(err, StageError::Malformed { .. }));
    }

    #[test]
    fn non_json_is_malformed() {
        assert!(matches!(
            parse_summary("<html>oops</html>"),
            Err(StageError::Malformed { .. })
        ));
    }
}
