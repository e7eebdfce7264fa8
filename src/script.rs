use crate::model::Fact;

pub const SYSTEM_PROMPT: &str =
    "Tu es un créateur de contenus viral pour TikTok et YouTube Shorts.";

pub const CALL_TO_ACTION: &str = "Abonne-toi pour découvrir d'autres faits surprenants !";

const MAX_FALLBACK_EXTRACT_CHARS: usize = 300;

pub fn build_prompt(fact: &Fact) -> String {
    format!(
        "Crée un script de vidéo courte (30-40 secondes) sur ce fait :\n\nTitre : {}\nContenu : {}\n\nLe script doit :\n- Commencer par un HOOK captivant (question ou affirmation choc)\n- Être au format parlé, naturel\n- Durer entre 30 et 40 secondes à la lecture\n- Se terminer par un appel à l'action (\"Abonne-toi pour plus de faits incroyables !\")\n- Être en français\n\nDonne UNIQUEMENT le texte à dire, sans indication de mise en scène.",
        fact.title, fact.extract
    )
}

/// Cuts `input` to at most `max_chars` characters, preferring a word boundary.
fn truncate_on_word(input: &str, max_chars: usize) -> String {
    let trimmed = input.trim();
    if trimmed.chars().count() <= max_chars {
        return trimmed.to_string();
    }

    let cut: String = trimmed.chars().take(max_chars).collect();
    let head = match cut.rfind(char::is_whitespace) {
        Some(idx) if idx > 0 => &cut[..idx],
        _ => cut.as_str(),
    };
    format!("{}…", head.trim_end_matches([',', ';', ':', ' ']))
}

/// Deterministic script used when text generation is unavailable.
pub fn fallback_script(fact: &Fact) -> String {
    format!(
        "Saviez-vous que {} Incroyable non ? {}",
        truncate_on_word(&fact.extract, MAX_FALLBACK_EXTRACT_CHARS),
        CALL_TO_ACTION
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fallback_keeps_short_extract_whole() {
        let fact = Fact::fallback();
        assert_eq!(
            fallback_script(&fact),
            format!(
                "Saviez-vous que {} Incroyable non ? Abonne-toi pour découvrir d'autres faits surprenants !",
                fact.extract
            )
        );
    }

    #[test]
    fn fallback_truncates_long_extract_on_word_boundary() {
        let fact = Fact {
            title: "Long".into(),
            extract: "mot ".repeat(200),
            source_url: String::new(),
        };
        let script = fallback_script(&fact);
        let body = script
            .strip_prefix("Saviez-vous que ")
            .and_then(|s| s.strip_suffix(&format!(" Incroyable non ? {}", CALL_TO_ACTION)))
            .unwrap();
        assert!(body.ends_with("mot…"));
        assert!(body.chars().count() <= MAX_FALLBACK_EXTRACT_CHARS + 1);
    }

    #[test]
    fn truncation_is_char_safe() {
        let text = "é".repeat(400);
        let out = truncate_on_word(&text, 10);
        assert_eq!(out, format!("{}…", "é".repeat(10)));
    }

    #[test]
    fn prompt_mentions_fact_and_length() {
        let prompt = build_prompt(&Fact::fallback());
        assert!(prompt.contains("Titre : Le miel ne périme jamais"));
        assert!(prompt.contains("30 et 40 secondes"));
    }
}
