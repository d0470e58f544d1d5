//! Prediction Parser (C4, §4.4). Grounded on
//! `original_source/server/vision/tasks.py::parse_and_create_animal`'s regex
//! shape, generalized per spec to handle every `|`-delimited entity rather
//! than just the first.

use regex::Regex;
use std::sync::OnceLock;

#[derive(Debug, Clone, PartialEq)]
pub struct DetectedEntity {
    pub genus: String,
    pub species: String,
    pub subspecies: Option<String>,
    pub common_name: Option<String>,
    /// A decreasing display-order heuristic (`max(0, 0.9 - 0.1*index)`), not
    /// a calibrated probability (Open Question #3).
    pub confidence: f64,
}

fn entity_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^([A-Z][a-z]+)[,\s]+([a-z]+)(?:\s+([a-z]+))?\s*(?:\(([^)]+)\))?").unwrap()
    })
}

/// Parses a raw vision prediction string into ordered detected entities.
/// Empty (and `"NO ANIMALS FOUND"`, any case) predictions yield an empty
/// list.
pub fn parse(prediction: &str) -> Vec<DetectedEntity> {
    let trimmed = prediction.trim();
    if trimmed.eq_ignore_ascii_case("NO ANIMALS FOUND") {
        return Vec::new();
    }

    let mut entities = Vec::new();
    for (index, raw_entry) in trimmed.split('|').enumerate() {
        let entry = raw_entry.trim().replace(['*', '_'], "");
        if entry.is_empty() {
            continue;
        }

        let Some(caps) = entity_regex().captures(&entry) else {
            tracing::warn!(entry = %entry, "prediction entry did not match entity regex");
            continue;
        };

        let genus = caps.get(1).unwrap().as_str().to_string();
        let species = caps.get(2).unwrap().as_str().to_string();
        let subspecies = caps.get(3).map(|m| m.as_str().to_string());
        let common_name = caps.get(4).map(|m| m.as_str().to_string());
        let confidence = (0.9 - 0.1 * entities.len() as f64).max(0.0);
        let _ = index;

        entities.push(DetectedEntity {
            genus,
            species,
            subspecies,
            common_name,
            confidence,
        });
    }

    entities
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_animals_found_is_case_insensitive_and_empty() {
        assert_eq!(parse("no animals found"), Vec::new());
        assert_eq!(parse("NO ANIMALS FOUND"), Vec::new());
        assert_eq!(parse("  No Animals Found  "), Vec::new());
    }

    #[test]
    fn parses_two_entities_with_decreasing_confidence() {
        let entities = parse("Vulpes vulpes (Red Fox) | Sciurus carolinensis (Eastern Gray Squirrel)");
        assert_eq!(entities.len(), 2);
        assert_eq!(entities[0].genus, "Vulpes");
        assert_eq!(entities[0].species, "vulpes");
        assert_eq!(entities[0].common_name.as_deref(), Some("Red Fox"));
        assert!((entities[0].confidence - 0.9).abs() < 1e-9);
        assert!((entities[1].confidence - 0.8).abs() < 1e-9);
    }

    #[test]
    fn parses_subspecies() {
        let entities = parse("Canis lupus familiaris (Domestic Dog)");
        assert_eq!(entities.len(), 1);
        assert_eq!(entities[0].subspecies.as_deref(), Some("familiaris"));
    }

    #[test]
    fn strips_markdown_emphasis() {
        let entities = parse("*Vulpes vulpes* (Red Fox)");
        assert_eq!(entities.len(), 1);
        assert_eq!(entities[0].genus, "Vulpes");
    }

    #[test]
    fn drops_unmatched_entries_without_failing_the_batch() {
        let entities = parse("not a valid entry | Vulpes vulpes (Red Fox)");
        assert_eq!(entities.len(), 1);
        assert_eq!(entities[0].genus, "Vulpes");
    }

    #[test]
    fn comma_separated_genus_species_also_matches() {
        let entities = parse("Vulpes, vulpes (Red Fox)");
        assert_eq!(entities.len(), 1);
        assert_eq!(entities[0].species, "vulpes");
    }
}
