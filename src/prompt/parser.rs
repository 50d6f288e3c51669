//! Sentence decomposition into editable fragments.

use std::sync::OnceLock;

use regex::Regex;
use tracing::{debug, warn};

use super::fragments::PromptFragments;

/// Prepositions a location phrase may start with.
const LOCATION_PREPOSITIONS: &str = "in|on|at|beneath|among|behind|inside|near";

/// Splits `A {character} is {action} {location}` sentences.
#[derive(Debug, Clone)]
pub struct PromptParser {
    pattern: Regex,
}

impl PromptParser {
    /// Compile the sentence pattern.
    ///
    /// # Errors
    /// Returns an error if the pattern fails to compile.
    pub fn new() -> Result<Self, regex::Error> {
        let pattern = Regex::new(&format!(
            r#"(?i)^(?:an?\s+)?([^"']+?)\s+is\s+([^"']+?)\s+((?:{LOCATION_PREPOSITIONS})\s+.+)$"#
        ))?;
        Ok(Self { pattern })
    }

    /// Decompose a sentence. Anything that does not fit the template yields
    /// empty fragments.
    #[must_use]
    pub fn parse(&self, sentence: &str) -> PromptFragments {
        let Some(caps) = self.pattern.captures(sentence.trim()) else {
            debug!(sentence, "Prompt does not match the sentence template");
            return PromptFragments::default();
        };

        let group = |i: usize| {
            caps.get(i)
                .map(|m| m.as_str().trim().to_lowercase())
                .unwrap_or_default()
        };

        PromptFragments::new(group(1), group(2), group(3))
    }
}

/// Decompose a sentence with a shared parser.
#[must_use]
pub fn parse_prompt(sentence: &str) -> PromptFragments {
    static PARSER: OnceLock<Option<PromptParser>> = OnceLock::new();

    let parser = PARSER.get_or_init(|| {
        PromptParser::new()
            .map_err(|e| warn!(error = %e, "Prompt pattern failed to compile"))
            .ok()
    });

    parser
        .as_ref()
        .map_or_else(PromptFragments::default, |p| p.parse(sentence))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_sentence() {
        let fragments = parse_prompt(
            "A solitary astronaut is planting luminous seeds in a crystal cave.",
        );
        assert_eq!(fragments.character, "solitary astronaut");
        assert_eq!(fragments.action, "planting luminous seeds");
        assert_eq!(fragments.location, "in a crystal cave.");
    }

    #[test]
    fn test_non_matching_sentence_is_empty() {
        assert!(parse_prompt("Not a matching shape").is_empty());
        assert!(parse_prompt("").is_empty());
    }

    #[test]
    fn test_an_article_and_case() {
        let fragments = parse_prompt("  An Octopus Magician is Juggling pearls beneath a pier  ");
        assert_eq!(fragments.character, "octopus magician");
        assert_eq!(fragments.action, "juggling pearls");
        assert_eq!(fragments.location, "beneath a pier");
    }

    #[test]
    fn test_location_starts_at_first_preposition() {
        let fragments = parse_prompt("A cat is sitting on a mat in a quiet house.");
        assert_eq!(fragments.action, "sitting");
        assert_eq!(fragments.location, "on a mat in a quiet house.");
    }

    #[test]
    fn test_quoted_sentence_does_not_match() {
        assert!(parse_prompt("\"A fox is napping in a barn.\"").is_empty());
    }

    #[test]
    fn test_round_trip_with_compose() {
        let parser = PromptParser::new().unwrap();
        let fragments = parser.parse("A robot gardener is trimming hedges near a lighthouse.");
        assert_eq!(
            fragments.compose(),
            "A robot gardener is trimming hedges near a lighthouse."
        );
    }
}
