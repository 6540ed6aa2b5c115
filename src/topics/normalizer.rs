//! Keyword normalization: split, lowercase, drop filler, expand stems.

use std::collections::{HashMap, HashSet};

use anyhow::{Result, bail};
use tracing::instrument;

use super::vocabulary::NormalizerTables;

/// Cleans raw semicolon-delimited keyword fields into a normalized phrase.
///
/// Normalization steps:
/// 1. Split on the configured delimiter
/// 2. Lowercase each token and collapse its whitespace
/// 3. Drop empty tokens and filler words
/// 4. Substitute expansion-table entries (empty expansion drops the token)
/// 5. Join the survivors with single spaces, preserving order
///
/// The expansion table is resolved once at construction: chained entries
/// are followed to their final phrase and expansions that land on a filler
/// word become discards. Keys and filler words are single words, so a
/// joined multi-word output never matches either on a second pass. Together
/// these keep `normalize` idempotent on its own output.
#[derive(Debug, Clone)]
pub struct TextNormalizer {
    delimiter: char,
    filler_words: HashSet<String>,
    expansions: HashMap<String, String>,
}

impl Default for TextNormalizer {
    fn default() -> Self {
        Self::build(&NormalizerTables::agriculture()).0
    }
}

impl TextNormalizer {
    /// Builds a normalizer from static tables.
    ///
    /// # Errors
    /// Returns error if an expansion key or filler word spans several words,
    /// an expansion contains the delimiter, or the expansion table contains
    /// a cycle (`a -> b -> a`).
    #[instrument(skip(tables), fields(fillers = tables.filler_words.len(), expansions = tables.expansions.len()))]
    pub fn new(tables: &NormalizerTables) -> Result<Self> {
        for word in &tables.filler_words {
            if is_multi_word(word) {
                bail!(
                    "Filler word '{word}' contains whitespace\n  \
                     Suggestion: List each word of the phrase separately"
                );
            }
        }
        for (key, value) in &tables.expansions {
            if is_multi_word(key) {
                bail!(
                    "Expansion key '{key}' contains whitespace\n  \
                     Suggestion: Join stemmed phrases with '_' (e.g. 'soil_moistur')"
                );
            }
            if value.contains(tables.delimiter) {
                bail!(
                    "Expansion for '{key}' contains the keyword delimiter '{}': '{value}'",
                    tables.delimiter
                );
            }
        }
        let (normalizer, cycles) = Self::build(tables);
        if let Some(key) = cycles.first() {
            bail!("Expansion table contains a cycle through '{key}'");
        }
        Ok(normalizer)
    }

    /// Resolves the tables; keys caught in a cycle are reported and discarded.
    fn build(tables: &NormalizerTables) -> (Self, Vec<String>) {
        let filler_words: HashSet<String> = tables
            .filler_words
            .iter()
            .map(|w| canonical_token(w))
            .filter(|w| !w.is_empty())
            .collect();
        let raw: HashMap<String, String> = tables
            .expansions
            .iter()
            .map(|(k, v)| (canonical_token(k), canonical_token(v)))
            .collect();

        let mut cycles = Vec::new();
        let mut expansions = HashMap::with_capacity(raw.len());
        for key in raw.keys() {
            let resolved = follow_chain(key, &raw, &filler_words).unwrap_or_else(|| {
                cycles.push(key.clone());
                String::new()
            });
            expansions.insert(key.clone(), resolved);
        }
        cycles.sort();

        let normalizer = Self {
            delimiter: tables.delimiter,
            filler_words,
            expansions,
        };
        (normalizer, cycles)
    }

    /// Normalizes one raw keyword field.
    ///
    /// Empty input and input that cleans down to nothing both yield the
    /// empty string, which downstream treats as "no signal".
    #[must_use]
    pub fn normalize(&self, raw: &str) -> String {
        let mut phrases: Vec<String> = Vec::new();
        for token in raw.split(self.delimiter) {
            let token = canonical_token(token);
            if token.is_empty() || self.filler_words.contains(&token) {
                continue;
            }
            match self.expansions.get(&token) {
                Some(expanded) if expanded.is_empty() => {}
                Some(expanded) => phrases.push(expanded.clone()),
                None => phrases.push(token),
            }
        }
        phrases.join(" ")
    }

    /// Normalizes an optional field; `None` yields the empty string.
    #[must_use]
    pub fn normalize_opt(&self, raw: Option<&str>) -> String {
        raw.map(|r| self.normalize(r)).unwrap_or_default()
    }

    /// Normalizes a batch of fields, preserving order.
    #[must_use]
    #[instrument(skip(self, raws), fields(count = raws.len()))]
    pub fn normalize_all(&self, raws: &[&str]) -> Vec<String> {
        raws.iter().map(|raw| self.normalize(raw)).collect()
    }

    /// True if `token` is a configured filler word.
    #[must_use]
    pub fn is_filler(&self, token: &str) -> bool {
        self.filler_words.contains(&canonical_token(token))
    }
}

/// Follows an expansion chain to its final phrase.
///
/// Returns `Some("")` when the chain discards the token, `None` on a cycle.
fn follow_chain(
    key: &str,
    expansions: &HashMap<String, String>,
    filler_words: &HashSet<String>,
) -> Option<String> {
    let mut current = key.to_string();
    let mut seen = HashSet::new();
    while let Some(next) = expansions.get(&current) {
        if next.is_empty() || filler_words.contains(next) {
            return Some(String::new());
        }
        if *next == current {
            return Some(current);
        }
        if !seen.insert(current.clone()) {
            return None;
        }
        current.clone_from(next);
    }
    Some(current)
}

fn is_multi_word(token: &str) -> bool {
    token.split_whitespace().nth(1).is_some()
}

/// Lowercases and collapses internal whitespace.
fn canonical_token(token: &str) -> String {
    token
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Collapses runs of whitespace into single spaces and trims the ends.
///
/// Used for titles and topic keyword text in classification mode, where
/// the keyword normalizer does not apply.
#[must_use]
pub fn clean_text(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::collections::{BTreeMap, BTreeSet};

    fn tables(fillers: &[&str], expansions: &[(&str, &str)]) -> NormalizerTables {
        NormalizerTables {
            delimiter: ';',
            filler_words: fillers.iter().map(|s| (*s).to_string()).collect::<BTreeSet<_>>(),
            expansions: expansions
                .iter()
                .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
                .collect::<BTreeMap<_, _>>(),
        }
    }

    #[test]
    fn test_normalize_splits_lowercases_and_joins() {
        let normalizer = TextNormalizer::new(&NormalizerTables::empty()).unwrap();
        assert_eq!(
            normalizer.normalize(" Soil Erosion ;CONTROL; water"),
            "soil erosion control water"
        );
    }

    #[test]
    fn test_normalize_drops_filler_and_empty_tokens() {
        let normalizer = TextNormalizer::default();
        assert_eq!(
            normalizer.normalize("Data;;  ;Pest management; Method"),
            "pest management"
        );
    }

    #[test]
    fn test_normalize_applies_expansions_and_discards() {
        let normalizer = TextNormalizer::default();
        assert_eq!(
            normalizer.normalize("irrig;makeup;soil_moistur;yield"),
            "irrigation soil moisture crop yield"
        );
    }

    #[test]
    fn test_expansion_to_filler_word_is_discarded() {
        // "studi" expands to "study", which is itself a filler word.
        let normalizer = TextNormalizer::default();
        assert_eq!(normalizer.normalize("studi;maiz"), "maize");
        assert_eq!(normalizer.normalize("analys"), "");
    }

    #[test]
    fn test_normalize_empty_and_missing_input() {
        let normalizer = TextNormalizer::default();
        assert_eq!(normalizer.normalize(""), "");
        assert_eq!(normalizer.normalize("   ;  ; "), "");
        assert_eq!(normalizer.normalize_opt(None), "");
        assert_eq!(normalizer.normalize_opt(Some("Irrig")), "irrigation");
    }

    #[test]
    fn test_normalize_preserves_token_order() {
        let normalizer = TextNormalizer::new(&NormalizerTables::empty()).unwrap();
        assert_eq!(normalizer.normalize("c;a;b"), "c a b");
    }

    #[test]
    fn test_normalize_is_idempotent_on_varied_inputs() {
        let normalizer = TextNormalizer::default();
        let inputs = [
            "Irrig; Water Efficiency ;studi",
            "gene_express;GENET;Use;type",
            "  soil   moistur ; crop_prod ;food_sec",
            "already normalized phrase",
            "analysis",
            "",
            "précipitation;Température",
        ];
        for input in inputs {
            let once = normalizer.normalize(input);
            let twice = normalizer.normalize(&once);
            assert_eq!(once, twice, "normalize must be idempotent for {input:?}");
        }
    }

    #[test]
    fn test_normalize_never_emits_filler_tokens() {
        let normalizer = TextNormalizer::default();
        let output = normalizer.normalize("use;study;system;data;based;approach;result;effect;soil");
        assert_eq!(output, "soil");
        for word in ["use", "study", "system", "data", "based", "approach", "result", "effect"] {
            assert!(normalizer.is_filler(word));
        }
    }

    #[test]
    fn test_chained_expansions_resolve_to_final_phrase() {
        let normalizer =
            TextNormalizer::new(&tables(&[], &[("irr", "irrig"), ("irrig", "irrigation")]))
                .unwrap();
        assert_eq!(normalizer.normalize("irr"), "irrigation");
        assert_eq!(normalizer.normalize(&normalizer.normalize("irr")), "irrigation");
    }

    #[test]
    fn test_expansion_cycle_is_rejected() {
        let result = TextNormalizer::new(&tables(&[], &[("a", "b"), ("b", "a")]));
        let err = result.unwrap_err();
        assert!(err.to_string().contains("cycle"), "got: {err}");
    }

    #[test]
    fn test_expansion_containing_delimiter_is_rejected() {
        let result = TextNormalizer::new(&tables(&[], &[("a", "b;c")]));
        assert!(result.is_err());
    }

    #[test]
    fn test_multi_word_expansion_key_is_rejected() {
        let err = TextNormalizer::new(&tables(&[], &[("soil moisture", "hydrology")])).unwrap_err();
        assert!(err.to_string().contains("'soil moisture'"), "got: {err}");

        // Surrounding whitespace is only trimmed, not a second word.
        let normalizer = TextNormalizer::new(&tables(&[], &[(" Irrig ", "irrigation")])).unwrap();
        assert_eq!(normalizer.normalize("irrig"), "irrigation");
    }

    #[test]
    fn test_multi_word_filler_word_is_rejected() {
        let err = TextNormalizer::new(&tables(&["case study"], &[])).unwrap_err();
        assert!(err.to_string().contains("'case study'"), "got: {err}");
    }

    #[test]
    fn test_split_phrase_stays_stable_with_custom_tables() {
        let normalizer = TextNormalizer::new(&tables(
            &["paper"],
            &[("soil_moistur", "soil moisture"), ("moisture", "moisture")],
        ))
        .unwrap();
        for input in ["soil;moisture", "soil_moistur;paper", "Soil Moisture;paper;soil"] {
            let once = normalizer.normalize(input);
            assert_eq!(normalizer.normalize(&once), once, "not idempotent for {input:?}");
        }
    }

    #[test]
    fn test_self_mapping_expansion_is_stable() {
        let normalizer = TextNormalizer::new(&tables(&[], &[("soil", "soil")])).unwrap();
        assert_eq!(normalizer.normalize("Soil"), "soil");
    }

    #[test]
    fn test_custom_delimiter() {
        let mut custom = NormalizerTables::empty();
        custom.delimiter = ',';
        let normalizer = TextNormalizer::new(&custom).unwrap();
        assert_eq!(normalizer.normalize("Soil, Water;Use"), "soil water;use");
    }

    #[test]
    fn test_clean_text_collapses_whitespace() {
        assert_eq!(clean_text("  Soil \t erosion\n control  "), "Soil erosion control");
        assert_eq!(clean_text("   "), "");
    }
}
