//! Static keyword-cleaning tables: filler words and the expansion table.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::instrument;

/// Default keyword delimiter in bibliographic exports.
pub const DEFAULT_DELIMITER: char = ';';

/// Generic, low-information keywords dropped during normalization.
const AGRICULTURE_FILLER_WORDS: [&str; 10] = [
    "use", "study", "system", "data", "based", "approach", "result", "analysis", "method",
    "effect",
];

/// Stemmed or abbreviated keyword forms and their expansions.
/// An empty expansion means "discard".
const AGRICULTURE_EXPANSIONS: [(&str, &str); 31] = [
    ("genet", "genetics"),
    ("gene_express", "gene expression"),
    ("obes", "obesity"),
    ("mutat", "mutation"),
    ("studi", "study"),
    ("activ", "activation"),
    ("makeup", ""),
    ("use", ""),
    ("can", ""),
    ("system", ""),
    ("type", ""),
    ("develop", "development"),
    ("differ", "differentiation"),
    ("transcript", "transcription"),
    ("express", "expression"),
    ("yield", "crop yield"),
    ("fertil", "fertilizer"),
    ("irrig", "irrigation"),
    ("soil_moistur", "soil moisture"),
    ("crop_prod", "crop production"),
    ("resilienc", "resilience"),
    ("adapt", "adaptation"),
    ("sustain", "sustainability"),
    ("increas", "increase"),
    ("reduc", "reduction"),
    ("food_sec", "food security"),
    ("temperatur", "temperature"),
    ("precipit", "precipitation"),
    ("agricultur", "agriculture"),
    ("analys", "analysis"),
    ("maiz", "maize"),
];

/// Filler-word set and expansion table consumed by the text normalizer.
///
/// Loaded once per process and passed explicitly, so tests can substitute
/// their own tables.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizerTables {
    /// Keyword delimiter.
    #[serde(default = "default_delimiter")]
    pub delimiter: char,
    /// Tokens removed outright.
    #[serde(default)]
    pub filler_words: BTreeSet<String>,
    /// Token → expanded phrase (empty string discards the token).
    #[serde(default)]
    pub expansions: BTreeMap<String, String>,
}

fn default_delimiter() -> char {
    DEFAULT_DELIMITER
}

impl Default for NormalizerTables {
    fn default() -> Self {
        Self::agriculture()
    }
}

impl NormalizerTables {
    /// Empty tables: only splitting, lowercasing and trimming apply.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            delimiter: DEFAULT_DELIMITER,
            filler_words: BTreeSet::new(),
            expansions: BTreeMap::new(),
        }
    }

    /// Built-in tables tuned for agricultural and life-science corpora.
    #[must_use]
    pub fn agriculture() -> Self {
        Self {
            delimiter: DEFAULT_DELIMITER,
            filler_words: AGRICULTURE_FILLER_WORDS
                .iter()
                .map(|w| (*w).to_string())
                .collect(),
            expansions: AGRICULTURE_EXPANSIONS
                .iter()
                .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
                .collect(),
        }
    }

    /// Loads tables from a JSON file.
    ///
    /// Missing fields fall back to an empty set/map and the `;` delimiter.
    ///
    /// # Errors
    /// Returns error if the file cannot be read or is not valid JSON.
    #[instrument]
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Cannot read vocabulary file '{}'", path.display()))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("Invalid vocabulary file '{}'", path.display()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_agriculture_tables_contain_known_entries() {
        let tables = NormalizerTables::agriculture();
        assert!(tables.filler_words.contains("analysis"));
        assert_eq!(tables.expansions["irrig"], "irrigation");
        assert_eq!(tables.expansions["makeup"], "");
        assert_eq!(tables.delimiter, ';');
    }

    #[test]
    fn test_load_vocabulary_with_partial_fields() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, r#"{{"filler_words": ["paper"], "expansions": {{"hydro": "hydrology"}}}}"#)
            .unwrap();

        let tables = NormalizerTables::load(file.path()).unwrap();
        assert_eq!(tables.delimiter, ';');
        assert!(tables.filler_words.contains("paper"));
        assert_eq!(tables.expansions["hydro"], "hydrology");
    }

    #[test]
    fn test_load_vocabulary_custom_delimiter() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, r#"{{"delimiter": ","}}"#).unwrap();
        let tables = NormalizerTables::load(file.path()).unwrap();
        assert_eq!(tables.delimiter, ',');
        assert!(tables.expansions.is_empty());
    }

    #[test]
    fn test_load_vocabulary_invalid_json_errors() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();
        let err = NormalizerTables::load(file.path()).unwrap_err();
        assert!(format!("{err:#}").contains("Invalid vocabulary file"));
    }

    #[test]
    fn test_load_vocabulary_nonexistent_file_errors() {
        assert!(NormalizerTables::load(Path::new("/nonexistent/vocab.json")).is_err());
    }
}
