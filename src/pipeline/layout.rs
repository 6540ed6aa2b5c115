//! Per-run directory layout under the output directory.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use rand::Rng;
use tracing::{debug, instrument, warn};

use super::PipelineError;
use crate::corpus::TableFormat;

/// Normalized corpus handed to the external model.
pub const NORMALIZED_CORPUS_FILE: &str = "normalized_corpus.csv";
/// Runner workspace directory.
pub const MODEL_DIR: &str = "model";
/// Summary table with its `Summary topic` column.
pub const TOPIC_SUMMARY_FILE: &str = "topic_summary.csv";
/// Labeled corpus file stem; the extension follows the input format.
pub const LABELED_CORPUS_STEM: &str = "labeled_corpus";
/// Run manifest.
pub const MANIFEST_FILE: &str = "run.json";

/// Maximum characters kept from the batch name.
pub const MAX_BATCH_NAME_CHARS: usize = 80;
const MAX_CREATE_ATTEMPTS: usize = 16;
const FALLBACK_BATCH_NAME: &str = "corpus";

/// Paths owned by one run: `<output_dir>/<batch>-<run_id>/...`.
///
/// The directory is created exclusively, so two runs never share paths.
#[derive(Debug, Clone)]
pub struct RunLayout {
    root: PathBuf,
    run_label: String,
    run_id: String,
    output_format: TableFormat,
}

impl RunLayout {
    /// Creates a fresh run directory for `batch`.
    ///
    /// # Errors
    /// Returns `PipelineError::RunIo` if the output directory cannot be
    /// created or no unused run id is found.
    #[instrument(fields(output_dir = %output_dir.display()))]
    pub fn create(
        output_dir: &Path,
        batch: &str,
        output_format: TableFormat,
    ) -> Result<Self, PipelineError> {
        fs::create_dir_all(output_dir).map_err(|source| PipelineError::run_io(output_dir, source))?;
        let batch = sanitize_batch_name(batch);

        let mut rng = rand::thread_rng();
        for _ in 0..MAX_CREATE_ATTEMPTS {
            let run_id = format!("{:08x}", rng.r#gen::<u32>());
            let run_label = format!("{batch}-{run_id}");
            let root = output_dir.join(&run_label);
            match fs::create_dir(&root) {
                Ok(()) => {
                    debug!(root = %root.display(), "Run directory created");
                    return Ok(Self {
                        root,
                        run_label,
                        run_id,
                        output_format,
                    });
                }
                Err(err) if err.kind() == ErrorKind::AlreadyExists => {
                    debug!(run_label, "Run id collision, retrying");
                }
                Err(source) => return Err(PipelineError::run_io(root, source)),
            }
        }
        Err(PipelineError::run_io(
            output_dir,
            std::io::Error::new(ErrorKind::AlreadyExists, "no unused run id found"),
        ))
    }

    /// Run directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// `<batch>-<run_id>`, also passed to the external model.
    #[must_use]
    pub fn run_label(&self) -> &str {
        &self.run_label
    }

    #[must_use]
    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    #[must_use]
    pub fn normalized_corpus(&self) -> PathBuf {
        self.root.join(NORMALIZED_CORPUS_FILE)
    }

    #[must_use]
    pub fn model_dir(&self) -> PathBuf {
        self.root.join(MODEL_DIR)
    }

    #[must_use]
    pub fn topic_summary(&self) -> PathBuf {
        self.root.join(TOPIC_SUMMARY_FILE)
    }

    /// Labeled corpus in the same format family as the input.
    #[must_use]
    pub fn labeled_corpus(&self) -> PathBuf {
        self.root.join(format!(
            "{LABELED_CORPUS_STEM}.{}",
            self.output_format.extension()
        ))
    }

    #[must_use]
    pub fn manifest(&self) -> PathBuf {
        self.root.join(MANIFEST_FILE)
    }

    /// Files whose presence implies a successful run.
    #[must_use]
    pub fn completed_outputs(&self) -> [PathBuf; 2] {
        [self.topic_summary(), self.labeled_corpus()]
    }

    /// Deletes completed-output files left by a failed run.
    ///
    /// Returns the paths actually removed.
    pub fn remove_completed_outputs(&self) -> Vec<PathBuf> {
        let mut removed = Vec::new();
        for path in self.completed_outputs() {
            match fs::remove_file(&path) {
                Ok(()) => removed.push(path),
                Err(err) if err.kind() == ErrorKind::NotFound => {}
                Err(err) => warn!(path = %path.display(), error = %err, "Cannot remove output"),
            }
        }
        removed
    }

    /// Intermediate files present on disk, sorted.
    ///
    /// These are kept after a failure for diagnosis and listed as partial.
    #[must_use]
    pub fn partial_files(&self) -> Vec<PathBuf> {
        let mut files = Vec::new();
        let normalized = self.normalized_corpus();
        if normalized.is_file() {
            files.push(normalized);
        }
        if let Ok(entries) = fs::read_dir(self.model_dir()) {
            files.extend(
                entries
                    .filter_map(Result::ok)
                    .map(|entry| entry.path())
                    .filter(|path| path.is_file()),
            );
        }
        files.sort();
        files
    }
}

/// Turns a batch name into a single safe path segment.
///
/// Separators, reserved punctuation and whitespace collapse to one `-`;
/// leading and trailing dashes and dots are trimmed. Falls back to `corpus`
/// when nothing usable remains.
#[must_use]
pub fn sanitize_batch_name(name: &str) -> String {
    let mut sanitized = String::new();
    let mut previous_dash = false;

    for ch in name.trim().chars() {
        let mapped = match ch {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '-',
            c if c.is_whitespace() || c.is_control() => '-',
            c => c,
        };
        if mapped == '-' {
            if !previous_dash {
                sanitized.push('-');
                previous_dash = true;
            }
        } else {
            sanitized.push(mapped);
            previous_dash = false;
        }
    }

    let mut sanitized: String = sanitized
        .trim_matches(|c| c == '-' || c == '.')
        .chars()
        .take(MAX_BATCH_NAME_CHARS)
        .collect();
    sanitized = sanitized.trim_end_matches(['-', '.']).to_string();
    if sanitized.is_empty() {
        return FALLBACK_BATCH_NAME.to_string();
    }
    sanitized
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_sanitize_batch_name() {
        assert_eq!(sanitize_batch_name("maize papers 2024"), "maize-papers-2024");
        assert_eq!(sanitize_batch_name("../etc/passwd"), "etc-passwd");
        assert_eq!(sanitize_batch_name("a:b*c"), "a-b-c");
        assert_eq!(sanitize_batch_name("  ..  "), "corpus");
        assert_eq!(sanitize_batch_name(""), "corpus");
        assert_eq!(sanitize_batch_name(&"x".repeat(200)).len(), MAX_BATCH_NAME_CHARS);
    }

    #[test]
    fn test_create_namespaces_runs() {
        let dir = TempDir::new().unwrap();
        let first = RunLayout::create(dir.path(), "papers", TableFormat::Csv).unwrap();
        let second = RunLayout::create(dir.path(), "papers", TableFormat::Csv).unwrap();

        assert_ne!(first.root(), second.root());
        assert!(first.root().is_dir());
        assert!(first.run_label().starts_with("papers-"));
        assert_eq!(first.run_id().len(), 8);
        assert!(first.run_id().chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(first.root().file_name().unwrap(), first.run_label());
    }

    #[test]
    fn test_paths_inside_run_directory() {
        let dir = TempDir::new().unwrap();
        let layout = RunLayout::create(dir.path(), "papers", TableFormat::Tsv).unwrap();
        assert!(layout.labeled_corpus().ends_with("labeled_corpus.tsv"));
        assert!(layout.normalized_corpus().ends_with(NORMALIZED_CORPUS_FILE));
        assert!(layout.model_dir().starts_with(layout.root()));
        assert!(layout.manifest().ends_with("run.json"));
    }

    #[test]
    fn test_remove_completed_outputs_keeps_intermediates() {
        let dir = TempDir::new().unwrap();
        let layout = RunLayout::create(dir.path(), "papers", TableFormat::Csv).unwrap();
        fs::write(layout.normalized_corpus(), "x").unwrap();
        fs::create_dir_all(layout.model_dir()).unwrap();
        fs::write(layout.model_dir().join("run.Rdata"), "m").unwrap();
        fs::write(layout.topic_summary(), "s").unwrap();

        let removed = layout.remove_completed_outputs();
        assert_eq!(removed, [layout.topic_summary()]);
        assert!(!layout.topic_summary().exists());

        let partial = layout.partial_files();
        assert_eq!(partial.len(), 2);
        assert!(partial.contains(&layout.normalized_corpus()));
    }
}
