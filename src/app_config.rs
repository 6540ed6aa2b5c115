//! File configuration for CLI defaults.

use std::env;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow, bail};
use topiclabel_core::AssignmentStrategy;

const APP_DIR: &str = "topiclabel";
const CONFIG_FILE: &str = "config.toml";

/// Valid range for `process_timeout_secs`.
pub const PROCESS_TIMEOUT_RANGE: std::ops::RangeInclusive<u64> = 1..=86_400;

/// Flat `key = value` configuration; every field is optional.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FileConfig {
    /// Parent directory for run outputs.
    pub output_dir: Option<PathBuf>,
    /// Interpreter for the model scripts.
    pub rscript: Option<PathBuf>,
    pub fit_script: Option<PathBuf>,
    pub assess_script: Option<PathBuf>,
    /// Per-process timeout in seconds.
    pub process_timeout_secs: Option<u64>,
    /// Topic catalog file (`Label` or `Label | text` per line).
    pub catalog_file: Option<PathBuf>,
    /// JSON filler-word and expansion tables.
    pub vocabulary_file: Option<PathBuf>,
    pub summary_strategy: Option<AssignmentStrategy>,
    pub drop_empty_abstracts: Option<bool>,
    pub verbosity: Option<VerbositySetting>,
}

impl FileConfig {
    /// Validates values against the CLI constraints.
    ///
    /// # Errors
    /// Returns error naming the offending key.
    pub fn validate(&self) -> Result<()> {
        if let Some(timeout) = self.process_timeout_secs
            && !PROCESS_TIMEOUT_RANGE.contains(&timeout)
        {
            bail!(
                "Invalid config value for `process_timeout_secs`: {timeout}. Expected range: {}..={}",
                PROCESS_TIMEOUT_RANGE.start(),
                PROCESS_TIMEOUT_RANGE.end()
            );
        }
        for (key, path) in [
            ("rscript", &self.rscript),
            ("fit_script", &self.fit_script),
            ("assess_script", &self.assess_script),
            ("output_dir", &self.output_dir),
        ] {
            if path.as_ref().is_some_and(|p| p.as_os_str().is_empty()) {
                bail!("Invalid config value for `{key}`: path must not be empty");
            }
        }
        Ok(())
    }
}

/// Supported config verbosity labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerbositySetting {
    Default,
    Verbose,
    Quiet,
    Debug,
}

impl VerbositySetting {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Default => "default",
            Self::Verbose => "verbose",
            Self::Quiet => "quiet",
            Self::Debug => "debug",
        }
    }

    /// Tracing level used when neither `RUST_LOG` nor a CLI flag decides.
    #[must_use]
    pub fn log_level(self) -> &'static str {
        match self {
            Self::Default => "info",
            Self::Verbose | Self::Debug => "debug",
            Self::Quiet => "error",
        }
    }
}

/// Resolves the default config path.
///
/// Priority:
/// 1. `$XDG_CONFIG_HOME/topiclabel/config.toml`
/// 2. `$HOME/.config/topiclabel/config.toml`
#[must_use]
pub fn resolve_default_config_path() -> Option<PathBuf> {
    if let Some(xdg_config_home) = env_var_non_empty_os("XDG_CONFIG_HOME") {
        return Some(PathBuf::from(xdg_config_home).join(APP_DIR).join(CONFIG_FILE));
    }
    let home = env_var_non_empty_os("HOME")?;
    Some(
        PathBuf::from(home)
            .join(".config")
            .join(APP_DIR)
            .join(CONFIG_FILE),
    )
}

fn env_var_non_empty_os(name: &str) -> Option<OsString> {
    let value = env::var_os(name)?;
    if value.is_empty() { None } else { Some(value) }
}

/// Loads the explicit config file, or the default one when it exists.
///
/// An explicit path must exist; a missing default file yields the empty
/// config.
///
/// # Errors
/// Returns error if the file cannot be read, parsed or validated.
pub fn load_config(explicit: Option<&Path>) -> Result<FileConfig> {
    if let Some(path) = explicit {
        return load_file_config(path);
    }
    match resolve_default_config_path() {
        Some(path) if path.is_file() => load_file_config(&path),
        _ => Ok(FileConfig::default()),
    }
}

fn load_file_config(path: &Path) -> Result<FileConfig> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file '{}'", path.display()))?;
    parse_config_str(&raw)
        .with_context(|| format!("Failed to parse config file '{}'", path.display()))
}

fn parse_config_str(raw: &str) -> Result<FileConfig> {
    let mut cfg = FileConfig::default();
    for (line_index, raw_line) in raw.lines().enumerate() {
        let line_no = line_index + 1;
        let line = strip_inline_comment(raw_line).trim();
        if line.is_empty() {
            continue;
        }

        let Some((raw_key, raw_value)) = line.split_once('=') else {
            bail!("Invalid config syntax on line {line_no}: expected key = value");
        };
        let key = raw_key.trim();
        let value = raw_value.trim();
        let invalid = || format!("Invalid `{key}` value on line {line_no}");

        match key {
            "output_dir" => cfg.output_dir = Some(parse_path(value).with_context(invalid)?),
            "rscript" => cfg.rscript = Some(parse_path(value).with_context(invalid)?),
            "fit_script" => cfg.fit_script = Some(parse_path(value).with_context(invalid)?),
            "assess_script" => cfg.assess_script = Some(parse_path(value).with_context(invalid)?),
            "catalog_file" => cfg.catalog_file = Some(parse_path(value).with_context(invalid)?),
            "vocabulary_file" => {
                cfg.vocabulary_file = Some(parse_path(value).with_context(invalid)?);
            }
            "process_timeout_secs" => {
                cfg.process_timeout_secs = Some(parse_integer_u64(value).with_context(invalid)?);
            }
            "summary_strategy" => {
                let parsed = parse_string_literal(value).with_context(invalid)?;
                let strategy = parsed
                    .parse::<AssignmentStrategy>()
                    .map_err(|reason| anyhow!(reason))
                    .with_context(invalid)?;
                cfg.summary_strategy = Some(strategy);
            }
            "drop_empty_abstracts" => {
                cfg.drop_empty_abstracts = Some(parse_boolean(value).with_context(invalid)?);
            }
            "verbosity" => {
                let parsed = parse_string_literal(value).with_context(invalid)?;
                cfg.verbosity = Some(parse_verbosity(&parsed).with_context(|| {
                    format!("Invalid `verbosity` value '{parsed}' on line {line_no}")
                })?);
            }
            unknown => {
                bail!("Unknown configuration key: '{unknown}' on line {line_no}");
            }
        }
    }
    cfg.validate()?;
    Ok(cfg)
}

fn strip_inline_comment(line: &str) -> &str {
    let mut in_string = false;
    for (index, ch) in line.char_indices() {
        match ch {
            '"' => in_string = !in_string,
            '#' if !in_string => return &line[..index],
            _ => {}
        }
    }
    line
}

fn parse_string_literal(raw_value: &str) -> Result<String> {
    if raw_value.len() < 2 || !raw_value.starts_with('"') || !raw_value.ends_with('"') {
        bail!("Expected double-quoted string");
    }
    Ok(raw_value[1..raw_value.len() - 1].to_string())
}

fn parse_path(raw_value: &str) -> Result<PathBuf> {
    parse_string_literal(raw_value).map(PathBuf::from)
}

fn parse_integer_u64(raw_value: &str) -> Result<u64> {
    let token = raw_value.trim();
    if token.is_empty() {
        bail!("Expected integer value");
    }
    let value = token.parse::<i128>()?;
    if value < 0 {
        bail!("Expected non-negative integer");
    }
    u64::try_from(value).map_err(|_| anyhow!("Integer value out of range for u64"))
}

fn parse_verbosity(value: &str) -> Result<VerbositySetting> {
    match value {
        "default" => Ok(VerbositySetting::Default),
        "verbose" => Ok(VerbositySetting::Verbose),
        "quiet" => Ok(VerbositySetting::Quiet),
        "debug" => Ok(VerbositySetting::Debug),
        _ => bail!("Expected one of: default, verbose, quiet, debug"),
    }
}

fn parse_boolean(raw_value: &str) -> Result<bool> {
    match raw_value.trim() {
        "true" => Ok(true),
        "false" => Ok(false),
        _ => bail!("Expected 'true' or 'false'"),
    }
}
