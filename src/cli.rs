//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;

use clap::{Args as ClapArgs, Parser, Subcommand};
use topiclabel_core::AssignmentStrategy;

/// Label bibliographic records with topical categories.
///
/// Topiclabel normalizes keyword fields, matches documents to candidate
/// topics by TF-IDF cosine similarity, and can drive an external topic
/// model end to end.
#[derive(Parser, Debug)]
#[command(name = "topiclabel")]
#[command(author, version, about)]
pub struct Args {
    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Config file (default: $XDG_CONFIG_HOME/topiclabel/config.toml)
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Add a `Summary topic` column by matching keywords to a topic catalog
    Summarize(SummarizeArgs),
    /// Add an `Assigned Topic` column by matching titles to a topic table
    Classify(ClassifyArgs),
    /// Run normalization, the external model, and both labeling passes
    Run(RunArgs),
}

/// Static tables shared by `summarize` and `run`.
#[derive(ClapArgs, Debug, Clone, Default)]
pub struct TableArgs {
    /// Topic catalog file, one `Label` or `Label | keyword text` per line
    #[arg(long, value_name = "FILE")]
    pub catalog: Option<PathBuf>,

    /// JSON file with filler words and keyword expansions
    #[arg(long, value_name = "FILE")]
    pub vocabulary: Option<PathBuf>,

    /// Summarization strategy
    #[arg(long, value_parser = parse_strategy)]
    pub strategy: Option<AssignmentStrategy>,
}

#[derive(ClapArgs, Debug)]
pub struct SummarizeArgs {
    /// Corpus file (.csv, .tsv or .xlsx) with `Title` and `Keywords` columns
    pub input: PathBuf,

    /// Output file (default: <input stem>_summarized.<ext>)
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    #[command(flatten)]
    pub tables: TableArgs,
}

#[derive(ClapArgs, Debug)]
pub struct ClassifyArgs {
    /// Corpus file (.csv, .tsv or .xlsx) with `Title` and `Keywords` columns
    pub input: PathBuf,

    /// Topic table, e.g. a labeled model summary
    #[arg(long, value_name = "FILE")]
    pub topics: PathBuf,

    /// Output file (default: <input stem>_classified.<ext>)
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Topic table column holding the labels
    #[arg(long, default_value = "Summary topic", value_name = "NAME")]
    pub label_column: String,

    /// Topic table column holding the keyword text
    #[arg(long, default_value = "Keywords", value_name = "NAME")]
    pub text_column: String,
}

#[derive(ClapArgs, Debug)]
pub struct RunArgs {
    /// Corpus file (.csv, .tsv or .xlsx) with `Title` and `Keywords` columns
    pub input: PathBuf,

    /// Parent directory for run directories
    #[arg(long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Batch name used in the run label (default: input file stem)
    #[arg(long, value_name = "NAME")]
    pub batch_name: Option<String>,

    /// Timeout per external process in seconds (1-86400)
    #[arg(long, value_name = "SECS", value_parser = clap::value_parser!(u64).range(1..=86_400))]
    pub timeout: Option<u64>,

    /// Interpreter for the model scripts
    #[arg(long, value_name = "PATH")]
    pub rscript: Option<PathBuf>,

    /// Script that fits the topic model
    #[arg(long, value_name = "PATH")]
    pub fit_script: Option<PathBuf>,

    /// Script that writes the topic summary table
    #[arg(long, value_name = "PATH")]
    pub assess_script: Option<PathBuf>,

    #[command(flatten)]
    pub tables: TableArgs,

    /// Drop documents without an abstract before normalizing
    #[arg(long)]
    pub drop_empty_abstracts: bool,
}

fn parse_strategy(raw: &str) -> Result<AssignmentStrategy, String> {
    raw.parse()
}
