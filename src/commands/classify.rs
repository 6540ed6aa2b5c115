//! Classify command handler: nearest topic from a topic table per title.

use anyhow::{Context, Result};
use topiclabel_core::{Corpus, Table, TopicCatalog, classify_corpus};

use super::sibling_output;
use crate::app_config::FileConfig;
use crate::cli::ClassifyArgs;

pub fn run_classify_command(args: &ClassifyArgs, config: &FileConfig) -> Result<()> {
    let mut corpus = Corpus::load(&args.input)?;
    if config.drop_empty_abstracts == Some(true) {
        corpus.drop_empty_abstracts();
    }

    let table = Table::read(&args.topics)?;
    let topics = TopicCatalog::from_table(
        &table,
        &args.topics.display().to_string(),
        &args.label_column,
        &args.text_column,
    )?;
    if topics.is_empty() {
        anyhow::bail!(
            "Topic table '{}' has no rows\n  Suggestion: Run `topiclabel run` or `summarize` first",
            args.topics.display()
        );
    }

    let report = classify_corpus(&mut corpus, &topics)
        .with_context(|| format!("Cannot classify '{}'", args.input.display()))?;

    let output = args
        .output
        .clone()
        .unwrap_or_else(|| sibling_output(&args.input, "classified"));
    corpus.write(&output)?;

    println!(
        "Classified {} documents against {} topics ({} unlabeled) -> {}",
        report.documents,
        topics.len(),
        report.unlabeled,
        output.display()
    );
    Ok(())
}
