//! Summarize command handler: catalog labels for each document's keywords.

use anyhow::Result;
use topiclabel_core::{Corpus, summarize_corpus};
use tracing::info;

use super::{StaticTables, sibling_output};
use crate::app_config::FileConfig;
use crate::cli::SummarizeArgs;

pub fn run_summarize_command(args: &SummarizeArgs, config: &FileConfig) -> Result<()> {
    let tables = StaticTables::resolve(&args.tables, config)?;
    let mut corpus = Corpus::load(&args.input)?;
    if config.drop_empty_abstracts == Some(true) {
        let dropped = corpus.drop_empty_abstracts();
        info!(dropped, "Removed documents without an abstract");
    }

    let report = summarize_corpus(
        &mut corpus,
        &tables.normalizer,
        &tables.catalog,
        tables.strategy,
    )?;

    let output = args
        .output
        .clone()
        .unwrap_or_else(|| sibling_output(&args.input, "summarized"));
    corpus.write(&output)?;

    println!(
        "Summarized {} documents ({} unlabeled) -> {}",
        report.documents,
        report.unlabeled,
        output.display()
    );
    Ok(())
}
