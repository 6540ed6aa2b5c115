//! Integration tests for the summarization and classification passes.

use std::fs;

use tempfile::TempDir;
use topiclabel_core::corpus::{ASSIGNED_TOPIC_COLUMN, SUMMARY_TOPIC_COLUMN};
use topiclabel_core::{
    AssignmentStrategy, Corpus, NormalizerTables, Provenance, TextNormalizer, TopicCatalog,
    UNLABELED, classify_corpus, load_catalog, summarize_corpus, summarize_texts,
};

fn five_topics() -> TopicCatalog {
    TopicCatalog::from_labels([
        "Water Use Efficiency",
        "Soil Erosion Control",
        "Integrated Pest Management",
        "Crop Rotation Practices",
        "Agroforestry",
    ])
}

#[test]
fn test_three_documents_against_five_topics_get_distinct_labels() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("papers.tsv");
    fs::write(
        &input,
        "Title\tKeywords\tYear\n\
         Drip lines\tIrrig;Water efficiency;study\t2021\n\
         Terraces\tsoil erosion;erosion control\t2020\n\
         Rotations\tcrop rotation;legumes\t2019\n",
    )
    .unwrap();

    let mut corpus = Corpus::load(&input).unwrap();
    let report = summarize_corpus(
        &mut corpus,
        &TextNormalizer::default(),
        &five_topics(),
        AssignmentStrategy::Greedy,
    )
    .unwrap();

    assert_eq!(report.labeled, 3);
    assert_eq!(
        corpus.column_texts(SUMMARY_TOPIC_COLUMN).unwrap(),
        ["Water Use Efficiency", "Soil Erosion Control", "Crop Rotation Practices"]
    );

    let output = dir.path().join("out.tsv");
    corpus.write(&output).unwrap();
    let written = fs::read_to_string(&output).unwrap();
    assert!(written.starts_with("Title\tKeywords\tYear\tSummary topic\n"));
}

#[test]
fn test_empty_keywords_are_unlabeled_and_consume_nothing() {
    let normalizer = TextNormalizer::default();
    let raw = ["", "study;analysis", "soil erosion"];
    let normalized = normalizer.normalize_all(&raw);
    assert_eq!(normalized[0], "");
    assert_eq!(normalized[1], "", "filler-only keywords carry no signal");

    let catalog = TopicCatalog::from_labels(["Soil Erosion Control"]);
    let assignments = summarize_texts(&normalized, &catalog, AssignmentStrategy::Greedy);

    assert_eq!(assignments[0].label, UNLABELED);
    assert_eq!(assignments[1].label, UNLABELED);
    assert_eq!(assignments[2].label, "Soil Erosion Control");
    assert_eq!(assignments[2].provenance, Provenance::GreedyUnique);
}

#[test]
fn test_more_documents_than_labels_leaves_surplus_unlabeled() {
    let catalog = TopicCatalog::from_labels(["Agroforestry"]);
    let texts = ["agroforestry trees", "agroforestry systems", "agroforestry"];
    let greedy = summarize_texts(&texts, &catalog, AssignmentStrategy::Greedy);
    let used: Vec<_> = greedy.iter().filter(|a| a.is_labeled()).collect();
    assert_eq!(used.len(), 1);
    assert_eq!(greedy[0].label, "Agroforestry", "greedy follows document order");

    let optimal = summarize_texts(&texts, &catalog, AssignmentStrategy::Optimal);
    assert_eq!(optimal.iter().filter(|a| a.is_labeled()).count(), 1);
    assert_eq!(optimal[2].label, "Agroforestry", "optimal takes the best match");
}

#[test]
fn test_custom_catalog_and_vocabulary_files() {
    let dir = TempDir::new().unwrap();
    let catalog_path = dir.path().join("topics.txt");
    fs::write(
        &catalog_path,
        "# custom topics\nFlood Adaptation | flooding adaptation levees\nSeed Banks\n",
    )
    .unwrap();
    let vocabulary_path = dir.path().join("vocab.json");
    fs::write(
        &vocabulary_path,
        r#"{ "filler_words": ["review"], "expansions": { "flood": "flooding" } }"#,
    )
    .unwrap();

    let catalog = load_catalog(&catalog_path).unwrap();
    let normalizer = TextNormalizer::new(&NormalizerTables::load(&vocabulary_path).unwrap()).unwrap();
    let normalized = normalizer.normalize_all(&["Flood;review", "seed banks"]);
    assert_eq!(normalized, ["flooding", "seed banks"]);

    let assignments = summarize_texts(&normalized, &catalog, AssignmentStrategy::Greedy);
    assert_eq!(assignments[0].label, "Flood Adaptation");
    assert_eq!(assignments[1].label, "Seed Banks");
}

#[test]
fn test_classification_reuses_topics_across_documents() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("papers.csv");
    fs::write(
        &input,
        "Title,Keywords\n\
         \"Soil erosion, a review\",x\n\
         Erosion on hillslopes,y\n\
         Market prices,z\n",
    )
    .unwrap();
    let mut corpus = Corpus::load(&input).unwrap();
    let topics = TopicCatalog::from_labels(["Soil Erosion Control", "Agroforestry"]);

    let report = classify_corpus(&mut corpus, &topics).unwrap();
    assert_eq!(
        corpus.column_texts(ASSIGNED_TOPIC_COLUMN).unwrap(),
        ["Soil Erosion Control", "Soil Erosion Control", UNLABELED]
    );
    assert_eq!(report.unlabeled, 1);
}
