use quarry_core::builder::build_and_save;
use quarry_core::persist::IndexPaths;
use quarry_core::{
    BuildOptions, Corpus, Document, Error, Index, IndexConfiguration, IndexKey, RetrievalModel, RetrievalSettings,
    SearchEngine, TextNormalizer,
};
use tempfile::tempdir;

fn corpus() -> Corpus {
    Corpus::new(vec![
        Document::new("d1", "Kernels", "operating system design"),
        Document::new("d2", "Storage", "database system"),
        Document::new("d3", "Ops", "operating procedures. Checklists for operators."),
        Document::new("d4", "Misc", "system procedures"),
    ])
}

fn engine_with_all_configs() -> SearchEngine {
    let mut engine = SearchEngine::new(RetrievalSettings::default());
    let n = TextNormalizer::new();
    for cfg in IndexConfiguration::all() {
        engine.add_index(Index::build(&corpus(), IndexKey::new(0, cfg), &n, BuildOptions::default()).unwrap());
    }
    engine.add_corpus(0, corpus());
    engine
}

#[test]
fn defaults_to_vsm_over_full_normalization() {
    let engine = engine_with_all_configs();
    assert_eq!(engine.model(), RetrievalModel::Vsm);
    assert_eq!(engine.current_key().to_string(), "0_111");
    assert!(engine.check_integrity());
    let r = engine.query("operating system").unwrap();
    assert_eq!(r.doc_ids[0], "d1");
}

#[test]
fn switching_model_and_toggles() {
    let mut engine = engine_with_all_configs();
    engine.switch_model(None);
    assert_eq!(engine.model(), RetrievalModel::Boolean);
    assert_eq!(engine.query("operating AND_NOT system").unwrap().doc_ids, vec!["d3"]);

    engine.switch_stemming();
    assert_eq!(engine.current_key().config.bits(), "101");
    assert_eq!(engine.query("operating AND_NOT system").unwrap().doc_ids, vec!["d3"]);

    engine.switch_model(Some(RetrievalModel::Vsm));
    assert_eq!(engine.model(), RetrievalModel::Vsm);
    assert_eq!(engine.to_string(), "Current model: vsm, current index selected: 0_101");
}

#[test]
fn missing_configuration_is_reported() {
    let mut engine = SearchEngine::new(RetrievalSettings::default());
    engine.add_index(
        Index::build(&corpus(), IndexKey::new(0, IndexConfiguration::default()), &TextNormalizer::new(), BuildOptions::default())
            .unwrap(),
    );
    assert!(!engine.check_integrity());
    engine.switch_normalization();
    assert!(matches!(engine.query("system"), Err(Error::Configuration(_))));
    engine.select_corpus(1);
    assert!(matches!(engine.get_doc_title("d1"), Err(Error::Configuration(_))));
}

#[test]
fn feedback_rewrites_only_the_same_query() {
    let engine = engine_with_all_configs();
    let before = engine.query("system").unwrap();
    assert_eq!(before.doc_ids, vec!["d1", "d2", "d4"]);

    engine.add_feedback("system", &["d4"], &["d1"]).unwrap();
    let after = engine.query("system").unwrap();
    assert_eq!(after.doc_ids[0], "d4");
    // d3 shares "procedures" with the relevant document
    assert!(after.doc_ids.contains(&"d3".to_string()));

    let unrelated = engine.query("system ").unwrap();
    assert_eq!(unrelated.doc_ids, before.doc_ids);
}

#[test]
fn feedback_on_unknown_document_fails() {
    let engine = engine_with_all_configs();
    assert!(matches!(engine.add_feedback("system", &["nope"], &[]), Err(Error::UnknownDocument(_))));
}

#[test]
fn document_accessors_use_current_corpus() {
    let engine = engine_with_all_configs();
    assert_eq!(engine.get_doc_title("d3").unwrap(), "Ops");
    assert_eq!(engine.get_doc_excerpt("d3").unwrap(), "operating procedures.");
    assert_eq!(engine.get_doc_content("d2").unwrap(), "database system");
}

#[test]
fn loads_from_disk() {
    let dir = tempdir().unwrap();
    let paths = IndexPaths::new(dir.path());
    build_and_save(&paths, &[corpus()], &TextNormalizer::new(), BuildOptions::default(), 4).unwrap();
    let engine = SearchEngine::load(&paths, RetrievalSettings::default()).unwrap();
    assert!(engine.check_integrity());
    assert_eq!(engine.query("database").unwrap().doc_ids, vec!["d2"]);

    let empty = tempdir().unwrap();
    assert!(matches!(
        SearchEngine::load(&IndexPaths::new(empty.path()), RetrievalSettings::default()),
        Err(Error::Configuration(_))
    ));
}
