use quarry_core::{IndexConfiguration, TextNormalizer};

#[test]
fn it_normalizes_and_stems() {
    let n = TextNormalizer::new();
    let words = n.process("Running Runners RUN! The café's menu.", &IndexConfiguration::default());
    // Stemming to "run" should appear
    assert!(words.contains(&"run".to_string()));
    assert!(words.iter().any(|w| w.starts_with("caf")));
    assert!(words.contains(&"menu".to_string()));
}

#[test]
fn it_filters_stopwords() {
    let n = TextNormalizer::new();
    let words = n.process("The quick brown fox and the lazy dog", &IndexConfiguration::new(true, false, false));
    assert!(!words.contains(&"the".to_string()));
    assert!(!words.contains(&"and".to_string()));
    assert!(words.contains(&"quick".to_string()));
}

#[test]
fn stopwords_are_kept_when_removal_is_off() {
    let n = TextNormalizer::new();
    let words = n.process("The quick brown fox", &IndexConfiguration::new(false, false, false));
    assert_eq!(words, vec!["the", "quick", "brown", "fox"]);
}

#[test]
fn every_configuration_yields_tokens() {
    let n = TextNormalizer::new();
    for cfg in IndexConfiguration::all() {
        assert!(!n.process("of the", &cfg).is_empty());
        assert!(!n.process("Information Retrieval", &cfg).is_empty());
    }
}
