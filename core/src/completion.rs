//! Query completion from a word-bigram model of the corpus.

use crate::corpus::Corpus;
use crate::tokenizer::is_stopword;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

pub const DEFAULT_THRESHOLD: u32 = 2;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryCompletion {
    /// word -> words seen right after it at least `threshold` times, most frequent first
    bigram_model: HashMap<String, Vec<String>>,
    all_terms: Vec<String>,
}

impl QueryCompletion {
    pub fn build(corpus: &Corpus, threshold: u32) -> Self {
        let mut counts: HashMap<String, HashMap<String, u32>> = HashMap::new();
        let mut all_terms: BTreeSet<String> = BTreeSet::new();

        for doc in corpus.documents() {
            let text = format!("{}.{}", doc.title, doc.content).to_lowercase();
            for sentence in text.split('.') {
                let words: Vec<&str> = sentence
                    .split_whitespace()
                    .filter(|w| w.chars().all(char::is_alphabetic) && !is_stopword(w))
                    .collect();
                all_terms.extend(words.iter().map(|w| w.to_string()));
                for pair in words.windows(2) {
                    *counts.entry(pair[0].to_string()).or_default().entry(pair[1].to_string()).or_insert(0) += 1;
                }
            }
        }

        let bigram_model = counts
            .into_iter()
            .filter_map(|(first, followers)| {
                let mut kept: Vec<(String, u32)> = followers.into_iter().filter(|&(_, c)| c >= threshold).collect();
                if kept.is_empty() {
                    return None;
                }
                kept.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
                Some((first, kept.into_iter().map(|(w, _)| w).collect()))
            })
            .collect();

        Self { bigram_model, all_terms: all_terms.into_iter().collect() }
    }

    pub fn all_terms(&self) -> &[String] { &self.all_terms }

    /// Words likely to follow `word`, most frequent first.
    pub fn next_words(&self, word: &str) -> &[String] {
        self.bigram_model.get(word).map(Vec::as_slice).unwrap_or(&[])
    }

    /// The query extended by each likely next word.
    pub fn following_terms(&self, query: &str) -> Vec<String> {
        let Some(last) = query.split_whitespace().last() else {
            return Vec::new();
        };
        let base = query.trim_end();
        self.next_words(&last.to_lowercase()).iter().map(|w| format!("{base} {w}")).collect()
    }

    /// The query with its last fragment replaced by every known word containing it.
    pub fn complete_term(&self, query: &str) -> Vec<String> {
        let Some(fragment) = query.split_whitespace().last() else {
            return Vec::new();
        };
        let fragment = fragment.to_lowercase();
        let trimmed = query.trim_end();
        // keep everything up to and including the last separator, which may be multi-byte
        let prefix = match trimmed.char_indices().rev().find(|(_, c)| c.is_whitespace()) {
            Some((i, c)) => &trimmed[..i + c.len_utf8()],
            None => "",
        };
        self.all_terms
            .iter()
            .filter(|t| t.contains(&fragment))
            .map(|t| format!("{prefix}{t}"))
            .collect()
    }
}
