//! Boolean and vector-space retrieval over a fixed document collection,
//! with wildcard resolution, spelling correction and Rocchio feedback across
//! every combination of the text-normalization toggles.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

pub mod bigram;
pub mod boolean;
pub mod builder;
pub mod completion;
pub mod config;
pub mod corpus;
pub mod engine;
pub mod error;
pub mod feedback;
pub mod index;
pub mod persist;
pub mod spelling;
pub mod tokenizer;
pub mod vsm;

pub use config::{BuildOptions, IdfWeighting, IndexConfiguration, IndexKey, RetrievalSettings, Rocchio, TermCounting};
pub use corpus::{Corpus, Document};
pub use engine::{RetrievalModel, SearchEngine};
pub use error::{Error, Result};
pub use feedback::{RelevanceFeedback, RelevanceFeedbackSession};
pub use index::Index;
pub use spelling::SpellingCorrection;
pub use tokenizer::TextNormalizer;

pub type TermId = u32;
/// Row of a document inside one index (its position in the corpus).
pub type DocId = u32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Posting {
    pub doc_id: DocId,
    pub tf: u32, // raw term frequency
}

/// Documents returned by either model, with the corrections applied to the
/// query and one score per document.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SearchResult {
    pub doc_ids: Vec<String>,
    pub correction: SpellingCorrection,
    pub scores: Vec<f32>,
}

impl SearchResult {
    pub fn new(doc_ids: Vec<String>, correction: SpellingCorrection, scores: Vec<f32>) -> Self {
        debug_assert_eq!(doc_ids.len(), scores.len());
        Self { doc_ids, correction, scores }
    }

    pub fn is_empty(&self) -> bool { self.doc_ids.is_empty() }

    pub fn len(&self) -> usize { self.doc_ids.len() }

    /// Keep only documents in `selected`, scores stay aligned.
    pub fn filter_by_doc_ids(&mut self, selected: &HashSet<String>) {
        let (ids, scores): (Vec<String>, Vec<f32>) = self
            .doc_ids
            .drain(..)
            .zip(self.scores.drain(..))
            .filter(|(id, _)| selected.contains(id))
            .unzip();
        self.doc_ids = ids;
        self.scores = scores;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filter_keeps_scores_aligned() {
        let mut r = SearchResult::new(
            vec!["a".into(), "b".into(), "c".into()],
            SpellingCorrection::new(),
            vec![3.0, 2.0, 1.0],
        );
        let keep: HashSet<String> = ["a".to_string(), "c".to_string()].into_iter().collect();
        r.filter_by_doc_ids(&keep);
        assert_eq!(r.doc_ids, vec!["a", "c"]);
        assert_eq!(r.scores, vec![3.0, 1.0]);
    }
}
