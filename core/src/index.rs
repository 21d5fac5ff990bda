use crate::bigram::{self, BigramIndex};
use crate::config::{BuildOptions, IndexKey, TermCounting};
use crate::corpus::Corpus;
use crate::error::{Error, Result};
use crate::tokenizer::TextNormalizer;
use crate::{DocId, Posting, TermId};
use rayon::prelude::*;
use std::collections::{BTreeSet, HashMap};

/// Term-document index for one (corpus, configuration).
///
/// Rows of the TF-IDF matrix follow corpus order; columns follow the sorted
/// vocabulary. Immutable once built, so it can be shared freely between
/// reader threads.
#[derive(Debug, Clone, PartialEq)]
pub struct Index {
    pub(crate) key: IndexKey,
    pub(crate) options: BuildOptions,
    pub(crate) doc_ids: Vec<String>,
    pub(crate) terms: Vec<String>,
    pub(crate) dictionary: HashMap<String, TermId>,
    pub(crate) df: Vec<u32>,
    pub(crate) postings: Vec<Vec<Posting>>,
    pub(crate) tf_over_corpus: Vec<u64>,
    /// Sparse rows: (term id, weight) sorted by term id, tf > 0 only.
    pub(crate) weights: Vec<Vec<(TermId, f32)>>,
    pub(crate) bigram_index: BigramIndex,
}

impl Index {
    /// Build every structure for `corpus` under `key.config`. Either the
    /// whole index is returned or nothing.
    pub fn build(corpus: &Corpus, key: IndexKey, normalizer: &TextNormalizer, options: BuildOptions) -> Result<Index> {
        let config = key.config;
        tracing::info!(index = %key, num_docs = corpus.len(), "building index");

        let processed: Vec<Vec<String>> = corpus
            .documents()
            .par_iter()
            .map(|doc| normalizer.process(&doc.indexed_text(), &config))
            .collect();

        let terms: Vec<String> = processed
            .iter()
            .flatten()
            .filter(|t| !t.is_empty())
            .cloned()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let dictionary: HashMap<String, TermId> =
            terms.iter().enumerate().map(|(i, t)| (t.clone(), i as TermId)).collect();

        let tf_rows: Vec<Vec<(TermId, u32)>> = processed
            .par_iter()
            .map(|tokens| match options.term_counting {
                TermCounting::Substring => substring_counts(tokens, &terms),
                TermCounting::Token => token_counts(tokens, &dictionary),
            })
            .collect();

        let mut df = vec![0u32; terms.len()];
        let mut tf_over_corpus = vec![0u64; terms.len()];
        let mut postings: Vec<Vec<Posting>> = vec![Vec::new(); terms.len()];
        for (doc_id, row) in tf_rows.iter().enumerate() {
            for &(tid, tf) in row {
                df[tid as usize] += 1;
                tf_over_corpus[tid as usize] += tf as u64;
                postings[tid as usize].push(Posting { doc_id: doc_id as DocId, tf });
            }
        }

        let n = corpus.len();
        let idf: Vec<f32> = df.iter().map(|&d| options.idf.idf(n, d)).collect();
        let weights: Vec<Vec<(TermId, f32)>> = tf_rows
            .par_iter()
            .map(|row| {
                row.iter()
                    .map(|&(tid, tf)| (tid, ((tf as f32) + 1.0).log10() * idf[tid as usize]))
                    .collect()
            })
            .collect();

        let bigram_index = BigramIndex::build(&terms);
        let doc_ids = corpus.documents().iter().map(|d| d.doc_id.clone()).collect();

        tracing::info!(index = %key, num_terms = terms.len(), num_bigrams = bigram_index.len(), "index built");
        Ok(Index { key, options, doc_ids, terms, dictionary, df, postings, tf_over_corpus, weights, bigram_index })
    }

    pub fn key(&self) -> IndexKey { self.key }

    pub fn options(&self) -> BuildOptions { self.options }

    pub fn config(&self) -> &crate::config::IndexConfiguration { &self.key.config }

    /// Sorted vocabulary; a term's position is its [`TermId`].
    pub fn terms(&self) -> &[String] { &self.terms }

    /// External document ids in row order.
    pub fn doc_ids(&self) -> &[String] { &self.doc_ids }

    pub fn num_docs(&self) -> usize { self.doc_ids.len() }

    pub fn doc_id(&self, doc: DocId) -> Option<&str> {
        self.doc_ids.get(doc as usize).map(String::as_str)
    }

    /// Row of an external document id.
    pub fn doc_row(&self, doc_id: &str) -> Option<DocId> {
        self.doc_ids.iter().position(|d| d == doc_id).map(|i| i as DocId)
    }

    pub fn term_id(&self, term: &str) -> Option<TermId> {
        self.dictionary.get(term).copied()
    }

    pub fn contains(&self, term: &str) -> bool { self.dictionary.contains_key(term) }

    pub fn postings(&self, term: &str) -> &[Posting] {
        match self.term_id(term) {
            Some(tid) => &self.postings[tid as usize],
            None => &[],
        }
    }

    /// Ascending document rows containing `term`; empty for unknown terms.
    pub fn get(&self, term: &str) -> Vec<DocId> {
        self.postings(term).iter().map(|p| p.doc_id).collect()
    }

    pub fn document_frequency(&self, term: &str) -> u32 {
        self.term_id(term).map(|t| self.df[t as usize]).unwrap_or(0)
    }

    /// Sum of raw term frequency over all documents.
    pub fn total_term_frequency(&self, term: &str) -> u64 {
        self.term_id(term).map(|t| self.tf_over_corpus[t as usize]).unwrap_or(0)
    }

    pub fn weight(&self, doc: DocId, term: &str) -> f32 {
        match (self.weights.get(doc as usize), self.term_id(term)) {
            (Some(row), Some(tid)) => row_weight(row, tid),
            _ => 0.0,
        }
    }

    pub fn weight_row(&self, doc: DocId) -> &[(TermId, f32)] {
        self.weights.get(doc as usize).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Dense TF-IDF vector of one document over the vocabulary.
    pub fn document_vector(&self, doc: DocId) -> Vec<f32> {
        let mut v = vec![0.0; self.terms.len()];
        for &(tid, w) in self.weight_row(doc) {
            v[tid as usize] = w;
        }
        v
    }

    /// Dot product of a document row with a dense query vector.
    pub fn score(&self, doc: DocId, query: &[f32]) -> f32 {
        self.weight_row(doc)
            .iter()
            .map(|&(tid, w)| w * query.get(tid as usize).copied().unwrap_or(0.0))
            .sum()
    }

    pub fn bigram_index(&self) -> &BigramIndex { &self.bigram_index }

    /// Resolve a single-`*` pattern to a `( a OR b )` disjunction of
    /// vocabulary terms.
    pub fn expand_wildcard(&self, pattern: &str) -> Result<String> {
        let candidates = self.bigram_index.bigrams_to_terms(&bigram::get_bigrams(pattern));
        let expanded =
            bigram::equivalences_to_query(candidates.iter().map(|&t| self.terms[t as usize].as_str()), pattern)?;
        tracing::debug!(pattern, %expanded, "wildcard expanded");
        Ok(expanded)
    }

    /// Check the cross-structure invariants; used when loading from disk.
    pub(crate) fn validate(&self) -> Result<()> {
        let v = self.terms.len();
        let d = self.doc_ids.len();
        if self.terms.windows(2).any(|w| w[0] >= w[1]) {
            return Err(Error::Serialization("vocabulary is not sorted and unique".into()));
        }
        if self.df.len() != v || self.postings.len() != v || self.tf_over_corpus.len() != v {
            return Err(Error::Serialization("term-indexed tables disagree with vocabulary size".into()));
        }
        if self.weights.len() != d {
            return Err(Error::Serialization("weight rows disagree with document count".into()));
        }
        for (tid, plist) in self.postings.iter().enumerate() {
            if plist.windows(2).any(|w| w[0].doc_id >= w[1].doc_id)
                || plist.iter().any(|p| p.doc_id as usize >= d)
                || plist.len() != self.df[tid] as usize
            {
                return Err(Error::Serialization(format!("postings for term {tid} are inconsistent")));
            }
        }
        for row in &self.weights {
            if row.windows(2).any(|w| w[0].0 >= w[1].0) || row.iter().any(|&(t, _)| t as usize >= v) {
                return Err(Error::Serialization("weight row is unsorted or out of range".into()));
            }
        }
        self.bigram_index.validate(v)
    }
}

fn row_weight(row: &[(TermId, f32)], tid: TermId) -> f32 {
    match row.binary_search_by_key(&tid, |&(t, _)| t) {
        Ok(i) => row[i].1,
        Err(_) => 0.0,
    }
}

/// Non-overlapping occurrences of each term inside the space-joined tokens.
fn substring_counts(tokens: &[String], terms: &[String]) -> Vec<(TermId, u32)> {
    let text = tokens.join(" ");
    if text.trim().is_empty() {
        return Vec::new();
    }
    terms
        .iter()
        .enumerate()
        .filter_map(|(tid, term)| {
            let count = text.matches(term.as_str()).count() as u32;
            (count > 0).then_some((tid as TermId, count))
        })
        .collect()
}

fn token_counts(tokens: &[String], dictionary: &HashMap<String, TermId>) -> Vec<(TermId, u32)> {
    let mut counts: HashMap<TermId, u32> = HashMap::new();
    for token in tokens {
        if let Some(&tid) = dictionary.get(token) {
            *counts.entry(tid).or_insert(0) += 1;
        }
    }
    let mut row: Vec<(TermId, u32)> = counts.into_iter().collect();
    row.sort_unstable_by_key(|&(t, _)| t);
    row
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{IdfWeighting, IndexConfiguration};
    use crate::corpus::Document;

    fn corpus() -> Corpus {
        Corpus::new(vec![
            Document::new("d1", "", "operating system design"),
            Document::new("d2", "", "database system"),
            Document::new("d3", "", "operating procedures"),
        ])
    }

    fn build(config: IndexConfiguration, options: BuildOptions) -> Index {
        Index::build(&corpus(), IndexKey::new(0, config), &TextNormalizer::new(), options).unwrap()
    }

    #[test]
    fn vocabulary_and_postings() {
        let idx = build(IndexConfiguration::default(), BuildOptions::default());
        assert_eq!(idx.terms(), &["databas", "design", "oper", "procedur", "system"]);
        assert_eq!(idx.get("oper"), vec![0, 2]);
        assert_eq!(idx.get("system"), vec![0, 1]);
        assert!(idx.get("missing").is_empty());
        assert_eq!(idx.document_frequency("oper"), 2);
        assert_eq!(idx.total_term_frequency("design"), 1);
        idx.validate().unwrap();
    }

    #[test]
    fn substring_counting_overcounts_embedded_terms() {
        let c = Corpus::new(vec![Document::new("a", "", "cat catalog"), Document::new("b", "", "dog")]);
        let key = IndexKey::new(0, IndexConfiguration::new(false, false, false));
        let sub = Index::build(&c, key, &TextNormalizer::new(), BuildOptions::default()).unwrap();
        assert_eq!(sub.postings("cat")[0].tf, 2);
        let tok = Index::build(
            &c,
            key,
            &TextNormalizer::new(),
            BuildOptions { term_counting: TermCounting::Token, ..BuildOptions::default() },
        )
        .unwrap();
        assert_eq!(tok.postings("cat")[0].tf, 1);
    }

    #[test]
    fn tf_idf_weights_follow_formula() {
        let idx = build(IndexConfiguration::default(), BuildOptions::default());
        let expected = (2.0f32).log10() * (3.0f32 / 1.0 + 1.0).log10();
        assert!((idx.weight(0, "design") - expected).abs() < 1e-6);
        assert_eq!(idx.weight(1, "design"), 0.0);

        let shifted = build(
            IndexConfiguration::default(),
            BuildOptions { idf: IdfWeighting::ShiftedDenominator, ..BuildOptions::default() },
        );
        let expected = (2.0f32).log10() * (3.0f32 / 2.0).log10();
        assert!((shifted.weight(0, "design") - expected).abs() < 1e-6);
        assert!(shifted.weight(0, "oper").abs() < 1e-6);
    }

    #[test]
    fn document_vector_matches_weights() {
        let idx = build(IndexConfiguration::default(), BuildOptions::default());
        let v = idx.document_vector(0);
        assert_eq!(v.len(), idx.terms().len());
        for (tid, term) in idx.terms().iter().enumerate() {
            assert_eq!(v[tid], idx.weight(0, term));
        }
    }

    #[test]
    fn wildcard_expansion_uses_vocabulary() {
        let idx = build(IndexConfiguration::new(true, false, true), BuildOptions::default());
        assert_eq!(idx.expand_wildcard("oper*").unwrap(), "( operating )");
        assert_eq!(idx.expand_wildcard("*base").unwrap(), "( database )");
        assert_eq!(idx.expand_wildcard("zz*").unwrap(), format!("( {} )", bigram::NO_MATCH_TERM));
    }
}
