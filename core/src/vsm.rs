use crate::config::RetrievalSettings;
use crate::feedback::RelevanceFeedbackSession;
use crate::index::Index;
use crate::spelling::{get_closest_term, SpellingCorrection};
use crate::tokenizer::TextNormalizer;
use crate::{DocId, SearchResult};

/// Count vector of a free-text query over the vocabulary, with unknown
/// words folded onto their spelling corrections.
pub fn vectorize_query(
    index: &Index,
    normalizer: &TextNormalizer,
    raw_query: &str,
    correction_limit: usize,
) -> (Vec<f32>, SpellingCorrection) {
    let mut vector = vec![0.0f32; index.terms().len()];
    let mut not_found: Vec<String> = Vec::new();

    for word in raw_query.split_whitespace() {
        let term = normalizer.first_term(word, index.config());
        if term.is_empty() { continue; }
        match index.term_id(&term) {
            Some(tid) => vector[tid as usize] += 1.0,
            None => not_found.push(term),
        }
    }

    let mut correction = SpellingCorrection::new();
    if not_found.is_empty() {
        return (vector, correction);
    }

    let mut candidates: Vec<(String, &str)> = not_found
        .into_iter()
        .filter_map(|t| get_closest_term(&t, index.terms()).map(|c| (t, c)))
        .collect();
    candidates.sort_by(|a, b| index.total_term_frequency(b.1).cmp(&index.total_term_frequency(a.1)));

    for (original, closest) in candidates.into_iter().take(correction_limit) {
        tracing::debug!(%original, corrected = closest, "spelling correction");
        if let Some(tid) = index.term_id(closest) {
            vector[tid as usize] += 1.0;
        }
        correction.insert(original, closest);
    }
    (vector, correction)
}

/// Documents with a non-zero dot product against `query`, best first, ties
/// in row order, at most `limit`.
pub fn rank(index: &Index, query: &[f32], limit: usize) -> Vec<(DocId, f32)> {
    let mut scored: Vec<(DocId, f32)> = (0..index.num_docs() as DocId)
        .map(|d| (d, index.score(d, query)))
        .filter(|&(_, s)| s != 0.0)
        .collect();
    scored.sort_by(|a, b| b.1.total_cmp(&a.1));
    scored.truncate(limit);
    scored
}

/// Run a vector-space query. When `feedback` holds an entry for this exact
/// query string, its Rocchio vector replaces the plain query vector.
pub fn query(
    index: &Index,
    normalizer: &TextNormalizer,
    raw_query: &str,
    settings: &RetrievalSettings,
    feedback: Option<&RelevanceFeedbackSession>,
) -> SearchResult {
    let (mut vector, correction) = vectorize_query(index, normalizer, raw_query, settings.correction_limit);
    if let Some(expanded) = feedback.and_then(|s| s.expanded_query(raw_query)) {
        tracing::debug!(query = raw_query, "applying relevance feedback");
        vector = expanded;
    }

    let ranked = rank(index, &vector, settings.result_limit);
    let mut doc_ids = Vec::with_capacity(ranked.len());
    let mut scores = Vec::with_capacity(ranked.len());
    for (row, score) in ranked {
        if let Some(id) = index.doc_id(row) {
            doc_ids.push(id.to_string());
            scores.push(score);
        }
    }
    SearchResult::new(doc_ids, correction, scores)
}
