use crate::config::Rocchio;
use crate::error::{Error, Result};
use parking_lot::RwLock;
use std::collections::HashMap;

/// Judged documents for one query and the Rocchio vector they produce.
#[derive(Debug, Clone, PartialEq)]
pub struct RelevanceFeedback {
    query_vec: Vec<f32>,
    positive: Vec<Vec<f32>>,
    negative: Vec<Vec<f32>>,
    rocchio: Rocchio,
    expanded: Vec<f32>,
}

impl RelevanceFeedback {
    pub fn new(query_vec: Vec<f32>, positive: Vec<Vec<f32>>, negative: Vec<Vec<f32>>, rocchio: Rocchio) -> Result<Self> {
        let dim = query_vec.len();
        if let Some(v) = positive.iter().chain(negative.iter()).find(|v| v.len() != dim) {
            return Err(Error::FeedbackMismatch(format!(
                "document vector has {} dimensions, query has {dim}",
                v.len()
            )));
        }
        let expanded = expand(&query_vec, &positive, &negative, &rocchio);
        Ok(Self { query_vec, positive, negative, rocchio, expanded })
    }

    pub fn query_vec(&self) -> &[f32] { &self.query_vec }

    pub fn positive_count(&self) -> usize { self.positive.len() }

    pub fn negative_count(&self) -> usize { self.negative.len() }

    /// `alpha*q0 + beta*mean(positive) - gamma*mean(negative)`.
    pub fn expanded_query(&self) -> &[f32] { &self.expanded }

    /// Combine feedback gathered for the same original query.
    pub fn merge(a: &RelevanceFeedback, b: &RelevanceFeedback) -> Result<RelevanceFeedback> {
        if a.query_vec != b.query_vec {
            return Err(Error::FeedbackMismatch("original query vectors differ".into()));
        }
        let positive = a.positive.iter().chain(b.positive.iter()).cloned().collect();
        let negative = a.negative.iter().chain(b.negative.iter()).cloned().collect();
        RelevanceFeedback::new(a.query_vec.clone(), positive, negative, a.rocchio)
    }
}

fn vec_sum(dim: usize, vectors: &[Vec<f32>]) -> Vec<f32> {
    let mut sum = vec![0.0; dim];
    for v in vectors {
        for (s, x) in sum.iter_mut().zip(v) {
            *s += x;
        }
    }
    sum
}

fn expand(q0: &[f32], positive: &[Vec<f32>], negative: &[Vec<f32>], r: &Rocchio) -> Vec<f32> {
    let mut out: Vec<f32> = q0.iter().map(|x| r.alpha * x).collect();
    if !positive.is_empty() {
        let scale = r.beta / positive.len() as f32;
        for (o, s) in out.iter_mut().zip(vec_sum(q0.len(), positive)) {
            *o += scale * s;
        }
    }
    if !negative.is_empty() {
        let scale = r.gamma / negative.len() as f32;
        for (o, s) in out.iter_mut().zip(vec_sum(q0.len(), negative)) {
            *o -= scale * s;
        }
    }
    out
}

/// Feedback remembered per raw query string for the life of the process.
///
/// Writers are serialized by the lock; readers always see a fully merged entry.
#[derive(Debug, Default)]
pub struct RelevanceFeedbackSession {
    memory: RwLock<HashMap<String, RelevanceFeedback>>,
}

impl RelevanceFeedbackSession {
    pub fn new() -> Self { Self::default() }

    /// Record feedback; an existing entry for `query` is merged, not replaced.
    pub fn add_relevance_feedback(&self, query: &str, rf: RelevanceFeedback) -> Result<()> {
        let mut memory = self.memory.write();
        let merged = match memory.get(query) {
            Some(existing) => RelevanceFeedback::merge(existing, &rf)?,
            None => rf,
        };
        memory.insert(query.to_string(), merged);
        Ok(())
    }

    pub fn exists_rf(&self, query: &str) -> bool {
        self.memory.read().contains_key(query)
    }

    pub fn expanded_query(&self, query: &str) -> Option<Vec<f32>> {
        self.memory.read().get(query).map(|rf| rf.expanded_query().to_vec())
    }

    pub fn feedback(&self, query: &str) -> Option<RelevanceFeedback> {
        self.memory.read().get(query).cloned()
    }

    pub fn len(&self) -> usize { self.memory.read().len() }

    pub fn is_empty(&self) -> bool { self.memory.read().is_empty() }
}
