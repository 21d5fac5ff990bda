use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Which text-normalization steps an index (and the queries against it) run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct IndexConfiguration {
    pub stop_words_removal: bool,
    pub stemming: bool,
    pub normalization: bool,
}

impl IndexConfiguration {
    pub fn new(stop_words_removal: bool, stemming: bool, normalization: bool) -> Self {
        Self { stop_words_removal, stemming, normalization }
    }

    /// Every toggle combination, `111` first and `000` last.
    pub fn all() -> Vec<IndexConfiguration> {
        let mut out = Vec::with_capacity(8);
        for swr in [true, false] {
            for s in [true, false] {
                for n in [true, false] {
                    out.push(IndexConfiguration::new(swr, s, n));
                }
            }
        }
        out
    }

    /// Fixed-width bit string, stop words first: `110` = stop words + stemming.
    pub fn bits(&self) -> String {
        let b = |v: bool| if v { '1' } else { '0' };
        [b(self.stop_words_removal), b(self.stemming), b(self.normalization)].iter().collect()
    }
}

impl Default for IndexConfiguration {
    fn default() -> Self {
        Self::new(true, true, true)
    }
}

impl fmt::Display for IndexConfiguration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.bits())
    }
}

impl FromStr for IndexConfiguration {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let bits: Vec<char> = s.trim().chars().collect();
        if bits.len() != 3 {
            return Err(Error::Configuration(format!("expected 3 toggle bits, got {s:?}")));
        }
        let mut flags = [false; 3];
        for (slot, c) in flags.iter_mut().zip(bits) {
            *slot = match c {
                '1' => true,
                '0' => false,
                other => return Err(Error::Configuration(format!("invalid toggle bit {other:?} in {s:?}"))),
            };
        }
        Ok(IndexConfiguration::new(flags[0], flags[1], flags[2]))
    }
}

/// Identifies one built index: a corpus plus a configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct IndexKey {
    pub corpus_id: u16,
    pub config: IndexConfiguration,
}

impl IndexKey {
    pub fn new(corpus_id: u16, config: IndexConfiguration) -> Self {
        Self { corpus_id, config }
    }

    /// Every configuration for each of the given corpora.
    pub fn space(corpus_ids: &[u16]) -> Vec<IndexKey> {
        corpus_ids
            .iter()
            .flat_map(|&c| IndexConfiguration::all().into_iter().map(move |cfg| IndexKey::new(c, cfg)))
            .collect()
    }

    pub fn file_name(&self) -> String {
        format!("{self}.idx")
    }
}

impl fmt::Display for IndexKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.corpus_id, self.config)
    }
}

impl FromStr for IndexKey {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let (corpus, bits) = s
            .split_once('_')
            .ok_or_else(|| Error::Configuration(format!("expected <corpus>_<bits>, got {s:?}")))?;
        let corpus_id = corpus
            .parse::<u16>()
            .map_err(|e| Error::Configuration(format!("invalid corpus id {corpus:?}: {e}")))?;
        Ok(IndexKey::new(corpus_id, bits.parse()?))
    }
}

/// Inverse document frequency variant used for TF-IDF weights.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum IdfWeighting {
    /// `log10(N / df + 1)`, always positive.
    #[default]
    Smoothed,
    /// `log10(N / (df + 1))`; zero or negative for terms in most documents.
    ShiftedDenominator,
}

impl IdfWeighting {
    pub fn idf(&self, num_docs: usize, df: u32) -> f32 {
        let n = num_docs as f64;
        let df = df as f64;
        let v = match self {
            IdfWeighting::Smoothed => {
                if df == 0.0 {
                    return 0.0;
                }
                (n / df + 1.0).log10()
            }
            IdfWeighting::ShiftedDenominator => (n / (df + 1.0)).log10(),
        };
        v as f32
    }
}

/// How raw term frequency is counted per document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TermCounting {
    /// Occurrences of the term as a substring of the document's normalized text.
    #[default]
    Substring,
    /// Occurrences of the term as a whole token.
    Token,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BuildOptions {
    pub idf: IdfWeighting,
    pub term_counting: TermCounting,
}

/// Rocchio coefficients.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rocchio {
    pub alpha: f32,
    pub beta: f32,
    pub gamma: f32,
}

impl Default for Rocchio {
    fn default() -> Self {
        Self { alpha: 1.0, beta: 0.75, gamma: 0.15 }
    }
}

/// Query-time knobs shared by both evaluators.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetrievalSettings {
    /// Top-K cut for vector-space results.
    pub result_limit: usize,
    /// Maximum number of unmatched terms replaced per query.
    pub correction_limit: usize,
    pub rocchio: Rocchio,
}

impl Default for RetrievalSettings {
    fn default() -> Self {
        Self { result_limit: 10, correction_limit: 3, rocchio: Rocchio::default() }
    }
}
