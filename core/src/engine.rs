use crate::completion::QueryCompletion;
use crate::config::{IndexConfiguration, IndexKey, RetrievalSettings};
use crate::corpus::Corpus;
use crate::error::{Error, Result};
use crate::feedback::{RelevanceFeedback, RelevanceFeedbackSession};
use crate::index::Index;
use crate::persist::{list_indexes, load_completion, load_index, IndexPaths};
use crate::tokenizer::TextNormalizer;
use crate::{boolean, vsm, SearchResult};
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RetrievalModel {
    Boolean,
    #[default]
    Vsm,
}

impl fmt::Display for RetrievalModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RetrievalModel::Boolean => "boolean",
            RetrievalModel::Vsm => "vsm",
        })
    }
}

impl FromStr for RetrievalModel {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "boolean" | "bool" => Ok(RetrievalModel::Boolean),
            "vsm" | "vector" => Ok(RetrievalModel::Vsm),
            other => Err(Error::Configuration(format!("unknown retrieval model {other:?}"))),
        }
    }
}

/// Loaded indexes plus the user's current selection of corpus,
/// configuration and model.
#[derive(Debug)]
pub struct SearchEngine {
    normalizer: TextNormalizer,
    settings: RetrievalSettings,
    indexes: HashMap<IndexKey, Arc<Index>>,
    sessions: HashMap<IndexKey, RelevanceFeedbackSession>,
    corpora: HashMap<u16, Corpus>,
    completions: HashMap<u16, QueryCompletion>,
    current: IndexKey,
    model: RetrievalModel,
}

impl SearchEngine {
    pub fn new(settings: RetrievalSettings) -> Self {
        Self {
            normalizer: TextNormalizer::new(),
            settings,
            indexes: HashMap::new(),
            sessions: HashMap::new(),
            corpora: HashMap::new(),
            completions: HashMap::new(),
            current: IndexKey::new(0, IndexConfiguration::default()),
            model: RetrievalModel::default(),
        }
    }

    /// Load every index unit and completion model found under `paths`.
    pub fn load(paths: &IndexPaths, settings: RetrievalSettings) -> Result<Self> {
        let mut engine = SearchEngine::new(settings);
        let keys = list_indexes(paths)?;
        if keys.is_empty() {
            return Err(Error::Configuration(format!("no index found in {}", paths.root.display())));
        }
        for key in &keys {
            engine.add_index(load_index(paths, key)?);
        }
        let corpus_ids: BTreeSet<u16> = keys.iter().map(|k| k.corpus_id).collect();
        for id in corpus_ids {
            if paths.completion_file(id).exists() {
                engine.completions.insert(id, load_completion(paths, id)?);
            }
        }
        if !engine.indexes.contains_key(&engine.current) {
            engine.current = keys[0];
        }
        tracing::info!(num_indexes = keys.len(), "search engine loaded");
        Ok(engine)
    }

    pub fn add_index(&mut self, index: Index) {
        let key = index.key();
        self.sessions.entry(key).or_default();
        self.indexes.insert(key, Arc::new(index));
    }

    pub fn add_corpus(&mut self, corpus_id: u16, corpus: Corpus) {
        self.corpora.insert(corpus_id, corpus);
    }

    pub fn add_completion(&mut self, corpus_id: u16, qc: QueryCompletion) {
        self.completions.insert(corpus_id, qc);
    }

    pub fn normalizer(&self) -> &TextNormalizer { &self.normalizer }

    pub fn settings(&self) -> &RetrievalSettings { &self.settings }

    pub fn current_key(&self) -> IndexKey { self.current }

    pub fn model(&self) -> RetrievalModel { self.model }

    pub fn index(&self, key: &IndexKey) -> Option<Arc<Index>> { self.indexes.get(key).cloned() }

    pub fn current_index(&self) -> Result<&Index> {
        self.indexes
            .get(&self.current)
            .map(Arc::as_ref)
            .ok_or_else(|| Error::Configuration(format!("index {} is not loaded", self.current)))
    }

    fn current_session(&self) -> Result<&RelevanceFeedbackSession> {
        self.sessions
            .get(&self.current)
            .ok_or_else(|| Error::Configuration(format!("index {} is not loaded", self.current)))
    }

    pub fn switch_stop_words_removal(&mut self) {
        self.current.config.stop_words_removal = !self.current.config.stop_words_removal;
    }

    pub fn switch_stemming(&mut self) {
        self.current.config.stemming = !self.current.config.stemming;
    }

    pub fn switch_normalization(&mut self) {
        self.current.config.normalization = !self.current.config.normalization;
    }

    pub fn set_configuration(&mut self, config: IndexConfiguration) {
        self.current.config = config;
    }

    pub fn select_corpus(&mut self, corpus_id: u16) {
        self.current.corpus_id = corpus_id;
    }

    /// Flip between the two models, or pick one explicitly.
    pub fn switch_model(&mut self, model: Option<RetrievalModel>) {
        self.model = match model {
            Some(m) => m,
            None => match self.model {
                RetrievalModel::Vsm => RetrievalModel::Boolean,
                RetrievalModel::Boolean => RetrievalModel::Vsm,
            },
        };
    }

    pub fn query(&self, raw_query: &str) -> Result<SearchResult> {
        let index = self.current_index()?;
        match self.model {
            RetrievalModel::Vsm => {
                Ok(vsm::query(index, &self.normalizer, raw_query, &self.settings, Some(self.current_session()?)))
            }
            RetrievalModel::Boolean => boolean::query(index, &self.normalizer, raw_query, &self.settings),
        }
    }

    /// Record relevance judgements for `raw_query` against the current index.
    /// Later vector-space queries with the identical string are rewritten.
    pub fn add_feedback(&self, raw_query: &str, relevant: &[&str], irrelevant: &[&str]) -> Result<()> {
        let index = self.current_index()?;
        let (query_vec, _) = vsm::vectorize_query(index, &self.normalizer, raw_query, self.settings.correction_limit);
        let vectors = |ids: &[&str]| -> Result<Vec<Vec<f32>>> {
            ids.iter()
                .map(|id| {
                    index
                        .doc_row(id)
                        .map(|row| index.document_vector(row))
                        .ok_or_else(|| Error::UnknownDocument(id.to_string()))
                })
                .collect()
        };
        let rf = RelevanceFeedback::new(query_vec, vectors(relevant)?, vectors(irrelevant)?, self.settings.rocchio)?;
        self.current_session()?.add_relevance_feedback(raw_query, rf)
    }

    /// Whether all eight configurations are loaded for every corpus seen.
    pub fn check_integrity(&self) -> bool {
        let corpus_ids: BTreeSet<u16> = self.indexes.keys().map(|k| k.corpus_id).collect();
        !corpus_ids.is_empty()
            && IndexKey::space(&corpus_ids.into_iter().collect::<Vec<_>>())
                .iter()
                .all(|k| self.indexes.contains_key(k))
    }

    fn current_corpus(&self) -> Result<&Corpus> {
        self.corpora
            .get(&self.current.corpus_id)
            .ok_or_else(|| Error::Configuration(format!("corpus {} is not attached", self.current.corpus_id)))
    }

    pub fn get_doc_title(&self, doc_id: &str) -> Result<&str> {
        self.current_corpus()?.get_doc_title(doc_id)
    }

    pub fn get_doc_content(&self, doc_id: &str) -> Result<&str> {
        self.current_corpus()?.get_doc_content(doc_id)
    }

    pub fn get_doc_excerpt(&self, doc_id: &str) -> Result<&str> {
        self.current_corpus()?.get_doc_excerpt(doc_id)
    }

    pub fn completion(&self) -> Option<&QueryCompletion> {
        self.completions.get(&self.current.corpus_id)
    }
}

impl fmt::Display for SearchEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Current model: {}, current index selected: {}", self.model, self.current)
    }
}
