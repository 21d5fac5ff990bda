//! Builds the whole configuration space on a fixed-size worker pool.

use crate::config::{BuildOptions, IndexKey};
use crate::corpus::Corpus;
use crate::error::{Error, Result};
use crate::index::Index;
use crate::persist::{save_index, IndexPaths};
use crate::tokenizer::TextNormalizer;
use rayon::prelude::*;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::PathBuf;

/// Outcome of one (corpus, configuration) task.
#[derive(Debug)]
pub struct TaskStatus<T> {
    pub key: IndexKey,
    pub outcome: Result<T>,
}

impl<T> TaskStatus<T> {
    pub fn is_ok(&self) -> bool { self.outcome.is_ok() }
}

/// Run `task` once per key on a pool of `workers` threads and wait for all
/// of them. A failing or panicking task is reported in its own status and
/// never affects its siblings. Statuses come back in key order.
pub fn run_pool<T, F>(keys: &[IndexKey], workers: usize, task: F) -> Result<Vec<TaskStatus<T>>>
where
    T: Send,
    F: Fn(IndexKey) -> Result<T> + Sync,
{
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(workers.max(1))
        .thread_name(|i| format!("index-builder-{i}"))
        .build()
        .map_err(|e| Error::Configuration(format!("cannot start worker pool: {e}")))?;

    let statuses = pool.install(|| {
        keys.par_iter()
            .map(|&key| {
                let outcome = catch_unwind(AssertUnwindSafe(|| task(key)))
                    .unwrap_or_else(|_| Err(Error::BuildTask(format!("{key} panicked"))));
                if let Err(e) = &outcome {
                    tracing::warn!(index = %key, error = %e, "build task failed");
                }
                TaskStatus { key, outcome }
            })
            .collect::<Vec<_>>()
    });
    Ok(statuses)
}

fn corpus_for(corpora: &[Corpus], key: IndexKey) -> Result<&Corpus> {
    corpora
        .get(key.corpus_id as usize)
        .ok_or_else(|| Error::Configuration(format!("no corpus with id {}", key.corpus_id)))
}

/// Every configuration of every corpus; corpus ids are positions in `corpora`.
pub fn build_all(
    corpora: &[Corpus],
    normalizer: &TextNormalizer,
    options: BuildOptions,
    workers: usize,
) -> Result<Vec<TaskStatus<Index>>> {
    let ids: Vec<u16> = (0..corpora.len() as u16).collect();
    let keys = IndexKey::space(&ids);
    run_pool(&keys, workers, |key| Index::build(corpus_for(corpora, key)?, key, normalizer, options))
}

/// Like [`build_all`] but each index is written as soon as it is built
/// instead of being kept in memory.
pub fn build_and_save(
    paths: &IndexPaths,
    corpora: &[Corpus],
    normalizer: &TextNormalizer,
    options: BuildOptions,
    workers: usize,
) -> Result<Vec<TaskStatus<PathBuf>>> {
    let ids: Vec<u16> = (0..corpora.len() as u16).collect();
    let keys = IndexKey::space(&ids);
    run_pool(&keys, workers, |key| {
        let index = Index::build(corpus_for(corpora, key)?, key, normalizer, options)?;
        save_index(paths, &index)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corpus::Document;

    #[test]
    fn builds_every_configuration() {
        let corpora = vec![
            Corpus::new(vec![Document::new("a", "", "the running dogs")]),
            Corpus::new(vec![Document::new("b", "", "low-cost U.S.A flights")]),
        ];
        let statuses = build_all(&corpora, &TextNormalizer::new(), BuildOptions::default(), 3).unwrap();
        assert_eq!(statuses.len(), 16);
        assert!(statuses.iter().all(TaskStatus::is_ok));
        let first = statuses[0].outcome.as_ref().unwrap();
        assert_eq!(first.key().to_string(), "0_111");
    }

    #[test]
    fn failures_are_isolated() {
        let keys = IndexKey::space(&[0]);
        let statuses = run_pool(&keys, 2, |key| {
            if key.config.stemming {
                panic!("boom");
            }
            Ok(key.to_string())
        })
        .unwrap();
        assert_eq!(statuses.iter().filter(|s| s.is_ok()).count(), 4);
        assert_eq!(statuses.iter().filter(|s| !s.is_ok()).count(), 4);
        assert!(statuses
            .iter()
            .filter(|s| s.key.config.stemming)
            .all(|s| matches!(&s.outcome, Err(Error::BuildTask(msg)) if msg.contains(&s.key.to_string()))));
    }
}
