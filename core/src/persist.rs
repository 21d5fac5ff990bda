use crate::bigram::BigramIndex;
use crate::completion::QueryCompletion;
use crate::config::{BuildOptions, IndexKey};
use crate::error::{Error, Result};
use crate::index::Index;
use crate::{Posting, TermId};
use serde::{Deserialize, Serialize};
use std::fs::{self, create_dir_all, File};
use std::io::{BufReader, BufWriter, ErrorKind, Read, Write};
use std::path::{Path, PathBuf};

pub const SCHEMA_VERSION: u32 = 1;
const MAGIC: [u8; 4] = *b"QIDX";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorpusEntry {
    pub corpus_id: u16,
    pub source: String,
    pub num_docs: u32,
}

/// Human-readable manifest written next to the index units.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetaFile {
    pub num_indexes: u32,
    pub created_at: String,
    pub version: u32,
    #[serde(default)]
    pub corpora: Vec<CorpusEntry>,
}

pub struct IndexPaths {
    pub root: PathBuf,
}

impl IndexPaths {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self { root: root.as_ref().to_path_buf() }
    }
    pub fn index_file(&self, key: &IndexKey) -> PathBuf { self.root.join(key.file_name()) }
    pub fn completion_file(&self, corpus_id: u16) -> PathBuf { self.root.join(format!("{corpus_id}.qc")) }
    fn meta(&self) -> PathBuf { self.root.join("meta.json") }
}

#[derive(Serialize, Deserialize)]
struct Header {
    magic: [u8; 4],
    version: u32,
}

/// On-disk layout of one index unit, schema version 1.
#[derive(Serialize, Deserialize)]
struct IndexFile {
    key: IndexKey,
    options: BuildOptions,
    doc_ids: Vec<String>,
    terms: Vec<String>,
    df: Vec<u32>,
    postings: Vec<Vec<Posting>>,
    tf_over_corpus: Vec<u64>,
    weights: Vec<Vec<(TermId, f32)>>,
    bigram_index: BigramIndex,
}

/// Write through a temporary sibling of `target` and rename it into place, so readers never
/// observe a half-written file.
fn write_atomically(target: &Path, write: impl FnOnce(&mut BufWriter<File>) -> Result<()>) -> Result<()> {
    if let Some(dir) = target.parent() {
        create_dir_all(dir)?;
    }
    let tmp = target.with_extension("tmp");
    {
        let mut w = BufWriter::new(File::create(&tmp)?);
        write(&mut w)?;
        w.flush()?;
    }
    fs::rename(&tmp, target)?;
    Ok(())
}

fn open_for_load(path: &Path, key: Option<&IndexKey>) -> Result<BufReader<File>> {
    match File::open(path) {
        Ok(f) => Ok(BufReader::new(f)),
        Err(e) if e.kind() == ErrorKind::NotFound => Err(Error::Configuration(match key {
            Some(k) => format!("index {k} has not been built ({})", path.display()),
            None => format!("{} does not exist", path.display()),
        })),
        Err(e) => Err(Error::Serialization(format!("{}: {e}", path.display()))),
    }
}

pub fn save_index(paths: &IndexPaths, index: &Index) -> Result<PathBuf> {
    let target = paths.index_file(&index.key);
    let file = IndexFile {
        key: index.key,
        options: index.options,
        doc_ids: index.doc_ids.clone(),
        terms: index.terms.clone(),
        df: index.df.clone(),
        postings: index.postings.clone(),
        tf_over_corpus: index.tf_over_corpus.clone(),
        weights: index.weights.clone(),
        bigram_index: index.bigram_index.clone(),
    };
    write_atomically(&target, |w| {
        bincode::serialize_into(&mut *w, &Header { magic: MAGIC, version: SCHEMA_VERSION })?;
        bincode::serialize_into(&mut *w, &file)?;
        Ok(())
    })?;
    tracing::debug!(path = %target.display(), "index saved");
    Ok(target)
}

pub fn load_index(paths: &IndexPaths, key: &IndexKey) -> Result<Index> {
    let path = paths.index_file(key);
    let index = read_index(open_for_load(&path, Some(key))?)?;
    if index.key != *key {
        return Err(Error::Serialization(format!(
            "{} holds index {} instead of {key}",
            path.display(),
            index.key
        )));
    }
    Ok(index)
}

/// Load an index unit from an explicit path.
pub fn load_index_file<P: AsRef<Path>>(path: P) -> Result<Index> {
    read_index(open_for_load(path.as_ref(), None)?)
}

fn read_index<R: Read>(mut reader: R) -> Result<Index> {
    let header: Header = bincode::deserialize_from(&mut reader)?;
    if header.magic != MAGIC {
        return Err(Error::Serialization("not an index file".into()));
    }
    if header.version != SCHEMA_VERSION {
        return Err(Error::Serialization(format!(
            "schema version {} is not supported (expected {SCHEMA_VERSION})",
            header.version
        )));
    }
    let f: IndexFile = bincode::deserialize_from(&mut reader)?;
    let dictionary = f.terms.iter().enumerate().map(|(i, t)| (t.clone(), i as TermId)).collect();
    let index = Index {
        key: f.key,
        options: f.options,
        doc_ids: f.doc_ids,
        terms: f.terms,
        dictionary,
        df: f.df,
        postings: f.postings,
        tf_over_corpus: f.tf_over_corpus,
        weights: f.weights,
        bigram_index: f.bigram_index,
    };
    index.validate()?;
    Ok(index)
}

/// Keys of every index unit present under `paths.root`, sorted.
pub fn list_indexes(paths: &IndexPaths) -> Result<Vec<IndexKey>> {
    let mut keys = Vec::new();
    if !paths.root.is_dir() {
        return Ok(keys);
    }
    for entry in fs::read_dir(&paths.root)? {
        let path = entry?.path();
        if path.extension().and_then(|s| s.to_str()) != Some("idx") { continue; }
        if let Some(key) = path.file_stem().and_then(|s| s.to_str()).and_then(|s| s.parse::<IndexKey>().ok()) {
            keys.push(key);
        }
    }
    keys.sort();
    Ok(keys)
}

pub fn save_completion(paths: &IndexPaths, corpus_id: u16, qc: &QueryCompletion) -> Result<()> {
    write_atomically(&paths.completion_file(corpus_id), |w| {
        bincode::serialize_into(&mut *w, qc)?;
        Ok(())
    })
}

pub fn load_completion(paths: &IndexPaths, corpus_id: u16) -> Result<QueryCompletion> {
    let reader = open_for_load(&paths.completion_file(corpus_id), None)?;
    Ok(bincode::deserialize_from(reader)?)
}

pub fn save_meta(paths: &IndexPaths, meta: &MetaFile) -> Result<()> {
    create_dir_all(&paths.root)?;
    let mut f = File::create(paths.meta())?;
    let json = serde_json::to_string_pretty(meta)?;
    f.write_all(json.as_bytes())?;
    Ok(())
}

pub fn load_meta(paths: &IndexPaths) -> Result<MetaFile> {
    let mut f = open_for_load(&paths.meta(), None)?;
    let mut buf = String::new();
    f.read_to_string(&mut buf)?;
    let meta: MetaFile = serde_json::from_str(&buf)?;
    Ok(meta)
}
