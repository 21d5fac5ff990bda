use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub doc_id: String,
    pub title: String,
    pub content: String,
}

impl Document {
    pub fn new(doc_id: impl Into<String>, title: impl Into<String>, content: impl Into<String>) -> Self {
        Self { doc_id: doc_id.into(), title: title.into(), content: content.into() }
    }

    /// Text that gets indexed for this document.
    pub fn indexed_text(&self) -> String {
        format!("{} {}", self.title, self.content)
    }
}

#[derive(Debug, Deserialize)]
struct InputDoc {
    id: String,
    #[serde(default)]
    title: String,
    #[serde(alias = "content")]
    body: String,
}

/// An ordered document collection. Document order fixes the row order of
/// every index built from it.
#[derive(Debug, Clone, Default)]
pub struct Corpus {
    docs: Vec<Document>,
    by_id: HashMap<String, usize>,
}

impl Corpus {
    pub fn new(docs: Vec<Document>) -> Self {
        let by_id = docs.iter().enumerate().map(|(i, d)| (d.doc_id.clone(), i)).collect();
        Self { docs, by_id }
    }

    /// Load a corpus from a JSON/JSONL file or from every such file under a directory.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let input_path = path.as_ref();
        let mut files: Vec<PathBuf> = Vec::new();
        if input_path.is_dir() {
            for entry in WalkDir::new(input_path).sort_by_file_name() {
                let entry = entry.map_err(|e| Error::corpus_io(input_path, e))?;
                let p = entry.path();
                if p.is_file() {
                    if let Some(ext) = p.extension().and_then(|s| s.to_str()) {
                        if matches!(ext, "json" | "jsonl") {
                            files.push(p.to_path_buf());
                        }
                    }
                }
            }
        } else if input_path.is_file() {
            files.push(input_path.to_path_buf());
        } else {
            return Err(Error::corpus_io(input_path, "no such file or directory"));
        }

        let mut docs = Vec::new();
        for file in files {
            if file.extension().and_then(|s| s.to_str()) == Some("jsonl") {
                read_jsonl(&file, &mut docs)?;
            } else {
                read_json(&file, &mut docs)?;
            }
        }
        tracing::debug!(path = %input_path.display(), num_docs = docs.len(), "loaded corpus");
        Ok(Corpus::new(docs))
    }

    pub fn documents(&self) -> &[Document] { &self.docs }

    pub fn len(&self) -> usize { self.docs.len() }

    pub fn is_empty(&self) -> bool { self.docs.is_empty() }

    pub fn get(&self, doc_id: &str) -> Option<&Document> {
        self.by_id.get(doc_id).map(|&i| &self.docs[i])
    }

    fn require(&self, doc_id: &str) -> Result<&Document> {
        self.get(doc_id).ok_or_else(|| Error::UnknownDocument(doc_id.to_string()))
    }

    pub fn get_doc_title(&self, doc_id: &str) -> Result<&str> {
        Ok(&self.require(doc_id)?.title)
    }

    pub fn get_doc_content(&self, doc_id: &str) -> Result<&str> {
        Ok(&self.require(doc_id)?.content)
    }

    /// First sentence of the content, period included.
    pub fn get_doc_excerpt(&self, doc_id: &str) -> Result<&str> {
        let content = &self.require(doc_id)?.content;
        Ok(match content.find('.') {
            Some(end) => &content[..=end],
            None => content,
        })
    }
}

fn read_jsonl(file: &Path, docs: &mut Vec<Document>) -> Result<()> {
    let f = File::open(file).map_err(|e| Error::corpus_io(file, e))?;
    let reader = BufReader::new(f);
    for line in reader.lines() {
        let line = line.map_err(|e| Error::corpus_io(file, e))?;
        if line.trim().is_empty() { continue; }
        let doc: InputDoc = serde_json::from_str(&line).map_err(|e| Error::corpus_io(file, e))?;
        docs.push(doc.into());
    }
    Ok(())
}

fn read_json(file: &Path, docs: &mut Vec<Document>) -> Result<()> {
    let f = File::open(file).map_err(|e| Error::corpus_io(file, e))?;
    let reader = BufReader::new(f);
    let json: serde_json::Value = serde_json::from_reader(reader).map_err(|e| Error::corpus_io(file, e))?;
    match json {
        serde_json::Value::Array(arr) => {
            for v in arr {
                let doc: InputDoc = serde_json::from_value(v).map_err(|e| Error::corpus_io(file, e))?;
                docs.push(doc.into());
            }
        }
        serde_json::Value::Object(_) => {
            let doc: InputDoc = serde_json::from_value(json).map_err(|e| Error::corpus_io(file, e))?;
            docs.push(doc.into());
        }
        _ => return Err(Error::corpus_io(file, "expected a JSON object or array")),
    }
    Ok(())
}

impl From<InputDoc> for Document {
    fn from(d: InputDoc) -> Self {
        Document { doc_id: d.id, title: d.title, content: d.body }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn excerpt_is_first_sentence() {
        let corpus = Corpus::new(vec![
            Document::new("1", "Intro", "Basic principles. Indexing methods."),
            Document::new("2", "Other", "No period here"),
        ]);
        assert_eq!(corpus.get_doc_excerpt("1").unwrap(), "Basic principles.");
        assert_eq!(corpus.get_doc_excerpt("2").unwrap(), "No period here");
        assert_eq!(corpus.get_doc_title("1").unwrap(), "Intro");
        assert!(matches!(corpus.get_doc_content("3"), Err(Error::UnknownDocument(_))));
    }

    #[test]
    fn loads_json_and_jsonl() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.json"), r#"[{"id":"d1","title":"T1","body":"one"}]"#).unwrap();
        fs::write(
            dir.path().join("b.jsonl"),
            "{\"id\":\"d2\",\"title\":\"T2\",\"body\":\"two\",\"url\":null}\n\n{\"id\":\"d3\",\"body\":\"three\"}\n",
        )
        .unwrap();
        fs::write(dir.path().join("ignored.txt"), "not a corpus").unwrap();

        let corpus = Corpus::from_path(dir.path()).unwrap();
        let ids: Vec<&str> = corpus.documents().iter().map(|d| d.doc_id.as_str()).collect();
        assert_eq!(ids, vec!["d1", "d2", "d3"]);
        assert_eq!(corpus.get_doc_title("d3").unwrap(), "");
    }

    #[test]
    fn unreadable_corpus_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let bad = dir.path().join("bad.jsonl");
        fs::write(&bad, "{not json}\n").unwrap();
        assert!(matches!(Corpus::from_path(&bad), Err(Error::CorpusIo { .. })));
        assert!(matches!(Corpus::from_path(dir.path().join("missing.json")), Err(Error::CorpusIo { .. })));
    }
}
