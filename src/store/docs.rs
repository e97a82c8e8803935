//! Document store collaborator
//!
//! Holds the full original text of each ingested document; retrieval uses it
//! to hydrate document-level results with complete content.

use std::fs::File;
use std::io::{BufRead, BufReader, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use async_trait::async_trait;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

/// A stored document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentRecord {
    pub id: String,
    pub title: String,
    pub text: String,
}

/// Trait for document-text lookup
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Full stored text of a document, or None if unknown
    async fn full_text(&self, document_id: &str) -> anyhow::Result<Option<String>>;
}

/// Document store using a JSONL file with a JSON offset index
///
/// Append-mostly: `add` appends one line and rewrites the offset index;
/// `remove` rewrites the whole file. Fine at the document counts this tool
/// handles.
pub struct JsonlDocumentStore {
    jsonl_path: PathBuf,
    idx_path: PathBuf,
    /// document_id -> byte offset in the JSONL file
    offsets: RwLock<FxHashMap<String, u64>>,
}

impl JsonlDocumentStore {
    /// Open a store in the given directory, creating it if missing
    pub fn open(dir: &Path) -> anyhow::Result<Self> {
        std::fs::create_dir_all(dir)?;
        let jsonl_path = dir.join("documents.jsonl");
        let idx_path = dir.join("documents.idx.json");

        let offsets = if idx_path.exists() {
            let idx_content = std::fs::read_to_string(&idx_path)?;
            serde_json::from_str(&idx_content)?
        } else {
            FxHashMap::default()
        };

        Ok(Self {
            jsonl_path,
            idx_path,
            offsets: RwLock::new(offsets),
        })
    }

    /// Add or replace a document
    pub fn add(&self, record: &DocumentRecord) -> anyhow::Result<()> {
        let mut offsets = self.offsets.write().expect("lock poisoned");

        if offsets.contains_key(&record.id) {
            // Replacing requires a rewrite; drop the old line first.
            let mut records = self.read_all(&offsets)?;
            records.retain(|r| r.id != record.id);
            records.push(record.clone());
            *offsets = Self::rewrite(&self.jsonl_path, &records)?;
        } else {
            let mut file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(&self.jsonl_path)?;
            let offset = file.metadata()?.len();

            let json = serde_json::to_string(record)?;
            file.write_all(json.as_bytes())?;
            file.write_all(b"\n")?;

            offsets.insert(record.id.clone(), offset);
        }

        self.save_index(&offsets)
    }

    /// Get a document by id
    pub fn get(&self, id: &str) -> anyhow::Result<Option<DocumentRecord>> {
        let offsets = self.offsets.read().expect("lock poisoned");
        let Some(&offset) = offsets.get(id) else {
            return Ok(None);
        };

        let mut file = File::open(&self.jsonl_path)?;
        file.seek(SeekFrom::Start(offset))?;

        let mut reader = BufReader::new(file);
        let mut line = String::new();
        reader.read_line(&mut line)?;

        Ok(Some(serde_json::from_str(&line)?))
    }

    /// List (id, title) pairs of all stored documents
    pub fn list(&self) -> anyhow::Result<Vec<(String, String)>> {
        let offsets = self.offsets.read().expect("lock poisoned");
        let mut entries: Vec<(String, String)> = self
            .read_all(&offsets)?
            .into_iter()
            .map(|r| (r.id, r.title))
            .collect();
        entries.sort();
        Ok(entries)
    }

    /// Remove a document; unknown ids are a no-op
    pub fn remove(&self, id: &str) -> anyhow::Result<bool> {
        let mut offsets = self.offsets.write().expect("lock poisoned");
        if !offsets.contains_key(id) {
            return Ok(false);
        }

        let mut records = self.read_all(&offsets)?;
        records.retain(|r| r.id != id);
        *offsets = Self::rewrite(&self.jsonl_path, &records)?;
        self.save_index(&offsets)?;
        Ok(true)
    }

    fn read_all(&self, offsets: &FxHashMap<String, u64>) -> anyhow::Result<Vec<DocumentRecord>> {
        if offsets.is_empty() || !self.jsonl_path.exists() {
            return Ok(Vec::new());
        }

        let file = File::open(&self.jsonl_path)?;
        let reader = BufReader::new(file);
        let mut records = Vec::with_capacity(offsets.len());

        for line in reader.lines() {
            let line = line?;
            if line.is_empty() {
                continue;
            }
            let record: DocumentRecord = serde_json::from_str(&line)?;
            // The file may hold stale lines from replaced documents; the
            // index decides what is live.
            if offsets.contains_key(&record.id) {
                records.push(record);
            }
        }

        Ok(records)
    }

    fn rewrite(
        jsonl_path: &Path,
        records: &[DocumentRecord],
    ) -> anyhow::Result<FxHashMap<String, u64>> {
        let mut content = String::new();
        let mut offsets = FxHashMap::default();

        for record in records {
            offsets.insert(record.id.clone(), content.len() as u64);
            content.push_str(&serde_json::to_string(record)?);
            content.push('\n');
        }

        std::fs::write(jsonl_path, content)?;
        Ok(offsets)
    }

    fn save_index(&self, offsets: &FxHashMap<String, u64>) -> anyhow::Result<()> {
        let idx_content = serde_json::to_string(offsets)?;
        std::fs::write(&self.idx_path, idx_content)?;
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for JsonlDocumentStore {
    async fn full_text(&self, document_id: &str) -> anyhow::Result<Option<String>> {
        Ok(self.get(document_id)?.map(|r| r.text))
    }
}

/// In-memory document store for tests and memory-mode runs
#[derive(Default)]
pub struct MemoryDocumentStore {
    docs: RwLock<FxHashMap<String, DocumentRecord>>,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, record: DocumentRecord) {
        let mut docs = self.docs.write().expect("lock poisoned");
        docs.insert(record.id.clone(), record);
    }

    pub fn remove(&self, id: &str) -> bool {
        let mut docs = self.docs.write().expect("lock poisoned");
        docs.remove(id).is_some()
    }

    pub fn list(&self) -> Vec<(String, String)> {
        let docs = self.docs.read().expect("lock poisoned");
        let mut entries: Vec<(String, String)> = docs
            .values()
            .map(|r| (r.id.clone(), r.title.clone()))
            .collect();
        entries.sort();
        entries
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn full_text(&self, document_id: &str) -> anyhow::Result<Option<String>> {
        let docs = self.docs.read().expect("lock poisoned");
        Ok(docs.get(document_id).map(|r| r.text.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: &str, title: &str, text: &str) -> DocumentRecord {
        DocumentRecord {
            id: id.to_string(),
            title: title.to_string(),
            text: text.to_string(),
        }
    }

    #[test]
    fn test_jsonl_store_round_trip() {
        let dir = std::env::temp_dir().join(format!("gleaner-docs-{}", uuid::Uuid::new_v4()));
        let store = JsonlDocumentStore::open(&dir).unwrap();

        store.add(&record("d1", "First", "full text one")).unwrap();
        store.add(&record("d2", "Second", "full text two")).unwrap();

        let got = store.get("d1").unwrap().unwrap();
        assert_eq!(got.title, "First");
        assert_eq!(got.text, "full text one");

        // Reopen from disk
        let reopened = JsonlDocumentStore::open(&dir).unwrap();
        assert_eq!(reopened.get("d2").unwrap().unwrap().text, "full text two");
        assert_eq!(reopened.list().unwrap().len(), 2);

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_jsonl_store_replace_and_remove() {
        let dir = std::env::temp_dir().join(format!("gleaner-docs-{}", uuid::Uuid::new_v4()));
        let store = JsonlDocumentStore::open(&dir).unwrap();

        store.add(&record("d1", "Title", "old text")).unwrap();
        store.add(&record("d1", "Title", "new text")).unwrap();
        assert_eq!(store.get("d1").unwrap().unwrap().text, "new text");
        assert_eq!(store.list().unwrap().len(), 1);

        assert!(store.remove("d1").unwrap());
        assert!(!store.remove("d1").unwrap());
        assert!(store.get("d1").unwrap().is_none());

        std::fs::remove_dir_all(&dir).ok();
    }

    #[tokio::test]
    async fn test_memory_store_full_text() {
        let store = MemoryDocumentStore::new();
        store.add(record("d1", "Doc", "the text"));
        assert_eq!(
            store.full_text("d1").await.unwrap(),
            Some("the text".to_string())
        );
        assert_eq!(store.full_text("missing").await.unwrap(), None);
    }
}
