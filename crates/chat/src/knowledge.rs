//! Local document retrieval.
//!
//! Documents come from `*.json` files holding arrays of strings. Ranking is
//! plain term overlap between the query and each document.

use std::{
    collections::HashSet,
    path::{Path, PathBuf},
};

use tracing::{debug, info, warn};

use crate::error::{Context, Result};

/// Source of background documents for a prompt.
pub trait DocumentRetriever: Send + Sync {
    /// At most `limit` documents relevant to `query`, best first.
    fn retrieve(&self, query: &str, limit: usize) -> Vec<String>;
}

#[derive(Debug)]
struct Document {
    id: String,
    text: String,
    terms: HashSet<String>,
}

#[derive(Debug, Default)]
pub struct JsonDocuments {
    documents: Vec<Document>,
}

impl JsonDocuments {
    /// Index every `*.json` array in `dir`. Files that are not arrays of
    /// strings are skipped with a warning.
    pub fn load_dir(dir: &Path) -> Result<Self> {
        let mut paths: Vec<PathBuf> = std::fs::read_dir(dir)
            .with_context(|| format!("reading document dir {}", dir.display()))?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| p.extension().is_some_and(|ext| ext == "json"))
            .collect();
        paths.sort();

        let mut index = Self::default();
        for path in paths {
            let stem = path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default();
            let raw = std::fs::read_to_string(&path)?;
            match serde_json::from_str::<Vec<String>>(&raw) {
                Ok(items) => {
                    debug!(path = %path.display(), count = items.len(), "loaded documents");
                    for (i, text) in items.into_iter().enumerate() {
                        index.insert(format!("{stem}-{i}"), text);
                    }
                },
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "skipping document file: not a JSON array of strings");
                },
            }
        }
        info!(dir = %dir.display(), documents = index.len(), "document index ready");
        Ok(index)
    }

    pub fn from_documents(texts: impl IntoIterator<Item = String>) -> Self {
        let mut index = Self::default();
        for (i, text) in texts.into_iter().enumerate() {
            index.insert(i.to_string(), text);
        }
        index
    }

    fn insert(&mut self, id: String, text: String) {
        let terms = terms(&text);
        self.documents.push(Document { id, text, terms });
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}

impl DocumentRetriever for JsonDocuments {
    fn retrieve(&self, query: &str, limit: usize) -> Vec<String> {
        let query_terms = terms(query);
        if query_terms.is_empty() || limit == 0 {
            return Vec::new();
        }

        let mut scored: Vec<(usize, &Document)> = self
            .documents
            .iter()
            .map(|doc| (doc.terms.intersection(&query_terms).count(), doc))
            .filter(|(score, _)| *score > 0)
            .collect();
        // Stable sort keeps file order among ties.
        scored.sort_by(|a, b| b.0.cmp(&a.0));

        let hits: Vec<String> = scored
            .into_iter()
            .take(limit)
            .map(|(_, doc)| doc.text.clone())
            .collect();
        debug!(
            query_terms = query_terms.len(),
            hits = hits.len(),
            "document retrieval"
        );
        hits
    }
}

/// Lowercased alphanumeric words of at least three characters.
fn terms(text: &str) -> HashSet<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| w.chars().count() >= 3)
        .map(str::to_lowercase)
        .collect()
}

impl std::fmt::Display for JsonDocuments {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let ids: Vec<&str> = self.documents.iter().map(|d| d.id.as_str()).collect();
        write!(f, "{} documents [{}]", ids.len(), ids.join(", "))
    }
}
