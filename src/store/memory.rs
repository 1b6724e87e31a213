//! In-memory reference implementations of the backing services.
//!
//! These back the test-suite and the developer tools, and double as the
//! executable semantics of the store contract: predicate evaluation,
//! stable sorting, and opaque cursors that survive page jumps.

use super::{Cursor, DocumentStore, QueryPage, SearchIndex, SearchPage};
use crate::config::{SortDirection, SortField};
use crate::document::{self, Document, Value};
use crate::error::StoreError;
use crate::filter::Predicate;
use ahash::{AHashMap, AHashSet};
use async_trait::async_trait;
use std::cmp::Ordering;
use std::sync::RwLock;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};

/// An in-memory [`DocumentStore`].
///
/// Collections are addressed by their full path; a document path is its
/// collection path plus `/{id}`. Insertion order is preserved, which is
/// what "ordered step documents" relies on in the catalog layout.
#[derive(Default)]
pub struct MemoryStore {
    collections: RwLock<AHashMap<String, Vec<(String, Document)>>>,
    denied: RwLock<AHashSet<String>>,
    queries: AtomicU64,
    reads: AtomicU64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a document at the end of a collection, creating it on first
    /// use. Re-inserting an id replaces the document in place.
    pub fn insert(&self, path: &str, id: &str, doc: Document) {
        let mut collections = self.collections.write().unwrap();
        let docs = collections.entry(path.to_string()).or_default();
        match docs.iter().position(|(existing, _)| existing == id) {
            Some(i) => docs[i].1 = doc,
            None => docs.push((id.to_string(), doc)),
        }
    }

    /// Bulk-loads collections from a JSON object of the shape
    /// `{ "collection/path": [ { "id": "...", ...fields }, ... ], ... }`.
    pub fn load_json(&self, json: &str) -> Result<(), StoreError> {
        let parsed: AHashMap<String, Vec<Document>> =
            serde_json::from_str(json).map_err(|e| StoreError::Backend(e.to_string()))?;
        for (path, docs) in parsed {
            for doc in docs {
                let id = doc
                    .get("id")
                    .and_then(Value::as_str)
                    .ok_or_else(|| {
                        StoreError::Backend(format!("document in '{}' lacks an 'id' field", path))
                    })?
                    .to_string();
                self.insert(&path, &id, doc);
            }
        }
        Ok(())
    }

    /// Marks a path as permission-denied, for exercising failure paths.
    pub fn deny(&self, path: &str) {
        self.denied.write().unwrap().insert(path.to_string());
    }

    /// Number of `query` calls served so far.
    pub fn query_calls(&self) -> u64 {
        self.queries.load(AtomicOrdering::Relaxed)
    }

    /// Number of `get` calls served so far.
    pub fn read_calls(&self) -> u64 {
        self.reads.load(AtomicOrdering::Relaxed)
    }

    fn check_access(&self, path: &str) -> Result<(), StoreError> {
        if self.denied.read().unwrap().contains(path) {
            return Err(StoreError::PermissionDenied(path.to_string()));
        }
        Ok(())
    }

    /// The filtered, sorted view a query pages over.
    fn view(
        &self,
        path: &str,
        predicate: Option<&Predicate>,
        sort: &[SortField],
    ) -> Result<Vec<(String, Document)>, StoreError> {
        let collections = self.collections.read().unwrap();
        let docs = collections
            .get(path)
            .ok_or_else(|| StoreError::NotFound(path.to_string()))?;
        let mut view: Vec<(String, Document)> = docs
            .iter()
            .filter(|(_, doc)| predicate.is_none_or(|p| p.matches(doc)))
            .cloned()
            .collect();
        if !sort.is_empty() {
            view.sort_by(|(lid, ldoc), (rid, rdoc)| {
                for criterion in sort {
                    let l = document::get_path(ldoc, &criterion.field);
                    let r = document::get_path(rdoc, &criterion.field);
                    let ord = match (l, r) {
                        (Some(l), Some(r)) => l.compare(r).unwrap_or(Ordering::Equal),
                        (Some(_), None) => Ordering::Greater,
                        (None, Some(_)) => Ordering::Less,
                        (None, None) => Ordering::Equal,
                    };
                    let ord = match criterion.direction {
                        SortDirection::Ascending => ord,
                        SortDirection::Descending => ord.reverse(),
                    };
                    if ord != Ordering::Equal {
                        return ord;
                    }
                }
                lid.cmp(rid)
            });
        }
        Ok(view)
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn get(&self, path: &str) -> Result<Vec<(String, Document)>, StoreError> {
        self.reads.fetch_add(1, AtomicOrdering::Relaxed);
        self.check_access(path)?;
        let collections = self.collections.read().unwrap();
        if let Some(docs) = collections.get(path) {
            return Ok(docs.clone());
        }
        if let Some((collection, id)) = path.rsplit_once('/') {
            if let Some(docs) = collections.get(collection) {
                if let Some(found) = docs.iter().find(|(doc_id, _)| doc_id == id) {
                    return Ok(vec![found.clone()]);
                }
            }
        }
        Err(StoreError::NotFound(path.to_string()))
    }

    async fn query(
        &self,
        path: &str,
        predicate: Option<&Predicate>,
        sort: &[SortField],
        limit: usize,
        cursor: Option<&Cursor>,
    ) -> Result<QueryPage, StoreError> {
        self.queries.fetch_add(1, AtomicOrdering::Relaxed);
        self.check_access(path)?;
        let view = self.view(path, predicate, sort)?;

        let start = match cursor {
            None => 0,
            Some(cursor) => {
                let after_id = cursor
                    .as_str()
                    .strip_prefix("after:")
                    .ok_or_else(|| StoreError::BadCursor(cursor.as_str().to_string()))?;
                view.iter()
                    .position(|(id, _)| id == after_id)
                    .map(|pos| pos + 1)
                    .ok_or_else(|| StoreError::BadCursor(cursor.as_str().to_string()))?
            }
        };

        let end = (start + limit).min(view.len());
        let docs: Vec<(String, Document)> = view[start..end].to_vec();
        let next_cursor = if end < view.len() {
            docs.last().map(|(id, _)| Cursor::new(format!("after:{}", id)))
        } else {
            None
        };
        Ok(QueryPage { docs, next_cursor })
    }

    async fn count(
        &self,
        path: &str,
        predicate: Option<&Predicate>,
    ) -> Result<usize, StoreError> {
        self.check_access(path)?;
        Ok(self.view(path, predicate, &[])?.len())
    }
}

/// An in-memory [`SearchIndex`] with offset paging, matching a query as a
/// case-insensitive substring over every string field of a document.
#[derive(Default)]
pub struct MemorySearchIndex {
    indexes: RwLock<AHashMap<String, Vec<(String, Document)>>>,
}

impl MemorySearchIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, index: &str, id: &str, doc: Document) {
        let mut indexes = self.indexes.write().unwrap();
        indexes
            .entry(index.to_string())
            .or_default()
            .push((id.to_string(), doc));
    }
}

fn text_matches(doc: &Document, needle: &str) -> bool {
    fn any_str(value: &Value, needle: &str) -> bool {
        match value {
            Value::Str(s) => s.to_lowercase().contains(needle),
            Value::List(items) => items.iter().any(|v| any_str(v, needle)),
            Value::Map(inner) => inner.values().any(|v| any_str(v, needle)),
            _ => false,
        }
    }
    doc.values().any(|v| any_str(v, needle))
}

#[async_trait]
impl SearchIndex for MemorySearchIndex {
    async fn search(
        &self,
        index: &str,
        text: &str,
        offset: usize,
        length: usize,
        filters: Option<&Predicate>,
    ) -> Result<SearchPage, StoreError> {
        let indexes = self.indexes.read().unwrap();
        let docs = indexes
            .get(index)
            .ok_or_else(|| StoreError::NotFound(index.to_string()))?;
        let needle = text.trim().to_lowercase();
        let matched: Vec<(String, Document)> = docs
            .iter()
            .filter(|(_, doc)| filters.is_none_or(|p| p.matches(doc)))
            .filter(|(_, doc)| needle.is_empty() || text_matches(doc, &needle))
            .cloned()
            .collect();
        let total_hits = matched.len();
        let hits = matched
            .into_iter()
            .skip(offset)
            .take(length)
            .collect();
        Ok(SearchPage { hits, total_hits })
    }
}
