//! The two backing services the engine consumes, as opaque collaborators.
//!
//! No transport is assumed. The only contract the paginator relies on is
//! that cursor tokens are opaque and stable for a fixed predicate and sort.

use crate::config::SortField;
use crate::document::Document;
use crate::error::StoreError;
use crate::filter::Predicate;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

mod memory;

pub use memory::{MemorySearchIndex, MemoryStore};

/// An opaque continuation token for forward paging.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Cursor(String);

impl Cursor {
    pub fn new(token: impl Into<String>) -> Self {
        Cursor(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// One page of query results.
#[derive(Debug, Clone, Default)]
pub struct QueryPage {
    pub docs: Vec<(String, Document)>,
    /// Continuation after the last returned document; `None` when the
    /// collection is exhausted.
    pub next_cursor: Option<Cursor>,
}

/// One page of search-index hits.
#[derive(Debug, Clone, Default)]
pub struct SearchPage {
    pub hits: Vec<(String, Document)>,
    pub total_hits: usize,
}

/// A hierarchical document store with predicate queries and cursor paging.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Reads the documents at `path`: every document of a collection, or
    /// the single document a full document path names.
    async fn get(&self, path: &str) -> Result<Vec<(String, Document)>, StoreError>;

    /// Runs a filtered, sorted, limited query over a collection, starting
    /// after `cursor` when given.
    async fn query(
        &self,
        path: &str,
        predicate: Option<&Predicate>,
        sort: &[SortField],
        limit: usize,
        cursor: Option<&Cursor>,
    ) -> Result<QueryPage, StoreError>;

    /// Counts the documents matching `predicate` without loading them.
    async fn count(&self, path: &str, predicate: Option<&Predicate>)
    -> Result<usize, StoreError>;
}

/// A full-text search service with offset-based paging only.
#[async_trait]
pub trait SearchIndex: Send + Sync {
    async fn search(
        &self,
        index: &str,
        text: &str,
        offset: usize,
        length: usize,
        filters: Option<&Predicate>,
    ) -> Result<SearchPage, StoreError>;
}
