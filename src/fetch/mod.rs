//! Cursor-stable paging against the backing stores.
//!
//! A fetcher is built for one *query identity*: the resolved path plus
//! compiled filter, sort and normalized search text. While the identity
//! holds, its cursor table makes any visited page one query away and makes
//! page jumps a bounded walk; when the identity changes the whole fetcher
//! is discarded, which is what invalidates the cursors.

use crate::config::SortField;
use crate::document::Document;
use crate::error::{FetchError, StoreError};
use crate::filter::Predicate;
use crate::store::{Cursor, DocumentStore, SearchIndex};
use crate::template;
use ahash::AHashMap;
use std::sync::Arc;
use tracing::debug;

/// The result-set size reported with a page.
///
/// Text scans cannot know the true match count without reading the whole
/// collection, so their totals are explicitly approximate: the number of
/// matches found in the prefix scanned so far.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TotalCount {
    Exact(usize),
    Approximate(usize),
}

impl TotalCount {
    pub fn value(&self) -> usize {
        match self {
            TotalCount::Exact(n) | TotalCount::Approximate(n) => *n,
        }
    }

    pub fn is_approximate(&self) -> bool {
        matches!(self, TotalCount::Approximate(_))
    }
}

/// One fetched page of documents plus paging information.
#[derive(Debug, Clone)]
pub struct FetchedPage {
    pub docs: Vec<(String, Document)>,
    pub total: TotalCount,
    /// The 1-based page this fetch served.
    pub page: usize,
}

/// Builds the canonical identity string for a query.
pub fn query_identity(
    path: &str,
    predicate: Option<&Predicate>,
    sort: &[SortField],
    search_text: &str,
) -> String {
    let filter_sig = predicate.map(|p| p.signature()).unwrap_or_default();
    let sort_sig = sort
        .iter()
        .map(|s| format!("{}:{}", s.field, s.direction.as_str()))
        .collect::<Vec<_>>()
        .join(",");
    format!(
        "{}|{}|{}|{}",
        path,
        filter_sig,
        sort_sig,
        search_text.trim().to_lowercase()
    )
}

/// State of the degraded free-text scan over a document collection.
struct TextScan {
    needle: String,
    name_template: String,
    description_template: String,
    matched: Vec<(String, Document)>,
    cursor: Option<Cursor>,
    exhausted: bool,
}

/// Pages through one document-store query with stable cursors.
pub struct DocumentFetcher {
    store: Arc<dyn DocumentStore>,
    path: String,
    predicate: Option<Predicate>,
    sort: Vec<SortField>,
    page_size: usize,
    identity: String,
    /// Cursor established *after* page `k`, i.e. the starting point of
    /// page `k + 1`. Page 1 needs no cursor.
    cursors: AHashMap<usize, Cursor>,
    cached_count: Option<usize>,
    scan: Option<TextScan>,
}

impl DocumentFetcher {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        path: impl Into<String>,
        predicate: Option<Predicate>,
        sort: Vec<SortField>,
        page_size: usize,
    ) -> Self {
        let path = path.into();
        let identity = query_identity(&path, predicate.as_ref(), &sort, "");
        Self {
            store,
            path,
            predicate,
            sort,
            page_size: page_size.max(1),
            identity,
            cursors: AHashMap::new(),
            cached_count: None,
            scan: None,
        }
    }

    /// Switches this fetcher into accumulate-and-filter text mode. The
    /// backing store cannot match arbitrary text server-side, so pages are
    /// scanned forward and matched client-side against the rendered name
    /// and description.
    pub fn with_search(
        mut self,
        term: &str,
        name_template: impl Into<String>,
        description_template: impl Into<String>,
    ) -> Self {
        let needle = term.trim().to_lowercase();
        if needle.is_empty() {
            return self;
        }
        self.identity = query_identity(&self.path, self.predicate.as_ref(), &self.sort, &needle);
        self.scan = Some(TextScan {
            needle,
            name_template: name_template.into(),
            description_template: description_template.into(),
            matched: Vec::new(),
            cursor: None,
            exhausted: false,
        });
        self
    }

    /// The identity string keying this fetcher's cursor table.
    pub fn identity(&self) -> &str {
        &self.identity
    }

    /// Fetches one 1-based page.
    pub async fn fetch(&mut self, page: usize) -> Result<FetchedPage, FetchError> {
        let page = page.max(1);
        if self.scan.is_some() {
            self.fetch_scanned(page).await
        } else {
            self.fetch_direct(page).await
        }
    }

    /// Direct cursor paging: at most one walk-forward query per missing
    /// intermediate page, then a single query for the target.
    async fn fetch_direct(&mut self, page: usize) -> Result<FetchedPage, FetchError> {
        let total = self.total_count().await?;

        if page > 1 && !self.cursors.contains_key(&(page - 1)) {
            // Walk forward from the nearest page whose end-cursor is known.
            let walk_from = (1..page)
                .rev()
                .find(|k| self.cursors.contains_key(k))
                .map(|k| k + 1)
                .unwrap_or(1);
            debug!(
                identity = %self.identity,
                target = page,
                walk_from,
                "cursor walk-forward"
            );
            for p in walk_from..page {
                let query_page = self.query_one(p).await?;
                match query_page.next_cursor {
                    Some(cursor) => {
                        self.cursors.insert(p, cursor);
                    }
                    // Collection ends before the target page.
                    None => {
                        return Ok(FetchedPage {
                            docs: Vec::new(),
                            total: TotalCount::Exact(total),
                            page,
                        });
                    }
                }
            }
        }

        let query_page = self.query_one(page).await?;
        if let Some(cursor) = query_page.next_cursor {
            self.cursors.insert(page, cursor);
        }
        Ok(FetchedPage {
            docs: query_page.docs,
            total: TotalCount::Exact(total),
            page,
        })
    }

    /// Issues the query for one page, using the recorded end-cursor of the
    /// preceding page.
    async fn query_one(&self, page: usize) -> Result<crate::store::QueryPage, FetchError> {
        let cursor = if page > 1 {
            self.cursors.get(&(page - 1))
        } else {
            None
        };
        self.store
            .query(
                &self.path,
                self.predicate.as_ref(),
                &self.sort,
                self.page_size,
                cursor,
            )
            .await
            .map_err(|source| FetchError::Query {
                path: self.path.clone(),
                source,
            })
    }

    async fn total_count(&mut self) -> Result<usize, FetchError> {
        if let Some(count) = self.cached_count {
            return Ok(count);
        }
        let count = self
            .store
            .count(&self.path, self.predicate.as_ref())
            .await
            .map_err(|source| FetchError::Count {
                path: self.path.clone(),
                source,
            })?;
        self.cached_count = Some(count);
        Ok(count)
    }

    /// Accumulate-and-filter scan: pull pages forward, keep client-side
    /// matches, stop once the requested window is filled or the store is
    /// exhausted. The total is the match count in the scanned prefix.
    async fn fetch_scanned(&mut self, page: usize) -> Result<FetchedPage, FetchError> {
        let Some(mut scan) = self.scan.take() else {
            return self.fetch_direct(page).await;
        };
        let needed = page * self.page_size;

        while scan.matched.len() < needed && !scan.exhausted {
            let queried = self
                .store
                .query(
                    &self.path,
                    self.predicate.as_ref(),
                    &self.sort,
                    self.page_size,
                    scan.cursor.as_ref(),
                )
                .await;
            let query_page = match queried {
                Ok(query_page) => query_page,
                Err(source) => {
                    // Keep the scan position so a retry resumes, not restarts.
                    self.scan = Some(scan);
                    return Err(FetchError::Query {
                        path: self.path.clone(),
                        source,
                    });
                }
            };

            for (id, doc) in query_page.docs {
                let name = template::render(&scan.name_template, &doc);
                let description = template::render(&scan.description_template, &doc);
                if name.to_lowercase().contains(&scan.needle)
                    || description.to_lowercase().contains(&scan.needle)
                {
                    scan.matched.push((id, doc));
                }
            }
            match query_page.next_cursor {
                Some(cursor) => scan.cursor = Some(cursor),
                None => scan.exhausted = true,
            }
        }

        let start = (page - 1) * self.page_size;
        let end = needed.min(scan.matched.len());
        let docs = if start < scan.matched.len() {
            scan.matched[start..end].to_vec()
        } else {
            Vec::new()
        };
        let total = TotalCount::Approximate(scan.matched.len());
        self.scan = Some(scan);
        Ok(FetchedPage { docs, total, page })
    }
}

/// Pages through the search-index service, which is offset-based only.
pub struct SearchFetcher {
    index_service: Arc<dyn SearchIndex>,
    index: String,
    filters: Option<Predicate>,
    page_size: usize,
    text: String,
    identity: String,
}

impl SearchFetcher {
    pub fn new(
        index_service: Arc<dyn SearchIndex>,
        index: impl Into<String>,
        filters: Option<Predicate>,
        page_size: usize,
        text: &str,
    ) -> Self {
        let index = index.into();
        let identity = query_identity(&index, filters.as_ref(), &[], text);
        Self {
            index_service,
            index,
            filters,
            page_size: page_size.max(1),
            text: text.trim().to_string(),
            identity,
        }
    }

    pub fn identity(&self) -> &str {
        &self.identity
    }

    pub async fn fetch(&self, page: usize) -> Result<FetchedPage, FetchError> {
        let page = page.max(1);
        let offset = (page - 1) * self.page_size;
        let result = self
            .index_service
            .search(
                &self.index,
                &self.text,
                offset,
                self.page_size,
                self.filters.as_ref(),
            )
            .await
            .map_err(|source| FetchError::Search {
                index: self.index.clone(),
                source,
            })?;
        Ok(FetchedPage {
            docs: result.hits,
            total: TotalCount::Exact(result.total_hits),
            page,
        })
    }
}

/// Classifies a store failure for display.
pub fn is_permission_denied(err: &FetchError) -> bool {
    matches!(
        err,
        FetchError::Query {
            source: StoreError::PermissionDenied(_),
            ..
        } | FetchError::Count {
            source: StoreError::PermissionDenied(_),
            ..
        } | FetchError::Read {
            source: StoreError::PermissionDenied(_),
            ..
        } | FetchError::Search {
            source: StoreError::PermissionDenied(_),
            ..
        }
    )
}
