//! Paginated fetcher tests: cursor walk-forward cost, page jumps and the
//! degraded free-text scan.
mod common;
use common::{doc, moon_store};
use erabu::fetch::{DocumentFetcher, SearchFetcher, TotalCount, is_permission_denied};
use erabu::prelude::{MemorySearchIndex, MemoryStore, Value};
use std::sync::Arc;

fn ids(page: &[(String, erabu::document::Document)]) -> Vec<&str> {
    page.iter().map(|(id, _)| id.as_str()).collect()
}

#[tokio::test]
async fn test_cold_page_jump_walks_forward_once_per_intermediate_page() {
    let store = moon_store(0, 120);
    let mut fetcher = DocumentFetcher::new(store.clone(), "tracks", None, Vec::new(), 10);

    let page = fetcher.fetch(5).await.expect("page 5");
    assert_eq!(page.total, TotalCount::Exact(120));
    assert_eq!(ids(&page.docs)[0], "T040");
    assert_eq!(page.docs.len(), 10);
    // Four intermediate fetches to establish cursors, one for the target.
    assert_eq!(store.query_calls(), 5);
}

#[tokio::test]
async fn test_cached_cursor_makes_any_visited_page_one_query() {
    let store = moon_store(0, 120);
    let mut fetcher = DocumentFetcher::new(store.clone(), "tracks", None, Vec::new(), 10);

    fetcher.fetch(5).await.expect("page 5");
    let before = store.query_calls();

    // The cursor after page 5 is cached, so page 6 is a single query.
    let page = fetcher.fetch(6).await.expect("page 6");
    assert_eq!(ids(&page.docs)[0], "T050");
    assert_eq!(store.query_calls(), before + 1);

    // So is any page the walk already passed through.
    let page = fetcher.fetch(4).await.expect("page 4");
    assert_eq!(ids(&page.docs)[0], "T030");
    assert_eq!(store.query_calls(), before + 2);

    let page = fetcher.fetch(1).await.expect("page 1");
    assert_eq!(ids(&page.docs)[0], "T000");
    assert_eq!(store.query_calls(), before + 3);
}

#[tokio::test]
async fn test_jump_past_the_end_returns_an_empty_page() {
    let store = moon_store(0, 120);
    let mut fetcher = DocumentFetcher::new(store.clone(), "tracks", None, Vec::new(), 10);

    let page = fetcher.fetch(13).await.expect("page 13");
    assert!(page.docs.is_empty());
    assert_eq!(page.total, TotalCount::Exact(120));
}

#[tokio::test]
async fn test_count_is_cached_per_identity() {
    let store = moon_store(0, 40);
    let mut fetcher = DocumentFetcher::new(store.clone(), "tracks", None, Vec::new(), 10);
    fetcher.fetch(1).await.expect("page 1");
    fetcher.fetch(2).await.expect("page 2");
    // Two page queries, count resolved once and reused.
    assert_eq!(store.query_calls(), 2);
}

#[tokio::test]
async fn test_text_scan_pages_through_accumulated_matches() {
    // 120 documents, 110 of which match "moon"; page size 50.
    let store = moon_store(110, 120);
    let mut fetcher = DocumentFetcher::new(store.clone(), "tracks", None, Vec::new(), 50)
        .with_search("moon", "(title)", "");

    // Page 2 is the matches ranked 51..=100 among case-insensitive
    // substring matches, and the total is what the scanned prefix showed.
    let page = fetcher.fetch(2).await.expect("page 2");
    assert_eq!(page.docs.len(), 50);
    assert_eq!(ids(&page.docs)[0], "T050");
    assert_eq!(ids(&page.docs)[49], "T099");
    assert_eq!(page.total, TotalCount::Approximate(100));

    // Requesting further pages scans deeper and refines the total.
    let page = fetcher.fetch(3).await.expect("page 3");
    assert_eq!(page.docs.len(), 10);
    assert_eq!(page.total, TotalCount::Approximate(110));
    assert!(page.total.is_approximate());
}

#[tokio::test]
async fn test_text_scan_is_case_insensitive() {
    let store = moon_store(3, 10);
    let mut fetcher = DocumentFetcher::new(store.clone(), "tracks", None, Vec::new(), 5)
        .with_search("MOON", "(title)", "");
    let page = fetcher.fetch(1).await.expect("page 1");
    assert_eq!(page.docs.len(), 3);
}

#[tokio::test]
async fn test_identity_distinguishes_search_terms() {
    let store = moon_store(5, 10);
    let plain = DocumentFetcher::new(store.clone(), "tracks", None, Vec::new(), 5);
    let searched = DocumentFetcher::new(store.clone(), "tracks", None, Vec::new(), 5)
        .with_search("Moon", "(title)", "");
    assert_ne!(plain.identity(), searched.identity());

    // Normalization: case and surrounding whitespace do not split identities.
    let searched_again = DocumentFetcher::new(store, "tracks", None, Vec::new(), 5)
        .with_search("  moon ", "(title)", "");
    assert_eq!(searched.identity(), searched_again.identity());
}

#[tokio::test]
async fn test_permission_failure_surfaces_as_typed_error() {
    let store = Arc::new(MemoryStore::new());
    store.insert("tracks", "T1", doc(&[("title", Value::from("Blue Moon"))]));
    store.deny("tracks");

    let mut fetcher = DocumentFetcher::new(store, "tracks", None, Vec::new(), 10);
    let err = fetcher.fetch(1).await.expect_err("denied path must fail");
    assert!(is_permission_denied(&err));
    assert!(err.to_string().contains("tracks"));
}

#[tokio::test]
async fn test_search_fetcher_uses_offset_paging() {
    let index = Arc::new(MemorySearchIndex::new());
    for i in 0..7 {
        index.insert(
            "tracks",
            &format!("T{}", i),
            doc(&[("title", Value::from(format!("Moon {}", i).as_str()))]),
        );
    }
    index.insert("tracks", "T7", doc(&[("title", Value::from("Sunrise"))]));

    let fetcher = SearchFetcher::new(index, "tracks", None, 3, "moon");
    let page = fetcher.fetch(2).await.expect("page 2");
    assert_eq!(page.docs.len(), 3);
    assert_eq!(ids(&page.docs), vec!["T3", "T4", "T5"]);
    assert_eq!(page.total, TotalCount::Exact(7));
}
