//! Persisted-schema parsing and catalog loading tests.
mod common;
use common::doc;
use erabu::config::{Catalog, NextStepSpec, RawStep, StepKind};
use erabu::document::{Document, Value};
use erabu::error::ConfigError;
use erabu::prelude::MemoryStore;
use std::sync::Arc;

fn step_doc(json: &str) -> Document {
    serde_json::from_str(json).expect("valid step json")
}

#[test]
fn test_full_step_document_round_trip() {
    let doc = step_doc(
        r#"{
        "type": "documentQuery",
        "path": "albums/(artist_id)/tracks",
        "filters": [
            { "field": "genre", "operator": "eq", "value": "rock" },
            { "field": "era", "operator": "in", "values": ["60s", "70s"], "groupId": "era" }
        ],
        "filterGroups": [
            { "name": "Era", "options": [
                { "name": "Sixties", "field": "era", "value": "60s" },
                { "name": "Seventies", "field": "era", "value": "70s" }
            ]}
        ],
        "sortFields": [
            { "field": "title", "direction": "desc" }
        ],
        "name": "(title)",
        "description": "(runtime)s",
        "image": "(cover)",
        "variables": { "track_id": "id" },
        "nextStep": 3,
        "pageSize": 25,
        "multiSelect": true,
        "searchBar": true
    }"#,
    );

    let raw = RawStep::from_document(&doc).expect("parse raw step");
    let config = raw.into_config("step-3").expect("convert step");

    assert_eq!(config.id, "step-3");
    assert_eq!(config.kind, StepKind::DocumentQuery);
    assert_eq!(config.path_template, "albums/(artist_id)/tracks");
    assert_eq!(config.filter_rules.len(), 2);
    assert_eq!(config.filter_rules[1].group_id.as_deref(), Some("era"));
    assert_eq!(config.filter_rules[1].values.len(), 2);
    assert_eq!(config.filter_groups.len(), 1);
    assert_eq!(config.filter_groups[0].options.len(), 2);
    assert_eq!(config.sort_fields[0].field, "title");
    assert_eq!(config.variable_captures.get("track_id").map(String::as_str), Some("id"));
    assert_eq!(config.explicit_next_step, Some(NextStepSpec::Literal(3)));
    assert_eq!(config.page_size, 25);
    assert!(config.is_multi_select);
    assert!(config.has_search_bar);
}

#[test]
fn test_unknown_operator_is_a_config_error() {
    let doc = step_doc(
        r#"{
        "type": "documentQuery",
        "path": "artists",
        "name": "(name)",
        "filters": [ { "field": "genre", "operator": "matches", "value": "rock" } ]
    }"#,
    );
    let err = RawStep::from_document(&doc)
        .expect("parse raw step")
        .into_config("step-1")
        .expect_err("unknown operator must fail");
    match err {
        ConfigError::UnknownOperator { field, operator } => {
            assert_eq!(field, "genre");
            assert_eq!(operator, "matches");
        }
        other => panic!("expected UnknownOperator, got {}", other),
    }
}

#[test]
fn test_unknown_kind_is_rejected_at_load_time() {
    let doc = step_doc(r#"{ "type": "carousel", "path": "artists", "name": "(name)" }"#);
    let err = RawStep::from_document(&doc)
        .expect("parse raw step")
        .into_config("step-1")
        .expect_err("unknown kind must fail");
    assert!(matches!(err, ConfigError::UnknownStepKind { .. }));
}

#[test]
fn test_query_step_requires_path_and_name() {
    let doc = step_doc(r#"{ "type": "documentQuery", "name": "(name)" }"#);
    let err = RawStep::from_document(&doc)
        .expect("parse raw step")
        .into_config("step-1")
        .expect_err("missing path must fail");
    assert!(matches!(err, ConfigError::MissingField { ref field, .. } if field == "path"));
}

#[test]
fn test_choice_menu_requires_choices() {
    let doc = step_doc(r#"{ "type": "choiceMenu" }"#);
    let err = RawStep::from_document(&doc)
        .expect("parse raw step")
        .into_config("step-1")
        .expect_err("empty choice menu must fail");
    assert!(matches!(err, ConfigError::MissingField { ref field, .. } if field == "choices"));
}

#[test]
fn test_next_step_spec_variants() {
    let cases = [
        (r#"{ "type": "empty", "nextStep": 4 }"#, NextStepSpec::Literal(4)),
        (r#"{ "type": "empty", "nextStep": "4" }"#, NextStepSpec::Literal(4)),
        (
            r#"{ "type": "empty", "nextStep": "(route)" }"#,
            NextStepSpec::Template("(route)".to_string()),
        ),
        (
            r#"{ "type": "empty", "nextStep": "pick-tracks" }"#,
            NextStepSpec::Key("pick-tracks".to_string()),
        ),
    ];
    for (json, expected) in cases {
        let config = RawStep::from_document(&step_doc(json))
            .expect("parse raw step")
            .into_config("s")
            .expect("convert step");
        assert_eq!(config.explicit_next_step, Some(expected));
    }
}

#[test]
fn test_negative_next_step_is_invalid() {
    let doc = step_doc(r#"{ "type": "empty", "nextStep": -2 }"#);
    let err = RawStep::from_document(&doc)
        .expect("parse raw step")
        .into_config("s")
        .expect_err("negative next step must fail");
    assert!(matches!(err, ConfigError::InvalidNextStep { .. }));
}

fn seed_catalog(store: &MemoryStore) {
    store.insert(
        "catalog",
        "music",
        doc(&[
            ("name", Value::from("Music")),
            (
                "keywords",
                Value::List(vec![Value::from("songs"), Value::from("albums")]),
            ),
        ]),
    );
    store.insert(
        "catalog/music/subcategories",
        "artists",
        doc(&[("name", Value::from("Artists"))]),
    );
    store.insert(
        "catalog/music/subcategories",
        "broken",
        doc(&[("name", Value::from("Broken"))]),
    );
    store.insert(
        "catalog/music/subcategories/artists/steps",
        "step-1",
        step_doc(r#"{ "type": "documentQuery", "path": "artists", "name": "(name)" }"#),
    );
    // An unknown operator poisons only this subcategory.
    store.insert(
        "catalog/music/subcategories/broken/steps",
        "step-1",
        step_doc(
            r#"{ "type": "documentQuery", "path": "artists", "name": "(name)",
                 "filters": [ { "field": "x", "operator": "regex", "value": "y" } ] }"#,
        ),
    );
}

#[tokio::test]
async fn test_malformed_subcategory_is_disabled_alone() {
    let store = Arc::new(MemoryStore::new());
    seed_catalog(&store);

    let catalog = Catalog::load(store.as_ref(), "catalog")
        .await
        .expect("catalog loads");
    assert_eq!(catalog.categories.len(), 1);
    let music = &catalog.categories[0];
    assert_eq!(music.name, "Music");
    // "broken" was dropped, "artists" survived.
    assert_eq!(music.subcategories.len(), 1);
    assert_eq!(music.subcategories[0].id, "artists");
    assert_eq!(music.subcategories[0].steps.len(), 1);
}

#[tokio::test]
async fn test_catalog_keyword_search() {
    let store = Arc::new(MemoryStore::new());
    seed_catalog(&store);
    let catalog = Catalog::load(store.as_ref(), "catalog")
        .await
        .expect("catalog loads");

    assert_eq!(catalog.matching_categories("albu").len(), 1);
    assert_eq!(catalog.matching_categories("zebra").len(), 0);
    assert_eq!(catalog.matching_categories("").len(), 1);
    assert!(catalog.subcategory("music", "artists").is_some());
}
