//! Common test utilities for building step configurations and seeded
//! in-memory stores.
use erabu::prelude::*;
use std::sync::Arc;

/// Builds a document from field pairs.
#[allow(dead_code)]
pub fn doc(fields: &[(&str, Value)]) -> Document {
    fields
        .iter()
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect()
}

/// A store seeded with a small music library:
///
/// - `artists`: A1..A4 with `name`, `genre`, `listeners`
/// - `albums/{artist}/tracks`: tracks with `title`, `runtime`
#[allow(dead_code)]
pub fn music_store() -> Arc<MemoryStore> {
    let store = Arc::new(MemoryStore::new());
    store
        .load_json(
            r#"{
        "artists": [
            { "id": "A1", "name": "Silver Owls",  "genre": "rock", "listeners": 120 },
            { "id": "A2", "name": "Mondlicht",    "genre": "rock", "listeners": 340 },
            { "id": "A3", "name": "Quiet Rivers", "genre": "jazz", "listeners": 95 },
            { "id": "A4", "name": "Tin Parade",   "genre": "jazz", "listeners": 410 }
        ],
        "albums/A1/tracks": [
            { "id": "T1", "title": "Blue Moon",  "runtime": 164 },
            { "id": "T2", "title": "Harvest",    "runtime": 201 },
            { "id": "T3", "title": "Moonrise",   "runtime": 188 }
        ],
        "albums/A2/tracks": [
            { "id": "T3", "title": "Moonrise",   "runtime": 188 },
            { "id": "T4", "title": "Undertow",   "runtime": 233 }
        ],
        "albums/A3/tracks": [
            { "id": "T5", "title": "Stillwater", "runtime": 305 }
        ]
    }"#,
        )
        .expect("seed music store");
    store
}

/// A store whose `tracks` collection holds `total` documents, the first
/// `matching` of which carry "Moon" in the title. Ids sort as T000..Tnnn.
#[allow(dead_code)]
pub fn moon_store(matching: usize, total: usize) -> Arc<MemoryStore> {
    let store = Arc::new(MemoryStore::new());
    for i in 0..total {
        let id = format!("T{:03}", i);
        let title = if i < matching {
            format!("Moon Song {:03}", i)
        } else {
            format!("Sunrise {:03}", i)
        };
        store.insert(
            "tracks",
            &id,
            doc(&[
                ("id", Value::from(id.as_str())),
                ("title", Value::from(title.as_str())),
                ("position", Value::Int(i as i64)),
            ]),
        );
    }
    store
}

/// A choice-menu step over two genres; both route to step 2.
#[allow(dead_code)]
pub fn genre_choice_step() -> StepConfig {
    let mut step = StepConfig::new("pick-genre", StepKind::ChoiceMenu);
    step.choices = vec![
        Choice {
            id: "rock".to_string(),
            label: "Rock".to_string(),
            target_step: Some(2),
        },
        Choice {
            id: "jazz".to_string(),
            label: "Jazz".to_string(),
            target_step: Some(2),
        },
    ];
    step
}

/// A single-select artist query filtered by the selected genre choice;
/// picking a row captures `artist_id` and forwards the id.
#[allow(dead_code)]
pub fn artist_step() -> StepConfig {
    let mut step = StepConfig::new("pick-artist", StepKind::DocumentQuery);
    step.path_template = "artists".to_string();
    step.filter_rules = vec![FilterRule::new("genre", FilterOp::Eq, "(genre)")];
    step.sort_fields = vec![SortField {
        field: "name".to_string(),
        direction: SortDirection::Ascending,
    }];
    step.name_template = "(name)".to_string();
    step.description_template = "(genre)".to_string();
    step.variable_captures = [("artist_id".to_string(), "id".to_string())]
        .into_iter()
        .collect();
    step.page_size = 10;
    step
}

/// A multi-select track step over the captured artist's collection.
#[allow(dead_code)]
pub fn track_step() -> StepConfig {
    let mut step = StepConfig::new("pick-tracks", StepKind::DocumentQuery);
    step.path_template = "albums/(artist_id)/tracks".to_string();
    step.name_template = "(title)".to_string();
    step.sort_fields = vec![SortField {
        field: "title".to_string(),
        direction: SortDirection::Ascending,
    }];
    step.is_multi_select = true;
    step.has_search_bar = true;
    step.page_size = 10;
    step
}

/// A sample row for basket tests.
#[allow(dead_code)]
pub fn row(id: &str, name: &str) -> Row {
    Row {
        id: id.to_string(),
        name: name.to_string(),
        description: None,
        image_url: None,
        image_dimensions: None,
    }
}
