//! Generates a sample catalog plus a matching dataset for the in-memory
//! store, sized by command line. Useful for trying out `erabu-cli` and for
//! producing paging fixtures of arbitrary depth.

use clap::Parser;
use rand::Rng;
use rand::seq::IndexedRandom;
use serde_json::{Map, Value, json};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "data-gen", about = "Generate a sample catalog and dataset")]
struct Args {
    /// Number of artists to fabricate.
    #[arg(long, default_value_t = 8)]
    artists: usize,

    /// Tracks per artist.
    #[arg(long, default_value_t = 30)]
    tracks: usize,

    /// Where to write the dataset JSON (stdout when omitted).
    #[arg(long)]
    out: Option<PathBuf>,
}

const GENRES: [&str; 4] = ["rock", "jazz", "folk", "electronic"];
const ADJECTIVES: [&str; 8] = [
    "Blue", "Silver", "Quiet", "Golden", "Broken", "Velvet", "Northern", "Hollow",
];
const NOUNS: [&str; 8] = [
    "Moon", "River", "Parade", "Harvest", "Lantern", "Meadow", "Signal", "Harbor",
];

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let mut rng = rand::rng();

    let mut collections = Map::new();

    let mut artist_docs = Vec::with_capacity(args.artists);
    for a in 0..args.artists {
        let id = format!("A{}", a + 1);
        let name = format!(
            "{} {}",
            ADJECTIVES.choose(&mut rng).unwrap_or(&"Plain"),
            NOUNS.choose(&mut rng).unwrap_or(&"Band"),
        );
        let genre = GENRES.choose(&mut rng).unwrap_or(&"rock");
        artist_docs.push(json!({
            "id": id,
            "name": format!("{} {}", name, a + 1),
            "genre": genre,
            "listeners": rng.random_range(10..5000),
        }));

        let mut track_docs = Vec::with_capacity(args.tracks);
        for t in 0..args.tracks {
            track_docs.push(json!({
                "id": format!("{}-T{:03}", id, t),
                "title": format!(
                    "{} {} {:03}",
                    ADJECTIVES.choose(&mut rng).unwrap_or(&"Plain"),
                    NOUNS.choose(&mut rng).unwrap_or(&"Song"),
                    t
                ),
                "runtime": rng.random_range(90..360),
            }));
        }
        collections.insert(format!("albums/{}/tracks", id), Value::Array(track_docs));
    }
    collections.insert("artists".to_string(), Value::Array(artist_docs));

    // The catalog steps that browse the data above.
    collections.insert(
        "catalog".to_string(),
        json!([{ "id": "music", "name": "Music", "keywords": ["songs", "albums"] }]),
    );
    collections.insert(
        "catalog/music/subcategories".to_string(),
        json!([{ "id": "artists", "name": "Artists" }]),
    );
    collections.insert(
        "catalog/music/subcategories/artists/steps".to_string(),
        json!([
            {
                "id": "pick-genre",
                "type": "choiceMenu",
                "choices": GENRES.iter().map(|g| json!({
                    "id": g, "label": g, "targetStep": 2
                })).collect::<Vec<_>>()
            },
            {
                "id": "pick-artist",
                "type": "documentQuery",
                "path": "artists",
                "filters": [ { "field": "genre", "operator": "eq", "value": "(genre)" } ],
                "sortFields": [ { "field": "name" } ],
                "name": "(name)",
                "description": "(genre)",
                "variables": { "artist_id": "id" }
            },
            {
                "id": "pick-tracks",
                "type": "documentQuery",
                "path": "albums/(artist_id)/tracks",
                "sortFields": [ { "field": "title" } ],
                "name": "(title)",
                "description": "(runtime)s",
                "pageSize": 10,
                "multiSelect": true,
                "searchBar": true
            }
        ]),
    );

    let output = serde_json::to_string_pretty(&Value::Object(collections))?;
    match args.out {
        Some(path) => std::fs::write(path, output)?,
        None => println!("{}", output),
    }
    Ok(())
}
