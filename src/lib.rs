//! # Erabu - Configuration-Driven Search & Selection Flows
//!
//! **Erabu** is an engine for multi-step browse/search/selection flows
//! whose steps are not hard-coded: each step is a declarative document
//! (view kind, filter rules, sort rules, display templates, variable
//! captures, explicit or data-derived next step) loaded at runtime from an
//! external configuration store. The engine interprets that configuration
//! to resolve templated paths and filters against accumulated flow state,
//! compile user- and config-supplied constraints into a predicate the
//! backing store accepts, page results with stable cursors, and route
//! between steps through a priority chain of redirect signals. Records the
//! user picks along the way accumulate in a selection basket.
//!
//! ## Core Workflow
//!
//! 1. **Load configuration**: read category → subcategory → step documents
//!    from your document store via [`config::Catalog::load`], or build
//!    [`config::StepConfig`] values yourself.
//! 2. **Create an engine**: [`flow::FlowEngine::new`] with the step
//!    sequence and your [`store::DocumentStore`] (plus a
//!    [`store::SearchIndex`] for free-text steps).
//! 3. **Drive it from your UI**: `start`, `activate_step`, `submit_search`,
//!    `apply_filters`, `goto_page`, `tap_row`, `back`, `finish`.
//! 4. **Collect the picks**: the [`basket::SelectionBasket`] you own holds
//!    the chosen rows, ranked.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use erabu::prelude::*;
//! use std::sync::Arc;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // An in-memory store stands in for the real backing service here.
//!     let store = Arc::new(MemoryStore::new());
//!     store.load_json(r#"{
//!         "albums/A1/tracks": [
//!             { "id": "T1", "title": "Blue Moon", "runtime": 164 },
//!             { "id": "T2", "title": "Harvest",   "runtime": 201 }
//!         ]
//!     }"#)?;
//!
//!     // One multi-select step over that collection. In a real catalog the
//!     // path would be templated, e.g. "albums/(album_id)/tracks".
//!     let mut step = StepConfig::new("pick-tracks", StepKind::DocumentQuery);
//!     step.path_template = "albums/A1/tracks".to_string();
//!     step.name_template = "(title)".to_string();
//!     step.is_multi_select = true;
//!
//!     let mut engine = FlowEngine::new(vec![step], store);
//!     let mut basket = SelectionBasket::new();
//!
//!     futures::executor::block_on(async {
//!         engine.start()?;
//!         let activation = engine.activate_step().await?;
//!         println!("{} rows on page {}", activation.rows.len(), activation.page);
//!
//!         // A tap on a multi-select step toggles basket membership.
//!         if let Some(first) = activation.rows.first() {
//!             engine.tap_row(&mut basket, &first.id).await?;
//!         }
//!         engine.finish()?;
//!         Ok::<(), Box<dyn std::error::Error>>(())
//!     })?;
//!
//!     for entry in basket.entries() {
//!         println!("#{} {}", entry.rank, entry.row.name);
//!     }
//!     Ok(())
//! }
//! ```

pub mod basket;
pub mod config;
pub mod document;
pub mod error;
pub mod fetch;
pub mod filter;
pub mod flow;
pub mod prelude;
pub mod redirect;
pub mod store;
pub mod template;
