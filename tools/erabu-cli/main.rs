//! A small driver for exercising a configured flow against JSON fixtures
//! loaded into the in-memory store.
//!
//! The script is a list of actions applied in order after the flow starts:
//!
//! ```text
//! erabu-cli --data data.json --category music --subcategory artists \
//!     tap:rock tap:A2 search:moon page:2 tap:T3 finish
//! ```

use clap::Parser;
use erabu::prelude::*;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "erabu-cli", about = "Drive a configured selection flow from the terminal")]
struct Args {
    /// JSON file of collections to load into the in-memory store.
    #[arg(long)]
    data: PathBuf,

    /// Root collection holding the catalog documents.
    #[arg(long, default_value = "catalog")]
    catalog_root: String,

    /// Category id to enter.
    #[arg(long)]
    category: String,

    /// Subcategory id whose step sequence runs.
    #[arg(long)]
    subcategory: String,

    /// Actions: `tap:<row>`, `search:<text>`, `page:<n>`, `back`, `finish`.
    #[arg(value_name = "ACTION")]
    script: Vec<String>,
}

fn print_activation(activation: &StepActivation) {
    println!(
        "-- step {} ({:?}), page {}/{}, {} {}",
        activation.step_index + 1,
        activation.kind,
        activation.page,
        activation.page_count.max(1),
        activation.total.value(),
        if activation.total.is_approximate() {
            "matches so far"
        } else {
            "total"
        },
    );
    for dropped in &activation.dropped_filters {
        println!(
            "   (dropped filter on '{}': {} conflicts with {})",
            dropped.field, dropped.op, dropped.conflicts_with
        );
    }
    if let Some(error) = &activation.error {
        println!("   fetch failed: {}", error);
    }
    for row in &activation.rows {
        match &row.description {
            Some(description) => println!("   [{}] {} - {}", row.id, row.name, description),
            None => println!("   [{}] {}", row.id, row.name),
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let store = Arc::new(MemoryStore::new());
    store.load_json(&std::fs::read_to_string(&args.data)?)?;

    let catalog = Catalog::load(store.as_ref(), &args.catalog_root).await?;
    let steps = catalog
        .subcategory(&args.category, &args.subcategory)
        .ok_or_else(|| {
            format!(
                "no subcategory '{}/{}' in the catalog",
                args.category, args.subcategory
            )
        })?
        .steps
        .clone();

    let mut engine = FlowEngine::new(steps, store);
    let mut basket = SelectionBasket::new();
    engine.start()?;
    print_activation(&engine.activate_step().await?);

    for action in &args.script {
        match action.split_once(':') {
            Some(("tap", row_id)) => {
                let outcome = engine.tap_row(&mut basket, row_id).await?;
                println!(">> tap {} -> {:?}", row_id, outcome);
                if matches!(outcome, TapOutcome::Advanced { .. } | TapOutcome::Jumped { .. }) {
                    print_activation(&engine.activate_step().await?);
                }
            }
            Some(("search", text)) => {
                println!(">> search '{}'", text);
                print_activation(&engine.submit_search(text).await?);
            }
            Some(("page", number)) => {
                let page: usize = number.parse()?;
                println!(">> page {}", page);
                print_activation(&engine.goto_page(page).await?);
            }
            None if action == "back" => match engine.back()? {
                BackOutcome::SteppedBack(index) => {
                    println!(">> back to step {}", index + 1);
                    print_activation(&engine.activate_step().await?);
                }
                BackOutcome::Dismissed => {
                    println!(">> dismissed");
                    break;
                }
            },
            None if action == "finish" => {
                engine.finish()?;
                println!(">> finished");
                break;
            }
            _ => return Err(format!("unknown action '{}'", action).into()),
        }
    }

    println!("-- basket ({} items)", basket.len());
    for entry in basket.entries() {
        println!("   #{} [{}] {}", entry.rank, entry.id, entry.row.name);
    }
    Ok(())
}
