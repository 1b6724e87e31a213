//! Catalog loading: category → subcategory → ordered step documents.

use super::definition::StepConfig;
use super::schema::RawStep;
use crate::document::{Document, Value};
use crate::error::FetchError;
use crate::store::DocumentStore;
use tracing::warn;

/// A browsable category with its drill-down subcategories.
#[derive(Debug, Clone)]
pub struct Category {
    pub id: String,
    pub name: String,
    pub keywords: Vec<String>,
    pub subcategories: Vec<Subcategory>,
}

/// One subcategory and the step sequence entering it starts.
#[derive(Debug, Clone)]
pub struct Subcategory {
    pub id: String,
    pub name: String,
    pub keywords: Vec<String>,
    pub steps: Vec<StepConfig>,
}

/// The full browse catalog.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    pub categories: Vec<Category>,
}

impl Catalog {
    /// Loads the catalog from the configuration store.
    ///
    /// Layout: `{root}` holds category documents, each category has a
    /// `subcategories` collection, each subcategory a `steps` collection
    /// whose document order is the step order. A subcategory whose step
    /// documents fail validation is disabled (skipped with a warning);
    /// the rest of the catalog stays available.
    pub async fn load(store: &dyn DocumentStore, root: &str) -> Result<Catalog, FetchError> {
        let category_docs = store.get(root).await.map_err(|source| FetchError::Read {
            path: root.to_string(),
            source,
        })?;

        let mut categories = Vec::with_capacity(category_docs.len());
        for (category_id, category_doc) in category_docs {
            let sub_path = format!("{}/{}/subcategories", root, category_id);
            let sub_docs = match store.get(&sub_path).await {
                Ok(docs) => docs,
                Err(e) => {
                    warn!(category = %category_id, error = %e, "skipping category: subcategories unavailable");
                    continue;
                }
            };

            let mut subcategories = Vec::with_capacity(sub_docs.len());
            for (sub_id, sub_doc) in sub_docs {
                let steps_path = format!("{}/{}/steps", sub_path, sub_id);
                match load_steps(store, &steps_path).await {
                    Ok(steps) => subcategories.push(Subcategory {
                        name: display_name(&sub_doc, &sub_id),
                        keywords: keywords(&sub_doc),
                        id: sub_id,
                        steps,
                    }),
                    Err(e) => {
                        // One bad step document disables this subcategory only.
                        warn!(subcategory = %sub_id, error = %e, "subcategory disabled");
                    }
                }
            }

            categories.push(Category {
                name: display_name(&category_doc, &category_id),
                keywords: keywords(&category_doc),
                id: category_id,
                subcategories,
            });
        }

        Ok(Catalog { categories })
    }

    /// Client-side catalog search over names and keywords.
    pub fn matching_categories(&self, query: &str) -> Vec<&Category> {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return self.categories.iter().collect();
        }
        self.categories
            .iter()
            .filter(|c| {
                c.name.to_lowercase().contains(&needle)
                    || c.keywords.iter().any(|k| k.to_lowercase().contains(&needle))
            })
            .collect()
    }

    pub fn subcategory(&self, category_id: &str, subcategory_id: &str) -> Option<&Subcategory> {
        self.categories
            .iter()
            .find(|c| c.id == category_id)?
            .subcategories
            .iter()
            .find(|s| s.id == subcategory_id)
    }
}

async fn load_steps(
    store: &dyn DocumentStore,
    steps_path: &str,
) -> Result<Vec<StepConfig>, Box<dyn std::error::Error + Send + Sync>> {
    let step_docs = store.get(steps_path).await?;
    let mut steps = Vec::with_capacity(step_docs.len());
    for (step_id, step_doc) in step_docs {
        let raw = RawStep::from_document(&step_doc)?;
        steps.push(raw.into_config(&step_id)?);
    }
    Ok(steps)
}

fn display_name(doc: &Document, fallback: &str) -> String {
    doc.get("name")
        .and_then(Value::as_str)
        .unwrap_or(fallback)
        .to_string()
}

fn keywords(doc: &Document) -> Vec<String> {
    doc.get("keywords")
        .and_then(Value::as_list)
        .map(|items| {
            items
                .iter()
                .filter_map(|v| v.as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
}
