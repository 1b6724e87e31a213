//! Prelude module for convenient imports
//!
//! Re-exports the most commonly used types from the erabu crate so callers
//! can bring the core API in with a single `use`.

// Flow machine and engine facade
pub use crate::flow::{
    BackOutcome, FlowContext, FlowEngine, FlowState, NavigationState, Row, StepActivation,
    TapOutcome,
};

// Configuration model
pub use crate::config::{
    Catalog, Category, Choice, FilterGroup, FilterOp, FilterOption, FilterRule, NextStepSpec,
    SortDirection, SortField, StepConfig, StepKind, Subcategory,
};

// Documents and values
pub use crate::document::{Document, Value};

// Filtering and fetching
pub use crate::fetch::{DocumentFetcher, FetchedPage, SearchFetcher, TotalCount};
pub use crate::filter::{CompiledFilter, DroppedRule, Predicate};

// Stores
pub use crate::store::{
    Cursor, DocumentStore, MemorySearchIndex, MemoryStore, QueryPage, SearchIndex, SearchPage,
};

// Selection basket
pub use crate::basket::{BasketEntry, SelectionBasket};

// Redirects
pub use crate::redirect::{StepRef, resolve_next_step};

// Error types
pub use crate::error::{ConfigError, FetchError, FlowError, StoreError};
