use thiserror::Error;

/// Errors that can occur while loading and validating step configuration.
///
/// A `ConfigError` is raised at load time, never during a flow: a step
/// document that cannot be validated disables its subcategory instead of
/// surfacing mid-flow.
#[derive(Error, Debug, Clone)]
pub enum ConfigError {
    #[error("Failed to parse step document: {0}")]
    JsonParseError(String),

    #[error("Step '{step_id}' is missing required field '{field}'")]
    MissingField { step_id: String, field: String },

    #[error("Step '{step_id}' has an unknown view kind: '{kind}'")]
    UnknownStepKind { step_id: String, kind: String },

    #[error("Filter rule on field '{field}' uses an unknown operator: '{operator}'")]
    UnknownOperator { field: String, operator: String },

    #[error("Step '{step_id}' has an invalid next-step reference: '{value}'")]
    InvalidNextStep { step_id: String, value: String },
}

/// Errors surfaced by a backing store implementation.
///
/// The engine treats these as opaque causes; they are wrapped into a
/// [`FetchError`] with the operation context before reaching the caller.
#[derive(Error, Debug, Clone)]
pub enum StoreError {
    #[error("No collection or document at '{0}'")]
    NotFound(String),

    #[error("Permission denied for '{0}'")]
    PermissionDenied(String),

    #[error("Store rejected the query: {0}")]
    MalformedQuery(String),

    #[error("Unknown cursor token: '{0}'")]
    BadCursor(String),

    #[error("Backend failure: {0}")]
    Backend(String),
}

/// Errors that can occur while fetching a page of results.
///
/// The fetcher never retries; the caller renders an empty result set with a
/// retry affordance instead.
#[derive(Error, Debug, Clone)]
pub enum FetchError {
    #[error("Query against '{path}' failed: {source}")]
    Query {
        path: String,
        #[source]
        source: StoreError,
    },

    #[error("Count against '{path}' failed: {source}")]
    Count {
        path: String,
        #[source]
        source: StoreError,
    },

    #[error("Search against index '{index}' failed: {source}")]
    Search {
        index: String,
        #[source]
        source: StoreError,
    },

    #[error("Document read at '{path}' failed: {source}")]
    Read {
        path: String,
        #[source]
        source: StoreError,
    },
}

/// Errors raised by the flow state machine and its engine facade.
#[derive(Error, Debug, Clone)]
pub enum FlowError {
    #[error("No flow is active")]
    NotActive,

    #[error("The flow has already terminated")]
    Finished,

    #[error("Step {index} does not exist (flow has {len} steps)")]
    NoSuchStep { index: usize, len: usize },

    #[error("Row '{0}' is not present in the current result set")]
    UnknownRow(String),

    #[error("Result discarded: generation {completed} superseded by {current}")]
    Superseded { completed: u64, current: u64 },

    #[error(transparent)]
    Fetch(#[from] FetchError),
}
