use crate::document::Value;
use ahash::AHashMap;
use std::fmt;

/// The view kind of one flow step.
///
/// Kinds are a closed set; an unknown kind string in a step document is
/// rejected when the configuration loads, never at render time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepKind {
    /// A static menu of choices; picking one routes the flow.
    ChoiceMenu,
    /// A predicate query against the document store.
    DocumentQuery,
    /// A free-text query against the search-index service.
    SearchIndexQuery,
    /// A step with nothing to show.
    Empty,
}

impl StepKind {
    pub fn parse(kind: &str) -> Option<StepKind> {
        match kind {
            "choiceMenu" => Some(StepKind::ChoiceMenu),
            "documentQuery" => Some(StepKind::DocumentQuery),
            "searchIndexQuery" => Some(StepKind::SearchIndexQuery),
            "empty" | "" => Some(StepKind::Empty),
            _ => None,
        }
    }
}

/// A filter comparison operator.
///
/// `In`, `NotIn` and `ArrayContainsAny` are disjunctive: the backing store
/// accepts at most one disjunction per compiled query, which the filter
/// compiler enforces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FilterOp {
    Eq,
    Neq,
    Lt,
    Lte,
    Gt,
    Gte,
    ArrayContains,
    ArrayContainsAny,
    In,
    NotIn,
}

impl FilterOp {
    pub fn parse(op: &str) -> Option<FilterOp> {
        match op {
            "eq" => Some(FilterOp::Eq),
            "neq" => Some(FilterOp::Neq),
            "lt" => Some(FilterOp::Lt),
            "lte" => Some(FilterOp::Lte),
            "gt" => Some(FilterOp::Gt),
            "gte" => Some(FilterOp::Gte),
            "arrayContains" => Some(FilterOp::ArrayContains),
            "arrayContainsAny" => Some(FilterOp::ArrayContainsAny),
            "in" => Some(FilterOp::In),
            "notIn" => Some(FilterOp::NotIn),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FilterOp::Eq => "eq",
            FilterOp::Neq => "neq",
            FilterOp::Lt => "lt",
            FilterOp::Lte => "lte",
            FilterOp::Gt => "gt",
            FilterOp::Gte => "gte",
            FilterOp::ArrayContains => "arrayContains",
            FilterOp::ArrayContainsAny => "arrayContainsAny",
            FilterOp::In => "in",
            FilterOp::NotIn => "notIn",
        }
    }

    /// True for operators the store treats as a disjunction.
    pub fn is_disjunctive(&self) -> bool {
        matches!(
            self,
            FilterOp::In | FilterOp::NotIn | FilterOp::ArrayContainsAny
        )
    }
}

impl fmt::Display for FilterOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One declarative filter constraint.
///
/// `values` holds the full operand list for disjunctive operators; scalar
/// operators use the first element. Rules sharing a `group_id` are OR-ed
/// together by the compiler.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterRule {
    pub field: String,
    pub op: FilterOp,
    pub values: Vec<Value>,
    pub group_id: Option<String>,
}

impl FilterRule {
    pub fn new(field: impl Into<String>, op: FilterOp, value: impl Into<Value>) -> Self {
        Self {
            field: field.into(),
            op,
            values: vec![value.into()],
            group_id: None,
        }
    }

    pub fn grouped(mut self, group_id: impl Into<String>) -> Self {
        self.group_id = Some(group_id.into());
        self
    }
}

/// A selectable option inside a [`FilterGroup`].
#[derive(Debug, Clone, PartialEq)]
pub struct FilterOption {
    pub name: String,
    pub field: String,
    pub value: Value,
}

/// A named, user-toggleable facet. Selected options become runtime filter
/// rules merged with the step's static rules before compilation.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterGroup {
    pub name: String,
    pub options: Vec<FilterOption>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    #[default]
    Ascending,
    Descending,
}

impl SortDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortDirection::Ascending => "asc",
            SortDirection::Descending => "desc",
        }
    }
}

/// One sort criterion, applied in declaration order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortField {
    pub field: String,
    pub direction: SortDirection,
}

/// A typed next-step reference.
///
/// Step numbers are 1-based, matching the persisted schema; the flow
/// machine converts them to indices.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NextStepSpec {
    /// A literal 1-based step number.
    Literal(u32),
    /// The id of another step in the same subcategory.
    Key(String),
    /// A template rendered against flow variables and the clicked document,
    /// expected to produce a step number.
    Template(String),
}

/// One entry of a [`StepKind::ChoiceMenu`] step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Choice {
    pub id: String,
    pub label: String,
    /// 1-based step number to jump to when this choice is picked.
    pub target_step: Option<u32>,
}

/// The immutable descriptor for one flow step.
///
/// Loaded once per flow entry from the configuration store and never
/// mutated for the session.
#[derive(Debug, Clone, PartialEq)]
pub struct StepConfig {
    /// The step document's id, usable as a jump target key.
    pub id: String,
    pub kind: StepKind,
    /// Templated document-store path, or index name for search steps.
    pub path_template: String,
    pub filter_rules: Vec<FilterRule>,
    pub filter_groups: Vec<FilterGroup>,
    pub sort_fields: Vec<SortField>,
    pub name_template: String,
    pub description_template: String,
    pub image_template: String,
    /// Logical variable name → source field path, captured when a row in
    /// this step is chosen.
    pub variable_captures: AHashMap<String, String>,
    pub explicit_next_step: Option<NextStepSpec>,
    pub choices: Vec<Choice>,
    pub page_size: usize,
    pub is_multi_select: bool,
    pub has_search_bar: bool,
}

impl StepConfig {
    /// A bare step of the given kind, for programmatic construction.
    pub fn new(id: impl Into<String>, kind: StepKind) -> Self {
        Self {
            id: id.into(),
            kind,
            path_template: String::new(),
            filter_rules: Vec::new(),
            filter_groups: Vec::new(),
            sort_fields: Vec::new(),
            name_template: String::new(),
            description_template: String::new(),
            image_template: String::new(),
            variable_captures: AHashMap::new(),
            explicit_next_step: None,
            choices: Vec::new(),
            page_size: 20,
            is_multi_select: false,
            has_search_bar: false,
        }
    }
}
