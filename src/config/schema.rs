//! The persisted step-document schema.
//!
//! Field names here (`type`, `path`, `filterGroups`, `sortFields`,
//! `variables`, `nextStep`, …) are the compatibility surface of the
//! configuration store and must not change. Everything is converted into
//! the typed model in [`super::definition`] at load time; unknown kinds and
//! operators are rejected there instead of surfacing mid-flow.

use super::definition::{
    Choice, FilterGroup, FilterOp, FilterOption, FilterRule, NextStepSpec, SortDirection,
    SortField, StepConfig, StepKind,
};
use crate::document::{Document, Value};
use crate::error::ConfigError;
use crate::template;
use ahash::AHashMap;
use serde::Deserialize;

fn default_page_size() -> usize {
    20
}

/// One step document as stored.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawStep {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub path: String,
    #[serde(default)]
    pub filters: Vec<RawFilterRule>,
    #[serde(default)]
    pub filter_groups: Vec<RawFilterGroup>,
    #[serde(default)]
    pub sort_fields: Vec<RawSortField>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub image: String,
    #[serde(default)]
    pub variables: AHashMap<String, String>,
    #[serde(default)]
    pub next_step: Option<serde_json::Value>,
    #[serde(default)]
    pub choices: Vec<RawChoice>,
    #[serde(default = "default_page_size")]
    pub page_size: usize,
    #[serde(default)]
    pub multi_select: bool,
    #[serde(default)]
    pub search_bar: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawFilterRule {
    pub field: String,
    pub operator: String,
    #[serde(default)]
    pub value: Option<Value>,
    #[serde(default)]
    pub values: Vec<Value>,
    #[serde(default)]
    pub group_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawFilterGroup {
    pub name: String,
    #[serde(default)]
    pub options: Vec<RawFilterOption>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawFilterOption {
    pub name: String,
    pub field: String,
    pub value: Value,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawSortField {
    pub field: String,
    #[serde(default)]
    pub direction: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawChoice {
    pub id: String,
    pub label: String,
    #[serde(default)]
    pub target_step: Option<u32>,
}

impl RawStep {
    /// Parses a raw step straight from a stored document.
    pub fn from_document(doc: &Document) -> Result<RawStep, ConfigError> {
        let json = serde_json::to_value(doc)
            .map_err(|e| ConfigError::JsonParseError(e.to_string()))?;
        serde_json::from_value(json).map_err(|e| ConfigError::JsonParseError(e.to_string()))
    }

    /// Validates and converts into the typed step model.
    pub fn into_config(self, step_id: &str) -> Result<StepConfig, ConfigError> {
        let kind = StepKind::parse(&self.kind).ok_or_else(|| ConfigError::UnknownStepKind {
            step_id: step_id.to_string(),
            kind: self.kind.clone(),
        })?;

        match kind {
            StepKind::DocumentQuery | StepKind::SearchIndexQuery => {
                if self.path.is_empty() {
                    return Err(ConfigError::MissingField {
                        step_id: step_id.to_string(),
                        field: "path".to_string(),
                    });
                }
                if self.name.is_empty() {
                    return Err(ConfigError::MissingField {
                        step_id: step_id.to_string(),
                        field: "name".to_string(),
                    });
                }
            }
            StepKind::ChoiceMenu => {
                if self.choices.is_empty() {
                    return Err(ConfigError::MissingField {
                        step_id: step_id.to_string(),
                        field: "choices".to_string(),
                    });
                }
            }
            StepKind::Empty => {}
        }

        let filter_rules = self
            .filters
            .into_iter()
            .map(convert_rule)
            .collect::<Result<Vec<_>, _>>()?;

        let filter_groups = self
            .filter_groups
            .into_iter()
            .map(|g| FilterGroup {
                name: g.name,
                options: g
                    .options
                    .into_iter()
                    .map(|o| FilterOption {
                        name: o.name,
                        field: o.field,
                        value: o.value,
                    })
                    .collect(),
            })
            .collect();

        let sort_fields = self
            .sort_fields
            .into_iter()
            .map(|s| SortField {
                direction: match s.direction.as_deref() {
                    Some("desc") => SortDirection::Descending,
                    _ => SortDirection::Ascending,
                },
                field: s.field,
            })
            .collect();

        let explicit_next_step = match self.next_step {
            None => None,
            Some(v) => Some(convert_next_step(step_id, v)?),
        };

        let choices = self
            .choices
            .into_iter()
            .map(|c| Choice {
                id: c.id,
                label: c.label,
                target_step: c.target_step,
            })
            .collect();

        Ok(StepConfig {
            id: step_id.to_string(),
            kind,
            path_template: self.path,
            filter_rules,
            filter_groups,
            sort_fields,
            name_template: self.name,
            description_template: self.description,
            image_template: self.image,
            variable_captures: self.variables,
            explicit_next_step,
            choices,
            page_size: self.page_size.max(1),
            is_multi_select: self.multi_select,
            has_search_bar: self.search_bar,
        })
    }
}

fn convert_rule(raw: RawFilterRule) -> Result<FilterRule, ConfigError> {
    let op = FilterOp::parse(&raw.operator).ok_or_else(|| ConfigError::UnknownOperator {
        field: raw.field.clone(),
        operator: raw.operator.clone(),
    })?;
    let mut values = raw.values;
    if let Some(v) = raw.value {
        values.insert(0, v);
    }
    Ok(FilterRule {
        field: raw.field,
        op,
        values,
        group_id: raw.group_id,
    })
}

fn convert_next_step(step_id: &str, value: serde_json::Value) -> Result<NextStepSpec, ConfigError> {
    match value {
        serde_json::Value::Number(n) => n
            .as_u64()
            .and_then(|n| u32::try_from(n).ok())
            .map(NextStepSpec::Literal)
            .ok_or_else(|| ConfigError::InvalidNextStep {
                step_id: step_id.to_string(),
                value: n.to_string(),
            }),
        serde_json::Value::String(s) => {
            if template::has_tokens(&s) {
                Ok(NextStepSpec::Template(s))
            } else if let Ok(n) = s.trim().parse::<u32>() {
                Ok(NextStepSpec::Literal(n))
            } else if s.is_empty() {
                Err(ConfigError::InvalidNextStep {
                    step_id: step_id.to_string(),
                    value: s,
                })
            } else {
                Ok(NextStepSpec::Key(s))
            }
        }
        other => Err(ConfigError::InvalidNextStep {
            step_id: step_id.to_string(),
            value: other.to_string(),
        }),
    }
}
