//! Compiles declarative filter rules into a store-acceptable predicate.

use super::Predicate;
use crate::config::{FilterOp, FilterRule};
use crate::document::Value;
use crate::template::{self, TokenFallback};
use ahash::AHashMap;
use tracing::warn;

/// A rule excluded from the compiled predicate, with the reason.
///
/// Dropping is graceful degradation: partial results beat a query the
/// store would reject outright.
#[derive(Debug, Clone, PartialEq)]
pub struct DroppedRule {
    pub field: String,
    pub op: FilterOp,
    /// The disjunctive operator that already claimed the query's single
    /// disjunction slot.
    pub conflicts_with: FilterOp,
}

/// The result of filter compilation.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CompiledFilter {
    pub predicate: Option<Predicate>,
    pub dropped: Vec<DroppedRule>,
}

impl CompiledFilter {
    /// Signature of the compiled predicate, empty when unfiltered.
    pub fn signature(&self) -> String {
        self.predicate
            .as_ref()
            .map(|p| p.signature())
            .unwrap_or_default()
    }
}

/// Compiles static (config) and runtime (facet-selection) rules into one
/// compound predicate.
///
/// Rules sharing a non-null `group_id` are OR-ed into a single clause;
/// ungrouped rules are standalone AND terms. Field names and string
/// operands are resolved through the token interpolator first, so a rule
/// like `artist == (artist_id)` closes over the flow's captured variables.
///
/// The store accepts a single disjunction per query: the first disjunctive
/// operator encountered claims the slot, and any later rule requesting a
/// *different* disjunctive operator is dropped with a warning.
pub fn compile(
    static_rules: &[FilterRule],
    runtime_rules: &[FilterRule],
    vars: &AHashMap<String, String>,
    fallback: Option<TokenFallback<'_>>,
) -> CompiledFilter {
    let mut dropped = Vec::new();
    let mut claimed_disjunction: Option<FilterOp> = None;

    // Terms in first-seen order: group clauses keep the position of their
    // first member so compilation stays deterministic.
    let mut terms: Vec<Term> = Vec::new();

    for rule in static_rules.iter().chain(runtime_rules) {
        if rule.op.is_disjunctive() {
            match claimed_disjunction {
                None => claimed_disjunction = Some(rule.op),
                Some(claimed) if claimed != rule.op => {
                    warn!(
                        field = %rule.field,
                        op = %rule.op,
                        claimed = %claimed,
                        "dropping filter rule: query already uses a different disjunction"
                    );
                    dropped.push(DroppedRule {
                        field: rule.field.clone(),
                        op: rule.op,
                        conflicts_with: claimed,
                    });
                    continue;
                }
                Some(_) => {}
            }
        }

        let cmp = resolve(rule, vars, fallback);
        match &rule.group_id {
            None => terms.push(Term::Single(cmp)),
            Some(group) => {
                let existing = terms
                    .iter()
                    .position(|t| matches!(t, Term::Group(name, _) if name == group));
                match existing {
                    Some(i) => {
                        if let Term::Group(_, members) = &mut terms[i] {
                            members.push(cmp);
                        }
                    }
                    None => terms.push(Term::Group(group.clone(), vec![cmp])),
                }
            }
        }
    }

    let mut clauses: Vec<Predicate> = Vec::with_capacity(terms.len());
    for term in terms {
        match term {
            Term::Single(cmp) => clauses.push(cmp),
            Term::Group(_, mut members) => {
                if members.len() == 1 {
                    clauses.push(members.remove(0));
                } else {
                    clauses.push(Predicate::Or(members));
                }
            }
        }
    }

    let predicate = match clauses.len() {
        0 => None,
        1 => Some(clauses.remove(0)),
        _ => Some(Predicate::And(clauses)),
    };

    CompiledFilter { predicate, dropped }
}

enum Term {
    Single(Predicate),
    Group(String, Vec<Predicate>),
}

/// Resolves a rule's field name and string operands against flow state.
fn resolve(
    rule: &FilterRule,
    vars: &AHashMap<String, String>,
    fallback: Option<TokenFallback<'_>>,
) -> Predicate {
    let field = template::interpolate(&rule.field, vars, fallback);
    let values = rule
        .values
        .iter()
        .map(|v| match v {
            Value::Str(s) => Value::Str(template::interpolate(s, vars, fallback)),
            other => other.clone(),
        })
        .collect();
    Predicate::cmp(field, rule.op, values)
}
