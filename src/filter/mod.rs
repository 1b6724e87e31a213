//! Compound predicates accepted by the backing document store.
//!
//! A [`Predicate`] is the compiled form of a step's declarative filter
//! rules. It is deliberately small: single comparisons, one level of OR
//! clauses, and an outer AND: the shapes the backing store can execute.

use crate::config::FilterOp;
use crate::document::{self, Document, Value};

mod compiler;

pub use compiler::{CompiledFilter, DroppedRule, compile};

/// A compound filter predicate.
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    /// One field comparison. `values` carries the operand list for
    /// disjunctive operators; scalar operators read the first element.
    Cmp {
        field: String,
        op: FilterOp,
        values: Vec<Value>,
    },
    And(Vec<Predicate>),
    Or(Vec<Predicate>),
}

impl Predicate {
    pub fn cmp(field: impl Into<String>, op: FilterOp, values: Vec<Value>) -> Predicate {
        Predicate::Cmp {
            field: field.into(),
            op,
            values,
        }
    }

    /// A canonical, deterministic rendering of the predicate.
    ///
    /// Identical (rules, context) inputs always compile to predicates with
    /// identical signatures; the paginator hashes this string into the
    /// query identity that keys its cursor table.
    pub fn signature(&self) -> String {
        match self {
            Predicate::Cmp { field, op, values } => {
                let operands = serde_json::to_string(values).unwrap_or_default();
                format!("{}:{}:{}", field, op.as_str(), operands)
            }
            Predicate::And(clauses) => {
                let inner: Vec<String> = clauses.iter().map(|c| c.signature()).collect();
                format!("and({})", inner.join(","))
            }
            Predicate::Or(clauses) => {
                let inner: Vec<String> = clauses.iter().map(|c| c.signature()).collect();
                format!("or({})", inner.join(","))
            }
        }
    }

    /// Evaluates the predicate against one document.
    ///
    /// This is the reference semantics used by the in-memory store; remote
    /// stores evaluate the same shapes server-side. Type-mismatched
    /// comparisons are non-matches, never errors.
    pub fn matches(&self, doc: &Document) -> bool {
        match self {
            Predicate::And(clauses) => clauses.iter().all(|c| c.matches(doc)),
            Predicate::Or(clauses) => clauses.iter().any(|c| c.matches(doc)),
            Predicate::Cmp { field, op, values } => {
                let actual = document::get_path(doc, field);
                let operand = values.first();
                match op {
                    FilterOp::Eq => match (actual, operand) {
                        (Some(a), Some(b)) => a.loose_eq(b),
                        _ => false,
                    },
                    FilterOp::Neq => match (actual, operand) {
                        (Some(a), Some(b)) => !a.loose_eq(b),
                        _ => false,
                    },
                    FilterOp::Lt | FilterOp::Lte | FilterOp::Gt | FilterOp::Gte => {
                        let (Some(a), Some(b)) = (actual, operand) else {
                            return false;
                        };
                        match a.compare(b) {
                            Some(ord) => match op {
                                FilterOp::Lt => ord.is_lt(),
                                FilterOp::Lte => ord.is_le(),
                                FilterOp::Gt => ord.is_gt(),
                                FilterOp::Gte => ord.is_ge(),
                                _ => unreachable!(),
                            },
                            None => false,
                        }
                    }
                    FilterOp::ArrayContains => {
                        let (Some(a), Some(b)) = (actual, operand) else {
                            return false;
                        };
                        a.as_list()
                            .is_some_and(|items| items.iter().any(|item| item.loose_eq(b)))
                    }
                    FilterOp::ArrayContainsAny => {
                        let Some(a) = actual else { return false };
                        a.as_list().is_some_and(|items| {
                            items
                                .iter()
                                .any(|item| values.iter().any(|v| item.loose_eq(v)))
                        })
                    }
                    FilterOp::In => actual
                        .is_some_and(|a| values.iter().any(|v| a.loose_eq(v))),
                    FilterOp::NotIn => actual
                        .is_some_and(|a| !values.iter().any(|v| a.loose_eq(v))),
                }
            }
        }
    }

    /// Collects the distinct disjunctive operators present in the tree.
    pub fn disjunctive_ops(&self) -> Vec<FilterOp> {
        fn walk(p: &Predicate, out: &mut Vec<FilterOp>) {
            match p {
                Predicate::Cmp { op, .. } => {
                    if op.is_disjunctive() && !out.contains(op) {
                        out.push(*op);
                    }
                }
                Predicate::And(clauses) | Predicate::Or(clauses) => {
                    for c in clauses {
                        walk(c, out);
                    }
                }
            }
        }
        let mut out = Vec::new();
        walk(self, &mut out);
        out
    }
}
