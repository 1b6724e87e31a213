//! Decides the next step from flow state and the just-selected record.
//!
//! Several sources can carry a redirect signal at once; they are resolved
//! by a fixed priority chain and the losers are logged, never raised.

use crate::config::{NextStepSpec, StepConfig};
use crate::document::{Document, Value};
use crate::template;
use ahash::AHashMap;
use std::fmt;
use tracing::debug;

/// The field name a redirect signal travels under, both in captured flow
/// variables and in document fields.
pub const NEXT_STEP_FIELD: &str = "next_step";

/// A reference to another step: a 1-based step number or a step key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepRef {
    Number(u32),
    Key(String),
}

impl fmt::Display for StepRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StepRef::Number(n) => write!(f, "#{}", n),
            StepRef::Key(k) => write!(f, "'{}'", k),
        }
    }
}

/// Resolves the redirect target for a tapped row, if any.
///
/// Priority chain, first match wins:
/// 1. `next_step` in the captured flow variables, integer-parseable;
/// 2. `next_step` on the clicked document itself (covers per-document
///    overrides not yet captured into variables);
/// 3. the step's explicit next-step template, rendered against variables
///    and then the clicked document, parsed as an integer;
/// 4. the step's explicit literal number or step key.
///
/// On a multi-select step with no local signal (neither the clicked
/// document nor the step config), an inherited `next_step` lingering in
/// the variables is discarded before resolution, so a redirect from an
/// earlier step cannot leak across the step boundary.
pub fn resolve_next_step(
    step: &StepConfig,
    doc_vars: &AHashMap<String, String>,
    clicked: Option<&Document>,
) -> Option<StepRef> {
    let clicked_signal = clicked.and_then(|doc| doc.get(NEXT_STEP_FIELD));
    let inherited = doc_vars.get(NEXT_STEP_FIELD);

    let use_inherited = if step.is_multi_select {
        if inherited.is_some() && clicked_signal.is_none() && step.explicit_next_step.is_none() {
            debug!(step = %step.id, "discarding inherited next_step on multi-select step");
        }
        false
    } else {
        true
    };

    let mut candidates: Vec<(&'static str, StepRef)> = Vec::new();

    if use_inherited {
        if let Some(raw) = inherited {
            if let Ok(n) = raw.trim().parse::<u32>() {
                candidates.push(("flow variables", StepRef::Number(n)));
            }
        }
    }

    if let Some(value) = clicked_signal {
        if let Some(step_ref) = step_ref_from_value(value) {
            candidates.push(("clicked document", step_ref));
        }
    }

    match &step.explicit_next_step {
        Some(NextStepSpec::Template(t)) => {
            let rendered = template::interpolate(t, doc_vars, None);
            let rendered = match clicked {
                Some(doc) => template::render(&rendered, doc),
                None => rendered,
            };
            if let Ok(n) = rendered.trim().parse::<u32>() {
                candidates.push(("step template", StepRef::Number(n)));
            }
        }
        Some(NextStepSpec::Literal(n)) => candidates.push(("step config", StepRef::Number(*n))),
        Some(NextStepSpec::Key(k)) => candidates.push(("step config", StepRef::Key(k.clone()))),
        None => {}
    }

    let mut iter = candidates.into_iter();
    let (source, winner) = iter.next()?;
    for (losing_source, losing) in iter {
        debug!(
            step = %step.id,
            winner = %winner,
            from = source,
            discarded = %losing,
            discarded_from = losing_source,
            "conflicting redirect signals"
        );
    }
    Some(winner)
}

fn step_ref_from_value(value: &Value) -> Option<StepRef> {
    match value {
        Value::Int(n) => u32::try_from(*n).ok().map(StepRef::Number),
        Value::Str(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                None
            } else if let Ok(n) = trimmed.parse::<u32>() {
                Some(StepRef::Number(n))
            } else {
                Some(StepRef::Key(trimmed.to_string()))
            }
        }
        _ => None,
    }
}
