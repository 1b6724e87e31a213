//! Redirect resolver tests: the priority chain and the multi-select
//! leakage guard.
mod common;
use ahash::AHashMap;
use common::doc;
use erabu::config::{NextStepSpec, StepConfig, StepKind};
use erabu::document::Value;
use erabu::redirect::{StepRef, resolve_next_step};

fn vars(pairs: &[(&str, &str)]) -> AHashMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

fn plain_step() -> StepConfig {
    StepConfig::new("step", StepKind::DocumentQuery)
}

#[test]
fn test_doc_vars_win_over_clicked_fields() {
    let step = plain_step();
    let clicked = doc(&[("next_step", Value::Int(5))]);
    let resolved = resolve_next_step(&step, &vars(&[("next_step", "3")]), Some(&clicked));
    assert_eq!(resolved, Some(StepRef::Number(3)));
}

#[test]
fn test_clicked_field_wins_over_step_config() {
    let mut step = plain_step();
    step.explicit_next_step = Some(NextStepSpec::Literal(7));
    let clicked = doc(&[("next_step", Value::Int(5))]);
    let resolved = resolve_next_step(&step, &vars(&[]), Some(&clicked));
    assert_eq!(resolved, Some(StepRef::Number(5)));
}

#[test]
fn test_clicked_field_accepts_numeric_strings_and_keys() {
    let step = plain_step();

    let clicked = doc(&[("next_step", Value::from("4"))]);
    assert_eq!(
        resolve_next_step(&step, &vars(&[]), Some(&clicked)),
        Some(StepRef::Number(4))
    );

    let clicked = doc(&[("next_step", Value::from("pick-tracks"))]);
    assert_eq!(
        resolve_next_step(&step, &vars(&[]), Some(&clicked)),
        Some(StepRef::Key("pick-tracks".to_string()))
    );
}

#[test]
fn test_template_renders_against_vars_then_clicked_fields() {
    let mut step = plain_step();
    step.explicit_next_step = Some(NextStepSpec::Template("(route)".to_string()));

    // Resolved by a flow variable.
    let resolved = resolve_next_step(&step, &vars(&[("route", "6")]), None);
    assert_eq!(resolved, Some(StepRef::Number(6)));

    // Resolved by the clicked document when no variable matches.
    let clicked = doc(&[("route", Value::Int(2))]);
    let resolved = resolve_next_step(&step, &vars(&[]), Some(&clicked));
    assert_eq!(resolved, Some(StepRef::Number(2)));

    // Unresolvable template parses to nothing; no redirect.
    let resolved = resolve_next_step(&step, &vars(&[]), None);
    assert_eq!(resolved, None);
}

#[test]
fn test_literal_and_key_specs() {
    let mut step = plain_step();
    step.explicit_next_step = Some(NextStepSpec::Literal(2));
    assert_eq!(resolve_next_step(&step, &vars(&[]), None), Some(StepRef::Number(2)));

    step.explicit_next_step = Some(NextStepSpec::Key("finale".to_string()));
    assert_eq!(
        resolve_next_step(&step, &vars(&[]), None),
        Some(StepRef::Key("finale".to_string()))
    );
}

#[test]
fn test_no_signal_means_no_redirect() {
    let step = plain_step();
    assert_eq!(resolve_next_step(&step, &vars(&[]), None), None);

    let clicked = doc(&[("title", Value::from("Blue Moon"))]);
    assert_eq!(resolve_next_step(&step, &vars(&[]), Some(&clicked)), None);
}

#[test]
fn test_unparseable_doc_var_falls_through() {
    let mut step = plain_step();
    step.explicit_next_step = Some(NextStepSpec::Literal(2));
    let resolved = resolve_next_step(&step, &vars(&[("next_step", "soon")]), None);
    assert_eq!(resolved, Some(StepRef::Number(2)));
}

#[test]
fn test_multi_select_discards_inherited_next_step() {
    // A next_step captured on an earlier step must not fire on an
    // unrelated multi-select step.
    let mut step = plain_step();
    step.is_multi_select = true;
    let clicked = doc(&[("title", Value::from("Blue Moon"))]);
    let resolved = resolve_next_step(&step, &vars(&[("next_step", "3")]), Some(&clicked));
    assert_eq!(resolved, None);
}

#[test]
fn test_multi_select_still_honours_local_signals() {
    let mut step = plain_step();
    step.is_multi_select = true;

    // A per-document override is local, not inherited.
    let clicked = doc(&[("next_step", Value::Int(4))]);
    let resolved = resolve_next_step(&step, &vars(&[("next_step", "3")]), Some(&clicked));
    assert_eq!(resolved, Some(StepRef::Number(4)));

    // So is the step's own config.
    let mut step = plain_step();
    step.is_multi_select = true;
    step.explicit_next_step = Some(NextStepSpec::Literal(6));
    let clicked = doc(&[("title", Value::from("x"))]);
    let resolved = resolve_next_step(&step, &vars(&[("next_step", "3")]), Some(&clicked));
    assert_eq!(resolved, Some(StepRef::Number(6)));
}
