use super::{FlowContext, FlowState, NavigationState, Row};
use crate::basket::SelectionBasket;
use crate::config::{FilterOp, FilterRule, StepConfig, StepKind};
use crate::document::{self, Document, Value};
use crate::error::{FetchError, FlowError, StoreError};
use crate::fetch::{DocumentFetcher, SearchFetcher, TotalCount, query_identity};
use crate::filter::{self, CompiledFilter, DroppedRule};
use crate::redirect::{self, StepRef};
use crate::store::{DocumentStore, SearchIndex};
use crate::template;
use ahash::AHashMap;
use futures::future::join_all;
use itertools::Itertools;
use std::sync::Arc;
use tracing::{debug, warn};

/// Everything the UI needs to render one activated step.
#[derive(Debug, Clone)]
pub struct StepActivation {
    pub step_index: usize,
    pub kind: StepKind,
    pub rows: Vec<Row>,
    /// The 1-based page these rows belong to.
    pub page: usize,
    pub total: TotalCount,
    pub page_count: usize,
    /// The generation this activation belongs to. Stale activations must
    /// be discarded, not merged; see [`FlowEngine::is_current`].
    pub generation: u64,
    /// Filter rules the compiler had to drop, for an optional UI notice.
    pub dropped_filters: Vec<DroppedRule>,
    /// A fetch failure, surfaced with an empty result set so the caller
    /// can render a retry affordance. Never retried automatically.
    pub error: Option<FetchError>,
}

/// What a row tap did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TapOutcome {
    /// Basket membership toggled; `added` is true when the row went in.
    Toggled { id: String, added: bool },
    /// Moved to the next step in sequence.
    Advanced { to: usize },
    /// Redirected to a non-sequential step.
    Jumped { to: usize },
    /// Nothing to navigate to; the user stays on the current step.
    Stayed,
}

/// What backing out of a step did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackOutcome {
    SteppedBack(usize),
    /// History was empty; the flow exits to the host.
    Dismissed,
}

/// The engine the UI layer drives: owns the step sequence, the flow
/// context and the paging state, and interprets the step configuration
/// against the backing stores.
///
/// The selection basket is deliberately *not* owned here: the caller
/// holds it and passes it into the calls that mutate it.
pub struct FlowEngine {
    steps: Vec<StepConfig>,
    store: Arc<dyn DocumentStore>,
    search_index: Option<Arc<dyn SearchIndex>>,
    state: FlowState,
    nav: NavigationState,
    ctx: FlowContext,
    /// Bumped on every search submit, filter apply and navigation; results
    /// carrying an older generation are superseded.
    generation: u64,
    current_page: usize,
    search_text: String,
    runtime_rules: Vec<FilterRule>,
    fetcher: Option<DocumentFetcher>,
    /// The documents behind the most recently activated rows, by id.
    last_docs: AHashMap<String, Document>,
}

impl FlowEngine {
    pub fn new(steps: Vec<StepConfig>, store: Arc<dyn DocumentStore>) -> Self {
        Self {
            steps,
            store,
            search_index: None,
            state: FlowState::Idle,
            nav: NavigationState::default(),
            ctx: FlowContext::default(),
            generation: 0,
            current_page: 1,
            search_text: String::new(),
            runtime_rules: Vec::new(),
            fetcher: None,
            last_docs: AHashMap::new(),
        }
    }

    pub fn with_search_index(mut self, search_index: Arc<dyn SearchIndex>) -> Self {
        self.search_index = Some(search_index);
        self
    }

    pub fn state(&self) -> FlowState {
        self.state
    }

    pub fn context(&self) -> &FlowContext {
        &self.ctx
    }

    pub fn navigation(&self) -> &NavigationState {
        &self.nav
    }

    pub fn steps(&self) -> &[StepConfig] {
        &self.steps
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Whether an activation still reflects the engine's current query
    /// state. A `false` here means the activation was superseded by a
    /// later search, filter change or navigation and must be dropped.
    pub fn is_current(&self, activation: &StepActivation) -> bool {
        activation.generation == self.generation
    }

    /// Enters the flow at step 0 with a cleared context and history.
    pub fn start(&mut self) -> Result<(), FlowError> {
        if self.steps.is_empty() {
            return Err(FlowError::NoSuchStep { index: 0, len: 0 });
        }
        self.ctx = FlowContext::default();
        self.nav = NavigationState::default();
        self.state = FlowState::StepActive(0);
        self.reset_step_scope();
        Ok(())
    }

    pub fn current_index(&self) -> Result<usize, FlowError> {
        match self.state {
            FlowState::StepActive(i) => Ok(i),
            FlowState::Idle => Err(FlowError::NotActive),
            FlowState::Terminal => Err(FlowError::Finished),
        }
    }

    pub fn current_step(&self) -> Result<&StepConfig, FlowError> {
        let index = self.current_index()?;
        Ok(&self.steps[index])
    }

    /// Executes the active step's configuration and returns renderable
    /// rows plus paging info.
    pub async fn activate_step(&mut self) -> Result<StepActivation, FlowError> {
        let index = self.current_index()?;
        let step = self.steps[index].clone();
        let generation = self.generation;
        let page = self.current_page;

        match step.kind {
            StepKind::Empty => {
                self.commit(generation, AHashMap::new())?;
                Ok(self.activation(index, &step, Vec::new(), page, TotalCount::Exact(0), generation, Vec::new(), None))
            }
            StepKind::ChoiceMenu => {
                let rows: Vec<Row> = step
                    .choices
                    .iter()
                    .map(|c| Row {
                        id: c.id.clone(),
                        name: c.label.clone(),
                        description: None,
                        image_url: None,
                        image_dimensions: None,
                    })
                    .collect();
                let total = TotalCount::Exact(rows.len());
                self.commit(generation, AHashMap::new())?;
                Ok(self.activation(index, &step, rows, 1, total, generation, Vec::new(), None))
            }
            StepKind::DocumentQuery => self.activate_document_query(index, &step, generation, page).await,
            StepKind::SearchIndexQuery => self.activate_search_query(index, &step, generation, page).await,
        }
    }

    /// Jumps to a page of the active step's result set.
    pub async fn goto_page(&mut self, page: usize) -> Result<StepActivation, FlowError> {
        self.current_index()?;
        self.current_page = page.max(1);
        self.activate_step().await
    }

    /// Applies a new free-text search term and re-activates. The query
    /// identity changes, so cursors reset and any in-flight result becomes
    /// stale.
    pub async fn submit_search(&mut self, text: &str) -> Result<StepActivation, FlowError> {
        self.current_index()?;
        self.search_text = text.trim().to_string();
        self.generation += 1;
        self.current_page = 1;
        self.fetcher = None;
        self.activate_step().await
    }

    /// Applies facet selections as runtime filter rules and re-activates.
    /// `selections` pairs a group name with an option name; selections in
    /// the same group OR together.
    pub async fn apply_filters(
        &mut self,
        selections: &[(String, String)],
    ) -> Result<StepActivation, FlowError> {
        let step = self.current_step()?.clone();
        let mut rules = Vec::new();
        for (group_name, option_name) in selections {
            let Some(group) = step.filter_groups.iter().find(|g| &g.name == group_name) else {
                warn!(group = %group_name, "ignoring selection for unknown filter group");
                continue;
            };
            let Some(option) = group.options.iter().find(|o| &o.name == option_name) else {
                warn!(group = %group_name, option = %option_name, "ignoring unknown filter option");
                continue;
            };
            rules.push(FilterRule {
                field: option.field.clone(),
                op: FilterOp::Eq,
                values: vec![option.value.clone()],
                group_id: Some(group.name.clone()),
            });
        }
        self.runtime_rules = rules;
        self.generation += 1;
        self.current_page = 1;
        self.fetcher = None;
        self.activate_step().await
    }

    /// Handles a tap on a rendered row: toggles basket membership on
    /// multi-select steps, otherwise forwards the row id and routes to the
    /// next step via the redirect chain.
    pub async fn tap_row(
        &mut self,
        basket: &mut SelectionBasket,
        row_id: &str,
    ) -> Result<TapOutcome, FlowError> {
        let index = self.current_index()?;
        let step = self.steps[index].clone();

        match step.kind {
            StepKind::Empty => Err(FlowError::UnknownRow(row_id.to_string())),
            StepKind::ChoiceMenu => {
                let choice = step
                    .choices
                    .iter()
                    .find(|c| c.id == row_id)
                    .ok_or_else(|| FlowError::UnknownRow(row_id.to_string()))?;
                self.ctx.selected_choice_id = Some(choice.id.clone());
                if let Some(n) = choice.target_step {
                    return Ok(self.route(StepRef::Number(n), None));
                }
                if let Some(target) = redirect::resolve_next_step(&step, &self.ctx.variables, None) {
                    return Ok(self.route(target, None));
                }
                Ok(self.advance(None))
            }
            StepKind::DocumentQuery | StepKind::SearchIndexQuery => {
                let doc = self
                    .last_docs
                    .get(row_id)
                    .cloned()
                    .ok_or_else(|| FlowError::UnknownRow(row_id.to_string()))?;

                if step.is_multi_select {
                    let row = row_from_doc(&step, row_id, &doc);
                    let added = basket.toggle(row);
                    if added {
                        self.capture_variables(&step, &doc);
                    }
                    return Ok(TapOutcome::Toggled {
                        id: row_id.to_string(),
                        added,
                    });
                }

                self.capture_variables(&step, &doc);
                let forwarded = vec![row_id.to_string()];
                if let Some(target) =
                    redirect::resolve_next_step(&step, &self.ctx.variables, Some(&doc))
                {
                    return Ok(self.route(target, Some(forwarded)));
                }
                Ok(self.advance(Some(forwarded)))
            }
        }
    }

    /// Moves to an explicit step reference. An unresolvable target is a
    /// logged no-op, leaving the user on the current step.
    pub fn jump_to(&mut self, target: &StepRef) -> Result<Option<usize>, FlowError> {
        self.current_index()?;
        match self.resolve_step_ref(target) {
            Some(index) => {
                self.navigate(index);
                Ok(Some(index))
            }
            None => {
                warn!(target = %target, len = self.steps.len(), "unresolvable jump target, staying put");
                Ok(None)
            }
        }
    }

    /// Pops the history. The captured context is deliberately preserved:
    /// redirect chains may depend on variables collected further ahead.
    pub fn back(&mut self) -> Result<BackOutcome, FlowError> {
        self.current_index()?;
        match self.nav.history.pop() {
            Some(previous) => {
                self.nav.current_step = previous;
                self.state = FlowState::StepActive(previous);
                self.reset_step_scope();
                Ok(BackOutcome::SteppedBack(previous))
            }
            None => {
                self.state = FlowState::Terminal;
                Ok(BackOutcome::Dismissed)
            }
        }
    }

    /// Confirms the selection and terminates the flow. The basket stays
    /// with the caller, who owns it.
    pub fn finish(&mut self) -> Result<(), FlowError> {
        self.current_index()?;
        self.state = FlowState::Terminal;
        Ok(())
    }

    // --- Step activation internals ---

    async fn activate_document_query(
        &mut self,
        index: usize,
        step: &StepConfig,
        generation: u64,
        page: usize,
    ) -> Result<StepActivation, FlowError> {
        // A path still templated after variable resolution fans out over
        // the collected identifiers instead of naming one collection.
        let partial = template::interpolate(&step.path_template, &self.ctx.variables, None);
        if template::has_tokens(&partial) && self.ctx.collected_identifiers.len() > 1 {
            return self.activate_fan_out(index, step, generation, page, &partial).await;
        }

        let resolved = self.resolve_with_seed(&partial);
        let compiled = self.compile_filters(step);
        let dropped = compiled.dropped.clone();

        let expected_identity = query_identity(
            &resolved,
            compiled.predicate.as_ref(),
            &step.sort_fields,
            &self.search_text,
        );
        let rebuild = self
            .fetcher
            .as_ref()
            .is_none_or(|f| f.identity() != expected_identity);
        if rebuild {
            debug!(identity = %expected_identity, "query identity changed, cursors invalidated");
            let mut fetcher = DocumentFetcher::new(
                self.store.clone(),
                resolved.clone(),
                compiled.predicate.clone(),
                step.sort_fields.clone(),
                step.page_size,
            );
            if !self.search_text.is_empty() {
                fetcher = fetcher.with_search(
                    &self.search_text,
                    &step.name_template,
                    &step.description_template,
                );
            }
            self.fetcher = Some(fetcher);
        }

        let fetched = match self.fetcher.as_mut() {
            Some(fetcher) => fetcher.fetch(page).await,
            None => unreachable!("fetcher built above"),
        };
        match fetched {
            Ok(fetched) => {
                let (rows, docs) = rows_and_docs(step, fetched.docs);
                self.commit(generation, docs)?;
                Ok(self.activation(index, step, rows, fetched.page, fetched.total, generation, dropped, None))
            }
            Err(e) => {
                self.commit(generation, AHashMap::new())?;
                Ok(self.activation(index, step, Vec::new(), page, TotalCount::Exact(0), generation, dropped, Some(e)))
            }
        }
    }

    async fn activate_search_query(
        &mut self,
        index: usize,
        step: &StepConfig,
        generation: u64,
        page: usize,
    ) -> Result<StepActivation, FlowError> {
        let index_name = self.resolve_with_seed(&step.path_template);
        let compiled = self.compile_filters(step);
        let dropped = compiled.dropped.clone();

        let Some(service) = self.search_index.clone() else {
            let error = FetchError::Search {
                index: index_name,
                source: StoreError::Backend("no search-index service configured".to_string()),
            };
            self.commit(generation, AHashMap::new())?;
            return Ok(self.activation(index, step, Vec::new(), page, TotalCount::Exact(0), generation, dropped, Some(error)));
        };

        let fetcher = SearchFetcher::new(
            service,
            index_name,
            compiled.predicate.clone(),
            step.page_size,
            &self.search_text,
        );
        match fetcher.fetch(page).await {
            Ok(fetched) => {
                let (rows, docs) = rows_and_docs(step, fetched.docs);
                self.commit(generation, docs)?;
                Ok(self.activation(index, step, rows, fetched.page, fetched.total, generation, dropped, None))
            }
            Err(e) => {
                self.commit(generation, AHashMap::new())?;
                Ok(self.activation(index, step, Vec::new(), page, TotalCount::Exact(0), generation, dropped, Some(e)))
            }
        }
    }

    /// Resolves one concrete path per collected identifier, fetches them
    /// concurrently, and merges de-duplicated by id in first-seen order.
    async fn activate_fan_out(
        &mut self,
        index: usize,
        step: &StepConfig,
        generation: u64,
        page: usize,
        partial_path: &str,
    ) -> Result<StepActivation, FlowError> {
        let paths: Vec<String> = self
            .ctx
            .collected_identifiers
            .iter()
            .map(|seed| {
                let seed = seed.clone();
                let fallback = move |_: &str| Some(seed.clone());
                template::interpolate(partial_path, &self.ctx.variables, Some(&fallback))
            })
            .collect();

        let results = join_all(paths.iter().map(|p| self.store.get(p))).await;

        let mut merged: Vec<(String, Document)> = Vec::new();
        let mut first_error: Option<FetchError> = None;
        let mut failures = 0usize;
        for (path, result) in paths.iter().zip(results) {
            match result {
                Ok(docs) => merged.extend(docs),
                Err(source) => {
                    warn!(path = %path, error = %source, "fan-out read failed, continuing");
                    failures += 1;
                    if first_error.is_none() {
                        first_error = Some(FetchError::Read {
                            path: path.clone(),
                            source,
                        });
                    }
                }
            }
        }
        // Partial results beat a hard failure; only a full wipe-out is an error.
        let error = if failures == paths.len() { first_error } else { None };

        let mut merged: Vec<(String, Document)> = merged
            .into_iter()
            .unique_by(|(id, _)| id.clone())
            .collect();

        if !self.search_text.is_empty() {
            let needle = self.search_text.to_lowercase();
            merged.retain(|(_, doc)| {
                template::render(&step.name_template, doc)
                    .to_lowercase()
                    .contains(&needle)
                    || template::render(&step.description_template, doc)
                        .to_lowercase()
                        .contains(&needle)
            });
        }

        let total = TotalCount::Exact(merged.len());
        let start = (page - 1) * step.page_size;
        let end = (start + step.page_size).min(merged.len());
        let window = if start < merged.len() {
            merged[start..end].to_vec()
        } else {
            Vec::new()
        };

        let (rows, docs) = rows_and_docs(step, window);
        self.commit(generation, docs)?;
        Ok(self.activation(index, step, rows, page, total, generation, Vec::new(), error))
    }

    /// Moves to the next step in sequence. When the finished step yielded
    /// forwarded identifiers (a single tapped row id, or a list the host
    /// collected from a picked document), they replace the context's
    /// collected identifiers and clear the selected choice.
    pub fn advance(&mut self, new_identifiers: Option<Vec<String>>) -> TapOutcome {
        let FlowState::StepActive(current) = self.state else {
            return TapOutcome::Stayed;
        };
        let next = current + 1;
        if next >= self.steps.len() {
            return TapOutcome::Stayed;
        }
        self.merge_identifiers(new_identifiers);
        self.navigate(next);
        TapOutcome::Advanced { to: next }
    }

    fn route(&mut self, target: StepRef, new_identifiers: Option<Vec<String>>) -> TapOutcome {
        match self.resolve_step_ref(&target) {
            Some(index) => {
                self.merge_identifiers(new_identifiers);
                self.navigate(index);
                TapOutcome::Jumped { to: index }
            }
            None => {
                warn!(target = %target, len = self.steps.len(), "unresolvable redirect target, staying put");
                TapOutcome::Stayed
            }
        }
    }

    fn merge_identifiers(&mut self, new_identifiers: Option<Vec<String>>) {
        if let Some(ids) = new_identifiers {
            if !ids.is_empty() {
                self.ctx.collected_identifiers = ids;
                self.ctx.selected_choice_id = None;
            }
        }
    }

    fn navigate(&mut self, target: usize) {
        if let FlowState::StepActive(current) = self.state {
            self.nav.history.push(current);
        }
        self.nav.current_step = target;
        self.state = FlowState::StepActive(target);
        self.reset_step_scope();
    }

    /// Clears per-step query state. The flow context survives; only the
    /// machine's navigation paths mutate it.
    fn reset_step_scope(&mut self) {
        self.generation += 1;
        self.current_page = 1;
        self.search_text.clear();
        self.runtime_rules.clear();
        self.fetcher = None;
        self.last_docs.clear();
    }

    fn resolve_step_ref(&self, target: &StepRef) -> Option<usize> {
        match target {
            StepRef::Number(n) => {
                let n = *n as usize;
                if n >= 1 && n <= self.steps.len() {
                    Some(n - 1)
                } else {
                    None
                }
            }
            StepRef::Key(key) => self.steps.iter().position(|s| &s.id == key),
        }
    }

    fn capture_variables(&mut self, step: &StepConfig, doc: &Document) {
        for (variable, field_path) in &step.variable_captures {
            if let Some(text) = document::get_text(doc, field_path) {
                self.ctx.variables.insert(variable.clone(), text);
            }
        }
    }

    fn compile_filters(&self, step: &StepConfig) -> CompiledFilter {
        let seed = self.ctx.seed_token().map(str::to_string);
        let fallback = move |_: &str| seed.clone();
        filter::compile(
            &step.filter_rules,
            &self.runtime_rules,
            &self.ctx.variables,
            Some(&fallback),
        )
    }

    fn resolve_with_seed(&self, template_str: &str) -> String {
        let seed = self.ctx.seed_token().map(str::to_string);
        let fallback = move |_: &str| seed.clone();
        template::interpolate(template_str, &self.ctx.variables, Some(&fallback))
    }

    /// Adopts fetched documents, unless a later generation superseded the
    /// fetch while it was in flight.
    fn commit(&mut self, generation: u64, docs: AHashMap<String, Document>) -> Result<(), FlowError> {
        if self.generation != generation {
            return Err(FlowError::Superseded {
                completed: generation,
                current: self.generation,
            });
        }
        self.last_docs = docs;
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    fn activation(
        &self,
        step_index: usize,
        step: &StepConfig,
        rows: Vec<Row>,
        page: usize,
        total: TotalCount,
        generation: u64,
        dropped_filters: Vec<DroppedRule>,
        error: Option<FetchError>,
    ) -> StepActivation {
        let page_count = total.value().div_ceil(step.page_size.max(1));
        StepActivation {
            step_index,
            kind: step.kind,
            rows,
            page,
            total,
            page_count,
            generation,
            dropped_filters,
            error,
        }
    }
}

/// Renders one document into a row, falling back to the id when the name
/// template produces nothing.
fn row_from_doc(step: &StepConfig, id: &str, doc: &Document) -> Row {
    let name = template::render(&step.name_template, doc);
    let description = template::render(&step.description_template, doc);
    let image_url = template::render(&step.image_template, doc);
    let image_dimensions = match (doc.get("imageWidth"), doc.get("imageHeight")) {
        (Some(Value::Int(w)), Some(Value::Int(h))) => {
            u32::try_from(*w).ok().zip(u32::try_from(*h).ok())
        }
        _ => None,
    };
    Row {
        id: id.to_string(),
        name: if name.is_empty() { id.to_string() } else { name },
        description: (!description.is_empty()).then_some(description),
        image_url: (!image_url.is_empty()).then_some(image_url),
        image_dimensions,
    }
}

/// Renders rows and indexes the backing documents by id. The document id
/// is mirrored into an `id` field so display templates can reference it.
fn rows_and_docs(
    step: &StepConfig,
    docs: Vec<(String, Document)>,
) -> (Vec<Row>, AHashMap<String, Document>) {
    let mut rows = Vec::with_capacity(docs.len());
    let mut by_id = AHashMap::with_capacity(docs.len());
    for (id, mut doc) in docs {
        doc.entry("id".to_string())
            .or_insert_with(|| Value::Str(id.clone()));
        rows.push(row_from_doc(step, &id, &doc));
        by_id.insert(id, doc);
    }
    (rows, by_id)
}
