//! Run orchestration
//!
//! `run` drives one analysis from stored configuration to committed
//! results: freeze the
//! snapshot, solve, superpose combinations, and write everything in one
//! transactional burst. Any error discards the partial work and lands the
//! analysis in FAILED with the error kind recorded.

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use log::{info, warn};

use crate::analysis::{AnalysisKind, AnalysisSpec, AnalysisState};
use crate::combine;
use crate::error::{EngineError, EngineResult};
use crate::model::ModelSnapshot;
use crate::results::{CaseRef, ElementResult, ModalResult, NodeResult};
use crate::solver::Engine;
use crate::store::ModelStore;

/// Cooperative cancellation and deadline, checked between run stages.
#[derive(Clone, Default)]
pub struct RunControl {
    cancel: Arc<AtomicBool>,
    deadline: Option<Instant>,
}

impl RunControl {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_deadline(timeout: Duration) -> Self {
        Self {
            cancel: Arc::new(AtomicBool::new(false)),
            deadline: Some(Instant::now() + timeout),
        }
    }

    /// Handle a supervisor can flip to request cancellation.
    pub fn cancel_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancel)
    }

    fn check(&self) -> EngineResult<()> {
        if self.cancel.load(Ordering::Relaxed) {
            return Err(EngineError::Cancelled);
        }
        if let Some(deadline) = self.deadline {
            if Instant::now() > deadline {
                return Err(EngineError::Timeout);
            }
        }
        Ok(())
    }
}

/// What a completed run produced.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub analysis_id: String,
    pub node_results: usize,
    pub element_results: usize,
    pub modal_results: usize,
}

/// Run an analysis to completion or failure. Blocking and idempotent:
/// re-running overwrites the prior results of the same analysis.
pub fn run(store: &dyn ModelStore, analysis_id: &str) -> EngineResult<RunOutcome> {
    run_with_control(store, analysis_id, &RunControl::new())
}

pub fn run_with_control(
    store: &dyn ModelStore,
    analysis_id: &str,
    control: &RunControl,
) -> EngineResult<RunOutcome> {
    let spec = store.load_analysis(analysis_id)?;
    info!("analysis '{}' ({}) queued", analysis_id, spec.kind.name());
    store.update_analysis_status(analysis_id, AnalysisState::Queued, None, None)?;

    // Freeze the model; the run never reads the store again until commit.
    let snapshot = store.load_model(&spec.project_id)?;
    store.update_analysis_status(analysis_id, AnalysisState::Running, None, None)?;

    match execute(store, &spec, &snapshot, control) {
        Ok(outcome) => {
            store.update_analysis_status(
                analysis_id,
                AnalysisState::Complete,
                Some(Utc::now()),
                None,
            )?;
            info!(
                "analysis '{}' complete: {} node, {} element, {} modal records",
                analysis_id, outcome.node_results, outcome.element_results, outcome.modal_results
            );
            Ok(outcome)
        }
        Err(error) => {
            warn!("analysis '{}' failed: {}", analysis_id, error);
            // Best-effort status write; the original error wins either way.
            let _ = store.update_analysis_status(
                analysis_id,
                AnalysisState::Failed,
                Some(Utc::now()),
                Some(error.kind()),
            );
            Err(error)
        }
    }
}

fn execute(
    store: &dyn ModelStore,
    spec: &AnalysisSpec,
    snapshot: &ModelSnapshot,
    control: &RunControl,
) -> EngineResult<RunOutcome> {
    control.check()?;
    let engine = Engine::new(snapshot, &spec.id, spec.options.clone())?;

    match spec.kind {
        AnalysisKind::LinearStatic | AnalysisKind::PDelta => {
            execute_static(store, spec, snapshot, &engine, control)
        }
        AnalysisKind::Modal => execute_modal(store, spec, &engine, control),
        other => Err(EngineError::UnsupportedAnalysis(other.name().to_string())),
    }
}

fn execute_static(
    store: &dyn ModelStore,
    spec: &AnalysisSpec,
    snapshot: &ModelSnapshot,
    engine: &Engine,
    control: &RunControl,
) -> EngineResult<RunOutcome> {
    let second_order = spec.kind == AnalysisKind::PDelta;

    // Solve every requested case plus any case a requested combination
    // factors in, so the combiner always finds its inputs.
    let mut case_ids: BTreeSet<String> = spec.load_case_ids.iter().cloned().collect();
    for combo_id in &spec.load_combination_ids {
        let combo = snapshot.load_combination(combo_id)?;
        case_ids.extend(combo.cases.iter().map(|(id, _)| id.clone()));
    }

    let mut node_batch: Vec<NodeResult> = Vec::new();
    let mut element_batch: Vec<ElementResult> = Vec::new();

    for case_id in &case_ids {
        snapshot.load_case(case_id)?;
        control.check()?;

        let case = CaseRef::Case(case_id.clone());
        let factored = [(case_id.as_str(), 1.0)];
        let solution = if second_order {
            engine.solve_p_delta(&case, &factored)?
        } else {
            engine.solve_static(&case, &factored)?
        };

        node_batch.extend(solution.node_results);
        element_batch.extend(solution.element_results);
    }

    for combo_id in &spec.load_combination_ids {
        let combo = snapshot.load_combination(combo_id)?;
        control.check()?;

        if second_order {
            // Superposition does not hold for a second-order solve, so
            // each combination gets a direct factored run.
            let factored: Vec<(&str, f64)> = combo
                .cases
                .iter()
                .map(|(id, factor)| (id.as_str(), *factor))
                .collect();
            let case = CaseRef::Combination(combo_id.clone());
            let solution = engine.solve_p_delta(&case, &factored)?;
            node_batch.extend(solution.node_results);
            element_batch.extend(solution.element_results);
        } else {
            let combined_nodes = combine::combine_node_results(combo, &node_batch);
            node_batch.extend(combined_nodes);
            let combined_elements = combine::combine_element_results(combo, &element_batch);
            element_batch.extend(combined_elements);
        }
    }

    control.check()?;
    store.clear_results(&spec.id)?;
    store.write_node_results(&node_batch)?;
    store.write_element_results(&element_batch)?;

    Ok(RunOutcome {
        analysis_id: spec.id.clone(),
        node_results: node_batch.len(),
        element_results: element_batch.len(),
        modal_results: 0,
    })
}

fn execute_modal(
    store: &dyn ModelStore,
    spec: &AnalysisSpec,
    engine: &Engine,
    control: &RunControl,
) -> EngineResult<RunOutcome> {
    let num_modes = spec.num_modes.unwrap_or(10);

    control.check()?;
    let modes = engine.solve_modal(num_modes)?;

    control.check()?;
    store.clear_results(&spec.id)?;
    store.write_modal_results(&modes)?;

    Ok(RunOutcome {
        analysis_id: spec.id.clone(),
        node_results: 0,
        element_results: 0,
        modal_results: modes.len(),
    })
}
