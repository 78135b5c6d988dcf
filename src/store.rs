//! Result and model persistence
//!
//! The engine consumes an abstract `ModelStore`; the numeric core never
//! touches persistence directly. Two implementations ship with the crate:
//! an in-memory store for tests and embedding, and a JSON project-file
//! store backing the CLI.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::analysis::{AnalysisSpec, AnalysisState};
use crate::error::{EngineError, EngineResult};
use crate::model::{
    Element, EndReleases, Load, LoadCase, LoadCombination, Material, ModelSnapshot, Node, Section,
};
use crate::results::{ElementResult, ModalResult, NodeResult};

/// Recorded lifecycle state of an analysis.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisStatus {
    pub state: AnalysisState,
    pub run_date: Option<DateTime<Utc>>,
    pub error: Option<String>,
}

impl AnalysisStatus {
    fn draft() -> Self {
        Self {
            state: AnalysisState::Draft,
            run_date: None,
            error: None,
        }
    }
}

/// Persistence interface consumed by the runner.
///
/// Result writes are per-analysis and transactional from the runner's
/// point of view: `clear_results` followed by the batch writes followed by
/// the COMPLETE status update commit as one logical unit.
pub trait ModelStore {
    fn load_model(&self, project_id: &str) -> EngineResult<ModelSnapshot>;
    fn load_analysis(&self, analysis_id: &str) -> EngineResult<AnalysisSpec>;
    fn clear_results(&self, analysis_id: &str) -> EngineResult<()>;
    fn write_node_results(&self, batch: &[NodeResult]) -> EngineResult<()>;
    fn write_element_results(&self, batch: &[ElementResult]) -> EngineResult<()>;
    fn write_modal_results(&self, batch: &[ModalResult]) -> EngineResult<()>;
    fn update_analysis_status(
        &self,
        analysis_id: &str,
        state: AnalysisState,
        run_date: Option<DateTime<Utc>>,
        error: Option<&str>,
    ) -> EngineResult<()>;
}

#[derive(Default)]
struct MemoryInner {
    projects: HashMap<String, ModelSnapshot>,
    analyses: HashMap<String, AnalysisSpec>,
    statuses: HashMap<String, AnalysisStatus>,
    node_results: Vec<NodeResult>,
    element_results: Vec<ElementResult>,
    modal_results: Vec<ModalResult>,
}

/// Mutex-protected in-memory store.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<MemoryInner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_project(&self, snapshot: ModelSnapshot) {
        let mut inner = self.inner.lock().unwrap();
        inner.projects.insert(snapshot.project_id.clone(), snapshot);
    }

    pub fn insert_analysis(&self, spec: AnalysisSpec) {
        let mut inner = self.inner.lock().unwrap();
        inner.statuses.insert(spec.id.clone(), AnalysisStatus::draft());
        inner.analyses.insert(spec.id.clone(), spec);
    }

    /// Delete an analysis and its results. Rejected while the analysis is
    /// RUNNING; the engine relies on this.
    pub fn delete_analysis(&self, analysis_id: &str) -> EngineResult<()> {
        let mut inner = self.inner.lock().unwrap();
        if let Some(status) = inner.statuses.get(analysis_id) {
            if status.state == AnalysisState::Running {
                return Err(EngineError::Store(format!(
                    "analysis '{analysis_id}' is running and cannot be deleted"
                )));
            }
        }
        inner.analyses.remove(analysis_id);
        inner.statuses.remove(analysis_id);
        Self::drop_results(&mut inner, analysis_id);
        Ok(())
    }

    /// Job-host reset of a terminal analysis back to DRAFT.
    pub fn reset_to_draft(&self, analysis_id: &str) -> EngineResult<()> {
        let mut inner = self.inner.lock().unwrap();
        match inner.statuses.get_mut(analysis_id) {
            Some(status) => {
                status.state = AnalysisState::Draft;
                status.error = None;
                Ok(())
            }
            None => Err(EngineError::ModelMissing {
                kind: "analysis",
                id: analysis_id.to_string(),
            }),
        }
    }

    pub fn status(&self, analysis_id: &str) -> Option<AnalysisStatus> {
        self.inner.lock().unwrap().statuses.get(analysis_id).cloned()
    }

    pub fn node_results(&self, analysis_id: &str) -> Vec<NodeResult> {
        self.inner
            .lock()
            .unwrap()
            .node_results
            .iter()
            .filter(|r| r.analysis_id == analysis_id)
            .cloned()
            .collect()
    }

    pub fn element_results(&self, analysis_id: &str) -> Vec<ElementResult> {
        self.inner
            .lock()
            .unwrap()
            .element_results
            .iter()
            .filter(|r| r.analysis_id == analysis_id)
            .cloned()
            .collect()
    }

    pub fn modal_results(&self, analysis_id: &str) -> Vec<ModalResult> {
        self.inner
            .lock()
            .unwrap()
            .modal_results
            .iter()
            .filter(|r| r.analysis_id == analysis_id)
            .cloned()
            .collect()
    }

    fn drop_results(inner: &mut MemoryInner, analysis_id: &str) {
        inner.node_results.retain(|r| r.analysis_id != analysis_id);
        inner.element_results.retain(|r| r.analysis_id != analysis_id);
        inner.modal_results.retain(|r| r.analysis_id != analysis_id);
    }
}

impl ModelStore for MemoryStore {
    fn load_model(&self, project_id: &str) -> EngineResult<ModelSnapshot> {
        // A deep copy: mutations by other writers cannot reach a run in
        // progress.
        self.inner
            .lock()
            .unwrap()
            .projects
            .get(project_id)
            .cloned()
            .ok_or_else(|| EngineError::ModelMissing {
                kind: "project",
                id: project_id.to_string(),
            })
    }

    fn load_analysis(&self, analysis_id: &str) -> EngineResult<AnalysisSpec> {
        self.inner
            .lock()
            .unwrap()
            .analyses
            .get(analysis_id)
            .cloned()
            .ok_or_else(|| EngineError::ModelMissing {
                kind: "analysis",
                id: analysis_id.to_string(),
            })
    }

    fn clear_results(&self, analysis_id: &str) -> EngineResult<()> {
        let mut inner = self.inner.lock().unwrap();
        Self::drop_results(&mut inner, analysis_id);
        Ok(())
    }

    fn write_node_results(&self, batch: &[NodeResult]) -> EngineResult<()> {
        self.inner.lock().unwrap().node_results.extend_from_slice(batch);
        Ok(())
    }

    fn write_element_results(&self, batch: &[ElementResult]) -> EngineResult<()> {
        self.inner
            .lock()
            .unwrap()
            .element_results
            .extend_from_slice(batch);
        Ok(())
    }

    fn write_modal_results(&self, batch: &[ModalResult]) -> EngineResult<()> {
        self.inner.lock().unwrap().modal_results.extend_from_slice(batch);
        Ok(())
    }

    fn update_analysis_status(
        &self,
        analysis_id: &str,
        state: AnalysisState,
        run_date: Option<DateTime<Utc>>,
        error: Option<&str>,
    ) -> EngineResult<()> {
        let mut inner = self.inner.lock().unwrap();
        match inner.statuses.get_mut(analysis_id) {
            Some(status) => {
                status.state = state;
                if run_date.is_some() {
                    status.run_date = run_date;
                }
                status.error = error.map(str::to_string);
                Ok(())
            }
            None => Err(EngineError::ModelMissing {
                kind: "analysis",
                id: analysis_id.to_string(),
            }),
        }
    }
}

// ---------------------------------------------------------------------------
// JSON project file store
// ---------------------------------------------------------------------------

/// Element as written in a project file: roll angle in degrees.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ElementInput {
    id: String,
    start_node: String,
    end_node: String,
    section: String,
    material: String,
    #[serde(default)]
    roll_angle_deg: f64,
    #[serde(default)]
    releases: EndReleases,
}

/// Material as written in a project file: moduli and strengths in MPa.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct MaterialInput {
    id: String,
    e_mpa: f64,
    nu: f64,
    rho: f64,
    #[serde(default)]
    fy_mpa: Option<f64>,
    #[serde(default)]
    fu_mpa: Option<f64>,
}

/// On-disk project schema, in the input-layer unit contract.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ProjectFile {
    project_id: String,
    nodes: Vec<Node>,
    elements: Vec<ElementInput>,
    sections: Vec<Section>,
    materials: Vec<MaterialInput>,
    #[serde(default)]
    load_cases: Vec<LoadCase>,
    #[serde(default)]
    load_combinations: Vec<LoadCombination>,
    #[serde(default)]
    loads: Vec<Load>,
    #[serde(default)]
    analyses: Vec<AnalysisSpec>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct ResultsFile {
    statuses: HashMap<String, AnalysisStatus>,
    node_results: Vec<NodeResult>,
    element_results: Vec<ElementResult>,
    modal_results: Vec<ModalResult>,
}

/// Store backed by a JSON project file.
///
/// Writes buffer in memory and persist to `<project>.results.json` in a
/// single pass when the analysis reaches a terminal state, which keeps the
/// on-disk results all-or-nothing.
pub struct JsonProjectStore {
    project: ProjectFile,
    results_path: PathBuf,
    buffered: Mutex<ResultsFile>,
}

impl JsonProjectStore {
    pub fn open(path: &Path) -> EngineResult<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| EngineError::Store(format!("cannot read {}: {e}", path.display())))?;
        let project: ProjectFile = serde_json::from_str(&text)
            .map_err(|e| EngineError::Store(format!("cannot parse {}: {e}", path.display())))?;

        let mut buffered = ResultsFile::default();
        for spec in &project.analyses {
            buffered
                .statuses
                .insert(spec.id.clone(), AnalysisStatus::draft());
        }

        Ok(Self {
            project,
            results_path: path.with_extension("results.json"),
            buffered: Mutex::new(buffered),
        })
    }

    pub fn results_path(&self) -> &Path {
        &self.results_path
    }

    fn persist(&self, results: &ResultsFile) -> EngineResult<()> {
        let json = serde_json::to_string_pretty(results)
            .map_err(|e| EngineError::Store(format!("cannot serialize results: {e}")))?;
        std::fs::write(&self.results_path, json).map_err(|e| {
            EngineError::Store(format!("cannot write {}: {e}", self.results_path.display()))
        })
    }
}

impl ModelStore for JsonProjectStore {
    fn load_model(&self, project_id: &str) -> EngineResult<ModelSnapshot> {
        if self.project.project_id != project_id {
            return Err(EngineError::ModelMissing {
                kind: "project",
                id: project_id.to_string(),
            });
        }

        let elements = self
            .project
            .elements
            .iter()
            .map(|e| {
                Element::new(&e.id, &e.start_node, &e.end_node, &e.section, &e.material)
                    .with_roll_deg(e.roll_angle_deg)
                    .with_releases(e.releases)
            })
            .collect();

        let materials = self
            .project
            .materials
            .iter()
            .map(|m| {
                let mut material = Material::from_mpa(&m.id, m.e_mpa, m.nu, m.rho);
                material.fy = m.fy_mpa.map(|v| v * 1e6);
                material.fu = m.fu_mpa.map(|v| v * 1e6);
                material
            })
            .collect();

        ModelSnapshot::new(
            project_id,
            self.project.nodes.clone(),
            elements,
            self.project.sections.clone(),
            materials,
            self.project.load_cases.clone(),
            self.project.load_combinations.clone(),
            self.project.loads.clone(),
        )
    }

    fn load_analysis(&self, analysis_id: &str) -> EngineResult<AnalysisSpec> {
        self.project
            .analyses
            .iter()
            .find(|a| a.id == analysis_id)
            .cloned()
            .ok_or_else(|| EngineError::ModelMissing {
                kind: "analysis",
                id: analysis_id.to_string(),
            })
    }

    fn clear_results(&self, analysis_id: &str) -> EngineResult<()> {
        let mut buffered = self.buffered.lock().unwrap();
        buffered.node_results.retain(|r| r.analysis_id != analysis_id);
        buffered
            .element_results
            .retain(|r| r.analysis_id != analysis_id);
        buffered.modal_results.retain(|r| r.analysis_id != analysis_id);
        Ok(())
    }

    fn write_node_results(&self, batch: &[NodeResult]) -> EngineResult<()> {
        self.buffered
            .lock()
            .unwrap()
            .node_results
            .extend_from_slice(batch);
        Ok(())
    }

    fn write_element_results(&self, batch: &[ElementResult]) -> EngineResult<()> {
        self.buffered
            .lock()
            .unwrap()
            .element_results
            .extend_from_slice(batch);
        Ok(())
    }

    fn write_modal_results(&self, batch: &[ModalResult]) -> EngineResult<()> {
        self.buffered
            .lock()
            .unwrap()
            .modal_results
            .extend_from_slice(batch);
        Ok(())
    }

    fn update_analysis_status(
        &self,
        analysis_id: &str,
        state: AnalysisState,
        run_date: Option<DateTime<Utc>>,
        error: Option<&str>,
    ) -> EngineResult<()> {
        let mut buffered = self.buffered.lock().unwrap();
        let status = buffered
            .statuses
            .entry(analysis_id.to_string())
            .or_insert_with(AnalysisStatus::draft);
        status.state = state;
        if run_date.is_some() {
            status.run_date = run_date;
        }
        status.error = error.map(str::to_string);

        if state.is_terminal() {
            self.persist(&buffered)?;
        }
        Ok(())
    }
}
