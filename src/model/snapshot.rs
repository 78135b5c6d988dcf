//! Immutable model snapshot read from the store before a run

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};
use crate::model::{Element, Load, LoadCase, LoadCombination, Material, Node, Section};

/// Minimum admissible element length in m.
pub const MIN_ELEMENT_LENGTH: f64 = 1e-9;

/// A validated, read-only view of a project's model.
///
/// The snapshot is the sole source of truth for a run: node order is frozen
/// at construction and defines DOF numbering, and all referential and value
/// checks happen here so the numeric core never touches the store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelSnapshot {
    pub project_id: String,
    pub nodes: Vec<Node>,
    pub elements: Vec<Element>,
    pub sections: Vec<Section>,
    pub materials: Vec<Material>,
    pub load_cases: Vec<LoadCase>,
    pub load_combinations: Vec<LoadCombination>,
    pub loads: Vec<Load>,

    #[serde(skip)]
    node_index: HashMap<String, usize>,
    #[serde(skip)]
    element_index: HashMap<String, usize>,
    #[serde(skip)]
    section_index: HashMap<String, usize>,
    #[serde(skip)]
    material_index: HashMap<String, usize>,
}

impl ModelSnapshot {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        project_id: &str,
        nodes: Vec<Node>,
        elements: Vec<Element>,
        sections: Vec<Section>,
        materials: Vec<Material>,
        load_cases: Vec<LoadCase>,
        load_combinations: Vec<LoadCombination>,
        loads: Vec<Load>,
    ) -> EngineResult<Self> {
        let mut snapshot = Self {
            project_id: project_id.to_string(),
            nodes,
            elements,
            sections,
            materials,
            load_cases,
            load_combinations,
            loads,
            node_index: HashMap::new(),
            element_index: HashMap::new(),
            section_index: HashMap::new(),
            material_index: HashMap::new(),
        };
        snapshot.build_indices()?;
        snapshot.validate()?;
        Ok(snapshot)
    }

    /// Rebuild the lookup maps. Needed after deserialization, where the
    /// skipped index fields come back empty.
    pub fn reindex(&mut self) -> EngineResult<()> {
        self.build_indices()?;
        self.validate()
    }

    fn build_indices(&mut self) -> EngineResult<()> {
        fn index_of<T>(
            items: &[T],
            id: impl Fn(&T) -> &str,
            kind: &'static str,
        ) -> EngineResult<HashMap<String, usize>> {
            let mut map = HashMap::with_capacity(items.len());
            for (i, item) in items.iter().enumerate() {
                if map.insert(id(item).to_string(), i).is_some() {
                    return Err(EngineError::ModelInconsistent(format!(
                        "duplicate {} id '{}'",
                        kind,
                        id(item)
                    )));
                }
            }
            Ok(map)
        }

        self.node_index = index_of(&self.nodes, |n| &n.id, "node")?;
        self.element_index = index_of(&self.elements, |e| &e.id, "element")?;
        self.section_index = index_of(&self.sections, |s| &s.id, "section")?;
        self.material_index = index_of(&self.materials, |m| &m.id, "material")?;
        Ok(())
    }

    fn validate(&self) -> EngineResult<()> {
        for section in &self.sections {
            section.validate()?;
        }
        for material in &self.materials {
            material.validate()?;
        }

        let case_ids: HashMap<&str, ()> =
            self.load_cases.iter().map(|c| (c.id.as_str(), ())).collect();

        for element in &self.elements {
            let start = self.node(&element.start_node)?;
            let end = self.node(&element.end_node)?;
            self.section(&element.section)?;
            self.material(&element.material)?;

            if element.start_node == element.end_node {
                return Err(EngineError::ModelInconsistent(format!(
                    "element '{}' connects node '{}' to itself",
                    element.id, element.start_node
                )));
            }
            if start.distance_to(end) < MIN_ELEMENT_LENGTH {
                return Err(EngineError::ModelInconsistent(format!(
                    "element '{}' has zero length",
                    element.id
                )));
            }
        }

        for load in &self.loads {
            match load {
                Load::Nodal(l) => {
                    self.node(&l.node)?;
                }
                Load::Distributed(l) => {
                    self.element(&l.element)?;
                    if !(0.0..=1.0).contains(&l.start)
                        || !(0.0..=1.0).contains(&l.end)
                        || l.end <= l.start
                    {
                        return Err(EngineError::ModelInconsistent(format!(
                            "distributed load on element '{}' has invalid span [{}, {}]",
                            l.element, l.start, l.end
                        )));
                    }
                }
            }
            if !case_ids.contains_key(load.case_id()) {
                return Err(EngineError::ModelMissing {
                    kind: "load case",
                    id: load.case_id().to_string(),
                });
            }
        }

        for combo in &self.load_combinations {
            for (case_id, _) in &combo.cases {
                if !case_ids.contains_key(case_id.as_str()) {
                    return Err(EngineError::ModelMissing {
                        kind: "load case",
                        id: case_id.clone(),
                    });
                }
            }
        }

        Ok(())
    }

    pub fn num_nodes(&self) -> usize {
        self.nodes.len()
    }

    pub fn node(&self, id: &str) -> EngineResult<&Node> {
        self.node_index
            .get(id)
            .map(|&i| &self.nodes[i])
            .ok_or_else(|| EngineError::ModelMissing {
                kind: "node",
                id: id.to_string(),
            })
    }

    pub fn node_position(&self, id: &str) -> EngineResult<usize> {
        self.node_index
            .get(id)
            .copied()
            .ok_or_else(|| EngineError::ModelMissing {
                kind: "node",
                id: id.to_string(),
            })
    }

    pub fn element_position(&self, id: &str) -> EngineResult<usize> {
        self.element_index
            .get(id)
            .copied()
            .ok_or_else(|| EngineError::ModelMissing {
                kind: "element",
                id: id.to_string(),
            })
    }

    pub fn element(&self, id: &str) -> EngineResult<&Element> {
        self.element_index
            .get(id)
            .map(|&i| &self.elements[i])
            .ok_or_else(|| EngineError::ModelMissing {
                kind: "element",
                id: id.to_string(),
            })
    }

    pub fn section(&self, id: &str) -> EngineResult<&Section> {
        self.section_index
            .get(id)
            .map(|&i| &self.sections[i])
            .ok_or_else(|| EngineError::ModelMissing {
                kind: "section",
                id: id.to_string(),
            })
    }

    pub fn material(&self, id: &str) -> EngineResult<&Material> {
        self.material_index
            .get(id)
            .map(|&i| &self.materials[i])
            .ok_or_else(|| EngineError::ModelMissing {
                kind: "material",
                id: id.to_string(),
            })
    }

    pub fn load_case(&self, id: &str) -> EngineResult<&LoadCase> {
        self.load_cases
            .iter()
            .find(|c| c.id == id)
            .ok_or_else(|| EngineError::ModelMissing {
                kind: "load case",
                id: id.to_string(),
            })
    }

    pub fn load_combination(&self, id: &str) -> EngineResult<&LoadCombination> {
        self.load_combinations
            .iter()
            .find(|c| c.id == id)
            .ok_or_else(|| EngineError::ModelMissing {
                kind: "load combination",
                id: id.to_string(),
            })
    }

    /// Loads belonging to one load case.
    pub fn loads_for_case<'a>(&'a self, case_id: &'a str) -> impl Iterator<Item = &'a Load> {
        self.loads.iter().filter(move |l| l.case_id() == case_id)
    }
}
