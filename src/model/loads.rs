//! Loads, load cases and load combinations

use serde::{Deserialize, Serialize};

/// A load case groups related loads under a common label.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoadCase {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

impl LoadCase {
    pub fn new(id: &str, name: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            description: None,
        }
    }

    pub fn with_description(mut self, description: &str) -> Self {
        self.description = Some(description.to_string());
        self
    }
}

/// An ordered linear combination of load cases.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoadCombination {
    pub id: String,
    pub name: String,
    /// (load_case_id, factor) pairs; factors may be negative
    pub cases: Vec<(String, f64)>,
}

impl LoadCombination {
    pub fn new(id: &str, name: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            cases: Vec::new(),
        }
    }

    pub fn with_case(mut self, case_id: &str, factor: f64) -> Self {
        self.cases.push((case_id.to_string(), factor));
        self
    }

    /// Total factor for a load case (pairs may repeat a case).
    pub fn factor(&self, case_id: &str) -> f64 {
        self.cases
            .iter()
            .filter(|(id, _)| id == case_id)
            .map(|(_, f)| f)
            .sum()
    }
}

/// A load applied directly to a node, in the global frame.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodalLoad {
    pub node: String,
    pub case: String,
    /// [fx, fy, fz, mx, my, mz] in N and N·m
    pub components: [f64; 6],
}

impl NodalLoad {
    pub fn new(node: &str, case: &str, components: [f64; 6]) -> Self {
        Self {
            node: node.to_string(),
            case: case.to_string(),
            components,
        }
    }

    pub fn force(node: &str, case: &str, fx: f64, fy: f64, fz: f64) -> Self {
        Self::new(node, case, [fx, fy, fz, 0.0, 0.0, 0.0])
    }

    pub fn moment(node: &str, case: &str, mx: f64, my: f64, mz: f64) -> Self {
        Self::new(node, case, [0.0, 0.0, 0.0, mx, my, mz])
    }
}

/// A linearly varying line load on an element, in the element local frame,
/// acting over the fraction interval `[start, end]` of the length.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DistributedLoad {
    pub element: String,
    pub case: String,
    /// Intensity at `start`, per local axis [wx, wy, wz] in N/m
    pub w_start: [f64; 3],
    /// Intensity at `end`
    pub w_end: [f64; 3],
    /// Start position as a fraction of the element length (0..=1)
    pub start: f64,
    /// End position as a fraction of the element length (0..=1)
    pub end: f64,
}

impl DistributedLoad {
    /// Uniform load over the full length.
    pub fn uniform(element: &str, case: &str, w: [f64; 3]) -> Self {
        Self {
            element: element.to_string(),
            case: case.to_string(),
            w_start: w,
            w_end: w,
            start: 0.0,
            end: 1.0,
        }
    }

    pub fn trapezoidal(
        element: &str,
        case: &str,
        w_start: [f64; 3],
        w_end: [f64; 3],
        start: f64,
        end: f64,
    ) -> Self {
        Self {
            element: element.to_string(),
            case: case.to_string(),
            w_start,
            w_end,
            start,
            end,
        }
    }

    pub fn is_uniform(&self) -> bool {
        self.w_start
            .iter()
            .zip(self.w_end.iter())
            .all(|(a, b)| (a - b).abs() < 1e-12)
            && self.start == 0.0
            && self.end == 1.0
    }
}

/// Any load in the model, tagged with its load case.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Load {
    Nodal(NodalLoad),
    Distributed(DistributedLoad),
}

impl Load {
    pub fn case_id(&self) -> &str {
        match self {
            Load::Nodal(l) => &l.case,
            Load::Distributed(l) => &l.case,
        }
    }
}
