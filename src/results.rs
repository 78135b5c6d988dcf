//! Persisted result records
//!
//! Records are append-only and keyed by `(analysis, entity, CaseRef,
//! position)`; modal records by `(analysis, mode_number)`. Displacements
//! are in m/rad, forces in N, moments in N·m, stresses in MPa.

use serde::{Deserialize, Serialize};

/// The provenance of a static result: exactly one of a load case or a load
/// combination. Encoding this as an enum makes the exclusivity a schema
/// constraint rather than a pair of nullable columns.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum CaseRef {
    Case(String),
    Combination(String),
}

impl CaseRef {
    pub fn id(&self) -> &str {
        match self {
            CaseRef::Case(id) | CaseRef::Combination(id) => id,
        }
    }

    pub fn is_combination(&self) -> bool {
        matches!(self, CaseRef::Combination(_))
    }
}

/// Displacements and (for supports) reactions at a node.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeResult {
    pub analysis_id: String,
    pub node_id: String,
    pub case: CaseRef,
    /// [dx, dy, dz, rx, ry, rz] in m and rad
    pub displacement: [f64; 6],
    /// [fx, fy, fz, mx, my, mz] in N and N·m; None for unsupported nodes
    pub reaction: Option<[f64; 6]>,
}

/// Internal member forces and stresses at a position along an element.
///
/// Member-action sign convention: axial tension positive, consistent at
/// both ends of the member.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ElementResult {
    pub analysis_id: String,
    pub element_id: String,
    pub case: CaseRef,
    /// Position along the element as a fraction of its length (0 or 1)
    pub position: f64,
    /// Axial force in N, tension positive
    pub axial_force: f64,
    pub shear_y: f64,
    pub shear_z: f64,
    pub torsion: f64,
    pub moment_y: f64,
    pub moment_z: f64,
    /// Axial stress in MPa
    pub axial_stress: f64,
    pub bending_stress_y: f64,
    pub bending_stress_z: f64,
    pub von_mises_stress: f64,
}

impl ElementResult {
    /// Combined stress from axial and bending components (MPa in, MPa out).
    pub fn von_mises(axial: f64, bending_y: f64, bending_z: f64) -> f64 {
        (axial.powi(2) + 3.0 * (bending_y.powi(2) + bending_z.powi(2))).sqrt()
    }
}

/// Mode shape entry for one node.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModeShapeEntry {
    pub node_id: String,
    /// [dx, dy, dz, rx, ry, rz], M-normalized amplitude
    pub amplitude: [f64; 6],
}

/// One natural mode of the structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModalResult {
    pub analysis_id: String,
    /// 1-based mode number, ascending in frequency
    pub mode_number: usize,
    /// Natural frequency in Hz
    pub frequency: f64,
    /// Period in s
    pub period: f64,
    /// Generalized mass, 1.0 under M-normalization
    pub modal_mass: f64,
    /// Participation factors for the six rigid-body directions
    /// [x, y, z, rx, ry, rz]
    pub participation: [f64; 6],
    /// Effective modal mass per direction (participation squared)
    pub effective_mass: [f64; 6],
    pub mode_shape: Vec<ModeShapeEntry>,
}

impl ModalResult {
    pub fn angular_frequency(&self) -> f64 {
        2.0 * std::f64::consts::PI * self.frequency
    }
}
