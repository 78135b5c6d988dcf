//! Analysis drivers: linear static, P-Delta and modal
//!
//! The engine is a pure function of the snapshot: all per-run state lives
//! on the `Engine` value and is dropped at run end. There is no I/O here;
//! the runner feeds snapshots in and carries result batches out.

use log::{debug, info, warn};
use nalgebra::DVector;

use crate::analysis::AnalysisOptions;
use crate::assembly::GlobalSystem;
use crate::dof::{DofMap, DOF_PER_NODE};
use crate::error::{EngineError, EngineResult};
use crate::math::sparse::matvec;
use crate::math::{eigen, SkylineCholesky, SkylineLdlt, TripletBuilder, Vec12};
use crate::model::ModelSnapshot;
use crate::results::{CaseRef, ElementResult, ModalResult, ModeShapeEntry, NodeResult};

/// Pivot ratio below which the LDLT fallback reports a mechanism.
const PIVOT_RATIO_LIMIT: f64 = 1e-12;

const PA_TO_MPA: f64 = 1e-6;

/// Solution of one static case or combination.
pub struct StaticSolution {
    /// Full displacement vector (free and prescribed DOFs)
    pub displacement: DVector<f64>,
    pub node_results: Vec<NodeResult>,
    pub element_results: Vec<ElementResult>,
    /// Per-element axial force, tension positive (P-Delta feedback)
    pub axial_forces: Vec<f64>,
}

/// The numerical core bound to one snapshot.
pub struct Engine<'s> {
    system: GlobalSystem<'s>,
    analysis_id: String,
    options: AnalysisOptions,
}

impl<'s> Engine<'s> {
    pub fn new(
        snapshot: &'s ModelSnapshot,
        analysis_id: &str,
        options: AnalysisOptions,
    ) -> EngineResult<Self> {
        let system = GlobalSystem::new(snapshot)?;
        debug!(
            "engine ready: {} nodes, {} elements, {} free of {} DOFs",
            snapshot.num_nodes(),
            snapshot.elements.len(),
            system.dofs.num_free(),
            system.dofs.total()
        );
        Ok(Self {
            system,
            analysis_id: analysis_id.to_string(),
            options,
        })
    }

    pub fn dofs(&self) -> &DofMap {
        &self.system.dofs
    }

    /// Linear static solve for a factored set of load cases.
    pub fn solve_static(
        &self,
        case: &CaseRef,
        factored_cases: &[(&str, f64)],
    ) -> EngineResult<StaticSolution> {
        let k = self.system.stiffness();
        let (f, fixed_end) = self.system.load_vector(factored_cases);

        let u = self.solve_displacements(&k, &f)?;
        Ok(self.recover(case, &k, &f, u, &fixed_end))
    }

    /// Second-order solve: re-factor with the geometric stiffness of the
    /// current axial force state until displacements settle.
    pub fn solve_p_delta(
        &self,
        case: &CaseRef,
        factored_cases: &[(&str, f64)],
    ) -> EngineResult<StaticSolution> {
        let k = self.system.stiffness();
        let (f, fixed_end) = self.system.load_vector(factored_cases);

        let mut u = self.solve_displacements(&k, &f)?;
        let mut axial = self.axial_forces(&u, &fixed_end);

        for iteration in 0..self.options.max_iterations {
            let mut combined = self.system.stiffness();
            combined.extend_from(&self.system.geometric_stiffness(&axial));

            let u_next = self.solve_displacements(&combined, &f)?;

            let max_change = u_next
                .iter()
                .zip(u.iter())
                .map(|(a, b)| (a - b).abs())
                .fold(0.0_f64, f64::max);

            u = u_next;
            axial = self.axial_forces(&u, &fixed_end);

            if max_change < self.options.tolerance {
                debug!("P-Delta converged after {} iterations", iteration + 1);
                return Ok(self.recover(case, &combined, &f, u, &fixed_end));
            }
        }

        warn!(
            "P-Delta did not converge within {} iterations",
            self.options.max_iterations
        );
        Err(EngineError::Singular)
    }

    /// Modal solve: the `num_modes` lowest natural frequencies and shapes.
    pub fn solve_modal(&self, num_modes: usize) -> EngineResult<Vec<ModalResult>> {
        let k = self.system.stiffness();
        let m = self.system.mass();

        let k_reduced = self.system.reduce_matrix(&k);
        let m_reduced = self.system.reduce_matrix(&m);

        let wanted = num_modes.min(self.system.dofs.num_free());
        info!("extracting {} modes from {} free DOFs", wanted, self.system.dofs.num_free());

        let eig = eigen::solve_smallest(
            &k_reduced,
            &m_reduced,
            wanted,
            self.options.eigen_max_iterations,
            self.options.eigen_tolerance,
        )?;

        let rigid = self.rigid_body_vectors();

        let mut modes = Vec::with_capacity(eig.eigenvalues.len());
        for (i, (&lambda, phi)) in eig.eigenvalues.iter().zip(&eig.eigenvectors).enumerate() {
            if lambda <= 0.0 {
                return Err(EngineError::Singular);
            }

            let omega = lambda.sqrt();
            let frequency = omega / (2.0 * std::f64::consts::PI);

            let m_phi = matvec(&m_reduced, phi);
            let modal_mass = m_phi.dot(phi);

            let mut participation = [0.0; 6];
            let mut effective_mass = [0.0; 6];
            for d in 0..6 {
                let gamma = m_phi.dot(&rigid[d]);
                participation[d] = gamma;
                effective_mass[d] = gamma * gamma;
            }

            let full = self.system.inflate_mode(phi);
            let mode_shape = self
                .system
                .snapshot
                .nodes
                .iter()
                .enumerate()
                .map(|(n, node)| {
                    let mut amplitude = [0.0; 6];
                    for d in 0..DOF_PER_NODE {
                        amplitude[d] = full[DofMap::dof(n, d)];
                    }
                    ModeShapeEntry {
                        node_id: node.id.clone(),
                        amplitude,
                    }
                })
                .collect();

            modes.push(ModalResult {
                analysis_id: self.analysis_id.clone(),
                mode_number: i + 1,
                frequency,
                period: 1.0 / frequency,
                modal_mass,
                participation,
                effective_mass,
                mode_shape,
            });
        }

        Ok(modes)
    }

    /// Reduce, factor and solve, inflating back to the full DOF space.
    /// Falls back from Cholesky to LDLT on indefinite systems.
    fn solve_displacements(
        &self,
        k: &TripletBuilder,
        f: &DVector<f64>,
    ) -> EngineResult<DVector<f64>> {
        if self.system.dofs.num_free() == 0 {
            return Ok(self.system.inflate(&DVector::zeros(0)));
        }

        let k_reduced = self.system.reduce_matrix(k);
        let f_reduced = self.system.reduce_vector(f, k);

        let u_reduced = match SkylineCholesky::factor(&k_reduced) {
            Ok(factor) => factor.solve(&f_reduced),
            Err(reason) => {
                warn!("Cholesky failed ({reason}); mechanism suspect, retrying with LDLT");
                let ldlt = SkylineLdlt::factor(&k_reduced);
                let ratio = ldlt.pivot_ratio();
                if ratio < PIVOT_RATIO_LIMIT {
                    warn!("pivot ratio {ratio:.3e} below limit");
                    return Err(EngineError::Singular);
                }
                ldlt.solve(&f_reduced)
            }
        };

        Ok(self.system.inflate(&u_reduced))
    }

    /// Member end forces and stresses plus nodal records for one solution.
    fn recover(
        &self,
        case: &CaseRef,
        k: &TripletBuilder,
        f: &DVector<f64>,
        u: DVector<f64>,
        fixed_end: &[Vec12],
    ) -> StaticSolution {
        let snapshot = self.system.snapshot;

        let reactions = self.system.reactions(k, &u, f);
        let mut reaction_by_node = vec![None; snapshot.num_nodes()];
        for (node_index, reaction) in reactions {
            reaction_by_node[node_index] = Some(reaction);
        }

        let node_results = snapshot
            .nodes
            .iter()
            .enumerate()
            .map(|(n, node)| {
                let mut displacement = [0.0; 6];
                for d in 0..DOF_PER_NODE {
                    displacement[d] = u[DofMap::dof(n, d)];
                }
                NodeResult {
                    analysis_id: self.analysis_id.clone(),
                    node_id: node.id.clone(),
                    case: case.clone(),
                    displacement,
                    reaction: reaction_by_node[n],
                }
            })
            .collect();

        let mut element_results = Vec::with_capacity(snapshot.elements.len() * 2);
        let mut axial_forces = Vec::with_capacity(snapshot.elements.len());

        for context in &self.system.elements {
            let f_local = self.local_end_forces(context, &u, &fixed_end[context.index]);
            axial_forces.push(-f_local[0]);

            let element_id = &snapshot.elements[context.index].id;

            // Member-action convention: start-side values flip sign where
            // the end-side values do not, so tension and sagging read the
            // same at both ends.
            let ends = [
                (0.0, -f_local[0], f_local[1], f_local[2], -f_local[3], f_local[4], f_local[5]),
                (1.0, f_local[6], -f_local[7], -f_local[8], f_local[9], f_local[10], f_local[11]),
            ];

            for (position, axial, shear_y, shear_z, torsion, moment_y, moment_z) in ends {
                let axial_stress = axial / context.area * PA_TO_MPA;
                let bending_stress_y = moment_y / context.sy * PA_TO_MPA;
                let bending_stress_z = moment_z / context.sz * PA_TO_MPA;

                element_results.push(ElementResult {
                    analysis_id: self.analysis_id.clone(),
                    element_id: element_id.clone(),
                    case: case.clone(),
                    position,
                    axial_force: axial,
                    shear_y,
                    shear_z,
                    torsion,
                    moment_y,
                    moment_z,
                    axial_stress,
                    bending_stress_y,
                    bending_stress_z,
                    von_mises_stress: ElementResult::von_mises(
                        axial_stress,
                        bending_stress_y,
                        bending_stress_z,
                    ),
                });
            }
        }

        StaticSolution {
            displacement: u,
            node_results,
            element_results,
            axial_forces,
        }
    }

    fn local_end_forces(
        &self,
        context: &crate::assembly::ElementContext,
        u: &DVector<f64>,
        fixed_end: &Vec12,
    ) -> Vec12 {
        let mut u_element = Vec12::zeros();
        for (i, &dof) in context.dofs.iter().enumerate() {
            u_element[i] = u[dof];
        }
        let u_local = context.t * u_element;
        context.k_local * u_local + fixed_end
    }

    fn axial_forces(&self, u: &DVector<f64>, fixed_end: &[Vec12]) -> Vec<f64> {
        self.system
            .elements
            .iter()
            .map(|context| -self.local_end_forces(context, u, &fixed_end[context.index])[0])
            .collect()
    }

    /// Rigid-body vectors over the free DOFs: unit translations and unit
    /// rotations about the global origin.
    fn rigid_body_vectors(&self) -> [DVector<f64>; 6] {
        let dofs = &self.system.dofs;
        let mut vectors: [DVector<f64>; 6] =
            std::array::from_fn(|_| DVector::zeros(dofs.num_free()));

        for (n, node) in self.system.snapshot.nodes.iter().enumerate() {
            let p = node.coords();
            for d in 0..3 {
                // Unit translation along axis d
                if let Some(i) = dofs.free_position(DofMap::dof(n, d)) {
                    vectors[d][i] = 1.0;
                }

                // Unit rotation about axis d: translation e_d x p, rotation e_d
                let axis = match d {
                    0 => [1.0, 0.0, 0.0],
                    1 => [0.0, 1.0, 0.0],
                    _ => [0.0, 0.0, 1.0],
                };
                let cross = [
                    axis[1] * p[2] - axis[2] * p[1],
                    axis[2] * p[0] - axis[0] * p[2],
                    axis[0] * p[1] - axis[1] * p[0],
                ];
                for t in 0..3 {
                    if let Some(i) = dofs.free_position(DofMap::dof(n, t)) {
                        vectors[d + 3][i] += cross[t];
                    }
                }
                if let Some(i) = dofs.free_position(DofMap::dof(n, d + 3)) {
                    vectors[d + 3][i] = 1.0;
                }
            }
        }

        vectors
    }
}
