//! Global assembly and boundary-condition reduction
//!
//! Element matrices are formed once per run and scattered into COO
//! triplets; reduction filters the triplets down to the free-DOF subspace.
//! Prescribed support displacements shift to the right-hand side during
//! reduction and come back in when the solution vector is inflated.

use nalgebra::DVector;
use nalgebra_sparse::CsrMatrix;

use crate::dof::{DofMap, DOF_PER_NODE};
use crate::error::EngineResult;
use crate::math::{self, Mat12, TripletBuilder, Vec12};
use crate::model::{Load, ModelSnapshot};

/// Per-element data computed once per run and reused across load cases.
pub struct ElementContext {
    /// Index into the snapshot's element list
    pub index: usize,
    /// Global DOF indices [start 0..6, end 0..6]
    pub dofs: [usize; 12],
    pub length: f64,
    /// Local stiffness after end-release condensation
    pub k_local: Mat12,
    /// Local stiffness before condensation (needed to condense FER vectors)
    pub k_local_raw: Mat12,
    /// Global-to-local transformation
    pub t: Mat12,
    /// Condensed stiffness in global coordinates
    pub k_global: Mat12,
    pub releases: [bool; 12],
    // Scalars used by mass assembly, P-Delta and stress recovery
    pub area: f64,
    pub iy: f64,
    pub iz: f64,
    pub sy: f64,
    pub sz: f64,
    pub rho: f64,
}

/// The assembled view of one snapshot: DOF numbering plus element contexts.
pub struct GlobalSystem<'s> {
    pub snapshot: &'s ModelSnapshot,
    pub dofs: DofMap,
    pub elements: Vec<ElementContext>,
}

impl<'s> GlobalSystem<'s> {
    pub fn new(snapshot: &'s ModelSnapshot) -> EngineResult<Self> {
        let dofs = DofMap::new(snapshot);
        let mut elements = Vec::with_capacity(snapshot.elements.len());

        for (index, element) in snapshot.elements.iter().enumerate() {
            let start = snapshot.node(&element.start_node)?;
            let end = snapshot.node(&element.end_node)?;
            let section = snapshot.section(&element.section)?;
            let material = snapshot.material(&element.material)?;

            let length = start.distance_to(end);
            let t = math::transformation_matrix(&start.coords(), &end.coords(), element.roll_angle);

            let k_local_raw = math::local_stiffness(
                material.e,
                material.g(),
                section.a,
                section.iy,
                section.iz,
                section.j,
                length,
            );
            let releases = element.releases.as_array();
            let k_local = math::apply_releases(&k_local_raw, &releases);
            let k_global = t.transpose() * k_local * t;

            let start_position = snapshot.node_position(&element.start_node)?;
            let end_position = snapshot.node_position(&element.end_node)?;

            elements.push(ElementContext {
                index,
                dofs: DofMap::element_dofs(start_position, end_position),
                length,
                k_local,
                k_local_raw,
                t,
                k_global,
                releases,
                area: section.a,
                iy: section.iy,
                iz: section.iz,
                sy: section.sy,
                sz: section.sz,
                rho: material.rho,
            });
        }

        Ok(Self {
            snapshot,
            dofs,
            elements,
        })
    }

    /// Assemble the global stiffness triplets, including grounded node
    /// springs on the diagonal.
    pub fn stiffness(&self) -> TripletBuilder {
        let mut builder = TripletBuilder::new(self.dofs.total());

        for context in &self.elements {
            builder.add_element(&context.dofs, &context.k_global);
        }

        for (i, node) in self.snapshot.nodes.iter().enumerate() {
            for d in 0..DOF_PER_NODE {
                let dof = DofMap::dof(i, d);
                if node.springs[d] > 0.0 && !self.dofs.is_constrained(dof) {
                    builder.add(dof, dof, node.springs[d]);
                }
            }
        }

        builder
    }

    /// Assemble the global consistent mass triplets.
    pub fn mass(&self) -> TripletBuilder {
        let mut builder = TripletBuilder::new(self.dofs.total());

        for context in &self.elements {
            let m_local = math::consistent_mass(
                context.rho,
                context.area,
                context.iy,
                context.iz,
                context.length,
            );
            let m_global = context.t.transpose() * m_local * context.t;
            builder.add_element(&context.dofs, &m_global);
        }

        builder
    }

    /// Assemble the geometric stiffness triplets given the elements'
    /// current axial forces (tension positive, snapshot element order).
    pub fn geometric_stiffness(&self, axial_forces: &[f64]) -> TripletBuilder {
        let mut builder = TripletBuilder::new(self.dofs.total());

        for context in &self.elements {
            let p = axial_forces[context.index];
            if p.abs() < 1e-10 {
                continue;
            }
            let kg_local =
                math::geometric_stiffness(p, context.area, context.iy, context.iz, context.length);
            let kg_global = context.t.transpose() * kg_local * context.t;
            builder.add_element(&context.dofs, &kg_global);
        }

        builder
    }

    /// Build the global load vector for a factored set of load cases.
    ///
    /// Returns the load vector and, per element, the accumulated local
    /// fixed-end forces (needed to recover member action later).
    pub fn load_vector(&self, factored_cases: &[(&str, f64)]) -> (DVector<f64>, Vec<Vec12>) {
        let mut f = DVector::zeros(self.dofs.total());
        let mut fixed_end = vec![Vec12::zeros(); self.elements.len()];

        for &(case_id, factor) in factored_cases {
            if factor.abs() < 1e-12 {
                continue;
            }

            for load in self.snapshot.loads_for_case(case_id) {
                match load {
                    Load::Nodal(nodal) => {
                        // Snapshot validation guarantees the node exists
                        let position = self
                            .snapshot
                            .node_position(&nodal.node)
                            .expect("validated snapshot");
                        for d in 0..DOF_PER_NODE {
                            f[DofMap::dof(position, d)] += factor * nodal.components[d];
                        }
                    }
                    Load::Distributed(dist) => {
                        let position = self
                            .snapshot
                            .element_position(&dist.element)
                            .expect("validated snapshot");
                        let context = &self.elements[position];

                        let l = context.length;
                        let x1 = dist.start * l;
                        let x2 = dist.end * l;

                        let mut fer = Vec12::zeros();
                        for axis in 0..3 {
                            let w1 = factor * dist.w_start[axis];
                            let w2 = factor * dist.w_end[axis];
                            if w1 == 0.0 && w2 == 0.0 {
                                continue;
                            }
                            fer += if dist.is_uniform() {
                                math::fer_uniform_load(w1, l, axis)
                            } else {
                                math::fer_linear_load(w1, w2, x1, x2, l, axis)
                            };
                        }

                        let fer = math::apply_fer_releases(&fer, &context.k_local_raw, &context.releases);
                        fixed_end[context.index] += fer;

                        // Fixed-end forces are reactions; the equivalent
                        // nodal loads are their negative.
                        let fer_global = context.t.transpose() * fer;
                        for (i, &dof) in context.dofs.iter().enumerate() {
                            f[dof] -= fer_global[i];
                        }
                    }
                }
            }
        }

        (f, fixed_end)
    }

    /// Reduce assembled triplets to the free-DOF subspace as CSR.
    pub fn reduce_matrix(&self, builder: &TripletBuilder) -> CsrMatrix<f64> {
        let mut reduced = TripletBuilder::new(self.dofs.num_free());
        for &(row, col, val) in builder.entries() {
            if let (Some(r), Some(c)) = (self.dofs.free_position(row), self.dofs.free_position(col))
            {
                reduced.add(r, c, val);
            }
        }
        reduced.to_csr()
    }

    /// Reduce the load vector, shifting prescribed-displacement terms
    /// `K[free, constrained] * u_c` to the right-hand side.
    pub fn reduce_vector(&self, f: &DVector<f64>, k: &TripletBuilder) -> DVector<f64> {
        let mut reduced = DVector::zeros(self.dofs.num_free());
        for (i, &dof) in self.dofs.free().iter().enumerate() {
            reduced[i] = f[dof];
        }

        if self.has_prescribed() {
            let u_c = self.prescribed_full();
            for &(row, col, val) in k.entries() {
                if let Some(r) = self.dofs.free_position(row) {
                    if self.dofs.is_constrained(col) && u_c[col] != 0.0 {
                        reduced[r] -= val * u_c[col];
                    }
                }
            }
        }

        reduced
    }

    fn has_prescribed(&self) -> bool {
        self.snapshot
            .nodes
            .iter()
            .any(|n| n.prescribed.iter().any(|&p| p != 0.0))
    }

    /// Full-length vector holding prescribed values at constrained DOFs.
    fn prescribed_full(&self) -> DVector<f64> {
        let mut u = DVector::zeros(self.dofs.total());
        for (i, node) in self.snapshot.nodes.iter().enumerate() {
            for d in 0..DOF_PER_NODE {
                if node.restraints[d] {
                    u[DofMap::dof(i, d)] = node.prescribed[d];
                }
            }
        }
        u
    }

    /// Inflate a reduced solution to the full DOF space, placing prescribed
    /// values at constrained DOFs.
    pub fn inflate(&self, u_reduced: &DVector<f64>) -> DVector<f64> {
        let mut u = self.prescribed_full();
        for (i, &dof) in self.dofs.free().iter().enumerate() {
            u[dof] = u_reduced[i];
        }
        u
    }

    /// Inflate a reduced mode shape to the full DOF space; constrained
    /// DOFs carry zero amplitude.
    pub fn inflate_mode(&self, phi_reduced: &DVector<f64>) -> DVector<f64> {
        let mut phi = DVector::zeros(self.dofs.total());
        for (i, &dof) in self.dofs.free().iter().enumerate() {
            phi[dof] = phi_reduced[i];
        }
        phi
    }

    /// Support reactions `R = K[c, :] * u - F[c]`, returned per support
    /// node in snapshot order.
    pub fn reactions(
        &self,
        k: &TripletBuilder,
        u: &DVector<f64>,
        f: &DVector<f64>,
    ) -> Vec<(usize, [f64; 6])> {
        let mut r = DVector::zeros(self.dofs.total());
        for &(row, col, val) in k.entries() {
            if self.dofs.is_constrained(row) {
                r[row] += val * u[col];
            }
        }
        for &dof in self.dofs.constrained() {
            r[dof] -= f[dof];
        }

        self.snapshot
            .nodes
            .iter()
            .enumerate()
            .filter(|(_, node)| node.is_support())
            .map(|(i, node)| {
                let mut reaction = [0.0; 6];
                for d in 0..DOF_PER_NODE {
                    if node.restraints[d] {
                        reaction[d] = r[DofMap::dof(i, d)];
                    }
                }
                (i, reaction)
            })
            .collect()
    }
}
