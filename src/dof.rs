//! Degree-of-freedom numbering
//!
//! Each node carries six DOFs ordered `[u_x, u_y, u_z, theta_x, theta_y,
//! theta_z]`; node order follows the snapshot. `dof = 6 * node_index + d`.

use crate::model::ModelSnapshot;

pub const DOF_PER_NODE: usize = 6;

/// Partition of the global DOF set into free and constrained subsets.
///
/// Both index lists are ascending; the ordering is an observable contract
/// used by result recovery.
#[derive(Debug, Clone)]
pub struct DofMap {
    total: usize,
    free: Vec<usize>,
    constrained: Vec<usize>,
    /// For each global DOF: position within its subset
    reduced_index: Vec<usize>,
    /// For each global DOF: whether it is constrained
    is_constrained: Vec<bool>,
}

impl DofMap {
    pub fn new(snapshot: &ModelSnapshot) -> Self {
        let total = snapshot.num_nodes() * DOF_PER_NODE;
        let mut free = Vec::with_capacity(total);
        let mut constrained = Vec::new();
        let mut reduced_index = vec![0usize; total];
        let mut is_constrained = vec![false; total];

        for (i, node) in snapshot.nodes.iter().enumerate() {
            for d in 0..DOF_PER_NODE {
                let dof = i * DOF_PER_NODE + d;
                if node.restraints[d] {
                    reduced_index[dof] = constrained.len();
                    is_constrained[dof] = true;
                    constrained.push(dof);
                } else {
                    reduced_index[dof] = free.len();
                    free.push(dof);
                }
            }
        }

        Self {
            total,
            free,
            constrained,
            reduced_index,
            is_constrained,
        }
    }

    pub fn total(&self) -> usize {
        self.total
    }

    pub fn num_free(&self) -> usize {
        self.free.len()
    }

    /// Ascending global indices of the free DOFs.
    pub fn free(&self) -> &[usize] {
        &self.free
    }

    /// Ascending global indices of the constrained DOFs.
    pub fn constrained(&self) -> &[usize] {
        &self.constrained
    }

    pub fn is_constrained(&self, dof: usize) -> bool {
        self.is_constrained[dof]
    }

    /// Position of a free DOF within the reduced system.
    pub fn free_position(&self, dof: usize) -> Option<usize> {
        if self.is_constrained[dof] {
            None
        } else {
            Some(self.reduced_index[dof])
        }
    }

    /// Position of a constrained DOF within the constrained subset.
    pub fn constrained_position(&self, dof: usize) -> Option<usize> {
        if self.is_constrained[dof] {
            Some(self.reduced_index[dof])
        } else {
            None
        }
    }

    /// Global DOF index for (node position, local direction).
    pub fn dof(node_position: usize, direction: usize) -> usize {
        node_position * DOF_PER_NODE + direction
    }

    /// The 12 global DOF indices of an element given its node positions.
    pub fn element_dofs(start_position: usize, end_position: usize) -> [usize; 12] {
        let mut dofs = [0usize; 12];
        for d in 0..DOF_PER_NODE {
            dofs[d] = start_position * DOF_PER_NODE + d;
            dofs[d + 6] = end_position * DOF_PER_NODE + d;
        }
        dofs
    }
}
