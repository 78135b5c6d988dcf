//! Load-combination superposition
//!
//! Static analysis is linear, so per-case results superpose component-wise
//! under the combination factors. The combiner never re-solves; it only
//! reads stored per-case batches. Von Mises stress is the one non-linear
//! quantity: it is recomputed from the superposed components, never summed
//! across cases.

use std::collections::HashMap;

use crate::model::LoadCombination;
use crate::results::{CaseRef, ElementResult, NodeResult};

fn scaled_add(target: &mut [f64; 6], source: &[f64; 6], factor: f64) {
    for (t, s) in target.iter_mut().zip(source.iter()) {
        *t += factor * s;
    }
}

/// Superpose stored per-case node results into combination results.
///
/// `per_case` holds the batches the static pass produced, in any order;
/// only records whose case appears in the combination contribute.
pub fn combine_node_results(
    combo: &LoadCombination,
    per_case: &[NodeResult],
) -> Vec<NodeResult> {
    // (case_id, node_id) -> record
    let mut by_key: HashMap<(&str, &str), &NodeResult> = HashMap::new();
    let mut node_order: Vec<&str> = Vec::new();
    let mut seen: HashMap<&str, ()> = HashMap::new();

    for record in per_case {
        if let CaseRef::Case(case_id) = &record.case {
            by_key.insert((case_id.as_str(), record.node_id.as_str()), record);
            if seen.insert(record.node_id.as_str(), ()).is_none() {
                node_order.push(record.node_id.as_str());
            }
        }
    }

    node_order
        .iter()
        .filter_map(|&node_id| {
            let mut displacement = [0.0; 6];
            let mut reaction = [0.0; 6];
            let mut has_reaction = false;
            let mut analysis_id = None;

            for (case_id, factor) in &combo.cases {
                let record = by_key.get(&(case_id.as_str(), node_id))?;
                analysis_id.get_or_insert_with(|| record.analysis_id.clone());
                scaled_add(&mut displacement, &record.displacement, *factor);
                if let Some(r) = &record.reaction {
                    scaled_add(&mut reaction, r, *factor);
                    has_reaction = true;
                }
            }

            Some(NodeResult {
                analysis_id: analysis_id?,
                node_id: node_id.to_string(),
                case: CaseRef::Combination(combo.id.clone()),
                displacement,
                reaction: has_reaction.then_some(reaction),
            })
        })
        .collect()
}

/// Superpose stored per-case element results into combination results.
pub fn combine_element_results(
    combo: &LoadCombination,
    per_case: &[ElementResult],
) -> Vec<ElementResult> {
    // (case_id, element_id, position at 0 or 1) -> record
    let mut by_key: HashMap<(&str, &str, bool), &ElementResult> = HashMap::new();
    let mut entity_order: Vec<(&str, bool)> = Vec::new();
    let mut seen: HashMap<(&str, bool), ()> = HashMap::new();

    for record in per_case {
        if let CaseRef::Case(case_id) = &record.case {
            let at_end = record.position > 0.5;
            by_key.insert((case_id.as_str(), record.element_id.as_str(), at_end), record);
            if seen.insert((record.element_id.as_str(), at_end), ()).is_none() {
                entity_order.push((record.element_id.as_str(), at_end));
            }
        }
    }

    entity_order
        .iter()
        .filter_map(|&(element_id, at_end)| {
            let mut forces = [0.0; 6];
            let mut stresses = [0.0; 3];
            let mut analysis_id = None;
            let mut position = 0.0;

            for (case_id, factor) in &combo.cases {
                let record = by_key.get(&(case_id.as_str(), element_id, at_end))?;
                analysis_id.get_or_insert_with(|| record.analysis_id.clone());
                position = record.position;

                forces[0] += factor * record.axial_force;
                forces[1] += factor * record.shear_y;
                forces[2] += factor * record.shear_z;
                forces[3] += factor * record.torsion;
                forces[4] += factor * record.moment_y;
                forces[5] += factor * record.moment_z;

                stresses[0] += factor * record.axial_stress;
                stresses[1] += factor * record.bending_stress_y;
                stresses[2] += factor * record.bending_stress_z;
            }

            Some(ElementResult {
                analysis_id: analysis_id?,
                element_id: element_id.to_string(),
                case: CaseRef::Combination(combo.id.clone()),
                position,
                axial_force: forces[0],
                shear_y: forces[1],
                shear_z: forces[2],
                torsion: forces[3],
                moment_y: forces[4],
                moment_z: forces[5],
                axial_stress: stresses[0],
                bending_stress_y: stresses[1],
                bending_stress_z: stresses[2],
                von_mises_stress: ElementResult::von_mises(stresses[0], stresses[1], stresses[2]),
            })
        })
        .collect()
}
