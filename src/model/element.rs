//! Frame elements: straight prismatic members between two nodes

use serde::{Deserialize, Serialize};

/// End releases for an element (DOFs that transmit no force between the
/// member end and the node)
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct EndReleases {
    /// Start-node releases [u_x, u_y, u_z, theta_x, theta_y, theta_z]
    pub start: [bool; 6],
    /// End-node releases
    pub end: [bool; 6],
}

impl EndReleases {
    pub fn none() -> Self {
        Self::default()
    }

    /// Moment releases at the start node
    pub fn pin_start() -> Self {
        Self {
            start: [false, false, false, false, true, true],
            end: [false; 6],
        }
    }

    /// Moment releases at the end node
    pub fn pin_end() -> Self {
        Self {
            start: [false; 6],
            end: [false, false, false, false, true, true],
        }
    }

    pub fn pin_both() -> Self {
        Self {
            start: [false, false, false, false, true, true],
            end: [false, false, false, false, true, true],
        }
    }

    pub fn any(&self) -> bool {
        self.start.iter().chain(self.end.iter()).any(|&r| r)
    }

    /// Combined releases as a 12-element array in element DOF order.
    pub fn as_array(&self) -> [bool; 12] {
        let mut arr = [false; 12];
        arr[0..6].copy_from_slice(&self.start);
        arr[6..12].copy_from_slice(&self.end);
        arr
    }
}

/// A 3D frame element (beam or column)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Element {
    pub id: String,
    pub start_node: String,
    pub end_node: String,
    pub section: String,
    pub material: String,
    /// Rotation of the cross-section axes about the longitudinal axis
    /// (radians; input layers convert from degrees)
    #[serde(default)]
    pub roll_angle: f64,
    #[serde(default)]
    pub releases: EndReleases,
}

impl Element {
    pub fn new(id: &str, start_node: &str, end_node: &str, section: &str, material: &str) -> Self {
        Self {
            id: id.to_string(),
            start_node: start_node.to_string(),
            end_node: end_node.to_string(),
            section: section.to_string(),
            material: material.to_string(),
            roll_angle: 0.0,
            releases: EndReleases::none(),
        }
    }

    /// Set the roll angle in radians.
    pub fn with_roll(mut self, roll_angle: f64) -> Self {
        self.roll_angle = roll_angle;
        self
    }

    /// Set the roll angle in degrees (the input-layer unit).
    pub fn with_roll_deg(mut self, degrees: f64) -> Self {
        self.roll_angle = degrees.to_radians();
        self
    }

    pub fn with_releases(mut self, releases: EndReleases) -> Self {
        self.releases = releases;
        self
    }
}
