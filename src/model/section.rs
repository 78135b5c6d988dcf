//! Cross-section properties for frame elements

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};

/// Cross-section properties. All geometric values are in SI (m-based).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Section {
    pub id: String,
    /// Cross-sectional area in m²
    pub a: f64,
    /// Moment of inertia about local y in m⁴
    pub iy: f64,
    /// Moment of inertia about local z in m⁴
    pub iz: f64,
    /// Torsional constant in m⁴
    pub j: f64,
    /// Elastic section modulus about local y in m³
    pub sy: f64,
    /// Elastic section modulus about local z in m³
    pub sz: f64,
    /// Plastic section modulus about local y in m³
    #[serde(default)]
    pub zy: Option<f64>,
    /// Plastic section modulus about local z in m³
    #[serde(default)]
    pub zz: Option<f64>,
    /// Overall depth in m
    #[serde(default)]
    pub depth: Option<f64>,
    /// Overall width in m
    #[serde(default)]
    pub width: Option<f64>,
}

impl Section {
    pub fn new(id: &str, a: f64, iy: f64, iz: f64, j: f64, sy: f64, sz: f64) -> Self {
        Self {
            id: id.to_string(),
            a,
            iy,
            iz,
            j,
            sy,
            sz,
            zy: None,
            zz: None,
            depth: None,
            width: None,
        }
    }

    /// Rectangular solid section, width along local z, depth along local y.
    pub fn rectangular(id: &str, width: f64, depth: f64) -> Self {
        let a = width * depth;
        let iy = width * depth.powi(3) / 12.0;
        let iz = depth * width.powi(3) / 12.0;

        // Roark's approximation for a solid rectangle
        let (long, short) = if width > depth { (width, depth) } else { (depth, width) };
        let j = long * short.powi(3) / 3.0 * (1.0 - 0.63 * short / long);

        Self {
            id: id.to_string(),
            a,
            iy,
            iz,
            j,
            sy: iy / (depth / 2.0),
            sz: iz / (width / 2.0),
            zy: Some(width * depth.powi(2) / 4.0),
            zz: Some(depth * width.powi(2) / 4.0),
            depth: Some(depth),
            width: Some(width),
        }
    }

    /// Circular solid section.
    pub fn circular(id: &str, diameter: f64) -> Self {
        let r = diameter / 2.0;
        let a = std::f64::consts::PI * r.powi(2);
        let i = std::f64::consts::PI * r.powi(4) / 4.0;
        let j = std::f64::consts::PI * r.powi(4) / 2.0;
        let s = i / r;
        let z = 4.0 / 3.0 * r.powi(3);

        Self {
            id: id.to_string(),
            a,
            iy: i,
            iz: i,
            j,
            sy: s,
            sz: s,
            zy: Some(z),
            zz: Some(z),
            depth: Some(diameter),
            width: Some(diameter),
        }
    }

    /// Hollow circular (pipe) section.
    pub fn pipe(id: &str, outer_diameter: f64, wall_thickness: f64) -> Self {
        let r_o = outer_diameter / 2.0;
        let r_i = r_o - wall_thickness;

        let a = std::f64::consts::PI * (r_o.powi(2) - r_i.powi(2));
        let i = std::f64::consts::PI * (r_o.powi(4) - r_i.powi(4)) / 4.0;
        let j = std::f64::consts::PI * (r_o.powi(4) - r_i.powi(4)) / 2.0;
        let s = i / r_o;

        Self {
            id: id.to_string(),
            a,
            iy: i,
            iz: i,
            j,
            sy: s,
            sz: s,
            zy: None,
            zz: None,
            depth: Some(outer_diameter),
            width: Some(outer_diameter),
        }
    }

    /// Doubly-symmetric wide flange (I) section. Strong axis is local y.
    pub fn wide_flange(
        id: &str,
        depth: f64,
        flange_width: f64,
        flange_thickness: f64,
        web_thickness: f64,
    ) -> Self {
        let bf = flange_width;
        let tf = flange_thickness;
        let tw = web_thickness;
        let d = depth;
        let hw = d - 2.0 * tf;

        let a = 2.0 * bf * tf + hw * tw;
        let iy = (bf * d.powi(3) - (bf - tw) * hw.powi(3)) / 12.0;
        let iz = (2.0 * tf * bf.powi(3) + hw * tw.powi(3)) / 12.0;
        let j = (2.0 * bf * tf.powi(3) + hw * tw.powi(3)) / 3.0;

        let zy = bf * tf * (d - tf) + tw * hw.powi(2) / 4.0;
        let zz = tf * bf.powi(2) / 2.0 + hw * tw.powi(2) / 4.0;

        Self {
            id: id.to_string(),
            a,
            iy,
            iz,
            j,
            sy: iy / (d / 2.0),
            sz: iz / (bf / 2.0),
            zy: Some(zy),
            zz: Some(zz),
            depth: Some(d),
            width: Some(bf),
        }
    }

    /// Closed box/tube section.
    pub fn box_section(id: &str, width: f64, depth: f64, wall_thickness: f64) -> Self {
        let t = wall_thickness;
        let b = width;
        let d = depth;
        let bi = b - 2.0 * t;
        let di = d - 2.0 * t;

        let a = b * d - bi * di;
        let iy = (b * d.powi(3) - bi * di.powi(3)) / 12.0;
        let iz = (d * b.powi(3) - di * bi.powi(3)) / 12.0;

        // Closed thin-walled torsion constant
        let am = (b - t) * (d - t);
        let s = 2.0 * ((b - t) + (d - t));
        let j = 4.0 * am.powi(2) * t / s;

        Self {
            id: id.to_string(),
            a,
            iy,
            iz,
            j,
            sy: iy / (d / 2.0),
            sz: iz / (b / 2.0),
            zy: None,
            zz: None,
            depth: Some(d),
            width: Some(b),
        }
    }

    /// Radius of gyration about local y.
    pub fn ry(&self) -> f64 {
        (self.iy / self.a).sqrt()
    }

    /// Radius of gyration about local z.
    pub fn rz(&self) -> f64 {
        (self.iz / self.a).sqrt()
    }

    /// Polar moment of inertia.
    pub fn ip(&self) -> f64 {
        self.iy + self.iz
    }

    /// All geometric properties must be strictly positive.
    pub fn validate(&self) -> EngineResult<()> {
        let checks = [
            ("area", self.a),
            ("iy", self.iy),
            ("iz", self.iz),
            ("torsional constant", self.j),
            ("sy", self.sy),
            ("sz", self.sz),
        ];
        for (name, value) in checks {
            if !(value > 0.0) {
                return Err(EngineError::ModelInconsistent(format!(
                    "section '{}' has non-positive {} ({})",
                    self.id, name, value
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rectangular_section() {
        let section = Section::rectangular("R1", 0.3, 0.5);
        let expected_a = 0.3 * 0.5;
        let expected_iy = 0.3 * 0.5_f64.powi(3) / 12.0;

        assert!((section.a - expected_a).abs() < 1e-10);
        assert!((section.iy - expected_iy).abs() < 1e-10);
        assert!((section.sy - expected_iy / 0.25).abs() < 1e-10);
        assert!(section.validate().is_ok());
    }

    #[test]
    fn test_circular_section() {
        let section = Section::circular("C1", 0.5);
        let r = 0.25_f64;
        let expected_a = std::f64::consts::PI * r.powi(2);

        assert!((section.a - expected_a).abs() < 1e-10);
        assert!((section.iy - section.iz).abs() < 1e-10);
    }

    #[test]
    fn test_validate_rejects_non_positive() {
        let mut section = Section::rectangular("R1", 0.3, 0.5);
        section.j = 0.0;
        assert!(section.validate().is_err());
    }
}
