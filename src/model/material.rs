//! Material properties

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};

/// Isotropic linear-elastic material. Moduli and strengths are stored in Pa.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Material {
    pub id: String,
    /// Modulus of elasticity in Pa
    pub e: f64,
    /// Poisson's ratio
    pub nu: f64,
    /// Density in kg/m³
    pub rho: f64,
    /// Yield strength in Pa
    #[serde(default)]
    pub fy: Option<f64>,
    /// Ultimate strength in Pa
    #[serde(default)]
    pub fu: Option<f64>,
}

impl Material {
    pub fn new(id: &str, e: f64, nu: f64, rho: f64) -> Self {
        Self {
            id: id.to_string(),
            e,
            nu,
            rho,
            fy: None,
            fu: None,
        }
    }

    /// Construct from a modulus given in MPa (the input-layer unit).
    pub fn from_mpa(id: &str, e_mpa: f64, nu: f64, rho: f64) -> Self {
        Self::new(id, e_mpa * 1e6, nu, rho)
    }

    pub fn with_strengths(mut self, fy: f64, fu: f64) -> Self {
        self.fy = Some(fy);
        self.fu = Some(fu);
        self
    }

    /// Shear modulus, derived as E / (2(1+nu)).
    pub fn g(&self) -> f64 {
        self.e / (2.0 * (1.0 + self.nu))
    }

    /// Standard structural steel (S355-like)
    pub fn steel(id: &str) -> Self {
        Self {
            id: id.to_string(),
            e: 200e9,
            nu: 0.3,
            rho: 7850.0,
            fy: Some(355e6),
            fu: Some(490e6),
        }
    }

    /// Normal-weight concrete from compressive strength fc (Pa),
    /// E per the ACI correlation.
    pub fn concrete(id: &str, fc: f64) -> Self {
        let fc_mpa = fc / 1e6;
        let e = 4700.0 * fc_mpa.sqrt() * 1e6;
        Self {
            id: id.to_string(),
            e,
            nu: 0.2,
            rho: 2400.0,
            fy: None,
            fu: None,
        }
    }

    /// Aluminum 6061-T6
    pub fn aluminum(id: &str) -> Self {
        Self {
            id: id.to_string(),
            e: 68.9e9,
            nu: 0.33,
            rho: 2700.0,
            fy: Some(276e6),
            fu: Some(310e6),
        }
    }

    pub fn validate(&self) -> EngineResult<()> {
        if !(self.e > 0.0) {
            return Err(EngineError::ModelInconsistent(format!(
                "material '{}' has non-positive modulus ({})",
                self.id, self.e
            )));
        }
        if !(self.nu > 0.0 && self.nu < 0.5) {
            return Err(EngineError::ModelInconsistent(format!(
                "material '{}' has Poisson's ratio outside (0, 0.5) ({})",
                self.id, self.nu
            )));
        }
        if self.rho < 0.0 {
            return Err(EngineError::ModelInconsistent(format!(
                "material '{}' has negative density ({})",
                self.id, self.rho
            )));
        }
        Ok(())
    }
}
