//! Serializable discretization options of a scalar equation.
use crate::error::CdoError;
use crate::hodge::{HodgeAlgorithm, HodgePairing, HodgeParam};
use log::warn;
use serde::{Deserialize, Serialize};

/// How Dirichlet boundary conditions enter the cellwise systems.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub enum DirichletEnforcement {
    /// Eliminate the Dirichlet degrees of freedom cell by cell: their rows become identity rows
    /// and their columns are moved to the right-hand side.
    Algebraic,
    /// Add `coef` on the diagonal and `coef * g` to the right-hand side.
    Penalization { coef: f64 },
    /// Nitsche's method: consistency and penalty terms on the Dirichlet faces.
    WeakNitsche { penalty: f64 },
    /// Symmetric Nitsche's method: consistency, symmetry and penalty terms.
    WeakSymmetric { penalty: f64 },
}

impl Default for DirichletEnforcement {
    fn default() -> Self {
        Self::Algebraic
    }
}

impl DirichletEnforcement {
    pub const DEFAULT_PENALIZATION_COEF: f64 = 1e12;

    pub fn penalization() -> Self {
        Self::Penalization {
            coef: Self::DEFAULT_PENALIZATION_COEF,
        }
    }

    pub fn is_weak(&self) -> bool {
        matches!(self, Self::WeakNitsche { .. } | Self::WeakSymmetric { .. })
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AdvectionFormulation {
    /// `div(beta u)`
    Conservative,
    /// `beta . grad(u)`
    NonConservative,
}

#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub enum AdvectionScheme {
    Centered,
    Upwind,
    /// Blend of the upwind and the centered schemes, with the given weight on the upwind part.
    Mixed { upwind_portion: f64 },
}

impl AdvectionScheme {
    pub fn upwind_portion(&self) -> f64 {
        match self {
            Self::Centered => 0.0,
            Self::Upwind => 1.0,
            Self::Mixed { upwind_portion } => *upwind_portion,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdvectionParam {
    pub formulation: AdvectionFormulation,
    pub scheme: AdvectionScheme,
}

impl Default for AdvectionParam {
    fn default() -> Self {
        Self {
            formulation: AdvectionFormulation::Conservative,
            scheme: AdvectionScheme::Upwind,
        }
    }
}

/// Parameters of the theta time scheme.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeParams {
    pub theta: f64,
    pub dt: f64,
    /// Use a lumped (diagonal) mass matrix.
    #[serde(default)]
    pub lumped_mass: bool,
}

impl TimeParams {
    pub fn implicit_euler(dt: f64) -> Self {
        Self {
            theta: 1.0,
            dt,
            lumped_mass: false,
        }
    }

    pub fn crank_nicolson(dt: f64) -> Self {
        Self {
            theta: 0.5,
            dt,
            lumped_mass: false,
        }
    }

    pub fn with_lumped_mass(self, lumped_mass: bool) -> Self {
        Self { lumped_mass, ..self }
    }
}

/// Condition applied to boundary faces that no zone definition covers.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DefaultBoundary {
    HomogeneousNeumann,
    HomogeneousDirichlet,
}

impl Default for DefaultBoundary {
    fn default() -> Self {
        Self::HomogeneousNeumann
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiscretizationParams {
    pub diffusion_hodge: HodgeParam,
    pub mass_hodge: HodgeParam,
    #[serde(default)]
    pub dirichlet: DirichletEnforcement,
    #[serde(default)]
    pub advection: AdvectionParam,
    /// Steady problems have no time parameters.
    #[serde(default)]
    pub time: Option<TimeParams>,
    #[serde(default)]
    pub default_boundary: DefaultBoundary,
}

impl Default for DiscretizationParams {
    fn default() -> Self {
        Self {
            diffusion_hodge: HodgeParam::dga(),
            mass_hodge: HodgeParam::wbs(),
            dirichlet: DirichletEnforcement::default(),
            advection: AdvectionParam::default(),
            time: None,
            default_boundary: DefaultBoundary::default(),
        }
    }
}

impl DiscretizationParams {
    pub fn with_diffusion_hodge(self, diffusion_hodge: HodgeParam) -> Self {
        Self {
            diffusion_hodge,
            ..self
        }
    }

    pub fn with_mass_hodge(self, mass_hodge: HodgeParam) -> Self {
        Self { mass_hodge, ..self }
    }

    pub fn with_dirichlet(self, dirichlet: DirichletEnforcement) -> Self {
        Self { dirichlet, ..self }
    }

    pub fn with_advection(self, advection: AdvectionParam) -> Self {
        Self { advection, ..self }
    }

    pub fn with_time(self, time: TimeParams) -> Self {
        Self {
            time: Some(time),
            ..self
        }
    }

    pub fn with_default_boundary(self, default_boundary: DefaultBoundary) -> Self {
        Self {
            default_boundary,
            ..self
        }
    }

    pub fn is_unsteady(&self) -> bool {
        self.time.is_some()
    }

    /// Check the options of the vertex-based scheme against each other.
    pub fn validate(&self) -> Result<(), CdoError> {
        self.diffusion_hodge.validate()?;
        if self.diffusion_hodge.pairing != HodgePairing::EdgePrimalFaceDual {
            return Err(CdoError::UnsupportedDiscretization(format!(
                "diffusion in vertex-based schemes needs the edge/dual face pairing, got {:?}",
                self.diffusion_hodge.pairing
            )));
        }

        self.mass_hodge.validate()?;
        if self.mass_hodge.pairing != HodgePairing::VertexPrimalCellDual {
            return Err(CdoError::UnsupportedDiscretization(format!(
                "mass matrices in vertex-based schemes need the vertex/dual cell pairing, got {:?}",
                self.mass_hodge.pairing
            )));
        }

        match self.dirichlet {
            DirichletEnforcement::Penalization { coef } => {
                if !(coef > 0.0) {
                    return Err(CdoError::UnsupportedDiscretization(format!(
                        "penalization coefficient must be positive, got {coef}"
                    )));
                }
                if coef < 1.0 {
                    warn!("Penalization coefficient {coef} is small, Dirichlet values will be poorly enforced");
                }
            }
            DirichletEnforcement::WeakNitsche { penalty } | DirichletEnforcement::WeakSymmetric { penalty } => {
                if !(penalty > 0.0) {
                    return Err(CdoError::UnsupportedDiscretization(format!(
                        "Nitsche penalty must be positive, got {penalty}"
                    )));
                }
            }
            DirichletEnforcement::Algebraic => {}
        }

        let upwind = self.advection.scheme.upwind_portion();
        if !(0.0..=1.0).contains(&upwind) {
            return Err(CdoError::UnsupportedDiscretization(format!(
                "upwind portion must lie in [0, 1], got {upwind}"
            )));
        }

        if let Some(time) = &self.time {
            if !(0.0..=1.0).contains(&time.theta) {
                return Err(CdoError::UnsupportedDiscretization(format!(
                    "theta must lie in [0, 1], got {}",
                    time.theta
                )));
            }
            if !(time.dt > 0.0) {
                return Err(CdoError::UnsupportedDiscretization(format!(
                    "time step must be positive, got {}",
                    time.dt
                )));
            }
        }
        Ok(())
    }

    /// Whether the mass matrix used by the time term is diagonal.
    pub fn has_diagonal_time_mass(&self) -> bool {
        self.time.map_or(false, |time| time.lumped_mass) || self.mass_hodge.algorithm == HodgeAlgorithm::Voronoi
    }
}
