//! Discrete Hodge operators.
//!
//! A discrete Hodge operator maps the degrees of freedom attached to one family of primal
//! entities of a cell onto the dual entities of the same cell, weighted by a material property.
//! The pairing ([`HodgePairing`]) fixes the two families, the algorithm ([`HodgeAlgorithm`])
//! fixes how the small dense matrix is computed.
//!
//! The combination is checked once when a [`HodgeBuilder`] is created. Each family of algorithms
//! implements [`HodgeKernel`], and the builder dispatches to it through [`HodgeStrategy`].
use crate::connectivity::MeshMaxima;
use crate::error::CdoError;
use crate::local::{CellMesh, CellMeshFlag, LocalMatrix};
use crate::property::Property;
use log::warn;
use nalgebra::{Matrix3, Vector3};
use serde::{Deserialize, Serialize};

mod cost;
mod voronoi;
mod wbs;

pub use cost::CostHodge;
pub use voronoi::VoronoiHodge;
pub use wbs::WbsHodge;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HodgePairing {
    /// Edge circulations to dual face fluxes. Used for diffusion in vertex-based schemes.
    EdgePrimalFaceDual,
    /// Face fluxes to dual edge circulations.
    FacePrimalEdgeDual,
    /// Vertex values to dual cell integrals. Mass matrices of vertex-based schemes.
    VertexPrimalCellDual,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HodgeAlgorithm {
    Voronoi,
    Cost,
    Wbs,
}

/// Configuration of a discrete Hodge operator.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct HodgeParam {
    pub pairing: HodgePairing,
    pub algorithm: HodgeAlgorithm,
    /// Stabilization coefficient, only used by [`HodgeAlgorithm::Cost`].
    #[serde(default)]
    pub beta: f64,
    /// Use the inverse of the property tensor.
    #[serde(default)]
    pub inverse_property: bool,
}

impl Default for HodgeParam {
    fn default() -> Self {
        Self::dga()
    }
}

impl HodgeParam {
    pub fn cost(pairing: HodgePairing, beta: f64) -> Self {
        Self {
            pairing,
            algorithm: HodgeAlgorithm::Cost,
            beta,
            inverse_property: false,
        }
    }

    /// COST with the coefficient of the discrete geometric approach, for the edge/face pairing.
    pub fn dga() -> Self {
        Self::cost(HodgePairing::EdgePrimalFaceDual, 1.0 / 3.0)
    }

    /// COST with the coefficient of the SUSHI scheme, for the edge/face pairing.
    pub fn sushi() -> Self {
        Self::cost(HodgePairing::EdgePrimalFaceDual, 1.0 / 3f64.sqrt())
    }

    /// COST with the coefficient of the generalized Crouzeix-Raviart scheme, for the edge/face
    /// pairing.
    pub fn gcr() -> Self {
        Self::cost(HodgePairing::EdgePrimalFaceDual, 1.0)
    }

    pub fn voronoi(pairing: HodgePairing) -> Self {
        Self {
            pairing,
            algorithm: HodgeAlgorithm::Voronoi,
            beta: 0.0,
            inverse_property: false,
        }
    }

    pub fn wbs() -> Self {
        Self {
            pairing: HodgePairing::VertexPrimalCellDual,
            algorithm: HodgeAlgorithm::Wbs,
            beta: 0.0,
            inverse_property: false,
        }
    }

    pub fn with_pairing(self, pairing: HodgePairing) -> Self {
        Self { pairing, ..self }
    }

    pub fn with_beta(self, beta: f64) -> Self {
        Self { beta, ..self }
    }

    pub fn with_inverse_property(self, inverse_property: bool) -> Self {
        Self {
            inverse_property,
            ..self
        }
    }

    pub fn is_supported(&self) -> bool {
        use HodgeAlgorithm::*;
        use HodgePairing::*;
        match (self.algorithm, self.pairing) {
            (Voronoi, _) => true,
            (Cost, EdgePrimalFaceDual | FacePrimalEdgeDual) => true,
            (Wbs, VertexPrimalCellDual) => true,
            _ => false,
        }
    }

    pub fn validate(&self) -> Result<(), CdoError> {
        if !self.is_supported() {
            return Err(CdoError::UnsupportedHodge {
                pairing: self.pairing,
                algorithm: self.algorithm,
            });
        }
        if self.algorithm == HodgeAlgorithm::Cost {
            if !self.beta.is_finite() || self.beta < 0.0 {
                return Err(CdoError::InvalidHodgeParam(format!(
                    "COST stabilization coefficient must be finite and non-negative, got {}",
                    self.beta
                )));
            }
            if self.beta == 0.0 {
                warn!("COST Hodge operator with beta = 0 is consistent but not stable");
            }
        }
        Ok(())
    }

    /// Parts of the cell view needed to build the operator.
    pub fn required_flag(&self) -> CellMeshFlag {
        use HodgePairing::*;
        match (self.pairing, self.algorithm) {
            (EdgePrimalFaceDual, _) => CellMeshFlag::EDGES | CellMeshFlag::DUAL_FACES | CellMeshFlag::EV,
            (FacePrimalEdgeDual, _) => CellMeshFlag::FACES | CellMeshFlag::DUAL_EDGES,
            (VertexPrimalCellDual, HodgeAlgorithm::Wbs) => {
                CellMeshFlag::VERTICES
                    | CellMeshFlag::DUAL_VOLUMES
                    | CellMeshFlag::FE
                    | CellMeshFlag::EV
                    | CellMeshFlag::HFC
            }
            (VertexPrimalCellDual, _) => CellMeshFlag::VERTICES | CellMeshFlag::DUAL_VOLUMES,
        }
    }
}

/// Scratch storage shared by the kernels, sized for the largest cell of a mesh.
#[derive(Debug, Clone)]
pub struct HodgeScratch {
    pub(crate) primal: Vec<Vector3<f64>>,
    pub(crate) dual: Vec<Vector3<f64>>,
    pub(crate) alpha: Vec<f64>,
    pub(crate) metric: LocalMatrix,
    pub(crate) transfer: LocalMatrix,
    pub(crate) weights: Vec<f64>,
    pub(crate) sums: Vec<f64>,
}

impl HodgeScratch {
    pub fn with_capacity(maxima: &MeshMaxima) -> Self {
        let n = maxima.n_entities_per_cell();
        Self {
            primal: vec![Vector3::zeros(); n],
            dual: vec![Vector3::zeros(); n],
            alpha: vec![0.0; n],
            metric: LocalMatrix::with_capacity(n),
            transfer: LocalMatrix::with_capacity(n),
            weights: vec![0.0; n],
            sums: vec![0.0; n],
        }
    }
}

/// One family of algorithms computing the local Hodge matrix of a cell.
pub trait HodgeKernel {
    /// Compute the operator of cell `cm` for the property `tensor` into `hodge`.
    ///
    /// The logical size and the ids of `hodge` are set by the kernel.
    fn compute(&self, cm: &CellMesh, tensor: &Matrix3<f64>, scratch: &mut HodgeScratch, hodge: &mut LocalMatrix);
}

/// The kernel selected for a [`HodgeParam`], resolved once at setup.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum HodgeStrategy {
    Cost(CostHodge),
    Wbs(WbsHodge),
    Voronoi(VoronoiHodge),
}

impl HodgeStrategy {
    pub fn from_param(param: &HodgeParam) -> Result<Self, CdoError> {
        param.validate()?;
        Ok(match param.algorithm {
            HodgeAlgorithm::Cost => Self::Cost(CostHodge::new(param.pairing, param.beta)),
            HodgeAlgorithm::Wbs => Self::Wbs(WbsHodge),
            HodgeAlgorithm::Voronoi => Self::Voronoi(VoronoiHodge::new(param.pairing)),
        })
    }
}

impl HodgeKernel for HodgeStrategy {
    fn compute(&self, cm: &CellMesh, tensor: &Matrix3<f64>, scratch: &mut HodgeScratch, hodge: &mut LocalMatrix) {
        match self {
            Self::Cost(kernel) => kernel.compute(cm, tensor, scratch, hodge),
            Self::Wbs(kernel) => kernel.compute(cm, tensor, scratch, hodge),
            Self::Voronoi(kernel) => kernel.compute(cm, tensor, scratch, hodge),
        }
    }
}

/// Builds the local Hodge (and stiffness) matrices of cells for one configuration and one
/// property.
///
/// A uniform property is fetched once when it is set. A non-uniform property is refreshed per
/// cell by [`HodgeBuilder::set_property_in_cell`].
#[derive(Debug, Clone)]
pub struct HodgeBuilder {
    param: HodgeParam,
    strategy: HodgeStrategy,
    property: Option<Property>,
    tensor: Matrix3<f64>,
    scratch: HodgeScratch,
    hodge: LocalMatrix,
    stiffness: LocalMatrix,
}

impl HodgeBuilder {
    pub fn new(param: HodgeParam, maxima: &MeshMaxima) -> Result<Self, CdoError> {
        let strategy = HodgeStrategy::from_param(&param)?;
        Ok(Self {
            param,
            strategy,
            property: None,
            tensor: Matrix3::identity(),
            scratch: HodgeScratch::with_capacity(maxima),
            hodge: LocalMatrix::with_capacity(maxima.n_entities_per_cell()),
            stiffness: LocalMatrix::with_capacity(maxima.n_vertices_per_cell),
        })
    }

    pub fn with_property(mut self, property: Option<Property>) -> Self {
        self.set_property(property);
        self
    }

    /// Attach a property. Without a property, the identity tensor is used.
    pub fn set_property(&mut self, property: Option<Property>) {
        self.tensor = Matrix3::identity();
        if let Some(property) = &property {
            if property.is_uniform() {
                // The position and time are irrelevant for uniform definitions
                let tensor = property.tensor_in_cell(0, &nalgebra::Point3::origin(), 0.0);
                self.tensor = self.prepare_tensor(tensor);
            }
        }
        self.property = property;
    }

    /// Refresh the property tensor for the cell `cm` at time `t` if the property varies in space.
    pub fn set_property_in_cell(&mut self, cm: &CellMesh, t: f64) {
        if let Some(property) = &self.property {
            if !property.is_uniform() {
                let tensor = property.tensor_in_cell(cm.id(), cm.center(), t);
                self.tensor = self.prepare_tensor(tensor);
            }
        }
    }

    fn prepare_tensor(&self, tensor: Matrix3<f64>) -> Matrix3<f64> {
        if self.param.inverse_property {
            let inverse = tensor.try_inverse();
            debug_assert!(inverse.is_some(), "Property tensor is not invertible");
            inverse.unwrap_or_else(|| Matrix3::from_element(f64::NAN))
        } else {
            tensor
        }
    }

    pub fn param(&self) -> &HodgeParam {
        &self.param
    }

    pub fn strategy(&self) -> &HodgeStrategy {
        &self.strategy
    }

    pub fn property(&self) -> Option<&Property> {
        self.property.as_ref()
    }

    /// The tensor currently in use (after inversion, if requested).
    pub fn tensor(&self) -> &Matrix3<f64> {
        &self.tensor
    }

    pub fn required_flag(&self) -> CellMeshFlag {
        self.param.required_flag()
    }

    /// Build the Hodge matrix of the cell with the current property tensor.
    pub fn build(&mut self, cm: &CellMesh) -> &LocalMatrix {
        debug_assert!(cm.flag().contains(self.param.required_flag()));
        self.strategy
            .compute(cm, &self.tensor, &mut self.scratch, &mut self.hodge);
        &self.hodge
    }

    /// The matrix computed by the last call to [`HodgeBuilder::build`].
    pub fn hodge(&self) -> &LocalMatrix {
        &self.hodge
    }

    /// Build the stiffness matrix `G^T H G` of the cell, with `G` the local edge to vertex
    /// incidence.
    ///
    /// # Panics
    ///
    /// Panics if the pairing is not [`HodgePairing::EdgePrimalFaceDual`].
    pub fn build_stiffness(&mut self, cm: &CellMesh) -> &LocalMatrix {
        assert_eq!(
            self.param.pairing,
            HodgePairing::EdgePrimalFaceDual,
            "Stiffness matrices need the edge/dual face pairing"
        );
        self.build(cm);

        let hodge = &self.hodge;
        let stiffness = &mut self.stiffness;
        stiffness.reset_with_ids(cm.vertex_ids());
        for i in 0..cm.n_edges() {
            let [a1, a2] = cm.edge_vertices(i);
            let [s1, s2] = cm.edge_vertex_signs(i);
            for (j, &h) in hodge.row(i).iter().enumerate() {
                if h == 0.0 {
                    continue;
                }
                let [b1, b2] = cm.edge_vertices(j);
                let [t1, t2] = cm.edge_vertex_signs(j);
                stiffness[(a1, b1)] += f64::from(s1 * t1) * h;
                stiffness[(a1, b2)] += f64::from(s1 * t2) * h;
                stiffness[(a2, b1)] += f64::from(s2 * t1) * h;
                stiffness[(a2, b2)] += f64::from(s2 * t2) * h;
            }
        }
        &self.stiffness
    }

    /// The matrix computed by the last call to [`HodgeBuilder::build_stiffness`].
    pub fn stiffness(&self) -> &LocalMatrix {
        &self.stiffness
    }
}
