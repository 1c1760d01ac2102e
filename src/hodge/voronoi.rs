use crate::hodge::{HodgeKernel, HodgePairing, HodgeScratch};
use crate::local::{CellMesh, LocalMatrix};
use crate::property::scalar_value;
use nalgebra::{Matrix3, Vector3};

/// Diagonal Hodge operators.
///
/// For the edge and face pairings, each entry is the dual measure weighted by the property in the
/// dual direction, divided by the primal measure. For the vertex pairing, each entry is the
/// property value times the volume of the dual cell portion.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct VoronoiHodge {
    pairing: HodgePairing,
}

impl VoronoiHodge {
    pub fn new(pairing: HodgePairing) -> Self {
        Self { pairing }
    }
}

fn weighted_ratio(dual: Vector3<f64>, primal_meas: f64, tensor: &Matrix3<f64>) -> f64 {
    let dual_meas = dual.norm();
    let u = dual / dual_meas;
    dual_meas * u.dot(&(tensor * u)) / primal_meas
}

impl HodgeKernel for VoronoiHodge {
    fn compute(&self, cm: &CellMesh, tensor: &Matrix3<f64>, _scratch: &mut HodgeScratch, hodge: &mut LocalMatrix) {
        match self.pairing {
            HodgePairing::EdgePrimalFaceDual => {
                hodge.reset_with_ids(cm.edge_ids());
                for (k, (edge, dface)) in cm.edges().iter().zip(cm.dual_faces()).enumerate() {
                    hodge[(k, k)] = weighted_ratio(dface.vector(), edge.meas, tensor);
                }
            }
            HodgePairing::FacePrimalEdgeDual => {
                hodge.reset_with_ids(cm.face_ids());
                for (k, (face, dedge)) in cm.faces().iter().zip(cm.dual_edges()).enumerate() {
                    hodge[(k, k)] = weighted_ratio(dedge.vector(), face.meas, tensor);
                }
            }
            HodgePairing::VertexPrimalCellDual => {
                hodge.reset_with_ids(cm.vertex_ids());
                let value = scalar_value(tensor) * cm.volume();
                for (k, wvc) in cm.wvc().iter().enumerate() {
                    hodge[(k, k)] = value * wvc;
                }
            }
        }
    }
}
