use crate::hodge::{HodgeKernel, HodgePairing, HodgeScratch};
use crate::local::{CellMesh, LocalMatrix};
use nalgebra::Matrix3;

/// The consistency/stabilization (COST) family of Hodge operators.
///
/// For each local entity `k` of the cell, `P_k` is the primal vector (edge tangent scaled by the
/// length, or face normal scaled by the area) and `Q_k` the dual vector of the pairing. With the
/// metric matrix `M_ij = Q_i^T K Q_j`, the transfer matrix `T_kj = P_k . Q_j`, `W = I - T / |c|`,
/// `alpha_k = P_k . Q_k` and the cell volume `|c|`, the operator reads
///
/// ```text
/// H = M / |c| + beta / (3 |c|) (2 M - (T^T M + M T) / |c|) + beta^2 / 3 W^T diag(M_kk / alpha_k) W
/// ```
///
/// The first term alone reproduces constant fields exactly because `sum_k Q_k P_k^T = |c| I`;
/// the other terms vanish on such fields and make the operator definite for `beta > 0`.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct CostHodge {
    pairing: HodgePairing,
    beta: f64,
}

impl CostHodge {
    pub fn new(pairing: HodgePairing, beta: f64) -> Self {
        debug_assert!(pairing != HodgePairing::VertexPrimalCellDual);
        Self { pairing, beta }
    }

    pub fn beta(&self) -> f64 {
        self.beta
    }
}

impl HodgeKernel for CostHodge {
    fn compute(&self, cm: &CellMesh, tensor: &Matrix3<f64>, scratch: &mut HodgeScratch, hodge: &mut LocalMatrix) {
        let n = match self.pairing {
            HodgePairing::EdgePrimalFaceDual => {
                for (k, (edge, dface)) in cm.edges().iter().zip(cm.dual_faces()).enumerate() {
                    scratch.primal[k] = edge.vector();
                    scratch.dual[k] = dface.vector();
                }
                hodge.reset_with_ids(cm.edge_ids());
                cm.n_edges()
            }
            _ => {
                for (k, (face, dedge)) in cm.faces().iter().zip(cm.dual_edges()).enumerate() {
                    scratch.primal[k] = face.vector();
                    scratch.dual[k] = dedge.vector();
                }
                hodge.reset_with_ids(cm.face_ids());
                cm.n_faces()
            }
        };

        let vol = cm.volume();
        let inv_vol = 1.0 / vol;
        let beta = self.beta;

        let metric = &mut scratch.metric;
        let transfer = &mut scratch.transfer;
        metric.reset(n);
        transfer.reset(n);
        for i in 0..n {
            let kq = tensor * scratch.dual[i];
            scratch.alpha[i] = scratch.primal[i].dot(&scratch.dual[i]);
            debug_assert!(scratch.alpha[i] > 0.0, "Primal and dual vectors are not aligned");
            for j in 0..n {
                metric[(j, i)] = scratch.dual[j].dot(&kq);
                transfer[(i, j)] = scratch.primal[i].dot(&scratch.dual[j]);
            }
        }

        let c_cons = inv_vol;
        let c_stab = beta * inv_vol / 3.0;
        let c_w = beta * beta / 3.0;

        for i in 0..n {
            for j in i..n {
                // (T^T M)_ij and (T^T M)_ji
                let mut x_ij = 0.0;
                let mut x_ji = 0.0;
                let mut wdw = 0.0;
                for k in 0..n {
                    x_ij += transfer[(k, i)] * metric[(k, j)];
                    x_ji += transfer[(k, j)] * metric[(k, i)];
                    let w_ki = f64::from(u8::from(k == i)) - transfer[(k, i)] * inv_vol;
                    let w_kj = f64::from(u8::from(k == j)) - transfer[(k, j)] * inv_vol;
                    wdw += w_ki * w_kj * metric[(k, k)] / scratch.alpha[k];
                }
                let m_ij = metric[(i, j)];
                let value = c_cons * m_ij + c_stab * (2.0 * m_ij - (x_ij + x_ji) * inv_vol) + c_w * wdw;
                hodge[(i, j)] = value;
                hodge[(j, i)] = value;
            }
        }
    }
}
