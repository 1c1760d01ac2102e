use crate::hodge::{HodgeKernel, HodgeScratch};
use crate::local::{CellMesh, LocalMatrix};
use crate::property::scalar_value;
use nalgebra::Matrix3;

/// Mass matrix of the piecewise-linear reconstruction on the barycentric subdivision of a cell.
///
/// The cell is split into the tetrahedra `(v1, v2, x_f, x_c)`. On each of them, the
/// reconstruction of the vertex values is linear and interpolates the vertex values at `v1` and
/// `v2`, their `wvf`-weighted mean at `x_f` and their `wvc`-weighted mean at `x_c`. The exact
/// mass matrix of the P1 basis on a tetrahedron `T` is `|T| / 20 (1 + delta_ab)`.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct WbsHodge;

impl HodgeKernel for WbsHodge {
    fn compute(&self, cm: &CellMesh, tensor: &Matrix3<f64>, scratch: &mut HodgeScratch, hodge: &mut LocalMatrix) {
        let n = cm.n_vertices();
        hodge.reset_with_ids(cm.vertex_ids());
        let wvc = cm.wvc();
        let wvf = &mut scratch.weights[..n];
        let s = &mut scratch.sums[..n];

        let mut vol_total = 0.0;
        for f in 0..cm.n_faces() {
            let face_meas = cm.faces()[f].meas;
            let hf = cm.hfc()[f];

            wvf.fill(0.0);
            for (&e, &tef) in cm.face_edges(f).iter().zip(cm.face_edge_areas(f)) {
                let [v1, v2] = cm.edge_vertices(e);
                let w = 0.5 * tef / face_meas;
                wvf[v1] += w;
                wvf[v2] += w;
            }

            let mut vol_face = 0.0;
            for (&e, &tef) in cm.face_edges(f).iter().zip(cm.face_edge_areas(f)) {
                let [v1, v2] = cm.edge_vertices(e);
                let vol_t = tef * hf / 3.0;
                vol_face += vol_t;
                let coef = vol_t / 20.0;

                for k in 0..n {
                    s[k] = wvf[k] + wvc[k];
                }
                s[v1] += 1.0;
                s[v2] += 1.0;

                for i in 0..n {
                    let row = hodge.row_mut(i);
                    let si = coef * s[i];
                    for j in 0..n {
                        row[j] += si * s[j];
                    }
                }
                hodge[(v1, v1)] += coef;
                hodge[(v2, v2)] += coef;
            }

            let coef_face = vol_face / 20.0;
            for i in 0..n {
                let row = hodge.row_mut(i);
                let wi = coef_face * wvf[i];
                for j in 0..n {
                    row[j] += wi * wvf[j];
                }
            }
            vol_total += vol_face;
        }

        let coef_cell = vol_total / 20.0;
        for i in 0..n {
            let row = hodge.row_mut(i);
            let wi = coef_cell * wvc[i];
            for j in 0..n {
                row[j] += wi * wvc[j];
            }
        }

        hodge.scale(scalar_value(tensor));
    }
}
