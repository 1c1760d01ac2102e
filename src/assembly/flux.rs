//! Fluxes across dual faces, for post-processing.
use crate::assembly::equation::AdvectionField;
use crate::context::CdoContext;
use crate::local::{CellMesh, LocalMatrix};

/// Diffusive flux `-H G u` across the dual face of every edge of the cell, in the order of the
/// cell edges.
///
/// `hodge` is the edge/dual face Hodge matrix of the cell and `u` holds the values at all mesh
/// vertices. `gradient` is scratch storage for the edge circulations.
pub fn cell_diffusive_flux(cm: &CellMesh, hodge: &LocalMatrix, u: &[f64], gradient: &mut [f64], flux: &mut [f64]) {
    let n = cm.n_edges();
    let gradient = &mut gradient[..n];
    for (e, g) in gradient.iter_mut().enumerate() {
        let [a, b] = cm.edge_vertices(e);
        let [sa, sb] = cm.edge_vertex_signs(e);
        let ids = cm.vertex_ids();
        *g = f64::from(sa) * u[ids[a]] + f64::from(sb) * u[ids[b]];
    }
    hodge.matvec(gradient, &mut flux[..n]);
    flux[..n].iter_mut().for_each(|f| *f = -*f);
}

/// Advective flux `beta . df` across every dual face, stored in the order of the cell to edge
/// relation.
pub fn advective_fluxes(ctx: &CdoContext, field: &AdvectionField, t: f64) -> Vec<f64> {
    let c2e = ctx.connectivity().c2e();
    let quant = ctx.quantities();
    let mut flux = vec![0.0; c2e.n_entries()];
    for c in 0..c2e.len() {
        let beta = field.value_in_cell(c, quant.cell_center(c), t);
        let range = c2e.range(c);
        for (f, dual_face) in flux[range.clone()].iter_mut().zip(&quant.dual_faces()[range]) {
            *f = beta.dot(&dual_face.vector());
        }
    }
    flux
}
