//! Cellwise contributions of the terms of a scalar equation in the vertex-based scheme.
//!
//! Every function adds into a [`CellSystem`] whose rows and columns follow the local vertex
//! numbering of the [`CellMesh`] it was reset with.
use crate::assembly::boundary::{CellBoundaryView, DofFlag};
use crate::assembly::equation::{SourceDefinition, SourceReduction, SourceTerm};
use crate::assembly::params::{AdvectionFormulation, AdvectionParam, DirichletEnforcement, TimeParams};
use crate::assembly::system::CellSystem;
use crate::local::{CellMesh, FaceMesh, LocalMatrix};
use crate::property::eigen_ratio_and_max;
use crate::quadrature::{integrate_tetrahedron, QuadratureRule};
use nalgebra::{Matrix3, Point3, Vector3};

/// Scratch storage for the terms, sized for the largest cell of a mesh.
#[derive(Debug, Clone)]
pub(crate) struct TermScratch {
    advection: LocalMatrix,
    mass: LocalMatrix,
    gradient: Vec<Vector3<f64>>,
    normal_flux: Vec<f64>,
    values: Vec<f64>,
    products: Vec<f64>,
}

impl TermScratch {
    pub fn with_capacity(n_dofs: usize) -> Self {
        Self {
            advection: LocalMatrix::with_capacity(n_dofs),
            mass: LocalMatrix::with_capacity(n_dofs),
            gradient: vec![Vector3::zeros(); n_dofs],
            normal_flux: vec![0.0; n_dofs],
            values: vec![0.0; n_dofs],
            products: vec![0.0; n_dofs],
        }
    }
}

pub(crate) fn add_diffusion(stiffness: &LocalMatrix, csys: &mut CellSystem) {
    csys.mat.add_scaled(stiffness, 1.0);
}

pub(crate) fn add_reaction(unit_mass: &LocalMatrix, sigma: f64, csys: &mut CellSystem) {
    csys.mat.add_scaled(unit_mass, sigma);
}

/// Weights of the lower and the higher vertex of an edge in the value advected across its dual
/// face, for a flux `flux` oriented from the lower to the higher vertex.
fn upwind_weights(flux: f64, upwind_portion: f64) -> (f64, f64) {
    let centered = 0.5 * (1.0 - upwind_portion);
    if flux > 0.0 {
        (centered + upwind_portion, centered)
    } else {
        (centered, centered + upwind_portion)
    }
}

/// Advection across the dual faces of the cell. The cell view needs `EDGES | DUAL_FACES | EV`.
///
/// The non-conservative operator is the conservative one minus its row sums on the diagonal, so
/// that constants lie in its kernel.
pub(crate) fn add_advection(
    cm: &CellMesh,
    beta: &Vector3<f64>,
    param: &AdvectionParam,
    scratch: &mut TermScratch,
    csys: &mut CellSystem,
) {
    let adv = &mut scratch.advection;
    adv.reset_with_ids(cm.vertex_ids());
    let upwind_portion = param.scheme.upwind_portion();

    for (e, dual_face) in cm.dual_faces().iter().enumerate() {
        let flux = beta.dot(&dual_face.vector());
        if flux == 0.0 {
            continue;
        }
        let [a, b] = cm.edge_vertices(e);
        let (wa, wb) = upwind_weights(flux, upwind_portion);
        adv[(a, a)] += flux * wa;
        adv[(a, b)] += flux * wb;
        adv[(b, a)] -= flux * wa;
        adv[(b, b)] -= flux * wb;
    }

    if param.formulation == AdvectionFormulation::NonConservative {
        for i in 0..adv.n() {
            let sum: f64 = adv.row(i).iter().sum();
            adv[(i, i)] -= sum;
        }
    }
    csys.mat.add_scaled(adv, 1.0);
}

/// Inflow and outflow terms of the advection on a boundary face.
pub(crate) fn add_advection_face(
    fm: &FaceMesh,
    beta: &Vector3<f64>,
    formulation: AdvectionFormulation,
    view: &CellBoundaryView,
    csys: &mut CellSystem,
) {
    let face_flux = beta.dot(&fm.face().unitv) * fm.face().meas;
    if face_flux == 0.0 {
        return;
    }
    let flags = view.dof_flags();
    let g = view.dirichlet_values();

    for (&i, &w) in fm.cell_vertex_ids().iter().zip(fm.wvf()) {
        let flux = face_flux * w;
        let is_dirichlet = flags[i] == DofFlag::Dirichlet;
        match formulation {
            AdvectionFormulation::Conservative => {
                if flux < 0.0 && is_dirichlet {
                    csys.rhs[i] -= flux * g[i];
                } else {
                    csys.mat[(i, i)] += flux;
                }
            }
            AdvectionFormulation::NonConservative => {
                if flux < 0.0 && is_dirichlet {
                    csys.mat[(i, i)] -= flux;
                    csys.rhs[i] -= flux * g[i];
                }
            }
        }
    }
}

pub(crate) fn add_neumann_face(fm: &FaceMesh, g: f64, csys: &mut CellSystem) {
    let meas = fm.face().meas;
    for (&i, &w) in fm.cell_vertex_ids().iter().zip(fm.wvf()) {
        csys.rhs[i] += g * meas * w;
    }
}

pub(crate) fn add_robin_face(fm: &FaceMesh, alpha: f64, u0: f64, g: f64, csys: &mut CellSystem) {
    let meas = fm.face().meas;
    for (&i, &w) in fm.cell_vertex_ids().iter().zip(fm.wvf()) {
        csys.mat[(i, i)] += alpha * meas * w;
        csys.rhs[i] += (alpha * u0 - g) * meas * w;
    }
}

/// Reconstruct the cellwise constant gradient operator: `sum_j gradient[j] u_j` is the gradient
/// of the field with vertex values `u`.
///
/// The cell view needs `EDGES | DUAL_FACES | EV`.
pub(crate) fn reconstruct_gradient(cm: &CellMesh, scratch: &mut TermScratch) {
    let gradient = &mut scratch.gradient[..cm.n_vertices()];
    gradient.fill(Vector3::zeros());
    let inv_vol = 1.0 / cm.volume();
    for (e, dual_face) in cm.dual_faces().iter().enumerate() {
        let df = dual_face.vector() * inv_vol;
        for (&v, &sign) in cm.edge_vertices(e).iter().zip(&cm.edge_vertex_signs(e)) {
            gradient[v] += df * f64::from(sign);
        }
    }
}

/// Nitsche terms on a Dirichlet face.
///
/// [`reconstruct_gradient`] must have been called for the current cell. `tensor` is the
/// diffusion tensor of the cell.
pub(crate) fn add_nitsche_face(
    fm: &FaceMesh,
    tensor: &Matrix3<f64>,
    enforcement: DirichletEnforcement,
    view: &CellBoundaryView,
    scratch: &mut TermScratch,
    csys: &mut CellSystem,
) {
    let (penalty, symmetric) = match enforcement {
        DirichletEnforcement::WeakNitsche { penalty } => (penalty, false),
        DirichletEnforcement::WeakSymmetric { penalty } => (penalty, true),
        _ => return,
    };
    let n = csys.n_dofs();
    let meas = fm.face().meas;
    let g = view.dirichlet_values();

    // Normal flux K grad(u) . n of every vertex basis function, integrated over the face
    let kn = tensor * fm.face().unitv;
    let phi = &mut scratch.normal_flux[..n];
    for (p, gradient) in phi.iter_mut().zip(&scratch.gradient[..n]) {
        *p = meas * kn.dot(gradient);
    }

    let (ratio, max) = eigen_ratio_and_max(tensor);
    let pcoef = penalty * ratio * max / meas.sqrt();

    let mut weighted_g = 0.0;
    for (&i, &w) in fm.cell_vertex_ids().iter().zip(fm.wvf()) {
        for (a, p) in csys.mat.row_mut(i).iter_mut().zip(phi.iter()) {
            *a -= w * p;
        }
        if symmetric {
            for (j, p) in phi.iter().enumerate() {
                csys.mat[(j, i)] -= p * w;
            }
            weighted_g += w * g[i];
        }
        csys.mat[(i, i)] += pcoef * meas * w;
        csys.rhs[i] += pcoef * meas * w * g[i];
    }
    if symmetric {
        for (r, p) in csys.rhs[..n].iter_mut().zip(phi.iter()) {
            *r -= p * weighted_g;
        }
    }
}

/// Add `scale` times the reduction of `source` at time `t` to the source of the cell.
///
/// Dual-cell integration needs `DUAL_VOLUMES`, and additionally `FE | EV | HFC` with analytic
/// definitions integrated by a sub-tetrahedral rule. The mass matrix reduction needs the unit
/// property mass matrix of the cell.
pub(crate) fn add_source(
    cm: &CellMesh,
    source: &SourceTerm,
    unit_mass: &LocalMatrix,
    t: f64,
    scale: f64,
    scratch: &mut TermScratch,
    csys: &mut CellSystem,
) {
    let n = cm.n_vertices();
    let out = &mut csys.source[..n];
    match source.reduction {
        SourceReduction::DualCellIntegration => {
            let vol = cm.volume();
            match &source.definition {
                SourceDefinition::Constant(value) => add_uniform_source(cm, scale * value, out),
                SourceDefinition::PerCell(values) => add_uniform_source(cm, scale * values[cm.id()], out),
                SourceDefinition::PerVertex(values) => {
                    for ((o, &v), &w) in out.iter_mut().zip(cm.vertex_ids()).zip(cm.wvc()) {
                        *o += scale * values[v] * vol * w;
                    }
                }
                SourceDefinition::Analytic(function) => match source.rule {
                    QuadratureRule::Barycenter => add_uniform_source(cm, scale * function(cm.center(), t), out),
                    rule => integrate_over_dual_cells(cm, rule, |x| scale * function(x, t), out),
                },
            }
        }
        SourceReduction::MassMatrix => {
            let values = &mut scratch.values[..n];
            for (value, (&v, x)) in values
                .iter_mut()
                .zip(cm.vertex_ids().iter().zip(cm.vertex_coords()))
            {
                *value = match &source.definition {
                    SourceDefinition::Constant(s) => *s,
                    SourceDefinition::PerCell(s) => s[cm.id()],
                    SourceDefinition::PerVertex(s) => s[v],
                    SourceDefinition::Analytic(function) => function(x, t),
                };
            }
            let products = &mut scratch.products[..n];
            unit_mass.matvec(values, products);
            for (o, p) in out.iter_mut().zip(products.iter()) {
                *o += scale * p;
            }
        }
    }
}

fn add_uniform_source(cm: &CellMesh, value: f64, out: &mut [f64]) {
    let vol = cm.volume();
    for (o, &w) in out.iter_mut().zip(cm.wvc()) {
        *o += value * vol * w;
    }
}

/// Integrate `f` over the part of every dual cell inside the cell, split into the
/// sub-tetrahedra `(x_v, x_e, x_f, x_c)`.
fn integrate_over_dual_cells<F>(cm: &CellMesh, rule: QuadratureRule, f: F, out: &mut [f64])
where
    F: Fn(&Point3<f64>) -> f64,
{
    let xc = cm.center();
    for (k, face) in cm.faces().iter().enumerate() {
        let hf = cm.hfc()[k];
        for (&e, &tef) in cm.face_edges(k).iter().zip(cm.face_edge_areas(k)) {
            let xe = cm.edges()[e].center;
            let vol = tef * hf / 6.0;
            for v in cm.edge_vertices(e) {
                let tet = [cm.vertex_coords()[v], xe, face.center, *xc];
                out[v] += integrate_tetrahedron(rule, &tet, vol, &f);
            }
        }
    }
}

pub(crate) fn add_source_to_rhs(csys: &mut CellSystem) {
    let n = csys.n_dofs();
    for (r, s) in csys.rhs[..n].iter_mut().zip(&csys.source[..n]) {
        *r += s;
    }
}

/// Theta scheme for `rho du/dt + A u = b`, with `unit_mass` the mass matrix of the cell for a
/// unit property.
pub(crate) fn apply_theta_scheme(
    time: &TimeParams,
    rho: f64,
    unit_mass: &LocalMatrix,
    scratch: &mut TermScratch,
    csys: &mut CellSystem,
) {
    let n = csys.n_dofs();
    let mass = &mut scratch.mass;
    mass.copy_from(unit_mass);
    if time.lumped_mass {
        mass.lump();
    }
    mass.scale(rho / time.dt);

    let val_n = &csys.val_n[..n];
    let a_un = &mut scratch.values[..n];
    csys.mat.matvec(val_n, a_un);
    let m_un = &mut scratch.products[..n];
    mass.matvec(val_n, m_un);

    for ((r, m), a) in csys.rhs[..n].iter_mut().zip(m_un.iter()).zip(a_un.iter()) {
        *r += m - (1.0 - time.theta) * a;
    }
    csys.mat.scale(time.theta);
    csys.mat.add_scaled(mass, 1.0);
}

/// Eliminate the Dirichlet degrees of freedom of the cell: their columns move to the right-hand
/// side and their rows become identity rows.
pub(crate) fn apply_algebraic_dirichlet(view: &CellBoundaryView, csys: &mut CellSystem) {
    let n = csys.n_dofs();
    let flags = view.dof_flags();
    let g = view.dirichlet_values();

    for i in (0..n).filter(|&i| flags[i] == DofFlag::Dirichlet) {
        for j in (0..n).filter(|&j| flags[j] != DofFlag::Dirichlet) {
            csys.rhs[j] -= csys.mat[(j, i)] * g[i];
            csys.mat[(j, i)] = 0.0;
        }
    }
    for i in (0..n).filter(|&i| flags[i] == DofFlag::Dirichlet) {
        let row = csys.mat.row_mut(i);
        row.fill(0.0);
        row[i] = 1.0;
        csys.rhs[i] = g[i];
    }
}

pub(crate) fn apply_penalized_dirichlet(view: &CellBoundaryView, coef: f64, csys: &mut CellSystem) {
    let flags = view.dof_flags();
    let g = view.dirichlet_values();
    for i in (0..csys.n_dofs()).filter(|&i| flags[i] == DofFlag::Dirichlet) {
        csys.mat[(i, i)] += coef;
        csys.rhs[i] += coef * g[i];
    }
}
