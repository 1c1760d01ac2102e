//! The cellwise assembler of the vertex-based scheme.
use crate::assembly::boundary::{BoundaryCondition, BoundaryFaceMap, CellBoundaryView, VertexBoundaryValues};
use crate::assembly::equation::{AdvectionField, ScalarEquation, SourceDefinition, SourceReduction};
use crate::assembly::flux;
use crate::assembly::global::{add_local_row_to_csr_row, assemble_pattern, sorted_permutation, AssembledSystem};
use crate::assembly::params::DirichletEnforcement;
use crate::assembly::system::CellSystem;
use crate::assembly::terms::{self, TermScratch};
use crate::context::CdoContext;
use crate::error::CdoError;
use crate::hodge::HodgeBuilder;
use crate::interface::InterfaceReduction;
use crate::local::{CellMesh, CellMeshFlag, FaceMesh};
use crate::property::Property;
use crate::quadrature::QuadratureRule;
use crate::workspace::ScratchPool;
use log::{debug, info};
use nalgebra::DVector;
use nalgebra_sparse::pattern::SparsityPattern;
use nalgebra_sparse::CsrMatrix;
use polycdo_paradis::coloring::sequential_greedy_coloring;
use polycdo_paradis::{DisjointSubsets, ParallelSliceAccess};
use rayon::prelude::*;

/// Time and previous values of one assembly.
#[derive(Debug, Copy, Clone)]
pub struct StepState<'s> {
    /// Time at which the system is assembled (the end of the step for unsteady problems).
    pub t: f64,
    /// Values at all mesh vertices at the previous time step.
    pub previous: Option<&'s [f64]>,
}

impl<'s> StepState<'s> {
    pub fn steady(t: f64) -> Self {
        Self { t, previous: None }
    }

    pub fn unsteady(t: f64, previous: &'s [f64]) -> Self {
        Self {
            t,
            previous: Some(previous),
        }
    }
}

/// Everything a worker needs to build the system of one cell.
#[derive(Debug, Clone)]
struct CellWorkspace {
    cm: CellMesh,
    fm: FaceMesh,
    view: CellBoundaryView,
    csys: CellSystem,
    diffusion: Option<HodgeBuilder>,
    mass: HodgeBuilder,
    scratch: TermScratch,
    permutation: Vec<usize>,
    edge_values: Vec<f64>,
}

/// Assembles the global system of a [`ScalarEquation`] discretized with degrees of freedom at
/// mesh vertices.
///
/// Everything that does not change between assemblies (sparsity pattern, cell coloring, boundary
/// face map, prototypes of the scratch storage) is computed once by [`VertexScheme::new`].
#[derive(Debug)]
pub struct VertexScheme<'a> {
    ctx: &'a CdoContext,
    equation: ScalarEquation,
    boundary: BoundaryFaceMap,
    cell_flag: CellMeshFlag,
    boundary_flag: CellMeshFlag,
    needs_mass: bool,
    pattern: SparsityPattern,
    colors: Vec<DisjointSubsets>,
    prototype: CellWorkspace,
    pool: ScratchPool<CellWorkspace>,
}

fn check_len(what: &str, expected: usize, actual: usize) -> Result<(), CdoError> {
    if expected == actual {
        Ok(())
    } else {
        Err(CdoError::ArraySizeMismatch {
            what: what.to_string(),
            expected,
            actual,
        })
    }
}

fn check_property(property: &Property, n_cells: usize) -> Result<(), CdoError> {
    match property.n_cell_values() {
        Some(n) => check_len(&format!("property `{}`", property.name()), n_cells, n),
        None => Ok(()),
    }
}

impl<'a> VertexScheme<'a> {
    pub fn new(ctx: &'a CdoContext, equation: ScalarEquation) -> eyre::Result<Self> {
        let params = equation.params();
        params.validate()?;

        let connect = ctx.connectivity();
        let n_cells = connect.n_cells();
        let n_vertices = connect.n_vertices();

        if params.dirichlet.is_weak() && equation.diffusion().is_none() {
            return Err(CdoError::UnsupportedDiscretization(
                "weak enforcement of Dirichlet conditions needs a diffusion term".to_string(),
            )
            .into());
        }
        for property in equation
            .diffusion()
            .into_iter()
            .chain(equation.reactions())
            .chain(equation.time_property())
        {
            check_property(property, n_cells)?;
        }
        if let Some(AdvectionField::PerCell(values)) = equation.advection() {
            check_len("advection field", n_cells, values.len())?;
        }
        for source in equation.sources() {
            match &source.definition {
                SourceDefinition::PerVertex(values) => check_len("source term", n_vertices, values.len())?,
                SourceDefinition::PerCell(values) => check_len("source term", n_cells, values.len())?,
                _ => {}
            }
        }

        let boundary = BoundaryFaceMap::build(ctx, equation.boundaries(), params.default_boundary)?;

        let maxima = connect.maxima();
        let diffusion = match equation.diffusion() {
            Some(property) => {
                Some(HodgeBuilder::new(params.diffusion_hodge, maxima)?.with_property(Some(property.clone())))
            }
            None => None,
        };
        // Mass matrices are built for a unit property and scaled by the cell value of each term
        let mass = HodgeBuilder::new(params.mass_hodge, maxima)?;
        let needs_mass = !equation.reactions().is_empty()
            || params.is_unsteady()
            || equation
                .sources()
                .iter()
                .any(|s| s.reduction == SourceReduction::MassMatrix);

        let mut cell_flag = CellMeshFlag::VERTICES;
        if let Some(diffusion) = &diffusion {
            cell_flag |= diffusion.required_flag();
        }
        if equation.advection().is_some() {
            cell_flag |= CellMeshFlag::EDGES | CellMeshFlag::DUAL_FACES | CellMeshFlag::EV;
        }
        if needs_mass {
            cell_flag |= mass.required_flag();
        }
        for source in equation.sources() {
            cell_flag |= CellMeshFlag::DUAL_VOLUMES;
            let sub_tetrahedra = source.reduction == SourceReduction::DualCellIntegration
                && source.rule != QuadratureRule::Barycenter
                && matches!(source.definition, SourceDefinition::Analytic(_));
            if sub_tetrahedra {
                cell_flag |= CellMeshFlag::FE | CellMeshFlag::EV | CellMeshFlag::HFC;
            }
        }
        let cell_flag = cell_flag.resolved();
        let boundary_flag = (cell_flag | CellMeshFlag::FACES | CellMeshFlag::FE | CellMeshFlag::EV).resolved();

        let n_dofs = maxima.n_vertices_per_cell;
        let prototype = CellWorkspace {
            cm: CellMesh::with_capacity(maxima),
            fm: FaceMesh::with_capacity(maxima),
            view: CellBoundaryView::with_capacity(maxima.n_faces_per_cell, n_dofs),
            csys: CellSystem::with_capacity(n_dofs),
            diffusion,
            mass,
            scratch: TermScratch::with_capacity(n_dofs),
            permutation: Vec::with_capacity(n_dofs),
            edge_values: vec![0.0; maxima.n_edges_per_cell],
        };

        let colors = sequential_greedy_coloring(connect.c2v());
        let pattern = assemble_pattern(connect.c2v(), n_vertices)?;

        info!(
            "Vertex-based scheme for `{}`: {} vertices, {} non-zeros, {} colors, diffusion {:?}, \
             Dirichlet {:?}, {}",
            equation.name(),
            n_vertices,
            pattern.nnz(),
            colors.len(),
            equation.diffusion().map(|_| params.diffusion_hodge.algorithm),
            params.dirichlet,
            if params.is_unsteady() { "unsteady" } else { "steady" },
        );

        Ok(Self {
            ctx,
            equation,
            boundary,
            cell_flag,
            boundary_flag,
            needs_mass,
            pattern,
            colors,
            prototype,
            pool: ScratchPool::new(),
        })
    }

    pub fn context(&self) -> &CdoContext {
        self.ctx
    }

    pub fn equation(&self) -> &ScalarEquation {
        &self.equation
    }

    pub fn boundary(&self) -> &BoundaryFaceMap {
        &self.boundary
    }

    pub fn pattern(&self) -> &SparsityPattern {
        &self.pattern
    }

    /// Groups of cells that share no vertex.
    pub fn colors(&self) -> &[DisjointSubsets] {
        &self.colors
    }

    pub fn n_dofs(&self) -> usize {
        self.ctx.connectivity().n_vertices()
    }

    fn check_state(&self, state: &StepState) -> eyre::Result<()> {
        if let Some(previous) = state.previous {
            check_len("previous values", self.n_dofs(), previous.len())?;
        }
        eyre::ensure!(
            !self.equation.params().is_unsteady() || state.previous.is_some(),
            "unsteady equation `{}` needs the values of the previous time step",
            self.equation.name()
        );
        Ok(())
    }

    /// Assemble the global system, visiting the cells one color after the other.
    pub fn assemble(&self, state: StepState) -> eyre::Result<AssembledSystem> {
        self.assemble_impl(state, false)
    }

    /// Assemble the global system, processing the cells of each color in parallel.
    ///
    /// Gives the same result as [`VertexScheme::assemble`], bit for bit.
    pub fn par_assemble(&self, state: StepState) -> eyre::Result<AssembledSystem> {
        self.assemble_impl(state, true)
    }

    /// Assemble in parallel on one partition of a distributed mesh: previous values are
    /// gathered before the cell loop and the right-hand side is sum-reduced after it.
    pub fn assemble_with_interface(
        &self,
        state: StepState,
        interface: &dyn InterfaceReduction,
    ) -> eyre::Result<AssembledSystem> {
        let mut previous = state.previous.map(<[f64]>::to_vec);
        if let Some(previous) = previous.as_mut() {
            interface.gather(previous);
        }
        let mut system = self.assemble_impl(
            StepState {
                t: state.t,
                previous: previous.as_deref(),
            },
            true,
        )?;
        interface.sum_reduce(system.rhs.as_mut_slice());
        interface.sum_reduce(system.source.as_mut_slice());
        Ok(system)
    }

    fn assemble_impl(&self, state: StepState, parallel: bool) -> eyre::Result<AssembledSystem> {
        self.check_state(&state)?;
        let n = self.n_dofs();
        let vertex_values = self.boundary.vertex_values(self.ctx, state.t);

        let mut matrix = CsrMatrix::try_from_pattern_and_values(self.pattern.clone(), vec![0.0; self.pattern.nnz()])
            .map_err(|err| CdoError::Sparsity(err.to_string()))?;
        let mut rhs = vec![0.0; n];
        let mut source = vec![0.0; n];

        {
            let (offsets, columns, values) = matrix.csr_data_mut();
            for color in &self.colors {
                let values = ParallelSliceAccess::new(&mut *values);
                let source = ParallelSliceAccess::new(&mut source);
                let target = CsrTarget {
                    offsets,
                    columns,
                    values: &values,
                    source: &source,
                };
                if parallel {
                    color.par_for_each_with_access(&mut rhs, |c, _, rhs| {
                        self.process_cell(c, &state, &vertex_values, &target, rhs)
                    });
                } else {
                    let rhs = ParallelSliceAccess::new(&mut rhs);
                    for &c in color.labels() {
                        self.process_cell(c, &state, &vertex_values, &target, &rhs);
                    }
                }
            }
        }

        debug!(
            "Assembled `{}` at t = {}: {} rows, {} non-zeros ({})",
            self.equation.name(),
            state.t,
            n,
            matrix.nnz(),
            if parallel { "parallel" } else { "serial" }
        );

        Ok(AssembledSystem {
            matrix,
            rhs: DVector::from_vec(rhs),
            source: DVector::from_vec(source),
        })
    }

    /// Build the system of cell `c` and add it to the global storage.
    ///
    /// Only called for the cells of one color at a time: they never share a vertex, so no other
    /// thread writes to the rows of this cell.
    fn process_cell(
        &self,
        c: usize,
        state: &StepState,
        vertex_values: &VertexBoundaryValues,
        target: &CsrTarget<'_, '_>,
        rhs: &ParallelSliceAccess<'_, f64>,
    ) {
        self.pool.with(
            || self.prototype.clone(),
            |ws| {
                self.build_cell_system(ws, c, state, vertex_values);
                unsafe { target.scatter(&ws.csys, &mut ws.permutation, rhs) };
            },
        )
    }

    /// The local system of cell `c_id`, as it is scattered into the global system.
    pub fn cell_system(&self, c_id: usize, state: StepState) -> eyre::Result<CellSystem> {
        self.check_state(&state)?;
        eyre::ensure!(c_id < self.ctx.connectivity().n_cells(), "cell {c_id} is out of bounds");
        let vertex_values = self.boundary.vertex_values(self.ctx, state.t);
        let mut ws = self.prototype.clone();
        self.build_cell_system(&mut ws, c_id, &state, &vertex_values);
        Ok(ws.csys)
    }

    fn build_cell_system(
        &self,
        ws: &mut CellWorkspace,
        c: usize,
        state: &StepState,
        vertex_values: &VertexBoundaryValues,
    ) {
        let ctx = self.ctx;
        let eq = &self.equation;
        let params = eq.params();
        let t = state.t;
        let CellWorkspace {
            cm,
            fm,
            view,
            csys,
            diffusion,
            mass,
            scratch,
            ..
        } = ws;

        // Cells touching the boundary only through vertices or edges still carry Dirichlet
        // degrees of freedom, but need no boundary face quantities
        let border = ctx.connectivity().cell_class(c).is_border();
        let has_boundary_faces = ctx.connectivity().n_cell_boundary_faces(c) > 0;
        cm.populate(ctx, c, self.cell_mesh_flag(c));
        csys.reset(cm.vertex_ids(), state.previous);
        if border {
            view.populate(cm, ctx.connectivity(), &self.boundary, vertex_values);
        } else {
            view.clear(cm.n_vertices());
        }

        if let Some(diffusion) = diffusion.as_mut() {
            diffusion.set_property_in_cell(cm, t);
            terms::add_diffusion(diffusion.build_stiffness(cm), csys);
        }

        let beta = eq.advection().map(|field| field.value_in_cell(c, cm.center(), t));
        if let Some(beta) = &beta {
            terms::add_advection(cm, beta, &params.advection, scratch, csys);
        }

        if self.needs_mass {
            mass.build(cm);
        }
        let unit_mass = mass.hodge();

        for reaction in eq.reactions() {
            let sigma = reaction.value_in_cell(c, cm.center(), t);
            terms::add_reaction(unit_mass, sigma, csys);
        }

        for source in eq.sources() {
            match &params.time {
                Some(time) => {
                    terms::add_source(cm, source, unit_mass, t, time.theta, scratch, csys);
                    if time.theta < 1.0 {
                        let t_prev = t - time.dt;
                        terms::add_source(cm, source, unit_mass, t_prev, 1.0 - time.theta, scratch, csys);
                    }
                }
                None => terms::add_source(cm, source, unit_mass, t, 1.0, scratch, csys),
            }
        }
        terms::add_source_to_rhs(csys);

        if has_boundary_faces {
            let weak = params.dirichlet.is_weak();
            if weak {
                terms::reconstruct_gradient(cm, scratch);
            }
            for face in view.faces() {
                fm.build_from_cell_mesh(cm, face.local);
                let (condition, position) = self.boundary.condition(face.boundary_id);
                let xf = fm.face().center;
                match condition {
                    BoundaryCondition::Neumann(value) => {
                        terms::add_neumann_face(fm, value.evaluate(position, &xf, t), csys);
                    }
                    BoundaryCondition::Robin { alpha, u0, g } => {
                        terms::add_robin_face(fm, *alpha, *u0, g.evaluate(position, &xf, t), csys);
                    }
                    BoundaryCondition::Dirichlet(_) => match diffusion.as_ref() {
                        Some(builder) if weak => {
                            terms::add_nitsche_face(fm, builder.tensor(), params.dirichlet, view, scratch, csys);
                        }
                        _ => {}
                    },
                }
                if let Some(beta) = &beta {
                    terms::add_advection_face(fm, beta, params.advection.formulation, view, csys);
                }
            }
        }

        if let Some(time) = &params.time {
            let rho = eq
                .time_property()
                .map_or(1.0, |property| property.value_in_cell(c, cm.center(), t));
            terms::apply_theta_scheme(time, rho, unit_mass, scratch, csys);
        }

        if border && view.has_dirichlet_dof() {
            match params.dirichlet {
                DirichletEnforcement::Algebraic => terms::apply_algebraic_dirichlet(view, csys),
                DirichletEnforcement::Penalization { coef } => terms::apply_penalized_dirichlet(view, coef, csys),
                DirichletEnforcement::WeakNitsche { .. } | DirichletEnforcement::WeakSymmetric { .. } => {}
            }
        }
    }

    /// Quantities requested from the cell mesh of cell `c`.
    ///
    /// Boundary face quantities are only requested for cells with at least one boundary face.
    pub fn cell_mesh_flag(&self, c: usize) -> CellMeshFlag {
        if self.ctx.connectivity().n_cell_boundary_faces(c) > 0 {
            self.boundary_flag
        } else {
            self.cell_flag
        }
    }

    /// Diffusive flux `-H G u` across every dual face at time `t`, in the order of the cell to
    /// edge relation.
    pub fn diffusive_fluxes(&self, u: &[f64], t: f64) -> eyre::Result<Vec<f64>> {
        check_len("vertex values", self.n_dofs(), u.len())?;
        eyre::ensure!(
            self.equation.diffusion().is_some(),
            "equation `{}` has no diffusion term",
            self.equation.name()
        );
        let c2e = self.ctx.connectivity().c2e();
        let mut fluxes = vec![0.0; c2e.n_entries()];
        let access = ParallelSliceAccess::new(&mut fluxes);
        (0..c2e.len()).into_par_iter().for_each(|c| {
            self.pool.with(
                || self.prototype.clone(),
                |ws| {
                    if let Some(diffusion) = ws.diffusion.as_mut() {
                        ws.cm.populate(self.ctx, c, self.cell_flag);
                        diffusion.set_property_in_cell(&ws.cm, t);
                        let hodge = diffusion.build(&ws.cm);
                        // The edges of distinct cells occupy disjoint ranges of the relation
                        let out = unsafe { access.subslice_mut(c2e.range(c)) };
                        flux::cell_diffusive_flux(&ws.cm, hodge, u, &mut ws.edge_values, out);
                    }
                },
            )
        });
        Ok(fluxes)
    }

    /// Advective flux `beta . df` across every dual face at time `t`, in the order of the cell to
    /// edge relation.
    pub fn advective_fluxes(&self, t: f64) -> eyre::Result<Vec<f64>> {
        match self.equation.advection() {
            Some(field) => Ok(flux::advective_fluxes(self.ctx, field, t)),
            None => eyre::bail!("equation `{}` has no advection term", self.equation.name()),
        }
    }
}

/// Shared access to the storage of a global system under assembly.
struct CsrTarget<'s, 'v> {
    offsets: &'s [usize],
    columns: &'s [usize],
    values: &'v ParallelSliceAccess<'v, f64>,
    source: &'v ParallelSliceAccess<'v, f64>,
}

impl CsrTarget<'_, '_> {
    /// Add the cell system to the rows of its degrees of freedom.
    ///
    /// # Safety
    ///
    /// No other thread may access the rows of the degrees of freedom of `csys` concurrently.
    unsafe fn scatter(&self, csys: &CellSystem, permutation: &mut Vec<usize>, rhs: &ParallelSliceAccess<'_, f64>) {
        let ids = csys.dof_ids();
        sorted_permutation(ids, permutation);
        for (k, &row) in ids.iter().enumerate() {
            let range = self.offsets[row]..self.offsets[row + 1];
            let values = self.values.subslice_mut(range.clone());
            add_local_row_to_csr_row(&self.columns[range], values, ids, permutation, csys.matrix().row(k));
            *rhs.get_unchecked_mut(row) += csys.rhs()[k];
            *self.source.get_unchecked_mut(row) += csys.source()[k];
        }
    }
}
