use crate::unit_tests::{
    anisotropic_tensor, box_without_corner_cell, context, csr_matvec, full_cell_meshes, sheared_box_mesh,
};
use matrixcompare::{assert_matrix_eq, assert_scalar_eq};
use nalgebra::{DVector, Point3, Vector3};
use polycdo::assembly::{
    AdvectionField, AdvectionFormulation, AdvectionParam, AdvectionScheme, AssembledSystem, BoundaryCondition,
    BoundaryValue, DefaultBoundary, DirichletEnforcement, DiscretizationParams, DofFlag, ScalarEquation,
    SourceReduction, SourceTerm, StepState, TimeParams, VertexScheme,
};
use polycdo::context::CdoContext;
use polycdo::error::CdoError;
use polycdo::hodge::HodgeParam;
use polycdo::interface::{InterfaceReduction, SerialInterface};
use polycdo::local::{CellMeshFlag, FaceMesh};
use polycdo::mesh::procedural::create_unit_box_uniform_hex_mesh;
use polycdo::property::Property;
use polycdo::quadrature::QuadratureRule;
use polycdo::solve::DenseLuSolver;

const BOX_ZONES: [&str; 6] = ["x_min", "x_max", "y_min", "y_max", "z_min", "z_max"];

fn unit_box(cells_per_dim: usize) -> CdoContext {
    context(create_unit_box_uniform_hex_mesh(cells_per_dim).unwrap())
}

fn solve(system: &AssembledSystem) -> DVector<f64> {
    system.solve_with(&DenseLuSolver).unwrap()
}

/// `A x - b`
fn residual(system: &AssembledSystem, x: &[f64]) -> Vec<f64> {
    csr_matvec(&system.matrix, x)
        .iter()
        .zip(system.rhs.iter())
        .map(|(ax, b)| ax - b)
        .collect()
}

fn affine(x: &Point3<f64>) -> f64 {
    0.5 * x.x - 1.5 * x.y + 0.75 * x.z + 2.0
}

fn affine_gradient() -> Vector3<f64> {
    Vector3::new(0.5, -1.5, 0.75)
}

fn affine_dirichlet_equation(params: DiscretizationParams) -> ScalarEquation {
    BOX_ZONES.iter().fold(
        ScalarEquation::new("affine")
            .with_params(params)
            .with_diffusion(Property::anisotropic("conductivity", anisotropic_tensor())),
        |eq, zone| {
            eq.with_boundary(
                *zone,
                BoundaryCondition::Dirichlet(BoundaryValue::analytic(|x, _| affine(x))),
            )
        },
    )
}

fn vertex_values<F: Fn(&Point3<f64>) -> f64>(ctx: &CdoContext, f: F) -> Vec<f64> {
    (0..ctx.connectivity().n_vertices())
        .map(|v| f(ctx.quantities().vertex(v)))
        .collect()
}

#[test]
fn nitsche_reproduces_constants_on_a_single_cube() {
    let ctx = unit_box(1);
    for dirichlet in [
        DirichletEnforcement::WeakNitsche { penalty: 100.0 },
        DirichletEnforcement::WeakSymmetric { penalty: 100.0 },
    ] {
        let eq = ScalarEquation::new("nitsche")
            .with_params(DiscretizationParams::default().with_dirichlet(dirichlet))
            .with_diffusion(Property::isotropic("conductivity", 1.0))
            .with_boundary("x_min", BoundaryCondition::dirichlet(1.0));
        let scheme = VertexScheme::new(&ctx, eq).unwrap();
        let system = scheme.assemble(StepState::steady(0.0)).unwrap();

        let ones = vec![1.0; scheme.n_dofs()];
        for r in residual(&system, &ones) {
            assert_scalar_eq!(r, 0.0, comp = abs, tol = 1e-12);
        }
        let u = solve(&system);
        assert_matrix_eq!(u, DVector::repeat(8, 1.0), comp = abs, tol = 1e-8);

        if let DirichletEnforcement::WeakNitsche { .. } = dirichlet {
            // Vertex i + 2 (j + 2 k) lies on x_min when i = 0
            let csys = scheme.cell_system(0, StepState::steady(0.0)).unwrap();
            for (k, &v) in csys.dof_ids().iter().enumerate() {
                if v % 2 == 1 {
                    let row_sum: f64 = csys.matrix().row(k).iter().sum();
                    assert_scalar_eq!(row_sum, 0.0, comp = abs, tol = 1e-12);
                    assert_eq!(csys.rhs()[k], 0.0);
                }
            }
        }
    }
}

#[test]
fn affine_solutions_are_exact_with_every_dirichlet_enforcement() {
    let ctx = context(sheared_box_mesh(3));
    let expected = DVector::from_vec(vertex_values(&ctx, affine));
    let cases = [
        (DirichletEnforcement::Algebraic, 1e-9),
        (DirichletEnforcement::penalization(), 1e-6),
        (DirichletEnforcement::WeakNitsche { penalty: 100.0 }, 1e-8),
        (DirichletEnforcement::WeakSymmetric { penalty: 100.0 }, 1e-8),
    ];
    for (dirichlet, tol) in cases {
        let params = DiscretizationParams::default()
            .with_diffusion_hodge(HodgeParam::dga())
            .with_dirichlet(dirichlet);
        let scheme = VertexScheme::new(&ctx, affine_dirichlet_equation(params)).unwrap();
        let u = solve(&scheme.assemble(StepState::steady(0.0)).unwrap());
        assert_matrix_eq!(u, expected, comp = abs, tol = tol);
    }
}

#[test]
fn affine_solution_with_voronoi_diffusion_on_a_box() {
    // The Voronoi Hodge operator is exact for axis-aligned boxes and a diagonal tensor
    let ctx = context(polycdo::mesh::procedural::create_rectangular_uniform_hex_mesh(0.5, 2, 1, 3, 2).unwrap());
    let params = DiscretizationParams::default().with_diffusion_hodge(HodgeParam::voronoi(
        polycdo::hodge::HodgePairing::EdgePrimalFaceDual,
    ));
    let eq = BOX_ZONES.iter().fold(
        ScalarEquation::new("voronoi")
            .with_params(params)
            .with_diffusion(Property::orthotropic("conductivity", Vector3::new(1.0, 2.0, 0.5))),
        |eq, zone| eq.with_boundary(*zone, BoundaryCondition::Dirichlet(BoundaryValue::analytic(|x, _| affine(x)))),
    );
    let scheme = VertexScheme::new(&ctx, eq).unwrap();
    let u = solve(&scheme.assemble(StepState::steady(0.0)).unwrap());
    let expected = DVector::from_vec(vertex_values(&ctx, affine));
    assert_matrix_eq!(u, expected, comp = abs, tol = 1e-9);
}

#[test]
fn nitsche_on_min_side_faces_with_exact_fluxes_on_max_side_faces() {
    let ctx = unit_box(2);
    let flux = anisotropic_tensor() * affine_gradient();
    let expected = DVector::from_vec(vertex_values(&ctx, affine));
    for dirichlet in [
        DirichletEnforcement::WeakNitsche { penalty: 100.0 },
        DirichletEnforcement::WeakSymmetric { penalty: 100.0 },
    ] {
        let eq = ["x_min", "y_min", "z_min"].iter().fold(
            ScalarEquation::new("mixed")
                .with_params(DiscretizationParams::default().with_dirichlet(dirichlet))
                .with_diffusion(Property::anisotropic("conductivity", anisotropic_tensor()))
                .with_boundary("x_max", BoundaryCondition::neumann(flux.x))
                .with_boundary("y_max", BoundaryCondition::neumann(flux.y))
                .with_boundary("z_max", BoundaryCondition::neumann(flux.z)),
            |eq, zone| eq.with_boundary(*zone, BoundaryCondition::Dirichlet(BoundaryValue::analytic(|x, _| affine(x)))),
        );
        let scheme = VertexScheme::new(&ctx, eq).unwrap();
        let u = solve(&scheme.assemble(StepState::steady(0.0)).unwrap());
        assert_matrix_eq!(u, expected, comp = abs, tol = 1e-8);
    }
}

#[test]
fn boundary_face_quantities_are_only_built_for_cells_with_boundary_faces() {
    let ctx = context(box_without_corner_cell());
    let eq = ScalarEquation::new("affine")
        .with_diffusion(Property::isotropic("conductivity", 1.0))
        .with_boundary(
            "boundary",
            BoundaryCondition::Dirichlet(BoundaryValue::analytic(|x, _| affine(x))),
        );
    let scheme = VertexScheme::new(&ctx, eq).unwrap();

    // Cell (1, 1, 1) of the box only touches the boundary through vertex (1, 1, 1)
    let center = 12;
    let corner_vertex = 20;
    assert!(ctx.connectivity().cell_class(center).is_border());
    assert!(!scheme.cell_mesh_flag(center).contains(CellMeshFlag::FACES));
    assert!(scheme.cell_mesh_flag(0).contains(CellMeshFlag::FACES | CellMeshFlag::FE));

    // The Dirichlet value of the vertex is still enforced by the cell
    let csys = scheme.cell_system(center, StepState::steady(0.0)).unwrap();
    let k = csys.dof_ids().iter().position(|&v| v == corner_vertex).unwrap();
    let x = ctx.quantities().vertex(corner_vertex);
    assert_scalar_eq!(csys.rhs()[k], affine(x), comp = abs, tol = 1e-15);
    for j in 0..csys.n_dofs() {
        let expected = if j == k { 1.0 } else { 0.0 };
        assert_eq!(csys.matrix()[(k, j)], expected);
    }

    let u = solve(&scheme.assemble(StepState::steady(0.0)).unwrap());
    let expected = DVector::from_vec(vertex_values(&ctx, affine));
    assert_matrix_eq!(u, expected, comp = abs, tol = 1e-9);
}

fn full_equation(params: DiscretizationParams) -> ScalarEquation {
    ScalarEquation::new("full")
        .with_params(params)
        .with_diffusion(Property::anisotropic("conductivity", anisotropic_tensor()))
        .with_advection(AdvectionField::analytic(|x, _| Vector3::new(1.0 + x.y, -0.5, 0.25 * x.x)))
        .with_reaction(Property::isotropic_analytic("decay", |x, _| 1.0 + x.z * x.z))
        .with_source(SourceTerm::analytic(|x, _| x.x * x.y + 1.0).with_rule(QuadratureRule::FivePoint))
        .with_boundary("x_min", BoundaryCondition::Dirichlet(BoundaryValue::analytic(|x, _| affine(x))))
        .with_boundary("y_max", BoundaryCondition::robin(2.0, 0.5, 0.1))
        .with_boundary("z_min", BoundaryCondition::neumann(-1.0))
}

#[test]
fn parallel_assembly_matches_serial_assembly() {
    let ctx = context(sheared_box_mesh(4));
    for dirichlet in [
        DirichletEnforcement::Algebraic,
        DirichletEnforcement::WeakSymmetric { penalty: 50.0 },
    ] {
        let params = DiscretizationParams::default()
            .with_diffusion_hodge(HodgeParam::dga())
            .with_dirichlet(dirichlet);
        let scheme = VertexScheme::new(&ctx, full_equation(params)).unwrap();
        let serial = scheme.assemble(StepState::steady(0.0)).unwrap();
        let parallel = scheme.par_assemble(StepState::steady(0.0)).unwrap();
        let interface = scheme
            .assemble_with_interface(StepState::steady(0.0), &SerialInterface)
            .unwrap();

        assert_eq!(serial.matrix.pattern(), parallel.matrix.pattern());
        assert_eq!(serial.matrix.values(), parallel.matrix.values());
        assert_eq!(serial.rhs, parallel.rhs);
        assert_eq!(serial.source, parallel.source);
        assert_eq!(serial.matrix.values(), interface.matrix.values());
        assert_eq!(serial.rhs, interface.rhs);
    }
}

/// Pretends that every degree of freedom is shared with one identical partition.
struct MirroredPartition;

impl InterfaceReduction for MirroredPartition {
    fn gather(&self, _values: &mut [f64]) {}

    fn sum_reduce(&self, values: &mut [f64]) {
        values.iter_mut().for_each(|v| *v *= 2.0);
    }
}

#[test]
fn interface_reduction_applies_to_the_right_hand_side() {
    let ctx = context(sheared_box_mesh(2));
    let scheme = VertexScheme::new(&ctx, full_equation(DiscretizationParams::default())).unwrap();
    let local = scheme.par_assemble(StepState::steady(0.0)).unwrap();
    let reduced = scheme
        .assemble_with_interface(StepState::steady(0.0), &MirroredPartition)
        .unwrap();
    assert_eq!(local.matrix.values(), reduced.matrix.values());
    assert_matrix_eq!(reduced.rhs, &local.rhs * 2.0);
    assert_matrix_eq!(reduced.source, &local.source * 2.0);
}

#[test]
fn the_sparsity_pattern_couples_vertices_sharing_a_cell() {
    let ctx = unit_box(2);
    let eq = ScalarEquation::new("pattern").with_diffusion(Property::isotropic("conductivity", 1.0));
    let scheme = VertexScheme::new(&ctx, eq).unwrap();
    let pattern = scheme.pattern();
    assert_eq!(pattern.major_dim(), 27);
    // The center vertex is coupled to every vertex, a corner to the 8 vertices of its cell
    assert_eq!(pattern.lane(13).len(), 27);
    assert_eq!(pattern.lane(0).len(), 8);
    // Cells of one color do not share vertices
    for color in scheme.colors() {
        let mut seen = vec![false; 27];
        for &c in color.labels() {
            for &v in ctx.connectivity().c2v().get(c) {
                assert!(!seen[v]);
                seen[v] = true;
            }
        }
    }
    let n_colored: usize = scheme.colors().iter().map(|color| color.labels().len()).sum();
    assert_eq!(n_colored, 8);
}

#[test]
fn reaction_and_source_balance() {
    let ctx = context(sheared_box_mesh(2));
    let n_vertices = ctx.connectivity().n_vertices();
    let sources = [
        SourceTerm::constant(4.0),
        SourceTerm::constant(4.0).with_reduction(SourceReduction::MassMatrix),
        SourceTerm::per_vertex(vec![4.0; n_vertices]),
        SourceTerm::per_cell(vec![4.0; ctx.connectivity().n_cells()]),
    ];
    for source in sources {
        let eq = ScalarEquation::new("reaction")
            .with_reaction(Property::isotropic("sigma", 2.0))
            .with_source(source);
        let scheme = VertexScheme::new(&ctx, eq).unwrap();
        let system = scheme.assemble(StepState::steady(0.0)).unwrap();
        assert_eq!(system.source, system.rhs);
        let u = solve(&system);
        assert_matrix_eq!(u, DVector::repeat(n_vertices, 2.0), comp = abs, tol = 1e-10);
    }
}

#[test]
fn source_total_is_the_integral_of_the_source() {
    let ctx = unit_box(2);
    for rule in [
        QuadratureRule::SingleSubdivisionPoint,
        QuadratureRule::FivePoint,
        QuadratureRule::TenPoint,
    ] {
        let eq = ScalarEquation::new("source")
            .with_diffusion(Property::isotropic("conductivity", 1.0))
            .with_source(SourceTerm::analytic(|x, _| x.x * x.x).with_rule(rule));
        let scheme = VertexScheme::new(&ctx, eq).unwrap();
        let system = scheme.assemble(StepState::steady(0.0)).unwrap();
        let tol = if rule == QuadratureRule::SingleSubdivisionPoint { 1e-2 } else { 1e-13 };
        assert_scalar_eq!(system.rhs.sum(), 1.0 / 3.0, comp = abs, tol = tol);
        assert_eq!(system.rhs, system.source);
    }
}

#[test]
fn theta_schemes_advance_a_constant_state() {
    let ctx = context(sheared_box_mesh(2));
    let n = ctx.connectivity().n_vertices();
    let previous = vec![3.0; n];

    let implicit = ScalarEquation::new("heat")
        .with_params(DiscretizationParams::default().with_time(TimeParams::implicit_euler(0.5)))
        .with_diffusion(Property::isotropic("conductivity", 1.0));
    let scheme = VertexScheme::new(&ctx, implicit).unwrap();
    let u = solve(&scheme.assemble(StepState::unsteady(0.5, &previous)).unwrap());
    assert_matrix_eq!(u, DVector::repeat(n, 3.0), comp = abs, tol = 1e-10);

    for lumped in [false, true] {
        let time = TimeParams::crank_nicolson(0.1).with_lumped_mass(lumped);
        let eq = ScalarEquation::new("heat")
            .with_params(DiscretizationParams::default().with_time(time))
            .with_diffusion(Property::anisotropic("conductivity", anisotropic_tensor()))
            .with_time_property(Property::isotropic("capacity", 2.0))
            .with_source(SourceTerm::constant(2.0));
        let scheme = VertexScheme::new(&ctx, eq).unwrap();
        let u = solve(&scheme.par_assemble(StepState::unsteady(1.0, &previous)).unwrap());
        assert_matrix_eq!(u, DVector::repeat(n, 3.1), comp = abs, tol = 1e-10);
    }
}

#[test]
fn unsteady_assembly_checks_previous_values() {
    let ctx = unit_box(1);
    let eq = ScalarEquation::new("heat")
        .with_params(DiscretizationParams::default().with_time(TimeParams::implicit_euler(0.1)))
        .with_diffusion(Property::isotropic("conductivity", 1.0));
    let scheme = VertexScheme::new(&ctx, eq).unwrap();
    assert!(scheme.assemble(StepState::steady(0.1)).is_err());
    assert!(scheme.cell_system(0, StepState::steady(0.1)).is_err());

    let short = vec![0.0; 7];
    let error = scheme.assemble(StepState::unsteady(0.1, &short)).unwrap_err();
    assert!(matches!(
        error.downcast_ref::<CdoError>(),
        Some(CdoError::ArraySizeMismatch { expected: 8, actual: 7, .. })
    ));
}

fn box_boundary_fluxes(ctx: &CdoContext, beta: &Vector3<f64>) -> Vec<f64> {
    let connect = ctx.connectivity();
    let mut fm = FaceMesh::with_capacity(connect.maxima());
    let mut fluxes = vec![0.0; connect.n_vertices()];
    for f in connect.n_interior_faces()..connect.n_faces() {
        fm.build_from_global(ctx, connect.f2c().get(f)[0], f);
        let face_flux = beta.dot(&fm.face().unitv) * fm.face().meas;
        for (&v, &w) in fm.vertex_ids().iter().zip(fm.wvf()) {
            fluxes[v] += face_flux * w;
        }
    }
    fluxes
}

#[test]
fn advection_of_constants_with_a_uniform_field() {
    let ctx = context(sheared_box_mesh(3));
    let n = ctx.connectivity().n_vertices();
    let beta = Vector3::new(1.0, -0.5, 2.0);
    let ones = vec![1.0; n];

    for scheme_kind in [
        AdvectionScheme::Upwind,
        AdvectionScheme::Centered,
        AdvectionScheme::Mixed { upwind_portion: 0.3 },
    ] {
        for formulation in [AdvectionFormulation::Conservative, AdvectionFormulation::NonConservative] {
            let params = DiscretizationParams::default().with_advection(AdvectionParam {
                formulation,
                scheme: scheme_kind,
            });
            let eq = ScalarEquation::new("transport")
                .with_params(params)
                .with_advection(AdvectionField::Uniform(beta));
            let scheme = VertexScheme::new(&ctx, eq).unwrap();
            let system = scheme.assemble(StepState::steady(0.0)).unwrap();
            for r in residual(&system, &ones) {
                assert_scalar_eq!(r, 0.0, comp = abs, tol = 1e-12);
            }

            if formulation == AdvectionFormulation::Conservative {
                // Interior exchanges cancel: only the fluxes across the boundary remain
                let column_sums = system
                    .matrix
                    .transpose()
                    .row_iter()
                    .map(|row| row.values().iter().sum::<f64>())
                    .collect::<Vec<_>>();
                let expected = box_boundary_fluxes(&ctx, &beta);
                for (sum, flux) in column_sums.iter().zip(&expected) {
                    assert_scalar_eq!(*sum, *flux, comp = abs, tol = 1e-12);
                }
            }
        }
    }
}

#[test]
fn upwind_advection_with_inflow_dirichlet() {
    // beta . grad(u) = 0 transports the inflow value through the whole box
    let ctx = context(sheared_box_mesh(3));
    let params = DiscretizationParams::default().with_advection(AdvectionParam {
        formulation: AdvectionFormulation::NonConservative,
        scheme: AdvectionScheme::Upwind,
    });
    let eq = ScalarEquation::new("transport")
        .with_params(params)
        .with_advection(AdvectionField::Uniform(Vector3::new(1.0, 0.0, 0.0)))
        .with_boundary("x_min", BoundaryCondition::dirichlet(5.0));
    let scheme = VertexScheme::new(&ctx, eq).unwrap();
    let u = solve(&scheme.assemble(StepState::steady(0.0)).unwrap());
    assert_matrix_eq!(u, DVector::repeat(u.len(), 5.0), comp = abs, tol = 1e-9);
}

#[test]
fn robin_conditions_on_the_whole_boundary() {
    let ctx = context(sheared_box_mesh(2));
    let eq = BOX_ZONES.iter().fold(
        ScalarEquation::new("robin").with_diffusion(Property::anisotropic("conductivity", anisotropic_tensor())),
        |eq, zone| eq.with_boundary(*zone, BoundaryCondition::robin(2.0, 0.7, 0.0)),
    );
    let scheme = VertexScheme::new(&ctx, eq).unwrap();
    let u = solve(&scheme.assemble(StepState::steady(0.0)).unwrap());
    assert_matrix_eq!(u, DVector::repeat(u.len(), 0.7), comp = abs, tol = 1e-10);
}

#[test]
fn neumann_flux_enters_the_right_hand_side() {
    let ctx = unit_box(2);
    let eq = ScalarEquation::new("neumann")
        .with_diffusion(Property::isotropic("conductivity", 1.0))
        .with_boundary("x_max", BoundaryCondition::neumann(2.0))
        .with_boundary(
            "y_max",
            BoundaryCondition::Neumann(BoundaryValue::analytic(|x, _| x.x)),
        );
    let scheme = VertexScheme::new(&ctx, eq).unwrap();
    let system = scheme.assemble(StepState::steady(0.0)).unwrap();
    // Face values are taken at face centroids, which integrates x exactly over y_max
    assert_scalar_eq!(system.rhs.sum(), 2.5, comp = abs, tol = 1e-13);
    assert_eq!(system.source.sum(), 0.0);
    assert!(system.rhs.iter().all(|&b| b >= 0.0));
}

#[test]
fn vertex_boundary_values_take_the_mean_of_dirichlet_faces() {
    let ctx = unit_box(1);
    let eq = ScalarEquation::new("classification")
        .with_diffusion(Property::isotropic("conductivity", 1.0))
        .with_boundary("x_min", BoundaryCondition::dirichlet(1.0))
        .with_boundary("y_min", BoundaryCondition::dirichlet(7.0))
        // Later definitions override earlier ones
        .with_boundary("y_min", BoundaryCondition::dirichlet(3.0))
        .with_boundary("z_max", BoundaryCondition::robin(1.0, 0.0, 0.0));
    let scheme = VertexScheme::new(&ctx, eq).unwrap();
    let values = scheme.boundary().vertex_values(&ctx, 0.0);

    // Vertex i + 2 (j + 2 k)
    assert_eq!(values.flags()[0], DofFlag::Dirichlet);
    assert_eq!(values.values()[0], 2.0);
    assert_eq!(values.values()[1], 3.0);
    assert_eq!(values.values()[2], 1.0);
    assert_eq!(values.values()[4], 2.0);
    assert_eq!(values.flags()[3], DofFlag::Neumann);
    assert_eq!(values.values()[3], 0.0);
    assert_eq!(values.flags()[7], DofFlag::Robin);
    assert!(scheme.boundary().has_dirichlet());

    let params = DiscretizationParams::default().with_default_boundary(DefaultBoundary::HomogeneousDirichlet);
    let eq = ScalarEquation::new("default")
        .with_params(params)
        .with_diffusion(Property::isotropic("conductivity", 1.0))
        .with_boundary("x_max", BoundaryCondition::neumann(1.0));
    let scheme = VertexScheme::new(&ctx, eq).unwrap();
    let values = scheme.boundary().vertex_values(&ctx, 0.0);
    assert!(values.flags().iter().all(|&flag| flag == DofFlag::Dirichlet));
    assert!(values.values().iter().all(|&value| value == 0.0));
}

#[test]
fn per_face_boundary_values_follow_the_zone_order() {
    let ctx = unit_box(2);
    let eq = ScalarEquation::new("per-face")
        .with_diffusion(Property::isotropic("conductivity", 1.0))
        .with_boundary(
            "z_min",
            BoundaryCondition::Dirichlet(BoundaryValue::PerFace(vec![1.0, 2.0, 3.0, 4.0].into())),
        );
    let scheme = VertexScheme::new(&ctx, eq).unwrap();
    let values = scheme.boundary().vertex_values(&ctx, 0.0);
    let zone = ctx.mesh().zone("z_min").unwrap();
    let n_interior = ctx.connectivity().n_interior_faces();

    // A corner vertex of the zone belongs to a single face
    for (position, &b) in zone.faces().iter().enumerate() {
        let face_vertices = ctx.connectivity().f2v().get(n_interior + b);
        let corner = face_vertices
            .iter()
            .copied()
            .find(|&v| ctx.connectivity().v2c().degree(v) == 1)
            .unwrap();
        assert_eq!(values.values()[corner], (position + 1) as f64);
    }
    // The center of the zone is shared by all four faces
    assert_eq!(values.values()[4], 2.5);
}

#[test]
fn algebraic_elimination_of_a_cell_system() {
    let ctx = unit_box(1);
    let eq = ScalarEquation::new("algebraic")
        .with_diffusion(Property::isotropic("conductivity", 1.0))
        .with_boundary("x_min", BoundaryCondition::dirichlet(1.0));
    let scheme = VertexScheme::new(&ctx, eq).unwrap();
    let csys = scheme.cell_system(0, StepState::steady(0.0)).unwrap();
    let is_dirichlet: Vec<bool> = csys.dof_ids().iter().map(|&v| v % 2 == 0).collect();

    for i in 0..csys.n_dofs() {
        for j in 0..csys.n_dofs() {
            let a = csys.matrix()[(i, j)];
            if is_dirichlet[i] {
                assert_eq!(a, if i == j { 1.0 } else { 0.0 });
            } else if is_dirichlet[j] {
                assert_eq!(a, 0.0);
            }
        }
        if is_dirichlet[i] {
            assert_eq!(csys.rhs()[i], 1.0);
        }
    }
    // The eliminated columns carry the Dirichlet value: the free rows still balance u = 1
    let free_rhs: f64 = (0..csys.n_dofs())
        .filter(|&i| !is_dirichlet[i])
        .map(|i| csys.rhs()[i] - csys.matrix().row(i).iter().sum::<f64>())
        .sum();
    assert_scalar_eq!(free_rhs, 0.0, comp = abs, tol = 1e-13);
    assert!(scheme.cell_system(1, StepState::steady(0.0)).is_err());
}

#[test]
fn invalid_equations_are_rejected() {
    let ctx = unit_box(2);
    let setup_error = |eq: ScalarEquation| VertexScheme::new(&ctx, eq).unwrap_err();

    let eq = ScalarEquation::new("zone")
        .with_diffusion(Property::isotropic("conductivity", 1.0))
        .with_boundary("inlet", BoundaryCondition::dirichlet(1.0));
    assert!(matches!(
        setup_error(eq).downcast_ref::<CdoError>(),
        Some(CdoError::UndefinedZone { zone }) if zone == "inlet"
    ));

    let params = DiscretizationParams::default().with_dirichlet(DirichletEnforcement::WeakNitsche { penalty: 10.0 });
    let eq = ScalarEquation::new("nitsche")
        .with_params(params)
        .with_reaction(Property::isotropic("sigma", 1.0));
    assert!(matches!(setup_error(eq).downcast_ref::<CdoError>(), Some(CdoError::UnsupportedDiscretization(_))));

    let eq = ScalarEquation::new("per-face")
        .with_diffusion(Property::isotropic("conductivity", 1.0))
        .with_boundary(
            "x_min",
            BoundaryCondition::Neumann(BoundaryValue::PerFace(vec![1.0; 3].into())),
        );
    assert!(matches!(
        setup_error(eq).downcast_ref::<CdoError>(),
        Some(CdoError::ArraySizeMismatch { expected: 4, actual: 3, .. })
    ));

    let eq = ScalarEquation::new("per-cell").with_diffusion(Property::isotropic_per_cell("conductivity", &[1.0; 5]));
    assert!(matches!(
        setup_error(eq).downcast_ref::<CdoError>(),
        Some(CdoError::ArraySizeMismatch { expected: 8, actual: 5, .. })
    ));

    let eq = ScalarEquation::new("source").with_source(SourceTerm::per_vertex(vec![0.0; 8]));
    assert!(matches!(
        setup_error(eq).downcast_ref::<CdoError>(),
        Some(CdoError::ArraySizeMismatch { expected: 27, actual: 8, .. })
    ));

    let params = DiscretizationParams::default().with_diffusion_hodge(HodgeParam::wbs());
    let eq = ScalarEquation::new("wbs")
        .with_params(params)
        .with_diffusion(Property::isotropic("conductivity", 1.0));
    assert!(setup_error(eq).downcast_ref::<CdoError>().is_some());
}

#[test]
fn diffusive_fluxes_of_an_affine_field() {
    let ctx = context(sheared_box_mesh(2));
    let params = DiscretizationParams::default().with_diffusion_hodge(HodgeParam::dga());
    let scheme = VertexScheme::new(&ctx, affine_dirichlet_equation(params)).unwrap();
    let u = vertex_values(&ctx, affine);
    let fluxes = scheme.diffusive_fluxes(&u, 0.0).unwrap();
    let k_grad = anisotropic_tensor() * affine_gradient();

    let c2e = ctx.connectivity().c2e();
    assert_eq!(fluxes.len(), c2e.n_entries());
    for cm in full_cell_meshes(&ctx) {
        for (flux, dual_face) in fluxes[c2e.range(cm.id())].iter().zip(cm.dual_faces()) {
            assert_scalar_eq!(*flux, -dual_face.vector().dot(&k_grad), comp = abs, tol = 1e-12);
        }
    }
    assert!(scheme.diffusive_fluxes(&u[1..], 0.0).is_err());
    assert!(scheme.advective_fluxes(0.0).is_err());
}

#[test]
fn advective_fluxes_follow_the_field() {
    let ctx = context(sheared_box_mesh(2));
    let beta = Vector3::new(0.3, 1.0, -2.0);
    let eq = ScalarEquation::new("transport").with_advection(AdvectionField::Uniform(beta));
    let scheme = VertexScheme::new(&ctx, eq).unwrap();
    let fluxes = scheme.advective_fluxes(0.0).unwrap();
    let c2e = ctx.connectivity().c2e();
    for cm in full_cell_meshes(&ctx) {
        for (flux, dual_face) in fluxes[c2e.range(cm.id())].iter().zip(cm.dual_faces()) {
            assert_scalar_eq!(*flux, beta.dot(&dual_face.vector()), comp = abs, tol = 1e-14);
        }
    }
    assert!(scheme.diffusive_fluxes(&vec![0.0; 27], 0.0).is_err());
}
