use polycdo::assembly::{
    AdvectionFormulation, AdvectionParam, AdvectionScheme, DefaultBoundary, DirichletEnforcement,
    DiscretizationParams, TimeParams,
};
use polycdo::error::CdoError;
use polycdo::hodge::{HodgeAlgorithm, HodgePairing, HodgeParam};

#[test]
fn discretization_params_serde_roundtrip() {
    let params = DiscretizationParams::default()
        .with_diffusion_hodge(HodgeParam::sushi())
        .with_mass_hodge(HodgeParam::voronoi(HodgePairing::VertexPrimalCellDual))
        .with_dirichlet(DirichletEnforcement::WeakSymmetric { penalty: 50.0 })
        .with_advection(AdvectionParam {
            formulation: AdvectionFormulation::NonConservative,
            scheme: AdvectionScheme::Mixed { upwind_portion: 0.3 },
        })
        .with_time(TimeParams::crank_nicolson(0.01).with_lumped_mass(true))
        .with_default_boundary(DefaultBoundary::HomogeneousDirichlet);

    let json = serde_json::to_string(&params).unwrap();
    let deserialized: DiscretizationParams = serde_json::from_str(&json).unwrap();
    assert_eq!(deserialized, params);
}

#[test]
fn missing_fields_take_their_defaults() {
    let json = r#"{
        "diffusion_hodge": { "pairing": "EdgePrimalFaceDual", "algorithm": "Cost", "beta": 1.0 },
        "mass_hodge": { "pairing": "VertexPrimalCellDual", "algorithm": "Wbs" }
    }"#;
    let params: DiscretizationParams = serde_json::from_str(json).unwrap();
    assert_eq!(params.diffusion_hodge, HodgeParam::gcr());
    assert_eq!(params.mass_hodge, HodgeParam::wbs());
    assert_eq!(params.dirichlet, DirichletEnforcement::Algebraic);
    assert_eq!(params.advection, AdvectionParam::default());
    assert_eq!(params.time, None);
    assert_eq!(params.default_boundary, DefaultBoundary::HomogeneousNeumann);
    assert!(!params.is_unsteady());
    params.validate().unwrap();

    let json = r#"{ "Penalization": { "coef": 1e6 } }"#;
    let dirichlet: DirichletEnforcement = serde_json::from_str(json).unwrap();
    assert_eq!(dirichlet, DirichletEnforcement::Penalization { coef: 1e6 });
}

#[test]
fn inconsistent_params_are_rejected() {
    let base = DiscretizationParams::default();
    base.validate().unwrap();

    let invalid = [
        base.with_diffusion_hodge(HodgeParam::dga().with_pairing(HodgePairing::FacePrimalEdgeDual)),
        base.with_mass_hodge(HodgeParam::voronoi(HodgePairing::EdgePrimalFaceDual)),
        base.with_dirichlet(DirichletEnforcement::Penalization { coef: 0.0 }),
        base.with_dirichlet(DirichletEnforcement::WeakNitsche { penalty: -1.0 }),
        base.with_advection(AdvectionParam {
            formulation: AdvectionFormulation::Conservative,
            scheme: AdvectionScheme::Mixed { upwind_portion: 1.5 },
        }),
        base.with_time(TimeParams { theta: 1.2, dt: 0.1, lumped_mass: false }),
        base.with_time(TimeParams::implicit_euler(0.0)),
    ];
    for params in invalid {
        assert!(
            matches!(params.validate(), Err(CdoError::UnsupportedDiscretization(_))),
            "{params:?}"
        );
    }

    let unsupported_mass = base.with_mass_hodge(HodgeParam::dga().with_pairing(HodgePairing::VertexPrimalCellDual));
    assert!(matches!(
        unsupported_mass.validate(),
        Err(CdoError::UnsupportedHodge {
            algorithm: HodgeAlgorithm::Cost,
            ..
        })
    ));
}

#[test]
fn diagonal_time_mass() {
    let base = DiscretizationParams::default();
    assert!(!base.has_diagonal_time_mass());
    assert!(base
        .with_time(TimeParams::implicit_euler(0.1).with_lumped_mass(true))
        .has_diagonal_time_mass());
    assert!(base
        .with_mass_hodge(HodgeParam::voronoi(HodgePairing::VertexPrimalCellDual))
        .has_diagonal_time_mass());
    assert_eq!(AdvectionScheme::Centered.upwind_portion(), 0.0);
    assert_eq!(AdvectionScheme::Upwind.upwind_portion(), 1.0);
    assert!(DirichletEnforcement::WeakNitsche { penalty: 1.0 }.is_weak());
    assert!(!DirichletEnforcement::penalization().is_weak());
}
