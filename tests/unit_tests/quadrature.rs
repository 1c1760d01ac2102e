use matrixcompare::assert_scalar_eq;
use nalgebra::Point3;
use polycdo::quadrature::{for_each_tetrahedron_point, integrate_tetrahedron, QuadratureRule};

const RULES: [QuadratureRule; 4] = [
    QuadratureRule::Barycenter,
    QuadratureRule::SingleSubdivisionPoint,
    QuadratureRule::TenPoint,
    QuadratureRule::FivePoint,
];

fn reference_tetrahedron() -> [Point3<f64>; 4] {
    [
        Point3::new(0.0, 0.0, 0.0),
        Point3::new(1.0, 0.0, 0.0),
        Point3::new(0.0, 1.0, 0.0),
        Point3::new(0.0, 0.0, 1.0),
    ]
}

#[test]
fn weights_sum_to_one() {
    let x = reference_tetrahedron();
    for rule in RULES {
        let mut sum = 0.0;
        let mut n_points = 0;
        for_each_tetrahedron_point(rule, &x, |_, w| {
            sum += w;
            n_points += 1;
        });
        assert_scalar_eq!(sum, 1.0, comp = abs, tol = 1e-14);
        let expected_points = match rule {
            QuadratureRule::Barycenter | QuadratureRule::SingleSubdivisionPoint => 1,
            QuadratureRule::TenPoint => 10,
            QuadratureRule::FivePoint => 5,
        };
        assert_eq!(n_points, expected_points);
    }
}

#[test]
fn rules_integrate_monomials_up_to_their_degree() {
    // Integral of x^a y^b z^c over the reference tetrahedron is a! b! c! / (a + b + c + 3)!
    let x = reference_tetrahedron();
    let vol = 1.0 / 6.0;
    let monomials: [(usize, fn(&Point3<f64>) -> f64, f64); 6] = [
        (0, |_| 1.0, 1.0 / 6.0),
        (1, |p| p.x, 1.0 / 24.0),
        (1, |p| p.y + 2.0 * p.z, 3.0 / 24.0),
        (2, |p| p.x * p.x, 1.0 / 60.0),
        (2, |p| p.x * p.y, 1.0 / 120.0),
        (3, |p| p.x * p.x * p.x, 1.0 / 120.0),
    ];
    for rule in RULES {
        for (degree, f, exact) in monomials {
            if degree <= rule.degree().max(1) {
                let integral = integrate_tetrahedron(rule, &x, vol, f);
                assert_scalar_eq!(integral, exact, comp = abs, tol = 1e-14);
            }
        }
    }
    // Degree three is out of reach of the ten point rule
    let integral = integrate_tetrahedron(QuadratureRule::TenPoint, &x, vol, |p| p.x * p.x * p.x);
    assert!((integral - 1.0 / 120.0).abs() > 1e-6);
}

#[test]
fn integration_is_invariant_under_vertex_permutations() {
    let x = [
        Point3::new(0.1, 0.0, 0.3),
        Point3::new(1.2, 0.2, 0.0),
        Point3::new(0.0, 0.9, 0.1),
        Point3::new(0.3, 0.1, 1.4),
    ];
    let y = [x[2], x[0], x[3], x[1]];
    let f = |p: &Point3<f64>| p.x * p.y * p.z + p.z * p.z;
    for rule in RULES {
        let a = integrate_tetrahedron(rule, &x, 1.0, f);
        let b = integrate_tetrahedron(rule, &y, 1.0, f);
        assert_scalar_eq!(a, b, comp = abs, tol = 1e-14);
    }
}

#[test]
fn rule_degrees_and_default() {
    assert_eq!(QuadratureRule::default(), QuadratureRule::Barycenter);
    let degrees: Vec<_> = RULES.iter().map(|rule| rule.degree()).collect();
    assert_eq!(degrees, vec![0, 1, 2, 3]);
}
