//! Quadrature rules on tetrahedra, used to integrate source terms over dual cells.
use nalgebra::Point3;
use serde::{Deserialize, Serialize};

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum QuadratureRule {
    /// Value at the cell barycenter times the dual cell volume.
    Barycenter,
    /// Value at the barycenter of each sub-tetrahedron (exact for degree 1).
    SingleSubdivisionPoint,
    /// Vertices and edge midpoints of each sub-tetrahedron (exact for degree 2).
    TenPoint,
    /// Barycenter and four interior points of each sub-tetrahedron (exact for degree 3).
    FivePoint,
}

impl Default for QuadratureRule {
    fn default() -> Self {
        Self::Barycenter
    }
}

impl QuadratureRule {
    /// Largest polynomial degree integrated exactly over a tetrahedron.
    pub fn degree(&self) -> usize {
        match self {
            Self::Barycenter => 0,
            Self::SingleSubdivisionPoint => 1,
            Self::TenPoint => 2,
            Self::FivePoint => 3,
        }
    }
}

/// Integrate `f` over the tetrahedron `x` with volume `vol`.
///
/// [`QuadratureRule::Barycenter`] is a cell-level rule: on a single tetrahedron it falls back to
/// the one-point rule.
pub fn integrate_tetrahedron<F>(rule: QuadratureRule, x: &[Point3<f64>; 4], vol: f64, mut f: F) -> f64
where
    F: FnMut(&Point3<f64>) -> f64,
{
    let mut sum = 0.0;
    for_each_tetrahedron_point(rule, x, |p, w| sum += w * f(p));
    sum * vol
}

/// Visit the points of `rule` on the tetrahedron `x`, with weights normalized to sum to one.
pub fn for_each_tetrahedron_point<F>(rule: QuadratureRule, x: &[Point3<f64>; 4], mut visit: F)
where
    F: FnMut(&Point3<f64>, f64),
{
    let [a, b, c, d] = x;
    match rule {
        QuadratureRule::Barycenter | QuadratureRule::SingleSubdivisionPoint => {
            let center = Point3::from((a.coords + b.coords + c.coords + d.coords) * 0.25);
            visit(&center, 1.0);
        }
        QuadratureRule::TenPoint => {
            for v in x {
                visit(v, -1.0 / 20.0);
            }
            for i in 0..4 {
                for j in i + 1..4 {
                    visit(&nalgebra::center(&x[i], &x[j]), 1.0 / 5.0);
                }
            }
        }
        QuadratureRule::FivePoint => {
            let center = Point3::from((a.coords + b.coords + c.coords + d.coords) * 0.25);
            visit(&center, -4.0 / 5.0);
            for i in 0..4 {
                let mut p = center.coords * (4.0 / 6.0);
                p += x[i].coords * (1.0 / 3.0);
                // 1/2 on vertex i and 1/6 on the others
                visit(&Point3::from(p), 9.0 / 20.0);
            }
        }
    }
}
