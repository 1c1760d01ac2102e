//! Primal and dual geometric quantities of a polyhedral mesh.
//!
//! Cell quantities rely on the decomposition of every cell into the tetrahedra
//! `(x_c, x_f, v1, v2)`, one for each face `f` of the cell and each edge `(v1, v2)` of the face.
//! This decomposition is exact for cells that are star-shaped with respect to their barycenter
//! and that have planar faces.
//!
//! Dual quantities are attached to a pair (cell, primal entity) and stored in the order of the
//! corresponding relation: dual faces follow `c2e`, dual edges follow `c2f` and dual cell volumes
//! follow `c2v`.
use crate::connectivity::Connectivity;
use crate::mesh::RawMesh;
use itertools::Itertools;
use nalgebra::{Point3, Vector3};
use serde::{Deserialize, Serialize};

/// Measure, unit direction and center of an edge or a face.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrimalQuantity {
    pub meas: f64,
    pub unitv: Vector3<f64>,
    pub center: Point3<f64>,
}

impl PrimalQuantity {
    pub fn vector(&self) -> Vector3<f64> {
        self.unitv * self.meas
    }
}

impl Default for PrimalQuantity {
    fn default() -> Self {
        Self {
            meas: 0.0,
            unitv: Vector3::zeros(),
            center: Point3::origin(),
        }
    }
}

/// A triangle `(x_e, x_f, x_c)` of a dual face.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubArea {
    pub meas: f64,
    pub unitv: Vector3<f64>,
}

impl Default for SubArea {
    fn default() -> Self {
        Self {
            meas: 0.0,
            unitv: Vector3::zeros(),
        }
    }
}

/// The portion of the dual face of an edge inside one cell.
///
/// It is made of two triangles, one for each face of the cell sharing the edge. Both are
/// oriented along the edge tangent.
#[derive(Debug, Copy, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DualFace {
    pub sub: [SubArea; 2],
}

impl DualFace {
    /// The area vector, sum of the area vectors of the two triangles.
    pub fn vector(&self) -> Vector3<f64> {
        self.sub
            .iter()
            .fold(Vector3::zeros(), |acc, s| acc + s.unitv * s.meas)
    }
}

/// The portion of the dual edge of a face inside one cell, from the cell barycenter to the face
/// centroid and oriented along the face normal.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct DualEdge {
    pub meas: f64,
    pub unitv: Vector3<f64>,
}

impl DualEdge {
    pub fn vector(&self) -> Vector3<f64> {
        self.unitv * self.meas
    }
}

impl Default for DualEdge {
    fn default() -> Self {
        Self {
            meas: 0.0,
            unitv: Vector3::zeros(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quantities {
    cell_centers: Vec<Point3<f64>>,
    cell_volumes: Vec<f64>,
    faces: Vec<PrimalQuantity>,
    edges: Vec<PrimalQuantity>,
    vertices: Vec<Point3<f64>>,
    dual_faces: Vec<DualFace>,
    dual_edges: Vec<DualEdge>,
    dual_volumes: Vec<f64>,
    vertex_dual_volumes: Vec<f64>,
    face_edge_areas: Vec<f64>,
}

impl Quantities {
    pub fn compute(mesh: &RawMesh, connectivity: &Connectivity) -> Self {
        let vertices = mesh.vertices().to_vec();
        let f2v = connectivity.f2v();
        let f2e = connectivity.f2e();
        let e2v = connectivity.e2v();

        let edges: Vec<_> = (0..connectivity.n_edges())
            .map(|e| {
                let (v1, v2) = (e2v.get(e)[0], e2v.get(e)[1]);
                let d = vertices[v2] - vertices[v1];
                let meas = d.norm();
                debug_assert!(meas > 0.0, "Edge {e} has zero length");
                PrimalQuantity {
                    meas,
                    unitv: d / meas,
                    center: nalgebra::center(&vertices[v1], &vertices[v2]),
                }
            })
            .collect();

        let faces: Vec<_> = (0..connectivity.n_faces())
            .map(|f| face_quantity(&vertices, f2v.get(f)))
            .collect();

        let face_edge_areas = (0..connectivity.n_faces())
            .flat_map(|f| {
                let xf = faces[f].center;
                let vertices = &vertices;
                f2e.get(f).iter().map(move |&e| {
                    let (v1, v2) = (e2v.get(e)[0], e2v.get(e)[1]);
                    0.5 * (vertices[v1] - xf).cross(&(vertices[v2] - xf)).norm()
                })
            })
            .collect();

        let mut quantities = Self {
            cell_centers: Vec::with_capacity(connectivity.n_cells()),
            cell_volumes: Vec::with_capacity(connectivity.n_cells()),
            faces,
            edges,
            vertices,
            dual_faces: vec![DualFace::default(); connectivity.c2e().n_entries()],
            dual_edges: vec![DualEdge::default(); connectivity.c2f().n_entries()],
            dual_volumes: vec![0.0; connectivity.c2v().n_entries()],
            vertex_dual_volumes: vec![0.0; connectivity.n_vertices()],
            face_edge_areas,
        };
        quantities.compute_cell_quantities(connectivity);
        quantities
    }

    fn compute_cell_quantities(&mut self, connectivity: &Connectivity) {
        let c2f = connectivity.c2f();
        let c2e = connectivity.c2e();
        let c2v = connectivity.c2v();
        let f2e = connectivity.f2e();
        let e2v = connectivity.e2v();

        // Local id of a global entity in the cell being processed. Entries of other cells are
        // stale but never read.
        let mut edge_local = vec![usize::MAX; connectivity.n_edges()];
        let mut vertex_local = vec![usize::MAX; connectivity.n_vertices()];
        let mut n_filled_subs = vec![0usize; connectivity.maxima().n_edges_per_cell];

        for c in 0..connectivity.n_cells() {
            for (k, &e) in c2e.get(c).iter().enumerate() {
                edge_local[e] = k;
            }
            for (k, &v) in c2v.get(c).iter().enumerate() {
                vertex_local[v] = k;
            }

            let cell_vertices = c2v.get(c);
            let x0 = Point3::from(
                cell_vertices
                    .iter()
                    .fold(Vector3::zeros(), |acc, &v| acc + self.vertices[v].coords)
                    / cell_vertices.len() as f64,
            );

            // Barycenter from the decomposition around x0
            let mut vol_c = 0.0;
            let mut moment = Vector3::zeros();
            for &f in c2f.get(c) {
                let xf = self.faces[f].center;
                for &e in f2e.get(f) {
                    let (x1, x2) = (self.vertices[e2v.get(e)[0]], self.vertices[e2v.get(e)[1]]);
                    let vol = tetrahedron_volume(&x0, &xf, &x1, &x2);
                    vol_c += vol;
                    moment += (x0.coords + xf.coords + x1.coords + x2.coords) * (0.25 * vol);
                }
            }
            debug_assert!(vol_c > 0.0, "Cell {c} has a non-positive volume");
            let xc = Point3::from(moment / vol_c);
            self.cell_centers.push(xc);
            self.cell_volumes.push(vol_c);

            let c2e_begin = c2e.offsets()[c];
            let c2v_begin = c2v.offsets()[c];
            n_filled_subs[..c2e.degree(c)].fill(0);

            for (&f, &sgn, slot) in itertools::izip!(c2f.get(c), c2f.get_signs(c).unwrap_or(&[]), c2f.range(c)) {
                let xf = self.faces[f].center;
                let de = (xf - xc) * f64::from(sgn);
                let meas = de.norm();
                self.dual_edges[slot] = DualEdge { meas, unitv: de / meas };

                for &e in f2e.get(f) {
                    let (v1, v2) = (e2v.get(e)[0], e2v.get(e)[1]);
                    let vol = tetrahedron_volume(&xc, &xf, &self.vertices[v1], &self.vertices[v2]);
                    for v in [v1, v2] {
                        self.dual_volumes[c2v_begin + vertex_local[v]] += 0.5 * vol;
                        self.vertex_dual_volumes[v] += 0.5 * vol;
                    }

                    let edge = &self.edges[e];
                    let mut area = 0.5 * (xf - edge.center).cross(&(xc - edge.center));
                    if area.dot(&edge.unitv) < 0.0 {
                        area = -area;
                    }
                    let meas = area.norm();
                    let k = edge_local[e];
                    let sub = n_filled_subs[k];
                    debug_assert!(sub < 2, "Edge {e} is shared by more than two faces of cell {c}");
                    self.dual_faces[c2e_begin + k].sub[sub.min(1)] = SubArea {
                        meas,
                        unitv: if meas > 0.0 { area / meas } else { area },
                    };
                    n_filled_subs[k] += 1;
                }
            }
        }
    }

    pub fn cell_center(&self, c: usize) -> &Point3<f64> {
        &self.cell_centers[c]
    }

    pub fn cell_volume(&self, c: usize) -> f64 {
        self.cell_volumes[c]
    }

    pub fn cell_centers(&self) -> &[Point3<f64>] {
        &self.cell_centers
    }

    pub fn cell_volumes(&self) -> &[f64] {
        &self.cell_volumes
    }

    pub fn face(&self, f: usize) -> &PrimalQuantity {
        &self.faces[f]
    }

    pub fn edge(&self, e: usize) -> &PrimalQuantity {
        &self.edges[e]
    }

    pub fn vertex(&self, v: usize) -> &Point3<f64> {
        &self.vertices[v]
    }

    /// Dual faces of the edges of the cells, in `c2e` order.
    pub fn dual_faces(&self) -> &[DualFace] {
        &self.dual_faces
    }

    /// Dual edges of the faces of the cells, in `c2f` order.
    pub fn dual_edges(&self) -> &[DualEdge] {
        &self.dual_edges
    }

    /// Volumes of the dual cell portions of the vertices of the cells, in `c2v` order.
    pub fn dual_volumes(&self) -> &[f64] {
        &self.dual_volumes
    }

    /// Total volume of the dual cell of vertex `v`.
    pub fn vertex_dual_volume(&self, v: usize) -> f64 {
        self.vertex_dual_volumes[v]
    }

    /// Areas of the triangles `(x_f, v1, v2)`, in `f2e` order.
    pub fn face_edge_areas(&self) -> &[f64] {
        &self.face_edge_areas
    }

    pub fn total_volume(&self) -> f64 {
        self.cell_volumes.iter().sum()
    }
}

pub fn tetrahedron_volume(x0: &Point3<f64>, x1: &Point3<f64>, x2: &Point3<f64>, x3: &Point3<f64>) -> f64 {
    ((x1 - x0).dot(&(x2 - x0).cross(&(x3 - x0))) / 6.0).abs()
}

fn face_quantity(vertices: &[Point3<f64>], face_loop: &[usize]) -> PrimalQuantity {
    let n = face_loop.len() as f64;
    let xm = Point3::from(
        face_loop
            .iter()
            .fold(Vector3::zeros(), |acc, &v| acc + vertices[v].coords)
            / n,
    );

    let area_vector = face_loop
        .iter()
        .circular_tuple_windows()
        .map(|(&a, &b)| 0.5 * (vertices[a] - xm).cross(&(vertices[b] - xm)))
        .fold(Vector3::zeros(), |acc, x| acc + x);
    let norm = area_vector.norm();
    debug_assert!(norm > 0.0, "Degenerate face");
    let unitv = area_vector / norm;

    let mut meas = 0.0;
    let mut moment = Vector3::zeros();
    for (&a, &b) in face_loop.iter().circular_tuple_windows() {
        let w = 0.5 * (vertices[a] - xm).cross(&(vertices[b] - xm)).dot(&unitv);
        meas += w;
        moment += (xm.coords + vertices[a].coords + vertices[b].coords) * (w / 3.0);
    }

    PrimalQuantity {
        meas,
        unitv,
        center: Point3::from(moment / meas),
    }
}
