//! Adjacency relations between the cells, faces, edges and vertices of a polyhedral mesh.
//!
//! Edges do not exist in the raw mesh. They are extracted from the face vertex loops and
//! numbered by sorting the canonical `(lower, higher)` vertex pairs. Orientation conventions:
//!
//! - an edge is oriented from its lower to its higher vertex id, so `e2v` carries the signs
//!   `-1` (lower) and `+1` (higher);
//! - the sign of an edge in `f2e` is `+1` when the face loop runs along the edge orientation;
//! - the sign of a face in `c2f` is `+1` when the face normal (right-hand rule on the loop)
//!   points out of the cell.
use crate::error::CdoError;
use crate::mesh::RawMesh;
use itertools::Itertools;
use log::info;
use nalgebra::{Point3, Vector3};
use polycdo_index::Adjacency;
use rayon::slice::ParallelSliceMut;
use serde::{Deserialize, Serialize};

/// Position of an entity with respect to the domain boundary.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BoundaryClass {
    Interior,
    /// On the border, with at least one neighbor away from the border.
    BorderInterior,
    /// On the border, and every neighbor is on the border as well.
    BorderBorder,
}

impl BoundaryClass {
    pub fn is_border(&self) -> bool {
        !matches!(self, Self::Interior)
    }
}

/// Mesh-wide maxima used to size per-cell scratch storage.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeshMaxima {
    pub n_vertices_per_cell: usize,
    pub n_edges_per_cell: usize,
    pub n_faces_per_cell: usize,
    pub n_vertices_per_face: usize,
    /// Largest sum over the faces of a cell of the number of face edges.
    pub n_face_edges_per_cell: usize,
    pub n_cells_per_vertex: usize,
}

impl MeshMaxima {
    /// The largest number of entities of any kind in a single cell.
    pub fn n_entities_per_cell(&self) -> usize {
        self.n_vertices_per_cell
            .max(self.n_edges_per_cell)
            .max(self.n_faces_per_cell)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Connectivity {
    n_vertices: usize,
    n_edges: usize,
    n_faces: usize,
    n_interior_faces: usize,
    n_cells: usize,

    c2f: Adjacency,
    f2c: Adjacency,
    f2e: Adjacency,
    e2f: Adjacency,
    e2v: Adjacency,
    v2e: Adjacency,
    f2v: Adjacency,
    c2e: Adjacency,
    c2v: Adjacency,
    v2c: Adjacency,

    // Edges sorted by (lower, higher) vertex: the edges whose lower vertex is v are
    // contiguous, in the range given by this relation
    v2v_upper: Adjacency,

    cell_class: Vec<BoundaryClass>,
    vertex_class: Vec<BoundaryClass>,
    border_edges: Vec<bool>,
    cell_boundary_faces: Vec<usize>,

    maxima: MeshMaxima,
}

impl Connectivity {
    pub fn build(mesh: &RawMesh) -> Result<Self, CdoError> {
        let n_vertices = mesh.n_vertices();
        let n_faces = mesh.n_faces();
        let n_cells = mesh.n_cells();
        let f2v = mesh.face_vertices().clone();

        let (edges, v2v_upper) = extract_edges(&f2v, n_vertices)?;
        let n_edges = edges.len();
        let f2e = build_face_edges(&f2v, &edges, &v2v_upper)?;

        let mut e2v = Adjacency::new();
        for &(v1, v2) in &edges {
            e2v.push_signed(&[v1, v2], &[-1, 1]);
        }

        let c2f = build_cell_faces(mesh)?;
        let f2c = build_face_cells(&c2f, mesh)?;

        let e2f = f2e.transpose(n_edges);
        let v2e = e2v.transpose(n_vertices);
        let c2e = c2f.compose(&f2e, n_edges);
        let c2v = c2e.compose(&e2v, n_vertices);
        let v2c = c2v.transpose(n_vertices);

        let mut connectivity = Self {
            n_vertices,
            n_edges,
            n_faces,
            n_interior_faces: mesh.n_interior_faces(),
            n_cells,
            c2f,
            f2c,
            f2e,
            e2f,
            e2v,
            v2e,
            f2v,
            c2e,
            c2v,
            v2c,
            v2v_upper,
            cell_class: Vec::new(),
            vertex_class: Vec::new(),
            border_edges: Vec::new(),
            cell_boundary_faces: Vec::new(),
            maxima: MeshMaxima::default(),
        };
        connectivity.classify_entities();
        connectivity.maxima = connectivity.compute_maxima();

        info!(
            "Built connectivity: {} cells, {} faces ({} interior), {} edges, {} vertices. \
             Max per cell: {} faces, {} edges, {} vertices",
            n_cells,
            n_faces,
            connectivity.n_interior_faces,
            n_edges,
            n_vertices,
            connectivity.maxima.n_faces_per_cell,
            connectivity.maxima.n_edges_per_cell,
            connectivity.maxima.n_vertices_per_cell
        );

        Ok(connectivity)
    }

    fn classify_entities(&mut self) {
        let mut border_vertices = vec![false; self.n_vertices];
        let mut border_edges = vec![false; self.n_edges];
        let mut cell_boundary_faces = vec![0usize; self.n_cells];

        for f in self.n_interior_faces..self.n_faces {
            for &e in self.f2e.get(f) {
                border_edges[e] = true;
            }
            for &v in self.f2v.get(f) {
                border_vertices[v] = true;
            }
            for &c in self.f2c.get(f) {
                cell_boundary_faces[c] += 1;
            }
        }

        let vertex_class = (0..self.n_vertices)
            .map(|v| {
                if !border_vertices[v] {
                    BoundaryClass::Interior
                } else {
                    let all_neighbors_on_border = self
                        .v2e
                        .get(v)
                        .iter()
                        .flat_map(|&e| self.e2v.get(e))
                        .all(|&w| border_vertices[w]);
                    if all_neighbors_on_border {
                        BoundaryClass::BorderBorder
                    } else {
                        BoundaryClass::BorderInterior
                    }
                }
            })
            .collect();

        let cell_class = (0..self.n_cells)
            .map(|c| {
                let vertices = self.c2v.get(c);
                let n_border = vertices.iter().filter(|&&v| border_vertices[v]).count();
                if n_border == 0 {
                    BoundaryClass::Interior
                } else if n_border == vertices.len() {
                    BoundaryClass::BorderBorder
                } else {
                    BoundaryClass::BorderInterior
                }
            })
            .collect();

        self.vertex_class = vertex_class;
        self.cell_class = cell_class;
        self.border_edges = border_edges;
        self.cell_boundary_faces = cell_boundary_faces;
    }

    fn compute_maxima(&self) -> MeshMaxima {
        let n_face_edges_per_cell = (0..self.n_cells)
            .map(|c| {
                self.c2f
                    .get(c)
                    .iter()
                    .map(|&f| self.f2e.degree(f))
                    .sum::<usize>()
            })
            .max()
            .unwrap_or(0);
        MeshMaxima {
            n_vertices_per_cell: self.c2v.max_degree(),
            n_edges_per_cell: self.c2e.max_degree(),
            n_faces_per_cell: self.c2f.max_degree(),
            n_vertices_per_face: self.f2v.max_degree(),
            n_face_edges_per_cell,
            n_cells_per_vertex: self.v2c.max_degree(),
        }
    }

    pub fn n_vertices(&self) -> usize {
        self.n_vertices
    }

    pub fn n_edges(&self) -> usize {
        self.n_edges
    }

    pub fn n_faces(&self) -> usize {
        self.n_faces
    }

    pub fn n_interior_faces(&self) -> usize {
        self.n_interior_faces
    }

    pub fn n_boundary_faces(&self) -> usize {
        self.n_faces - self.n_interior_faces
    }

    pub fn n_cells(&self) -> usize {
        self.n_cells
    }

    /// Cell to face, signed by the orientation of the face normal relative to the cell.
    pub fn c2f(&self) -> &Adjacency {
        &self.c2f
    }

    /// Face to cell, with the cell that sees the face normal as outward listed first.
    pub fn f2c(&self) -> &Adjacency {
        &self.f2c
    }

    pub fn f2e(&self) -> &Adjacency {
        &self.f2e
    }

    pub fn e2f(&self) -> &Adjacency {
        &self.e2f
    }

    pub fn e2v(&self) -> &Adjacency {
        &self.e2v
    }

    pub fn v2e(&self) -> &Adjacency {
        &self.v2e
    }

    /// Face to vertex, in loop order.
    pub fn f2v(&self) -> &Adjacency {
        &self.f2v
    }

    pub fn c2e(&self) -> &Adjacency {
        &self.c2e
    }

    pub fn c2v(&self) -> &Adjacency {
        &self.c2v
    }

    pub fn v2c(&self) -> &Adjacency {
        &self.v2c
    }

    pub fn cell_class(&self, c: usize) -> BoundaryClass {
        self.cell_class[c]
    }

    pub fn vertex_class(&self, v: usize) -> BoundaryClass {
        self.vertex_class[v]
    }

    pub fn is_border_edge(&self, e: usize) -> bool {
        self.border_edges[e]
    }

    pub fn is_boundary_face(&self, f: usize) -> bool {
        f >= self.n_interior_faces
    }

    /// Number of boundary faces of cell `c`.
    pub fn n_cell_boundary_faces(&self, c: usize) -> usize {
        self.cell_boundary_faces[c]
    }

    pub fn maxima(&self) -> &MeshMaxima {
        &self.maxima
    }

    /// Look up the edge between two vertices, in any order.
    pub fn edge_id(&self, v1: usize, v2: usize) -> Option<usize> {
        find_edge(&self.v2v_upper, v1, v2)
    }

    /// Cell to vertex through the face vertex loops instead of the edges.
    pub fn cell_vertices_through_faces(&self) -> Adjacency {
        self.c2f.compose(&self.f2v, self.n_vertices)
    }
}

/// Extract the unique canonical edges from the face loops.
///
/// Returns the sorted `(lower, higher)` pairs together with the relation that maps each vertex
/// to the contiguous range of edges of which it is the lower vertex (stored as upper vertex ids).
fn extract_edges(f2v: &Adjacency, n_vertices: usize) -> Result<(Vec<(usize, usize)>, Adjacency), CdoError> {
    let mut pairs = Vec::with_capacity(f2v.n_entries());
    for (f, face_loop) in f2v.iter().enumerate() {
        for (&a, &b) in face_loop.iter().circular_tuple_windows() {
            if a == b {
                return Err(CdoError::InvalidMesh(format!(
                    "face {f} has the vertex {a} twice in a row in its loop"
                )));
            }
            pairs.push((a.min(b), a.max(b)));
        }
    }
    pairs.par_sort_unstable();
    pairs.dedup();

    let mut counts = vec![0usize; n_vertices + 1];
    for &(a, _) in &pairs {
        counts[a + 1] += 1;
    }
    for v in 0..n_vertices {
        counts[v + 1] += counts[v];
    }
    let upper = pairs.iter().map(|&(_, b)| b).collect();
    let v2v_upper = Adjacency::from_offsets_and_ids(counts, upper).map_err(|source| CdoError::InvalidRelation {
        relation: "v2v",
        source,
    })?;

    Ok((pairs, v2v_upper))
}

fn find_edge(v2v_upper: &Adjacency, v1: usize, v2: usize) -> Option<usize> {
    let (lower, higher) = (v1.min(v2), v1.max(v2));
    if lower >= v2v_upper.len() {
        return None;
    }
    v2v_upper
        .get(lower)
        .binary_search(&higher)
        .ok()
        .map(|k| v2v_upper.offsets()[lower] + k)
}

fn build_face_edges(f2v: &Adjacency, edges: &[(usize, usize)], v2v_upper: &Adjacency) -> Result<Adjacency, CdoError> {
    let mut f2e = Adjacency::new();
    let mut face_edges = Vec::new();
    let mut face_signs = Vec::new();
    for (f, face_loop) in f2v.iter().enumerate() {
        face_edges.clear();
        face_signs.clear();
        for (&a, &b) in face_loop.iter().circular_tuple_windows() {
            let e = find_edge(v2v_upper, a, b).ok_or(CdoError::OrphanEdge { face: f, v1: a, v2: b })?;
            debug_assert_eq!(edges[e], (a.min(b), a.max(b)));
            face_edges.push(e);
            face_signs.push(if a < b { 1 } else { -1 });
        }
        f2e.push_signed(&face_edges, &face_signs);
    }
    Ok(f2e)
}

/// Area vector of a polygon (right-hand rule on the loop) by Newell's method.
fn polygon_area_vector(vertices: &[Point3<f64>], face_loop: &[usize]) -> Vector3<f64> {
    face_loop
        .iter()
        .circular_tuple_windows()
        .map(|(&a, &b)| vertices[a].coords.cross(&vertices[b].coords))
        .fold(Vector3::zeros(), |acc, x| acc + x)
        * 0.5
}

fn mean_point<'a>(points: impl Iterator<Item = &'a Point3<f64>>) -> Point3<f64> {
    let (sum, n) = points.fold((Vector3::zeros(), 0usize), |(sum, n), p| (sum + p.coords, n + 1));
    Point3::from(sum / n.max(1) as f64)
}

/// Cell to face, with signs decided from the face normals and an approximate cell center.
fn build_cell_faces(mesh: &RawMesh) -> Result<Adjacency, CdoError> {
    let vertices = mesh.vertices();
    let f2v = mesh.face_vertices();
    let face_centers: Vec<_> = f2v
        .iter()
        .map(|face_loop| mean_point(face_loop.iter().map(|&v| &vertices[v])))
        .collect();
    let face_normals: Vec<_> = f2v
        .iter()
        .map(|face_loop| polygon_area_vector(vertices, face_loop))
        .collect();

    let mut c2f = Adjacency::new();
    let mut signs = Vec::new();
    for faces in mesh.cell_faces().iter() {
        let mut cell_vertices: Vec<_> = faces
            .iter()
            .flat_map(|&f| f2v.get(f).iter().copied())
            .collect();
        cell_vertices.sort_unstable();
        cell_vertices.dedup();
        let center = mean_point(cell_vertices.iter().map(|&v| &vertices[v]));
        signs.clear();
        signs.extend(faces.iter().map(|&f| {
            if face_normals[f].dot(&(face_centers[f] - center)) >= 0.0 {
                1i8
            } else {
                -1i8
            }
        }));
        c2f.push_signed(faces, &signs);
    }
    Ok(c2f)
}

fn build_face_cells(c2f: &Adjacency, mesh: &RawMesh) -> Result<Adjacency, CdoError> {
    let n_interior_faces = mesh.n_interior_faces();
    let mut f2c = c2f.transpose(mesh.n_faces());
    for f in 0..f2c.len() {
        let n_cells = f2c.degree(f);
        if f < n_interior_faces {
            if n_cells != 2 {
                return Err(CdoError::InteriorFaceNeighbours { face: f, n_cells });
            }
            let cells = f2c.get(f);
            let signs = f2c.get_signs(f).unwrap_or(&[]);
            if signs[0] == signs[1] {
                return Err(CdoError::InconsistentOrientation {
                    face: f,
                    c1: cells[0],
                    c2: cells[1],
                });
            }
            if signs[0] < 0 {
                f2c.swap_in_list(f, 0, 1);
            }
        } else if n_cells != 1 {
            return Err(CdoError::BoundaryFaceNeighbours { face: f, n_cells });
        } else if f2c.get_signs(f).map_or(false, |signs| signs[0] < 0) {
            return Err(CdoError::InwardBoundaryFace {
                face: f,
                cell: f2c.get(f)[0],
            });
        }
    }
    Ok(f2c)
}
