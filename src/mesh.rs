//! Raw polyhedral mesh input.
//!
//! A [`RawMesh`] carries only what a mesh reader provides: vertex coordinates, one vertex loop
//! per face, one face list per cell and named groups of boundary faces. Faces are numbered with
//! all interior faces first, followed by the boundary faces. A boundary face is referred to
//! either by its global face id, or by its *boundary id* `f - n_interior_faces`.
use crate::error::CdoError;
use nalgebra::Point3;
use polycdo_index::Adjacency;
use serde::{Deserialize, Serialize};

pub mod procedural;

/// A named group of boundary faces, listed by boundary id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Zone {
    name: String,
    faces: Vec<usize>,
}

impl Zone {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn faces(&self) -> &[usize] {
        &self.faces
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawMesh {
    vertices: Vec<Point3<f64>>,
    face_vertices: Adjacency,
    n_interior_faces: usize,
    cell_faces: Adjacency,
    zones: Vec<Zone>,
}

impl RawMesh {
    /// Assemble a mesh from its raw parts, checking that every id is in bounds.
    ///
    /// The first `n_interior_faces` faces of `face_vertices` are the interior faces.
    pub fn from_parts(
        vertices: Vec<Point3<f64>>,
        face_vertices: Adjacency,
        n_interior_faces: usize,
        cell_faces: Adjacency,
    ) -> Result<Self, CdoError> {
        let n_vertices = vertices.len();
        let n_faces = face_vertices.len();
        if n_interior_faces > n_faces {
            return Err(CdoError::InvalidMesh(format!(
                "{n_interior_faces} interior faces declared, but the mesh only has {n_faces} faces"
            )));
        }
        for (f, loop_vertices) in face_vertices.iter().enumerate() {
            if loop_vertices.len() < 3 {
                return Err(CdoError::InvalidMesh(format!(
                    "face {f} has {} vertices, at least 3 are needed",
                    loop_vertices.len()
                )));
            }
            if let Some(&v) = loop_vertices.iter().find(|&&v| v >= n_vertices) {
                return Err(CdoError::InvalidMesh(format!(
                    "face {f} references vertex {v}, but the mesh only has {n_vertices} vertices"
                )));
            }
        }
        for (c, faces) in cell_faces.iter().enumerate() {
            if faces.len() < 4 {
                return Err(CdoError::InvalidMesh(format!(
                    "cell {c} has {} faces, at least 4 are needed",
                    faces.len()
                )));
            }
            if let Some(&f) = faces.iter().find(|&&f| f >= n_faces) {
                return Err(CdoError::InvalidMesh(format!(
                    "cell {c} references face {f}, but the mesh only has {n_faces} faces"
                )));
            }
        }

        Ok(Self {
            vertices,
            face_vertices,
            n_interior_faces,
            cell_faces,
            zones: Vec::new(),
        })
    }

    /// Attach a named group of boundary faces (given by boundary id).
    ///
    /// Defining a zone with an existing name replaces the previous definition.
    pub fn with_zone(mut self, name: impl Into<String>, faces: Vec<usize>) -> Result<Self, CdoError> {
        let name = name.into();
        let n_boundary_faces = self.n_boundary_faces();
        if let Some(&b) = faces.iter().find(|&&b| b >= n_boundary_faces) {
            return Err(CdoError::InvalidMesh(format!(
                "zone `{name}` references boundary face {b}, but the mesh only has {n_boundary_faces} boundary faces"
            )));
        }
        self.zones.retain(|zone| zone.name != name);
        self.zones.push(Zone { name, faces });
        Ok(self)
    }

    pub fn vertices(&self) -> &[Point3<f64>] {
        &self.vertices
    }

    pub fn face_vertices(&self) -> &Adjacency {
        &self.face_vertices
    }

    pub fn cell_faces(&self) -> &Adjacency {
        &self.cell_faces
    }

    pub fn zones(&self) -> &[Zone] {
        &self.zones
    }

    pub fn zone(&self, name: &str) -> Option<&Zone> {
        self.zones.iter().find(|zone| zone.name == name)
    }

    pub fn n_vertices(&self) -> usize {
        self.vertices.len()
    }

    pub fn n_faces(&self) -> usize {
        self.face_vertices.len()
    }

    pub fn n_interior_faces(&self) -> usize {
        self.n_interior_faces
    }

    pub fn n_boundary_faces(&self) -> usize {
        self.n_faces() - self.n_interior_faces
    }

    pub fn n_cells(&self) -> usize {
        self.cell_faces.len()
    }

    /// Apply `transformation` to every vertex, leaving the topology untouched.
    pub fn transform_vertices<F>(&mut self, mut transformation: F)
    where
        F: FnMut(&mut Point3<f64>),
    {
        for v in &mut self.vertices {
            transformation(v)
        }
    }
}
