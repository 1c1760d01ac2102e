//! Errors raised while setting up connectivity, Hodge builders and assemblers.
//!
//! All of these indicate a defect in the input (a corrupt mesh or an inconsistent choice of
//! discretization options). They are reported once, at setup, and are never raised from the
//! per-cell hot loop.
use crate::hodge::{HodgeAlgorithm, HodgePairing};
use polycdo_index::InvalidAdjacency;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CdoError {
    #[error("connectivity: face {face} has no edge between vertices {v1} and {v2}")]
    OrphanEdge { face: usize, v1: usize, v2: usize },

    #[error("connectivity: interior face {face} has {n_cells} neighboring cells (expected 2)")]
    InteriorFaceNeighbours { face: usize, n_cells: usize },

    #[error("connectivity: boundary face {face} has {n_cells} neighboring cells (expected 1)")]
    BoundaryFaceNeighbours { face: usize, n_cells: usize },

    #[error("connectivity: interior face {face} has the same orientation in both cells {c1} and {c2}")]
    InconsistentOrientation { face: usize, c1: usize, c2: usize },

    #[error("connectivity: the normal of boundary face {face} points into its cell {cell}")]
    InwardBoundaryFace { face: usize, cell: usize },

    #[error("mesh: {0}")]
    InvalidMesh(String),

    #[error("mesh: malformed index relation `{relation}`: {source}")]
    InvalidRelation {
        relation: &'static str,
        #[source]
        source: InvalidAdjacency,
    },

    #[error("hodge: algorithm {algorithm:?} does not support the pairing {pairing:?}")]
    UnsupportedHodge {
        pairing: HodgePairing,
        algorithm: HodgeAlgorithm,
    },

    #[error("hodge: invalid parameter: {0}")]
    InvalidHodgeParam(String),

    #[error("boundary: zone `{zone}` is not defined on the mesh")]
    UndefinedZone { zone: String },

    #[error("scheme: unsupported discretization: {0}")]
    UnsupportedDiscretization(String),

    #[error("sparsity: {0}")]
    Sparsity(String),

    #[error("{what}: expected an array of length {expected}, got {actual}")]
    ArraySizeMismatch {
        what: String,
        expected: usize,
        actual: usize,
    },
}
