//! Compatible Discrete Operator schemes on polyhedral meshes.
//!
//! The crate is organized bottom-up: [`connectivity`] derives the adjacency relations of a
//! [`mesh::RawMesh`], [`quantities`] its geometric quantities, and both are bundled in an
//! immutable [`context::CdoContext`]. Cell-local views ([`local`]) feed the discrete Hodge
//! operators ([`hodge`]) and the cellwise assembler ([`assembly`]).
pub mod assembly;
pub mod connectivity;
pub mod context;
pub mod error;
pub mod hodge;
pub mod interface;
pub mod local;
pub mod mesh;
pub mod property;
pub mod quadrature;
pub mod quantities;
pub mod solve;

pub(crate) mod workspace;

pub extern crate nalgebra;
pub extern crate nalgebra_sparse;
pub extern crate polycdo_index;
