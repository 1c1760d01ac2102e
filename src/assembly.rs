//! Cellwise assembly of scalar equations into global sparse systems.
//!
//! A [`ScalarEquation`] gathers the terms, boundary conditions and [`DiscretizationParams`] of an
//! equation. A [`VertexScheme`] turns it into an [`AssembledSystem`] by building the local system
//! of every cell and scattering it into a CSR matrix whose pattern follows the cell to vertex
//! relation.
mod boundary;
mod equation;
mod flux;
mod global;
mod params;
mod scheme;
mod system;
mod terms;

pub use boundary::*;
pub use equation::*;
pub use flux::*;
pub use global::*;
pub use params::*;
pub use scheme::*;
pub use system::*;
