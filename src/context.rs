use crate::connectivity::Connectivity;
use crate::error::CdoError;
use crate::mesh::RawMesh;
use crate::quantities::Quantities;

/// The immutable mesh data shared by every builder and assembler.
///
/// Built once per mesh, then only ever borrowed.
#[derive(Debug, Clone)]
pub struct CdoContext {
    mesh: RawMesh,
    connectivity: Connectivity,
    quantities: Quantities,
}

impl CdoContext {
    pub fn new(mesh: RawMesh) -> Result<Self, CdoError> {
        let connectivity = Connectivity::build(&mesh)?;
        let quantities = Quantities::compute(&mesh, &connectivity);
        Ok(Self {
            mesh,
            connectivity,
            quantities,
        })
    }

    pub fn mesh(&self) -> &RawMesh {
        &self.mesh
    }

    pub fn connectivity(&self) -> &Connectivity {
        &self.connectivity
    }

    pub fn quantities(&self) -> &Quantities {
        &self.quantities
    }
}
