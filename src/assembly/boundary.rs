//! Boundary conditions attached to named zones, and their per-cell view.
use crate::assembly::equation::AnalyticScalar;
use crate::assembly::params::DefaultBoundary;
use crate::connectivity::Connectivity;
use crate::context::CdoContext;
use crate::error::CdoError;
use crate::local::CellMesh;
use nalgebra::Point3;
use std::fmt;
use std::sync::Arc;

#[derive(Clone)]
pub enum BoundaryValue {
    Constant(f64),
    Analytic(AnalyticScalar),
    /// One value per face of the zone, in the order of the zone face list.
    PerFace(Arc<[f64]>),
}

impl fmt::Debug for BoundaryValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Constant(value) => f.debug_tuple("Constant").field(value).finish(),
            Self::Analytic(_) => write!(f, "Analytic(..)"),
            Self::PerFace(values) => write!(f, "PerFace([{} values])", values.len()),
        }
    }
}

impl BoundaryValue {
    pub fn analytic<F>(function: F) -> Self
    where
        F: Fn(&Point3<f64>, f64) -> f64 + Send + Sync + 'static,
    {
        Self::Analytic(Arc::new(function))
    }

    /// Evaluate for the face at position `position_in_zone` of its zone, at point `x`.
    pub fn evaluate(&self, position_in_zone: usize, x: &Point3<f64>, t: f64) -> f64 {
        match self {
            Self::Constant(value) => *value,
            Self::Analytic(function) => function(x, t),
            Self::PerFace(values) => values[position_in_zone],
        }
    }
}

#[derive(Debug, Clone)]
pub enum BoundaryCondition {
    Dirichlet(BoundaryValue),
    /// Prescribed flux density `K grad(u) . n`, with `n` the outward normal.
    Neumann(BoundaryValue),
    /// `-K grad(u) . n = alpha (u - u0) + g`.
    Robin { alpha: f64, u0: f64, g: BoundaryValue },
}

impl BoundaryCondition {
    pub fn dirichlet(value: f64) -> Self {
        Self::Dirichlet(BoundaryValue::Constant(value))
    }

    pub fn neumann(value: f64) -> Self {
        Self::Neumann(BoundaryValue::Constant(value))
    }

    pub fn robin(alpha: f64, u0: f64, g: f64) -> Self {
        Self::Robin {
            alpha,
            u0,
            g: BoundaryValue::Constant(g),
        }
    }

    pub fn flag(&self) -> DofFlag {
        match self {
            Self::Dirichlet(_) => DofFlag::Dirichlet,
            Self::Neumann(_) => DofFlag::Neumann,
            Self::Robin { .. } => DofFlag::Robin,
        }
    }

    fn value(&self) -> &BoundaryValue {
        match self {
            Self::Dirichlet(value) | Self::Neumann(value) => value,
            Self::Robin { g, .. } => g,
        }
    }
}

#[derive(Debug, Clone)]
pub struct BoundaryDefinition {
    pub zone: String,
    pub condition: BoundaryCondition,
}

/// Classification of a degree of freedom by the boundary conditions of the faces around it.
///
/// Variants are ordered by priority: a vertex shared by faces of different kinds takes the
/// largest.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum DofFlag {
    #[default]
    None,
    Neumann,
    Robin,
    Dirichlet,
}

static HOMOGENEOUS_DIRICHLET: BoundaryCondition = BoundaryCondition::Dirichlet(BoundaryValue::Constant(0.0));
static HOMOGENEOUS_NEUMANN: BoundaryCondition = BoundaryCondition::Neumann(BoundaryValue::Constant(0.0));

/// The boundary condition of every boundary face.
#[derive(Debug, Clone)]
pub struct BoundaryFaceMap {
    n_interior_faces: usize,
    definitions: Vec<BoundaryDefinition>,
    // Definition index and position in the zone, per boundary face
    face_definitions: Vec<Option<(usize, usize)>>,
    default: DefaultBoundary,
}

impl BoundaryFaceMap {
    pub fn build(
        ctx: &CdoContext,
        definitions: &[BoundaryDefinition],
        default: DefaultBoundary,
    ) -> Result<Self, CdoError> {
        let mesh = ctx.mesh();
        let mut face_definitions = vec![None; mesh.n_boundary_faces()];
        for (d, definition) in definitions.iter().enumerate() {
            let zone = mesh.zone(&definition.zone).ok_or_else(|| CdoError::UndefinedZone {
                zone: definition.zone.clone(),
            })?;
            if let BoundaryValue::PerFace(values) = definition.condition.value() {
                if values.len() != zone.faces().len() {
                    return Err(CdoError::ArraySizeMismatch {
                        what: format!("boundary values on zone `{}`", definition.zone),
                        expected: zone.faces().len(),
                        actual: values.len(),
                    });
                }
            }
            for (position, &b) in zone.faces().iter().enumerate() {
                face_definitions[b] = Some((d, position));
            }
        }
        Ok(Self {
            n_interior_faces: mesh.n_interior_faces(),
            definitions: definitions.to_vec(),
            face_definitions,
            default,
        })
    }

    pub fn n_boundary_faces(&self) -> usize {
        self.face_definitions.len()
    }

    /// The condition of boundary face `b`, with the position of the face in its zone.
    pub fn condition(&self, b: usize) -> (&BoundaryCondition, usize) {
        match self.face_definitions[b] {
            Some((d, position)) => (&self.definitions[d].condition, position),
            None => match self.default {
                DefaultBoundary::HomogeneousDirichlet => (&HOMOGENEOUS_DIRICHLET, 0),
                DefaultBoundary::HomogeneousNeumann => (&HOMOGENEOUS_NEUMANN, 0),
            },
        }
    }

    pub fn flag(&self, b: usize) -> DofFlag {
        self.condition(b).0.flag()
    }

    /// Evaluate the value (Dirichlet value, Neumann flux or Robin `g`) of face `b` at `x`.
    pub fn value(&self, b: usize, x: &Point3<f64>, t: f64) -> f64 {
        let (condition, position) = self.condition(b);
        condition.value().evaluate(position, x, t)
    }

    pub fn has_dirichlet(&self) -> bool {
        (0..self.n_boundary_faces()).any(|b| self.flag(b) == DofFlag::Dirichlet)
    }

    /// Classify every vertex and compute the Dirichlet value of the Dirichlet vertices at time
    /// `t`.
    ///
    /// The value at a vertex is the mean over its Dirichlet faces of the face values evaluated at
    /// the vertex.
    pub fn vertex_values(&self, ctx: &CdoContext, t: f64) -> VertexBoundaryValues {
        let connect = ctx.connectivity();
        let n_vertices = connect.n_vertices();
        let mut flags = vec![DofFlag::None; n_vertices];
        let mut values = vec![0.0; n_vertices];
        let mut counts = vec![0usize; n_vertices];

        for b in 0..self.n_boundary_faces() {
            let f = self.n_interior_faces + b;
            let (condition, position) = self.condition(b);
            let flag = condition.flag();
            for &v in connect.f2v().get(f) {
                flags[v] = flags[v].max(flag);
                if let BoundaryCondition::Dirichlet(value) = condition {
                    values[v] += value.evaluate(position, ctx.quantities().vertex(v), t);
                    counts[v] += 1;
                }
            }
        }
        for (value, &count) in values.iter_mut().zip(&counts) {
            if count > 0 {
                *value /= count as f64;
            }
        }

        VertexBoundaryValues { flags, values }
    }
}

/// Per-vertex boundary classification and Dirichlet values at one time.
#[derive(Debug, Clone, PartialEq)]
pub struct VertexBoundaryValues {
    flags: Vec<DofFlag>,
    values: Vec<f64>,
}

impl VertexBoundaryValues {
    pub fn flags(&self) -> &[DofFlag] {
        &self.flags
    }

    /// Dirichlet values (zero on non-Dirichlet vertices).
    pub fn values(&self) -> &[f64] {
        &self.values
    }
}

/// A boundary face of a cell.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub struct CellBoundaryFace {
    /// Local id in the cell view.
    pub local: usize,
    /// Boundary id of the face.
    pub boundary_id: usize,
    pub flag: DofFlag,
}

/// The boundary conditions seen by one cell.
#[derive(Debug, Clone)]
pub struct CellBoundaryView {
    n_faces: usize,
    faces: Vec<CellBoundaryFace>,
    n_dofs: usize,
    dof_flags: Vec<DofFlag>,
    dir_values: Vec<f64>,
}

impl CellBoundaryView {
    pub fn with_capacity(n_faces: usize, n_dofs: usize) -> Self {
        Self {
            n_faces: 0,
            faces: vec![CellBoundaryFace::default(); n_faces],
            n_dofs: 0,
            dof_flags: vec![DofFlag::None; n_dofs],
            dir_values: vec![0.0; n_dofs],
        }
    }

    /// Forget every boundary face and classify all `n_dofs` degrees of freedom as free.
    pub fn clear(&mut self, n_dofs: usize) {
        self.n_faces = 0;
        self.n_dofs = n_dofs;
        self.dof_flags[..n_dofs].fill(DofFlag::None);
        self.dir_values[..n_dofs].fill(0.0);
    }

    /// Gather the boundary data of the cell `cm`, which must hold `VERTICES | FACES`.
    pub fn populate(
        &mut self,
        cm: &CellMesh,
        connectivity: &Connectivity,
        map: &BoundaryFaceMap,
        vertex_values: &VertexBoundaryValues,
    ) {
        self.clear(cm.n_vertices());
        for (k, &v) in cm.vertex_ids().iter().enumerate() {
            self.dof_flags[k] = vertex_values.flags[v];
            self.dir_values[k] = vertex_values.values[v];
        }
        if cm.n_boundary_faces() == 0 {
            return;
        }
        for (local, &f) in cm.face_ids().iter().enumerate() {
            if connectivity.is_boundary_face(f) {
                let boundary_id = f - connectivity.n_interior_faces();
                self.faces[self.n_faces] = CellBoundaryFace {
                    local,
                    boundary_id,
                    flag: map.flag(boundary_id),
                };
                self.n_faces += 1;
            }
        }
    }

    pub fn faces(&self) -> &[CellBoundaryFace] {
        &self.faces[..self.n_faces]
    }

    pub fn dof_flags(&self) -> &[DofFlag] {
        &self.dof_flags[..self.n_dofs]
    }

    pub fn dirichlet_values(&self) -> &[f64] {
        &self.dir_values[..self.n_dofs]
    }

    pub fn has_dirichlet_dof(&self) -> bool {
        self.dof_flags().contains(&DofFlag::Dirichlet)
    }

    pub fn is_empty(&self) -> bool {
        self.n_faces == 0 && !self.dof_flags().iter().any(|&flag| flag != DofFlag::None)
    }
}
