//! Material properties: scalar, orthotropic or anisotropic, defined uniformly, per cell or by
//! an analytic function of position and time.
use nalgebra::{Matrix3, Point3, SymmetricEigen, Vector3};
use std::fmt;
use std::sync::Arc;

pub type AnalyticTensor = Arc<dyn Fn(&Point3<f64>, f64) -> Matrix3<f64> + Send + Sync>;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum PropertyKind {
    Isotropic,
    Orthotropic,
    Anisotropic,
}

#[derive(Clone)]
pub enum PropertyDefinition {
    Uniform(Matrix3<f64>),
    PerCell(Arc<[Matrix3<f64>]>),
    Analytic(AnalyticTensor),
}

impl fmt::Debug for PropertyDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Uniform(tensor) => f.debug_tuple("Uniform").field(tensor).finish(),
            Self::PerCell(values) => write!(f, "PerCell([{} values])", values.len()),
            Self::Analytic(_) => write!(f, "Analytic(..)"),
        }
    }
}

/// A material property, always stored as a 3x3 tensor.
///
/// Scalar properties are stored as multiples of the identity.
#[derive(Debug, Clone)]
pub struct Property {
    name: String,
    kind: PropertyKind,
    definition: PropertyDefinition,
}

impl Property {
    pub fn isotropic(name: impl Into<String>, value: f64) -> Self {
        Self::new(name, PropertyKind::Isotropic, PropertyDefinition::Uniform(Matrix3::identity() * value))
    }

    pub fn orthotropic(name: impl Into<String>, diagonal: Vector3<f64>) -> Self {
        Self::new(
            name,
            PropertyKind::Orthotropic,
            PropertyDefinition::Uniform(Matrix3::from_diagonal(&diagonal)),
        )
    }

    pub fn anisotropic(name: impl Into<String>, tensor: Matrix3<f64>) -> Self {
        Self::new(name, PropertyKind::Anisotropic, PropertyDefinition::Uniform(tensor))
    }

    pub fn isotropic_per_cell(name: impl Into<String>, values: &[f64]) -> Self {
        let tensors: Vec<_> = values.iter().map(|&v| Matrix3::identity() * v).collect();
        Self::new(name, PropertyKind::Isotropic, PropertyDefinition::PerCell(tensors.into()))
    }

    pub fn anisotropic_per_cell(name: impl Into<String>, tensors: Vec<Matrix3<f64>>) -> Self {
        Self::new(name, PropertyKind::Anisotropic, PropertyDefinition::PerCell(tensors.into()))
    }

    pub fn isotropic_analytic<F>(name: impl Into<String>, function: F) -> Self
    where
        F: Fn(&Point3<f64>, f64) -> f64 + Send + Sync + 'static,
    {
        let definition = PropertyDefinition::Analytic(Arc::new(move |x: &Point3<f64>, t: f64| {
            Matrix3::identity() * function(x, t)
        }));
        Self::new(name, PropertyKind::Isotropic, definition)
    }

    pub fn anisotropic_analytic<F>(name: impl Into<String>, function: F) -> Self
    where
        F: Fn(&Point3<f64>, f64) -> Matrix3<f64> + Send + Sync + 'static,
    {
        Self::new(name, PropertyKind::Anisotropic, PropertyDefinition::Analytic(Arc::new(function)))
    }

    pub fn new(name: impl Into<String>, kind: PropertyKind, definition: PropertyDefinition) -> Self {
        Self {
            name: name.into(),
            kind,
            definition,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> PropertyKind {
        self.kind
    }

    pub fn definition(&self) -> &PropertyDefinition {
        &self.definition
    }

    pub fn is_uniform(&self) -> bool {
        matches!(self.definition, PropertyDefinition::Uniform(_))
    }

    /// Number of values a per-cell definition holds.
    pub fn n_cell_values(&self) -> Option<usize> {
        match &self.definition {
            PropertyDefinition::PerCell(values) => Some(values.len()),
            _ => None,
        }
    }

    /// The tensor in cell `c_id`, with barycenter `xc`, at time `t`.
    pub fn tensor_in_cell(&self, c_id: usize, xc: &Point3<f64>, t: f64) -> Matrix3<f64> {
        match &self.definition {
            PropertyDefinition::Uniform(tensor) => *tensor,
            PropertyDefinition::PerCell(tensors) => tensors[c_id],
            PropertyDefinition::Analytic(function) => function(xc, t),
        }
    }

    /// The scalar value in cell `c_id`. For tensors this is the mean of the diagonal.
    pub fn value_in_cell(&self, c_id: usize, xc: &Point3<f64>, t: f64) -> f64 {
        scalar_value(&self.tensor_in_cell(c_id, xc, t))
    }
}

pub fn scalar_value(tensor: &Matrix3<f64>) -> f64 {
    tensor.trace() / 3.0
}

/// Ratio between the largest and the smallest eigenvalue, and the largest eigenvalue, of a
/// symmetric tensor.
pub fn eigen_ratio_and_max(tensor: &Matrix3<f64>) -> (f64, f64) {
    if is_diagonal(tensor) {
        let d = tensor.diagonal();
        let (min, max) = (d.min(), d.max());
        return (max / min, max);
    }
    let eigenvalues = SymmetricEigen::new(*tensor).eigenvalues;
    let (min, max) = (eigenvalues.min(), eigenvalues.max());
    debug_assert!(min > 0.0, "Property tensor is not positive definite");
    (max / min, max)
}

fn is_diagonal(tensor: &Matrix3<f64>) -> bool {
    (0..3).all(|i| (0..3).all(|j| i == j || tensor[(i, j)] == 0.0))
}
