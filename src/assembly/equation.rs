//! Definition of a scalar convection-diffusion-reaction equation.
use crate::assembly::boundary::{BoundaryCondition, BoundaryDefinition};
use crate::assembly::params::DiscretizationParams;
use crate::property::Property;
use crate::quadrature::QuadratureRule;
use nalgebra::{Point3, Vector3};
use std::fmt;
use std::sync::Arc;

pub type AnalyticScalar = Arc<dyn Fn(&Point3<f64>, f64) -> f64 + Send + Sync>;
pub type AnalyticVector = Arc<dyn Fn(&Point3<f64>, f64) -> Vector3<f64> + Send + Sync>;

/// The advection field, evaluated at cell barycenters.
#[derive(Clone)]
pub enum AdvectionField {
    Uniform(Vector3<f64>),
    PerCell(Arc<[Vector3<f64>]>),
    Analytic(AnalyticVector),
}

impl fmt::Debug for AdvectionField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Uniform(beta) => f.debug_tuple("Uniform").field(beta).finish(),
            Self::PerCell(values) => write!(f, "PerCell([{} values])", values.len()),
            Self::Analytic(_) => write!(f, "Analytic(..)"),
        }
    }
}

impl AdvectionField {
    pub fn analytic<F>(function: F) -> Self
    where
        F: Fn(&Point3<f64>, f64) -> Vector3<f64> + Send + Sync + 'static,
    {
        Self::Analytic(Arc::new(function))
    }

    pub fn value_in_cell(&self, c_id: usize, xc: &Point3<f64>, t: f64) -> Vector3<f64> {
        match self {
            Self::Uniform(beta) => *beta,
            Self::PerCell(values) => values[c_id],
            Self::Analytic(function) => function(xc, t),
        }
    }
}

#[derive(Clone)]
pub enum SourceDefinition {
    Constant(f64),
    Analytic(AnalyticScalar),
    /// One value per mesh vertex.
    PerVertex(Arc<[f64]>),
    /// One value per mesh cell.
    PerCell(Arc<[f64]>),
}

impl fmt::Debug for SourceDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Constant(value) => f.debug_tuple("Constant").field(value).finish(),
            Self::Analytic(_) => write!(f, "Analytic(..)"),
            Self::PerVertex(values) => write!(f, "PerVertex([{} values])", values.len()),
            Self::PerCell(values) => write!(f, "PerCell([{} values])", values.len()),
        }
    }
}

/// How a source term is reduced onto the vertex degrees of freedom.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum SourceReduction {
    /// Integrate the source over each dual cell.
    #[default]
    DualCellIntegration,
    /// Multiply the vertex values of the source by the unit-property mass matrix.
    MassMatrix,
}

#[derive(Debug, Clone)]
pub struct SourceTerm {
    pub definition: SourceDefinition,
    pub rule: QuadratureRule,
    pub reduction: SourceReduction,
}

impl SourceTerm {
    pub fn new(definition: SourceDefinition) -> Self {
        Self {
            definition,
            rule: QuadratureRule::default(),
            reduction: SourceReduction::default(),
        }
    }

    pub fn constant(value: f64) -> Self {
        Self::new(SourceDefinition::Constant(value))
    }

    pub fn analytic<F>(function: F) -> Self
    where
        F: Fn(&Point3<f64>, f64) -> f64 + Send + Sync + 'static,
    {
        Self::new(SourceDefinition::Analytic(Arc::new(function)))
    }

    pub fn per_vertex(values: Vec<f64>) -> Self {
        Self::new(SourceDefinition::PerVertex(values.into()))
    }

    pub fn per_cell(values: Vec<f64>) -> Self {
        Self::new(SourceDefinition::PerCell(values.into()))
    }

    pub fn with_rule(self, rule: QuadratureRule) -> Self {
        Self { rule, ..self }
    }

    pub fn with_reduction(self, reduction: SourceReduction) -> Self {
        Self { reduction, ..self }
    }
}

/// A scalar equation
///
/// ```text
/// rho du/dt + div(beta u) - div(K grad u) + sum_r sigma_r u = sum_s f_s
/// ```
///
/// together with its boundary conditions and discretization options. Every term is optional.
#[derive(Debug, Clone, Default)]
pub struct ScalarEquation {
    name: String,
    params: DiscretizationParams,
    diffusion: Option<Property>,
    advection: Option<AdvectionField>,
    reactions: Vec<Property>,
    sources: Vec<SourceTerm>,
    time_property: Option<Property>,
    boundaries: Vec<BoundaryDefinition>,
}

impl ScalarEquation {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_params(self, params: DiscretizationParams) -> Self {
        Self { params, ..self }
    }

    pub fn with_diffusion(self, property: Property) -> Self {
        Self {
            diffusion: Some(property),
            ..self
        }
    }

    pub fn with_advection(self, field: AdvectionField) -> Self {
        Self {
            advection: Some(field),
            ..self
        }
    }

    pub fn with_reaction(mut self, property: Property) -> Self {
        self.reactions.push(property);
        self
    }

    pub fn with_source(mut self, source: SourceTerm) -> Self {
        self.sources.push(source);
        self
    }

    /// The coefficient of the time derivative (one if unset).
    pub fn with_time_property(self, property: Property) -> Self {
        Self {
            time_property: Some(property),
            ..self
        }
    }

    /// Add a boundary condition on a named zone. A later definition overrides earlier ones on the
    /// faces they share.
    pub fn with_boundary(mut self, zone: impl Into<String>, condition: BoundaryCondition) -> Self {
        self.boundaries.push(BoundaryDefinition {
            zone: zone.into(),
            condition,
        });
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn params(&self) -> &DiscretizationParams {
        &self.params
    }

    pub fn diffusion(&self) -> Option<&Property> {
        self.diffusion.as_ref()
    }

    pub fn advection(&self) -> Option<&AdvectionField> {
        self.advection.as_ref()
    }

    pub fn reactions(&self) -> &[Property] {
        &self.reactions
    }

    pub fn sources(&self) -> &[SourceTerm] {
        &self.sources
    }

    pub fn time_property(&self) -> Option<&Property> {
        self.time_property.as_ref()
    }

    pub fn boundaries(&self) -> &[BoundaryDefinition] {
        &self.boundaries
    }
}
