//! Synchronization of degrees of freedom shared between the partitions of a distributed mesh.

/// Reduction of values attached to degrees of freedom duplicated across partitions.
///
/// [`gather`](InterfaceReduction::gather) runs before the local assembly loop and makes
/// duplicated values consistent. [`sum_reduce`](InterfaceReduction::sum_reduce) runs after it and
/// sums the contributions of all partitions into every copy.
pub trait InterfaceReduction: Sync {
    fn gather(&self, values: &mut [f64]);

    fn sum_reduce(&self, values: &mut [f64]);
}

/// The interface of a mesh held by a single process: there is nothing to synchronize.
#[derive(Debug, Copy, Clone, Default)]
pub struct SerialInterface;

impl InterfaceReduction for SerialInterface {
    fn gather(&self, _values: &mut [f64]) {}

    fn sum_reduce(&self, _values: &mut [f64]) {}
}
