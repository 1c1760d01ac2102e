//! Hand-off of assembled systems to a linear solver.
use eyre::eyre;
use nalgebra::{DMatrix, DVector};
use nalgebra_sparse::CsrMatrix;

/// A linear solver inverting assembled systems. Solvers are external collaborators: this crate
/// only provides a dense reference implementation for small systems.
pub trait LinearSolver {
    fn name(&self) -> &str;

    fn solve(&self, matrix: &CsrMatrix<f64>, rhs: &DVector<f64>) -> eyre::Result<DVector<f64>>;
}

/// Dense LU factorization with partial pivoting. Only suitable for small systems.
#[derive(Debug, Copy, Clone, Default)]
pub struct DenseLuSolver;

impl LinearSolver for DenseLuSolver {
    fn name(&self) -> &str {
        "dense LU"
    }

    fn solve(&self, matrix: &CsrMatrix<f64>, rhs: &DVector<f64>) -> eyre::Result<DVector<f64>> {
        eyre::ensure!(
            matrix.nrows() == rhs.len(),
            "matrix with {} rows does not match right-hand side of length {}",
            matrix.nrows(),
            rhs.len()
        );
        let dense = DMatrix::from(matrix);
        dense
            .lu()
            .solve(rhs)
            .ok_or_else(|| eyre!("matrix is singular"))
    }
}
