use nalgebra::{DMatrix, SymmetricEigen};

/// Poor man's approx assertion for matrices
#[macro_export]
macro_rules! assert_approx_matrix_eq {
    ($x:expr, $y:expr, abstol = $tol:expr) => {{
        let diff = $x - $y;

        let max_absdiff = diff.abs().max();
        let approx_eq = max_absdiff <= $tol;

        if !approx_eq {
            println!("abstol: {:e}", $tol);
            println!("left: {}", $x);
            println!("right: {}", $y);
            println!("diff: {:e}", diff);
        }
        assert!(approx_eq);
    }};
}

/// Largest absolute difference between `a` and its transpose.
pub fn asymmetry(a: &DMatrix<f64>) -> f64 {
    assert_eq!(a.nrows(), a.ncols(), "Matrix must be square");
    (a - a.transpose()).abs().max()
}

/// Smallest eigenvalue of the symmetric part of `a`.
pub fn min_symmetric_eigenvalue(a: &DMatrix<f64>) -> f64 {
    let sym = (a + a.transpose()) * 0.5;
    SymmetricEigen::new(sym).eigenvalues.min()
}

pub fn row_sums(a: &DMatrix<f64>) -> Vec<f64> {
    a.row_iter().map(|row| row.sum()).collect()
}
