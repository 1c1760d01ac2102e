use crate::error::CdoError;
use crate::solve::LinearSolver;
use log::info;
use nalgebra::DVector;
use nalgebra_sparse::pattern::SparsityPattern;
use nalgebra_sparse::CsrMatrix;
use polycdo_index::Adjacency;
use rayon::slice::ParallelSliceMut;

/// Sparsity pattern of a system coupling every pair of degrees of freedom of each cell.
///
/// `cell_dofs` maps every cell to its degrees of freedom (`c2v` for vertex-based schemes).
pub fn assemble_pattern(cell_dofs: &Adjacency, n_dofs: usize) -> eyre::Result<SparsityPattern> {
    let n_total: usize = cell_dofs.iter().map(|dofs| dofs.len() * dofs.len()).sum();
    let mut coordinates = Vec::with_capacity(n_total);
    for dofs in cell_dofs.iter() {
        for &i in dofs {
            for &j in dofs {
                coordinates.push((i, j));
            }
        }
    }
    coordinates.par_sort_unstable();
    coordinates.dedup();

    let mut offsets = Vec::with_capacity(n_dofs + 1);
    let mut column_indices = Vec::with_capacity(coordinates.len());
    offsets.push(0);
    let mut current_row = 0;
    for (i, j) in coordinates {
        eyre::ensure!(i < n_dofs, "degree of freedom {i} is out of bounds for {n_dofs} rows");
        // Loop to handle rows without any entry
        while i > current_row {
            offsets.push(column_indices.len());
            current_row += 1;
        }
        column_indices.push(j);
    }
    while offsets.len() < n_dofs + 1 {
        offsets.push(column_indices.len());
    }

    let pattern = SparsityPattern::try_from_offsets_and_indices(n_dofs, n_dofs, offsets, column_indices)
        .map_err(|err| CdoError::Sparsity(err.to_string()))?;
    Ok(pattern)
}

/// Local indices `0..ids.len()` ordered by increasing global id.
pub(crate) fn sorted_permutation(ids: &[usize], permutation: &mut Vec<usize>) {
    permutation.clear();
    permutation.extend(0..ids.len());
    permutation.sort_unstable_by_key(|&k| ids[k]);
}

/// Add a row of a local matrix to a row of a CSR matrix.
///
/// `columns` and `values` are the column indices and values of the CSR row, `ids` the global
/// indices of the local columns and `permutation` the local indices sorted by global index.
pub(crate) fn add_local_row_to_csr_row(
    columns: &[usize],
    values: &mut [f64],
    ids: &[usize],
    permutation: &[usize],
    local_row: &[f64],
) {
    debug_assert_eq!(ids.len(), permutation.len());
    debug_assert_eq!(ids.len(), local_row.len());

    let mut csr_columns = columns.iter().copied().enumerate();
    for &k in permutation {
        let global = ids[k];
        // Both sequences are sorted, so a forward search resumes where the last one stopped
        let position = csr_columns
            .find(|&(_, column)| column == global)
            .map(|(position, _)| position);
        match position {
            Some(position) => values[position] += local_row[k],
            None => panic!("Column {global} is missing from the sparsity pattern"),
        }
    }
}

/// The global linear system produced by an assembler.
#[derive(Debug, Clone, PartialEq)]
pub struct AssembledSystem {
    pub matrix: CsrMatrix<f64>,
    pub rhs: DVector<f64>,
    /// Contribution of the source terms alone (already included in `rhs`).
    pub source: DVector<f64>,
}

impl AssembledSystem {
    pub fn nrows(&self) -> usize {
        self.matrix.nrows()
    }

    /// Diagonal entries of the matrix.
    pub fn diagonal(&self) -> DVector<f64> {
        let mut diagonal = DVector::zeros(self.matrix.nrows());
        for (i, row) in self.matrix.row_iter().enumerate() {
            if let Some(position) = row.col_indices().iter().position(|&j| j == i) {
                diagonal[i] = row.values()[position];
            }
        }
        diagonal
    }

    pub fn solve_with(&self, solver: &dyn LinearSolver) -> eyre::Result<DVector<f64>> {
        info!(
            "Solving system with {} rows and {} non-zeros using {}",
            self.matrix.nrows(),
            self.matrix.nnz(),
            solver.name()
        );
        solver.solve(&self.matrix, &self.rhs)
    }
}
