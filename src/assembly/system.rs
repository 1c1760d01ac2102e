use crate::local::LocalMatrix;

/// The local system of one cell: matrix, right-hand side and source contributions, indexed by
/// the local numbering of the cell degrees of freedom.
#[derive(Debug, Clone)]
pub struct CellSystem {
    n_dofs: usize,
    pub(crate) mat: LocalMatrix,
    pub(crate) rhs: Vec<f64>,
    pub(crate) source: Vec<f64>,
    /// Values of the degrees of freedom at the previous time step.
    pub(crate) val_n: Vec<f64>,
}

impl CellSystem {
    pub fn with_capacity(n_dofs: usize) -> Self {
        Self {
            n_dofs: 0,
            mat: LocalMatrix::with_capacity(n_dofs),
            rhs: vec![0.0; n_dofs],
            source: vec![0.0; n_dofs],
            val_n: vec![0.0; n_dofs],
        }
    }

    /// Zero the system for the degrees of freedom `dof_ids` and copy their previous values from
    /// `previous`, if given.
    pub fn reset(&mut self, dof_ids: &[usize], previous: Option<&[f64]>) {
        let n = dof_ids.len();
        self.n_dofs = n;
        self.mat.reset_with_ids(dof_ids);
        self.rhs[..n].fill(0.0);
        self.source[..n].fill(0.0);
        match previous {
            Some(values) => {
                for (v, &id) in self.val_n.iter_mut().zip(dof_ids) {
                    *v = values[id];
                }
            }
            None => self.val_n[..n].fill(0.0),
        }
    }

    pub fn n_dofs(&self) -> usize {
        self.n_dofs
    }

    pub fn dof_ids(&self) -> &[usize] {
        self.mat.ids()
    }

    pub fn matrix(&self) -> &LocalMatrix {
        &self.mat
    }

    pub fn rhs(&self) -> &[f64] {
        &self.rhs[..self.n_dofs]
    }

    pub fn source(&self) -> &[f64] {
        &self.source[..self.n_dofs]
    }

    pub fn previous_values(&self) -> &[f64] {
        &self.val_n[..self.n_dofs]
    }
}
