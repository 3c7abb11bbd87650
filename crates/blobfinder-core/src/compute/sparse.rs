//! Column-compressed sparse matrix.
//!
//! Used for the stacked correlation masks: rows are (peak, offset) pairs and
//! columns are flattened pixel indices, so a single pixel of an incoming tile
//! addresses exactly the mask rows it contributes to.

use num_traits::Float;

#[derive(Clone, Debug)]
pub struct CscMatrix<T> {
    n_rows: usize,
    n_cols: usize,
    indptr: Vec<usize>,
    indices: Vec<usize>,
    values: Vec<T>,
}

impl<T: Float> CscMatrix<T> {
    /// Build from (row, col, value) triplets. Duplicates are summed and
    /// explicit zeros dropped. Triplets outside the shape are ignored.
    pub fn from_triplets(n_rows: usize, n_cols: usize, triplets: &[(usize, usize, T)]) -> Self {
        let mut sorted: Vec<(usize, usize, T)> = triplets
            .iter()
            .copied()
            .filter(|&(r, c, v)| r < n_rows && c < n_cols && v != T::zero())
            .collect();
        sorted.sort_by(|a, b| (a.1, a.0).cmp(&(b.1, b.0)));

        let mut indptr = vec![0usize; n_cols + 1];
        let mut indices = Vec::with_capacity(sorted.len());
        let mut values: Vec<T> = Vec::with_capacity(sorted.len());
        let mut last: Option<(usize, usize)> = None;
        for (r, c, v) in sorted {
            if last == Some((r, c)) {
                if let Some(tail) = values.last_mut() {
                    *tail = *tail + v;
                }
                continue;
            }
            indices.push(r);
            values.push(v);
            indptr[c + 1] += 1;
            last = Some((r, c));
        }
        for c in 0..n_cols {
            indptr[c + 1] += indptr[c];
        }

        Self {
            n_rows,
            n_cols,
            indptr,
            indices,
            values,
        }
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.n_rows, self.n_cols)
    }

    pub fn nnz(&self) -> usize {
        self.values.len()
    }

    /// Row indices and values stored in column `col`.
    pub fn column(&self, col: usize) -> (&[usize], &[T]) {
        let range = self.indptr[col]..self.indptr[col + 1];
        (&self.indices[range.clone()], &self.values[range])
    }

    /// `out += self[:, col] * value`.
    pub fn axpy_column(&self, col: usize, value: T, out: &mut [T]) {
        let (rows, weights) = self.column(col);
        for (&r, &w) in rows.iter().zip(weights) {
            out[r] = out[r] + w * value;
        }
    }

    /// Dense matrix-vector product `self · x`.
    pub fn dot(&self, x: &[T]) -> Vec<T> {
        let mut out = vec![T::zero(); self.n_rows];
        for (col, &v) in x.iter().enumerate().take(self.n_cols) {
            if v != T::zero() {
                self.axpy_column(col, v, &mut out);
            }
        }
        out
    }
}
