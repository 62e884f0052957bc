// ============================================================
// Layer 7 — Dense f64 Working Matrix
// ============================================================
// The scorer widens embeddings to f64 before any arithmetic:
// column means over thousands of rows and dot products over
// hundreds of dimensions lose enough precision in f32 to flip
// near-tied neighbours between runs.

use crate::domain::embedding::EmbeddingMatrix;

#[derive(Debug, Clone, PartialEq)]
pub struct DenseMatrix {
    rows: usize,
    cols: usize,
    data: Vec<f64>,
}

impl DenseMatrix {
    pub fn zeros(rows: usize, cols: usize) -> Self {
        Self { rows, cols, data: vec![0.0; rows * cols] }
    }

    pub fn from_embeddings(m: &EmbeddingMatrix) -> Self {
        Self {
            rows: m.rows(),
            cols: m.dim(),
            data: m.as_slice().iter().map(|&x| x as f64).collect(),
        }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn row(&self, i: usize) -> &[f64] {
        &self.data[i * self.cols..(i + 1) * self.cols]
    }

    pub fn row_mut(&mut self, i: usize) -> &mut [f64] {
        &mut self.data[i * self.cols..(i + 1) * self.cols]
    }

    pub fn get(&self, r: usize, c: usize) -> f64 {
        self.data[r * self.cols + c]
    }

    pub fn set(&mut self, r: usize, c: usize, v: f64) {
        self.data[r * self.cols + c] = v;
    }

    /// Column-wise mean over all rows.
    pub fn column_means(&self) -> Vec<f64> {
        let mut means = vec![0.0; self.cols];
        if self.rows == 0 {
            return means;
        }
        for r in 0..self.rows {
            for (m, x) in means.iter_mut().zip(self.row(r)) {
                *m += x;
            }
        }
        let n = self.rows as f64;
        means.iter_mut().for_each(|m| *m /= n);
        means
    }

    /// Subtract this matrix's own column means from every row.
    pub fn mean_centered(mut self) -> Self {
        let means = self.column_means();
        for r in 0..self.rows {
            for (x, m) in self.row_mut(r).iter_mut().zip(&means) {
                *x -= m;
            }
        }
        self
    }

    /// Scale every row to unit L2 norm. Zero rows stay zero so the
    /// distance code can still recognise them.
    pub fn row_normalized(mut self) -> Self {
        for r in 0..self.rows {
            let row = self.row_mut(r);
            let norm = row.iter().map(|x| x * x).sum::<f64>().sqrt();
            if norm > 0.0 {
                row.iter_mut().for_each(|x| *x /= norm);
            }
        }
        self
    }

    pub fn swap_rows(&mut self, a: usize, b: usize) {
        if a == b {
            return;
        }
        for c in 0..self.cols {
            self.data.swap(a * self.cols + c, b * self.cols + c);
        }
    }

    /// Copy rows `[start, end)`.
    pub fn slice_rows(&self, start: usize, end: usize) -> Self {
        Self {
            rows: end - start,
            cols: self.cols,
            data: self.data[start * self.cols..end * self.cols].to_vec(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mean_centering_zeroes_column_means() {
        let m = EmbeddingMatrix::from_rows(vec![
            vec![1.0, 10.0],
            vec![3.0, 20.0],
            vec![5.0, 60.0],
        ]).unwrap();
        let c = DenseMatrix::from_embeddings(&m).mean_centered();
        assert_eq!(c.row(0), &[-2.0, -20.0]);
        for mean in c.column_means() {
            assert!(mean.abs() < 1e-12);
        }
    }

    #[test]
    fn test_normalizing_leaves_zero_rows() {
        let m = EmbeddingMatrix::from_rows(vec![vec![3.0, 4.0], vec![0.0, 0.0]]).unwrap();
        let n = DenseMatrix::from_embeddings(&m).row_normalized();
        assert!((n.get(0, 0) - 0.6).abs() < 1e-12);
        assert!((n.get(0, 1) - 0.8).abs() < 1e-12);
        assert_eq!(n.row(1), &[0.0, 0.0]);
    }
}
