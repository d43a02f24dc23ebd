//! Dense symmetric positive-definite solves for the additive model.

use super::{ModelError, Result};

/// Row-major square matrix.
#[derive(Debug, Clone, PartialEq)]
pub struct Matrix {
    n: usize,
    data: Vec<f64>,
}

impl Matrix {
    pub fn zeros(n: usize) -> Self {
        Self {
            n,
            data: vec![0.0; n * n],
        }
    }

    pub fn size(&self) -> usize {
        self.n
    }

    pub fn get(&self, i: usize, j: usize) -> f64 {
        self.data[i * self.n + j]
    }

    pub fn set(&mut self, i: usize, j: usize, v: f64) {
        self.data[i * self.n + j] = v;
    }

    pub fn add(&mut self, i: usize, j: usize, v: f64) {
        self.data[i * self.n + j] += v;
    }

    /// `XᵀX` for row-major `rows` (each of length `n`).
    pub fn gram(rows: &[Vec<f64>], n: usize) -> Self {
        let mut m = Self::zeros(n);
        for row in rows {
            for i in 0..n {
                let ri = row[i];
                if ri == 0.0 {
                    continue;
                }
                for j in i..n {
                    m.data[i * n + j] += ri * row[j];
                }
            }
        }
        for i in 0..n {
            for j in 0..i {
                m.data[i * n + j] = m.data[j * n + i];
            }
        }
        m
    }
}

/// `Xᵀy`.
pub fn xt_y(rows: &[Vec<f64>], y: &[f64], n: usize) -> Vec<f64> {
    let mut out = vec![0.0; n];
    for (row, &yi) in rows.iter().zip(y) {
        for (o, &x) in out.iter_mut().zip(row) {
            *o += x * yi;
        }
    }
    out
}

/// Lower-triangular Cholesky factor `L` with `A = L Lᵀ`.
pub fn cholesky(a: &Matrix) -> Result<Matrix> {
    let n = a.size();
    let mut l = Matrix::zeros(n);
    for j in 0..n {
        let mut diag = a.get(j, j);
        for k in 0..j {
            diag -= l.get(j, k) * l.get(j, k);
        }
        if !diag.is_finite() || diag <= 0.0 {
            return Err(ModelError::NotPositiveDefinite { pivot: j });
        }
        let ljj = diag.sqrt();
        l.set(j, j, ljj);
        for i in (j + 1)..n {
            let mut s = a.get(i, j);
            for k in 0..j {
                s -= l.get(i, k) * l.get(j, k);
            }
            l.set(i, j, s / ljj);
        }
    }
    Ok(l)
}

/// Solve `A x = b` for symmetric positive-definite `A`.
pub fn solve_spd(a: &Matrix, b: &[f64]) -> Result<Vec<f64>> {
    let l = cholesky(a)?;
    let n = l.size();

    // forward: L z = b
    let mut z = vec![0.0; n];
    for i in 0..n {
        let mut s = b[i];
        for k in 0..i {
            s -= l.get(i, k) * z[k];
        }
        z[i] = s / l.get(i, i);
    }

    // back: Lᵀ x = z
    let mut x = vec![0.0; n];
    for i in (0..n).rev() {
        let mut s = z[i];
        for k in (i + 1)..n {
            s -= l.get(k, i) * x[k];
        }
        x[i] = s / l.get(i, i);
    }
    Ok(x)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn from_rows(rows: &[&[f64]]) -> Matrix {
        let n = rows.len();
        let mut m = Matrix::zeros(n);
        for (i, r) in rows.iter().enumerate() {
            for (j, &v) in r.iter().enumerate() {
                m.set(i, j, v);
            }
        }
        m
    }

    #[test]
    fn solves_small_spd_system() {
        let a = from_rows(&[&[4.0, 2.0, 0.6], &[2.0, 5.0, 1.0], &[0.6, 1.0, 3.0]]);
        let x_true = [1.0, -2.0, 0.5];
        let b: Vec<f64> = (0..3)
            .map(|i| (0..3).map(|j| a.get(i, j) * x_true[j]).sum())
            .collect();
        let x = solve_spd(&a, &b).unwrap();
        for (got, want) in x.iter().zip(x_true) {
            assert!((got - want).abs() < 1e-10);
        }
    }

    #[test]
    fn rejects_indefinite_matrix() {
        let a = from_rows(&[&[1.0, 2.0], &[2.0, 1.0]]);
        assert!(matches!(
            cholesky(&a),
            Err(ModelError::NotPositiveDefinite { pivot: 1 })
        ));
    }

    #[test]
    fn rejects_nan() {
        let a = from_rows(&[&[f64::NAN]]);
        assert!(cholesky(&a).is_err());
    }

    #[test]
    fn gram_is_symmetric() {
        let rows = vec![vec![1.0, 2.0], vec![3.0, 4.0], vec![0.0, 1.0]];
        let g = Matrix::gram(&rows, 2);
        assert_eq!(g.get(0, 0), 10.0);
        assert_eq!(g.get(0, 1), 14.0);
        assert_eq!(g.get(1, 0), 14.0);
        assert_eq!(g.get(1, 1), 21.0);
        assert_eq!(xt_y(&rows, &[1.0, 1.0, 1.0], 2), vec![4.0, 7.0]);
    }
}
