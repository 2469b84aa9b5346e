/// ## Dense row-major matrix

#[derive(Debug, Clone, PartialEq)]
pub struct Matrix {
    rows: usize,
    cols: usize,
    data: Vec<f64>,
}

impl Matrix {
    pub fn new(rows: usize, cols: usize) -> Matrix {
        Matrix {
            rows,
            cols,
            data: vec![0.0; rows * cols],
        }
    }

    pub fn identity(n: usize) -> Matrix {
        let mut m = Matrix::new(n, n);
        for i in 0..n {
            m.data[i * n + i] = 1.0;
        }
        m
    }

    pub fn from_rows(rows: &[Vec<f64>]) -> Option<Matrix> {
        let cols = rows.first().map(|r| r.len()).unwrap_or(0);
        if cols == 0 || rows.iter().any(|r| r.len() != cols) {
            return None;
        }
        Some(Matrix {
            rows: rows.len(),
            cols,
            data: rows.iter().flatten().copied().collect(),
        })
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }

    pub fn as_mut_slice(&mut self) -> &mut [f64] {
        &mut self.data
    }

    /// Zero-based access.
    pub fn at(&self, row: usize, col: usize) -> f64 {
        self.data[row * self.cols + col]
    }

    pub fn set(&mut self, row: usize, col: usize, val: f64) {
        self.data[row * self.cols + col] = val;
    }

    /// Flat index of a one-based (row, col) pair.
    pub fn flat_index(&self, row: usize, col: usize) -> Option<usize> {
        if row == 0 || col == 0 || row > self.rows || col > self.cols {
            None
        } else {
            Some((row - 1) * self.cols + (col - 1))
        }
    }

    /// One-based sub-matrix extraction.
    pub fn sub_matrix(&self, row: usize, col: usize, nrows: usize, ncols: usize) -> Option<Matrix> {
        if row == 0 || col == 0 || nrows == 0 || ncols == 0 {
            return None;
        }
        if row - 1 + nrows > self.rows || col - 1 + ncols > self.cols {
            return None;
        }
        let mut m = Matrix::new(nrows, ncols);
        for r in 0..nrows {
            for c in 0..ncols {
                m.set(r, c, self.at(row - 1 + r, col - 1 + c));
            }
        }
        Some(m)
    }

    pub fn transpose(&self) -> Matrix {
        let mut m = Matrix::new(self.cols, self.rows);
        for r in 0..self.rows {
            for c in 0..self.cols {
                m.set(c, r, self.at(r, c));
            }
        }
        m
    }

    pub fn map<F: Fn(f64) -> f64>(&self, f: F) -> Matrix {
        Matrix {
            rows: self.rows,
            cols: self.cols,
            data: self.data.iter().map(|v| f(*v)).collect(),
        }
    }

    /// Element-wise combination of equally sized matrices.
    pub fn zip<F: Fn(f64, f64) -> f64>(&self, other: &Matrix, f: F) -> Option<Matrix> {
        if self.rows != other.rows || self.cols != other.cols {
            return None;
        }
        Some(Matrix {
            rows: self.rows,
            cols: self.cols,
            data: self
                .data
                .iter()
                .zip(other.data.iter())
                .map(|(a, b)| f(*a, *b))
                .collect(),
        })
    }

    pub fn mul(&self, other: &Matrix) -> Option<Matrix> {
        if self.cols != other.rows {
            return None;
        }
        let mut m = Matrix::new(self.rows, other.cols);
        for r in 0..self.rows {
            for c in 0..other.cols {
                let mut sum = 0.0;
                for k in 0..self.cols {
                    sum += self.at(r, k) * other.at(k, c);
                }
                m.set(r, c, sum);
            }
        }
        Some(m)
    }

    /// Gauss-Jordan inverse; `None` when singular within `sensitivity`.
    pub fn inverse(&self, sensitivity: f64) -> Option<Matrix> {
        if self.rows != self.cols {
            return None;
        }
        let n = self.rows;
        let mut a = self.clone();
        let mut inv = Matrix::identity(n);
        for col in 0..n {
            let mut pivot = col;
            for r in col + 1..n {
                if a.at(r, col).abs() > a.at(pivot, col).abs() {
                    pivot = r;
                }
            }
            let p = a.at(pivot, col);
            if p.abs() <= sensitivity {
                return None;
            }
            if pivot != col {
                for c in 0..n {
                    let (x, y) = (a.at(col, c), a.at(pivot, c));
                    a.set(col, c, y);
                    a.set(pivot, c, x);
                    let (x, y) = (inv.at(col, c), inv.at(pivot, c));
                    inv.set(col, c, y);
                    inv.set(pivot, c, x);
                }
            }
            for c in 0..n {
                a.set(col, c, a.at(col, c) / p);
                inv.set(col, c, inv.at(col, c) / p);
            }
            for r in 0..n {
                if r != col {
                    let f = a.at(r, col);
                    if f != 0.0 {
                        for c in 0..n {
                            a.set(r, c, a.at(r, c) - f * a.at(col, c));
                            inv.set(r, c, inv.at(r, c) - f * inv.at(col, c));
                        }
                    }
                }
            }
        }
        Some(inv)
    }

    /// Zero every entry whose magnitude is within `sensitivity`.
    pub fn strip(&mut self, sensitivity: f64) {
        for v in self.data.iter_mut() {
            if v.abs() <= sensitivity {
                *v = 0.0;
            }
        }
    }
}

impl std::fmt::Display for Matrix {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "(")?;
        for r in 0..self.rows {
            if r > 0 {
                write!(f, " | ")?;
            }
            for c in 0..self.cols {
                if c > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{}", super::fmt_scalar(self.at(r, c)))?;
            }
        }
        write!(f, ")")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mul_and_inverse() {
        let a = Matrix::from_rows(&[vec![2.0, 0.0], vec![0.0, 4.0]]).unwrap();
        let inv = a.inverse(1e-12).unwrap();
        let id = a.mul(&inv).unwrap();
        assert_eq!(id, Matrix::identity(2));
    }

    #[test]
    fn test_singular() {
        let a = Matrix::from_rows(&[vec![1.0, 2.0], vec![2.0, 4.0]]).unwrap();
        assert!(a.inverse(1e-12).is_none());
    }

    #[test]
    fn test_sub_matrix() {
        let a = Matrix::from_rows(&[vec![1.0, 2.0, 3.0], vec![4.0, 5.0, 6.0]]).unwrap();
        let row = a.sub_matrix(2, 1, 1, 3).unwrap();
        assert_eq!(row.as_slice(), &[4.0, 5.0, 6.0]);
        assert!(a.sub_matrix(2, 2, 1, 3).is_none());
        assert_eq!(a.to_string(), "(1, 2, 3 | 4, 5, 6)");
    }
}
