//! Sparse matrix storage and direct factorizations
//!
//! Global frame matrices are overwhelmingly sparse; assembly accumulates
//! COO triplets and the factorizations work on a skyline profile, which
//! fits the banded structure DOF-ordered frames produce.

use nalgebra::{DMatrix, DVector};
use nalgebra_sparse::{CooMatrix, CsrMatrix};

use crate::math::Mat12;

/// COO triplet accumulator for incremental assembly.
pub struct TripletBuilder {
    size: usize,
    entries: Vec<(usize, usize, f64)>,
}

impl TripletBuilder {
    pub fn new(size: usize) -> Self {
        // Each frame node couples with a handful of neighbours; 60 entries
        // per DOF is a comfortable upper bound for preallocation.
        Self {
            size,
            entries: Vec::with_capacity(size * 60),
        }
    }

    #[inline]
    pub fn add(&mut self, row: usize, col: usize, value: f64) {
        if value.abs() > 1e-15 {
            self.entries.push((row, col, value));
        }
    }

    /// Scatter a 12x12 element matrix to the given global DOF indices.
    pub fn add_element(&mut self, dofs: &[usize; 12], k: &Mat12) {
        for (i, &di) in dofs.iter().enumerate() {
            for (j, &dj) in dofs.iter().enumerate() {
                self.add(di, dj, k[(i, j)]);
            }
        }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn nnz(&self) -> usize {
        self.entries.len()
    }

    pub fn entries(&self) -> &[(usize, usize, f64)] {
        &self.entries
    }

    /// Append all triplets from another builder of the same size.
    pub fn extend_from(&mut self, other: &TripletBuilder) {
        self.entries.extend_from_slice(&other.entries);
    }

    /// Compress to CSR (duplicate triplets accumulate).
    pub fn to_csr(&self) -> CsrMatrix<f64> {
        let mut coo = CooMatrix::new(self.size, self.size);
        for &(row, col, val) in &self.entries {
            coo.push(row, col, val);
        }
        CsrMatrix::from(&coo)
    }

    /// Dense copy, for small-system paths and debugging.
    pub fn to_dense(&self) -> DMatrix<f64> {
        let mut mat = DMatrix::zeros(self.size, self.size);
        for &(row, col, val) in &self.entries {
            mat[(row, col)] += val;
        }
        mat
    }
}

/// Symmetric skyline storage: per row, the contiguous band from the first
/// non-zero up to the diagonal.
struct Skyline {
    size: usize,
    heights: Vec<usize>,
    rows: Vec<Vec<f64>>,
}

impl Skyline {
    fn from_csr(csr: &CsrMatrix<f64>) -> Self {
        let size = csr.nrows();

        let mut heights = vec![0usize; size];
        for (row, col, _) in csr.triplet_iter() {
            if col < row && row - col > heights[row] {
                heights[row] = row - col;
            }
        }

        let mut rows: Vec<Vec<f64>> = heights.iter().map(|&h| vec![0.0; h + 1]).collect();
        for (row, col, &val) in csr.triplet_iter() {
            if col <= row && col + heights[row] >= row {
                let idx = col - (row - heights[row]);
                rows[row][idx] += val;
            }
        }

        Self { size, heights, rows }
    }

    #[inline]
    fn get(&self, row: usize, col: usize) -> f64 {
        if col > row {
            return self.get(col, row);
        }
        let start = row - self.heights[row];
        if col < start {
            0.0
        } else {
            self.rows[row][col - start]
        }
    }

    #[inline]
    fn set(&mut self, row: usize, col: usize, value: f64) {
        let start = row - self.heights[row];
        self.rows[row][col - start] = value;
    }
}

/// Sparse Cholesky factorization for symmetric positive-definite systems.
pub struct SkylineCholesky {
    skyline: Skyline,
}

impl SkylineCholesky {
    /// Factor `A = L * L^T`. Fails when the matrix is not positive
    /// definite (zero or negative pivot).
    pub fn factor(csr: &CsrMatrix<f64>) -> Result<Self, &'static str> {
        let mut sky = Skyline::from_csr(csr);

        for i in 0..sky.size {
            let start_i = i - sky.heights[i];

            for j in start_i..i {
                let start_j = j - sky.heights[j];
                let start = start_i.max(start_j);

                let mut sum = 0.0;
                for k in start..j {
                    sum += sky.get(i, k) * sky.get(j, k);
                }

                let diag_j = sky.get(j, j);
                if diag_j.abs() < 1e-15 {
                    return Err("zero pivot");
                }
                sky.set(i, j, (sky.get(i, j) - sum) / diag_j);
            }

            let mut sum = 0.0;
            for k in start_i..i {
                let v = sky.get(i, k);
                sum += v * v;
            }

            let diag = sky.get(i, i) - sum;
            if diag <= 0.0 {
                return Err("matrix not positive definite");
            }
            sky.set(i, i, diag.sqrt());
        }

        Ok(Self { skyline: sky })
    }

    /// Solve `L * L^T * x = b`.
    pub fn solve(&self, b: &DVector<f64>) -> DVector<f64> {
        let sky = &self.skyline;
        let mut x = b.clone();

        // Forward substitution: L y = b
        for i in 0..sky.size {
            let start = i - sky.heights[i];
            let mut sum = 0.0;
            for j in start..i {
                sum += sky.get(i, j) * x[j];
            }
            x[i] = (x[i] - sum) / sky.get(i, i);
        }

        // Backward substitution: L^T x = y
        for i in (0..sky.size).rev() {
            x[i] /= sky.get(i, i);
            let start = i - sky.heights[i];
            for j in start..i {
                x[j] -= sky.get(i, j) * x[i];
            }
        }

        x
    }
}

/// Sparse LDL^T factorization. Unlike Cholesky it tolerates indefinite
/// pivots, so a near-mechanism system can still be diagnosed through its
/// pivot ratio instead of failing outright.
pub struct SkylineLdlt {
    skyline: Skyline,
}

impl SkylineLdlt {
    /// Factor `A = L * D * L^T` with unit-diagonal L; D lives on the
    /// skyline diagonal.
    pub fn factor(csr: &CsrMatrix<f64>) -> Self {
        let mut sky = Skyline::from_csr(csr);

        for i in 0..sky.size {
            let start_i = i - sky.heights[i];

            for j in start_i..i {
                let start_j = j - sky.heights[j];
                let start = start_i.max(start_j);

                let mut sum = 0.0;
                for k in start..j {
                    sum += sky.get(i, k) * sky.get(k, k) * sky.get(j, k);
                }

                let d_j = sky.get(j, j);
                let l_ij = if d_j.abs() < f64::MIN_POSITIVE {
                    0.0
                } else {
                    (sky.get(i, j) - sum) / d_j
                };
                sky.set(i, j, l_ij);
            }

            let mut sum = 0.0;
            for k in start_i..i {
                let l_ik = sky.get(i, k);
                sum += l_ik * l_ik * sky.get(k, k);
            }
            let d_i = sky.get(i, i) - sum;
            sky.set(i, i, d_i);
        }

        Self { skyline: sky }
    }

    /// `min |d_i| / max |d_i|`; values near zero indicate a mechanism.
    pub fn pivot_ratio(&self) -> f64 {
        let sky = &self.skyline;
        let mut min = f64::INFINITY;
        let mut max = 0.0_f64;
        for i in 0..sky.size {
            let d = sky.get(i, i).abs();
            min = min.min(d);
            max = max.max(d);
        }
        if max == 0.0 {
            0.0
        } else {
            min / max
        }
    }

    /// Solve `L D L^T x = b`.
    pub fn solve(&self, b: &DVector<f64>) -> DVector<f64> {
        let sky = &self.skyline;
        let mut x = b.clone();

        // L y = b (unit diagonal)
        for i in 0..sky.size {
            let start = i - sky.heights[i];
            let mut sum = 0.0;
            for j in start..i {
                sum += sky.get(i, j) * x[j];
            }
            x[i] -= sum;
        }

        // D z = y
        for i in 0..sky.size {
            x[i] /= sky.get(i, i);
        }

        // L^T x = z
        for i in (0..sky.size).rev() {
            let start = i - sky.heights[i];
            for j in start..i {
                x[j] -= sky.get(i, j) * x[i];
            }
        }

        x
    }
}

/// Sparse matrix-vector product.
pub fn matvec(csr: &CsrMatrix<f64>, x: &DVector<f64>) -> DVector<f64> {
    let n = csr.nrows();
    let mut y = DVector::zeros(n);

    let row_offsets = csr.row_offsets();
    let col_indices = csr.col_indices();
    let values = csr.values();

    for row in 0..n {
        let mut sum = 0.0;
        for idx in row_offsets[row]..row_offsets[row + 1] {
            sum += values[idx] * x[col_indices[idx]];
        }
        y[row] = sum;
    }

    y
}
