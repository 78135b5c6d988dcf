//! Generalized symmetric-definite eigensolver for modal analysis
//!
//! Solves `K phi = lambda M phi` for the smallest eigenvalues without ever
//! forming an explicit M inverse: a dense congruence path for small
//! systems, and shift-invert Lanczos (zero shift, M-inner-product
//! recurrence, full reorthogonalization) for everything else.

use nalgebra::{DMatrix, DVector};
use nalgebra_sparse::CsrMatrix;

use crate::error::{EngineError, EngineResult};
use crate::math::sparse::{matvec, SkylineCholesky};

/// Systems at or below this dimension use the dense path.
pub const DENSE_LIMIT: usize = 64;

/// Eigenpairs of `K phi = lambda M phi`, ascending in lambda, vectors
/// M-normalized.
#[derive(Debug, Clone)]
pub struct GeneralizedEigen {
    pub eigenvalues: Vec<f64>,
    pub eigenvectors: Vec<DVector<f64>>,
}

/// Extract the `num_modes` smallest eigenpairs.
pub fn solve_smallest(
    k: &CsrMatrix<f64>,
    m: &CsrMatrix<f64>,
    num_modes: usize,
    max_iterations: usize,
    tolerance: f64,
) -> EngineResult<GeneralizedEigen> {
    let n = k.nrows();
    let wanted = num_modes.min(n);
    if wanted == 0 {
        return Ok(GeneralizedEigen {
            eigenvalues: vec![],
            eigenvectors: vec![],
        });
    }

    if n <= DENSE_LIMIT {
        solve_dense(k, m, wanted)
    } else {
        solve_lanczos(k, m, wanted, max_iterations, tolerance)
    }
}

fn to_dense(csr: &CsrMatrix<f64>) -> DMatrix<f64> {
    let mut out = DMatrix::zeros(csr.nrows(), csr.ncols());
    for (row, col, &val) in csr.triplet_iter() {
        out[(row, col)] += val;
    }
    out
}

/// Dense congruence transform: with `M = L L^T`, the standard symmetric
/// problem `(L^-1 K L^-T) v = lambda v` has the same eigenvalues and
/// `phi = L^-T v`.
pub(crate) fn solve_dense(
    k: &CsrMatrix<f64>,
    m: &CsrMatrix<f64>,
    wanted: usize,
) -> EngineResult<GeneralizedEigen> {
    let kd = to_dense(k);
    let md = to_dense(m);
    let n = kd.nrows();

    let chol = md.cholesky().ok_or(EngineError::Singular)?;
    let l = chol.l();

    // A = L^-1 K L^-T, built with triangular solves only
    let y = l
        .solve_lower_triangular(&kd)
        .ok_or(EngineError::Singular)?;
    let a = l
        .solve_lower_triangular(&y.transpose())
        .ok_or(EngineError::Singular)?;
    let a = (&a + a.transpose()) * 0.5;

    let eig = a.symmetric_eigen();

    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&i, &j| eig.eigenvalues[i].total_cmp(&eig.eigenvalues[j]));

    // A zero (to rounding) eigenvalue is an unresisted rigid-body motion:
    // the free-DOF stiffness is not positive definite.
    let lambda_max = eig.eigenvalues.iter().fold(0.0_f64, |acc, &v| acc.max(v));
    if eig.eigenvalues[order[0]] <= 1e-10 * lambda_max {
        return Err(EngineError::Singular);
    }

    let lt = l.transpose();
    let mut eigenvalues = Vec::with_capacity(wanted);
    let mut eigenvectors = Vec::with_capacity(wanted);
    for &idx in order.iter().take(wanted) {
        let v = eig.eigenvectors.column(idx).into_owned();
        let phi = lt
            .solve_upper_triangular(&v)
            .ok_or(EngineError::Singular)?;
        eigenvalues.push(eig.eigenvalues[idx]);
        eigenvectors.push(m_normalize(phi, m));
    }

    Ok(GeneralizedEigen {
        eigenvalues,
        eigenvectors,
    })
}

fn m_normalize(phi: DVector<f64>, m: &CsrMatrix<f64>) -> DVector<f64> {
    let norm = matvec(m, &phi).dot(&phi).sqrt();
    phi / norm
}

/// Deterministic start vector; seeded so repeated runs reproduce bit-wise.
fn start_vector(n: usize) -> DVector<f64> {
    let mut state = 0x9E37_79B9_7F4A_7C15_u64;
    DVector::from_fn(n, |_, _| {
        state ^= state << 13;
        state ^= state >> 7;
        state ^= state << 17;
        (state >> 11) as f64 / (1_u64 << 53) as f64 - 0.5
    })
}

/// Shift-invert Lanczos with zero shift.
///
/// The operator `A = K^-1 M` is self-adjoint in the M inner product; its
/// largest Ritz values `theta` map to the smallest structural eigenvalues
/// via `lambda = 1/theta`.
pub(crate) fn solve_lanczos(
    k: &CsrMatrix<f64>,
    m: &CsrMatrix<f64>,
    wanted: usize,
    max_iterations: usize,
    tolerance: f64,
) -> EngineResult<GeneralizedEigen> {
    let n = k.nrows();
    let factor = SkylineCholesky::factor(k).map_err(|_| EngineError::Singular)?;

    let max_steps = (6 * wanted + 30).min(n).min(max_iterations.max(wanted));

    let mut basis: Vec<DVector<f64>> = Vec::with_capacity(max_steps);
    let mut alphas: Vec<f64> = Vec::with_capacity(max_steps);
    let mut betas: Vec<f64> = Vec::with_capacity(max_steps);

    let q0 = start_vector(n);
    let norm = matvec(m, &q0).dot(&q0).sqrt();
    basis.push(q0 / norm);

    let mut beta_prev = 0.0;

    for j in 0..max_steps {
        let mq = matvec(m, &basis[j]);
        let mut w = factor.solve(&mq);

        let alpha = w.dot(&mq);
        let (head, tail) = basis.split_at(j);
        w.axpy(-alpha, &tail[0], 1.0);
        if j > 0 {
            w.axpy(-beta_prev, &head[j - 1], 1.0);
        }

        // Full reorthogonalization in the M inner product, twice; the
        // second pass mops up the cancellation the first one introduces.
        for _ in 0..2 {
            let mw = matvec(m, &w);
            let coefficients: Vec<f64> = basis.iter().map(|q| mw.dot(q)).collect();
            for (q, &c) in basis.iter().zip(&coefficients) {
                w.axpy(-c, q, 1.0);
            }
        }

        alphas.push(alpha);

        let beta = matvec(m, &w).dot(&w).max(0.0).sqrt();
        if beta < 1e-12 || basis.len() == n {
            break;
        }
        betas.push(beta);
        beta_prev = beta;
        basis.push(w / beta);

        // Cheap convergence probe once the subspace can hold the answer:
        // the Ritz residual of pair (theta, y) is |beta * y_last|.
        if basis.len() >= wanted + 2 && ritz_converged(&alphas, &betas, wanted, tolerance) {
            break;
        }
    }

    let steps = alphas.len();
    let (thetas, vectors) = tridiagonal_eigen(&alphas, &betas[..steps.saturating_sub(1)]);

    // Largest theta first = smallest lambda first
    let mut order: Vec<usize> = (0..steps).collect();
    order.sort_by(|&i, &j| thetas[j].total_cmp(&thetas[i]));

    let mut eigenvalues = Vec::with_capacity(wanted);
    let mut eigenvectors = Vec::with_capacity(wanted);

    for &idx in order.iter().take(wanted) {
        let theta = thetas[idx];
        if theta <= 0.0 {
            return Err(EngineError::EigenNoConverge(max_iterations));
        }
        let lambda = 1.0 / theta;

        let y = vectors.column(idx);
        let mut phi = DVector::zeros(n);
        for (q, &c) in basis.iter().zip(y.iter()) {
            phi.axpy(c, q, 1.0);
        }
        let phi = m_normalize(phi, m);

        // Accept only pairs that satisfy the residual bound on the
        // original pencil.
        let k_phi = matvec(k, &phi);
        let m_phi = matvec(m, &phi);
        let residual = (&k_phi - &m_phi * lambda).norm();
        let limit = (tolerance * 100.0).max(1e-8) * k_phi.norm();
        if residual > limit {
            return Err(EngineError::EigenNoConverge(max_iterations));
        }

        eigenvalues.push(lambda);
        eigenvectors.push(phi);
    }

    // The Ritz ordering above is by theta; make the lambda ordering
    // explicit and strict.
    let mut order: Vec<usize> = (0..eigenvalues.len()).collect();
    order.sort_by(|&i, &j| eigenvalues[i].total_cmp(&eigenvalues[j]));
    let eigenvalues: Vec<f64> = order.iter().map(|&i| eigenvalues[i]).collect();
    let eigenvectors: Vec<DVector<f64>> = order.iter().map(|&i| eigenvectors[i].clone()).collect();

    Ok(GeneralizedEigen {
        eigenvalues,
        eigenvectors,
    })
}

/// Do the leading `wanted` Ritz pairs satisfy the `|beta * y_last|` bound?
fn ritz_converged(alphas: &[f64], betas: &[f64], wanted: usize, tolerance: f64) -> bool {
    let steps = alphas.len();
    let (thetas, vectors) = tridiagonal_eigen(alphas, &betas[..steps - 1]);
    let beta_last = betas[steps - 1].abs();

    let mut order: Vec<usize> = (0..steps).collect();
    order.sort_by(|&i, &j| thetas[j].total_cmp(&thetas[i]));

    order.iter().take(wanted).all(|&idx| {
        let theta = thetas[idx];
        let y_last = vectors[(steps - 1, idx)].abs();
        theta > 0.0 && beta_last * y_last <= tolerance * theta
    })
}

/// Eigen-decompose the symmetric tridiagonal Lanczos matrix (small, dense).
fn tridiagonal_eigen(alphas: &[f64], betas: &[f64]) -> (Vec<f64>, DMatrix<f64>) {
    let s = alphas.len();
    let mut t = DMatrix::zeros(s, s);
    for i in 0..s {
        t[(i, i)] = alphas[i];
        if i + 1 < s {
            t[(i, i + 1)] = betas[i];
            t[(i + 1, i)] = betas[i];
        }
    }
    let eig = t.symmetric_eigen();
    (eig.eigenvalues.iter().copied().collect(), eig.eigenvectors)
}
