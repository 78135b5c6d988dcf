//! Element-level matrices for 3D frame members

pub mod eigen;
pub mod sparse;

use nalgebra::{DMatrix, DVector, Matrix3, SMatrix, SVector};

pub use sparse::{SkylineCholesky, SkylineLdlt, TripletBuilder};

pub type Mat3 = Matrix3<f64>;

/// 12x12 matrix for element stiffness/mass/transformation
pub type Mat12 = SMatrix<f64, 12, 12>;
/// 12-element vector for element forces/displacements
pub type Vec12 = SVector<f64, 12>;

/// Cosine threshold for the vertical-element branch of the local frame.
/// Pinned by tests; do not drift between revisions.
pub const VERTICAL_COSINE_LIMIT: f64 = 1.0 - 1e-6;

/// 3x3 rotation matrix mapping global to element local coordinates.
///
/// Rows are the local unit axes:
/// - e1 along the member,
/// - e2 from `z_hat x e1` (or `x_hat x e1` when the member is within
///   `VERTICAL_COSINE_LIMIT` of vertical), rolled about e1,
/// - e3 completing the right-handed triad.
pub fn rotation_matrix(i_node: &[f64; 3], j_node: &[f64; 3], roll: f64) -> Mat3 {
    let dx = j_node[0] - i_node[0];
    let dy = j_node[1] - i_node[1];
    let dz = j_node[2] - i_node[2];
    let length = (dx * dx + dy * dy + dz * dz).sqrt();

    let e1 = [dx / length, dy / length, dz / length];

    // Reference axis: global z unless the member is (nearly) vertical,
    // where z x e1 degenerates and global x takes over.
    let reference = if e1[2].abs() < VERTICAL_COSINE_LIMIT {
        [0.0, 0.0, 1.0]
    } else {
        [1.0, 0.0, 0.0]
    };

    let e2 = normalize(cross(&reference, &e1));
    let e3 = cross(&e1, &e2);

    // Roll the section axes about e1. Both e2 and e3 are perpendicular to
    // e1, so Rodrigues' formula reduces to a planar rotation in (e2, e3).
    let (sin_r, cos_r) = roll.sin_cos();
    let e2r = [
        e2[0] * cos_r + e3[0] * sin_r,
        e2[1] * cos_r + e3[1] * sin_r,
        e2[2] * cos_r + e3[2] * sin_r,
    ];
    let e3r = [
        e3[0] * cos_r - e2[0] * sin_r,
        e3[1] * cos_r - e2[1] * sin_r,
        e3[2] * cos_r - e2[2] * sin_r,
    ];

    Mat3::new(
        e1[0], e1[1], e1[2],
        e2r[0], e2r[1], e2r[2],
        e3r[0], e3r[1], e3r[2],
    )
}

/// 12x12 transformation matrix: four copies of the rotation on the diagonal.
pub fn transformation_matrix(i_node: &[f64; 3], j_node: &[f64; 3], roll: f64) -> Mat12 {
    let r = rotation_matrix(i_node, j_node, roll);
    let mut t = Mat12::zeros();
    for block in 0..4 {
        let offset = block * 3;
        for row in 0..3 {
            for col in 0..3 {
                t[(offset + row, offset + col)] = r[(row, col)];
            }
        }
    }
    t
}

fn cross(a: &[f64; 3], b: &[f64; 3]) -> [f64; 3] {
    [
        a[1] * b[2] - a[2] * b[1],
        a[2] * b[0] - a[0] * b[2],
        a[0] * b[1] - a[1] * b[0],
    ]
}

fn normalize(v: [f64; 3]) -> [f64; 3] {
    let n = (v[0] * v[0] + v[1] * v[1] + v[2] * v[2]).sqrt();
    [v[0] / n, v[1] / n, v[2] / n]
}

/// Couple two DOFs that resist the same relative motion: both diagonals
/// carry `stiffness`, the cross terms its negative.
fn opposed_pair(k: &mut Mat12, d1: usize, d2: usize, stiffness: f64) {
    k[(d1, d1)] = stiffness;
    k[(d2, d2)] = stiffness;
    k[(d1, d2)] = -stiffness;
    k[(d2, d1)] = -stiffness;
}

/// Scatter one bending plane into a 12x12 element matrix: end
/// translations `t1`/`t2` and their paired end rotations `r1`/`r2`.
///
/// `shear` is the translation-translation term, `couple` ties translation
/// to rotation, `flex` sits on the rotation diagonal and `carry` links
/// the two end rotations.
fn bending_plane(
    k: &mut Mat12,
    dofs: (usize, usize, usize, usize),
    shear: f64,
    couple: f64,
    flex: f64,
    carry: f64,
) {
    let (t1, t2, r1, r2) = dofs;
    let mut set = |row: usize, col: usize, value: f64| {
        k[(row, col)] = value;
        k[(col, row)] = value;
    };

    set(t1, t1, shear);
    set(t2, t2, shear);
    set(t1, t2, -shear);

    set(t1, r1, couple);
    set(t1, r2, couple);
    set(t2, r1, -couple);
    set(t2, r2, -couple);

    set(r1, r1, flex);
    set(r2, r2, flex);
    set(r1, r2, carry);
}

/// Local stiffness matrix for a 3D Euler-Bernoulli frame element:
/// axial and Saint-Venant torsion springs between the end nodes, plus the
/// cubic-Hermite bending terms in each principal plane.
///
/// # Arguments
/// * `e` - Modulus of elasticity
/// * `g` - Shear modulus
/// * `a` - Cross-sectional area
/// * `iy` - Moment of inertia about local y
/// * `iz` - Moment of inertia about local z
/// * `j` - Torsional constant
/// * `length` - Element length
pub fn local_stiffness(e: f64, g: f64, a: f64, iy: f64, iz: f64, j: f64, length: f64) -> Mat12 {
    let mut k = Mat12::zeros();
    let l = length;

    opposed_pair(&mut k, 0, 6, e * a / l);
    opposed_pair(&mut k, 3, 9, g * j / l);

    // Deflection in local y pairs with rotation about z; deflection in
    // local z pairs with rotation about y and the opposite moment sense.
    for (rigidity, dofs, sense) in [(e * iz, (1, 7, 5, 11), 1.0), (e * iy, (2, 8, 4, 10), -1.0)] {
        bending_plane(
            &mut k,
            dofs,
            12.0 * rigidity / l.powi(3),
            sense * 6.0 * rigidity / l.powi(2),
            4.0 * rigidity / l,
            2.0 * rigidity / l,
        );
    }

    k
}

/// Consistent mass matrix for a 3D frame element.
///
/// Derived from the same shape functions as the stiffness matrix; total
/// mass `rho * a * length`, torsional inertia from the polar moment
/// `ip = iy + iz`.
pub fn consistent_mass(rho: f64, a: f64, iy: f64, iz: f64, length: f64) -> Mat12 {
    let mut m = Mat12::zeros();
    let l = length;
    let scale = rho * a * l / 420.0;

    // Axial and torsional inertia share the linear two-node shape-function
    // pattern; twist picks up the polar ratio.
    let polar = (iy + iz) / a;
    for (d1, d2, factor) in [(0, 6, 1.0), (3, 9, polar)] {
        m[(d1, d1)] = 140.0 * factor * scale;
        m[(d2, d2)] = 140.0 * factor * scale;
        m[(d1, d2)] = 70.0 * factor * scale;
        m[(d2, d1)] = 70.0 * factor * scale;
    }

    // Hermite translation/rotation inertia per bending plane, with the
    // same rotation-sense flip between the planes as the stiffness.
    for (dofs, sense) in [((1, 7, 5, 11), 1.0), ((2, 8, 4, 10), -1.0)] {
        let (t1, t2, r1, r2) = dofs;
        let mut set = |row: usize, col: usize, value: f64| {
            m[(row, col)] = value;
            m[(col, row)] = value;
        };

        set(t1, t1, 156.0 * scale);
        set(t2, t2, 156.0 * scale);
        set(t1, t2, 54.0 * scale);

        set(t1, r1, sense * 22.0 * l * scale);
        set(t2, r2, -sense * 22.0 * l * scale);
        set(t1, r2, -sense * 13.0 * l * scale);
        set(t2, r1, sense * 13.0 * l * scale);

        set(r1, r1, 4.0 * l * l * scale);
        set(r2, r2, 4.0 * l * l * scale);
        set(r1, r2, -3.0 * l * l * scale);
    }

    m
}

/// Geometric stiffness matrix for P-Delta analysis: the standard
/// consistent initial-stress terms for a prismatic member under axial
/// force. Tension stiffens, compression softens.
///
/// # Arguments
/// * `p` - Axial force, tension positive
/// * `a` - Cross-sectional area
/// * `iy`, `iz` - Moments of inertia
/// * `length` - Element length
pub fn geometric_stiffness(p: f64, a: f64, iy: f64, iz: f64, length: f64) -> Mat12 {
    if p.abs() < 1e-10 {
        return Mat12::zeros();
    }

    let mut k = Mat12::zeros();
    let l = length;

    opposed_pair(&mut k, 0, 6, p / l);
    // Torsional term scales with the polar radius of gyration squared
    opposed_pair(&mut k, 3, 9, p * (iy + iz) / (a * l));

    // Same plane pairing and moment-sense flip as the elastic matrix
    for (dofs, sense) in [((1, 7, 5, 11), 1.0), ((2, 8, 4, 10), -1.0)] {
        bending_plane(
            &mut k,
            dofs,
            6.0 * p / (5.0 * l),
            sense * p / 10.0,
            2.0 * p * l / 15.0,
            -p * l / 30.0,
        );
    }

    k
}

fn partition(releases: &[bool; 12]) -> (Vec<usize>, Vec<usize>) {
    let kept = (0..12).filter(|&i| !releases[i]).collect();
    let released = (0..12).filter(|&i| releases[i]).collect();
    (kept, released)
}

/// Condense released DOFs out of the element stiffness matrix.
///
/// Standard static condensation `k11 - k12 * inv(k22) * k21`, expanded
/// back to 12x12 with zero rows/columns at the released DOFs.
pub fn apply_releases(k: &Mat12, releases: &[bool; 12]) -> Mat12 {
    let (kept, released) = partition(releases);
    if released.is_empty() {
        return *k;
    }

    let n1 = kept.len();
    let n2 = released.len();

    let k11 = DMatrix::from_fn(n1, n1, |i, j| k[(kept[i], kept[j])]);
    let k12 = DMatrix::from_fn(n1, n2, |i, j| k[(kept[i], released[j])]);
    let k21 = DMatrix::from_fn(n2, n1, |i, j| k[(released[i], kept[j])]);
    let k22 = DMatrix::from_fn(n2, n2, |i, j| k[(released[i], released[j])]);

    let k22_inv = match k22.try_inverse() {
        Some(inv) => inv,
        None => return *k,
    };

    let condensed = &k11 - &k12 * &k22_inv * &k21;

    let mut out = Mat12::zeros();
    for (i, &gi) in kept.iter().enumerate() {
        for (j, &gj) in kept.iter().enumerate() {
            out[(gi, gj)] = condensed[(i, j)];
        }
    }
    out
}

/// Condense released DOFs out of a fixed-end force vector:
/// `fer1 - k12 * inv(k22) * fer2`, with `k` the uncondensed stiffness.
pub fn apply_fer_releases(fer: &Vec12, k: &Mat12, releases: &[bool; 12]) -> Vec12 {
    let (kept, released) = partition(releases);
    if released.is_empty() {
        return *fer;
    }

    let n1 = kept.len();
    let n2 = released.len();

    let k12 = DMatrix::from_fn(n1, n2, |i, j| k[(kept[i], released[j])]);
    let k22 = DMatrix::from_fn(n2, n2, |i, j| k[(released[i], released[j])]);

    let fer1 = DVector::from_fn(n1, |i, _| fer[kept[i]]);
    let fer2 = DVector::from_fn(n2, |i, _| fer[released[i]]);

    let k22_inv = match k22.try_inverse() {
        Some(inv) => inv,
        None => return *fer,
    };

    let condensed = &fer1 - &k12 * &k22_inv * &fer2;

    let mut out = Vec12::zeros();
    for (i, &gi) in kept.iter().enumerate() {
        out[gi] = condensed[i];
    }
    out
}

/// Fixed-end forces for a uniform line load over the full element length.
///
/// Sign convention: the returned vector holds the clamped-end member
/// forces; the equivalent nodal load vector is its negative.
///
/// # Arguments
/// * `w` - Load intensity (force per unit length, local frame)
/// * `length` - Element length
/// * `direction` - Local axis index (0 = x, 1 = y, 2 = z)
pub fn fer_uniform_load(w: f64, length: f64, direction: usize) -> Vec12 {
    let l = length;
    let l2 = l * l;

    let mut fer = Vec12::zeros();

    match direction {
        0 => {
            fer[0] = -w * l / 2.0;
            fer[6] = -w * l / 2.0;
        }
        1 => {
            fer[1] = -w * l / 2.0;
            fer[5] = -w * l2 / 12.0;
            fer[7] = -w * l / 2.0;
            fer[11] = w * l2 / 12.0;
        }
        2 => {
            fer[2] = -w * l / 2.0;
            fer[4] = w * l2 / 12.0;
            fer[8] = -w * l / 2.0;
            fer[10] = -w * l2 / 12.0;
        }
        _ => {}
    }

    fer
}

// 4-point Gauss-Legendre rule; exact through degree 7, comfortably above
// the Hermite-cubic-times-linear integrand.
const GAUSS_POINTS: [(f64, f64); 4] = [
    (-0.861136311594053, 0.347854845137454),
    (-0.339981043584856, 0.652145154862546),
    (0.339981043584856, 0.652145154862546),
    (0.861136311594053, 0.347854845137454),
];

/// Fixed-end forces for a linearly varying line load over `[x1, x2]`
/// (distances from the start node), computed as the consistent load vector
/// of the beam shape functions via Gauss quadrature.
pub fn fer_linear_load(w1: f64, w2: f64, x1: f64, x2: f64, length: f64, direction: usize) -> Vec12 {
    let l = length;
    let span = x2 - x1;
    if span <= 0.0 || (w1 == 0.0 && w2 == 0.0) {
        return Vec12::zeros();
    }

    let mut fer = Vec12::zeros();

    for (point, weight) in GAUSS_POINTS {
        // Map the reference point to [x1, x2]
        let x = x1 + span * (point + 1.0) / 2.0;
        let w = w1 + (w2 - w1) * (x - x1) / span;
        let scale = weight * span / 2.0 * w;

        let xi = x / l;
        match direction {
            0 => {
                fer[0] -= scale * (1.0 - xi);
                fer[6] -= scale * xi;
            }
            1 | 2 => {
                let xi2 = xi * xi;
                let xi3 = xi2 * xi;
                // Hermite translation/rotation shape functions
                let n1 = 1.0 - 3.0 * xi2 + 2.0 * xi3;
                let n2 = l * (xi - 2.0 * xi2 + xi3);
                let n3 = 3.0 * xi2 - 2.0 * xi3;
                let n4 = l * (xi3 - xi2);

                if direction == 1 {
                    fer[1] -= scale * n1;
                    fer[5] -= scale * n2;
                    fer[7] -= scale * n3;
                    fer[11] -= scale * n4;
                } else {
                    // Deflection in local z pairs with rotation about y,
                    // whose positive sense flips the moment terms.
                    fer[2] -= scale * n1;
                    fer[4] += scale * n2;
                    fer[8] -= scale * n3;
                    fer[10] += scale * n4;
                }
            }
            _ => {}
        }
    }

    fer
}
