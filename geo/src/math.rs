// Plain [f64; 3] vectors keep the engine free of a linear algebra dependency.

/// Cartesian vector on or near the unit sphere.
pub type Vec3 = [f64; 3];

/// Below this norm a vector is treated as zero when normalizing.
pub const EPS_NORM: f64 = 1.0e-12;

#[inline]
#[must_use]
pub fn dot(a: Vec3, b: Vec3) -> f64 {
    a[0] * b[0] + a[1] * b[1] + a[2] * b[2]
}

#[inline]
#[must_use]
pub fn cross(a: Vec3, b: Vec3) -> Vec3 {
    [a[1] * b[2] - a[2] * b[1], a[2] * b[0] - a[0] * b[2], a[0] * b[1] - a[1] * b[0]]
}

#[inline]
#[must_use]
pub fn add(a: Vec3, b: Vec3) -> Vec3 {
    [a[0] + b[0], a[1] + b[1], a[2] + b[2]]
}

#[inline]
#[must_use]
pub fn sub(a: Vec3, b: Vec3) -> Vec3 {
    [a[0] - b[0], a[1] - b[1], a[2] - b[2]]
}

#[inline]
#[must_use]
pub fn scale(a: Vec3, k: f64) -> Vec3 {
    [a[0] * k, a[1] * k, a[2] * k]
}

#[inline]
#[must_use]
pub fn norm(a: Vec3) -> f64 {
    dot(a, a).sqrt()
}

/// Unit vector along `a`; returns `a` unchanged when it is (numerically) zero.
#[inline]
#[must_use]
pub fn normalize(a: Vec3) -> Vec3 {
    let n = norm(a);
    if n > EPS_NORM {
        scale(a, 1.0 / n)
    } else {
        a
    }
}

/// Straight-line distance between two points.
#[inline]
#[must_use]
pub fn chord_distance(a: Vec3, b: Vec3) -> f64 {
    norm(sub(a, b))
}

/// Proper rotation stored as a row-major 3×3 matrix.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Rotation {
    m: [[f64; 3]; 3],
}

impl Default for Rotation {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Rotation {
    /// The identity rotation.
    pub const IDENTITY: Self = Self { m: [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]] };

    /// Right-handed rotation by `angle` radians about `axis` (Rodrigues form).
    /// A zero axis yields the identity.
    #[must_use]
    #[allow(clippy::many_single_char_names)]
    pub fn about_axis(axis: Vec3, angle: f64) -> Self {
        let n = norm(axis);
        if n <= EPS_NORM {
            return Self::IDENTITY;
        }
        let [x, y, z] = scale(axis, 1.0 / n);
        let (s, c) = angle.sin_cos();
        let t = 1.0 - c;
        Self {
            m: [
                [t * x * x + c, t * x * y - s * z, t * x * z + s * y],
                [t * x * y + s * z, t * y * y + c, t * y * z - s * x],
                [t * x * z - s * y, t * y * z + s * x, t * z * z + c],
            ],
        }
    }

    /// Rotate `v`.
    #[inline]
    #[must_use]
    pub fn apply(&self, v: Vec3) -> Vec3 {
        [dot(self.m[0], v), dot(self.m[1], v), dot(self.m[2], v)]
    }

    /// Undo this rotation on `v` (multiplies by the transpose).
    #[inline]
    #[must_use]
    pub fn apply_inverse(&self, v: Vec3) -> Vec3 {
        let m = &self.m;
        [
            m[0][0] * v[0] + m[1][0] * v[1] + m[2][0] * v[2],
            m[0][1] * v[0] + m[1][1] * v[1] + m[2][1] * v[2],
            m[0][2] * v[0] + m[1][2] * v[1] + m[2][2] * v[2],
        ]
    }

    /// Composition that applies `self` first and `next` second.
    #[must_use]
    pub fn then(&self, next: &Rotation) -> Self {
        let mut out = [[0.0; 3]; 3];
        for (i, row) in out.iter_mut().enumerate() {
            for (j, cell) in row.iter_mut().enumerate() {
                *cell = (0..3).map(|k| next.m[i][k] * self.m[k][j]).sum();
            }
        }
        Self { m: out }
    }

    /// Row-major matrix entries.
    #[must_use]
    pub fn matrix(&self) -> [[f64; 3]; 3] {
        self.m
    }
}
