//! Conversions between rotation representations.
//!
//! Quaternions use glam's `Quat` (Hamilton convention, `w` is the real part).
//! Matrices act on column vectors, so `R * v` rotates `v`. The 6D form is the
//! first two rows of a rotation matrix, used as a continuous representation.
//!
//! Every function is pure. Functions that normalize take the degeneracy
//! threshold explicitly, usually `PoseConfig::epsilon`.

use std::fmt;
use std::str::FromStr;

use glam::{Mat3, Quat, Vec3};

use crate::core::error::Error;
use crate::core::types::Result;

/// Six-component rotation: row 0 followed by row 1 of a rotation matrix.
pub type SixD = [f32; 6];

/// Element at (row, col) of a column-major matrix.
#[inline]
fn at(m: &Mat3, row: usize, col: usize) -> f32 {
    m.col(col)[row]
}

/// Build a matrix from its three rows.
#[inline]
fn from_rows(r0: Vec3, r1: Vec3, r2: Vec3) -> Mat3 {
    Mat3::from_cols(r0, r1, r2).transpose()
}

/// Quaternion to 3x3 rotation matrix.
///
/// The quaternion is normalized first. A norm below `eps` is an error rather
/// than a silent identity.
pub fn quat_to_mat3(q: Quat, eps: f32) -> Result<Mat3> {
    let norm = q.length();
    if !(norm >= eps) {
        return Err(Error::DegenerateRotation(format!(
            "quaternion norm {norm} below {eps}"
        )));
    }
    let q = q / norm;
    let (w, x, y, z) = (q.w, q.x, q.y, q.z);

    Ok(from_rows(
        Vec3::new(1.0 - 2.0 * (y * y + z * z), 2.0 * (x * y - w * z), 2.0 * (x * z + w * y)),
        Vec3::new(2.0 * (x * y + w * z), 1.0 - 2.0 * (x * x + z * z), 2.0 * (y * z - w * x)),
        Vec3::new(2.0 * (x * z - w * y), 2.0 * (y * z + w * x), 1.0 - 2.0 * (x * x + y * y)),
    ))
}

/// Rotation matrix to unit quaternion (Shepperd's method).
///
/// Picks the numerically largest of w, x, y, z to divide by. The sign of the
/// result is not canonicalized.
pub fn mat3_to_quat(m: Mat3) -> Quat {
    let (m00, m01, m02) = (at(&m, 0, 0), at(&m, 0, 1), at(&m, 0, 2));
    let (m10, m11, m12) = (at(&m, 1, 0), at(&m, 1, 1), at(&m, 1, 2));
    let (m20, m21, m22) = (at(&m, 2, 0), at(&m, 2, 1), at(&m, 2, 2));
    let trace = m00 + m11 + m22;

    let q = if trace > 0.0 {
        let s = (trace + 1.0).sqrt() * 2.0;
        Quat::from_xyzw((m21 - m12) / s, (m02 - m20) / s, (m10 - m01) / s, 0.25 * s)
    } else if m00 > m11 && m00 > m22 {
        let s = (1.0 + m00 - m11 - m22).sqrt() * 2.0;
        Quat::from_xyzw(0.25 * s, (m01 + m10) / s, (m02 + m20) / s, (m21 - m12) / s)
    } else if m11 > m22 {
        let s = (1.0 + m11 - m00 - m22).sqrt() * 2.0;
        Quat::from_xyzw((m01 + m10) / s, 0.25 * s, (m12 + m21) / s, (m02 - m20) / s)
    } else {
        let s = (1.0 + m22 - m00 - m11).sqrt() * 2.0;
        Quat::from_xyzw((m02 + m20) / s, (m12 + m21) / s, 0.25 * s, (m10 - m01) / s)
    };

    q.normalize()
}

fn unit_axis(axis: Vec3, eps: f32) -> Result<Vec3> {
    let norm = axis.length();
    if !(norm >= eps) {
        return Err(Error::DegenerateRotation(format!(
            "rotation axis norm {norm} below {eps}"
        )));
    }
    Ok(axis / norm)
}

/// Axis-angle to rotation matrix (Rodrigues' formula).
///
/// The axis does not need to be unit length. `angle` is in radians.
pub fn axis_angle_to_mat3(axis: Vec3, angle: f32, eps: f32) -> Result<Mat3> {
    let k = unit_axis(axis, eps)?;
    // skew-symmetric cross product matrix of k
    let skew = from_rows(
        Vec3::new(0.0, -k.z, k.y),
        Vec3::new(k.z, 0.0, -k.x),
        Vec3::new(-k.y, k.x, 0.0),
    );
    let (sin, cos) = angle.sin_cos();
    Ok(Mat3::IDENTITY + skew * sin + (skew * skew) * (1.0 - cos))
}

/// Axis-angle to unit quaternion.
pub fn axis_angle_to_quat(axis: Vec3, angle: f32, eps: f32) -> Result<Quat> {
    let k = unit_axis(axis, eps)?;
    let (sin, cos) = (angle * 0.5).sin_cos();
    Ok(Quat::from_xyzw(k.x * sin, k.y * sin, k.z * sin, cos))
}

/// Canonical coordinate axis.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    pub fn unit(self) -> Vec3 {
        match self {
            Axis::X => Vec3::X,
            Axis::Y => Vec3::Y,
            Axis::Z => Vec3::Z,
        }
    }

    fn from_char(c: char) -> Option<Self> {
        match c.to_ascii_lowercase() {
            'x' => Some(Axis::X),
            'y' => Some(Axis::Y),
            'z' => Some(Axis::Z),
            _ => None,
        }
    }

    fn as_char(self) -> char {
        match self {
            Axis::X => 'x',
            Axis::Y => 'y',
            Axis::Z => 'z',
        }
    }
}

/// Order in which the three Euler angles are composed.
///
/// `"xyz"` means `R = Rx(a0) * Ry(a1) * Rz(a2)`. Repeated axes (`"zxz"`) are
/// allowed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct EulerOrder(pub [Axis; 3]);

impl EulerOrder {
    pub const XYZ: EulerOrder = EulerOrder([Axis::X, Axis::Y, Axis::Z]);
    pub const ZYX: EulerOrder = EulerOrder([Axis::Z, Axis::Y, Axis::X]);
    pub const ZXY: EulerOrder = EulerOrder([Axis::Z, Axis::X, Axis::Y]);
    pub const YXZ: EulerOrder = EulerOrder([Axis::Y, Axis::X, Axis::Z]);

    pub fn axes(&self) -> [Axis; 3] {
        self.0
    }
}

impl FromStr for EulerOrder {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let axes: Vec<Axis> = s.chars().map(Axis::from_char).collect::<Option<_>>()
            .ok_or_else(|| Error::InvalidEulerOrder(s.to_string()))?;

        match axes.as_slice() {
            [a, b, c] => Ok(EulerOrder([*a, *b, *c])),
            _ => Err(Error::InvalidEulerOrder(s.to_string())),
        }
    }
}

impl fmt::Display for EulerOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.iter().try_for_each(|a| write!(f, "{}", a.as_char()))
    }
}

/// Unit of Euler angle input.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum AngleUnit {
    #[default]
    Radians,
    Degrees,
}

impl AngleUnit {
    #[inline]
    pub fn to_radians(self, angle: f32) -> f32 {
        match self {
            AngleUnit::Radians => angle,
            AngleUnit::Degrees => angle.to_radians(),
        }
    }
}

fn elementary_mat3(axis: Axis, angle: f32) -> Mat3 {
    match axis {
        Axis::X => Mat3::from_rotation_x(angle),
        Axis::Y => Mat3::from_rotation_y(angle),
        Axis::Z => Mat3::from_rotation_z(angle),
    }
}

fn elementary_quat(axis: Axis, angle: f32) -> Quat {
    let (sin, cos) = (angle * 0.5).sin_cos();
    let v = axis.unit() * sin;
    Quat::from_xyzw(v.x, v.y, v.z, cos)
}

/// Euler angles to rotation matrix, `angles[i]` about `order[i]`.
pub fn euler_to_mat3(angles: Vec3, order: EulerOrder, unit: AngleUnit) -> Mat3 {
    let [a0, a1, a2] = order.axes();
    let r0 = elementary_mat3(a0, unit.to_radians(angles.x));
    let r1 = elementary_mat3(a1, unit.to_radians(angles.y));
    let r2 = elementary_mat3(a2, unit.to_radians(angles.z));
    r0 * (r1 * r2)
}

/// Euler angles to unit quaternion, same composition as [`euler_to_mat3`].
pub fn euler_to_quat(angles: Vec3, order: EulerOrder, unit: AngleUnit) -> Quat {
    let [a0, a1, a2] = order.axes();
    let q0 = elementary_quat(a0, unit.to_radians(angles.x));
    let q1 = elementary_quat(a1, unit.to_radians(angles.y));
    let q2 = elementary_quat(a2, unit.to_radians(angles.z));
    quat_mul(q0, quat_mul(q1, q2))
}

/// First two rows of a rotation matrix.
pub fn mat3_to_sixd(m: Mat3) -> SixD {
    let r0 = m.row(0);
    let r1 = m.row(1);
    [r0.x, r0.y, r0.z, r1.x, r1.y, r1.z]
}

/// 6D to rotation matrix by Gram-Schmidt.
///
/// Row 0 is normalized, its component is removed from row 1 which is then
/// normalized, row 2 is their cross product.
pub fn sixd_to_mat3(sixd: SixD, eps: f32) -> Result<Mat3> {
    let a = Vec3::new(sixd[0], sixd[1], sixd[2]);
    let b = Vec3::new(sixd[3], sixd[4], sixd[5]);

    let a_len = a.length();
    if !(a_len >= eps) {
        return Err(Error::DegenerateRotation(format!("6D first row norm {a_len} below {eps}")));
    }
    let x = a / a_len;

    let b = b - x * x.dot(b);
    let b_len = b.length();
    if !(b_len >= eps) {
        return Err(Error::DegenerateRotation("6D rows are parallel".into()));
    }
    let y = b / b_len;
    let z = x.cross(y);

    Ok(from_rows(x, y, z))
}

/// Quaternion straight to 6D without building the third row.
pub fn quat_to_sixd(q: Quat, eps: f32) -> Result<SixD> {
    quat_to_mat3(q, eps).map(mat3_to_sixd)
}

/// Hamilton product. `quat_mul(q0, q1)` applies `q1` first, then `q0`.
pub fn quat_mul(q0: Quat, q1: Quat) -> Quat {
    let (w0, x0, y0, z0) = (q0.w, q0.x, q0.y, q0.z);
    let (w1, x1, y1, z1) = (q1.w, q1.x, q1.y, q1.z);

    Quat::from_xyzw(
        w0 * x1 + x0 * w1 + y0 * z1 - z0 * y1,
        w0 * y1 - x0 * z1 + y0 * w1 + z0 * x1,
        w0 * z1 + x0 * y1 - y0 * x1 + z0 * w1,
        w0 * w1 - x0 * x1 - y0 * y1 - z0 * z1,
    )
}

/// Multiplicative inverse: conjugate divided by squared norm.
pub fn quat_inv(q: Quat, eps: f32) -> Result<Quat> {
    let norm_sq = q.length_squared();
    if !(norm_sq >= eps * eps) {
        return Err(Error::DegenerateRotation(format!(
            "cannot invert quaternion with norm {}",
            norm_sq.sqrt()
        )));
    }
    let c = q.conjugate();
    Ok(Quat::from_xyzw(c.x / norm_sq, c.y / norm_sq, c.z / norm_sq, c.w / norm_sq))
}

/// Inverse of an orthonormal matrix.
#[inline]
pub fn mat3_inv(m: Mat3) -> Mat3 {
    m.transpose()
}
