//! Rigid homogeneous transforms.

use nalgebra::{Matrix3, Matrix4, Rotation3, Vector3, Vector4};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{ExtrinsicsError, Result};

/// Maximum element of `RᵀR − I` accepted for the rotation block.
pub const ORTHONORMALITY_TOLERANCE: f64 = 1e-6;

/// `|r02|` above which the pitch is treated as ±90°.
const GIMBAL_LOCK_THRESHOLD: f64 = 1.0 - 1e-9;

/// A rigid body transform stored as a 4x4 homogeneous matrix.
///
/// The matrix maps points expressed in a child frame into its parent frame:
/// `p_parent = T * p_child`. The top-left 3x3 block is a proper rotation,
/// the top-right column is the translation and the bottom row is `[0, 0, 0, 1]`.
///
/// Construction through [`RigidTransform::new`] validates those properties.
/// [`RigidTransform::from_matrix_unchecked`] skips the check; every algebra
/// operation re-validates its operands, so a malformed matrix is reported as
/// [`ExtrinsicsError::InvalidTransform`] at first use.
///
/// # Example
///
/// ```
/// use sensor_extrinsics::RigidTransform;
///
/// let a = RigidTransform::from_translation(1.0, 0.0, 0.0);
/// let b = RigidTransform::from_translation(0.0, 2.0, 0.0);
/// let ab = a.compose(&b).unwrap();
/// assert!((ab.translation().y - 2.0).abs() < 1e-12);
///
/// let identity = ab.compose(&ab.inverse().unwrap()).unwrap();
/// assert!(identity.approx_eq(&RigidTransform::identity(), 1e-12));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "[[f64; 4]; 4]", into = "[[f64; 4]; 4]")]
pub struct RigidTransform {
    matrix: Matrix4<f64>,
}

impl Default for RigidTransform {
    fn default() -> Self {
        Self::identity()
    }
}

impl RigidTransform {
    /// Creates a transform from a homogeneous matrix, validating rigidity.
    ///
    /// # Errors
    ///
    /// Returns [`ExtrinsicsError::InvalidTransform`] if the matrix has
    /// non-finite entries, a bottom row other than `[0, 0, 0, 1]`, or a
    /// rotation block that is not orthonormal with determinant +1.
    pub fn new(matrix: Matrix4<f64>) -> Result<Self> {
        let transform = Self { matrix };
        transform.validate()?;
        Ok(transform)
    }

    /// Wraps a matrix without validating it.
    ///
    /// Intended for matrices that come from a trusted source such as a frame
    /// tree service. Operations on the result still validate it.
    #[must_use]
    pub const fn from_matrix_unchecked(matrix: Matrix4<f64>) -> Self {
        Self { matrix }
    }

    /// The identity transform.
    #[must_use]
    pub fn identity() -> Self {
        Self {
            matrix: Matrix4::identity(),
        }
    }

    /// A pure translation.
    #[must_use]
    pub fn from_translation(x: f64, y: f64, z: f64) -> Self {
        Self {
            matrix: Matrix4::new_translation(&Vector3::new(x, y, z)),
        }
    }

    /// Creates a transform from a rotation block and a translation.
    ///
    /// # Errors
    ///
    /// Returns [`ExtrinsicsError::InvalidTransform`] if `rotation` is not a
    /// proper rotation or `translation` is not finite.
    pub fn from_parts(rotation: &Matrix3<f64>, translation: &Vector3<f64>) -> Result<Self> {
        Self::new(assemble(rotation, translation))
    }

    /// Creates a transform from a translation and intrinsic XYZ Euler angles.
    #[must_use]
    pub fn from_translation_euler(translation: &Vector3<f64>, euler: EulerXyz) -> Self {
        Self {
            matrix: assemble(&euler.to_rotation(), translation),
        }
    }

    /// The underlying 4x4 matrix.
    #[must_use]
    pub const fn matrix(&self) -> &Matrix4<f64> {
        &self.matrix
    }

    /// The 3x3 rotation block.
    #[must_use]
    pub fn rotation(&self) -> Matrix3<f64> {
        self.matrix.fixed_view::<3, 3>(0, 0).into_owned()
    }

    /// The translation column.
    #[must_use]
    pub fn translation(&self) -> Vector3<f64> {
        Vector3::new(self.matrix[(0, 3)], self.matrix[(1, 3)], self.matrix[(2, 3)])
    }

    /// Checks the rigid-transform invariants.
    ///
    /// # Errors
    ///
    /// Returns [`ExtrinsicsError::InvalidTransform`] naming the first violated
    /// invariant.
    pub fn validate(&self) -> Result<()> {
        if self.matrix.iter().any(|v| !v.is_finite()) {
            return Err(ExtrinsicsError::invalid_transform(
                "matrix contains non-finite entries",
            ));
        }

        let bottom = self.matrix.row(3);
        #[allow(clippy::float_cmp)] // The bottom row must be exact
        let bottom_ok = bottom[0] == 0.0 && bottom[1] == 0.0 && bottom[2] == 0.0 && bottom[3] == 1.0;
        if !bottom_ok {
            return Err(ExtrinsicsError::invalid_transform(format!(
                "bottom row is [{}, {}, {}, {}], expected [0, 0, 0, 1]",
                bottom[0], bottom[1], bottom[2], bottom[3]
            )));
        }

        let rotation = self.rotation();
        let error = (rotation.transpose() * rotation - Matrix3::identity()).amax();
        if error > ORTHONORMALITY_TOLERANCE {
            return Err(ExtrinsicsError::invalid_transform(format!(
                "rotation block is not orthonormal (max |RᵀR - I| = {error:e})"
            )));
        }
        if rotation.determinant() <= 0.0 {
            return Err(ExtrinsicsError::invalid_transform(
                "rotation block is a reflection (determinant is not +1)",
            ));
        }

        Ok(())
    }

    /// Composes `self · other`.
    ///
    /// If `self` maps frame B into A and `other` maps C into B, the result
    /// maps C into A.
    ///
    /// # Errors
    ///
    /// Returns [`ExtrinsicsError::InvalidTransform`] if either operand is not
    /// a rigid transform.
    pub fn compose(&self, other: &Self) -> Result<Self> {
        self.validate()?;
        other.validate()?;
        Ok(Self {
            matrix: self.matrix * other.matrix,
        })
    }

    /// Returns the inverse transform.
    ///
    /// Computed in closed form as `[Rᵀ | −Rᵀt]` so the rotation block stays
    /// orthonormal.
    ///
    /// # Errors
    ///
    /// Returns [`ExtrinsicsError::InvalidTransform`] if `self` is not a rigid
    /// transform.
    pub fn inverse(&self) -> Result<Self> {
        self.validate()?;
        let rotation_t = self.rotation().transpose();
        let translation = -(rotation_t * self.translation());
        Ok(Self {
            matrix: assemble(&rotation_t, &translation),
        })
    }

    /// Splits the transform into a translation and intrinsic XYZ Euler angles.
    ///
    /// At gimbal lock (pitch of ±90°) the angles are not unique; yaw is then
    /// reported as zero and the whole residual rotation is carried by roll.
    ///
    /// # Errors
    ///
    /// Returns [`ExtrinsicsError::InvalidTransform`] if `self` is not a rigid
    /// transform.
    pub fn decompose(&self) -> Result<Decomposition> {
        self.validate()?;
        let r = self.rotation();

        let sin_pitch = r[(0, 2)].clamp(-1.0, 1.0);
        let pitch = sin_pitch.asin();
        let (roll, yaw) = if sin_pitch.abs() >= GIMBAL_LOCK_THRESHOLD {
            debug!(pitch, "decomposing rotation at gimbal lock, yaw pinned to zero");
            (r[(2, 1)].atan2(r[(1, 1)]), 0.0)
        } else {
            ((-r[(1, 2)]).atan2(r[(2, 2)]), (-r[(0, 1)]).atan2(r[(0, 0)]))
        };

        Ok(Decomposition {
            translation: self.translation(),
            euler: EulerXyz { roll, pitch, yaw },
        })
    }

    /// Applies the transform to a point.
    #[must_use]
    pub fn transform_point(&self, point: &Vector3<f64>) -> Vector3<f64> {
        let p = self.matrix * Vector4::new(point.x, point.y, point.z, 1.0);
        Vector3::new(p.x, p.y, p.z)
    }

    /// Returns true if every matrix element is within `epsilon` of `other`'s.
    #[must_use]
    pub fn approx_eq(&self, other: &Self, epsilon: f64) -> bool {
        (self.matrix - other.matrix).amax() <= epsilon
    }
}

impl TryFrom<[[f64; 4]; 4]> for RigidTransform {
    type Error = ExtrinsicsError;

    fn try_from(rows: [[f64; 4]; 4]) -> Result<Self> {
        Self::new(Matrix4::from_fn(|r, c| rows[r][c]))
    }
}

impl From<RigidTransform> for [[f64; 4]; 4] {
    fn from(transform: RigidTransform) -> Self {
        let m = transform.matrix;
        std::array::from_fn(|r| std::array::from_fn(|c| m[(r, c)]))
    }
}

fn assemble(rotation: &Matrix3<f64>, translation: &Vector3<f64>) -> Matrix4<f64> {
    let mut matrix = Matrix4::identity();
    matrix.fixed_view_mut::<3, 3>(0, 0).copy_from(rotation);
    matrix.fixed_view_mut::<3, 1>(0, 3).copy_from(translation);
    matrix
}

/// Intrinsic XYZ Euler angles in radians.
///
/// The rotation is `Rx(roll) · Ry(pitch) · Rz(yaw)`: rotate about X, then
/// about the rotated Y, then about the twice-rotated Z.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct EulerXyz {
    /// Rotation about X.
    pub roll: f64,
    /// Rotation about the rotated Y.
    pub pitch: f64,
    /// Rotation about the twice-rotated Z.
    pub yaw: f64,
}

impl EulerXyz {
    /// Creates a set of angles.
    #[must_use]
    pub const fn new(roll: f64, pitch: f64, yaw: f64) -> Self {
        Self { roll, pitch, yaw }
    }

    /// The rotation matrix described by these angles.
    #[must_use]
    pub fn to_rotation(&self) -> Matrix3<f64> {
        let rx = Rotation3::from_axis_angle(&Vector3::x_axis(), self.roll);
        let ry = Rotation3::from_axis_angle(&Vector3::y_axis(), self.pitch);
        let rz = Rotation3::from_axis_angle(&Vector3::z_axis(), self.yaw);
        (rx * ry * rz).into_inner()
    }

    /// Returns true if pitch is within `tolerance` radians of ±90°.
    #[must_use]
    pub fn is_near_gimbal_lock(&self, tolerance: f64) -> bool {
        (self.pitch.abs() - std::f64::consts::FRAC_PI_2).abs() < tolerance
    }
}

/// Translation and orientation of a rigid transform.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Decomposition {
    /// Translation `(x, y, z)`.
    pub translation: Vector3<f64>,
    /// Orientation as intrinsic XYZ Euler angles.
    pub euler: EulerXyz,
}

impl Decomposition {
    /// Rebuilds the homogeneous transform.
    #[must_use]
    pub fn to_transform(&self) -> RigidTransform {
        RigidTransform::from_translation_euler(&self.translation, self.euler)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::float_cmp)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f64::consts::{FRAC_PI_2, FRAC_PI_4, PI};

    fn sample() -> RigidTransform {
        RigidTransform::from_translation_euler(
            &Vector3::new(0.4, -1.2, 2.5),
            EulerXyz::new(0.3, -0.7, 1.9),
        )
    }

    #[test]
    fn identity_is_valid() {
        let t = RigidTransform::identity();
        assert!(t.validate().is_ok());
        assert_eq!(t, RigidTransform::default());
    }

    #[test]
    fn new_rejects_bad_bottom_row() {
        let mut m = Matrix4::identity();
        m[(3, 0)] = 0.5;
        let err = RigidTransform::new(m).unwrap_err();
        assert!(err.to_string().contains("bottom row"));
    }

    #[test]
    fn new_rejects_scaled_rotation() {
        let m = Matrix4::new_nonuniform_scaling(&Vector3::new(2.0, 1.0, 1.0));
        let err = RigidTransform::new(m).unwrap_err();
        assert!(err.to_string().contains("orthonormal"));
    }

    #[test]
    fn new_rejects_reflection() {
        let m = Matrix4::new_nonuniform_scaling(&Vector3::new(-1.0, 1.0, 1.0));
        let err = RigidTransform::new(m).unwrap_err();
        assert!(err.to_string().contains("reflection"));
    }

    #[test]
    fn new_rejects_non_finite() {
        let m = Matrix4::new_translation(&Vector3::new(f64::NAN, 0.0, 0.0));
        assert!(RigidTransform::new(m).is_err());
    }

    #[test]
    fn new_accepts_small_drift() {
        let mut m = *sample().matrix();
        m[(0, 0)] += 1e-8;
        assert!(RigidTransform::new(m).is_ok());
    }

    #[test]
    fn unchecked_transform_fails_on_use() {
        let bad = RigidTransform::from_matrix_unchecked(Matrix4::zeros());
        assert!(bad.inverse().is_err());
        assert!(bad.decompose().is_err());
        assert!(bad.compose(&RigidTransform::identity()).is_err());
        assert!(RigidTransform::identity().compose(&bad).is_err());
    }

    #[test]
    fn compose_translations() {
        let a = RigidTransform::from_translation(10.0, 0.0, 0.0);
        let b = RigidTransform::from_translation(0.0, 5.0, 0.0);
        let ab = a.compose(&b).unwrap();
        assert_relative_eq!(ab.translation(), Vector3::new(10.0, 5.0, 0.0), epsilon = 1e-12);
    }

    #[test]
    fn compose_applies_right_operand_first() {
        let rotate = RigidTransform::from_translation_euler(
            &Vector3::zeros(),
            EulerXyz::new(0.0, 0.0, FRAC_PI_2),
        );
        let shift = RigidTransform::from_translation(1.0, 0.0, 0.0);

        let p = rotate.compose(&shift).unwrap().transform_point(&Vector3::zeros());
        assert_relative_eq!(p, Vector3::new(0.0, 1.0, 0.0), epsilon = 1e-12);

        let q = shift.compose(&rotate).unwrap().transform_point(&Vector3::zeros());
        assert_relative_eq!(q, Vector3::new(1.0, 0.0, 0.0), epsilon = 1e-12);
    }

    #[test]
    fn inverse_of_translation() {
        let t = RigidTransform::from_translation(10.0, 20.0, 30.0);
        let p = t.inverse().unwrap().transform_point(&Vector3::new(15.0, 25.0, 35.0));
        assert_relative_eq!(p, Vector3::new(5.0, 5.0, 5.0), epsilon = 1e-12);
    }

    #[test]
    fn inverse_composes_to_identity() {
        let t = sample();
        let i = t.compose(&t.inverse().unwrap()).unwrap();
        assert!(i.approx_eq(&RigidTransform::identity(), 1e-12));
        let j = t.inverse().unwrap().compose(&t).unwrap();
        assert!(j.approx_eq(&RigidTransform::identity(), 1e-12));
    }

    #[test]
    fn inverse_keeps_exact_bottom_row() {
        let inv = sample().inverse().unwrap();
        assert_eq!(inv.matrix().row(3)[3], 1.0);
        assert_eq!(inv.matrix().row(3)[0], 0.0);
    }

    #[test]
    fn euler_single_axis_rotations() {
        let rz = EulerXyz::new(0.0, 0.0, FRAC_PI_2).to_rotation();
        assert_relative_eq!(rz * Vector3::x(), Vector3::y(), epsilon = 1e-12);

        let rx = EulerXyz::new(FRAC_PI_2, 0.0, 0.0).to_rotation();
        assert_relative_eq!(rx * Vector3::y(), Vector3::z(), epsilon = 1e-12);

        let ry = EulerXyz::new(0.0, FRAC_PI_2, 0.0).to_rotation();
        assert_relative_eq!(ry * Vector3::x(), -Vector3::z(), epsilon = 1e-12);
    }

    #[test]
    fn euler_order_is_intrinsic_xyz() {
        let e = EulerXyz::new(0.2, 0.3, 0.4);
        let expected = Rotation3::from_axis_angle(&Vector3::x_axis(), 0.2).into_inner()
            * Rotation3::from_axis_angle(&Vector3::y_axis(), 0.3).into_inner()
            * Rotation3::from_axis_angle(&Vector3::z_axis(), 0.4).into_inner();
        assert_relative_eq!(e.to_rotation(), expected, epsilon = 1e-12);
    }

    #[test]
    fn decompose_recovers_angles() {
        let d = sample().decompose().unwrap();
        assert_relative_eq!(d.translation, Vector3::new(0.4, -1.2, 2.5), epsilon = 1e-12);
        assert_relative_eq!(d.euler.roll, 0.3, epsilon = 1e-12);
        assert_relative_eq!(d.euler.pitch, -0.7, epsilon = 1e-12);
        assert_relative_eq!(d.euler.yaw, 1.9, epsilon = 1e-12);
    }

    #[test]
    fn decompose_reconstructs() {
        let t = sample();
        let rebuilt = t.decompose().unwrap().to_transform();
        assert!(rebuilt.approx_eq(&t, 1e-12));
    }

    #[test]
    fn decompose_at_gimbal_lock_pins_yaw() {
        let t = RigidTransform::from_translation_euler(
            &Vector3::zeros(),
            EulerXyz::new(0.5, FRAC_PI_2, 0.0),
        );
        let d = t.decompose().unwrap();
        assert!(d.euler.is_near_gimbal_lock(1e-6));
        assert_eq!(d.euler.yaw, 0.0);
        assert_relative_eq!(d.euler.roll, 0.5, epsilon = 1e-6);
        assert!(d.to_transform().approx_eq(&t, 1e-6));
    }

    #[test]
    fn decompose_half_turn() {
        let t = RigidTransform::from_translation_euler(
            &Vector3::zeros(),
            EulerXyz::new(PI, 0.0, 0.0),
        );
        let d = t.decompose().unwrap();
        assert_relative_eq!(d.euler.roll.abs(), PI, epsilon = 1e-12);
        assert!(d.to_transform().approx_eq(&t, 1e-12));
    }

    #[test]
    fn from_parts_validates() {
        let r = EulerXyz::new(FRAC_PI_4, 0.0, 0.0).to_rotation();
        assert!(RigidTransform::from_parts(&r, &Vector3::new(1.0, 2.0, 3.0)).is_ok());
        assert!(RigidTransform::from_parts(&(r * 2.0), &Vector3::zeros()).is_err());
    }

    #[test]
    fn serde_rows_are_row_major() {
        let t = RigidTransform::from_translation(1.0, 2.0, 3.0);
        let json = serde_json::to_string(&t).unwrap();
        assert_eq!(
            json,
            "[[1.0,0.0,0.0,1.0],[0.0,1.0,0.0,2.0],[0.0,0.0,1.0,3.0],[0.0,0.0,0.0,1.0]]"
        );
        let back: RigidTransform = serde_json::from_str(&json).unwrap();
        assert_eq!(back, t);
    }

    #[test]
    fn serde_rejects_invalid_matrix() {
        let json = "[[2.0,0.0,0.0,0.0],[0.0,1.0,0.0,0.0],[0.0,0.0,1.0,0.0],[0.0,0.0,0.0,1.0]]";
        assert!(serde_json::from_str::<RigidTransform>(json).is_err());
    }
}
