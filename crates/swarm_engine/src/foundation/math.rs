//! Math utilities and types
//!
//! Provides the vector, rotation and transform types shared by the pool,
//! the instance backends and the movement code.

use serde::{Deserialize, Serialize};

pub use nalgebra::{Matrix4, Quaternion, Unit, UnitQuaternion, Vector3};

/// 3D vector type
pub type Vec3 = Vector3<f32>;

/// 4x4 matrix type
pub type Mat4 = Matrix4<f32>;

/// Quaternion type for rotations
pub type Quat = UnitQuaternion<f32>;

/// World up axis used for facing computations
pub const UP: Vec3 = Vec3::new(0.0, 1.0, 0.0);

/// Transform representing position, rotation, and scale
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    /// Position in 3D space
    pub position: Vec3,

    /// Rotation quaternion
    pub rotation: Quat,

    /// Scale factors
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vec3::zeros(),
            rotation: Quat::identity(),
            scale: Vec3::new(1.0, 1.0, 1.0),
        }
    }
}

impl Transform {
    /// Create a new identity transform
    pub fn identity() -> Self {
        Self::default()
    }

    /// Create a transform with only position
    pub fn from_position(position: Vec3) -> Self {
        Self {
            position,
            ..Default::default()
        }
    }

    /// Create a transform with position and rotation
    pub fn from_position_rotation(position: Vec3, rotation: Quat) -> Self {
        Self {
            position,
            rotation,
            ..Default::default()
        }
    }

    /// Builder: replace the scale
    pub fn with_scale(mut self, scale: Vec3) -> Self {
        self.scale = scale;
        self
    }

    /// Convert to a transformation matrix
    pub fn to_matrix(&self) -> Mat4 {
        Mat4::new_translation(&self.position)
            * self.rotation.to_homogeneous()
            * Mat4::new_nonuniform_scaling(&self.scale)
    }

    /// Apply `child` inside this transform's frame.
    ///
    /// The child's translation is scaled and rotated by `self` before being
    /// offset by `self.position`, so the result places the child relative to
    /// this transform rather than in world space.
    pub fn combine(&self, child: &Transform) -> Transform {
        Transform {
            position: self.position + self.rotation * self.scale.component_mul(&child.position),
            rotation: self.rotation * child.rotation,
            scale: self.scale.component_mul(&child.scale),
        }
    }

    /// Distance between the translations of two transforms
    pub fn distance_to(&self, point: &Vec3) -> f32 {
        (self.position - point).magnitude()
    }
}

/// Rotation that points local +Z along `direction` with Y kept up.
///
/// Returns `None` for a zero-length direction. A direction parallel to the
/// up axis falls back to +Z as the reference up vector.
pub fn look_rotation(direction: &Vec3) -> Option<Quat> {
    let length = direction.magnitude();
    if length <= f32::EPSILON {
        return None;
    }
    let forward = direction / length;
    let up = if forward.cross(&UP).magnitude_squared() <= 1.0e-6 {
        Vec3::z()
    } else {
        UP
    };
    Some(Quat::face_towards(&forward, &up))
}

/// Build a rotation from Euler angles in degrees about the X, Y and Z axes
pub fn rotation_from_degrees(degrees: [f32; 3]) -> Quat {
    Quat::from_euler_angles(
        utils::deg_to_rad(degrees[0]),
        utils::deg_to_rad(degrees[1]),
        utils::deg_to_rad(degrees[2]),
    )
}

/// Math utility functions
pub mod utils {
    /// Degrees to radians conversion factor
    pub const DEG_TO_RAD: f32 = std::f32::consts::PI / 180.0;

    /// Convert degrees to radians
    pub fn deg_to_rad(degrees: f32) -> f32 {
        degrees * DEG_TO_RAD
    }

    /// Component-wise division that maps zero divisors to zero instead of infinity
    pub fn safe_div(numerator: super::Vec3, denominator: &super::Vec3) -> super::Vec3 {
        numerator.zip_map(denominator, |n, d| if d == 0.0 { 0.0 } else { n / d })
    }
}
