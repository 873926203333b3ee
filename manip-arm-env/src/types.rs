//! Geometric and state types shared by the control core and its backends.
use nalgebra::{Quaternion, UnitQuaternion, Vector3};
use serde::{Deserialize, Serialize};

/// Unit quaternion from components in `(w, x, y, z)` order, normalized.
pub fn quat_wxyz(w: f32, x: f32, y: f32, z: f32) -> UnitQuaternion<f32> {
    UnitQuaternion::from_quaternion(Quaternion::new(w, x, y, z))
}

/// Orientation of a gripper pointing down at the table.
pub fn gripper_down() -> UnitQuaternion<f32> {
    quat_wxyz(0.5, 0.5, -0.5, -0.5)
}

/// Position and orientation of a body, site or end effector.
///
/// A snapshot taken at the time of a backend query.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    /// Position.
    pub position: Vector3<f32>,

    /// Orientation.
    pub orientation: UnitQuaternion<f32>,
}

impl Pose {
    /// Constructs a pose.
    pub fn new(position: Vector3<f32>, orientation: UnitQuaternion<f32>) -> Self {
        Self {
            position,
            orientation,
        }
    }

    /// A pose at `position` with the identity orientation.
    pub fn from_position(position: Vector3<f32>) -> Self {
        Self::new(position, UnitQuaternion::identity())
    }

    /// Orientation as `(roll, pitch, yaw)` Euler angles.
    pub fn euler(&self) -> Vector3<f32> {
        let (roll, pitch, yaw) = self.orientation.euler_angles();
        Vector3::new(roll, pitch, yaw)
    }
}

impl Default for Pose {
    fn default() -> Self {
        Self::from_position(Vector3::zeros())
    }
}

/// Position, velocity and effort of a single joint.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct JointState {
    /// Joint position.
    pub position: f32,

    /// Joint velocity.
    pub velocity: f32,

    /// Joint effort.
    pub effort: f32,
}

/// Open/close intent of the gripper.
///
/// The gripper is not driven by the policy. It latches to [`GripperState::Closed`]
/// when the reward evaluation of the previous step found the gripper close enough to
/// the object, and to [`GripperState::Open`] otherwise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GripperState {
    /// Fingers open.
    Open,

    /// Fingers closed.
    Closed,
}

impl Default for GripperState {
    fn default() -> Self {
        Self::Open
    }
}

impl GripperState {
    /// The abstract gripper signal, `+1` for closed and `-1` for open.
    pub fn signal(&self) -> f32 {
        match self {
            Self::Closed => 1.0,
            Self::Open => -1.0,
        }
    }
}
