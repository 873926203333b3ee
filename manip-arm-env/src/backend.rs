//! Capability interface of the systems driven by [`ArmEnv`](crate::ArmEnv).
//!
//! The control core is written against [`Backend`] only. Which backend runs is
//! decided once, by the type parameter of [`ArmEnv`](crate::ArmEnv):
//!
//! * [`SimulatedBackend`](crate::SimulatedBackend) drives a physics scene,
//! * [`HardwareBackend`](crate::HardwareBackend) drives a physical arm through an arm
//!   service and joint-state/object-pose feeds.
use crate::{mapper::ArmCommand, types::Pose};
use anyhow::Result;
use nalgebra::{Vector2, Vector3};
use serde::{de::DeserializeOwned, Serialize};

/// Which quantities [`Backend::read_state`] must provide.
#[derive(Debug, Clone, PartialEq)]
pub struct StateQuery {
    /// Arm joints, in the order of the observation vector.
    pub joint_names: Vec<String>,

    /// Whether the task has an object.
    pub has_object: bool,
}

/// Kinematic quantities of the manipulated object.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ObjectState {
    /// Position.
    pub pos: Vector3<f32>,

    /// Orientation as Euler angles.
    pub rot: Vector3<f32>,

    /// Linear displacement over one control step, relative to the gripper.
    pub velp: Vector3<f32>,

    /// Angular displacement over one control step.
    pub velr: Vector3<f32>,
}

/// Raw state read from a backend, before it is laid out as an observation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawState {
    /// Gripper position.
    pub grip_pos: Vector3<f32>,

    /// Gripper linear displacement over one control step.
    pub grip_velp: Vector3<f32>,

    /// Object quantities, `None` when the task has no object.
    pub object: Option<ObjectState>,

    /// Arm joint positions in the order of [`StateQuery::joint_names`].
    pub joint_pos: Vec<f32>,

    /// Arm joint velocities in the order of [`StateQuery::joint_names`].
    pub joint_vel: Vec<f32>,
}

/// Reference frames captured after setup and after every reset.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct References {
    /// Gripper position around which goals are sampled.
    pub gripper_pos: Vector3<f32>,

    /// Resting height of the object, `None` when the task has no object.
    pub height_offset: Option<f32>,
}

/// A system that provides state and accepts [`ArmCommand`]s.
pub trait Backend {
    /// Configuration.
    type Config: Clone + Default + Serialize + DeserializeOwned;

    /// Builds the backend.
    fn build(config: &Self::Config) -> Result<Self>
    where
        Self: Sized;

    /// One-time bring-up, e.g., initial joint configuration or readiness checks.
    fn setup(&mut self, query: &StateQuery) -> Result<()>;

    /// Stores the current state as the state restored by [`Backend::restore`].
    fn checkpoint(&mut self) -> Result<()>;

    /// Returns to the stored state, or checks that a reset is possible at all when
    /// the physical state cannot be rewound.
    fn restore(&mut self) -> Result<()>;

    /// Places the object at `(xy, z)`.
    fn place_object(&mut self, xy: Vector2<f32>, z: f32) -> Result<()>;

    /// Sets the target pose of the end effector.
    fn set_gripper_target(&mut self, pose: &Pose) -> Result<()>;

    /// Lets the system converge for `n_steps` control steps.
    fn settle(&mut self, n_steps: usize) -> Result<()>;

    /// Applies a command and advances the system by one control step.
    fn apply(&mut self, cmd: &ArmCommand) -> Result<()>;

    /// Reads the current state without side effects.
    fn read_state(&self, query: &StateQuery) -> Result<RawState>;
}
