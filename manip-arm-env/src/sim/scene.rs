//! Interface of physics scenes.
use crate::types::Pose;
use anyhow::Result;
use nalgebra::Vector3;
use serde::{de::DeserializeOwned, Serialize};
use std::fmt::Debug;

/// A physics scene addressed by entity names.
///
/// Every accessor fails with [`ArmEnvError::UnknownName`](crate::ArmEnvError::UnknownName)
/// when the scene has no entity of the given name.
pub trait PhysicsScene {
    /// Configuration of the scene, e.g., a model file and solver options.
    type Config: Clone + Default + Debug + PartialEq + Serialize + DeserializeOwned;

    /// Snapshot of the full simulation state.
    type State: Clone;

    /// Loads the scene.
    fn load(config: &Self::Config) -> Result<Self>
    where
        Self: Sized;

    /// Pose of a body.
    fn body_pose(&self, name: &str) -> Result<Pose>;

    /// Pose of a site.
    fn site_pose(&self, name: &str) -> Result<Pose>;

    /// Linear and angular velocity of a site.
    fn site_velocity(&self, name: &str) -> Result<(Vector3<f32>, Vector3<f32>)>;

    /// Generalized position of a joint, seven values for a free joint.
    fn joint_qpos(&self, name: &str) -> Result<Vec<f32>>;

    /// Sets the generalized position of a joint.
    fn set_joint_qpos(&mut self, name: &str, qpos: &[f32]) -> Result<()>;

    /// Generalized velocity of a joint, six values for a free joint.
    fn joint_qvel(&self, name: &str) -> Result<Vec<f32>>;

    /// Sets the target pose of a mocap body.
    fn set_mocap_pose(&mut self, name: &str, pose: &Pose) -> Result<()>;

    /// Sets the controls of the actuators.
    fn set_actuator_controls(&mut self, ctrl: &[f32]) -> Result<()>;

    /// Runs `n` integration steps.
    fn step(&mut self, n: usize) -> Result<()>;

    /// Recomputes derived quantities without advancing time.
    fn forward(&mut self) -> Result<()>;

    /// Takes a snapshot of the state.
    fn save_state(&self) -> Self::State;

    /// Restores a snapshot.
    fn restore_state(&mut self, state: &Self::State) -> Result<()>;

    /// Integration timestep in seconds.
    fn timestep(&self) -> f32;
}
