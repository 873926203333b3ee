//! Configuration of [`ArmEnv`](crate::ArmEnv).
use crate::{
    backend::Backend, goal::GoalConfig, lifecycle::ResetConfig, mapper::ActuatorConfig,
    reward::RewardConfig,
};
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::{
    fs::File,
    io::{BufReader, Write},
    path::Path,
};

/// Default arm joints, in the order of the observation vector.
pub const DEFAULT_ARM_JOINT_NAMES: [&str; 6] = [
    "sia_7f_arm_joint1",
    "sia_7f_arm_joint2",
    "sia_7f_arm_joint3",
    "sia_7f_arm_joint4",
    "sia_7f_arm_joint5",
    "sia_7f_arm_gripper",
];

/// Configuration of [`ArmEnv`](crate::ArmEnv).
///
/// The backend is chosen by the type parameter `B`; its configuration is stored in
/// [`ArmEnvConfig::backend`].
#[derive(Serialize, Deserialize, Debug)]
#[serde(bound = "")]
pub struct ArmEnvConfig<B: Backend> {
    /// Length of actions.
    pub n_actions: usize,

    /// Arm joints reported in observations.
    pub arm_joint_names: Vec<String>,

    /// Whether the task has an object to pick.
    pub has_object: bool,

    /// Episodes are truncated after this number of steps.
    pub max_steps: Option<usize>,

    /// Action to command conversion.
    pub actuator: ActuatorConfig,

    /// Reward shaping.
    pub reward: RewardConfig,

    /// Goal sampling and distance-based success.
    pub goal: GoalConfig,

    /// Setup and reset.
    pub reset: ResetConfig,

    /// Backend.
    pub backend: B::Config,
}

impl<B: Backend> Clone for ArmEnvConfig<B> {
    fn clone(&self) -> Self {
        Self {
            n_actions: self.n_actions,
            arm_joint_names: self.arm_joint_names.clone(),
            has_object: self.has_object,
            max_steps: self.max_steps,
            actuator: self.actuator.clone(),
            reward: self.reward.clone(),
            goal: self.goal.clone(),
            reset: self.reset.clone(),
            backend: self.backend.clone(),
        }
    }
}

impl<B: Backend> Default for ArmEnvConfig<B> {
    fn default() -> Self {
        Self {
            n_actions: 4,
            arm_joint_names: DEFAULT_ARM_JOINT_NAMES
                .iter()
                .map(|s| s.to_string())
                .collect(),
            has_object: true,
            max_steps: Some(50),
            actuator: ActuatorConfig::default(),
            reward: RewardConfig::default(),
            goal: GoalConfig::default(),
            reset: ResetConfig::default(),
            backend: B::Config::default(),
        }
    }
}

impl<B: Backend> ArmEnvConfig<B> {
    /// Sets the length of actions.
    pub fn n_actions(mut self, v: usize) -> Self {
        self.n_actions = v;
        self
    }

    /// Sets the arm joints reported in observations.
    pub fn arm_joint_names(mut self, v: Vec<String>) -> Self {
        self.arm_joint_names = v;
        self
    }

    /// Sets whether the task has an object.
    pub fn has_object(mut self, v: bool) -> Self {
        self.has_object = v;
        self
    }

    /// Sets the maximum number of steps in an episode.
    pub fn max_steps(mut self, v: Option<usize>) -> Self {
        self.max_steps = v;
        self
    }

    /// Sets the actuator configuration.
    pub fn actuator(mut self, v: ActuatorConfig) -> Self {
        self.actuator = v;
        self
    }

    /// Sets the reward configuration.
    pub fn reward(mut self, v: RewardConfig) -> Self {
        self.reward = v;
        self
    }

    /// Sets the goal configuration.
    pub fn goal(mut self, v: GoalConfig) -> Self {
        self.goal = v;
        self
    }

    /// Sets the reset configuration.
    pub fn reset(mut self, v: ResetConfig) -> Self {
        self.reset = v;
        self
    }

    /// Sets the backend configuration.
    pub fn backend(mut self, v: B::Config) -> Self {
        self.backend = v;
        self
    }

    /// Constructs [`ArmEnvConfig`] from YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path)?;
        let rdr = BufReader::new(file);
        let b = serde_yaml::from_reader(rdr)?;
        Ok(b)
    }

    /// Saves [`ArmEnvConfig`].
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let mut file = File::create(path)?;
        file.write_all(serde_yaml::to_string(&self)?.as_bytes())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        sim::{KinematicScene, SimulatedBackend},
        HardwareBackend,
    };
    use nalgebra::Vector2;
    use tempdir::TempDir;

    #[test]
    fn serde_sim_config() -> Result<()> {
        let config = ArmEnvConfig::<SimulatedBackend<KinematicScene>>::default()
            .max_steps(Some(20))
            .reward(RewardConfig::default().terminate_on_drop(true))
            .reset(ResetConfig::default().object_center(Some(Vector2::new(1.0, -0.5))));

        let dir = TempDir::new("arm_env_config")?;
        let path = dir.path().join("arm_env_config.yaml");
        config.save(&path)?;
        let config_ = ArmEnvConfig::<SimulatedBackend<KinematicScene>>::load(&path)?;

        assert_eq!(config.max_steps, config_.max_steps);
        assert_eq!(config.reward, config_.reward);
        assert_eq!(config.reset, config_.reset);
        assert_eq!(config.backend, config_.backend);
        assert_eq!(config_.arm_joint_names.len(), 6);
        Ok(())
    }

    #[test]
    fn serde_hardware_config() -> Result<()> {
        let config = ArmEnvConfig::<HardwareBackend>::default().has_object(false);

        let dir = TempDir::new("arm_env_config")?;
        let path = dir.path().join("hardware.yaml");
        config.save(&path)?;
        let config_ = ArmEnvConfig::<HardwareBackend>::load(&path)?;

        assert!(!config_.has_object);
        assert_eq!(
            config.backend.service_timeout_ms,
            config_.backend.service_timeout_ms
        );
        assert!(config_.backend.link.is_none());
        Ok(())
    }
}
