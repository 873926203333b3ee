//! Conversion of abstract actions into backend commands.
use crate::{
    act::ArmAct,
    error::ArmEnvError,
    types::{gripper_down, GripperState},
};
use anyhow::Result;
use nalgebra::{UnitQuaternion, Vector3};
use serde::{Deserialize, Serialize};

/// Configuration of [`ActuatorCommandMapper`].
#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
pub struct ActuatorConfig {
    /// Factor applied to the position slice of the action.
    ///
    /// Bounds the displacement of the end-effector target per step.
    pub pos_scale: f32,

    /// Action components are clamped to `[-action_bound, action_bound]`.
    pub action_bound: f32,

    /// Fixed orientation of the end effector.
    pub rotation: UnitQuaternion<f32>,

    /// Per-actuator controls produced for [`GripperState::Open`].
    ///
    /// [`GripperState::Closed`] produces the negated pattern.
    pub gripper_layout: Vec<f32>,

    /// Number of physical gripper actuators.
    pub n_gripper_actuators: usize,

    /// If `true`, gripper commands are zeroed.
    pub block_gripper: bool,
}

impl Default for ActuatorConfig {
    fn default() -> Self {
        Self {
            pos_scale: 0.03,
            action_bound: 1.0,
            rotation: gripper_down(),
            gripper_layout: vec![-1.0, -1.0, -1.0, 1.0, 1.0, 1.0],
            n_gripper_actuators: 6,
            block_gripper: false,
        }
    }
}

impl ActuatorConfig {
    /// Sets the scale of position deltas.
    pub fn pos_scale(mut self, v: f32) -> Self {
        self.pos_scale = v;
        self
    }

    /// Sets the fixed end-effector orientation.
    pub fn rotation(mut self, v: UnitQuaternion<f32>) -> Self {
        self.rotation = v;
        self
    }

    /// Sets the open-gripper control pattern and the number of gripper actuators.
    pub fn gripper_layout(mut self, layout: Vec<f32>) -> Self {
        self.n_gripper_actuators = layout.len();
        self.gripper_layout = layout;
        self
    }

    /// Blocks the gripper.
    pub fn block_gripper(mut self, v: bool) -> Self {
        self.block_gripper = v;
        self
    }
}

/// A backend independent low-level command.
///
/// The simulated backend feeds `gripper` to the actuators and moves the mocap target
/// by `pos_delta`; the hardware backend sends `pos_delta` as a relative end-effector
/// request and `grip` as an open/close call.
#[derive(Debug, Clone, PartialEq)]
pub struct ArmCommand {
    /// Displacement of the end-effector target.
    pub pos_delta: Vector3<f32>,

    /// Orientation of the end-effector target.
    pub rotation: UnitQuaternion<f32>,

    /// Per-actuator gripper controls.
    pub gripper: Vec<f32>,

    /// Gripper intent, `None` when the gripper is blocked.
    pub grip: Option<GripperState>,
}

/// Converts [`ArmAct`] into [`ArmCommand`].
pub struct ActuatorCommandMapper {
    config: ActuatorConfig,
    n_actions: usize,
}

impl ActuatorCommandMapper {
    /// Builds a mapper for actions of length `n_actions`.
    ///
    /// Fails with [`ArmEnvError::ShapeMismatch`] if the action cannot hold a position
    /// slice.
    pub fn build(config: &ActuatorConfig, n_actions: usize) -> Result<Self> {
        if n_actions < 3 {
            return Err(ArmEnvError::shape("action (position slice)", 3, n_actions).into());
        }
        Ok(Self {
            config: config.clone(),
            n_actions,
        })
    }

    /// Maps an action and the latched gripper state to a command.
    pub fn map(&self, act: &ArmAct, gripper: GripperState) -> Result<ArmCommand> {
        let a = act.as_slice();
        if a.len() != self.n_actions {
            return Err(ArmEnvError::shape("action", self.n_actions, a.len()).into());
        }

        // The auxiliary slice a[3..] does not drive the gripper.
        let bound = self.config.action_bound;
        let pos_delta = Vector3::from_column_slice(&a[..3])
            .map(|v| v.max(-bound).min(bound) * self.config.pos_scale);

        let gripper_ctrl = self.gripper_controls(gripper)?;

        Ok(ArmCommand {
            pos_delta,
            rotation: self.config.rotation,
            gripper: gripper_ctrl,
            grip: match self.config.block_gripper {
                true => None,
                false => Some(gripper),
            },
        })
    }

    /// Expands the abstract gripper signal into per-actuator controls.
    pub fn gripper_controls(&self, gripper: GripperState) -> Result<Vec<f32>> {
        let layout = &self.config.gripper_layout;
        if layout.len() != self.config.n_gripper_actuators {
            return Err(ArmEnvError::shape(
                "gripper controls",
                self.config.n_gripper_actuators,
                layout.len(),
            )
            .into());
        }
        let signal = gripper.signal();
        Ok(layout
            .iter()
            .map(|m| match self.config.block_gripper {
                true => 0.0,
                false => -m * signal,
            })
            .collect())
    }

    /// Returns the configured action length.
    pub fn n_actions(&self) -> usize {
        self.n_actions
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ArmEnvError;

    fn mapper() -> ActuatorCommandMapper {
        ActuatorCommandMapper::build(&ActuatorConfig::default(), 4).unwrap()
    }

    #[test]
    fn bounded_actions_never_fail() {
        let m = mapper();
        for i in 0..200 {
            let x = (i as f32 / 100.0) - 1.0;
            let act = ArmAct::from(vec![x, -x, x * 0.5, 1.0]);
            assert!(m.map(&act, GripperState::Open).is_ok());
        }
    }

    #[test]
    fn displacement_is_clamped_and_scaled() {
        let m = mapper();
        let act = ArmAct::from(vec![5.0, -0.5, 0.0, 0.0]);
        let cmd = m.map(&act, GripperState::Open).unwrap();

        assert_eq!(cmd.pos_delta, Vector3::new(0.03, -0.015, 0.0));
        assert_eq!(cmd.rotation, gripper_down());
        let max_a = 0.5f32;
        let act = ArmAct::from(vec![0.5, -0.25, 0.1, 0.0]);
        let cmd = m.map(&act, GripperState::Open).unwrap();
        assert!(cmd.pos_delta.iter().all(|d| d.abs() <= 0.03 * max_a + 1e-7));
    }

    #[test]
    fn wrong_action_length_is_shape_mismatch() {
        let err = mapper()
            .map(&ArmAct::from(vec![0.0; 3]), GripperState::Open)
            .unwrap_err();
        assert_eq!(
            err.downcast_ref::<ArmEnvError>(),
            Some(&ArmEnvError::shape("action", 4, 3))
        );
    }

    #[test]
    fn gripper_pattern_flips_with_state() {
        let m = mapper();
        let open = m.gripper_controls(GripperState::Open).unwrap();
        let closed = m.gripper_controls(GripperState::Closed).unwrap();

        assert_eq!(open.len(), 6);
        assert_eq!(closed.len(), 6);
        assert_eq!(open, ActuatorConfig::default().gripper_layout);
        assert!(open.iter().zip(closed.iter()).all(|(o, c)| *o == -*c));
    }

    #[test]
    fn blocked_gripper_is_zeroed() {
        let config = ActuatorConfig::default().block_gripper(true);
        let m = ActuatorCommandMapper::build(&config, 4).unwrap();
        let cmd = m
            .map(&ArmAct::from(vec![0.0; 4]), GripperState::Closed)
            .unwrap();

        assert_eq!(cmd.gripper, vec![0.0; 6]);
        assert_eq!(cmd.grip, None);
    }

    #[test]
    fn inconsistent_layout_is_shape_mismatch() {
        let mut config = ActuatorConfig::default();
        config.n_gripper_actuators = 2;
        let m = ActuatorCommandMapper::build(&config, 4).unwrap();
        let err = m
            .map(&ArmAct::from(vec![0.0; 4]), GripperState::Open)
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ArmEnvError>(),
            Some(ArmEnvError::ShapeMismatch { expected: 2, got: 6, .. })
        ));
    }
}
