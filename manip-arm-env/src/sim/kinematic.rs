//! A deterministic kinematic scene.
//!
//! The gripper tracks its mocap target with a first-order lag, the object falls onto
//! a table and sticks to the gripper while the gripper is closed around it. There is
//! no arm kinematics; arm joints keep the positions they were set to.
use super::PhysicsScene;
use crate::{
    error::ArmEnvError,
    types::{quat_wxyz, Pose},
};
use anyhow::Result;
use log::trace;
use nalgebra::{UnitQuaternion, Vector3};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Configuration of [`KinematicScene`].
#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
pub struct KinematicSceneConfig {
    /// Integration timestep.
    pub timestep: f32,

    /// Fraction of the gripper-target error closed per integration step.
    pub tracking_gain: f32,

    /// Gravity acceleration acting on a free object.
    pub gravity: f32,

    /// Height of the object centre when it rests on the table.
    pub table_height: f32,

    /// A closed gripper holds the object within this distance.
    pub grasp_radius: f32,

    /// Initial position of the gripper.
    pub initial_gripper_pos: Vector3<f32>,

    /// Initial position of the object.
    pub initial_object_pos: Vector3<f32>,

    /// Number of actuators.
    pub n_actuators: usize,

    /// Name of the gripper site.
    pub gripper_site: String,

    /// Name of the gripper body.
    pub gripper_body: String,

    /// Name of the mocap body driving the gripper.
    pub mocap: String,

    /// Name of the object site.
    pub object_site: String,

    /// Name of the free joint of the object.
    pub object_joint: String,

    /// Hinge joints of the arm.
    pub arm_joints: Vec<String>,
}

impl Default for KinematicSceneConfig {
    fn default() -> Self {
        Self {
            timestep: 0.002,
            tracking_gain: 0.2,
            gravity: 9.81,
            table_height: 0.7,
            grasp_radius: 0.05,
            initial_gripper_pos: Vector3::new(0.8, 0.0, 0.9),
            initial_object_pos: Vector3::new(1.0, -0.5, 0.7),
            n_actuators: 6,
            gripper_site: "r_grip_site".to_string(),
            gripper_body: "r_gripper_palm_link".to_string(),
            mocap: "gripper_r:mocap".to_string(),
            object_site: "object0".to_string(),
            object_joint: "object0:joint".to_string(),
            arm_joints: crate::config::DEFAULT_ARM_JOINT_NAMES
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

/// Full state of [`KinematicScene`].
#[derive(Debug, Clone, PartialEq)]
pub struct KinematicState {
    time: f32,
    mocap: Pose,
    gripper: Pose,
    gripper_vel: Vector3<f32>,
    object_pos: Vector3<f32>,
    object_quat: UnitQuaternion<f32>,
    object_vel: Vector3<f32>,
    attached: bool,
    ctrl: Vec<f32>,
    joints: HashMap<String, (f32, f32)>,
}

/// A physics scene without an external engine, for demos and tests.
pub struct KinematicScene {
    config: KinematicSceneConfig,
    state: KinematicState,
}

impl KinematicScene {
    fn unknown(name: &str) -> anyhow::Error {
        ArmEnvError::UnknownName(name.to_string()).into()
    }

    /// Whether the object is held by the gripper.
    pub fn is_attached(&self) -> bool {
        self.state.attached
    }

    /// Simulated time in seconds.
    pub fn time(&self) -> f32 {
        self.state.time
    }

    fn is_closed(&self) -> bool {
        self.state.ctrl.first().map(|c| *c > 0.0).unwrap_or(false)
    }

    fn integrate(&mut self) {
        let dt = self.config.timestep;
        let closed = self.is_closed();
        let s = &mut self.state;

        let delta = (s.mocap.position - s.gripper.position) * self.config.tracking_gain;
        s.gripper.position += delta;
        s.gripper.orientation = s.mocap.orientation;
        s.gripper_vel = delta / dt;

        if !closed {
            s.attached = false;
        } else if !s.attached
            && (s.gripper.position - s.object_pos).norm() < self.config.grasp_radius
        {
            s.attached = true;
        }

        if s.attached {
            s.object_pos = s.gripper.position;
            s.object_vel = s.gripper_vel;
        } else {
            s.object_vel.x = 0.0;
            s.object_vel.y = 0.0;
            s.object_vel.z -= self.config.gravity * dt;
            s.object_pos.z += s.object_vel.z * dt;
            if s.object_pos.z <= self.config.table_height {
                s.object_pos.z = self.config.table_height;
                s.object_vel.z = 0.0;
            }
        }

        s.time += dt;
    }
}

impl PhysicsScene for KinematicScene {
    type Config = KinematicSceneConfig;
    type State = KinematicState;

    fn load(config: &Self::Config) -> Result<Self> {
        let joints = config
            .arm_joints
            .iter()
            .map(|name| (name.clone(), (0.0, 0.0)))
            .collect();
        let gripper = Pose::from_position(config.initial_gripper_pos);

        Ok(Self {
            config: config.clone(),
            state: KinematicState {
                time: 0.0,
                mocap: gripper,
                gripper,
                gripper_vel: Vector3::zeros(),
                object_pos: config.initial_object_pos,
                object_quat: UnitQuaternion::identity(),
                object_vel: Vector3::zeros(),
                attached: false,
                ctrl: vec![0.0; config.n_actuators],
                joints,
            },
        })
    }

    fn body_pose(&self, name: &str) -> Result<Pose> {
        if name == self.config.gripper_body {
            Ok(self.state.gripper)
        } else {
            Err(Self::unknown(name))
        }
    }

    fn site_pose(&self, name: &str) -> Result<Pose> {
        if name == self.config.gripper_site {
            Ok(self.state.gripper)
        } else if name == self.config.object_site {
            Ok(Pose::new(self.state.object_pos, self.state.object_quat))
        } else {
            Err(Self::unknown(name))
        }
    }

    fn site_velocity(&self, name: &str) -> Result<(Vector3<f32>, Vector3<f32>)> {
        if name == self.config.gripper_site {
            Ok((self.state.gripper_vel, Vector3::zeros()))
        } else if name == self.config.object_site {
            Ok((self.state.object_vel, Vector3::zeros()))
        } else {
            Err(Self::unknown(name))
        }
    }

    fn joint_qpos(&self, name: &str) -> Result<Vec<f32>> {
        if name == self.config.object_joint {
            let p = self.state.object_pos;
            let q = self.state.object_quat;
            return Ok(vec![p.x, p.y, p.z, q.w, q.i, q.j, q.k]);
        }
        match self.state.joints.get(name) {
            Some((qpos, _)) => Ok(vec![*qpos]),
            None => Err(Self::unknown(name)),
        }
    }

    fn set_joint_qpos(&mut self, name: &str, qpos: &[f32]) -> Result<()> {
        if name == self.config.object_joint {
            if qpos.len() != 7 {
                return Err(ArmEnvError::shape(name, 7, qpos.len()).into());
            }
            self.state.object_pos = Vector3::new(qpos[0], qpos[1], qpos[2]);
            self.state.object_quat = quat_wxyz(qpos[3], qpos[4], qpos[5], qpos[6]);
            self.state.object_vel = Vector3::zeros();
            self.state.attached = false;
            return Ok(());
        }
        match (self.state.joints.get_mut(name), qpos.first()) {
            (Some(joint), Some(v)) if qpos.len() == 1 => {
                *joint = (*v, 0.0);
                Ok(())
            }
            (Some(_), _) => Err(ArmEnvError::shape(name, 1, qpos.len()).into()),
            (None, _) => Err(Self::unknown(name)),
        }
    }

    fn joint_qvel(&self, name: &str) -> Result<Vec<f32>> {
        if name == self.config.object_joint {
            let v = self.state.object_vel;
            return Ok(vec![v.x, v.y, v.z, 0.0, 0.0, 0.0]);
        }
        match self.state.joints.get(name) {
            Some((_, qvel)) => Ok(vec![*qvel]),
            None => Err(Self::unknown(name)),
        }
    }

    fn set_mocap_pose(&mut self, name: &str, pose: &Pose) -> Result<()> {
        if name != self.config.mocap {
            return Err(Self::unknown(name));
        }
        self.state.mocap = *pose;
        Ok(())
    }

    fn set_actuator_controls(&mut self, ctrl: &[f32]) -> Result<()> {
        if ctrl.len() != self.config.n_actuators {
            let n = self.config.n_actuators;
            return Err(ArmEnvError::shape("actuator controls", n, ctrl.len()).into());
        }
        self.state.ctrl = ctrl.to_vec();
        Ok(())
    }

    fn step(&mut self, n: usize) -> Result<()> {
        for _ in 0..n {
            self.integrate();
        }
        trace!(
            "t = {}, gripper = {:?}, object = {:?}, closed = {}",
            self.state.time,
            self.state.gripper.position,
            self.state.object_pos,
            self.is_closed()
        );
        Ok(())
    }

    fn forward(&mut self) -> Result<()> {
        if self.state.attached {
            self.state.object_pos = self.state.gripper.position;
        }
        Ok(())
    }

    fn save_state(&self) -> Self::State {
        self.state.clone()
    }

    fn restore_state(&mut self, state: &Self::State) -> Result<()> {
        self.state = state.clone();
        Ok(())
    }

    fn timestep(&self) -> f32 {
        self.config.timestep
    }
}
