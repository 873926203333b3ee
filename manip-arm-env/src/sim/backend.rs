//! Backend driving a physics scene.
use super::PhysicsScene;
use crate::{
    backend::{Backend, ObjectState, RawState, StateQuery},
    error::ArmEnvError,
    mapper::ArmCommand,
    types::Pose,
};
use anyhow::Result;
use log::{info, trace};
use nalgebra::Vector2;
use serde::{Deserialize, Serialize};

/// Configuration of [`SimulatedBackend`].
#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
pub struct SimulatedBackendConfig<C> {
    /// Configuration of the scene.
    pub scene: C,

    /// Site whose position is the gripper position.
    pub gripper_site: String,

    /// Body from which position deltas are applied.
    pub gripper_body: String,

    /// Mocap body driving the end effector.
    pub mocap: String,

    /// Site whose position is the object position.
    pub object_site: String,

    /// Free joint of the object.
    pub object_joint: String,

    /// Integration steps per control step.
    pub n_substeps: usize,

    /// Joint positions applied at setup.
    pub initial_qpos: Vec<(String, Vec<f32>)>,
}

impl<C: Default> Default for SimulatedBackendConfig<C> {
    fn default() -> Self {
        Self {
            scene: C::default(),
            gripper_site: "r_grip_site".to_string(),
            gripper_body: "r_gripper_palm_link".to_string(),
            mocap: "gripper_r:mocap".to_string(),
            object_site: "object0".to_string(),
            object_joint: "object0:joint".to_string(),
            n_substeps: 20,
            initial_qpos: vec![],
        }
    }
}

impl<C> SimulatedBackendConfig<C> {
    /// Sets the configuration of the scene.
    pub fn scene(mut self, v: C) -> Self {
        self.scene = v;
        self
    }

    /// Sets the number of integration steps per control step.
    pub fn n_substeps(mut self, v: usize) -> Self {
        self.n_substeps = v;
        self
    }

    /// Sets the joint positions applied at setup.
    pub fn initial_qpos(mut self, v: Vec<(String, Vec<f32>)>) -> Self {
        self.initial_qpos = v;
        self
    }
}

/// A [`Backend`] over a [`PhysicsScene`].
///
/// The end effector is driven through a mocap body; gripper commands go to the
/// actuators directly. Velocities are reported as displacements over one control step.
pub struct SimulatedBackend<S: PhysicsScene> {
    config: SimulatedBackendConfig<S::Config>,
    scene: S,
    checkpoint: Option<S::State>,
}

impl<S: PhysicsScene> SimulatedBackend<S> {
    /// The scene.
    pub fn scene(&self) -> &S {
        &self.scene
    }

    /// Duration of a control step.
    fn dt(&self) -> f32 {
        self.config.n_substeps as f32 * self.scene.timestep()
    }

    fn first(name: &str, values: Vec<f32>) -> Result<f32> {
        values
            .first()
            .copied()
            .ok_or_else(|| ArmEnvError::shape(name, 1, 0).into())
    }
}

impl<S: PhysicsScene> Backend for SimulatedBackend<S> {
    type Config = SimulatedBackendConfig<S::Config>;

    fn build(config: &Self::Config) -> Result<Self> {
        let scene = S::load(&config.scene)?;
        Ok(Self {
            config: config.clone(),
            scene,
            checkpoint: None,
        })
    }

    fn setup(&mut self, query: &StateQuery) -> Result<()> {
        for (name, qpos) in self.config.initial_qpos.iter() {
            self.scene.set_joint_qpos(name, qpos)?;
        }
        self.scene.forward()?;

        // Resolve every name once so that misconfigurations fail here.
        self.scene.site_pose(&self.config.gripper_site)?;
        self.scene.body_pose(&self.config.gripper_body)?;
        for name in query.joint_names.iter() {
            self.scene.joint_qpos(name)?;
        }
        if query.has_object {
            self.scene.site_pose(&self.config.object_site)?;
            self.scene.joint_qpos(&self.config.object_joint)?;
        }
        info!(
            "Simulated backend ready, dt = {}, {} joints",
            self.dt(),
            query.joint_names.len()
        );
        Ok(())
    }

    fn checkpoint(&mut self) -> Result<()> {
        self.checkpoint = Some(self.scene.save_state());
        Ok(())
    }

    fn restore(&mut self) -> Result<()> {
        match self.checkpoint.as_ref() {
            Some(state) => {
                self.scene.restore_state(state)?;
                self.scene.forward()
            }
            None => Err(ArmEnvError::NotReady("no checkpoint to restore".into()).into()),
        }
    }

    fn place_object(&mut self, xy: Vector2<f32>, z: f32) -> Result<()> {
        let name = &self.config.object_joint;
        let mut qpos = self.scene.joint_qpos(name)?;
        if qpos.len() != 7 {
            return Err(ArmEnvError::shape(name.as_str(), 7, qpos.len()).into());
        }
        qpos[0] = xy.x;
        qpos[1] = xy.y;
        qpos[2] = z;
        self.scene.set_joint_qpos(name, &qpos)?;
        self.scene.forward()
    }

    fn set_gripper_target(&mut self, pose: &Pose) -> Result<()> {
        self.scene.set_mocap_pose(&self.config.mocap, pose)
    }

    fn settle(&mut self, n_steps: usize) -> Result<()> {
        self.scene.step(n_steps * self.config.n_substeps)?;
        self.scene.forward()
    }

    fn apply(&mut self, cmd: &ArmCommand) -> Result<()> {
        self.scene.set_actuator_controls(&cmd.gripper)?;
        let body = self.scene.body_pose(&self.config.gripper_body)?;
        let target = Pose::new(body.position + cmd.pos_delta, cmd.rotation);
        trace!("mocap target: {:?}", target);
        self.scene.set_mocap_pose(&self.config.mocap, &target)?;
        self.scene.step(self.config.n_substeps)
    }

    fn read_state(&self, query: &StateQuery) -> Result<RawState> {
        let dt = self.dt();
        let grip_pos = self.scene.site_pose(&self.config.gripper_site)?.position;
        let grip_velp = self.scene.site_velocity(&self.config.gripper_site)?.0 * dt;

        let object = match query.has_object {
            true => {
                let pose = self.scene.site_pose(&self.config.object_site)?;
                let (velp, velr) = self.scene.site_velocity(&self.config.object_site)?;
                Some(ObjectState {
                    pos: pose.position,
                    rot: pose.euler(),
                    velp: velp * dt - grip_velp,
                    velr: velr * dt,
                })
            }
            false => None,
        };

        let mut joint_pos = Vec::with_capacity(query.joint_names.len());
        let mut joint_vel = Vec::with_capacity(query.joint_names.len());
        for name in query.joint_names.iter() {
            joint_pos.push(Self::first(name, self.scene.joint_qpos(name)?)?);
            joint_vel.push(Self::first(name, self.scene.joint_qvel(name)?)?);
        }

        Ok(RawState {
            grip_pos,
            grip_velp,
            object,
            joint_pos,
            joint_vel,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        sim::{KinematicScene, KinematicSceneConfig},
        types::{gripper_down, GripperState},
    };
    use nalgebra::Vector3;

    type Sim = SimulatedBackend<KinematicScene>;

    fn query(has_object: bool) -> StateQuery {
        StateQuery {
            joint_names: vec!["sia_7f_arm_joint1".into(), "sia_7f_arm_joint2".into()],
            has_object,
        }
    }

    fn command(x: f32, y: f32, z: f32) -> ArmCommand {
        ArmCommand {
            pos_delta: Vector3::new(x, y, z),
            rotation: gripper_down(),
            gripper: vec![-1.0, -1.0, -1.0, 1.0, 1.0, 1.0],
            grip: Some(GripperState::Open),
        }
    }

    #[test]
    fn initial_qpos_is_applied() -> Result<()> {
        let config = SimulatedBackendConfig::<KinematicSceneConfig>::default()
            .initial_qpos(vec![("sia_7f_arm_joint2".into(), vec![0.4])]);
        let mut b = Sim::build(&config)?;
        b.setup(&query(true))?;
        let state = b.read_state(&query(true))?;
        assert_eq!(state.joint_pos, vec![0.0, 0.4]);
        assert_eq!(state.joint_vel, vec![0.0, 0.0]);
        Ok(())
    }

    #[test]
    fn unknown_joint_fails_setup() -> Result<()> {
        let mut b = Sim::build(&SimulatedBackendConfig::default())?;
        let q = StateQuery {
            joint_names: vec!["elbow".into()],
            has_object: false,
        };
        let err = b.setup(&q).unwrap_err();
        assert_eq!(
            err.downcast_ref::<ArmEnvError>(),
            Some(&ArmEnvError::UnknownName("elbow".into()))
        );
        Ok(())
    }

    #[test]
    fn apply_moves_gripper_by_delta() -> Result<()> {
        let mut b = Sim::build(&SimulatedBackendConfig::default())?;
        b.setup(&query(false))?;
        let before = b.read_state(&query(false))?.grip_pos;
        b.apply(&command(0.03, 0.0, -0.03))?;
        b.settle(5)?;
        let after = b.read_state(&query(false))?.grip_pos;
        assert!((after - before - Vector3::new(0.03, 0.0, -0.03)).norm() < 1e-4);
        Ok(())
    }

    #[test]
    fn restore_without_checkpoint_is_not_ready() -> Result<()> {
        let mut b = Sim::build(&SimulatedBackendConfig::default())?;
        assert!(b.restore().is_err());
        b.checkpoint()?;
        b.place_object(Vector2::new(1.1, -0.4), 0.9)?;
        b.restore()?;
        let object = b.read_state(&query(true))?.object.unwrap();
        assert_eq!(object.pos, Vector3::new(1.0, -0.5, 0.7));
        Ok(())
    }

    #[test]
    fn read_state_is_side_effect_free() -> Result<()> {
        let mut b = Sim::build(&SimulatedBackendConfig::default())?;
        b.setup(&query(true))?;
        b.apply(&command(0.01, 0.01, 0.0))?;
        assert_eq!(b.read_state(&query(true))?, b.read_state(&query(true))?);
        Ok(())
    }
}
