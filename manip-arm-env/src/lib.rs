#![warn(missing_docs)]
//! A goal-conditioned pick-and-lift environment for a 7-DoF arm with a gripper.
//!
//! [`ArmEnv`] implements [`manip_core::Env`] over any [`Backend`]. Two backends are
//! provided and selected by the type parameter of [`ArmEnv`]:
//!
//! * [`SimulatedBackend`] drives a [`PhysicsScene`] through a mocap body. The crate
//!   ships [`KinematicScene`], a deterministic scene without an external engine.
//! * [`HardwareBackend`] drives a physical arm through an arm service and two feeds,
//!   see the [`hardware`] module.
//!
//! ## Step
//!
//! An action ([`ArmAct`]) holds three end-effector displacements in `[-1, 1]`
//! followed by auxiliary components. [`ActuatorCommandMapper`] clamps and scales the
//! displacements and adds the gripper controls of the latched [`GripperState`].
//! After the backend has applied the command, [`ObservationComposer`] lays its state
//! out as an [`ArmObs`] and [`RewardEvaluator`] computes the reward. The gripper is
//! never driven by the policy: it latches closed when the evaluation finds the gripper
//! close to the object.
//!
//! ## Episode
//!
//! [`EpisodeLifecycle`] sets the backend up once, then for every episode restores the
//! start state, places the object, moves the gripper to a jittered home pose and
//! samples the goal. Episodes are truncated after [`ArmEnvConfig::max_steps`].
//!
//! ```no_run
//! use anyhow::Result;
//! use manip_arm_env::{ArmAct, ArmEnv, ArmEnvConfig, KinematicScene, SimulatedBackend};
//! use manip_core::Env;
//!
//! fn main() -> Result<()> {
//!     type E = ArmEnv<SimulatedBackend<KinematicScene>>;
//!     let config = ArmEnvConfig::default().max_steps(Some(20));
//!     let mut env = E::build(&config, 42)?;
//!     let _obs = env.reset(None)?;
//!     let (step, record) = env.step(&ArmAct::from(vec![0.0, 0.0, -1.0, 0.0]))?;
//!     println!("reward = {}, {:?}", step.reward[0], record.get_scalar("object_z"));
//!     Ok(())
//! }
//! ```
mod act;
mod backend;
mod config;
mod env;
mod error;
mod goal;
pub mod hardware;
mod lifecycle;
mod mapper;
mod obs;
mod observer;
mod reward;
pub mod sim;
pub mod types;
pub use act::ArmAct;
pub use backend::{Backend, ObjectState, RawState, References, StateQuery};
pub use config::{ArmEnvConfig, DEFAULT_ARM_JOINT_NAMES};
pub use env::{ArmEnv, ArmInfo};
pub use error::ArmEnvError;
pub use goal::{GoalConfig, GoalSampler};
pub use hardware::{HardwareBackend, HardwareConfig, HardwareLink};
pub use lifecycle::{EpisodeLifecycle, LifecycleState, ResetConfig};
pub use mapper::{ActuatorCommandMapper, ActuatorConfig, ArmCommand};
pub use obs::{ArmObs, ObsLayout};
pub use observer::ObservationComposer;
pub use reward::{Evaluation, RewardConfig, RewardEvaluator, RewardTerms};
pub use sim::{
    KinematicScene, KinematicSceneConfig, PhysicsScene, SimulatedBackend, SimulatedBackendConfig,
};
pub use types::{gripper_down, quat_wxyz, GripperState, JointState, Pose};
