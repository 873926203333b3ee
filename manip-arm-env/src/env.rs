//! Goal-conditioned pick-and-lift environment.
use crate::{
    act::ArmAct,
    backend::{Backend, RawState},
    config::ArmEnvConfig,
    goal::GoalSampler,
    lifecycle::{EpisodeLifecycle, LifecycleState},
    mapper::ActuatorCommandMapper,
    obs::ArmObs,
    observer::ObservationComposer,
    reward::{Evaluation, RewardEvaluator},
    types::GripperState,
};
use anyhow::Result;
use log::{info, trace};
use manip_core::{
    record::{Record, RecordValue},
    Env, Info, Step,
};
use nalgebra::Vector3;
use rand::{rngs::StdRng, SeedableRng};

/// Information given at every step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ArmInfo {
    /// `1.0` when the object is held above the success height, else `0.0`.
    ///
    /// The flag the next observation carries.
    pub is_success: f32,

    /// `1.0` when the achieved goal is within the distance threshold of the goal.
    pub goal_reached: f32,

    /// Whether any step of the episode so far reported `is_success`.
    pub episode_success: bool,
}

impl Info for ArmInfo {
    fn is_success(&self) -> Option<bool> {
        Some(self.is_success > 0.5)
    }
}

/// Pick-and-lift environment over a [`Backend`].
///
/// A step maps the action to a command with the latched gripper state, applies it,
/// observes the backend, evaluates the reward and then updates the gripper latch and
/// the success flag for the next step.
pub struct ArmEnv<B: Backend> {
    backend: B,
    mapper: ActuatorCommandMapper,
    composer: ObservationComposer,
    reward: RewardEvaluator,
    lifecycle: EpisodeLifecycle,
    rng: StdRng,
    goal: Vector3<f32>,
    gripper: GripperState,
    success: f32,
    episode_success: bool,
    count_steps: usize,
    max_steps: Option<usize>,
}

impl<B: Backend> ArmEnv<B> {
    /// The backend.
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// The backend, mutably.
    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    /// Goal of the current episode.
    pub fn goal(&self) -> Vector3<f32> {
        self.goal
    }

    /// Latched gripper state applied by the next step.
    pub fn gripper_state(&self) -> GripperState {
        self.gripper
    }

    /// State of the episode lifecycle.
    pub fn lifecycle_state(&self) -> LifecycleState {
        self.lifecycle.state()
    }

    /// Number of steps taken in the current episode.
    pub fn count_steps(&self) -> usize {
        self.count_steps
    }

    /// Observes the backend without changing it.
    pub fn observe(&self) -> Result<ArmObs> {
        let (obs, _) = self.composer.observe(&self.backend, self.success, &self.goal)?;
        Ok(obs)
    }

    fn reset_episode(&mut self) -> Result<ArmObs> {
        self.gripper = GripperState::Open;
        self.success = 0.0;
        self.episode_success = false;
        self.count_steps = 0;
        let refs = self.lifecycle.reset(&mut self.backend, &mut self.rng)?;
        self.goal = self.lifecycle.sample_goal(&mut self.rng)?;
        info!(
            "Reset: gripper at {:?}, goal at {:?}",
            refs.gripper_pos, self.goal
        );
        self.observe()
    }

    fn step_record(
        &self,
        obs: &ArmObs,
        raw: &RawState,
        eval: &Evaluation,
        goal_reached: f32,
    ) -> Record {
        let array = |v: &Vector3<f32>| RecordValue::Array1(v.as_slice().to_vec());
        let mut record = eval.record();
        record.insert("grip_pos", array(&obs.grip_pos()));
        record.insert("goal", array(&self.goal));
        record.insert("goal_reached", RecordValue::Scalar(goal_reached));
        record.insert(
            "gripper_closed",
            RecordValue::Scalar((eval.gripper == GripperState::Closed) as i32 as f32),
        );
        if let Some(object) = raw.object.as_ref() {
            record.insert("object_z", RecordValue::Scalar(object.pos.z));
            record.insert("object_rot", array(&object.rot));
            record.insert("object_velp", array(&object.velp));
            record.insert("object_velr", array(&object.velr));
        }
        record
    }
}

impl<B: Backend> Env for ArmEnv<B> {
    type Config = ArmEnvConfig<B>;
    type Obs = ArmObs;
    type Act = ArmAct;
    type Info = ArmInfo;

    /// Builds the backend and sets it up.
    fn build(config: &Self::Config, seed: i64) -> Result<Self> {
        let mut backend = B::build(&config.backend)?;
        let mapper = ActuatorCommandMapper::build(&config.actuator, config.n_actions)?;
        let composer = ObservationComposer::new(config.arm_joint_names.clone(), config.has_object);
        let reward = RewardEvaluator::new(&config.reward, config.has_object);
        let mut lifecycle = EpisodeLifecycle::new(
            &config.reset,
            GoalSampler::new(&config.goal),
            composer.query().clone(),
        );
        lifecycle.setup(&mut backend)?;

        Ok(Self {
            backend,
            mapper,
            composer,
            reward,
            lifecycle,
            rng: StdRng::seed_from_u64(seed as u64),
            goal: Vector3::zeros(),
            gripper: GripperState::Open,
            success: 0.0,
            episode_success: false,
            count_steps: 0,
            max_steps: config.max_steps,
        })
    }

    fn step(&mut self, act: &ArmAct) -> Result<(Step<Self>, Record)> {
        trace!("ArmEnv::step()");
        self.lifecycle.start_step()?;

        let cmd = self.mapper.map(act, self.gripper)?;
        self.backend.apply(&cmd)?;

        // The observation carries the success flag of the previous evaluation.
        let (obs, raw) = self.composer.observe(&self.backend, self.success, &self.goal)?;
        let eval = self.reward.evaluate(act, &self.goal, &obs);
        self.gripper = eval.gripper;
        self.success = eval.is_success;
        self.episode_success |= eval.is_success > 0.5;

        let goal_reached = self
            .lifecycle
            .sampler()
            .is_success(&obs.achieved_goal, &self.goal);

        self.count_steps += 1;
        let is_truncated = match self.max_steps {
            Some(max_steps) => self.count_steps >= max_steps,
            None => false,
        };

        let record = self.step_record(&obs, &raw, &eval, goal_reached);
        let info = ArmInfo {
            is_success: eval.is_success,
            goal_reached,
            episode_success: self.episode_success,
        };
        let step = Step::new(
            obs.clone(),
            act.clone(),
            vec![eval.reward],
            vec![eval.done as i8],
            vec![is_truncated as i8],
            info,
            obs,
        );
        Ok((step, record))
    }

    /// Starts a new episode if `is_done` is `None` or `is_done[0] == 1`, otherwise
    /// returns the current observation.
    fn reset(&mut self, is_done: Option<&Vec<i8>>) -> Result<ArmObs> {
        match is_done {
            Some(v) if v.first() != Some(&1) => self.observe(),
            _ => self.reset_episode(),
        }
    }

    /// Reseeds the environment with `ix` and starts a new episode.
    fn reset_with_index(&mut self, ix: usize) -> Result<ArmObs> {
        self.rng = StdRng::seed_from_u64(ix as u64);
        self.reset_episode()
    }
}
