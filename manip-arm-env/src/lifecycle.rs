//! Episode setup, reset and goal sampling.
use crate::{
    backend::{Backend, References, StateQuery},
    error::ArmEnvError,
    goal::{uniform, GoalSampler},
    types::{gripper_down, Pose},
};
use anyhow::Result;
use log::{debug, info, warn};
use nalgebra::{UnitQuaternion, Vector2, Vector3};
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Configuration of resets.
#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
pub struct ResetConfig {
    /// End-effector target at setup, and the centre of the reset jitter.
    pub gripper_home: Vector3<f32>,

    /// End-effector orientation at setup and reset.
    pub gripper_rotation: UnitQuaternion<f32>,

    /// Lower bound of the per-axis jitter added to `gripper_home` at reset.
    pub jitter_low: Vector3<f32>,

    /// Upper bound of the per-axis jitter added to `gripper_home` at reset.
    pub jitter_high: Vector3<f32>,

    /// Control steps run after the gripper target is set.
    pub settle_steps: usize,

    /// Half width of the uniform object placement per axis.
    pub obj_range: f32,

    /// Centre of object placement. The reference gripper position if `None`.
    pub object_center: Option<Vector2<f32>>,

    /// Minimum horizontal distance between the object and the reference gripper.
    pub min_object_distance: f32,

    /// Maximum number of placement draws.
    pub max_placement_attempts: usize,

    /// Height at which the object is placed.
    pub object_spawn_height: f32,
}

impl Default for ResetConfig {
    fn default() -> Self {
        Self {
            gripper_home: Vector3::new(0.80326763, 0.01372008, 0.7910795),
            gripper_rotation: gripper_down(),
            jitter_low: Vector3::new(0.0, -0.1, -0.1),
            jitter_high: Vector3::new(0.1, 0.1, 0.1),
            settle_steps: 10,
            obj_range: 0.1,
            object_center: None,
            min_object_distance: 0.1,
            max_placement_attempts: 100,
            object_spawn_height: 0.9,
        }
    }
}

impl ResetConfig {
    /// Sets the home position of the end effector.
    pub fn gripper_home(mut self, v: Vector3<f32>) -> Self {
        self.gripper_home = v;
        self
    }

    /// Sets the per-axis jitter of the end-effector target.
    pub fn jitter(mut self, low: Vector3<f32>, high: Vector3<f32>) -> Self {
        self.jitter_low = low;
        self.jitter_high = high;
        self
    }

    /// Sets the object placement range and the minimum distance to the gripper.
    pub fn placement(mut self, obj_range: f32, min_object_distance: f32) -> Self {
        self.obj_range = obj_range;
        self.min_object_distance = min_object_distance;
        self
    }

    /// Sets a fixed centre of object placement.
    pub fn object_center(mut self, v: Option<Vector2<f32>>) -> Self {
        self.object_center = v;
        self
    }

    /// Sets the cap of placement draws.
    pub fn max_placement_attempts(mut self, v: usize) -> Self {
        self.max_placement_attempts = v;
        self
    }
}

/// States of [`EpisodeLifecycle`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    /// The backend has not been set up.
    Uninitialized,

    /// Set up, no episode started yet.
    Ready,

    /// Reset done, goal sampled, no step taken yet.
    Reset,

    /// Steps are being taken.
    Running,
}

/// Orchestrates setup, reset and goal sampling of episodes.
pub struct EpisodeLifecycle {
    config: ResetConfig,
    sampler: GoalSampler,
    query: StateQuery,
    state: LifecycleState,
    setup_refs: Option<References>,
    refs: Option<References>,
}

impl EpisodeLifecycle {
    /// Constructs the lifecycle manager in [`LifecycleState::Uninitialized`].
    pub fn new(config: &ResetConfig, sampler: GoalSampler, query: StateQuery) -> Self {
        Self {
            config: config.clone(),
            sampler,
            query,
            state: LifecycleState::Uninitialized,
            setup_refs: None,
            refs: None,
        }
    }

    /// The current state.
    pub fn state(&self) -> LifecycleState {
        self.state
    }

    /// Reference frames of the last setup or reset.
    pub fn references(&self) -> Option<&References> {
        self.refs.as_ref()
    }

    /// The goal sampler.
    pub fn sampler(&self) -> &GoalSampler {
        &self.sampler
    }

    fn home_pose(&self, position: Vector3<f32>) -> Pose {
        Pose::new(position, self.config.gripper_rotation)
    }

    /// Brings the backend up and moves the end effector home.
    ///
    /// Idempotent once the lifecycle is past [`LifecycleState::Uninitialized`].
    pub fn setup<B: Backend>(&mut self, backend: &mut B) -> Result<()> {
        if self.state != LifecycleState::Uninitialized {
            return Ok(());
        }
        info!("Set up backend");
        backend.setup(&self.query)?;
        backend.set_gripper_target(&self.home_pose(self.config.gripper_home))?;
        backend.settle(self.config.settle_steps)?;
        backend.checkpoint()?;
        let refs = self.capture(backend)?;
        self.setup_refs = Some(refs);
        self.refs = Some(refs);
        self.state = LifecycleState::Ready;
        Ok(())
    }

    /// Resets the backend for a new episode and returns the new reference frames.
    ///
    /// The object is placed relative to the gripper position captured at setup.
    /// The lifecycle falls back to [`LifecycleState::Ready`] before any backend work,
    /// so a failed reset leaves no episode to step.
    pub fn reset<B: Backend, R: Rng>(
        &mut self,
        backend: &mut B,
        rng: &mut R,
    ) -> Result<References> {
        let setup_refs = match (self.state, self.setup_refs) {
            (LifecycleState::Uninitialized, _) | (_, None) => {
                return Err(ArmEnvError::NotReady("reset before setup".into()).into())
            }
            (_, Some(refs)) => refs,
        };
        self.state = LifecycleState::Ready;

        backend.restore()?;

        if self.query.has_object {
            let xy = self.place_object(rng, &setup_refs)?;
            debug!("object placed at {:?}", xy);
            backend.place_object(xy, self.config.object_spawn_height)?;
        }

        let c = &self.config;
        let jitter = Vector3::from_fn(|i, _| uniform(rng, c.jitter_low[i], c.jitter_high[i]));
        let target = c.gripper_home + jitter;
        backend.set_gripper_target(&self.home_pose(target))?;
        backend.settle(c.settle_steps)?;

        let refs = self.capture(backend)?;
        self.refs = Some(refs);
        self.state = LifecycleState::Reset;
        Ok(refs)
    }

    /// Draws an object position at least `min_object_distance` away from the
    /// reference gripper position.
    pub fn place_object<R: Rng>(&self, rng: &mut R, refs: &References) -> Result<Vector2<f32>> {
        let c = &self.config;
        let grip = refs.gripper_pos.xy();
        let center = c.object_center.unwrap_or(grip);

        for attempt in 0..c.max_placement_attempts {
            let xy = center
                + Vector2::from_fn(|_, _| uniform(rng, -c.obj_range, c.obj_range));
            if (xy - grip).norm() >= c.min_object_distance {
                return Ok(xy);
            }
            if attempt > 0 && attempt % 50 == 0 {
                warn!("object placement still retrying after {} draws", attempt);
            }
        }

        Err(ArmEnvError::GoalSamplingFailed {
            attempts: c.max_placement_attempts,
        }
        .into())
    }

    /// Samples the goal of the episode started by the last reset.
    pub fn sample_goal<R: Rng>(&self, rng: &mut R) -> Result<Vector3<f32>> {
        match (self.state, self.refs.as_ref()) {
            (LifecycleState::Reset, Some(refs)) => Ok(self.sampler.sample(rng, refs)),
            _ => Err(ArmEnvError::NotReady("goal sampled outside of reset".into()).into()),
        }
    }

    /// Marks the episode as running.
    pub fn start_step(&mut self) -> Result<()> {
        match self.state {
            LifecycleState::Reset | LifecycleState::Running => {
                self.state = LifecycleState::Running;
                Ok(())
            }
            s => Err(ArmEnvError::NotReady(format!("step in state {:?}", s)).into()),
        }
    }

    fn capture<B: Backend>(&self, backend: &B) -> Result<References> {
        let state = backend.read_state(&self.query)?;
        Ok(References {
            gripper_pos: state.grip_pos,
            height_offset: state.object.map(|o| o.pos.z),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::goal::GoalConfig;
    use rand::{rngs::StdRng, SeedableRng};

    fn lifecycle(config: ResetConfig) -> EpisodeLifecycle {
        EpisodeLifecycle::new(
            &config,
            GoalSampler::new(&GoalConfig::default()),
            StateQuery {
                joint_names: vec![],
                has_object: true,
            },
        )
    }

    fn refs() -> References {
        References {
            gripper_pos: Vector3::new(0.8, 0.0, 0.8),
            height_offset: Some(0.7),
        }
    }

    #[test]
    fn placement_keeps_minimum_distance() {
        let lc = lifecycle(ResetConfig::default());
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..500 {
            let xy = lc.place_object(&mut rng, &refs()).unwrap();
            assert!((xy - Vector2::new(0.8, 0.0)).norm() >= 0.1);
            assert!((xy[0] - 0.8).abs() <= 0.1 + 1e-6 && xy[1].abs() <= 0.1 + 1e-6);
        }
    }

    #[test]
    fn impossible_placement_fails() {
        let lc = lifecycle(ResetConfig::default().placement(0.05, 0.2).max_placement_attempts(20));
        let mut rng = StdRng::seed_from_u64(3);
        let err = lc.place_object(&mut rng, &refs()).unwrap_err();
        assert_eq!(
            err.downcast_ref::<ArmEnvError>(),
            Some(&ArmEnvError::GoalSamplingFailed { attempts: 20 })
        );
    }

    #[test]
    fn fixed_center_is_honoured() {
        let config = ResetConfig::default()
            .object_center(Some(Vector2::new(1.0, -0.5)))
            .placement(0.02, 0.1);
        let lc = lifecycle(config);
        let mut rng = StdRng::seed_from_u64(5);
        let xy = lc.place_object(&mut rng, &refs()).unwrap();
        assert!((xy[0] - 1.0).abs() <= 0.02 + 1e-6 && (xy[1] + 0.5).abs() <= 0.02 + 1e-6);
    }

    #[test]
    fn goal_before_reset_is_not_ready() {
        let lc = lifecycle(ResetConfig::default());
        let mut rng = StdRng::seed_from_u64(0);
        assert!(lc.sample_goal(&mut rng).is_err());
        assert_eq!(lc.state(), LifecycleState::Uninitialized);
    }
}
