//! Reach-and-lift reward shaping.
use crate::{
    act::ArmAct,
    obs::ArmObs,
    types::GripperState,
};
use log::debug;
use nalgebra::Vector3;
use manip_core::record::{Record, RecordValue};
use serde::{Deserialize, Serialize};

/// Configuration of [`RewardEvaluator`].
#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
pub struct RewardConfig {
    /// Weight of the quadratic control penalty.
    pub w_ctrl: f32,

    /// The gripper latches closed below this gripper-object distance.
    pub close_threshold: f32,

    /// Below this gripper-object distance the lift bonuses are unlocked.
    pub grasp_threshold: f32,

    /// Object height above which the object counts as lifted.
    pub lift_height: f32,

    /// Bonus for a lifted object.
    pub lift_bonus: f32,

    /// Object height above which the task is solved.
    pub success_height: f32,

    /// Bonus for a solved task, added on top of `lift_bonus`.
    pub success_bonus: f32,

    /// Weight of the negative object-goal distance. Zero disables the term.
    pub w_dist_target: f32,

    /// Bonus when the object is within `target_threshold` of the goal. Zero disables it.
    pub target_bonus: f32,

    /// Distance to the goal for `target_bonus` and for success of tasks without object.
    pub target_threshold: f32,

    /// Object height below which the object counts as dropped.
    pub drop_height: f32,

    /// Penalty for a dropped object.
    pub drop_penalty: f32,

    /// Terminates the episode when the object is dropped.
    pub terminate_on_drop: bool,
}

impl Default for RewardConfig {
    fn default() -> Self {
        Self {
            w_ctrl: 0.01,
            close_threshold: 0.1,
            grasp_threshold: 0.05,
            lift_height: 0.75,
            lift_bonus: 10.0,
            success_height: 0.8,
            success_bonus: 100.0,
            w_dist_target: 0.0,
            target_bonus: 0.0,
            target_threshold: 0.05,
            drop_height: 0.1,
            drop_penalty: 10.0,
            terminate_on_drop: false,
        }
    }
}

impl RewardConfig {
    /// Sets the weight of the control penalty.
    pub fn w_ctrl(mut self, v: f32) -> Self {
        self.w_ctrl = v;
        self
    }

    /// Enables the object-goal distance terms.
    pub fn target_terms(mut self, w_dist_target: f32, target_bonus: f32) -> Self {
        self.w_dist_target = w_dist_target;
        self.target_bonus = target_bonus;
        self
    }

    /// Terminates episodes on object drop.
    pub fn terminate_on_drop(mut self, v: bool) -> Self {
        self.terminate_on_drop = v;
        self
    }
}

/// Components of the reward of a step.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RewardTerms {
    /// `-Σ a_i²`, before weighting.
    pub ctrl: f32,

    /// Negative gripper-object distance, or gripper-goal distance without object.
    pub dist_object: f32,

    /// Sum of the lift and success bonuses.
    pub grasping: f32,

    /// Negative object-goal distance, before weighting.
    pub dist_target: f32,

    /// Goal bonus.
    pub target: f32,

    /// Drop penalty, zero or negative.
    pub drop: f32,
}

/// Result of [`RewardEvaluator::evaluate`].
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    /// Total reward.
    pub reward: f32,

    /// Termination hint.
    pub done: bool,

    /// `1.0` when the task is solved at this step, else `0.0`.
    pub is_success: f32,

    /// Gripper latch to apply from the next command on.
    pub gripper: GripperState,

    /// Components of `reward`.
    pub terms: RewardTerms,
}

impl Evaluation {
    /// Reward terms as a [`Record`].
    pub fn record(&self) -> Record {
        Record::from_slice(&[
            ("reward_ctrl", RecordValue::Scalar(self.terms.ctrl)),
            ("reward_dist_object", RecordValue::Scalar(self.terms.dist_object)),
            ("reward_grasping", RecordValue::Scalar(self.terms.grasping)),
            ("reward_dist_target", RecordValue::Scalar(self.terms.dist_target)),
            ("reward_target", RecordValue::Scalar(self.terms.target)),
            ("reward_drop", RecordValue::Scalar(self.terms.drop)),
            ("is_success", RecordValue::Scalar(self.is_success)),
        ])
    }
}

/// Computes the shaped reward, the success flag and the next gripper latch.
///
/// Pure: the returned latch is applied by the caller after the evaluation.
pub struct RewardEvaluator {
    config: RewardConfig,
    has_object: bool,
}

impl RewardEvaluator {
    /// Constructs the evaluator.
    pub fn new(config: &RewardConfig, has_object: bool) -> Self {
        Self {
            config: config.clone(),
            has_object,
        }
    }

    /// Evaluates a step from the action, the goal and the resulting observation.
    pub fn evaluate(&self, act: &ArmAct, goal: &Vector3<f32>, obs: &ArmObs) -> Evaluation {
        let c = &self.config;
        let grip_pos = obs.grip_pos();
        let mut terms = RewardTerms {
            ctrl: -act.as_slice().iter().map(|a| a * a).sum::<f32>(),
            ..Default::default()
        };

        if !self.has_object {
            let d = (goal - grip_pos).norm();
            terms.dist_object = -d;
            let is_success = (d < c.target_threshold) as i32 as f32;
            terms.target = c.target_bonus * is_success;
            return self.finish(terms, false, is_success, GripperState::Open);
        }

        let object_pos = obs.object_pos();
        let d = (object_pos - grip_pos).norm();
        terms.dist_object = -d;

        let gripper = match d < c.close_threshold {
            true => GripperState::Closed,
            false => GripperState::Open,
        };

        let mut is_success = 0.0;
        if d < c.grasp_threshold && object_pos.z > c.lift_height {
            terms.grasping += c.lift_bonus;
            if object_pos.z > c.success_height {
                terms.grasping += c.success_bonus;
                is_success = 1.0;
            }
        }

        let d_target = (goal - object_pos).norm();
        terms.dist_target = -d_target;
        if d_target < c.target_threshold {
            terms.target = c.target_bonus;
        }

        let mut done = false;
        if object_pos.z < c.drop_height {
            terms.drop = -c.drop_penalty;
            done = c.terminate_on_drop;
        }

        self.finish(terms, done, is_success, gripper)
    }

    fn finish(
        &self,
        terms: RewardTerms,
        done: bool,
        is_success: f32,
        gripper: GripperState,
    ) -> Evaluation {
        let c = &self.config;
        let reward = c.w_ctrl * terms.ctrl
            + terms.dist_object
            + terms.grasping
            + c.w_dist_target * terms.dist_target
            + terms.target
            + terms.drop;
        debug!(
            "reward = {} (ctrl = {}, dist_object = {}, grasping = {}, drop = {})",
            reward,
            c.w_ctrl * terms.ctrl,
            terms.dist_object,
            terms.grasping,
            terms.drop
        );

        Evaluation {
            reward,
            done,
            is_success,
            gripper,
            terms,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array1;

    fn v(x: f32, y: f32, z: f32) -> Vector3<f32> {
        Vector3::new(x, y, z)
    }

    fn obs(grip: Vector3<f32>, object: Vector3<f32>) -> ArmObs {
        let mut v = vec![0f32; 10];
        v[0..3].copy_from_slice(grip.as_slice());
        v[3..6].copy_from_slice(object.as_slice());
        ArmObs {
            observation: Array1::from(v),
            achieved_goal: object,
            desired_goal: Vector3::zeros(),
        }
    }

    fn evaluator() -> RewardEvaluator {
        RewardEvaluator::new(&RewardConfig::default(), true)
    }

    fn zero_act() -> ArmAct {
        ArmAct::from(vec![0.0; 4])
    }

    #[test]
    fn lifted_and_solved_at_zero_distance() {
        let p = v(1.0, 0.0, 0.85);
        let e = evaluator().evaluate(&zero_act(), &v(1.0, 0.0, 0.4), &obs(p, p));

        assert_eq!(e.reward, 110.0);
        assert_eq!(e.is_success, 1.0);
        assert_eq!(e.gripper, GripperState::Closed);
        assert!(!e.done);
    }

    #[test]
    fn success_requires_success_height() {
        let goal = Vector3::zeros();
        let lifted = v(1.0, 0.0, 0.78);
        let e = evaluator().evaluate(&zero_act(), &goal, &obs(lifted, lifted));
        assert_eq!(e.is_success, 0.0);
        assert_eq!(e.terms.grasping, 10.0);
        assert_eq!(e.gripper, GripperState::Closed);

        let raised = v(1.0, 0.0, 0.81);
        let e = evaluator().evaluate(&zero_act(), &goal, &obs(raised, raised));
        assert_eq!(e.is_success, 1.0);
        assert_eq!(e.terms.grasping, 110.0);
    }

    #[test]
    fn latch_closes_inside_close_threshold_only() {
        let object = v(1.0, 0.0, 0.7);
        let near = v(1.08, 0.0, 0.7);
        let e = evaluator().evaluate(&zero_act(), &Vector3::zeros(), &obs(near, object));
        assert_eq!(e.gripper, GripperState::Closed);
        assert_eq!(e.terms.grasping, 0.0);

        let far = v(1.2, 0.0, 0.7);
        let e = evaluator().evaluate(&zero_act(), &Vector3::zeros(), &obs(far, object));
        assert_eq!(e.gripper, GripperState::Open);
    }

    #[test]
    fn control_penalty_and_distance() {
        let act = ArmAct::from(vec![1.0, -1.0, 0.0, 0.0]);
        let o = obs(v(1.0, 0.0, 0.7), v(1.0, 0.3, 0.7));
        let e = evaluator().evaluate(&act, &Vector3::zeros(), &o);

        assert_eq!(e.terms.ctrl, -2.0);
        assert!((e.terms.dist_object + 0.3).abs() < 1e-6);
        assert!((e.reward - (-0.02 - 0.3)).abs() < 1e-6);
    }

    #[test]
    fn drop_is_penalized_without_termination() {
        let object = v(1.0, 0.0, 0.05);
        let e = evaluator().evaluate(&zero_act(), &Vector3::zeros(), &obs(object, object));
        assert_eq!(e.terms.drop, -10.0);
        assert!(!e.done);

        let config = RewardConfig::default().terminate_on_drop(true);
        let e = RewardEvaluator::new(&config, true).evaluate(
            &zero_act(),
            &Vector3::zeros(),
            &obs(object, object),
        );
        assert!(e.done);
    }

    #[test]
    fn target_terms_are_configurable() {
        let object = v(1.0, 0.0, 0.7);
        let goal = v(1.0, 0.0, 0.72);
        let config = RewardConfig::default().target_terms(10.0, 5.0);
        let e = RewardEvaluator::new(&config, true).evaluate(
            &zero_act(),
            &goal,
            &obs(v(1.5, 0.0, 0.7), object),
        );
        assert_eq!(e.terms.target, 5.0);
        assert!((e.reward - (-0.5 + 10.0 * -0.02 + 5.0)).abs() < 1e-5);

        let e = evaluator().evaluate(&zero_act(), &goal, &obs(v(1.5, 0.0, 0.7), object));
        assert!((e.reward + 0.5).abs() < 1e-6);
    }

    #[test]
    fn reach_task_uses_goal_distance() {
        let ev = RewardEvaluator::new(&RewardConfig::default(), false);
        let grip = v(0.8, 0.0, 0.8);
        let e = ev.evaluate(&zero_act(), &v(0.8, 0.0, 0.82), &obs(grip, Vector3::zeros()));
        assert_eq!(e.is_success, 1.0);
        assert_eq!(e.gripper, GripperState::Open);
        assert!((e.reward + 0.02).abs() < 1e-5);
    }
}
