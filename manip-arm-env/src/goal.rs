//! Goal sampling and distance-based success.
use crate::backend::References;
use nalgebra::Vector3;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Configuration of [`GoalSampler`].
#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
pub struct GoalConfig {
    /// Half width of the uniform goal offset per axis, tasks with object.
    pub target_range: f32,

    /// Fixed offset added to goals, tasks with object.
    pub target_offset: Vector3<f32>,

    /// Whether goals may be placed in the air.
    pub target_in_the_air: bool,

    /// Probability of an in-air goal when `target_in_the_air` is set.
    pub in_air_probability: f32,

    /// Range of the upward lift of in-air goals.
    pub in_air_lift: [f32; 2],

    /// Half width of the uniform goal offset per axis, tasks without object.
    pub reach_range: f32,

    /// A goal is reached when the achieved goal is closer than this.
    pub distance_threshold: f32,
}

impl Default for GoalConfig {
    fn default() -> Self {
        Self {
            target_range: 0.1,
            target_offset: Vector3::zeros(),
            target_in_the_air: true,
            in_air_probability: 0.5,
            in_air_lift: [0.2, 0.45],
            reach_range: 0.15,
            distance_threshold: 0.05,
        }
    }
}

impl GoalConfig {
    /// Sets the range of goal offsets.
    pub fn target_range(mut self, v: f32) -> Self {
        self.target_range = v;
        self
    }

    /// Sets the fixed goal offset.
    pub fn target_offset(mut self, v: Vector3<f32>) -> Self {
        self.target_offset = v;
        self
    }

    /// Enables or disables in-air goals.
    pub fn target_in_the_air(mut self, v: bool) -> Self {
        self.target_in_the_air = v;
        self
    }

    /// Sets the success distance.
    pub fn distance_threshold(mut self, v: f32) -> Self {
        self.distance_threshold = v;
        self
    }
}

/// Uniform sample in `[low, high)`, or `low` for an empty range.
pub(crate) fn uniform<R: Rng>(rng: &mut R, low: f32, high: f32) -> f32 {
    match high > low {
        true => low + (high - low) * rng.gen::<f32>(),
        false => low,
    }
}

/// Samples episode goals around the reference frames.
pub struct GoalSampler {
    config: GoalConfig,
}

impl GoalSampler {
    /// Constructs the sampler.
    pub fn new(config: &GoalConfig) -> Self {
        Self {
            config: config.clone(),
        }
    }

    /// Samples a goal.
    ///
    /// With an object (`refs.height_offset` is `Some`), the goal is the reference
    /// gripper position plus a uniform offset in `±target_range` and `target_offset`,
    /// with `z` pinned to the resting height of the object and possibly lifted into
    /// the air. Without an object, the goal is the reference gripper position plus a
    /// uniform offset in `±reach_range`.
    pub fn sample<R: Rng>(&self, rng: &mut R, refs: &References) -> Vector3<f32> {
        let c = &self.config;
        let g = refs.gripper_pos;
        match refs.height_offset {
            Some(height_offset) => {
                let range = c.target_range;
                let offset = Vector3::from_fn(|_, _| uniform(rng, -range, range));
                let mut goal = g + offset + c.target_offset;
                goal.z = height_offset;
                if c.target_in_the_air && rng.gen::<f32>() < c.in_air_probability {
                    goal.z += uniform(rng, c.in_air_lift[0], c.in_air_lift[1]);
                }
                goal
            }
            None => {
                let r = c.reach_range;
                g + Vector3::from_fn(|_, _| uniform(rng, -r, r))
            }
        }
    }

    /// `1.0` if `achieved` is within `distance_threshold` of `desired`, else `0.0`.
    pub fn is_success(&self, achieved: &Vector3<f32>, desired: &Vector3<f32>) -> f32 {
        match (achieved - desired).norm() < self.config.distance_threshold {
            true => 1.0,
            false => 0.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};

    fn refs() -> References {
        References {
            gripper_pos: Vector3::new(0.8, 0.0, 0.8),
            height_offset: Some(0.7),
        }
    }

    #[test]
    fn goals_stay_in_range() {
        let sampler = GoalSampler::new(&GoalConfig::default().target_range(0.1));
        let mut rng = StdRng::seed_from_u64(42);
        let mut n_in_air = 0;

        for _ in 0..10_000 {
            let goal = sampler.sample(&mut rng, &refs());
            assert!((goal[0] - 0.8).abs() <= 0.1 + 1e-6);
            assert!(goal[1].abs() <= 0.1 + 1e-6);
            if goal[2] == 0.7 {
                continue;
            }
            n_in_air += 1;
            assert!(goal[2] >= 0.7 + 0.2 - 1e-6);
            assert!(goal[2] <= 0.7 + 0.45 + 1e-6);
        }
        assert!(n_in_air > 4_000 && n_in_air < 6_000);
    }

    #[test]
    fn goals_on_table_without_in_air() {
        let sampler = GoalSampler::new(&GoalConfig::default().target_in_the_air(false));
        let mut rng = StdRng::seed_from_u64(0);
        for _ in 0..1_000 {
            assert_eq!(sampler.sample(&mut rng, &refs())[2], 0.7);
        }
    }

    #[test]
    fn reach_goals_without_object() {
        let sampler = GoalSampler::new(&GoalConfig::default());
        let refs = References {
            gripper_pos: Vector3::new(0.8, 0.0, 0.8),
            height_offset: None,
        };
        let mut rng = StdRng::seed_from_u64(1);
        for _ in 0..1_000 {
            let goal = sampler.sample(&mut rng, &refs);
            assert!((goal[2] - 0.8).abs() <= 0.15 + 1e-6);
        }
    }

    #[test]
    fn success_by_distance() {
        let sampler = GoalSampler::new(&GoalConfig::default());
        let origin = Vector3::zeros();
        assert_eq!(sampler.is_success(&origin, &Vector3::new(0.0, 0.0, 0.04)), 1.0);
        assert_eq!(sampler.is_success(&origin, &Vector3::new(0.0, 0.0, 0.06)), 0.0);
    }

    #[test]
    fn uniform_handles_empty_range() {
        let mut rng = StdRng::seed_from_u64(0);
        assert_eq!(uniform(&mut rng, 0.3, 0.3), 0.3);
        let v = uniform(&mut rng, -0.1, 0.1);
        assert!((-0.1..0.1).contains(&v));
    }
}
