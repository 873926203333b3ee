//! Result of a control step.
use super::Env;

/// Environment specific information attached to every [`Step`].
pub trait Info {
    /// Whether the task was achieved at this step, `None` if the environment has no
    /// notion of success.
    ///
    /// [`DefaultEvaluator`](crate::DefaultEvaluator) counts an episode as successful
    /// if any of its steps returns `Some(true)`.
    fn is_success(&self) -> Option<bool> {
        None
    }
}

impl Info for () {}

/// What an environment emits after applying an action for one control step.
///
/// Reward and flags are stored in vectors of length one, so that
/// `step.reward[0]` is the reward of the step.
pub struct Step<E: Env> {
    /// The action that was applied.
    pub act: E::Act,

    /// Observation after the action.
    pub obs: E::Obs,

    /// Reward of the step.
    pub reward: Vec<f32>,

    /// `1` if the episode ended by a terminal condition of the task.
    pub is_terminated: Vec<i8>,

    /// `1` if the episode was cut off, e.g., by a step limit.
    pub is_truncated: Vec<i8>,

    /// Environment specific information.
    pub info: E::Info,

    /// First observation of the next episode when the environment was reset right
    /// after this step, otherwise a copy of `obs`.
    pub init_obs: E::Obs,
}

impl<E: Env> Step<E> {
    /// Constructs a [`Step`].
    pub fn new(
        obs: E::Obs,
        act: E::Act,
        reward: Vec<f32>,
        is_terminated: Vec<i8>,
        is_truncated: Vec<i8>,
        info: E::Info,
        init_obs: E::Obs,
    ) -> Self {
        Self {
            act,
            obs,
            reward,
            is_terminated,
            is_truncated,
            info,
            init_obs,
        }
    }

    /// Whether the episode ended at this step, by termination or truncation.
    pub fn is_done(&self) -> bool {
        let flag = |v: &[i8]| v.first() == Some(&1);
        flag(&self.is_terminated) || flag(&self.is_truncated)
    }
}
