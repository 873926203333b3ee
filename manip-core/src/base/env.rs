//! Environment.
use super::{Act, Info, Obs, Step};
use crate::record::Record;
use anyhow::Result;

/// An environment driven one control step at a time.
///
/// Unlike a pure simulator, an environment may talk to physical hardware, so a step
/// can fail. Such failures are fatal for the running episode and are returned to the
/// caller instead of being folded into the reward.
pub trait Env {
    /// Configuration passed to [`Env::build`].
    type Config: Clone;

    /// Observation emitted after every reset and step.
    type Obs: Obs;

    /// Action consumed by [`Env::step`].
    type Act: Act;

    /// Environment specific information of a [`Step`].
    type Info: Info;

    /// Builds the environment. `seed` initializes its random number generator.
    fn build(config: &Self::Config, seed: i64) -> Result<Self>
    where
        Self: Sized;

    /// Applies `a` for one control step.
    fn step(&mut self, a: &Self::Act) -> Result<(Step<Self>, Record)>
    where
        Self: Sized;

    /// Starts a new episode if `is_done` is `None` or `is_done[0] == 1`.
    fn reset(&mut self, is_done: Option<&Vec<i8>>) -> Result<Self::Obs>;

    /// Like [`Env::step`], but starts a new episode when the step ends the current one.
    ///
    /// The observation after the reset is stored in [`Step::init_obs`].
    fn step_with_reset(&mut self, a: &Self::Act) -> Result<(Step<Self>, Record)>
    where
        Self: Sized,
    {
        let (step, record) = self.step(a)?;
        if step.is_done() {
            let init_obs = self.reset(None)?;
            Ok((Step { init_obs, ..step }, record))
        } else {
            Ok((step, record))
        }
    }

    /// Starts a new episode seeded by `ix`.
    ///
    /// The same index yields the same episode start, which makes evaluation runs
    /// reproducible.
    fn reset_with_index(&mut self, ix: usize) -> Result<Self::Obs>;
}
