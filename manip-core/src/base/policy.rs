//! Policy.
use super::Env;

/// Maps observations of an environment to actions.
///
/// Scripted controllers, random exploration and learned policies all implement this
/// trait. `sample` takes `&mut self` so that a policy can keep internal state, such
/// as a random number generator or the phase of a scripted motion.
pub trait Policy<E: Env> {
    /// Returns the action for `obs`.
    fn sample(&mut self, obs: &E::Obs) -> E::Act;
}
