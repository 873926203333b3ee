//! Core functionalities.
mod env;
mod policy;
mod step;
pub use env::Env;
pub use policy::Policy;
use std::fmt::Debug;
pub use step::{Info, Step};

/// An observation of an environment.
///
/// Vectorized environments are not supported; one object holds the observation of a
/// single environment.
pub trait Obs: Clone + Debug {
    /// Returns the length of the flat observation vector.
    fn len(&self) -> usize;
}

/// An action applied to an environment.
pub trait Act: Clone + Debug {
    /// Returns the length of the flat action vector.
    fn len(&self) -> usize;
}
