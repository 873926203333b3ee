#![warn(missing_docs)]
//! Core abstractions for goal-conditioned manipulation environments.
//!
//! An environment ([`Env`]) consumes actions ([`Act`]) produced by a [`Policy`] and
//! emits [`Step`] objects holding the next observation ([`Obs`]), the reward and
//! termination flags together with environment specific information ([`Info`]).
//!
//! The [`record`] module carries per-step diagnostics out of the environment and
//! [`Evaluator`] runs whole episodes to summarize the performance of a policy.
pub mod error;
pub mod record;
pub mod util;

mod base;
pub use base::{Act, Env, Info, Obs, Policy, Step};

mod evaluator;
pub use evaluator::{DefaultEvaluator, Evaluator};
