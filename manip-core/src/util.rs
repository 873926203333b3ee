//! Utilities for running policies in environments.
use crate::{
    record::{RecordValue, Recorder},
    Env, Info, Policy,
};
use anyhow::Result;

/// Runs `n_episodes` episodes back to back with `policy`, writing every step record
/// to `recorder`.
///
/// Episodes are chained with [`Env::step_with_reset`], so the environment is left at
/// the start of a fresh episode. Step records are tagged with `"episode"`, `"step"`,
/// `"reward"` and, when the environment defines success, `"success"`. Returns the
/// undiscounted return of each episode.
pub fn eval_with_recorder<E, P, R>(
    env: &mut E,
    policy: &mut P,
    n_episodes: usize,
    recorder: &mut R,
) -> Result<Vec<f32>>
where
    E: Env,
    P: Policy<E>,
    R: Recorder,
{
    let mut returns = Vec::with_capacity(n_episodes);
    if n_episodes == 0 {
        return Ok(returns);
    }

    let mut obs = env.reset(None)?;
    let mut episode_return = 0.0;
    let mut t = 0usize;

    while returns.len() < n_episodes {
        let (step, mut record) = env.step_with_reset(&policy.sample(&obs))?;
        let reward = step.reward[0];
        episode_return += reward;

        record.insert("episode", RecordValue::Scalar(returns.len() as f32));
        record.insert("step", RecordValue::Scalar(t as f32));
        record.insert("reward", RecordValue::Scalar(reward));
        if let Some(success) = step.info.is_success() {
            record.insert("success", RecordValue::Scalar(success as i32 as f32));
        }
        recorder.write(record);

        match step.is_done() {
            true => {
                returns.push(episode_return);
                episode_return = 0.0;
                t = 0;
                obs = step.init_obs;
            }
            false => {
                obs = step.obs;
                t += 1;
            }
        }
    }

    Ok(returns)
}
