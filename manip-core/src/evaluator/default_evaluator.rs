//! Default implementation of the [`Evaluator`] trait.
use super::Evaluator;
use crate::{
    record::{Record, RecordValue},
    Env, Info, Policy,
};
use anyhow::Result;
use log::info;

/// Runs a fixed number of episodes and summarizes them.
///
/// The returned [`Record`] holds
///
/// * `"Episode return"` - the average cumulative reward over episodes,
/// * `"Success rate"` - the fraction of episodes in which at least one step reported
///   success through [`Info::is_success`]. It is omitted when the environment does
///   not define success.
///
/// Episodes end when [`Step::is_done`](crate::Step::is_done) returns `true`, so the
/// environment must terminate or truncate episodes on its own.
///
/// ```ignore
/// let mut evaluator = DefaultEvaluator::<ArmEnv<_>>::new(&config, 42, 10)?;
/// let record = evaluator.evaluate(&mut policy)?;
/// println!("Success rate: {}", record.get_scalar("Success rate")?);
/// ```
pub struct DefaultEvaluator<E: Env> {
    n_episodes: usize,
    env: E,
}

impl<E: Env> Evaluator<E> for DefaultEvaluator<E> {
    fn evaluate<P>(&mut self, policy: &mut P) -> Result<Record>
    where
        P: Policy<E>,
    {
        let mut r_total = 0f32;
        let mut n_success = 0usize;
        let mut defines_success = false;

        for ix in 0..self.n_episodes {
            let mut prev_obs = self.env.reset_with_index(ix)?;
            let mut r_episode = 0f32;
            let mut success = false;

            loop {
                let act = policy.sample(&prev_obs);
                let (step, _) = self.env.step(&act)?;
                r_episode += step.reward[0];
                if let Some(s) = step.info.is_success() {
                    defines_success = true;
                    success |= s;
                }
                if step.is_done() {
                    break;
                }
                prev_obs = step.obs;
            }

            info!(
                "Episode {}: return = {}, success = {}",
                ix, r_episode, success
            );
            r_total += r_episode;
            n_success += success as usize;
        }

        let n = self.n_episodes.max(1) as f32;
        let mut record = Record::from_scalar("Episode return", r_total / n);
        if defines_success {
            record.insert("Success rate", RecordValue::Scalar(n_success as f32 / n));
        }
        Ok(record)
    }
}

impl<E: Env> DefaultEvaluator<E> {
    /// Constructs a new [`DefaultEvaluator`].
    ///
    /// * `config` - Configuration of the environment
    /// * `seed` - Random seed used to build the environment
    /// * `n_episodes` - Number of episodes per evaluation
    pub fn new(config: &E::Config, seed: i64, n_episodes: usize) -> Result<Self> {
        Ok(Self {
            n_episodes,
            env: E::build(config, seed)?,
        })
    }

    /// Returns a mutable reference to the environment used for evaluation.
    pub fn env_mut(&mut self) -> &mut E {
        &mut self.env
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{record::BufferedRecorder, util::eval_with_recorder, Act, Obs, Step};
    use test_log::test;

    #[derive(Clone, Debug)]
    struct CountObs(usize);

    impl Obs for CountObs {
        fn len(&self) -> usize {
            1
        }
    }

    #[derive(Clone, Debug)]
    struct Noop;

    impl Act for Noop {
        fn len(&self) -> usize {
            0
        }
    }

    struct CountInfo(bool);

    impl Info for CountInfo {
        fn is_success(&self) -> Option<bool> {
            Some(self.0)
        }
    }

    /// Succeeds at the second step of odd-indexed episodes, truncates after 3 steps.
    struct CountEnv {
        t: usize,
        ix: usize,
    }

    impl Env for CountEnv {
        type Config = ();
        type Obs = CountObs;
        type Act = Noop;
        type Info = CountInfo;

        fn build(_config: &Self::Config, _seed: i64) -> Result<Self> {
            Ok(Self { t: 0, ix: 0 })
        }

        fn step(&mut self, a: &Self::Act) -> Result<(Step<Self>, Record)> {
            self.t += 1;
            let success = self.ix % 2 == 1 && self.t == 2;
            let truncated = (self.t >= 3) as i8;
            let step = Step::new(
                CountObs(self.t),
                a.clone(),
                vec![1.0],
                vec![0],
                vec![truncated],
                CountInfo(success),
                CountObs(self.t),
            );
            Ok((step, Record::empty()))
        }

        fn reset(&mut self, _is_done: Option<&Vec<i8>>) -> Result<Self::Obs> {
            self.t = 0;
            Ok(CountObs(0))
        }

        fn reset_with_index(&mut self, ix: usize) -> Result<Self::Obs> {
            self.ix = ix;
            self.reset(None)
        }
    }

    struct NoopPolicy;

    impl Policy<CountEnv> for NoopPolicy {
        fn sample(&mut self, obs: &CountObs) -> Noop {
            // Episodes chained by step_with_reset start from the reset observation.
            assert!(obs.0 < 3);
            Noop
        }
    }

    #[test]
    fn reports_return_and_success_rate() -> Result<()> {
        let mut evaluator = DefaultEvaluator::<CountEnv>::new(&(), 0, 4)?;
        let record = evaluator.evaluate(&mut NoopPolicy)?;

        assert_eq!(record.get_scalar("Episode return")?, 3.0);
        assert_eq!(record.get_scalar("Success rate")?, 0.5);
        Ok(())
    }

    #[test]
    fn step_with_reset_fills_init_obs() -> Result<()> {
        let mut env = CountEnv::build(&(), 0)?;
        env.reset(None)?;
        let mut last = None;
        for _ in 0..3 {
            last = Some(env.step_with_reset(&Noop)?.0);
        }
        let step = last.unwrap();

        assert!(step.is_done());
        assert_eq!(step.obs.0, 3);
        assert_eq!(step.init_obs.0, 0);
        Ok(())
    }

    #[test]
    fn recorder_receives_tagged_step_records() -> Result<()> {
        let mut env = CountEnv::build(&(), 0)?;
        env.reset_with_index(1)?;
        let mut recorder = BufferedRecorder::new();
        let returns = eval_with_recorder(&mut env, &mut NoopPolicy, 2, &mut recorder)?;

        assert_eq!(returns, vec![3.0, 3.0]);
        assert_eq!(recorder.len(), 6);
        let second = recorder.iter().nth(1).unwrap();
        assert_eq!(second.get_scalar("step")?, 1.0);
        assert_eq!(second.get_scalar("success")?, 1.0);
        let last = recorder.iter().last().unwrap();
        assert_eq!(last.get_scalar("episode")?, 1.0);
        assert_eq!(last.get_scalar("step")?, 2.0);
        // The second episode is followed by a fresh one.
        assert_eq!(env.t, 0);
        Ok(())
    }
}
