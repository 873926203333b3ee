use anyhow::Result;
use clap::Parser;
use manip_arm_env::{ArmAct, ArmEnv, ArmEnvConfig, ArmObs, KinematicScene, SimulatedBackend};
use manip_core::{DefaultEvaluator, Evaluator as _, Policy};

type Env = ArmEnv<SimulatedBackend<KinematicScene>>;
type Evaluator = DefaultEvaluator<Env>;

/// Runs a random policy in the simulated pick-and-lift environment
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Environment configuration in YAML, defaults are used if not given
    #[arg(long)]
    config: Option<String>,

    /// Number of evaluation episodes
    #[arg(long, default_value_t = 5)]
    n_episodes: usize,

    /// Random seed
    #[arg(long, default_value_t = 42)]
    seed: i64,

    /// Writes the configuration in use to this file
    #[arg(long)]
    save_config: Option<String>,
}

struct RandomPolicy;

impl Policy<Env> for RandomPolicy {
    fn sample(&mut self, _: &ArmObs) -> ArmAct {
        let mut a: Vec<f32> = (0..3).map(|_| 2. * fastrand::f32() - 1.).collect();
        a.push(0.);
        ArmAct::from(a)
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();
    fastrand::seed(args.seed as u64);

    let env_config = match &args.config {
        Some(path) => ArmEnvConfig::load(path)?,
        None => ArmEnvConfig::default(),
    };
    if let Some(path) = &args.save_config {
        env_config.save(path)?;
    }

    let mut evaluator = Evaluator::new(&env_config, args.seed, args.n_episodes)?;
    let record = evaluator.evaluate(&mut RandomPolicy)?;
    println!("{:?}", record.get_scalar("Episode return")?);
    println!("{:?}", record.get_scalar("Success rate")?);

    Ok(())
}
