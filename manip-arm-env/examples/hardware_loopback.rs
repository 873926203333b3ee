use anyhow::Result;
use clap::Parser;
use log::info;
use manip_arm_env::{
    hardware::{session, LoopbackArm, LoopbackConfig},
    ArmAct, ArmEnv, ArmEnvConfig, GripperState, HardwareBackend, HardwareConfig,
};
use manip_core::Env as _;

type Env = ArmEnv<HardwareBackend>;

/// Runs the hardware control loop against an in-process arm
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Number of steps
    #[arg(long, default_value_t = 20)]
    n_steps: usize,

    /// Timeout of arm service calls in milliseconds
    #[arg(long, default_value_t = 1000)]
    timeout: u64,
}

fn run(n_steps: usize, timeout: u64) -> Result<()> {
    let (arm, link) = LoopbackArm::spawn(LoopbackConfig::default())?;
    let env_config = ArmEnvConfig::default().max_steps(Some(n_steps)).backend(
        HardwareConfig::default()
            .link(link)
            .service_timeout_ms(timeout)
            .startup(timeout, 5),
    );
    let mut env = Env::build(&env_config, 42)?;
    let mut obs = env.reset(None)?;
    info!("initial gripper position: {:?}", obs.grip_pos());

    for i in 0..n_steps {
        // Descend towards the table, then lift once the gripper has latched.
        let dz = match env.gripper_state() {
            GripperState::Closed => 1.0,
            GripperState::Open => -1.0,
        };
        let (step, record) = env.step(&ArmAct::from(vec![0.0, 0.0, dz, 0.0]))?;
        info!(
            "step {}: reward = {:.3}, grip = {:?}, object_z = {:?}",
            i,
            step.reward[0],
            step.obs.grip_pos(),
            record.get_scalar("object_z").ok()
        );
        obs = step.obs;
        if step.is_truncated[0] == 1 {
            break;
        }
    }
    info!("final observation: {:?}", obs.observation);

    env.backend().go_home()?;
    drop(env);
    drop(arm);
    session::shutdown();
    Ok(())
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();
    run(args.n_steps, args.timeout)
}
