use anyhow::Result;
use manip_arm_env::{
    ArmAct, ArmEnv, ArmEnvConfig, ArmEnvError, ArmObs, KinematicScene, LifecycleState,
    ResetConfig, SimulatedBackend,
};
use manip_core::{
    record::BufferedRecorder, util::eval_with_recorder, DefaultEvaluator, Env, Evaluator, Policy,
};
use nalgebra::{Vector2, Vector3};
use test_log::test;

type E = ArmEnv<SimulatedBackend<KinematicScene>>;

/// Moves towards the object, then lifts once the gripper is on it.
struct PickPolicy;

impl PickPolicy {
    fn towards(delta: Vector3<f32>) -> ArmAct {
        let mut a: Vec<f32> = delta.iter().map(|d| (d / 0.03).max(-1.0).min(1.0)).collect();
        a.push(0.0);
        ArmAct::from(a)
    }
}

impl Policy<E> for PickPolicy {
    fn sample(&mut self, obs: &ArmObs) -> ArmAct {
        let rel = obs.object_rel_pos();
        match rel.norm() < 0.02 {
            true => ArmAct::from(vec![0.0, 0.0, 1.0, 0.0]),
            false => Self::towards(rel),
        }
    }
}

/// Moves the gripper to the goal.
struct ReachPolicy;

impl Policy<E> for ReachPolicy {
    fn sample(&mut self, obs: &ArmObs) -> ArmAct {
        PickPolicy::towards(obs.desired_goal - obs.grip_pos())
    }
}

fn config() -> ArmEnvConfig<SimulatedBackend<KinematicScene>> {
    ArmEnvConfig::default()
}

#[test]
fn pick_and_lift_with_scripted_policy() -> Result<()> {
    let mut env = E::build(&config(), 0)?;
    let mut policy = PickPolicy;
    let mut obs = env.reset(None)?;
    assert_eq!(obs.observation.len(), 22);
    assert_eq!(obs.success_flag(), 0.0);
    assert_eq!(env.lifecycle_state(), LifecycleState::Reset);

    let mut prev_success = 0.0;
    let mut max_reward = f32::MIN;
    let mut solved = false;
    for _ in 0..50 {
        let (step, record) = env.step(&policy.sample(&obs))?;
        // The observation carries the flag of the previous step.
        assert_eq!(step.obs.success_flag(), prev_success);
        prev_success = step.info.is_success;
        max_reward = max_reward.max(step.reward[0]);
        if step.info.is_success == 1.0 {
            solved = true;
            assert!(step.info.episode_success);
            assert!(record.get_scalar("object_z")? > 0.8);
            break;
        }
        assert_eq!(step.is_terminated[0], 0);
        obs = step.obs;
    }

    assert!(solved);
    assert!(max_reward > 100.0);
    assert_eq!(env.lifecycle_state(), LifecycleState::Running);
    Ok(())
}

#[test]
fn observe_is_idempotent() -> Result<()> {
    let mut env = E::build(&config(), 1)?;
    env.reset(None)?;
    env.step(&ArmAct::from(vec![0.5, -0.5, 0.2, 0.0]))?;
    assert_eq!(env.observe()?, env.observe()?);
    Ok(())
}

#[test]
fn episodes_are_truncated() -> Result<()> {
    let mut env = E::build(&config().max_steps(Some(5)), 2)?;
    env.reset(None)?;
    for i in 1..=5 {
        let (step, _) = env.step(&ArmAct::from(vec![0.0; 4]))?;
        assert_eq!(step.is_truncated[0], (i == 5) as i8);
        assert_eq!(step.is_terminated[0], 0);
    }
    assert_eq!(env.count_steps(), 5);

    let obs = env.reset(Some(&vec![0]))?;
    assert_eq!(env.count_steps(), 5);
    assert_eq!(obs, env.observe()?);

    env.reset(Some(&vec![1]))?;
    assert_eq!(env.count_steps(), 0);
    Ok(())
}

#[test]
fn reset_with_index_is_reproducible() -> Result<()> {
    let mut env1 = E::build(&config(), 10)?;
    let mut env2 = E::build(&config(), 20)?;

    let obs1 = env1.reset_with_index(3)?;
    let obs2 = env2.reset_with_index(3)?;
    assert_eq!(env1.goal(), env2.goal());
    assert_eq!(obs1, obs2);

    env1.reset_with_index(4)?;
    assert_ne!(env1.goal(), env2.goal());
    Ok(())
}

#[test]
fn goals_follow_reference_frames() -> Result<()> {
    let mut env = E::build(&config(), 5)?;
    for ix in 0..20 {
        let obs = env.reset_with_index(ix)?;
        let goal = env.goal();
        assert_eq!(obs.desired_goal, goal);
        // Objects rest on the table at the start of an episode.
        assert!((obs.object_pos().z - 0.7).abs() < 1e-6);
        assert!(goal.z >= 0.7 - 1e-6 && goal.z <= 0.7 + 0.45 + 1e-6);
        // Placement keeps its distance from the gripper position captured at setup.
        let home = Vector2::new(0.80326763, 0.01372008);
        let dxy = (obs.object_pos().xy() - home).norm();
        assert!(dxy >= 0.1 - 1e-4 && dxy <= 0.15);
    }
    Ok(())
}

#[test]
fn step_before_reset_is_not_ready() -> Result<()> {
    let mut env = E::build(&config(), 0)?;
    assert_eq!(env.lifecycle_state(), LifecycleState::Ready);
    let err = env.step(&ArmAct::from(vec![0.0; 4])).err().unwrap();
    assert!(matches!(
        err.downcast_ref::<ArmEnvError>(),
        Some(ArmEnvError::NotReady(_))
    ));
    Ok(())
}

#[test]
fn failed_reset_leaves_no_episode_to_step() -> Result<()> {
    // A single placement draw misses the minimum distance most of the time.
    let reset = ResetConfig::default().max_placement_attempts(1);
    let mut env = E::build(&config().reset(reset), 0)?;
    let (mut n_failed, mut n_ok) = (0, 0);

    for ix in 0..50 {
        match env.reset_with_index(ix) {
            Ok(_) => {
                env.step(&ArmAct::from(vec![0.0; 4]))?;
                assert_eq!(env.lifecycle_state(), LifecycleState::Running);
                n_ok += 1;
            }
            Err(err) => {
                assert_eq!(
                    err.downcast_ref::<ArmEnvError>(),
                    Some(&ArmEnvError::GoalSamplingFailed { attempts: 1 })
                );
                assert_eq!(env.lifecycle_state(), LifecycleState::Ready);
                assert_eq!(env.count_steps(), 0);
                let err = env.step(&ArmAct::from(vec![0.0; 4])).err().unwrap();
                assert!(matches!(
                    err.downcast_ref::<ArmEnvError>(),
                    Some(ArmEnvError::NotReady(_))
                ));
                n_failed += 1;
            }
        }
    }
    assert!(n_failed > 0 && n_ok > 0);
    Ok(())
}

#[test]
fn wrong_action_length_is_rejected() -> Result<()> {
    let mut env = E::build(&config(), 0)?;
    env.reset(None)?;
    let err = env.step(&ArmAct::from(vec![0.0; 3])).err().unwrap();
    assert_eq!(
        err.downcast_ref::<ArmEnvError>(),
        Some(&ArmEnvError::ShapeMismatch {
            what: "action".into(),
            expected: 4,
            got: 3
        })
    );
    Ok(())
}

#[test]
fn reach_task_without_object() -> Result<()> {
    let config = config().has_object(false);
    let mut env = E::build(&config, 7)?;
    let mut policy = ReachPolicy;
    let mut obs = env.reset(None)?;
    assert_eq!(obs.object_pos(), Vector3::zeros());
    assert_eq!(obs.achieved_goal, obs.grip_pos());

    let mut reached = false;
    for _ in 0..50 {
        let (step, record) = env.step(&policy.sample(&obs))?;
        assert!(record.get("object_z").is_none());
        if step.info.goal_reached == 1.0 {
            assert_eq!(step.info.is_success, 1.0);
            reached = true;
            break;
        }
        obs = step.obs;
    }
    assert!(reached);
    Ok(())
}

#[test]
fn evaluator_reports_success_rate() -> Result<()> {
    let mut evaluator = DefaultEvaluator::<E>::new(&config(), 0, 3)?;
    let record = evaluator.evaluate(&mut PickPolicy)?;
    assert!(record.get_scalar("Episode return")?.is_finite());
    assert_eq!(record.get_scalar("Success rate")?, 1.0);
    Ok(())
}

#[test]
fn step_records_reach_the_recorder() -> Result<()> {
    let mut env = E::build(&config().max_steps(Some(8)), 3)?;
    let mut recorder = BufferedRecorder::new();
    let returns = eval_with_recorder(&mut env, &mut PickPolicy, 2, &mut recorder)?;
    assert_eq!(returns.len(), 2);
    assert!(recorder.len() >= 2 && recorder.len() <= 16);
    for record in recorder.iter() {
        assert!(record.get_scalar("reward")?.is_finite());
        assert!(record.get_scalar("object_z")? > 0.0);
        assert!(record.get("grip_pos").is_some());
    }
    Ok(())
}
