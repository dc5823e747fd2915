use approx::assert_relative_eq;
use sim::{EnvError, EnvFactory, EnvOptions, Environment, ObstacleRun, ObstacleRunConfig, ObstacleRunFactory};

fn env() -> ObstacleRun {
    ObstacleRunFactory::default()
        .create(&EnvOptions::default())
        .unwrap()
}

#[test]
fn reset_returns_full_observation_at_origin() {
    let mut env = env();
    let obs = env.reset(11).unwrap();
    assert_eq!(obs.len(), env.obs_size());
    assert_relative_eq!(obs[0], 0.0);
    assert_relative_eq!(obs[1], 0.0);
    // Nearest obstacle lies ahead of the start line.
    assert!(obs[4] > 0.0);
    assert!(obs[6] > 0.0);
}

#[test]
fn same_seed_same_course() {
    let mut a = env();
    let mut b = env();
    assert_eq!(a.reset(42).unwrap(), b.reset(42).unwrap());

    let action = [1.0, 0.25];
    for _ in 0..20 {
        let ta = a.step(&action).unwrap();
        let tb = b.step(&action).unwrap();
        assert_eq!(ta, tb);
    }
}

#[test]
fn different_seeds_differ() {
    let mut env = env();
    let first = env.reset(11).unwrap();
    let second = env.reset(22).unwrap();
    assert_ne!(first, second);
}

#[test]
fn forward_push_earns_positive_reward_on_clear_track() {
    let config = ObstacleRunConfig {
        max_obstacles: 0,
        ..ObstacleRunConfig::default()
    };
    let mut env = ObstacleRun::new(config, false);
    env.reset(7).unwrap();

    let t = env.step(&[1.0, 0.0]).unwrap();
    assert!(t.reward > 0.0);
    assert!(!t.done);
    assert_eq!(t.info["steps"], 1);
    assert_eq!(t.info["obstacles_hit"], 0);
}

#[test]
fn episode_ends_at_step_limit() {
    let config = ObstacleRunConfig {
        max_steps: 5,
        ..ObstacleRunConfig::default()
    };
    let mut env = ObstacleRun::new(config, false);
    env.reset(3).unwrap();
    let mut done = false;
    for _ in 0..5 {
        done = env.step(&[0.0, 0.0]).unwrap().done;
    }
    assert!(done);
}

#[test]
fn runner_reaches_finish_line() {
    let config = ObstacleRunConfig {
        max_obstacles: 0,
        course_length: 1.0,
        ..ObstacleRunConfig::default()
    };
    let mut env = ObstacleRun::new(config, false);
    env.reset(1).unwrap();
    let mut last = None;
    for _ in 0..200 {
        let t = env.step(&[1.0, 0.0]).unwrap();
        let done = t.done;
        last = Some(t);
        if done {
            break;
        }
    }
    let last = last.unwrap();
    assert!(last.done);
    assert_eq!(last.info["finished"], true);
}

#[test]
fn malformed_actions_are_rejected() {
    let mut env = env();
    env.reset(5).unwrap();
    let expected = env.action_size();
    assert_eq!(expected, 2);
    assert!(matches!(
        env.step(&[1.0]),
        Err(EnvError::ActionShape { expected: e, got: 1 }) if e == expected
    ));
    assert!(env.step(&vec![0.0; expected]).is_ok());
    assert!(matches!(
        env.step(&[0.0, f64::NAN]),
        Err(EnvError::NonFiniteAction { index: 1 })
    ));
}

#[test]
fn step_before_reset_is_an_error() {
    let mut env = env();
    assert!(matches!(env.step(&[0.0, 0.0]), Err(EnvError::NotReset)));
}

#[test]
fn factory_applies_obstacle_count_and_rejects_bad_radius_range() {
    let opts = EnvOptions {
        visualize: false,
        max_obstacles: 0,
    };
    let mut env = ObstacleRunFactory::default().create(&opts).unwrap();
    let obs = env.reset(9).unwrap();
    // No obstacles: the lookahead points at the finish line with zero radius.
    assert_relative_eq!(obs[4], 20.0);
    assert_relative_eq!(obs[6], 0.0);

    let broken = ObstacleRunFactory {
        config: ObstacleRunConfig {
            min_radius: 2.0,
            max_radius: 1.0,
            ..ObstacleRunConfig::default()
        },
    };
    assert!(matches!(broken.create(&opts), Err(EnvError::Construction(_))));
}
