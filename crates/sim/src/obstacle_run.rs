//! Obstacle-course running environment.
//!
//! A point-mass runner starts at the origin and has to cover a straight
//! course along +x. Circular obstacles are scattered over the course from
//! the episode seed, so the same seed always produces the same layout.
//!
//! - **Action:** `[ax, ay]`, each clamped to `[-1, 1]` and scaled by
//!   [`ObstacleRunConfig::max_accel`].
//! - **Observation:** `[x, y, vx, vy, dx, dy, r]` where the last three
//!   describe the nearest obstacle still ahead of the runner (relative
//!   offset and radius), or the remaining distance to the finish line with
//!   zero radius once every obstacle is behind.
//! - **Reward:** forward progress made during the step, minus
//!   [`ObstacleRunConfig::collision_penalty`] for each collision.
//! - **Termination:** finish line reached or step limit hit.

use serde_json::json;
use tracing::info;

use crate::{EnvError, EnvFactory, EnvOptions, Environment, Observation, Transition};

const ACTION_SIZE: usize = 2;
const OBS_SIZE: usize = 7;

/// Fixed course and dynamics parameters.
#[derive(Clone, Debug)]
pub struct ObstacleRunConfig {
    /// Distance from start to finish line along x (meters)
    pub course_length: f64,
    /// Half width of the course; the runner is clamped inside it
    pub half_width: f64,
    /// Number of obstacles laid out per episode
    pub max_obstacles: usize,
    /// Obstacle radius range (meters)
    pub min_radius: f64,
    pub max_radius: f64,
    /// Acceleration at full action magnitude (m/s^2)
    pub max_accel: f64,
    /// Fraction of velocity lost per step
    pub drag: f64,
    /// Integration step (seconds)
    pub dt: f64,
    /// Reward subtracted per collision
    pub collision_penalty: f64,
    /// Episode is cut off after this many steps
    pub max_steps: u32,
}

impl Default for ObstacleRunConfig {
    fn default() -> Self {
        Self {
            course_length: 20.0,
            half_width: 3.0,
            max_obstacles: crate::DEFAULT_MAX_OBSTACLES,
            min_radius: 0.3,
            max_radius: 0.8,
            max_accel: 4.0,
            drag: 0.05,
            dt: 0.05,
            collision_penalty: 1.0,
            max_steps: 1000,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
struct Obstacle {
    x: f64,
    y: f64,
    radius: f64,
}

#[derive(Clone, Copy, Debug, Default)]
struct Runner {
    x: f64,
    y: f64,
    vx: f64,
    vy: f64,
}

pub struct ObstacleRun {
    config: ObstacleRunConfig,
    visualize: bool,
    runner: Runner,
    obstacles: Vec<Obstacle>,
    steps: u32,
    hits: u32,
    started: bool,
}

impl ObstacleRun {
    #[must_use]
    pub fn new(config: ObstacleRunConfig, visualize: bool) -> Self {
        Self {
            config,
            visualize,
            runner: Runner::default(),
            obstacles: Vec::new(),
            steps: 0,
            hits: 0,
            started: false,
        }
    }

    #[must_use]
    pub fn obs_size(&self) -> usize {
        OBS_SIZE
    }

    #[must_use]
    pub fn action_size(&self) -> usize {
        ACTION_SIZE
    }

    fn layout(&mut self, seed: u64) {
        let rng = fastrand::Rng::with_seed(seed);
        let c = &self.config;
        // Keep the first few meters clear so the runner never spawns inside one.
        let start = 3.0;
        let span = (c.course_length - 2.0 - start).max(0.0);
        self.obstacles = (0..c.max_obstacles)
            .map(|_| Obstacle {
                x: start + rng.f64() * span,
                y: (rng.f64() * 2.0 - 1.0) * (c.half_width - 0.5),
                radius: c.min_radius + rng.f64() * (c.max_radius - c.min_radius),
            })
            .collect();
        self.obstacles.sort_by(|a, b| a.x.total_cmp(&b.x));
    }

    fn observe(&self) -> Observation {
        let r = self.runner;
        let ahead = self
            .obstacles
            .iter()
            .find(|o| o.x + o.radius >= r.x)
            .map_or([self.config.course_length - r.x, -r.y, 0.0], |o| {
                [o.x - r.x, o.y - r.y, o.radius]
            });
        vec![r.x, r.y, r.vx, r.vy, ahead[0], ahead[1], ahead[2]]
    }

    /// Pushes the runner out of any obstacle it ended up inside.
    /// Returns how many obstacles were hit.
    fn resolve_collisions(&mut self) -> u32 {
        let mut hits = 0;
        for o in &self.obstacles {
            let dx = self.runner.x - o.x;
            let dy = self.runner.y - o.y;
            let dist = dx.hypot(dy);
            if dist < o.radius {
                hits += 1;
                let (nx, ny) = if dist > f64::EPSILON {
                    (dx / dist, dy / dist)
                } else {
                    (-1.0, 0.0)
                };
                self.runner.x = o.x + nx * o.radius;
                self.runner.y = o.y + ny * o.radius;
                self.runner.vx = 0.0;
                self.runner.vy = 0.0;
            }
        }
        hits
    }
}

fn validate(action: &[f64]) -> Result<(f64, f64), EnvError> {
    if action.len() != ACTION_SIZE {
        return Err(EnvError::ActionShape {
            expected: ACTION_SIZE,
            got: action.len(),
        });
    }
    if let Some(index) = action.iter().position(|a| !a.is_finite()) {
        return Err(EnvError::NonFiniteAction { index });
    }
    Ok((action[0].clamp(-1.0, 1.0), action[1].clamp(-1.0, 1.0)))
}

impl Environment for ObstacleRun {
    fn reset(&mut self, seed: u64) -> Result<Observation, EnvError> {
        self.layout(seed);
        self.runner = Runner::default();
        self.steps = 0;
        self.hits = 0;
        self.started = true;
        if self.visualize {
            info!(seed, obstacles = self.obstacles.len(), "course laid out");
        }
        Ok(self.observe())
    }

    fn step(&mut self, action: &[f64]) -> Result<Transition, EnvError> {
        if !self.started {
            return Err(EnvError::NotReset);
        }
        let (ax, ay) = validate(action)?;
        let c = &self.config;
        let before = self.runner.x;

        let keep = 1.0 - c.drag;
        self.runner.vx = (self.runner.vx + ax * c.max_accel * c.dt) * keep;
        self.runner.vy = (self.runner.vy + ay * c.max_accel * c.dt) * keep;
        self.runner.x += self.runner.vx * c.dt;
        self.runner.y = (self.runner.y + self.runner.vy * c.dt).clamp(-c.half_width, c.half_width);

        let hits = self.resolve_collisions();
        self.hits += hits;
        self.steps += 1;

        let reward = (self.runner.x - before) - f64::from(hits) * self.config.collision_penalty;
        let finished = self.runner.x >= self.config.course_length;
        let done = finished || self.steps >= self.config.max_steps;

        if self.visualize {
            info!(
                step = self.steps,
                x = self.runner.x,
                y = self.runner.y,
                reward,
                "runner"
            );
        }

        Ok(Transition {
            observation: self.observe(),
            reward,
            done,
            info: json!({
                "steps": self.steps,
                "obstacles_hit": self.hits,
                "finished": finished,
            }),
        })
    }
}

/// Builds [`ObstacleRun`] instances with a fixed course configuration.
#[derive(Clone, Debug, Default)]
pub struct ObstacleRunFactory {
    pub config: ObstacleRunConfig,
}

impl EnvFactory for ObstacleRunFactory {
    type Env = ObstacleRun;

    fn create(&self, options: &EnvOptions) -> Result<ObstacleRun, EnvError> {
        if self.config.min_radius > self.config.max_radius {
            return Err(EnvError::Construction(
                "obstacle radius range is inverted".to_string(),
            ));
        }
        let config = ObstacleRunConfig {
            max_obstacles: options.max_obstacles,
            ..self.config.clone()
        };
        Ok(ObstacleRun::new(config, options.visualize))
    }
}
