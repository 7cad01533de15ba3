//! Particle swarm optimizer.
//!
//! Each generation evaluates the whole population in parallel, refreshes personal
//! bests, then moves every particle with
//! ```text
//! v' = inertia*v + cognitive*r1*(pbest - x) + social*r2*(nbest - x)
//! x' = clamp(x + v', lower, upper)
//! ```
//! `nbest` comes from an immutable snapshot of personal bests taken before any
//! particle moves. All random draws come from one seeded `ChaCha8Rng` owned by the
//! swarm, on the stream named by `SwarmConfig::stream`, in a fixed order:
//! particle-major, dimension-minor, `r1` before `r2`.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::calibration::config::{SwarmConfig, Topology};
use crate::calibration::fitness::Fitness;
use crate::error::Result;

/// Objective minimized by the swarm. Must be safe to call from several threads.
pub trait FitnessFunction: Sync {
    fn evaluate(&self, position: &[f64]) -> Result<f64>;
}

impl<F> FitnessFunction for F
where
    F: Fn(&[f64]) -> Result<f64> + Sync,
{
    fn evaluate(&self, position: &[f64]) -> Result<f64> {
        self(position)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Termination {
    GenerationLimitReached,
    /// A [`StopHandle`] was raised; the swarm finished its current generation first.
    Stopped,
}

/// Cooperative stop signal, polled between generations.
#[derive(Debug, Clone, Default)]
pub struct StopHandle(Arc<AtomicBool>);

impl StopHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stop(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Particle {
    pub position: Vec<f64>,
    pub velocity: Vec<f64>,
    /// Fitness of `position`; infinite until first evaluated.
    pub fitness: f64,
    pub personal_best: Vec<f64>,
    pub personal_best_fitness: f64,
}

/// Indices of the particles in `index`'s neighborhood, in ascending ring order.
///
/// Ring: `size` consecutive particles starting `size / 2` before `index`, wrapping
/// around (size 3 is predecessor, self, successor). Star: everyone.
pub fn neighborhood(topology: Topology, population: usize, size: usize, index: usize) -> Vec<usize> {
    match topology {
        Topology::Star => (0..population).collect(),
        Topology::Ring => {
            let size = size.clamp(1, population);
            let half = size / 2;
            let start = (index + population - half) % population;
            (0..size).map(|k| (start + k) % population).collect()
        }
    }
}

pub struct Swarm {
    cfg: SwarmConfig,
    rng: ChaCha8Rng,
    particles: Vec<Particle>,
    hoods: Vec<Vec<usize>>,
    generation: usize,
    history: Vec<f64>,
    stop: StopHandle,
}

impl Swarm {
    /// Seeds every particle uniformly within bounds, with zero velocity.
    pub fn new(cfg: SwarmConfig) -> Result<Self> {
        cfg.check()?;
        let mut rng = ChaCha8Rng::seed_from_u64(cfg.seed);
        rng.set_stream(cfg.stream);

        let particles = (0..cfg.population_size)
            .map(|_| {
                let position: Vec<f64> = (0..cfg.dimensions)
                    .map(|_| rng.gen_range(cfg.lower_bound..=cfg.upper_bound))
                    .collect();
                Particle {
                    velocity: vec![0.0; cfg.dimensions],
                    fitness: f64::INFINITY,
                    personal_best: position.clone(),
                    personal_best_fitness: f64::INFINITY,
                    position,
                }
            })
            .collect();

        let hoods = (0..cfg.population_size)
            .map(|i| neighborhood(cfg.topology, cfg.population_size, cfg.neighborhood_size, i))
            .collect();

        Ok(Self {
            cfg,
            rng,
            particles,
            hoods,
            generation: 0,
            history: Vec::new(),
            stop: StopHandle::new(),
        })
    }

    pub fn with_stop_handle(mut self, stop: StopHandle) -> Self {
        self.stop = stop;
        self
    }

    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    pub fn config(&self) -> &SwarmConfig {
        &self.cfg
    }

    pub fn particles(&self) -> &[Particle] {
        &self.particles
    }

    pub fn generation(&self) -> usize {
        self.generation
    }

    /// Minimum current fitness of every evaluated generation so far.
    pub fn history(&self) -> &[f64] {
        &self.history
    }

    /// Scores every current position and refreshes personal bests (strictly lower only).
    /// When several particles fail, the error of the lowest index is returned.
    pub fn evaluate<F: FitnessFunction>(&mut self, f: &F) -> Result<()> {
        let scores = self
            .particles
            .par_iter()
            .map(|p| f.evaluate(&p.position))
            .collect::<Vec<Result<f64>>>()
            .into_iter()
            .collect::<Result<Vec<f64>>>()?;

        for (p, score) in self.particles.iter_mut().zip(scores.iter()) {
            p.fitness = *score;
            if *score < p.personal_best_fitness {
                p.personal_best_fitness = *score;
                p.personal_best.clone_from(&p.position);
            }
        }

        if let Some(best) = Fitness::best_of(&scores) {
            debug!(generation = self.generation, min_fitness = best.value, "generation evaluated");
            self.history.push(best.value);
        }
        Ok(())
    }

    /// Best personal best in each particle's neighborhood. `ordinal` names the owner.
    pub fn neighborhood_bests(&self) -> Vec<Fitness> {
        let snapshot: Vec<f64> = self.particles.iter().map(|p| p.personal_best_fitness).collect();
        self.hoods
            .iter()
            .map(|hood| {
                hood.iter()
                    .map(|&j| Fitness::new(snapshot[j], j))
                    .min()
                    .unwrap_or_else(|| Fitness::new(f64::INFINITY, 0))
            })
            .collect()
    }

    /// Moves every particle once and advances the generation counter.
    pub fn step(&mut self) {
        let leaders: Vec<Vec<f64>> = self
            .neighborhood_bests()
            .iter()
            .map(|b| self.particles[b.ordinal].personal_best.clone())
            .collect();

        let (lower, upper) = (self.cfg.lower_bound, self.cfg.upper_bound);
        let (w, c1, c2) = (self.cfg.inertia, self.cfg.cognitive_rate, self.cfg.social_rate);

        for (p, nbest) in self.particles.iter_mut().zip(leaders.iter()) {
            for j in 0..p.position.len() {
                let r1: f64 = self.rng.gen();
                let r2: f64 = self.rng.gen();
                let x = p.position[j];
                p.velocity[j] = w * p.velocity[j]
                    + c1 * r1 * (p.personal_best[j] - x)
                    + c2 * r2 * (nbest[j] - x);
                p.position[j] = (x + p.velocity[j]).clamp(lower, upper);
            }
        }
        self.generation += 1;
    }

    /// Lowest current fitness in the population, ties to the lower index.
    pub fn best(&self) -> Option<Fitness> {
        self.particles
            .iter()
            .enumerate()
            .map(|(i, p)| Fitness::new(p.fitness, i))
            .min()
    }

    /// Evaluates the seeded population, then steps until `max_generations` or a stop.
    pub fn run<F: FitnessFunction>(mut self, f: &F) -> Result<SwarmOutcome> {
        self.evaluate(f)?;
        let termination = loop {
            if self.generation >= self.cfg.max_generations {
                break Termination::GenerationLimitReached;
            }
            if self.stop.is_stopped() {
                break Termination::Stopped;
            }
            self.step();
            self.evaluate(f)?;
        };

        Ok(SwarmOutcome {
            particles: self.particles,
            history: self.history,
            generations: self.generation,
            termination,
        })
    }
}

/// Final population of a finished run plus its convergence curve.
#[derive(Debug, Clone)]
pub struct SwarmOutcome {
    pub particles: Vec<Particle>,
    pub history: Vec<f64>,
    pub generations: usize,
    pub termination: Termination,
}

impl SwarmOutcome {
    pub fn best(&self) -> Option<(&Particle, Fitness)> {
        self.particles
            .iter()
            .enumerate()
            .map(|(i, p)| Fitness::new(p.fitness, i))
            .min()
            .map(|f| (&self.particles[f.ordinal], f))
    }
}
