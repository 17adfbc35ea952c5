// Joint particle filter over the positions of every hidden opponent
//
// Each particle is one complete hypothesis: a position per tracked agent. The
// population is unweighted; observation updates resample it with replacement in
// proportion to the likelihood of the readings.

use log::{debug, trace, warn};
use rand::distr::weighted::WeightedIndex;
use rand::seq::SliceRandom;
use rand::Rng;
use std::collections::HashMap;

use super::distribution::Distribution;
use crate::error::{AgentError, Result};
use crate::game::GameState;
use crate::types::{AgentId, Coord};

/// Upper bound on the size of a prior cross-product we are willing to
/// enumerate and shuffle. Larger products are sampled slot by slot.
const MAX_ENUMERATED_PRIOR: usize = 1 << 18;

/// One hypothesis of the hidden joint state
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Particle(Vec<Coord>);

impl Particle {
    pub fn new(positions: Vec<Coord>) -> Self {
        Particle(positions)
    }

    pub fn positions(&self) -> &[Coord] {
        &self.0
    }

    pub fn get(&self, slot: usize) -> Coord {
        self.0[slot]
    }

    fn set(&mut self, slot: usize, pos: Coord) {
        self.0[slot] = pos;
    }
}

/// Movement model of a hidden agent
///
/// Given a state in which every hidden agent has been placed at a hypothesized
/// position, returns the distribution over the agent's next position.
pub trait TransitionModel<S: GameState> {
    fn position_distribution<R: Rng + ?Sized>(
        &self,
        state: &S,
        agent: AgentId,
        rng: &mut R,
    ) -> Result<Distribution<Coord>>;
}

/// Particle filter shared by all agents of one team
#[derive(Debug, Clone)]
pub struct JointParticleFilter {
    num_particles: usize,
    pinned_population: usize,
    hidden: Vec<AgentId>,
    legal_positions: Vec<Coord>,
    start_positions: Vec<Coord>,
    particles: Vec<Particle>,
    marginals: Option<Vec<Distribution<Coord>>>,
}

impl JointParticleFilter {
    /// Creates an empty filter
    ///
    /// # Arguments
    /// * `num_particles` - Population size after the first full resample
    /// * `pinned_population` - Population size while pinned to the start
    ///   configuration; zero starts from the uniform prior instead
    pub fn new(num_particles: usize, pinned_population: usize) -> Self {
        JointParticleFilter {
            num_particles: num_particles.max(1),
            pinned_population,
            hidden: Vec::new(),
            legal_positions: Vec::new(),
            start_positions: Vec::new(),
            particles: Vec::new(),
            marginals: None,
        }
    }

    /// Stores the game geometry and seeds the population
    ///
    /// With a pinned population every particle starts at the known start
    /// configuration; the population only spreads to the uniform prior when
    /// a full resample is triggered.
    pub fn initialize<R: Rng + ?Sized>(
        &mut self,
        hidden: Vec<AgentId>,
        legal_positions: Vec<Coord>,
        start_positions: Vec<Coord>,
        rng: &mut R,
    ) -> Result<()> {
        if hidden.len() != start_positions.len() {
            return Err(AgentError::Config(format!(
                "{} hidden agents but {} start positions",
                hidden.len(),
                start_positions.len()
            )));
        }
        if legal_positions.is_empty() && !hidden.is_empty() {
            return Err(AgentError::Layout("no legal positions to track".to_string()));
        }

        self.hidden = hidden;
        self.legal_positions = legal_positions;
        self.start_positions = start_positions;

        if self.pinned_population > 0 {
            let pinned = Particle::new(self.start_positions.clone());
            self.particles = vec![pinned; self.pinned_population];
        } else {
            self.resample_uniform(rng);
        }
        self.invalidate();

        debug!(
            "Particle filter initialized: {} hidden agents, {} particles, {} legal positions",
            self.hidden.len(),
            self.particles.len(),
            self.legal_positions.len()
        );
        Ok(())
    }

    pub fn hidden_agents(&self) -> &[AgentId] {
        &self.hidden
    }

    pub fn particles(&self) -> &[Particle] {
        &self.particles
    }

    pub fn len(&self) -> usize {
        self.particles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.particles.is_empty()
    }

    /// Slot of a tracked agent inside each particle
    pub fn slot_of(&self, agent: AgentId) -> Option<usize> {
        self.hidden.iter().position(|&h| h == agent)
    }

    pub fn tracks(&self, agent: AgentId) -> bool {
        self.slot_of(agent).is_some()
    }

    /// Regenerates the population from the uniform prior over the
    /// cross-product of legal positions
    pub fn resample_uniform<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        let slots = self.hidden.len();
        let n = self.legal_positions.len();
        let product = n.checked_pow(slots as u32).unwrap_or(usize::MAX);

        self.particles = if product <= MAX_ENUMERATED_PRIOR {
            // Shuffle the full cross-product and cycle through it so the
            // particles cover the board evenly
            let mut combos: Vec<usize> = (0..product).collect();
            combos.shuffle(rng);
            combos
                .iter()
                .cycle()
                .take(self.num_particles)
                .map(|&combo| self.particle_from_index(combo))
                .collect()
        } else {
            (0..self.num_particles)
                .map(|_| {
                    Particle::new(
                        (0..slots)
                            .map(|_| self.legal_positions[rng.random_range(0..n)])
                            .collect(),
                    )
                })
                .collect()
        };
        self.invalidate();
    }

    /// Decodes a mixed-radix index into one particle of the cross-product
    fn particle_from_index(&self, mut combo: usize) -> Particle {
        let n = self.legal_positions.len();
        let mut positions = Vec::with_capacity(self.hidden.len());
        for _ in 0..self.hidden.len() {
            positions.push(self.legal_positions[combo % n]);
            combo /= n;
        }
        Particle::new(positions)
    }

    /// Sends one tracked agent back to its start position in every particle
    pub fn reset_agent(&mut self, agent: AgentId) -> Result<()> {
        let slot = self.slot_of(agent).ok_or(AgentError::UntrackedAgent(agent))?;
        self.send_to_capture(slot);
        Ok(())
    }

    fn send_to_capture(&mut self, slot: usize) {
        let capture = self.start_positions[slot];
        for particle in &mut self.particles {
            particle.set(slot, capture);
        }
        self.invalidate();
    }

    /// Advances one tracked agent by one move in every particle
    ///
    /// Only the coordinate of `agent` changes; the other coordinates are held
    /// at their hypothesized positions while the transition model runs on a
    /// hypothetical copy of `state`.
    pub fn elapse_time<S, M, R>(
        &mut self,
        state: &S,
        agent: AgentId,
        model: &M,
        rng: &mut R,
    ) -> Result<()>
    where
        S: GameState,
        M: TransitionModel<S>,
        R: Rng + ?Sized,
    {
        let slot = self.slot_of(agent).ok_or(AgentError::UntrackedAgent(agent))?;

        // One independent model query and draw per particle
        let mut next = Vec::with_capacity(self.particles.len());
        let mut hypothetical = state.clone();
        for particle in &self.particles {
            for (i, &hidden) in self.hidden.iter().enumerate() {
                hypothetical.set_agent_position(hidden, particle.get(i));
            }
            let dist = model.position_distribution(&hypothetical, agent, rng)?;

            let mut moved = particle.clone();
            if let Some(pos) = dist.sample(rng) {
                moved.set(slot, pos);
            }
            next.push(moved);
        }

        trace!("Elapsed time for agent {} over {} particles", agent, next.len());
        self.particles = next;
        self.invalidate();
        Ok(())
    }

    /// Incorporates one turn of readings taken from `observer`
    ///
    /// `readings[i]` belongs to the i-th tracked agent. Visible agents are set
    /// to their true position, agents without a signal are sent to their
    /// capture position, and the remaining coordinates weight the particle by
    /// the emission model. A total collapse regenerates the population from
    /// the uniform prior.
    pub fn observe_state<S, R>(
        &mut self,
        state: &S,
        observer: Coord,
        readings: &[Option<i32>],
        rng: &mut R,
    ) where
        S: GameState,
        R: Rng + ?Sized,
    {
        if readings.len() < self.hidden.len() {
            warn!(
                "Ignoring observation with {} readings for {} tracked agents",
                readings.len(),
                self.hidden.len()
            );
            return;
        }

        let visible: Vec<Option<Coord>> = self
            .hidden
            .iter()
            .map(|&agent| state.agent_position(agent))
            .collect();

        let mut weighted: Distribution<Particle> = Distribution::new();
        for particle in &self.particles {
            let mut hypothesis = particle.clone();
            let mut weight = 1.0;

            for slot in 0..self.hidden.len() {
                match (readings[slot], visible[slot]) {
                    (None, _) => hypothesis.set(slot, self.start_positions[slot]),
                    (Some(_), Some(pos)) => hypothesis.set(slot, pos),
                    (Some(noisy), None) => {
                        let distance = hypothesis.get(slot).manhattan(observer);
                        weight *= state.distance_probability(distance, noisy);
                    }
                }
            }

            weighted.add(hypothesis, weight);
        }

        // Fails when every weight is zero
        let population = self.particles.len();
        let entries = weighted.sorted();
        let resampled: Option<Vec<Particle>> = WeightedIndex::new(entries.iter().map(|(_, w)| *w))
            .ok()
            .map(|index| {
                (0..population)
                    .map(|_| entries[rng.sample(&index)].0.clone())
                    .collect()
            });

        match resampled {
            Some(particles) => {
                self.particles = particles;
                self.invalidate();
            }
            None => {
                debug!("All particles have zero likelihood, resampling from the prior");
                self.resample_uniform(rng);
                for slot in 0..self.hidden.len() {
                    if readings[slot].is_none() {
                        self.send_to_capture(slot);
                    }
                }
            }
        }
    }

    /// Normalized joint distribution obtained by counting particles
    pub fn belief_distribution(&self) -> Distribution<Particle> {
        self.particles
            .iter()
            .map(|p| (p.clone(), 1.0))
            .collect::<Distribution<Particle>>()
            .normalized()
    }

    /// Marginal distribution of one tracked agent
    ///
    /// Computed by summing the joint over every other slot and cached until
    /// the next update.
    pub fn marginal(&mut self, agent: AgentId) -> Result<Distribution<Coord>> {
        let slot = self.slot_of(agent).ok_or(AgentError::UntrackedAgent(agent))?;
        if self.marginals.is_none() {
            self.marginals = Some(self.compute_marginals());
        }
        Ok(self
            .marginals
            .as_ref()
            .map(|all| all[slot].clone())
            .unwrap_or_default())
    }

    /// Counts per slot, so equal counts give bit-identical probabilities
    fn compute_marginals(&self) -> Vec<Distribution<Coord>> {
        let total = self.particles.len() as f64;
        (0..self.hidden.len())
            .map(|slot| {
                let mut counts: HashMap<Coord, usize> = HashMap::new();
                for particle in &self.particles {
                    *counts.entry(particle.get(slot)).or_insert(0) += 1;
                }
                counts
                    .into_iter()
                    .map(|(pos, count)| (pos, count as f64 / total))
                    .collect()
            })
            .collect()
    }

    fn invalidate(&mut self) {
        self.marginals = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tracking::distribution::NORMALIZATION_EPSILON;
    use crate::tracking::tests_support::{Corridor, DriftEast};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn uniform_filter(
        state: &Corridor,
        hidden: Vec<AgentId>,
        particles: usize,
    ) -> JointParticleFilter {
        let mut rng = StdRng::seed_from_u64(3);
        let mut filter = JointParticleFilter::new(particles, 0);
        let starts = hidden.iter().map(|&h| state.initial_position(h)).collect();
        filter
            .initialize(hidden, state.legal_positions(), starts, &mut rng)
            .unwrap();
        filter
    }

    #[test]
    fn test_exact_reading_collapses_corridor_belief() {
        // Corridor [A, B, C] with the observer standing on B
        let mut state = Corridor::new(3, 1, 1);
        state.readings[1] = Some(0);
        let mut filter = uniform_filter(&state, vec![1], 30);
        let mut rng = StdRng::seed_from_u64(5);

        let before = filter.marginal(1).unwrap();
        assert_eq!(before.len(), 3, "uniform prior should cover A, B and C");

        filter.observe_state(&state, Coord::new(1, 0), &[Some(0)], &mut rng);

        let after = filter.marginal(1).unwrap();
        assert_eq!(after.len(), 1);
        assert!((after.get(&Coord::new(1, 0)) - 1.0).abs() < NORMALIZATION_EPSILON);
    }

    #[test]
    fn test_belief_distribution_is_normalized() {
        let state = Corridor::new(6, 0, 2);
        let filter = uniform_filter(&state, vec![1, 2], 100);
        let total = filter.belief_distribution().total();
        assert!((total - 1.0).abs() < NORMALIZATION_EPSILON);
        assert_eq!(filter.len(), 100);
    }

    #[test]
    fn test_marginals_match_grouped_joint() {
        let state = Corridor::new(5, 0, 2);
        let mut filter = uniform_filter(&state, vec![1, 2], 40);
        let joint = filter.belief_distribution();

        for (slot, agent) in [1usize, 2].into_iter().enumerate() {
            let mut grouped: Distribution<Coord> = Distribution::new();
            for (particle, prob) in joint.iter() {
                grouped.add(particle.get(slot), *prob);
            }
            let marginal = filter.marginal(agent).unwrap();
            for x in 0..5 {
                let c = Coord::new(x, 0);
                assert!((grouped.get(&c) - marginal.get(&c)).abs() < NORMALIZATION_EPSILON);
            }
        }
    }

    #[test]
    fn test_elapse_time_moves_only_one_coordinate() {
        let state = Corridor::new(6, 0, 2);
        let mut filter = uniform_filter(&state, vec![1, 2], 60);
        let before: Vec<Particle> = filter.particles().to_vec();
        let mut rng = StdRng::seed_from_u64(9);

        filter.elapse_time(&state, 2, &DriftEast, &mut rng).unwrap();

        for (old, new) in before.iter().zip(filter.particles()) {
            assert_eq!(old.get(0), new.get(0), "slot of agent 1 must not move");
            let expected = (old.get(1).x + 1).min(5);
            assert_eq!(new.get(1).x, expected);
        }
    }

    #[test]
    fn test_missing_reading_forces_capture_position() {
        let mut state = Corridor::new(6, 0, 2);
        state.starts[2] = Coord::new(5, 0);
        state.readings = vec![None, Some(2), None];
        let mut filter = uniform_filter(&state, vec![1, 2], 50);
        let mut rng = StdRng::seed_from_u64(1);

        // Exact emission: agent 1 must sit two cells east of the observer
        filter.observe_state(&state, Coord::new(0, 0), &[Some(2), None], &mut rng);

        assert!(filter.particles().iter().all(|p| p.get(1) == Coord::new(5, 0)));
        assert!(filter.particles().iter().all(|p| p.get(0) == Coord::new(2, 0)));
    }

    #[test]
    fn test_zero_likelihood_resamples_prior_and_keeps_capture() {
        let mut state = Corridor::new(4, 0, 2);
        state.starts[2] = Coord::new(3, 0);
        let mut filter = uniform_filter(&state, vec![1, 2], 32);
        let mut rng = StdRng::seed_from_u64(21);

        // A reading of 99 is impossible on a corridor of length 4
        filter.observe_state(&state, Coord::new(0, 0), &[Some(99), None], &mut rng);

        assert_eq!(filter.len(), 32);
        assert!(filter.particles().iter().all(|p| p.get(1) == Coord::new(3, 0)));
        let distinct: std::collections::HashSet<Coord> =
            filter.particles().iter().map(|p| p.get(0)).collect();
        assert!(distinct.len() > 1, "prior should spread agent 1 again");
    }

    #[test]
    fn test_pinned_population_starts_at_start_positions() {
        let state = Corridor::new(4, 0, 2);
        let mut rng = StdRng::seed_from_u64(2);
        let mut filter = JointParticleFilter::new(100, 4);
        filter
            .initialize(
                vec![1, 2],
                state.legal_positions(),
                vec![Coord::new(3, 0), Coord::new(2, 0)],
                &mut rng,
            )
            .unwrap();

        assert_eq!(filter.len(), 4);
        assert!(filter
            .particles()
            .iter()
            .all(|p| p.positions() == [Coord::new(3, 0), Coord::new(2, 0)]));

        filter.resample_uniform(&mut rng);
        assert_eq!(filter.len(), 100);
    }

    #[test]
    fn test_untracked_agent_is_rejected() {
        let state = Corridor::new(3, 0, 1);
        let mut filter = uniform_filter(&state, vec![1], 10);
        let mut rng = StdRng::seed_from_u64(2);
        let result = filter.elapse_time(&state, 0, &DriftEast, &mut rng);
        assert!(matches!(result, Err(AgentError::UntrackedAgent(0))));
    }
}
