// Per-agent views onto beliefs about other agents' positions

use log::trace;
use parking_lot::Mutex;
use rand::Rng;
use std::sync::Arc;

use super::distribution::Distribution;
use super::filter::{JointParticleFilter, TransitionModel};
use crate::error::{AgentError, Result};
use crate::game::GameState;
use crate::types::{AgentId, Coord};

/// The one particle population shared by every view of a team
pub type SharedFilter = Arc<Mutex<JointParticleFilter>>;

/// Drives the shared filter on behalf of one observing agent
#[derive(Debug, Clone)]
pub struct Tracker {
    index: AgentId,
    filter: SharedFilter,
}

impl Tracker {
    pub fn new(index: AgentId, filter: SharedFilter) -> Self {
        Tracker { index, filter }
    }

    pub fn filter(&self) -> &SharedFilter {
        &self.filter
    }

    /// Elapses time for the agent that moved just before us, then folds in
    /// this turn's readings. The order matters: the filter has to catch up
    /// with the previous move before the new evidence is weighed.
    pub fn observe<S, M, R>(&self, state: &S, model: &M, rng: &mut R) -> Result<()>
    where
        S: GameState,
        M: TransitionModel<S>,
        R: Rng + ?Sized,
    {
        let n = state.num_agents();
        let previous = (self.index + n - 1) % n;
        let observer = state
            .agent_position(self.index)
            .ok_or(AgentError::UnknownPosition(self.index))?;

        let mut filter = self.filter.lock();
        if filter.tracks(previous) {
            filter.elapse_time(state, previous, model, rng)?;
        } else {
            trace!("Agent {} is not tracked, skipping time update", previous);
        }

        let readings: Vec<Option<i32>> = filter
            .hidden_agents()
            .iter()
            .map(|&agent| state.noisy_distance(agent))
            .collect();
        filter.observe_state(state, observer, &readings, rng);
        Ok(())
    }

    pub fn marginal(&self, agent: AgentId) -> Result<Distribution<Coord>> {
        self.filter.lock().marginal(agent)
    }

    pub fn tracked_agents(&self) -> Vec<AgentId> {
        self.filter.lock().hidden_agents().to_vec()
    }
}

/// View used for simulated players, which know where everyone is
#[derive(Debug, Clone)]
pub struct GroundTruth {
    index: AgentId,
    targets: Vec<AgentId>,
}

impl GroundTruth {
    /// # Arguments
    /// * `index` - Agent owning the view
    /// * `targets` - Agents the view reports on
    pub fn new(index: AgentId, targets: Vec<AgentId>) -> Self {
        GroundTruth { index, targets }
    }

    pub fn marginal<S: GameState>(&self, state: &S, agent: AgentId) -> Distribution<Coord> {
        state
            .agent_position(agent)
            .map(Distribution::point)
            .unwrap_or_default()
    }
}

/// Belief about other agents as seen by one agent
#[derive(Debug, Clone)]
pub enum BeliefView {
    /// Inference through the team's shared particle filter
    Tracking(Tracker),
    /// Exact positions read from the state
    GroundTruth(GroundTruth),
}

impl BeliefView {
    pub fn index(&self) -> AgentId {
        match self {
            BeliefView::Tracking(tracker) => tracker.index,
            BeliefView::GroundTruth(truth) => truth.index,
        }
    }

    /// Agents this view holds beliefs about, in a stable order
    pub fn tracked_agents(&self) -> Vec<AgentId> {
        match self {
            BeliefView::Tracking(tracker) => tracker.tracked_agents(),
            BeliefView::GroundTruth(truth) => truth.targets.clone(),
        }
    }

    /// Updates beliefs with the current state. A no-op for ground truth.
    pub fn observe<S, M, R>(&self, state: &S, model: &M, rng: &mut R) -> Result<()>
    where
        S: GameState,
        M: TransitionModel<S>,
        R: Rng + ?Sized,
    {
        match self {
            BeliefView::Tracking(tracker) => tracker.observe(state, model, rng),
            BeliefView::GroundTruth(_) => Ok(()),
        }
    }

    /// Distribution over the position of `agent`
    pub fn marginal<S: GameState>(&self, state: &S, agent: AgentId) -> Result<Distribution<Coord>> {
        match self {
            BeliefView::Tracking(tracker) => tracker.marginal(agent),
            BeliefView::GroundTruth(truth) => Ok(truth.marginal(state, agent)),
        }
    }

    /// Most likely position of `agent`
    pub fn mode<S: GameState>(&self, state: &S, agent: AgentId) -> Option<Coord> {
        self.marginal(state, agent).ok().and_then(|d| d.arg_max())
    }

    /// One marginal per tracked agent, computed lazily
    ///
    /// The iterator is finite and can be cloned to restart it.
    pub fn marginals<'a, S: GameState>(&'a self, state: &'a S) -> Marginals<'a, S> {
        Marginals {
            view: self,
            state,
            agents: self.tracked_agents(),
            next: 0,
        }
    }

    /// Most likely position of every tracked agent that has one
    pub fn modes<S: GameState>(&self, state: &S) -> Vec<(AgentId, Coord)> {
        self.marginals(state)
            .filter_map(|(agent, dist)| dist.arg_max().map(|pos| (agent, pos)))
            .collect()
    }
}

/// Lazy sequence of `(agent, marginal)` pairs
#[derive(Clone)]
pub struct Marginals<'a, S: GameState> {
    view: &'a BeliefView,
    state: &'a S,
    agents: Vec<AgentId>,
    next: usize,
}

impl<'a, S: GameState> Iterator for Marginals<'a, S> {
    type Item = (AgentId, Distribution<Coord>);

    fn next(&mut self) -> Option<Self::Item> {
        let agent = *self.agents.get(self.next)?;
        self.next += 1;
        let dist = self.view.marginal(self.state, agent).unwrap_or_default();
        Some((agent, dist))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.agents.len() - self.next;
        (remaining, Some(remaining))
    }
}
