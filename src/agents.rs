// Team controller and opponent movement models
//
// A team owns one particle filter shared by all of its agents. Each agent
// turn runs the same pipeline: update beliefs, pick an action with the agent's
// strategy, record the decision.

use log::{debug, info};
use parking_lot::Mutex;
use rand::Rng;
use std::collections::HashMap;
use std::sync::Arc;

use crate::config::Config;
use crate::debug_logger::{BeliefEntry, DebugLogger};
use crate::error::{AgentError, Result};
use crate::game::{successor, GameState};
use crate::strategy::Strategy;
use crate::tracking::{
    BeliefView, Distribution, GroundTruth, JointParticleFilter, SharedFilter, Tracker,
    TransitionModel,
};
use crate::types::{AgentId, Coord, Direction, Team};

/// Perspective of one agent: who it is and what it believes about the others
///
/// `views` is indexed by agent id and holds one view per agent in the game.
#[derive(Debug, Clone, Copy)]
pub struct AgentContext<'a> {
    pub index: AgentId,
    pub team: Team,
    views: &'a [BeliefView],
}

impl<'a> AgentContext<'a> {
    pub fn new(index: AgentId, views: &'a [BeliefView]) -> Self {
        AgentContext {
            index,
            team: Team::of(index),
            views,
        }
    }

    /// The agent's own belief view, if there is one
    pub fn beliefs(&self) -> Option<&'a BeliefView> {
        self.views.get(self.index)
    }

    /// Same set of views, seen from another agent
    pub fn for_agent(&self, other: AgentId) -> AgentContext<'a> {
        AgentContext::new(other, self.views)
    }
}

/// Assumed behavior of one opponent
#[derive(Debug, Clone)]
pub struct OpponentModel {
    pub index: AgentId,
    pub strategy: Strategy,
    /// Probability of following the strategy's choice
    pub stickiness: f64,
}

impl OpponentModel {
    /// Distribution over the opponent's next position
    ///
    /// The action the modeled strategy picks gets `stickiness`; every other
    /// legal action shares the rest evenly.
    pub fn position_distribution<S, R>(
        &self,
        state: &S,
        views: &[BeliefView],
        rng: &mut R,
    ) -> Result<Distribution<Coord>>
    where
        S: GameState,
        R: Rng + ?Sized,
    {
        let legal = state.legal_actions(self.index);
        if legal.is_empty() {
            return Ok(state
                .agent_position(self.index)
                .map(Distribution::point)
                .unwrap_or_default());
        }

        let ctx = AgentContext::new(self.index, views);
        let chosen = self.strategy.choose(&ctx, state, rng)?;
        let others = (legal.len() - 1) as f64;

        let mut dist = Distribution::new();
        for action in legal {
            let probability = if action == chosen {
                if others == 0.0 {
                    1.0
                } else {
                    self.stickiness
                }
            } else {
                (1.0 - self.stickiness) / others
            };
            let next = successor(state, self.index, action)?;
            if let Some(pos) = next.agent_position(self.index) {
                dist.add(pos, probability);
            }
        }
        Ok(dist.normalized())
    }
}

/// Transition model over every modeled opponent of a team
///
/// The views given to the models must not share the team's filter: the filter
/// is locked while the models run.
pub struct ModeledOpponents<'a> {
    models: &'a [OpponentModel],
    views: &'a [BeliefView],
}

impl<'a> ModeledOpponents<'a> {
    pub fn new(models: &'a [OpponentModel], views: &'a [BeliefView]) -> Self {
        ModeledOpponents { models, views }
    }
}

impl<S: GameState> TransitionModel<S> for ModeledOpponents<'_> {
    fn position_distribution<R: Rng + ?Sized>(
        &self,
        state: &S,
        agent: AgentId,
        rng: &mut R,
    ) -> Result<Distribution<Coord>> {
        let model = self
            .models
            .iter()
            .find(|m| m.index == agent)
            .ok_or(AgentError::UntrackedAgent(agent))?;
        model.position_distribution(state, self.views, rng)
    }
}

/// Every agent in the game sees its opponents exactly
fn ground_truth_views(num_agents: usize) -> Vec<BeliefView> {
    (0..num_agents)
        .map(|i| {
            let targets = Team::of(i).opponent().indices(num_agents);
            BeliefView::GroundTruth(GroundTruth::new(i, targets))
        })
        .collect()
}

/// Controls all agents of one side
pub struct TeamController {
    side: Team,
    config: Config,
    filter: SharedFilter,
    /// Indexed by agent id: trackers for our agents, ground truth for theirs
    views: Vec<BeliefView>,
    /// Views handed to opponent models, all ground truth
    model_views: Vec<BeliefView>,
    models: Vec<OpponentModel>,
    strategies: HashMap<AgentId, Strategy>,
    logger: DebugLogger,
    turn: u32,
}

impl TeamController {
    /// Creates a controller; nothing is usable before
    /// [`TeamController::register_initial_state`]
    pub fn new(side: Team, config: &Config) -> Self {
        let filter = JointParticleFilter::new(
            config.tracking.num_particles,
            config.tracking.pinned_population,
        );
        TeamController {
            side,
            config: config.clone(),
            filter: Arc::new(Mutex::new(filter)),
            views: Vec::new(),
            model_views: Vec::new(),
            models: Vec::new(),
            strategies: HashMap::new(),
            logger: DebugLogger::disabled(),
            turn: 0,
        }
    }

    pub fn with_logger(mut self, logger: DebugLogger) -> Self {
        self.logger = logger;
        self
    }

    /// Sets up tracking, opponent models and strategies for a new game
    pub fn register_initial_state<S: GameState, R: Rng + ?Sized>(
        &mut self,
        state: &S,
        rng: &mut R,
    ) -> Result<()> {
        let n = state.num_agents();
        let ours = self.side.indices(n);
        let theirs = self.side.opponent().indices(n);
        let starts: Vec<Coord> = theirs.iter().map(|&i| state.initial_position(i)).collect();

        self.filter
            .lock()
            .initialize(theirs.clone(), state.legal_positions(), starts, rng)?;

        self.views = (0..n)
            .map(|i| {
                if ours.contains(&i) {
                    BeliefView::Tracking(Tracker::new(i, self.filter.clone()))
                } else {
                    BeliefView::GroundTruth(GroundTruth::new(i, ours.clone()))
                }
            })
            .collect();
        self.model_views = ground_truth_views(n);

        let weights = &self.config.weights;
        let search = &self.config.search;
        let opponent_strategy =
            Strategy::from_spec(&self.config.tracking.opponent_strategy, weights, search);
        self.models = theirs
            .iter()
            .map(|&index| OpponentModel {
                index,
                strategy: opponent_strategy.clone(),
                stickiness: self.config.tracking.opponent_stickiness,
            })
            .collect();

        self.strategies = ours
            .iter()
            .enumerate()
            .map(|(slot, &index)| {
                let spec = self.config.team.strategy_for(slot);
                (index, Strategy::from_spec(&spec, weights, search))
            })
            .collect();
        self.turn = 0;

        for (index, strategy) in &self.strategies {
            info!("{:?} agent {} plays {}", self.side, index, strategy.name());
        }
        Ok(())
    }

    /// Runs one turn for `agent`: belief update, then action selection
    ///
    /// # Arguments
    /// * `agent` - One of this team's agents
    /// * `state` - The state as observed by `agent`
    pub fn choose_action<S: GameState, R: Rng + ?Sized>(
        &mut self,
        agent: AgentId,
        state: &S,
        rng: &mut R,
    ) -> Result<Direction> {
        let strategy = self.strategies.get(&agent).ok_or(AgentError::NotOnTeam(agent))?;
        let view = self.views.get(agent).ok_or(AgentError::NotOnTeam(agent))?;

        let model = ModeledOpponents::new(&self.models, &self.model_views);
        view.observe(state, &model, rng)?;

        let ctx = AgentContext::new(agent, &self.views);
        let action = strategy.choose(&ctx, state, rng)?;
        debug!("Turn {}: agent {} ({}) chose {}", self.turn, agent, strategy.name(), action);

        if self.logger.is_enabled() {
            let beliefs: Vec<BeliefEntry> = view
                .modes(state)
                .into_iter()
                .map(|(agent, position)| BeliefEntry { agent, position })
                .collect();
            self.logger.log_move(self.turn, agent, &strategy.name(), action, &beliefs);
        }

        self.turn += 1;
        Ok(action)
    }

    pub fn side(&self) -> Team {
        self.side
    }

    pub fn filter(&self) -> &SharedFilter {
        &self.filter
    }

    pub fn view(&self, agent: AgentId) -> Option<&BeliefView> {
        self.views.get(agent)
    }

    /// Number of decisions taken so far
    pub fn turn(&self) -> u32 {
        self.turn
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arena::tests_support::open_board;
    use crate::strategy::StrategySpec;
    use crate::tracking::NORMALIZATION_EPSILON;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_stickiness_splits_probability() {
        let state = open_board(9, 5, 2);
        let views = ground_truth_views(2);
        let model = OpponentModel {
            index: 1,
            strategy: Strategy::Nothing,
            stickiness: 0.6,
        };
        let mut rng = StdRng::seed_from_u64(5);

        let here = state.agent_position(1).unwrap();
        let legal = state.legal_actions(1);
        let dist = model.position_distribution(&state, &views, &mut rng).unwrap();

        assert!((dist.total() - 1.0).abs() < NORMALIZATION_EPSILON);
        assert!((dist.get(&here) - 0.6).abs() < NORMALIZATION_EPSILON);
        let share = 0.4 / (legal.len() - 1) as f64;
        let moved = Direction::East.apply(&here);
        assert!((dist.get(&moved) - share).abs() < NORMALIZATION_EPSILON);
    }

    #[test]
    fn test_pinned_population_spreads_evenly_under_random_model() {
        let state = open_board(11, 5, 2);
        let start = state.initial_position(1);
        let views = ground_truth_views(2);
        let models = vec![OpponentModel {
            index: 1,
            strategy: Strategy::Random,
            stickiness: 0.5,
        }];
        let mut rng = StdRng::seed_from_u64(8);
        let mut filter = JointParticleFilter::new(1000, 1000);
        filter
            .initialize(vec![1], state.legal_positions(), vec![start], &mut rng)
            .unwrap();

        filter
            .elapse_time(&state, 1, &ModeledOpponents::new(&models, &views), &mut rng)
            .unwrap();

        // Each of the five reachable cells should hold about a fifth
        let mut counts: HashMap<Coord, usize> = HashMap::new();
        for particle in filter.particles() {
            *counts.entry(particle.get(0)).or_insert(0) += 1;
        }
        assert_eq!(counts.len(), 5);
        for (cell, count) in counts {
            assert!((120..=280).contains(&count), "{} holds {} particles", cell, count);
        }
    }

    #[test]
    fn test_context_switches_perspective() {
        let views = ground_truth_views(4);
        let ctx = AgentContext::new(0, &views);
        let other = ctx.for_agent(3);
        assert_eq!(ctx.team, Team::Red);
        assert_eq!(other.team, Team::Blue);
        assert_eq!(other.beliefs().map(|v| v.index()), Some(3));
    }

    #[test]
    fn test_controller_tracks_opponents_and_rejects_foreign_agents() {
        let state = open_board(10, 6, 4);
        let mut config = Config::default_hardcoded();
        config.tracking.num_particles = 50;
        config.tracking.pinned_population = 50;
        config.team.strategies = vec![StrategySpec::Random];

        let mut rng = StdRng::seed_from_u64(6);
        let mut red = TeamController::new(Team::Red, &config);
        red.register_initial_state(&state, &mut rng).unwrap();

        assert_eq!(red.filter().lock().hidden_agents(), &[1, 3]);
        assert!(matches!(red.view(0), Some(BeliefView::Tracking(_))));
        assert!(matches!(red.view(1), Some(BeliefView::GroundTruth(_))));

        let action = red.choose_action(0, &state, &mut rng).unwrap();
        assert!(state.legal_actions(0).contains(&action));
        assert_eq!(red.turn(), 1);

        assert!(matches!(
            red.choose_action(1, &state, &mut rng),
            Err(AgentError::NotOnTeam(1))
        ));
    }
}
