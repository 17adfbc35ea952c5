// Action-selection strategies
//
// A strategy is resolved once from its configuration entry into a value that
// owns everything it needs (feature set, weights, search settings). Choosing an
// action never looks anything up by name.

use log::debug;
use rand::seq::IndexedRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::agents::AgentContext;
use crate::config::{SearchConfig, WeightsConfig};
use crate::error::{AgentError, Result};
use crate::features::{Evaluator, Feature, FeatureVector, Weights};
use crate::game::GameState;
use crate::search::NegamaxSearch;
use crate::types::Direction;

const OFFENSIVE_FEATURES: &[Feature] = &[
    Feature::Score,
    Feature::GhostDistance,
    Feature::FoodDistance,
    Feature::BestFoodDistance,
    Feature::Disperse,
    Feature::Feasts,
    Feature::FoodDownPath,
    Feature::CapsuleDistance,
    Feature::ScaredGhostDistance,
    Feature::IsDeadEnd,
    Feature::DontStop,
];

const DEFENSIVE_FEATURES: &[Feature] = &[
    Feature::PacmanDistance,
    Feature::OurFoodDistances,
    Feature::OnDefense,
    Feature::Disperse,
    Feature::Feasts,
    Feature::InvaderDistance,
    Feature::IsScared,
    Feature::DontStop,
    Feature::DontReverse,
];

const BASELINE_OFFENSIVE_FEATURES: &[Feature] = &[Feature::Score, Feature::FoodDistance];

const BASELINE_DEFENSIVE_FEATURES: &[Feature] = &[
    Feature::OnDefense,
    Feature::InvaderDistance,
    Feature::DontStop,
    Feature::DontReverse,
];

const SELECTOR_FEATURES: &[Feature] = &[Feature::OnDefense, Feature::Bias];

/// Linear feature sets available to agents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LinearKind {
    Offensive,
    Defensive,
    BaselineOffensive,
    BaselineDefensive,
}

impl LinearKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            LinearKind::Offensive => "offensive",
            LinearKind::Defensive => "defensive",
            LinearKind::BaselineOffensive => "baseline_offensive",
            LinearKind::BaselineDefensive => "baseline_defensive",
        }
    }

    fn features(&self) -> &'static [Feature] {
        match self {
            LinearKind::Offensive => OFFENSIVE_FEATURES,
            LinearKind::Defensive => DEFENSIVE_FEATURES,
            LinearKind::BaselineOffensive => BASELINE_OFFENSIVE_FEATURES,
            LinearKind::BaselineDefensive => BASELINE_DEFENSIVE_FEATURES,
        }
    }

    fn weights(&self, config: &WeightsConfig) -> Weights {
        match self {
            LinearKind::Offensive => config.offensive.clone(),
            LinearKind::Defensive => config.defensive.clone(),
            LinearKind::BaselineOffensive => config.baseline_offensive.clone(),
            LinearKind::BaselineDefensive => config.baseline_defensive.clone(),
        }
    }
}

/// Strategy as written in configuration
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StrategySpec {
    Nothing,
    Random,
    Offensive,
    Defensive,
    BaselineOffensive,
    BaselineDefensive,
    /// Defensive while on our half, offensive otherwise
    BaselineAdaptive,
    /// `first` while on our half, `second` otherwise
    Adaptive {
        first: Box<StrategySpec>,
        second: Box<StrategySpec>,
    },
    Negamax { nested: LinearKind, depth: i32 },
}

/// Feature set plus the weights it is scored with
#[derive(Debug, Clone)]
pub struct LinearStrategy {
    name: &'static str,
    features: &'static [Feature],
    weights: Weights,
}

impl LinearStrategy {
    pub fn new(kind: LinearKind, weights: Weights) -> Self {
        LinearStrategy {
            name: kind.as_str(),
            features: kind.features(),
            weights,
        }
    }

    /// Selector of the adaptive strategy: positive on the enemy half
    pub fn selector(weights: Weights) -> Self {
        LinearStrategy {
            name: "adaptive_selector",
            features: SELECTOR_FEATURES,
            weights,
        }
    }

    /// Any feature set with explicit weights
    pub fn custom(name: &'static str, features: &'static [Feature], weights: Weights) -> Self {
        LinearStrategy {
            name,
            features,
            weights,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl Evaluator for LinearStrategy {
    fn features<S: GameState>(
        &self,
        ctx: &AgentContext<'_>,
        state: &S,
        action: Direction,
    ) -> Result<FeatureVector> {
        Feature::extract(self.features, ctx, state, action)
    }

    fn weights<S: GameState>(
        &self,
        _ctx: &AgentContext<'_>,
        _state: &S,
        _action: Direction,
    ) -> &Weights {
        &self.weights
    }
}

/// Resolved action-selection policy of one agent
#[derive(Debug, Clone)]
pub enum Strategy {
    /// Always stands still
    Nothing,
    /// Uniformly random legal action
    Random,
    Linear(LinearStrategy),
    /// Uses `first` when the selector scores the current state below zero,
    /// `second` otherwise
    Adaptive {
        selector: LinearStrategy,
        first: Box<Strategy>,
        second: Box<Strategy>,
    },
    Negamax(NegamaxSearch<LinearStrategy>),
}

impl Strategy {
    /// Builds the strategy described by `spec`
    ///
    /// # Arguments
    /// * `spec` - Strategy as configured
    /// * `weights` - Weight sets for every linear strategy
    /// * `search` - Search settings applied to negamax strategies
    pub fn from_spec(
        spec: &StrategySpec,
        weights: &WeightsConfig,
        search: &SearchConfig,
    ) -> Strategy {
        let linear = |kind: LinearKind| LinearStrategy::new(kind, kind.weights(weights));

        match spec {
            StrategySpec::Nothing => Strategy::Nothing,
            StrategySpec::Random => Strategy::Random,
            StrategySpec::Offensive => Strategy::Linear(linear(LinearKind::Offensive)),
            StrategySpec::Defensive => Strategy::Linear(linear(LinearKind::Defensive)),
            StrategySpec::BaselineOffensive => {
                Strategy::Linear(linear(LinearKind::BaselineOffensive))
            }
            StrategySpec::BaselineDefensive => {
                Strategy::Linear(linear(LinearKind::BaselineDefensive))
            }
            StrategySpec::BaselineAdaptive => Strategy::Adaptive {
                selector: LinearStrategy::selector(weights.adaptive.clone()),
                first: Box::new(Strategy::Linear(linear(LinearKind::BaselineDefensive))),
                second: Box::new(Strategy::Linear(linear(LinearKind::BaselineOffensive))),
            },
            StrategySpec::Adaptive { first, second } => Strategy::Adaptive {
                selector: LinearStrategy::selector(weights.adaptive.clone()),
                first: Box::new(Strategy::from_spec(first, weights, search)),
                second: Box::new(Strategy::from_spec(second, weights, search)),
            },
            StrategySpec::Negamax { nested, depth } => Strategy::Negamax(
                NegamaxSearch::new(linear(*nested), *depth)
                    .with_pruning(search.pruning)
                    .with_leaf_mode(search.leaf_mode),
            ),
        }
    }

    pub fn name(&self) -> String {
        match self {
            Strategy::Nothing => "nothing".to_string(),
            Strategy::Random => "random".to_string(),
            Strategy::Linear(linear) => linear.name().to_string(),
            Strategy::Adaptive { first, second, .. } => {
                format!("adaptive({}, {})", first.name(), second.name())
            }
            Strategy::Negamax(search) => {
                format!("negamax({}, {})", search.evaluator().name(), search.depth())
            }
        }
    }

    /// Picks the agent's next action
    pub fn choose<S: GameState, R: Rng + ?Sized>(
        &self,
        ctx: &AgentContext<'_>,
        state: &S,
        rng: &mut R,
    ) -> Result<Direction> {
        match self {
            Strategy::Nothing => Ok(Direction::Stop),
            Strategy::Random => state
                .legal_actions(ctx.index)
                .choose(rng)
                .copied()
                .ok_or(AgentError::NoLegalActions(ctx.index)),
            Strategy::Linear(linear) => linear.choose(ctx, state, rng),
            Strategy::Adaptive {
                selector,
                first,
                second,
            } => {
                let current = selector.evaluate(ctx, state, Direction::Stop)?;
                if current < 0.0 {
                    debug!("Agent {} adapts to {}", ctx.index, first.name());
                    first.choose(ctx, state, rng)
                } else {
                    debug!("Agent {} adapts to {}", ctx.index, second.name());
                    second.choose(ctx, state, rng)
                }
            }
            Strategy::Negamax(search) => search
                .search(ctx, state, search.depth())?
                .action
                .ok_or(AgentError::NoLegalActions(ctx.index)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arena::tests_support::open_board;
    use crate::config::Config;
    use crate::tracking::{BeliefView, GroundTruth};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn truth_views(n: usize) -> Vec<BeliefView> {
        (0..n)
            .map(|i| {
                let others = (0..n).filter(|&j| j != i).collect();
                BeliefView::GroundTruth(GroundTruth::new(i, others))
            })
            .collect()
    }

    #[test]
    fn test_nothing_always_stops() {
        let state = open_board(6, 4, 2);
        let views = truth_views(2);
        let ctx = AgentContext::new(0, &views);
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(Strategy::Nothing.choose(&ctx, &state, &mut rng).unwrap(), Direction::Stop);
    }

    #[test]
    fn test_random_picks_legal_actions() {
        let state = open_board(6, 4, 2);
        let views = truth_views(2);
        let ctx = AgentContext::new(0, &views);
        let mut rng = StdRng::seed_from_u64(2);
        let legal = state.legal_actions(0);
        for _ in 0..20 {
            let action = Strategy::Random.choose(&ctx, &state, &mut rng).unwrap();
            assert!(legal.contains(&action));
        }
    }

    #[test]
    fn test_spec_parses_from_toml() {
        #[derive(Deserialize)]
        struct Wrapper {
            strategy: StrategySpec,
        }
        let parsed: Wrapper = toml::from_str(
            r#"
            [strategy]
            kind = "negamax"
            nested = "defensive"
            depth = 3
            "#,
        )
        .unwrap();
        assert_eq!(
            parsed.strategy,
            StrategySpec::Negamax {
                nested: LinearKind::Defensive,
                depth: 3
            }
        );
    }

    #[test]
    fn test_from_spec_resolves_names() {
        let config = Config::default_hardcoded();
        let adaptive =
            Strategy::from_spec(&StrategySpec::BaselineAdaptive, &config.weights, &config.search);
        assert_eq!(adaptive.name(), "adaptive(baseline_defensive, baseline_offensive)");

        let negamax = Strategy::from_spec(
            &StrategySpec::Negamax {
                nested: LinearKind::Offensive,
                depth: 2,
            },
            &config.weights,
            &config.search,
        );
        assert_eq!(negamax.name(), "negamax(offensive, 2)");
    }

    #[test]
    fn test_adaptive_nests_any_strategies() {
        #[derive(Deserialize)]
        struct Wrapper {
            strategy: StrategySpec,
        }
        let parsed: Wrapper = toml::from_str(
            r#"
            [strategy]
            kind = "adaptive"
            first = { kind = "nothing" }
            second = { kind = "adaptive", first = { kind = "random" }, second = { kind = "negamax", nested = "offensive", depth = 1 } }
            "#,
        )
        .unwrap();

        let config = Config::default_hardcoded();
        let strategy = Strategy::from_spec(&parsed.strategy, &config.weights, &config.search);
        assert_eq!(strategy.name(), "adaptive(nothing, adaptive(random, negamax(offensive, 1)))");

        // Agent 0 starts on its own half, where the selector picks `first`
        let state = open_board(8, 3, 2);
        let views = truth_views(2);
        let ctx = AgentContext::new(0, &views);
        let mut rng = StdRng::seed_from_u64(4);
        assert_eq!(strategy.choose(&ctx, &state, &mut rng).unwrap(), Direction::Stop);
    }

    #[test]
    fn test_linear_choice_maximizes_value() {
        let state = open_board(8, 3, 2);
        let views = truth_views(2);
        let ctx = AgentContext::new(0, &views);
        let mut rng = StdRng::seed_from_u64(3);

        // Only stopping is penalized, so any move beats Stop
        let weights: Weights = [("dontStop", -10.0)].into_iter().collect();
        let strategy = LinearStrategy::custom("stop_averse", &[Feature::DontStop], weights);
        for _ in 0..10 {
            assert_ne!(strategy.choose(&ctx, &state, &mut rng).unwrap(), Direction::Stop);
        }
    }
}
