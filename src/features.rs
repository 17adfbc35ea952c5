// Feature catalogue and linear evaluation
//
// Every feature is an independent computation over a candidate successor. It
// reads state queries, precomputed maze distances and the evaluating agent's
// belief marginals, never search state.

use rand::seq::IndexedRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};

use crate::agents::AgentContext;
use crate::error::{AgentError, Result};
use crate::game::{score_for, successor, GameState};
use crate::types::{AgentId, Coord, Direction};

/// Score feature value of a finished game we are winning
const WINNING_SCORE: f64 = 1.0e6;

/// Search radius of the food-down-path feature, in maze steps
const FOOD_PATH_MAX_STEPS: i32 = 5;

/// Sparse named feature values; absent names count as zero
///
/// Kept in name order so dot products always sum in the same order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeatureVector {
    values: BTreeMap<&'static str, f64>,
}

impl FeatureVector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: &'static str, value: f64) {
        self.values.insert(name, value);
    }

    pub fn get(&self, name: &str) -> f64 {
        self.values.get(name).copied().unwrap_or(0.0)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&&'static str, &f64)> {
        self.values.iter()
    }

    /// Dot product with a weight configuration. Features without a weight
    /// contribute nothing, so an unweighted infinite value never turns into
    /// NaN.
    pub fn dot(&self, weights: &Weights) -> f64 {
        self.values
            .iter()
            .filter_map(|(name, value)| weights.0.get(*name).map(|w| value * w))
            .sum()
    }
}

/// Sparse named weights; absent names count as zero
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(transparent)]
pub struct Weights(HashMap<String, f64>);

impl Weights {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> f64 {
        self.0.get(name).copied().unwrap_or(0.0)
    }

    pub fn set(&mut self, name: &str, value: f64) {
        self.0.insert(name.to_string(), value);
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<'a> FromIterator<(&'a str, f64)> for Weights {
    fn from_iter<I: IntoIterator<Item = (&'a str, f64)>>(iter: I) -> Self {
        Weights(iter.into_iter().map(|(k, v)| (k.to_string(), v)).collect())
    }
}

/// Linear utility of a (state, action) pair for one agent
pub trait Evaluator {
    fn features<S: GameState>(
        &self,
        ctx: &AgentContext<'_>,
        state: &S,
        action: Direction,
    ) -> Result<FeatureVector>;

    fn weights<S: GameState>(
        &self,
        ctx: &AgentContext<'_>,
        state: &S,
        action: Direction,
    ) -> &Weights;

    fn evaluate<S: GameState>(
        &self,
        ctx: &AgentContext<'_>,
        state: &S,
        action: Direction,
    ) -> Result<f64> {
        let features = self.features(ctx, state, action)?;
        Ok(features.dot(self.weights(ctx, state, action)))
    }

    /// Picks a legal action of maximum value, breaking ties uniformly at random
    fn choose<S: GameState, R: Rng + ?Sized>(
        &self,
        ctx: &AgentContext<'_>,
        state: &S,
        rng: &mut R,
    ) -> Result<Direction> {
        let mut best_value = f64::NEG_INFINITY;
        let mut best: Vec<Direction> = Vec::new();

        for action in state.legal_actions(ctx.index) {
            let value = self.evaluate(ctx, state, action)?;
            if best.is_empty() || value > best_value {
                best_value = value;
                best.clear();
                best.push(action);
            } else if value == best_value {
                best.push(action);
            }
        }

        best.choose(rng)
            .copied()
            .ok_or(AgentError::NoLegalActions(ctx.index))
    }
}

/// Catalogue of feature computations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Feature {
    Score,
    FoodDistance,
    OurFoodDistances,
    CapsuleDistance,
    GhostDistance,
    ScaredGhostDistance,
    PacmanDistance,
    BestFoodDistance,
    Disperse,
    Feasts,
    FoodDownPath,
    OnDefense,
    InvaderDistance,
    IsScared,
    IsDeadEnd,
    DontStop,
    DontReverse,
    Bias,
}

impl Feature {
    /// Computes this feature for `action` taken from `state`, writing into
    /// `out`. `next` is the successor of that action.
    pub fn compute<S: GameState>(
        &self,
        ctx: &AgentContext<'_>,
        state: &S,
        next: &S,
        action: Direction,
        out: &mut FeatureVector,
    ) {
        let me = match next.agent_position(ctx.index) {
            Some(pos) => pos,
            None => return,
        };

        match self {
            Feature::Score => {
                let score = score_for(next, ctx.team);
                let value = if next.is_over() && score > 0.0 {
                    WINNING_SCORE
                } else {
                    score
                };
                out.insert("score", value);
            }
            Feature::FoodDistance => {
                if let Some(d) = min_distance(next, me, &next.food(ctx.team.opponent())) {
                    out.insert("foodDistance", d as f64);
                }
            }
            Feature::OurFoodDistances => {
                let total: i32 = next
                    .food(ctx.team)
                    .iter()
                    .map(|&f| next.maze_distance(me, f))
                    .sum();
                out.insert("ourFoodDistances", total as f64);
            }
            Feature::CapsuleDistance => {
                let d = min_distance(next, me, &next.capsules(ctx.team.opponent())).unwrap_or(0);
                out.insert("capsuleDistance", d as f64);
            }
            Feature::GhostDistance => {
                let ghosts = enemy_estimates(ctx, next, |agent, pos| {
                    !on_our_side(ctx, next, pos) && next.scared_timer(agent) == 0
                });
                let d = min_distance(next, me, &ghosts).unwrap_or(0);
                out.insert("ghostDistance", d as f64);
            }
            Feature::ScaredGhostDistance => {
                let ghosts = enemy_estimates(ctx, next, |agent, pos| {
                    !on_our_side(ctx, next, pos) && next.scared_timer(agent) > 0
                });
                let d = min_distance(next, me, &ghosts).unwrap_or(0);
                out.insert("scaredGhostDistance", d as f64);
            }
            Feature::PacmanDistance => {
                let pacmen = enemy_estimates(ctx, next, |_, pos| on_our_side(ctx, next, pos));
                let d = min_distance(next, me, &pacmen).unwrap_or(0);
                out.insert("pacmanDistance", d as f64);
            }
            Feature::BestFoodDistance => best_food_distance(ctx, next, me, out),
            Feature::Disperse => {
                let total: i32 = next
                    .team_of(ctx.index)
                    .indices(next.num_agents())
                    .into_iter()
                    .filter_map(|mate| next.agent_position(mate))
                    .map(|p| next.maze_distance(me, p))
                    .sum();
                out.insert("disperse", total as f64);
            }
            Feature::Feasts => {
                out.insert("feasts", count_feasts(next, next.food(ctx.team.opponent())) as f64);
            }
            Feature::FoodDownPath => {
                let from = state.agent_position(ctx.index).unwrap_or(me);
                let count = food_down_path(next, from, me, &next.food(ctx.team.opponent()));
                out.insert("foodDownPath", count as f64);
            }
            Feature::OnDefense => {
                let value = if on_our_side(ctx, next, me) { 1.0 } else { -1.0 };
                out.insert("onDefense", value);
            }
            Feature::InvaderDistance => {
                let invaders: Vec<Coord> = ctx
                    .team
                    .opponent()
                    .indices(next.num_agents())
                    .into_iter()
                    .filter(|&enemy| next.is_pacman(enemy))
                    .filter_map(|enemy| next.agent_position(enemy))
                    .collect();
                out.insert("numInvaders", invaders.len() as f64);
                if let Some(d) = min_distance(next, me, &invaders) {
                    out.insert("invaderDistance", d as f64);
                }
            }
            Feature::IsScared => {
                if next.scared_timer(ctx.index) > 0 {
                    out.insert("isScared", 1.0);
                }
            }
            Feature::IsDeadEnd => {
                if next.is_dead_end(me) {
                    out.insert("isDeadEnd", 1.0);
                }
            }
            Feature::DontStop => {
                if action == Direction::Stop {
                    out.insert("dontStop", 1.0);
                }
            }
            Feature::DontReverse => {
                let reverse = state.agent_direction(ctx.index).reverse();
                if action != Direction::Stop && action == reverse {
                    out.insert("dontReverse", 1.0);
                }
            }
            Feature::Bias => out.insert("bias", 1.0),
        }
    }

    /// Runs every feature in `features` for one candidate action
    pub fn extract<S: GameState>(
        features: &[Feature],
        ctx: &AgentContext<'_>,
        state: &S,
        action: Direction,
    ) -> Result<FeatureVector> {
        let next = successor(state, ctx.index, action)?;
        let mut out = FeatureVector::new();
        for feature in features {
            feature.compute(ctx, state, &next, action, &mut out);
        }
        Ok(out)
    }
}

fn on_our_side<S: GameState>(ctx: &AgentContext<'_>, state: &S, pos: Coord) -> bool {
    ctx.team.owns_column(pos.x, state.width())
}

fn min_distance<S: GameState>(state: &S, from: Coord, targets: &[Coord]) -> Option<i32> {
    targets.iter().map(|&t| state.maze_distance(from, t)).min()
}

/// Most likely enemy positions, according to the evaluating agent's beliefs,
/// that satisfy `keep`
fn enemy_estimates<S, F>(ctx: &AgentContext<'_>, state: &S, keep: F) -> Vec<Coord>
where
    S: GameState,
    F: Fn(AgentId, Coord) -> bool,
{
    match ctx.beliefs() {
        Some(view) => view
            .modes(state)
            .into_iter()
            .filter(|&(agent, pos)| keep(agent, pos))
            .map(|(_, pos)| pos)
            .collect(),
        None => Vec::new(),
    }
}

/// Food that we reach relatively earliest compared with the closest enemy
fn best_food_distance<S: GameState>(
    ctx: &AgentContext<'_>,
    state: &S,
    me: Coord,
    out: &mut FeatureVector,
) {
    let food = state.food(ctx.team.opponent());
    let enemies: Vec<Coord> = ctx
        .beliefs()
        .map(|view| view.modes(state).into_iter().map(|(_, pos)| pos).collect())
        .unwrap_or_default();

    let best = food
        .iter()
        .map(|&f| {
            let ours = state.maze_distance(me, f);
            let theirs = min_distance(state, f, &enemies).unwrap_or(0);
            (ours, theirs)
        })
        .min_by_key(|&(ours, theirs)| ours - theirs);

    if let Some((ours, theirs)) = best {
        out.insert("agentFoodDistance", ours as f64);
        out.insert("ghostFoodDistance", theirs as f64);
    }
}

/// Number of groups of at least two adjacent pellets
fn count_feasts<S: GameState>(state: &S, mut food: Vec<Coord>) -> usize {
    food.sort();
    let mut remaining: Vec<Coord> = food;
    let mut feasts = 0;
    let mut i = 0;
    while i < remaining.len() {
        let anchor = remaining[i];
        let group: Vec<Coord> = remaining
            .iter()
            .copied()
            .filter(|&f| state.maze_distance(anchor, f) <= 1)
            .collect();
        if group.len() > 1 {
            remaining.retain(|f| !group.contains(f));
            feasts += 1;
        } else {
            i += 1;
        }
    }
    feasts
}

/// Pellets reachable from `to` within a few steps without passing back
/// through `from`
fn food_down_path<S: GameState>(state: &S, from: Coord, to: Coord, food: &[Coord]) -> usize {
    let food: HashSet<Coord> = food.iter().copied().collect();
    let mut visited: HashSet<Coord> = HashSet::new();
    if from != to {
        visited.insert(from);
    }
    let mut queue = VecDeque::from([to]);
    let mut count = 0;

    while let Some(pos) = queue.pop_front() {
        if !visited.insert(pos) {
            continue;
        }
        if food.contains(&pos) {
            count += 1;
        }
        for neighbor in state.legal_neighbors(pos) {
            if !visited.contains(&neighbor)
                && state.maze_distance(to, neighbor) < FOOD_PATH_MAX_STEPS
            {
                queue.push_back(neighbor);
            }
        }
    }
    count
}
