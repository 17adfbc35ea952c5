// Bounded-depth negamax search with alpha-beta pruning
//
// Every ply is evaluated from the point of view of the agent to move; a child's
// value is negated on the way up. Agents whose positions are hidden are placed
// at their most likely position before they move, on a private copy of the
// state.

use log::debug;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;

use crate::agents::AgentContext;
use crate::error::Result;
use crate::features::Evaluator;
use crate::game::{score_for, successor, GameState};
use crate::types::{AgentId, Direction};

/// How leaf plies are scored
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LeafMode {
    /// The evaluator's utility of the action for the agent to move
    #[default]
    Utility,
    /// Game score of the successor, seen from the root team, times the ply's sign
    Score,
}

/// Counters collected during one search
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SearchStats {
    pub nodes: u64,
    pub leaves: u64,
    pub cutoffs: u64,
    pub substitutions: u64,
}

/// Outcome of a search from the root agent's point of view
#[derive(Debug, Clone, PartialEq)]
pub struct SearchResult {
    pub value: f64,
    /// `None` when the root agent has no legal action
    pub action: Option<Direction>,
    pub stats: SearchStats,
}

/// One node of the game tree
#[derive(Debug, Clone, Copy)]
struct Ply {
    depth: i32,
    mover: AgentId,
    /// +1 on plies of the root agent's parity, -1 otherwise
    sign: f64,
    alpha: f64,
    beta: f64,
}

/// Negamax over a nested evaluator
#[derive(Debug, Clone)]
pub struct NegamaxSearch<E> {
    evaluator: E,
    depth: i32,
    pruning: bool,
    leaf_mode: LeafMode,
}

impl<E: Evaluator> NegamaxSearch<E> {
    pub fn new(evaluator: E, depth: i32) -> Self {
        NegamaxSearch {
            evaluator,
            depth,
            pruning: true,
            leaf_mode: LeafMode::Utility,
        }
    }

    pub fn with_pruning(mut self, pruning: bool) -> Self {
        self.pruning = pruning;
        self
    }

    pub fn with_leaf_mode(mut self, leaf_mode: LeafMode) -> Self {
        self.leaf_mode = leaf_mode;
        self
    }

    pub fn evaluator(&self) -> &E {
        &self.evaluator
    }

    /// Configured maximum depth
    pub fn depth(&self) -> i32 {
        self.depth
    }

    /// Searches `depth` plies ahead of the agent in `ctx`
    ///
    /// # Arguments
    /// * `ctx` - Root agent; its belief view supplies hidden positions
    /// * `state` - Current state, left untouched
    /// * `depth` - Number of plies; zero or less evaluates the root directly
    ///
    /// # Returns
    /// The best value for the root agent and the first action reaching it
    pub fn search<S: GameState>(
        &self,
        ctx: &AgentContext<'_>,
        state: &S,
        depth: i32,
    ) -> Result<SearchResult> {
        let mut stats = SearchStats::default();
        let root = Ply {
            depth,
            mover: ctx.index,
            sign: 1.0,
            alpha: f64::NEG_INFINITY,
            beta: f64::INFINITY,
        };

        let (value, action) = self.negamax(ctx, state, root, &mut stats)?;

        debug!(
            "Negamax for agent {} at depth {}: value {:.3}, action {:?}, {} nodes, {} cutoffs",
            ctx.index, depth, value, action, stats.nodes, stats.cutoffs
        );

        Ok(SearchResult { value, action, stats })
    }

    fn negamax<S: GameState>(
        &self,
        root: &AgentContext<'_>,
        state: &S,
        ply: Ply,
        stats: &mut SearchStats,
    ) -> Result<(f64, Option<Direction>)> {
        stats.nodes += 1;

        let state = substitute_hidden(root, state, ply.mover, stats);
        let actions = state.legal_actions(ply.mover);
        let leaf = ply.depth <= 0 || state.is_over();
        let mover = root.for_agent(ply.mover);
        let next_mover = (ply.mover + 1) % state.num_agents();

        let mut alpha = ply.alpha;
        let mut best: Option<(f64, Direction)> = None;

        for action in actions {
            let value = if leaf {
                stats.leaves += 1;
                self.leaf_value(root, &mover, &*state, action, ply.sign)?
            } else {
                let next = successor(&*state, ply.mover, action)?;
                let child = Ply {
                    depth: ply.depth - 1,
                    mover: next_mover,
                    sign: -ply.sign,
                    alpha: -ply.beta,
                    beta: -alpha,
                };
                let (child_value, _) = self.negamax(root, &next, child, stats)?;
                -child_value
            };

            // Strict comparison keeps the first action reaching the maximum
            if best.map_or(true, |(best_value, _)| value > best_value) {
                best = Some((value, action));
            }

            if !leaf && self.pruning {
                alpha = alpha.max(value);
                if alpha >= ply.beta {
                    stats.cutoffs += 1;
                    break;
                }
            }
        }

        Ok(match best {
            Some((value, action)) => (value, Some(action)),
            None => (f64::NEG_INFINITY, None),
        })
    }

    fn leaf_value<S: GameState>(
        &self,
        root: &AgentContext<'_>,
        mover: &AgentContext<'_>,
        state: &S,
        action: Direction,
        sign: f64,
    ) -> Result<f64> {
        match self.leaf_mode {
            LeafMode::Utility => self.evaluator.evaluate(mover, state, action),
            LeafMode::Score => {
                let next = successor(state, mover.index, action)?;
                Ok(score_for(&next, root.team) * sign)
            }
        }
    }
}

/// Places a hidden mover at the mode of the root agent's belief. The caller's
/// state is only borrowed; a substitution works on an owned copy.
fn substitute_hidden<'s, S: GameState>(
    root: &AgentContext<'_>,
    state: &'s S,
    mover: AgentId,
    stats: &mut SearchStats,
) -> Cow<'s, S> {
    if state.agent_position(mover).is_some() {
        return Cow::Borrowed(state);
    }

    match root.beliefs().and_then(|view| view.mode(state, mover)) {
        Some(estimate) => {
            let mut owned = state.clone();
            owned.set_agent_position(mover, estimate);
            stats.substitutions += 1;
            Cow::Owned(owned)
        }
        None => Cow::Borrowed(state),
    }
}
