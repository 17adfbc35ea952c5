// Environment interface consumed by the agent core
//
// The simulator (walls, move legality, score bookkeeping, maze distances) lives
// behind this trait. The arena module ships one implementation; tests provide
// small synthetic ones.

use crate::error::{AgentError, Result};
use crate::types::{AgentId, Coord, Direction, Team};

/// Read access to a game state plus successor generation
///
/// States are values: `apply_action` returns a new state and never mutates the
/// receiver. `set_agent_position` exists only to build hypothetical states
/// (particle transitions and hidden-position substitution) on private copies.
pub trait GameState: Clone {
    fn num_agents(&self) -> usize;

    fn width(&self) -> i32;

    fn height(&self) -> i32;

    fn is_wall(&self, pos: Coord) -> bool;

    /// All non-wall positions in a stable order
    fn legal_positions(&self) -> Vec<Coord>;

    /// Precomputed shortest-path distance through the maze
    fn maze_distance(&self, a: Coord, b: Coord) -> i32 {
        a.manhattan(b)
    }

    /// Legal actions in enumeration order
    fn legal_actions(&self, agent: AgentId) -> Vec<Direction>;

    /// Raw successor generation. Callers go through [`successor`], which checks
    /// legality and resolves half-steps.
    fn apply_action(&self, agent: AgentId, action: Direction) -> Result<Self>;

    /// True when the agent stopped between two grid cells
    fn is_mid_step(&self, _agent: AgentId) -> bool {
        false
    }

    /// `None` when the agent is hidden from the observer of this state
    fn agent_position(&self, agent: AgentId) -> Option<Coord>;

    fn set_agent_position(&mut self, agent: AgentId, pos: Coord);

    /// Start position, also the capture (reset) position
    fn initial_position(&self, agent: AgentId) -> Coord;

    /// Noisy distance reading for the agent, `None` when there is no signal
    fn noisy_distance(&self, _agent: AgentId) -> Option<i32> {
        None
    }

    /// Emission model: P(noisy reading | true distance)
    fn distance_probability(&self, true_distance: i32, noisy: i32) -> f64 {
        if true_distance == noisy {
            1.0
        } else {
            0.0
        }
    }

    fn is_over(&self) -> bool;

    /// Score from red's point of view
    fn score(&self) -> f64 {
        0.0
    }

    /// Food a team defends (food on its own half)
    fn food(&self, _team: Team) -> Vec<Coord> {
        Vec::new()
    }

    /// Capsules a team defends
    fn capsules(&self, _team: Team) -> Vec<Coord> {
        Vec::new()
    }

    fn scared_timer(&self, _agent: AgentId) -> u32 {
        0
    }

    /// True when the agent is on the opponent's half
    fn is_pacman(&self, _agent: AgentId) -> bool {
        false
    }

    /// Direction of the agent's last move
    fn agent_direction(&self, _agent: AgentId) -> Direction {
        Direction::Stop
    }

    fn team_of(&self, agent: AgentId) -> Team {
        Team::of(agent)
    }

    /// Whether `pos` can only be left the way it was entered
    fn is_dead_end(&self, _pos: Coord) -> bool {
        false
    }

    /// Open cells reachable in one move, excluding the cell itself
    fn legal_neighbors(&self, pos: Coord) -> Vec<Coord> {
        [Direction::North, Direction::South, Direction::East, Direction::West]
            .iter()
            .map(|d| d.apply(&pos))
            .filter(|p| !self.is_wall(*p))
            .collect()
    }
}

/// Generates the whole-grid successor of `agent` taking `action`
///
/// Rejects actions outside the legal set with [`AgentError::InvalidAction`]
/// instead of substituting another action. When the environment reports the
/// agent stranded between cells, the action is applied a second time.
pub fn successor<S: GameState>(state: &S, agent: AgentId, action: Direction) -> Result<S> {
    if !state.legal_actions(agent).contains(&action) {
        return Err(AgentError::InvalidAction { agent, action });
    }

    let next = state.apply_action(agent, action)?;
    if next.is_mid_step(agent) {
        // Only half a grid position was covered
        next.apply_action(agent, action)
    } else {
        Ok(next)
    }
}

/// Score as seen by `team`
pub fn score_for<S: GameState>(state: &S, team: Team) -> f64 {
    state.score() * team.sign()
}
