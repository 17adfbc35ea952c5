// Small fixtures shared by the tracking tests

use rand::Rng;

use super::{Distribution, TransitionModel};
use crate::error::{AgentError, Result};
use crate::game::GameState;
use crate::types::{AgentId, Coord, Direction};

/// A 1xN corridor; agent 0 observes, the others are hidden
#[derive(Clone)]
pub struct Corridor {
    pub length: i32,
    pub positions: Vec<Option<Coord>>,
    pub starts: Vec<Coord>,
    pub readings: Vec<Option<i32>>,
}

impl Corridor {
    pub fn new(length: i32, observer: i32, hidden: usize) -> Self {
        let mut positions = vec![Some(Coord::new(observer, 0))];
        positions.extend(std::iter::repeat(None).take(hidden));
        Corridor {
            length,
            positions,
            starts: vec![Coord::new(0, 0); hidden + 1],
            readings: vec![None; hidden + 1],
        }
    }
}

impl GameState for Corridor {
    fn num_agents(&self) -> usize {
        self.positions.len()
    }

    fn width(&self) -> i32 {
        self.length
    }

    fn height(&self) -> i32 {
        1
    }

    fn is_wall(&self, pos: Coord) -> bool {
        pos.y != 0 || pos.x < 0 || pos.x >= self.length
    }

    fn legal_positions(&self) -> Vec<Coord> {
        (0..self.length).map(|x| Coord::new(x, 0)).collect()
    }

    fn legal_actions(&self, agent: AgentId) -> Vec<Direction> {
        match self.positions[agent] {
            Some(pos) => Direction::all()
                .into_iter()
                .filter(|d| !self.is_wall(d.apply(&pos)))
                .collect(),
            None => Vec::new(),
        }
    }

    fn apply_action(&self, agent: AgentId, action: Direction) -> Result<Self> {
        let mut next = self.clone();
        if let Some(pos) = self.positions[agent] {
            next.positions[agent] = Some(action.apply(&pos));
        }
        Ok(next)
    }

    fn agent_position(&self, agent: AgentId) -> Option<Coord> {
        self.positions[agent]
    }

    fn set_agent_position(&mut self, agent: AgentId, pos: Coord) {
        self.positions[agent] = Some(pos);
    }

    fn initial_position(&self, agent: AgentId) -> Coord {
        self.starts[agent]
    }

    fn noisy_distance(&self, agent: AgentId) -> Option<i32> {
        self.readings[agent]
    }

    fn is_over(&self) -> bool {
        false
    }
}

/// Moves one step east when possible, otherwise stays
pub struct DriftEast;

impl<S: GameState> TransitionModel<S> for DriftEast {
    fn position_distribution<R: Rng + ?Sized>(
        &self,
        state: &S,
        agent: AgentId,
        _rng: &mut R,
    ) -> Result<Distribution<Coord>> {
        let pos = state
            .agent_position(agent)
            .ok_or(AgentError::UnknownPosition(agent))?;
        let east = Direction::East.apply(&pos);
        Ok(if state.is_wall(east) {
            Distribution::point(pos)
        } else {
            Distribution::point(east)
        })
    }
}
