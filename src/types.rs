// Capture game value types
// Positions, movement directions and team membership shared by every module

use serde::{Deserialize, Serialize};
use std::fmt;

/// Index of an agent in the game's turn order
pub type AgentId = usize;

/// 2D coordinate on the grid
#[derive(Deserialize, Serialize, Debug, PartialEq, Eq, PartialOrd, Ord, Clone, Copy, Hash)]
pub struct Coord {
    pub x: i32,
    pub y: i32,
}

impl Coord {
    pub const fn new(x: i32, y: i32) -> Self {
        Coord { x, y }
    }

    /// Manhattan distance between two coordinates
    pub fn manhattan(self, other: Coord) -> i32 {
        (self.x - other.x).abs() + (self.y - other.y).abs()
    }
}

impl fmt::Display for Coord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Represents the five possible actions of an agent
///
/// The declaration order is the enumeration order used everywhere actions are
/// listed, so search tie-breaks are reproducible.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    North,
    South,
    East,
    West,
    Stop,
}

impl Direction {
    /// Returns all possible actions
    pub fn all() -> [Direction; 5] {
        [
            Direction::North,
            Direction::South,
            Direction::East,
            Direction::West,
            Direction::Stop,
        ]
    }

    /// Converts direction to its string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::North => "North",
            Direction::South => "South",
            Direction::East => "East",
            Direction::West => "West",
            Direction::Stop => "Stop",
        }
    }

    /// Calculates the next coordinate when moving in this direction
    pub fn apply(&self, coord: &Coord) -> Coord {
        match self {
            Direction::North => Coord { x: coord.x, y: coord.y + 1 },
            Direction::South => Coord { x: coord.x, y: coord.y - 1 },
            Direction::East => Coord { x: coord.x + 1, y: coord.y },
            Direction::West => Coord { x: coord.x - 1, y: coord.y },
            Direction::Stop => *coord,
        }
    }

    /// The direction that undoes this one. Stop reverses to itself.
    pub fn reverse(&self) -> Direction {
        match self {
            Direction::North => Direction::South,
            Direction::South => Direction::North,
            Direction::East => Direction::West,
            Direction::West => Direction::East,
            Direction::Stop => Direction::Stop,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The two sides of a capture game
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Team {
    Red,
    Blue,
}

impl Team {
    /// Red agents take the even turn slots, blue agents the odd ones
    pub fn of(agent: AgentId) -> Team {
        if agent % 2 == 0 {
            Team::Red
        } else {
            Team::Blue
        }
    }

    pub fn opponent(&self) -> Team {
        match self {
            Team::Red => Team::Blue,
            Team::Blue => Team::Red,
        }
    }

    /// Scores are kept from red's point of view; this flips them for blue
    pub fn sign(&self) -> f64 {
        match self {
            Team::Red => 1.0,
            Team::Blue => -1.0,
        }
    }

    /// Agent indices belonging to this team in a game of `num_agents`
    pub fn indices(&self, num_agents: usize) -> Vec<AgentId> {
        (0..num_agents).filter(|&i| Team::of(i) == *self).collect()
    }

    /// Whether a column lies on this team's home half of a board of `width`
    pub fn owns_column(&self, x: i32, width: i32) -> bool {
        let mid = width / 2;
        match self {
            Team::Red => x < mid,
            Team::Blue => x >= mid,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_direction_reverse_round_trips() {
        for dir in Direction::all() {
            assert_eq!(dir.reverse().reverse(), dir);
        }
        assert_eq!(Direction::North.reverse(), Direction::South);
    }

    #[test]
    fn test_stop_keeps_position() {
        let c = Coord::new(3, 4);
        assert_eq!(Direction::Stop.apply(&c), c);
        assert_eq!(Direction::East.apply(&c), Coord::new(4, 4));
    }

    #[test]
    fn test_team_membership_alternates() {
        assert_eq!(Team::of(0), Team::Red);
        assert_eq!(Team::of(3), Team::Blue);
        assert_eq!(Team::Blue.indices(4), vec![1, 3]);
    }

    #[test]
    fn test_home_halves_split_the_board() {
        assert!(Team::Red.owns_column(4, 10));
        assert!(!Team::Red.owns_column(5, 10));
        assert!(Team::Blue.owns_column(5, 10));
    }
}
