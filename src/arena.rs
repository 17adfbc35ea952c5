// Reference capture arena
//
// A small simulator implementing GameState: layout parsing, all-pairs maze
// distances, the capture rules, the noisy sensor and a match runner. Agents
// only ever see it through the trait and through per-agent observations.

use log::{debug, info};
use rand::Rng;
use std::collections::VecDeque;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use crate::agents::TeamController;
use crate::config::ArenaConfig;
use crate::error::{AgentError, Result};
use crate::game::{successor, GameState};
use crate::types::{AgentId, Coord, Direction, Team};

/// A team whose defended food drops to this many pellets has lost the game
pub const MIN_FOOD: usize = 2;

/// Built-in layout, symmetric under a half-turn rotation
pub const DEFAULT_LAYOUT: &str = "\
%%%%%%%%%%%%%%%%%%%%
%1....%......%.....%
%.%%..o.%..%..%%.%.%
%.%..%%.%..%%....%4%
%...%..........%...%
%3%....%%..%.%%..%.%
%.%.%%..%..%.o..%%.%
%.....%......%....2%
%%%%%%%%%%%%%%%%%%%%
";

/// Static description of a board
#[derive(Debug, Clone, PartialEq)]
pub struct Layout {
    width: i32,
    height: i32,
    walls: Vec<bool>,
    food: Vec<Coord>,
    capsules: Vec<Coord>,
    starts: Vec<Coord>,
}

impl Layout {
    /// Parses a text layout
    ///
    /// `%` is a wall, `.` food, `o` a capsule and the digits `1`-`9` the start
    /// of agents 0-8. The first line is the top row of the board.
    pub fn parse(text: &str) -> Result<Layout> {
        let rows: Vec<&str> = text
            .lines()
            .map(|line| line.trim_end())
            .filter(|line| !line.is_empty())
            .collect();

        let height = rows.len();
        let width = rows.first().map(|r| r.chars().count()).unwrap_or(0);
        if height == 0 || width == 0 {
            return Err(AgentError::Layout("layout is empty".to_string()));
        }

        let mut walls = vec![false; width * height];
        let mut food = Vec::new();
        let mut capsules = Vec::new();
        let mut starts: Vec<Option<Coord>> = Vec::new();

        for (row, line) in rows.iter().enumerate() {
            if line.chars().count() != width {
                return Err(AgentError::Layout(format!(
                    "row {} has {} columns, expected {}",
                    row,
                    line.chars().count(),
                    width
                )));
            }
            let y = (height - 1 - row) as i32;
            for (x, ch) in line.chars().enumerate() {
                let pos = Coord::new(x as i32, y);
                match ch {
                    '%' => walls[y as usize * width + x] = true,
                    '.' => food.push(pos),
                    'o' => capsules.push(pos),
                    '1'..='9' => {
                        let agent = ch as usize - '1' as usize;
                        if starts.len() <= agent {
                            starts.resize(agent + 1, None);
                        }
                        if starts[agent].replace(pos).is_some() {
                            return Err(AgentError::Layout(format!(
                                "agent {} placed twice",
                                agent + 1
                            )));
                        }
                    }
                    _ => {}
                }
            }
        }

        let starts: Vec<Coord> = starts
            .into_iter()
            .enumerate()
            .map(|(agent, pos)| {
                pos.ok_or_else(|| AgentError::Layout(format!("agent {} is missing", agent + 1)))
            })
            .collect::<Result<_>>()?;
        if starts.len() < 2 {
            return Err(AgentError::Layout("a game needs at least two agents".to_string()));
        }

        food.sort();
        capsules.sort();
        Ok(Layout {
            width: width as i32,
            height: height as i32,
            walls,
            food,
            capsules,
            starts,
        })
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Layout> {
        let text = fs::read_to_string(path.as_ref())?;
        Self::parse(&text)
    }

    pub fn default_layout() -> Result<Layout> {
        Self::parse(DEFAULT_LAYOUT)
    }

    pub fn width(&self) -> i32 {
        self.width
    }

    pub fn height(&self) -> i32 {
        self.height
    }

    pub fn num_agents(&self) -> usize {
        self.starts.len()
    }

    pub fn start(&self, agent: AgentId) -> Coord {
        self.starts[agent]
    }

    /// Out-of-bounds positions count as walls
    pub fn is_wall(&self, pos: Coord) -> bool {
        if pos.x < 0 || pos.y < 0 || pos.x >= self.width || pos.y >= self.height {
            return true;
        }
        self.walls[(pos.y * self.width + pos.x) as usize]
    }

    /// Open cells in row-major order from the bottom-left corner
    pub fn legal_positions(&self) -> Vec<Coord> {
        (0..self.height)
            .flat_map(|y| (0..self.width).map(move |x| Coord::new(x, y)))
            .filter(|&pos| !self.is_wall(pos))
            .collect()
    }

    fn open_neighbors(&self, pos: Coord) -> impl Iterator<Item = Coord> + '_ {
        [Direction::North, Direction::South, Direction::East, Direction::West]
            .into_iter()
            .map(move |d| d.apply(&pos))
            .filter(move |&p| !self.is_wall(p))
    }

    /// Cells that lie on no loop of the maze, as a row-major mask
    ///
    /// Cells with at most one open neighbour are peeled off repeatedly; what
    /// remains are the loops and the corridors joining them. An agent inside
    /// a peeled region has a single way out.
    pub fn dead_ends(&self) -> Vec<bool> {
        let cell = |p: Coord| (p.y * self.width + p.x) as usize;
        let mut degree = vec![0usize; (self.width * self.height) as usize];
        let mut dead = vec![false; degree.len()];
        let mut queue = VecDeque::new();

        for pos in self.legal_positions() {
            degree[cell(pos)] = self.open_neighbors(pos).count();
            if degree[cell(pos)] <= 1 {
                dead[cell(pos)] = true;
                queue.push_back(pos);
            }
        }

        while let Some(pos) = queue.pop_front() {
            for next in self.open_neighbors(pos) {
                let i = cell(next);
                if dead[i] {
                    continue;
                }
                degree[i] -= 1;
                if degree[i] <= 1 {
                    dead[i] = true;
                    queue.push_back(next);
                }
            }
        }
        dead
    }
}

/// All-pairs shortest path lengths between open cells
#[derive(Debug, Clone)]
pub struct DistanceTable {
    width: i32,
    /// Cell index to position in `positions`, `None` for walls
    index_of: Vec<Option<usize>>,
    positions: usize,
    /// Row-major `positions x positions`; negative means unreachable
    distances: Vec<i32>,
}

impl DistanceTable {
    /// Runs one breadth-first search per open cell
    pub fn compute(layout: &Layout) -> Self {
        let legal = layout.legal_positions();
        let mut index_of = vec![None; (layout.width * layout.height) as usize];
        for (i, pos) in legal.iter().enumerate() {
            index_of[(pos.y * layout.width + pos.x) as usize] = Some(i);
        }

        let n = legal.len();
        let mut distances = vec![-1; n * n];
        let mut queue = VecDeque::new();

        for (source, &origin) in legal.iter().enumerate() {
            let row = &mut distances[source * n..(source + 1) * n];
            row[source] = 0;
            queue.push_back(origin);

            while let Some(pos) = queue.pop_front() {
                let Some(here) = index_of[(pos.y * layout.width + pos.x) as usize] else {
                    continue;
                };
                for dir in [Direction::North, Direction::South, Direction::East, Direction::West] {
                    let next = dir.apply(&pos);
                    if layout.is_wall(next) {
                        continue;
                    }
                    if let Some(there) = index_of[(next.y * layout.width + next.x) as usize] {
                        if row[there] < 0 {
                            row[there] = row[here] + 1;
                            queue.push_back(next);
                        }
                    }
                }
            }
        }

        DistanceTable {
            width: layout.width,
            index_of,
            positions: n,
            distances,
        }
    }

    fn index(&self, pos: Coord) -> Option<usize> {
        if pos.x < 0 || pos.y < 0 || pos.x >= self.width {
            return None;
        }
        self.index_of.get((pos.y * self.width + pos.x) as usize).copied().flatten()
    }

    /// Maze distance, or Manhattan distance when either end is not an open
    /// cell or the two cells are disconnected
    pub fn get(&self, a: Coord, b: Coord) -> i32 {
        match (self.index(a), self.index(b)) {
            (Some(i), Some(j)) => {
                let d = self.distances[i * self.positions + j];
                if d >= 0 {
                    d
                } else {
                    a.manhattan(b)
                }
            }
            _ => a.manhattan(b),
        }
    }
}

/// Rules and sensor settings of one arena
#[derive(Debug, Clone, PartialEq)]
struct Rules {
    sight_range: i32,
    sonar_noise: i32,
    scared_time: u32,
}

/// Full or observed state of a capture game
#[derive(Debug, Clone)]
pub struct ArenaState {
    layout: Arc<Layout>,
    distances: Arc<DistanceTable>,
    dead_ends: Arc<Vec<bool>>,
    rules: Rules,
    positions: Vec<Option<Coord>>,
    directions: Vec<Direction>,
    scared: Vec<u32>,
    /// Times each agent was sent home
    captures: Vec<u32>,
    /// Sent home and not moved since
    silenced: Vec<bool>,
    food: Vec<Coord>,
    capsules: Vec<Coord>,
    /// Red's point of view
    score: i32,
    moves_left: u32,
    over: bool,
    /// Noisy distances, only filled in observations
    readings: Vec<Option<i32>>,
}

impl ArenaState {
    /// Starting state of a game on `layout`
    pub fn new(layout: Layout, config: &ArenaConfig) -> Self {
        let distances = DistanceTable::compute(&layout);
        let n = layout.num_agents();
        ArenaState {
            positions: layout.starts.iter().map(|&p| Some(p)).collect(),
            directions: vec![Direction::Stop; n],
            scared: vec![0; n],
            captures: vec![0; n],
            silenced: vec![false; n],
            food: layout.food.clone(),
            capsules: layout.capsules.clone(),
            score: 0,
            moves_left: config.time_limit,
            over: config.time_limit == 0,
            readings: vec![None; n],
            rules: Rules {
                sight_range: config.sight_range,
                sonar_noise: config.sonar_noise.max(0),
                scared_time: config.scared_time,
            },
            distances: Arc::new(distances),
            dead_ends: Arc::new(layout.dead_ends()),
            layout: Arc::new(layout),
        }
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    pub fn moves_left(&self) -> u32 {
        self.moves_left
    }

    /// True from the moment the agent is sent home until its next own move
    pub fn was_captured(&self, agent: AgentId) -> bool {
        self.silenced[agent]
    }

    /// Total number of captures so far
    pub fn captures(&self) -> u32 {
        self.captures.iter().sum()
    }

    /// Removes an agent's position, as an observer that cannot see it would
    pub fn hide_agent(&mut self, agent: AgentId) {
        self.positions[agent] = None;
    }

    /// The state as `observer` perceives it
    ///
    /// Opponents farther than the sight range from every member of the
    /// observer's team are hidden. Every opponent gets a distance reading
    /// from the observer, blurred by uniform noise, except those just
    /// captured.
    pub fn observation<R: Rng + ?Sized>(&self, observer: AgentId, rng: &mut R) -> ArenaState {
        let mut seen = self.clone();
        let team = Team::of(observer);
        let n = self.num_agents();
        let watchers: Vec<Coord> = team
            .indices(n)
            .into_iter()
            .filter_map(|mate| self.positions[mate])
            .collect();
        let from = self.positions[observer];
        let noise = self.rules.sonar_noise;

        seen.readings = vec![None; n];
        for enemy in team.opponent().indices(n) {
            let Some(pos) = self.positions[enemy] else {
                continue;
            };
            if !watchers.iter().any(|w| w.manhattan(pos) <= self.rules.sight_range) {
                seen.positions[enemy] = None;
            }
            if !self.was_captured(enemy) {
                seen.readings[enemy] =
                    from.map(|f| f.manhattan(pos) + rng.random_range(-noise..=noise));
            }
        }
        seen
    }

    /// Food a team is defending, counted on its half of the board
    fn defended_food(&self, team: Team) -> usize {
        self.food
            .iter()
            .filter(|f| team.owns_column(f.x, self.layout.width))
            .count()
    }

    fn send_home(&mut self, agent: AgentId) {
        self.positions[agent] = Some(self.layout.start(agent));
        self.directions[agent] = Direction::Stop;
        self.scared[agent] = 0;
        self.captures[agent] += 1;
        self.silenced[agent] = true;
    }

    /// Resolves contact between `agent` and any opponent sharing its cell
    fn resolve_collisions(&mut self, agent: AgentId, pos: Coord) {
        let team = Team::of(agent);
        let invading = !team.owns_column(pos.x, self.layout.width);

        for enemy in team.opponent().indices(self.num_agents()) {
            if self.positions[enemy] != Some(pos) {
                continue;
            }
            // The agent on its own half is the ghost
            let (ghost, pacman) = if invading { (enemy, agent) } else { (agent, enemy) };
            let loser = if self.scared[ghost] > 0 { ghost } else { pacman };
            let winner = if loser == ghost { pacman } else { ghost };
            debug!("Agent {} captured agent {} at {}", winner, loser, pos);
            self.send_home(loser);
        }
    }
}

impl GameState for ArenaState {
    fn num_agents(&self) -> usize {
        self.positions.len()
    }

    fn width(&self) -> i32 {
        self.layout.width
    }

    fn height(&self) -> i32 {
        self.layout.height
    }

    fn is_wall(&self, pos: Coord) -> bool {
        self.layout.is_wall(pos)
    }

    fn legal_positions(&self) -> Vec<Coord> {
        self.layout.legal_positions()
    }

    fn maze_distance(&self, a: Coord, b: Coord) -> i32 {
        self.distances.get(a, b)
    }

    fn is_dead_end(&self, pos: Coord) -> bool {
        !self.layout.is_wall(pos) && self.dead_ends[(pos.y * self.layout.width + pos.x) as usize]
    }

    fn legal_actions(&self, agent: AgentId) -> Vec<Direction> {
        match self.positions.get(agent).copied().flatten() {
            Some(pos) => Direction::all()
                .into_iter()
                .filter(|d| !self.layout.is_wall(d.apply(&pos)))
                .collect(),
            None => Vec::new(),
        }
    }

    fn apply_action(&self, agent: AgentId, action: Direction) -> Result<Self> {
        let pos = self.positions[agent].ok_or(AgentError::UnknownPosition(agent))?;
        let target = action.apply(&pos);
        if self.layout.is_wall(target) {
            return Err(AgentError::InvalidAction { agent, action });
        }

        let mut next = self.clone();
        let team = Team::of(agent);
        next.positions[agent] = Some(target);
        next.directions[agent] = action;
        next.scared[agent] = next.scared[agent].saturating_sub(1);
        next.silenced[agent] = false;

        if !team.owns_column(target.x, self.layout.width) {
            if let Some(i) = next.food.iter().position(|&f| f == target) {
                next.food.remove(i);
                next.score += team.sign() as i32;
                if next.defended_food(team.opponent()) <= MIN_FOOD {
                    next.over = true;
                }
            }
            if let Some(i) = next.capsules.iter().position(|&c| c == target) {
                next.capsules.remove(i);
                for enemy in team.opponent().indices(next.num_agents()) {
                    next.scared[enemy] = next.rules.scared_time;
                }
            }
        }

        next.resolve_collisions(agent, target);

        next.moves_left = next.moves_left.saturating_sub(1);
        if next.moves_left == 0 {
            next.over = true;
        }
        Ok(next)
    }

    fn agent_position(&self, agent: AgentId) -> Option<Coord> {
        self.positions.get(agent).copied().flatten()
    }

    fn set_agent_position(&mut self, agent: AgentId, pos: Coord) {
        self.positions[agent] = Some(pos);
    }

    fn initial_position(&self, agent: AgentId) -> Coord {
        self.layout.start(agent)
    }

    fn noisy_distance(&self, agent: AgentId) -> Option<i32> {
        self.readings.get(agent).copied().flatten()
    }

    /// Uniform over the readings within the noise band of the true distance
    fn distance_probability(&self, true_distance: i32, noisy: i32) -> f64 {
        let noise = self.rules.sonar_noise;
        if (noisy - true_distance).abs() <= noise {
            1.0 / (2 * noise + 1) as f64
        } else {
            0.0
        }
    }

    fn is_over(&self) -> bool {
        self.over
    }

    fn score(&self) -> f64 {
        self.score as f64
    }

    fn food(&self, team: Team) -> Vec<Coord> {
        self.food
            .iter()
            .copied()
            .filter(|f| team.owns_column(f.x, self.layout.width))
            .collect()
    }

    fn capsules(&self, team: Team) -> Vec<Coord> {
        self.capsules
            .iter()
            .copied()
            .filter(|c| team.owns_column(c.x, self.layout.width))
            .collect()
    }

    fn scared_timer(&self, agent: AgentId) -> u32 {
        self.scared[agent]
    }

    fn is_pacman(&self, agent: AgentId) -> bool {
        self.agent_position(agent)
            .is_some_and(|pos| !Team::of(agent).owns_column(pos.x, self.layout.width))
    }

    fn agent_direction(&self, agent: AgentId) -> Direction {
        self.directions[agent]
    }
}

/// Result of a finished match
#[derive(Debug, Clone, PartialEq)]
pub struct MatchReport {
    /// Final score from red's point of view
    pub score: i32,
    /// `None` on a draw
    pub winner: Option<Team>,
    /// Moves played, all agents together
    pub moves: u32,
    pub captures: u32,
}

/// Runs one game between two team controllers
pub struct Match {
    state: ArenaState,
}

impl Match {
    pub fn new(layout: Layout, config: &ArenaConfig) -> Self {
        Match {
            state: ArenaState::new(layout, config),
        }
    }

    pub fn state(&self) -> &ArenaState {
        &self.state
    }

    /// Plays until the game is over
    ///
    /// Agents move in index order. Each one receives its own observation of
    /// the true state, and the chosen action is applied to the true state.
    pub fn play<R: Rng + ?Sized>(
        &mut self,
        red: &mut TeamController,
        blue: &mut TeamController,
        rng: &mut R,
    ) -> Result<MatchReport> {
        red.register_initial_state(&self.state, rng)?;
        blue.register_initial_state(&self.state, rng)?;

        let n = self.state.num_agents();
        let mut moves = 0;
        let mut agent = 0;

        while !self.state.is_over() {
            let observed = self.state.observation(agent, rng);
            let controller = match Team::of(agent) {
                Team::Red => &mut *red,
                Team::Blue => &mut *blue,
            };
            let action = controller.choose_action(agent, &observed, rng)?;
            let next = successor(&self.state, agent, action)?;

            self.state = next;
            moves += 1;
            agent = (agent + 1) % n;
        }

        let score = self.state.score;
        let captures = self.state.captures();
        let winner = match score {
            s if s > 0 => Some(Team::Red),
            s if s < 0 => Some(Team::Blue),
            _ => None,
        };
        info!(
            "Match over after {} moves: score {}, winner {:?}, {} captures",
            moves, score, winner, captures
        );

        Ok(MatchReport {
            score,
            winner,
            moves,
            captures,
        })
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn arena_config() -> ArenaConfig {
        Config::default_hardcoded().arena
    }

    const CORRIDOR: &str = "\
%%%%%%%%
%1.o..2%
%%%%%%%%
";

    #[test]
    fn test_parse_maps_first_row_to_top() {
        let layout = Layout::parse(CORRIDOR).unwrap();
        assert_eq!(layout.width(), 8);
        assert_eq!(layout.height(), 3);
        assert_eq!(layout.num_agents(), 2);
        assert_eq!(layout.start(0), Coord::new(1, 1));
        assert_eq!(layout.start(1), Coord::new(6, 1));
        assert!(layout.is_wall(Coord::new(0, 2)));
        assert!(layout.is_wall(Coord::new(-1, 1)));
        assert_eq!(layout.legal_positions().len(), 6);
    }

    #[test]
    fn test_parse_rejects_ragged_rows() {
        let result = Layout::parse("%%%\n%1%2\n%%%\n");
        assert!(matches!(result, Err(AgentError::Layout(_))));
    }

    #[test]
    fn test_parse_rejects_missing_agent() {
        let result = Layout::parse("%%%%%\n%1.3%\n%%%%%\n");
        assert!(matches!(result, Err(AgentError::Layout(_))));
    }

    #[test]
    fn test_default_layout_is_symmetric() {
        let layout = Layout::default_layout().unwrap();
        assert_eq!(layout.num_agents(), 4);
        let w = layout.width();
        let h = layout.height();
        for pos in layout.legal_positions() {
            assert!(!layout.is_wall(Coord::new(w - 1 - pos.x, h - 1 - pos.y)));
        }
        let state = ArenaState::new(layout, &arena_config());
        assert_eq!(state.food(Team::Red).len(), state.food(Team::Blue).len());
    }

    #[test]
    fn test_maze_distance_follows_walls() {
        let layout = Layout::parse(
            "\
%%%%%
%1%2%
%...%
%%%%%
",
        )
        .unwrap();
        let table = DistanceTable::compute(&layout);
        // Around the wall instead of straight through it
        assert_eq!(table.get(Coord::new(1, 2), Coord::new(3, 2)), 4);
        assert_eq!(table.get(Coord::new(1, 1), Coord::new(1, 1)), 0);
    }

    #[test]
    fn test_eating_enemy_food_scores_for_the_eater() {
        let state = ArenaState::new(Layout::parse(CORRIDOR).unwrap(), &arena_config());
        // Blue walks west onto red's half and eats the pellet at x = 2
        let mut next = state.clone();
        for _ in 0..4 {
            next = successor(&next, 1, Direction::West).unwrap();
        }
        assert_eq!(next.agent_position(1), Some(Coord::new(2, 1)));
        assert_eq!(next.score(), -1.0);
        assert!(next.is_pacman(1));
    }

    #[test]
    fn test_scared_ghost_loses_the_collision() {
        let state = ArenaState::new(Layout::parse(CORRIDOR).unwrap(), &arena_config());
        let mut next = state.clone();
        for _ in 0..4 {
            next = successor(&next, 1, Direction::West).unwrap();
        }
        // The capsule eaten on the way scared the red ghost
        let next = successor(&next, 0, Direction::East).unwrap();
        assert_eq!(next.agent_position(0), Some(next.initial_position(0)));
        assert_eq!(next.agent_position(1), Some(Coord::new(2, 1)));
        assert!(next.was_captured(0));
    }

    #[test]
    fn test_capsule_scares_the_defenders() {
        let layout = Layout::parse(CORRIDOR).unwrap();
        let state = ArenaState::new(layout, &arena_config());
        let mut next = state.clone();
        for _ in 0..3 {
            next = successor(&next, 1, Direction::West).unwrap();
        }
        assert_eq!(next.agent_position(1), Some(Coord::new(3, 1)));
        assert_eq!(next.scared_timer(0), 40);
        assert_eq!(next.capsules(Team::Red).len(), 0);
    }

    #[test]
    fn test_ghost_captures_pacman_and_silences_its_reading() {
        let layout = Layout::parse("%%%%%%%%\n%1....2%\n%%%%%%%%\n").unwrap();
        let state = ArenaState::new(layout, &arena_config());
        let mut next = state.clone();
        for _ in 0..4 {
            next = successor(&next, 1, Direction::West).unwrap();
        }
        // Red ghost at x = 1 steps onto the blue pacman at x = 2
        let next = successor(&next, 0, Direction::East).unwrap();
        assert_eq!(next.agent_position(0), Some(Coord::new(2, 1)));
        assert_eq!(next.agent_position(1), Some(next.initial_position(1)));
        assert!(next.was_captured(1));

        let mut rng = StdRng::seed_from_u64(3);
        let seen = next.observation(0, &mut rng);
        assert_eq!(seen.noisy_distance(1), None);
        assert_eq!(next.captures(), 1);
    }

    #[test]
    fn test_reading_returns_once_the_captured_agent_moves() {
        let layout = Layout::parse("%%%%%%%%\n%1....2%\n%%%%%%%%\n").unwrap();
        let state = ArenaState::new(layout, &arena_config());
        let mut next = state.clone();
        for _ in 0..3 {
            next = successor(&next, 1, Direction::West).unwrap();
        }
        // Blue pacman at x = 3 walks into the red ghost at x = 2
        next = successor(&next, 0, Direction::East).unwrap();
        next = successor(&next, 1, Direction::West).unwrap();
        assert_eq!(next.agent_position(1), Some(next.initial_position(1)));
        assert!(next.was_captured(1));

        // Red moving does not lift the silence, blue moving does
        next = successor(&next, 0, Direction::Stop).unwrap();
        assert!(next.was_captured(1));
        next = successor(&next, 1, Direction::West).unwrap();
        assert!(!next.was_captured(1));

        let mut rng = StdRng::seed_from_u64(4);
        let seen = next.observation(0, &mut rng);
        assert!(seen.noisy_distance(1).is_some());
        assert_eq!(next.captures(), 1);
    }

    #[test]
    fn test_dead_ends_are_cells_off_every_loop() {
        let layout = Layout::parse(
            "%%%%%%%\n%1...2%\n%.%%%.%\n%.....%\n%%.%%%%\n%%.%%%%\n%%%%%%%\n",
        )
        .unwrap();
        let state = ArenaState::new(layout, &arena_config());

        let dead: Vec<Coord> = state
            .legal_positions()
            .into_iter()
            .filter(|&p| state.is_dead_end(p))
            .collect();
        assert_eq!(dead, vec![Coord::new(2, 1), Coord::new(2, 2)]);
        assert!(!state.is_dead_end(Coord::new(0, 0)));

        // Without any loop, the whole corridor is one dead end
        let corridor = ArenaState::new(Layout::parse(CORRIDOR).unwrap(), &arena_config());
        assert!(corridor.legal_positions().iter().all(|&p| corridor.is_dead_end(p)));
    }

    #[test]
    fn test_illegal_move_is_rejected() {
        let state = ArenaState::new(Layout::parse(CORRIDOR).unwrap(), &arena_config());
        let result = successor(&state, 0, Direction::North);
        assert!(matches!(
            result,
            Err(AgentError::InvalidAction {
                agent: 0,
                action: Direction::North
            })
        ));
    }

    #[test]
    fn test_observation_hides_distant_opponents() {
        let layout = Layout::default_layout().unwrap();
        let state = ArenaState::new(layout, &arena_config());
        let mut rng = StdRng::seed_from_u64(8);

        let seen = state.observation(0, &mut rng);
        assert!(seen.agent_position(0).is_some());
        assert!(seen.agent_position(2).is_some());
        assert_eq!(seen.agent_position(1), None);
        assert_eq!(seen.agent_position(3), None);

        let reading = seen.noisy_distance(1).unwrap();
        let truth = state.agent_position(0).unwrap().manhattan(state.agent_position(1).unwrap());
        assert!((reading - truth).abs() <= 6);
        assert_eq!(seen.noisy_distance(2), None);
    }

    #[test]
    fn test_emission_is_uniform_within_noise() {
        let state = tests_support::open_board(6, 3, 2);
        assert!((state.distance_probability(10, 16) - 1.0 / 13.0).abs() < 1e-12);
        assert_eq!(state.distance_probability(10, 17), 0.0);
    }

    #[test]
    fn test_time_limit_ends_the_game() {
        let mut config = arena_config();
        config.time_limit = 2;
        let state = ArenaState::new(Layout::parse(CORRIDOR).unwrap(), &config);
        let next = successor(&state, 0, Direction::Stop).unwrap();
        assert!(!next.is_over());
        let next = successor(&next, 1, Direction::Stop).unwrap();
        assert!(next.is_over());
    }
}
