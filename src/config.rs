// Configuration module for reading Capture.toml
// Every tunable of the agents and the reference arena lives here.

use serde::Deserialize;
use std::fs;
use std::path::Path;

use crate::error::{AgentError, Result};
use crate::features::Weights;
use crate::search::LeafMode;
use crate::strategy::{LinearKind, StrategySpec};

/// Main configuration structure containing all tunable parameters
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub tracking: TrackingConfig,
    pub search: SearchConfig,
    pub team: TeamConfig,
    pub weights: WeightsConfig,
    pub arena: ArenaConfig,
    pub debug: DebugConfig,
}

/// Opponent tracking parameters
#[derive(Debug, Deserialize, Clone)]
pub struct TrackingConfig {
    /// Population size after the first full resample
    pub num_particles: usize,
    /// Copies of the start configuration held until the first full resample
    pub pinned_population: usize,
    /// Probability a modeled opponent follows its strategy's choice
    pub opponent_stickiness: f64,
    /// Strategy opponents are assumed to play
    pub opponent_strategy: StrategySpec,
}

/// Adversarial search parameters
#[derive(Debug, Deserialize, Clone)]
pub struct SearchConfig {
    /// Alpha-beta pruning; disabling it is only useful to validate results
    pub pruning: bool,
    pub leaf_mode: LeafMode,
}

/// Strategies of our agents, assigned round-robin by position in the team
#[derive(Debug, Deserialize, Clone)]
pub struct TeamConfig {
    pub strategies: Vec<StrategySpec>,
}

impl TeamConfig {
    /// Strategy for the `slot`-th agent of the team
    pub fn strategy_for(&self, slot: usize) -> StrategySpec {
        if self.strategies.is_empty() {
            return StrategySpec::Random;
        }
        self.strategies[slot % self.strategies.len()].clone()
    }
}

/// Weight sets of the linear strategies
#[derive(Debug, Deserialize, Clone)]
pub struct WeightsConfig {
    pub offensive: Weights,
    pub defensive: Weights,
    pub baseline_offensive: Weights,
    pub baseline_defensive: Weights,
    /// Selector of the adaptive strategy
    pub adaptive: Weights,
}

/// Reference arena parameters
#[derive(Debug, Deserialize, Clone)]
pub struct ArenaConfig {
    /// Layout file; the built-in layout is used when absent
    pub layout_path: Option<String>,
    /// Total number of moves, all agents together
    pub time_limit: u32,
    /// Manhattan distance within which opponents are seen exactly
    pub sight_range: i32,
    /// Half-width of the uniform noise added to distance readings
    pub sonar_noise: i32,
    /// Moves a team stays scared after a capsule is eaten
    pub scared_time: u32,
    pub seed: u64,
}

/// Decision log settings
#[derive(Debug, Deserialize, Clone)]
pub struct DebugConfig {
    pub enabled: bool,
    pub log_file_path: String,
}

impl Config {
    /// Loads configuration from a TOML file
    ///
    /// # Arguments
    /// * `path` - Path to the Capture.toml configuration file
    ///
    /// # Returns
    /// * `Result<Config>` - Parsed configuration or a `Config` error
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path.as_ref())
            .map_err(|e| AgentError::Config(format!("Failed to read config file: {}", e)))?;

        toml::from_str(&contents)
            .map_err(|e| AgentError::Config(format!("Failed to parse config file: {}", e)))
    }

    /// Loads default configuration from Capture.toml in the project root
    pub fn load_default() -> Result<Self> {
        Self::from_file("Capture.toml")
    }

    /// Creates a configuration with hardcoded default values as fallback
    /// This should match the values in Capture.toml
    pub fn default_hardcoded() -> Self {
        Config {
            tracking: TrackingConfig {
                num_particles: 300,
                pinned_population: 300,
                opponent_stickiness: 0.5,
                opponent_strategy: StrategySpec::Random,
            },
            search: SearchConfig {
                pruning: true,
                leaf_mode: LeafMode::Utility,
            },
            team: TeamConfig {
                strategies: vec![
                    StrategySpec::Negamax {
                        nested: LinearKind::Offensive,
                        depth: 2,
                    },
                    StrategySpec::Defensive,
                ],
            },
            weights: WeightsConfig {
                offensive: [
                    ("score", 400.0),
                    ("foodDistance", -25.0),
                    ("agentFoodDistance", -5.0),
                    ("ghostDistance", -100.0),
                    ("capsuleDistance", -35.0),
                ]
                .into_iter()
                .collect(),
                defensive: [
                    ("pacmanDistance", -50.0),
                    ("onDefense", 100.0),
                    ("disperse", 0.0),
                    ("dontReverse", -8.0),
                    ("dontStop", -100.0),
                    ("feasts", 0.0),
                ]
                .into_iter()
                .collect(),
                baseline_offensive: [("score", 100.0), ("foodDistance", -1.0)]
                    .into_iter()
                    .collect(),
                baseline_defensive: [
                    ("numInvaders", -1000.0),
                    ("onDefense", 100.0),
                    ("invaderDistance", -10.0),
                    ("dontStop", -100.0),
                    ("dontReverse", -2.0),
                ]
                .into_iter()
                .collect(),
                adaptive: [("onDefense", -1.0)].into_iter().collect(),
            },
            arena: ArenaConfig {
                layout_path: None,
                time_limit: 1200,
                sight_range: 5,
                sonar_noise: 6,
                scared_time: 40,
                seed: 17,
            },
            debug: DebugConfig {
                enabled: false,
                log_file_path: "capture_debug.jsonl".to_string(),
            },
        }
    }

    /// Attempts to load from file, falls back to hardcoded defaults on error
    pub fn load_or_default() -> Self {
        Self::load_default().unwrap_or_else(|e| {
            eprintln!("Warning: Could not load Capture.toml ({}), using hardcoded defaults", e);
            Self::default_hardcoded()
        })
    }
}
