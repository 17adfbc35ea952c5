// Library exports for the capture agents
// The binary and the integration tests use the crate through these modules

pub mod agents;
pub mod arena;
pub mod config;
pub mod debug_logger;
pub mod error;
pub mod features;
pub mod game;
pub mod search;
pub mod strategy;
pub mod tracking;
pub mod types;
