// Error types surfaced to callers of the agent core

use thiserror::Error;

use crate::types::{AgentId, Direction};

/// Errors produced by the agents, the search engine and the arena
#[derive(Debug, Error)]
pub enum AgentError {
    #[error("action {action} is not legal for agent {agent}")]
    InvalidAction { agent: AgentId, action: Direction },

    #[error("position of agent {0} is unknown")]
    UnknownPosition(AgentId),

    #[error("agent {0} has no legal actions")]
    NoLegalActions(AgentId),

    #[error("agent {0} is not tracked by this belief view")]
    UntrackedAgent(AgentId),

    #[error("agent {0} is not controlled by this team")]
    NotOnTeam(AgentId),

    #[error("invalid layout: {0}")]
    Layout(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, AgentError>;
