//! Probabilistic tracking of hidden opponents.
//!
//! - `distribution`: sparse weighted outcomes (`Distribution`).
//! - `filter`: the joint particle filter and the `TransitionModel` seam.
//! - `view`: per-agent adapters (`BeliefView`) over the shared filter.

mod distribution;
mod filter;
mod view;

#[cfg(test)]
pub(crate) mod tests_support;

pub use distribution::{Distribution, NORMALIZATION_EPSILON};
pub use filter::{JointParticleFilter, Particle, TransitionModel};
pub use view::{BeliefView, GroundTruth, Marginals, SharedFilter, Tracker};
