//! Stochastic blockmodel (SBM) fitting for undirected graphs.
//!
//! Every vertex carries one of K types and an edge between types `a` and
//! `b` is present with probability `p_ab`. Given an assignment, `p_ab` is
//! the maximum-likelihood edge density between the two blocks, and the
//! assignment is searched with a parallel greedy optimizer followed by a
//! single-vertex Metropolis-Hastings chain.
//!
//! # Model
//!
//! Bernoulli edges, log-likelihood updated in O(degree + K) per move.
//! K is fixed or selected by AIC over `2..=floor(sqrt(n))`.

/// Simple undirected graphs and edge-list input
pub mod graph;

/// Edge counts and block sizes per block pair
pub mod sufficient_stats;

/// Bernoulli score functions
pub mod model;

/// Assignment, probability matrix and incrementally updated log-likelihood
pub mod blockmodel;

/// Parallel synchronous argmax optimizer
pub mod greedy;

/// Metropolis-Hastings sampler over assignments
pub mod metropolis;

/// AIC/BIC and the sweep over block counts
pub mod selection;

/// Driver tying initialisation, sampling and selection together
pub mod fit;

/// Model writers (plain, JSON, null) and JSON reader
pub mod io;

#[cfg(test)]
mod test;

pub use blockmodel::Blockmodel;
pub use fit::{BlockmodelFitter, FitOptions, FitOutcome, InitMethod, Interrupts};
pub use graph::UndirectedGraph;
pub use io::{model_writer, ModelWriter, OutputFormat};
