//! Greedy (argmax) local search over block assignments.
//!
//! Each step is a synchronous sweep: all vertices score every block
//! against the same frozen snapshot of the assignment and the log-odds
//! matrix, proposals go into a separate buffer, and the buffer is
//! committed at once. The score of block `t` for a vertex is
//!
//! ```text
//! score[t] = sum_c neighbors_in(c) * (ln p_tc - ln(1 - p_tc))
//! ```
//!
//! which keeps the edge part of the local likelihood and drops the
//! non-edge part. Because of that, and because neighbors move in the same
//! sweep, a step can lower the log-likelihood and the sweep can cycle on
//! graphs with little structure; `optimize` stops after `max_steps`.

use crate::blockmodel::Blockmodel;
use log::{debug, warn};
use matrix_util::ndarray_util::argmax_first;
use rayon::prelude::*;

/// Default cap on the number of steps taken by [`GreedyStrategy::optimize`]
pub const DEFAULT_MAX_STEPS: usize = 1000;

#[derive(Debug, Clone)]
pub struct GreedyStrategy {
    step_count: usize,
    max_steps: usize,
}

impl Default for GreedyStrategy {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_STEPS)
    }
}

impl GreedyStrategy {
    pub fn new(max_steps: usize) -> Self {
        GreedyStrategy {
            step_count: 0,
            max_steps,
        }
    }

    /// Total number of steps taken by this optimizer
    pub fn step_count(&self) -> usize {
        self.step_count
    }

    pub fn max_steps(&self) -> usize {
        self.max_steps
    }

    /// One synchronous sweep. Returns whether any vertex changed block.
    pub fn step(&mut self, model: &mut Blockmodel) -> bool {
        self.step_count += 1;

        let proposals = propose_types(model);
        let changed = proposals
            .iter()
            .zip(model.types().iter())
            .any(|(new, old)| new != old);

        if changed {
            model.assign_all(proposals);
        }
        changed
    }

    /// Step until a fixed point or until `max_steps` steps were taken.
    /// Returns the number of steps taken by this call.
    pub fn optimize(&mut self, model: &mut Blockmodel) -> usize {
        let mut steps = 0;
        while steps < self.max_steps {
            let changed = self.step(model);
            steps += 1;
            debug!(
                "[{:>6}] ({:>2}) {:>12.4}",
                self.step_count,
                model.num_types(),
                model.log_likelihood()
            );
            if !changed {
                return steps;
            }
        }
        warn!(
            "greedy optimization stopped after {} steps without reaching a fixed point",
            steps
        );
        steps
    }
}

/// Best block of every vertex against the current assignment, ties
/// going to the lowest block index. The model is not modified.
pub fn propose_types(model: &Blockmodel) -> Vec<usize> {
    let k = model.num_types();
    let log_odds = model.log_odds();
    let types = model.types();
    let graph = model.graph();

    (0..model.num_vertices())
        .into_par_iter()
        .map_init(
            || (vec![0.0f64; k], vec![0.0f64; k]),
            |(counts, scores), v| {
                counts.fill(0.0);
                for &u in graph.neighbors(v) {
                    counts[types[u]] += 1.0;
                }
                for (t, score) in scores.iter_mut().enumerate() {
                    *score = log_odds
                        .row(t)
                        .iter()
                        .zip(counts.iter())
                        .map(|(l, c)| l * c)
                        .sum();
                }
                argmax_first(scores).unwrap_or(types[v])
            },
        )
        .collect()
}
