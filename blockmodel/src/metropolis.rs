//! Metropolis-Hastings sampler over block assignments.
//!
//! A proposal moves one uniformly chosen vertex to a uniformly chosen
//! different block. The proposal is symmetric, so the move is accepted
//! with probability `min(1, exp(logL' - logL))` and the chain targets the
//! distribution proportional to the likelihood. Rejected moves are undone
//! in place.

use crate::blockmodel::Blockmodel;
use rand::rngs::SmallRng;
use rand::Rng;

/// Single-vertex Metropolis-Hastings sampler that also remembers the
/// best assignment it has visited.
#[derive(Debug, Clone)]
pub struct MetropolisHastingsStrategy<'g> {
    rng: SmallRng,
    step_count: usize,
    accept_count: usize,
    last_accepted: bool,
    best_model: Option<Blockmodel<'g>>,
    best_log_likelihood: f64,
}

impl<'g> MetropolisHastingsStrategy<'g> {
    /// Create a new sampler with the given RNG.
    pub fn new(rng: SmallRng) -> Self {
        MetropolisHastingsStrategy {
            rng,
            step_count: 0,
            accept_count: 0,
            last_accepted: false,
            best_model: None,
            best_log_likelihood: f64::NEG_INFINITY,
        }
    }

    /// Propose and accept or reject one move. Returns whether the
    /// proposal was accepted.
    ///
    /// With a single block there is nothing to propose and the step
    /// counts as rejected.
    pub fn step(&mut self, model: &mut Blockmodel<'g>) -> bool {
        self.step_count += 1;

        let k = model.num_types();
        let n = model.num_vertices();
        let accepted = if k < 2 || n == 0 {
            false
        } else {
            let vertex = self.rng.random_range(0..n);
            let old_type = model.get_type(vertex);

            // uniform over the other K - 1 blocks
            let mut new_type = self.rng.random_range(0..(k - 1));
            if new_type >= old_type {
                new_type += 1;
            }

            let old_log_l = model.log_likelihood();
            model.move_vertex(vertex, new_type);
            let new_log_l = model.log_likelihood();

            let accept = new_log_l >= old_log_l
                || self.rng.random::<f64>() < (new_log_l - old_log_l).exp();

            if !accept {
                model.move_vertex(vertex, old_type);
            }
            accept
        };

        if accepted {
            self.accept_count += 1;
        }
        self.last_accepted = accepted;
        self.observe(model);
        accepted
    }

    /// Offer `model` as a best-model candidate. Returns whether it
    /// replaced the previous best.
    pub fn observe(&mut self, model: &Blockmodel<'g>) -> bool {
        let log_l = model.log_likelihood();
        if self.best_model.is_none() || log_l > self.best_log_likelihood {
            self.best_model = Some(model.clone());
            self.best_log_likelihood = log_l;
            return true;
        }
        false
    }

    /// Fraction of accepted proposals; 0 before the first step
    pub fn acceptance_ratio(&self) -> f64 {
        if self.step_count == 0 {
            0.0
        } else {
            self.accept_count as f64 / self.step_count as f64
        }
    }

    pub fn step_count(&self) -> usize {
        self.step_count
    }

    pub fn accept_count(&self) -> usize {
        self.accept_count
    }

    pub fn last_proposal_accepted(&self) -> bool {
        self.last_accepted
    }

    /// Best model seen so far, if any
    pub fn best_model(&self) -> Option<&Blockmodel<'g>> {
        self.best_model.as_ref()
    }

    pub fn best_log_likelihood(&self) -> f64 {
        self.best_log_likelihood
    }

    /// Move the best model out, leaving the sampler without one
    pub fn take_best(&mut self) -> Option<Blockmodel<'g>> {
        self.best_log_likelihood = f64::NEG_INFINITY;
        self.best_model.take()
    }

    /// The sampler's random stream, for sharing with initialisation
    pub fn rng_mut(&mut self) -> &mut SmallRng {
        &mut self.rng
    }

    /// Give the random stream back, e.g. to seed the next sampler
    pub fn into_rng(self) -> SmallRng {
        self.rng
    }
}
