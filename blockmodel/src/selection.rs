//! Choosing the number of blocks by information criteria.
//!
//! A model with K blocks has `K(K+1)/2` free edge probabilities. With
//! `N = n(n-1)/2` observed vertex pairs,
//!
//! ```text
//! AIC = 2 p - 2 logL
//! BIC = p ln(N) - 2 logL
//! ```
//!
//! The candidate with the smallest AIC is selected; BIC is reported.

use crate::blockmodel::Blockmodel;
use log::{debug, info};
use serde::{Deserialize, Serialize};

/// Akaike information criterion of a fitted model
pub fn aic(model: &Blockmodel) -> f64 {
    2.0 * model.num_parameters() as f64 - 2.0 * model.log_likelihood()
}

/// Bayesian information criterion of a fitted model
pub fn bic(model: &Blockmodel) -> f64 {
    let n = model.num_vertices();
    let num_pairs = (n * n.saturating_sub(1) / 2).max(1) as f64;
    model.num_parameters() as f64 * num_pairs.ln() - 2.0 * model.log_likelihood()
}

/// Candidate block counts: `2..=max_groups`, where `max_groups`
/// defaults to `floor(sqrt(n))`. A single block is the fallback when
/// that range is empty.
pub fn candidate_group_counts(num_vertices: usize, max_groups: Option<usize>) -> Vec<usize> {
    let upper = max_groups.unwrap_or(num_vertices.isqrt());
    if upper < 2 {
        vec![1]
    } else {
        (2..=upper).collect()
    }
}

/// Scores of one fitted candidate
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CandidateScore {
    pub num_types: usize,
    pub log_likelihood: f64,
    pub aic: f64,
    pub bic: f64,
}

impl CandidateScore {
    pub fn of(model: &Blockmodel) -> Self {
        CandidateScore {
            num_types: model.num_types(),
            log_likelihood: model.log_likelihood(),
            aic: aic(model),
            bic: bic(model),
        }
    }
}

/// Explicit iteration over candidate block counts.
///
/// Callers pull the next K with [`ModelSelection::next_candidate`], fit
/// it however they like, and hand the fitted model to
/// [`ModelSelection::record`]. Nothing ties one candidate's fit to the
/// next, so a sweep can be resumed or split.
#[derive(Debug, Clone)]
pub struct ModelSelection<'g> {
    candidates: Vec<usize>,
    next: usize,
    scores: Vec<CandidateScore>,
    best_model: Option<Blockmodel<'g>>,
    best_aic: Option<CandidateScore>,
    best_bic: Option<CandidateScore>,
}

impl<'g> ModelSelection<'g> {
    pub fn new(num_vertices: usize, max_groups: Option<usize>) -> Self {
        Self::with_candidates(candidate_group_counts(num_vertices, max_groups))
    }

    pub fn with_candidates(candidates: Vec<usize>) -> Self {
        ModelSelection {
            candidates,
            next: 0,
            scores: vec![],
            best_model: None,
            best_aic: None,
            best_bic: None,
        }
    }

    pub fn candidates(&self) -> &[usize] {
        &self.candidates
    }

    /// Next block count to try, or `None` when the sweep is done
    pub fn next_candidate(&mut self) -> Option<usize> {
        let k = self.candidates.get(self.next).copied();
        if k.is_some() {
            self.next += 1;
        }
        k
    }

    /// Skip every candidate up to and including `k`
    pub fn resume_after(&mut self, k: usize) {
        while self.next < self.candidates.len() && self.candidates[self.next] <= k {
            self.next += 1;
        }
    }

    pub fn is_done(&self) -> bool {
        self.next >= self.candidates.len()
    }

    /// Score a fitted candidate and keep it if its AIC is the lowest so far
    pub fn record(&mut self, model: Blockmodel<'g>) -> CandidateScore {
        let score = CandidateScore::of(&model);

        if self.best_bic.is_none_or(|b| score.bic < b.bic) {
            self.best_bic = Some(score);
        }
        if self.best_aic.is_none_or(|b| score.aic < b.aic) {
            self.best_aic = Some(score);
            self.best_model = Some(model);
        }

        debug!(
            "K = {}: AIC = {:.4} ({:.4}), BIC = {:.4} ({:.4})",
            score.num_types,
            score.aic,
            self.best_aic.map_or(score.aic, |b| b.aic),
            score.bic,
            self.best_bic.map_or(score.bic, |b| b.bic),
        );

        self.scores.push(score);
        score
    }

    /// Scores of every recorded candidate, in recording order
    pub fn scores(&self) -> &[CandidateScore] {
        &self.scores
    }

    pub fn best_aic(&self) -> Option<CandidateScore> {
        self.best_aic
    }

    pub fn best_bic(&self) -> Option<CandidateScore> {
        self.best_bic
    }

    pub fn best_model(&self) -> Option<&Blockmodel<'g>> {
        self.best_model.as_ref()
    }

    /// Finish the sweep and hand over the minimum-AIC model
    pub fn into_best(self) -> Option<Blockmodel<'g>> {
        if let (Some(a), Some(b)) = (self.best_aic, self.best_bic) {
            info!("best type count is {} (by BIC: {})", a.num_types, b.num_types);
        }
        self.best_model
    }
}
