//! Entropy-based convergence check for Markov chains.
//!
//! The finite samples of a block are binned into a histogram over the
//! block's range. Each half of the block gets its own histogram on the
//! same bins, and the Jensen-Shannon divergence between the two halves
//! measures how much the sampled distribution drifted within the block:
//!
//! ```text
//! JS = H(pooled) - (n1 * H(first) + n2 * H(second)) / (n1 + n2)
//! ```
//!
//! A chain that still climbs puts its halves in different bins (JS near
//! `ln 2`); a stationary chain gives the same histogram twice (JS near 0).

use crate::traits::ConvergenceCriterion;
use log::debug;

/// Default divergence threshold in nats
pub const DEFAULT_THRESHOLD: f64 = 0.05;

/// Default upper bound on the number of histogram bins
pub const DEFAULT_MAX_BINS: usize = 64;

/// Blocks with fewer finite samples than this are never judged
pub const MIN_SAMPLES: usize = 4;

/// Statistics computed for one block
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EntropyStat {
    /// Entropy of the pooled block histogram (nats)
    pub entropy: f64,
    /// Jensen-Shannon divergence between the two halves (nats)
    pub divergence: f64,
    /// Number of finite samples used
    pub num_samples: usize,
}

#[derive(Debug, Clone)]
pub struct EntropyConvergenceCriterion {
    threshold: f64,
    max_bins: usize,
    history: Vec<EntropyStat>,
    converged: bool,
    unreported: bool,
}

impl Default for EntropyConvergenceCriterion {
    fn default() -> Self {
        Self::new(DEFAULT_THRESHOLD)
    }
}

impl EntropyConvergenceCriterion {
    pub fn new(threshold: f64) -> Self {
        Self {
            threshold,
            max_bins: DEFAULT_MAX_BINS,
            history: vec![],
            converged: false,
            unreported: false,
        }
    }

    pub fn with_max_bins(mut self, max_bins: usize) -> Self {
        self.max_bins = max_bins.max(2);
        self
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn is_converged(&self) -> bool {
        self.converged
    }

    /// Statistics of every block checked so far
    pub fn history(&self) -> &[EntropyStat] {
        &self.history
    }

    fn num_bins(&self, num_samples: usize) -> usize {
        ((num_samples as f64).sqrt() as usize).clamp(2, self.max_bins)
    }
}

impl ConvergenceCriterion for EntropyConvergenceCriterion {
    fn check(&mut self, samples: &[f64]) -> bool {
        if self.converged {
            return true;
        }

        let finite: Vec<f64> = samples.iter().copied().filter(|x| x.is_finite()).collect();
        if finite.len() < MIN_SAMPLES {
            return false;
        }

        let stat = block_entropy_stat(&finite, self.num_bins(finite.len()));
        self.history.push(stat);
        self.unreported = true;

        if stat.divergence < self.threshold {
            debug!(
                "stationary after {} blocks (divergence {:.4})",
                self.history.len(),
                stat.divergence
            );
            self.converged = true;
        }
        self.converged
    }

    fn report(&mut self) -> String {
        match self.history.last() {
            Some(stat) if self.unreported => {
                self.unreported = false;
                format!(
                    "entropy = {:.4}, divergence = {:.4} (threshold {:.4})",
                    stat.entropy, stat.divergence, self.threshold
                )
            }
            _ => String::new(),
        }
    }
}

/// Shannon entropy (nats) of a histogram with `total` observations
fn histogram_entropy(counts: &[usize], total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    let total = total as f64;
    counts
        .iter()
        .filter(|&&c| c > 0)
        .map(|&c| {
            let p = c as f64 / total;
            -p * p.ln()
        })
        .sum()
}

/// Pooled entropy and half-vs-half divergence of finite samples
fn block_entropy_stat(samples: &[f64], num_bins: usize) -> EntropyStat {
    let n = samples.len();
    let lo = samples.iter().copied().fold(f64::INFINITY, f64::min);
    let hi = samples.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let width = hi - lo;

    if width <= 0.0 {
        return EntropyStat {
            entropy: 0.0,
            divergence: 0.0,
            num_samples: n,
        };
    }

    let bin_of = |x: f64| (((x - lo) / width * num_bins as f64) as usize).min(num_bins - 1);

    let half = n / 2;
    let mut first = vec![0usize; num_bins];
    let mut second = vec![0usize; num_bins];
    for (i, &x) in samples.iter().enumerate() {
        if i < half {
            first[bin_of(x)] += 1;
        } else {
            second[bin_of(x)] += 1;
        }
    }
    let pooled: Vec<usize> = first.iter().zip(second.iter()).map(|(a, b)| a + b).collect();

    let h_pooled = histogram_entropy(&pooled, n);
    let h_first = histogram_entropy(&first, half);
    let h_second = histogram_entropy(&second, n - half);
    let h_within = (half as f64 * h_first + (n - half) as f64 * h_second) / n as f64;

    EntropyStat {
        entropy: h_pooled,
        divergence: (h_pooled - h_within).max(0.0),
        num_samples: n,
    }
}
