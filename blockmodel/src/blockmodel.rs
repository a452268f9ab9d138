//! Bernoulli stochastic blockmodel over an undirected graph.
//!
//! Each vertex carries a block (type) in `0..K`. An edge between vertices
//! of blocks `a` and `b` appears independently with probability `p_ab`,
//! estimated by maximum likelihood from the current assignment. The
//! blockmodel owns the assignment and keeps the probability matrix and
//! the log-likelihood consistent with it after every mutation.
//!
//! Moving one vertex costs O(degree + K): the edge tallies change only
//! along the vertex's incident edges, and only block pairs involving the
//! old or the new block are re-scored.

use crate::graph::UndirectedGraph;
use crate::model::{bernoulli_score, edge_probability};
use crate::sufficient_stats::SufficientStats;
use matrix_util::ndarray_util::log_odds;
use ndarray::{Array2, ArrayView2};
use rand::Rng;

#[derive(Debug, Clone)]
pub struct Blockmodel<'g> {
    graph: &'g UndirectedGraph,
    stats: SufficientStats,
    /// K×K edge probabilities
    probs: Array2<f64>,
    /// K×K per-pair log-likelihood terms (symmetric)
    pair_scores: Array2<f64>,
    log_likelihood: f64,
}

impl<'g> Blockmodel<'g> {
    /// Every vertex starts in block 0.
    pub fn new(graph: &'g UndirectedGraph, k: usize) -> anyhow::Result<Self> {
        Self::with_types(graph, k, vec![0; graph.num_vertices()])
    }

    /// Build a model from a full type assignment.
    ///
    /// * `graph` - the graph being modelled; must outlive the model
    /// * `k` - number of blocks (at least 1)
    /// * `types` - block of each vertex
    pub fn with_types(
        graph: &'g UndirectedGraph,
        k: usize,
        types: Vec<usize>,
    ) -> anyhow::Result<Self> {
        if k == 0 {
            return Err(anyhow::anyhow!("a blockmodel needs at least one type"));
        }
        validate_types(&types, graph.num_vertices(), k)?;

        let mut ret = Blockmodel {
            graph,
            stats: SufficientStats::from_graph(graph, k, &types),
            probs: Array2::zeros((k, k)),
            pair_scores: Array2::zeros((k, k)),
            log_likelihood: 0.0,
        };
        ret.refresh_all_pairs();
        Ok(ret)
    }

    /// Move `vertex` into block `new_type`.
    pub fn set_type(&mut self, vertex: usize, new_type: usize) -> anyhow::Result<()> {
        if vertex >= self.num_vertices() {
            return Err(anyhow::anyhow!(
                "vertex {} out of range (n = {})",
                vertex,
                self.num_vertices()
            ));
        }
        if new_type >= self.num_types() {
            return Err(anyhow::anyhow!(
                "type {} out of range (K = {})",
                new_type,
                self.num_types()
            ));
        }
        self.move_vertex(vertex, new_type);
        Ok(())
    }

    /// Replace the whole assignment and recompute everything from scratch.
    pub fn set_types(&mut self, types: &[usize]) -> anyhow::Result<()> {
        validate_types(types, self.num_vertices(), self.num_types())?;
        self.stats.membership.copy_from_slice(types);
        self.recompute();
        Ok(())
    }

    /// Draw every vertex's block uniformly from `0..K`.
    pub fn randomize<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        let k = self.num_types();
        for t in self.stats.membership.iter_mut() {
            *t = rng.random_range(0..k);
        }
        self.recompute();
    }

    /// Full recalibration of the counts, probabilities and the cached
    /// log-likelihood. Returns how far the cached value had drifted.
    pub fn recompute(&mut self) -> f64 {
        let before = self.log_likelihood;
        self.stats.recompute(self.graph);
        self.refresh_all_pairs();
        (self.log_likelihood - before).abs()
    }

    /// Cached log-likelihood of the graph under the current assignment
    pub fn log_likelihood(&self) -> f64 {
        self.log_likelihood
    }

    /// K×K matrix of edge probabilities between blocks
    pub fn probabilities(&self) -> ArrayView2<'_, f64> {
        self.probs.view()
    }

    /// K×K matrix of `ln p - ln(1 - p)`, computed on clamped probabilities
    pub fn log_odds(&self) -> Array2<f64> {
        log_odds(&self.probs.view())
    }

    /// Block of `vertex`; panics when `vertex` is out of range
    pub fn get_type(&self, vertex: usize) -> usize {
        self.stats.membership[vertex]
    }

    pub fn types(&self) -> &[usize] {
        &self.stats.membership
    }

    pub fn num_types(&self) -> usize {
        self.stats.k
    }

    pub fn num_vertices(&self) -> usize {
        self.stats.n
    }

    pub fn graph(&self) -> &'g UndirectedGraph {
        self.graph
    }

    /// Number of vertices in each block
    pub fn block_sizes(&self) -> &[usize] {
        &self.stats.block_size
    }

    /// Observed edges between blocks `a` and `b`
    pub fn edge_count(&self, a: usize, b: usize) -> usize {
        self.stats.edge_stat(a, b)
    }

    /// Free parameters: one probability per unordered block pair
    pub fn num_parameters(&self) -> usize {
        let k = self.num_types();
        k * (k + 1) / 2
    }

    /// Unchecked single-vertex move used by the samplers
    pub(crate) fn move_vertex(&mut self, vertex: usize, new_type: usize) {
        let old_type = self.stats.membership[vertex];
        if old_type == new_type {
            return;
        }

        self.stats
            .delta_move(vertex, old_type, new_type, self.graph.neighbors(vertex));

        for c in 0..self.num_types() {
            self.log_likelihood += self.refresh_pair(old_type, c);
            if c != old_type {
                self.log_likelihood += self.refresh_pair(new_type, c);
            }
        }
    }

    /// Unchecked bulk assignment used by the greedy optimizer
    pub(crate) fn assign_all(&mut self, types: Vec<usize>) {
        debug_assert_eq!(types.len(), self.num_vertices());
        self.stats.membership = types;
        self.recompute();
    }

    /// Re-estimate `p_ab` and return the change of the pair's score
    fn refresh_pair(&mut self, a: usize, b: usize) -> f64 {
        let edge = self.stats.edge_stat(a, b);
        let total = self.stats.total_stat(a, b);
        let p = edge_probability(edge, total);
        let score = bernoulli_score(edge, total);
        let delta = score - self.pair_scores[[a, b]];

        self.probs[[a, b]] = p;
        self.probs[[b, a]] = p;
        self.pair_scores[[a, b]] = score;
        self.pair_scores[[b, a]] = score;
        delta
    }

    fn refresh_all_pairs(&mut self) {
        let k = self.num_types();
        let mut log_likelihood = 0.0;
        for a in 0..k {
            for b in a..k {
                self.refresh_pair(a, b);
                log_likelihood += self.pair_scores[[a, b]];
            }
        }
        self.log_likelihood = log_likelihood;
    }
}

fn validate_types(types: &[usize], n: usize, k: usize) -> anyhow::Result<()> {
    if types.len() != n {
        return Err(anyhow::anyhow!(
            "type assignment has {} entries for {} vertices",
            types.len(),
            n
        ));
    }
    if let Some((v, &t)) = types.iter().enumerate().find(|&(_, &t)| t >= k) {
        return Err(anyhow::anyhow!(
            "vertex {} has type {} outside 0..{}",
            v,
            t,
            k
        ));
    }
    Ok(())
}
