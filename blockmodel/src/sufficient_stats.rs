//! Sufficient statistics for the Bernoulli stochastic blockmodel.
//!
//! Tracks the K×K edge count matrix `C = Z * A * Z'` (diagonal entries
//! count each within-block edge once), block sizes, and the membership
//! vector.
//!
//! Supports O(degree) incremental updates when a single vertex moves,
//! plus full recomputation from the graph.

use crate::graph::UndirectedGraph;

/// Sufficient statistics for the blockmodel.
///
/// All arrays use block indices in `0..k`.
#[derive(Debug, Clone, PartialEq)]
pub struct SufficientStats {
    /// Number of vertices
    pub n: usize,
    /// Number of blocks
    pub k: usize,
    /// K×K edge count matrix, flattened row-major: `edge_counts[a * k + b]`
    pub edge_counts: Vec<usize>,
    /// Number of vertices in each block
    pub block_size: Vec<usize>,
    /// Membership: vertex -> block assignment
    pub membership: Vec<usize>,
}

impl SufficientStats {
    /// Build sufficient statistics from a graph and block labels.
    ///
    /// * `graph` - undirected graph
    /// * `k` - number of blocks
    /// * `labels` - block of each vertex (length n, entries in `0..k`)
    pub fn from_graph(graph: &UndirectedGraph, k: usize, labels: &[usize]) -> Self {
        debug_assert_eq!(labels.len(), graph.num_vertices());
        let mut ret = SufficientStats {
            n: graph.num_vertices(),
            k,
            edge_counts: vec![0; k * k],
            block_size: vec![0; k],
            membership: labels.to_vec(),
        };
        ret.recompute(graph);
        ret
    }

    /// Number of observed edges between blocks `a` and `b`
    #[inline]
    pub fn edge_stat(&self, a: usize, b: usize) -> usize {
        self.edge_counts[a * self.k + b]
    }

    /// Number of vertex pairs that could carry an edge between blocks
    /// `a` and `b`: `n_a * n_b`, or `n_a * (n_a - 1) / 2` when `a == b`.
    #[inline]
    pub fn total_stat(&self, a: usize, b: usize) -> usize {
        if a == b {
            let s = self.block_size[a];
            s * s.saturating_sub(1) / 2
        } else {
            self.block_size[a] * self.block_size[b]
        }
    }

    /// Incrementally update statistics when moving `vertex` from `old_c` to `new_c`.
    ///
    /// * `vertex` - The vertex being moved
    /// * `old_c` - Previous block of vertex
    /// * `new_c` - New block of vertex
    /// * `neighbors` - neighbors of vertex
    pub fn delta_move(&mut self, vertex: usize, old_c: usize, new_c: usize, neighbors: &[usize]) {
        if old_c == new_c {
            return;
        }

        let k = self.k;

        self.block_size[old_c] -= 1;
        self.block_size[new_c] += 1;

        for &nbr in neighbors {
            let nc = self.membership[nbr];

            // Remove contribution of edge (vertex, nbr) from old_c
            self.edge_counts[old_c * k + nc] -= 1;
            if old_c != nc {
                self.edge_counts[nc * k + old_c] -= 1;
            }

            // Add contribution of edge (vertex, nbr) to new_c
            self.edge_counts[new_c * k + nc] += 1;
            if new_c != nc {
                self.edge_counts[nc * k + new_c] += 1;
            }
        }

        self.membership[vertex] = new_c;
    }

    /// Full recomputation of the counts from the graph and the current
    /// membership.
    pub fn recompute(&mut self, graph: &UndirectedGraph) {
        let k = self.k;

        self.edge_counts.clear();
        self.edge_counts.resize(k * k, 0);
        self.block_size.clear();
        self.block_size.resize(k, 0);

        for &c in self.membership.iter() {
            self.block_size[c] += 1;
        }

        for (i, j) in graph.edges() {
            let ci = self.membership[i];
            let cj = self.membership[j];
            self.edge_counts[ci * k + cj] += 1;
            if ci != cj {
                self.edge_counts[cj * k + ci] += 1;
            }
        }
    }
}
