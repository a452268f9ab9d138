//! Simple undirected graphs stored as sorted adjacency lists.
//!
//! Vertices are `0..n`. Self-loops and repeated edges are dropped when a
//! graph is built, so every neighbor list is sorted and duplicate-free.

use log::info;
use matrix_util::common_io::read_lines_of_words;

/// Undirected edge between two 0-based vertex ids
pub type Edge = (usize, usize);

/// Upper bound on the number of vertices of a graph
pub const MAX_NUM_VERTICES: usize = 1 << 27;

#[derive(Debug, Clone, Default)]
pub struct UndirectedGraph {
    adjacency: Vec<Vec<usize>>,
    num_edges: usize,
}

impl UndirectedGraph {
    /// Build a graph on exactly `n` vertices.
    ///
    /// * `n` - number of vertices
    /// * `edges` - edge list; each undirected edge may appear in either orientation
    pub fn from_edges(n: usize, edges: &[Edge]) -> anyhow::Result<Self> {
        if n > MAX_NUM_VERTICES {
            return Err(anyhow::anyhow!(
                "{} vertices exceed the limit of {}",
                n,
                MAX_NUM_VERTICES
            ));
        }
        if let Some(&(u, v)) = edges.iter().find(|&&(u, v)| u >= n || v >= n) {
            return Err(anyhow::anyhow!(
                "edge ({}, {}) refers to a vertex outside 0..{}",
                u,
                v,
                n
            ));
        }
        Ok(Self::build(n, edges))
    }

    /// Build a graph whose vertex count is one more than the largest id
    pub fn from_edge_list(edges: &[Edge]) -> anyhow::Result<Self> {
        let max_id = edges.iter().map(|&(u, v)| u.max(v)).max();
        let n = match max_id {
            Some(id) => id
                .checked_add(1)
                .ok_or_else(|| anyhow::anyhow!("vertex id {} is out of range", id))?,
            None => 0,
        };
        Self::from_edges(n, edges)
    }

    fn build(n: usize, edges: &[Edge]) -> Self {
        let mut adjacency = vec![Vec::new(); n];
        for &(u, v) in edges {
            if u != v {
                adjacency[u].push(v);
                adjacency[v].push(u);
            }
        }

        let mut num_edges = 0;
        for nbrs in adjacency.iter_mut() {
            nbrs.sort_unstable();
            nbrs.dedup();
            num_edges += nbrs.len();
        }

        Self {
            adjacency,
            num_edges: num_edges / 2,
        }
    }

    ///
    /// Read a whitespace-separated edge list, one `u v` pair per line.
    /// Columns after the first two are ignored.
    ///
    /// * `input_file` - file name--either gzipped or not, or `-` for stdin
    ///
    pub fn read_edge_list(input_file: &str) -> anyhow::Result<Self> {
        let lines = read_lines_of_words(input_file)?;

        let parse_id = |word: &str, line_number: usize| -> anyhow::Result<usize> {
            let id = word.parse::<usize>().map_err(|_| {
                anyhow::anyhow!(
                    "{}:{}: invalid vertex id '{}'",
                    input_file,
                    line_number,
                    word
                )
            })?;
            if id >= MAX_NUM_VERTICES {
                return Err(anyhow::anyhow!(
                    "{}:{}: vertex id {} exceeds the limit of {} vertices",
                    input_file,
                    line_number,
                    id,
                    MAX_NUM_VERTICES
                ));
            }
            Ok(id)
        };

        let mut edges = Vec::with_capacity(lines.len());
        for line in lines.iter() {
            if line.words.len() < 2 {
                return Err(anyhow::anyhow!(
                    "{}:{}: expected two vertex ids",
                    input_file,
                    line.line_number
                ));
            }
            let u = parse_id(&line.words[0], line.line_number)?;
            let v = parse_id(&line.words[1], line.line_number)?;
            edges.push((u, v));
        }

        let graph = Self::from_edge_list(&edges)?;
        info!(
            "read {} vertices and {} edges from {}",
            graph.num_vertices(),
            graph.num_edges(),
            input_file
        );
        Ok(graph)
    }

    pub fn num_vertices(&self) -> usize {
        self.adjacency.len()
    }

    pub fn num_edges(&self) -> usize {
        self.num_edges
    }

    /// Sorted neighbors of `vertex`
    #[inline]
    pub fn neighbors(&self, vertex: usize) -> &[usize] {
        &self.adjacency[vertex]
    }

    #[inline]
    pub fn degree(&self, vertex: usize) -> usize {
        self.adjacency[vertex].len()
    }

    /// Each edge once, as `(u, v)` with `u < v`
    pub fn edges(&self) -> impl Iterator<Item = Edge> + '_ {
        self.adjacency
            .iter()
            .enumerate()
            .flat_map(|(u, nbrs)| nbrs.iter().filter(move |&&v| u < v).map(move |&v| (u, v)))
    }
}
