use crate::error::{GraphError, Result};
use getset::{CopyGetters, Getters};
use petgraph::graph::{NodeIndex, UnGraph};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::{
    collections::{HashSet, VecDeque},
    fmt,
};

/// Node identifier. Symbol nodes occupy `0..S` and check nodes occupy
/// `S..S+C`, so ids are unique across both partitions.
pub type NodeId = usize;

#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    Symbol,
    Check,
}

impl NodeKind {
    #[inline]
    pub fn name(self) -> &'static str {
        match self {
            Self::Symbol => "symbol",
            Self::Check => "check",
        }
    }

    #[inline]
    fn prefix(self) -> char {
        match self {
            Self::Symbol => 'S',
            Self::Check => 'C',
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Getters, CopyGetters, Serialize, Deserialize)]
pub struct Node {
    #[getset(get_copy = "pub")]
    id: NodeId,
    #[getset(get_copy = "pub")]
    kind: NodeKind,
    #[getset(get = "pub")]
    label: String,
    #[getset(get = "pub")]
    connections: Vec<NodeId>,
}

impl Node {
    fn new(id: NodeId, kind: NodeKind, local_index: usize) -> Self {
        Self {
            id,
            kind,
            label: format!("{}{}", kind.prefix(), local_index),
            connections: Vec::new(),
        }
    }

    #[inline]
    pub fn degree(&self) -> usize {
        self.connections.len()
    }

    #[inline]
    pub fn is_check(&self) -> bool {
        self.kind == NodeKind::Check
    }

    #[inline]
    pub fn is_symbol(&self) -> bool {
        self.kind == NodeKind::Symbol
    }
}

#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edge {
    pub check: NodeId,
    pub symbol: NodeId,
}

impl From<Edge> for (NodeId, NodeId) {
    fn from(edge: Edge) -> Self {
        (edge.check, edge.symbol)
    }
}

impl fmt::Display for Edge {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "({}, {})", self.check, self.symbol)
    }
}

/// Bipartite graph of symbol and check nodes.
///
/// Adjacency is stored redundantly: as a `C x S` binary matrix, as the edge
/// list in creation order, and as the connection list of every node. All
/// four agree after every call to [`TannerGraph::create_edge`], which is the
/// only mutator. Deserialization replays the edge list through it and
/// rejects input whose matrix or nodes disagree with the result.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawTannerGraph")]
pub struct TannerGraph {
    check_count: usize,
    symbol_count: usize,
    nodes: Vec<Node>,
    edges: Vec<Edge>,
    matrix: Vec<Vec<u8>>,
}

impl TannerGraph {
    pub fn new(check_count: usize, symbol_count: usize) -> Result<Self> {
        if check_count == 0 || symbol_count == 0 {
            return Err(GraphError::InvalidDimensions(format!(
                "need at least one check node and one symbol node, got {} and {}",
                check_count, symbol_count
            )));
        }
        let symbols = (0..symbol_count).map(|i| Node::new(i, NodeKind::Symbol, i));
        let checks = (0..check_count).map(|i| Node::new(symbol_count + i, NodeKind::Check, i));
        Ok(Self {
            check_count,
            symbol_count,
            nodes: symbols.chain(checks).collect(),
            edges: Vec::new(),
            matrix: vec![vec![0; symbol_count]; check_count],
        })
    }

    /// Graph whose parity check matrix is `rows`, one row per check node.
    /// Edges are created row by row, left to right.
    pub fn from_matrix(rows: &[Vec<u8>]) -> Result<Self> {
        let symbol_count = rows.first().map_or(0, Vec::len);
        if let Some(row) = rows.iter().position(|entries| entries.len() != symbol_count) {
            return Err(GraphError::InvalidDimensions(format!(
                "row {} has {} entries but row 0 has {}",
                row, rows[row].len(), symbol_count
            )));
        }
        let mut graph = Self::new(rows.len(), symbol_count)?;
        for (row, entries) in rows.iter().enumerate() {
            for (column, &value) in entries.iter().enumerate() {
                match value {
                    0 => {}
                    1 => {
                        graph.create_edge(column, symbol_count + row)?;
                    }
                    _ => return Err(GraphError::NonBinaryEntry { row, column, value }),
                }
            }
        }
        Ok(graph)
    }

    #[inline]
    pub fn check_count(&self) -> usize {
        self.check_count
    }

    #[inline]
    pub fn symbol_count(&self) -> usize {
        self.symbol_count
    }

    #[inline]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    #[inline]
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    #[inline]
    pub fn symbol_nodes(&self) -> &[Node] {
        &self.nodes[..self.symbol_count]
    }

    #[inline]
    pub fn check_nodes(&self) -> &[Node] {
        &self.nodes[self.symbol_count..]
    }

    /// Edges as `(check, symbol)` pairs in creation order.
    #[inline]
    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    /// Rows are check nodes, columns are symbol nodes.
    #[inline]
    pub fn matrix(&self) -> &[Vec<u8>] {
        &self.matrix
    }

    pub fn node(&self, id: NodeId) -> Result<&Node> {
        self.nodes.get(id).ok_or(GraphError::NodeNotFound { id, expected: None })
    }

    pub fn symbol_node(&self, id: NodeId) -> Result<&Node> {
        self.node_of_kind(id, NodeKind::Symbol)
    }

    pub fn check_node(&self, id: NodeId) -> Result<&Node> {
        self.node_of_kind(id, NodeKind::Check)
    }

    fn node_of_kind(&self, id: NodeId, kind: NodeKind) -> Result<&Node> {
        self.nodes
            .get(id)
            .filter(|node| node.kind == kind)
            .ok_or(GraphError::NodeNotFound { id, expected: Some(kind) })
    }

    #[inline]
    fn row(&self, check: NodeId) -> usize {
        check - self.symbol_count
    }

    pub fn has_edge(&self, symbol: NodeId, check: NodeId) -> bool {
        symbol < self.symbol_count
            && (self.symbol_count..self.node_count()).contains(&check)
            && self.matrix[self.row(check)][symbol] == 1
    }

    pub fn create_edge(&mut self, symbol: NodeId, check: NodeId) -> Result<Edge> {
        self.symbol_node(symbol)?;
        self.check_node(check)?;
        if self.has_edge(symbol, check) {
            return Err(GraphError::DuplicateEdge { check, symbol });
        }
        let row = self.row(check);
        self.matrix[row][symbol] = 1;
        self.nodes[symbol].connections.push(check);
        self.nodes[check].connections.push(symbol);
        let edge = Edge { check, symbol };
        self.edges.push(edge);
        Ok(edge)
    }

    /// Check node with the fewest connections; ties go to the lowest id.
    #[inline]
    pub fn lowest_degree_check_node(&self) -> &Node {
        lowest_degree(self.check_nodes())
    }

    /// Symbol node with the fewest connections; ties go to the lowest id.
    #[inline]
    pub fn lowest_degree_symbol_node(&self) -> &Node {
        lowest_degree(self.symbol_nodes())
    }

    /// Verifies that matrix, edge list and both sides' connection lists
    /// describe the same set of edges.
    pub fn is_consistent(&self) -> bool {
        let ones: usize = self.matrix.iter().flatten().map(|&entry| entry as usize).sum();
        let symbol_degrees: usize = self.symbol_nodes().iter().map(Node::degree).sum();
        let check_degrees: usize = self.check_nodes().iter().map(Node::degree).sum();
        if ones != self.edges.len()
            || symbol_degrees != self.edges.len()
            || check_degrees != self.edges.len()
        {
            return false;
        }
        let distinct: HashSet<&Edge> = self.edges.iter().collect();
        distinct.len() == self.edges.len() && self.edges.iter().all(|&Edge { check, symbol }| {
            self.has_edge(symbol, check)
                && self.nodes[symbol].connections.contains(&check)
                && self.nodes[check].connections.contains(&symbol)
        })
    }

    /// Renders the matrix with one line per check node.
    pub fn parity_check_matrix(&self) -> String {
        self.matrix
            .iter()
            .map(|row| row.iter().map(u8::to_string).collect::<Vec<_>>().join(" "))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Undirected petgraph view; node index `i` is node id `i`.
    pub fn to_petgraph(&self) -> UnGraph<NodeKind, ()> {
        let mut graph = UnGraph::with_capacity(self.node_count(), self.edges.len());
        for node in &self.nodes {
            graph.add_node(node.kind);
        }
        for edge in &self.edges {
            graph.add_edge(NodeIndex::new(edge.check), NodeIndex::new(edge.symbol), ());
        }
        graph
    }

    /// Length of the shortest cycle, or `None` if the graph is a forest.
    pub fn girth(&self) -> Option<usize> {
        let graph = self.to_petgraph();
        (0..graph.node_count())
            .into_par_iter()
            .filter_map(|root| shortest_cycle_through(&graph, NodeIndex::new(root)))
            .min()
    }
}

#[derive(Deserialize)]
struct RawTannerGraph {
    check_count: usize,
    symbol_count: usize,
    nodes: Vec<Node>,
    edges: Vec<Edge>,
    matrix: Vec<Vec<u8>>,
}

impl TryFrom<RawTannerGraph> for TannerGraph {
    type Error = GraphError;

    fn try_from(raw: RawTannerGraph) -> Result<Self> {
        let mut graph = Self::new(raw.check_count, raw.symbol_count)?;
        for edge in &raw.edges {
            graph.create_edge(edge.symbol, edge.check)?;
        }
        if graph.matrix != raw.matrix {
            return Err(GraphError::InconsistentGraph("matrix disagrees with the edge list".to_string()));
        }
        if graph.nodes != raw.nodes {
            return Err(GraphError::InconsistentGraph(
                "node labels or connections disagree with the edge list".to_string(),
            ));
        }
        Ok(graph)
    }
}

impl fmt::Display for TannerGraph {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.parity_check_matrix())
    }
}

// `nodes` is never empty: graphs have at least one node in each partition.
fn lowest_degree(nodes: &[Node]) -> &Node {
    nodes.iter().fold(&nodes[0], |lowest, node| {
        if node.degree() < lowest.degree() {
            node
        } else {
            lowest
        }
    })
}

// Breadth-first search from `root`; the minimum over all roots is the girth.
fn shortest_cycle_through(graph: &UnGraph<NodeKind, ()>, root: NodeIndex) -> Option<usize> {
    let mut dist = vec![usize::MAX; graph.node_count()];
    let mut parent = vec![None; graph.node_count()];
    let mut queue = VecDeque::from([root]);
    let mut shortest: Option<usize> = None;
    dist[root.index()] = 0;
    while let Some(u) = queue.pop_front() {
        if shortest.map_or(false, |len| 2 * dist[u.index()] >= len) {
            break;
        }
        for w in graph.neighbors(u) {
            if dist[w.index()] == usize::MAX {
                dist[w.index()] = dist[u.index()] + 1;
                parent[w.index()] = Some(u);
                queue.push_back(w);
            } else if parent[u.index()] != Some(w) {
                let len = dist[u.index()] + dist[w.index()] + 1;
                shortest = Some(shortest.map_or(len, |s| s.min(len)));
            }
        }
    }
    shortest
}
