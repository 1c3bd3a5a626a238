use crate::graphs::{NodeId, NodeKind};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, GraphError>;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum GraphError {
    #[error("invalid dimensions: {0}")]
    InvalidDimensions(String),
    #[error("expansion depth must be non-negative, got {0}")]
    InvalidDepth(isize),
    #[error("no {} node with id {id}", .expected.map_or("graph", NodeKind::name))]
    NodeNotFound { id: NodeId, expected: Option<NodeKind> },
    #[error("edge between check node {check} and symbol node {symbol} already exists")]
    DuplicateEdge { check: NodeId, symbol: NodeId },
    #[error("symbol node {symbol} requests degree {degree} but only {check_nodes} check nodes exist")]
    DegreeSequenceInfeasible { symbol: NodeId, degree: usize, check_nodes: usize },
    #[error("matrix entry at row {row}, column {column} is {value}, expected 0 or 1")]
    NonBinaryEntry { row: usize, column: usize, value: u8 },
    #[error("inconsistent graph: {0}")]
    InconsistentGraph(String),
    #[error("malformed expansion tree: {0}")]
    MalformedTree(String),
    #[error("every check node is covered by the expansion tree rooted at {root}")]
    NoUncoveredNode { root: NodeId },
}
