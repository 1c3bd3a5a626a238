use crate::{
    error::{GraphError, Result},
    expansion::ExpansionTree,
    graphs::{Edge, Node, NodeId, TannerGraph},
    observer::{PegStep, ProgressObserver},
};
use serde::{Deserialize, Serialize};
use std::{iter::FusedIterator, mem};
use tracing::{debug, info, trace};

/// How the check node of a committed edge was chosen.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "rule", rename_all = "snake_case")]
pub enum Selection {
    /// First edge of a symbol node: lowest degree over all check nodes.
    LowestDegree,
    /// The expansion reached every check node at `depth`; the candidate came
    /// from the tree one level shallower.
    Covered { depth: usize },
    /// The expansion stopped growing at `depth` with check nodes left over.
    Stalled { depth: usize },
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PegConfig {
    check_nodes: usize,
    symbol_nodes: usize,
    symbol_degrees: Vec<usize>,
}

impl PegConfig {
    pub fn new(check_nodes: usize, symbol_nodes: usize, symbol_degrees: Vec<usize>) -> Result<Self> {
        let config = Self { check_nodes, symbol_nodes, symbol_degrees };
        config.validate()?;
        Ok(config)
    }

    /// Every symbol node gets the same degree `weight`.
    pub fn regular(check_nodes: usize, symbol_nodes: usize, weight: usize) -> Result<Self> {
        Self::new(check_nodes, symbol_nodes, vec![weight; symbol_nodes])
    }

    /// Parameters that reproduce the dimensions and symbol degrees of `graph`.
    pub fn of_graph(graph: &TannerGraph) -> Result<Self> {
        let degrees = graph.symbol_nodes().iter().map(Node::degree).collect();
        Self::new(graph.check_count(), graph.symbol_count(), degrees)
    }

    pub fn validate(&self) -> Result<()> {
        if self.check_nodes == 0 || self.symbol_nodes == 0 {
            return Err(GraphError::InvalidDimensions(format!(
                "need at least one check node and one symbol node, got {} and {}",
                self.check_nodes, self.symbol_nodes
            )));
        }
        if self.symbol_degrees.len() != self.symbol_nodes {
            return Err(GraphError::InvalidDimensions(format!(
                "degree sequence has {} entries for {} symbol nodes",
                self.symbol_degrees.len(), self.symbol_nodes
            )));
        }
        match self.symbol_degrees.iter().position(|&degree| degree > self.check_nodes) {
            Some(symbol) => Err(GraphError::DegreeSequenceInfeasible {
                symbol,
                degree: self.symbol_degrees[symbol],
                check_nodes: self.check_nodes,
            }),
            None => Ok(()),
        }
    }

    #[inline]
    pub fn check_nodes(&self) -> usize {
        self.check_nodes
    }

    #[inline]
    pub fn symbol_nodes(&self) -> usize {
        self.symbol_nodes
    }

    #[inline]
    pub fn symbol_degrees(&self) -> &[usize] {
        &self.symbol_degrees
    }

    #[inline]
    pub fn total_edges(&self) -> usize {
        self.symbol_degrees.iter().sum()
    }

    /// Runs the Progressive Edge Growth construction to completion.
    pub fn construct(&self) -> Result<TannerGraph> {
        let mut growth = EdgeGrowth::new(self)?;
        while growth.grow_edge()?.is_some() {}
        Ok(growth.graph)
    }

    /// Like [`PegConfig::construct`], handing a snapshot to `observer` after
    /// every committed edge.
    pub fn construct_with_observer<O>(&self, observer: &mut O) -> Result<TannerGraph>
        where O: ProgressObserver + ?Sized
    {
        let mut growth = EdgeGrowth::new(self)?;
        let mut index = 0;
        while let Some((edge, selection)) = growth.grow_edge()? {
            observer.observe(PegStep::new(index, edge, selection, growth.graph.clone()));
            index += 1;
        }
        Ok(growth.graph)
    }

    /// Lazy sequence of snapshots, one per committed edge. Each call starts a
    /// fresh construction.
    pub fn steps(&self) -> Result<PegSteps> {
        Ok(PegSteps {
            growth: Some(EdgeGrowth::new(self)?),
            index: 0,
        })
    }
}

/// Iterator returned by [`PegConfig::steps`]. Yields at most one error, after
/// which it is exhausted.
#[derive(Clone, Debug)]
pub struct PegSteps {
    growth: Option<EdgeGrowth>,
    index: usize,
}

impl Iterator for PegSteps {
    type Item = Result<PegStep>;

    fn next(&mut self) -> Option<Self::Item> {
        let growth = self.growth.as_mut()?;
        match growth.grow_edge() {
            Ok(Some((edge, selection))) => {
                let step = PegStep::new(self.index, edge, selection, growth.graph.clone());
                self.index += 1;
                Some(Ok(step))
            }
            Ok(None) => {
                self.growth = None;
                None
            }
            Err(err) => {
                self.growth = None;
                Some(Err(err))
            }
        }
    }
}

impl FusedIterator for PegSteps {}

// Construction state: the graph so far and the position in the degree sequence.
#[derive(Clone, Debug)]
struct EdgeGrowth {
    graph: TannerGraph,
    degrees: Vec<usize>,
    symbol: NodeId,
    edge_index: usize,
}

impl EdgeGrowth {
    fn new(config: &PegConfig) -> Result<Self> {
        config.validate()?;
        info!(
            check_nodes = config.check_nodes,
            symbol_nodes = config.symbol_nodes,
            edges = config.total_edges(),
            "starting progressive edge growth"
        );
        Ok(Self {
            graph: TannerGraph::new(config.check_nodes, config.symbol_nodes)?,
            degrees: config.symbol_degrees.clone(),
            symbol: 0,
            edge_index: 0,
        })
    }

    /// Commits the next edge, or returns `None` once every symbol node has
    /// reached its degree.
    fn grow_edge(&mut self) -> Result<Option<(Edge, Selection)>> {
        while self.symbol < self.degrees.len() && self.edge_index >= self.degrees[self.symbol] {
            self.symbol += 1;
            self.edge_index = 0;
        }
        if self.symbol == self.degrees.len() {
            return Ok(None);
        }
        let symbol = self.symbol;
        let (check, selection) = if self.edge_index == 0 {
            (self.graph.lowest_degree_check_node().id(), Selection::LowestDegree)
        } else {
            self.select_by_expansion(symbol)?
        };
        let edge = self.graph.create_edge(symbol, check)?;
        debug!(symbol, check, edge_index = self.edge_index, ?selection, "edge committed");
        self.edge_index += 1;
        Ok(Some((edge, selection)))
    }

    // Deepens the expansion around `symbol` until it either reaches every
    // check node or stops growing, then picks the lowest degree check node
    // outside the relevant tree.
    fn select_by_expansion(&self, symbol: NodeId) -> Result<(NodeId, Selection)> {
        let graph = &self.graph;
        let mut previous: Option<ExpansionTree> = None;
        let mut tree = graph.expand(symbol, 0)?;
        let mut depth: isize = 0;
        loop {
            if tree.is_fully_covered(graph) {
                let check = match &previous {
                    Some(previous) => previous.lowest_degree_uncovered(graph)?,
                    None => graph.lowest_degree_check_node(),
                };
                return Ok((check.id(), Selection::Covered { depth: tree.actual_level() }));
            }
            let next = graph.expand(symbol, depth + 1)?;
            trace!(symbol, depth = depth + 1, level = next.actual_level(), nodes = next.len(), "expanded");
            if next.actual_level() == tree.actual_level() {
                let check = tree.lowest_degree_uncovered(graph)?;
                return Ok((check.id(), Selection::Stalled { depth: tree.actual_level() }));
            }
            previous = Some(mem::replace(&mut tree, next));
            depth += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn edge_pairs(graph: &TannerGraph) -> Vec<(NodeId, NodeId)> {
        graph.edges().iter().map(|&edge| edge.into()).collect()
    }

    #[test]
    fn small_irregular_example() {
        let config = PegConfig::new(3, 4, vec![1, 2, 2, 1]).unwrap();
        let graph = config.construct().unwrap();
        assert_eq!(edge_pairs(&graph), [(4, 0), (5, 1), (6, 1), (4, 2), (5, 2), (6, 3)]);
        assert_eq!(graph.parity_check_matrix(), "1 0 1 0\n0 1 1 0\n0 1 0 1");
        assert!(graph.is_consistent());
        assert_eq!(graph.girth(), None);
    }

    #[test]
    fn small_regular_example() {
        let config = PegConfig::regular(3, 3, 2).unwrap();
        let steps: Vec<PegStep> = config.steps().unwrap().collect::<Result<_>>().unwrap();
        let selections: Vec<Selection> = steps.iter().map(PegStep::selection).collect();
        assert_eq!(selections, [
            Selection::LowestDegree,
            Selection::Stalled { depth: 2 },
            Selection::LowestDegree,
            Selection::Stalled { depth: 2 },
            Selection::LowestDegree,
            Selection::Covered { depth: 5 },
        ]);
        let graph = steps.last().unwrap().graph();
        assert_eq!(edge_pairs(graph), [(3, 0), (4, 0), (5, 1), (3, 1), (4, 2), (5, 2)]);
        assert_eq!(graph.girth(), Some(6));
    }

    #[test]
    fn infeasible_degree_sequence() {
        assert_eq!(
            PegConfig::new(2, 1, vec![3]),
            Err(GraphError::DegreeSequenceInfeasible { symbol: 0, degree: 3, check_nodes: 2 })
        );
        let config = PegConfig { check_nodes: 2, symbol_nodes: 1, symbol_degrees: vec![3] };
        assert!(matches!(config.construct(), Err(GraphError::DegreeSequenceInfeasible { .. })));
        let mut seen = 0;
        let result = config.construct_with_observer(&mut |_: PegStep| seen += 1);
        assert!(result.is_err());
        assert_eq!(seen, 0);
    }

    #[test]
    fn parameters_of_loaded_graph() {
        let config = PegConfig::new(3, 4, vec![1, 2, 2, 1]).unwrap();
        let graph = TannerGraph::from_matrix(config.construct().unwrap().matrix()).unwrap();
        assert_eq!(PegConfig::of_graph(&graph).unwrap(), config);
    }

    #[test]
    fn invalid_dimensions() {
        assert!(matches!(PegConfig::new(0, 1, vec![0]), Err(GraphError::InvalidDimensions(_))));
        assert!(matches!(PegConfig::new(2, 0, vec![]), Err(GraphError::InvalidDimensions(_))));
        assert!(matches!(PegConfig::new(2, 3, vec![1, 1]), Err(GraphError::InvalidDimensions(_))));
    }

    #[test]
    fn zero_degree_symbols_are_skipped() {
        let graph = PegConfig::new(2, 3, vec![0, 2, 0]).unwrap().construct().unwrap();
        assert_eq!(edge_pairs(&graph), [(3, 1), (4, 1)]);
        let graph = PegConfig::new(2, 2, vec![0, 0]).unwrap().construct().unwrap();
        assert!(graph.edges().is_empty());
    }

    #[test]
    fn degrees_reached_exactly() {
        let config = PegConfig::new(6, 10, vec![3, 2, 4, 1, 6, 3, 3, 2, 5, 2]).unwrap();
        let graph = config.construct().unwrap();
        assert_eq!(graph.edges().len(), config.total_edges());
        for (node, &degree) in graph.symbol_nodes().iter().zip(config.symbol_degrees()) {
            assert_eq!(node.degree(), degree);
        }
        assert!(graph.is_consistent());
    }

    #[test]
    fn observer_sees_every_edge() {
        let config = PegConfig::regular(4, 8, 2).unwrap();
        let mut steps: Vec<PegStep> = Vec::new();
        let graph = config.construct_with_observer(&mut |step: PegStep| steps.push(step)).unwrap();
        assert_eq!(steps.len(), 16);
        for (i, step) in steps.iter().enumerate() {
            assert_eq!(step.index(), i);
            assert_eq!(step.graph().edges().len(), i + 1);
            assert_eq!(step.graph().edges()[i], step.edge());
            assert!(step.graph().is_consistent());
        }
        assert_eq!(steps.last().unwrap().graph(), &graph);
        assert_eq!(graph, config.construct().unwrap());
    }

    #[test]
    fn steps_restart() {
        let config = PegConfig::regular(5, 10, 3).unwrap();
        let first: Vec<Edge> = config.steps().unwrap().map(|step| step.unwrap().edge()).collect();
        let second: Vec<Edge> = config.steps().unwrap().map(|step| step.unwrap().edge()).collect();
        assert_eq!(first.len(), 30);
        assert_eq!(first, second);
        let mut partial = config.steps().unwrap();
        partial.next();
        partial.next();
        assert_eq!(partial.count(), 28);
    }
}
