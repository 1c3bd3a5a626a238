use crate::{
    error::{GraphError, Result},
    graphs::{Node, NodeId, NodeKind, TannerGraph},
};
use getset::{CopyGetters, Getters};
use serde::{Deserialize, Serialize};
use std::{
    collections::{BTreeSet, VecDeque},
    mem,
};

#[derive(Clone, Debug, PartialEq, Eq, Getters, CopyGetters, Serialize, Deserialize)]
pub struct TreeNode {
    #[getset(get_copy = "pub")]
    id: NodeId,
    #[getset(get_copy = "pub")]
    kind: NodeKind,
    #[getset(get_copy = "pub")]
    level: usize,
    /// Indices into the owning tree's node list.
    #[getset(get = "pub")]
    children: Vec<usize>,
}

impl TreeNode {
    fn leaf(node: &Node, level: usize) -> Self {
        Self {
            id: node.id(),
            kind: node.kind(),
            level,
            children: Vec::new(),
        }
    }
}

/// Breadth-first expansion of a Tanner graph around a root node, truncated
/// at a maximum depth.
///
/// Every graph node appears at most once: a node is attached below the first
/// frontier node that reaches it, so the tree records shortest distances from
/// the root even though the graph itself has cycles. Tree nodes refer to
/// graph nodes by id only.
#[derive(Clone, Debug, PartialEq, Eq, CopyGetters, Serialize, Deserialize)]
#[serde(try_from = "RawExpansionTree")]
pub struct ExpansionTree {
    #[getset(get_copy = "pub")]
    root: NodeId,
    #[getset(get_copy = "pub")]
    depth: usize,
    #[getset(get_copy = "pub")]
    actual_level: usize,
    nodes: Vec<TreeNode>,
}

impl ExpansionTree {
    pub fn new(graph: &TannerGraph, root: NodeId, depth: isize) -> Result<Self> {
        let depth = usize::try_from(depth).map_err(|_| GraphError::InvalidDepth(depth))?;
        let mut nodes = vec![TreeNode::leaf(graph.node(root)?, 0)];
        let mut discovered = vec![false; graph.node_count()];
        discovered[root] = true;
        let mut frontier = vec![0];
        let mut level = 0;
        // A round that discovers nothing still counts towards the level; the
        // next round then finds an empty frontier and the level stops growing.
        while !frontier.is_empty() && level < depth {
            level += 1;
            let mut next_frontier = Vec::new();
            for parent in frontier {
                let parent_node = graph.node(nodes[parent].id)?;
                for &neighbor in parent_node.connections() {
                    if discovered[neighbor] {
                        continue;
                    }
                    discovered[neighbor] = true;
                    let child = nodes.len();
                    nodes.push(TreeNode::leaf(graph.node(neighbor)?, level));
                    nodes[parent].children.push(child);
                    next_frontier.push(child);
                }
            }
            frontier = next_frontier;
        }
        Ok(Self {
            root,
            depth,
            actual_level: level,
            nodes,
        })
    }

    /// Tree nodes in discovery order; index 0 is the root.
    #[inline]
    pub fn nodes(&self) -> &[TreeNode] {
        &self.nodes
    }

    #[inline]
    pub fn root_node(&self) -> &TreeNode {
        &self.nodes[0]
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Whether the frontier ran dry before the requested depth was reached.
    #[inline]
    pub fn stalled(&self) -> bool {
        self.actual_level < self.depth
    }

    pub fn children(&self, index: usize) -> impl Iterator<Item = &TreeNode> + '_ {
        self.nodes
            .get(index)
            .into_iter()
            .flat_map(move |node| node.children.iter().map(move |&child| &self.nodes[child]))
    }

    /// `(parent, child)` node id pairs, for hierarchical rendering.
    pub fn tree_edges(&self) -> Vec<(NodeId, NodeId)> {
        self.nodes
            .iter()
            .flat_map(|parent| parent.children.iter().map(move |&child| (parent.id, self.nodes[child].id)))
            .collect()
    }

    /// Check node ids reachable from the root within this tree.
    pub fn covered_check_nodes(&self) -> BTreeSet<NodeId> {
        let mut covered = BTreeSet::new();
        let mut queue = VecDeque::from([0]);
        while let Some(index) = queue.pop_front() {
            let node = &self.nodes[index];
            if node.kind == NodeKind::Check {
                covered.insert(node.id);
            }
            queue.extend(node.children.iter().copied());
        }
        covered
    }

    pub fn is_fully_covered(&self, graph: &TannerGraph) -> bool {
        self.covered_check_nodes().len() == graph.check_count()
    }

    /// Among the check nodes this tree does not reach, the one with the
    /// fewest connections in `graph`, ties going to the lowest id.
    pub fn lowest_degree_uncovered<'g>(&self, graph: &'g TannerGraph) -> Result<&'g Node> {
        let covered = self.covered_check_nodes();
        graph
            .check_nodes()
            .iter()
            .filter(|node| !covered.contains(&node.id()))
            .fold(None::<&Node>, |lowest, node| match lowest {
                Some(lowest) if lowest.degree() <= node.degree() => Some(lowest),
                _ => Some(node),
            })
            .ok_or(GraphError::NoUncoveredNode { root: self.root })
    }
}

#[derive(Deserialize)]
struct RawExpansionTree {
    root: NodeId,
    depth: usize,
    actual_level: usize,
    nodes: Vec<TreeNode>,
}

impl TryFrom<RawExpansionTree> for ExpansionTree {
    type Error = GraphError;

    // The arena must be a tree in discovery order: the root at index 0, every
    // other node the child of exactly one earlier node, one level below it.
    fn try_from(raw: RawExpansionTree) -> Result<Self> {
        let malformed = |reason: String| Err(GraphError::MalformedTree(reason));
        match raw.nodes.first() {
            None => return malformed("tree has no nodes".to_string()),
            Some(first) if first.id != raw.root || first.level != 0 => {
                return malformed(format!("node 0 is not root {} at level 0", raw.root));
            }
            Some(_) => {}
        }
        if raw.actual_level > raw.depth {
            return malformed(format!("level {} exceeds depth {}", raw.actual_level, raw.depth));
        }
        let mut ids = BTreeSet::new();
        let mut attached = vec![false; raw.nodes.len()];
        attached[0] = true;
        for (index, node) in raw.nodes.iter().enumerate() {
            if !ids.insert(node.id) {
                return malformed(format!("graph node {} appears twice", node.id));
            }
            if node.level > raw.actual_level {
                return malformed(format!("node {} lies below level {}", index, raw.actual_level));
            }
            for &child in &node.children {
                if child <= index || child >= raw.nodes.len() {
                    return malformed(format!("node {} has child index {} out of range", index, child));
                }
                if mem::replace(&mut attached[child], true) {
                    return malformed(format!("node {} has more than one parent", child));
                }
                if raw.nodes[child].level != node.level + 1 {
                    return malformed(format!("node {} is not one level below its parent", child));
                }
            }
        }
        if let Some(orphan) = attached.iter().position(|&attached| !attached) {
            return malformed(format!("node {} has no parent", orphan));
        }
        Ok(Self {
            root: raw.root,
            depth: raw.depth,
            actual_level: raw.actual_level,
            nodes: raw.nodes,
        })
    }
}

impl TannerGraph {
    /// Expansion tree rooted at `root`, at most `depth` levels deep.
    #[inline]
    pub fn expand(&self, root: NodeId, depth: isize) -> Result<ExpansionTree> {
        ExpansionTree::new(self, root, depth)
    }
}
