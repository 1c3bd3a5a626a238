use crate::{
    graphs::{Edge, TannerGraph},
    peg::Selection,
};
use getset::{CopyGetters, Getters};
use serde::{Deserialize, Serialize};

/// Graph state right after one edge was committed.
#[derive(Clone, Debug, PartialEq, Eq, Getters, CopyGetters, Serialize, Deserialize)]
pub struct PegStep {
    #[getset(get_copy = "pub")]
    index: usize,
    #[getset(get_copy = "pub")]
    edge: Edge,
    #[getset(get_copy = "pub")]
    selection: Selection,
    #[getset(get = "pub")]
    graph: TannerGraph,
}

impl PegStep {
    pub(crate) fn new(index: usize, edge: Edge, selection: Selection, graph: TannerGraph) -> Self {
        Self { index, edge, selection, graph }
    }

    #[inline]
    pub fn take_graph(self) -> TannerGraph {
        self.graph
    }
}

/// Receives a snapshot after every committed edge. Observers only see copies,
/// so they cannot influence the construction.
pub trait ProgressObserver {
    fn observe(&mut self, step: PegStep);
}

impl<F> ProgressObserver for F
    where F: FnMut(PegStep)
{
    fn observe(&mut self, step: PegStep) {
        self(step)
    }
}
