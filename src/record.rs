use crate::{
    expansion::ExpansionTree,
    graphs::TannerGraph,
    observer::PegStep,
    peg::PegConfig,
};
use std::{fmt, time::Duration};
use getset::Getters;
use serde::{Deserialize, Serialize};

/// Everything a rendering or playback tool needs from one construction run.
#[derive(Clone, Debug, Getters, Serialize, Deserialize)]
#[getset(get = "pub")]
pub struct GraphRecord {
    #[serde(flatten)]
    config: PegConfig,
    graph: TannerGraph,
    girth: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    steps: Option<Vec<PegStep>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    expansion: Option<ExpansionTree>,
    runtime: Duration,
}

impl GraphRecord {
    pub fn new(config: PegConfig, graph: TannerGraph) -> Self {
        let girth = graph.girth();
        Self {
            config,
            graph,
            girth,
            steps: None,
            expansion: None,
            runtime: Duration::new(0, 0),
        }
    }

    #[inline]
    pub fn set_steps(&mut self, steps: Vec<PegStep>) {
        self.steps = Some(steps);
    }

    #[inline]
    pub fn set_expansion(&mut self, tree: ExpansionTree) {
        self.expansion = Some(tree);
    }

    #[inline]
    pub fn set_runtime(&mut self, runtime: Duration) {
        self.runtime = runtime;
    }
}

impl fmt::Display for GraphRecord {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", serde_json::to_string(self).or(Err(fmt::Error))?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_round_trip() {
        let config = PegConfig::new(3, 4, vec![1, 2, 2, 1]).unwrap();
        let graph = config.construct().unwrap();
        let mut record = GraphRecord::new(config.clone(), graph.clone());
        record.set_expansion(graph.expand(1, 2).unwrap());
        let json = record.to_string();
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed["check_nodes"], 3);
        assert_eq!(parsed["symbol_degrees"], serde_json::json!([1, 2, 2, 1]));
        assert_eq!(parsed["graph"]["edges"][0], serde_json::json!({"check": 4, "symbol": 0}));
        assert_eq!(parsed["graph"]["nodes"][4]["kind"], "check");
        assert!(parsed["girth"].is_null());
        assert!(parsed.get("steps").is_none());
        let restored: GraphRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(restored.config(), &config);
        assert_eq!(restored.graph(), &graph);
        assert_eq!(restored.expansion().as_ref().map(ExpansionTree::len), Some(5));
    }
}
