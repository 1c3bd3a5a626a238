use crate::{
    graphs::NodeId,
    peg::PegConfig,
};
use std::{
    fs,
    path::{Path, PathBuf},
};
use anyhow::{Context, Result};
use clap::Parser;
use derive_builder::Builder;
use thiserror::Error;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    #[arg(short, long, help="Number of check nodes")]
    check_nodes: Option<usize>,
    #[arg(short, long, help="Number of symbol nodes [default: length of --degrees]")]
    symbol_nodes: Option<usize>,
    #[arg(short, long, value_delimiter=',', conflicts_with="column_weight",
        help="Comma-separated symbol node degrees, e.g. 1,2,2,1")]
    degrees: Vec<usize>,
    #[arg(short='w', long, requires="symbol_nodes", help="Use the same degree for every symbol node")]
    column_weight: Option<usize>,
    #[arg(long, conflicts_with_all=["check_nodes", "symbol_nodes", "degrees", "column_weight"],
        help="Read construction parameters from a JSON file")]
    config: Option<String>,
    #[arg(long, conflicts_with_all=["check_nodes", "symbol_nodes", "degrees", "column_weight", "config", "steps", "step"],
        help="Load a parity check matrix (one row of 0/1 entries per line) instead of constructing one")]
    matrix: Option<String>,
    #[arg(short, long, help="Output file [default: stdout]")]
    output: Option<String>,
    #[arg(long, help="If output file already exists, overwrite without creating backup")]
    overwrite: bool,
    #[arg(long, help="Record a graph snapshot after every committed edge")]
    steps: bool,
    #[arg(long, help="Include the expansion tree rooted at this node id in the output")]
    expand: Option<NodeId>,
    #[arg(long, default_value_t=1, allow_negative_numbers=true, requires="expand",
        help="Depth of the expansion tree")]
    depth: isize,
    #[arg(long, requires="expand", help="Expand in the snapshot after this many edges [default: final graph]")]
    step: Option<usize>,
    #[arg(short, long, action = clap::ArgAction::Count,
        help="Print progress messages and matrices [repeat for more verbose, max 3]")]
    verbose: u8,
}

/// Where the graph comes from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GraphSource {
    /// Built by progressive edge growth.
    Construct(PegConfig),
    /// An existing parity check matrix, one row per check node.
    Matrix(Vec<Vec<u8>>),
}

/// Request for a local expansion tree in the output record.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DrillDown {
    pub root: NodeId,
    pub depth: isize,
    /// Number of committed edges in the snapshot to expand; `None` for the final graph.
    pub step: Option<usize>,
}

#[derive(Builder, Clone, Debug, PartialEq, Eq)]
pub struct Settings {
    source: GraphSource,
    #[builder(default="false")] record_steps: bool,
    #[builder(default)] drill_down: Option<DrillDown>,
    #[builder(default)] output_file: Option<PathBuf>,
    #[builder(default="false")] overwrite: bool,
    #[builder(default)] verbose: u8,
    #[builder(default="false")] silent: bool,
}

impl Settings {
    pub fn from_args(args: Args) -> Result<Self> {
        let source = match (args.matrix.as_deref(), args.config.as_deref()) {
            (Some(path), _) => GraphSource::Matrix(read_matrix(Path::new(path))?),
            (None, Some(path)) => GraphSource::Construct(read_config(Path::new(path))?),
            (None, None) => GraphSource::Construct(
                config_from_flags(args.check_nodes, args.symbol_nodes, args.degrees, args.column_weight)?
            ),
        };
        let settings = Self {
            source,
            record_steps: args.steps,
            drill_down: args.expand.map(|root| DrillDown { root, depth: args.depth, step: args.step }),
            output_file: args.output.map(PathBuf::from),
            overwrite: args.overwrite,
            verbose: args.verbose,
            silent: false,
        };
        Ok(settings)
    }

    #[inline]
    pub fn source(&self) -> &GraphSource {
        &self.source
    }

    #[inline]
    pub fn record_steps(&self) -> bool {
        self.record_steps
    }

    #[inline]
    pub fn drill_down(&self) -> Option<DrillDown> {
        self.drill_down
    }

    #[inline]
    pub fn output_file(&self) -> Option<&Path> {
        self.output_file.as_deref()
    }

    #[inline]
    pub fn overwrite(&self) -> bool {
        self.overwrite
    }

    #[inline]
    pub fn verbose(&self) -> u8 {
        self.verbose
    }

    #[inline]
    pub fn silent(&self) -> bool {
        self.silent
    }
}

fn read_config(path: &Path) -> Result<PegConfig> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("Should be able to read config file {}", path.display()))?;
    let config: PegConfig = serde_json::from_str(&contents)
        .context("--config should be JSON with check_nodes, symbol_nodes and symbol_degrees")?;
    config.validate().context("--config must describe a feasible construction")?;
    Ok(config)
}

fn read_matrix(path: &Path) -> Result<Vec<Vec<u8>>> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("Should be able to read matrix file {}", path.display()))?;
    contents
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(number, line)| {
            line.split_whitespace()
                .map(str::parse::<u8>)
                .collect::<std::result::Result<Vec<_>, _>>()
                .with_context(|| format!("--matrix line {} should hold 0/1 entries separated by spaces", number + 1))
        })
        .collect()
}

fn config_from_flags(
    check_nodes: Option<usize>,
    symbol_nodes: Option<usize>,
    degrees: Vec<usize>,
    column_weight: Option<usize>,
) -> Result<PegConfig> {
    let check_nodes = check_nodes.ok_or(SettingsError::MissingCheckNodes)?;
    let config = match (column_weight, degrees.is_empty()) {
        (Some(weight), _) => {
            let symbol_nodes = symbol_nodes.ok_or(SettingsError::MissingSymbolNodes)?;
            PegConfig::regular(check_nodes, symbol_nodes, weight)
        }
        (None, false) => {
            let symbol_nodes = symbol_nodes.unwrap_or(degrees.len());
            PegConfig::new(check_nodes, symbol_nodes, degrees)
        }
        (None, true) => return Err(SettingsError::MissingDegrees.into()),
    };
    config.context("construction parameters must be feasible")
}

#[derive(Copy, Clone, Debug, Error)]
pub enum SettingsError {
    #[error("--check-nodes is required unless --config is given")]
    MissingCheckNodes,
    #[error("--symbol-nodes is required with --column-weight")]
    MissingSymbolNodes,
    #[error("one of --degrees, --column-weight or --config is required")]
    MissingDegrees,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args() -> Args {
        Args {
            check_nodes: Some(3),
            symbol_nodes: None,
            degrees: vec![1, 2, 2, 1],
            column_weight: None,
            config: None,
            matrix: None,
            output: Some("test/path/to/file.json".to_string()),
            overwrite: true,
            steps: true,
            expand: Some(2),
            depth: 3,
            step: Some(4),
            verbose: 2,
        }
    }

    #[test]
    fn from_args_example() {
        let settings = Settings::from_args(args()).unwrap();
        assert_eq!(settings.source, GraphSource::Construct(PegConfig::new(3, 4, vec![1, 2, 2, 1]).unwrap()));
        assert!(settings.record_steps);
        assert_eq!(settings.drill_down, Some(DrillDown { root: 2, depth: 3, step: Some(4) }));
        assert_eq!(settings.output_file, Some(PathBuf::from("test/path/to/file.json")));
        assert!(settings.overwrite);
        assert_eq!(settings.verbose, 2);
        assert!(!settings.silent);
    }

    #[test]
    fn from_args_column_weight() {
        let args = Args {
            symbol_nodes: Some(6),
            degrees: Vec::new(),
            column_weight: Some(2),
            ..args()
        };
        let settings = Settings::from_args(args).unwrap();
        assert_eq!(settings.source(), &GraphSource::Construct(PegConfig::regular(3, 6, 2).unwrap()));
    }

    #[test]
    fn from_args_rejects_incomplete_or_infeasible() {
        assert!(Settings::from_args(Args { check_nodes: None, ..args() }).is_err());
        assert!(Settings::from_args(Args { degrees: Vec::new(), ..args() }).is_err());
        assert!(Settings::from_args(Args { degrees: vec![1, 4], ..args() }).is_err());
        assert!(Settings::from_args(Args { symbol_nodes: Some(5), ..args() }).is_err());
    }

    #[test]
    fn settings_builder() {
        let config = PegConfig::regular(4, 8, 2).unwrap();
        let settings = SettingsBuilder::default()
            .source(GraphSource::Construct(config.clone())).silent(true)
            .build().unwrap();
        assert_eq!(settings, Settings {
            source: GraphSource::Construct(config),
            record_steps: false,
            drill_down: None,
            output_file: None,
            overwrite: false,
            verbose: 0,
            silent: true,
        });
    }

    #[test]
    fn from_args_matrix_file() {
        let path = std::env::temp_dir().join(format!("peg-tanner-matrix-{}.txt", uuid::Uuid::new_v4()));
        fs::write(&path, "1 1 0\n\n0 1 1\n").unwrap();
        let matrix_args = Args {
            check_nodes: None,
            degrees: Vec::new(),
            matrix: Some(path.display().to_string()),
            steps: false,
            step: None,
            ..args()
        };
        let settings = Settings::from_args(matrix_args).unwrap();
        assert_eq!(settings.source(), &GraphSource::Matrix(vec![vec![1, 1, 0], vec![0, 1, 1]]));
        fs::write(&path, "1 x 0\n").unwrap();
        let bad_args = Args { check_nodes: None, matrix: Some(path.display().to_string()), ..args() };
        assert!(Settings::from_args(bad_args).is_err());
        fs::remove_file(&path).unwrap();
    }
}
