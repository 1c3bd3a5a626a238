use crate::{
    expansion::ExpansionTree,
    graphs::TannerGraph,
    observer::PegStep,
    peg::PegConfig,
    record::GraphRecord,
    settings::{DrillDown, GraphSource, Settings},
};
use std::{
    fs::{self, File},
    io::{self, BufWriter, Write},
    path::Path,
    time::{Duration, Instant},
};
use anyhow::{ensure, Context, Result};
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

/// Prepares `output` for writing. A non-empty file already at that path is
/// copied to `<path>-backup-<uuid>` first, unless `overwrite` is set.
pub fn prepare_output(output: Option<&Path>, overwrite: bool) -> Result<()> {
    let Some(path) = output else {
        return Ok(());
    };
    let occupied = path.try_exists()
        .with_context(|| format!("Cannot tell whether {} exists", path.display()))?
        && fs::metadata(path).with_context(|| format!("Cannot stat {}", path.display()))?.len() > 0;
    if occupied && !overwrite {
        let backup = format!("{}-backup-{}", path.display(), Uuid::new_v4());
        fs::copy(path, &backup)
            .with_context(|| format!("Cannot back up {} to {}", path.display(), backup))?;
        info!(%backup, "previous output kept");
    }
    File::create(path).with_context(|| format!("Cannot create {}", path.display()))?;
    Ok(())
}

/// Writes `data` as a single JSON line to `output`, or to standard output.
pub fn write_json(output: Option<&Path>, data: &impl Serialize) -> Result<()> {
    match output {
        Some(path) => {
            let file = File::create(path).with_context(|| format!("Cannot open {}", path.display()))?;
            write_json_line(BufWriter::new(file), data)
                .with_context(|| format!("Cannot write JSON record to {}", path.display()))
        }
        None => write_json_line(io::stdout().lock(), data)
            .context("Cannot write JSON record to standard output"),
    }
}

fn write_json_line<W: Write>(mut writer: W, data: &impl Serialize) -> Result<()> {
    serde_json::to_writer(&mut writer, data)?;
    writer.write_all(b"\n")?;
    writer.flush()?;
    Ok(())
}

pub fn start_message(config: &PegConfig) -> String {
    let degrees = config.symbol_degrees().iter().map(usize::to_string).collect::<Vec<_>>().join(",");
    format!("Starting progressive edge growth with parameters:\n    \
        check nodes = {}, symbol nodes = {}, edges = {}\n    \
        symbol degrees = [{}]\n",
        config.check_nodes(), config.symbol_nodes(), config.total_edges(), degrees)
}

pub fn end_message(graph: &TannerGraph, girth: Option<usize>, runtime: Duration) -> String {
    let girth_text = girth.map_or_else(|| "none (acyclic)".to_string(), |g| g.to_string());
    format!("Edges: {}\n\
        Girth: {}\n\
        Runtime: {:.3} s",
        graph.edges().len(), girth_text, runtime.as_secs_f64())
}

/// Runs the construction, recording every step if `steps` is provided.
fn construct(config: &PegConfig, steps: Option<&mut Vec<PegStep>>) -> Result<TannerGraph> {
    let graph = match steps {
        Some(steps) => config.construct_with_observer(&mut |step: PegStep| steps.push(step)),
        None => config.construct(),
    };
    graph.context("Progressive edge growth should complete for validated parameters")
}

/// Expansion tree for `--expand`, taken from the final graph or from the
/// snapshot after `drill_down.step` edges.
pub fn drill_down(
    drill_down: DrillDown,
    config: &PegConfig,
    graph: &TannerGraph,
    steps: &[PegStep],
) -> Result<ExpansionTree> {
    let empty;
    let source = match drill_down.step {
        None => graph,
        Some(0) => {
            empty = TannerGraph::new(config.check_nodes(), config.symbol_nodes())?;
            &empty
        }
        Some(step) => steps.get(step - 1).map(PegStep::graph).with_context(|| {
            format!("--step must be at most the number of edges ({})", steps.len())
        })?,
    };
    source.expand(drill_down.root, drill_down.depth)
        .context("--expand should name a node id and --depth should be non-negative")
}

pub fn run(settings: &Settings) -> Result<GraphRecord> {
    let start_time = Instant::now();
    prepare_output(settings.output_file(), settings.overwrite())?;
    let wants_steps = settings.record_steps()
        || settings.drill_down().map_or(false, |drill| drill.step.is_some());
    let mut steps = Vec::new();
    let (config, graph) = match settings.source() {
        GraphSource::Construct(config) => {
            if settings.verbose() >= 1 {
                println!("{}", start_message(config));
            }
            (config.clone(), construct(config, wants_steps.then_some(&mut steps))?)
        }
        GraphSource::Matrix(rows) => {
            ensure!(!wants_steps, "A loaded matrix has no construction steps to record or expand");
            let graph = TannerGraph::from_matrix(rows)
                .context("--matrix should be a binary matrix with rows of equal length")?;
            let config = PegConfig::of_graph(&graph)?;
            if settings.verbose() >= 1 {
                println!("Loaded parity check matrix with {} check nodes and {} symbol nodes\n",
                    graph.check_count(), graph.symbol_count());
            }
            (config, graph)
        }
    };
    let expansion = settings.drill_down()
        .map(|drill| drill_down(drill, &config, &graph, &steps))
        .transpose()?;
    if settings.verbose() >= 3 {
        for step in &steps {
            println!("After edge {} {}:\n{}\n", step.index(), step.edge(), step.graph());
        }
    }
    let mut record = GraphRecord::new(config, graph);
    if settings.record_steps() {
        record.set_steps(steps);
    }
    if let Some(tree) = expansion {
        record.set_expansion(tree);
    }
    record.set_runtime(start_time.elapsed());
    info!(edges = record.graph().edges().len(), girth = ?record.girth(), "graph ready");
    if !settings.silent() {
        write_json(settings.output_file(), &record)?;
    }
    if settings.verbose() >= 2 {
        println!("Parity check matrix:\n{}", record.graph());
    }
    if settings.verbose() >= 1 {
        println!("{}", end_message(record.graph(), *record.girth(), *record.runtime()));
    }
    Ok(record)
}
