use peg_tanner::{
    application,
    settings::{Args, Settings},
};
use anyhow::Result;
use clap::Parser;
use tracing::Level;

fn log_level(verbose: u8) -> Level {
    match verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    }
}

fn main() -> Result<()> {
    let args = Args::parse();
    let settings = Settings::from_args(args)?;
    tracing_subscriber::fmt()
        .with_max_level(log_level(settings.verbose()))
        .with_writer(std::io::stderr)
        .init();
    application::run(&settings)?;
    Ok(())
}
