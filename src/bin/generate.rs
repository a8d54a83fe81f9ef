//! Generation CLI
//!
//! Runs the full pipeline: ingest the XSD corpus, resolve the type graph,
//! and emit the generated library.

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use fhirgen::{Builder, Config, FsWriter};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "fhir-generate")]
#[command(about = "Generate the FHIR class library from an XSD corpus")]
struct Cli {
    /// Path to a config file (fhirgen.toml)
    #[arg(short, long)]
    config: Option<String>,

    /// Schema source directory (overrides config)
    #[arg(short, long)]
    source: Option<PathBuf>,

    /// Output directory (overrides config)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Skip test generation
    #[arg(long)]
    skip_tests: bool,

    /// Endpoint URL enabling integration-test generation
    #[arg(long)]
    endpoint: Option<String>,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let mut config = Config::load_from(cli.config.as_deref())?;
    if let Some(source) = cli.source {
        config.source.path = Some(source);
    }
    if let Some(output) = cli.output {
        config.output.path = Some(output);
    }
    if cli.skip_tests {
        config.tests.skip = true;
    }
    if let Some(endpoint) = cli.endpoint {
        config.tests.endpoint = Some(endpoint);
    }

    let output_root = config.output_path().context("output path is not set")?;
    let mut writer = FsWriter::new(output_root);
    let mut builder = Builder::new(&config, &mut writer)?;
    builder.build()?;

    let graph = builder.definition()?;
    println!(
        "✅ Generated {} types (corpus {})",
        graph.type_count(),
        &graph.corpus_hash()[..12.min(graph.corpus_hash().len())]
    );
    Ok(())
}
