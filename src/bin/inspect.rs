//! Graph Inspection CLI
//!
//! Resolves the type graph without emitting anything and exposes it for
//! inspection: statistics, fuzzy name search, DOT export, and type listings.

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use fhirgen::graph::{resolve, TypeGraph, TypeKind};
use fhirgen::{ingest, Config};
use fuzzy_matcher::skim::SkimMatcherV2;
use fuzzy_matcher::FuzzyMatcher;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "fhir-inspect")]
#[command(about = "Inspect a resolved FHIR type graph")]
struct Cli {
    /// Path to a config file (fhirgen.toml)
    #[arg(short, long)]
    config: Option<String>,

    /// Schema source directory (overrides config)
    #[arg(short, long)]
    source: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print corpus statistics as JSON
    Stats,

    /// Fuzzy-search type names
    Search {
        query: String,
        /// Maximum number of results
        #[arg(short, long, default_value_t = 10)]
        limit: usize,
    },

    /// Export the inheritance/reference graph to GraphViz DOT
    Dot {
        /// Output file (stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// List types, optionally filtered by kind
    Types {
        /// primitive | complex | enumeration | resource | container
        #[arg(short, long)]
        kind: Option<String>,
    },
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

    let source = config.source_path().context("schema source path is not set")?;
    let arena = ingest(&source, &config.source)?;
    let documents = arena.document_count();
    let graph = resolve(arena, &config.resolution.cycle_whitelist)?;

    match cli.command {
        Commands::Stats => {
            let count_kind = |kind: TypeKind| graph.iter().filter(|t| t.kind == kind).count();
            let stats = serde_json::json!({
                "corpus_hash": graph.corpus_hash(),
                "documents": documents,
                "types": graph.type_count(),
                "primitives": count_kind(TypeKind::Primitive),
                "complex": count_kind(TypeKind::Complex),
                "enumerations": count_kind(TypeKind::Enumeration),
                "resources": count_kind(TypeKind::Resource),
                "containers": count_kind(TypeKind::Container),
            });
            println!("{}", serde_json::to_string_pretty(&stats)?);
        }

        Commands::Search { query, limit } => {
            for (score, ty) in search(&graph, &query, limit) {
                println!("{:>5}  {:12} {}", score, ty.kind.to_string(), ty.name);
            }
        }

        Commands::Dot { output } => {
            let dot = graph.to_dot();
            if let Some(path) = output {
                std::fs::write(&path, &dot)?;
                println!("✅ Graph written to {:?}", path);
            } else {
                println!("{}", dot);
            }
        }

        Commands::Types { kind } => {
            let filter = kind.as_deref().map(parse_kind).transpose()?;
            for ty in graph.types_sorted() {
                if filter.map(|k| ty.kind == k).unwrap_or(true) {
                    println!("{:12} {:32} {}", ty.kind.to_string(), ty.name, ty.qualified_name());
                }
            }
        }
    }

    Ok(())
}

fn parse_kind(s: &str) -> anyhow::Result<TypeKind> {
    match s {
        "primitive" => Ok(TypeKind::Primitive),
        "complex" => Ok(TypeKind::Complex),
        "enumeration" => Ok(TypeKind::Enumeration),
        "resource" => Ok(TypeKind::Resource),
        "container" => Ok(TypeKind::Container),
        other => anyhow::bail!("unknown type kind: {}", other),
    }
}

fn search<'g>(
    graph: &'g TypeGraph,
    query: &str,
    limit: usize,
) -> Vec<(i64, &'g fhirgen::Type)> {
    let matcher = SkimMatcherV2::default();
    let mut results: Vec<(i64, &fhirgen::Type)> = graph
        .iter()
        .filter_map(|ty| matcher.fuzzy_match(&ty.name, query).map(|score| (score, ty)))
        .collect();

    // Score descending, name ascending for a stable listing
    results.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| a.1.name.cmp(&b.1.name)));
    results.truncate(limit);
    results
}
