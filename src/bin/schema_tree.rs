//! Schema Tree CLI
//!
//! Normalizes a schema document into the canonical tree, optionally merging a
//! metadata map keyed by FQN.

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use schema_tree::node::walk;
use schema_tree::source::{load_attribute_map, load_document};
use schema_tree::{merge, normalize, OutputFormat, SchemaFormat, SchemaNode, TreeConfig};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "schema-tree")]
#[command(about = "Normalize Avro, JSON Schema and OpenMetadata schemas into one tree")]
struct Cli {
    /// Config file layered over the default locations
    #[arg(short, long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the canonical tree as JSON
    Tree {
        /// Schema document
        input: PathBuf,
        /// Source format (avro, json-schema, openmetadata); detected when omitted
        #[arg(short, long)]
        format: Option<String>,
        /// Metadata map `{ fqn: { key: value } }` to merge into the tree
        #[arg(short, long)]
        metadata: Option<PathBuf>,
        /// Write to this file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Single-line JSON
        #[arg(long)]
        compact: bool,
    },

    /// List every FQN in the tree, one per line
    Fqns {
        /// Schema document
        input: PathBuf,
        /// Source format; detected when omitted
        #[arg(short, long)]
        format: Option<String>,
        /// Also print the display type
        #[arg(short = 't', long)]
        types: bool,
    },

    /// Print the detected source format
    Detect {
        /// Schema document
        input: PathBuf,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let config = TreeConfig::load_from(cli.config.as_deref()).context("loading configuration")?;

    match cli.command {
        Commands::Tree {
            input,
            format,
            metadata,
            output,
            compact,
        } => {
            let tree = build_tree(&config, &input, format.as_deref())?;

            let tree = match metadata.or_else(|| config.merge.metadata.clone()) {
                Some(path) => {
                    let attributes = load_attribute_map(&path)
                        .with_context(|| format!("loading metadata map {}", path.display()))?;
                    info!(path = %path.display(), entries = attributes.len(), "merging metadata");
                    merge(&tree, Some(&attributes))
                }
                None => tree,
            };

            let layout = if compact {
                OutputFormat::Compact
            } else {
                config.output.format
            };
            let json = layout.to_string(&tree)?;

            match output {
                Some(path) => {
                    std::fs::write(&path, json)
                        .with_context(|| format!("writing {}", path.display()))?;
                    eprintln!("✅ Wrote tree to: {:?}", path);
                }
                None => println!("{}", json),
            }
            Ok(())
        }

        Commands::Fqns {
            input,
            format,
            types,
        } => {
            let tree = build_tree(&config, &input, format.as_deref())?;
            for node in walk(&tree) {
                if types {
                    println!("{}\t{}", node.fqn, node.data_type_display);
                } else {
                    println!("{}", node.fqn);
                }
            }
            Ok(())
        }

        Commands::Detect { input } => {
            let (format, _) = load_document(&input, None)
                .with_context(|| format!("reading {}", input.display()))?;
            println!("{}", format);
            Ok(())
        }
    }
}

fn build_tree(
    config: &TreeConfig,
    input: &Path,
    format: Option<&str>,
) -> anyhow::Result<Vec<SchemaNode>> {
    let format = match format {
        Some(name) => Some(name.parse::<SchemaFormat>()?),
        None => config.input.default_format,
    };

    let (format, schema) = load_document(input, format)
        .with_context(|| format!("reading {}", input.display()))?;
    let tree = normalize(format, &schema);
    info!(%format, roots = tree.len(), nodes = walk(&tree).count(), "normalized schema");

    if tree.is_empty() {
        eprintln!("⚠️  {} produced an empty tree as {}", input.display(), format);
    }
    Ok(tree)
}
