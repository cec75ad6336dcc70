//! NoteGraph CLI: inspect and query a graph directory from the command line

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use comfy_table::{ContentArrangement, Table};
use notegraph::{FailureKind, LayoutManager, NoteGraph, NoteGraphConfig, PropertyGraphStore};
use serde_json::Value as Json;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "notegraph", version, about = "NoteGraph CLI")]
struct Cli {
    /// YAML configuration file
    #[arg(long, global = true, env = "NOTEGRAPH_CONFIG")]
    config: Option<PathBuf>,

    /// Output format
    #[arg(long, default_value = "table", global = true)]
    format: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, clap::ValueEnum)]
enum OutputFormat {
    Table,
    Json,
    Csv,
}

#[derive(Subcommand)]
enum Commands {
    /// Execute a Cypher query against a graph directory
    Query {
        /// Graph directory (or :memory:)
        dir: PathBuf,
        /// The Cypher query string
        cypher: String,
    },
    /// List node and edge schemas
    Schemas { dir: PathBuf },
    /// List nodes, optionally of one type
    Nodes {
        dir: PathBuf,
        #[arg(long = "type")]
        type_name: Option<String>,
    },
    /// Compute a layout and print the node positions
    Layout {
        dir: PathBuf,
        /// Seed for a reproducible layout
        #[arg(long)]
        seed: Option<u64>,
    },
}

/// Columns plus rows of JSON cells, rendered in any output format
struct Rows {
    columns: Vec<String>,
    rows: Vec<Vec<Json>>,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    if let Err(e) = run(cli).await {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = match &cli.config {
        Some(path) => NoteGraphConfig::load(path).with_context(|| format!("loading {}", path.display()))?,
        None => NoteGraphConfig::default(),
    };
    let store = PropertyGraphStore::embedded(config.store.clone());

    let rows = match cli.command {
        Commands::Query { dir, cypher } => {
            open(&store, &dir).await?;
            let result = store.execute_query(&cypher).await;
            failed(&store, "execute_query")?;
            Rows {
                rows: result
                    .rows
                    .iter()
                    .map(|row| result.columns.iter().map(|c| row.get(c).map_or(Json::Null, |v| v.to_json())).collect())
                    .collect(),
                columns: result.columns,
            }
        }
        Commands::Schemas { dir } => schema_rows(&open(&store, &dir).await?),
        Commands::Nodes { dir, type_name } => {
            let graph = open(&store, &dir).await?;
            let nodes = match type_name {
                Some(t) => {
                    let nodes = store.fetch_nodes_by_type(&t).await;
                    failed(&store, "fetch_nodes_by_type")?;
                    nodes
                }
                None => graph.nodes,
            };
            Rows {
                columns: vec!["id".into(), "type".into(), "properties".into()],
                rows: nodes
                    .iter()
                    .map(|n| {
                        let properties = n.properties.iter().map(|p| (p.key.clone(), p.value.to_json())).collect();
                        vec![Json::from(n.id.as_str()), Json::from(n.type_name.as_str()), Json::Object(properties)]
                    })
                    .collect(),
            }
        }
        Commands::Layout { dir, seed } => {
            let graph = open(&store, &dir).await?;
            let manager = match seed {
                Some(seed) => LayoutManager::with_seed(config.layout.clone(), seed),
                None => LayoutManager::new(config.layout.clone()),
            };
            manager.set_graph(graph.nodes, graph.edges);
            manager.relayout().await.context("layout run")?;
            let state = manager.state();
            Rows {
                columns: vec!["id".into(), "x".into(), "y".into()],
                rows: state
                    .nodes
                    .iter()
                    .map(|(n, p)| vec![Json::from(n.id.as_str()), Json::from(p.x), Json::from(p.y)])
                    .collect(),
            }
        }
    };

    store.close().await;
    render(&rows, &cli.format)
}

async fn open(store: &PropertyGraphStore, dir: &Path) -> Result<NoteGraph> {
    match store.create_note_graph(dir).await {
        Some(graph) => Ok(graph),
        None => Err(failure(store).unwrap_or_else(|| anyhow!("cannot open {}", dir.display()))),
    }
}

fn failure(store: &PropertyGraphStore) -> Option<anyhow::Error> {
    store
        .last_failure()
        .map(|f| anyhow!("{} failed ({}): {}", f.operation, f.kind, f.message))
}

/// Surface a failure recorded by `operation`. Undecodable values are
/// already shown as unsupported cells and do not fail the command.
fn failed(store: &PropertyGraphStore, operation: &str) -> Result<()> {
    match store.last_failure() {
        Some(f) if f.operation == operation && f.kind != FailureKind::UnsupportedType => {
            Err(anyhow!("{} ({}): {}", f.operation, f.kind, f.message))
        }
        _ => Ok(()),
    }
}

fn schema_rows(graph: &NoteGraph) -> Rows {
    let describe = |props: &[notegraph::PropertyDefinition]| {
        Json::from(
            props
                .iter()
                .map(|p| format!("{}: {}", p.key, p.ty.name()))
                .collect::<Vec<_>>()
                .join(", "),
        )
    };
    let mut rows = Vec::new();
    for s in &graph.node_schemas {
        rows.push(vec![Json::from("node"), Json::from(s.id), Json::from(s.type_name.as_str()), Json::Null, describe(&s.properties)]);
    }
    for s in &graph.edge_schemas {
        rows.push(vec![
            Json::from("edge"),
            Json::from(s.id),
            Json::from(s.type_name.as_str()),
            Json::from(format!("{} -> {}", s.from_type, s.to_type)),
            describe(&s.properties),
        ]);
    }
    Rows {
        columns: ["kind", "id", "type", "endpoints", "properties"].map(String::from).to_vec(),
        rows,
    }
}

fn render(rows: &Rows, format: &OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => {
            let objects: Vec<Json> = rows
                .rows
                .iter()
                .map(|row| Json::Object(rows.columns.iter().cloned().zip(row.iter().cloned()).collect()))
                .collect();
            println!("{}", serde_json::to_string_pretty(&objects)?);
        }
        OutputFormat::Csv => {
            if !rows.columns.is_empty() {
                println!("{}", rows.columns.join(","));
                for row in &rows.rows {
                    let cells: Vec<String> = row.iter().map(format_csv_value).collect();
                    println!("{}", cells.join(","));
                }
            }
        }
        OutputFormat::Table => {
            if rows.columns.is_empty() {
                println!("(no results)");
                return Ok(());
            }

            let mut table = Table::new();
            table.set_content_arrangement(ContentArrangement::Dynamic);
            table.set_header(&rows.columns);
            for row in &rows.rows {
                let cells: Vec<String> = row.iter().map(format_table_value).collect();
                table.add_row(cells);
            }

            println!("{}", table);
            println!("{} row(s)", rows.rows.len());
        }
    }
    Ok(())
}

fn format_table_value(v: &Json) -> String {
    match v {
        Json::Null => "null".to_string(),
        Json::String(s) => s.clone(),
        Json::Number(n) => n.to_string(),
        Json::Bool(b) => b.to_string(),
        Json::Object(map) => {
            // Nodes and edges show as a compact (id:label)
            if let (Some(id), Some(label)) = (map.get("id"), map.get("label")) {
                return format!("({}:{})", format_table_value(id), format_table_value(label));
            }
            serde_json::to_string(v).unwrap_or_default()
        }
        Json::Array(_) => serde_json::to_string(v).unwrap_or_default(),
    }
}

fn format_csv_value(v: &Json) -> String {
    match v {
        Json::Null => String::new(),
        Json::String(s) => {
            if s.contains(',') || s.contains('"') || s.contains('\n') {
                format!("\"{}\"", s.replace('"', "\"\""))
            } else {
                s.clone()
            }
        }
        Json::Number(n) => n.to_string(),
        Json::Bool(b) => b.to_string(),
        _ => {
            let json = serde_json::to_string(v).unwrap_or_default();
            format!("\"{}\"", json.replace('"', "\"\""))
        }
    }
}
