//! Aggregation tree command-line tool.
//!
//! Provides the `aggtree` binary for inspecting and editing aggregation trees
//! stored in a SQLite database. The database path comes from `--db` or the
//! `AGGTREE_DB_PATH` environment variable; log verbosity from `RUST_LOG`.

use std::process;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use aggtree_core::{AttrValue, Attributes, DocId, PathEntry};
use aggtree_service::{AggregationTree, TreeError};
use aggtree_storage::{Document, DocumentStore, SqliteStore, StorageError};

/// Aggregation tree tools.
#[derive(Parser)]
#[command(name = "aggtree", about = "Create, inspect and extend aggregation trees")]
struct Cli {
    /// Path to the tree database file.
    #[arg(long, global = true, env = "AGGTREE_DB_PATH", default_value = "aggtree.db")]
    db: String,

    #[command(subcommand)]
    command: Commands,
}

/// Available subcommands.
#[derive(Subcommand)]
enum Commands {
    /// Create an empty tree and print its id.
    Create {
        /// Tree name.
        name: String,
    },

    /// List stored trees.
    List,

    /// Print a tree's stored document as JSON.
    Show {
        /// Tree id.
        id: String,
    },

    /// Attach a path of nodes beneath an existing node.
    ///
    /// Entries are `node` or `node:key=value,key=value`. The first entry must
    /// already exist; use `__root` to attach at the top.
    AddPath {
        /// Tree id.
        id: String,

        /// Path entries, anchor first.
        #[arg(required = true, num_args = 1..)]
        entries: Vec<String>,
    },

    /// Rename a tree.
    Rename {
        /// Tree id.
        id: String,

        /// New name.
        name: String,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let store = match SqliteStore::new(&cli.db) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Error: failed to open database '{}': {}", cli.db, e);
            process::exit(3);
        }
    };
    tracing::debug!(db = %cli.db, "opened tree database");

    let result = match cli.command {
        Commands::Create { name } => run_create(&store, &name),
        Commands::List => run_list(&store),
        Commands::Show { id } => run_show(&store, &DocId::new(id)),
        Commands::AddPath { id, entries } => run_add_path(&store, &DocId::new(id), &entries),
        Commands::Rename { id, name } => run_rename(&store, &DocId::new(id), &name),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        process::exit(exit_code(&e));
    }
}

/// Exit code: 1 = rejected by the tree (bad argument, unknown or duplicate
/// node, missing tree), 3 = storage failure.
fn exit_code(err: &TreeError) -> i32 {
    match err {
        TreeError::Storage(_) => 3,
        _ => 1,
    }
}

fn run_create(store: &SqliteStore, name: &str) -> Result<(), TreeError> {
    let tree = AggregationTree::create(name)?;
    let id = tree.save(store)?;
    println!("{id}");
    Ok(())
}

fn run_list(store: &SqliteStore) -> Result<(), TreeError> {
    for summary in store.list(aggtree_core::TreeDocument::KIND)? {
        println!(
            "{}\t{}\trev {}",
            summary.id,
            summary.name.as_deref().unwrap_or("-"),
            summary.revision
        );
    }
    Ok(())
}

fn run_show(store: &SqliteStore, id: &DocId) -> Result<(), TreeError> {
    let tree = AggregationTree::load(store, id)?;
    let doc = tree.to_document()?;
    let json = serde_json::to_string_pretty(&doc)
        .map_err(|e| TreeError::Storage(StorageError::Serialization(e)))?;
    println!("{json}");
    Ok(())
}

fn run_add_path(store: &SqliteStore, id: &DocId, raw: &[String]) -> Result<(), TreeError> {
    let entries: Vec<PathEntry> = raw.iter().map(|s| parse_entry(s)).collect();
    let tree = AggregationTree::load(store, id)?;
    let added = tree.add_path(entries)?;
    tree.save(store)?;
    println!("added {added} node(s)");
    Ok(())
}

fn run_rename(store: &SqliteStore, id: &DocId, name: &str) -> Result<(), TreeError> {
    let tree = AggregationTree::load(store, id)?;
    tree.set_name(name)?;
    tree.save(store)?;
    Ok(())
}

/// Parses `node` or `node:key=value,key=value` into a path entry.
///
/// Values go through [`AttrValue::parse_literal`]; a pair without `=` is
/// stored as `true`.
fn parse_entry(raw: &str) -> PathEntry {
    let Some((id, attrs)) = raw.split_once(':') else {
        return PathEntry::new(raw);
    };
    let attributes: Attributes = attrs
        .split(',')
        .filter(|pair| !pair.is_empty())
        .map(|pair| match pair.split_once('=') {
            Some((k, v)) => (k.trim().to_string(), AttrValue::parse_literal(v.trim())),
            None => (pair.trim().to_string(), AttrValue::Bool(true)),
        })
        .collect();
    PathEntry::with_attributes(id, attributes)
}
