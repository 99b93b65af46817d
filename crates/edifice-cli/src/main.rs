//! Edifice CLI - Command-line interface for the building graph registry
//!
//! Initializes a local registry, ingests extracted building graphs, and
//! runs ownership, status and traversal operations against it.

use clap::{Parser, Subcommand};
use colored::Colorize;
use edifice_core::{ConstructionStatus, NodeId};
use edifice_graph::KeyKind;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;
mod config;

#[derive(Parser)]
#[command(name = "edifice")]
#[command(author = "Edifice Contributors")]
#[command(version)]
#[command(about = "Ownership registry for building graphs", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Act as this principal (defaults to the configured minter)
    #[arg(long = "as", global = true, value_name = "PRINCIPAL")]
    as_principal: Option<String>,

    /// Workspace directory (defaults to current directory)
    #[arg(short = 'C', long, global = true, default_value = ".")]
    dir: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize a registry in the workspace directory
    Init {
        /// Principal allowed to mint
        #[arg(long, default_value = "registry-admin")]
        minter: String,
    },

    /// Ingest an extracted graph (JSON) as one unit of work
    Mint {
        /// Graph file produced by the extraction tooling
        file: PathBuf,

        /// Owner of the minted records (overrides the file)
        #[arg(long)]
        owner: Option<String>,

        /// Name of the project root (overrides the file)
        #[arg(long)]
        label: Option<String>,

        /// Source file key (overrides the file)
        #[arg(long)]
        source_file: Option<String>,
    },

    /// Show a record
    Show {
        id: NodeId,

        /// Output as JSON instead of formatted text
        #[arg(long)]
        json: bool,

        /// Also print the record's HTTP link against this endpoint
        #[arg(long, value_name = "URL")]
        base_url: Option<String>,
    },

    /// Resolve an external key to a record (element key by default)
    Lookup {
        key: String,

        /// Look up by global persistent key
        #[arg(long, conflicts_with_all = ["vertex", "uri"])]
        global: bool,

        /// Look up by graph vertex key
        #[arg(long, conflicts_with = "uri")]
        vertex: bool,

        /// Treat the key as a graph URI (graph:// or http form)
        #[arg(long)]
        uri: bool,
    },

    /// List the direct children of a record
    Children { id: NodeId },

    /// Show a record and everything it contains
    Subgraph {
        id: NodeId,

        /// Output as JSON instead of formatted text
        #[arg(long)]
        json: bool,
    },

    /// Transfer a record and its descendants to a new owner
    Transfer {
        id: NodeId,

        /// Current owner (also the acting principal unless --as is given)
        #[arg(long)]
        from: String,

        /// New owner
        #[arg(long)]
        to: String,
    },

    /// Set the construction status of a record
    Status {
        id: NodeId,

        /// designed, approved, under_construction, completed or verified
        status: ConstructionStatus,
    },

    /// Append a verification to a record's audit trail
    Verify {
        id: NodeId,

        /// Supporting document reference
        #[arg(long)]
        doc: String,

        #[arg(long, default_value = "")]
        note: String,

        /// Mark the verification as approving
        #[arg(long)]
        approved: bool,
    },

    /// Show registry statistics
    Stats {
        /// Also count the records held by this principal
        #[arg(long)]
        owner: Option<String>,
    },

    /// Print pending registry events
    Events {
        /// Drop the printed events from the registry
        #[arg(long)]
        clear: bool,
    },
}

fn main() {
    let cli = Cli::parse();

    // Set up logging
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false),
        )
        .with(tracing_subscriber::EnvFilter::new(filter))
        .init();

    let root = cli.dir.as_path();
    let acting = cli.as_principal.as_deref();

    let result = match cli.command {
        Commands::Init { minter } => commands::init(root, &minter),
        Commands::Mint {
            file,
            owner,
            label,
            source_file,
        } => commands::mint(
            root,
            &file,
            commands::MintOverrides {
                owner,
                label,
                source_file,
            },
            acting,
        ),
        Commands::Show { id, json, base_url } => {
            commands::show(root, id, json, base_url.as_deref())
        }
        Commands::Lookup {
            key, uri: true, ..
        } => commands::lookup_uri(root, &key),
        Commands::Lookup {
            key,
            global,
            vertex,
            uri: false,
        } => {
            let kind = if global {
                KeyKind::Global
            } else if vertex {
                KeyKind::Vertex
            } else {
                KeyKind::Element
            };
            commands::lookup(root, kind, &key)
        }
        Commands::Children { id } => commands::children(root, id),
        Commands::Subgraph { id, json } => commands::subgraph(root, id, json),
        Commands::Transfer { id, from, to } => commands::transfer(root, id, &from, &to, acting),
        Commands::Status { id, status } => commands::set_status(root, id, status, acting),
        Commands::Verify {
            id,
            doc,
            note,
            approved,
        } => commands::verify(root, id, &doc, &note, approved, acting),
        Commands::Stats { owner } => commands::stats(root, owner.as_deref()),
        Commands::Events { clear } => commands::events(root, clear),
    };

    if let Err(e) = result {
        eprintln!("{} {}", "error:".red().bold(), e);
        std::process::exit(1);
    }
}
