//! CLI command implementations.

use crate::config::{CliConfig, Workspace};
use colored::Colorize;
use edifice_core::{text_key_hex, validate_batch, ConstructionStatus, GraphUri, NodeId, Principal};
use edifice_graph::{KeyKind, MintRequest, Registry, RegistryStore};
use indicatif::{ProgressBar, ProgressStyle};
use std::fs;
use std::path::Path;
use std::time::Duration;
use tracing::debug;

type Result<T> = std::result::Result<T, Box<dyn std::error::Error>>;

/// An opened workspace: config, store and the loaded registry.
struct Session {
    config: CliConfig,
    store: RegistryStore,
    registry: Registry,
}

impl Session {
    fn open(root: &Path) -> Result<Self> {
        let workspace = Workspace::at(root);
        let config = CliConfig::load(&workspace)?;
        let store = RegistryStore::open(workspace.store_path())?;

        let mut registry = match store.load()? {
            Some(registry) => registry,
            None => Registry::new(config.minter.clone(), config.registry.clone()),
        };
        // Config edits apply to existing registries too.
        registry.set_config(config.registry.clone());
        debug!(
            "Opened registry at {} ({} records)",
            workspace.store_path().display(),
            registry.node_count()
        );

        Ok(Self {
            config,
            store,
            registry,
        })
    }

    /// The principal named by `--as`, or the configured minter.
    fn acting(&self, as_principal: Option<&str>) -> Result<Principal> {
        match as_principal {
            Some(name) => Ok(Principal::new(name)?),
            None => Ok(self.config.minter.clone()),
        }
    }

    fn save(&self) -> Result<()> {
        self.store.save(&self.registry)?;
        Ok(())
    }

    fn require(&self, id: NodeId) -> Result<()> {
        if self.registry.contains(id) {
            Ok(())
        } else {
            Err(format!("Record {} not found", id).into())
        }
    }
}

/// Initialize Edifice in a directory.
pub fn init(root: &Path, minter: &str) -> Result<()> {
    let workspace = Workspace::at(root);

    if workspace.is_initialized() {
        println!("{} Already initialized", "✓".green());
        return Ok(());
    }

    let config = CliConfig::new(minter)?;
    config.save(&workspace)?;

    let store = RegistryStore::open(workspace.store_path())?;
    store.save(&Registry::new(config.minter.clone(), config.registry.clone()))?;

    println!("{} Initialized Edifice in {}", "✓".green(), root.display());
    println!("  Minter: {}", config.minter.as_str().cyan());
    println!("  Run {} to ingest a graph", "edifice mint <graph.json>".cyan());

    Ok(())
}

/// Fields of a mint request that can be overridden on the command line.
#[derive(Debug, Default)]
pub struct MintOverrides {
    pub owner: Option<String>,
    pub label: Option<String>,
    pub source_file: Option<String>,
}

/// Ingest a graph file.
pub fn mint(
    root: &Path,
    file: &Path,
    overrides: MintOverrides,
    as_principal: Option<&str>,
) -> Result<()> {
    let mut session = Session::open(root)?;
    let caller = session.acting(as_principal)?;

    let text = fs::read_to_string(file)?;
    let mut request: MintRequest = serde_json::from_str(&text)?;
    if let Some(owner) = overrides.owner {
        request.owner = owner;
    }
    if let Some(label) = overrides.label {
        request.label = label;
    }
    if let Some(source_file) = overrides.source_file {
        request.source_file = source_file;
    }

    let issues = validate_batch(&request.nodes, &request.edges);
    if !issues.is_empty() {
        println!("{} {} validation warnings:", "⚠".yellow(), issues.len());
        for issue in issues.iter().take(10) {
            println!("  {}", issue);
        }
        if issues.len() > 10 {
            println!("  ... and {} more", issues.len() - 10);
        }
    }

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}")?);
    spinner.enable_steady_tick(Duration::from_millis(80));
    spinner.set_message(format!(
        "Minting {} nodes and {} edges...",
        request.nodes.len(),
        request.edges.len()
    ));

    let minted = session.registry.mint(&caller, request);
    spinner.finish_and_clear();
    let receipt = minted?;
    session.save()?;

    println!(
        "{} Minted {} records under root {} ({} work units)",
        "✓".green(),
        receipt.minted.len().to_string().cyan(),
        receipt.root.to_string().cyan(),
        receipt.work_units
    );
    println!("  {} {}", "Edges:".dimmed(), receipt.edges_created);
    if receipt.edges_dropped > 0 {
        println!(
            "{} {} edges dropped (endpoint index out of range)",
            "⚠".yellow(),
            receipt.edges_dropped
        );
    }

    Ok(())
}

/// Show one record.
pub fn show(root: &Path, id: NodeId, json: bool, base_url: Option<&str>) -> Result<()> {
    let session = Session::open(root)?;
    let registry = &session.registry;
    let node = registry
        .get(id)
        .ok_or_else(|| format!("Record {} not found", id))?;

    if json {
        println!("{}", serde_json::to_string_pretty(node)?);
        return Ok(());
    }

    let owner = registry
        .owner_of(id)
        .map(|p| p.as_str().to_string())
        .unwrap_or_default();
    let parent = node
        .parent
        .map(|p| p.to_string())
        .unwrap_or_else(|| "-".to_string());

    println!("{} {}", node.tier.to_string().yellow(), id.to_string().cyan().bold());
    println!("  {} {}", "Name:".dimmed(), node.name);
    println!("  {} {}", "Type:".dimmed(), node.entity_type);
    println!("  {} {}", "Element:".dimmed(), node.keys.element_key);
    println!("  {} {}", "Global:".dimmed(), node.keys.global_key);
    println!("  {} {}", "Vertex:".dimmed(), node.keys.vertex_key);
    if !node.source_file.is_empty() {
        println!(
            "  {} {} {}",
            "Source:".dimmed(),
            node.source_file,
            text_key_hex(&node.source_file).dimmed()
        );
    }
    if !node.container.is_empty() {
        println!(
            "  {} {} {}",
            "Container:".dimmed(),
            node.container,
            text_key_hex(&node.container).dimmed()
        );
    }
    println!(
        "  {} ({}, {}, {}) mm",
        "Position:".dimmed(),
        node.position.x,
        node.position.y,
        node.position.z
    );
    println!("  {} {}", "Status:".dimmed(), node.status);
    println!("  {} {}", "Owner:".dimmed(), owner);
    println!("  {} {}", "Parent:".dimmed(), parent);
    println!("  {} {}", "Children:".dimmed(), registry.children_of(id).len());
    println!("  {} {}", "Edges:".dimmed(), registry.edges_of(id).len());
    println!("  {} {}", "Created:".dimmed(), node.created_at.to_rfc3339());
    let uri = registry.graph_uri(id)?;
    println!("  {} {}", "URI:".dimmed(), uri);
    if let Some(base) = base_url {
        println!("  {} {}", "Link:".dimmed(), uri.with_base(base));
    }

    if !node.verifications.is_empty() {
        println!();
        println!("{}", "Verifications:".cyan());
        for v in &node.verifications {
            let mark = if v.approved { "✓".green() } else { "✗".red() };
            println!(
                "  {} {} by {} - {} {}",
                mark,
                v.recorded_at.format("%Y-%m-%d %H:%M"),
                v.verifier,
                v.document,
                v.note.dimmed()
            );
        }
    }

    Ok(())
}

/// Resolve an external key to a record.
pub fn lookup(root: &Path, kind: KeyKind, key: &str) -> Result<()> {
    let session = Session::open(root)?;

    match session.registry.lookup(kind, key) {
        Some(id) => println!("{}", id),
        None => println!("No record for {} key \"{}\"", kind, key),
    }

    Ok(())
}

/// Resolve a graph URI (either form) to a record.
pub fn lookup_uri(root: &Path, uri: &str) -> Result<()> {
    let session = Session::open(root)?;
    let uri: GraphUri = uri.parse()?;

    match uri_target(&session.registry, &uri) {
        Some(id) => println!("{}", id),
        None => println!("No record for {}", uri),
    }

    Ok(())
}

/// The record behind `uri`, if all three of its keys match.
fn uri_target(registry: &Registry, uri: &GraphUri) -> Option<NodeId> {
    let id = registry.lookup(KeyKind::Element, &uri.element_key)?;
    let node = registry.get(id)?;
    (GraphUri::from(&node.keys) == *uri).then_some(id)
}

/// List the direct children of a record.
pub fn children(root: &Path, id: NodeId) -> Result<()> {
    let session = Session::open(root)?;
    session.require(id)?;

    let children = session.registry.children_of(id);
    if children.is_empty() {
        println!("{} has no children", id);
        return Ok(());
    }

    for child in children {
        if let Some(node) = session.registry.get(*child) {
            println!(
                "  {} {} {}",
                node.tier.to_string().yellow(),
                child.to_string().cyan(),
                node.name.dimmed()
            );
        }
    }

    Ok(())
}

/// Print the bounded subgraph under a record.
pub fn subgraph(root: &Path, id: NodeId, json: bool) -> Result<()> {
    let session = Session::open(root)?;
    let sub = session.registry.subgraph(id)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&sub)?);
        return Ok(());
    }

    println!(
        "{} {} nodes, {} edges",
        "Subgraph".cyan().bold(),
        sub.len(),
        sub.edges.len()
    );
    for node in &sub.nodes {
        println!(
            "  {} {} {}",
            node.tier.to_string().yellow(),
            node.id.to_string().cyan(),
            node.name
        );
    }
    for edge in &sub.edges {
        println!(
            "  {} {} {} {}",
            edge.from,
            "→".dimmed(),
            edge.to,
            edge.connection_type.dimmed()
        );
    }

    Ok(())
}

/// Transfer a record and the descendants its owner still holds.
///
/// Without `--as`, the sending principal acts for itself.
pub fn transfer(
    root: &Path,
    id: NodeId,
    from: &str,
    to: &str,
    as_principal: Option<&str>,
) -> Result<()> {
    let mut session = Session::open(root)?;
    let from = Principal::new(from)?;
    let to = Principal::new(to)?;
    let caller = match as_principal {
        Some(name) => Principal::new(name)?,
        None => from.clone(),
    };

    let report = session.registry.transfer(&caller, &from, &to, id)?;
    session.save()?;

    println!(
        "{} Transferred {} records to {}",
        "✓".green(),
        report.reassigned.len().to_string().cyan(),
        to
    );
    if !report.skipped.is_empty() {
        println!(
            "  {} {} subtrees not owned by {} were left in place",
            "•".blue(),
            report.skipped.len(),
            from
        );
    }

    Ok(())
}

/// Set the construction status of a record.
pub fn set_status(
    root: &Path,
    id: NodeId,
    status: ConstructionStatus,
    as_principal: Option<&str>,
) -> Result<()> {
    let mut session = Session::open(root)?;
    let caller = session.acting(as_principal)?;

    session.registry.update_status(&caller, id, status)?;
    session.save()?;

    println!("{} {} is now {}", "✓".green(), id, status.to_string().cyan());
    Ok(())
}

/// Append a verification to a record's audit trail.
pub fn verify(
    root: &Path,
    id: NodeId,
    document: &str,
    note: &str,
    approved: bool,
    as_principal: Option<&str>,
) -> Result<()> {
    let mut session = Session::open(root)?;
    let caller = session.acting(as_principal)?;

    session
        .registry
        .append_verification(&caller, id, document, note, approved)?;
    session.save()?;

    let status = session
        .registry
        .get(id)
        .map(|n| n.status)
        .unwrap_or_default();
    println!(
        "{} Verification recorded for {} (status: {})",
        "✓".green(),
        id,
        status
    );
    Ok(())
}

/// Show registry statistics.
pub fn stats(root: &Path, owner: Option<&str>) -> Result<()> {
    let session = Session::open(root)?;
    let stats = session.registry.stats();

    println!("{}", "Edifice Registry".cyan().bold());
    println!();
    println!("  {} {}", "Minter:".dimmed(), session.registry.minter());
    println!("  {} {}", "Records:".dimmed(), stats.node_count);
    println!("  {} {}", "Links:".dimmed(), stats.hierarchy_links);
    println!("  {} {}", "Edge entries:".dimmed(), stats.edge_entries);
    println!("  {} {}", "Events:".dimmed(), stats.events_recorded);
    println!();
    for (tier, count) in &stats.by_tier {
        println!("  {:<10} {}", tier.to_string().yellow(), count);
    }

    if let Some(owner) = owner {
        let owner = Principal::new(owner)?;
        println!();
        println!(
            "  {} {} record(s)",
            format!("Held by {}:", owner).dimmed(),
            session.registry.balance_of(&owner)
        );
    }

    Ok(())
}

/// Print events recorded since they were last cleared.
pub fn events(root: &Path, clear: bool) -> Result<()> {
    let mut session = Session::open(root)?;

    let pending = session.registry.events();
    if pending.is_empty() {
        println!("No pending events");
    }
    for event in pending {
        println!("{} {}", event.name().yellow(), serde_json::to_string(event)?);
    }

    if clear {
        let drained = session.registry.drain_events();
        session.save()?;
        println!("{} Cleared {} events", "✓".green(), drained.len());
    }

    Ok(())
}
