//! bundlescope - Size breakdown and duplicate detection for app archives.
//!
//! Usage:
//!   bundlescope summary <ARCHIVE>       Size outline and category breakdown
//!   bundlescope duplicates <ARCHIVE>    Find duplicated files and folders
//!   bundlescope layout <ARCHIVE>        Treemap rectangles for one node
//!   bundlescope export <ARCHIVE>        Export the tree and analysis to JSON
//!   bundlescope --help                  Show help

use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand, ValueEnum};
use color_eyre::eyre::{Context, Result, eyre};
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use bundlescope_analyze::{ArchiveAnalysis, ArchiveApp, CategoryBreakdown, DuplicateConfig, DuplicateReport};
use bundlescope_core::{ArchiveNode, ArchiveTree, BuildConfig, NodeId};
use bundlescope_layout::{Partition, Rect, Weighted, partition};
use bundlescope_scan::TreeBuilder;

const LOG_ENV: &str = "BUNDLESCOPE_LOG";

#[derive(Parser)]
#[command(
    name = "bundlescope",
    version,
    about = "Size breakdown and duplicate detection for application bundles",
    long_about = "bundlescope opens an .ipa/.xcarchive or an unpacked bundle, breaks \
                  binaries and asset catalogs into their parts, and reports where \
                  the bytes go."
)]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

/// Options shared by every command that builds a tree.
#[derive(Args)]
struct SourceArgs {
    /// Archive file or unpacked bundle directory
    path: PathBuf,

    /// Treat the path as a zip archive even if auto-detection disagrees
    #[arg(long, conflicts_with = "unpacked")]
    compressed: bool,

    /// Treat the path as an already unpacked directory
    #[arg(long)]
    unpacked: bool,

    /// Do not run the size tool on executables
    #[arg(long)]
    no_binaries: bool,

    /// Do not run the asset tool on asset catalogs
    #[arg(long)]
    no_assets: bool,

    /// Maximum number of external tools running at once
    #[arg(short = 'j', long, default_value = "4")]
    jobs: usize,

    /// Skip entries whose names start with a dot
    #[arg(long)]
    skip_hidden: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Show a size outline, the category breakdown and the apps found
    Summary {
        #[command(flatten)]
        source: SourceArgs,

        /// Maximum depth to display
        #[arg(short, long, default_value = "3")]
        depth: u32,

        /// Number of largest children to show per directory
        #[arg(short = 'n', long, default_value = "10")]
        top: usize,
    },

    /// Find duplicated files and folders
    Duplicates {
        #[command(flatten)]
        source: SourceArgs,

        /// Report every duplicated node, not only the outermost ones
        #[arg(short, long)]
        all: bool,

        /// Minimum node size to report (e.g., "1KB", "1MB")
        #[arg(short, long, default_value = "0")]
        min_size: String,

        /// Maximum number of groups to show (0 shows all)
        #[arg(short = 'n', long, default_value = "20")]
        limit: usize,

        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },

    /// Lay out the children of a node as treemap rectangles
    Layout {
        #[command(flatten)]
        source: SourceArgs,

        /// Node to lay out, relative to the archive root
        #[arg(short, long)]
        node: Option<PathBuf>,

        /// Frame width
        #[arg(long, default_value = "1280")]
        width: f64,

        /// Frame height
        #[arg(long, default_value = "800")]
        height: f64,

        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },

    /// Export the tree and its analysis to JSON
    Export {
        #[command(flatten)]
        source: SourceArgs,

        /// Output file (defaults to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum, Default)]
enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Command::Summary { source, depth, top } => run_summary(&source, depth, top).await,
        Command::Duplicates {
            source,
            all,
            min_size,
            limit,
            format,
        } => run_duplicates(&source, all, &min_size, limit, format).await,
        Command::Layout {
            source,
            node,
            width,
            height,
            format,
        } => run_layout(&source, node.as_deref(), Rect::with_size(width, height), format).await,
        Command::Export { source, output } => run_export(&source, output).await,
    }
}

fn init_logging(verbose: u8) {
    let fallback = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(fallback));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

impl SourceArgs {
    fn build_config(&self) -> BuildConfig {
        let mut config = BuildConfig::new(&self.path);
        config.compressed = match (self.compressed, self.unpacked) {
            (true, _) => Some(true),
            (_, true) => Some(false),
            _ => None,
        };
        config.expand_binaries = !self.no_binaries;
        config.expand_asset_catalogs = !self.no_assets;
        config.max_concurrent_tools = self.jobs.max(1);
        config.include_hidden = !self.skip_hidden;
        config
    }
}

/// Build the tree for an archive, cancelling on Ctrl-C.
async fn load(source: &SourceArgs) -> Result<ArchiveTree> {
    eprintln!("Opening {}...", source.path.display());

    let builder = TreeBuilder::new(source.build_config());
    let cancel = CancellationToken::new();

    let interrupt = cancel.clone();
    let watcher = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            interrupt.cancel();
        }
    });

    let opened = builder
        .open_with_cancel(&cancel)
        .await
        .wrap_err_with(|| format!("Failed to build tree for {}", source.path.display()));
    watcher.abort();

    let tree = opened?.into_tree();
    for warning in &tree.warnings {
        tracing::debug!(path = %warning.path.display(), "{}", warning.message);
    }
    Ok(tree)
}

/// Show the outline, the breakdown and the apps.
async fn run_summary(source: &SourceArgs, depth: u32, top_n: usize) -> Result<()> {
    let tree = load(source).await?;
    let analysis = ArchiveAnalysis::new(&tree);

    println!();
    println!("{}", "─".repeat(60));
    println!(" {} - {}", tree.source.display(), format_size(tree.total_size()));
    println!(
        " {} files, {} directories, {} expanded",
        tree.stats.total_files, tree.stats.total_dirs, tree.stats.expanded_files
    );
    println!(" Built in {:.2}s", tree.build_duration.as_secs_f64());
    println!("{}", "─".repeat(60));
    println!();

    print_node(&tree.root, 0, depth, top_n, tree.root.size);

    println!();
    print_breakdown(&analysis.breakdown);

    if !analysis.apps.is_empty() {
        println!();
        print_apps(&analysis.apps);
    }

    if tree.has_warnings() {
        println!();
        println!("{} warning(s) during build", tree.warnings.len());
    }

    Ok(())
}

/// Find duplicates and print the report.
async fn run_duplicates(
    source: &SourceArgs,
    all: bool,
    min_size: &str,
    limit: usize,
    format: OutputFormat,
) -> Result<()> {
    let min_bytes = parse_size(min_size).wrap_err_with(|| format!("Invalid size: {min_size}"))?;
    let tree = load(source).await?;
    let analysis = ArchiveAnalysis::new(&tree);

    let config = DuplicateConfig::builder()
        .top_level_only(!all)
        .min_size(min_bytes)
        .max_groups(limit)
        .build()
        .map_err(|e| eyre!("{e}"))?;
    let report = DuplicateReport::new(&analysis.duplicates, &config);

    match format {
        OutputFormat::Text => {
            println!();
            println!("{}", "─".repeat(70));
            println!(" Duplicate Report ({})", if all { "all nodes" } else { "top level" });
            println!("{}", "─".repeat(70));
            println!();

            if !report.has_duplicates() {
                println!(" No duplicates found.");
                return Ok(());
            }

            println!(
                " {} group(s), {} wasted",
                report.group_count,
                format_size(report.total_wasted_space)
            );
            println!();

            for (i, group) in report.groups.iter().enumerate() {
                println!(
                    " #{} {} x {} ({} wasted)",
                    i + 1,
                    group.count(),
                    format_size(group.size),
                    format_size(group.wasted_bytes())
                );
                for id in &group.nodes {
                    let owner = analysis
                        .owning_app(id)
                        .map(|app| format!("  [{}]", app.name))
                        .unwrap_or_default();
                    println!("   {}{}", id, owner);
                }
                println!();
            }
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
    }

    Ok(())
}

/// Adapts tree nodes to the partitioner.
#[derive(Debug, Clone, Copy, Serialize)]
struct SizedNode<'a> {
    id: &'a NodeId,
    name: &'a str,
    size: u64,
}

impl<'a> From<&'a ArchiveNode> for SizedNode<'a> {
    fn from(node: &'a ArchiveNode) -> Self {
        Self {
            id: &node.id,
            name: &node.name,
            size: node.size,
        }
    }
}

impl Weighted for SizedNode<'_> {
    fn weight(&self) -> f64 {
        self.size as f64
    }
}

/// Lay out the children of one node.
async fn run_layout(
    source: &SourceArgs,
    node: Option<&Path>,
    frame: Rect,
    format: OutputFormat,
) -> Result<()> {
    if !(frame.width >= 0.0 && frame.height >= 0.0) {
        return Err(eyre!("Frame size must not be negative"));
    }

    let tree = load(source).await?;
    let id = node
        .filter(|path| *path != Path::new("."))
        .map(NodeId::new)
        .unwrap_or_else(NodeId::root);
    let target = tree
        .root
        .find(&id)
        .ok_or_else(|| eyre!("No node at {}", id))?;

    let parts: Vec<Partition<SizedNode<'_>>> = partition(
        target.children_by_size().into_iter().map(SizedNode::from),
        frame,
    );

    match format {
        OutputFormat::Text => {
            for part in &parts {
                let rect = part.rect;
                println!(
                    "{:<40} {:>10}  x={:<9.2} y={:<9.2} w={:<9.2} h={:<9.2}",
                    truncate(part.item.name, 40),
                    format_size(part.item.size),
                    rect.x,
                    rect.y,
                    rect.width,
                    rect.height
                );
            }
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&parts)?);
        }
    }

    Ok(())
}

#[derive(Serialize)]
struct Export<'a> {
    tree: &'a ArchiveTree,
    apps: &'a [ArchiveApp],
    breakdown: &'a CategoryBreakdown,
    duplicates: DuplicateReport,
}

/// Export the tree and its analysis to JSON.
async fn run_export(source: &SourceArgs, output: Option<PathBuf>) -> Result<()> {
    let tree = load(source).await?;
    let analysis = ArchiveAnalysis::new(&tree);

    let export = Export {
        tree: &tree,
        apps: &analysis.apps,
        breakdown: &analysis.breakdown,
        duplicates: DuplicateReport::new(&analysis.duplicates, &DuplicateConfig::default()),
    };
    let json = serde_json::to_string_pretty(&export)?;

    match output {
        Some(output_path) => {
            tokio::fs::write(&output_path, json)
                .await
                .wrap_err_with(|| format!("Failed to write {}", output_path.display()))?;
            eprintln!("Exported to {}", output_path.display());
        }
        None => println!("{json}"),
    }

    Ok(())
}

/// Print a node and its largest children.
fn print_node(node: &ArchiveNode, depth: u32, max_depth: u32, top_n: usize, root_size: u64) {
    let indent = "  ".repeat(depth as usize);
    let ratio = if root_size > 0 {
        node.size as f64 / root_size as f64
    } else {
        0.0
    };
    let label = node
        .content
        .as_ref()
        .map(|content| content.description())
        .unwrap_or("Folder");

    println!(
        "{}{}{:<40} {:>10} {:>5.1}% {} {}",
        indent,
        if node.is_leaf() { "  " } else { "▼ " },
        truncate(&node.name, 40),
        format_size(node.size),
        ratio * 100.0,
        make_bar(ratio, 10),
        label
    );

    if depth >= max_depth {
        return;
    }

    let children = node.children_by_size();
    let hidden = children.len().saturating_sub(top_n);
    for child in children.into_iter().take(top_n) {
        print_node(child, depth + 1, max_depth, top_n, root_size);
    }
    if hidden > 0 {
        println!("{}    ... and {} more", indent, hidden);
    }
}

fn print_breakdown(breakdown: &CategoryBreakdown) {
    println!(" By category:");
    let total = breakdown.total_size().max(1);
    for (category, stats) in breakdown.iter() {
        let ratio = stats.size as f64 / total as f64;
        println!(
            "   {:<14} {:>10} {:>7} items  {}",
            category.to_string(),
            format_size(stats.size),
            stats.count,
            make_bar(ratio, 30)
        );
    }
}

fn print_apps(apps: &[ArchiveApp]) {
    println!(" Apps:");
    for app in apps {
        let platforms: Vec<&str> = app.platforms.iter().map(|p| p.identifier()).collect();
        println!(
            "   {} {} [{}] {} {}",
            app.name,
            app.version,
            app.identifier,
            format_size(app.size),
            platforms.join(", ")
        );
    }
}

/// Create a simple ASCII bar.
fn make_bar(ratio: f64, width: usize) -> String {
    let filled = ((ratio * width as f64).round() as usize).min(width);
    format!("[{}{}]", "█".repeat(filled), "░".repeat(width - filled))
}

/// Format size in human-readable form.
fn format_size(bytes: u64) -> String {
    humansize::format_size(bytes, humansize::BINARY)
}

/// Truncate a string to at most `max_len` characters.
fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(1)).collect();
        format!("{kept}…")
    }
}

/// Parse a size string (e.g., "512", "1KB", "10MB", "1G").
fn parse_size(s: &str) -> Result<u64> {
    let s = s.trim().to_uppercase();
    let digits_end = s
        .find(|c: char| !c.is_ascii_digit() && c != '.')
        .unwrap_or(s.len());
    let (number, unit) = s.split_at(digits_end);

    let multiplier: u64 = match unit.trim() {
        "" | "B" => 1,
        "K" | "KB" => 1024,
        "M" | "MB" => 1024 * 1024,
        "G" | "GB" => 1024 * 1024 * 1024,
        other => return Err(eyre!("Unknown size unit: {other}")),
    };
    let number: f64 = number.parse()?;

    Ok((number * multiplier as f64) as u64)
}
