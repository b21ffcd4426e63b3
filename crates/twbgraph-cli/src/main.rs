use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use twbgraph_core::{Config, ExportFormat, GraphFormat, Report, Severity, SourceStatus};
use twbgraph_engine::export::{render_graph, write_records};
use twbgraph_engine::{process_entries, BatchOutcome};
use twbgraph_workbook::TableauReader;

mod inputs;

/// twbgraph - field metadata and calculation dependencies for Tableau workbooks
#[derive(Parser)]
#[command(name = "twbgraph")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to config file (default: twbgraph.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract field metadata from workbooks into one combined table
    Extract {
        /// Workbook files or directories
        #[arg(required = true)]
        inputs: Vec<PathBuf>,

        /// Output file (stdout if omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Table format (overrides config)
        #[arg(short, long, value_enum)]
        format: Option<RecordFormatArg>,
    },

    /// Build the field dependency graph from calculations
    Graph {
        /// Workbook files or directories
        #[arg(required = true)]
        inputs: Vec<PathBuf>,

        /// Output file (stdout if omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Graph format (overrides config)
        #[arg(short, long, value_enum)]
        format: Option<GraphFormatArg>,

        /// Collapse repeated dependency edges
        #[arg(long)]
        dedupe_edges: bool,
    },

    /// Show what a field depends on and what depends on it
    Impact {
        /// Field name (or field id such as "[Calculation_123]")
        field: String,

        /// Workbook files or directories
        #[arg(required = true)]
        inputs: Vec<PathBuf>,
    },

    /// Write the batch report
    Report {
        /// Workbook files or directories
        #[arg(required = true)]
        inputs: Vec<PathBuf>,

        /// Output file for report.json
        #[arg(short, long, default_value = "report.json")]
        output: PathBuf,

        /// Also output markdown report
        #[arg(short, long)]
        markdown: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum RecordFormatArg {
    Csv,
    Json,
}

impl From<RecordFormatArg> for ExportFormat {
    fn from(arg: RecordFormatArg) -> Self {
        match arg {
            RecordFormatArg::Csv => ExportFormat::Csv,
            RecordFormatArg::Json => ExportFormat::Json,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum GraphFormatArg {
    Json,
    Dot,
    Edges,
}

impl From<GraphFormatArg> for GraphFormat {
    fn from(arg: GraphFormatArg) -> Self {
        match arg {
            GraphFormatArg::Json => GraphFormat::Json,
            GraphFormatArg::Dot => GraphFormat::Dot,
            GraphFormatArg::Edges => GraphFormat::Edges,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "info" } else { "warn" };
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .init();

    // Load config if specified
    let mut config = if let Some(config_path) = &cli.config {
        Config::from_file(config_path)?
    } else if Path::new("twbgraph.toml").exists() {
        Config::from_file(Path::new("twbgraph.toml"))?
    } else {
        if cli.verbose {
            eprintln!("{}", "No config file found, using defaults".yellow());
        }
        Config::default()
    };

    let report = match cli.command {
        Commands::Extract { inputs, output, format } => {
            if let Some(format) = format {
                config.export.format = format.into();
            }
            extract_command(&config, &inputs, output.as_deref(), cli.verbose)?
        }
        Commands::Graph { inputs, output, format, dedupe_edges } => {
            if let Some(format) = format {
                config.graph.format = format.into();
            }
            config.graph.dedupe_edges |= dedupe_edges;
            graph_command(&config, &inputs, output.as_deref(), cli.verbose)?
        }
        Commands::Impact { field, inputs } => impact_command(&config, &field, &inputs, cli.verbose)?,
        Commands::Report { inputs, output, markdown } => {
            report_command(&config, &inputs, &output, markdown.as_deref(), cli.verbose)?
        }
    };

    // Failed files still produce output, but the run is flagged
    if report.has_errors() {
        std::process::exit(1);
    }

    Ok(())
}

/// Discover, read and process the inputs
fn run_batch(config: &Config, paths: &[PathBuf], verbose: bool) -> Result<BatchOutcome> {
    let files = inputs::discover(paths)?;

    if verbose {
        eprintln!("{} {} workbook file(s)...", "Processing".cyan(), files.len());
    }

    let outcome = process_files(config, &files);

    if verbose {
        for source in &outcome.report.sources {
            match source.status {
                SourceStatus::Extracted => eprintln!(
                    "  {} {} ({} fields)",
                    "✓".green(),
                    source.name,
                    source.records
                ),
                SourceStatus::Failed => eprintln!("  {} {}", "✗".red(), source.name),
            }
        }
    }

    Ok(outcome)
}

/// Read the discovered files and run them as one batch
fn process_files(config: &Config, files: &[PathBuf]) -> BatchOutcome {
    let entries = inputs::load(files);
    process_entries(&TableauReader::new(), entries.iter().map(|entry| entry.as_ref()), config)
}

/// Write to a file, or stdout when no path is given
fn write_output(output: Option<&Path>, contents: impl FnOnce(&mut dyn Write) -> Result<()>) -> Result<()> {
    match output {
        Some(path) => {
            let mut file = std::fs::File::create(path)?;
            contents(&mut file)?;
            file.flush()?;
        }
        None => {
            let stdout = std::io::stdout();
            let mut lock = stdout.lock();
            contents(&mut lock)?;
            lock.flush()?;
        }
    }
    Ok(())
}

/// Extract command - write the combined record table
fn extract_command(config: &Config, paths: &[PathBuf], output: Option<&Path>, verbose: bool) -> Result<Report> {
    let outcome = run_batch(config, paths, verbose)?;

    write_output(output, |w| {
        write_records(&outcome.records, config.export.format, w)?;
        Ok(())
    })?;

    if let Some(path) = output {
        eprintln!(
            "{} {} records to {}",
            "Wrote".green(),
            outcome.records.len(),
            path.display()
        );
    }

    print_problems(&outcome.report);
    Ok(outcome.report)
}

/// Graph command - write the dependency graph
fn graph_command(config: &Config, paths: &[PathBuf], output: Option<&Path>, verbose: bool) -> Result<Report> {
    let outcome = run_batch(config, paths, verbose)?;
    let rendered = render_graph(&outcome.graph, config.graph.format)?;

    write_output(output, |w| {
        w.write_all(rendered.as_bytes())?;
        Ok(())
    })?;

    if let Some(path) = output {
        eprintln!(
            "{} graph with {} nodes and {} edges to {}",
            "Wrote".green(),
            outcome.graph.node_count(),
            outcome.graph.edge_count(),
            path.display()
        );
    }

    print_problems(&outcome.report);
    Ok(outcome.report)
}

/// Impact command - upstream and downstream fields of one field
fn impact_command(config: &Config, field: &str, paths: &[PathBuf], verbose: bool) -> Result<Report> {
    let outcome = run_batch(config, paths, verbose)?;
    if outcome.is_empty() {
        print_problems(&outcome.report);
        anyhow::bail!("No workbook produced records; nothing to look up");
    }
    let node = find_node(&outcome, field)?;

    let upstream = outcome.graph.upstream(&node);
    let downstream = outcome.graph.downstream(&node);

    println!("\n{}", "=".repeat(60).bright_blue());
    println!("{}", "Field Dependency Impact".bold().bright_blue());
    println!("{}", "=".repeat(60).bright_blue());
    println!();

    println!("{} {}", "Field:".bold(), node.green());
    println!("{} {}", "Depends on:".bold(), upstream.len());
    for (i, dep) in upstream.iter().enumerate() {
        println!("  {}. {}", i + 1, dep);
    }
    println!();

    println!("{} {}", "Used by:".bold(), downstream.len());
    if downstream.is_empty() {
        println!("{}", "✓ No calculation references this field".green());
    } else {
        for (i, dep) in downstream.iter().enumerate() {
            println!("  {}. {}", i + 1, dep.yellow());
        }
        println!();
        println!("{}", "⚠ Changing this field affects the calculations above".yellow().bold());
    }

    println!();
    println!("{}", "=".repeat(60).bright_blue());

    print_problems(&outcome.report);
    Ok(outcome.report)
}

/// Resolve a field name, id or caption to a graph node
fn find_node(outcome: &BatchOutcome, field: &str) -> Result<String> {
    if outcome.graph.contains_node(field) {
        return Ok(field.to_string());
    }

    let bracketed = format!("[{}]", field);
    outcome
        .records
        .iter()
        .find(|r| {
            r.field_id == field
                || r.field_id == bracketed
                || r.field_caption.as_deref() == Some(field)
        })
        .map(|r| r.field_name.clone())
        .ok_or_else(|| {
            anyhow::anyhow!(
                "Field '{}' not found. Use the display name, or the field id (e.g. '[Calculation_123]')",
                field
            )
        })
}

/// Report command - write report.json (and optionally markdown)
fn report_command(
    config: &Config,
    paths: &[PathBuf],
    output: &Path,
    markdown: Option<&Path>,
    verbose: bool,
) -> Result<Report> {
    let outcome = run_batch(config, paths, verbose)?;
    let report = outcome.report;

    report.save_to_file(output)?;
    if verbose {
        eprintln!("{} {}", "Report saved to:".green(), output.display());
    }

    if let Some(md_path) = markdown {
        std::fs::write(md_path, generate_markdown_report(&report))?;
        if verbose {
            eprintln!("{} {}", "Markdown report saved to:".green(), md_path.display());
        }
    }

    print_report_summary(&report);
    Ok(report)
}

/// Print warnings and errors to stderr, leaving stdout for data
fn print_problems(report: &Report) {
    for diag in report.diagnostics.iter().filter(|d| d.severity > Severity::Info) {
        let severity_str = match diag.severity {
            Severity::Error => "ERROR".red().bold(),
            Severity::Warn => "WARN".yellow().bold(),
            Severity::Info => "INFO".cyan(),
        };
        eprintln!("[{}] {}: {}", severity_str, diag.code, diag.message);
    }
}

/// Print report summary to stdout
fn print_report_summary(report: &Report) {
    println!("\n{}", "=".repeat(60).bright_blue());
    println!("{}", "Workbook Extraction Report".bold().bright_blue());
    println!("{}", "=".repeat(60).bright_blue());
    println!();

    println!("Version: {}", report.version);
    println!("Timestamp: {}", report.timestamp);
    println!();

    let summary = &report.summary;
    println!("{}", "Summary:".bold());
    println!("  Files extracted: {}", summary.files_extracted);
    if summary.files_failed > 0 {
        println!("  Files failed:    {}", format!("{}", summary.files_failed).red().bold());
    } else {
        println!("  Files failed:    {}", format!("{}", summary.files_failed).green());
    }
    println!("  Records: {}", summary.records);
    println!("  Graph:   {} nodes, {} edges", summary.nodes, summary.edges);
    println!();

    if report.diagnostics.is_empty() {
        println!("{}", "✓ No issues found!".green().bold());
    } else {
        println!("{}", "Diagnostics:".bold());
        for diag in &report.diagnostics {
            let severity_str = match diag.severity {
                Severity::Error => "ERROR".red().bold(),
                Severity::Warn => "WARN".yellow().bold(),
                Severity::Info => "INFO".cyan(),
            };

            println!("  [{}] {}: {}", severity_str, diag.code, diag.message);

            if let Some(loc) = &diag.location {
                println!("    at {}", loc);
            }
            if let Some(snippet) = &diag.snippet {
                println!("    {}", snippet.dimmed());
            }
        }
    }

    println!();
    println!("{}", "=".repeat(60).bright_blue());
}

/// Generate markdown report
fn generate_markdown_report(report: &Report) -> String {
    let mut md = String::new();

    md.push_str("# Workbook Extraction Report\n\n");
    md.push_str(&format!("**Version:** {}\n\n", report.version));
    md.push_str(&format!("**Timestamp:** {}\n\n", report.timestamp));

    md.push_str("## Summary\n\n");
    md.push_str(&format!("- Files extracted: {}\n", report.summary.files_extracted));
    md.push_str(&format!("- Files failed: {}\n", report.summary.files_failed));
    md.push_str(&format!("- Records: {}\n", report.summary.records));
    md.push_str(&format!("- Graph: {} nodes, {} edges\n", report.summary.nodes, report.summary.edges));
    md.push('\n');

    md.push_str("## Sources\n\n");
    md.push_str("| File | Status | Fields | SHA-256 |\n|---|---|---|---|\n");
    for source in &report.sources {
        let status = match source.status {
            SourceStatus::Extracted => "extracted",
            SourceStatus::Failed => "failed",
        };
        md.push_str(&format!(
            "| {} | {} | {} | `{}` |\n",
            source.name, status, source.records, source.sha256
        ));
    }
    md.push('\n');

    if report.diagnostics.is_empty() {
        md.push_str("✅ **No issues found!**\n");
    } else {
        md.push_str("## Diagnostics\n\n");

        for diag in &report.diagnostics {
            let severity_emoji = match diag.severity {
                Severity::Error => "❌",
                Severity::Warn => "⚠️",
                Severity::Info => "ℹ️",
            };

            md.push_str(&format!("### {} {} - {}\n\n", severity_emoji, diag.severity, diag.code));
            md.push_str(&format!("{}\n\n", diag.message));

            if let Some(loc) = &diag.location {
                md.push_str(&format!("**Location:** {}\n\n", loc));
            }
            if let Some(snippet) = &diag.snippet {
                md.push_str(&format!("```\n{}\n```\n\n", snippet));
            }
        }
    }

    md
}
