// Entry point and CLI flow.
//
// Each subcommand is one step of the dashboard lifecycle:
// - `ingest` loads a CSV/workbook, aggregates it and stores the dashboard.
// - `show` previews the stored spec in the console.
// - `ask` answers a question against the stored spec.
// - `export` writes a plain CSV report of KPIs and insights.
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use argus_report::dashboard::filter_disciplines;
use argus_report::report::{write_report, ReportScope};
use argus_report::types::VisualType;
use argus_report::util::format_int;
use argus_report::{loader, output, pipeline, query};
use argus_report::{Config, DashboardSpec, FileSpecStore, MatchStrategy, Module, SpecKey, SpecStore};
use chrono::Utc;
use clap::{Args, Parser, Subcommand};
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "argus")]
#[command(version, about = "Construction-site dashboards from spreadsheet uploads", long_about = None)]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Debug)]
struct GlobalArgs {
    /// Directory holding stored dashboard specs
    #[arg(long, global = true, env = "ARGUS_STORE_DIR", default_value = argus_report::config::DEFAULT_STORE_DIR)]
    store_dir: PathBuf,

    /// Directory reports are written to
    #[arg(long, global = true, env = "ARGUS_REPORTS_DIR", default_value = argus_report::config::DEFAULT_REPORTS_DIR)]
    reports_dir: PathBuf,

    /// Upload size cap in MiB
    #[arg(long, global = true, env = "ARGUS_MAX_UPLOAD_MB", default_value_t = argus_report::config::DEFAULT_MAX_UPLOAD_MB)]
    max_upload_mb: u64,

    /// Log level used when RUST_LOG is not set
    #[arg(long, global = true, default_value = "info")]
    log_level: String,
}

impl GlobalArgs {
    fn config(&self) -> Config {
        Config {
            max_upload_mb: self.max_upload_mb,
            store_dir: self.store_dir.clone(),
            reports_dir: self.reports_dir.clone(),
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Load a CSV or workbook, aggregate it and store the dashboard spec
    Ingest {
        #[arg(long)]
        module: Module,
        #[arg(long)]
        file: PathBuf,
        #[arg(long)]
        project: Option<String>,
        #[arg(long, value_enum, default_value_t = MatchStrategy::Synonym)]
        strategy: MatchStrategy,
        /// Also write the dashboard JSON to this path
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Preview the stored dashboard for a module
    Show {
        #[arg(long)]
        module: Module,
        #[arg(long)]
        project: Option<String>,
        /// Comma-separated disciplines to keep
        #[arg(long, value_delimiter = ',')]
        disciplines: Vec<String>,
        /// Write the (filtered) dashboard JSON to this path
        #[arg(long)]
        json: Option<PathBuf>,
    },
    /// Ask a question about the stored dashboard
    Ask {
        #[arg(long)]
        module: Module,
        #[arg(long)]
        project: Option<String>,
        question: String,
    },
    /// Write a CSV report of KPIs and insights
    Export {
        #[arg(long)]
        module: Module,
        #[arg(long)]
        project: Option<String>,
        #[arg(long, value_delimiter = ',')]
        disciplines: Vec<String>,
        /// Report range start; defaults to the earliest date in the upload
        #[arg(long)]
        date_from: Option<String>,
        /// Report range end; defaults to the latest date in the upload
        #[arg(long)]
        date_to: Option<String>,
        /// Also export the detail table as its own CSV
        #[arg(long)]
        detail: bool,
    },
}

fn init_logging(level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.global.log_level);
    let config = cli.global.config();
    let store = FileSpecStore::new(&config.store_dir);

    match cli.command {
        Commands::Ingest {
            module,
            file,
            project,
            strategy,
            out,
        } => {
            let table = loader::load_table(&file, config.max_upload_mb)
                .with_context(|| format!("failed to load {}", file.display()))?;
            let processed = pipeline::process(&table, module, strategy, Utc::now())?;
            let key = SpecKey::new(project.as_deref(), module);
            store.upsert(&key, &processed.spec).context("failed to store dashboard spec")?;

            println!(
                "Processed {} rows for {} ({} strategy).",
                format_int(processed.row_count),
                module.label(),
                strategy
            );
            if let Some(map) = &processed.column_map {
                for (header, field) in map {
                    println!("  {} -> {}", header, field);
                }
            }
            if !processed.unmapped_headers.is_empty() {
                println!("Unmapped headers: {}", processed.unmapped_headers.join(", "));
            }
            println!();
            print_dashboard(&processed.spec);
            if let Some(path) = out {
                output::write_json(&path, &processed.spec)
                    .with_context(|| format!("failed to write {}", path.display()))?;
                println!("(Spec written to {})", path.display());
            }
        }
        Commands::Show {
            module,
            project,
            disciplines,
            json,
        } => {
            let spec = load_spec(&store, project.as_deref(), module)?;
            let spec = filter_disciplines(&spec, &disciplines);
            println!("{} dashboard (updated {})\n", module.label(), spec.last_updated.to_rfc3339());
            print_dashboard(&spec);
            if let Some(path) = json {
                output::write_json(&path, &spec).with_context(|| format!("failed to write {}", path.display()))?;
                println!("(Spec written to {})", path.display());
            }
        }
        Commands::Ask {
            module,
            project,
            question,
        } => {
            let key = SpecKey::new(project.as_deref(), module);
            let spec = store.latest(&key).context("failed to read dashboard spec")?;
            let reply = query::answer(&question, spec.as_ref(), Some(module));
            println!("{}", reply.message);
            if let Some(id) = reply.highlight_kpi_id {
                println!("\n(highlight: {})", id);
            }
        }
        Commands::Export {
            module,
            project,
            disciplines,
            date_from,
            date_to,
            detail,
        } => {
            let spec = load_spec(&store, project.as_deref(), module)?;
            let filtered = filter_disciplines(&spec, &disciplines);
            let scope = ReportScope::of(&filtered)
                .with_disciplines(disciplines)
                .with_dates(date_from, date_to);
            let now = Utc::now();
            let path = write_report(&config.reports_dir, module, &filtered, &scope, now)
                .with_context(|| format!("failed to write report under {}", config.reports_dir.display()))?;
            println!("Report exported to {}", path.display());
            if detail {
                if let Some(table) = filtered.visuals.iter().find(|v| v.kind == VisualType::Table) {
                    let detail_path = path.with_file_name(format!(
                        "{}_{}_detail.csv",
                        module.as_str(),
                        argus_report::report::report_stamp(now)
                    ));
                    output::write_visual_csv(&detail_path, table)
                        .with_context(|| format!("failed to write {}", detail_path.display()))?;
                    println!("Detail table exported to {}", detail_path.display());
                }
            }
        }
    }
    Ok(())
}

fn load_spec(store: &FileSpecStore, project: Option<&str>, module: Module) -> Result<DashboardSpec> {
    let key = SpecKey::new(project, module);
    match store.latest(&key).context("failed to read dashboard spec")? {
        Some(spec) => {
            info!(module = %module, path = %store.path_for(&key).display(), "loaded stored spec");
            Ok(spec)
        }
        None => bail!(
            "No {} dashboard stored yet. Run `argus ingest --module {}` first.",
            module.label(),
            module
        ),
    }
}

fn print_dashboard(spec: &DashboardSpec) {
    output::preview_kpis(spec);
    if let Some(table) = spec.visuals.iter().find(|v| v.kind == VisualType::Table) {
        output::preview_visual(table, 10);
    }
    println!("Insights:");
    for (i, insight) in spec.insights.iter().enumerate() {
        println!("  {}. {}", i + 1, insight);
    }
    println!(
        "\n{} disciplines, {} to {}",
        format_int(spec.meta.disciplines.len()),
        if spec.meta.date_min.is_empty() { "N/A" } else { spec.meta.date_min.as_str() },
        if spec.meta.date_max.is_empty() { "N/A" } else { spec.meta.date_max.as_str() },
    );
}
