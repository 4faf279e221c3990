use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use tabled::{builder::Builder, settings::Style, Table, Tabled};
use tracing_subscriber::EnvFilter;

use dairy_reports::api::{load_envelope_file, ApiClient, ReportPayload};
use dairy_reports::config::{
    config_dir, load_config, load_report_overrides, load_session, resolve_output_dir, Session,
    CONFIG_TEMPLATE, REPORTS_TEMPLATE, SESSION_TEMPLATE,
};
use dairy_reports::error::{ReportError, Result};
use dairy_reports::export::{generate_report_pdf, ExcelExporter, PdfReport, DEFAULT_COLUMN_WIDTH};
use dairy_reports::report::{
    aggregate, flatten, table_cells, DisplayRow, ExpansionState, ReportFilter, ReportKind,
    ReportStats, SortOrder,
};

#[derive(Parser)]
#[command(name = "dairy-reports")]
#[command(version, about = "Dairy subscription report fetch and Excel export", long_about = None)]
struct Cli {
    /// Path to config directory (default: ~/.dairy-reports or XDG config)
    #[arg(short = 'C', long, global = true)]
    config_dir: Option<PathBuf>,

    /// Log debug output to stderr (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct FilterArgs {
    /// Start of the date range (YYYY-MM-DD)
    #[arg(long)]
    from: Option<String>,

    /// End of the date range (YYYY-MM-DD)
    #[arg(long)]
    to: Option<String>,

    /// Grouping keys, outermost first (e.g. agency,area)
    #[arg(long, value_delimiter = ',')]
    group_by: Vec<String>,

    /// Free-text search
    #[arg(long)]
    search: Option<String>,

    /// Sort column
    #[arg(long)]
    sort_by: Option<String>,

    /// Sort direction (asc, desc)
    #[arg(long)]
    sort_order: Option<String>,

    /// Restrict to one agency id
    #[arg(long)]
    agency: Option<String>,

    /// Restrict to one depot id
    #[arg(long)]
    depot: Option<String>,

    /// Restrict to one vendor id
    #[arg(long)]
    vendor: Option<String>,

    /// Restrict to one status
    #[arg(long)]
    status: Option<String>,

    /// Read a saved JSON response instead of calling the API
    #[arg(long, value_name = "FILE")]
    input: Option<PathBuf>,
}

#[derive(Clone, Copy, ValueEnum)]
enum ExportFormat {
    Xlsx,
    Pdf,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize config directory with template files
    Init,

    /// List available reports
    Reports,

    /// Show config and session status
    Status,

    /// Fetch a report and print it as a table
    Show {
        /// Report id from 'reports' (e.g. purchase, snf-orders)
        report: String,

        #[command(flatten)]
        filter: FilterArgs,

        /// Expand a group by key (e.g. agency:3); can be repeated
        #[arg(long, value_name = "KEY")]
        expand: Vec<String>,

        /// Expand every group
        #[arg(long)]
        expand_all: bool,
    },

    /// Summarise a report client-side by depot, city, agency, status...
    Summary {
        /// Report id from 'reports' (snf-orders, delivery-agency, delivery-summaries)
        report: String,

        #[command(flatten)]
        filter: FilterArgs,
    },

    /// Export a report to Excel or PDF
    Export {
        /// Report id from 'reports'
        report: String,

        #[command(flatten)]
        filter: FilterArgs,

        /// Output format
        #[arg(long, value_enum, default_value = "xlsx")]
        format: ExportFormat,

        /// Custom output file path (default: output_dir/<Report>_<range>.xlsx)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Open the exported file with the system default viewer
        #[arg(long)]
        open: bool,
    },
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(e) = run(cli) {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "dairy_reports=debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn run(cli: Cli) -> Result<()> {
    // Determine config directory
    let cfg_dir = match cli.config_dir {
        Some(p) => p,
        None => config_dir()?,
    };

    match cli.command {
        Commands::Init => cmd_init(&cfg_dir),
        Commands::Reports => cmd_reports(),
        Commands::Status => cmd_status(&cfg_dir),
        Commands::Show {
            report,
            filter,
            expand,
            expand_all,
        } => cmd_show(&cfg_dir, &report, &filter, &expand, expand_all),
        Commands::Summary { report, filter } => cmd_summary(&cfg_dir, &report, &filter),
        Commands::Export {
            report,
            filter,
            format,
            output,
            open,
        } => cmd_export(&cfg_dir, &report, &filter, format, output, open),
    }
}

/// Initialize config directory with template files
fn cmd_init(cfg_dir: &Path) -> Result<()> {
    use std::fs;

    if cfg_dir.exists() {
        return Err(ReportError::AlreadyInitialized(cfg_dir.to_path_buf()));
    }

    fs::create_dir_all(cfg_dir.join("output"))?;
    fs::write(cfg_dir.join("config.toml"), CONFIG_TEMPLATE)?;
    fs::write(cfg_dir.join("session.toml"), SESSION_TEMPLATE)?;
    fs::write(cfg_dir.join("reports.toml"), REPORTS_TEMPLATE)?;

    println!("Initialized report config at: {}", cfg_dir.display());
    println!();
    println!("Next steps:");
    println!(
        "  1. Point at your backend:   $EDITOR {}/config.toml",
        cfg_dir.display()
    );
    println!(
        "  2. Paste a session token:   $EDITOR {}/session.toml",
        cfg_dir.display()
    );
    println!();
    println!("Then export your first report:");
    println!("  dairy-reports export purchase --from 2024-01-01 --to 2024-01-31");

    Ok(())
}

#[derive(Tabled)]
struct ReportRow {
    #[tabled(rename = "ID")]
    id: &'static str,
    #[tabled(rename = "TITLE")]
    title: &'static str,
    #[tabled(rename = "ENDPOINT")]
    endpoint: &'static str,
    #[tabled(rename = "SUMMARY")]
    summary: &'static str,
    #[tabled(rename = "ADMIN")]
    admin: &'static str,
}

#[derive(Tabled)]
struct BucketRow {
    #[tabled(rename = "BUCKET")]
    label: String,
    #[tabled(rename = "COUNT")]
    count: usize,
    #[tabled(rename = "QTY")]
    quantity: String,
    #[tabled(rename = "AMOUNT")]
    amount: String,
    #[tabled(rename = "AVERAGE")]
    average: String,
}

/// List available reports
fn cmd_reports() -> Result<()> {
    let yes_no = |b: bool| if b { "yes" } else { "-" };
    let rows: Vec<ReportRow> = ReportKind::ALL
        .iter()
        .map(|kind| ReportRow {
            id: kind.slug(),
            title: kind.title(),
            endpoint: kind.endpoint(),
            summary: yes_no(kind.dimensions().is_some()),
            admin: yes_no(kind.requires_admin()),
        })
        .collect();

    let table = Table::new(rows).with(Style::rounded()).to_string();
    println!("{table}");
    Ok(())
}

/// Show config and session status
fn cmd_status(cfg_dir: &Path) -> Result<()> {
    if !cfg_dir.exists() {
        return Err(ReportError::ConfigNotFound(cfg_dir.to_path_buf()));
    }

    let config = load_config(cfg_dir)?;
    let session = load_session(cfg_dir)?;
    let overrides = load_report_overrides(cfg_dir)?;

    println!("Report Status");
    println!("{}", "-".repeat(50));
    println!("Config directory: {}", cfg_dir.display());
    println!("Backend:          {}", config.api.base_url);
    println!(
        "Output dir:       {}",
        resolve_output_dir(&config.export.output_dir, cfg_dir).display()
    );
    println!(
        "Session:          {}",
        if session.bearer_token().is_some() {
            "token present"
        } else {
            "no token"
        }
    );
    if let Some(role) = session.role() {
        println!("Role:             {role}");
    }
    if let Some(agency) = &session.agency_id {
        println!("Agency:           {agency}");
    }
    println!("Report overrides: {}", overrides.len());

    Ok(())
}

fn build_filter(args: &FilterArgs, session: &Session) -> Result<ReportFilter> {
    let mut filter = ReportFilter::with_range(args.from.as_deref(), args.to.as_deref())?;
    filter.group_by = args.group_by.clone();
    filter.search = args.search.clone();
    filter.sort_by = args.sort_by.clone();
    filter.sort_order = args
        .sort_order
        .as_deref()
        .map(str::parse::<SortOrder>)
        .transpose()?;
    filter.agency_id = args.agency.clone();
    filter.depot_id = args.depot.clone();
    filter.vendor_id = args.vendor.clone();
    filter.status = args.status.clone();

    // agency-scoped sessions only see their own agency
    if !session.is_admin() {
        if let Some(agency) = &session.agency_id {
            filter.agency_id = Some(agency.to_string());
        }
    }
    Ok(filter)
}

/// Resolve the report, apply the role gate and load its data.
fn load_report(
    cfg_dir: &Path,
    report: &str,
    args: &FilterArgs,
) -> Result<(ReportKind, ReportFilter, ReportPayload)> {
    let kind = ReportKind::from_slug(report)?;
    let session = load_session(cfg_dir)?;
    if kind.requires_admin() && !session.is_admin() {
        return Err(ReportError::PermissionDenied(kind.slug().to_string()));
    }
    let filter = build_filter(args, &session)?;

    let payload = match &args.input {
        Some(path) => ReportPayload::from_envelope(kind, load_envelope_file(path)?)?,
        None => {
            if !cfg_dir.exists() {
                return Err(ReportError::ConfigNotFound(cfg_dir.to_path_buf()));
            }
            let config = load_config(cfg_dir)?;
            let token = session
                .bearer_token()
                .ok_or_else(|| ReportError::MissingToken(cfg_dir.join("session.toml")))?;
            let client = ApiClient::new(&config.api, Some(token.to_string()));
            client.fetch_report(kind, &filter)?
        }
    };
    Ok((kind, filter, payload))
}

/// Currency symbol from config when there is one
fn currency_symbol(cfg_dir: &Path) -> String {
    load_config(cfg_dir)
        .map(|c| c.export.currency_symbol)
        .unwrap_or_else(|_| "₹".to_string())
}

/// Fetch a report and print it as a table
fn cmd_show(
    cfg_dir: &Path,
    report: &str,
    args: &FilterArgs,
    expand: &[String],
    expand_all: bool,
) -> Result<()> {
    let (kind, filter, payload) = load_report(cfg_dir, report, args)?;
    if payload.nodes.is_empty() {
        println!("No data found for the given filters.");
        return Ok(());
    }

    let overrides = load_report_overrides(cfg_dir).unwrap_or_default();
    let export = kind.export_config(
        &filter,
        overrides.get(kind.slug()),
        chrono::Local::now().date_naive(),
    );

    let state = if expand_all {
        ExpansionState::all(&payload.nodes)
    } else {
        let mut state = ExpansionState::new();
        for key in expand {
            state.toggle(key);
        }
        state
    };

    let keys: Vec<&str> = export.headers.iter().map(|h| h.key.as_str()).collect();
    let rows = flatten(&payload.nodes, &state);

    let mut builder = Builder::default();
    builder.push_record(export.headers.iter().map(|h| h.label.clone()));
    for row in &rows {
        let mut cells = table_cells(row, &keys);
        if let DisplayRow::Group { key, .. } = row {
            if let Some(first) = cells.first_mut() {
                first.push_str(&format!(" [{key}]"));
            }
        }
        builder.push_record(cells);
    }
    let mut table = builder.build();
    table.with(Style::rounded());

    if let Some(title) = &export.title {
        println!("{title}");
    }
    println!("{table}");

    let leaves = payload.nodes.leaves().len();
    println!();
    println!("Rows: {leaves}");
    if let Some(total) = payload.total_records {
        println!("Total records: {total}");
    }
    if let Some(totals) = &payload.totals {
        println!(
            "Grand total: qty {} / amount {}{}",
            totals.total_quantity,
            currency_symbol(cfg_dir),
            format_report_amount(totals.total_amount)
        );
    }
    if payload.nodes.is_grouped() && !expand_all {
        println!("Use --expand <KEY> or --expand-all to open groups");
    }

    Ok(())
}

fn print_stats(stats: &ReportStats, symbol: &str) {
    for dimension in &stats.dimensions {
        println!("By {}", dimension.dimension);
        let rows: Vec<BucketRow> = dimension
            .buckets
            .iter()
            .map(|b| BucketRow {
                label: b.label.clone(),
                count: b.count,
                quantity: format!("{}", b.total_quantity),
                amount: format!("{}{}", symbol, format_report_amount(b.total_amount)),
                average: format!("{}{}", symbol, format_report_amount(b.average_amount)),
            })
            .collect();
        let table = Table::new(rows).with(Style::rounded()).to_string();
        println!("{table}");
        println!();
    }

    println!("Rows:          {}", stats.total_count);
    println!(
        "Total amount:  {}{}",
        symbol,
        format_report_amount(stats.total_amount)
    );
    println!(
        "Average value: {}{}",
        symbol,
        format_report_amount(stats.average_order_value)
    );
}

/// Summarise a report client-side
fn cmd_summary(cfg_dir: &Path, report: &str, args: &FilterArgs) -> Result<()> {
    let kind = ReportKind::from_slug(report)?;
    let dimensions = kind
        .dimensions()
        .ok_or_else(|| ReportError::NoSummary(kind.slug().to_string()))?;

    let (_, filter, payload) = load_report(cfg_dir, report, args)?;
    let leaves = payload.nodes.leaves();
    if leaves.is_empty() {
        println!("No data found for the given filters.");
        return Ok(());
    }

    let stats = aggregate(leaves, &dimensions);

    match filter.range_label() {
        Some(range) => println!("{} ({range})", kind.title()),
        None => println!("{}", kind.title()),
    }
    println!();
    print_stats(&stats, &currency_symbol(cfg_dir));
    Ok(())
}

/// Export a report to Excel or PDF
fn cmd_export(
    cfg_dir: &Path,
    report: &str,
    args: &FilterArgs,
    format: ExportFormat,
    output: Option<PathBuf>,
    open: bool,
) -> Result<()> {
    let (kind, filter, payload) = load_report(cfg_dir, report, args)?;
    if payload.nodes.is_empty() {
        println!("No data to export");
        return Ok(());
    }

    let config = if cfg_dir.exists() {
        Some(load_config(cfg_dir)?)
    } else {
        None
    };
    let overrides = if cfg_dir.exists() {
        load_report_overrides(cfg_dir)?
    } else {
        Default::default()
    };

    let today = chrono::Local::now().date_naive();
    let export = kind.export_config(&filter, overrides.get(kind.slug()), today);

    let path = match output {
        Some(path) => path,
        None => {
            let config = config
                .as_ref()
                .ok_or_else(|| ReportError::ConfigNotFound(cfg_dir.to_path_buf()))?;
            let output_dir = resolve_output_dir(&config.export.output_dir, cfg_dir);
            std::fs::create_dir_all(&output_dir)?;
            let file_name = match format {
                ExportFormat::Xlsx => export.file_name.clone(),
                ExportFormat::Pdf => filter.file_name(kind.title(), "pdf", today),
            };
            output_dir.join(file_name)
        }
    };

    match format {
        ExportFormat::Xlsx => {
            let width = config
                .as_ref()
                .map_or(DEFAULT_COLUMN_WIDTH, |c| c.export.default_column_width);
            ExcelExporter::new(&export)
                .default_width(width)
                .export(&payload.nodes, payload.totals.as_ref(), &path)?;
        }
        ExportFormat::Pdf => {
            let symbol = config
                .as_ref()
                .map_or_else(|| "₹".to_string(), |c| c.export.currency_symbol.clone());
            let title = export.title.as_deref().unwrap_or(kind.title());
            let pdf = PdfReport::build(
                title,
                filter.range_label(),
                &export,
                &payload.nodes,
                payload.totals.as_ref(),
                &symbol,
            );
            generate_report_pdf(&pdf, &path)?;
        }
    }

    println!("Exported {}", kind.title());
    println!("  Rows:   {}", payload.nodes.leaves().len());
    println!("  Saved:  {}", path.display());

    if open {
        open_path(&path)?;
    }
    Ok(())
}

fn open_path(path: &Path) -> Result<()> {
    // Open with system default viewer
    #[cfg(target_os = "macos")]
    {
        std::process::Command::new("open").arg(path).spawn()?;
    }

    #[cfg(target_os = "linux")]
    {
        std::process::Command::new("xdg-open").arg(path).spawn()?;
    }

    #[cfg(target_os = "windows")]
    {
        std::process::Command::new("cmd")
            .args(["/C", "start", ""])
            .arg(path)
            .spawn()?;
    }
    Ok(())
}

fn format_grouped_int(value: i64) -> String {
    let negative = value < 0;
    let digits = value.unsigned_abs().to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);

    for (i, ch) in digits.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }

    let mut grouped: String = out.chars().rev().collect();
    if negative {
        grouped.insert(0, '-');
    }
    grouped
}

/// Format a money amount with two decimal places and thousands separators
fn format_report_amount(value: f64) -> String {
    let rounded = format!("{:.2}", value);
    let (whole, frac) = rounded.split_once('.').unwrap_or((rounded.as_str(), "00"));

    let negative = whole.starts_with('-');
    let digits = whole.trim_start_matches('-');
    let grouped = format_grouped_int(digits.parse::<i64>().unwrap_or(0));

    if negative {
        format!("-{}.{}", grouped, frac)
    } else {
        format!("{}.{}", grouped, frac)
    }
}
