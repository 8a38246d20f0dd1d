//! Matzbiim CLI - Normalize voter files to clean CSV
//!
//! # Main Commands
//!
//! ```bash
//! matzbiim run                          # Normalize the single ./data/AllNYSVoters* file
//! matzbiim run input.txt -o out.csv     # Normalize a given file
//! matzbiim run in.csv --layout-file my_layout.json --has-header
//! ```
//!
//! # Inspection Commands
//!
//! ```bash
//! matzbiim sniff input.txt              # Show detected delimiter, quote, encoding
//! matzbiim count input.txt              # Count rows
//! matzbiim sources                      # List candidate source files
//! matzbiim layout nys                   # Show a layout as JSON
//! matzbiim operations                   # Show available layout operations
//! ```
//!
//! # Environment
//!
//! - `MATZBIIM_DATA_DIR` - where sources are discovered (default `./data`)
//! - `MATZBIIM_OUTPUT` - default output file (default `<data dir>/output.csv`)

use clap::{Parser, Subcommand, ValueEnum};
use matzbiim::layout::{self, nys, Layout, LayoutFile};
use matzbiim::logs::{log_error, log_info, log_info_indent, log_success, log_warning, LogFormat, LOGGER};
use matzbiim::{
    count_rows, find_source_files, select_source, sniff_file, ConsoleObserver, Interrupt,
    PipelineOptions, PipelineResult, RunSummary, StreamPipeline, DEFAULT_SAMPLE_SIZE,
};
use serde_json::json;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use tokio::task::JoinHandle;

type CliResult = Result<(), Box<dyn std::error::Error>>;

#[derive(Parser)]
#[command(name = "matzbiim")]
#[command(about = "Normalize voter files into clean CSV", long_about = None)]
struct Cli {
    /// Only print warnings and errors, no progress bar
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Log line format on stderr
    #[arg(long, global = true, value_enum, default_value = "text")]
    log_format: LogFormatArg,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, Debug, Default, ValueEnum)]
enum LogFormatArg {
    /// Human-readable lines
    #[default]
    Text,
    /// One JSON object per line
    Json,
}

impl From<LogFormatArg> for LogFormat {
    fn from(arg: LogFormatArg) -> Self {
        match arg {
            LogFormatArg::Text => LogFormat::Text,
            LogFormatArg::Json => LogFormat::Json,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Normalize a source file
    Run {
        /// Source file (discovered in the data directory if omitted)
        input: Option<PathBuf>,

        /// Output CSV file
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Built-in layout
        #[arg(short, long, default_value = nys::NAME, conflicts_with = "layout_file")]
        layout: String,

        /// JSON layout file instead of a built-in layout
        #[arg(long)]
        layout_file: Option<PathBuf>,

        /// Skip the row count pre-pass
        #[arg(long)]
        no_count: bool,

        /// Source starts with a header row
        #[arg(long)]
        has_header: bool,

        /// Write the run summary as JSON
        #[arg(long)]
        report: Option<PathBuf>,
    },

    /// Detect the dialect of a file
    Sniff {
        /// Input file
        input: PathBuf,

        /// Bytes to inspect
        #[arg(long, default_value_t = DEFAULT_SAMPLE_SIZE)]
        sample_size: usize,
    },

    /// Count rows in a file
    Count {
        /// Input file
        input: PathBuf,
    },

    /// List source files in the data directory
    Sources {
        /// File name prefix
        #[arg(short, long, default_value = nys::SOURCE_PREFIX)]
        prefix: String,

        /// Directory to search (default: data directory)
        #[arg(short, long)]
        dir: Option<PathBuf>,
    },

    /// Show a layout as JSON
    Layout {
        /// Built-in layout name
        #[arg(default_value = nys::NAME)]
        name: String,

        /// Describe a JSON layout file instead
        #[arg(long)]
        file: Option<PathBuf>,

        /// Print an example layout file to start from
        #[arg(long)]
        example: bool,
    },

    /// Show available layout operations
    Operations,
}

#[tokio::main]
async fn main() {
    // Load .env file (if present)
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    LOGGER.set_quiet(cli.quiet);
    LOGGER.set_format(cli.log_format.into());

    let result = match cli.command {
        Commands::Run {
            input,
            output,
            layout,
            layout_file,
            no_count,
            has_header,
            report,
        } => {
            let show_progress = !cli.quiet && matches!(cli.log_format, LogFormatArg::Text);
            cmd_run(
                input,
                output,
                &layout,
                layout_file.as_deref(),
                no_count,
                has_header,
                report.as_deref(),
                show_progress,
            )
            .await
        }

        Commands::Sniff { input, sample_size } => cmd_sniff(&input, sample_size),

        Commands::Count { input } => cmd_count(input).await,

        Commands::Sources { prefix, dir } => cmd_sources(dir, &prefix),

        Commands::Layout { name, file, example } => cmd_layout(&name, file.as_deref(), example),

        Commands::Operations => cmd_operations(),
    };

    if let Err(e) = result {
        log_error(format!("Error: {}", e));
        std::process::exit(1);
    }
}

fn data_dir() -> PathBuf {
    std::env::var_os("MATZBIIM_DATA_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("./data"))
}

fn default_output() -> PathBuf {
    std::env::var_os("MATZBIIM_OUTPUT")
        .map(PathBuf::from)
        .unwrap_or_else(|| data_dir().join("output.csv"))
}

fn load_layout(name: &str, file: Option<&Path>) -> Result<Layout, Box<dyn std::error::Error>> {
    let layout = match file {
        Some(path) => LayoutFile::load(path)?.compile()?,
        None => layout::builtin(name)?,
    };
    Ok(layout)
}

/// Raise `interrupt` on every Ctrl-C until the returned task is aborted.
fn listen_for_interrupts(interrupt: Interrupt) -> JoinHandle<()> {
    tokio::spawn(async move {
        while tokio::signal::ctrl_c().await.is_ok() {
            interrupt.raise();
        }
    })
}

#[allow(clippy::too_many_arguments)]
async fn cmd_run(
    input: Option<PathBuf>,
    output: Option<PathBuf>,
    layout_name: &str,
    layout_file: Option<&Path>,
    no_count: bool,
    has_header: bool,
    report: Option<&Path>,
    show_progress: bool,
) -> CliResult {
    let layout = load_layout(layout_name, layout_file)?;

    let input = match input {
        Some(path) => path,
        None => {
            let prefix = layout
                .source_prefix
                .clone()
                .ok_or("layout has no source prefix, pass an input file")?;
            select_source(&data_dir(), &prefix)?
        }
    };
    let output = output.unwrap_or_else(default_output);

    log_info(format!("📄 Processing: {}", input.display()));
    log_info_indent(format!("Layout: {} ({} columns)", layout.name, layout.columns.len()), 1);
    log_info_indent(format!("Output: {}", output.display()), 1);

    let options = PipelineOptions {
        count_rows: !no_count,
        has_header: has_header || layout.has_header,
        ..PipelineOptions::default()
    };

    let interrupt = Interrupt::new();
    let listener = listen_for_interrupts(interrupt.clone());

    let summary = tokio::task::spawn_blocking(move || -> PipelineResult<RunSummary> {
        let mut observer = ConsoleObserver::new(show_progress).with_counting(options.count_rows);
        StreamPipeline::for_layout(&layout)
            .with_options(options)
            .with_interrupt(interrupt)
            .run_files(&input, &output, &mut observer)
    })
    .await??;
    listener.abort();

    log_success(summary.summary());
    if summary.interrupted {
        log_warning("Run was interrupted, output holds the records processed so far");
    }
    if summary.dropped_truncated {
        log_warning(format!(
            "Only the first {} dropped records are listed in the report",
            summary.dropped.len()
        ));
    }

    if let Some(path) = report {
        fs::write(path, serde_json::to_string_pretty(&summary)?)?;
        log_info_indent(format!("💾 Report saved to: {}", path.display()), 1);
    }

    Ok(())
}

fn cmd_sniff(input: &Path, sample_size: usize) -> CliResult {
    let dialect = sniff_file(input, sample_size)?;
    log_success(format!("Detected {}", dialect));

    let description = json!({
        "delimiter": dialect.delimiter_display(),
        "quote": (dialect.quote as char).to_string(),
        "quoted": dialect.quoted,
        "encoding": dialect.encoding,
    });
    println!("{}", serde_json::to_string_pretty(&description)?);
    Ok(())
}

async fn cmd_count(input: PathBuf) -> CliResult {
    let file = File::open(&input)?;
    log_info("Counting rows... (Press Ctrl-C to stop.)");

    let interrupt = Interrupt::new();
    let listener = listen_for_interrupts(interrupt.clone());
    let count = tokio::task::spawn_blocking(move || count_rows(file, &interrupt)).await?;
    listener.abort();

    match count {
        Some(n) => println!("{}", n),
        None => log_warning("Row count unavailable"),
    }
    Ok(())
}

fn cmd_sources(dir: Option<PathBuf>, prefix: &str) -> CliResult {
    let dir = dir.unwrap_or_else(data_dir);
    let files = find_source_files(&dir, prefix)?;

    if files.is_empty() {
        log_warning(format!("No files matching '{}*' found in {}", prefix, dir.display()));
    }
    for file in files {
        println!("{}", file.display());
    }
    Ok(())
}

fn cmd_layout(name: &str, file: Option<&Path>, example: bool) -> CliResult {
    if example {
        println!("{}", layout::example_layout().to_json()?);
        return Ok(());
    }

    let layout = load_layout(name, file)?;
    println!("{}", serde_json::to_string_pretty(&layout.describe())?);
    Ok(())
}

fn cmd_operations() -> CliResult {
    println!("{}", layout::operations_description());
    Ok(())
}
