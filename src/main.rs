use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use snapshot_merge::io::csv_read::{
    DEFAULT_FALLBACK_ENCODING, DEFAULT_PRIMARY_ENCODING, DecodeOptions,
};
use snapshot_merge::preview::{self, DEFAULT_PREVIEW_ROWS};
use snapshot_merge::reconcile::{DEFAULT_PRIMARY_KEY, DEFAULT_SECONDARY_KEY};
use snapshot_merge::sync::{self, KeySelection, MergeRequest, OutputFormat};
use snapshot_merge::{KeyPolicy, NullKeyPolicy, Result, Table, ToolError};
use tracing_subscriber::EnvFilter;

fn main() {
    let cli = Cli::parse();
    if let Err(error) = init_logging().and_then(|()| run(cli)) {
        eprintln!("error: {error}");
        std::process::exit(1);
    }
}

fn init_logging() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|error| ToolError::Logging(error.to_string()))
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Merge(args) => execute_merge(args),
        Command::Preview(args) => execute_preview(args),
    }
}

fn execute_merge(args: MergeArgs) -> Result<()> {
    for input in [&args.old, &args.new] {
        if !input.exists() {
            return Err(ToolError::MissingInput(input.clone()));
        }
    }

    let request = args.to_request();
    let outcome = sync::merge_files(&request)?;
    let summary = &outcome.summary;
    println!(
        "merged {} old + {} new rows into {} rows ({} superseded) keyed on {:?}",
        summary.old_rows,
        summary.new_rows,
        summary.output_rows,
        summary.superseded_rows,
        summary.key_columns
    );

    if let Some(rows) = args.preview {
        print_preview(&outcome.table, rows, args.preview_format)?;
    }
    Ok(())
}

fn execute_preview(args: PreviewArgs) -> Result<()> {
    if !args.input.exists() {
        return Err(ToolError::MissingInput(args.input));
    }
    let table = sync::load_snapshot(&args.input, &args.encodings.to_options())?;
    print_preview(&table, args.rows, args.preview_format)
}

fn print_preview(table: &Table, rows: usize, format: PreviewFormat) -> Result<()> {
    match format {
        PreviewFormat::Text => print!("{}", preview::render_text(table, rows)),
        PreviewFormat::Json => println!("{}", preview::render_json(table, rows)?),
    }
    Ok(())
}

#[derive(Parser)]
#[command(
    author,
    version,
    about = "Merge a new CSV export over an old one, replacing rows that share a key."
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Merge the new snapshot over the old snapshot.
    Merge(MergeArgs),
    /// Show the first rows of a CSV file.
    Preview(PreviewArgs),
}

#[derive(clap::Args)]
struct MergeArgs {
    /// Old snapshot (CSV).
    #[arg(long)]
    old: PathBuf,

    /// New snapshot (CSV). Its rows win over old rows with the same key.
    #[arg(long)]
    new: PathBuf,

    /// Merged output file path.
    #[arg(long)]
    output: PathBuf,

    /// Primary key column.
    #[arg(long, default_value = DEFAULT_PRIMARY_KEY)]
    primary_key: String,

    /// Secondary key column, used only when the old snapshot has it.
    #[arg(long, default_value = DEFAULT_SECONDARY_KEY, conflicts_with = "no_secondary")]
    secondary_key: String,

    /// Key on the primary column alone.
    #[arg(long)]
    no_secondary: bool,

    /// Explicit key column; repeat for composite keys. Overrides the
    /// primary/secondary policy.
    #[arg(long = "key", value_name = "COLUMN")]
    keys: Vec<String>,

    /// How empty key cells are matched.
    #[arg(long, value_enum, default_value_t = NullKeysArg::Match)]
    null_keys: NullKeysArg,

    #[command(flatten)]
    encodings: EncodingArgs,

    /// Output serialisation. Inferred from the output extension when omitted.
    #[arg(long, value_enum)]
    format: Option<FormatArg>,

    /// Print the first N merged rows.
    #[arg(long, value_name = "N")]
    preview: Option<usize>,

    #[arg(long, value_enum, default_value_t = PreviewFormat::Text)]
    preview_format: PreviewFormat,

    /// Write a JSON summary of the merge to this path.
    #[arg(long)]
    summary: Option<PathBuf>,
}

impl MergeArgs {
    fn to_request(&self) -> MergeRequest {
        let keys = if self.keys.is_empty() {
            let secondary = (!self.no_secondary).then(|| self.secondary_key.clone());
            KeySelection::Policy(KeyPolicy::new(self.primary_key.clone(), secondary))
        } else {
            KeySelection::Explicit(self.keys.clone())
        };

        MergeRequest {
            keys,
            null_keys: self.null_keys.into(),
            decode: self.encodings.to_options(),
            format: self.format.map(OutputFormat::from),
            summary: self.summary.clone(),
            ..MergeRequest::new(&self.old, &self.new, &self.output)
        }
    }
}

#[derive(clap::Args)]
struct PreviewArgs {
    /// CSV file to preview.
    #[arg(long)]
    input: PathBuf,

    /// Number of rows to show.
    #[arg(long, default_value_t = DEFAULT_PREVIEW_ROWS)]
    rows: usize,

    #[arg(long, value_enum, default_value_t = PreviewFormat::Text)]
    preview_format: PreviewFormat,

    #[command(flatten)]
    encodings: EncodingArgs,
}

#[derive(clap::Args)]
struct EncodingArgs {
    /// Encoding tried first when decoding input files.
    #[arg(long, default_value = DEFAULT_PRIMARY_ENCODING)]
    encoding: String,

    /// Encoding tried once when the primary one fails.
    #[arg(long, default_value = DEFAULT_FALLBACK_ENCODING)]
    fallback_encoding: String,
}

impl EncodingArgs {
    fn to_options(&self) -> DecodeOptions {
        DecodeOptions {
            primary: self.encoding.clone(),
            fallback: self.fallback_encoding.clone(),
        }
    }
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum NullKeysArg {
    Match,
    NeverMatch,
}

impl From<NullKeysArg> for NullKeyPolicy {
    fn from(arg: NullKeysArg) -> Self {
        match arg {
            NullKeysArg::Match => NullKeyPolicy::Match,
            NullKeysArg::NeverMatch => NullKeyPolicy::NeverMatch,
        }
    }
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum FormatArg {
    Csv,
    Xlsx,
}

impl From<FormatArg> for OutputFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Csv => OutputFormat::Csv,
            FormatArg::Xlsx => OutputFormat::Xlsx,
        }
    }
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum PreviewFormat {
    Text,
    Json,
}
