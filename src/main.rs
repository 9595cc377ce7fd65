use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};

use fuzzy_cleanse::config::{CriteriaFile, TermKind, add_field_spec};
use fuzzy_cleanse::data::export::{edited_file_name, preview, save_table};
use fuzzy_cleanse::data::filter::{Criteria, Threshold};
use fuzzy_cleanse::data::loader::load_file;
use fuzzy_cleanse::state::{COMBINED_OUTPUT, CombineMode, Session, SourceTable};

#[derive(Parser, Debug)]
#[command(
    name = "fuzzy-cleanse",
    version,
    about = "Join tabular files and keep the rows matching include/exclude keywords",
    long_about = "Load one or more CSV, Excel, JSON or Parquet files, combine them, and keep the rows whose fields match the given keywords. Exact terms compare the cell text; fuzzy terms accept cells whose partial similarity reaches the threshold.\n\nExamples:\n  fuzzy-cleanse customers.parquet orders.csv --include-fuzzy 'name=jon'\n  fuzzy-cleanse -m separate first.csv second.csv --exclude 'status=cancelled' -o out/\n  fuzzy-cleanse data.xlsx -c criteria.json -o cleaned.parquet"
)]
struct Cli {
    /// Input files (.csv, .xls, .xlsx, .xlsm, .xlsb, .json, .parquet)
    #[arg(value_name = "FILES", required = true)]
    files: Vec<PathBuf>,

    /// How several inputs are combined
    #[arg(short, long, value_enum, default_value_t = Mode::Join)]
    mode: Mode,

    /// Keep rows whose FIELD equals one of the comma-separated TERMS
    #[arg(long, value_name = "FIELD=TERMS")]
    include: Vec<String>,

    /// Keep rows whose FIELD is similar to one of the TERMS
    #[arg(long, value_name = "FIELD=TERMS")]
    include_fuzzy: Vec<String>,

    /// Drop rows whose FIELD equals one of the TERMS
    #[arg(long, value_name = "FIELD=TERMS")]
    exclude: Vec<String>,

    /// Drop rows whose FIELD is similar to any of the TERMS
    #[arg(long, value_name = "FIELD=TERMS")]
    exclude_fuzzy: Vec<String>,

    /// Fuzzy threshold (0-100) for fields given on the command line
    #[arg(
        short,
        long,
        default_value_t = Threshold::DEFAULT.get(),
        value_parser = clap::value_parser!(u8).range(0..=100)
    )]
    threshold: u8,

    /// JSON criteria file; command-line terms are added on top
    #[arg(short, long, value_name = "FILE")]
    criteria: Option<PathBuf>,

    /// Output file for join/concat (default cleaned_data.csv), or output
    /// directory for separate (default: current directory)
    #[arg(short, long, value_name = "PATH")]
    output: Option<PathBuf>,

    /// Print the first N result rows
    #[arg(long, value_name = "N", default_value_t = 0)]
    preview: usize,

    /// Log at debug level unless RUST_LOG says otherwise
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Mode {
    /// Outer-join all files on their shared columns
    Join,
    /// Filter each file on its own into <name>-edited.csv
    Separate,
    /// Filter each file and stack the results
    Concat,
}

impl From<Mode> for CombineMode {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::Join => CombineMode::Join,
            Mode::Separate => CombineMode::Separate,
            Mode::Concat => CombineMode::Concat,
        }
    }
}

fn build_criteria(cli: &Cli) -> Result<Criteria> {
    let mut criteria = match &cli.criteria {
        Some(path) => CriteriaFile::load(path)?.into_criteria(),
        None => Criteria::new(),
    };

    let threshold = Threshold::new(cli.threshold)?;
    let specs = [
        (TermKind::IncludeExact, &cli.include),
        (TermKind::IncludeFuzzy, &cli.include_fuzzy),
        (TermKind::ExcludeExact, &cli.exclude),
        (TermKind::ExcludeFuzzy, &cli.exclude_fuzzy),
    ];
    for (kind, values) in specs {
        for spec in values {
            add_field_spec(&mut criteria, kind, spec, threshold)?;
        }
    }
    Ok(criteria)
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();

    let mut session = Session::new(cli.mode.into());
    for path in &cli.files {
        let table = load_file(path)?;
        session.add_table(SourceTable::from_path(path, table));
    }
    log::debug!("available fields: {:?}", session.all_columns());

    session.set_criteria(build_criteria(&cli)?);
    let outputs = session.run()?;

    for (i, out) in outputs.iter().enumerate() {
        let path = match cli.mode {
            Mode::Separate => {
                let dir = cli.output.clone().unwrap_or_else(|| PathBuf::from("."));
                std::fs::create_dir_all(&dir)
                    .with_context(|| format!("creating {}", dir.display()))?;
                dir.join(edited_file_name(&cli.files[i]))
            }
            Mode::Join | Mode::Concat => cli
                .output
                .clone()
                .unwrap_or_else(|| PathBuf::from(format!("{COMBINED_OUTPUT}.csv"))),
        };

        if cli.preview > 0 {
            println!("{} ({} rows)", out.name, out.table.row_count());
            println!("{}", preview(&out.table, cli.preview)?);
        }
        save_table(&out.table, &path)?;
    }

    Ok(())
}
