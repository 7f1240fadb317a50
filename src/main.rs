//! scopusapi - command-line front end for the Scopus search and retrieval APIs.
//!
//! ```bash
//! scopusapi search --issn 0028-0836 --start-year 2019 --csv nature.csv --snapshot nature.json
//! scopusapi retrieve --input ids.csv --column eid --kind eid --csv abstracts.csv
//! scopusapi show nature.json
//! ```

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use scopusapi::{
    Client, IdentifierKind, PaginationOutcome, SearchCriteria, Table, read_identifiers,
};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::Level;
use tracing_subscriber::{EnvFilter, fmt};

/// Search and retrieve Scopus records
#[derive(Parser)]
#[command(name = "scopusapi")]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct GlobalArgs {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,

    /// API base URL (overrides SCOPUS_API_URL and .scopusrc)
    #[arg(long, global = true)]
    url: Option<String>,

    /// API key (overrides SCOPUS_API_KEY and .scopusrc)
    #[arg(long, global = true)]
    key: Option<String>,

    /// Skip TLS certificate verification
    #[arg(long, global = true)]
    insecure: bool,

    /// Pause before each API call, in milliseconds
    #[arg(long, global = true, default_value_t = 200)]
    delay_ms: u64,

    /// Hide progress bars
    #[arg(long, global = true)]
    no_progress: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run an advanced search and collect every page of results
    Search {
        #[command(flatten)]
        criteria: CriteriaArgs,

        /// Raw advanced-search query; the field options are ignored when set
        #[arg(long)]
        query: Option<String>,

        #[command(flatten)]
        output: OutputArgs,
    },
    /// Retrieve abstract records by identifier
    Retrieve {
        /// Identifiers to retrieve
        ids: Vec<String>,

        /// Delimited file with one identifier per row
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Column of the input file holding the identifiers (default: first column)
        #[arg(long, requires = "input")]
        column: Option<String>,

        /// Identifier kind: scopus_id, eid, doi, pii or pubmed_id
        #[arg(long, default_value = "scopus_id")]
        kind: IdentifierKind,

        #[command(flatten)]
        output: OutputArgs,
    },
    /// Summarise a saved snapshot, optionally exporting it as CSV
    Show {
        /// Snapshot written by --snapshot
        snapshot: PathBuf,

        /// Export the snapshot as CSV
        #[arg(long)]
        csv: Option<PathBuf>,

        /// Number of rows to print
        #[arg(short = 'n', long, default_value_t = 5)]
        rows: usize,
    },
}

#[derive(Args)]
struct CriteriaArgs {
    #[arg(long, default_value = "")]
    issn: String,
    /// Author name
    #[arg(long, default_value = "")]
    author: String,
    #[arg(long, default_value = "")]
    keyword: String,
    #[arg(long, default_value = "")]
    publisher: String,
    /// Exact source (journal) title
    #[arg(long, default_value = "")]
    exact_source_title: String,
    #[arg(long, default_value = "")]
    affiliation: String,
    #[arg(long, default_value = "")]
    title: String,
    /// Only open-access documents
    #[arg(long)]
    open_access: bool,
    /// Published after this year
    #[arg(long, default_value_t = 0)]
    start_year: u32,
    /// Published before this year
    #[arg(long, default_value_t = 0)]
    end_year: u32,
}

impl From<CriteriaArgs> for SearchCriteria {
    fn from(a: CriteriaArgs) -> Self {
        SearchCriteria::new()
            .issn(a.issn)
            .author(a.author)
            .keyword(a.keyword)
            .publisher(a.publisher)
            .exact_source_title(a.exact_source_title)
            .affiliation(a.affiliation)
            .title(a.title)
            .open_access(a.open_access)
            .start_year(a.start_year)
            .end_year(a.end_year)
    }
}

#[derive(Args)]
struct OutputArgs {
    /// Write the flattened records as CSV
    #[arg(long)]
    csv: Option<PathBuf>,

    /// Save a snapshot of the table for later reuse
    #[arg(long)]
    snapshot: Option<PathBuf>,
}

impl OutputArgs {
    fn write(&self, table: &Table) -> Result<()> {
        if let Some(path) = &self.csv {
            table.write_csv(path)?;
            println!("Saved: {}", path.display());
        }
        if let Some(path) = &self.snapshot {
            table.save(path)?;
            println!("Saved: {}", path.display());
        }
        Ok(())
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.global.debug);

    match cli.command {
        Commands::Search {
            criteria,
            query,
            output,
        } => {
            let client = client(&cli.global)?;
            let outcome = match query {
                Some(q) => client.search_query(&q)?,
                None => client.search(&SearchCriteria::from(criteria))?,
            };

            if let PaginationOutcome::QuotaExceeded { results, remaining } = &outcome {
                eprintln!(
                    "Warning: {} results but only {} API calls left{}; kept {} record(s)",
                    results.total_results,
                    remaining,
                    results
                        .rate
                        .reset_at()
                        .map(|t| format!(" (quota resets {})", t.to_rfc3339()))
                        .unwrap_or_default(),
                    results.records.len()
                );
            }

            let results = outcome.into_results();
            println!(
                "Collected {} of {} record(s) in {} page(s)",
                results.records.len(),
                results.total_results,
                results.pages
            );
            output.write(&Table::from_records(&results.records))?;
        }
        Commands::Retrieve {
            mut ids,
            input,
            column,
            kind,
            output,
        } => {
            if let Some(path) = &input {
                ids.extend(read_identifiers(path, column.as_deref())?);
            }
            if ids.is_empty() {
                bail!("no identifiers given: pass them as arguments or with --input");
            }

            let client = client(&cli.global)?;
            let records: Vec<_> = client
                .retrieve_many(kind, &ids)?
                .iter()
                .map(|r| r.to_record())
                .collect();
            println!("Retrieved {} record(s)", records.len());
            output.write(&Table::from_records(&records))?;
        }
        Commands::Show {
            snapshot,
            csv,
            rows,
        } => show(&snapshot, csv.as_deref(), rows)?,
    }

    Ok(())
}

fn client(opts: &GlobalArgs) -> Result<Client> {
    let verify = if opts.insecure { Some(false) } else { None };
    let client = Client::new(opts.url.clone(), opts.key.clone(), verify)
        .context("failed to configure the Scopus client")?;
    Ok(client
        .with_delay(Duration::from_millis(opts.delay_ms))
        .with_progress(!opts.no_progress))
}

fn show(snapshot: &Path, csv: Option<&Path>, rows: usize) -> Result<()> {
    let table = Table::load(snapshot)?;
    println!(
        "{}: {} row(s), {} column(s)",
        snapshot.display(),
        table.len(),
        table.columns.len()
    );

    let preview: Vec<&str> = ["dc:identifier", "dc:title", "prism:publicationName", "prism:coverDate"]
        .into_iter()
        .filter(|c| table.columns.iter().any(|t| t.as_str() == *c))
        .collect();
    let preview = if preview.is_empty() {
        table.columns.iter().take(3).map(String::as_str).collect()
    } else {
        preview
    };

    if !preview.is_empty() {
        let cols: Vec<Vec<Option<&str>>> = preview
            .iter()
            .filter_map(|c| table.column(c))
            .collect();
        println!("{}", preview.join(" | "));
        for i in 0..rows.min(table.len()) {
            let line: Vec<&str> = cols.iter().map(|c| c[i].unwrap_or("")).collect();
            println!("{}", line.join(" | "));
        }
    }

    if let Some(path) = csv {
        table.write_csv(path)?;
        println!("Saved: {}", path.display());
    }
    Ok(())
}

fn init_tracing(debug: bool) {
    let log_level = if debug { Level::DEBUG } else { Level::WARN };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level.to_string()));

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}
