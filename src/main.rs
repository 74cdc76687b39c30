use clap::{Parser as ClapParser, Subcommand};
use noteql::cli::{self, CheckOptions, CliError, RenderOptions, RunOptions};
use noteql::output::to_json_pretty;
use std::io::{self, Read};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(ClapParser)]
#[command(name = "noteql")]
#[command(about = "noteql - Query markdown notes with TABLE, LIST and TASK blocks")]
#[command(version)]
struct Cli {
    /// Engine config file (JSON)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a query and print it in canonical form
    Check {
        /// The query to validate
        query: String,

        /// Also check that called functions exist
        #[arg(long)]
        functions: bool,
    },

    /// Execute one query against a notes file
    Run {
        /// The query to execute
        query: String,

        /// JSON array of notes
        #[arg(short, long)]
        notes: PathBuf,

        /// Print the structured result as JSON instead of markdown
        #[arg(long)]
        json: bool,
    },

    /// Run every query block of a markdown document and append the results
    Render {
        /// Markdown document (reads from stdin if not provided)
        document: Option<PathBuf>,

        /// JSON array of notes
        #[arg(short, long)]
        notes: PathBuf,

        /// Print one summary line per block to stderr
        #[arg(long)]
        summary: bool,

        /// Print the per-block report as JSON instead of the rendered document
        #[arg(long)]
        json: bool,
    },
}

fn main() {
    let filter = EnvFilter::try_from_env("NOTEQL_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Check { query, functions } => run_check(query, functions),
        Commands::Run { query, notes, json } => run_query(cli.config, query, notes, json),
        Commands::Render {
            document,
            notes,
            summary,
            json,
        } => run_render(cli.config, document, notes, summary, json),
    };

    if let Err(e) = result {
        eprintln!("{}", e);
        std::process::exit(1);
    }
}

fn run_check(query: String, functions: bool) -> Result<(), CliError> {
    let checked = cli::execute_check(&CheckOptions { query, functions })?;
    println!("{}", checked.canonical);
    Ok(())
}

fn run_query(
    config: Option<PathBuf>,
    query: String,
    notes: PathBuf,
    json: bool,
) -> Result<(), CliError> {
    let options = RunOptions {
        query,
        config: cli::load_config(config.as_deref())?,
    };
    let notes = cli::load_notes(&notes)?;

    let output = cli::execute_run(&options, &notes)?;
    if json {
        println!("{}", to_json_pretty(&output.report));
    } else {
        println!("{}", output.markdown);
    }
    Ok(())
}

fn run_render(
    config: Option<PathBuf>,
    document: Option<PathBuf>,
    notes: PathBuf,
    summary: bool,
    json: bool,
) -> Result<(), CliError> {
    let document = match document {
        Some(path) => cli::read_file(&path)?,
        None if !atty::is(atty::Stream::Stdin) => {
            let mut buffer = String::new();
            io::stdin().read_to_string(&mut buffer)?;
            buffer
        }
        None => return Err(CliError::NoInput),
    };

    let options = RenderOptions {
        document,
        config: cli::load_config(config.as_deref())?,
    };
    let notes = cli::load_notes(&notes)?;

    let report = cli::execute_render(&options, &notes)?;
    if summary {
        for block in &report.blocks {
            eprintln!("{}", block.summary().line());
        }
    }
    if json {
        println!("{}", to_json_pretty(&report.blocks));
    } else {
        println!("{}", report.rendered);
    }
    Ok(())
}
