use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use shelf::config::DEFAULT_STORE_DIR;
use shelf::keyspace::KeyspaceStore;
use shelf::load::{self, LoadConfig, LoadReport, PhaseReport};
use shelf::store::MemoryStore;
use std::fs;
use std::path::Path;
use std::process::ExitCode;
use tracing::{error, info, Level};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[derive(Parser)]
#[command(name = "shelf")]
#[command(about = "Load Open Library author and work dumps into a key-value store")]
struct Cli {
    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load the authors dump, then the works dump
    Load(LoadArgs),
}

#[derive(Args)]
struct LoadArgs {
    /// Path to the authors dump (.txt or .txt.bz2)
    #[arg(short, long, env = "SHELF_AUTHORS_DUMP")]
    authors: String,

    /// Path to the works dump (.txt or .txt.bz2)
    #[arg(short, long, env = "SHELF_WORKS_DUMP")]
    works: String,

    /// Store directory
    #[arg(short, long, env = "SHELF_STORE_DIR", default_value = DEFAULT_STORE_DIR)]
    store: String,

    /// Worker threads per phase
    #[arg(long, default_value_t = load::default_workers())]
    workers: usize,

    /// Limit number of lines read from each dump (for testing)
    #[arg(long)]
    limit: Option<u64>,

    /// Dry run - keep records in memory, don't touch the store directory
    #[arg(long)]
    dry_run: bool,

    /// Remove the existing store directory before loading
    #[arg(long)]
    clean: bool,
}

fn run_load(args: LoadArgs) -> Result<()> {
    let config = LoadConfig {
        authors_path: args.authors,
        works_path: args.works,
        workers: args.workers,
        limit: args.limit,
    };

    let report = if args.dry_run {
        info!("Dry run, nothing will be written");
        load::run_load(&config, &MemoryStore::new())?
    } else {
        if args.clean {
            let store_path = Path::new(&args.store);
            if store_path.exists() {
                info!("Cleaning store directory: {}", args.store);
                fs::remove_dir_all(store_path)
                    .with_context(|| format!("Failed to clean store directory: {}", args.store))?;
            }
        }

        let store = KeyspaceStore::open(&args.store)?;
        load::run_load(&config, &store)?
    };

    print_summary(&report);
    Ok(())
}

fn print_summary(report: &LoadReport) {
    println!();
    println!("=== Summary ===");
    println!(
        "Authors time:       {:.2}s",
        report.authors.duration.as_secs_f64()
    );
    println!(
        "Works time:         {:.2}s",
        report.works.duration.as_secs_f64()
    );
    println!(
        "Total time:         {:.2}s",
        (report.authors.duration + report.works.duration).as_secs_f64()
    );

    print_phase("Authors", &report.authors);
    print_phase("Works", &report.works);
    println!("Works w/o authors:  {}", report.works.stats.skipped());
    println!("Unknown authors:    {}", report.works.stats.unknown());
    println!("Author lookups:     {}", report.works.stats.lookups());

    println!();
    println!("Authors stored:     {}", report.counts.authors);
    println!("Books stored:       {}", report.counts.books);
}

fn print_phase(label: &str, phase: &PhaseReport) {
    println!();
    println!("{label} lines read:  {}", phase.stats.lines());
    println!("{label} upserted:    {}", phase.stats.upserted());
    println!("{label} bad lines:   {}", phase.stats.parse_failed());
    println!("{label} store errs:  {}", phase.stats.store_failed());
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::from_level(level).into())
        .from_env_lossy();

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("Failed to set tracing subscriber");

    let result = match cli.command {
        Commands::Load(args) => run_load(args),
    };

    match result {
        Ok(()) => {
            info!("Completed successfully");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("Error: {:#}", e);
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}
