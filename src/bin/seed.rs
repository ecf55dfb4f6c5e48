use clap::Parser;

/// Populates the table API with a demo IntelliHire dataset.
#[derive(Debug, Parser)]
#[command(name = "seed", version)]
struct Args {
    /// Generate the dataset and print the planned row counts without writing.
    #[arg(long)]
    dry_run: bool,

    /// Delete existing rows from every seeded table before inserting.
    #[arg(long, conflicts_with = "dry_run")]
    reset: bool,

    /// Enable debug logging.
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    if let Err(e) = intellihire_rust::run_seed(args.dry_run, args.reset, args.verbose).await {
        eprintln!("intellihire-seed fatal: {e:#}");
        std::process::exit(1);
    }
    Ok(())
}
