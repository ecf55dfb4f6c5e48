#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Err(e) = intellihire_rust::run_worker().await {
        eprintln!("intellihire-worker fatal: {e:#}");
        std::process::exit(1);
    }
    Ok(())
}
