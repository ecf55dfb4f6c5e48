#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Err(e) = intellihire_rust::run().await {
        eprintln!("intellihire-rust fatal: {e:#}");
        std::process::exit(1);
    }
    Ok(())
}
