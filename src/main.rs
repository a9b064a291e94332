#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Err(e) = procter_rust::run().await {
        eprintln!("procter-rust fatal: {e:#}");
        std::process::exit(1);
    }
    Ok(())
}
