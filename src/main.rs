#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Err(e) = deadline_mate_rust::run().await {
        eprintln!("deadline-mate fatal: {e:#}");
        std::process::exit(1);
    }
    Ok(())
}
