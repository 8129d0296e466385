fn parse_count(args: &[String], flag: &str, default: u32) -> u32 {
    args.iter()
        .position(|arg| arg == flag)
        .and_then(|pos| args.get(pos + 1))
        .and_then(|value| value.parse().ok())
        .unwrap_or(default)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args: Vec<String> = std::env::args().collect();
    let teachers = parse_count(&args, "--teachers", 5);
    let students = parse_count(&args, "--students", 10);

    if let Err(e) = deadline_mate_rust::run_seed(teachers, students).await {
        eprintln!("deadline-mate seed fatal: {e:#}");
        std::process::exit(1);
    }
    Ok(())
}
