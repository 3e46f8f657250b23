#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Err(e) = math_grader::run().await {
        eprintln!("math-grader fatal: {e:#}");
        std::process::exit(1);
    }
    Ok(())
}
