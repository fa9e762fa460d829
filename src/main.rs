use anyhow::Result;
use booker::cli;

#[tokio::main]
async fn main() -> Result<()> {
    cli::run().await
}
