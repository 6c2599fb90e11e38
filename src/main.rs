use anyhow::Result;

#[tokio::main]
async fn main() -> Result<()> {
    smol_cli::run().await
}
