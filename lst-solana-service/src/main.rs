use anyhow::Result;

#[tokio::main]
async fn main() -> Result<()> {
    lst_solana_service::run().await?;
    Ok(())
}
