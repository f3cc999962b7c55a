#[tokio::main]
pub async fn main() -> Result<(), anyhow::Error> {
    balance_history::start_server().await?;
    Ok(())
}
