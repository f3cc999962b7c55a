use anyhow::{Context, Result};
use balance_history::{
    addresses, balances::live_balances, env::ENV_CONFIG, explorer::ExplorerHttp, log,
};
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    log::init();

    let addresses = addresses::read_addresses(&ENV_CONFIG.wallets_path)
        .await
        .with_context(|| {
            format!(
                "failed to read address list {}",
                ENV_CONFIG.wallets_path.display()
            )
        })?;
    info!(count = addresses.len(), "read addresses");

    let explorer = ExplorerHttp::new();
    let live_balances = live_balances(&explorer, &addresses).await;

    for address in &addresses {
        println!("address: {address}");
        match live_balances.get(address) {
            Some(balance) => {
                println!("balance (wei): {balance}");
                println!("balance: {}", balance.format_eth());
            }
            None => println!("not found in explorer response"),
        }
        println!("---");
    }

    info!(
        found = live_balances.len(),
        missing = addresses.len().saturating_sub(live_balances.len()),
        "checked balances"
    );

    Ok(())
}
