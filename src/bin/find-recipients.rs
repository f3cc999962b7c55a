use std::path::PathBuf;

use anyhow::{Context, Result};
use balance_history::{
    explorer::{Explorer, ExplorerHttp},
    log,
    transactions::{normalize_transfer, Direction},
    units::WeiNewtype,
};
use clap::Parser;
use tracing::info;

/// Lists everyone a payer sent exactly a given amount to, one address per line.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Address whose outgoing transfers are searched.
    #[arg(long)]
    payer: String,
    /// Native token amount, decimals allowed.
    #[arg(long, default_value = "545")]
    amount: String,
    #[arg(long, default_value = "employees.txt")]
    out: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    log::init();

    let args = Args::parse();
    let amount = WeiNewtype::parse_eth_str(&args.amount)
        .with_context(|| format!("invalid amount {}", args.amount))?;

    let explorer = ExplorerHttp::new();
    let transactions = explorer
        .get_transactions(&args.payer)
        .await
        .context("failed to fetch payer transactions")?;
    let outgoing: Vec<_> = transactions
        .iter()
        .filter_map(|transaction| {
            normalize_transfer(&args.payer, transaction)
                .filter(|transfer| transfer.direction == Direction::Out)
                .map(|transfer| (transaction, transfer))
        })
        .collect();

    let recipients: Vec<&str> = outgoing
        .iter()
        .filter(|(_, transfer)| transfer.value == -amount)
        .filter_map(|(transaction, _)| transaction.to.as_deref())
        .collect();

    info!(
        transactions = transactions.len(),
        outgoing = outgoing.len(),
        matching = recipients.len(),
        amount = %amount.format_eth(),
        "filtered payer transfers"
    );

    for (index, recipient) in recipients.iter().enumerate() {
        println!("#{}: {recipient}", index + 1);
    }

    tokio::fs::write(&args.out, recipients.join("\n"))
        .await
        .with_context(|| format!("failed to write {}", args.out.display()))?;
    info!(path = %args.out.display(), "wrote recipients");

    Ok(())
}
