//! Modular wallet CLI
//!
//! Resolves a Circle smart account for a local key, sends user operations
//! through the Circle bundler and polls their receipts.

use std::sync::Arc;

use alloy_primitives::{Address, B256, Bytes};
use anyhow::{Context, anyhow};
use clap::{Parser, Subcommand};
use mw_accounts::{CircleSmartAccount, LocalOwner, SmartAccount};
use mw_core::{
    Call, Chain,
    logger::{LogFormat, init_logger_with_format},
    units::{format_ether, parse_ether},
};
use mw_rpc::{Paymaster, Transport, WaitForReceiptConfig, to_modular_transport};
use mw_userop::{SmartAccountClient, UserOperationRequest};
use tracing::info;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Config {
    /// Circle modular wallets endpoint, without the chain segment
    #[arg(
        long,
        env = "MW_CLIENT_URL",
        default_value = "https://modular-sdk.circle.com/v1/rpc/w3s/buidl"
    )]
    client_url: String,

    /// Client key from the Circle developer console
    #[arg(long, env = "MW_CLIENT_KEY", hide_env_values = true)]
    client_key: String,

    /// Chain name as used in the endpoint path, e.g. polygonAmoy
    #[arg(long, env = "MW_CHAIN", default_value = "polygonAmoy")]
    chain: String,

    /// Hex private key of the account owner
    #[arg(long, env = "MW_PRIVATE_KEY", hide_env_values = true)]
    private_key: String,

    #[arg(long, env = "MW_LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// full, compact or json
    #[arg(long, env = "MW_LOG_FORMAT", default_value = "full")]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the smart account address and whether it is deployed
    Address,
    /// Send a single call as a user operation
    Send {
        #[arg(long)]
        to: Address,
        /// Amount in ether
        #[arg(long, default_value = "0")]
        value: String,
        #[arg(long, default_value = "0x")]
        data: Bytes,
        /// Ask the bundler's paymaster to sponsor gas
        #[arg(long)]
        sponsored: bool,
        /// Return after submission instead of waiting for the receipt
        #[arg(long)]
        no_wait: bool,
    },
    /// Wait for the receipt of a submitted user operation
    Receipt { hash: B256 },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = Config::parse();
    init_logger_with_format(&config.log_level, config.log_format);

    let chain = Chain::from_name(&config.chain)
        .ok_or_else(|| anyhow!("unknown chain '{}'", config.chain))?;
    let endpoint = format!("{}/{}", config.client_url.trim_end_matches('/'), chain.name);
    info!(message = "Starting modular wallet client", chain = %chain.name, chain_id = chain.id);

    let transport: Arc<dyn Transport> = Arc::new(
        to_modular_transport(&endpoint, &config.client_key)
            .context("failed to build modular wallets transport")?,
    );
    let owner = Arc::new(
        LocalOwner::from_private_key(&config.private_key).context("invalid private key")?,
    );
    let account = Arc::new(CircleSmartAccount::new(Arc::clone(&transport), owner, chain.id));
    let client = SmartAccountClient::from_transport(account, transport);

    match config.command {
        Command::Address => {
            let account = client.account();
            println!("address:  {}", account.address().await?);
            println!("deployed: {}", account.is_deployed().await?);
        }
        Command::Send { to, value, data, sponsored, no_wait } => {
            let value = parse_ether(&value)?;
            let client =
                if sponsored { client.with_paymaster(Paymaster::sponsored()) } else { client };
            let request = UserOperationRequest::new(vec![Call { to, value, data }]);
            let hash = client.send_user_operation(request).await?;
            println!("user operation: {hash}");
            if !no_wait {
                print_receipt(&client, hash).await?;
            }
        }
        Command::Receipt { hash } => print_receipt(&client, hash).await?,
    }

    Ok(())
}

async fn print_receipt(client: &SmartAccountClient, hash: B256) -> anyhow::Result<()> {
    let receipt =
        client.wait_for_user_operation_receipt(hash, &WaitForReceiptConfig::default()).await?;
    println!("transaction:    {}", receipt.receipt.transaction_hash);
    println!("block:          {}", receipt.receipt.block_number);
    println!("success:        {}", receipt.success);
    println!("actual gas:     {}", receipt.actual_gas_used);
    println!("actual cost:    {} ETH", format_ether(receipt.actual_gas_cost));
    if let Some(reason) = receipt.reason {
        println!("revert reason:  {reason}");
    }
    Ok(())
}
