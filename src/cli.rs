use clap::{Parser, Subcommand};
use std::sync::Arc;

use crate::config::Config;
use crate::ledger::{LedgerGateway, XrplClient};
use crate::services::{ReconciliationOutcome, ReconciliationService};
use crate::store::PgSettlementStore;

#[derive(Parser)]
#[command(name = "cafetal-core")]
#[command(about = "Cafetal Core - Coffee Delivery Settlement Pipeline", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the HTTP server (default)
    Serve,

    /// Ledger transaction commands
    #[command(subcommand)]
    Tx(TxCommands),

    /// Database management commands
    #[command(subcommand)]
    Db(DbCommands),

    /// Configuration validation
    Config,
}

#[derive(Subcommand)]
pub enum TxCommands {
    /// Confirm a transaction by hash against the ledger
    Verify {
        /// Transaction hash
        #[arg(value_name = "TX_HASH")]
        tx_hash: String,
    },

    /// Show an account's XRP balance on the validated ledger
    Balance {
        /// XRPL account address
        #[arg(value_name = "ACCOUNT")]
        account: String,
    },

    /// Resolve an unknown submission outcome by its UETR
    CheckReference {
        /// Operator account whose history carries the memo
        #[arg(value_name = "ACCOUNT")]
        account: String,

        /// The UETR embedded in the transfer memo
        #[arg(value_name = "UETR")]
        uetr: String,
    },
}

#[derive(Subcommand)]
pub enum DbCommands {
    /// Run database migrations
    Migrate,
}

pub async fn handle_db_migrate(config: &Config) -> anyhow::Result<()> {
    use sqlx::migrate::Migrator;
    use std::path::Path;

    let pool = crate::db::create_pool(config).await?;
    let migrator = Migrator::new(Path::new("./migrations")).await?;

    tracing::info!("Running database migrations...");
    migrator.run(&pool).await?;

    tracing::info!("Database migrations completed");
    println!("✓ Database migrations completed");

    Ok(())
}

pub fn handle_config_validate(config: &Config) -> anyhow::Result<()> {
    tracing::info!("Validating configuration...");

    println!("Configuration:");
    println!("  Server Port: {}", config.server_port);
    println!("  Database URL: {}", mask_password(&config.database_url));
    println!("  XRPL RPC URL: {}", config.xrpl_rpc_url);
    println!("  Submit Timeout: {}s", config.submit_timeout_secs);

    tracing::info!("Configuration is valid");
    println!("✓ Configuration is valid");

    Ok(())
}

fn mask_password(url: &str) -> String {
    if let Some(at_pos) = url.rfind('@') {
        if let Some(colon_pos) = url[..at_pos].rfind(':') {
            if let Some(slash_pos) = url[..colon_pos].rfind("//") {
                let prefix = &url[..slash_pos + 2];
                let user_start = slash_pos + 2;
                let user = &url[user_start..colon_pos];
                let suffix = &url[at_pos..];
                return format!("{}{}:****{}", prefix, user, suffix);
            }
        }
    }
    url.to_string()
}

pub async fn handle_tx_verify(config: &Config, tx_hash: &str) -> anyhow::Result<()> {
    let client = XrplClient::new(config.xrpl_rpc_url.clone());

    tracing::info!("Verifying transaction {}", tx_hash);
    let proof = client.verify_transaction(tx_hash).await?;

    if proof.validated {
        println!("✓ Transaction {} validated", tx_hash);
        if let Some(code) = &proof.result_code {
            println!("  Result: {}", code);
        }
        if let Some(index) = proof.ledger_index {
            println!("  Ledger index: {}", index);
        }
        println!("  Explorer: {}", client.explorer_url(tx_hash));
    } else {
        println!("Transaction {} not yet validated", tx_hash);
    }

    Ok(())
}

pub async fn handle_tx_balance(config: &Config, account: &str) -> anyhow::Result<()> {
    let client = XrplClient::new(config.xrpl_rpc_url.clone());
    let balance = client.get_balance(account).await?;
    println!("{} XRP", balance);
    Ok(())
}

pub async fn handle_tx_check_reference(
    config: &Config,
    account: &str,
    uetr: &str,
) -> anyhow::Result<()> {
    let pool = crate::db::create_pool(config).await?;
    let client = XrplClient::new(config.xrpl_rpc_url.clone());
    let service = ReconciliationService::new(
        Arc::new(client),
        Arc::new(PgSettlementStore::new(pool)),
    );

    tracing::info!("Checking reference {} for {}", uetr, account);
    match service.check_reference(account, uetr).await? {
        ReconciliationOutcome::SafeToRetry => {
            println!("✓ No ledger effect found for {}; retry is safe", uetr);
        }
        ReconciliationOutcome::AlreadyRecorded { tx_hash } => {
            println!("✓ Reference {} already recorded as {}", uetr, tx_hash);
        }
        ReconciliationOutcome::TransferFoundUnrecorded { tx_hash } => {
            println!(
                "⚠️  Validated transfer {} carries reference {} but no local record exists",
                tx_hash, uetr
            );
            println!("  Do NOT resubmit; reconcile manually.");
        }
    }

    Ok(())
}
