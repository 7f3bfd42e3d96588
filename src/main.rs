use clap::Parser;
use sqlx::migrate::Migrator;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;

use cafetal_core::cli::{Cli, Commands, DbCommands, TxCommands};
use cafetal_core::config::Config;
use cafetal_core::ledger::XrplClient;
use cafetal_core::rates::RateTable;
use cafetal_core::services::SettlementCoordinator;
use cafetal_core::store::PgSettlementStore;
use cafetal_core::{cli, db, handlers};

/// OpenAPI schema for the Cafetal Core API
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::health,
        handlers::settlements::list_settlements,
        handlers::settlements::get_settlement,
        handlers::settlements::get_settlement_messages,
        handlers::settlements::submit_settlement,
    ),
    components(
        schemas(
            handlers::HealthStatus,
            handlers::settlements::SettlementListResponse,
            handlers::settlements::SettlementDetailResponse,
            handlers::settlements::SubmitSettlementBody,
            handlers::settlements::SubmitSettlementResponse,
            cafetal_core::domain::Settlement,
            cafetal_core::domain::SettlementStatus,
            cafetal_core::domain::Delivery,
            cafetal_core::domain::IsoMessage,
            cafetal_core::domain::MessageKind,
            cafetal_core::domain::PartyRef,
        )
    ),
    info(
        title = "Cafetal Core API",
        version = "0.1.0",
        description = "Coffee delivery settlement over the XRP Ledger with ISO 20022 records",
        contact(name = "Cafetal Team")
    ),
    tags(
        (name = "Health", description = "Health check endpoints"),
        (name = "Settlements", description = "Settlement submission and lookup"),
    )
)]
pub struct ApiDoc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config_info = Config::from_env()?;
    let config = config_info.config;

    // Setup logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!(
        profile = config_info.profile.as_str(),
        overrides = ?config_info.overrides,
        "configuration loaded"
    );

    let cli_args = Cli::parse();
    match cli_args.command.unwrap_or(Commands::Serve) {
        Commands::Serve => serve(config).await,
        Commands::Db(DbCommands::Migrate) => cli::handle_db_migrate(&config).await,
        Commands::Config => cli::handle_config_validate(&config),
        Commands::Tx(TxCommands::Verify { tx_hash }) => {
            cli::handle_tx_verify(&config, &tx_hash).await
        }
        Commands::Tx(TxCommands::Balance { account }) => {
            cli::handle_tx_balance(&config, &account).await
        }
        Commands::Tx(TxCommands::CheckReference { account, uetr }) => {
            cli::handle_tx_check_reference(&config, &account, &uetr).await
        }
    }
}

async fn serve(config: Config) -> anyhow::Result<()> {
    // Database pool
    let pool = db::create_pool(&config).await?;

    // Run migrations
    let migrator = Migrator::new(Path::new("./migrations")).await?;
    migrator.run(&pool).await?;
    tracing::info!("Database migrations completed");

    let store = Arc::new(PgSettlementStore::new(pool.clone()));
    let ledger = Arc::new(XrplClient::new(config.xrpl_rpc_url.clone()));
    let coordinator = Arc::new(SettlementCoordinator::new(
        store.clone(),
        ledger,
        RateTable::mock(),
        Duration::from_secs(config.submit_timeout_secs),
    ));

    let app_state = cafetal_core::AppState {
        db: pool,
        store,
        coordinator,
        start_time: std::time::Instant::now(),
    };

    let app = cafetal_core::create_app(app_state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server_port));
    tracing::info!("listening on {}", addr);

    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
