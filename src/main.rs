use dotenvy::dotenv;
use sea_orm::DatabaseConnection;
use shopfront::{
    app::Storefront,
    config::{
        catalog::load_catalog,
        database::{create_connection, create_tables},
        settings::Settings,
    },
    core::{
        handoff::LoggingHandoff, identity::LocalIdentityProvider, product::seed_products,
        storage::FileCartStorage,
    },
    errors::Result,
};
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

/// Inserts the seed catalog when the products collection is empty.
async fn seed_catalog(db: &DatabaseConnection, settings: &Settings) -> Result<()> {
    if !settings.catalog_path.exists() {
        warn!(path = ?settings.catalog_path, "No seed catalog found, skipping seeding");
        return Ok(());
    }
    let catalog = load_catalog(&settings.catalog_path)?;
    let inserted = seed_products(db, &catalog.products).await?;
    info!(inserted, "Seed catalog processed");
    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // 1. Initialize tracing (as early as possible)
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // 2. Load .env file; env vars can also be set externally
    dotenv().ok();

    // 3. Settings
    let settings = Settings::from_env()?;
    std::fs::create_dir_all(&settings.cart_storage_dir)
        .inspect_err(|e| error!("Failed to create cart storage directory: {e}"))?;

    // 4. Database
    let db = create_connection(&settings.database_url)
        .await
        .inspect_err(|e| error!("Failed to connect to database: {e}"))?;
    create_tables(&db)
        .await
        .inspect(|()| info!("Database initialized successfully."))
        .inspect_err(|e| error!("Failed to initialize database: {e}"))?;

    // 5. Seed products
    seed_catalog(&db, &settings)
        .await
        .inspect_err(|e| error!("Failed to seed catalog: {e}"))?;

    // 6. Wire the storefront and wait for shutdown
    let identity = Arc::new(LocalIdentityProvider::new(
        db.clone(),
        settings.admin_email.clone(),
    ));
    let cart_storage = Box::new(FileCartStorage::new(settings.cart_storage_dir.clone()));
    let store = Storefront::start(
        settings,
        db,
        identity,
        cart_storage,
        Arc::new(LoggingHandoff),
    )
    .await;

    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {e}");
    }
    store.shutdown();
    Ok(())
}
