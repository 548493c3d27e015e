use clap::Parser;
use homefix::config::Config;
use homefix::domain::catalog::{NewService, default_services};
use homefix::domain::ports::{PaymentGatewayRef, Repositories};
use homefix::infrastructure::in_memory::InMemoryStore;
#[cfg(feature = "storage-rocksdb")]
use homefix::infrastructure::rocksdb::RocksDBStore;
use homefix::infrastructure::sandbox::SandboxGateway;
use homefix::infrastructure::sessions::SessionStore;
use homefix::infrastructure::stripe::{StripeGateway, WebhookVerifier};
use homefix::interfaces::csv::CatalogReader;
use homefix::interfaces::http::{AppState, router};
use miette::{IntoDiagnostic, Result, WrapErr};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn open_repositories(config: &Config) -> Result<Repositories> {
    match &config.db_path {
        #[cfg(feature = "storage-rocksdb")]
        Some(path) => {
            let store = RocksDBStore::open(path)
                .into_diagnostic()
                .wrap_err_with(|| format!("opening database at {}", path.display()))?;
            info!(path = %path.display(), "using RocksDB storage");
            Ok(Repositories::from_store(store))
        }
        #[cfg(not(feature = "storage-rocksdb"))]
        Some(path) => {
            warn!(
                path = %path.display(),
                "built without the storage-rocksdb feature, falling back to in-memory storage"
            );
            Ok(Repositories::from_store(InMemoryStore::default()))
        }
        None => Ok(Repositories::from_store(InMemoryStore::default())),
    }
}

fn load_catalog(config: &Config) -> Result<Vec<NewService>> {
    match &config.catalog {
        Some(path) => {
            let reader = CatalogReader::from_path(path)
                .into_diagnostic()
                .wrap_err_with(|| format!("reading catalog {}", path.display()))?;
            Ok(reader.valid_services())
        }
        None => Ok(default_services()),
    }
}

fn payment_gateway(config: &Config) -> Result<PaymentGatewayRef> {
    match &config.stripe_secret_key {
        Some(key) => {
            let gateway = StripeGateway::new(key.clone(), config.processor_timeout()).into_diagnostic()?;
            Ok(Arc::new(gateway))
        }
        None => {
            warn!("STRIPE_SECRET_KEY not set, using the in-process sandbox payment processor");
            Ok(Arc::new(SandboxGateway::new()))
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let config = Config::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,homefix=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let repos = open_repositories(&config)?;
    let services = load_catalog(&config)?;
    let gateway = payment_gateway(&config)?;

    let state = AppState::new(
        repos,
        SessionStore::new(config.session_ttl()),
        gateway,
        WebhookVerifier::new(config.webhook_secret.clone(), config.webhook_tolerance()),
        &config.currency,
    );

    // A persistent store keeps its catalog across restarts.
    if state.catalog.list_services().await.into_diagnostic()?.is_empty() {
        let seeded = state.catalog.seed(services).await.into_diagnostic()?;
        info!(services = seeded, "catalog seeded");
    }

    let addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .into_diagnostic()
        .wrap_err_with(|| format!("binding {addr}"))?;
    info!(%addr, "marketplace API listening");

    axum::serve(listener, router(state)).await.into_diagnostic()?;
    Ok(())
}
