use crate::application::payments::DEFAULT_CURRENCY;
use crate::infrastructure::stripe::webhook::DEFAULT_TOLERANCE_SECS;
use chrono::Duration;
use clap::Parser;
use std::path::PathBuf;

/// Home-services marketplace API server.
///
/// Every option can also come from the environment (or a `.env` file).
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Config {
    /// Address to bind
    #[arg(long, env = "HOMEFIX_HOST", default_value = "0.0.0.0")]
    pub host: String,

    #[arg(long, env = "PORT", default_value_t = 5000)]
    pub port: u16,

    /// Catalog seed CSV (name,description,category,price,image). The
    /// built-in services are used when omitted.
    #[arg(long, env = "HOMEFIX_CATALOG")]
    pub catalog: Option<PathBuf>,

    /// Path to persistent database (optional). If provided, uses RocksDB.
    #[arg(long, env = "HOMEFIX_DB_PATH")]
    pub db_path: Option<PathBuf>,

    /// Payment processor secret key. The in-process sandbox processor is
    /// used when unset.
    #[arg(long, env = "STRIPE_SECRET_KEY", hide_env_values = true)]
    pub stripe_secret_key: Option<String>,

    /// Shared secret for webhook signatures
    #[arg(
        long,
        env = "STRIPE_WEBHOOK_SECRET",
        default_value = "whsec_test",
        hide_env_values = true
    )]
    pub webhook_secret: String,

    #[arg(long, env = "WEBHOOK_TOLERANCE_SECS", default_value_t = DEFAULT_TOLERANCE_SECS)]
    pub webhook_tolerance_secs: i64,

    /// Currency for payment intents (ISO 4217, any case)
    #[arg(long, env = "PAYMENT_CURRENCY", default_value = DEFAULT_CURRENCY)]
    pub currency: String,

    #[arg(long, env = "SESSION_TTL_HOURS", default_value_t = 24)]
    pub session_ttl_hours: i64,

    /// Timeout for calls to the payment processor
    #[arg(long, env = "STRIPE_TIMEOUT_SECS", default_value_t = 10)]
    pub processor_timeout_secs: u64,
}

impl Config {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn session_ttl(&self) -> Duration {
        Duration::hours(self.session_ttl_hours)
    }

    pub fn webhook_tolerance(&self) -> Duration {
        Duration::seconds(self.webhook_tolerance_secs)
    }

    pub fn processor_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.processor_timeout_secs)
    }
}
