use thiserror::Error;

#[derive(Error, Debug)]
pub enum MarketplaceError {
    #[error("Validation error: {0}")]
    ValidationError(String),
    #[error("{entity} with id {id} not found")]
    NotFoundError { entity: &'static str, id: i64 },
    #[error("Access denied: {0}")]
    ForbiddenError(String),
    #[error("Authentication required")]
    UnauthenticatedError,
    #[error("Webhook signature error: {0}")]
    SignatureError(String),
    #[error("Payment provider error: {0}")]
    PaymentProviderError(String),
    #[error("Invalid booking transition from {from} to {to}")]
    InvalidTransition { from: String, to: String },
    #[error("Conflict: {0}")]
    ConflictError(String),
    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Storage error: {0}")]
    StorageError(String),
    #[error("Internal error: {0}")]
    InternalError(Box<dyn std::error::Error + Send + Sync>),
}

impl MarketplaceError {
    pub fn not_found(entity: &'static str, id: i64) -> Self {
        Self::NotFoundError { entity, id }
    }
}

#[cfg(feature = "storage-rocksdb")]
impl From<rocksdb::Error> for MarketplaceError {
    fn from(err: rocksdb::Error) -> Self {
        Self::StorageError(err.to_string())
    }
}

impl From<serde_json::Error> for MarketplaceError {
    fn from(err: serde_json::Error) -> Self {
        Self::InternalError(Box::new(err))
    }
}

pub type Result<T> = std::result::Result<T, MarketplaceError>;
