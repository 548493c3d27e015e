use crate::domain::catalog::NewService;
use crate::error::{MarketplaceError, Result};
use rust_decimal::Decimal;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::warn;

/// Reads catalog services from a CSV source with a
/// `name,description,category,price,image` header.
///
/// Wraps `csv::Reader`; fields are trimmed and short rows are tolerated so a
/// missing trailing `image` column reads as `None`.
pub struct CatalogReader<R: Read> {
    reader: csv::Reader<R>,
}

impl CatalogReader<File> {
    /// Opens a seed file. A missing file is an error, not an empty catalog.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        Ok(Self::new(File::open(path)?))
    }
}

impl<R: Read> CatalogReader<R> {
    pub fn new(source: R) -> Self {
        let reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(source);
        Self { reader }
    }

    /// Lazily deserializes rows. Rows that parse but carry a non-positive
    /// price or a blank name come back as `ValidationError`.
    pub fn services(self) -> impl Iterator<Item = Result<NewService>> {
        self.reader.into_deserialize().map(|row| {
            let service: NewService = row.map_err(MarketplaceError::from)?;
            if service.name.is_empty() {
                return Err(MarketplaceError::ValidationError(
                    "Service name is required".to_string(),
                ));
            }
            if service.price <= Decimal::ZERO {
                return Err(MarketplaceError::ValidationError(format!(
                    "Service {} has a non-positive price",
                    service.name
                )));
            }
            Ok(service)
        })
    }

    /// Collects the usable rows, logging and skipping the rest.
    pub fn valid_services(self) -> Vec<NewService> {
        self.services()
            .enumerate()
            .filter_map(|(index, row)| match row {
                Ok(service) => Some(service),
                Err(e) => {
                    // +2: one for the header, one for 1-based numbering
                    warn!(row = index + 2, error = %e, "skipping catalog row");
                    None
                }
            })
            .collect()
    }
}
