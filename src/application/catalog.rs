use crate::domain::catalog::{NewService, NewServiceProvider, Service, ServiceProvider};
use crate::domain::ports::CatalogRepositoryRef;
use crate::domain::user::User;
use crate::domain::{ProviderId, ServiceId};
use crate::error::{MarketplaceError, Result};
use tracing::info;

/// Read access to services and providers, plus provider sign-up.
#[derive(Clone)]
pub struct CatalogService {
    catalog: CatalogRepositoryRef,
}

impl CatalogService {
    pub fn new(catalog: CatalogRepositoryRef) -> Self {
        Self { catalog }
    }

    /// Loads seed services, returning how many were stored.
    pub async fn seed<I>(&self, services: I) -> Result<usize>
    where
        I: IntoIterator<Item = NewService>,
    {
        let mut count = 0;
        for service in services {
            self.catalog.create_service(service).await?;
            count += 1;
        }
        Ok(count)
    }

    pub async fn list_services(&self) -> Result<Vec<Service>> {
        self.catalog.list_services().await
    }

    pub async fn get_service(&self, id: ServiceId) -> Result<Service> {
        self.catalog
            .get_service(id)
            .await?
            .ok_or_else(|| MarketplaceError::not_found("Service", id))
    }

    pub async fn services_in_category(&self, category: &str) -> Result<Vec<Service>> {
        self.catalog.list_services_by_category(category).await
    }

    pub async fn list_providers(&self) -> Result<Vec<ServiceProvider>> {
        self.catalog.list_providers().await
    }

    pub async fn get_provider(&self, id: ProviderId) -> Result<ServiceProvider> {
        self.catalog
            .get_provider(id)
            .await?
            .ok_or_else(|| MarketplaceError::not_found("Provider", id))
    }

    pub async fn providers_for_service(&self, service_id: ServiceId) -> Result<Vec<ServiceProvider>> {
        self.catalog.list_providers_by_service(service_id).await
    }

    /// Lists `user` as a provider of a service. Only accounts registered as
    /// providers may do this.
    pub async fn register_provider(
        &self,
        user: &User,
        mut listing: NewServiceProvider,
    ) -> Result<ServiceProvider> {
        if !user.is_provider {
            return Err(MarketplaceError::ForbiddenError(
                "only provider accounts can list services".to_string(),
            ));
        }
        self.get_service(listing.service_id).await?;
        if listing.hourly_rate.is_some_and(|rate| rate <= 0) {
            return Err(MarketplaceError::ValidationError(
                "Hourly rate must be positive".to_string(),
            ));
        }
        listing.user_id = user.id;
        let provider = self.catalog.create_provider(listing).await?;
        info!(
            provider_id = provider.id,
            user_id = user.id,
            service_id = provider.service_id,
            "provider listed"
        );
        Ok(provider)
    }
}
