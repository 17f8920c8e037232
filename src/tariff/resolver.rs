use async_trait::async_trait;
use std::{str::FromStr, sync::Arc, time::Duration};
use tracing::{debug, warn};

use super::{SourceUnavailable, TariffCatalog, TariffSource};
use crate::domain::{PlanSource, Provider, ResolvedTariff, TariffPlan};
use crate::error::EstimateError;

/// Upper bound on a single external fetch when none is configured.
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(5);

/// Anything that can turn a provider code and billing period into a plan.
#[async_trait]
pub trait PlanResolver: Send + Sync {
    async fn resolve(
        &self,
        provider: &str,
        month: u32,
        year: Option<i32>,
    ) -> Result<ResolvedTariff, EstimateError>;

    /// Whether answers may come from somewhere other than the static table.
    fn external_configured(&self) -> bool;
}

/// External-first resolver with unconditional fallback to the static catalog.
///
/// Only an unknown provider is an error. Every external problem is logged and
/// answered from the catalog with [`PlanSource::LocalFallback`].
#[derive(Clone)]
pub struct TariffResolver {
    catalog: Arc<TariffCatalog>,
    external: Option<Arc<dyn TariffSource>>,
    timeout: Duration,
}

impl TariffResolver {
    pub fn new(catalog: Arc<TariffCatalog>) -> Self {
        Self {
            catalog,
            external: None,
            timeout: DEFAULT_FETCH_TIMEOUT,
        }
    }

    pub fn with_external(mut self, source: Arc<dyn TariffSource>, timeout: Duration) -> Self {
        self.external = Some(source);
        self.timeout = timeout;
        self
    }

    fn parse_provider(&self, code: &str) -> Result<(Provider, &TariffPlan), EstimateError> {
        let unsupported = || EstimateError::UnsupportedProvider(code.to_string());
        let provider = Provider::from_str(code).map_err(|_| unsupported())?;
        let plan = self.catalog.plan(provider).ok_or_else(unsupported)?;
        Ok((provider, plan))
    }

    async fn fetch_external(
        &self,
        provider: Provider,
        month: u32,
        year: Option<i32>,
    ) -> Result<TariffPlan, SourceUnavailable> {
        let source = self.external.as_ref().ok_or(SourceUnavailable::NotConfigured)?;
        let plan = tokio::time::timeout(self.timeout, source.fetch_plan(provider, month, year))
            .await
            .map_err(|_| SourceUnavailable::Timeout(self.timeout))??;
        // Sources are expected to validate, but a plan only reaches the
        // calculator through here.
        plan.validate()
            .map_err(|e| SourceUnavailable::Invalid(e.to_string()))?;
        Ok(plan)
    }
}

#[async_trait]
impl PlanResolver for TariffResolver {
    async fn resolve(
        &self,
        provider: &str,
        month: u32,
        year: Option<i32>,
    ) -> Result<ResolvedTariff, EstimateError> {
        let (provider, local_plan) = self.parse_provider(provider)?;

        let (plan, source) = match self.fetch_external(provider, month, year).await {
            Ok(plan) => (plan, PlanSource::External),
            Err(SourceUnavailable::NotConfigured) => (local_plan.clone(), PlanSource::Local),
            Err(reason) => {
                warn!(%provider, month, ?year, %reason, "external tariff unavailable, using static plan");
                (local_plan.clone(), PlanSource::LocalFallback)
            }
        };
        debug!(%provider, month, source = source.as_ref(), "tariff resolved");

        Ok(ResolvedTariff {
            provider,
            source,
            plan,
        })
    }

    fn external_configured(&self) -> bool {
        self.external.is_some()
    }
}
