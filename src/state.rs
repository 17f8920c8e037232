use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::info;

use crate::config::Config;
use crate::tariff::{CachedResolver, HttpTariffSource, PlanResolver, TariffCatalog, TariffResolver};

#[derive(Clone)]
pub struct AppState {
    pub resolver: Arc<dyn PlanResolver>,
}

impl AppState {
    pub fn new(cfg: &Config) -> Result<Self> {
        let catalog = match &cfg.catalog_path {
            Some(path) => TariffCatalog::from_toml_file(path)?,
            None => TariffCatalog::builtin(),
        };
        let providers: Vec<String> = catalog.providers().map(|p| p.to_string()).collect();
        info!(?providers, custom = cfg.catalog_path.is_some(), "tariff catalog loaded");

        let mut resolver = TariffResolver::new(Arc::new(catalog));
        if let Some(url) = cfg.tariff_api.active_url() {
            let source = HttpTariffSource::new(
                url.to_string(),
                cfg.tariff_api.api_key.as_deref(),
                cfg.tariff_api.timeout(),
            )
            .context("building tariff API client")?;
            resolver = resolver.with_external(Arc::new(source), cfg.tariff_api.timeout());
            info!(%url, timeout_ms = cfg.tariff_api.timeout_ms, "external tariff source enabled");
        } else {
            info!("external tariff source disabled, using static plans");
        }

        let resolver: Arc<dyn PlanResolver> = match cfg.tariff_api.cache_ttl() {
            Some(ttl) => Arc::new(CachedResolver::new(resolver, ttl)),
            None => Arc::new(resolver),
        };

        Ok(Self { resolver })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_static_only_by_default() {
        let state = AppState::new(&Config::default()).unwrap();
        assert!(!state.resolver.external_configured());
    }

    #[test]
    fn test_external_enabled_by_url() {
        let mut cfg = Config::default();
        cfg.tariff_api.base_url = Some("http://127.0.0.1:9".into());
        cfg.tariff_api.cache_ttl_seconds = 30;
        let state = AppState::new(&cfg).unwrap();
        assert!(state.resolver.external_configured());
    }

    #[test]
    fn test_missing_catalog_file_is_an_error() {
        let mut cfg = Config::default();
        cfg.catalog_path = Some("/nonexistent/tariffs.toml".into());
        assert!(AppState::new(&cfg).is_err());
    }
}
