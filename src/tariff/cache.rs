use async_trait::async_trait;
use std::{collections::HashMap, sync::Arc, time::Duration};
use tokio::{sync::RwLock, time::Instant};

use super::PlanResolver;
use crate::domain::{PlanSource, ResolvedTariff};
use crate::error::EstimateError;

type CacheKey = (String, u32, Option<i32>);

/// TTL cache in front of another resolver.
///
/// Only externally sourced answers are kept: static plans are already local,
/// and holding on to a fallback would hide the external source recovering.
pub struct CachedResolver<R> {
    inner: R,
    ttl: Duration,
    entries: Arc<RwLock<HashMap<CacheKey, (Instant, ResolvedTariff)>>>,
}

impl<R: PlanResolver> CachedResolver<R> {
    pub fn new(inner: R, ttl: Duration) -> Self {
        Self {
            inner,
            ttl,
            entries: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn clear(&self) {
        self.entries.write().await.clear();
    }
}

#[async_trait]
impl<R: PlanResolver> PlanResolver for CachedResolver<R> {
    async fn resolve(
        &self,
        provider: &str,
        month: u32,
        year: Option<i32>,
    ) -> Result<ResolvedTariff, EstimateError> {
        let key = (provider.to_string(), month, year);
        {
            let entries = self.entries.read().await;
            if let Some((stored_at, tariff)) = entries.get(&key) {
                if stored_at.elapsed() < self.ttl {
                    return Ok(tariff.clone());
                }
            }
        }

        let resolved = self.inner.resolve(provider, month, year).await?;

        let mut entries = self.entries.write().await;
        let ttl = self.ttl;
        entries.retain(|_, (stored_at, _)| stored_at.elapsed() < ttl);
        if resolved.source == PlanSource::External {
            entries.insert(key, (Instant::now(), resolved.clone()));
        } else {
            entries.remove(&key);
        }
        Ok(resolved)
    }

    fn external_configured(&self) -> bool {
        self.inner.external_configured()
    }
}
