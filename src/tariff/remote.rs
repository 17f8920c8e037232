use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, USER_AGENT};
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;

use crate::domain::{Provider, Slab, TariffPlan};

/// Why an external plan could not be used. Never leaves the resolver.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SourceUnavailable {
    #[error("external tariff source not configured")]
    NotConfigured,
    #[error("tariff request timed out after {0:?}")]
    Timeout(Duration),
    #[error("tariff request failed: {0}")]
    Transport(String),
    #[error("tariff API returned HTTP {status}: {body}")]
    Status { status: u16, body: String },
    #[error("tariff response could not be decoded: {0}")]
    Decode(String),
    #[error("tariff response is not a usable plan: {0}")]
    Invalid(String),
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TariffSource: Send + Sync {
    async fn fetch_plan(
        &self,
        provider: Provider,
        month: u32,
        year: Option<i32>,
    ) -> Result<TariffPlan, SourceUnavailable>;
}

/// Client for the remote pricing service: `GET {base}/tariffs?provider=&month=&year=`.
#[derive(Clone)]
pub struct HttpTariffSource {
    base_url: String,
    client: reqwest::Client,
    timeout: Duration,
}

impl HttpTariffSource {
    pub fn new(base_url: String, api_key: Option<&str>, timeout: Duration) -> anyhow::Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_static(concat!("tariff-engine/", env!("CARGO_PKG_VERSION"))),
        );
        if let Some(key) = api_key.filter(|k| !k.is_empty()) {
            let mut value = HeaderValue::from_str(&format!("Bearer {key}"))?;
            value.set_sensitive(true);
            headers.insert(AUTHORIZATION, value);
        }
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .build()?;
        Ok(Self {
            base_url,
            client,
            timeout,
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/tariffs", self.base_url.trim_end_matches('/'))
    }
}

#[async_trait]
impl TariffSource for HttpTariffSource {
    async fn fetch_plan(
        &self,
        provider: Provider,
        month: u32,
        year: Option<i32>,
    ) -> Result<TariffPlan, SourceUnavailable> {
        let mut query = vec![
            ("provider", provider.to_string()),
            ("month", month.to_string()),
        ];
        if let Some(year) = year {
            query.push(("year", year.to_string()));
        }

        let resp = self
            .client
            .get(self.endpoint())
            .query(&query)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    SourceUnavailable::Timeout(self.timeout)
                } else {
                    SourceUnavailable::Transport(e.to_string())
                }
            })?;

        let status = resp.status();
        let body = resp
            .text()
            .await
            .map_err(|e| SourceUnavailable::Transport(e.to_string()))?;
        if !status.is_success() {
            return Err(SourceUnavailable::Status {
                status: status.as_u16(),
                body,
            });
        }

        let raw: RawTariffPlan =
            serde_json::from_str(&body).map_err(|e| SourceUnavailable::Decode(e.to_string()))?;
        raw.normalize()
    }
}

/// Payload as the pricing service sends it; every field is optional so that a
/// partial document is reported as invalid rather than a decode failure.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawTariffPlan {
    #[serde(default)]
    slabs: Option<Vec<RawSlab>>,
    fixed_charge: Option<f64>,
    peak_rate: Option<f64>,
    off_peak_rate: Option<f64>,
    tax_rate: Option<f64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawSlab {
    from: Option<f64>,
    to: Option<f64>,
    rate_per_unit: Option<f64>,
}

impl RawTariffPlan {
    fn normalize(self) -> Result<TariffPlan, SourceUnavailable> {
        let mut slabs: Vec<Slab> = self
            .slabs
            .unwrap_or_default()
            .into_iter()
            .filter_map(|s| match (s.from, s.rate_per_unit) {
                (Some(from), Some(rate)) if from.is_finite() && rate.is_finite() => Some(Slab {
                    from,
                    to: s.to,
                    rate_per_unit: rate,
                }),
                _ => None,
            })
            .collect();
        slabs.sort_by(|a, b| a.from.total_cmp(&b.from));

        let fixed_charge = self
            .fixed_charge
            .ok_or_else(|| SourceUnavailable::Invalid("fixedCharge missing".into()))?;

        let plan = TariffPlan {
            slabs,
            fixed_charge,
            peak_rate: self.peak_rate.unwrap_or(0.0),
            off_peak_rate: self.off_peak_rate.unwrap_or(0.0),
            tax_rate: self.tax_rate.unwrap_or(0.0),
        };
        plan.validate()
            .map_err(|e| SourceUnavailable::Invalid(e.to_string()))?;
        Ok(plan)
    }
}
