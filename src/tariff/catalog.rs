use anyhow::{Context, Result};
use std::{collections::BTreeMap, path::Path, str::FromStr};

use crate::domain::{Provider, Slab, TariffPlan};
use crate::error::EstimateError;

/// Read-only table of static plans, one per supported provider.
///
/// Built once at startup and shared by every resolver call. Plans are
/// validated on construction so a catalog can never hand out a malformed plan.
#[derive(Debug, Clone, PartialEq)]
pub struct TariffCatalog {
    plans: BTreeMap<Provider, TariffPlan>,
}

impl TariffCatalog {
    pub fn new(plans: BTreeMap<Provider, TariffPlan>) -> Result<Self, EstimateError> {
        for (provider, plan) in &plans {
            plan.validate().map_err(|e| match e {
                EstimateError::InvalidPlan(msg) => {
                    EstimateError::InvalidPlan(format!("{provider}: {msg}"))
                }
                other => other,
            })?;
        }
        Ok(Self { plans })
    }

    /// Residential rates shipped with the service.
    pub fn builtin() -> Self {
        let mut plans = BTreeMap::new();
        plans.insert(
            Provider::Ceb,
            TariffPlan {
                slabs: vec![
                    Slab::bounded(1.0, 30.0, 8.0),
                    Slab::bounded(31.0, 60.0, 12.0),
                    Slab::bounded(61.0, 120.0, 20.0),
                    Slab::bounded(121.0, 180.0, 33.0),
                    Slab::open(181.0, 52.0),
                ],
                fixed_charge: 400.0,
                peak_rate: 36.0,
                off_peak_rate: 24.0,
                tax_rate: 0.18,
            },
        );
        plans.insert(
            Provider::Leco,
            TariffPlan {
                slabs: vec![
                    Slab::bounded(1.0, 30.0, 7.5),
                    Slab::bounded(31.0, 60.0, 11.0),
                    Slab::bounded(61.0, 120.0, 19.0),
                    Slab::bounded(121.0, 180.0, 32.0),
                    Slab::open(181.0, 50.0),
                ],
                fixed_charge: 350.0,
                peak_rate: 34.0,
                off_peak_rate: 22.0,
                tax_rate: 0.18,
            },
        );
        Self { plans }
    }

    /// Load a catalog from a TOML file keyed by provider code, e.g.
    ///
    /// ```toml
    /// [CEB]
    /// fixedCharge = 400
    /// slabs = [{ from = 1, to = 30, ratePerUnit = 8 }, { from = 31, ratePerUnit = 12 }]
    /// ```
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading tariff catalog {}", path.display()))?;
        Self::from_toml_str(&raw).with_context(|| format!("loading tariff catalog {}", path.display()))
    }

    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let raw_plans: BTreeMap<String, TariffPlan> =
            toml::from_str(raw).context("tariff catalog TOML parse failed")?;
        if raw_plans.is_empty() {
            anyhow::bail!("tariff catalog defines no providers");
        }
        let plans = raw_plans
            .into_iter()
            .map(|(code, plan)| {
                let provider = Provider::from_str(&code)
                    .map_err(|_| anyhow::anyhow!("unknown provider code {code:?} in tariff catalog"))?;
                Ok((provider, plan))
            })
            .collect::<Result<BTreeMap<_, _>>>()?;
        Ok(Self::new(plans)?)
    }

    pub fn plan(&self, provider: Provider) -> Option<&TariffPlan> {
        self.plans.get(&provider)
    }

    pub fn providers(&self) -> impl Iterator<Item = Provider> + '_ {
        self.plans.keys().copied()
    }
}
