use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString};

use crate::error::EstimateError;

/// Utility companies the engine knows how to price.
#[cfg_attr(feature = "swagger", derive(utoipa::ToSchema))]
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
    AsRefStr,
)]
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE")]
pub enum Provider {
    /// Ceylon Electricity Board
    Ceb,
    /// Lanka Electricity Company
    Leco,
}

/// Where a resolved plan came from.
#[cfg_attr(feature = "swagger", derive(utoipa::ToSchema))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, AsRefStr)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum PlanSource {
    /// Fetched from the external pricing service and validated.
    External,
    /// Built-in table, no external service configured.
    Local,
    /// Built-in table, external service configured but unusable for this call.
    LocalFallback,
}

/// One consumption tier. `to == None` marks the open-ended final slab.
#[cfg_attr(feature = "swagger", derive(utoipa::ToSchema))]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Slab {
    pub from: f64,
    #[serde(default)]
    pub to: Option<f64>,
    pub rate_per_unit: f64,
}

impl Slab {
    pub fn bounded(from: f64, to: f64, rate_per_unit: f64) -> Self {
        Self { from, to: Some(to), rate_per_unit }
    }

    pub fn open(from: f64, rate_per_unit: f64) -> Self {
        Self { from, to: None, rate_per_unit }
    }

    /// Units this slab can absorb, `None` when unbounded.
    pub fn capacity(&self) -> Option<f64> {
        self.to.map(|to| to - self.from + 1.0)
    }

    pub fn label(&self) -> String {
        match self.to {
            Some(to) => format!("{}-{}", self.from, to),
            None => format!("{}+", self.from),
        }
    }
}

/// Rate plan for one provider and billing period.
#[cfg_attr(feature = "swagger", derive(utoipa::ToSchema))]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TariffPlan {
    pub slabs: Vec<Slab>,
    pub fixed_charge: f64,
    #[serde(default)]
    pub peak_rate: f64,
    #[serde(default)]
    pub off_peak_rate: f64,
    #[serde(default)]
    pub tax_rate: f64,
}

impl TariffPlan {
    /// Checks the shape every plan must have before it reaches the calculator:
    /// slabs ascending and contiguous from unit 1, only the last one open-ended,
    /// charges finite and non-negative, tax rate in `[0, 1)`.
    pub fn validate(&self) -> Result<(), EstimateError> {
        let invalid = |msg: String| Err(EstimateError::InvalidPlan(msg));

        if self.slabs.is_empty() {
            return invalid("plan has no slabs".into());
        }
        for (name, value) in [
            ("fixedCharge", self.fixed_charge),
            ("peakRate", self.peak_rate),
            ("offPeakRate", self.off_peak_rate),
        ] {
            if !value.is_finite() || value < 0.0 {
                return invalid(format!("{name} must be a finite non-negative number, got {value}"));
            }
        }
        if !self.tax_rate.is_finite() || !(0.0..1.0).contains(&self.tax_rate) {
            return invalid(format!("taxRate must be in [0, 1), got {}", self.tax_rate));
        }

        let mut expected_from = 1.0;
        let last = self.slabs.len() - 1;
        for (i, slab) in self.slabs.iter().enumerate() {
            if !slab.from.is_finite() || slab.from != expected_from {
                return invalid(format!(
                    "slab {i} starts at {} but {expected_from} was expected",
                    slab.from
                ));
            }
            if !slab.rate_per_unit.is_finite() || slab.rate_per_unit < 0.0 {
                return invalid(format!("slab {} has invalid rate {}", slab.label(), slab.rate_per_unit));
            }
            match slab.to {
                Some(to) if !to.is_finite() || to < slab.from => {
                    return invalid(format!("slab {i} ends at {to} before it starts"));
                }
                Some(_) if i == last => {
                    return invalid("final slab must be open-ended".into());
                }
                None if i != last => {
                    return invalid(format!("only the final slab may be open-ended, slab {i} is not final"));
                }
                Some(to) => expected_from = to + 1.0,
                None => {}
            }
        }
        Ok(())
    }
}

/// A plan together with the provider it prices and where it was obtained.
#[cfg_attr(feature = "swagger", derive(utoipa::ToSchema))]
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedTariff {
    pub provider: Provider,
    pub source: PlanSource,
    pub plan: TariffPlan,
}
