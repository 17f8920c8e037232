use serde::{Deserialize, Serialize};
use validator::Validate;

use super::tariff::{PlanSource, Provider};

/// Largest consumption figure accepted in a request.
pub const MAX_UNITS: f64 = 1_000_000_000.0;

/// Input to a bill estimate. `peak_units` and `off_peak_units` classify part of
/// `units` for time-of-use pricing; they are not added to it.
#[cfg_attr(feature = "swagger", derive(utoipa::ToSchema))]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct EstimateRequest {
    #[validate(range(min = 0.0, max = MAX_UNITS))]
    pub units: f64,
    #[validate(range(min = 1, max = 12))]
    pub month: u32,
    #[validate(range(min = 1900))]
    #[serde(default)]
    pub year: Option<i32>,
    /// Provider code, checked by the resolver rather than at deserialization
    /// so an unknown code surfaces as an unsupported-provider error.
    pub provider: String,
    #[validate(range(min = 0.0, max = MAX_UNITS))]
    #[serde(default)]
    pub peak_units: f64,
    #[validate(range(min = 0.0, max = MAX_UNITS))]
    #[serde(default)]
    pub off_peak_units: f64,
}

#[cfg_attr(feature = "swagger", derive(utoipa::ToSchema))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LineItemKind {
    Slab,
    Tou,
    Fixed,
    Tax,
}

/// One row of the itemized bill.
#[cfg_attr(feature = "swagger", derive(utoipa::ToSchema))]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineItem {
    #[serde(rename = "type")]
    pub kind: LineItemKind,
    pub label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub units: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rate_per_unit: Option<f64>,
    /// Applied fraction, only set on the tax row.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rate: Option<f64>,
    pub amount: f64,
}

#[cfg_attr(feature = "swagger", derive(utoipa::ToSchema))]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BillSummary {
    pub energy_charge: f64,
    pub peak_charge: f64,
    pub off_peak_charge: f64,
    pub fixed_charge: f64,
    pub tax: f64,
    pub sub_total: f64,
}

#[cfg_attr(feature = "swagger", derive(utoipa::ToSchema))]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BillEstimate {
    pub month: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub year: Option<i32>,
    pub provider: Provider,
    pub source: PlanSource,
    pub units: f64,
    pub estimated_bill: f64,
    pub summary: BillSummary,
    pub breakdown: Vec<LineItem>,
}

impl BillEstimate {
    pub fn items_of(&self, kind: LineItemKind) -> impl Iterator<Item = &LineItem> {
        self.breakdown.iter().filter(move |item| item.kind == kind)
    }
}
