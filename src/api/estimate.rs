//! Bill estimation and tariff lookup endpoints

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    Json,
};
use serde::Deserialize;
use tracing::info;
use validator::Validate;

use super::error::ApiError;
use crate::{
    billing,
    domain::{BillEstimate, EstimateRequest, ResolvedTariff},
    state::AppState,
};

/// Estimate a bill from total units and optional peak/off-peak split
#[cfg_attr(feature = "swagger", utoipa::path(
    post,
    path = "/api/v1/costs/estimate",
    request_body = EstimateRequest,
    responses(
        (status = 200, description = "Itemized bill estimate", body = BillEstimate),
        (status = 400, description = "Invalid units or unsupported provider")
    )
))]
pub async fn estimate_bill(
    State(st): State<AppState>,
    payload: Result<Json<EstimateRequest>, JsonRejection>,
) -> Result<Json<BillEstimate>, ApiError> {
    let Json(req) = payload?;
    req.validate()?;
    let tariff = st.resolver.resolve(&req.provider, req.month, req.year).await?;
    let estimate = billing::calculate(&req, &tariff)?;
    info!(
        provider = %estimate.provider,
        month = estimate.month,
        source = estimate.source.as_ref(),
        units = estimate.units,
        estimated_bill = estimate.estimated_bill,
        "bill estimated"
    );
    Ok(Json(estimate))
}

#[derive(Debug, Deserialize, Validate)]
pub struct TariffQuery {
    #[validate(range(min = 1, max = 12))]
    pub month: u32,
    #[validate(range(min = 1900))]
    pub year: Option<i32>,
}

/// Resolve the plan that would price a bill for the given period
#[cfg_attr(feature = "swagger", utoipa::path(
    get,
    path = "/api/v1/tariffs/{provider}",
    params(
        ("provider" = String, Path, description = "Provider code"),
        ("month" = u32, Query, description = "Billing month 1-12"),
        ("year" = Option<i32>, Query, description = "Billing year")
    ),
    responses(
        (status = 200, description = "Resolved plan and its source", body = ResolvedTariff),
        (status = 400, description = "Unsupported provider or bad period")
    )
))]
pub async fn get_tariff(
    State(st): State<AppState>,
    Path(provider): Path<String>,
    query: Result<Query<TariffQuery>, QueryRejection>,
) -> Result<Json<ResolvedTariff>, ApiError> {
    let Query(q) = query?;
    q.validate()?;
    let tariff = st.resolver.resolve(&provider, q.month, q.year).await?;
    Ok(Json(tariff))
}
