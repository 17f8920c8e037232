use utoipa::OpenApi;

use crate::api::health::HealthResponse;
use crate::domain::{
    BillEstimate, BillSummary, EstimateRequest, LineItem, LineItemKind, PlanSource, Provider,
    ResolvedTariff, Slab, TariffPlan,
};

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::api::estimate::estimate_bill,
        crate::api::estimate::get_tariff,
        crate::api::health::healthz,
    ),
    components(
        schemas(
            EstimateRequest, BillEstimate, BillSummary, LineItem, LineItemKind,
            ResolvedTariff, TariffPlan, Slab, Provider, PlanSource, HealthResponse
        )
    ),
    tags((name = "tariff-engine", description = "Electricity bill estimation API v1"))
)]
pub struct ApiDoc;
