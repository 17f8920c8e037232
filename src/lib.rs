//! Tariff-based household electricity bill estimation.
//!
//! A [`tariff::PlanResolver`] turns a provider code and billing period into a
//! [`domain::TariffPlan`], preferring an external pricing service and falling
//! back to the static [`tariff::TariffCatalog`]. [`billing::calculate`] then
//! prices the request against that plan and itemizes the result.

pub mod api;
pub mod billing;
pub mod config;
pub mod domain;
pub mod error;
pub mod state;
pub mod tariff;
pub mod telemetry;
