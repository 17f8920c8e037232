use thiserror::Error;

/// Failures the estimation engine reports to its caller.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EstimateError {
    #[error("unsupported provider: {0}")]
    UnsupportedProvider(String),

    #[error("peak and off-peak units cannot exceed total units (peak {peak} + off-peak {off_peak} > {units})")]
    OverlappingUsage { peak: f64, off_peak: f64, units: f64 },

    #[error("estimate is out of range: {0} is not a finite amount")]
    AmountOutOfRange(&'static str),

    /// A plan that breaks the slab/charge invariants. Reaching the calculator
    /// with one of these is a bug in whatever built the plan.
    #[error("invalid tariff plan: {0}")]
    InvalidPlan(String),
}

impl EstimateError {
    /// True for errors caused by the caller's input.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            EstimateError::UnsupportedProvider(_)
                | EstimateError::OverlappingUsage { .. }
                | EstimateError::AmountOutOfRange(_)
        )
    }
}
