pub mod estimate;
pub mod tariff;

pub use estimate::*;
pub use tariff::*;
