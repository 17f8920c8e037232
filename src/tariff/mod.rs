pub mod cache;
pub mod catalog;
pub mod remote;
pub mod resolver;

pub use cache::*;
pub use catalog::*;
pub use remote::*;
pub use resolver::*;
