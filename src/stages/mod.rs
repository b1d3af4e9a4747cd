pub mod aggregate;
pub mod correction;
pub mod executor;

pub use aggregate::*;
pub use correction::*;
pub use executor::*;
