pub mod data;
pub mod errors;
pub mod estimator;
pub mod params;
pub mod results;
pub mod scorer;

pub use data::*;
pub use errors::*;
pub use estimator::*;
pub use params::*;
pub use results::*;
pub use scorer::*;
