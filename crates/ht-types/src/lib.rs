pub mod metric;
pub mod metrics;
pub mod hyperparameters;
pub mod results;
pub mod errors;

pub use metric::*;
pub use metrics::*;
pub use hyperparameters::*;
pub use results::*;
pub use errors::*;
