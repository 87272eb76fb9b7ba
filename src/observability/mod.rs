pub mod metrics;
pub mod middleware;

pub use metrics::*;
pub use middleware::*;
