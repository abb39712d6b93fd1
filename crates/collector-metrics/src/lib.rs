mod exporter;
mod metrics;

pub use exporter::*;
pub use metrics::*;
