mod error;
mod event;
mod metrics;
mod store;
mod validator;

pub use error::*;
pub use event::*;
pub use metrics::*;
pub use store::*;
pub use validator::*;

// Re-export mocks when the testing feature is enabled
#[cfg(any(test, feature = "testing"))]
pub use metrics::MockMetricsSink;
#[cfg(any(test, feature = "testing"))]
pub use store::MockEventStore;
