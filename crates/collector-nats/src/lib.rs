mod client;
mod consumer;
mod middleware;
mod traits;
mod types;

pub use client::*;
pub use consumer::*;
pub use middleware::*;
pub use traits::*;
pub use types::*;

// Re-export mocks when the testing feature is enabled
#[cfg(any(test, feature = "testing"))]
pub use traits::{MockDeliveredMessage, MockJetStreamConsumer, MockPullConsumer};
