mod event_consumer_service;

pub use event_consumer_service::*;
