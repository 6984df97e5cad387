mod publisher;

pub use publisher::{EventPublisher, LogPublisher};
