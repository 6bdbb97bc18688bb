pub mod client;
pub mod error;
pub mod types;

pub use client::{JobBackend, RemoteJobClient};
pub use error::BackendError;
pub use types::{GenerationRequest, HealthSnapshot, JobHandle, JobStatusUpdate};
