//! Segment persistence and preview — one backend trait with an in-memory
//! and a hosted implementation, wrapped by [`SegmentService`].

pub mod backend;
pub mod memory;
pub mod policy;
pub mod remote;
pub mod service;

pub use backend::SegmentBackend;
pub use memory::InMemoryBackend;
pub use policy::RequestPolicy;
pub use remote::RestBackend;
pub use service::SegmentService;

use audience_core::config::{BackendConfig, BackendKind};
use audience_core::AudienceResult;
use std::sync::Arc;

/// Build the backend selected by configuration.
pub fn backend_from_config(config: &BackendConfig) -> AudienceResult<Arc<dyn SegmentBackend>> {
    Ok(match config.kind {
        BackendKind::Memory if config.seed_demo_data => Arc::new(InMemoryBackend::with_demo_data()),
        BackendKind::Memory => Arc::new(InMemoryBackend::new()),
        BackendKind::Remote => Arc::new(RestBackend::new(config)?),
    })
}

/// Backend plus request policy, both taken from configuration.
pub fn service_from_config(config: &BackendConfig) -> AudienceResult<SegmentService> {
    Ok(SegmentService::new(
        backend_from_config(config)?,
        RequestPolicy::from(config),
    ))
}
