//! Annotation persistence: debounced saving, load tracking and backends.

mod auto_save;
mod backend;
mod error;
mod http;
mod loading;

pub use auto_save::{SaveJob, SaveScheduler, SaveStatus, SaveTicket};
pub use backend::{AnnotationBackend, MemoryBackend};
pub use error::{BackendError, BackendResult};
pub use http::HttpBackend;
pub use loading::{LoadTicket, LoadTracker};
