//! Annotation state management modules.

mod grouping;
mod snapshot;
mod store;

pub use grouping::{BoxGroup, Grouping};
pub use snapshot::AnnotationSnapshot;
pub use store::{AnnotationPatch, AnnotationStore};
