//! Data models for the annotation editor.

mod annotation;
mod mode;
mod project_config;

pub use annotation::{
    Annotation, AnnotationId, BoundingBox, BoxAnnotation, IdGenerator, KeypointAnnotation, Point,
    Size, decode_records,
};
pub use mode::EditorMode;
pub use project_config::ProjectConfig;
