//! posemark - Pose Annotation Engine
//!
//! A headless interaction engine for drawing bounding boxes and keypoints on
//! images. The host renders the image and forwards pointer and keyboard
//! events; the [`Editor`] maps them to natural image coordinates, maintains
//! the annotation store with undo history, and schedules debounced saves
//! that an [`EditorSession`] sends to an [`AnnotationBackend`].

pub mod config;
pub mod constants;
pub mod editor;
pub mod geometry;
pub mod interaction;
pub mod keybindings;
pub mod model;
pub mod persistence;
pub mod session;
pub mod state;
pub mod undo;

pub use config::{AppConfig, ConfigError, LogLevel, init_logging};
pub use editor::Editor;
pub use model::{Annotation, AnnotationId, BoundingBox, BoxAnnotation, EditorMode, KeypointAnnotation};
pub use persistence::{AnnotationBackend, BackendError, HttpBackend, MemoryBackend};
pub use session::EditorSession;
