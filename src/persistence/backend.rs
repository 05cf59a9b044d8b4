//! Backend port and the in-memory implementation.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};

use async_trait::async_trait;

use super::error::{BackendError, BackendResult};
use crate::model::{Annotation, ProjectConfig};

/// Port for annotation and project-config storage.
///
/// One backend serves one project; image names are keys within it.
#[async_trait]
pub trait AnnotationBackend: Send + Sync {
    /// Load the annotations of an image. `None` means nothing stored yet.
    async fn load_annotations(&self, image: &str) -> BackendResult<Option<Vec<Annotation>>>;

    /// Replace the stored annotations of an image with `annotations`.
    async fn save_annotations(&self, image: &str, annotations: &[Annotation]) -> BackendResult<()>;

    /// Load the project configuration.
    async fn load_config(&self) -> BackendResult<ProjectConfig>;

    /// Replace the project configuration.
    async fn save_config(&self, config: &ProjectConfig) -> BackendResult<()>;
}

/// In-memory backend for offline use and tests.
///
/// Clones share storage, so a test can keep a handle to inspect what the
/// session saved.
#[derive(Debug, Clone, Default)]
pub struct MemoryBackend {
    annotations: Arc<RwLock<HashMap<String, Vec<Annotation>>>>,
    config: Arc<RwLock<ProjectConfig>>,
    fail_loads: Arc<AtomicBool>,
    fail_saves: Arc<AtomicBool>,
    save_count: Arc<AtomicUsize>,
}

fn poisoned<T>(_: T) -> BackendError {
    BackendError::Unavailable("memory backend lock poisoned".to_string())
}

impl MemoryBackend {
    /// Create a new empty in-memory backend
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the backend with a project configuration.
    pub fn with_config(self, config: ProjectConfig) -> Self {
        if let Ok(mut slot) = self.config.write() {
            *slot = config;
        }
        self
    }

    /// Seed the annotations of one image.
    pub fn with_annotations(self, image: impl Into<String>, annotations: Vec<Annotation>) -> Self {
        if let Ok(mut map) = self.annotations.write() {
            map.insert(image.into(), annotations);
        }
        self
    }

    /// Make subsequent loads fail.
    pub fn set_fail_loads(&self, fail: bool) {
        self.fail_loads.store(fail, Ordering::SeqCst);
    }

    /// Make subsequent saves fail.
    pub fn set_fail_saves(&self, fail: bool) {
        self.fail_saves.store(fail, Ordering::SeqCst);
    }

    /// Number of successful annotation saves.
    pub fn save_count(&self) -> usize {
        self.save_count.load(Ordering::SeqCst)
    }

    /// Currently stored annotations of an image.
    pub fn stored(&self, image: &str) -> Option<Vec<Annotation>> {
        self.annotations.read().ok()?.get(image).cloned()
    }

    /// Currently stored project configuration.
    pub fn stored_config(&self) -> Option<ProjectConfig> {
        self.config.read().ok().map(|c| c.clone())
    }
}

#[async_trait]
impl AnnotationBackend for MemoryBackend {
    async fn load_annotations(&self, image: &str) -> BackendResult<Option<Vec<Annotation>>> {
        if self.fail_loads.load(Ordering::SeqCst) {
            return Err(BackendError::Unavailable(format!("load of '{}' failed", image)));
        }
        let map = self.annotations.read().map_err(poisoned)?;
        Ok(map.get(image).cloned())
    }

    async fn save_annotations(&self, image: &str, annotations: &[Annotation]) -> BackendResult<()> {
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err(BackendError::Unavailable(format!("save of '{}' failed", image)));
        }
        let mut map = self.annotations.write().map_err(poisoned)?;
        map.insert(image.to_string(), annotations.to_vec());
        self.save_count.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn load_config(&self) -> BackendResult<ProjectConfig> {
        if self.fail_loads.load(Ordering::SeqCst) {
            return Err(BackendError::Unavailable("config load failed".to_string()));
        }
        Ok(self.config.read().map_err(poisoned)?.clone())
    }

    async fn save_config(&self, config: &ProjectConfig) -> BackendResult<()> {
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err(BackendError::Unavailable("config save failed".to_string()));
        }
        *self.config.write().map_err(poisoned)? = config.clone();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{BoundingBox, BoxAnnotation};

    #[tokio::test]
    async fn test_save_then_load() {
        let backend = MemoryBackend::new();
        let annotations: Vec<Annotation> =
            vec![BoxAnnotation::new(1, BoundingBox::new(0.0, 0.0, 10.0, 10.0)).into()];

        assert_eq!(backend.load_annotations("a.jpg").await.unwrap(), None);
        backend.save_annotations("a.jpg", &annotations).await.unwrap();
        assert_eq!(
            backend.load_annotations("a.jpg").await.unwrap(),
            Some(annotations)
        );
        assert_eq!(backend.save_count(), 1);
    }

    #[tokio::test]
    async fn test_failure_injection() {
        let backend = MemoryBackend::new();
        backend.set_fail_saves(true);
        assert!(backend.save_annotations("a.jpg", &[]).await.is_err());
        assert_eq!(backend.save_count(), 0);

        backend.set_fail_loads(true);
        assert!(matches!(
            backend.load_annotations("a.jpg").await,
            Err(BackendError::Unavailable(_))
        ));
    }

    #[tokio::test]
    async fn test_clones_share_storage() {
        let backend = MemoryBackend::new();
        let handle = backend.clone();
        backend
            .save_config(&ProjectConfig::new().with_class(0, "person"))
            .await
            .unwrap();
        let config = handle.stored_config().unwrap();
        assert_eq!(config.class_name(0), Some("person"));
    }
}
