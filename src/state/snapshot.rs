//! Annotation state snapshot for undo/redo functionality.

use crate::model::{Annotation, AnnotationId};

use super::store::AnnotationStore;

/// Snapshot of one image's annotations for undo/redo.
///
/// Holds the entire annotation list in store order. Selection is not part
/// of the snapshot; it survives a restore only if its id still exists.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AnnotationSnapshot {
    pub annotations: Vec<Annotation>,
}

impl AnnotationSnapshot {
    pub fn new(annotations: Vec<Annotation>) -> Self {
        Self { annotations }
    }

    pub fn len(&self) -> usize {
        self.annotations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.annotations.is_empty()
    }

    pub fn contains(&self, id: AnnotationId) -> bool {
        self.annotations.iter().any(|a| a.id() == id)
    }
}

impl AnnotationStore {
    /// Capture the current annotation list.
    pub fn snapshot(&self) -> AnnotationSnapshot {
        AnnotationSnapshot::new(self.annotations().to_vec())
    }

    /// Replace the annotation list with a snapshot, keeping the selection
    /// when its id is still present.
    pub fn restore(&mut self, snapshot: AnnotationSnapshot) {
        let selected = self.selected();
        self.replace_all(Some(snapshot.annotations));
        self.select(selected);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{BoundingBox, BoxAnnotation};

    #[test]
    fn test_restore_keeps_surviving_selection() {
        let mut store = AnnotationStore::new();
        store.add(BoxAnnotation::new(1, BoundingBox::new(0.0, 0.0, 10.0, 10.0)).into());
        let before = store.snapshot();
        store.add(BoxAnnotation::new(2, BoundingBox::new(20.0, 0.0, 10.0, 10.0)).into());

        store.select(Some(1));
        store.restore(before.clone());
        assert_eq!(store.selected(), Some(1));

        store.add(BoxAnnotation::new(2, BoundingBox::new(20.0, 0.0, 10.0, 10.0)).into());
        store.select(Some(2));
        store.restore(before);
        assert_eq!(store.selected(), None);
        assert_eq!(store.len(), 1);
    }
}
