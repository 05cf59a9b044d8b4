//! Annotation storage for the image being edited.

use std::collections::HashSet;

use crate::model::{Annotation, AnnotationId, BoundingBox, BoxAnnotation, Point};

/// Field-wise update for a single annotation.
///
/// Fields that do not exist on the target variant are ignored, so a patch
/// carrying `class_index` is a no-op on a keypoint.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AnnotationPatch {
    pub x: Option<f64>,
    pub y: Option<f64>,
    pub width: Option<f64>,
    pub height: Option<f64>,
    pub label: Option<String>,
    pub class_index: Option<Option<u32>>,
    pub keypoint_index: Option<u32>,
    pub parent_id: Option<Option<AnnotationId>>,
}

impl AnnotationPatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn position(mut self, point: Point) -> Self {
        self.x = Some(point.x);
        self.y = Some(point.y);
        self
    }

    pub fn rect(mut self, rect: BoundingBox) -> Self {
        self.x = Some(rect.x);
        self.y = Some(rect.y);
        self.width = Some(rect.width);
        self.height = Some(rect.height);
        self
    }

    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn class_index(mut self, class_index: Option<u32>) -> Self {
        self.class_index = Some(class_index);
        self
    }

    pub fn keypoint_index(mut self, index: u32) -> Self {
        self.keypoint_index = Some(index);
        self
    }

    pub fn parent_id(mut self, parent: Option<AnnotationId>) -> Self {
        self.parent_id = Some(parent);
        self
    }
}

/// Ordered collection of the annotations of one image, plus selection.
///
/// Store order is insertion order and doubles as z-order: later entries are
/// drawn on top and win hit tests.
///
/// Invariants held by every operation:
/// - box width and height are never negative
/// - a keypoint `parent_id` always names a box in the store
/// - the selected id, if any, names an annotation in the store
#[derive(Debug, Clone, Default)]
pub struct AnnotationStore {
    annotations: Vec<Annotation>,
    selected_id: Option<AnnotationId>,
    /// Bumped on every content change.
    revision: u64,
}

impl AnnotationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Monotonic change counter for the annotation list (not selection).
    pub fn revision(&self) -> u64 {
        self.revision
    }

    fn touch(&mut self) {
        self.revision = self.revision.wrapping_add(1);
    }

    /// Replace every annotation, e.g. after a load or an undo.
    ///
    /// `None` is treated as an empty list. Incoming records are sanitized:
    /// negative box extents are flipped, and keypoints whose parent box is
    /// missing become unparented.
    pub fn replace_all(&mut self, annotations: Option<Vec<Annotation>>) {
        let mut annotations = annotations.unwrap_or_default();

        let box_ids: HashSet<AnnotationId> = annotations
            .iter()
            .filter_map(|a| a.as_box().map(|b| b.id))
            .collect();

        for ann in &mut annotations {
            match ann {
                Annotation::Box(b) => {
                    if b.width < 0.0 || b.height < 0.0 {
                        log::warn!("Normalizing box {} with negative extent", b.id);
                        let rect = b.rect().normalized();
                        b.set_rect(rect);
                    }
                }
                Annotation::Keypoint(k) => {
                    if let Some(parent) = k.parent_id.filter(|p| !box_ids.contains(p)) {
                        log::warn!(
                            "Keypoint {} references missing box {}, unparenting",
                            k.id,
                            parent
                        );
                        k.set_parent(None);
                    }
                }
            }
        }

        self.annotations = annotations;
        if self
            .selected_id
            .is_some_and(|selected| self.index_of(selected).is_none())
        {
            self.selected_id = None;
        }
        self.touch();
    }

    /// Append an annotation.
    ///
    /// A keypoint whose parent box is not in the store is stored unparented.
    pub fn add(&mut self, mut annotation: Annotation) {
        let dangling = annotation
            .as_keypoint()
            .and_then(|k| k.parent_id)
            .filter(|parent| !self.is_box(*parent));
        if let (Some(parent), Annotation::Keypoint(k)) = (dangling, &mut annotation) {
            log::warn!("Keypoint {} added with unknown parent {}", k.id, parent);
            k.set_parent(None);
        }
        log::debug!("Added {} {}", annotation.kind(), annotation.id());
        self.annotations.push(annotation);
        self.touch();
    }

    /// Apply a patch to one annotation. Returns `false` if the id is unknown
    /// or the patch changed nothing.
    pub fn update(&mut self, id: AnnotationId, patch: AnnotationPatch) -> bool {
        let parent_ok = match patch.parent_id {
            Some(Some(parent)) => self.is_box(parent),
            _ => true,
        };
        let Some(index) = self.index_of(id) else {
            return false;
        };

        let before = self.annotations[index].clone();
        match &mut self.annotations[index] {
            Annotation::Box(b) => {
                let mut rect = b.rect();
                if let Some(x) = patch.x {
                    rect.x = x;
                }
                if let Some(y) = patch.y {
                    rect.y = y;
                }
                if let Some(w) = patch.width {
                    rect.width = w;
                }
                if let Some(h) = patch.height {
                    rect.height = h;
                }
                b.set_rect(rect.normalized());
                if let Some(label) = patch.label {
                    b.label = label;
                }
                if let Some(class_index) = patch.class_index {
                    b.class_index = class_index;
                }
            }
            Annotation::Keypoint(k) => {
                if let Some(x) = patch.x {
                    k.x = x;
                }
                if let Some(y) = patch.y {
                    k.y = y;
                }
                if let Some(label) = patch.label {
                    k.label = label;
                }
                if let Some(index) = patch.keypoint_index {
                    k.keypoint_index = index;
                }
                match patch.parent_id {
                    Some(parent) if parent_ok => k.set_parent(parent),
                    Some(parent) => {
                        log::warn!("Rejected parent {:?} for keypoint {}", parent, k.id);
                    }
                    None => {}
                }
            }
        }

        let changed = self.annotations[index] != before;
        if changed {
            self.touch();
        }
        changed
    }

    /// Remove an annotation. Removing a box also removes every keypoint
    /// parented to it. Returns the removed annotations in store order.
    pub fn remove(&mut self, id: AnnotationId) -> Vec<Annotation> {
        let Some(index) = self.index_of(id) else {
            return Vec::new();
        };
        let cascade = self.annotations[index].is_box();

        let (removed, kept): (Vec<Annotation>, Vec<Annotation>) =
            std::mem::take(&mut self.annotations)
                .into_iter()
                .partition(|a| {
                    a.id() == id
                        || (cascade && a.as_keypoint().is_some_and(|k| k.parent_id == Some(id)))
                });
        self.annotations = kept;

        if self
            .selected_id
            .is_some_and(|selected| removed.iter().any(|a| a.id() == selected))
        {
            self.selected_id = None;
        }
        log::debug!("Removed {} annotation(s) starting at {}", removed.len(), id);
        self.touch();
        removed
    }

    /// Remove everything.
    pub fn clear(&mut self) {
        self.annotations.clear();
        self.selected_id = None;
        self.touch();
    }

    /// Select an annotation, or clear the selection with `None`.
    /// Unknown ids clear the selection.
    pub fn select(&mut self, id: Option<AnnotationId>) {
        let id = id.filter(|id| self.index_of(*id).is_some());
        if self.selected_id != id {
            log::trace!("Selection: {:?} -> {:?}", self.selected_id, id);
            self.selected_id = id;
        }
    }

    /// Get the selected annotation ID.
    pub fn selected(&self) -> Option<AnnotationId> {
        self.selected_id
    }

    pub fn selected_annotation(&self) -> Option<&Annotation> {
        self.selected_id.and_then(|id| self.get(id))
    }

    /// The selected annotation, if it is a box.
    pub fn selected_box(&self) -> Option<&BoxAnnotation> {
        self.selected_annotation().and_then(Annotation::as_box)
    }

    fn index_of(&self, id: AnnotationId) -> Option<usize> {
        self.annotations.iter().position(|a| a.id() == id)
    }

    fn is_box(&self, id: AnnotationId) -> bool {
        self.get(id).is_some_and(Annotation::is_box)
    }

    /// Get an annotation by ID.
    pub fn get(&self, id: AnnotationId) -> Option<&Annotation> {
        self.annotations.iter().find(|a| a.id() == id)
    }

    /// All annotations in store order.
    pub fn annotations(&self) -> &[Annotation] {
        &self.annotations
    }

    pub fn iter(&self) -> impl Iterator<Item = &Annotation> {
        self.annotations.iter()
    }

    pub fn len(&self) -> usize {
        self.annotations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.annotations.is_empty()
    }

    /// Largest id in the store.
    pub fn max_id(&self) -> Option<AnnotationId> {
        self.annotations.iter().map(Annotation::id).max()
    }

    /// Find the topmost annotation at a natural-space point.
    ///
    /// Annotations are tested from the most recently added backwards. Boxes
    /// hit on containment, keypoints within `keypoint_radius`.
    pub fn hit_test(&self, point: &Point, keypoint_radius: f64) -> Option<AnnotationId> {
        self.annotations
            .iter()
            .rev()
            .find(|ann| match ann {
                Annotation::Box(b) => b.rect().contains(point),
                Annotation::Keypoint(k) => k.position().distance_to(point) <= keypoint_radius,
            })
            .map(Annotation::id)
    }

    /// Next keypoint index for a box: one past the largest index among its
    /// siblings, or 0 if it has none.
    ///
    /// Siblings are keypoints parented to the box plus unparented keypoints
    /// lying inside it. Returns 0 if `box_id` is not a box.
    pub fn next_keypoint_index(&self, box_id: AnnotationId) -> u32 {
        let Some(rect) = self.get(box_id).and_then(Annotation::as_box).map(|b| b.rect()) else {
            return 0;
        };
        self.annotations
            .iter()
            .filter_map(Annotation::as_keypoint)
            .filter(|k| match k.parent_id {
                Some(parent) => parent == box_id,
                None => rect.contains(&k.position()),
            })
            .map(|k| k.keypoint_index)
            .max()
            .map_or(0, |max| max.saturating_add(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::KeypointAnnotation;

    fn bbox(id: AnnotationId, x: f64, y: f64, w: f64, h: f64) -> Annotation {
        BoxAnnotation::new(id, BoundingBox::new(x, y, w, h)).into()
    }

    fn keypoint(id: AnnotationId, x: f64, y: f64, index: u32, parent: Option<AnnotationId>) -> Annotation {
        let mut k = KeypointAnnotation::new(id, Point::new(x, y), index);
        k.parent_id = parent;
        k.into()
    }

    fn ids(store: &AnnotationStore) -> Vec<AnnotationId> {
        store.iter().map(Annotation::id).collect()
    }

    fn assert_parents_valid(store: &AnnotationStore) {
        for ann in store.iter() {
            if let Some(parent) = ann.as_keypoint().and_then(|k| k.parent_id) {
                assert!(
                    store.get(parent).is_some_and(Annotation::is_box),
                    "keypoint {} has dangling parent {}",
                    ann.id(),
                    parent
                );
            }
        }
    }

    #[test]
    fn test_replace_all_none_is_empty() {
        let mut store = AnnotationStore::new();
        store.add(bbox(1, 0.0, 0.0, 10.0, 10.0));
        store.replace_all(None);
        assert!(store.is_empty());
    }

    #[test]
    fn test_replace_all_unparents_dangling_keypoints() {
        let mut store = AnnotationStore::new();
        store.replace_all(Some(vec![
            bbox(1, 0.0, 0.0, 10.0, 10.0),
            keypoint(2, 1.0, 1.0, 0, Some(1)),
            keypoint(3, 1.0, 1.0, 0, Some(99)),
        ]));
        assert_parents_valid(&store);
        assert_eq!(store.get(2).unwrap().as_keypoint().unwrap().parent_id, Some(1));
        assert_eq!(store.get(3).unwrap().as_keypoint().unwrap().parent_id, None);
    }

    #[test]
    fn test_replace_all_keeps_order_and_drops_stale_selection() {
        let mut store = AnnotationStore::new();
        store.add(bbox(9, 0.0, 0.0, 10.0, 10.0));
        store.select(Some(9));
        store.replace_all(Some(vec![bbox(3, 0.0, 0.0, 1.0, 1.0), bbox(2, 0.0, 0.0, 1.0, 1.0)]));
        assert_eq!(ids(&store), vec![3, 2]);
        assert_eq!(store.selected(), None);
    }

    #[test]
    fn test_loaded_records_save_unchanged() {
        let wire = serde_json::json!([
            {"id": 1, "type": "bbox", "x": 10.0, "y": 10.0, "width": 50.0, "height": 50.0,
             "label": "Object", "classIndex": null, "occluded": false},
            {"id": 2, "type": "keypoint", "x": 20.0, "y": 20.0, "label": "Keypoint",
             "keypointIndex": 0, "parentId": 1, "score": 0.9},
            {"id": 3, "type": "keypoint", "x": 90.0, "y": 90.0, "label": "Keypoint",
             "keypointIndex": 0}
        ]);
        let mut store = AnnotationStore::new();
        store.replace_all(Some(serde_json::from_value(wire.clone()).unwrap()));
        assert_eq!(serde_json::to_value(store.annotations()).unwrap(), wire);
    }

    #[test]
    fn test_unparented_keypoint_writes_null_parent() {
        let wire = serde_json::json!([
            {"id": 2, "type": "keypoint", "x": 1.0, "y": 1.0, "label": "", "keypointIndex": 0,
             "parentId": 99}
        ]);
        let mut store = AnnotationStore::new();
        store.replace_all(Some(serde_json::from_value(wire).unwrap()));
        let saved = serde_json::to_value(store.annotations()).unwrap();
        assert!(saved[0].get("parentId").is_some_and(|v| v.is_null()));
    }

    #[test]
    fn test_update_unknown_id_is_noop() {
        let mut store = AnnotationStore::new();
        store.add(bbox(1, 0.0, 0.0, 10.0, 10.0));
        let revision = store.revision();
        assert!(!store.update(42, AnnotationPatch::new().label("x")));
        assert_eq!(store.revision(), revision);
    }

    #[test]
    fn test_update_normalizes_negative_extent() {
        let mut store = AnnotationStore::new();
        store.add(bbox(1, 50.0, 50.0, 10.0, 10.0));
        assert!(store.update(1, AnnotationPatch::new().rect(BoundingBox::new(50.0, 50.0, -20.0, 10.0))));
        let b = store.get(1).unwrap().as_box().unwrap();
        assert_eq!(b.rect(), BoundingBox::new(30.0, 50.0, 20.0, 10.0));
    }

    #[test]
    fn test_update_rejects_parent_that_is_not_a_box() {
        let mut store = AnnotationStore::new();
        store.add(bbox(1, 0.0, 0.0, 10.0, 10.0));
        store.add(keypoint(2, 1.0, 1.0, 0, None));
        store.add(keypoint(3, 1.0, 1.0, 0, None));
        assert!(!store.update(3, AnnotationPatch::new().parent_id(Some(2))));
        assert!(store.update(3, AnnotationPatch::new().parent_id(Some(1))));
        assert_parents_valid(&store);
    }

    #[test]
    fn test_update_ignores_fields_of_other_variant() {
        let mut store = AnnotationStore::new();
        store.add(keypoint(1, 1.0, 1.0, 0, None));
        assert!(!store.update(1, AnnotationPatch::new().class_index(Some(3))));
    }

    #[test]
    fn test_remove_box_cascades_exactly_owned_keypoints() {
        let mut store = AnnotationStore::new();
        store.add(bbox(1, 0.0, 0.0, 100.0, 100.0));
        store.add(keypoint(2, 10.0, 10.0, 0, Some(1)));
        store.add(bbox(3, 200.0, 200.0, 50.0, 50.0));
        // Inside box 1 but unparented: not owned, must survive.
        store.add(keypoint(4, 20.0, 20.0, 1, None));
        store.add(keypoint(5, 210.0, 210.0, 0, Some(3)));
        store.add(keypoint(6, 30.0, 30.0, 2, Some(1)));

        let removed: Vec<AnnotationId> = store.remove(1).iter().map(Annotation::id).collect();
        assert_eq!(removed, vec![1, 2, 6]);
        assert_eq!(ids(&store), vec![3, 4, 5]);
        assert_parents_valid(&store);
    }

    #[test]
    fn test_remove_keypoint_does_not_cascade() {
        let mut store = AnnotationStore::new();
        store.add(bbox(1, 0.0, 0.0, 100.0, 100.0));
        store.add(keypoint(2, 10.0, 10.0, 0, Some(1)));
        assert_eq!(store.remove(2).len(), 1);
        assert_eq!(ids(&store), vec![1]);
    }

    #[test]
    fn test_remove_clears_selection_of_cascaded_child() {
        let mut store = AnnotationStore::new();
        store.add(bbox(1, 0.0, 0.0, 100.0, 100.0));
        store.add(keypoint(2, 10.0, 10.0, 0, Some(1)));
        store.select(Some(2));
        store.remove(1);
        assert_eq!(store.selected(), None);
    }

    #[test]
    fn test_select_unknown_clears() {
        let mut store = AnnotationStore::new();
        store.add(bbox(1, 0.0, 0.0, 10.0, 10.0));
        store.select(Some(1));
        assert_eq!(store.selected(), Some(1));
        store.select(Some(5));
        assert_eq!(store.selected(), None);
    }

    #[test]
    fn test_hit_test_last_drawn_wins() {
        let mut store = AnnotationStore::new();
        store.add(bbox(1, 0.0, 0.0, 100.0, 100.0));
        store.add(bbox(2, 50.0, 50.0, 100.0, 100.0));
        assert_eq!(store.hit_test(&Point::new(75.0, 75.0), 8.0), Some(2));
        assert_eq!(store.hit_test(&Point::new(25.0, 25.0), 8.0), Some(1));
        assert_eq!(store.hit_test(&Point::new(300.0, 300.0), 8.0), None);
    }

    #[test]
    fn test_hit_test_keypoint_radius() {
        let mut store = AnnotationStore::new();
        store.add(keypoint(1, 100.0, 100.0, 0, None));
        assert_eq!(store.hit_test(&Point::new(108.0, 100.0), 8.0), Some(1));
        assert_eq!(store.hit_test(&Point::new(109.0, 100.0), 8.0), None);
    }

    #[test]
    fn test_next_keypoint_index_skips_gaps() {
        let mut store = AnnotationStore::new();
        store.add(bbox(1, 0.0, 0.0, 100.0, 100.0));
        store.add(keypoint(2, 10.0, 10.0, 0, Some(1)));
        store.add(keypoint(3, 20.0, 20.0, 2, Some(1)));
        assert_eq!(store.next_keypoint_index(1), 3);
    }

    #[test]
    fn test_next_keypoint_index_counts_contained_unparented() {
        let mut store = AnnotationStore::new();
        store.add(bbox(1, 0.0, 0.0, 100.0, 100.0));
        store.add(bbox(2, 500.0, 500.0, 10.0, 10.0));
        store.add(keypoint(3, 10.0, 10.0, 4, None));
        // Parented elsewhere, inside box 1: not a sibling.
        store.add(keypoint(4, 20.0, 20.0, 9, Some(2)));
        assert_eq!(store.next_keypoint_index(1), 5);
        assert_eq!(store.next_keypoint_index(2), 10);
    }

    #[test]
    fn test_next_keypoint_index_empty_and_non_box() {
        let mut store = AnnotationStore::new();
        store.add(bbox(1, 0.0, 0.0, 100.0, 100.0));
        store.add(keypoint(2, 500.0, 500.0, 3, None));
        assert_eq!(store.next_keypoint_index(1), 0);
        assert_eq!(store.next_keypoint_index(2), 0);
        assert_eq!(store.next_keypoint_index(77), 0);
    }
}
