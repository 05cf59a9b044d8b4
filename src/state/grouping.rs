//! Box/keypoint grouping derived from the store.
//!
//! A keypoint belongs to a box either because its `parent_id` names the box,
//! or, when it has no parent, because it lies inside the box. The second
//! relation is computed here on every call and never written back.

use std::collections::HashMap;

use crate::model::{Annotation, AnnotationId, BoxAnnotation, KeypointAnnotation};

use super::store::AnnotationStore;

/// A box and the keypoints associated with it.
#[derive(Debug, Clone, PartialEq)]
pub struct BoxGroup<'a> {
    pub bbox: &'a BoxAnnotation,
    /// Owned and contained keypoints, in store order.
    pub children: Vec<&'a KeypointAnnotation>,
}

impl BoxGroup<'_> {
    pub fn id(&self) -> AnnotationId {
        self.bbox.id
    }
}

/// Grouping of every keypoint in the store.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Grouping<'a> {
    /// One group per box, in store order.
    pub groups: Vec<BoxGroup<'a>>,
    /// Keypoints that belong to no box.
    pub unassigned: Vec<&'a KeypointAnnotation>,
}

impl<'a> Grouping<'a> {
    /// Group the annotations of a store.
    ///
    /// Unparented keypoints go to the first containing box in store order.
    /// Keypoints parented to a box that is not present are unassigned.
    pub fn compute(store: &'a AnnotationStore) -> Self {
        let mut groups: Vec<BoxGroup<'a>> = store
            .iter()
            .filter_map(Annotation::as_box)
            .map(|bbox| BoxGroup {
                bbox,
                children: Vec::new(),
            })
            .collect();
        let index: HashMap<AnnotationId, usize> = groups
            .iter()
            .enumerate()
            .map(|(i, g)| (g.bbox.id, i))
            .collect();

        let mut unassigned = Vec::new();
        for kp in store.iter().filter_map(Annotation::as_keypoint) {
            let slot = match kp.parent_id {
                Some(parent) => index.get(&parent).copied(),
                None => {
                    let pos = kp.position();
                    groups.iter().position(|g| g.bbox.rect().contains(&pos))
                }
            };
            match slot {
                Some(i) => groups[i].children.push(kp),
                None => unassigned.push(kp),
            }
        }

        Self { groups, unassigned }
    }

    pub fn group(&self, box_id: AnnotationId) -> Option<&BoxGroup<'a>> {
        self.groups.iter().find(|g| g.bbox.id == box_id)
    }

    /// Box a keypoint is grouped under, if any.
    pub fn owner_of(&self, keypoint_id: AnnotationId) -> Option<AnnotationId> {
        self.groups
            .iter()
            .find(|g| g.children.iter().any(|k| k.id == keypoint_id))
            .map(BoxGroup::id)
    }
}

impl AnnotationStore {
    /// Convenience wrapper around [`Grouping::compute`].
    pub fn grouping(&self) -> Grouping<'_> {
        Grouping::compute(self)
    }
}
