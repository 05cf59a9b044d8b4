//! Annotation data model.
//!
//! This module provides the core types for image annotations:
//! - Geometry types in natural (original image) pixel space
//! - The `Annotation` tagged union of boxes and keypoints
//! - The id generator used for new annotations
//!
//! The serde representation matches the backend wire format: an internally
//! tagged object with `"type": "bbox" | "keypoint"` and camelCase fields.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use web_time::{SystemTime, UNIX_EPOCH};

/// Unique identifier for an annotation.
pub type AnnotationId = u64;

// ============================================================================
// Core Geometry Types
// ============================================================================

/// A 2D point in natural image coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Calculate distance to another point.
    pub fn distance_to(&self, other: &Point) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }
}

/// Width and height of an image in natural pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    /// Clamp a point into `[0, width] x [0, height]`.
    pub fn clamp_point(&self, point: Point) -> Point {
        Point::new(
            point.x.clamp(0.0, self.width.max(0.0)),
            point.y.clamp(0.0, self.height.max(0.0)),
        )
    }
}

/// An axis-aligned rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct BoundingBox {
    /// Top-left corner X coordinate
    pub x: f64,
    /// Top-left corner Y coordinate
    pub y: f64,
    /// Width of the box
    pub width: f64,
    /// Height of the box
    pub height: f64,
}

impl BoundingBox {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Create a bounding box from two corner points.
    pub fn from_corners(p1: Point, p2: Point) -> Self {
        let x = p1.x.min(p2.x);
        let y = p1.y.min(p2.y);
        let width = (p1.x - p2.x).abs();
        let height = (p1.y - p2.y).abs();
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Check if a point is inside the box (edges inclusive).
    pub fn contains(&self, point: &Point) -> bool {
        point.x >= self.x
            && point.x <= self.x + self.width
            && point.y >= self.y
            && point.y <= self.y + self.height
    }

    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    /// Flip the anchor on any axis with a negative extent so that width and
    /// height become non-negative while covering the same area.
    pub fn normalized(mut self) -> Self {
        if self.width < 0.0 {
            self.x += self.width;
            self.width = self.width.abs();
        }
        if self.height < 0.0 {
            self.y += self.height;
            self.height = self.height.abs();
        }
        self
    }

    /// Shrink the box so it lies within `bounds`, keeping edges that are
    /// already inside where they are.
    pub fn clipped_to(mut self, bounds: Size) -> Self {
        if self.x < 0.0 {
            self.width += self.x;
            self.x = 0.0;
        }
        if self.y < 0.0 {
            self.height += self.y;
            self.y = 0.0;
        }
        if self.right() > bounds.width {
            self.width = bounds.width - self.x;
        }
        if self.bottom() > bounds.height {
            self.height = bounds.height - self.y;
        }
        self.width = self.width.max(0.0);
        self.height = self.height.max(0.0);
        self
    }
}

// ============================================================================
// Annotation Types
// ============================================================================

/// A rectangular annotation with an optional class index.
///
/// Keys this type does not model are kept in `extra` and written back on
/// save, as is an explicit `"classIndex": null`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "BoxRecord", into = "BoxRecord")]
pub struct BoxAnnotation {
    pub id: AnnotationId,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub label: String,
    /// `None` means unclassified.
    pub class_index: Option<u32>,
    pub extra: Map<String, Value>,
    /// The record carried `"classIndex": null` rather than no key.
    null_class_index: bool,
}

impl BoxAnnotation {
    pub fn new(id: AnnotationId, rect: BoundingBox) -> Self {
        Self {
            id,
            x: rect.x,
            y: rect.y,
            width: rect.width,
            height: rect.height,
            label: String::new(),
            class_index: None,
            extra: Map::new(),
            null_class_index: false,
        }
    }

    pub fn rect(&self) -> BoundingBox {
        BoundingBox::new(self.x, self.y, self.width, self.height)
    }

    pub fn set_rect(&mut self, rect: BoundingBox) {
        self.x = rect.x;
        self.y = rect.y;
        self.width = rect.width;
        self.height = rect.height;
    }

    /// Class index shown to the user; unclassified boxes display as class 0.
    pub fn display_class(&self) -> u32 {
        self.class_index.unwrap_or(0)
    }
}

/// A point annotation, optionally owned by a box.
///
/// Unknown keys round-trip through `extra`. A new keypoint writes
/// `"parentId": null`; a loaded one keeps whatever form it came with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "KeypointRecord", into = "KeypointRecord")]
pub struct KeypointAnnotation {
    pub id: AnnotationId,
    pub x: f64,
    pub y: f64,
    pub label: String,
    pub keypoint_index: u32,
    pub parent_id: Option<AnnotationId>,
    pub extra: Map<String, Value>,
    /// Write `"parentId": null` when unparented.
    null_parent_id: bool,
}

impl KeypointAnnotation {
    pub fn new(id: AnnotationId, position: Point, keypoint_index: u32) -> Self {
        Self {
            id,
            x: position.x,
            y: position.y,
            label: String::new(),
            keypoint_index,
            parent_id: None,
            extra: Map::new(),
            null_parent_id: true,
        }
    }

    pub fn position(&self) -> Point {
        Point::new(self.x, self.y)
    }

    pub fn set_position(&mut self, position: Point) {
        self.x = position.x;
        self.y = position.y;
    }

    /// Set or clear the owning box. A cleared parent is written as `null`.
    pub fn set_parent(&mut self, parent: Option<AnnotationId>) {
        self.parent_id = parent;
        self.null_parent_id |= parent.is_none();
    }
}

// ============================================================================
// Wire Records
// ============================================================================

/// Deserialize a present key as `Some`, keeping `null` apart from a missing key.
fn present<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

fn nullable<T>(value: Option<T>, write_null: bool) -> Option<Option<T>> {
    match value {
        Some(v) => Some(Some(v)),
        None if write_null => Some(None),
        None => None,
    }
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BoxRecord {
    id: AnnotationId,
    x: f64,
    y: f64,
    width: f64,
    height: f64,
    #[serde(default)]
    label: String,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    class_index: Option<Option<u32>>,
    #[serde(flatten)]
    extra: Map<String, Value>,
}

impl From<BoxRecord> for BoxAnnotation {
    fn from(r: BoxRecord) -> Self {
        Self {
            id: r.id,
            x: r.x,
            y: r.y,
            width: r.width,
            height: r.height,
            label: r.label,
            class_index: r.class_index.flatten(),
            extra: r.extra,
            null_class_index: r.class_index == Some(None),
        }
    }
}

impl From<BoxAnnotation> for BoxRecord {
    fn from(b: BoxAnnotation) -> Self {
        Self {
            id: b.id,
            x: b.x,
            y: b.y,
            width: b.width,
            height: b.height,
            label: b.label,
            class_index: nullable(b.class_index, b.null_class_index),
            extra: b.extra,
        }
    }
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct KeypointRecord {
    id: AnnotationId,
    x: f64,
    y: f64,
    #[serde(default)]
    label: String,
    #[serde(default)]
    keypoint_index: u32,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    parent_id: Option<Option<AnnotationId>>,
    #[serde(flatten)]
    extra: Map<String, Value>,
}

impl From<KeypointRecord> for KeypointAnnotation {
    fn from(r: KeypointRecord) -> Self {
        Self {
            id: r.id,
            x: r.x,
            y: r.y,
            label: r.label,
            keypoint_index: r.keypoint_index,
            parent_id: r.parent_id.flatten(),
            extra: r.extra,
            null_parent_id: r.parent_id == Some(None),
        }
    }
}

impl From<KeypointAnnotation> for KeypointRecord {
    fn from(k: KeypointAnnotation) -> Self {
        Self {
            id: k.id,
            x: k.x,
            y: k.y,
            label: k.label,
            keypoint_index: k.keypoint_index,
            parent_id: nullable(k.parent_id, k.null_parent_id),
            extra: k.extra,
        }
    }
}

/// Decode an annotation array record by record.
///
/// Records that do not parse (an unknown `type`, a negative index, a
/// missing coordinate) are skipped with a warning so one bad entry does not
/// hide the rest of the image's annotations.
pub fn decode_records(records: Vec<Value>) -> Vec<Annotation> {
    let total = records.len();
    let annotations: Vec<Annotation> = records
        .into_iter()
        .enumerate()
        .filter_map(|(i, record)| match serde_json::from_value(record) {
            Ok(annotation) => Some(annotation),
            Err(e) => {
                log::warn!("Skipping annotation record {}: {}", i, e);
                None
            }
        })
        .collect();
    if annotations.len() < total {
        log::warn!("Kept {} of {} annotation records", annotations.len(), total);
    }
    annotations
}

/// A single annotation on an image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Annotation {
    #[serde(rename = "bbox")]
    Box(BoxAnnotation),
    #[serde(rename = "keypoint")]
    Keypoint(KeypointAnnotation),
}

impl Annotation {
    pub fn id(&self) -> AnnotationId {
        match self {
            Annotation::Box(b) => b.id,
            Annotation::Keypoint(k) => k.id,
        }
    }

    /// Short name of the variant, used in log output.
    pub fn kind(&self) -> &'static str {
        match self {
            Annotation::Box(_) => "bbox",
            Annotation::Keypoint(_) => "keypoint",
        }
    }

    pub fn label(&self) -> &str {
        match self {
            Annotation::Box(b) => &b.label,
            Annotation::Keypoint(k) => &k.label,
        }
    }

    pub fn is_box(&self) -> bool {
        matches!(self, Annotation::Box(_))
    }

    pub fn as_box(&self) -> Option<&BoxAnnotation> {
        match self {
            Annotation::Box(b) => Some(b),
            Annotation::Keypoint(_) => None,
        }
    }

    pub fn as_keypoint(&self) -> Option<&KeypointAnnotation> {
        match self {
            Annotation::Keypoint(k) => Some(k),
            Annotation::Box(_) => None,
        }
    }

    /// Top-left corner for boxes, the point itself for keypoints.
    pub fn origin(&self) -> Point {
        match self {
            Annotation::Box(b) => Point::new(b.x, b.y),
            Annotation::Keypoint(k) => k.position(),
        }
    }
}

impl From<BoxAnnotation> for Annotation {
    fn from(b: BoxAnnotation) -> Self {
        Annotation::Box(b)
    }
}

impl From<KeypointAnnotation> for Annotation {
    fn from(k: KeypointAnnotation) -> Self {
        Annotation::Keypoint(k)
    }
}

// ============================================================================
// Id Generation
// ============================================================================

/// Issues annotation ids.
///
/// Ids are seeded from wall-clock milliseconds, matching the ids already
/// stored by the backend, and are strictly increasing: every id is greater
/// than any id issued before or passed to [`IdGenerator::observe`].
#[derive(Debug, Clone, Default)]
pub struct IdGenerator {
    last: AnnotationId,
}

impl IdGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an id that already exists so it is never issued again.
    pub fn observe(&mut self, id: AnnotationId) {
        self.last = self.last.max(id);
    }

    /// Issue a fresh id.
    pub fn next_id(&mut self) -> AnnotationId {
        let id = now_millis().max(self.last.saturating_add(1));
        self.last = id;
        id
    }
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
        .unwrap_or(0)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bounding_box_from_corners() {
        let bbox = BoundingBox::from_corners(Point::new(10.0, 20.0), Point::new(50.0, 80.0));
        assert_eq!(bbox, BoundingBox::new(10.0, 20.0, 40.0, 60.0));

        // Reversed corners give the same box
        let bbox2 = BoundingBox::from_corners(Point::new(50.0, 80.0), Point::new(10.0, 20.0));
        assert_eq!(bbox, bbox2);
    }

    #[test]
    fn test_bounding_box_contains_edges() {
        let bbox = BoundingBox::new(10.0, 10.0, 100.0, 100.0);
        assert!(bbox.contains(&Point::new(50.0, 50.0)));
        assert!(bbox.contains(&Point::new(10.0, 10.0)));
        assert!(bbox.contains(&Point::new(110.0, 110.0)));
        assert!(!bbox.contains(&Point::new(5.0, 50.0)));
    }

    #[test]
    fn test_normalized_flips_anchor() {
        let bbox = BoundingBox::new(50.0, 50.0, -20.0, -10.0).normalized();
        assert_eq!(bbox, BoundingBox::new(30.0, 40.0, 20.0, 10.0));
    }

    #[test]
    fn test_clipped_to_shrinks_instead_of_translating() {
        let bounds = Size::new(100.0, 100.0);
        let bbox = BoundingBox::new(-10.0, 90.0, 30.0, 30.0).clipped_to(bounds);
        assert_eq!(bbox, BoundingBox::new(0.0, 90.0, 20.0, 10.0));
    }

    #[test]
    fn test_wire_format_box() {
        let json = r#"{"id":1700000000000,"type":"bbox","x":10,"y":20,"width":30,"height":40,"label":"Object","classIndex":2}"#;
        let ann: Annotation = serde_json::from_str(json).unwrap();
        let Annotation::Box(b) = &ann else {
            panic!("expected a box");
        };
        assert_eq!(b.id, 1_700_000_000_000);
        assert_eq!(b.rect(), BoundingBox::new(10.0, 20.0, 30.0, 40.0));
        assert_eq!(b.class_index, Some(2));

        let value = serde_json::to_value(&ann).unwrap();
        assert_eq!(value["type"], "bbox");
        assert_eq!(value["classIndex"], 2);
    }

    #[test]
    fn test_wire_format_keypoint_defaults() {
        let json = r#"{"id":5,"type":"keypoint","x":1.5,"y":2.5,"parentId":null}"#;
        let ann: Annotation = serde_json::from_str(json).unwrap();
        let kp = ann.as_keypoint().unwrap();
        assert_eq!(kp.keypoint_index, 0);
        assert_eq!(kp.parent_id, None);
        assert!(kp.label.is_empty());

        let value = serde_json::to_value(&ann).unwrap();
        assert_eq!(value["type"], "keypoint");
        assert!(value["parentId"].is_null());
        assert_eq!(value["keypointIndex"], 0);
    }

    #[test]
    fn test_unclassified_box_omits_class_index() {
        let ann = Annotation::Box(BoxAnnotation::new(1, BoundingBox::new(0.0, 0.0, 1.0, 1.0)));
        let value = serde_json::to_value(&ann).unwrap();
        assert!(value.get("classIndex").is_none());
        assert_eq!(ann.as_box().unwrap().display_class(), 0);
    }

    #[test]
    fn test_unknown_keys_and_nulls_round_trip() {
        let wire = serde_json::json!([
            {"id": 1, "type": "bbox", "x": 10.0, "y": 20.0, "width": 30.0, "height": 40.0,
             "label": "Object", "classIndex": null, "visible": true, "meta": {"by": "ann"}},
            {"id": 2, "type": "bbox", "x": 0.0, "y": 0.0, "width": 5.0, "height": 5.0,
             "label": ""},
            {"id": 3, "type": "keypoint", "x": 12.0, "y": 22.0, "label": "Keypoint",
             "keypointIndex": 1, "parentId": 1, "confidence": 0.5},
            {"id": 4, "type": "keypoint", "x": 1.0, "y": 1.0, "label": "Keypoint",
             "keypointIndex": 0}
        ]);
        let annotations: Vec<Annotation> = serde_json::from_value(wire.clone()).unwrap();
        let b = annotations[0].as_box().unwrap();
        assert_eq!(b.class_index, None);
        assert_eq!(b.extra["visible"], true);

        assert_eq!(serde_json::to_value(&annotations).unwrap(), wire);
    }

    #[test]
    fn test_new_keypoint_writes_null_parent() {
        let kp = Annotation::Keypoint(KeypointAnnotation::new(7, Point::new(1.0, 2.0), 0));
        let value = serde_json::to_value(&kp).unwrap();
        assert!(value.get("parentId").is_some_and(|v| v.is_null()));
    }

    #[test]
    fn test_decode_records_skips_bad_entries() {
        let records = vec![
            serde_json::json!({"id": 1, "type": "bbox", "x": 0, "y": 0, "width": 10, "height": 10}),
            serde_json::json!({"id": 2, "type": "keypoint", "x": 1, "y": 1, "keypointIndex": -1}),
            serde_json::json!({"id": 3, "type": "polygon", "points": []}),
            serde_json::json!({"id": 4, "type": "keypoint", "x": 2, "y": 2, "parentId": 1}),
        ];
        let annotations = decode_records(records);
        let ids: Vec<AnnotationId> = annotations.iter().map(Annotation::id).collect();
        assert_eq!(ids, vec![1, 4]);
    }

    #[test]
    fn test_id_generator_is_strictly_increasing() {
        let mut ids = IdGenerator::new();
        let mut last = 0;
        for _ in 0..1000 {
            let id = ids.next_id();
            assert!(id > last);
            last = id;
        }
    }

    #[test]
    fn test_id_generator_skips_observed_ids() {
        let mut ids = IdGenerator::new();
        ids.observe(u64::MAX / 2);
        assert_eq!(ids.next_id(), u64::MAX / 2 + 1);
    }
}
