//! Pointer gestures and the geometry they apply.

use crate::model::{Annotation, AnnotationId, BoundingBox, Point, Size};

/// Corner handle of a selected box.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Handle {
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
}

impl Handle {
    /// Handles in hit-test priority order.
    pub const ALL: [Handle; 4] = [
        Handle::TopLeft,
        Handle::TopRight,
        Handle::BottomLeft,
        Handle::BottomRight,
    ];

    /// Position of this corner on a box.
    pub fn corner(self, rect: &BoundingBox) -> Point {
        match self {
            Handle::TopLeft => Point::new(rect.x, rect.y),
            Handle::TopRight => Point::new(rect.right(), rect.y),
            Handle::BottomLeft => Point::new(rect.x, rect.bottom()),
            Handle::BottomRight => Point::new(rect.right(), rect.bottom()),
        }
    }

    /// First handle whose square of half-size `radius` contains `point`.
    pub fn hit(rect: &BoundingBox, point: &Point, radius: f64) -> Option<Handle> {
        Self::ALL.into_iter().find(|handle| {
            let c = handle.corner(rect);
            (point.x - c.x).abs() <= radius && (point.y - c.y).abs() <= radius
        })
    }
}

/// Apply a corner drag to a box.
///
/// Edges attached to the handle move by the delta. A negative extent flips
/// the anchor, then the result is clipped to the image.
pub fn resize_box(initial: &BoundingBox, handle: Handle, dx: f64, dy: f64, bounds: Size) -> BoundingBox {
    let mut rect = *initial;
    match handle {
        Handle::TopLeft => {
            rect.x += dx;
            rect.y += dy;
            rect.width -= dx;
            rect.height -= dy;
        }
        Handle::TopRight => {
            rect.y += dy;
            rect.width += dx;
            rect.height -= dy;
        }
        Handle::BottomLeft => {
            rect.x += dx;
            rect.width -= dx;
            rect.height += dy;
        }
        Handle::BottomRight => {
            rect.width += dx;
            rect.height += dy;
        }
    }
    rect.normalized().clipped_to(bounds)
}

/// Translate a box, keeping it entirely inside the image.
pub fn move_box(initial: &BoundingBox, dx: f64, dy: f64, bounds: Size) -> BoundingBox {
    let max_x = (bounds.width - initial.width).max(0.0);
    let max_y = (bounds.height - initial.height).max(0.0);
    BoundingBox::new(
        (initial.x + dx).clamp(0.0, max_x),
        (initial.y + dy).clamp(0.0, max_y),
        initial.width,
        initial.height,
    )
}

/// Translate a point, clamped to the image.
pub fn move_point(initial: Point, dx: f64, dy: f64, bounds: Size) -> Point {
    bounds.clamp_point(Point::new(initial.x + dx, initial.y + dy))
}

/// The pointer gesture in progress. At most one exists at a time.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Gesture {
    #[default]
    Idle,
    /// Dragging out a new box.
    Drawing { anchor: Point, current: Point },
    /// Translating an annotation. `initial` is its state at press time.
    Moving {
        id: AnnotationId,
        start: Point,
        initial: Annotation,
    },
    /// Dragging a corner of a box.
    Resizing {
        id: AnnotationId,
        handle: Handle,
        start: Point,
        initial: BoundingBox,
    },
}

impl Gesture {
    pub fn is_idle(&self) -> bool {
        matches!(self, Gesture::Idle)
    }

    /// Whether an existing annotation is being edited by the pointer.
    pub fn is_drag(&self) -> bool {
        matches!(self, Gesture::Moving { .. } | Gesture::Resizing { .. })
    }

    pub fn is_drawing(&self) -> bool {
        matches!(self, Gesture::Drawing { .. })
    }

    /// Annotation targeted by a drag.
    pub fn target(&self) -> Option<AnnotationId> {
        match self {
            Gesture::Moving { id, .. } | Gesture::Resizing { id, .. } => Some(*id),
            Gesture::Idle | Gesture::Drawing { .. } => None,
        }
    }

    /// Live rectangle while drawing.
    pub fn candidate_rect(&self) -> Option<BoundingBox> {
        match self {
            Gesture::Drawing { anchor, current } => Some(BoundingBox::from_corners(*anchor, *current)),
            _ => None,
        }
    }

    /// Short name used in log output.
    pub fn name(&self) -> &'static str {
        match self {
            Gesture::Idle => "idle",
            Gesture::Drawing { .. } => "drawing",
            Gesture::Moving { .. } => "moving",
            Gesture::Resizing { .. } => "resizing",
        }
    }
}
