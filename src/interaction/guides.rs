//! Crosshair guide lines following the pointer.

use crate::model::{Point, Size};

/// Last pointer position over the image, in display space.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Guides {
    position: Option<Point>,
}

impl Guides {
    /// Track a display-space position, clamped to the rendered size.
    pub fn track(&mut self, display: Point, rendered: Size) {
        self.position = Some(rendered.clamp_point(display));
    }

    pub fn hide(&mut self) {
        self.position = None;
    }

    /// Guide position, if the pointer is over the image.
    pub fn position(&self) -> Option<Point> {
        self.position
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_track_clamps_and_hide_clears() {
        let mut guides = Guides::default();
        guides.track(Point::new(-5.0, 600.0), Size::new(500.0, 400.0));
        assert_eq!(guides.position(), Some(Point::new(0.0, 400.0)));
        guides.hide();
        assert_eq!(guides.position(), None);
    }
}
