//! Natural <-> display coordinate mapping.
//!
//! Annotations are stored in the natural pixel space of the original image.
//! The rendered image may be resized to any on-screen size, so every pointer
//! position is mapped through [`CoordinateMapper`] before it touches the
//! store, and every stored geometry is projected back through it for
//! rendering.

use crate::model::{BoundingBox, Point, Size};

/// Rendered image rectangle in client (screen) coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ScreenRect {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

impl ScreenRect {
    pub fn new(left: f64, top: f64, width: f64, height: f64) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }
}

/// Per-axis display/natural ratio.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Scale {
    pub sx: f64,
    pub sy: f64,
}

impl Scale {
    pub fn identity() -> Self {
        Self { sx: 1.0, sy: 1.0 }
    }
}

impl Default for Scale {
    fn default() -> Self {
        Self::identity()
    }
}

/// Maps pointer positions between client, display and natural space.
///
/// The mapper is ready once both the rendered rectangle and the natural
/// image size are known. Scale is derived from the current rectangle on
/// every call.
#[derive(Debug, Clone, Default)]
pub struct CoordinateMapper {
    rect: Option<ScreenRect>,
    natural: Option<Size>,
}

impl CoordinateMapper {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the intrinsic size after the image loaded successfully.
    pub fn set_natural_size(&mut self, width: f64, height: f64) {
        if width > 0.0 && height > 0.0 {
            self.natural = Some(Size::new(width, height));
        } else {
            log::warn!("Ignoring invalid natural image size {}x{}", width, height);
            self.natural = None;
        }
    }

    /// Record the rendered rectangle. Call on every resize notification.
    pub fn set_rendered_rect(&mut self, rect: ScreenRect) {
        log::trace!(
            "Rendered rect: ({:.1}, {:.1}) {:.1}x{:.1}",
            rect.left,
            rect.top,
            rect.width,
            rect.height
        );
        self.rect = Some(rect);
    }

    /// Forget the current image, e.g. when navigating to another one.
    pub fn clear_image(&mut self) {
        self.natural = None;
    }

    pub fn is_ready(&self) -> bool {
        self.ready().is_some()
    }

    fn ready(&self) -> Option<(ScreenRect, Size)> {
        let rect = self.rect?;
        let natural = self.natural?;
        (rect.width > 0.0 && rect.height > 0.0).then_some((rect, natural))
    }

    /// Natural image bounds, if an image is loaded.
    pub fn natural_size(&self) -> Option<Size> {
        self.natural
    }

    /// Rendered size, if known.
    pub fn display_size(&self) -> Option<Size> {
        self.rect.map(|r| Size::new(r.width, r.height))
    }

    /// Whether a client position lies over the rendered image.
    pub fn contains_client(&self, client_x: f64, client_y: f64) -> bool {
        self.rect.is_some_and(|r| {
            client_x >= r.left
                && client_x <= r.left + r.width
                && client_y >= r.top
                && client_y <= r.top + r.height
        })
    }

    /// Map a client position to natural space, clamped to the image bounds.
    pub fn to_natural(&self, client_x: f64, client_y: f64) -> Option<Point> {
        let (rect, natural) = self.ready()?;
        let x = (client_x - rect.left) * natural.width / rect.width;
        let y = (client_y - rect.top) * natural.height / rect.height;
        Some(natural.clamp_point(Point::new(x, y)))
    }

    /// Raw offset of a client position inside the rendered element.
    pub fn to_display(&self, client_x: f64, client_y: f64) -> Option<Point> {
        let rect = self.rect?;
        Some(Point::new(client_x - rect.left, client_y - rect.top))
    }

    /// Display size divided by natural size, per axis.
    pub fn scale(&self) -> Scale {
        match self.ready() {
            Some((rect, natural)) => Scale {
                sx: rect.width / natural.width,
                sy: rect.height / natural.height,
            },
            None => Scale::identity(),
        }
    }

    /// Natural pixels per display pixel along x. Screen-space thresholds are
    /// multiplied by this so they feel the same at any render size.
    pub fn natural_per_display(&self) -> f64 {
        let scale = self.scale();
        if scale.sx > 0.0 { 1.0 / scale.sx } else { 1.0 }
    }

    /// Convert a display-pixel distance into natural pixels.
    pub fn display_to_natural_distance(&self, px: f64) -> f64 {
        px * self.natural_per_display()
    }

    /// Project a stored box into display space (relative to the image).
    pub fn project_box(&self, rect: &BoundingBox) -> BoundingBox {
        let s = self.scale();
        BoundingBox::new(
            rect.x * s.sx,
            rect.y * s.sy,
            rect.width * s.sx,
            rect.height * s.sy,
        )
    }

    /// Project a stored point into display space (relative to the image).
    pub fn project_point(&self, point: Point) -> Point {
        let s = self.scale();
        Point::new(point.x * s.sx, point.y * s.sy)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f64 = 1e-9;

    fn approx_eq(a: f64, b: f64) -> bool {
        (a - b).abs() < EPSILON
    }

    fn half_scale_mapper() -> CoordinateMapper {
        let mut mapper = CoordinateMapper::new();
        mapper.set_rendered_rect(ScreenRect::new(100.0, 50.0, 500.0, 400.0));
        mapper.set_natural_size(1000.0, 800.0);
        mapper
    }

    #[test]
    fn test_not_ready_until_both_inputs_known() {
        let mut mapper = CoordinateMapper::new();
        assert!(mapper.to_natural(0.0, 0.0).is_none());
        mapper.set_rendered_rect(ScreenRect::new(0.0, 0.0, 10.0, 10.0));
        assert!(!mapper.is_ready());
        mapper.set_natural_size(20.0, 20.0);
        assert!(mapper.is_ready());
        mapper.clear_image();
        assert!(!mapper.is_ready());
        assert_eq!(mapper.scale(), Scale::identity());
    }

    #[test]
    fn test_to_natural_scales_offset() {
        let mapper = half_scale_mapper();
        let p = mapper.to_natural(105.0, 55.0).unwrap();
        assert!(approx_eq(p.x, 10.0));
        assert!(approx_eq(p.y, 10.0));
    }

    #[test]
    fn test_to_natural_clamps_to_image() {
        let mapper = half_scale_mapper();
        let p = mapper.to_natural(0.0, 2000.0).unwrap();
        assert_eq!(p, Point::new(0.0, 800.0));
    }

    #[test]
    fn test_to_display_is_raw_offset() {
        let mapper = half_scale_mapper();
        let p = mapper.to_display(130.0, 70.0).unwrap();
        assert_eq!(p, Point::new(30.0, 20.0));
    }

    #[test]
    fn test_scale_follows_resize() {
        let mut mapper = half_scale_mapper();
        assert_eq!(mapper.scale(), Scale { sx: 0.5, sy: 0.5 });
        assert!(approx_eq(mapper.natural_per_display(), 2.0));

        mapper.set_rendered_rect(ScreenRect::new(0.0, 0.0, 2000.0, 1600.0));
        assert_eq!(mapper.scale(), Scale { sx: 2.0, sy: 2.0 });
        assert!(approx_eq(mapper.display_to_natural_distance(10.0), 5.0));
    }

    #[test]
    fn test_project_box() {
        let mapper = half_scale_mapper();
        let projected = mapper.project_box(&BoundingBox::new(10.0, 10.0, 90.0, 70.0));
        assert_eq!(projected, BoundingBox::new(5.0, 5.0, 45.0, 35.0));
    }

    #[test]
    fn test_contains_client() {
        let mapper = half_scale_mapper();
        assert!(mapper.contains_client(100.0, 50.0));
        assert!(mapper.contains_client(600.0, 450.0));
        assert!(!mapper.contains_client(99.0, 60.0));
        assert!(!mapper.contains_client(300.0, 451.0));
    }
}
