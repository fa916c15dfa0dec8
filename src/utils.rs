//! Utility functions for image processing and coordinate transformations.

pub mod image_conversion;
pub mod safe_cast;

use opencv::core::Rect;
use safe_cast::f32_to_i32_clamp;

/// Expand a box around its center into a square crop inside the image
///
/// The side is `max(width, height) * scale`. The square is shifted back
/// inside the image where possible and finally clipped to the image bounds,
/// so the result may be non-square near the borders.
#[must_use]
#[allow(clippy::cast_precision_loss)] // Pixel dimensions are small
pub fn square_crop(bbox: Rect, scale: f32, max_width: i32, max_height: i32) -> Rect {
    let side = f32_to_i32_clamp(bbox.width.max(bbox.height) as f32 * scale, 1, max_width.max(max_height).max(1));
    let cx = bbox.x as f32 + bbox.width as f32 / 2.0;
    let cy = bbox.y as f32 + bbox.height as f32 / 2.0;

    let mut x = f32_to_i32_clamp(cx - side as f32 / 2.0, i32::MIN / 2, i32::MAX / 2);
    let mut y = f32_to_i32_clamp(cy - side as f32 / 2.0, i32::MIN / 2, i32::MAX / 2);

    // Shift inside the image
    if x + side > max_width {
        x = max_width - side;
    }
    if y + side > max_height {
        y = max_height - side;
    }
    x = x.max(0);
    y = y.max(0);

    Rect::new(x, y, side.min(max_width - x), side.min(max_height - y))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_square_crop_centered() {
        let crop = square_crop(Rect::new(100, 100, 40, 60), 1.5, 640, 480);
        assert_eq!(crop.width, 90);
        assert_eq!(crop.height, 90);
        // Center preserved: (120, 130)
        assert_eq!(crop.x + crop.width / 2, 120);
        assert_eq!(crop.y + crop.height / 2, 130);
    }

    #[test]
    fn test_square_crop_shifted_inside() {
        let crop = square_crop(Rect::new(600, 440, 40, 40), 1.5, 640, 480);
        assert_eq!(crop, Rect::new(580, 420, 60, 60));

        let crop = square_crop(Rect::new(0, 0, 20, 20), 2.0, 640, 480);
        assert_eq!(crop, Rect::new(0, 0, 40, 40));
    }

    #[test]
    fn test_square_crop_clipped_to_small_image() {
        let crop = square_crop(Rect::new(0, 0, 100, 100), 1.5, 120, 80);
        assert!(crop.x >= 0 && crop.y >= 0);
        assert!(crop.x + crop.width <= 120);
        assert!(crop.y + crop.height <= 80);
        assert!(crop.width > 0 && crop.height > 0);
    }
}
