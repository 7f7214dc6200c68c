/// Annotation space -> display space transform
///
/// Width and height are clamped independently and never upscaled, so the
/// displayed image may change aspect ratio.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScaleTransform {
    pub display_width: u32,
    pub display_height: u32,
    /// original / display, always >= 1.0
    pub scale_x: f64,
    pub scale_y: f64,
}

impl ScaleTransform {
    /// Transform for an image shown at its original size
    pub fn identity(width: u32, height: u32) -> Self {
        Self {
            display_width: width,
            display_height: height,
            scale_x: 1.0,
            scale_y: 1.0,
        }
    }

    pub fn display_size(&self) -> (u32, u32) {
        (self.display_width, self.display_height)
    }

    pub fn is_identity(&self) -> bool {
        self.scale_x == 1.0 && self.scale_y == 1.0
    }

    pub fn transform_point(&self, x: i32, y: i32) -> (i32, i32) {
        (
            (x as f64 / self.scale_x).round() as i32,
            (y as f64 / self.scale_y).round() as i32,
        )
    }
}

/// Compute the display size and scale factors for an image
pub fn compute_scale(
    orig_width: u32,
    orig_height: u32,
    max_width: Option<u32>,
    max_height: Option<u32>,
) -> ScaleTransform {
    let (display_width, scale_x) = clamp_axis(orig_width, max_width);
    let (display_height, scale_y) = clamp_axis(orig_height, max_height);
    ScaleTransform {
        display_width,
        display_height,
        scale_x,
        scale_y,
    }
}

fn clamp_axis(original: u32, max: Option<u32>) -> (u32, f64) {
    let display = match max {
        Some(max) if max < original => max,
        _ => original,
    };
    if display == 0 {
        return (display, 1.0);
    }
    (display, original as f64 / display as f64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_downscale() {
        let transform = compute_scale(800, 600, Some(400), Some(300));
        assert_eq!(transform.display_size(), (400, 300));
        assert_eq!(transform.scale_x, 2.0);
        assert_eq!(transform.scale_y, 2.0);
        assert_eq!(transform.transform_point(100, 100), (50, 50));
        assert_eq!(transform.transform_point(200, 200), (100, 100));
    }

    #[test]
    fn test_never_upscales() {
        for max in [640, 641, 5000] {
            let transform = compute_scale(640, 480, Some(max), None);
            assert_eq!(transform.display_width, 640);
            assert_eq!(transform.display_height, 480);
            assert!(transform.is_identity());
        }
    }

    #[test]
    fn test_axes_clamp_independently() {
        let transform = compute_scale(1000, 500, Some(500), Some(800));
        assert_eq!(transform.display_size(), (500, 500));
        assert_eq!(transform.scale_x, 2.0);
        assert_eq!(transform.scale_y, 1.0);
    }

    #[test]
    fn test_round_trip_bound() {
        for (w, h) in [(800, 600), (1023, 767), (353, 500), (1, 1), (4096, 17)] {
            for (mw, mh) in [(w, h), (w / 2 + 1, h / 3 + 1), (1, 1), (w - w / 7, h - h / 5)] {
                let transform = compute_scale(w, h, Some(mw), Some(mh));
                assert!(transform.scale_x >= 1.0 && transform.scale_y >= 1.0);
                assert_eq!(transform.transform_point(0, 0), (0, 0));

                let (x, y) = transform.transform_point(w as i32, h as i32);
                assert!((x - transform.display_width as i32).abs() <= 1);
                assert!((y - transform.display_height as i32).abs() <= 1);
            }
        }
    }

    #[test]
    fn test_zero_sized_image() {
        let transform = compute_scale(0, 0, Some(100), Some(100));
        assert_eq!(transform.display_size(), (0, 0));
        assert!(transform.is_identity());
    }
}
