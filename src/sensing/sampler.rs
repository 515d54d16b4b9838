use image::RgbaImage;

use crate::matching::Rgb;

/// A decoded video frame that can hand out RGBA bytes for a region.
pub trait Frame: Send + Sync {
    fn width(&self) -> u32;
    fn height(&self) -> u32;

    /// Row-major RGBA bytes for the region. The region is always inside
    /// the frame when called from [`average_color`].
    fn read_region(&self, x: u32, y: u32, width: u32, height: u32) -> Vec<u8>;
}

impl Frame for RgbaImage {
    fn width(&self) -> u32 {
        self.dimensions().0
    }

    fn height(&self) -> u32 {
        self.dimensions().1
    }

    fn read_region(&self, x: u32, y: u32, width: u32, height: u32) -> Vec<u8> {
        let row_end = y.saturating_add(height).min(self.height());
        let col_end = x.saturating_add(width).min(self.width());
        let pixels = row_end.saturating_sub(y) as usize * col_end.saturating_sub(x) as usize;
        let mut bytes = Vec::with_capacity(pixels * 4);
        for row in y..row_end {
            for col in x..col_end {
                bytes.extend_from_slice(&self.get_pixel(col, row).0);
            }
        }
        bytes
    }
}

/// Square region of side `sample_size` centered on the frame, clamped to
/// the frame bounds. Returns `(x, y, width, height)`.
pub fn center_region(frame_width: u32, frame_height: u32, sample_size: u32) -> (u32, u32, u32, u32) {
    let origin = |dim: u32| -> u32 {
        let start = (dim as f64 / 2.0 - sample_size as f64 / 2.0).floor();
        start.max(0.0) as u32
    };
    let x = origin(frame_width);
    let y = origin(frame_height);
    let width = sample_size.min(frame_width - x);
    let height = sample_size.min(frame_height - y);
    (x, y, width, height)
}

/// Mean RGB over the center sample, alpha ignored.
///
/// `None` for a zero-sized frame or an empty read, which is normal while
/// the camera warms up.
pub fn average_color(frame: &dyn Frame, sample_size: u32) -> Option<Rgb> {
    let (frame_width, frame_height) = (frame.width(), frame.height());
    if frame_width == 0 || frame_height == 0 || sample_size == 0 {
        return None;
    }

    let (x, y, width, height) = center_region(frame_width, frame_height, sample_size);
    let pixels = frame.read_region(x, y, width, height);

    let mut totals = [0u64; 3];
    let mut count = 0u64;
    for px in pixels.chunks_exact(4) {
        totals[0] += u64::from(px[0]);
        totals[1] += u64::from(px[1]);
        totals[2] += u64::from(px[2]);
        count += 1;
    }

    if count == 0 {
        return None;
    }

    let count = count as f64;
    Some(Rgb::new(
        totals[0] as f64 / count,
        totals[1] as f64 / count,
        totals[2] as f64 / count,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    #[test]
    fn uniform_frame_returns_exact_color() {
        let frame = RgbaImage::from_pixel(640, 480, Rgba([200, 30, 30, 255]));
        let avg = average_color(&frame, 50).unwrap();
        assert_eq!(avg, Rgb::new(200.0, 30.0, 30.0));
    }

    #[test]
    fn empty_frame_has_no_sample() {
        let frame = RgbaImage::new(0, 0);
        assert!(average_color(&frame, 50).is_none());
    }

    #[test]
    fn sample_is_clamped_to_small_frames() {
        assert_eq!(center_region(20, 10, 50), (0, 0, 20, 10));
        assert_eq!(center_region(640, 480, 50), (295, 215, 50, 50));
        assert_eq!(center_region(51, 51, 50), (0, 0, 50, 50));

        let frame = RgbaImage::from_pixel(8, 6, Rgba([10, 20, 30, 0]));
        assert_eq!(average_color(&frame, 50), Some(Rgb::new(10.0, 20.0, 30.0)));
    }

    #[test]
    fn oversized_region_reads_only_frame_pixels() {
        let frame = RgbaImage::from_pixel(4, 3, Rgba([1, 2, 3, 255]));
        assert_eq!(frame.read_region(0, 0, u32::MAX, u32::MAX).len(), 4 * 3 * 4);
        assert_eq!(frame.read_region(2, 1, 70_000, 70_000).len(), 2 * 2 * 4);
        assert!(frame.read_region(9, 9, 5, 5).is_empty());
        assert_eq!(average_color(&frame, u32::MAX), Some(Rgb::new(1.0, 2.0, 3.0)));
    }

    #[test]
    fn only_the_center_is_sampled() {
        let mut frame = RgbaImage::from_pixel(100, 100, Rgba([0, 0, 255, 255]));
        for y in 45..55 {
            for x in 45..55 {
                frame.put_pixel(x, y, Rgba([255, 255, 0, 255]));
            }
        }
        assert_eq!(average_color(&frame, 10), Some(Rgb::new(255.0, 255.0, 0.0)));
    }

    #[test]
    fn mixed_region_is_averaged() {
        let mut frame = RgbaImage::from_pixel(2, 1, Rgba([0, 0, 0, 255]));
        frame.put_pixel(1, 0, Rgba([100, 50, 10, 255]));
        assert_eq!(average_color(&frame, 2), Some(Rgb::new(50.0, 25.0, 5.0)));
    }
}
