use image::{GrayImage, Luma};

/// Floating-point copy of a grayscale image, row-major.
#[derive(Clone, Debug)]
pub struct GrayF32 {
    pub width: usize,
    pub height: usize,
    pub data: Vec<f32>,
}

impl GrayF32 {
    pub fn from_gray(img: &GrayImage) -> Self {
        let (w, h) = img.dimensions();
        Self {
            width: w as usize,
            height: h as usize,
            data: img.as_raw().iter().map(|&v| v as f32).collect(),
        }
    }

    /// Stretch the intensity range to `[0, 255]`. Flat images are left as is.
    pub fn normalize_contrast(&mut self) {
        let (lo, hi) = self
            .data
            .iter()
            .fold((f32::MAX, f32::MIN), |(lo, hi), &v| (lo.min(v), hi.max(v)));
        let span = hi - lo;
        if span <= f32::EPSILON {
            return;
        }
        let scale = 255.0 / span;
        for v in &mut self.data {
            *v = (*v - lo) * scale;
        }
    }

    /// Round back to an 8-bit image.
    pub fn to_gray(&self) -> GrayImage {
        GrayImage::from_fn(self.width as u32, self.height as u32, |x, y| {
            Luma([self.get(x as usize, y as usize).round().clamp(0.0, 255.0) as u8])
        })
    }

    #[inline]
    pub fn get(&self, x: usize, y: usize) -> f32 {
        self.data[y * self.width + x]
    }

    /// Pixel value with coordinates clamped to the image border.
    #[inline]
    pub fn get_clamped(&self, x: i64, y: i64) -> f32 {
        let x = x.clamp(0, self.width as i64 - 1) as usize;
        let y = y.clamp(0, self.height as i64 - 1) as usize;
        self.get(x, y)
    }

    /// Bilinear sample; pixel centers sit at integer coordinates.
    #[inline]
    pub fn sample_bilinear(&self, x: f64, y: f64) -> f32 {
        let x0 = x.floor();
        let y0 = y.floor();
        let fx = (x - x0) as f32;
        let fy = (y - y0) as f32;
        let (x0, y0) = (x0 as i64, y0 as i64);

        let p00 = self.get_clamped(x0, y0);
        let p10 = self.get_clamped(x0 + 1, y0);
        let p01 = self.get_clamped(x0, y0 + 1);
        let p11 = self.get_clamped(x0 + 1, y0 + 1);

        let a = p00 + fx * (p10 - p00);
        let b = p01 + fx * (p11 - p01);
        a + fy * (b - a)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn contrast_is_stretched() {
        let img = GrayImage::from_raw(2, 1, vec![100, 150]).unwrap();
        let mut g = GrayF32::from_gray(&img);
        g.normalize_contrast();
        assert_eq!(g.data, vec![0.0, 255.0]);
        assert_eq!(g.to_gray().as_raw(), &vec![0u8, 255]);
    }

    #[test]
    fn bilinear_interpolates_between_pixels() {
        let img = GrayImage::from_raw(2, 2, vec![0, 100, 100, 200]).unwrap();
        let g = GrayF32::from_gray(&img);
        assert!((g.sample_bilinear(0.5, 0.5) - 100.0).abs() < 1e-4);
        assert!((g.sample_bilinear(0.25, 0.0) - 25.0).abs() < 1e-4);
        // Clamped outside.
        assert_eq!(g.sample_bilinear(-3.0, -3.0), 0.0);
    }
}
