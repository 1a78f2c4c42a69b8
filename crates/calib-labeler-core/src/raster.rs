use image::{GrayImage, Rgb, RgbImage};

/// Borrowed row-major 8-bit gray image.
#[derive(Clone, Copy, Debug)]
pub struct GrayImageView<'a> {
    pub width: usize,
    pub height: usize,
    pub data: &'a [u8], // len = w*h
}

impl<'a> From<&'a GrayImage> for GrayImageView<'a> {
    fn from(img: &'a GrayImage) -> Self {
        Self {
            width: img.width() as usize,
            height: img.height() as usize,
            data: img.as_raw(),
        }
    }
}

impl GrayImageView<'_> {
    /// Pixel value with zero outside the image.
    #[inline]
    pub fn get(&self, x: i32, y: i32) -> u8 {
        if x < 0 || y < 0 || x >= self.width as i32 || y >= self.height as i32 {
            return 0;
        }
        self.data[y as usize * self.width + x as usize]
    }
}

/// Luma conversion of an 8-bit RGB frame.
pub fn gray_from_rgb(rgb: &RgbImage) -> GrayImage {
    image::imageops::grayscale(rgb)
}

/// Bilinear sample with pixel centers at integer coordinates.
#[inline]
pub fn sample_bilinear(src: &GrayImageView<'_>, x: f32, y: f32) -> f32 {
    let x0 = x.floor() as i32;
    let y0 = y.floor() as i32;
    let fx = x - x0 as f32;
    let fy = y - y0 as f32;

    let p00 = src.get(x0, y0) as f32;
    let p10 = src.get(x0 + 1, y0) as f32;
    let p01 = src.get(x0, y0 + 1) as f32;
    let p11 = src.get(x0 + 1, y0 + 1) as f32;

    let a = p00 + fx * (p10 - p00);
    let b = p01 + fx * (p11 - p01);
    a + fy * (b - a)
}

/// Axis-aligned cross centered on `(x, y)`, clipped to the image.
pub fn draw_cross(img: &mut RgbImage, x: f32, y: f32, half: i32, color: Rgb<u8>) {
    let (cx, cy) = (x.round() as i32, y.round() as i32);
    let (w, h) = (img.width() as i32, img.height() as i32);
    for d in -half..=half {
        for (px, py) in [(cx + d, cy), (cx, cy + d)] {
            if px >= 0 && py >= 0 && px < w && py < h {
                img.put_pixel(px as u32, py as u32, color);
            }
        }
    }
}
