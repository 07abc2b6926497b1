//! Pixel helpers shared by the built-in image nodes

use image::{DynamicImage, GrayAlphaImage, GrayImage, ImageBuffer, Rgb, RgbImage, RgbaImage};
use visionbox_plugin_sdk::{BoundingBox, ComputeError, NodeData};

/// Interleaved 8-bit image held as `f32` samples.
///
/// Keeps the channel count of the source (1 to 4); deeper sample formats are
/// reduced to 8 bits.
#[derive(Debug, Clone, PartialEq)]
pub struct FloatImage {
    pub width: u32,
    pub height: u32,
    pub channels: usize,
    pub data: Vec<f32>,
}

impl FloatImage {
    pub fn new(width: u32, height: u32, channels: usize) -> Self {
        Self {
            width,
            height,
            channels,
            data: vec![0.0; width as usize * height as usize * channels],
        }
    }

    pub fn from_dynamic(image: &DynamicImage) -> Self {
        let channels = image.color().channel_count() as usize;
        let bytes = match channels {
            1 => image.to_luma8().into_raw(),
            2 => image.to_luma_alpha8().into_raw(),
            3 => image.to_rgb8().into_raw(),
            _ => image.to_rgba8().into_raw(),
        };
        Self {
            width: image.width(),
            height: image.height(),
            channels: channels.clamp(1, 4),
            data: bytes.into_iter().map(f32::from).collect(),
        }
    }

    /// Whether the last channel is alpha
    pub fn has_alpha(&self) -> bool {
        self.channels == 2 || self.channels == 4
    }

    /// Number of colour channels, alpha excluded
    pub fn color_channels(&self) -> usize {
        if self.has_alpha() {
            self.channels - 1
        } else {
            self.channels
        }
    }

    pub fn same_shape(&self, other: &FloatImage) -> bool {
        self.width == other.width && self.height == other.height && self.channels == other.channels
    }

    #[inline]
    pub fn index(&self, x: u32, y: u32) -> usize {
        (y as usize * self.width as usize + x as usize) * self.channels
    }

    /// Sample with coordinates clamped to the border
    #[inline]
    pub fn sample_clamped(&self, x: i64, y: i64, channel: usize) -> f32 {
        let x = x.clamp(0, self.width as i64 - 1) as u32;
        let y = y.clamp(0, self.height as i64 - 1) as u32;
        self.data[self.index(x, y) + channel]
    }

    /// Applies `f` to every colour sample, leaving alpha untouched
    pub fn map_color(&mut self, f: impl Fn(f32) -> f32) {
        let channels = self.channels;
        let color = self.color_channels();
        for pixel in self.data.chunks_exact_mut(channels) {
            for sample in &mut pixel[..color] {
                *sample = f(*sample);
            }
        }
    }

    pub fn into_dynamic(self) -> Result<DynamicImage, ComputeError> {
        let (width, height) = (self.width, self.height);
        let bytes: Vec<u8> = self
            .data
            .into_iter()
            .map(|v| v.round().clamp(0.0, 255.0) as u8)
            .collect();

        let image = match self.channels {
            1 => GrayImage::from_raw(width, height, bytes).map(DynamicImage::ImageLuma8),
            2 => GrayAlphaImage::from_raw(width, height, bytes).map(DynamicImage::ImageLumaA8),
            3 => RgbImage::from_raw(width, height, bytes).map(DynamicImage::ImageRgb8),
            _ => RgbaImage::from_raw(width, height, bytes).map(DynamicImage::ImageRgba8),
        };
        image.ok_or_else(|| ComputeError::Algorithm("pixel buffer does not match image size".to_string()))
    }
}

/// The image on an input port
pub fn input_image<'a>(inputs: &'a [NodeData], port: usize, name: &str) -> Result<&'a DynamicImage, ComputeError> {
    inputs
        .get(port)
        .and_then(NodeData::as_image)
        .ok_or_else(|| ComputeError::MissingInput(name.to_string()))
}

/// Luma plane as `f32`, row major
pub fn luma_plane(image: &DynamicImage) -> Vec<f32> {
    image.to_luma8().into_raw().into_iter().map(f32::from).collect()
}

/// Named drawing colours
pub const COLOR_NAMES: [&str; 5] = ["Red", "Green", "Blue", "Yellow", "White"];

pub fn color_by_name(name: &str) -> Rgb<u8> {
    match name {
        "Green" => Rgb([0, 255, 0]),
        "Blue" => Rgb([0, 0, 255]),
        "Yellow" => Rgb([255, 255, 0]),
        "White" => Rgb([255, 255, 255]),
        _ => Rgb([255, 0, 0]),
    }
}

/// Outline of `rect`, `thickness` pixels wide, drawn inside its bounds
pub fn draw_rectangle(canvas: &mut RgbImage, rect: &BoundingBox, color: Rgb<u8>, thickness: u32) {
    let (width, height) = canvas.dimensions();
    if rect.x >= width || rect.y >= height || rect.width == 0 || rect.height == 0 {
        return;
    }
    let right = (rect.x + rect.width).min(width);
    let bottom = (rect.y + rect.height).min(height);

    for y in rect.y..bottom {
        for x in rect.x..right {
            let on_edge = x < rect.x + thickness
                || y < rect.y + thickness
                || x + thickness >= right
                || y + thickness >= bottom;
            if on_edge {
                canvas.put_pixel(x, y, color);
            }
        }
    }
}

/// A `+` marker centred on (`x`, `y`)
pub fn draw_cross(canvas: &mut RgbImage, x: f32, y: f32, radius: i64, color: Rgb<u8>) {
    let (width, height) = canvas.dimensions();
    let (cx, cy) = (x.round() as i64, y.round() as i64);
    for d in -radius..=radius {
        for (px, py) in [(cx + d, cy), (cx, cy + d)] {
            if px >= 0 && py >= 0 && (px as u32) < width && (py as u32) < height {
                canvas.put_pixel(px as u32, py as u32, color);
            }
        }
    }
}

/// Creates an image of `width` x `height` with every pixel set to `pixel`
pub fn filled<P: image::Pixel>(width: u32, height: u32, pixel: P) -> ImageBuffer<P, Vec<P::Subpixel>> {
    ImageBuffer::from_pixel(width, height, pixel)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{LumaA, Rgba};

    #[test]
    fn test_float_image_keeps_channels() {
        let rgba = DynamicImage::ImageRgba8(filled(3, 2, Rgba([1, 2, 3, 4])));
        let float = FloatImage::from_dynamic(&rgba);
        assert_eq!(float.channels, 4);
        assert_eq!(float.color_channels(), 3);
        assert_eq!(&float.data[..4], &[1.0, 2.0, 3.0, 4.0]);

        let back = float.into_dynamic().unwrap();
        assert_eq!(back.as_bytes(), rgba.as_bytes());
    }

    #[test]
    fn test_map_color_skips_alpha() {
        let image = DynamicImage::ImageLumaA8(filled(2, 2, LumaA([10, 200])));
        let mut float = FloatImage::from_dynamic(&image);
        float.map_color(|v| v * 2.0);
        assert_eq!(&float.data[..2], &[20.0, 200.0]);
    }

    #[test]
    fn test_sample_clamped() {
        let mut float = FloatImage::new(2, 1, 1);
        float.data = vec![5.0, 7.0];
        assert_eq!(float.sample_clamped(-3, 0, 0), 5.0);
        assert_eq!(float.sample_clamped(9, 4, 0), 7.0);
    }

    #[test]
    fn test_input_image_missing() {
        let inputs = vec![NodeData::None];
        assert_eq!(
            input_image(&inputs, 0, "Image").unwrap_err(),
            ComputeError::MissingInput("Image".to_string())
        );
    }

    #[test]
    fn test_draw_rectangle_outline() {
        let mut canvas = RgbImage::new(10, 10);
        let rect = BoundingBox { x: 2, y: 2, width: 5, height: 5 };
        draw_rectangle(&mut canvas, &rect, Rgb([255, 0, 0]), 1);

        assert_eq!(canvas.get_pixel(2, 2), &Rgb([255, 0, 0]));
        assert_eq!(canvas.get_pixel(6, 4), &Rgb([255, 0, 0]));
        assert_eq!(canvas.get_pixel(4, 4), &Rgb([0, 0, 0]));
        assert_eq!(canvas.get_pixel(8, 8), &Rgb([0, 0, 0]));
    }
}
