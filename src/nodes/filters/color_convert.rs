//! Colour space conversion

use image::DynamicImage;
use visionbox_plugin_sdk::{
    ComputeError, DataType, NodeData, NodeModel, ParameterSet, ParameterSpec, PortDefinition,
};

use crate::nodes::image_utils::input_image;

pub const CONVERSIONS: [&str; 5] = ["Grayscale", "RGB", "RGBA", "BGR", "HSV"];

/// Converts an RGB triple to HSV scaled like 8-bit OpenCV images:
/// hue in 0..180, saturation and value in 0..255
pub fn rgb_to_hsv(r: u8, g: u8, b: u8) -> [u8; 3] {
    let (r, g, b) = (r as f32 / 255.0, g as f32 / 255.0, b as f32 / 255.0);
    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let delta = max - min;

    let hue = if delta == 0.0 {
        0.0
    } else if max == r {
        60.0 * ((g - b) / delta).rem_euclid(6.0)
    } else if max == g {
        60.0 * ((b - r) / delta + 2.0)
    } else {
        60.0 * ((r - g) / delta + 4.0)
    };
    let saturation = if max == 0.0 { 0.0 } else { delta / max };

    [
        (hue / 2.0).round() as u8,
        (saturation * 255.0).round() as u8,
        (max * 255.0).round() as u8,
    ]
}

pub fn convert(image: &DynamicImage, conversion: &str) -> DynamicImage {
    match conversion {
        "Grayscale" => DynamicImage::ImageLuma8(image.to_luma8()),
        "RGBA" => DynamicImage::ImageRgba8(image.to_rgba8()),
        "BGR" => {
            let mut rgb = image.to_rgb8();
            rgb.pixels_mut().for_each(|p| p.0.swap(0, 2));
            DynamicImage::ImageRgb8(rgb)
        }
        "HSV" => {
            let mut rgb = image.to_rgb8();
            rgb.pixels_mut().for_each(|p| p.0 = rgb_to_hsv(p[0], p[1], p[2]));
            DynamicImage::ImageRgb8(rgb)
        }
        _ => DynamicImage::ImageRgb8(image.to_rgb8()),
    }
}

#[derive(Debug, Clone)]
pub struct ColorConvertModel {
    parameters: ParameterSet,
}

impl Default for ColorConvertModel {
    fn default() -> Self {
        Self {
            parameters: ParameterSet::new(vec![ParameterSpec::choice(
                "conversion",
                "Conversion",
                "Grayscale",
                &CONVERSIONS,
            )]),
        }
    }
}

impl NodeModel for ColorConvertModel {
    fn type_name(&self) -> &str {
        "ColorConvertModel"
    }

    fn caption(&self) -> &str {
        "Color Convert"
    }

    fn input_ports(&self) -> Vec<PortDefinition> {
        vec![PortDefinition::required("Image", DataType::Image)]
    }

    fn output_ports(&self) -> Vec<PortDefinition> {
        vec![PortDefinition::required("Image", DataType::Image)]
    }

    fn parameters(&self) -> &ParameterSet {
        &self.parameters
    }

    fn parameters_mut(&mut self) -> &mut ParameterSet {
        &mut self.parameters
    }

    fn compute(&mut self, inputs: &[NodeData]) -> Result<Vec<NodeData>, ComputeError> {
        let image = input_image(inputs, 0, "Image")?;
        let converted = convert(image, self.parameters.text("conversion"));
        Ok(vec![NodeData::image(converted)])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    fn pixel(r: u8, g: u8, b: u8) -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_pixel(1, 1, Rgb([r, g, b])))
    }

    #[test]
    fn test_hsv_primaries() {
        assert_eq!(rgb_to_hsv(255, 0, 0), [0, 255, 255]);
        assert_eq!(rgb_to_hsv(0, 255, 0), [60, 255, 255]);
        assert_eq!(rgb_to_hsv(0, 0, 255), [120, 255, 255]);
        assert_eq!(rgb_to_hsv(0, 0, 0), [0, 0, 0]);
    }

    #[test]
    fn test_conversions_change_channel_count() {
        let image = pixel(10, 20, 30);
        assert_eq!(convert(&image, "Grayscale").color().channel_count(), 1);
        assert_eq!(convert(&image, "RGBA").color().channel_count(), 4);
        assert_eq!(convert(&image, "BGR").as_bytes(), &[30, 20, 10]);
    }
}
