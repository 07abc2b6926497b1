//! Core computation logic for the blur node

use crate::nodes::image_utils::FloatImage;

/// Blur kernel shapes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlurMethod {
    Gaussian,
    Box,
}

impl BlurMethod {
    pub const NAMES: [&'static str; 2] = ["Gaussian", "Box"];

    pub fn from_name(name: &str) -> Self {
        match name {
            "Box" => BlurMethod::Box,
            _ => BlurMethod::Gaussian,
        }
    }
}

/// Sigma used when none is given, derived from the kernel size
pub fn default_sigma(kernel_size: usize) -> f64 {
    0.3 * ((kernel_size as f64 - 1.0) * 0.5 - 1.0) + 0.8
}

/// Normalized 1-D weights with `kernel_size` taps
pub fn kernel_weights(method: BlurMethod, kernel_size: usize, sigma: f64) -> Vec<f32> {
    let weights: Vec<f64> = match method {
        BlurMethod::Box => vec![1.0; kernel_size],
        BlurMethod::Gaussian => {
            let sigma = if sigma > 0.0 { sigma } else { default_sigma(kernel_size) };
            let center = (kernel_size as f64 - 1.0) / 2.0;
            (0..kernel_size)
                .map(|i| {
                    let d = i as f64 - center;
                    (-(d * d) / (2.0 * sigma * sigma)).exp()
                })
                .collect()
        }
    };
    let sum: f64 = weights.iter().sum();
    weights.into_iter().map(|w| (w / sum) as f32).collect()
}

/// Separable blur with replicated borders
pub fn blur(image: &FloatImage, weights: &[f32]) -> FloatImage {
    let anchor = (weights.len() as i64 - 1) / 2;
    let horizontal = convolve(image, weights, anchor, true);
    convolve(&horizontal, weights, anchor, false)
}

fn convolve(image: &FloatImage, weights: &[f32], anchor: i64, horizontal: bool) -> FloatImage {
    let mut out = FloatImage::new(image.width, image.height, image.channels);
    for y in 0..image.height {
        for x in 0..image.width {
            let base = out.index(x, y);
            for c in 0..image.channels {
                let mut acc = 0.0f32;
                for (i, w) in weights.iter().enumerate() {
                    let offset = i as i64 - anchor;
                    let (sx, sy) = if horizontal {
                        (x as i64 + offset, y as i64)
                    } else {
                        (x as i64, y as i64 + offset)
                    };
                    acc += w * image.sample_clamped(sx, sy, c);
                }
                out.data[base + c] = acc;
            }
        }
    }
    out
}

/// Keeps `blurred` where the mask is non-zero and `original` elsewhere
pub fn apply_mask(original: &FloatImage, blurred: &mut FloatImage, mask: &[f32]) {
    let channels = original.channels;
    for (pixel, &m) in mask.iter().enumerate() {
        if m == 0.0 {
            let start = pixel * channels;
            blurred.data[start..start + channels].copy_from_slice(&original.data[start..start + channels]);
        }
    }
}
