//! Artifacts that flow between node ports and the port type tags used to
//! decide which ports may be connected.

use std::fmt;
use std::sync::Arc;

use image::DynamicImage;
use serde::{Deserialize, Serialize};

/// Data types that can flow through ports
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", from = "String")]
pub enum DataType {
    /// Image buffer
    Image,
    /// Set of detected keypoints
    Keypoints,
    /// List of labelled bounding boxes
    Detections,
    /// Tag defined by a plugin
    Custom(String),
}

impl DataType {
    /// The tag string used for compatibility checks and in graph files
    pub fn tag(&self) -> &str {
        match self {
            DataType::Image => "image",
            DataType::Keypoints => "keypoints",
            DataType::Detections => "detections",
            DataType::Custom(tag) => tag,
        }
    }

    /// Ports connect only when their tags are identical
    pub fn can_connect_to(&self, other: &DataType) -> bool {
        self.tag() == other.tag()
    }
}

impl From<String> for DataType {
    fn from(tag: String) -> Self {
        match tag.as_str() {
            "image" => DataType::Image,
            "keypoints" => DataType::Keypoints,
            "detections" => DataType::Detections,
            _ => DataType::Custom(tag),
        }
    }
}

impl From<DataType> for String {
    fn from(data_type: DataType) -> Self {
        data_type.tag().to_string()
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// A detected interest point
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct KeyPoint {
    pub x: f32,
    pub y: f32,
    pub response: f32,
    pub size: f32,
}

/// Axis-aligned rectangle in pixel coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl BoundingBox {
    pub fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }
}

/// A labelled detection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    pub label: String,
    pub confidence: f32,
    pub bounding_box: BoundingBox,
}

/// Value carried by a port.
///
/// Payloads are reference counted so an output that fans out to several
/// inputs is shared rather than copied.
#[derive(Debug, Clone, Default)]
pub enum NodeData {
    Image(Arc<DynamicImage>),
    Keypoints(Arc<Vec<KeyPoint>>),
    Detections(Arc<Vec<Detection>>),
    /// No value
    #[default]
    None,
}

impl NodeData {
    pub fn image(image: DynamicImage) -> Self {
        NodeData::Image(Arc::new(image))
    }

    pub fn keypoints(points: Vec<KeyPoint>) -> Self {
        NodeData::Keypoints(Arc::new(points))
    }

    pub fn detections(detections: Vec<Detection>) -> Self {
        NodeData::Detections(Arc::new(detections))
    }

    pub fn is_none(&self) -> bool {
        matches!(self, NodeData::None)
    }

    pub fn is_some(&self) -> bool {
        !self.is_none()
    }

    /// Port type of the payload, `None` for an empty value
    pub fn data_type(&self) -> Option<DataType> {
        match self {
            NodeData::Image(_) => Some(DataType::Image),
            NodeData::Keypoints(_) => Some(DataType::Keypoints),
            NodeData::Detections(_) => Some(DataType::Detections),
            NodeData::None => None,
        }
    }

    pub fn as_image(&self) -> Option<&DynamicImage> {
        match self {
            NodeData::Image(image) => Some(image),
            _ => None,
        }
    }

    pub fn as_keypoints(&self) -> Option<&[KeyPoint]> {
        match self {
            NodeData::Keypoints(points) => Some(points),
            _ => None,
        }
    }

    pub fn as_detections(&self) -> Option<&[Detection]> {
        match self {
            NodeData::Detections(detections) => Some(detections),
            _ => None,
        }
    }

    /// True when both values refer to the same allocation (or are both empty).
    pub fn same_as(&self, other: &NodeData) -> bool {
        match (self, other) {
            (NodeData::Image(a), NodeData::Image(b)) => Arc::ptr_eq(a, b),
            (NodeData::Keypoints(a), NodeData::Keypoints(b)) => Arc::ptr_eq(a, b),
            (NodeData::Detections(a), NodeData::Detections(b)) => Arc::ptr_eq(a, b),
            (NodeData::None, NodeData::None) => true,
            _ => false,
        }
    }

    /// Short human readable description, e.g. `image 100x100x3`
    pub fn summary(&self) -> String {
        match self {
            NodeData::Image(image) => format!(
                "image {}x{}x{}",
                image.width(),
                image.height(),
                image.color().channel_count()
            ),
            NodeData::Keypoints(points) => format!("{} keypoints", points.len()),
            NodeData::Detections(detections) => format!("{} detections", detections.len()),
            NodeData::None => "empty".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::RgbImage;

    #[test]
    fn test_data_type_tags() {
        assert_eq!(DataType::Image.tag(), "image");
        assert_eq!(DataType::from("keypoints".to_string()), DataType::Keypoints);
        assert_eq!(
            DataType::from("mask".to_string()),
            DataType::Custom("mask".to_string())
        );
        assert!(DataType::Image.can_connect_to(&DataType::Image));
        assert!(!DataType::Image.can_connect_to(&DataType::Keypoints));
        assert!(DataType::Custom("image".to_string()).can_connect_to(&DataType::Image));
    }

    #[test]
    fn test_same_as_compares_allocations() {
        let a = NodeData::image(DynamicImage::ImageRgb8(RgbImage::new(2, 2)));
        let shared = a.clone();
        let b = NodeData::image(DynamicImage::ImageRgb8(RgbImage::new(2, 2)));

        assert!(a.same_as(&shared));
        assert!(!a.same_as(&b));
        assert!(NodeData::None.same_as(&NodeData::None));
        assert!(!a.same_as(&NodeData::None));
    }

    #[test]
    fn test_summary() {
        let image = NodeData::image(DynamicImage::ImageRgb8(RgbImage::new(4, 3)));
        assert_eq!(image.summary(), "image 4x3x3");
        assert_eq!(NodeData::keypoints(vec![]).summary(), "0 keypoints");
        assert_eq!(NodeData::None.summary(), "empty");
    }
}
