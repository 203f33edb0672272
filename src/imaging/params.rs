//! Parameter types for image transforms.
//!
//! These structs describe *what* to do, not *how* to do it. They are the
//! interface between the caller (which knows the source image and the
//! requested geometry), the [`planner`](super::planner) (which decides the
//! operations) and the [`assembler`](super::assembler) (which renders them
//! for ImageMagick).
//!
//! ## Types
//!
//! - [`Quality`]: JPEG encoding quality (1–100, default 90). Clamped on construction.
//! - [`Sharpening`]: Unsharp-mask level with a fixed parameter table.
//! - [`ImageType`] / [`ImageInfo`]: Source format and working dimensions.
//! - [`OrientationHint`]: Rotation/flip derived from EXIF orientation.
//! - [`CropRect`] / [`Cropping`]: Pre-resize crop rectangle and crop gravity.
//! - [`TransformRequest`]: Everything the caller asks for in one value.

use super::TransformError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Quality setting for JPEG encoding (1-100).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Quality(pub u32);

impl Quality {
    pub fn new(value: u32) -> Self {
        Self(value.clamp(1, 100))
    }

    pub fn value(self) -> u32 {
        self.0
    }
}

impl Default for Quality {
    fn default() -> Self {
        Self(90)
    }
}

/// Unsharp-mask parameters in ImageMagick order: `radius x sigma + amount + threshold`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct UnsharpMask {
    pub radius: f32,
    pub sigma: f32,
    pub amount: f32,
    pub threshold: f32,
}

/// Sharpening level applied after scaling.
///
/// Deserialization is strict; [`Sharpening::from_name`] is the lenient path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sharpening {
    None,
    #[default]
    Soft,
    Medium,
    Strong,
}

impl Sharpening {
    /// Resolve a level by name. Unknown names resolve to [`Sharpening::None`].
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "soft" => Self::Soft,
            "medium" => Self::Medium,
            "strong" => Self::Strong,
            _ => Self::None,
        }
    }

    /// Fixed unsharp table. `None` has no mask.
    pub fn unsharp(self) -> Option<UnsharpMask> {
        let (radius, sigma, amount, threshold) = match self {
            Self::None => return None,
            Self::Soft => (0.0, 0.5, 2.4, 0.07),
            Self::Medium => (0.0, 0.5, 3.2, 0.04),
            Self::Strong => (0.0, 0.5, 5.0, 0.02),
        };
        Some(UnsharpMask {
            radius,
            sigma,
            amount,
            threshold,
        })
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Soft => "soft",
            Self::Medium => "medium",
            Self::Strong => "strong",
        }
    }
}

impl FromStr for Sharpening {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::from_name(s))
    }
}

/// Mirror axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlipAxis {
    /// Left-right mirror (`-flop`).
    Horizontal,
    /// Top-bottom mirror (`-flip`).
    Vertical,
}

impl FromStr for FlipAxis {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "h" | "horizontal" => Ok(Self::Horizontal),
            "v" | "vertical" => Ok(Self::Vertical),
            other => Err(format!("unknown flip axis '{other}' (expected h or v)")),
        }
    }
}

/// Source formats the ImageMagick engine accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ImageType {
    Jpeg,
    Png,
    Gif,
}

impl ImageType {
    /// Resolve from a MIME type such as `image/jpeg`.
    pub fn from_mime(mime: &str) -> Result<Self, TransformError> {
        let format = mime.trim().to_ascii_uppercase();
        let format = format.strip_prefix("IMAGE/").unwrap_or(&format);
        match format {
            "JPEG" | "JPG" | "PJPEG" => Ok(Self::Jpeg),
            "PNG" => Ok(Self::Png),
            "GIF" => Ok(Self::Gif),
            _ => Err(TransformError::UnsupportedFormat(mime.to_string())),
        }
    }
}

/// Source image facts plus the current working dimensions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImageInfo {
    pub width: u32,
    pub height: u32,
    pub bit_depth: u8,
    pub mime_type: String,
    pub image_type: ImageType,
}

impl ImageInfo {
    /// Build from identified values, failing on zero dimensions or a format
    /// outside JPEG/PNG/GIF.
    pub fn new(
        width: u32,
        height: u32,
        bit_depth: u8,
        mime_type: impl Into<String>,
    ) -> Result<Self, TransformError> {
        let mime_type = mime_type.into();
        let image_type = ImageType::from_mime(&mime_type)?;
        if width == 0 || height == 0 {
            return Err(TransformError::InvalidDimensions { width, height });
        }
        Ok(Self {
            width,
            height,
            bit_depth,
            mime_type,
            image_type,
        })
    }

    /// Copy with new working dimensions.
    pub fn with_dimensions(&self, width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            ..self.clone()
        }
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}

/// Rotation/flip correction derived from embedded orientation metadata.
///
/// Degrees are clockwise; the flip is applied after the rotation.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct OrientationHint {
    pub rotation_degrees: Option<f64>,
    pub flip: Option<FlipAxis>,
}

impl OrientationHint {
    /// Map an EXIF orientation value (1-8). Anything else is no hint.
    pub fn from_exif(value: u32) -> Self {
        let (degrees, flip) = match value {
            2 => (None, Some(FlipAxis::Horizontal)),
            3 => (Some(180.0), None),
            4 => (None, Some(FlipAxis::Vertical)),
            5 => (Some(90.0), Some(FlipAxis::Horizontal)),
            6 => (Some(90.0), None),
            7 => (Some(270.0), Some(FlipAxis::Horizontal)),
            8 => (Some(270.0), None),
            _ => (None, None),
        };
        Self {
            rotation_degrees: degrees,
            flip,
        }
    }

    /// True when the hint asks for any correction at all.
    pub fn is_significant(&self) -> bool {
        self.rotation_degrees.is_some_and(|d| d != 0.0) || self.flip.is_some()
    }
}

/// Pixel rectangle: offset plus exact size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CropRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl CropRect {
    /// Accept exactly four values `[x, y, width, height]` with non-negative
    /// offsets and a positive size. Anything else is `None`.
    pub fn from_values(values: &[i64]) -> Option<Self> {
        let [x, y, w, h] = values else {
            return None;
        };
        let x = u32::try_from(*x).ok()?;
        let y = u32::try_from(*y).ok()?;
        let width = u32::try_from(*w).ok().filter(|&w| w > 0)?;
        let height = u32::try_from(*h).ok().filter(|&h| h > 0)?;
        Some(Self {
            x,
            y,
            width,
            height,
        })
    }

    /// Parse `x,y,w,h`.
    pub fn parse(text: &str) -> Option<Self> {
        let values: Option<Vec<i64>> = text
            .split(',')
            .map(|part| part.trim().parse::<i64>().ok())
            .collect();
        Self::from_values(&values?)
    }
}

impl fmt::Display for CropRect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}+{}+{}", self.width, self.height, self.x, self.y)
    }
}

/// Where the crop-after-resize window sits on the scaled canvas.
///
/// `Disabled` never crops: the image is stretched to the exact request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Cropping {
    Disabled,
    #[default]
    Center,
    North,
    NorthEast,
    East,
    SouthEast,
    South,
    SouthWest,
    West,
    NorthWest,
}

impl FromStr for Cropping {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .trim()
            .to_ascii_lowercase()
            .chars()
            .filter(|c| *c != '-' && *c != '_')
            .collect();
        match normalized.as_str() {
            "none" | "off" | "disabled" | "false" => Ok(Self::Disabled),
            "center" | "centre" | "true" => Ok(Self::Center),
            "north" | "n" => Ok(Self::North),
            "northeast" | "ne" => Ok(Self::NorthEast),
            "east" | "e" => Ok(Self::East),
            "southeast" | "se" => Ok(Self::SouthEast),
            "south" | "s" => Ok(Self::South),
            "southwest" | "sw" => Ok(Self::SouthWest),
            "west" | "w" => Ok(Self::West),
            "northwest" | "nw" => Ok(Self::NorthWest),
            other => Err(format!("unknown cropping position '{other}'")),
        }
    }
}

/// Everything the caller asks for.
#[derive(Debug, Clone, PartialEq)]
pub struct TransformRequest {
    pub final_width: u32,
    pub final_height: u32,
    pub rotate_degrees: Option<f64>,
    pub flip: Option<FlipAxis>,
    pub auto_rotate: bool,
    pub extra_crop: Option<CropRect>,
    pub sharpening: Sharpening,
    pub cropping: Cropping,
    pub gamma: bool,
    pub quality: Quality,
}

impl TransformRequest {
    /// Request with stock modifiers: auto-rotate, soft sharpening, centered
    /// crop, gamma correction, quality 90.
    pub fn new(final_width: u32, final_height: u32) -> Self {
        Self {
            final_width,
            final_height,
            rotate_degrees: None,
            flip: None,
            auto_rotate: true,
            extra_crop: None,
            sharpening: Sharpening::default(),
            cropping: Cropping::default(),
            gamma: true,
            quality: Quality::default(),
        }
    }

    pub fn final_dimensions(&self) -> (u32, u32) {
        (self.final_width, self.final_height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quality_clamps_to_valid_range() {
        assert_eq!(Quality::new(0).value(), 1);
        assert_eq!(Quality::new(50).value(), 50);
        assert_eq!(Quality::new(150).value(), 100);
    }

    #[test]
    fn quality_default_is_90() {
        assert_eq!(Quality::default().value(), 90);
    }

    #[test]
    fn unsharp_table_is_exact() {
        let soft = Sharpening::Soft.unsharp().unwrap();
        assert_eq!(
            (soft.radius, soft.sigma, soft.amount, soft.threshold),
            (0.0, 0.5, 2.4, 0.07)
        );
        let medium = Sharpening::Medium.unsharp().unwrap();
        assert_eq!(
            (medium.radius, medium.sigma, medium.amount, medium.threshold),
            (0.0, 0.5, 3.2, 0.04)
        );
        let strong = Sharpening::Strong.unsharp().unwrap();
        assert_eq!(
            (strong.radius, strong.sigma, strong.amount, strong.threshold),
            (0.0, 0.5, 5.0, 0.02)
        );
        assert!(Sharpening::None.unsharp().is_none());
    }

    #[test]
    fn unknown_sharpening_name_is_none() {
        assert_eq!(Sharpening::from_name("extreme"), Sharpening::None);
        assert_eq!(Sharpening::from_name(""), Sharpening::None);
        assert_eq!(Sharpening::from_name(" Medium "), Sharpening::Medium);
    }

    #[test]
    fn image_type_from_mime() {
        assert_eq!(ImageType::from_mime("image/jpeg").unwrap(), ImageType::Jpeg);
        assert_eq!(ImageType::from_mime("image/png").unwrap(), ImageType::Png);
        assert_eq!(ImageType::from_mime("image/gif").unwrap(), ImageType::Gif);
        assert!(matches!(
            ImageType::from_mime("image/webp"),
            Err(TransformError::UnsupportedFormat(m)) if m == "image/webp"
        ));
    }

    #[test]
    fn image_info_rejects_zero_dimensions() {
        assert!(matches!(
            ImageInfo::new(0, 100, 8, "image/png"),
            Err(TransformError::InvalidDimensions { width: 0, height: 100 })
        ));
    }

    #[test]
    fn crop_rect_requires_four_values() {
        assert_eq!(
            CropRect::from_values(&[10, 20, 30, 40]),
            Some(CropRect {
                x: 10,
                y: 20,
                width: 30,
                height: 40
            })
        );
        assert_eq!(CropRect::from_values(&[10, 20, 30]), None);
        assert_eq!(CropRect::from_values(&[10, 20, 30, 40, 50]), None);
        assert_eq!(CropRect::from_values(&[-1, 20, 30, 40]), None);
        assert_eq!(CropRect::from_values(&[0, 0, 0, 40]), None);
    }

    #[test]
    fn crop_rect_parse() {
        assert_eq!(CropRect::parse("1, 2,3,4").map(|r| r.to_string()), Some("3x4+1+2".to_string()));
        assert_eq!(CropRect::parse("1,2,x,4"), None);
        assert_eq!(CropRect::parse(""), None);
    }

    #[test]
    fn exif_orientation_mapping() {
        assert!(!OrientationHint::from_exif(1).is_significant());
        assert!(!OrientationHint::from_exif(0).is_significant());
        assert_eq!(
            OrientationHint::from_exif(6),
            OrientationHint {
                rotation_degrees: Some(90.0),
                flip: None
            }
        );
        assert_eq!(
            OrientationHint::from_exif(4),
            OrientationHint {
                rotation_degrees: None,
                flip: Some(FlipAxis::Vertical)
            }
        );
        assert_eq!(
            OrientationHint::from_exif(7),
            OrientationHint {
                rotation_degrees: Some(270.0),
                flip: Some(FlipAxis::Horizontal)
            }
        );
    }

    #[test]
    fn cropping_parses_gravity_names() {
        assert_eq!("center".parse::<Cropping>().unwrap(), Cropping::Center);
        assert_eq!("north-west".parse::<Cropping>().unwrap(), Cropping::NorthWest);
        assert_eq!("SE".parse::<Cropping>().unwrap(), Cropping::SouthEast);
        assert_eq!("none".parse::<Cropping>().unwrap(), Cropping::Disabled);
        assert!("middle".parse::<Cropping>().is_err());
    }

    #[test]
    fn flip_axis_parses_short_names() {
        assert_eq!("h".parse::<FlipAxis>().unwrap(), FlipAxis::Horizontal);
        assert_eq!("Vertical".parse::<FlipAxis>().unwrap(), FlipAxis::Vertical);
        assert!("x".parse::<FlipAxis>().is_err());
    }
}
