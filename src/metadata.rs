//! Source image identification.
//!
//! Reads what the planner needs to know about a file without decoding its
//! pixels: dimensions, bits per channel, MIME type, and the EXIF orientation.
//!
//! ## Orientation
//!
//! The EXIF orientation tag is turned into an [`OrientationHint`]: a
//! clockwise rotation followed by an optional mirror. The hint is only
//! applied when auto-rotation is on.
//!
//! | EXIF | Hint |
//! |---|---|
//! | 1 | none |
//! | 2 | flop |
//! | 3 | rotate 180 |
//! | 4 | flip |
//! | 5 | rotate 90 + flop |
//! | 6 | rotate 90 |
//! | 7 | rotate 270 + flop |
//! | 8 | rotate 270 |

use crate::imaging::{ImageInfo, OrientationHint, TransformError};
use image::metadata::Orientation;
use image::{ImageDecoder, ImageReader};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum MetadataError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Could not determine image format of {0}")]
    UnknownFormat(PathBuf),
    #[error("Failed to read {path}: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error(transparent)]
    Unsupported(#[from] TransformError),
}

/// What the planner needs to know about a source file.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceImage {
    pub info: ImageInfo,
    pub hint: OrientationHint,
}

/// EXIF tag value for an orientation.
#[allow(unreachable_patterns)]
fn exif_value(orientation: Orientation) -> u32 {
    match orientation {
        Orientation::NoTransforms => 1,
        Orientation::FlipHorizontal => 2,
        Orientation::Rotate180 => 3,
        Orientation::FlipVertical => 4,
        Orientation::Rotate90FlipH => 5,
        Orientation::Rotate90 => 6,
        Orientation::Rotate270FlipH => 7,
        Orientation::Rotate270 => 8,
        // Anything newer is left as-is
        _ => 1,
    }
}

/// Identify `path`: header-only read, no pixel decode.
pub fn identify(path: &Path) -> Result<SourceImage, MetadataError> {
    let reader = ImageReader::open(path)?.with_guessed_format()?;
    let format = reader
        .format()
        .ok_or_else(|| MetadataError::UnknownFormat(path.to_path_buf()))?;

    let decode_error = |source| MetadataError::Decode {
        path: path.to_path_buf(),
        source,
    };
    let mut decoder = reader.into_decoder().map_err(decode_error)?;

    let (width, height) = decoder.dimensions();
    let color = decoder.color_type();
    let bit_depth = (color.bits_per_pixel() / u16::from(color.channel_count().max(1))) as u8;
    let orientation = decoder
        .orientation()
        .unwrap_or(Orientation::NoTransforms);

    let info = ImageInfo::new(width, height, bit_depth, format.to_mime_type())?;
    let hint = OrientationHint::from_exif(exif_value(orientation));

    debug!(
        path = %path.display(),
        width,
        height,
        bit_depth,
        mime = %info.mime_type,
        orientation = ?orientation,
        "identified source"
    );

    Ok(SourceImage { info, hint })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imaging::{FlipAxis, ImageType};
    use tempfile::TempDir;

    #[test]
    fn identify_png_dimensions() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("wide.png");
        image::RgbImage::new(40, 20).save(&path).unwrap();

        let source = identify(&path).unwrap();

        assert_eq!(source.info.dimensions(), (40, 20));
        assert_eq!(source.info.bit_depth, 8);
        assert_eq!(source.info.mime_type, "image/png");
        assert_eq!(source.info.image_type, ImageType::Png);
        assert!(!source.hint.is_significant());
    }

    #[test]
    fn identify_sixteen_bit_png() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("deep.png");
        image::ImageBuffer::<image::Rgb<u16>, Vec<u16>>::new(3, 5)
            .save(&path)
            .unwrap();

        let source = identify(&path).unwrap();

        assert_eq!(source.info.bit_depth, 16);
        assert_eq!(source.info.dimensions(), (3, 5));
    }

    #[test]
    fn identify_gif() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("anim.gif");
        image::RgbaImage::new(8, 6).save(&path).unwrap();

        let source = identify(&path).unwrap();

        assert_eq!(source.info.image_type, ImageType::Gif);
        assert_eq!(source.info.dimensions(), (8, 6));
    }

    #[test]
    fn identify_sniffs_content_not_extension() {
        let tmp = TempDir::new().unwrap();
        let png = tmp.path().join("real.png");
        image::RgbImage::new(2, 2).save(&png).unwrap();
        let misnamed = tmp.path().join("photo.jpg");
        std::fs::copy(&png, &misnamed).unwrap();

        let source = identify(&misnamed).unwrap();
        assert_eq!(source.info.image_type, ImageType::Png);
    }

    #[test]
    fn identify_rejects_unknown_content() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("notes.bin");
        std::fs::write(&path, b"definitely not an image").unwrap();

        assert!(matches!(
            identify(&path),
            Err(MetadataError::UnknownFormat(_))
        ));
    }

    #[test]
    fn identify_missing_file_is_io_error() {
        let tmp = TempDir::new().unwrap();
        assert!(matches!(
            identify(&tmp.path().join("missing.png")),
            Err(MetadataError::Io(_))
        ));
    }

    #[test]
    fn exif_values_round_into_hints() {
        let hint = OrientationHint::from_exif(exif_value(Orientation::Rotate90));
        assert_eq!(hint.rotation_degrees, Some(90.0));
        assert_eq!(hint.flip, None);

        let hint = OrientationHint::from_exif(exif_value(Orientation::FlipVertical));
        assert_eq!(hint.rotation_degrees, None);
        assert_eq!(hint.flip, Some(FlipAxis::Vertical));

        let hint = OrientationHint::from_exif(exif_value(Orientation::Rotate270FlipH));
        assert_eq!(hint.rotation_degrees, Some(270.0));
        assert_eq!(hint.flip, Some(FlipAxis::Horizontal));
    }
}
