//! Cover image probing: format and pixel size are read up front so a bad
//! download is rejected before it reaches a document.

use std::io::Cursor;

use bytes::Bytes;
use image::{ImageFormat, ImageReader};

use crate::document::RenderError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoverFormat {
    Png,
    Jpeg,
}

impl CoverFormat {
    pub fn extension(self) -> &'static str {
        match self {
            CoverFormat::Png => "png",
            CoverFormat::Jpeg => "jpeg",
        }
    }

    pub fn content_type(self) -> &'static str {
        match self {
            CoverFormat::Png => "image/png",
            CoverFormat::Jpeg => "image/jpeg",
        }
    }
}

/// Image bytes plus what the document needs to embed them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoverImage {
    pub bytes: Bytes,
    pub format: CoverFormat,
    pub width_px: u32,
    pub height_px: u32,
}

impl CoverImage {
    pub fn from_bytes(bytes: Bytes) -> Result<Self, RenderError> {
        let reader = ImageReader::new(Cursor::new(bytes.as_ref()))
            .with_guessed_format()
            .map_err(|e| RenderError::Image(e.to_string()))?;

        let format = match reader.format() {
            Some(ImageFormat::Png) => CoverFormat::Png,
            Some(ImageFormat::Jpeg) => CoverFormat::Jpeg,
            Some(other) => {
                return Err(RenderError::Image(format!(
                    "unsupported cover image format {other:?}"
                )))
            }
            None => return Err(RenderError::Image("unrecognized image data".to_string())),
        };

        let (width_px, height_px) = reader
            .into_dimensions()
            .map_err(|e| RenderError::Image(e.to_string()))?;
        if width_px == 0 || height_px == 0 {
            return Err(RenderError::Image("cover image has zero size".to_string()));
        }

        Ok(Self {
            bytes,
            format,
            width_px,
            height_px,
        })
    }
}

#[cfg(test)]
pub(crate) fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let img = image::RgbImage::from_pixel(width, height, image::Rgb([200, 120, 40]));
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
        .expect("encode test png");
    buf
}

#[cfg(test)]
impl CoverImage {
    pub(crate) fn test_png(width: u32, height: u32) -> Self {
        Self::from_bytes(Bytes::from(png_bytes(width, height))).expect("valid test png")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_png_is_decoded() {
        let image = CoverImage::from_bytes(Bytes::from(png_bytes(32, 16))).unwrap();
        assert_eq!(image.format, CoverFormat::Png);
        assert_eq!((image.width_px, image.height_px), (32, 16));
        assert_eq!(image.format.content_type(), "image/png");
    }

    #[test]
    fn test_garbage_is_rejected() {
        let result = CoverImage::from_bytes(Bytes::from_static(b"definitely not an image"));
        assert!(matches!(result, Err(RenderError::Image(_))));
    }
}
