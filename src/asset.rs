use image::DynamicImage;
use std::{fmt, path::Path};

/// Error raised when uploaded bytes cannot be used as an image.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    /// The file name or the content is not JPEG or PNG.
    #[error("Unsupported image format: {0}")]
    UnsupportedFormat(String),

    /// The bytes look like a supported format but do not decode.
    #[error("Failed to decode image: {0}")]
    Corrupt(#[from] image::ImageError),

    /// The file could not be read from disk.
    #[error("Failed to read image: {0}")]
    Io(#[from] std::io::Error),
}

/// The raster formats accepted for upload.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ImageFormat {
    Jpeg,
    Png,
}

impl ImageFormat {
    /// Accepted file extensions, as shown to the file picker.
    pub const EXTENSIONS: [&'static str; 3] = ["jpg", "jpeg", "png"];

    pub fn from_extension(extension: &str) -> Option<Self> {
        match extension.to_ascii_lowercase().as_str() {
            "jpg" | "jpeg" => Some(ImageFormat::Jpeg),
            "png" => Some(ImageFormat::Png),
            _ => None,
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            ImageFormat::Jpeg => "image/jpeg",
            ImageFormat::Png => "image/png",
        }
    }

    fn sniff(bytes: &[u8]) -> Result<Self, DecodeError> {
        match image::guess_format(bytes) {
            Ok(image::ImageFormat::Jpeg) => Ok(ImageFormat::Jpeg),
            Ok(image::ImageFormat::Png) => Ok(ImageFormat::Png),
            Ok(other) => Err(DecodeError::UnsupportedFormat(format!("{other:?}"))),
            Err(_) => Err(DecodeError::UnsupportedFormat(
                "unrecognized image data".to_string(),
            )),
        }
    }

    fn as_image_format(self) -> image::ImageFormat {
        match self {
            ImageFormat::Jpeg => image::ImageFormat::Jpeg,
            ImageFormat::Png => image::ImageFormat::Png,
        }
    }
}

/// A decoded image held for the duration of one request.
///
/// Keeps the pixel buffer alongside the encoded bytes it was decoded from, so the
/// model receives the upload as-is while the dimensions stay available.
pub struct ImageAsset {
    format: ImageFormat,
    pixels: DynamicImage,
    encoded: Vec<u8>,
}

impl ImageAsset {
    /// Decodes an upload.
    ///
    /// When the file name has an extension, it must be one of
    /// [`ImageFormat::EXTENSIONS`]. Names without one (`blob` from `FormData`) are
    /// accepted. The content itself must be JPEG or PNG and decode fully.
    pub fn decode(file_name: Option<&str>, bytes: Vec<u8>) -> Result<Self, DecodeError> {
        if let Some(path) = file_name.map(Path::new) {
            if path.extension().is_some() {
                check_extension(path)?;
            }
        }

        let format = ImageFormat::sniff(&bytes)?;
        let pixels = image::load_from_memory_with_format(&bytes, format.as_image_format())?;

        Ok(Self {
            format,
            pixels,
            encoded: bytes,
        })
    }

    /// Reads and decodes an image file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, DecodeError> {
        let path = path.as_ref();
        check_extension(path)?;
        let bytes = std::fs::read(path)?;
        Self::decode(None, bytes)
    }

    pub fn format(&self) -> ImageFormat {
        self.format
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    /// The decoded pixel buffer.
    pub fn pixels(&self) -> &DynamicImage {
        &self.pixels
    }

    /// The bytes as uploaded.
    pub fn encoded(&self) -> &[u8] {
        &self.encoded
    }
}

impl fmt::Debug for ImageAsset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImageAsset")
            .field("format", &self.format)
            .field("width", &self.width())
            .field("height", &self.height())
            .field("encoded_len", &self.encoded.len())
            .finish()
    }
}

fn check_extension(path: &Path) -> Result<ImageFormat, DecodeError> {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .ok_or_else(|| DecodeError::UnsupportedFormat("missing file extension".to_string()))?;

    ImageFormat::from_extension(extension)
        .ok_or_else(|| DecodeError::UnsupportedFormat(extension.to_string()))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use image::{Rgb, RgbImage};
    use std::io::Cursor;

    pub(crate) fn encode(format: image::ImageFormat, width: u32, height: u32) -> Vec<u8> {
        let img = RgbImage::from_pixel(width, height, Rgb([200, 120, 40]));
        let mut bytes = Vec::new();
        DynamicImage::ImageRgb8(img)
            .write_to(&mut Cursor::new(&mut bytes), format)
            .unwrap();
        bytes
    }

    #[test]
    fn decodes_png_upload() {
        let bytes = encode(image::ImageFormat::Png, 8, 6);
        let asset = ImageAsset::decode(Some("cat.png"), bytes.clone()).unwrap();

        assert_eq!(asset.format(), ImageFormat::Png);
        assert_eq!((asset.width(), asset.height()), (8, 6));
        assert_eq!(asset.encoded(), bytes.as_slice());
    }

    #[test]
    fn decodes_jpeg_with_uppercase_extension() {
        let bytes = encode(image::ImageFormat::Jpeg, 16, 16);
        let asset = ImageAsset::decode(Some("CAT.JPG"), bytes).unwrap();

        assert_eq!(asset.format(), ImageFormat::Jpeg);
        assert_eq!(asset.format().mime_type(), "image/jpeg");
    }

    #[test]
    fn rejects_unlisted_extension() {
        let bytes = encode(image::ImageFormat::Png, 2, 2);
        let err = ImageAsset::decode(Some("cat.gif"), bytes).unwrap_err();

        assert!(matches!(err, DecodeError::UnsupportedFormat(ext) if ext == "gif"));
    }

    #[test]
    fn accepts_name_without_extension() {
        let bytes = encode(image::ImageFormat::Jpeg, 4, 2);
        let asset = ImageAsset::decode(Some("blob"), bytes).unwrap();

        assert_eq!(asset.format(), ImageFormat::Jpeg);
        assert_eq!(asset.pixels().width(), 4);
        assert_eq!(asset.pixels().to_rgb8().get_pixel(0, 0).0.len(), 3);
    }

    #[test]
    fn rejects_non_image_bytes() {
        let err = ImageAsset::decode(Some("notes.png"), b"hello world".to_vec()).unwrap_err();

        assert!(matches!(err, DecodeError::UnsupportedFormat(_)));
    }

    #[test]
    fn rejects_truncated_png() {
        let mut bytes = encode(image::ImageFormat::Png, 32, 32);
        bytes.truncate(40);
        let err = ImageAsset::decode(None, bytes).unwrap_err();

        assert!(matches!(err, DecodeError::Corrupt(_)));
    }

    #[test]
    fn reads_from_path() {
        let dir = std::env::temp_dir().join("vlm_analyzer_asset_test");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("sample.png");
        std::fs::write(&path, encode(image::ImageFormat::Png, 3, 5)).unwrap();

        let asset = ImageAsset::from_path(&path).unwrap();
        assert_eq!((asset.width(), asset.height()), (3, 5));

        let _ = std::fs::remove_dir_all(&dir);
    }
}
