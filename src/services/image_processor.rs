// src/services/image_processor.rs
use crate::errors::PromptError;
use image::ImageFormat as ImgFormat;
use log::debug;
use std::io::Cursor;

/// What the upload turned out to be once its bytes were sniffed. Dimensions
/// are only known for formats whose header the `image` crate can read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageInfo {
    pub media_type: String,
    pub width: Option<u32>,
    pub height: Option<u32>,
}

pub struct ImageProcessor;

impl ImageProcessor {
    pub fn new() -> Self {
        Self
    }

    /// Reads only the image header; pixel data is never decoded.
    ///
    /// Formats the `image` crate cannot sniff (HEIC, HEIF, ...) are accepted
    /// on the strength of a declared `image/*` type and left for the model to
    /// judge.
    pub fn inspect(&self, data: &[u8], declared: Option<&str>) -> Result<ImageInfo, PromptError> {
        if data.is_empty() {
            return Err(PromptError::Validation("Uploaded file is empty".to_string()));
        }

        let declared = declared
            .map(str::trim)
            .filter(|declared| declared.starts_with("image/"));

        let reader = image::io::Reader::new(Cursor::new(data))
            .with_guessed_format()
            .map_err(|e| PromptError::FileRead(format!("Failed to read image: {}", e)))?;

        let Some(sniffed) = reader.format().and_then(media_type_for) else {
            return match declared {
                Some(declared) => {
                    debug!("Accepting unsniffable upload as declared {}", declared);
                    Ok(ImageInfo {
                        media_type: declared.to_string(),
                        width: None,
                        height: None,
                    })
                }
                None => Err(PromptError::Validation(
                    "Uploaded file is not a recognised image".to_string(),
                )),
            };
        };

        let media_type = declared.unwrap_or(sniffed).to_string();
        match reader.into_dimensions() {
            Ok((width, height)) => Ok(ImageInfo {
                media_type,
                width: Some(width),
                height: Some(height),
            }),
            Err(e) => {
                debug!("No dimensions for {} upload: {}", sniffed, e);
                Ok(ImageInfo {
                    media_type,
                    width: None,
                    height: None,
                })
            }
        }
    }
}

fn media_type_for(format: ImgFormat) -> Option<&'static str> {
    let media_type = match format {
        ImgFormat::Png => "image/png",
        ImgFormat::Jpeg => "image/jpeg",
        ImgFormat::Gif => "image/gif",
        ImgFormat::WebP => "image/webp",
        ImgFormat::Bmp => "image/bmp",
        ImgFormat::Tiff => "image/tiff",
        ImgFormat::Ico => "image/x-icon",
        ImgFormat::Avif => "image/avif",
        _ => return None,
    };
    Some(media_type)
}

#[cfg(test)]
pub(crate) fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let img = image::DynamicImage::new_rgb8(width, height);
    let mut output = Vec::new();
    img.write_to(&mut Cursor::new(&mut output), ImgFormat::Png)
        .expect("encode test png");
    output
}

/// A PNG that barely compresses, for tests that care about payload size.
#[cfg(test)]
pub(crate) fn noisy_png_bytes(width: u32, height: u32) -> Vec<u8> {
    let mut state: u32 = 0x9E37_79B9;
    let img = image::RgbImage::from_fn(width, height, |_, _| {
        state ^= state << 13;
        state ^= state >> 17;
        state ^= state << 5;
        let [r, g, b, _] = state.to_le_bytes();
        image::Rgb([r, g, b])
    });
    let mut output = Vec::new();
    image::DynamicImage::ImageRgb8(img)
        .write_to(&mut Cursor::new(&mut output), ImgFormat::Png)
        .expect("encode test png");
    output
}

/// ISO-BMFF `ftyp` box as found at the start of an iPhone HEIC photo.
#[cfg(test)]
pub(crate) fn heic_header() -> Vec<u8> {
    let mut data = vec![0x00, 0x00, 0x00, 0x18];
    data.extend_from_slice(b"ftypheic");
    data.extend_from_slice(&[0x00, 0x00, 0x00, 0x00]);
    data.extend_from_slice(b"mif1heic");
    data.extend_from_slice(&[0u8; 16]);
    data
}
