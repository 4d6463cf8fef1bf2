// src/services/encoder.rs
use crate::errors::PromptError;
use crate::models::{EncodedImage, UploadedFile};
use base64::{Engine as _, engine::general_purpose};

/// Turns uploads into base64 payloads. The preview and the model payload are
/// produced by separate reads so either can fail on its own.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileEncoder;

impl FileEncoder {
    pub fn new() -> Self {
        Self
    }

    pub fn encode(&self, file: &UploadedFile) -> Result<EncodedImage, PromptError> {
        let mime_type = Self::media_type(file)?;
        let data = Self::read(file)?;

        Ok(EncodedImage {
            data: general_purpose::STANDARD.encode(data),
            mime_type,
        })
    }

    pub fn preview_data_url(&self, file: &UploadedFile) -> Result<String, PromptError> {
        let mime_type = Self::media_type(file)?;
        let data = Self::read(file)?;

        Ok(format!(
            "data:{};base64,{}",
            mime_type,
            general_purpose::STANDARD.encode(data)
        ))
    }

    fn read(file: &UploadedFile) -> Result<&[u8], PromptError> {
        if file.data.is_empty() {
            return Err(PromptError::FileRead(format!(
                "{} is empty",
                file.filename
            )));
        }
        Ok(&file.data)
    }

    fn media_type(file: &UploadedFile) -> Result<String, PromptError> {
        let media_type = file.content_type.trim();
        if media_type.is_empty() {
            return Err(PromptError::FileRead(format!(
                "{} has no media type",
                file.filename
            )));
        }
        Ok(media_type.to_string())
    }
}
