// src/models.rs
use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::PromptError;

pub type SessionId = u64;

/// Settings an image generator needs alongside the prompt text. Numeric-looking
/// values are kept as the model produced them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationParameters {
    pub style: String,
    pub lighting: String,
    pub camera: String,
    /// Hex colors, dominant first.
    pub color_palette: Vec<String>,
    pub cfg_scale: String,
    pub steps: String,
    pub sampler: String,
    /// Integer text, or "-1" for a random seed.
    pub seed: String,
    /// "W:H", e.g. "16:9".
    pub aspect_ratio: String,
}

impl GenerationParameters {
    fn text_fields(&self) -> [(&'static str, &str); 8] {
        [
            ("style", self.style.as_str()),
            ("lighting", self.lighting.as_str()),
            ("camera", self.camera.as_str()),
            ("cfg_scale", self.cfg_scale.as_str()),
            ("steps", self.steps.as_str()),
            ("sampler", self.sampler.as_str()),
            ("seed", self.seed.as_str()),
            ("aspect_ratio", self.aspect_ratio.as_str()),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromptData {
    pub positive_prompt: String,
    pub negative_prompt: String,
    pub parameters: GenerationParameters,
}

impl PromptData {
    /// Rejects blank text fields. Serde already rejects missing or mistyped ones.
    pub fn validate(&self) -> Result<(), PromptError> {
        let top_level = [
            ("positive_prompt", self.positive_prompt.as_str()),
            ("negative_prompt", self.negative_prompt.as_str()),
        ];
        let parameters = self.parameters.text_fields();

        for (name, value) in top_level.into_iter().chain(parameters) {
            if value.trim().is_empty() {
                return Err(PromptError::Parse(format!(
                    "model response left `{}` empty",
                    name
                )));
            }
        }

        if let Some(index) = self
            .parameters
            .color_palette
            .iter()
            .position(|color| color.trim().is_empty())
        {
            return Err(PromptError::Parse(format!(
                "model response has an empty color_palette entry at index {}",
                index
            )));
        }

        Ok(())
    }
}

/// An image exactly as the browser sent it.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub filename: String,
    pub content_type: String,
    pub data: Bytes,
}

impl UploadedFile {
    pub fn new(filename: impl Into<String>, content_type: impl Into<String>, data: Bytes) -> Self {
        Self {
            filename: filename.into(),
            content_type: content_type.into(),
            data,
        }
    }

    pub fn size(&self) -> usize {
        self.data.len()
    }
}

/// Transport-safe form of an upload, shaped like Gemini's `inlineData` part.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EncodedImage {
    pub data: String,
    pub mime_type: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileSummary {
    pub filename: String,
    pub content_type: String,
    pub size: usize,
    pub width: Option<u32>,
    pub height: Option<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Idle,
    Loading,
    Ready,
    Failed,
}

/// What the page sees of the current upload session. The preview itself is
/// fetched separately so polling stays cheap.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionSnapshot {
    pub session_id: SessionId,
    pub status: SessionStatus,
    pub file: Option<FileSummary>,
    pub has_preview: bool,
    pub preview_error: Option<String>,
    pub result: Option<PromptData>,
    pub error: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionPreview {
    pub session_id: SessionId,
    pub data_url: String,
}

#[cfg(test)]
pub(crate) fn sample_prompt() -> PromptData {
    PromptData {
        positive_prompt: "a red bicycle leaning against a brick wall".to_string(),
        negative_prompt: "blurry, low quality".to_string(),
        parameters: GenerationParameters {
            style: "photorealistic".to_string(),
            lighting: "soft natural light".to_string(),
            camera: "35mm, eye level".to_string(),
            color_palette: vec!["#B22222".to_string(), "#8B4513".to_string()],
            cfg_scale: "7.5".to_string(),
            steps: "30".to_string(),
            sampler: "DPM++ 2M Karras".to_string(),
            seed: "-1".to_string(),
            aspect_ratio: "4:3".to_string(),
        },
    }
}
