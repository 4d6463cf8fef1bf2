// src/errors.rs
use actix_web::{HttpResponse, ResponseError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PromptError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Failed to generate prompt: {0}")]
    Transport(String),

    #[error("Failed to generate prompt: {0}")]
    Parse(String),

    #[error("Failed to read image file: {0}")]
    FileRead(String),

    #[error("Validation error: {0}")]
    Validation(String),
}

impl ResponseError for PromptError {
    fn error_response(&self) -> HttpResponse {
        match self {
            PromptError::Configuration(_) => {
                HttpResponse::InternalServerError().json(serde_json::json!({
                    "error": "Configuration error",
                    "message": self.to_string()
                }))
            }
            PromptError::Transport(_) => HttpResponse::BadGateway().json(serde_json::json!({
                "error": "AI service error",
                "message": self.to_string()
            })),
            PromptError::Parse(_) => HttpResponse::BadGateway().json(serde_json::json!({
                "error": "AI response error",
                "message": self.to_string()
            })),
            PromptError::FileRead(_) => HttpResponse::BadRequest().json(serde_json::json!({
                "error": "File read error",
                "message": self.to_string()
            })),
            PromptError::Validation(_) => HttpResponse::BadRequest().json(serde_json::json!({
                "error": "Validation error",
                "message": self.to_string()
            })),
        }
    }
}
