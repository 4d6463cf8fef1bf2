// src/handlers.rs
use crate::{AppState, errors::PromptError, models::*};
use actix_multipart::Multipart;
use actix_web::{Error, HttpResponse, web};
use bytes::BytesMut;
use futures_util::TryStreamExt;

pub async fn upload_image(
    mut payload: Multipart,
    data: web::Data<AppState>,
) -> Result<HttpResponse, Error> {
    let mut upload = None;

    while let Some(mut field) = payload.try_next().await? {
        let Some(filename) = field
            .content_disposition()
            .get_filename()
            .map(|name| name.to_string())
        else {
            continue;
        };

        let declared_type = field.content_type().map(|ct| ct.to_string());

        let mut image_data = BytesMut::new();
        while let Some(chunk) = field.try_next().await? {
            if image_data.len() + chunk.len() > data.max_upload_bytes {
                return Err(PromptError::Validation(format!(
                    "Image exceeds the {} byte upload limit",
                    data.max_upload_bytes
                ))
                .into());
            }
            image_data.extend_from_slice(&chunk);
        }

        upload = Some((filename, declared_type, image_data.freeze()));
        break;
    }

    let (filename, declared_type, image_data) = upload
        .ok_or_else(|| PromptError::Validation("No image file provided".to_string()))?;

    let info = data
        .image_processor
        .inspect(&image_data, declared_type.as_deref())?;
    let content_type = info.media_type;

    let summary = FileSummary {
        filename: filename.clone(),
        content_type: content_type.clone(),
        size: image_data.len(),
        width: info.width,
        height: info.height,
    };
    let file = UploadedFile::new(filename, content_type, image_data);

    let snapshot = data.controller.upload(file, summary);
    Ok(HttpResponse::Accepted().json(snapshot))
}

pub async fn get_session(data: web::Data<AppState>) -> HttpResponse {
    HttpResponse::Ok().json(data.controller.snapshot())
}

/// The preview data URL, sent once per session rather than on every poll.
pub async fn get_preview(data: web::Data<AppState>) -> HttpResponse {
    match data.controller.preview() {
        Some(preview) => HttpResponse::Ok().json(preview),
        None => HttpResponse::NotFound().json(serde_json::json!({
            "error": "Not found",
            "message": "No preview is available for the current session"
        })),
    }
}

pub async fn reset_session(data: web::Data<AppState>) -> HttpResponse {
    HttpResponse::Ok().json(data.controller.reset())
}

pub async fn health_check() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({
        "status": "healthy",
        "service": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION")
    }))
}
