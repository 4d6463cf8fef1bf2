// src/controller.rs
use log::{debug, info, warn};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::models::{FileSummary, SessionId, SessionPreview, SessionSnapshot, UploadedFile};
use crate::services::{FileEncoder, PromptModel};
use crate::session::Session;

/// Owns the one live upload session and sequences preview and generation
/// for each upload.
pub struct SessionController {
    session: Mutex<Session>,
    encoder: FileEncoder,
    model: Arc<dyn PromptModel>,
}

impl SessionController {
    pub fn new(model: Arc<dyn PromptModel>) -> Self {
        Self {
            session: Mutex::new(Session::default()),
            encoder: FileEncoder::new(),
            model,
        }
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.lock().snapshot()
    }

    pub fn preview(&self) -> Option<SessionPreview> {
        self.lock().preview()
    }

    /// Starts a new session and runs preview and generation as two
    /// independent tasks.
    pub fn upload(self: &Arc<Self>, file: UploadedFile, summary: FileSummary) -> SessionSnapshot {
        let (id, snapshot) = self.begin(summary);
        info!(
            "Session {}: generating prompt for {} ({} bytes, {})",
            id,
            file.filename,
            file.size(),
            file.content_type
        );

        let preview_file = file.clone();
        let controller = Arc::clone(self);
        tokio::spawn(async move {
            controller.load_preview(id, &preview_file);
        });

        let controller = Arc::clone(self);
        tokio::spawn(async move {
            controller.generate(id, &file).await;
        });

        snapshot
    }

    pub fn begin(&self, summary: FileSummary) -> (SessionId, SessionSnapshot) {
        let mut session = self.lock();
        *session = session.start(summary);
        (session.id(), session.snapshot())
    }

    /// Returns whether the preview was applied to the current session.
    pub fn load_preview(&self, id: SessionId, file: &UploadedFile) -> bool {
        let preview = self.encoder.preview_data_url(file);
        if let Err(e) = &preview {
            warn!("Session {}: preview unavailable: {}", id, e);
        }

        let mut session = self.lock();
        match session.preview_loaded(id, preview) {
            Some(next) => {
                *session = next;
                true
            }
            None => {
                debug!("Session {}: dropping preview for superseded upload", id);
                false
            }
        }
    }

    /// Encodes, calls the model once, and records the outcome if `id` is
    /// still current. Returns whether the outcome was applied.
    pub async fn generate(&self, id: SessionId, file: &UploadedFile) -> bool {
        let outcome = match self.encoder.encode(file) {
            Ok(image) => self.model.generate_prompt(&image).await,
            Err(e) => Err(e),
        };

        match &outcome {
            Ok(_) => info!("Session {}: prompt ready", id),
            Err(e) => warn!("Session {}: {}", id, e),
        }

        let mut session = self.lock();
        match session.finished(id, outcome) {
            Some(next) => {
                *session = next;
                true
            }
            None => {
                debug!("Session {}: dropping result for superseded upload", id);
                false
            }
        }
    }

    pub fn reset(&self) -> SessionSnapshot {
        let mut session = self.lock();
        *session = session.reset();
        info!("Session reset");
        session.snapshot()
    }

    fn lock(&self) -> MutexGuard<'_, Session> {
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
