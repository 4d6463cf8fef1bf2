// src/session.rs
//! The single upload session and its transitions.
//!
//! Every transition takes the current session by reference and returns the
//! next one. Completions carry the id of the upload that started them and are
//! dropped (`None`) once that upload is no longer current.

use chrono::{DateTime, Utc};

use crate::errors::PromptError;
use crate::models::{
    FileSummary, PromptData, SessionId, SessionPreview, SessionSnapshot, SessionStatus,
};

pub const UNEXPECTED_ERROR: &str = "An unexpected error occurred.";

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Session {
    id: SessionId,
    file: Option<FileSummary>,
    preview: Option<String>,
    preview_error: Option<String>,
    result: Option<PromptData>,
    error: Option<String>,
    loading: bool,
    started_at: Option<DateTime<Utc>>,
    finished_at: Option<DateTime<Utc>>,
}

impl Session {
    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn status(&self) -> SessionStatus {
        if self.loading {
            SessionStatus::Loading
        } else if self.result.is_some() {
            SessionStatus::Ready
        } else if self.error.is_some() {
            SessionStatus::Failed
        } else {
            SessionStatus::Idle
        }
    }

    /// Discards everything from the previous upload.
    pub fn start(&self, file: FileSummary) -> Session {
        Session {
            id: self.id + 1,
            file: Some(file),
            loading: true,
            started_at: Some(Utc::now()),
            ..Session::default()
        }
    }

    pub fn preview_loaded(
        &self,
        id: SessionId,
        preview: Result<String, PromptError>,
    ) -> Option<Session> {
        if !self.is_current(id) {
            return None;
        }

        let mut next = self.clone();
        match preview {
            Ok(url) => next.preview = Some(url),
            Err(e) => next.preview_error = Some(e.to_string()),
        }
        Some(next)
    }

    pub fn finished(
        &self,
        id: SessionId,
        outcome: Result<PromptData, PromptError>,
    ) -> Option<Session> {
        if !self.is_current(id) || !self.loading {
            return None;
        }

        let mut next = self.clone();
        next.loading = false;
        next.finished_at = Some(Utc::now());
        match outcome {
            Ok(prompt) => next.result = Some(prompt),
            Err(e) => {
                let message = e.to_string();
                next.error = Some(if message.trim().is_empty() {
                    UNEXPECTED_ERROR.to_string()
                } else {
                    message
                });
            }
        }
        Some(next)
    }

    /// Back to idle. The id still advances so in-flight work is ignored.
    pub fn reset(&self) -> Session {
        Session {
            id: self.id + 1,
            ..Session::default()
        }
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            session_id: self.id,
            status: self.status(),
            file: self.file.clone(),
            has_preview: self.preview.is_some(),
            preview_error: self.preview_error.clone(),
            result: self.result.clone(),
            error: self.error.clone(),
            started_at: self.started_at,
            finished_at: self.finished_at,
        }
    }

    pub fn preview(&self) -> Option<SessionPreview> {
        self.preview.as_ref().map(|data_url| SessionPreview {
            session_id: self.id,
            data_url: data_url.clone(),
        })
    }

    fn is_current(&self, id: SessionId) -> bool {
        self.id == id && self.file.is_some()
    }
}
