//! Per-session screenplay state.
//!
//! A session holds the latest successful screenplay, its preview and cover,
//! and any earlier covers the user chose to keep. State is replaced only after
//! a pipeline run has fully succeeded, so a failed run leaves the previous
//! artifacts intact and downloadable. The store lock is never held across an
//! upstream call.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::RwLock;
use tracing::info;
use uuid::Uuid;

use crate::document::CoverImage;
use crate::errors::AppError;
use crate::screenplay::generator::GenerationOutcome;
use crate::screenplay::models::{Screenplay, ScreenplayRequest};

#[derive(Debug, Clone)]
pub struct SessionState {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub request: Option<ScreenplayRequest>,
    pub screenplay: Option<Screenplay>,
    pub preview: Option<String>,
    pub image_prompt: Option<String>,
    pub cover: Option<CoverImage>,
    /// Earlier covers, oldest first.
    pub retained_covers: Vec<CoverImage>,
    pub regeneration_count: u32,
}

/// What `GET /api/v1/sessions/:id` returns. Image bytes are fetched separately.
#[derive(Debug, Clone, Serialize)]
pub struct SessionSummary {
    pub session_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub title: Option<String>,
    pub preview: Option<String>,
    pub has_cover_image: bool,
    pub regeneration_count: u32,
    pub retained_images: usize,
}

impl SessionState {
    pub fn new() -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            created_at: now,
            updated_at: now,
            request: None,
            screenplay: None,
            preview: None,
            image_prompt: None,
            cover: None,
            retained_covers: Vec::new(),
            regeneration_count: 0,
        }
    }

    /// Replaces every generated artifact with the outcome of a new run.
    /// A new screenplay starts a fresh cover history.
    pub fn apply_generation(&mut self, outcome: GenerationOutcome) {
        let mut covers = outcome.covers.into_iter();
        self.cover = covers.next();
        self.retained_covers = covers.collect();
        self.request = Some(outcome.request);
        self.screenplay = Some(outcome.screenplay);
        self.preview = Some(outcome.preview);
        self.image_prompt = Some(outcome.image_prompt);
        self.regeneration_count = 0;
        self.updated_at = Utc::now();
    }

    /// Installs freshly generated covers. The first becomes current; any extras
    /// and, when `keep_previous` is set, the outgoing cover join the retained list.
    pub fn apply_regenerated_covers(&mut self, covers: Vec<CoverImage>, keep_previous: bool) {
        let mut covers = covers.into_iter();
        let Some(current) = covers.next() else {
            return;
        };

        if let Some(previous) = self.cover.replace(current) {
            if keep_previous {
                self.retained_covers.push(previous);
            }
        }
        self.retained_covers.extend(covers);
        self.regeneration_count += 1;
        self.updated_at = Utc::now();
    }

    pub fn summary(&self) -> SessionSummary {
        SessionSummary {
            session_id: self.id,
            created_at: self.created_at,
            updated_at: self.updated_at,
            title: self.screenplay.as_ref().and_then(|s| s.title.clone()),
            preview: self.preview.clone(),
            has_cover_image: self.cover.is_some(),
            regeneration_count: self.regeneration_count,
            retained_images: self.retained_covers.len(),
        }
    }
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new()
    }
}

/// In-memory session registry shared by all handlers.
#[derive(Clone, Default)]
pub struct SessionStore {
    sessions: Arc<RwLock<HashMap<Uuid, SessionState>>>,
}

impl SessionStore {
    pub async fn create(&self) -> SessionState {
        let session = SessionState::new();
        self.sessions
            .write()
            .await
            .insert(session.id, session.clone());
        info!("Session {} created", session.id);
        session
    }

    /// A snapshot of the session; later changes to the store do not affect it.
    pub async fn get(&self, id: Uuid) -> Result<SessionState, AppError> {
        self.sessions
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or_else(|| not_found(id))
    }

    /// Applies `change` under the write lock and returns the updated state.
    pub async fn update<F>(&self, id: Uuid, change: F) -> Result<SessionState, AppError>
    where
        F: FnOnce(&mut SessionState),
    {
        let mut sessions = self.sessions.write().await;
        let session = sessions.get_mut(&id).ok_or_else(|| not_found(id))?;
        change(session);
        Ok(session.clone())
    }

    pub async fn remove(&self, id: Uuid) -> Result<(), AppError> {
        self.sessions
            .write()
            .await
            .remove(&id)
            .map(|_| info!("Session {id} closed"))
            .ok_or_else(|| not_found(id))
    }
}

fn not_found(id: Uuid) -> AppError {
    AppError::NotFound(format!("session {id} does not exist"))
}
