//! Builder sessions: the canonical query state of one open editor together
//! with its derived preview and validation messages.

use crate::{
    config::AppConfig,
    editor::{EditorMode, QueryDocument},
    error::{Result, ServiceError},
    query::{
        clauses::ClauseAction, generate_preview_with, validate_query, GeneratorOptions,
        QueryPatch, QueryState,
    },
};
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::{collections::HashMap, sync::Arc};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Receives every state the session forwards to its host.
pub trait ChangeListener: Send + Sync {
    fn on_change(&mut self, state: &QueryState);
}

impl<F> ChangeListener for F
where
    F: FnMut(&QueryState) + Send + Sync,
{
    fn on_change(&mut self, state: &QueryState) {
        (self)(state)
    }
}

pub struct QuerySession {
    state: QueryState,
    forwarded: QueryState,
    preview: String,
    errors: Vec<String>,
    options: GeneratorOptions,
    listener: Option<Box<dyn ChangeListener>>,
}

impl QuerySession {
    pub fn new(initial: QueryState, options: GeneratorOptions) -> Self {
        let mut session = Self {
            forwarded: initial.clone(),
            state: initial,
            preview: String::new(),
            errors: Vec::new(),
            options,
            listener: None,
        };
        session.refresh();
        session
    }

    pub fn with_listener(mut self, listener: impl ChangeListener + 'static) -> Self {
        self.listener = Some(Box::new(listener));
        self
    }

    pub fn state(&self) -> &QueryState {
        &self.state
    }

    pub fn preview(&self) -> &str {
        &self.preview
    }

    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    /// Merges `patch` into the current state, regenerates `rawSQL` and the
    /// derived views. Returns whether the state changed and was forwarded.
    pub fn update(&mut self, patch: QueryPatch) -> bool {
        let mut next = self.state.clone();
        next.merge(patch);
        next.raw_sql = generate_preview_with(&next, &self.options);
        self.state = next;
        self.refresh();

        if self.state == self.forwarded {
            return false;
        }

        self.forwarded = self.state.clone();
        if let Some(listener) = self.listener.as_mut() {
            listener.on_change(&self.state);
        }
        true
    }

    pub fn apply(&mut self, action: ClauseAction) -> bool {
        let patch = action.into_patch(&self.state);
        self.update(patch)
    }

    fn refresh(&mut self) {
        self.errors = validate_query(&self.state);
        self.preview = generate_preview_with(&self.state, &self.options);
    }
}

/// What clients see of a stored session.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub id: Uuid,
    pub state: QueryState,
    pub preview: String,
    pub errors: Vec<String>,
    pub mode: EditorMode,
    /// Text of the raw editor.
    #[serde(rename = "rawSQL")]
    pub raw_sql: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

struct SessionEntry {
    session: QuerySession,
    document: QueryDocument,
    mode: EditorMode,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl SessionEntry {
    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    fn sync_document(&mut self, forwarded: bool) {
        if forwarded {
            self.document.apply_builder_change(self.session.state());
        }
        self.touch();
    }
}

/// Open sessions keyed by id.
#[derive(Clone)]
pub struct SessionStore {
    sessions: Arc<RwLock<HashMap<Uuid, SessionEntry>>>,
    options: GeneratorOptions,
    max_sessions: usize,
    default_timezone: String,
    default_query: Arc<str>,
}

impl SessionStore {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            options: config.generator_options(),
            max_sessions: config.max_sessions,
            default_timezone: config.default_timezone.clone(),
            default_query: Arc::from(config.default_query.as_str()),
        }
    }

    pub fn len(&self) -> usize {
        self.sessions.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.read().is_empty()
    }

    /// Opens a session for `document`, or for a fresh default state.
    pub fn create(&self, document: Option<QueryDocument>) -> Result<SessionSnapshot> {
        let document = document.unwrap_or_default();
        let initial = document.builder_state(&self.default_timezone);

        let mut sessions = self.sessions.write();
        if sessions.len() >= self.max_sessions {
            warn!(max = self.max_sessions, "session capacity reached");
            return Err(ServiceError::Capacity(format!(
                "at most {} sessions may be open",
                self.max_sessions
            )));
        }

        let id = Uuid::new_v4();
        let now = Utc::now();
        let entry = SessionEntry {
            session: QuerySession::new(initial, self.options.clone()),
            document,
            mode: EditorMode::default(),
            created_at: now,
            updated_at: now,
        };
        let snapshot = self.snapshot(id, &entry);
        sessions.insert(id, entry);
        info!(session = %id, open = sessions.len(), "session opened");
        Ok(snapshot)
    }

    pub fn get(&self, id: Uuid) -> Result<SessionSnapshot> {
        let sessions = self.sessions.read();
        let entry = sessions.get(&id).ok_or_else(|| missing(id))?;
        Ok(self.snapshot(id, entry))
    }

    pub fn update(&self, id: Uuid, patch: QueryPatch) -> Result<SessionSnapshot> {
        self.with_entry(id, |entry| {
            let forwarded = entry.session.update(patch);
            debug!(session = %id, forwarded, "session patched");
            entry.sync_document(forwarded);
        })
    }

    pub fn apply(&self, id: Uuid, action: ClauseAction) -> Result<SessionSnapshot> {
        self.with_entry(id, |entry| {
            let forwarded = entry.session.apply(action);
            debug!(session = %id, forwarded, "clause action applied");
            entry.sync_document(forwarded);
        })
    }

    pub fn toggle_mode(&self, id: Uuid) -> Result<SessionSnapshot> {
        self.with_entry(id, |entry| {
            entry.mode = entry.mode.toggle();
            debug!(session = %id, mode = ?entry.mode, "editor mode toggled");
            entry.touch();
        })
    }

    /// Raw editor save/blur: only the document text changes.
    pub fn edit_raw(&self, id: Uuid, text: String) -> Result<SessionSnapshot> {
        self.with_entry(id, |entry| {
            entry.document.apply_raw_edit(text);
            entry.touch();
        })
    }

    pub fn remove(&self, id: Uuid) -> Result<()> {
        let mut sessions = self.sessions.write();
        sessions.remove(&id).ok_or_else(|| missing(id))?;
        info!(session = %id, open = sessions.len(), "session closed");
        Ok(())
    }

    fn with_entry<F>(&self, id: Uuid, edit: F) -> Result<SessionSnapshot>
    where
        F: FnOnce(&mut SessionEntry),
    {
        let mut sessions = self.sessions.write();
        let entry = sessions.get_mut(&id).ok_or_else(|| missing(id))?;
        edit(entry);
        Ok(self.snapshot(id, entry))
    }

    fn snapshot(&self, id: Uuid, entry: &SessionEntry) -> SessionSnapshot {
        SessionSnapshot {
            id,
            state: entry.session.state().clone(),
            preview: entry.session.preview().to_string(),
            errors: entry.session.errors().to_vec(),
            mode: entry.mode,
            raw_sql: entry.document.display_text(&self.default_query).to_string(),
            created_at: entry.created_at,
            updated_at: entry.updated_at,
        }
    }
}

fn missing(id: Uuid) -> ServiceError {
    ServiceError::NotFound(format!("session '{id}'"))
}
