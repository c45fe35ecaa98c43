//! Host-side query document and the raw/builder editor toggle.

use crate::query::QueryState;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EditorMode {
    Raw,
    #[default]
    Builder,
}

impl EditorMode {
    pub fn toggle(self) -> Self {
        match self {
            EditorMode::Raw => EditorMode::Builder,
            EditorMode::Builder => EditorMode::Raw,
        }
    }
}

/// The query as the host stores it: the text that is sent for execution and
/// the builder state it was generated from, if any.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryDocument {
    #[serde(default, rename = "rawSQL")]
    pub raw_sql: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sql_query_state: Option<QueryState>,
}

impl QueryDocument {
    /// Stored builder state, or the editor defaults in `default_timezone`.
    pub fn builder_state(&self, default_timezone: &str) -> QueryState {
        match &self.sql_query_state {
            Some(state) => state.clone(),
            None => QueryState {
                timezone: default_timezone.to_string(),
                ..QueryState::default()
            },
        }
    }

    /// Mirrors a builder update: the generated text replaces the raw text.
    pub fn apply_builder_change(&mut self, state: &QueryState) {
        self.raw_sql = state.raw_sql.clone();
        self.sql_query_state = Some(state.clone());
    }

    /// A save or blur in the raw editor only replaces the text.
    pub fn apply_raw_edit(&mut self, text: impl Into<String>) {
        self.raw_sql = text.into();
    }

    /// Text shown in the raw editor, falling back to the data source default.
    pub fn display_text<'a>(&'a self, default_query: &'a str) -> &'a str {
        if self.raw_sql.is_empty() {
            default_query
        } else {
            &self.raw_sql
        }
    }
}
