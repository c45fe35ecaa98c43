use crate::{
    catalog::{self, AssetModel, CatalogSnapshot},
    config::AppConfig,
    editor::QueryDocument,
    error::{Result, ServiceError},
    query::{clauses::ClauseAction, PreviewResponse, QueryPatch, QueryState},
    session::{SessionSnapshot, SessionStore},
    state::AppState,
};
use axum::{
    body::Bytes,
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, State,
    },
    routing::{get, post, put},
    Json, Router,
};
use http::{HeaderMap, StatusCode};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::info;
use uuid::Uuid;

pub const API_KEY_HEADER: &str = "x-api-key";

pub struct Server {
    config: Arc<AppConfig>,
    state: AppState,
}

#[derive(Debug, Deserialize)]
pub struct RawEditRequest {
    #[serde(rename = "rawSQL")]
    pub raw_sql: String,
}

impl Server {
    pub fn new(config: AppConfig) -> Self {
        let sessions = SessionStore::new(&config);
        let config = Arc::new(config);
        let state = AppState::new(Arc::clone(&config), sessions);

        Self { config, state }
    }

    pub fn router(&self) -> Router {
        Router::new()
            .route("/healthz", get(Self::health))
            .route("/api/catalog", get(Self::catalog))
            .route("/api/catalog/:model", get(Self::catalog_model))
            .route("/api/preview", post(Self::preview))
            .route("/api/sessions", post(Self::create_session))
            .route(
                "/api/sessions/:id",
                get(Self::get_session)
                    .patch(Self::patch_session)
                    .delete(Self::delete_session),
            )
            .route("/api/sessions/:id/actions", post(Self::apply_action))
            .route("/api/sessions/:id/mode", post(Self::toggle_mode))
            .route("/api/sessions/:id/raw", put(Self::edit_raw))
            .with_state(self.state.clone())
            .layer(TraceLayer::new_for_http())
    }

    pub async fn run(self) -> anyhow::Result<()> {
        let addr = self.config.listen_addr;
        let listener = TcpListener::bind(addr).await?;
        info!(%addr, "sitewise-sql listening");
        axum::serve(listener, self.router()).await?;
        Ok(())
    }

    async fn health() -> Json<serde_json::Value> {
        Json(json!({ "status": "ok" }))
    }

    async fn catalog(
        State(state): State<AppState>,
        headers: HeaderMap,
    ) -> Result<Json<CatalogSnapshot>> {
        enforce_api_key(&headers, &state.config)?;
        Ok(Json(catalog::snapshot()))
    }

    async fn catalog_model(
        State(state): State<AppState>,
        headers: HeaderMap,
        Path(model): Path<String>,
    ) -> Result<Json<&'static AssetModel>> {
        enforce_api_key(&headers, &state.config)?;
        let model = catalog::find_model(&model)
            .ok_or_else(|| ServiceError::NotFound(format!("asset model '{model}'")))?;
        Ok(Json(model))
    }

    async fn preview(
        State(state): State<AppState>,
        headers: HeaderMap,
        payload: std::result::Result<Json<QueryState>, JsonRejection>,
    ) -> Result<Json<PreviewResponse>> {
        enforce_api_key(&headers, &state.config)?;
        let query = json_body(payload)?;
        let options = state.config.generator_options();
        Ok(Json(PreviewResponse::for_state(&query, &options)))
    }

    async fn create_session(
        State(state): State<AppState>,
        headers: HeaderMap,
        body: Bytes,
    ) -> Result<(StatusCode, Json<SessionSnapshot>)> {
        enforce_api_key(&headers, &state.config)?;
        let document = session_document(&body)?;
        let snapshot = state.sessions.create(document)?;
        Ok((StatusCode::CREATED, Json(snapshot)))
    }

    async fn get_session(
        State(state): State<AppState>,
        headers: HeaderMap,
        id: std::result::Result<Path<Uuid>, PathRejection>,
    ) -> Result<Json<SessionSnapshot>> {
        enforce_api_key(&headers, &state.config)?;
        Ok(Json(state.sessions.get(session_id(id)?)?))
    }

    async fn patch_session(
        State(state): State<AppState>,
        headers: HeaderMap,
        id: std::result::Result<Path<Uuid>, PathRejection>,
        payload: std::result::Result<Json<QueryPatch>, JsonRejection>,
    ) -> Result<Json<SessionSnapshot>> {
        enforce_api_key(&headers, &state.config)?;
        let id = session_id(id)?;
        let patch = json_body(payload)?;
        Ok(Json(state.sessions.update(id, patch)?))
    }

    async fn delete_session(
        State(state): State<AppState>,
        headers: HeaderMap,
        id: std::result::Result<Path<Uuid>, PathRejection>,
    ) -> Result<StatusCode> {
        enforce_api_key(&headers, &state.config)?;
        state.sessions.remove(session_id(id)?)?;
        Ok(StatusCode::NO_CONTENT)
    }

    async fn apply_action(
        State(state): State<AppState>,
        headers: HeaderMap,
        id: std::result::Result<Path<Uuid>, PathRejection>,
        payload: std::result::Result<Json<ClauseAction>, JsonRejection>,
    ) -> Result<Json<SessionSnapshot>> {
        enforce_api_key(&headers, &state.config)?;
        let id = session_id(id)?;
        let action = json_body(payload)?;
        Ok(Json(state.sessions.apply(id, action)?))
    }

    async fn toggle_mode(
        State(state): State<AppState>,
        headers: HeaderMap,
        id: std::result::Result<Path<Uuid>, PathRejection>,
    ) -> Result<Json<SessionSnapshot>> {
        enforce_api_key(&headers, &state.config)?;
        Ok(Json(state.sessions.toggle_mode(session_id(id)?)?))
    }

    async fn edit_raw(
        State(state): State<AppState>,
        headers: HeaderMap,
        id: std::result::Result<Path<Uuid>, PathRejection>,
        payload: std::result::Result<Json<RawEditRequest>, JsonRejection>,
    ) -> Result<Json<SessionSnapshot>> {
        enforce_api_key(&headers, &state.config)?;
        let id = session_id(id)?;
        let request = json_body(payload)?;
        Ok(Json(state.sessions.edit_raw(id, request.raw_sql)?))
    }
}

fn json_body<T>(payload: std::result::Result<Json<T>, JsonRejection>) -> Result<T> {
    payload
        .map(|Json(value)| value)
        .map_err(|rejection| ServiceError::InvalidRequest(rejection.body_text()))
}

/// An empty body opens a fresh session; anything else must be a valid document.
fn session_document(body: &[u8]) -> Result<Option<QueryDocument>> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(None);
    }

    serde_json::from_slice(body)
        .map(Some)
        .map_err(|err| ServiceError::InvalidRequest(format!("invalid session document: {err}")))
}

fn session_id(id: std::result::Result<Path<Uuid>, PathRejection>) -> Result<Uuid> {
    id.map(|Path(id)| id)
        .map_err(|_| ServiceError::InvalidRequest("session id must be a UUID".into()))
}

fn enforce_api_key(headers: &HeaderMap, config: &AppConfig) -> Result<()> {
    if let Some(expected) = &config.api_key {
        let provided = headers
            .get(API_KEY_HEADER)
            .and_then(|value| value.to_str().ok());

        if provided != Some(expected.as_str()) {
            return Err(ServiceError::Auth);
        }
    }

    Ok(())
}
