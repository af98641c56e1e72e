//! Session registry endpoints under `/session`.

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, rejection::QueryRejection, Query, State},
    http::StatusCode,
    routing::{get, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use super::session_id::SessionId;
use super::state::HttpState;
use crate::batches::{self, Batch};
use crate::error::AppError;
use crate::program::Department;
use crate::sessions::{self, CreatedSession, NewSession, Session};

#[derive(Debug, Deserialize)]
pub struct SessionListQuery {
    #[serde(default)]
    pub department: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SessionListResponse {
    pub sessions: Vec<Session>,
    pub total: usize,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchListResponse {
    pub session_id: String,
    pub batches: Vec<Batch>,
}

pub fn session_routes(state: Arc<HttpState>) -> Router {
    Router::new()
        .route("/", get(list_sessions).post(create_session))
        .route("/:session_id", get(get_session))
        .route("/:session_id/activate", put(activate_session))
        .route("/:session_id/deactivate", put(deactivate_session))
        .route("/:session_id/batches", get(list_batches))
        .with_state(state)
}

async fn create_session(
    State(state): State<Arc<HttpState>>,
    payload: Result<Json<NewSession>, JsonRejection>,
) -> Result<(StatusCode, Json<CreatedSession>), AppError> {
    let Json(input) = payload?;
    let mut conn = state.db.lock().await;
    let created = sessions::create_session(&mut conn, &input)?;
    Ok((StatusCode::CREATED, Json(created)))
}

async fn list_sessions(
    State(state): State<Arc<HttpState>>,
    query: Result<Query<SessionListQuery>, QueryRejection>,
) -> Result<Json<SessionListResponse>, AppError> {
    let Query(query) = query?;
    let department = query
        .department
        .as_deref()
        .map(str::parse::<Department>)
        .transpose()?;
    let conn = state.db.lock().await;
    let sessions = sessions::list_sessions(&conn, department)?;
    Ok(Json(SessionListResponse {
        total: sessions.len(),
        sessions,
    }))
}

async fn get_session(
    State(state): State<Arc<HttpState>>,
    SessionId(session_id): SessionId,
) -> Result<Json<Session>, AppError> {
    let conn = state.db.lock().await;
    Ok(Json(sessions::get_session(&conn, &session_id)?))
}

async fn activate_session(
    State(state): State<Arc<HttpState>>,
    SessionId(session_id): SessionId,
) -> Result<Json<Session>, AppError> {
    let mut conn = state.db.lock().await;
    Ok(Json(sessions::activate_session(&mut conn, &session_id)?))
}

async fn deactivate_session(
    State(state): State<Arc<HttpState>>,
    SessionId(session_id): SessionId,
) -> Result<Json<Session>, AppError> {
    let mut conn = state.db.lock().await;
    Ok(Json(sessions::deactivate_session(&mut conn, &session_id)?))
}

async fn list_batches(
    State(state): State<Arc<HttpState>>,
    SessionId(session_id): SessionId,
) -> Result<Json<BatchListResponse>, AppError> {
    let conn = state.db.lock().await;
    let batches = batches::list_batches(&conn, &session_id)?;
    Ok(Json(BatchListResponse {
        session_id,
        batches,
    }))
}
