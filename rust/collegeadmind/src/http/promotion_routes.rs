//! Promotion endpoints under `/promotion`.

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, rejection::QueryRejection, Query, State},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use super::actor::Actor;
use super::session_id::SessionId;
use super::state::HttpState;
use crate::error::AppError;
use crate::program::Position;
use crate::promotion::{self, EligibilityReport, PromotionOutcome, PromotionRun};

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetQuery {
    #[serde(default)]
    pub target_year: Option<u32>,
    #[serde(default)]
    pub target_semester: Option<u32>,
}

impl TargetQuery {
    fn target(&self) -> Result<Option<Position>, AppError> {
        match (self.target_year, self.target_semester) {
            (None, None) => Ok(None),
            (Some(y), Some(s)) => Ok(Some(Position::new(y, s))),
            _ => Err(AppError::validation(
                "targetYear and targetSemester must be given together",
            )),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromoteRequest {
    pub session_id: String,
    pub target_year: u32,
    pub target_semester: u32,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryResponse {
    pub session_id: String,
    pub runs: Vec<PromotionRun>,
}

pub fn promotion_routes(state: Arc<HttpState>) -> Router {
    Router::new()
        .route("/eligible/:session_id", get(eligible))
        .route("/promote", post(promote))
        .route("/history/:session_id", get(history))
        .with_state(state)
}

async fn eligible(
    State(state): State<Arc<HttpState>>,
    SessionId(session_id): SessionId,
    query: Result<Query<TargetQuery>, QueryRejection>,
) -> Result<Json<EligibilityReport>, AppError> {
    let Query(query) = query?;
    let target = query.target()?;
    let conn = state.db.lock().await;
    Ok(Json(promotion::eligible_for_promotion(
        &conn,
        &session_id,
        target,
    )?))
}

async fn promote(
    State(state): State<Arc<HttpState>>,
    actor: Actor,
    payload: Result<Json<PromoteRequest>, JsonRejection>,
) -> Result<Json<PromotionOutcome>, AppError> {
    let Json(req) = payload?;
    let target = Position::new(req.target_year, req.target_semester);
    let mut conn = state.db.lock().await;
    let outcome = promotion::promote(&mut conn, req.session_id.trim(), target, &actor.0)?;
    Ok(Json(outcome))
}

async fn history(
    State(state): State<Arc<HttpState>>,
    SessionId(session_id): SessionId,
) -> Result<Json<HistoryResponse>, AppError> {
    let conn = state.db.lock().await;
    let runs = promotion::promotion_history(&conn, &session_id)?;
    Ok(Json(HistoryResponse { session_id, runs }))
}
