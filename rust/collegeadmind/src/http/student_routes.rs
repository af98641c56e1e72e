//! Roster endpoints under `/student`.

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, rejection::QueryRejection, Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};

use super::state::HttpState;
use crate::error::AppError;
use crate::roster::{self, NewStudent, Student, StudentStatus};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentListQuery {
    pub session_id: String,
    #[serde(default)]
    pub status: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentListResponse {
    pub session_id: String,
    pub students: Vec<Student>,
    pub total: usize,
}

pub fn student_routes(state: Arc<HttpState>) -> Router {
    Router::new()
        .route("/", get(list_students).post(enroll_student))
        .route("/:student_id", get(get_student))
        .with_state(state)
}

async fn enroll_student(
    State(state): State<Arc<HttpState>>,
    payload: Result<Json<NewStudent>, JsonRejection>,
) -> Result<(StatusCode, Json<Student>), AppError> {
    let Json(input) = payload?;
    let conn = state.db.lock().await;
    let student = roster::enroll_student(&conn, &input)?;
    Ok((StatusCode::CREATED, Json(student)))
}

async fn list_students(
    State(state): State<Arc<HttpState>>,
    query: Result<Query<StudentListQuery>, QueryRejection>,
) -> Result<Json<StudentListResponse>, AppError> {
    let Query(query) = query?;
    let status = query
        .status
        .as_deref()
        .map(str::parse::<StudentStatus>)
        .transpose()?;
    let conn = state.db.lock().await;
    let session_id = query.session_id.trim().to_string();
    let students = roster::list_students(&conn, &session_id, status)?;
    Ok(Json(StudentListResponse {
        session_id,
        total: students.len(),
        students,
    }))
}

async fn get_student(
    State(state): State<Arc<HttpState>>,
    Path(student_id): Path<String>,
) -> Result<Json<Student>, AppError> {
    let conn = state.db.lock().await;
    Ok(Json(roster::get_student(&conn, &student_id)?))
}
