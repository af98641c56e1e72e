use crate::ipc::error::{err, no_workspace, respond};
use crate::ipc::params::{decode, optional_str, required_str};
use crate::ipc::types::{AppState, Request};
use crate::roster::{self, NewStudent, StudentStatus};

fn handle_students_enroll(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db() else {
        return no_workspace(&req.id);
    };
    let input: NewStudent = match decode(&req.params) {
        Ok(v) => v,
        Err(e) => return err(&req.id, "bad_params", e.0, None),
    };
    respond(&req.id, roster::enroll_student(conn, &input))
}

fn handle_students_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db() else {
        return no_workspace(&req.id);
    };
    let session_id = match required_str(&req.params, "sessionId") {
        Ok(v) => v,
        Err(e) => return err(&req.id, "bad_params", e.0, None),
    };
    let status = match optional_str(&req.params, "status")
        .map(|s| s.parse::<StudentStatus>())
        .transpose()
    {
        Ok(v) => v,
        Err(e) => return err(&req.id, "bad_params", e.to_string(), None),
    };
    respond(
        &req.id,
        roster::list_students(conn, &session_id, status)
            .map(|students| serde_json::json!({ "students": students })),
    )
}

fn handle_students_get(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db() else {
        return no_workspace(&req.id);
    };
    let student_id = match required_str(&req.params, "studentId") {
        Ok(v) => v,
        Err(e) => return err(&req.id, "bad_params", e.0, None),
    };
    respond(&req.id, roster::get_student(conn, &student_id))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "students.enroll" => Some(handle_students_enroll(state, req)),
        "students.list" => Some(handle_students_list(state, req)),
        "students.get" => Some(handle_students_get(state, req)),
        _ => None,
    }
}
