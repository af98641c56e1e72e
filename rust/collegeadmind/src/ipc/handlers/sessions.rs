use crate::batches;
use crate::ipc::error::{err, no_workspace, respond};
use crate::ipc::params::{decode, optional_str, required_str};
use crate::ipc::types::{AppState, Request};
use crate::program::Department;
use crate::sessions::{self, NewSession};

fn handle_session_create(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db_mut() else {
        return no_workspace(&req.id);
    };
    let input: NewSession = match decode(&req.params) {
        Ok(v) => v,
        Err(e) => return err(&req.id, "bad_params", e.0, None),
    };
    respond(&req.id, sessions::create_session(conn, &input))
}

fn handle_session_activate(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db_mut() else {
        return no_workspace(&req.id);
    };
    let session_id = match required_str(&req.params, "sessionId") {
        Ok(v) => v,
        Err(e) => return err(&req.id, "bad_params", e.0, None),
    };
    respond(&req.id, sessions::activate_session(conn, &session_id))
}

fn handle_session_deactivate(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db_mut() else {
        return no_workspace(&req.id);
    };
    let session_id = match required_str(&req.params, "sessionId") {
        Ok(v) => v,
        Err(e) => return err(&req.id, "bad_params", e.0, None),
    };
    respond(&req.id, sessions::deactivate_session(conn, &session_id))
}

fn handle_session_get(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db() else {
        return no_workspace(&req.id);
    };
    let session_id = match required_str(&req.params, "sessionId") {
        Ok(v) => v,
        Err(e) => return err(&req.id, "bad_params", e.0, None),
    };
    respond(&req.id, sessions::get_session(conn, &session_id))
}

fn handle_sessions_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db() else {
        return no_workspace(&req.id);
    };
    let department = match optional_str(&req.params, "department")
        .map(|d| d.parse::<Department>())
        .transpose()
    {
        Ok(v) => v,
        Err(e) => return err(&req.id, "bad_params", e.to_string(), None),
    };
    respond(
        &req.id,
        sessions::list_sessions(conn, department)
            .map(|sessions| serde_json::json!({ "sessions": sessions })),
    )
}

fn handle_batches_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db() else {
        return no_workspace(&req.id);
    };
    let session_id = match required_str(&req.params, "sessionId") {
        Ok(v) => v,
        Err(e) => return err(&req.id, "bad_params", e.0, None),
    };
    respond(
        &req.id,
        batches::list_batches(conn, &session_id)
            .map(|batches| serde_json::json!({ "batches": batches })),
    )
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "session.create" => Some(handle_session_create(state, req)),
        "session.activate" => Some(handle_session_activate(state, req)),
        "session.deactivate" => Some(handle_session_deactivate(state, req)),
        "session.get" => Some(handle_session_get(state, req)),
        "sessions.list" => Some(handle_sessions_list(state, req)),
        "batches.list" => Some(handle_batches_list(state, req)),
        _ => None,
    }
}
