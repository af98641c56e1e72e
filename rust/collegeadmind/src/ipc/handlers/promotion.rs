use crate::ipc::error::{err, no_workspace, respond};
use crate::ipc::params::{optional_str, required_str, required_u32, ParamErr};
use crate::ipc::types::{AppState, Request};
use crate::program::Position;
use crate::promotion;

const SIDECAR_ACTOR: &str = "anonymous";

/// Target is optional for eligibility, but when one half is present both must be.
fn optional_target(params: &serde_json::Value) -> Result<Option<Position>, ParamErr> {
    if params.get("targetYear").is_none() && params.get("targetSemester").is_none() {
        return Ok(None);
    }
    Ok(Some(Position::new(
        required_u32(params, "targetYear")?,
        required_u32(params, "targetSemester")?,
    )))
}

fn handle_promotion_eligible(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db() else {
        return no_workspace(&req.id);
    };
    let session_id = match required_str(&req.params, "sessionId") {
        Ok(v) => v,
        Err(e) => return err(&req.id, "bad_params", e.0, None),
    };
    let target = match optional_target(&req.params) {
        Ok(v) => v,
        Err(e) => return err(&req.id, "bad_params", e.0, None),
    };
    respond(
        &req.id,
        promotion::eligible_for_promotion(conn, &session_id, target),
    )
}

fn handle_promotion_promote(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db_mut() else {
        return no_workspace(&req.id);
    };
    let session_id = match required_str(&req.params, "sessionId") {
        Ok(v) => v,
        Err(e) => return err(&req.id, "bad_params", e.0, None),
    };
    let target = match (
        required_u32(&req.params, "targetYear"),
        required_u32(&req.params, "targetSemester"),
    ) {
        (Ok(y), Ok(s)) => Position::new(y, s),
        (Err(e), _) | (_, Err(e)) => return err(&req.id, "bad_params", e.0, None),
    };
    let actor = optional_str(&req.params, "actor").unwrap_or_else(|| SIDECAR_ACTOR.to_string());
    respond(
        &req.id,
        promotion::promote(conn, &session_id, target, &actor),
    )
}

fn handle_promotion_history(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db() else {
        return no_workspace(&req.id);
    };
    let session_id = match required_str(&req.params, "sessionId") {
        Ok(v) => v,
        Err(e) => return err(&req.id, "bad_params", e.0, None),
    };
    respond(
        &req.id,
        promotion::promotion_history(conn, &session_id)
            .map(|runs| serde_json::json!({ "sessionId": session_id, "runs": runs })),
    )
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "promotion.eligible" => Some(handle_promotion_eligible(state, req)),
        "promotion.promote" => Some(handle_promotion_promote(state, req)),
        "promotion.history" => Some(handle_promotion_history(state, req)),
        _ => None,
    }
}
