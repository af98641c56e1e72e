use crate::batches::{generate_batches, insert_batches};
use crate::db::now_rfc3339;
use crate::error::{AppError, AppResult};
use crate::program::Department;
use chrono::NaiveDate;
use rusqlite::{Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub session_id: String,
    pub department: Department,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub description: Option<String>,
    pub active: bool,
    pub created_at: String,
}

/// Unvalidated input for `create_session`, as it arrives on the wire.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewSession {
    pub session_id: String,
    pub start_date: String,
    pub end_date: String,
    #[serde(default)]
    pub description: Option<String>,
    pub department: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedSession {
    pub session_id: String,
    pub generated_batches: usize,
}

const SESSION_COLUMNS: &str =
    "id, department, start_date, end_date, description, active, created_at";

fn parse_date(field: &str, raw: &str) -> AppResult<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").map_err(|_| {
        AppError::validation(format!("{} must be a YYYY-MM-DD date, got '{}'", field, raw))
    })
}

type SessionRow = (String, String, String, String, Option<String>, bool, String);

fn session_from_row(r: &Row<'_>) -> rusqlite::Result<SessionRow> {
    Ok((
        r.get(0)?,
        r.get(1)?,
        r.get(2)?,
        r.get(3)?,
        r.get(4)?,
        r.get::<_, i64>(5)? != 0,
        r.get(6)?,
    ))
}

fn build_session(raw: SessionRow) -> AppResult<Session> {
    let (session_id, department, start, end, description, active, created_at) = raw;
    Ok(Session {
        department: department.parse()?,
        start_date: parse_date("startDate", &start)?,
        end_date: parse_date("endDate", &end)?,
        session_id,
        description,
        active,
        created_at,
    })
}

/// Validates and persists a session together with its generated batches.
///
/// Both inserts share one transaction; on any error nothing is written.
pub fn create_session(conn: &mut Connection, input: &NewSession) -> AppResult<CreatedSession> {
    let session_id = input.session_id.trim().to_string();
    if session_id.is_empty() {
        return Err(AppError::validation("sessionId must not be empty"));
    }
    let department: Department = input.department.parse()?;
    let start = parse_date("startDate", &input.start_date)?;
    let end = parse_date("endDate", &input.end_date)?;
    if start >= end {
        return Err(AppError::validation(format!(
            "startDate {} must be before endDate {}",
            start, end
        )));
    }
    let description = input
        .description
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string);

    let tx = conn.transaction()?;
    let exists: Option<i64> = tx
        .query_row("SELECT 1 FROM sessions WHERE id = ?", [&session_id], |r| {
            r.get(0)
        })
        .optional()?;
    if exists.is_some() {
        return Err(AppError::Duplicate(format!(
            "session '{}' already exists",
            session_id
        )));
    }

    tx.execute(
        "INSERT INTO sessions(id, department, start_date, end_date, description, active, created_at)
         VALUES(?, ?, ?, ?, ?, 0, ?)",
        (
            &session_id,
            department.as_str(),
            start.format("%Y-%m-%d").to_string(),
            end.format("%Y-%m-%d").to_string(),
            &description,
            now_rfc3339(),
        ),
    )?;

    let batches = generate_batches(&session_id, department, &department.program());
    let generated = insert_batches(&tx, &batches)?;
    tx.commit()?;

    tracing::info!(
        session_id = %session_id,
        department = %department,
        generated_batches = generated,
        "session created"
    );
    Ok(CreatedSession {
        session_id,
        generated_batches: generated,
    })
}

pub fn get_session(conn: &Connection, session_id: &str) -> AppResult<Session> {
    let sql = format!("SELECT {} FROM sessions WHERE id = ?", SESSION_COLUMNS);
    let raw = conn
        .query_row(&sql, [session_id], session_from_row)
        .optional()?
        .ok_or_else(|| AppError::not_found(format!("session '{}' not found", session_id)))?;
    build_session(raw)
}

pub fn list_sessions(conn: &Connection, department: Option<Department>) -> AppResult<Vec<Session>> {
    let rows = match department {
        Some(d) => {
            let sql = format!(
                "SELECT {} FROM sessions WHERE department = ? ORDER BY start_date DESC, id",
                SESSION_COLUMNS
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map([d.as_str()], session_from_row)?;
            rows.collect::<Result<Vec<_>, _>>()?
        }
        None => {
            let sql = format!(
                "SELECT {} FROM sessions ORDER BY start_date DESC, id",
                SESSION_COLUMNS
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map([], session_from_row)?;
            rows.collect::<Result<Vec<_>, _>>()?
        }
    };
    rows.into_iter().map(build_session).collect()
}

/// Marks a session active and deactivates any other active session of the
/// same department in the same transaction.
pub fn activate_session(conn: &mut Connection, session_id: &str) -> AppResult<Session> {
    let tx = conn.transaction()?;
    let session = get_session(&tx, session_id)?;
    let displaced = tx.execute(
        "UPDATE sessions SET active = 0 WHERE department = ? AND id <> ? AND active = 1",
        (session.department.as_str(), session_id),
    )?;
    tx.execute("UPDATE sessions SET active = 1 WHERE id = ?", [session_id])?;
    let session = get_session(&tx, session_id)?;
    tx.commit()?;

    tracing::info!(
        session_id = %session_id,
        department = %session.department,
        displaced,
        "session activated"
    );
    Ok(session)
}

pub fn deactivate_session(conn: &mut Connection, session_id: &str) -> AppResult<Session> {
    let tx = conn.transaction()?;
    get_session(&tx, session_id)?;
    tx.execute("UPDATE sessions SET active = 0 WHERE id = ?", [session_id])?;
    let session = get_session(&tx, session_id)?;
    tx.commit()?;
    tracing::info!(session_id = %session_id, "session deactivated");
    Ok(session)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::batches::list_batches;
    use crate::db::open_in_memory;

    fn new_session(id: &str, dept: &str, start: &str, end: &str) -> NewSession {
        NewSession {
            session_id: id.to_string(),
            start_date: start.to_string(),
            end_date: end.to_string(),
            description: Some("Academic year".to_string()),
            department: dept.to_string(),
        }
    }

    fn count(conn: &Connection, table: &str) -> i64 {
        conn.query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |r| r.get(0))
            .unwrap()
    }

    #[test]
    fn bsc_session_generates_three_batches() {
        let mut conn = open_in_memory();
        let created = create_session(
            &mut conn,
            &new_session("2025-26", "BSc", "2025-07-01", "2026-06-30"),
        )
        .expect("create");
        assert_eq!(created.generated_batches, 3);
        assert_eq!(list_batches(&conn, "2025-26").unwrap().len(), 3);

        let s = get_session(&conn, "2025-26").unwrap();
        assert_eq!(s.department, Department::Bsc);
        assert!(!s.active);
        assert_eq!(s.description.as_deref(), Some("Academic year"));
    }

    #[test]
    fn generated_batches_match_program_years() {
        let mut conn = open_in_memory();
        for (i, dept) in Department::ALL.iter().enumerate() {
            let id = format!("s{}", i);
            let created = create_session(
                &mut conn,
                &new_session(&id, dept.as_str(), "2025-07-01", "2026-06-30"),
            )
            .unwrap();
            assert_eq!(created.generated_batches as u32, dept.program().years);
        }
    }

    #[test]
    fn inverted_or_equal_dates_are_rejected_and_persist_nothing() {
        let mut conn = open_in_memory();
        for (start, end) in [("2026-06-30", "2025-07-01"), ("2025-07-01", "2025-07-01")] {
            let e = create_session(&mut conn, &new_session("bad", "BSc", start, end)).unwrap_err();
            assert_eq!(e.code(), "validation_error");
        }
        assert_eq!(count(&conn, "sessions"), 0);
        assert_eq!(count(&conn, "batches"), 0);
    }

    #[test]
    fn malformed_input_is_a_validation_error() {
        let mut conn = open_in_memory();
        let cases = [
            new_session("  ", "BSc", "2025-07-01", "2026-06-30"),
            new_session("x", "Arts", "2025-07-01", "2026-06-30"),
            new_session("x", "BSc", "01/07/2025", "2026-06-30"),
        ];
        for c in cases {
            let e = create_session(&mut conn, &c).unwrap_err();
            assert_eq!(e.code(), "validation_error", "{:?}", c);
        }
    }

    #[test]
    fn duplicate_session_id_is_rejected() {
        let mut conn = open_in_memory();
        let input = new_session("2025-26", "BSc", "2025-07-01", "2026-06-30");
        create_session(&mut conn, &input).unwrap();
        let e = create_session(&mut conn, &input).unwrap_err();
        assert_eq!(e.code(), "duplicate");
        assert_eq!(count(&conn, "batches"), 3);
    }

    #[test]
    fn activation_is_exclusive_per_department() {
        let mut conn = open_in_memory();
        create_session(&mut conn, &new_session("a", "BSc", "2024-07-01", "2025-06-30")).unwrap();
        create_session(&mut conn, &new_session("b", "BSc", "2025-07-01", "2026-06-30")).unwrap();
        create_session(&mut conn, &new_session("c", "BCA", "2025-07-01", "2026-06-30")).unwrap();

        activate_session(&mut conn, "a").unwrap();
        activate_session(&mut conn, "c").unwrap();
        let b = activate_session(&mut conn, "b").unwrap();
        assert!(b.active);
        assert!(!get_session(&conn, "a").unwrap().active);
        assert!(get_session(&conn, "c").unwrap().active);

        let b = deactivate_session(&mut conn, "b").unwrap();
        assert!(!b.active);
    }

    #[test]
    fn activating_unknown_session_is_not_found() {
        let mut conn = open_in_memory();
        let e = activate_session(&mut conn, "missing").unwrap_err();
        assert_eq!(e.code(), "not_found");
    }

    #[test]
    fn list_filters_by_department() {
        let mut conn = open_in_memory();
        create_session(&mut conn, &new_session("a", "BSc", "2024-07-01", "2025-06-30")).unwrap();
        create_session(&mut conn, &new_session("b", "MSc", "2025-07-01", "2026-06-30")).unwrap();
        assert_eq!(list_sessions(&conn, None).unwrap().len(), 2);
        let msc = list_sessions(&conn, Some(Department::Msc)).unwrap();
        assert_eq!(msc.len(), 1);
        assert_eq!(msc[0].session_id, "b");
    }
}
