use crate::error::{AppError, AppResult};
use crate::program::{Department, ProgramDefinition};
use rusqlite::{Connection, OptionalExtension};
use serde::Serialize;
use uuid::Uuid;

/// One (session, year) cohort.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Batch {
    pub batch_id: String,
    pub session_id: String,
    pub department: Department,
    pub year: u32,
    pub name: String,
}

/// Computes the batches a new session needs: one per program year, ascending.
pub fn generate_batches(
    session_id: &str,
    department: Department,
    program: &ProgramDefinition,
) -> Vec<Batch> {
    (1..=program.years)
        .map(|year| Batch {
            batch_id: Uuid::new_v4().to_string(),
            session_id: session_id.to_string(),
            department,
            year,
            name: format!("{} {} Year {}", department, session_id, year),
        })
        .collect()
}

pub(crate) fn insert_batches(conn: &Connection, batches: &[Batch]) -> AppResult<usize> {
    let mut stmt = conn.prepare(
        "INSERT INTO batches(id, session_id, department, year, name) VALUES(?, ?, ?, ?, ?)",
    )?;
    for b in batches {
        stmt.execute((
            &b.batch_id,
            &b.session_id,
            b.department.as_str(),
            b.year,
            &b.name,
        ))?;
    }
    Ok(batches.len())
}

pub fn list_batches(conn: &Connection, session_id: &str) -> AppResult<Vec<Batch>> {
    let exists: Option<i64> = conn
        .query_row("SELECT 1 FROM sessions WHERE id = ?", [session_id], |r| {
            r.get(0)
        })
        .optional()?;
    if exists.is_none() {
        return Err(AppError::not_found(format!(
            "session '{}' not found",
            session_id
        )));
    }

    let mut stmt = conn.prepare(
        "SELECT id, session_id, department, year, name
         FROM batches
         WHERE session_id = ?
         ORDER BY year",
    )?;
    let rows = stmt
        .query_map([session_id], |r| {
            let department: String = r.get(2)?;
            Ok((
                r.get::<_, String>(0)?,
                r.get::<_, String>(1)?,
                department,
                r.get::<_, u32>(3)?,
                r.get::<_, String>(4)?,
            ))
        })?
        .collect::<Result<Vec<_>, _>>()?;

    rows.into_iter()
        .map(|(batch_id, session_id, department, year, name)| {
            Ok(Batch {
                batch_id,
                session_id,
                department: department.parse()?,
                year,
                name,
            })
        })
        .collect()
}

/// Batch id for the (session, year) cohort, if it exists.
pub(crate) fn batch_for_year(
    conn: &Connection,
    session_id: &str,
    year: u32,
) -> AppResult<Option<String>> {
    Ok(conn
        .query_row(
            "SELECT id FROM batches WHERE session_id = ? AND year = ?",
            (session_id, year),
            |r| r.get(0),
        )
        .optional()?)
}
