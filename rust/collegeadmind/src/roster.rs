use crate::batches::batch_for_year;
use crate::db::now_rfc3339;
use crate::error::{AppError, AppResult};
use crate::program::{Department, Position};
use crate::sessions::get_session;
use rusqlite::{Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StudentStatus {
    Enrolled,
    Graduated,
}

impl StudentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            StudentStatus::Enrolled => "enrolled",
            StudentStatus::Graduated => "graduated",
        }
    }
}

impl fmt::Display for StudentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StudentStatus {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "enrolled" => Ok(StudentStatus::Enrolled),
            "graduated" => Ok(StudentStatus::Graduated),
            other => Err(AppError::validation(format!(
                "unknown student status '{}'",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Student {
    pub student_id: String,
    pub name: String,
    pub roll_no: Option<String>,
    pub department: Department,
    pub session_id: String,
    pub batch_id: String,
    pub year: u32,
    pub semester: u32,
    pub status: StudentStatus,
    pub updated_at: Option<String>,
    pub graduated_at: Option<String>,
}

impl Student {
    pub fn position(&self) -> Position {
        Position::new(self.year, self.semester)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewStudent {
    pub name: String,
    pub session_id: String,
    pub year: u32,
    pub semester: u32,
    #[serde(default)]
    pub roll_no: Option<String>,
}

pub(crate) const STUDENT_COLUMNS: &str = "id, name, roll_no, department, session_id, batch_id, \
     year, semester, status, updated_at, graduated_at";

struct StudentRow {
    id: String,
    name: String,
    roll_no: Option<String>,
    department: String,
    session_id: String,
    batch_id: String,
    year: u32,
    semester: u32,
    status: String,
    updated_at: Option<String>,
    graduated_at: Option<String>,
}

fn student_row(r: &Row<'_>) -> rusqlite::Result<StudentRow> {
    Ok(StudentRow {
        id: r.get(0)?,
        name: r.get(1)?,
        roll_no: r.get(2)?,
        department: r.get(3)?,
        session_id: r.get(4)?,
        batch_id: r.get(5)?,
        year: r.get(6)?,
        semester: r.get(7)?,
        status: r.get(8)?,
        updated_at: r.get(9)?,
        graduated_at: r.get(10)?,
    })
}

impl TryFrom<StudentRow> for Student {
    type Error = AppError;

    fn try_from(row: StudentRow) -> Result<Self, Self::Error> {
        Ok(Student {
            student_id: row.id,
            name: row.name,
            roll_no: row.roll_no,
            department: row.department.parse()?,
            session_id: row.session_id,
            batch_id: row.batch_id,
            year: row.year,
            semester: row.semester,
            status: row.status.parse()?,
            updated_at: row.updated_at,
            graduated_at: row.graduated_at,
        })
    }
}

/// Adds a student to the (session, year) batch at the given semester.
pub fn enroll_student(conn: &Connection, input: &NewStudent) -> AppResult<Student> {
    let name = input.name.trim().to_string();
    if name.is_empty() {
        return Err(AppError::validation("name must not be empty"));
    }
    let session = get_session(conn, input.session_id.trim())?;
    let program = session.department.program();
    let pos = Position::new(input.year, input.semester);
    program.validate_position(pos)?;

    let batch_id = batch_for_year(conn, &session.session_id, pos.year)?.ok_or_else(|| {
        AppError::not_found(format!(
            "no batch for year {} in session '{}'",
            pos.year, session.session_id
        ))
    })?;
    let roll_no = input
        .roll_no
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string);

    let student_id = Uuid::new_v4().to_string();
    conn.execute(
        "INSERT INTO students(id, name, roll_no, department, session_id, batch_id, year, semester, status, updated_at)
         VALUES(?, ?, ?, ?, ?, ?, ?, ?, 'enrolled', ?)",
        (
            &student_id,
            &name,
            &roll_no,
            session.department.as_str(),
            &session.session_id,
            &batch_id,
            pos.year,
            pos.semester,
            now_rfc3339(),
        ),
    )?;
    tracing::debug!(student_id = %student_id, session_id = %session.session_id, "student enrolled");
    get_student(conn, &student_id)
}

pub fn get_student(conn: &Connection, student_id: &str) -> AppResult<Student> {
    let sql = format!("SELECT {} FROM students WHERE id = ?", STUDENT_COLUMNS);
    let row = conn
        .query_row(&sql, [student_id], student_row)
        .optional()?
        .ok_or_else(|| AppError::not_found(format!("student '{}' not found", student_id)))?;
    Student::try_from(row)
}

/// Students attached to the session's batches, ordered by position then name.
pub fn list_students(
    conn: &Connection,
    session_id: &str,
    status: Option<StudentStatus>,
) -> AppResult<Vec<Student>> {
    get_session(conn, session_id)?;
    let sql = format!(
        "SELECT {} FROM students
         WHERE session_id = ?1 AND (?2 IS NULL OR status = ?2)
         ORDER BY year, semester, name, id",
        STUDENT_COLUMNS
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map((session_id, status.map(|s| s.as_str())), student_row)?
        .collect::<Result<Vec<_>, _>>()?;
    rows.into_iter().map(Student::try_from).collect()
}
