use crate::batches::batch_for_year;
use crate::db::now_rfc3339;
use crate::error::{AppError, AppResult};
use crate::program::{Position, ProgramDefinition};
use crate::roster::{list_students, Student, StudentStatus};
use crate::sessions::get_session;
use rusqlite::{Connection, TransactionBehavior};
use serde::Serialize;
use uuid::Uuid;

/// Where a student lands relative to a promotion target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cohort {
    Eligible,
    Graduating,
    Unaffected,
}

/// Classifies one enrolled student.
///
/// Without a target every student short of the final year is eligible and
/// final-year students graduate. With a target, only the cohort directly below
/// it (same year at an earlier semester, or the previous year) is eligible;
/// remaining final-year students graduate unless they already sit at the target.
pub fn classify(program: &ProgramDefinition, pos: Position, target: Option<Position>) -> Cohort {
    let Some(t) = target else {
        return if program.is_final_year(pos) {
            Cohort::Graduating
        } else {
            Cohort::Eligible
        };
    };
    if pos < t && (pos.year == t.year || pos.year + 1 == t.year) {
        return Cohort::Eligible;
    }
    if program.is_final_year(pos) && pos != t {
        return Cohort::Graduating;
    }
    Cohort::Unaffected
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CohortSummary {
    pub eligible: usize,
    pub graduated: usize,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EligibilityReport {
    pub session_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<Position>,
    pub summary: CohortSummary,
    pub eligible_for_promotion: Vec<Student>,
    pub graduated: Vec<Student>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SkippedStudent {
    pub student_id: String,
    pub reason: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct PromotionResults {
    pub promoted: Vec<Student>,
    pub graduated: Vec<Student>,
    pub skipped: Vec<SkippedStudent>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PromotionSummary {
    pub promoted: usize,
    pub graduated: usize,
    pub skipped: usize,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PromotionOutcome {
    pub run_id: String,
    pub session_id: String,
    pub target: Position,
    pub results: PromotionResults,
    pub summary: PromotionSummary,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PromotionRun {
    pub run_id: String,
    pub session_id: String,
    pub target_year: u32,
    pub target_semester: u32,
    pub promoted: u32,
    pub graduated: u32,
    pub skipped: u32,
    pub actor: String,
    pub created_at: String,
}

fn partition(
    program: &ProgramDefinition,
    students: Vec<Student>,
    target: Option<Position>,
) -> (Vec<Student>, Vec<Student>) {
    let mut eligible = Vec::new();
    let mut graduating = Vec::new();
    for s in students {
        match classify(program, s.position(), target) {
            Cohort::Eligible => eligible.push(s),
            Cohort::Graduating => graduating.push(s),
            Cohort::Unaffected => {}
        }
    }
    (eligible, graduating)
}

pub fn eligible_for_promotion(
    conn: &Connection,
    session_id: &str,
    target: Option<Position>,
) -> AppResult<EligibilityReport> {
    let session = get_session(conn, session_id)?;
    let program = session.department.program();
    if let Some(t) = target {
        program.validate_position(t)?;
    }
    let students = list_students(conn, session_id, Some(StudentStatus::Enrolled))?;
    let (eligible, graduated) = partition(&program, students, target);
    Ok(EligibilityReport {
        session_id: session.session_id,
        target,
        summary: CohortSummary {
            eligible: eligible.len(),
            graduated: graduated.len(),
        },
        eligible_for_promotion: eligible,
        graduated,
    })
}

/// Moves the eligible cohort to `target` and graduates final-year students.
///
/// Runs in a single IMMEDIATE transaction. Every row update is guarded on the
/// year, semester and status read at the start, so a student whose record
/// changed underneath (a trigger or an earlier write in this same run) is
/// reported as skipped instead of being moved twice.
pub fn promote(
    conn: &mut Connection,
    session_id: &str,
    target: Position,
    actor: &str,
) -> AppResult<PromotionOutcome> {
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    let session = get_session(&tx, session_id)?;
    let program = session.department.program();
    program.validate_position(target)?;

    let target_batch = batch_for_year(&tx, session_id, target.year)?.ok_or_else(|| {
        AppError::not_found(format!(
            "no batch for year {} in session '{}'",
            target.year, session_id
        ))
    })?;

    let students = list_students(&tx, session_id, Some(StudentStatus::Enrolled))?;
    let (eligible, graduating) = partition(&program, students, Some(target));

    let now = now_rfc3339();
    let mut results = PromotionResults::default();
    {
        let mut promote_stmt = tx.prepare(
            "UPDATE students
             SET year = ?, semester = ?, batch_id = ?, updated_at = ?
             WHERE id = ? AND year = ? AND semester = ? AND status = 'enrolled'",
        )?;
        for mut s in eligible {
            let changed = promote_stmt.execute((
                target.year,
                target.semester,
                &target_batch,
                &now,
                &s.student_id,
                s.year,
                s.semester,
            ))?;
            if changed == 0 {
                tracing::warn!(student_id = %s.student_id, "promotion guard failed");
                results.skipped.push(SkippedStudent {
                    student_id: s.student_id,
                    reason: "record changed since it was read".to_string(),
                });
                continue;
            }
            s.year = target.year;
            s.semester = target.semester;
            s.batch_id = target_batch.clone();
            s.updated_at = Some(now.clone());
            results.promoted.push(s);
        }

        let mut graduate_stmt = tx.prepare(
            "UPDATE students
             SET status = 'graduated', graduated_at = ?, updated_at = ?
             WHERE id = ? AND year = ? AND semester = ? AND status = 'enrolled'",
        )?;
        for mut s in graduating {
            let changed =
                graduate_stmt.execute((&now, &now, &s.student_id, s.year, s.semester))?;
            if changed == 0 {
                tracing::warn!(student_id = %s.student_id, "graduation guard failed");
                results.skipped.push(SkippedStudent {
                    student_id: s.student_id,
                    reason: "record changed since it was read".to_string(),
                });
                continue;
            }
            s.status = StudentStatus::Graduated;
            s.graduated_at = Some(now.clone());
            s.updated_at = Some(now.clone());
            results.graduated.push(s);
        }
    }

    let summary = PromotionSummary {
        promoted: results.promoted.len(),
        graduated: results.graduated.len(),
        skipped: results.skipped.len(),
    };
    let run_id = Uuid::new_v4().to_string();
    tx.execute(
        "INSERT INTO promotion_runs(id, session_id, target_year, target_semester, promoted, graduated, skipped, actor, created_at)
         VALUES(?, ?, ?, ?, ?, ?, ?, ?, ?)",
        (
            &run_id,
            session_id,
            target.year,
            target.semester,
            summary.promoted as i64,
            summary.graduated as i64,
            summary.skipped as i64,
            actor,
            &now,
        ),
    )?;
    tx.commit()?;

    tracing::info!(
        session_id = %session_id,
        target_year = target.year,
        target_semester = target.semester,
        promoted = summary.promoted,
        graduated = summary.graduated,
        skipped = summary.skipped,
        actor = %actor,
        "promotion applied"
    );

    Ok(PromotionOutcome {
        run_id,
        session_id: session.session_id,
        target,
        results,
        summary,
    })
}

/// Past promotion runs for a session, newest first.
pub fn promotion_history(conn: &Connection, session_id: &str) -> AppResult<Vec<PromotionRun>> {
    get_session(conn, session_id)?;
    let mut stmt = conn.prepare(
        "SELECT id, session_id, target_year, target_semester, promoted, graduated, skipped, actor, created_at
         FROM promotion_runs
         WHERE session_id = ?
         ORDER BY created_at DESC, rowid DESC",
    )?;
    let runs = stmt
        .query_map([session_id], |r| {
            Ok(PromotionRun {
                run_id: r.get(0)?,
                session_id: r.get(1)?,
                target_year: r.get(2)?,
                target_semester: r.get(3)?,
                promoted: r.get(4)?,
                graduated: r.get(5)?,
                skipped: r.get(6)?,
                actor: r.get(7)?,
                created_at: r.get(8)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(runs)
}
