use super::policy::{self, DeleteReport};
use super::{
    assign_id, check_id_unchanged, order_clause, write_tx, StoreError, StoreResult, Where,
};
use crate::ids::EntityKind;
use crate::model::{
    marks_from_hundredths, marks_to_hundredths, max_marks, ActiveStatus, Choice, Exam, ExamFilter,
    ExamPatch, NewExam, MARKS_SCALE,
};
use rust_decimal::Decimal;
use rusqlite::{Connection, OptionalExtension, Row};
use tracing::debug;

const KIND: EntityKind = EntityKind::Exam;

const SELECT: &str = "SELECT x.id, x.enrolment_id, x.exam_type, x.exam_date,
                             x.total_marks, x.obtained_marks, x.active_status
                      FROM exams x
                      JOIN enrolments e ON e.id = x.enrolment_id
                      JOIN students st ON st.id = e.student_id
                      JOIN courses co ON co.id = e.course_id";

const ORDER_KEYS: &[(&str, &str)] = &[
    ("id", "x.id"),
    ("enrolment", "x.enrolment_id"),
    ("examType", "x.exam_type"),
    ("examDate", "x.exam_date"),
    ("totalMarks", "x.total_marks"),
    ("obtainedMarks", "x.obtained_marks"),
    ("activeStatus", "x.active_status"),
];

fn from_row(row: &Row<'_>) -> rusqlite::Result<Exam> {
    Ok(Exam {
        id: row.get(0)?,
        enrolment_id: row.get(1)?,
        exam_type: row.get(2)?,
        exam_date: row.get(3)?,
        total_marks: marks_from_hundredths(row.get(4)?),
        obtained_marks: marks_from_hundredths(row.get(5)?),
        active_status: row.get(6)?,
    })
}

pub fn create(conn: &Connection, new: NewExam) -> StoreResult<Exam> {
    let tx = write_tx(conn)?;
    let mut exam = Exam {
        id: String::new(),
        enrolment_id: new.enrolment_id,
        exam_type: new.exam_type,
        exam_date: new.exam_date,
        total_marks: new.total_marks,
        obtained_marks: new.obtained_marks,
        active_status: new.active_status.unwrap_or_default(),
    };
    let (total, obtained) = validate(&tx, &exam, true)?;
    exam.id = assign_id(&tx, KIND, new.id)?;

    tx.execute(
        "INSERT INTO exams(
           id, enrolment_id, exam_type, exam_date, total_marks, obtained_marks, active_status
         ) VALUES(?, ?, ?, ?, ?, ?, ?)",
        rusqlite::params![
            exam.id,
            exam.enrolment_id,
            exam.exam_type,
            exam.exam_date,
            total,
            obtained,
            exam.active_status,
        ],
    )?;
    tx.commit()?;
    debug!(id = %exam.id, "exam created");
    Ok(exam)
}

pub fn update(conn: &Connection, id: &str, patch: ExamPatch) -> StoreResult<Exam> {
    let tx = write_tx(conn)?;
    let mut exam = get(&tx, id)?;
    check_id_unchanged(KIND, id, patch.id.as_deref())?;
    let previous_enrolment = exam.enrolment_id.clone();
    patch.apply(&mut exam);
    let (total, obtained) = validate(&tx, &exam, exam.enrolment_id != previous_enrolment)?;

    tx.execute(
        "UPDATE exams SET
           enrolment_id = ?, exam_type = ?, exam_date = ?,
           total_marks = ?, obtained_marks = ?, active_status = ?
         WHERE id = ?",
        rusqlite::params![
            exam.enrolment_id,
            exam.exam_type,
            exam.exam_date,
            total,
            obtained,
            exam.active_status,
            id,
        ],
    )?;
    tx.commit()?;
    debug!(id, "exam updated");
    Ok(exam)
}

pub fn delete(conn: &Connection, id: &str) -> StoreResult<DeleteReport> {
    policy::delete_entity(conn, KIND, id)
}

pub fn get(conn: &Connection, id: &str) -> StoreResult<Exam> {
    conn.query_row(&format!("{} WHERE x.id = ?", SELECT), [id], from_row)
        .optional()?
        .ok_or_else(|| StoreError::not_found(KIND, id))
}

pub fn list(conn: &Connection, filter: &ExamFilter) -> StoreResult<Vec<Exam>> {
    let mut w = Where::default();
    if let Some(enrolment) = filter.enrolment_id.as_deref() {
        w.eq("x.enrolment_id", enrolment.to_string());
    }
    if let Some(student) = filter.student_id.as_deref() {
        w.eq("e.student_id", student.to_string());
    }
    if let Some(course) = filter.course_id.as_deref() {
        w.eq("e.course_id", course.to_string());
    }
    if let Some(exam_type) = filter.exam_type {
        w.eq("x.exam_type", exam_type.as_str().to_string());
    }
    if let Some(active) = filter.active_status {
        w.eq("x.active_status", active.as_str().to_string());
    }
    w.search(&["x.id", "st.name", "co.name"], filter.search.as_deref());

    let order = order_clause(KIND, filter.order_by.as_deref(), ORDER_KEYS, "x.id")?;
    w.query(conn, SELECT, &order, from_row)
}

/// Marks as stored hundredths, or a range failure naming `field`.
fn stored_marks(field: &str, marks: Decimal) -> StoreResult<i64> {
    let out_of_range = || {
        StoreError::validation(
            format!("exam.{}.range", field),
            format!("{} must be between 0.00 and {}", field, max_marks()),
        )
    };
    if marks < Decimal::ZERO || marks > max_marks() || marks.normalize().scale() > MARKS_SCALE {
        return Err(out_of_range());
    }
    marks_to_hundredths(marks).ok_or_else(out_of_range)
}

/// `check_enrolment_active` is set when the exam is being attached to an
/// enrolment, i.e. on create or when the reference changes. Returns the
/// (total, obtained) hundredths to store.
fn validate(conn: &Connection, x: &Exam, check_enrolment_active: bool) -> StoreResult<(i64, i64)> {
    let total = stored_marks("totalMarks", x.total_marks)?;
    let obtained = stored_marks("obtainedMarks", x.obtained_marks)?;
    if x.obtained_marks > x.total_marks {
        return Err(StoreError::validation(
            "exam.obtainedMarks.lteTotalMarks",
            format!(
                "obtained marks {} exceed total marks {}",
                x.obtained_marks, x.total_marks
            ),
        ));
    }

    let enrolment_status: Option<ActiveStatus> = conn
        .query_row(
            "SELECT active_status FROM enrolments WHERE id = ?",
            [&x.enrolment_id],
            |r| r.get(0),
        )
        .optional()?;
    match enrolment_status {
        None => Err(StoreError::validation(
            "exam.enrolment.exists",
            format!("enrolment {} does not exist", x.enrolment_id),
        )),
        Some(ActiveStatus::Inactive) if check_enrolment_active => Err(StoreError::validation(
            "exam.enrolment.active",
            format!("enrolment {} is inactive", x.enrolment_id),
        )),
        Some(_) => Ok((total, obtained)),
    }
}
