use super::policy::{self, DeleteReport};
use super::{
    assign_id, check_id_unchanged, check_new_id, exists, order_clause, required_text,
    write_tx, StoreError, StoreResult, Where,
};
use crate::ids::{self, EntityKind};
use crate::model::{Choice, Enrolment, EnrolmentFilter, EnrolmentPatch, NewEnrolment};
use rusqlite::{Connection, OptionalExtension, Row};
use tracing::{debug, info};

const KIND: EntityKind = EntityKind::Enrolment;

const SELECT: &str = "SELECT e.id, e.student_id, e.course_id, e.enrolment_date, e.deadline,
                             e.completion_date, e.status, e.active_status
                      FROM enrolments e
                      JOIN students st ON st.id = e.student_id
                      JOIN courses co ON co.id = e.course_id";

const ORDER_KEYS: &[(&str, &str)] = &[
    ("id", "e.id"),
    ("student", "e.student_id"),
    ("course", "e.course_id"),
    ("enrolmentDate", "e.enrolment_date"),
    ("deadline", "e.deadline"),
    ("completionDate", "e.completion_date"),
    ("status", "e.status"),
    ("activeStatus", "e.active_status"),
];

fn from_row(row: &Row<'_>) -> rusqlite::Result<Enrolment> {
    Ok(Enrolment {
        id: row.get(0)?,
        student_id: row.get(1)?,
        course_id: row.get(2)?,
        enrolment_date: row.get(3)?,
        deadline: row.get(4)?,
        completion_date: row.get(5)?,
        status: row.get(6)?,
        active_status: row.get(7)?,
    })
}

pub fn create(conn: &Connection, new: NewEnrolment) -> StoreResult<Enrolment> {
    let tx = write_tx(conn)?;
    let mut enrolment = Enrolment {
        id: String::new(),
        student_id: new.student_id,
        course_id: new.course_id,
        enrolment_date: new.enrolment_date,
        deadline: new.deadline,
        completion_date: new.completion_date,
        status: new.status,
        active_status: new.active_status.unwrap_or_default(),
    };
    validate(&tx, &mut enrolment, None)?;
    enrolment.id = match new.id {
        Some(id) => {
            check_new_id(&tx, KIND, &id)?;
            id
        }
        None => composite_or_random_id(&tx, &enrolment)?,
    };

    tx.execute(
        "INSERT INTO enrolments(
           id, student_id, course_id, enrolment_date, deadline,
           completion_date, status, active_status
         ) VALUES(?, ?, ?, ?, ?, ?, ?, ?)",
        rusqlite::params![
            enrolment.id,
            enrolment.student_id,
            enrolment.course_id,
            enrolment.enrolment_date,
            enrolment.deadline,
            enrolment.completion_date,
            enrolment.status,
            enrolment.active_status,
        ],
    )?;
    tx.commit()?;
    debug!(id = %enrolment.id, "enrolment created");
    Ok(enrolment)
}

/// `<student>_<course>` unless an earlier enrolment was re-pointed and still
/// holds that id, in which case a random `ENR` id is drawn.
fn composite_or_random_id(conn: &Connection, e: &Enrolment) -> StoreResult<String> {
    let composite = ids::enrolment_id(&e.student_id, &e.course_id);
    if !exists(conn, KIND, &composite)? {
        return Ok(composite);
    }
    info!(id = %composite, "composite enrolment id taken, drawing a random one");
    assign_id(conn, KIND, None)
}

pub fn update(conn: &Connection, id: &str, patch: EnrolmentPatch) -> StoreResult<Enrolment> {
    let tx = write_tx(conn)?;
    let mut enrolment = get(&tx, id)?;
    check_id_unchanged(KIND, id, patch.id.as_deref())?;
    patch.apply(&mut enrolment);
    validate(&tx, &mut enrolment, Some(id))?;

    tx.execute(
        "UPDATE enrolments SET
           student_id = ?, course_id = ?, enrolment_date = ?, deadline = ?,
           completion_date = ?, status = ?, active_status = ?
         WHERE id = ?",
        rusqlite::params![
            enrolment.student_id,
            enrolment.course_id,
            enrolment.enrolment_date,
            enrolment.deadline,
            enrolment.completion_date,
            enrolment.status,
            enrolment.active_status,
            id,
        ],
    )?;
    tx.commit()?;
    debug!(id, "enrolment updated");
    Ok(enrolment)
}

pub fn delete(conn: &Connection, id: &str) -> StoreResult<DeleteReport> {
    policy::delete_entity(conn, KIND, id)
}

pub fn get(conn: &Connection, id: &str) -> StoreResult<Enrolment> {
    conn.query_row(&format!("{} WHERE e.id = ?", SELECT), [id], from_row)
        .optional()?
        .ok_or_else(|| StoreError::not_found(KIND, id))
}

pub fn list(conn: &Connection, filter: &EnrolmentFilter) -> StoreResult<Vec<Enrolment>> {
    let mut w = Where::default();
    if let Some(student) = filter.student_id.as_deref() {
        w.eq("e.student_id", student.to_string());
    }
    if let Some(course) = filter.course_id.as_deref() {
        w.eq("e.course_id", course.to_string());
    }
    if let Some(status) = filter.status.as_deref() {
        w.eq("e.status", status.trim().to_string());
    }
    if let Some(active) = filter.active_status {
        w.eq("e.active_status", active.as_str().to_string());
    }
    if let Some(completed) = filter.completed {
        w.is_null("e.completion_date", !completed);
    }
    w.search(&["e.id", "st.name", "co.name"], filter.search.as_deref());

    let order = order_clause(KIND, filter.order_by.as_deref(), ORDER_KEYS, "e.id")?;
    w.query(conn, SELECT, &order, from_row)
}

fn validate(conn: &Connection, e: &mut Enrolment, own_id: Option<&str>) -> StoreResult<()> {
    e.status = required_text(KIND, "status", &e.status, 50)?;

    if !exists(conn, EntityKind::Student, &e.student_id)? {
        return Err(StoreError::validation(
            "enrolment.student.exists",
            format!("student {} does not exist", e.student_id),
        ));
    }
    if !exists(conn, EntityKind::Course, &e.course_id)? {
        return Err(StoreError::validation(
            "enrolment.course.exists",
            format!("course {} does not exist", e.course_id),
        ));
    }

    let holder: Option<String> = conn
        .query_row(
            "SELECT id FROM enrolments
             WHERE student_id = ?1 AND course_id = ?2 AND (?3 IS NULL OR id <> ?3)",
            rusqlite::params![e.student_id, e.course_id, own_id],
            |r| r.get(0),
        )
        .optional()?;
    if let Some(other) = holder {
        return Err(StoreError::validation(
            "enrolment.studentCourse.unique",
            format!(
                "student {} is already enrolled in course {} ({})",
                e.student_id, e.course_id, other
            ),
        ));
    }
    Ok(())
}
