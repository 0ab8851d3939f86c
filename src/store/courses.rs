use super::policy::{self, DeleteReport};
use super::{
    assign_id, check_id_unchanged, check_max_len, check_range, exists, order_clause,
    required_text, write_tx, StoreError, StoreResult, Where,
};
use crate::ids::EntityKind;
use crate::model::{Course, CourseFilter, CoursePatch, NewCourse};
use rusqlite::{Connection, OptionalExtension, Row};
use tracing::debug;
use validator::ValidateUrl;

const KIND: EntityKind = EntityKind::Course;

const SELECT: &str = "SELECT c.id, c.name, c.link, c.duration_hours, c.course_head
                      FROM courses c
                      LEFT JOIN students h ON h.id = c.course_head";

const ORDER_KEYS: &[(&str, &str)] = &[
    ("id", "c.id"),
    ("name", "c.name"),
    ("durationHours", "c.duration_hours"),
    ("courseHead", "c.course_head"),
];

const LINK_SCHEMES: &[&str] = &["http", "https", "ftp", "ftps"];

fn from_row(row: &Row<'_>) -> rusqlite::Result<Course> {
    Ok(Course {
        id: row.get(0)?,
        name: row.get(1)?,
        link: row.get(2)?,
        duration_hours: row.get(3)?,
        course_head: row.get(4)?,
    })
}

pub fn create(conn: &Connection, new: NewCourse) -> StoreResult<Course> {
    let tx = write_tx(conn)?;
    let mut course = Course {
        id: String::new(),
        name: new.name,
        link: new.link,
        duration_hours: new.duration_hours,
        course_head: new.course_head,
    };
    validate(&tx, &mut course)?;
    course.id = assign_id(&tx, KIND, new.id)?;

    tx.execute(
        "INSERT INTO courses(id, name, link, duration_hours, course_head)
         VALUES(?, ?, ?, ?, ?)",
        rusqlite::params![
            course.id,
            course.name,
            course.link,
            course.duration_hours,
            course.course_head,
        ],
    )?;
    tx.commit()?;
    debug!(id = %course.id, "course created");
    Ok(course)
}

pub fn update(conn: &Connection, id: &str, patch: CoursePatch) -> StoreResult<Course> {
    let tx = write_tx(conn)?;
    let mut course = get(&tx, id)?;
    check_id_unchanged(KIND, id, patch.id.as_deref())?;
    patch.apply(&mut course);
    validate(&tx, &mut course)?;

    tx.execute(
        "UPDATE courses SET name = ?, link = ?, duration_hours = ?, course_head = ?
         WHERE id = ?",
        rusqlite::params![
            course.name,
            course.link,
            course.duration_hours,
            course.course_head,
            id,
        ],
    )?;
    tx.commit()?;
    debug!(id, "course updated");
    Ok(course)
}

pub fn delete(conn: &Connection, id: &str) -> StoreResult<DeleteReport> {
    policy::delete_entity(conn, KIND, id)
}

pub fn get(conn: &Connection, id: &str) -> StoreResult<Course> {
    conn.query_row(&format!("{} WHERE c.id = ?", SELECT), [id], from_row)
        .optional()?
        .ok_or_else(|| StoreError::not_found(KIND, id))
}

pub fn list(conn: &Connection, filter: &CourseFilter) -> StoreResult<Vec<Course>> {
    let mut w = Where::default();
    if let Some(head) = filter.course_head.as_deref() {
        w.eq("c.course_head", head.to_string());
    }
    if let Some(min) = filter.min_hours {
        w.cmp("c.duration_hours", ">=", min);
    }
    if let Some(max) = filter.max_hours {
        w.cmp("c.duration_hours", "<=", max);
    }
    w.search(&["c.id", "c.name", "h.name"], filter.search.as_deref());

    let order = order_clause(KIND, filter.order_by.as_deref(), ORDER_KEYS, "c.id")?;
    w.query(conn, SELECT, &order, from_row)
}

fn validate(conn: &Connection, c: &mut Course) -> StoreResult<()> {
    c.name = required_text(KIND, "name", &c.name, 150)?;

    c.link = c
        .link
        .take()
        .map(|l| l.trim().to_string())
        .filter(|l| !l.is_empty());
    if let Some(link) = c.link.as_deref() {
        check_max_len(KIND, "link", link, 500)?;
        if !is_valid_link(link) {
            return Err(StoreError::validation(
                "course.link.format",
                format!("{:?} is not a valid URL", link),
            ));
        }
    }

    check_range(KIND, "durationHours", c.duration_hours, 1, i64::from(u32::MAX))?;

    if let Some(head) = c.course_head.as_deref() {
        if !exists(conn, EntityKind::Student, head)? {
            return Err(StoreError::validation(
                "course.courseHead.exists",
                format!("course head {} is not a known student", head),
            ));
        }
    }
    Ok(())
}

fn is_valid_link(link: &str) -> bool {
    let scheme_known = link
        .split_once("://")
        .is_some_and(|(scheme, _)| {
            LINK_SCHEMES
                .iter()
                .any(|known| scheme.eq_ignore_ascii_case(known))
        });
    scheme_known && link.validate_url()
}
