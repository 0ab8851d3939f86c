use super::policy::{self, DeleteReport};
use super::{
    assign_id, check_id_unchanged, check_unique, order_clause, required_text, write_tx,
    StoreError, StoreResult, Where,
};
use crate::ids::EntityKind;
use crate::model::{ActiveStatus, Choice, NewStudent, Student, StudentFilter, StudentPatch};
use rusqlite::{Connection, OptionalExtension, Row};
use tracing::debug;
use validator::ValidateEmail;

const KIND: EntityKind = EntityKind::Student;

const SELECT: &str = "SELECT s.id, s.name, s.father_name, s.national_id, s.email, s.contact_number,
                             s.joining_date, s.resignation_date, s.address, s.status
                      FROM students s";

const ORDER_KEYS: &[(&str, &str)] = &[
    ("id", "s.id"),
    ("name", "s.name"),
    ("joiningDate", "s.joining_date"),
    ("resignationDate", "s.resignation_date"),
    ("status", "s.status"),
];

fn from_row(row: &Row<'_>) -> rusqlite::Result<Student> {
    Ok(Student {
        id: row.get(0)?,
        name: row.get(1)?,
        father_name: row.get(2)?,
        national_id: row.get(3)?,
        email: row.get(4)?,
        contact_number: row.get(5)?,
        joining_date: row.get(6)?,
        resignation_date: row.get(7)?,
        address: row.get(8)?,
        status: row.get(9)?,
    })
}

pub fn create(conn: &Connection, new: NewStudent) -> StoreResult<Student> {
    let tx = write_tx(conn)?;
    let mut student = Student {
        id: String::new(),
        name: new.name,
        father_name: new.father_name,
        national_id: new.national_id,
        email: new.email,
        contact_number: new.contact_number,
        joining_date: new.joining_date,
        resignation_date: new.resignation_date,
        address: new.address,
        status: new.status.unwrap_or(match new.resignation_date {
            Some(_) => ActiveStatus::Inactive,
            None => ActiveStatus::Active,
        }),
    };
    validate(&tx, &mut student, None)?;
    student.id = assign_id(&tx, KIND, new.id)?;

    tx.execute(
        "INSERT INTO students(
           id, name, father_name, national_id, email, contact_number,
           joining_date, resignation_date, address, status
         ) VALUES(?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        rusqlite::params![
            student.id,
            student.name,
            student.father_name,
            student.national_id,
            student.email,
            student.contact_number,
            student.joining_date,
            student.resignation_date,
            student.address,
            student.status,
        ],
    )?;
    tx.commit()?;
    debug!(id = %student.id, "student created");
    Ok(student)
}

pub fn update(conn: &Connection, id: &str, patch: StudentPatch) -> StoreResult<Student> {
    let tx = write_tx(conn)?;
    let mut student = get(&tx, id)?;
    check_id_unchanged(KIND, id, patch.id.as_deref())?;
    patch.apply(&mut student);
    validate(&tx, &mut student, Some(id))?;

    tx.execute(
        "UPDATE students SET
           name = ?, father_name = ?, national_id = ?, email = ?, contact_number = ?,
           joining_date = ?, resignation_date = ?, address = ?, status = ?
         WHERE id = ?",
        rusqlite::params![
            student.name,
            student.father_name,
            student.national_id,
            student.email,
            student.contact_number,
            student.joining_date,
            student.resignation_date,
            student.address,
            student.status,
            id,
        ],
    )?;
    tx.commit()?;
    debug!(id, "student updated");
    Ok(student)
}

pub fn delete(conn: &Connection, id: &str) -> StoreResult<DeleteReport> {
    policy::delete_entity(conn, KIND, id)
}

pub fn get(conn: &Connection, id: &str) -> StoreResult<Student> {
    conn.query_row(&format!("{} WHERE s.id = ?", SELECT), [id], from_row)
        .optional()?
        .ok_or_else(|| StoreError::not_found(KIND, id))
}

pub fn list(conn: &Connection, filter: &StudentFilter) -> StoreResult<Vec<Student>> {
    let mut w = Where::default();
    if let Some(status) = filter.status {
        w.eq("s.status", status.as_str().to_string());
    }
    if let Some(from) = filter.joined_from {
        w.cmp("s.joining_date", ">=", from.to_string());
    }
    if let Some(to) = filter.joined_to {
        w.cmp("s.joining_date", "<=", to.to_string());
    }
    if let Some(resigned) = filter.resigned {
        w.is_null("s.resignation_date", !resigned);
    }
    w.search(
        &[
            "s.id",
            "s.name",
            "s.father_name",
            "s.national_id",
            "s.email",
            "s.contact_number",
        ],
        filter.search.as_deref(),
    );

    let order = order_clause(KIND, filter.order_by.as_deref(), ORDER_KEYS, "s.id")?;
    w.query(conn, SELECT, &order, from_row)
}

fn validate(conn: &Connection, s: &mut Student, own_id: Option<&str>) -> StoreResult<()> {
    s.name = required_text(KIND, "name", &s.name, 100)?;
    s.father_name = required_text(KIND, "fatherName", &s.father_name, 100)?;
    s.national_id = required_text(KIND, "nationalId", &s.national_id, 15)?;
    s.email = required_text(KIND, "email", &s.email, 254)?;
    if !s.email.validate_email() {
        return Err(StoreError::validation(
            "student.email.format",
            format!("{:?} is not a valid email address", s.email),
        ));
    }
    s.contact_number = required_text(KIND, "contactNumber", &s.contact_number, 20)?;
    s.address = required_text(KIND, "address", &s.address, 1000)?;

    check_unique(conn, KIND, "national_id", "nationalId", &s.national_id, own_id)?;
    check_unique(conn, KIND, "email", "email", &s.email, own_id)?;
    Ok(())
}
