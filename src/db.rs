use anyhow::Context;
use rusqlite::Connection;
use std::path::Path;
use std::time::Duration;

pub const DB_FILE_NAME: &str = "tms.sqlite3";

pub fn open_db(workspace: &Path) -> anyhow::Result<Connection> {
    std::fs::create_dir_all(workspace).with_context(|| {
        format!(
            "failed to create workspace {}",
            workspace.to_string_lossy()
        )
    })?;
    let db_path = workspace.join(DB_FILE_NAME);
    let conn = Connection::open(&db_path)
        .with_context(|| format!("failed to open {}", db_path.to_string_lossy()))?;
    configure(&conn)?;
    create_schema(&conn)?;
    Ok(conn)
}

#[cfg(test)]
pub fn open_in_memory() -> anyhow::Result<Connection> {
    let conn = Connection::open_in_memory()?;
    configure(&conn)?;
    create_schema(&conn)?;
    Ok(conn)
}

fn configure(conn: &Connection) -> anyhow::Result<()> {
    conn.execute("PRAGMA foreign_keys = ON", [])?;
    // Other daemons may hold the write lock on the same workspace.
    conn.busy_timeout(Duration::from_secs(5))?;
    Ok(())
}

// Foreign keys carry no ON DELETE action: what happens to dependents is decided
// by the relation table in `store::policy`, which deletes in dependency order.
fn create_schema(conn: &Connection) -> anyhow::Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS students(
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            father_name TEXT NOT NULL,
            national_id TEXT NOT NULL UNIQUE,
            email TEXT NOT NULL UNIQUE,
            contact_number TEXT NOT NULL,
            joining_date TEXT NOT NULL,
            resignation_date TEXT,
            address TEXT NOT NULL,
            status TEXT NOT NULL DEFAULT 'Active' CHECK(status IN ('Active', 'Inactive'))
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_students_status ON students(status)",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_students_joining_date ON students(joining_date)",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS courses(
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            link TEXT,
            duration_hours INTEGER NOT NULL CHECK(duration_hours > 0),
            course_head TEXT,
            FOREIGN KEY(course_head) REFERENCES students(id)
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_courses_head ON courses(course_head)",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS enrolments(
            id TEXT PRIMARY KEY,
            student_id TEXT NOT NULL,
            course_id TEXT NOT NULL,
            enrolment_date TEXT NOT NULL,
            deadline TEXT NOT NULL,
            completion_date TEXT,
            status TEXT NOT NULL,
            active_status TEXT NOT NULL DEFAULT 'Active'
                CHECK(active_status IN ('Active', 'Inactive')),
            FOREIGN KEY(student_id) REFERENCES students(id),
            FOREIGN KEY(course_id) REFERENCES courses(id),
            UNIQUE(student_id, course_id)
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_enrolments_student ON enrolments(student_id)",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_enrolments_course ON enrolments(course_id)",
        [],
    )?;

    // Marks are stored as integer hundredths.
    conn.execute(
        "CREATE TABLE IF NOT EXISTS exams(
            id TEXT PRIMARY KEY,
            enrolment_id TEXT NOT NULL,
            exam_type TEXT NOT NULL,
            exam_date TEXT NOT NULL,
            total_marks INTEGER NOT NULL,
            obtained_marks INTEGER NOT NULL,
            active_status TEXT NOT NULL DEFAULT 'Active'
                CHECK(active_status IN ('Active', 'Inactive')),
            FOREIGN KEY(enrolment_id) REFERENCES enrolments(id),
            CONSTRAINT obtained_lte_total_marks CHECK(obtained_marks <= total_marks)
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_exams_enrolment ON exams(enrolment_id)",
        [],
    )?;

    Ok(())
}
