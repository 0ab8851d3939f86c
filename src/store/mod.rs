//! Persistence and integrity rules for students, courses, enrolments and exams.
//!
//! Every mutating operation runs in its own transaction and either fully
//! applies or leaves the database untouched.

pub mod courses;
pub mod enrolments;
pub mod exams;
pub mod policy;
pub mod students;

use crate::ids::{self, EntityKind, ID_MAX_LEN};
use crate::model::{ActiveStatus, Choice, ExamType};
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, Value, ValueRef};
use rusqlite::{
    params_from_iter, Connection, OptionalExtension, Row, Transaction, TransactionBehavior,
};
use tracing::warn;
use validator::{ValidateLength, ValidateRange};

const ID_ATTEMPTS: usize = 8;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A field, uniqueness or cross-field rule was violated. `constraint` reads
    /// `<entity>.<field>[.<rule>]`.
    #[error("validation failed ({constraint}): {message}")]
    ValidationFailed { constraint: String, message: String },
    #[error("{kind} not found: {id}")]
    NotFound { kind: EntityKind, id: String },
    #[error(transparent)]
    Db(#[from] rusqlite::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

impl StoreError {
    pub fn validation(constraint: impl Into<String>, message: impl Into<String>) -> Self {
        StoreError::ValidationFailed {
            constraint: constraint.into(),
            message: message.into(),
        }
    }

    pub fn not_found(kind: EntityKind, id: impl Into<String>) -> Self {
        StoreError::NotFound {
            kind,
            id: id.into(),
        }
    }
}

macro_rules! choice_sql {
    ($($t:ty),*) => {
        $(
            impl ToSql for $t {
                fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
                    Ok(ToSqlOutput::from(Choice::as_str(*self)))
                }
            }

            impl FromSql for $t {
                fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
                    let s = value.as_str()?;
                    <$t as Choice>::parse(s).ok_or_else(|| {
                        FromSqlError::Other(
                            format!("unknown {} label: {}", stringify!($t), s).into(),
                        )
                    })
                }
            }
        )*
    };
}

choice_sql!(ActiveStatus, ExamType);

/// Opens a write transaction that takes the database write lock at `BEGIN`,
/// so checks made inside it cannot be invalidated by another writer before
/// the insert or update lands.
pub(crate) fn write_tx(conn: &Connection) -> StoreResult<Transaction<'_>> {
    Ok(Transaction::new_unchecked(conn, TransactionBehavior::Immediate)?)
}

pub(crate) fn exists(conn: &Connection, kind: EntityKind, id: &str) -> StoreResult<bool> {
    let sql = format!("SELECT 1 FROM {} WHERE id = ?", kind.table());
    let found: Option<i64> = conn.query_row(&sql, [id], |r| r.get(0)).optional()?;
    Ok(found.is_some())
}

/// Validates a caller-supplied identifier or draws fresh random ones until an
/// unused one turns up.
pub(crate) fn assign_id(
    conn: &Connection,
    kind: EntityKind,
    explicit: Option<String>,
) -> StoreResult<String> {
    if let Some(id) = explicit {
        check_new_id(conn, kind, &id)?;
        return Ok(id);
    }
    for _ in 0..ID_ATTEMPTS {
        let id = ids::generate(kind);
        if !exists(conn, kind, &id)? {
            return Ok(id);
        }
        warn!(kind = %kind, id = %id, "generated identifier already taken, retrying");
    }
    Err(StoreError::validation(
        format!("{}.id.unique", kind),
        "could not generate an unused identifier",
    ))
}

pub(crate) fn check_new_id(conn: &Connection, kind: EntityKind, id: &str) -> StoreResult<()> {
    if !ids::is_well_formed(id) {
        return Err(StoreError::validation(
            format!("{}.id", kind),
            format!(
                "identifier must be 1-{} characters without whitespace",
                ID_MAX_LEN
            ),
        ));
    }
    if exists(conn, kind, id)? {
        return Err(StoreError::validation(
            format!("{}.id.unique", kind),
            format!("{} {} already exists", kind, id),
        ));
    }
    Ok(())
}

pub(crate) fn check_id_unchanged(
    kind: EntityKind,
    current: &str,
    requested: Option<&str>,
) -> StoreResult<()> {
    match requested {
        Some(r) if r != current => Err(StoreError::validation(
            format!("{}.id.immutable", kind),
            format!("identifier {} cannot be changed", current),
        )),
        _ => Ok(()),
    }
}

/// Trims `value` and checks it is non-empty and at most `max` characters.
pub(crate) fn required_text(
    kind: EntityKind,
    field: &str,
    value: &str,
    max: u64,
) -> StoreResult<String> {
    let t = value.trim();
    if !t.validate_length(Some(1), None, None) {
        return Err(StoreError::validation(
            format!("{}.{}.required", kind, field),
            format!("{} must not be empty", field),
        ));
    }
    check_max_len(kind, field, t, max)?;
    Ok(t.to_string())
}

pub(crate) fn check_max_len(
    kind: EntityKind,
    field: &str,
    value: &str,
    max: u64,
) -> StoreResult<()> {
    if !value.validate_length(None, Some(max), None) {
        return Err(StoreError::validation(
            format!("{}.{}.maxLength", kind, field),
            format!("{} must be at most {} characters", field, max),
        ));
    }
    Ok(())
}

/// Inclusive `min..=max` check on a whole-number field.
pub(crate) fn check_range(
    kind: EntityKind,
    field: &str,
    value: i64,
    min: i64,
    max: i64,
) -> StoreResult<()> {
    if !value.validate_range(Some(min), Some(max), None, None) {
        return Err(StoreError::validation(
            format!("{}.{}.range", kind, field),
            format!("{} must be between {} and {}", field, min, max),
        ));
    }
    Ok(())
}

/// Fails when another row of `kind` already holds `value` in `column`.
pub(crate) fn check_unique(
    conn: &Connection,
    kind: EntityKind,
    column: &str,
    field: &str,
    value: &str,
    own_id: Option<&str>,
) -> StoreResult<()> {
    let sql = format!(
        "SELECT id FROM {} WHERE {} = ?1 AND (?2 IS NULL OR id <> ?2) LIMIT 1",
        kind.table(),
        column
    );
    let holder: Option<String> = conn
        .query_row(&sql, rusqlite::params![value, own_id], |r| r.get(0))
        .optional()?;
    match holder {
        Some(other) => Err(StoreError::validation(
            format!("{}.{}.unique", kind, field),
            format!("{} {:?} is already used by {}", field, value, other),
        )),
        None => Ok(()),
    }
}

/// WHERE clause accumulated from optional list filters.
#[derive(Debug, Default)]
pub(crate) struct Where {
    clauses: Vec<String>,
    params: Vec<Value>,
}

impl Where {
    pub(crate) fn eq(&mut self, column: &str, value: impl Into<Value>) {
        self.cmp(column, "=", value);
    }

    pub(crate) fn cmp(&mut self, column: &str, op: &str, value: impl Into<Value>) {
        self.clauses.push(format!("{} {} ?", column, op));
        self.params.push(value.into());
    }

    pub(crate) fn is_null(&mut self, column: &str, null: bool) {
        let test = if null { "IS NULL" } else { "IS NOT NULL" };
        self.clauses.push(format!("{} {}", column, test));
    }

    /// Case-insensitive substring match over any of `columns`.
    pub(crate) fn search(&mut self, columns: &[&str], needle: Option<&str>) {
        let Some(needle) = needle.filter(|n| !n.trim().is_empty()) else {
            return;
        };
        let pattern = like_pattern(needle);
        let alternatives = columns
            .iter()
            .map(|c| format!("{} LIKE ? ESCAPE '\\'", c))
            .collect::<Vec<_>>()
            .join(" OR ");
        self.clauses.push(format!("({})", alternatives));
        self.params
            .extend(columns.iter().map(|_| Value::Text(pattern.clone())));
    }

    pub(crate) fn query<T>(
        self,
        conn: &Connection,
        select: &str,
        order: &str,
        from_row: fn(&Row<'_>) -> rusqlite::Result<T>,
    ) -> StoreResult<Vec<T>> {
        let mut sql = select.to_string();
        if !self.clauses.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&self.clauses.join(" AND "));
        }
        sql.push_str(" ORDER BY ");
        sql.push_str(order);

        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params_from_iter(self.params), from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}

/// `LIKE` pattern matching `needle` anywhere; use with `ESCAPE '\'`.
pub(crate) fn like_pattern(needle: &str) -> String {
    let mut out = String::with_capacity(needle.len() + 2);
    out.push('%');
    for c in needle.trim().chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out.push('%');
    out
}

/// Resolves a caller-facing sort key (optionally prefixed with `-` for
/// descending) against the columns a list may be ordered by.
pub(crate) fn order_clause(
    kind: EntityKind,
    order_by: Option<&str>,
    allowed: &[(&str, &str)],
    default_column: &str,
) -> StoreResult<String> {
    let Some(key) = order_by.map(str::trim).filter(|k| !k.is_empty()) else {
        return Ok(default_column.to_string());
    };
    let (key, dir) = match key.strip_prefix('-') {
        Some(k) => (k, "DESC"),
        None => (key, "ASC"),
    };
    match allowed.iter().find(|(name, _)| *name == key) {
        Some((_, column)) => Ok(format!("{} {}, {}", column, dir, default_column)),
        None => Err(StoreError::validation(
            format!("{}.orderBy", kind),
            format!(
                "cannot order by {:?}; expected one of {}",
                key,
                allowed
                    .iter()
                    .map(|(n, _)| *n)
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use std::path::PathBuf;
    use std::time::{Duration, SystemTime, UNIX_EPOCH};

    fn temp_workspace(prefix: &str) -> PathBuf {
        std::env::temp_dir().join(format!(
            "{}-{}-{}",
            prefix,
            std::process::id(),
            SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .expect("clock")
                .as_nanos()
        ))
    }

    #[test]
    fn like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern(" ali "), "%ali%");
        assert_eq!(like_pattern("50%_x"), "%50\\%\\_x%");
    }

    #[test]
    fn where_builder_binds_search_once_per_column() {
        let conn = db::open_in_memory().expect("db");
        conn.execute_batch(
            "INSERT INTO courses VALUES('CRS001','Python Basics',NULL,40,NULL);
             INSERT INTO courses VALUES('CRS002','Web',NULL,60,NULL);
             INSERT INTO courses VALUES('PY_100','Other',NULL,10,NULL);",
        )
        .expect("seed");

        let mut w = Where::default();
        w.cmp("c.duration_hours", ">=", 20_i64);
        w.search(&["c.id", "c.name"], Some("py"));
        let ids = w
            .query(&conn, "SELECT c.id FROM courses c", "c.id", |r| r.get::<_, String>(0))
            .expect("query");
        assert_eq!(ids, vec!["CRS001"]);

        let mut w = Where::default();
        w.search(&["c.id"], Some("y_"));
        let ids = w
            .query(&conn, "SELECT c.id FROM courses c", "c.id", |r| r.get::<_, String>(0))
            .expect("query");
        assert_eq!(ids, vec!["PY_100"]);
    }

    #[test]
    fn order_clause_accepts_known_keys_only() {
        let allowed = [("name", "s.name")];
        assert_eq!(
            order_clause(EntityKind::Student, None, &allowed, "s.id").expect("default"),
            "s.id"
        );
        assert_eq!(
            order_clause(EntityKind::Student, Some("-name"), &allowed, "s.id").expect("desc"),
            "s.name DESC, s.id"
        );
        let err = order_clause(EntityKind::Student, Some("email"), &allowed, "s.id")
            .expect_err("unknown key");
        assert!(matches!(
            err,
            StoreError::ValidationFailed { ref constraint, .. } if constraint == "student.orderBy"
        ));
    }

    #[test]
    fn explicit_ids_must_be_well_formed() {
        let conn = db::open_in_memory().expect("db");
        assert!(check_new_id(&conn, EntityKind::Course, "CRS001").is_ok());
        assert!(check_new_id(&conn, EntityKind::Course, "  ").is_err());
        assert!(check_new_id(&conn, EntityKind::Course, &"C".repeat(21)).is_err());
    }

    #[test]
    fn id_cannot_be_changed() {
        assert!(check_id_unchanged(EntityKind::Exam, "EXM001", None).is_ok());
        assert!(check_id_unchanged(EntityKind::Exam, "EXM001", Some("EXM001")).is_ok());
        let err = check_id_unchanged(EntityKind::Exam, "EXM001", Some("EXM002"))
            .expect_err("immutable");
        assert!(err.to_string().contains("exam.id.immutable"));
    }

    #[test]
    fn write_transactions_lock_at_begin() {
        let dir = temp_workspace("tmsd-write-lock");
        let first = db::open_db(&dir).expect("first connection");
        let second = db::open_db(&dir).expect("second connection");
        second.busy_timeout(Duration::ZERO).expect("busy timeout");

        let held = write_tx(&first).expect("first lock");
        assert!(matches!(write_tx(&second), Err(StoreError::Db(_))));
        drop(held);
        write_tx(&second).expect("lock after release");

        drop((first, second));
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn waiting_writer_sees_committed_duplicate() {
        let dir = temp_workspace("tmsd-write-wait");
        let first = db::open_db(&dir).expect("first connection");
        let second = db::open_db(&dir).expect("second connection");

        let tx = write_tx(&first).expect("first lock");
        tx.execute(
            "INSERT INTO students VALUES('STU900','A','B','99999-0000000-9','student1@example.com',
             '1','2024-01-01',NULL,'x','Active')",
            [],
        )
        .expect("insert");

        let waiter = std::thread::spawn(move || {
            students::create(&second, students::tests::new_student(Some("STU901"), 1))
        });
        std::thread::sleep(Duration::from_millis(200));
        tx.commit().expect("commit");

        let err = waiter
            .join()
            .expect("join")
            .expect_err("duplicate email after commit");
        assert!(matches!(
            err,
            StoreError::ValidationFailed { ref constraint, .. } if constraint == "student.email.unique"
        ));

        drop(first);
        let _ = std::fs::remove_dir_all(&dir);
    }
}
