use super::{exists, write_tx, StoreError, StoreResult};
use crate::ids::EntityKind;
use rusqlite::Connection;
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OnDelete {
    /// Remove the dependent rows (recursively).
    Cascade,
    /// Keep the dependent rows and clear the reference.
    Nullify,
}

#[derive(Debug, Clone, Copy)]
pub struct Relation {
    pub child: EntityKind,
    pub column: &'static str,
    pub parent: EntityKind,
    pub on_delete: OnDelete,
}

/// Every reference between entities and what deleting its target does.
pub const RELATIONS: &[Relation] = &[
    Relation {
        child: EntityKind::Course,
        column: "course_head",
        parent: EntityKind::Student,
        on_delete: OnDelete::Nullify,
    },
    Relation {
        child: EntityKind::Enrolment,
        column: "student_id",
        parent: EntityKind::Student,
        on_delete: OnDelete::Cascade,
    },
    Relation {
        child: EntityKind::Enrolment,
        column: "course_id",
        parent: EntityKind::Course,
        on_delete: OnDelete::Cascade,
    },
    Relation {
        child: EntityKind::Exam,
        column: "enrolment_id",
        parent: EntityKind::Enrolment,
        on_delete: OnDelete::Cascade,
    },
];

/// Ids touched by a delete, keyed by table name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DeleteReport {
    pub deleted: BTreeMap<&'static str, Vec<String>>,
    pub nullified: BTreeMap<&'static str, Vec<String>>,
}

impl DeleteReport {
    pub fn deleted_count(&self) -> usize {
        self.deleted.values().map(Vec::len).sum()
    }

    pub fn nullified_count(&self) -> usize {
        self.nullified.values().map(Vec::len).sum()
    }
}

/// Deletes one entity and applies `RELATIONS` to everything that references
/// it, all inside a single transaction.
pub fn delete_entity(conn: &Connection, kind: EntityKind, id: &str) -> StoreResult<DeleteReport> {
    let tx = write_tx(conn)?;
    if !exists(&tx, kind, id)? {
        return Err(StoreError::not_found(kind, id));
    }

    let mut report = DeleteReport::default();
    delete_with_dependents(&tx, kind, id, &mut report)?;
    tx.commit()?;

    if report.deleted_count() > 1 || report.nullified_count() > 0 {
        info!(
            kind = %kind,
            id,
            deleted = report.deleted_count(),
            nullified = report.nullified_count(),
            "delete cascaded"
        );
    } else {
        debug!(kind = %kind, id, "deleted");
    }
    Ok(report)
}

fn delete_with_dependents(
    conn: &Connection,
    kind: EntityKind,
    id: &str,
    report: &mut DeleteReport,
) -> StoreResult<()> {
    for rel in RELATIONS.iter().filter(|r| r.parent == kind) {
        let dependents = referencing_ids(conn, rel, id)?;
        if dependents.is_empty() {
            continue;
        }
        match rel.on_delete {
            OnDelete::Cascade => {
                for child_id in &dependents {
                    delete_with_dependents(conn, rel.child, child_id, report)?;
                }
            }
            OnDelete::Nullify => {
                conn.execute(
                    &format!(
                        "UPDATE {} SET {} = NULL WHERE {} = ?",
                        rel.child.table(),
                        rel.column,
                        rel.column
                    ),
                    [id],
                )?;
                report
                    .nullified
                    .entry(rel.child.table())
                    .or_default()
                    .extend(dependents);
            }
        }
    }

    conn.execute(
        &format!("DELETE FROM {} WHERE id = ?", kind.table()),
        [id],
    )?;
    report
        .deleted
        .entry(kind.table())
        .or_default()
        .push(id.to_string());
    Ok(())
}

fn referencing_ids(conn: &Connection, rel: &Relation, id: &str) -> StoreResult<Vec<String>> {
    let sql = format!(
        "SELECT id FROM {} WHERE {} = ? ORDER BY id",
        rel.child.table(),
        rel.column
    );
    let mut stmt = conn.prepare(&sql)?;
    let ids = stmt
        .query_map([id], |row| row.get::<_, String>(0))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(ids)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;

    fn seed(conn: &Connection) {
        conn.execute_batch(
            "INSERT INTO students VALUES('STU001','Ali','Raza','1','ali@x.io','1','2024-01-15',NULL,'a','Active');
             INSERT INTO students VALUES('STU002','Sara','Khan','2','sara@x.io','2','2024-01-20',NULL,'b','Active');
             INSERT INTO courses VALUES('CRS001','Python',NULL,40,'STU002');
             INSERT INTO courses VALUES('CRS002','Web',NULL,60,'STU001');
             INSERT INTO enrolments VALUES('ENR001','STU001','CRS001','2024-01-20','2024-03-20','2024-03-15','Semester 1','Active');
             INSERT INTO enrolments VALUES('ENR002','STU002','CRS002','2024-02-05','2024-04-05',NULL,'Semester 2','Active');
             INSERT INTO exams VALUES('EXM001','ENR001','Quiz','2024-02-15',5000,4500,'Active');
             INSERT INTO exams VALUES('EXM003','ENR002','Quiz','2024-03-01',3000,2800,'Inactive');",
        )
        .expect("seed");
    }

    fn count(conn: &Connection, table: &str) -> i64 {
        conn.query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |r| r.get(0))
            .expect("count")
    }

    #[test]
    fn every_relation_points_parent_to_child() {
        for rel in RELATIONS {
            assert_ne!(rel.child, rel.parent);
        }
        let nullify: Vec<_> = RELATIONS
            .iter()
            .filter(|r| r.on_delete == OnDelete::Nullify)
            .map(|r| (r.child, r.column))
            .collect();
        assert_eq!(nullify, vec![(EntityKind::Course, "course_head")]);
    }

    #[test]
    fn deleting_student_cascades_and_nullifies() {
        let conn = db::open_in_memory().expect("db");
        seed(&conn);

        let report = delete_entity(&conn, EntityKind::Student, "STU002").expect("delete");
        assert_eq!(report.deleted["students"], vec!["STU002"]);
        assert_eq!(report.deleted["enrolments"], vec!["ENR002"]);
        assert_eq!(report.deleted["exams"], vec!["EXM003"]);
        assert_eq!(report.nullified["courses"], vec!["CRS001"]);

        let head: Option<String> = conn
            .query_row("SELECT course_head FROM courses WHERE id = 'CRS001'", [], |r| {
                r.get(0)
            })
            .expect("course survives");
        assert_eq!(head, None);
        assert_eq!(count(&conn, "enrolments"), 1);
        assert_eq!(count(&conn, "exams"), 1);
    }

    #[test]
    fn deleting_course_cascades_to_enrolments_and_exams() {
        let conn = db::open_in_memory().expect("db");
        seed(&conn);

        let report = delete_entity(&conn, EntityKind::Course, "CRS001").expect("delete");
        assert_eq!(report.deleted["enrolments"], vec!["ENR001"]);
        assert_eq!(report.deleted["exams"], vec!["EXM001"]);
        assert!(report.nullified.is_empty());
        assert_eq!(count(&conn, "students"), 2);
    }

    #[test]
    fn deleting_missing_entity_is_not_found() {
        let conn = db::open_in_memory().expect("db");
        let err = delete_entity(&conn, EntityKind::Enrolment, "ENR404").expect_err("missing");
        assert!(matches!(err, StoreError::NotFound { kind: EntityKind::Enrolment, .. }));
    }
}
