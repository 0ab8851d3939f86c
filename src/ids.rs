use rand::rngs::OsRng;
use rand::Rng;
use serde::Serialize;
use std::fmt;

/// Longest identifier a caller may supply explicitly.
pub const ID_MAX_LEN: usize = 20;

const SUFFIX_LEN: usize = 6;
const ALPHABET: &[u8; 36] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum EntityKind {
    Student,
    Course,
    Enrolment,
    Exam,
}

impl EntityKind {
    pub fn prefix(self) -> &'static str {
        match self {
            EntityKind::Student => "STU",
            EntityKind::Course => "CRS",
            EntityKind::Enrolment => "ENR",
            EntityKind::Exam => "EXM",
        }
    }

    pub fn table(self) -> &'static str {
        match self {
            EntityKind::Student => "students",
            EntityKind::Course => "courses",
            EntityKind::Enrolment => "enrolments",
            EntityKind::Exam => "exams",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            EntityKind::Student => "student",
            EntityKind::Course => "course",
            EntityKind::Enrolment => "enrolment",
            EntityKind::Exam => "exam",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Random identifier: kind prefix plus six uppercase alphanumerics drawn
/// uniformly from the OS CSPRNG.
pub fn generate(kind: EntityKind) -> String {
    let prefix = kind.prefix();
    let mut out = String::with_capacity(prefix.len() + SUFFIX_LEN);
    out.push_str(prefix);
    out.extend((0..SUFFIX_LEN).map(|_| ALPHABET[OsRng.gen_range(0..ALPHABET.len())] as char));
    out
}

/// Composite enrolment identifier, e.g. `STU001_CRS001`.
pub fn enrolment_id(student_id: &str, course_id: &str) -> String {
    format!("{}_{}", student_id, course_id)
}

pub fn is_well_formed(id: &str) -> bool {
    !id.is_empty()
        && id.chars().count() <= ID_MAX_LEN
        && !id.chars().any(|c| c.is_whitespace() || c.is_control())
}
