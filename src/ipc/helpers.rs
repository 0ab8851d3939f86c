//! Turns request JSON into typed store inputs.
//!
//! Shape problems in a field (wrong JSON type, unknown choice label, bad date
//! or decimal) are reported as `ValidationFailed` naming `<entity>.<field>`, the
//! same way the store reports rule violations.

use crate::ids::EntityKind;
use crate::model::{
    parse_marks, Choice, CourseFilter, CoursePatch, EnrolmentFilter, EnrolmentPatch, ExamFilter,
    ExamPatch, NewCourse, NewEnrolment, NewExam, NewStudent, StudentFilter, StudentPatch,
};
use crate::store::{StoreError, StoreResult};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde_json::{Map, Value};

const DATE_FORMAT: &str = "%Y-%m-%d";

type Object = Map<String, Value>;

pub struct Fields<'a> {
    kind: EntityKind,
    map: &'a Object,
}

impl<'a> Fields<'a> {
    pub fn new(kind: EntityKind, map: &'a Object) -> Self {
        Fields { kind, map }
    }

    fn invalid(&self, key: &str, rule: &str, message: impl Into<String>) -> StoreError {
        StoreError::validation(format!("{}.{}.{}", self.kind, key, rule), message)
    }

    pub fn deny_unknown(&self, allowed: &[&str]) -> StoreResult<()> {
        match self.map.keys().find(|k| !allowed.contains(&k.as_str())) {
            Some(k) => Err(self.invalid(
                k,
                "unknown",
                format!("unknown field {:?}; expected one of {}", k, allowed.join(", ")),
            )),
            None => Ok(()),
        }
    }

    fn present(&self, key: &str) -> StoreResult<Option<&'a Value>> {
        match self.map.get(key) {
            None => Ok(None),
            Some(Value::Null) => Err(self.invalid(key, "null", format!("{} must not be null", key))),
            Some(v) => Ok(Some(v)),
        }
    }

    fn required<T>(&self, key: &str, v: Option<T>) -> StoreResult<T> {
        v.ok_or_else(|| self.invalid(key, "required", format!("{} is required", key)))
    }

    fn as_text(&self, key: &str, v: &Value) -> StoreResult<String> {
        v.as_str()
            .map(str::to_string)
            .ok_or_else(|| self.invalid(key, "type", format!("{} must be a string", key)))
    }

    fn as_date(&self, key: &str, v: &Value) -> StoreResult<NaiveDate> {
        let s = self.as_text(key, v)?;
        NaiveDate::parse_from_str(s.trim(), DATE_FORMAT).map_err(|_| {
            self.invalid(
                key,
                "format",
                format!("{} must be a YYYY-MM-DD date, got {:?}", key, s),
            )
        })
    }

    pub fn text(&self, key: &str) -> StoreResult<Option<String>> {
        self.present(key)?.map(|v| self.as_text(key, v)).transpose()
    }

    pub fn required_text(&self, key: &str) -> StoreResult<String> {
        let v = self.text(key)?;
        self.required(key, v)
    }

    pub fn nullable_text(&self, key: &str) -> StoreResult<Option<Option<String>>> {
        match self.map.get(key) {
            None => Ok(None),
            Some(Value::Null) => Ok(Some(None)),
            Some(v) => Ok(Some(Some(self.as_text(key, v)?))),
        }
    }

    pub fn date(&self, key: &str) -> StoreResult<Option<NaiveDate>> {
        self.present(key)?.map(|v| self.as_date(key, v)).transpose()
    }

    pub fn required_date(&self, key: &str) -> StoreResult<NaiveDate> {
        let v = self.date(key)?;
        self.required(key, v)
    }

    pub fn nullable_date(&self, key: &str) -> StoreResult<Option<Option<NaiveDate>>> {
        match self.map.get(key) {
            None => Ok(None),
            Some(Value::Null) => Ok(Some(None)),
            Some(v) => Ok(Some(Some(self.as_date(key, v)?))),
        }
    }

    pub fn integer(&self, key: &str) -> StoreResult<Option<i64>> {
        self.present(key)?
            .map(|v| {
                v.as_i64().ok_or_else(|| {
                    self.invalid(key, "type", format!("{} must be a whole number", key))
                })
            })
            .transpose()
    }

    pub fn required_integer(&self, key: &str) -> StoreResult<i64> {
        let v = self.integer(key)?;
        self.required(key, v)
    }

    pub fn boolean(&self, key: &str) -> StoreResult<Option<bool>> {
        self.present(key)?
            .map(|v| {
                v.as_bool()
                    .ok_or_else(|| self.invalid(key, "type", format!("{} must be a boolean", key)))
            })
            .transpose()
    }

    /// Accepts JSON numbers and decimal strings.
    pub fn marks(&self, key: &str) -> StoreResult<Option<Decimal>> {
        let Some(v) = self.present(key)? else {
            return Ok(None);
        };
        let raw = match v {
            Value::Number(n) => n.to_string(),
            Value::String(s) => s.clone(),
            _ => {
                return Err(self.invalid(key, "type", format!("{} must be a decimal", key)));
            }
        };
        parse_marks(&raw)
            .map(Some)
            .map_err(|e| self.invalid(key, "format", format!("{}: {}", key, e)))
    }

    pub fn required_marks(&self, key: &str) -> StoreResult<Decimal> {
        let v = self.marks(key)?;
        self.required(key, v)
    }

    pub fn choice<C: Choice>(&self, key: &str) -> StoreResult<Option<C>> {
        let Some(v) = self.present(key)? else {
            return Ok(None);
        };
        let s = self.as_text(key, v)?;
        C::parse(&s).map(Some).ok_or_else(|| {
            self.invalid(
                key,
                "choice",
                format!(
                    "{:?} is not a valid {}; expected one of {}",
                    s,
                    key,
                    C::labels().join(", ")
                ),
            )
        })
    }

    pub fn required_choice<C: Choice>(&self, key: &str) -> StoreResult<C> {
        let v = self.choice(key)?;
        self.required(key, v)
    }
}

const STUDENT_FIELDS: &[&str] = &[
    "id",
    "name",
    "fatherName",
    "nationalId",
    "email",
    "contactNumber",
    "joiningDate",
    "resignationDate",
    "address",
    "status",
];

pub fn new_student(map: &Object) -> StoreResult<NewStudent> {
    let f = Fields::new(EntityKind::Student, map);
    f.deny_unknown(STUDENT_FIELDS)?;
    Ok(NewStudent {
        id: f.text("id")?,
        name: f.required_text("name")?,
        father_name: f.required_text("fatherName")?,
        national_id: f.required_text("nationalId")?,
        email: f.required_text("email")?,
        contact_number: f.required_text("contactNumber")?,
        joining_date: f.required_date("joiningDate")?,
        resignation_date: f.nullable_date("resignationDate")?.flatten(),
        address: f.required_text("address")?,
        status: f.choice("status")?,
    })
}

pub fn student_patch(map: &Object) -> StoreResult<StudentPatch> {
    let f = Fields::new(EntityKind::Student, map);
    f.deny_unknown(STUDENT_FIELDS)?;
    Ok(StudentPatch {
        id: f.text("id")?,
        name: f.text("name")?,
        father_name: f.text("fatherName")?,
        national_id: f.text("nationalId")?,
        email: f.text("email")?,
        contact_number: f.text("contactNumber")?,
        joining_date: f.date("joiningDate")?,
        resignation_date: f.nullable_date("resignationDate")?,
        address: f.text("address")?,
        status: f.choice("status")?,
    })
}

pub fn student_filter(map: &Object) -> StoreResult<StudentFilter> {
    let f = Fields::new(EntityKind::Student, map);
    f.deny_unknown(&["status", "joinedFrom", "joinedTo", "resigned", "search", "orderBy"])?;
    Ok(StudentFilter {
        status: f.choice("status")?,
        joined_from: f.date("joinedFrom")?,
        joined_to: f.date("joinedTo")?,
        resigned: f.boolean("resigned")?,
        search: f.text("search")?,
        order_by: f.text("orderBy")?,
    })
}

const COURSE_FIELDS: &[&str] = &["id", "name", "link", "durationHours", "courseHead"];

pub fn new_course(map: &Object) -> StoreResult<NewCourse> {
    let f = Fields::new(EntityKind::Course, map);
    f.deny_unknown(COURSE_FIELDS)?;
    Ok(NewCourse {
        id: f.text("id")?,
        name: f.required_text("name")?,
        link: f.nullable_text("link")?.flatten(),
        duration_hours: f.required_integer("durationHours")?,
        course_head: f.nullable_text("courseHead")?.flatten(),
    })
}

pub fn course_patch(map: &Object) -> StoreResult<CoursePatch> {
    let f = Fields::new(EntityKind::Course, map);
    f.deny_unknown(COURSE_FIELDS)?;
    Ok(CoursePatch {
        id: f.text("id")?,
        name: f.text("name")?,
        link: f.nullable_text("link")?,
        duration_hours: f.integer("durationHours")?,
        course_head: f.nullable_text("courseHead")?,
    })
}

pub fn course_filter(map: &Object) -> StoreResult<CourseFilter> {
    let f = Fields::new(EntityKind::Course, map);
    f.deny_unknown(&["courseHead", "minHours", "maxHours", "search", "orderBy"])?;
    Ok(CourseFilter {
        course_head: f.text("courseHead")?,
        min_hours: f.integer("minHours")?,
        max_hours: f.integer("maxHours")?,
        search: f.text("search")?,
        order_by: f.text("orderBy")?,
    })
}

const ENROLMENT_FIELDS: &[&str] = &[
    "id",
    "student",
    "course",
    "enrolmentDate",
    "deadline",
    "completionDate",
    "status",
    "activeStatus",
];

pub fn new_enrolment(map: &Object) -> StoreResult<NewEnrolment> {
    let f = Fields::new(EntityKind::Enrolment, map);
    f.deny_unknown(ENROLMENT_FIELDS)?;
    Ok(NewEnrolment {
        id: f.text("id")?,
        student_id: f.required_text("student")?,
        course_id: f.required_text("course")?,
        enrolment_date: f.required_date("enrolmentDate")?,
        deadline: f.required_date("deadline")?,
        completion_date: f.nullable_date("completionDate")?.flatten(),
        status: f.required_text("status")?,
        active_status: f.choice("activeStatus")?,
    })
}

pub fn enrolment_patch(map: &Object) -> StoreResult<EnrolmentPatch> {
    let f = Fields::new(EntityKind::Enrolment, map);
    f.deny_unknown(ENROLMENT_FIELDS)?;
    Ok(EnrolmentPatch {
        id: f.text("id")?,
        student_id: f.text("student")?,
        course_id: f.text("course")?,
        enrolment_date: f.date("enrolmentDate")?,
        deadline: f.date("deadline")?,
        completion_date: f.nullable_date("completionDate")?,
        status: f.text("status")?,
        active_status: f.choice("activeStatus")?,
    })
}

pub fn enrolment_filter(map: &Object) -> StoreResult<EnrolmentFilter> {
    let f = Fields::new(EntityKind::Enrolment, map);
    f.deny_unknown(&[
        "student",
        "course",
        "status",
        "activeStatus",
        "completed",
        "search",
        "orderBy",
    ])?;
    Ok(EnrolmentFilter {
        student_id: f.text("student")?,
        course_id: f.text("course")?,
        status: f.text("status")?,
        active_status: f.choice("activeStatus")?,
        completed: f.boolean("completed")?,
        search: f.text("search")?,
        order_by: f.text("orderBy")?,
    })
}

const EXAM_FIELDS: &[&str] = &[
    "id",
    "enrolment",
    "examType",
    "examDate",
    "totalMarks",
    "obtainedMarks",
    "activeStatus",
];

pub fn new_exam(map: &Object) -> StoreResult<NewExam> {
    let f = Fields::new(EntityKind::Exam, map);
    f.deny_unknown(EXAM_FIELDS)?;
    Ok(NewExam {
        id: f.text("id")?,
        enrolment_id: f.required_text("enrolment")?,
        exam_type: f.required_choice("examType")?,
        exam_date: f.required_date("examDate")?,
        total_marks: f.required_marks("totalMarks")?,
        obtained_marks: f.required_marks("obtainedMarks")?,
        active_status: f.choice("activeStatus")?,
    })
}

pub fn exam_patch(map: &Object) -> StoreResult<ExamPatch> {
    let f = Fields::new(EntityKind::Exam, map);
    f.deny_unknown(EXAM_FIELDS)?;
    Ok(ExamPatch {
        id: f.text("id")?,
        enrolment_id: f.text("enrolment")?,
        exam_type: f.choice("examType")?,
        exam_date: f.date("examDate")?,
        total_marks: f.marks("totalMarks")?,
        obtained_marks: f.marks("obtainedMarks")?,
        active_status: f.choice("activeStatus")?,
    })
}

pub fn exam_filter(map: &Object) -> StoreResult<ExamFilter> {
    let f = Fields::new(EntityKind::Exam, map);
    f.deny_unknown(&[
        "enrolment",
        "student",
        "course",
        "examType",
        "activeStatus",
        "search",
        "orderBy",
    ])?;
    Ok(ExamFilter {
        enrolment_id: f.text("enrolment")?,
        student_id: f.text("student")?,
        course_id: f.text("course")?,
        exam_type: f.choice("examType")?,
        active_status: f.choice("activeStatus")?,
        search: f.text("search")?,
        order_by: f.text("orderBy")?,
    })
}
