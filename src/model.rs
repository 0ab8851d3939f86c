use chrono::NaiveDate;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::Serialize;

/// Closed set of labels accepted for a field.
pub trait Choice: Sized + Copy + 'static {
    const CHOICES: &'static [Self];

    fn as_str(self) -> &'static str;

    fn parse(s: &str) -> Option<Self> {
        let s = s.trim();
        Self::CHOICES.iter().copied().find(|c| c.as_str() == s)
    }

    fn labels() -> Vec<&'static str> {
        Self::CHOICES.iter().map(|c| c.as_str()).collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum ActiveStatus {
    #[default]
    Active,
    Inactive,
}

impl Choice for ActiveStatus {
    const CHOICES: &'static [Self] = &[ActiveStatus::Active, ActiveStatus::Inactive];

    fn as_str(self) -> &'static str {
        match self {
            ActiveStatus::Active => "Active",
            ActiveStatus::Inactive => "Inactive",
        }
    }
}

/// New exam kinds are added here; everything else follows from `CHOICES`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ExamType {
    Quiz,
    Practical,
}

impl Choice for ExamType {
    const CHOICES: &'static [Self] = &[ExamType::Quiz, ExamType::Practical];

    fn as_str(self) -> &'static str {
        match self {
            ExamType::Quiz => "Quiz",
            ExamType::Practical => "Practical",
        }
    }
}

/// Fractional digits kept for exam marks.
pub const MARKS_SCALE: u32 = 2;

/// Five significant digits, two of them fractional.
pub fn max_marks() -> Decimal {
    Decimal::new(99_999, MARKS_SCALE)
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MarksError {
    #[error("not a decimal number: {0:?}")]
    Invalid(String),
    #[error("at most 2 decimal places allowed: {0:?}")]
    TooPrecise(String),
}

/// Parses marks exactly and pins them to two decimal places, so `"45"` and
/// `"45.5"` come back as `45.00` and `45.50`.
pub fn parse_marks(s: &str) -> Result<Decimal, MarksError> {
    let mut m = Decimal::from_str_exact(s.trim())
        .map_err(|_| MarksError::Invalid(s.to_string()))?
        .normalize();
    if m.scale() > MARKS_SCALE {
        return Err(MarksError::TooPrecise(s.to_string()));
    }
    m.rescale(MARKS_SCALE);
    Ok(m)
}

/// Marks are stored as integer hundredths.
pub fn marks_from_hundredths(h: i64) -> Decimal {
    Decimal::new(h, MARKS_SCALE)
}

pub fn marks_to_hundredths(m: Decimal) -> Option<i64> {
    m.checked_mul(Decimal::ONE_HUNDRED)?.trunc().to_i64()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Student {
    pub id: String,
    pub name: String,
    pub father_name: String,
    pub national_id: String,
    pub email: String,
    pub contact_number: String,
    pub joining_date: NaiveDate,
    pub resignation_date: Option<NaiveDate>,
    pub address: String,
    pub status: ActiveStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Course {
    pub id: String,
    pub name: String,
    pub link: Option<String>,
    pub duration_hours: i64,
    pub course_head: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Enrolment {
    pub id: String,
    #[serde(rename = "student")]
    pub student_id: String,
    #[serde(rename = "course")]
    pub course_id: String,
    pub enrolment_date: NaiveDate,
    pub deadline: NaiveDate,
    pub completion_date: Option<NaiveDate>,
    /// Free-form progress label such as "Semester 2".
    pub status: String,
    pub active_status: ActiveStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Exam {
    pub id: String,
    #[serde(rename = "enrolment")]
    pub enrolment_id: String,
    pub exam_type: ExamType,
    pub exam_date: NaiveDate,
    pub total_marks: Decimal,
    pub obtained_marks: Decimal,
    pub active_status: ActiveStatus,
}

// Creation inputs. `id: None` asks the store to assign one.

#[derive(Debug, Clone)]
pub struct NewStudent {
    pub id: Option<String>,
    pub name: String,
    pub father_name: String,
    pub national_id: String,
    pub email: String,
    pub contact_number: String,
    pub joining_date: NaiveDate,
    pub resignation_date: Option<NaiveDate>,
    pub address: String,
    pub status: Option<ActiveStatus>,
}

#[derive(Debug, Clone)]
pub struct NewCourse {
    pub id: Option<String>,
    pub name: String,
    pub link: Option<String>,
    pub duration_hours: i64,
    pub course_head: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewEnrolment {
    pub id: Option<String>,
    pub student_id: String,
    pub course_id: String,
    pub enrolment_date: NaiveDate,
    pub deadline: NaiveDate,
    pub completion_date: Option<NaiveDate>,
    pub status: String,
    pub active_status: Option<ActiveStatus>,
}

#[derive(Debug, Clone)]
pub struct NewExam {
    pub id: Option<String>,
    pub enrolment_id: String,
    pub exam_type: ExamType,
    pub exam_date: NaiveDate,
    pub total_marks: Decimal,
    pub obtained_marks: Decimal,
    pub active_status: Option<ActiveStatus>,
}

// Partial updates. For nullable columns the outer `Option` means "touch this
// field" and the inner one is the new value.

#[derive(Debug, Clone, Default)]
pub struct StudentPatch {
    pub id: Option<String>,
    pub name: Option<String>,
    pub father_name: Option<String>,
    pub national_id: Option<String>,
    pub email: Option<String>,
    pub contact_number: Option<String>,
    pub joining_date: Option<NaiveDate>,
    pub resignation_date: Option<Option<NaiveDate>>,
    pub address: Option<String>,
    pub status: Option<ActiveStatus>,
}

impl StudentPatch {
    pub fn apply(self, s: &mut Student) {
        if let Some(v) = self.name {
            s.name = v;
        }
        if let Some(v) = self.father_name {
            s.father_name = v;
        }
        if let Some(v) = self.national_id {
            s.national_id = v;
        }
        if let Some(v) = self.email {
            s.email = v;
        }
        if let Some(v) = self.contact_number {
            s.contact_number = v;
        }
        if let Some(v) = self.joining_date {
            s.joining_date = v;
        }
        if let Some(v) = self.address {
            s.address = v;
        }
        match (self.resignation_date, self.status) {
            (_, Some(status)) => {
                if let Some(d) = self.resignation_date {
                    s.resignation_date = d;
                }
                s.status = status;
            }
            (Some(Some(d)), None) => {
                s.resignation_date = Some(d);
                s.status = ActiveStatus::Inactive;
            }
            (Some(None), None) => s.resignation_date = None,
            (None, None) => {}
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct CoursePatch {
    pub id: Option<String>,
    pub name: Option<String>,
    pub link: Option<Option<String>>,
    pub duration_hours: Option<i64>,
    pub course_head: Option<Option<String>>,
}

impl CoursePatch {
    pub fn apply(self, c: &mut Course) {
        if let Some(v) = self.name {
            c.name = v;
        }
        if let Some(v) = self.link {
            c.link = v;
        }
        if let Some(v) = self.duration_hours {
            c.duration_hours = v;
        }
        if let Some(v) = self.course_head {
            c.course_head = v;
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct EnrolmentPatch {
    pub id: Option<String>,
    pub student_id: Option<String>,
    pub course_id: Option<String>,
    pub enrolment_date: Option<NaiveDate>,
    pub deadline: Option<NaiveDate>,
    pub completion_date: Option<Option<NaiveDate>>,
    pub status: Option<String>,
    pub active_status: Option<ActiveStatus>,
}

impl EnrolmentPatch {
    pub fn apply(self, e: &mut Enrolment) {
        if let Some(v) = self.student_id {
            e.student_id = v;
        }
        if let Some(v) = self.course_id {
            e.course_id = v;
        }
        if let Some(v) = self.enrolment_date {
            e.enrolment_date = v;
        }
        if let Some(v) = self.deadline {
            e.deadline = v;
        }
        if let Some(v) = self.completion_date {
            e.completion_date = v;
        }
        if let Some(v) = self.status {
            e.status = v;
        }
        if let Some(v) = self.active_status {
            e.active_status = v;
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ExamPatch {
    pub id: Option<String>,
    pub enrolment_id: Option<String>,
    pub exam_type: Option<ExamType>,
    pub exam_date: Option<NaiveDate>,
    pub total_marks: Option<Decimal>,
    pub obtained_marks: Option<Decimal>,
    pub active_status: Option<ActiveStatus>,
}

impl ExamPatch {
    pub fn apply(self, x: &mut Exam) {
        if let Some(v) = self.enrolment_id {
            x.enrolment_id = v;
        }
        if let Some(v) = self.exam_type {
            x.exam_type = v;
        }
        if let Some(v) = self.exam_date {
            x.exam_date = v;
        }
        if let Some(v) = self.total_marks {
            x.total_marks = v;
        }
        if let Some(v) = self.obtained_marks {
            x.obtained_marks = v;
        }
        if let Some(v) = self.active_status {
            x.active_status = v;
        }
    }
}

// List filters. Every field narrows the result; `None` means "any".

#[derive(Debug, Clone, Default)]
pub struct StudentFilter {
    pub status: Option<ActiveStatus>,
    pub joined_from: Option<NaiveDate>,
    pub joined_to: Option<NaiveDate>,
    pub resigned: Option<bool>,
    pub search: Option<String>,
    pub order_by: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct CourseFilter {
    pub course_head: Option<String>,
    pub min_hours: Option<i64>,
    pub max_hours: Option<i64>,
    pub search: Option<String>,
    pub order_by: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct EnrolmentFilter {
    pub student_id: Option<String>,
    pub course_id: Option<String>,
    pub status: Option<String>,
    pub active_status: Option<ActiveStatus>,
    pub completed: Option<bool>,
    pub search: Option<String>,
    pub order_by: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct ExamFilter {
    pub enrolment_id: Option<String>,
    pub student_id: Option<String>,
    pub course_id: Option<String>,
    pub exam_type: Option<ExamType>,
    pub active_status: Option<ActiveStatus>,
    pub search: Option<String>,
    pub order_by: Option<String>,
}
