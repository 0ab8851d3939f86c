mod test_support;

use serde_json::json;
use test_support::{
    course_params, enrolment_params, request_err, request_ok, select_workspace, spawn_sidecar,
    student_params,
};

#[test]
fn exam_marks_and_percentages() {
    let (_child, mut stdin, mut reader) = spawn_sidecar();
    let _ = select_workspace(&mut stdin, &mut reader, "tms-exams");

    let _ = request_ok(&mut stdin, &mut reader, "s", "students.create", student_params("STU001", 1));
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "c",
        "courses.create",
        course_params("CRS001", "Python Basics", None),
    );
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "e",
        "enrolments.create",
        enrolment_params("STU001", "CRS001"),
    );

    let created = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "exams.create",
        json!({
            "enrolment": "STU001_CRS001",
            "examType": "Quiz",
            "examDate": "2024-02-15",
            "totalMarks": 50,
            "obtainedMarks": 45
        }),
    );
    let x = &created["exam"];
    let id = x["id"].as_str().expect("id").to_string();
    assert!(id.starts_with("EXM"));
    assert_eq!(x["totalMarks"], json!("50.00"));
    assert_eq!(x["obtainedMarks"], json!("45.00"));
    assert_eq!(x["resultInPercentage"].as_f64(), Some(90.0));
    assert_eq!(x["resultDisplay"], json!("90.00%"));

    let err = request_err(
        &mut stdin,
        &mut reader,
        "2",
        "exams.create",
        json!({
            "enrolment": "STU001_CRS001",
            "examType": "Quiz",
            "examDate": "2024-02-16",
            "totalMarks": 50,
            "obtainedMarks": 55
        }),
        "validation_failed",
    );
    assert_eq!(
        err["details"]["constraint"],
        json!("exam.obtainedMarks.lteTotalMarks")
    );

    let err = request_err(
        &mut stdin,
        &mut reader,
        "3",
        "exams.create",
        json!({
            "enrolment": "STU001_CRS001",
            "examType": "Oral",
            "examDate": "2024-02-16",
            "totalMarks": 50,
            "obtainedMarks": 20
        }),
        "validation_failed",
    );
    assert_eq!(err["details"]["constraint"], json!("exam.examType.choice"));

    let err = request_err(
        &mut stdin,
        &mut reader,
        "4",
        "exams.update",
        json!({ "id": id, "patch": { "totalMarks": "40" } }),
        "validation_failed",
    );
    assert_eq!(
        err["details"]["constraint"],
        json!("exam.obtainedMarks.lteTotalMarks")
    );

    let updated = request_ok(
        &mut stdin,
        &mut reader,
        "5",
        "exams.update",
        json!({ "id": id, "patch": { "obtainedMarks": "33.33", "examType": "Practical" } }),
    );
    assert_eq!(updated["exam"]["obtainedMarks"], json!("33.33"));
    assert_eq!(updated["exam"]["examType"], json!("Practical"));
    assert_eq!(updated["exam"]["resultDisplay"], json!("66.66%"));

    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "6",
        "enrolments.update",
        json!({ "id": "STU001_CRS001", "patch": { "activeStatus": "Inactive" } }),
    );
    let err = request_err(
        &mut stdin,
        &mut reader,
        "7",
        "exams.create",
        json!({
            "enrolment": "STU001_CRS001",
            "examType": "Quiz",
            "examDate": "2024-03-01",
            "totalMarks": 10,
            "obtainedMarks": 10
        }),
        "validation_failed",
    );
    assert_eq!(err["details"]["constraint"], json!("exam.enrolment.active"));

    let listed = request_ok(
        &mut stdin,
        &mut reader,
        "8",
        "exams.list",
        json!({ "filter": { "student": "STU001", "examType": "Practical" } }),
    );
    assert_eq!(listed["exams"].as_array().map(Vec::len), Some(1));
    assert_eq!(listed["exams"][0]["enrolment"], json!("STU001_CRS001"));
}
