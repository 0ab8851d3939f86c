mod test_support;

use serde_json::json;
use std::io::BufReader;
use std::process::{ChildStdin, ChildStdout};
use test_support::{
    course_params, enrolment_params, request_err, request_ok, select_workspace, spawn_sidecar,
    student_params,
};

fn seed(stdin: &mut ChildStdin, reader: &mut BufReader<ChildStdout>) {
    let _ = request_ok(stdin, reader, "s1", "students.create", student_params("STU001", 1));
    let _ = request_ok(stdin, reader, "s2", "students.create", student_params("STU002", 2));
    let _ = request_ok(
        stdin,
        reader,
        "c1",
        "courses.create",
        course_params("CRS001", "Python Basics", Some("STU002")),
    );
    let _ = request_ok(
        stdin,
        reader,
        "c2",
        "courses.create",
        course_params("CRS002", "Data Analysis", None),
    );
}

#[test]
fn enrolment_ids_and_derived_fields() {
    let (_child, mut stdin, mut reader) = spawn_sidecar();
    let _ = select_workspace(&mut stdin, &mut reader, "tms-enrolments-derived");
    seed(&mut stdin, &mut reader);

    let created = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "enrolments.create",
        enrolment_params("STU001", "CRS001"),
    );
    let e = &created["enrolment"];
    assert_eq!(e["id"], json!("STU001_CRS001"));
    assert_eq!(e["student"], json!("STU001"));
    assert_eq!(e["activeStatus"], json!("Active"));
    assert!(e["extraTime"].is_null());
    assert_eq!(e["extraTimeLabel"], json!("Not completed yet"));

    let done = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "enrolments.update",
        json!({ "id": "STU001_CRS001", "patch": { "completionDate": "2024-03-15" } }),
    );
    assert_eq!(done["enrolment"]["extraTime"], json!(5));
    assert_eq!(done["enrolment"]["extraTimeLabel"], json!("5 days early"));

    let late = request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "enrolments.update",
        json!({ "id": "STU001_CRS001", "patch": { "completionDate": "2024-03-22" } }),
    );
    assert_eq!(late["enrolment"]["extraTime"], json!(-2));
    assert_eq!(late["enrolment"]["extraTimeLabel"], json!("2 days late"));

    let err = request_err(
        &mut stdin,
        &mut reader,
        "4",
        "enrolments.create",
        enrolment_params("STU001", "CRS001"),
        "validation_failed",
    );
    assert_eq!(
        err["details"]["constraint"],
        json!("enrolment.studentCourse.unique")
    );

    let err = request_err(
        &mut stdin,
        &mut reader,
        "5",
        "enrolments.create",
        enrolment_params("STU404", "CRS001"),
        "validation_failed",
    );
    assert_eq!(err["details"]["constraint"], json!("enrolment.student.exists"));

    let completed = request_ok(
        &mut stdin,
        &mut reader,
        "6",
        "enrolments.list",
        json!({ "filter": { "completed": true } }),
    );
    assert_eq!(completed["enrolments"].as_array().map(Vec::len), Some(1));
    assert_eq!(completed["enrolments"][0]["extraTime"], json!(-2));
}

#[test]
fn deleting_a_student_cascades_and_nullifies() {
    let (_child, mut stdin, mut reader) = spawn_sidecar();
    let _ = select_workspace(&mut stdin, &mut reader, "tms-enrolments-cascade");
    seed(&mut stdin, &mut reader);

    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "e1",
        "enrolments.create",
        enrolment_params("STU001", "CRS001"),
    );
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "e2",
        "enrolments.create",
        enrolment_params("STU002", "CRS002"),
    );
    let kept = request_ok(
        &mut stdin,
        &mut reader,
        "x1",
        "exams.create",
        json!({
            "enrolment": "STU001_CRS001",
            "examType": "Quiz",
            "examDate": "2024-02-15",
            "totalMarks": 50,
            "obtainedMarks": 45
        }),
    );
    let dropped = request_ok(
        &mut stdin,
        &mut reader,
        "x2",
        "exams.create",
        json!({
            "enrolment": "STU002_CRS002",
            "examType": "Practical",
            "examDate": "2024-02-20",
            "totalMarks": "30",
            "obtainedMarks": "28.5"
        }),
    );
    let dropped_id = dropped["exam"]["id"].as_str().expect("exam id").to_string();

    let report = request_ok(
        &mut stdin,
        &mut reader,
        "d",
        "students.delete",
        json!({ "id": "STU002" }),
    );
    let deleted = &report["deleted"];
    assert_eq!(deleted["deleted"]["students"], json!(["STU002"]));
    assert_eq!(deleted["deleted"]["enrolments"], json!(["STU002_CRS002"]));
    assert_eq!(deleted["deleted"]["exams"], json!([dropped_id.clone()]));
    assert_eq!(deleted["nullified"]["courses"], json!(["CRS001"]));

    let _ = request_err(
        &mut stdin,
        &mut reader,
        "g1",
        "enrolments.get",
        json!({ "id": "STU002_CRS002" }),
        "not_found",
    );
    let _ = request_err(
        &mut stdin,
        &mut reader,
        "g2",
        "exams.get",
        json!({ "id": dropped_id }),
        "not_found",
    );
    let course = request_ok(
        &mut stdin,
        &mut reader,
        "g3",
        "courses.get",
        json!({ "id": "CRS001" }),
    );
    assert!(course["course"]["courseHead"].is_null());
    assert_eq!(course["course"]["name"], json!("Python Basics"));

    let remaining = request_ok(&mut stdin, &mut reader, "l", "exams.list", json!({}));
    let exams = remaining["exams"].as_array().expect("exams");
    assert_eq!(exams.len(), 1);
    assert_eq!(exams[0]["id"], kept["exam"]["id"]);
}

#[test]
fn deleting_a_course_removes_its_enrolments() {
    let (_child, mut stdin, mut reader) = spawn_sidecar();
    let _ = select_workspace(&mut stdin, &mut reader, "tms-course-cascade");
    seed(&mut stdin, &mut reader);

    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "e1",
        "enrolments.create",
        enrolment_params("STU001", "CRS001"),
    );
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "e2",
        "enrolments.create",
        enrolment_params("STU001", "CRS002"),
    );

    let report = request_ok(
        &mut stdin,
        &mut reader,
        "d",
        "courses.delete",
        json!({ "id": "CRS001" }),
    );
    assert_eq!(
        report["deleted"]["deleted"]["enrolments"],
        json!(["STU001_CRS001"])
    );

    let left = request_ok(
        &mut stdin,
        &mut reader,
        "l",
        "enrolments.list",
        json!({ "filter": { "student": "STU001" } }),
    );
    let ids: Vec<&str> = left["enrolments"]
        .as_array()
        .expect("enrolments")
        .iter()
        .filter_map(|e| e["id"].as_str())
        .collect();
    assert_eq!(ids, vec!["STU001_CRS002"]);

    let student = request_ok(
        &mut stdin,
        &mut reader,
        "s",
        "students.get",
        json!({ "id": "STU001" }),
    );
    assert_eq!(student["student"]["status"], json!("Active"));
}
