mod test_support;

use serde_json::json;
use std::io::BufReader;
use std::process::{ChildStdin, ChildStdout};
use test_support::{open_workspace, request_ok};

struct Fixture {
    course: String,
    section_a: String,
    section_b: String,
    student: String,
    classmate: String,
}

fn seed(stdin: &mut ChildStdin, reader: &mut BufReader<ChildStdout>) -> Fixture {
    let course = request_ok(stdin, reader, "s1", "courses.create", json!({ "name": "English" }))
        .get("course")
        .and_then(|c| c.get("id"))
        .and_then(|v| v.as_str())
        .unwrap()
        .to_string();
    let mut section = |id: &str, name: &str, start: &str| {
        request_ok(
            stdin,
            reader,
            id,
            "sections.create",
            json!({
                "section": {
                    "courseId": course,
                    "name": name,
                    "scheduleBlocks": [{ "day": "monday", "startTime": start }]
                }
            }),
        )
        .get("section")
        .and_then(|s| s.get("id"))
        .and_then(|v| v.as_str())
        .unwrap()
        .to_string()
    };
    let section_a = section("s2", "English A", "10:00");
    let section_b = section("s3", "English B", "16:00");
    let mut student = |id: &str, name: &str| {
        request_ok(stdin, reader, id, "students.create", json!({ "name": name }))
            .get("student")
            .and_then(|s| s.get("id"))
            .and_then(|v| v.as_str())
            .unwrap()
            .to_string()
    };
    let student_id = student("s4", "Nora");
    let classmate = student("s5", "Iker");
    Fixture {
        course,
        section_a,
        section_b,
        student: student_id,
        classmate,
    }
}

fn attendance_rows(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    id: &str,
    section_id: &str,
) -> Vec<serde_json::Value> {
    request_ok(
        stdin,
        reader,
        id,
        "attendance.list",
        json!({ "sectionId": section_id }),
    )
    .get("attendance")
    .and_then(|v| v.as_array())
    .unwrap()
    .clone()
}

fn entries_for<'a>(row: &'a serde_json::Value, student_id: &str) -> Vec<&'a serde_json::Value> {
    row.get("records")
        .and_then(|v| v.as_array())
        .map(|records| {
            records
                .iter()
                .filter(|r| r.get("studentId").and_then(|v| v.as_str()) == Some(student_id))
                .collect()
        })
        .unwrap_or_default()
}

#[test]
fn transfer_migrates_attendance_and_round_trips() {
    let (mut child, mut stdin, mut reader, workspace) = open_workspace("academyd-transfer");
    let fx = seed(&mut stdin, &mut reader);

    for (i, (student, section)) in [
        (&fx.student, &fx.section_a),
        (&fx.classmate, &fx.section_a),
    ]
    .iter()
    .enumerate()
    {
        let _ = request_ok(
            &mut stdin,
            &mut reader,
            &format!("e{i}"),
            "enrollment.enroll",
            json!({ "studentId": student, "sectionId": section }),
        );
    }

    // Two dated sheets in A; the classmate shares the first one.
    for (i, (student, date, present)) in [
        (&fx.student, "2025-06-02", true),
        (&fx.classmate, "2025-06-02", false),
        (&fx.student, "2025-06-04", false),
    ]
    .iter()
    .enumerate()
    {
        let _ = request_ok(
            &mut stdin,
            &mut reader,
            &format!("m{i}"),
            "attendance.mark",
            json!({
                "sectionId": fx.section_a,
                "date": date,
                "studentId": student,
                "present": present
            }),
        );
    }
    let original_a = attendance_rows(&mut stdin, &mut reader, "l0", &fx.section_a);
    assert_eq!(original_a.len(), 2);

    let preview = request_ok(
        &mut stdin,
        &mut reader,
        "p1",
        "enrollment.transfer.preview",
        json!({
            "fromSectionId": fx.section_a,
            "assignments": [{ "studentId": fx.student, "toSectionId": fx.section_b }]
        }),
    );
    assert_eq!(preview.get("movedEntries").and_then(|v| v.as_u64()), Some(2));
    assert_eq!(preview.get("hasChanges").and_then(|v| v.as_bool()), Some(true));

    // Preview is a dry run: nothing moved yet.
    let still_a = attendance_rows(&mut stdin, &mut reader, "l1", &fx.section_a);
    assert_eq!(still_a.len(), 2);
    assert!(attendance_rows(&mut stdin, &mut reader, "l2", &fx.section_b).is_empty());

    let applied = request_ok(
        &mut stdin,
        &mut reader,
        "a1",
        "enrollment.transfer.apply",
        json!({
            "fromSectionId": fx.section_a,
            "assignments": [{ "studentId": fx.student, "toSectionId": fx.section_b }]
        }),
    );
    assert_eq!(applied.get("transferredStudents").and_then(|v| v.as_u64()), Some(1));
    assert_eq!(applied.get("createdRows").and_then(|v| v.as_u64()), Some(2));

    // The student's entries live in B now; the classmate stayed in A.
    let b_rows = attendance_rows(&mut stdin, &mut reader, "l3", &fx.section_b);
    assert_eq!(b_rows.len(), 2);
    for row in &b_rows {
        assert_eq!(entries_for(row, &fx.student).len(), 1);
    }
    let a_rows = attendance_rows(&mut stdin, &mut reader, "l4", &fx.section_a);
    assert_eq!(a_rows.len(), 2);
    assert!(a_rows.iter().all(|r| entries_for(r, &fx.student).is_empty()));
    let shared = a_rows
        .iter()
        .find(|r| r.get("date").and_then(|v| v.as_str()) == Some("2025-06-02"))
        .unwrap();
    assert_eq!(entries_for(shared, &fx.classmate).len(), 1);

    // Enrollment moved with a fresh row, same course.
    let rows = request_ok(
        &mut stdin,
        &mut reader,
        "l5",
        "enrollment.list",
        json!({ "studentId": fx.student }),
    );
    let rows = rows.get("enrollments").and_then(|v| v.as_array()).unwrap().clone();
    assert_eq!(rows.len(), 1);
    assert_eq!(
        rows[0].get("sectionId").and_then(|v| v.as_str()),
        Some(fx.section_b.as_str())
    );
    assert_eq!(
        rows[0].get("courseId").and_then(|v| v.as_str()),
        Some(fx.course.as_str())
    );

    // And back again: A's dated rows regain the same content.
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "a2",
        "enrollment.transfer.apply",
        json!({
            "fromSectionId": fx.section_b,
            "assignments": [{ "studentId": fx.student, "toSectionId": fx.section_a }]
        }),
    );
    let restored_a = attendance_rows(&mut stdin, &mut reader, "l6", &fx.section_a);
    for original in &original_a {
        let date = original.get("date").and_then(|v| v.as_str()).unwrap();
        let restored = restored_a
            .iter()
            .find(|r| r.get("date").and_then(|v| v.as_str()) == Some(date))
            .expect("restored row");
        assert_eq!(restored.get("id"), original.get("id"));
        let mut want: Vec<String> = original
            .get("records")
            .and_then(|v| v.as_array())
            .unwrap()
            .iter()
            .map(|r| r.to_string())
            .collect();
        let mut got: Vec<String> = restored
            .get("records")
            .and_then(|v| v.as_array())
            .unwrap()
            .iter()
            .map(|r| r.to_string())
            .collect();
        want.sort();
        got.sort();
        assert_eq!(want, got);
    }
    // No residual entries for the student linger in B.
    let b_after = attendance_rows(&mut stdin, &mut reader, "l7", &fx.section_b);
    assert!(b_after.iter().all(|r| entries_for(r, &fx.student).is_empty()));

    drop(stdin);
    let _ = child.wait();
    let _ = std::fs::remove_dir_all(workspace);
}

#[test]
fn empty_assignment_list_reports_no_changes() {
    let (mut child, mut stdin, mut reader, workspace) = open_workspace("academyd-transfer-noop");
    let fx = seed(&mut stdin, &mut reader);
    let preview = request_ok(
        &mut stdin,
        &mut reader,
        "p1",
        "enrollment.transfer.preview",
        json!({ "fromSectionId": fx.section_a, "assignments": [] }),
    );
    assert_eq!(preview.get("hasChanges").and_then(|v| v.as_bool()), Some(false));
    assert_eq!(preview.get("movedEntries").and_then(|v| v.as_u64()), Some(0));
    drop(stdin);
    let _ = child.wait();
    let _ = std::fs::remove_dir_all(workspace);
}
