mod test_support;

use serde_json::json;
use test_support::{open_workspace, request_ok};

#[test]
fn fresh_workspace_is_seeded_once() {
    let (mut child, mut stdin, mut reader, workspace) = open_workspace("academyd-seed");

    let courses = request_ok(&mut stdin, &mut reader, "1", "courses.list", json!({}));
    let courses = courses.get("courses").and_then(|v| v.as_array()).unwrap().clone();
    assert_eq!(courses.len(), 3);
    let professors = request_ok(&mut stdin, &mut reader, "2", "professors.list", json!({}));
    assert_eq!(
        professors.get("professors").and_then(|v| v.as_array()).map(|a| a.len()),
        Some(2)
    );
    let students = request_ok(&mut stdin, &mut reader, "3", "students.list", json!({}));
    assert_eq!(
        students.get("students").and_then(|v| v.as_array()).map(|a| a.len()),
        Some(3)
    );

    // The remaining collections exist as empty arrays, not errors.
    for (i, method) in [
        ("4", "sections.list"),
        ("5", "enrollment.list"),
        ("6", "attendance.list"),
        ("7", "payments.list"),
    ] {
        let _ = request_ok(&mut stdin, &mut reader, i, method, json!({}));
    }

    // Mutate, then reopen the same workspace: no reseeding over data.
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "8",
        "courses.create",
        json!({ "name": "Extra" }),
    );
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "9",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );
    let again = request_ok(&mut stdin, &mut reader, "10", "courses.list", json!({}));
    let again = again.get("courses").and_then(|v| v.as_array()).unwrap().clone();
    assert_eq!(again.len(), 4);
    // Seeded rows survived with the same ids.
    for course in &courses {
        assert!(again.iter().any(|c| c.get("id") == course.get("id")));
    }

    drop(stdin);
    let _ = child.wait();
    let _ = std::fs::remove_dir_all(workspace);
}

#[test]
fn methods_without_a_workspace_are_rejected() {
    let (mut child, mut stdin, mut reader) = test_support::spawn_sidecar();
    let code = test_support::request_err(&mut stdin, &mut reader, "1", "courses.list", json!({}));
    assert_eq!(code, "no_workspace");
    drop(stdin);
    let _ = child.wait();
}
